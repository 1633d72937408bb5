use soroban_sdk::{contracttype, symbol_short, Address, BytesN, Env};

use crate::types::{PlatformConfig, ProjectStatus, TemplateKind, Tick};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectCreated {
    pub project_id: BytesN<32>,
    pub template_id: u32,
    pub owner: Address,
    pub max_raise: i128,
    pub fee_paid: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectAudited {
    pub project_id: BytesN<32>,
    pub auditor: Address,
    pub approved: bool,
    pub insurance_rate_bps: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invested {
    pub project_id: BytesN<32>,
    pub investor: Address,
    pub amount: i128,
    pub total_invested: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InsurancePaid {
    pub project_id: BytesN<32>,
    pub payer: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatusChanged {
    pub project_id: BytesN<32>,
    pub from: ProjectStatus,
    pub to: ProjectStatus,
    pub phase_index: u32,
    pub tick: Tick,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhaseVoted {
    pub project_id: BytesN<32>,
    pub voter: Address,
    pub phase_index: u32,
    pub in_favor: bool,
    pub weight: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplanSubmitted {
    pub project_id: BytesN<32>,
    pub proposer: Address,
    pub from_phase: u32,
    pub phase_count: u32,
    pub proposed_at: Tick,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplanVoted {
    pub project_id: BytesN<32>,
    pub voter: Address,
    pub weight: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplanFailed {
    pub project_id: BytesN<32>,
    pub failed_replan_count: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhaseReleased {
    pub project_id: BytesN<32>,
    pub phase_index: u32,
    pub recipient: Address,
    pub amount: i128,
}

/// One investor payout: raise-failure refund, liquidation share or repayment.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payout {
    pub project_id: BytesN<32>,
    pub investor: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepayFilled {
    pub project_id: BytesN<32>,
    pub amount: i128,
    pub deposited: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TemplateSet {
    pub template_id: u32,
    pub kind: TemplateKind,
}

pub fn emit_project_created(
    env: &Env,
    project_id: BytesN<32>,
    template_id: u32,
    owner: Address,
    max_raise: i128,
    fee_paid: i128,
) {
    let topics = (symbol_short!("created"), project_id.clone());
    let data = ProjectCreated {
        project_id,
        template_id,
        owner,
        max_raise,
        fee_paid,
    };
    env.events().publish(topics, data);
}

pub fn emit_project_audited(
    env: &Env,
    project_id: BytesN<32>,
    auditor: Address,
    approved: bool,
    insurance_rate_bps: u32,
) {
    let topics = (symbol_short!("audited"), project_id.clone());
    let data = ProjectAudited {
        project_id,
        auditor,
        approved,
        insurance_rate_bps,
    };
    env.events().publish(topics, data);
}

pub fn emit_invested(
    env: &Env,
    project_id: BytesN<32>,
    investor: Address,
    amount: i128,
    total_invested: i128,
) {
    let topics = (symbol_short!("invested"), project_id.clone());
    let data = Invested {
        project_id,
        investor,
        amount,
        total_invested,
    };
    env.events().publish(topics, data);
}

pub fn emit_insurance_paid(env: &Env, project_id: BytesN<32>, payer: Address, amount: i128) {
    let topics = (symbol_short!("insured"), project_id.clone());
    let data = InsurancePaid {
        project_id,
        payer,
        amount,
    };
    env.events().publish(topics, data);
}

pub fn emit_status_changed(
    env: &Env,
    project_id: BytesN<32>,
    from: ProjectStatus,
    to: ProjectStatus,
    phase_index: u32,
) {
    let topics = (symbol_short!("status"), project_id.clone());
    let data = StatusChanged {
        project_id,
        from,
        to,
        phase_index,
        tick: env.ledger().sequence(),
    };
    env.events().publish(topics, data);
}

pub fn emit_phase_voted(
    env: &Env,
    project_id: BytesN<32>,
    voter: Address,
    phase_index: u32,
    in_favor: bool,
    weight: i128,
) {
    let topics = (symbol_short!("voted"), project_id.clone());
    let data = PhaseVoted {
        project_id,
        voter,
        phase_index,
        in_favor,
        weight,
    };
    env.events().publish(topics, data);
}

pub fn emit_replan_submitted(
    env: &Env,
    project_id: BytesN<32>,
    proposer: Address,
    from_phase: u32,
    phase_count: u32,
) {
    let topics = (symbol_short!("replan"), project_id.clone());
    let data = ReplanSubmitted {
        project_id,
        proposer,
        from_phase,
        phase_count,
        proposed_at: env.ledger().sequence(),
    };
    env.events().publish(topics, data);
}

pub fn emit_replan_voted(env: &Env, project_id: BytesN<32>, voter: Address, weight: i128) {
    let topics = (symbol_short!("rp_vote"), project_id.clone());
    let data = ReplanVoted {
        project_id,
        voter,
        weight,
    };
    env.events().publish(topics, data);
}

pub fn emit_replan_failed(env: &Env, project_id: BytesN<32>, failed_replan_count: u32) {
    let topics = (symbol_short!("rp_fail"), project_id.clone());
    let data = ReplanFailed {
        project_id,
        failed_replan_count,
    };
    env.events().publish(topics, data);
}

pub fn emit_phase_released(
    env: &Env,
    project_id: BytesN<32>,
    phase_index: u32,
    recipient: Address,
    amount: i128,
) {
    let topics = (symbol_short!("released"), project_id.clone());
    let data = PhaseReleased {
        project_id,
        phase_index,
        recipient,
        amount,
    };
    env.events().publish(topics, data);
}

pub fn emit_refunded(env: &Env, project_id: BytesN<32>, investor: Address, amount: i128) {
    let topics = (symbol_short!("refunded"), project_id.clone());
    let data = Payout {
        project_id,
        investor,
        amount,
    };
    env.events().publish(topics, data);
}

pub fn emit_repaid(env: &Env, project_id: BytesN<32>, investor: Address, amount: i128) {
    let topics = (symbol_short!("repaid"), project_id.clone());
    let data = Payout {
        project_id,
        investor,
        amount,
    };
    env.events().publish(topics, data);
}

pub fn emit_repay_filled(env: &Env, project_id: BytesN<32>, amount: i128, deposited: i128) {
    let topics = (symbol_short!("filled"), project_id.clone());
    let data = RepayFilled {
        project_id,
        amount,
        deposited,
    };
    env.events().publish(topics, data);
}

pub fn emit_template_set(env: &Env, template_id: u32, kind: TemplateKind) {
    let topics = (symbol_short!("template"), template_id);
    env.events().publish(topics, TemplateSet { template_id, kind });
}

pub fn emit_platform_updated(env: &Env, config: PlatformConfig) {
    env.events().publish((symbol_short!("platform"),), config);
}
