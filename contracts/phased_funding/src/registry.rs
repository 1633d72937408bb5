//! # Registry
//!
//! Gatekeeping and routing. The registry owns the template table, builds new
//! projects through [`TemplateKind::instantiate`], charges the creation fee
//! and runs every project operation inside a [`Session`]:
//!
//! 1. load the platform context, project config and state;
//! 2. [`lifecycle::advance_into`] to `now`;
//! 3. apply the operation;
//! 4. advance again, settle the recorded transitions, persist the state.
//!
//! Any error returned along the way aborts the invocation and the host rolls
//! back every write and transfer made before it.

use soroban_sdk::{Address, BytesN, Env, String, Vec};

use crate::context::PlatformContext;
use crate::types::{
    PhaseSpec, PlatformConfig, Project, ProjectConfig, ProjectInit, ProjectState, ProjectStatus,
    TemplateKind, Transition, BPS_DENOMINATOR, MIN_PHASED_PHASES,
};
use crate::{custody, events, lifecycle, oracle, rbac, schedule, storage, Error};

// ─────────────────────────────────────────────────────────
// Platform configuration
// ─────────────────────────────────────────────────────────

fn validate_platform(config: &PlatformConfig) -> Result<(), Error> {
    if config.ticks_per_year == 0
        || config.audit_window == 0
        || config.replan_window == 0
        || config.replan_vote_window == 0
    {
        return Err(Error::InvalidConfig);
    }
    Ok(())
}

pub fn init(env: &Env, super_admin: &Address, config: PlatformConfig) -> Result<(), Error> {
    if storage::has_platform(env) {
        return Err(Error::AlreadyInitialized);
    }
    validate_platform(&config)?;
    rbac::init_super_admin(env, super_admin)?;
    storage::set_platform(env, &config);
    events::emit_platform_updated(env, config);
    Ok(())
}

fn update_platform(
    env: &Env,
    caller: &Address,
    apply: impl FnOnce(&mut PlatformConfig),
) -> Result<(), Error> {
    rbac::require_admin_or_above(env, caller)?;
    let mut config = storage::get_platform(env).ok_or(Error::NotInitialized)?;
    apply(&mut config);
    storage::set_platform(env, &config);
    events::emit_platform_updated(env, config);
    Ok(())
}

pub fn set_price_feed(env: &Env, caller: &Address, feed: Address) -> Result<(), Error> {
    update_platform(env, caller, |config| config.price_feed = feed)
}

pub fn set_tokens(
    env: &Env,
    caller: &Address,
    fee_token: Address,
    investment_token: Address,
) -> Result<(), Error> {
    update_platform(env, caller, |config| {
        config.fee_token = fee_token;
        config.investment_token = investment_token;
    })
}

pub fn set_template(
    env: &Env,
    caller: &Address,
    template_id: u32,
    kind: TemplateKind,
) -> Result<(), Error> {
    rbac::require_admin_or_above(env, caller)?;
    storage::set_template(env, template_id, kind);
    events::emit_template_set(env, template_id, kind);
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Template factory
// ─────────────────────────────────────────────────────────

impl TemplateKind {
    /// Build the initial config and state of a project, validating `init`
    /// against this variant's rules.
    pub fn instantiate(
        &self,
        env: &Env,
        ctx: &PlatformContext,
        template_id: u32,
        project_id: BytesN<32>,
        max_raise: i128,
        metadata: String,
        init: ProjectInit,
    ) -> Result<(ProjectConfig, ProjectState), Error> {
        if init.min_raise <= 0 || init.min_raise > max_raise {
            return Err(Error::InvalidRaiseBounds);
        }
        if init.raise_start >= init.raise_end || init.raise_end <= ctx.now {
            return Err(Error::InvalidRaiseWindow);
        }
        if init.insurance_rate_bps > BPS_DENOMINATOR {
            return Err(Error::InvalidRate);
        }

        let phases = match self {
            TemplateKind::Phased => {
                if init.phases.len() < MIN_PHASED_PHASES {
                    return Err(Error::InvalidPhaseSchedule);
                }
                schedule::from_specs(env, &init.phases)
            }
            TemplateKind::FullRelease => {
                if !init.phases.is_empty() {
                    return Err(Error::InvalidPhaseSchedule);
                }
                let mut single = Vec::new(env);
                single.push_back(PhaseSpec {
                    release_start: init.raise_end,
                    release_end: init.raise_end.saturating_add(1),
                    percent_bps: BPS_DENOMINATOR,
                });
                schedule::from_specs(env, &single)
            }
        };
        schedule::validate(&phases)?;

        let first = phases.first().ok_or(Error::InvalidPhaseSchedule)?;
        let last = phases.last().ok_or(Error::InvalidPhaseSchedule)?;
        if first.release_start < init.raise_end {
            return Err(Error::InvalidPhaseSchedule);
        }
        if init.repay_deadline < last.release_end {
            return Err(Error::InvalidPhaseSchedule);
        }

        let config = ProjectConfig {
            id: project_id,
            template_id,
            kind: *self,
            owner: init.owner,
            metadata,
            min_raise: init.min_raise,
            max_raise,
            raise_start: init.raise_start,
            raise_end: init.raise_end,
            repay_deadline: init.repay_deadline,
            profit_rate_bps: init.profit_rate_bps,
            replan_grants: init.replan_grants,
            investment_token: ctx.config.investment_token.clone(),
            fee_token: ctx.config.fee_token.clone(),
            created_at: ctx.now,
        };
        let state = ProjectState {
            status: ProjectStatus::Created,
            phases,
            current_phase_index: 0,
            total_invested: 0,
            released_total: 0,
            refunded_total: 0,
            repaid_total: 0,
            repay_deposited: 0,
            insurance_rate_bps: init.insurance_rate_bps,
            insurance_paid: 0,
            failed_replan_count: 0,
            vote_episode: 0,
            denied_at: 0,
            replan_deadline: 0,
            replan: None,
        };
        Ok((config, state))
    }
}

/// Register a new project and charge the creation fee to `creator`.
///
/// The fee is `max_raise` quoted in the fee token by the price feed and is
/// pulled from `creator` against the contract's allowance.
pub fn new_project(
    env: &Env,
    creator: &Address,
    template_id: u32,
    project_id: BytesN<32>,
    max_raise: i128,
    metadata: String,
    init: ProjectInit,
) -> Result<Project, Error> {
    let ctx = PlatformContext::load(env)?;
    let kind = storage::get_template(env, template_id).ok_or(Error::UnknownTemplate)?;
    if storage::has_project(env, &project_id) {
        return Err(Error::DuplicateProjectId);
    }

    let (config, mut state) =
        kind.instantiate(env, &ctx, template_id, project_id.clone(), max_raise, metadata, init)?;

    let fee = oracle::convert(
        env,
        &ctx,
        max_raise,
        &config.investment_token,
        &config.fee_token,
    )?;
    custody::transfer_from(env, &config.fee_token, creator, &ctx.config.fee_receiver, fee)?;

    let mut transitions = Vec::new(env);
    lifecycle::submit_for_audit(&mut state, &mut transitions)?;
    storage::save_project(env, &config, &state);

    events::emit_project_created(
        env,
        project_id.clone(),
        template_id,
        config.owner.clone(),
        max_raise,
        fee,
    );
    custody::settle(env, &config, &transitions)?;
    storage::load_project(env, &project_id)
}

// ─────────────────────────────────────────────────────────
// Project sessions
// ─────────────────────────────────────────────────────────

/// A loaded project, advanced to the current tick.
pub struct Session<'a> {
    pub env: &'a Env,
    pub ctx: PlatformContext,
    pub config: ProjectConfig,
    pub state: ProjectState,
    pub transitions: Vec<Transition>,
}

impl<'a> Session<'a> {
    fn open(env: &'a Env, id: &BytesN<32>) -> Result<Self, Error> {
        let ctx = PlatformContext::load(env)?;
        let config = storage::load_project_config(env, id)?;
        let mut state = storage::load_project_state(env, id)?;
        let mut transitions = Vec::new(env);
        lifecycle::advance_into(env, &config, &mut state, &ctx, &mut transitions)?;
        Ok(Session {
            env,
            ctx,
            config,
            state,
            transitions,
        })
    }

    fn close(mut self) -> Result<ProjectStatus, Error> {
        lifecycle::advance_into(
            self.env,
            &self.config,
            &mut self.state,
            &self.ctx,
            &mut self.transitions,
        )?;
        custody::settle(self.env, &self.config, &self.transitions)?;
        storage::save_project_state(self.env, &self.config.id, &self.state);
        Ok(self.state.status)
    }

    fn now(&self) -> u32 {
        self.ctx.now
    }
}

/// Run `op` against project `id` and persist the outcome.
pub fn with_project<T>(
    env: &Env,
    id: &BytesN<32>,
    op: impl FnOnce(&mut Session) -> Result<T, Error>,
) -> Result<T, Error> {
    let mut session = Session::open(env, id)?;
    let result = op(&mut session)?;
    session.close()?;
    Ok(result)
}

// ─────────────────────────────────────────────────────────
// Project operations
// ─────────────────────────────────────────────────────────

pub fn audit_project(
    env: &Env,
    auditor: &Address,
    id: &BytesN<32>,
    approve: bool,
    insurance_rate_bps: Option<u32>,
) -> Result<(), Error> {
    rbac::require_committee(env, auditor)?;
    let ctx = PlatformContext::load(env)?;
    let config = storage::load_project_config(env, id)?;
    if ctx.now >= config.created_at.saturating_add(ctx.config.audit_window) {
        return Err(Error::AuditWindowClosed);
    }

    with_project(env, id, |s| {
        lifecycle::audit(&mut s.state, approve, insurance_rate_bps, &mut s.transitions)?;
        events::emit_project_audited(
            s.env,
            id.clone(),
            auditor.clone(),
            approve,
            s.state.insurance_rate_bps,
        );
        Ok(())
    })
}

pub fn heartbeat(env: &Env, id: &BytesN<32>) -> Result<ProjectStatus, Error> {
    Session::open(env, id)?.close()
}

pub fn invest(env: &Env, investor: &Address, id: &BytesN<32>, amount: i128) -> Result<(), Error> {
    with_project(env, id, |s| {
        lifecycle::invest(&s.config, &mut s.state, amount)?;
        custody::transfer(
            s.env,
            &s.config.investment_token,
            investor,
            &s.env.current_contract_address(),
            amount,
        )?;
        storage::add_stake(s.env, id, investor, amount)?;
        events::emit_invested(
            s.env,
            id.clone(),
            investor.clone(),
            amount,
            s.state.total_invested,
        );
        Ok(())
    })
}

/// Insurance owed by the owner, in fee-token units.
pub fn insurance_quote(env: &Env, id: &BytesN<32>) -> Result<i128, Error> {
    let ctx = PlatformContext::load(env)?;
    let config = storage::load_project_config(env, id)?;
    let state = storage::load_project_state(env, id)?;
    quote_insurance(env, &ctx, &config, &state)
}

fn quote_insurance(
    env: &Env,
    ctx: &PlatformContext,
    config: &ProjectConfig,
    state: &ProjectState,
) -> Result<i128, Error> {
    let base = lifecycle::insurance_base(config, state)?;
    oracle::convert(env, ctx, base, &config.investment_token, &config.fee_token)
}

pub fn pay_insurance(env: &Env, id: &BytesN<32>) -> Result<i128, Error> {
    with_project(env, id, |s| {
        s.config.owner.require_auth();
        let amount = quote_insurance(s.env, &s.ctx, &s.config, &s.state)?;
        lifecycle::pay_insurance(&mut s.state, amount, &mut s.transitions)?;
        custody::transfer_from(
            s.env,
            &s.config.fee_token,
            &s.config.owner,
            &s.ctx.config.fee_receiver,
            amount,
        )?;
        events::emit_insurance_paid(s.env, id.clone(), s.config.owner.clone(), amount);
        Ok(amount)
    })
}

pub fn vote_phase(
    env: &Env,
    voter: &Address,
    id: &BytesN<32>,
    phase_index: u32,
    in_favor: bool,
) -> Result<(), Error> {
    with_project(env, id, |s| {
        if s.config.kind == TemplateKind::FullRelease {
            return Err(Error::VotingClosed);
        }
        lifecycle::check_phase_ballot(&s.state, phase_index)?;
        let episode = s.state.vote_episode;
        if storage::has_voted(s.env, id, episode, voter) {
            return Err(Error::AlreadyVoted);
        }
        let weight = storage::get_stake(s.env, id, voter);
        lifecycle::vote_phase(
            &mut s.state,
            &s.ctx,
            phase_index,
            weight,
            in_favor,
            &mut s.transitions,
        )?;
        storage::record_vote(s.env, id, episode, voter, in_favor);
        events::emit_phase_voted(s.env, id.clone(), voter.clone(), phase_index, in_favor, weight);
        Ok(())
    })
}

pub fn replan(
    env: &Env,
    caller: &Address,
    id: &BytesN<32>,
    new_phases: Vec<PhaseSpec>,
) -> Result<(), Error> {
    with_project(env, id, |s| {
        if !lifecycle::can_replan(&s.config, caller) {
            return Err(Error::NoReplanAuth);
        }
        let from_phase = s.state.current_phase_index;
        let phase_count = new_phases.len();
        let now = s.now();
        lifecycle::propose_replan(
            s.env,
            &mut s.state,
            caller,
            new_phases,
            now,
            &mut s.transitions,
        )?;
        events::emit_replan_submitted(s.env, id.clone(), caller.clone(), from_phase, phase_count);
        Ok(())
    })
}

pub fn vote_for_replan(env: &Env, voter: &Address, id: &BytesN<32>) -> Result<(), Error> {
    with_project(env, id, |s| {
        lifecycle::check_replan_ballot(&s.state)?;
        let episode = s.state.vote_episode;
        if storage::has_voted(s.env, id, episode, voter) {
            return Err(Error::AlreadyVoted);
        }
        let weight = storage::get_stake(s.env, id, voter);
        lifecycle::vote_for_replan(s.env, &mut s.state, &s.ctx, weight, &mut s.transitions)?;
        storage::record_vote(s.env, id, episode, voter, true);
        events::emit_replan_voted(s.env, id.clone(), voter.clone(), weight);
        Ok(())
    })
}

/// Principal plus interest owed if repaid now.
pub fn repay_quote(env: &Env, id: &BytesN<32>) -> Result<i128, Error> {
    let ctx = PlatformContext::load(env)?;
    let config = storage::load_project_config(env, id)?;
    let state = storage::load_project_state(env, id)?;
    lifecycle::amount_due(&config, &state, &ctx)
}

pub fn fill_repay_tokens(env: &Env, id: &BytesN<32>, amount: i128) -> Result<(), Error> {
    with_project(env, id, |s| {
        s.config.owner.require_auth();
        lifecycle::fill_repay(&s.config, &mut s.state, &s.ctx, amount, &mut s.transitions)?;
        custody::transfer(
            s.env,
            &s.config.investment_token,
            &s.config.owner,
            &s.env.current_contract_address(),
            amount,
        )?;
        events::emit_repay_filled(s.env, id.clone(), amount, s.state.repay_deposited);
        Ok(())
    })
}

pub fn repay(env: &Env, id: &BytesN<32>) -> Result<(), Error> {
    with_project(env, id, |s| {
        let interest = lifecycle::repay(&s.config, &mut s.state, &s.ctx, &mut s.transitions)?;
        s.state.repaid_total = custody::repay(s.env, &s.config, &s.state, interest)?;
        Ok(())
    })
}

pub fn liquidate(env: &Env, id: &BytesN<32>) -> Result<(), Error> {
    with_project(env, id, |s| {
        let unreleased = lifecycle::liquidate(&mut s.state, &mut s.transitions)?;
        let paid = custody::liquidate(s.env, &s.config, s.state.total_invested, unreleased)?;
        s.state.refunded_total = s
            .state
            .refunded_total
            .checked_add(paid)
            .ok_or(Error::Overflow)?;
        Ok(())
    })
}
