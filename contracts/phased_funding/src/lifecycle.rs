//! # Lifecycle engine
//!
//! The project state machine. Everything here works on an in-memory
//! [`ProjectState`] and records what happened as [`Transition`]s; no tokens
//! move and nothing is persisted. [`crate::registry`] loads a project, runs
//! [`advance`] plus the requested operation, and hands the transitions to
//! [`crate::custody::settle`].
//!
//! ## Time
//!
//! There is no clock inside the contract. [`advance`] applies every transition
//! whose window condition holds at `ctx.now`, looping until nothing changes,
//! so a single heartbeat can cross several phase boundaries. Every resolution
//! is stamped with the window boundary that triggered it rather than with
//! `now`, which keeps the outcome independent of how late the heartbeat came.
//!
//! ## Invariants
//!
//! - `current_phase_index` never decreases.
//! - custody held for a project equals `total_invested - released_total - refunded_total`.
//! - `failed_replan_count <= REPLAN_LIMIT`.

use soroban_sdk::{Address, Env, Vec};

use crate::context::PlatformContext;
use crate::schedule;
use crate::types::{
    Phase, PhaseSpec, ProjectConfig, ProjectState, ProjectStatus, ReplanProposal, Tick,
    Transition, BPS_DENOMINATOR, REPLAN_LIMIT,
};
use crate::voting::{Tally, VoteOutcome, VotePolicy};
use crate::Error;

/// Apply every time-eligible transition at `ctx.now`.
pub fn advance(
    env: &Env,
    config: &ProjectConfig,
    state: &mut ProjectState,
    ctx: &PlatformContext,
) -> Result<Vec<Transition>, Error> {
    let mut out = Vec::new(env);
    advance_into(env, config, state, ctx, &mut out)?;
    Ok(out)
}

pub fn advance_into(
    env: &Env,
    config: &ProjectConfig,
    state: &mut ProjectState,
    ctx: &PlatformContext,
    out: &mut Vec<Transition>,
) -> Result<(), Error> {
    while step(env, config, state, ctx, out)? {}
    Ok(())
}

fn move_to(state: &mut ProjectState, to: ProjectStatus, out: &mut Vec<Transition>) {
    let from = state.status;
    state.status = to;
    out.push_back(Transition::Moved(from, to, state.current_phase_index));
}

fn current_phase(state: &ProjectState) -> Result<Phase, Error> {
    state
        .phases
        .get(state.current_phase_index)
        .ok_or(Error::WrongPhase)
}

/// One transition, if any is due. Returns whether the state changed.
fn step(
    env: &Env,
    config: &ProjectConfig,
    state: &mut ProjectState,
    ctx: &PlatformContext,
    out: &mut Vec<Transition>,
) -> Result<bool, Error> {
    let now = ctx.now;
    let platform = &ctx.config;

    match state.status {
        ProjectStatus::PendingAudit => {
            if now < config.created_at.saturating_add(platform.audit_window) {
                return Ok(false);
            }
            move_to(state, ProjectStatus::AuditRejected, out);
        }
        ProjectStatus::AwaitingRaiseStart => {
            if now < config.raise_start {
                return Ok(false);
            }
            move_to(state, ProjectStatus::Raising, out);
        }
        ProjectStatus::Raising => {
            if now < config.raise_end {
                return Ok(false);
            }
            if state.total_invested >= config.min_raise {
                move_to(state, ProjectStatus::RaiseSucceeded, out);
            } else {
                state.refunded_total = state.total_invested;
                out.push_back(Transition::RefundAll);
                move_to(state, ProjectStatus::RaiseFailed, out);
            }
        }
        ProjectStatus::RaiseSucceeded => {
            if now < config.raise_end.saturating_add(platform.insurance_window) {
                return Ok(false);
            }
            move_to(state, ProjectStatus::LiquidationReady, out);
        }
        ProjectStatus::PhaseActive => {
            let phase = current_phase(state)?;
            if now < phase.release_start {
                return Ok(false);
            }
            state.vote_episode += 1;
            move_to(state, ProjectStatus::PhaseVotingOpen, out);
        }
        ProjectStatus::PhaseVotingOpen => {
            let phase = current_phase(state)?;
            if now < phase.release_end {
                return Ok(false);
            }
            let outcome = phase_tally(state, &phase).outcome(VotePolicy::SilenceApproves);
            resolve_phase(state, ctx, outcome, phase.release_end, out)?;
        }
        ProjectStatus::PhaseDenied | ProjectStatus::ReplanWindowOpen => {
            if now < state.replan_deadline {
                return Ok(false);
            }
            move_to(state, ProjectStatus::LiquidationReady, out);
        }
        ProjectStatus::ReplanProposed => {
            move_to(state, ProjectStatus::ReplanVoting, out);
        }
        ProjectStatus::ReplanVoting => {
            let proposal = state.replan.clone().ok_or(Error::WrongStatus)?;
            let closes_at = proposal.proposed_at.saturating_add(platform.replan_vote_window);
            if now < closes_at {
                return Ok(false);
            }
            let outcome = replan_tally(state, &proposal).outcome(VotePolicy::SilenceDenies);
            resolve_replan(env, state, ctx, outcome, closes_at, out);
        }
        ProjectStatus::AwaitingRepayment => {
            if state.repay_deposited < amount_due(config, state, ctx)? {
                return Ok(false);
            }
            move_to(state, ProjectStatus::RepaymentFilled, out);
        }
        ProjectStatus::RepaymentFilled => {
            // Overdue interest keeps growing; a deposit can fall short again.
            if state.repay_deposited >= amount_due(config, state, ctx)? {
                return Ok(false);
            }
            move_to(state, ProjectStatus::AwaitingRepayment, out);
        }
        ProjectStatus::Created
        | ProjectStatus::LiquidationReady
        | ProjectStatus::AuditRejected
        | ProjectStatus::RaiseFailed
        | ProjectStatus::Liquidated
        | ProjectStatus::Repaid => return Ok(false),
    }
    Ok(true)
}

fn phase_tally(state: &ProjectState, phase: &Phase) -> Tally {
    Tally::new(
        phase.vote_weight_for,
        phase.vote_weight_against,
        state.total_invested,
    )
}

fn replan_tally(state: &ProjectState, proposal: &ReplanProposal) -> Tally {
    Tally::new(proposal.vote_weight_for, 0, state.total_invested)
}

/// Amount released when phase `index` is approved.
///
/// The last phase takes whatever principal is still in custody.
pub fn release_amount(state: &ProjectState, index: u32) -> Result<i128, Error> {
    let phase = state.phases.get(index).ok_or(Error::WrongPhase)?;
    if index + 1 >= state.phases.len() {
        return Ok(state.unreleased_balance());
    }
    let amount = state
        .total_invested
        .checked_mul(phase.percent_bps as i128)
        .ok_or(Error::Overflow)?
        / BPS_DENOMINATOR as i128;
    Ok(amount.min(state.unreleased_balance()))
}

fn resolve_phase(
    state: &mut ProjectState,
    ctx: &PlatformContext,
    outcome: VoteOutcome,
    at: Tick,
    out: &mut Vec<Transition>,
) -> Result<(), Error> {
    match outcome {
        VoteOutcome::Approved => {
            let index = state.current_phase_index;
            let amount = release_amount(state, index)?;
            state.released_total = state
                .released_total
                .checked_add(amount)
                .ok_or(Error::Overflow)?;
            out.push_back(Transition::Released(index, amount));
            state.current_phase_index = index + 1;
            if state.current_phase_index >= state.phases.len() {
                move_to(state, ProjectStatus::AwaitingRepayment, out);
            } else {
                move_to(state, ProjectStatus::PhaseActive, out);
            }
        }
        VoteOutcome::Denied => {
            state.denied_at = at;
            state.replan_deadline = at.saturating_add(ctx.config.replan_window);
            move_to(state, ProjectStatus::PhaseDenied, out);
        }
    }
    Ok(())
}

fn resolve_replan(
    env: &Env,
    state: &mut ProjectState,
    ctx: &PlatformContext,
    outcome: VoteOutcome,
    at: Tick,
    out: &mut Vec<Transition>,
) {
    let proposal = state.replan.take();
    match (outcome, proposal) {
        (VoteOutcome::Approved, Some(proposal)) => {
            state.phases = schedule::splice(
                env,
                &state.phases,
                state.current_phase_index,
                &proposal.new_phases,
            );
            move_to(state, ProjectStatus::PhaseActive, out);
        }
        _ => {
            state.failed_replan_count += 1;
            out.push_back(Transition::ReplanRejected(state.failed_replan_count));
            if state.failed_replan_count >= REPLAN_LIMIT {
                move_to(state, ProjectStatus::LiquidationReady, out);
            } else {
                state.replan_deadline = at.saturating_add(ctx.config.replan_window);
                move_to(state, ProjectStatus::ReplanWindowOpen, out);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────
// Operations
// ─────────────────────────────────────────────────────────

/// Hand a freshly built project to the committee.
pub fn submit_for_audit(state: &mut ProjectState, out: &mut Vec<Transition>) -> Result<(), Error> {
    if state.status != ProjectStatus::Created {
        return Err(Error::WrongStatus);
    }
    move_to(state, ProjectStatus::PendingAudit, out);
    Ok(())
}

/// Apply the committee's verdict. An approval may override the insurance rate.
pub fn audit(
    state: &mut ProjectState,
    approve: bool,
    insurance_rate_bps: Option<u32>,
    out: &mut Vec<Transition>,
) -> Result<(), Error> {
    if state.status != ProjectStatus::PendingAudit {
        return Err(Error::WrongStatus);
    }
    if !approve {
        move_to(state, ProjectStatus::AuditRejected, out);
        return Ok(());
    }
    if let Some(rate) = insurance_rate_bps {
        if rate > BPS_DENOMINATOR {
            return Err(Error::InvalidRate);
        }
        state.insurance_rate_bps = rate;
    }
    move_to(state, ProjectStatus::AwaitingRaiseStart, out);
    Ok(())
}

/// Accept `amount` into the raise.
pub fn invest(config: &ProjectConfig, state: &mut ProjectState, amount: i128) -> Result<(), Error> {
    if state.status != ProjectStatus::Raising {
        return Err(Error::RaiseNotOpen);
    }
    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }
    let total = state
        .total_invested
        .checked_add(amount)
        .ok_or(Error::Overflow)?;
    if total > config.max_raise {
        return Err(Error::ExceedsMaxRaise);
    }
    state.total_invested = total;
    Ok(())
}

/// Insurance owed in investment-token units, before oracle conversion.
pub fn insurance_base(config: &ProjectConfig, state: &ProjectState) -> Result<i128, Error> {
    Ok(config
        .max_raise
        .checked_mul(state.insurance_rate_bps as i128)
        .ok_or(Error::Overflow)?
        / BPS_DENOMINATOR as i128)
}

/// Record a paid insurance deposit and start the first phase.
pub fn pay_insurance(
    state: &mut ProjectState,
    paid: i128,
    out: &mut Vec<Transition>,
) -> Result<(), Error> {
    match state.status {
        ProjectStatus::RaiseSucceeded => {}
        ProjectStatus::Created
        | ProjectStatus::PendingAudit
        | ProjectStatus::AwaitingRaiseStart
        | ProjectStatus::Raising => return Err(Error::NotReadyForInsurance),
        _ => return Err(Error::WrongStatus),
    }
    state.insurance_paid = paid;
    move_to(state, ProjectStatus::PhaseActive, out);
    Ok(())
}

/// Whether ballots on `phase_index` are being accepted right now.
pub fn check_phase_ballot(state: &ProjectState, phase_index: u32) -> Result<(), Error> {
    if state.status != ProjectStatus::PhaseVotingOpen {
        return Err(Error::VotingClosed);
    }
    if phase_index != state.current_phase_index {
        return Err(Error::WrongPhase);
    }
    Ok(())
}

/// Record a stake-weighted phase vote from an investor holding `weight`.
pub fn vote_phase(
    state: &mut ProjectState,
    ctx: &PlatformContext,
    phase_index: u32,
    weight: i128,
    in_favor: bool,
    out: &mut Vec<Transition>,
) -> Result<(), Error> {
    check_phase_ballot(state, phase_index)?;
    if weight <= 0 {
        return Err(Error::NotInvestor);
    }

    let mut phase = current_phase(state)?;
    if in_favor {
        phase.vote_weight_for = phase.vote_weight_for.checked_add(weight).ok_or(Error::Overflow)?;
    } else {
        phase.vote_weight_against = phase
            .vote_weight_against
            .checked_add(weight)
            .ok_or(Error::Overflow)?;
    }
    state.phases.set(phase_index, phase.clone());

    if let Some(outcome) = phase_tally(state, &phase).decisive(VotePolicy::SilenceApproves) {
        resolve_phase(state, ctx, outcome, ctx.now, out)?;
    }
    Ok(())
}

/// Whether `caller` may submit a replan for this project.
pub fn can_replan(config: &ProjectConfig, caller: &Address) -> bool {
    config.owner == *caller || config.replan_grants.contains(caller)
}

/// Open a replan vote on `new_phases`, which replace the schedule from the
/// current phase onward.
pub fn propose_replan(
    env: &Env,
    state: &mut ProjectState,
    proposer: &Address,
    new_phases: Vec<PhaseSpec>,
    now: Tick,
    out: &mut Vec<Transition>,
) -> Result<(), Error> {
    match state.status {
        ProjectStatus::PhaseDenied | ProjectStatus::ReplanWindowOpen => {}
        _ if state.failed_replan_count >= REPLAN_LIMIT => return Err(Error::RetryLimitExceeded),
        _ => return Err(Error::WrongStatus),
    }
    schedule::check_replan(
        env,
        &state.phases,
        state.current_phase_index,
        &new_phases,
        now,
    )?;

    state.vote_episode += 1;
    state.replan = Some(ReplanProposal {
        proposer: proposer.clone(),
        new_phases,
        proposed_at: now,
        vote_weight_for: 0,
    });
    move_to(state, ProjectStatus::ReplanProposed, out);
    Ok(())
}

pub fn check_replan_ballot(state: &ProjectState) -> Result<(), Error> {
    if !matches!(
        state.status,
        ProjectStatus::ReplanProposed | ProjectStatus::ReplanVoting
    ) {
        return Err(Error::VotingClosed);
    }
    Ok(())
}

/// Record support for the open replan.
pub fn vote_for_replan(
    env: &Env,
    state: &mut ProjectState,
    ctx: &PlatformContext,
    weight: i128,
    out: &mut Vec<Transition>,
) -> Result<(), Error> {
    check_replan_ballot(state)?;
    if weight <= 0 {
        return Err(Error::NotInvestor);
    }
    let mut proposal = state.replan.clone().ok_or(Error::WrongStatus)?;
    proposal.vote_weight_for = proposal
        .vote_weight_for
        .checked_add(weight)
        .ok_or(Error::Overflow)?;
    let tally = replan_tally(state, &proposal);
    state.replan = Some(proposal);

    if let Some(outcome) = tally.decisive(VotePolicy::SilenceDenies) {
        resolve_replan(env, state, ctx, outcome, ctx.now, out);
    }
    Ok(())
}

/// Simple interest on the principal.
///
/// Accrues up to `repay_deadline` when repaid on time and up to `now` when late.
pub fn interest(config: &ProjectConfig, state: &ProjectState, ctx: &PlatformContext) -> Result<i128, Error> {
    let until = if ctx.now <= config.repay_deadline {
        config.repay_deadline
    } else {
        ctx.now
    };
    let elapsed = until.saturating_sub(config.raise_end) as i128;
    let denominator = (BPS_DENOMINATOR as i128)
        .checked_mul(ctx.config.ticks_per_year as i128)
        .filter(|d| *d > 0)
        .ok_or(Error::Overflow)?;
    state
        .total_invested
        .checked_mul(config.profit_rate_bps as i128)
        .and_then(|v| v.checked_mul(elapsed))
        .map(|v| v / denominator)
        .ok_or(Error::Overflow)
}

/// Principal plus interest owed at `ctx.now`.
pub fn amount_due(config: &ProjectConfig, state: &ProjectState, ctx: &PlatformContext) -> Result<i128, Error> {
    state
        .total_invested
        .checked_add(interest(config, state, ctx)?)
        .ok_or(Error::Overflow)
}

/// Record an owner deposit towards repayment.
pub fn fill_repay(
    config: &ProjectConfig,
    state: &mut ProjectState,
    ctx: &PlatformContext,
    amount: i128,
    out: &mut Vec<Transition>,
) -> Result<(), Error> {
    if !matches!(
        state.status,
        ProjectStatus::AwaitingRepayment | ProjectStatus::RepaymentFilled
    ) {
        return Err(Error::WrongStatus);
    }
    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }
    state.repay_deposited = state
        .repay_deposited
        .checked_add(amount)
        .ok_or(Error::Overflow)?;
    if state.status == ProjectStatus::AwaitingRepayment
        && state.repay_deposited >= amount_due(config, state, ctx)?
    {
        move_to(state, ProjectStatus::RepaymentFilled, out);
    }
    Ok(())
}

/// Close out a filled repayment. Returns the interest owed to investors;
/// the caller records `repaid_total` once the payout pass has run.
pub fn repay(
    config: &ProjectConfig,
    state: &mut ProjectState,
    ctx: &PlatformContext,
    out: &mut Vec<Transition>,
) -> Result<i128, Error> {
    if !matches!(
        state.status,
        ProjectStatus::AwaitingRepayment | ProjectStatus::RepaymentFilled
    ) {
        return Err(Error::WrongStatus);
    }
    let interest = interest(config, state, ctx)?;
    let due = state
        .total_invested
        .checked_add(interest)
        .ok_or(Error::Overflow)?;
    if state.repay_deposited < due {
        return Err(Error::InsufficientCustodyBalance);
    }
    move_to(state, ProjectStatus::Repaid, out);
    Ok(interest)
}

/// Close out a liquidation. Returns the unreleased balance to distribute.
pub fn liquidate(state: &mut ProjectState, out: &mut Vec<Transition>) -> Result<i128, Error> {
    if state.status != ProjectStatus::LiquidationReady {
        return Err(Error::WrongStatus);
    }
    let unreleased = state.unreleased_balance();
    move_to(state, ProjectStatus::Liquidated, out);
    Ok(unreleased)
}
