//! # Types
//!
//! Shared data structures used across all modules of the phased funding
//! platform.
//!
//! ## Design decisions
//!
//! ### Config / State split
//!
//! A project is internally stored as two separate ledger entries:
//!
//! - [`ProjectConfig`]: written once by the template factory; never mutated.
//! - [`ProjectState`]: written by every operation that moves the lifecycle.
//!
//! Investor stakes and votes live in their own per-address entries so that the
//! state entry stays small even for projects with many investors. The public
//! API exposes the reconstructed [`Project`] struct for convenience.
//!
//! ### Status as a Finite-State Machine
//!
//! ```text
//! Created ─► PendingAudit ─┬─► AuditRejected
//!                          └─► AwaitingRaiseStart ─► Raising ─┬─► RaiseFailed
//!                                                             └─► RaiseSucceeded
//! RaiseSucceeded ─► PhaseActive ◄─► PhaseVotingOpen ─┬─► (approved) PhaseActive / AwaitingRepayment
//!                                                   └─► PhaseDenied
//! PhaseDenied / ReplanWindowOpen ─┬─► ReplanProposed ─► ReplanVoting ─┬─► PhaseActive
//!                                 │                                   └─► ReplanWindowOpen / LiquidationReady
//!                                 └─► (replan deadline) LiquidationReady ─► Liquidated
//! AwaitingRepayment ─► RepaymentFilled ─► Repaid
//! ```
//!
//! `AuditRejected`, `RaiseFailed`, `Liquidated` and `Repaid` are terminal.

use soroban_sdk::{contracttype, Address, BytesN, String, Vec};

/// External monotonic counter driving every window check (ledger sequence).
pub type Tick = u32;

/// Basis-point denominator used for percentages and rates.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Failed replan votes tolerated before the project is forced into liquidation.
pub const REPLAN_LIMIT: u32 = 2;

/// Minimum number of phases in a `Phased` template schedule.
pub const MIN_PHASED_PHASES: u32 = 2;

/// Lifecycle status of a project.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProjectStatus {
    /// Built by the template factory, not yet registered for audit.
    Created,
    /// Waiting for the committee; fails once the audit window elapses.
    PendingAudit,
    /// Committee denied the project or never audited it in time.
    AuditRejected,
    /// Audited; raise window not yet open.
    AwaitingRaiseStart,
    /// Accepting investments.
    Raising,
    /// Raise window closed below `min_raise`; investors were refunded.
    RaiseFailed,
    /// Raise met `min_raise`; waiting for the owner's insurance deposit.
    RaiseSucceeded,
    /// Waiting for the current phase's release window to open.
    PhaseActive,
    /// Current phase window is open; investors may vote.
    PhaseVotingOpen,
    /// Current phase was vetoed; the first replan window is open.
    PhaseDenied,
    /// A replan vote failed and the window was re-opened.
    ReplanWindowOpen,
    /// A replacement schedule was submitted.
    ReplanProposed,
    /// Investors vote on the submitted schedule.
    ReplanVoting,
    /// Unreleased custody balance waits for the pro-rata refund pass.
    LiquidationReady,
    /// Refund pass done.
    Liquidated,
    /// Every phase released; waiting for the owner to deposit principal + interest.
    AwaitingRepayment,
    /// Owner deposit covers principal + interest.
    RepaymentFilled,
    /// Investors repaid.
    Repaid,
}

impl ProjectStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProjectStatus::AuditRejected
                | ProjectStatus::RaiseFailed
                | ProjectStatus::Liquidated
                | ProjectStatus::Repaid
        )
    }
}

/// Project template variants known to the registry.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TemplateKind {
    /// Multi-phase release gated by investor veto, with replanning.
    Phased,
    /// Fixed raise released in full once insurance is posted.
    FullRelease,
}

/// A phase as submitted by the owner (at creation or in a replan).
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhaseSpec {
    pub release_start: Tick,
    pub release_end: Tick,
    /// Share of the raised principal released when approved.
    pub percent_bps: u32,
}

/// A scheduled phase with its stake-weighted tallies for the current episode.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Phase {
    pub release_start: Tick,
    pub release_end: Tick,
    pub percent_bps: u32,
    pub vote_weight_for: i128,
    pub vote_weight_against: i128,
}

impl From<PhaseSpec> for Phase {
    fn from(spec: PhaseSpec) -> Self {
        Phase {
            release_start: spec.release_start,
            release_end: spec.release_end,
            percent_bps: spec.percent_bps,
            vote_weight_for: 0,
            vote_weight_against: 0,
        }
    }
}

/// Creation payload handed to the template factory.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectInit {
    pub owner: Address,
    pub raise_start: Tick,
    pub raise_end: Tick,
    pub min_raise: i128,
    pub repay_deadline: Tick,
    /// Annualized simple-interest rate on the principal.
    pub profit_rate_bps: u32,
    /// Share of `max_raise` posted as insurance (fee-token denominated).
    pub insurance_rate_bps: u32,
    /// Must be empty for `FullRelease`.
    pub phases: Vec<PhaseSpec>,
    pub replan_grants: Vec<Address>,
}

/// Outstanding replacement schedule. At most one exists at a time.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplanProposal {
    pub proposer: Address,
    /// Replacement tail starting at `current_phase_index`.
    pub new_phases: Vec<PhaseSpec>,
    pub proposed_at: Tick,
    pub vote_weight_for: i128,
}

/// Immutable project configuration, written once at creation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectConfig {
    pub id: BytesN<32>,
    pub template_id: u32,
    pub kind: TemplateKind,
    pub owner: Address,
    pub metadata: String,
    pub min_raise: i128,
    pub max_raise: i128,
    pub raise_start: Tick,
    pub raise_end: Tick,
    pub repay_deadline: Tick,
    pub profit_rate_bps: u32,
    pub replan_grants: Vec<Address>,
    /// Token snapshot taken at creation; later `set_tokens` never re-denominates custody.
    pub investment_token: Address,
    pub fee_token: Address,
    pub created_at: Tick,
}

/// Mutable project state.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectState {
    pub status: ProjectStatus,
    pub phases: Vec<Phase>,
    pub current_phase_index: u32,
    pub total_invested: i128,
    pub released_total: i128,
    pub refunded_total: i128,
    pub repaid_total: i128,
    pub repay_deposited: i128,
    pub insurance_rate_bps: u32,
    pub insurance_paid: i128,
    pub failed_replan_count: u32,
    /// Bumped whenever a phase or replan vote opens; votes are keyed by it.
    pub vote_episode: u32,
    pub denied_at: Tick,
    pub replan_deadline: Tick,
    pub replan: Option<ReplanProposal>,
}

impl ProjectState {
    /// Principal still held in custody for this project.
    pub fn unreleased_balance(&self) -> i128 {
        self.total_invested - self.released_total - self.refunded_total
    }
}

/// Full representation of a project, reconstructed from config + state.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Project {
    pub id: BytesN<32>,
    pub template_id: u32,
    pub kind: TemplateKind,
    pub owner: Address,
    pub metadata: String,
    pub min_raise: i128,
    pub max_raise: i128,
    pub raise_start: Tick,
    pub raise_end: Tick,
    pub repay_deadline: Tick,
    pub profit_rate_bps: u32,
    pub insurance_rate_bps: u32,
    pub replan_grants: Vec<Address>,
    pub investment_token: Address,
    pub fee_token: Address,
    pub created_at: Tick,
    pub status: ProjectStatus,
    pub phases: Vec<Phase>,
    pub current_phase_index: u32,
    pub total_invested: i128,
    pub released_total: i128,
    pub refunded_total: i128,
    pub repaid_total: i128,
    pub repay_deposited: i128,
    pub insurance_paid: i128,
    pub failed_replan_count: u32,
    pub investor_count: u32,
    pub replan: Option<ReplanProposal>,
}

/// Platform-wide settings, kept in instance storage.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlatformConfig {
    pub fee_token: Address,
    pub investment_token: Address,
    pub price_feed: Address,
    /// Receives creation fees and insurance deposits.
    pub fee_receiver: Address,
    pub audit_window: u32,
    pub insurance_window: u32,
    pub replan_window: u32,
    pub replan_vote_window: u32,
    pub ticks_per_year: u32,
}

/// One observable effect of the lifecycle engine.
///
/// The engine only mutates [`ProjectState`]; fund movement and event emission
/// for each transition happen afterwards in [`crate::custody::settle`].
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Transition {
    /// Stored status moved `from -> to`, with the phase index right after the move.
    Moved(ProjectStatus, ProjectStatus, u32),
    /// Phase `index` approved; `amount` is owed to the owner.
    Released(u32, i128),
    /// Raise failed; every investor is owed their full stake back.
    RefundAll,
    /// Replan vote failed; carries the counter after the bump.
    ReplanRejected(u32),
}
