//! # Phased Funding Contract
//!
//! A crowdfunding / lending platform where investors fund a project owner's
//! campaign and the raised capital is released in time-windowed *phases*,
//! gated by a one-time insurance deposit and stake-weighted investor vetoes.
//!
//! | Stage        | Entry Point(s)                                                    |
//! |--------------|-------------------------------------------------------------------|
//! | Bootstrap    | [`PhasedFunding::init`]                                           |
//! | Role admin   | `grant_role`, `revoke_role`, `transfer_super_admin`               |
//! | Platform     | `set_template`, `set_price_feed`, `set_tokens`                    |
//! | Creation     | [`PhasedFunding::new_project`], `audit_project`                   |
//! | Raising      | `invest`, `pay_insurance`                                         |
//! | Releases     | `heartbeat`, `vote_phase`, `vote_against_phase`                   |
//! | Replanning   | `replan`, `vote_for_replan`                                       |
//! | Settlement   | `fill_repay_tokens`, `repay`, `liquidate`                         |
//! | Queries      | `get_project`, `status`, `current_phase`, `failed_replan_count`, `stake_of`, `insurance_quote`, `repay_quote`, `platform_config`, `template_of`, `role_of`, `has_role` |
//!
//! ## Architecture
//!
//! Authorization is delegated to [`rbac`], storage to [`storage`], the state
//! machine to [`lifecycle`] and token movement to [`custody`]. [`registry`]
//! wires them together per call. This file contains **only** the public entry
//! points and the error taxonomy.
//!
//! Time is the ledger sequence number. Nothing happens on its own: every
//! mutating call (and the permissionless [`PhasedFunding::heartbeat`]) first
//! applies all transitions that are due.

#![no_std]

use soroban_sdk::{contract, contracterror, contractimpl, Address, BytesN, Env, String, Vec};

mod context;
mod custody;
pub mod events;
mod lifecycle;
mod oracle;
pub mod rbac;
mod registry;
mod schedule;
mod storage;
pub mod types;
mod voting;

#[cfg(test)]
mod test_events;
#[cfg(test)]
mod test_registry;
#[cfg(test)]
mod test_replan;
#[cfg(test)]
mod test_voting;

pub use oracle::{PriceOracle, PriceOracleClient};
pub use rbac::Role;
pub use types::{
    Phase, PhaseSpec, PlatformConfig, Project, ProjectInit, ProjectStatus, ReplanProposal,
    TemplateKind,
};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized         = 1,
    NotInitialized             = 2,
    NotAuthorized              = 3,
    NoReplanAuth               = 4,
    UnknownTemplate            = 5,
    UnknownProject             = 6,
    DuplicateProjectId         = 7,
    WrongStatus                = 8,
    RaiseNotOpen               = 9,
    ExceedsMaxRaise            = 10,
    InvalidAmount              = 11,
    NotReadyForInsurance       = 12,
    AuditWindowClosed          = 13,
    NotInvestor                = 14,
    WrongPhase                 = 15,
    VotingClosed               = 16,
    AlreadyVoted               = 17,
    InvalidPhaseSchedule       = 18,
    PercentSumMismatch         = 19,
    InvalidRaiseBounds         = 20,
    InvalidRaiseWindow         = 21,
    InvalidRate                = 22,
    InvalidConfig              = 23,
    InsufficientBalance        = 24,
    InsufficientCustodyBalance = 25,
    RetryLimitExceeded         = 26,
    Overflow                   = 27,
    InvalidQuote               = 28,
}

/// Coarse error classes callers can branch on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    PreconditionViolation,
    AuthorizationDenied,
    InvariantViolation,
    InsufficientFunds,
    AlreadyVoted,
    RetryLimitExceeded,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotAuthorized | Error::NoReplanAuth => ErrorKind::AuthorizationDenied,
            Error::InvalidPhaseSchedule
            | Error::PercentSumMismatch
            | Error::InvalidRaiseBounds
            | Error::InvalidRaiseWindow
            | Error::InvalidRate
            | Error::InvalidConfig
            | Error::Overflow
            | Error::InvalidQuote => ErrorKind::InvariantViolation,
            Error::InsufficientBalance | Error::InsufficientCustodyBalance => {
                ErrorKind::InsufficientFunds
            }
            Error::AlreadyVoted => ErrorKind::AlreadyVoted,
            Error::RetryLimitExceeded => ErrorKind::RetryLimitExceeded,
            Error::AlreadyInitialized
            | Error::NotInitialized
            | Error::UnknownTemplate
            | Error::UnknownProject
            | Error::DuplicateProjectId
            | Error::WrongStatus
            | Error::RaiseNotOpen
            | Error::ExceedsMaxRaise
            | Error::InvalidAmount
            | Error::NotReadyForInsurance
            | Error::AuditWindowClosed
            | Error::NotInvestor
            | Error::WrongPhase
            | Error::VotingClosed => ErrorKind::PreconditionViolation,
        }
    }
}

#[contract]
pub struct PhasedFunding;

#[contractimpl]
impl PhasedFunding {
    // ─────────────────────────────────────────────────────────
    // Initialisation
    // ─────────────────────────────────────────────────────────

    /// Initialise the platform and set the first SuperAdmin.
    ///
    /// Must be called exactly once immediately after deployment.
    pub fn init(env: Env, super_admin: Address, config: PlatformConfig) -> Result<(), Error> {
        super_admin.require_auth();
        registry::init(&env, &super_admin, config)
    }

    // ─────────────────────────────────────────────────────────
    // Role management
    // ─────────────────────────────────────────────────────────

    /// Grant `role` to `target`. Only a SuperAdmin can grant `SuperAdmin`.
    pub fn grant_role(env: Env, caller: Address, target: Address, role: Role) -> Result<(), Error> {
        caller.require_auth();
        rbac::grant_role(&env, &caller, &target, role)
    }

    /// Revoke any role from `target`. The SuperAdmin can only be replaced via
    /// `transfer_super_admin`.
    pub fn revoke_role(env: Env, caller: Address, target: Address) -> Result<(), Error> {
        caller.require_auth();
        rbac::revoke_role(&env, &caller, &target)
    }

    pub fn transfer_super_admin(
        env: Env,
        current_super_admin: Address,
        new_super_admin: Address,
    ) -> Result<(), Error> {
        current_super_admin.require_auth();
        rbac::transfer_super_admin(&env, &current_super_admin, &new_super_admin)
    }

    pub fn role_of(env: Env, address: Address) -> Option<Role> {
        rbac::get_role(&env, &address)
    }

    pub fn has_role(env: Env, address: Address, role: Role) -> bool {
        rbac::has_role(&env, &address, &role)
    }

    // ─────────────────────────────────────────────────────────
    // Platform configuration
    // ─────────────────────────────────────────────────────────

    pub fn set_template(
        env: Env,
        caller: Address,
        template_id: u32,
        kind: TemplateKind,
    ) -> Result<(), Error> {
        caller.require_auth();
        registry::set_template(&env, &caller, template_id, kind)
    }

    pub fn template_of(env: Env, template_id: u32) -> Option<TemplateKind> {
        storage::get_template(&env, template_id)
    }

    pub fn set_price_feed(env: Env, caller: Address, feed: Address) -> Result<(), Error> {
        caller.require_auth();
        registry::set_price_feed(&env, &caller, feed)
    }

    /// Switch the tokens used by projects created from now on.
    pub fn set_tokens(
        env: Env,
        caller: Address,
        fee_token: Address,
        investment_token: Address,
    ) -> Result<(), Error> {
        caller.require_auth();
        registry::set_tokens(&env, &caller, fee_token, investment_token)
    }

    pub fn platform_config(env: Env) -> Result<PlatformConfig, Error> {
        storage::get_platform(&env).ok_or(Error::NotInitialized)
    }

    // ─────────────────────────────────────────────────────────
    // Creation and audit
    // ─────────────────────────────────────────────────────────

    /// Create a project from a registered template.
    ///
    /// `creator` pays the creation fee (`max_raise` quoted in the fee token)
    /// and must have approved the contract to spend it. The project starts in
    /// `PendingAudit`.
    pub fn new_project(
        env: Env,
        creator: Address,
        template_id: u32,
        project_id: BytesN<32>,
        max_raise: i128,
        metadata: String,
        init: ProjectInit,
    ) -> Result<Project, Error> {
        creator.require_auth();
        registry::new_project(&env, &creator, template_id, project_id, max_raise, metadata, init)
    }

    /// Committee verdict. An approval may override the insurance rate.
    pub fn audit_project(
        env: Env,
        caller: Address,
        project_id: BytesN<32>,
        approve: bool,
        insurance_rate_bps: Option<u32>,
    ) -> Result<(), Error> {
        caller.require_auth();
        registry::audit_project(&env, &caller, &project_id, approve, insurance_rate_bps)
    }

    // ─────────────────────────────────────────────────────────
    // Raising
    // ─────────────────────────────────────────────────────────

    pub fn invest(env: Env, investor: Address, project_id: BytesN<32>, amount: i128) -> Result<(), Error> {
        investor.require_auth();
        registry::invest(&env, &investor, &project_id, amount)
    }

    /// Owner posts the insurance deposit; returns the fee-token amount paid.
    pub fn pay_insurance(env: Env, project_id: BytesN<32>) -> Result<i128, Error> {
        registry::pay_insurance(&env, &project_id)
    }

    /// Apply every transition that is due. Callable by anyone.
    pub fn heartbeat(env: Env, project_id: BytesN<32>) -> Result<ProjectStatus, Error> {
        registry::heartbeat(&env, &project_id)
    }

    // ─────────────────────────────────────────────────────────
    // Voting and replanning
    // ─────────────────────────────────────────────────────────

    pub fn vote_phase(
        env: Env,
        investor: Address,
        project_id: BytesN<32>,
        phase_index: u32,
        in_favor: bool,
    ) -> Result<(), Error> {
        investor.require_auth();
        registry::vote_phase(&env, &investor, &project_id, phase_index, in_favor)
    }

    pub fn vote_against_phase(
        env: Env,
        investor: Address,
        project_id: BytesN<32>,
        phase_index: u32,
    ) -> Result<(), Error> {
        investor.require_auth();
        registry::vote_phase(&env, &investor, &project_id, phase_index, false)
    }

    /// Submit a replacement for the schedule from the current phase onward.
    pub fn replan(
        env: Env,
        caller: Address,
        project_id: BytesN<32>,
        new_phases: Vec<PhaseSpec>,
    ) -> Result<(), Error> {
        caller.require_auth();
        registry::replan(&env, &caller, &project_id, new_phases)
    }

    pub fn vote_for_replan(env: Env, investor: Address, project_id: BytesN<32>) -> Result<(), Error> {
        investor.require_auth();
        registry::vote_for_replan(&env, &investor, &project_id)
    }

    // ─────────────────────────────────────────────────────────
    // Settlement
    // ─────────────────────────────────────────────────────────

    /// Owner deposits investment tokens towards principal plus interest.
    pub fn fill_repay_tokens(env: Env, project_id: BytesN<32>, amount: i128) -> Result<(), Error> {
        registry::fill_repay_tokens(&env, &project_id, amount)
    }

    pub fn repay(env: Env, project_id: BytesN<32>) -> Result<(), Error> {
        registry::repay(&env, &project_id)
    }

    pub fn liquidate(env: Env, project_id: BytesN<32>) -> Result<(), Error> {
        registry::liquidate(&env, &project_id)
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub fn get_project(env: Env, project_id: BytesN<32>) -> Result<Project, Error> {
        storage::load_project(&env, &project_id)
    }

    pub fn status(env: Env, project_id: BytesN<32>) -> Result<ProjectStatus, Error> {
        Ok(storage::load_project_state(&env, &project_id)?.status)
    }

    pub fn current_phase(env: Env, project_id: BytesN<32>) -> Result<u32, Error> {
        Ok(storage::load_project_state(&env, &project_id)?.current_phase_index)
    }

    pub fn failed_replan_count(env: Env, project_id: BytesN<32>) -> Result<u32, Error> {
        Ok(storage::load_project_state(&env, &project_id)?.failed_replan_count)
    }

    pub fn stake_of(env: Env, project_id: BytesN<32>, investor: Address) -> i128 {
        storage::get_stake(&env, &project_id, &investor)
    }

    pub fn insurance_quote(env: Env, project_id: BytesN<32>) -> Result<i128, Error> {
        registry::insurance_quote(&env, &project_id)
    }

    pub fn repay_quote(env: Env, project_id: BytesN<32>) -> Result<i128, Error> {
        registry::repay_quote(&env, &project_id)
    }
}
