//! # Storage
//!
//! Provides typed helpers over Soroban's two storage tiers used by the
//! platform:
//!
//! ## Instance storage (contract-lifetime TTL)
//!
//! | Key              | Type             | Description                          |
//! |------------------|------------------|--------------------------------------|
//! | `Platform`       | `PlatformConfig` | Tokens, price feed, windows          |
//! | `Template(id)`   | `TemplateKind`   | Registered project template variants |
//!
//! Instance TTL is bumped by **7 days** whenever it falls below 1 day remaining.
//!
//! ## Persistent storage (per-entry TTL)
//!
//! | Key                    | Type            | Description                        |
//! |------------------------|-----------------|------------------------------------|
//! | `ProjConfig(id)`       | `ProjectConfig` | Immutable project configuration    |
//! | `ProjState(id)`        | `ProjectState`  | Mutable lifecycle state            |
//! | `Investors(id)`        | `Vec<Address>`  | Investors in first-investment order|
//! | `Stake(id, addr)`      | `i128`          | Amount invested by `addr`          |
//! | `Vote(id, ep, addr)`   | `bool`          | Vote cast by `addr` in episode `ep`|
//!
//! Persistent TTL is bumped by **30 days** whenever it falls below 7 days remaining.
//!
//! ## Why split Config and State?
//!
//! Heartbeats, investments and votes rewrite the state entry on every call.
//! The configuration (owner, windows, metadata, grants) never changes after
//! creation, so keeping it apart keeps those frequent writes small.

use soroban_sdk::{contracttype, Address, BytesN, Env, Vec};

use crate::types::{PlatformConfig, Project, ProjectConfig, ProjectState, TemplateKind};
use crate::Error;

// ── TTL Constants ────────────────────────────────────────────────────

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;

/// Instance storage: bump by 7 days when below 1 day remaining.
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

/// Persistent storage: bump by 30 days when below 7 days remaining.
const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

// ── Storage Keys ─────────────────────────────────────────────────────

/// All contract storage keys (role keys live in `RbacKey` inside rbac.rs).
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    /// Platform configuration (Instance).
    Platform,
    /// Template id → variant (Instance).
    Template(u32),
    /// Immutable project configuration keyed by ID (Persistent).
    ProjConfig(BytesN<32>),
    /// Mutable project state keyed by ID (Persistent).
    ProjState(BytesN<32>),
    /// Investor list of a project (Persistent).
    Investors(BytesN<32>),
    /// Stake of one investor in one project (Persistent).
    Stake(BytesN<32>, Address),
    /// Vote of one investor in one voting episode (Persistent).
    Vote(BytesN<32>, u32, Address),
}

// ── Instance Storage Helpers ─────────────────────────────────────────

/// Extend instance storage TTL if it falls below the threshold.
fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

pub fn has_platform(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Platform)
}

pub fn set_platform(env: &Env, config: &PlatformConfig) {
    env.storage().instance().set(&DataKey::Platform, config);
    bump_instance(env);
}

/// Read the platform configuration, `None` before `init`.
pub fn get_platform(env: &Env) -> Option<PlatformConfig> {
    let config = env.storage().instance().get(&DataKey::Platform);
    if config.is_some() {
        bump_instance(env);
    }
    config
}

pub fn set_template(env: &Env, template_id: u32, kind: TemplateKind) {
    env.storage()
        .instance()
        .set(&DataKey::Template(template_id), &kind);
    bump_instance(env);
}

pub fn get_template(env: &Env, template_id: u32) -> Option<TemplateKind> {
    bump_instance(env);
    env.storage().instance().get(&DataKey::Template(template_id))
}

// ── Persistent Storage Helpers ───────────────────────────────────────

/// Extend the TTL for a persistent storage key.
fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

pub fn has_project(env: &Env, id: &BytesN<32>) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::ProjConfig(id.clone()))
}

/// Save both the immutable config and the initial state of a new project.
pub fn save_project(env: &Env, config: &ProjectConfig, state: &ProjectState) {
    let config_key = DataKey::ProjConfig(config.id.clone());
    env.storage().persistent().set(&config_key, config);
    bump_persistent(env, &config_key);
    save_project_state(env, &config.id, state);
}

/// Load only the immutable project configuration.
pub fn load_project_config(env: &Env, id: &BytesN<32>) -> Result<ProjectConfig, Error> {
    let key = DataKey::ProjConfig(id.clone());
    let config: ProjectConfig = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(Error::UnknownProject)?;
    bump_persistent(env, &key);
    Ok(config)
}

/// Load only the mutable project state.
pub fn load_project_state(env: &Env, id: &BytesN<32>) -> Result<ProjectState, Error> {
    let key = DataKey::ProjState(id.clone());
    let state: ProjectState = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(Error::UnknownProject)?;
    bump_persistent(env, &key);
    Ok(state)
}

/// Save only the mutable project state.
pub fn save_project_state(env: &Env, id: &BytesN<32>, state: &ProjectState) {
    let key = DataKey::ProjState(id.clone());
    env.storage().persistent().set(&key, state);
    bump_persistent(env, &key);
}

/// Load the full `Project` by combining config and state.
pub fn load_project(env: &Env, id: &BytesN<32>) -> Result<Project, Error> {
    let config = load_project_config(env, id)?;
    let state = load_project_state(env, id)?;
    let investor_count = load_investors(env, id).len();
    Ok(Project {
        id: config.id,
        template_id: config.template_id,
        kind: config.kind,
        owner: config.owner,
        metadata: config.metadata,
        min_raise: config.min_raise,
        max_raise: config.max_raise,
        raise_start: config.raise_start,
        raise_end: config.raise_end,
        repay_deadline: config.repay_deadline,
        profit_rate_bps: config.profit_rate_bps,
        insurance_rate_bps: state.insurance_rate_bps,
        replan_grants: config.replan_grants,
        investment_token: config.investment_token,
        fee_token: config.fee_token,
        created_at: config.created_at,
        status: state.status,
        phases: state.phases,
        current_phase_index: state.current_phase_index,
        total_invested: state.total_invested,
        released_total: state.released_total,
        refunded_total: state.refunded_total,
        repaid_total: state.repaid_total,
        repay_deposited: state.repay_deposited,
        insurance_paid: state.insurance_paid,
        failed_replan_count: state.failed_replan_count,
        investor_count,
        replan: state.replan,
    })
}

// ── Investors ────────────────────────────────────────────────────────

pub fn load_investors(env: &Env, id: &BytesN<32>) -> Vec<Address> {
    let key = DataKey::Investors(id.clone());
    match env.storage().persistent().get(&key) {
        Some(investors) => {
            bump_persistent(env, &key);
            investors
        }
        None => Vec::new(env),
    }
}

/// Amount invested by `investor`, `0` if they never invested.
pub fn get_stake(env: &Env, id: &BytesN<32>, investor: &Address) -> i128 {
    let key = DataKey::Stake(id.clone(), investor.clone());
    match env.storage().persistent().get(&key) {
        Some(stake) => {
            bump_persistent(env, &key);
            stake
        }
        None => 0,
    }
}

/// Add `amount` to the investor's stake, registering first-time investors.
///
/// Returns the stake after the addition.
pub fn add_stake(env: &Env, id: &BytesN<32>, investor: &Address, amount: i128) -> Result<i128, Error> {
    let current = get_stake(env, id, investor);
    if current == 0 {
        let list_key = DataKey::Investors(id.clone());
        let mut investors = load_investors(env, id);
        investors.push_back(investor.clone());
        env.storage().persistent().set(&list_key, &investors);
        bump_persistent(env, &list_key);
    }
    let updated = current.checked_add(amount).ok_or(Error::Overflow)?;
    let key = DataKey::Stake(id.clone(), investor.clone());
    env.storage().persistent().set(&key, &updated);
    bump_persistent(env, &key);
    Ok(updated)
}

// ── Votes ────────────────────────────────────────────────────────────

pub fn has_voted(env: &Env, id: &BytesN<32>, episode: u32, voter: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::Vote(id.clone(), episode, voter.clone()))
}

pub fn record_vote(env: &Env, id: &BytesN<32>, episode: u32, voter: &Address, in_favor: bool) {
    let key = DataKey::Vote(id.clone(), episode, voter.clone());
    env.storage().persistent().set(&key, &in_favor);
    bump_persistent(env, &key);
}
