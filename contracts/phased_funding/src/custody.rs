//! # Custody
//!
//! All token movement goes through this module. The contract holds one
//! balance per token for every project; the per-project share of it is
//! `ProjectState::unreleased_balance()` (plus any repayment deposit).
//!
//! Balances and allowances are checked before calling the token so that an
//! underfunded payer surfaces as [`Error::InsufficientBalance`] instead of a
//! host trap.

use soroban_sdk::{token, Address, Env, Vec};

use crate::events;
use crate::storage;
use crate::types::{ProjectConfig, ProjectState, Transition};
use crate::Error;

/// Move `amount` of `token` from `from` to `to`. `from` must have authorized the call.
pub fn transfer(
    env: &Env,
    token: &Address,
    from: &Address,
    to: &Address,
    amount: i128,
) -> Result<(), Error> {
    if amount <= 0 {
        return Ok(());
    }
    let client = token::Client::new(env, token);
    if client.balance(from) < amount {
        return Err(Error::InsufficientBalance);
    }
    client.transfer(from, to, &amount);
    Ok(())
}

/// Pull `amount` of `token` from `payer` to `to` against the contract's allowance.
pub fn transfer_from(
    env: &Env,
    token: &Address,
    payer: &Address,
    to: &Address,
    amount: i128,
) -> Result<(), Error> {
    if amount <= 0 {
        return Ok(());
    }
    let client = token::Client::new(env, token);
    let spender = env.current_contract_address();
    if client.balance(payer) < amount || client.allowance(payer, &spender) < amount {
        return Err(Error::InsufficientBalance);
    }
    client.transfer_from(&spender, payer, to, &amount);
    Ok(())
}

/// Pay out of the contract's own balance.
fn pay_out(env: &Env, token: &Address, to: &Address, amount: i128) -> Result<(), Error> {
    transfer(env, token, &env.current_contract_address(), to, amount)
}

/// Publish every transition and carry out the payouts it implies.
pub fn settle(
    env: &Env,
    config: &ProjectConfig,
    transitions: &Vec<Transition>,
) -> Result<(), Error> {
    for transition in transitions.iter() {
        match transition {
            Transition::Moved(from, to, phase_index) => {
                events::emit_status_changed(env, config.id.clone(), from, to, phase_index);
            }
            Transition::Released(phase_index, amount) => {
                pay_out(env, &config.investment_token, &config.owner, amount)?;
                events::emit_phase_released(
                    env,
                    config.id.clone(),
                    phase_index,
                    config.owner.clone(),
                    amount,
                );
            }
            Transition::RefundAll => {
                refund_all(env, config)?;
            }
            Transition::ReplanRejected(count) => {
                events::emit_replan_failed(env, config.id.clone(), count);
            }
        }
    }
    Ok(())
}

/// Return every investor's full stake.
fn refund_all(env: &Env, config: &ProjectConfig) -> Result<(), Error> {
    for investor in storage::load_investors(env, &config.id).iter() {
        let stake = storage::get_stake(env, &config.id, &investor);
        pay_out(env, &config.investment_token, &investor, stake)?;
        events::emit_refunded(env, config.id.clone(), investor, stake);
    }
    Ok(())
}

/// Pay each investor `stake * unreleased / total_invested`.
///
/// Returns the amount actually paid; rounding dust stays in custody.
pub fn liquidate(
    env: &Env,
    config: &ProjectConfig,
    total_invested: i128,
    unreleased: i128,
) -> Result<i128, Error> {
    if total_invested <= 0 || unreleased <= 0 {
        return Ok(0);
    }
    let mut paid: i128 = 0;
    for investor in storage::load_investors(env, &config.id).iter() {
        let stake = storage::get_stake(env, &config.id, &investor);
        let share = stake
            .checked_mul(unreleased)
            .ok_or(Error::Overflow)?
            / total_invested;
        pay_out(env, &config.investment_token, &investor, share)?;
        events::emit_refunded(env, config.id.clone(), investor, share);
        paid += share;
    }
    Ok(paid)
}

/// Pay each investor `stake + interest * stake / principal` from the owner's
/// deposit and return the surplus to the owner.
///
/// Returns the amount paid to investors.
pub fn repay(
    env: &Env,
    config: &ProjectConfig,
    state: &ProjectState,
    interest: i128,
) -> Result<i128, Error> {
    let principal = state.total_invested;
    let mut paid: i128 = 0;
    if principal > 0 {
        for investor in storage::load_investors(env, &config.id).iter() {
            let stake = storage::get_stake(env, &config.id, &investor);
            let amount = interest
                .checked_mul(stake)
                .ok_or(Error::Overflow)?
                / principal
                + stake;
            pay_out(env, &config.investment_token, &investor, amount)?;
            events::emit_repaid(env, config.id.clone(), investor, amount);
            paid += amount;
        }
    }
    let surplus = state.repay_deposited - paid;
    if surplus < 0 {
        return Err(Error::InsufficientCustodyBalance);
    }
    pay_out(env, &config.investment_token, &config.owner, surplus)?;
    Ok(paid)
}
