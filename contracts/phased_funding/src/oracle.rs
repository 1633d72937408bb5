//! Price feed used to express investment-token amounts in the fee token.
//!
//! The feed is an external contract; only its `convert` entry point is
//! consumed. It is called twice per project: for the creation fee and for the
//! insurance deposit.

use soroban_sdk::{contractclient, Address, Env};

use crate::context::PlatformContext;
use crate::Error;

#[contractclient(name = "PriceOracleClient")]
pub trait PriceOracle {
    /// Quote `base_amount` units of `base` in units of `quote`.
    fn convert(env: Env, base_amount: i128, base: Address, quote: Address) -> i128;
}

/// Ask the configured feed for the `quote` equivalent of `base_amount`.
pub fn convert(
    env: &Env,
    ctx: &PlatformContext,
    base_amount: i128,
    base: &Address,
    quote: &Address,
) -> Result<i128, Error> {
    if base_amount == 0 {
        return Ok(0);
    }
    let quoted = PriceOracleClient::new(env, &ctx.config.price_feed).convert(&base_amount, base, quote);
    if quoted < 0 {
        return Err(Error::InvalidQuote);
    }
    Ok(quoted)
}
