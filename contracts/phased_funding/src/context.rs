//! Explicit platform context handed to every project operation.
//!
//! Loaded once at the start of an entry point so that window checks, token
//! addresses and the price feed are all read from one consistent snapshot.

use soroban_sdk::Env;

use crate::storage;
use crate::types::{PlatformConfig, Tick};
use crate::Error;

#[derive(Clone, Debug)]
pub struct PlatformContext {
    pub config: PlatformConfig,
    /// Current ledger sequence.
    pub now: Tick,
}

impl PlatformContext {
    pub fn load(env: &Env) -> Result<Self, Error> {
        let config = storage::get_platform(env).ok_or(Error::NotInitialized)?;
        Ok(Self::at(config, env.ledger().sequence()))
    }

    pub fn at(config: PlatformConfig, now: Tick) -> Self {
        PlatformContext { config, now }
    }
}
