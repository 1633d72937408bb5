//! Phase-schedule well-formedness.
//!
//! A schedule is accepted only as a whole: every window is non-empty, windows
//! never overlap (`phases[i].release_end <= phases[i + 1].release_start`, gaps
//! allowed) and the shares add up to exactly [`BPS_DENOMINATOR`]. The same
//! check runs at creation and over the full spliced schedule of a replan.

use soroban_sdk::{Env, Vec};

use crate::types::{Phase, PhaseSpec, Tick, BPS_DENOMINATOR};
use crate::Error;

/// Convert owner-submitted specs into stored phases with empty tallies.
pub fn from_specs(env: &Env, specs: &Vec<PhaseSpec>) -> Vec<Phase> {
    let mut phases = Vec::new(env);
    for spec in specs.iter() {
        phases.push_back(Phase::from(spec));
    }
    phases
}

/// Validate ordering, window shape and the percent sum of a whole schedule.
pub fn validate(phases: &Vec<Phase>) -> Result<(), Error> {
    if phases.is_empty() {
        return Err(Error::InvalidPhaseSchedule);
    }

    let mut percent_sum: u64 = 0;
    let mut previous_end: Option<Tick> = None;
    for phase in phases.iter() {
        if phase.release_start >= phase.release_end {
            return Err(Error::InvalidPhaseSchedule);
        }
        if let Some(end) = previous_end {
            if end > phase.release_start {
                return Err(Error::InvalidPhaseSchedule);
            }
        }
        previous_end = Some(phase.release_end);
        percent_sum += phase.percent_bps as u64;
    }

    if percent_sum != BPS_DENOMINATOR as u64 {
        return Err(Error::PercentSumMismatch);
    }
    Ok(())
}

/// Keep `phases[..at]` and append `tail`; the result still has to pass [`validate`].
pub fn splice(env: &Env, phases: &Vec<Phase>, at: u32, tail: &Vec<PhaseSpec>) -> Vec<Phase> {
    let mut spliced = phases.slice(0..at.min(phases.len()));
    spliced.append(&from_specs(env, tail));
    spliced
}

/// Validate a replacement tail proposed at tick `now`.
///
/// Returns the full schedule the project would run if the replan passes.
pub fn check_replan(
    env: &Env,
    phases: &Vec<Phase>,
    at: u32,
    tail: &Vec<PhaseSpec>,
    now: Tick,
) -> Result<Vec<Phase>, Error> {
    let first = tail.first().ok_or(Error::InvalidPhaseSchedule)?;
    if first.release_start < now {
        return Err(Error::InvalidPhaseSchedule);
    }
    let spliced = splice(env, phases, at, tail);
    validate(&spliced)?;
    Ok(spliced)
}
