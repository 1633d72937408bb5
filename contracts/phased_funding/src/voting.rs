//! # Voting
//!
//! Stake-weighted tallies and the two silence policies.
//!
//! | Vote          | Policy            | Silence means |
//! |---------------|-------------------|---------------|
//! | Phase release | `SilenceApproves` | consent; only an `against` vote opens a real contest |
//! | Replan        | `SilenceDenies`   | rejection; abstaining stake is counted against |
//!
//! Both policies funnel into [`resolve_vote`]. A tally can also be resolved
//! before its window closes once the outcome no longer depends on the
//! undecided stake (see [`Tally::decisive`]).

use soroban_sdk::contracttype;

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VotePolicy {
    SilenceApproves,
    SilenceDenies,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoteOutcome {
    Approved,
    Denied,
}

/// Approve unless a contest is present and `against` outweighs `for`.
///
/// Ties approve.
pub fn resolve_vote(for_weight: i128, against_weight: i128, quorum_present: bool) -> VoteOutcome {
    if quorum_present && against_weight > for_weight {
        VoteOutcome::Denied
    } else {
        VoteOutcome::Approved
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tally {
    pub for_weight: i128,
    pub against_weight: i128,
    /// Stake entitled to vote.
    pub total_weight: i128,
}

impl Tally {
    pub fn new(for_weight: i128, against_weight: i128, total_weight: i128) -> Self {
        Tally {
            for_weight,
            against_weight,
            total_weight,
        }
    }

    /// Stake that has not voted yet.
    pub fn undecided(&self) -> i128 {
        (self.total_weight - self.for_weight - self.against_weight).max(0)
    }

    /// Outcome if the window closed right now.
    pub fn outcome(&self, policy: VotePolicy) -> VoteOutcome {
        match policy {
            VotePolicy::SilenceApproves => {
                resolve_vote(self.for_weight, self.against_weight, self.against_weight > 0)
            }
            VotePolicy::SilenceDenies => {
                if self.for_weight == 0 {
                    return VoteOutcome::Denied;
                }
                let against = self.against_weight + self.undecided();
                resolve_vote(self.for_weight, against, true)
            }
        }
    }

    /// `Some(outcome)` once no remaining vote could change the result.
    pub fn decisive(&self, policy: VotePolicy) -> Option<VoteOutcome> {
        let undecided = self.undecided();
        let best = Tally::new(self.for_weight + undecided, self.against_weight, self.total_weight);
        let worst = Tally::new(self.for_weight, self.against_weight + undecided, self.total_weight);
        let best = best.outcome(policy);
        if best == worst.outcome(policy) {
            Some(best)
        } else {
            None
        }
    }
}
