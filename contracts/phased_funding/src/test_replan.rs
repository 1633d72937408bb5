extern crate std;

use soroban_sdk::testutils::Address as _;
use soroban_sdk::{vec, Address, BytesN};

use crate::invariants::{assert_all_project_invariants, assert_conservation};
use crate::testutils::*;
use crate::{Error, ErrorKind, ProjectStatus};

/// Phase 1 of the default project denied at tick 61 by the first investor.
fn deny_second_phase(s: &Setup, id: &BytesN<32>, objector: &Address) {
    s.at(52);
    s.client.heartbeat(id);
    s.at(61);
    s.client.heartbeat(id);
    s.client.vote_against_phase(objector, id, &1);
    assert_eq!(s.client.status(id), ProjectStatus::PhaseDenied);
}

fn denied_project(s: &Setup, stakes: &[i128]) -> (BytesN<32>, std::vec::Vec<Address>) {
    let (id, investors) = s.insured_project(1, stakes);
    deny_second_phase(s, &id, &investors[0]);
    (id, investors)
}

#[test]
fn test_approved_replan_splices_remaining_schedule() {
    let s = setup();
    let (id, investors) = denied_project(&s, &[600_000, 400_000]);

    s.at(62);
    s.client
        .replan(&s.owner, &id, &s.phases(&[(70, 75, 1_000), (80, 85, 1_000)]));
    s.client.vote_for_replan(&investors[0], &id);

    let project = s.client.get_project(&id);
    assert_eq!(project.status, ProjectStatus::PhaseActive);
    assert_eq!(project.phases.len(), 3);
    assert_eq!(project.phases.get(0).unwrap().percent_bps, 8_000);
    assert_eq!(project.phases.get(1).unwrap().release_start, 70);
    assert_eq!(project.replan, None);
    assert_all_project_invariants(&project);

    s.at(90);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::AwaitingRepayment);
    assert_eq!(s.client.current_phase(&id), 3);
    assert_eq!(s.investment.balance(&s.owner), MAX_RAISE);
    assert_eq!(s.client.failed_replan_count(&id), 0);
    assert_conservation(&s, &id);
}

#[test]
fn test_silent_replan_vote_fails() {
    let s = setup();
    let (id, _) = denied_project(&s, &[MAX_RAISE]);

    s.at(62);
    s.client.replan(&s.owner, &id, &s.phases(&[(80, 90, 2_000)]));
    assert_eq!(s.client.status(&id), ProjectStatus::ReplanVoting);

    s.at(62 + REPLAN_VOTE_WINDOW);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::ReplanWindowOpen);
    assert_eq!(s.client.failed_replan_count(&id), 1);
}

#[test]
fn test_minority_support_is_not_enough() {
    let s = setup();
    let (id, investors) = denied_project(&s, &[600_000, 400_000]);

    s.at(62);
    s.client.replan(&s.owner, &id, &s.phases(&[(80, 90, 2_000)]));
    s.client.vote_for_replan(&investors[1], &id);
    assert_eq!(s.client.status(&id), ProjectStatus::ReplanVoting);

    s.at(62 + REPLAN_VOTE_WINDOW);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::ReplanWindowOpen);
    assert_eq!(s.client.failed_replan_count(&id), 1);
}

#[test]
fn test_two_failed_replans_force_liquidation() {
    let s = setup();
    let (id, investors) = denied_project(&s, &[600_000, 400_000]);

    s.at(62);
    s.client.replan(&s.owner, &id, &s.phases(&[(80, 90, 2_000)]));
    s.at(72);
    s.client.heartbeat(&id);

    s.at(73);
    s.client.replan(&s.owner, &id, &s.phases(&[(85, 90, 2_000)]));
    s.at(83);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::LiquidationReady);
    assert_eq!(s.client.failed_replan_count(&id), 2);

    let err = s
        .client
        .try_replan(&s.owner, &id, &s.phases(&[(90, 95, 2_000)]))
        .unwrap_err()
        .unwrap();
    assert_eq!(err, Error::RetryLimitExceeded);
    assert_eq!(err.kind(), ErrorKind::RetryLimitExceeded);

    s.client.liquidate(&id);
    assert_eq!(s.investment.balance(&investors[0]), 120_000);
    assert_eq!(s.investment.balance(&investors[1]), 80_000);
    assert_conservation(&s, &id);
}

#[test]
fn test_reopened_window_can_be_missed() {
    let s = setup();
    let (id, _) = denied_project(&s, &[MAX_RAISE]);

    s.at(62);
    s.client.replan(&s.owner, &id, &s.phases(&[(80, 90, 2_000)]));
    s.at(72);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::ReplanWindowOpen);

    s.at(72 + REPLAN_WINDOW);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::LiquidationReady);
    assert_eq!(s.client.failed_replan_count(&id), 1);
}

#[test]
fn test_grantee_may_replan() {
    let s = setup();
    let grantee = Address::generate(&s.env);
    let mut init = s.init_payload(s.default_phases());
    init.replan_grants = vec![&s.env, grantee.clone()];
    let id = s.create_audited(1, PHASED, init);
    let investors = s.raise(&id, &[MAX_RAISE]);
    s.insure(&id);
    deny_second_phase(&s, &id, &investors[0]);

    s.at(62);
    s.client.replan(&grantee, &id, &s.phases(&[(80, 90, 2_000)]));
    let proposal = s.client.get_project(&id).replan.unwrap();
    assert_eq!(proposal.proposer, grantee);
    assert_eq!(proposal.proposed_at, 62);
}

#[test]
fn test_malformed_replan_is_rejected_atomically() {
    let s = setup();
    let (id, _) = denied_project(&s, &[MAX_RAISE]);
    s.at(62);
    let before = s.client.get_project(&id);

    let err = s
        .client
        .try_replan(&s.owner, &id, &s.phases(&[(80, 90, 1_500)]))
        .unwrap_err()
        .unwrap();
    assert_eq!(err, Error::PercentSumMismatch);
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);

    assert_eq!(
        s.client
            .try_replan(&s.owner, &id, &s.phases(&[(80, 90, 1_000), (85, 95, 1_000)])),
        Err(Ok(Error::InvalidPhaseSchedule))
    );
    // A tail may not start in the past.
    assert_eq!(
        s.client.try_replan(&s.owner, &id, &s.phases(&[(55, 90, 2_000)])),
        Err(Ok(Error::InvalidPhaseSchedule))
    );
    assert_eq!(
        s.client.try_replan(&s.owner, &id, &s.phases(&[])),
        Err(Ok(Error::InvalidPhaseSchedule))
    );

    assert_eq!(s.client.get_project(&id), before);
}

#[test]
fn test_replan_requires_denied_phase() {
    let s = setup();
    let (id, _) = s.insured_project(1, &[MAX_RAISE]);
    assert_eq!(
        s.client.try_replan(&s.owner, &id, &s.phases(&[(80, 90, 2_000)])),
        Err(Ok(Error::WrongStatus))
    );
}

#[test]
fn test_replan_vote_rules() {
    let s = setup();
    let (id, investors) = denied_project(&s, &[600_000, 100_000, 300_000]);

    assert_eq!(
        s.client.try_vote_for_replan(&investors[1], &id),
        Err(Ok(Error::VotingClosed))
    );

    s.at(62);
    s.client.replan(&s.owner, &id, &s.phases(&[(80, 90, 2_000)]));
    s.client.vote_for_replan(&investors[1], &id);
    assert_eq!(
        s.client.try_vote_for_replan(&investors[1], &id),
        Err(Ok(Error::AlreadyVoted))
    );

    let outsider = Address::generate(&s.env);
    assert_eq!(
        s.client.try_vote_for_replan(&outsider, &id),
        Err(Ok(Error::NotInvestor))
    );

    // The objector from the phase vote gets a fresh ballot for the replan.
    s.client.vote_for_replan(&investors[0], &id);
    assert_eq!(s.client.status(&id), ProjectStatus::PhaseActive);
}
