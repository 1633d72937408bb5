extern crate std;

use soroban_sdk::testutils::Address as _;
use soroban_sdk::{Address, BytesN};

use crate::invariants::assert_conservation;
use crate::testutils::*;
use crate::{Error, ErrorKind, ProjectStatus};

/// Insured default project with phase 1 open for voting at tick 61.
fn open_second_phase(s: &Setup, stakes: &[i128]) -> (BytesN<32>, std::vec::Vec<Address>) {
    let (id, investors) = s.insured_project(1, stakes);
    s.at(52);
    s.client.heartbeat(&id);
    s.at(61);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::PhaseVotingOpen);
    (id, investors)
}

#[test]
fn test_second_vote_in_episode_fails() {
    let s = setup();
    let (id, investors) = open_second_phase(&s, &[300_000, 700_000]);

    s.client.vote_against_phase(&investors[0], &id, &1);
    let err = s
        .client
        .try_vote_phase(&investors[0], &id, &1, &true)
        .unwrap_err()
        .unwrap();
    assert_eq!(err, Error::AlreadyVoted);
    assert_eq!(err.kind(), ErrorKind::AlreadyVoted);

    let phase = s.client.get_project(&id).phases.get(1).unwrap();
    assert_eq!(phase.vote_weight_against, 300_000);
    assert_eq!(phase.vote_weight_for, 0);
    assert_eq!(s.client.status(&id), ProjectStatus::PhaseVotingOpen);
}

#[test]
fn test_ballot_checks_precede_already_voted() {
    let s = setup();
    let (id, investors) = open_second_phase(&s, &[300_000, 700_000]);

    s.client.vote_against_phase(&investors[0], &id, &1);
    assert_eq!(
        s.client.try_vote_phase(&investors[0], &id, &0, &true),
        Err(Ok(Error::WrongPhase))
    );

    s.client.vote_against_phase(&investors[1], &id, &1);
    assert_eq!(s.client.status(&id), ProjectStatus::PhaseDenied);
    assert_eq!(
        s.client.try_vote_against_phase(&investors[0], &id, &1),
        Err(Ok(Error::VotingClosed))
    );
}

#[test]
fn test_against_outweighing_for_denies_at_window_end() {
    let s = setup();
    let (id, investors) = open_second_phase(&s, &[300_000, 200_000, 500_000]);

    s.client.vote_against_phase(&investors[0], &id, &1);
    s.client.vote_phase(&investors[1], &id, &1, &true);
    assert_eq!(s.client.status(&id), ProjectStatus::PhaseVotingOpen);

    // The silent 500_000 does not count in favour.
    s.at(70);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::PhaseDenied);
    assert_eq!(s.client.current_phase(&id), 1);
    assert_eq!(s.investment.balance(&s.owner), 800_000);
}

#[test]
fn test_lone_objection_denies_when_unopposed() {
    let s = setup();
    let (id, investors) = open_second_phase(&s, &[300_000, 200_000, 500_000]);

    s.client.vote_against_phase(&investors[1], &id, &1);
    s.at(70);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::PhaseDenied);
}

#[test]
fn test_outweighed_objection_still_releases() {
    let s = setup();
    let (id, investors) = open_second_phase(&s, &[300_000, 200_000, 500_000]);

    s.client.vote_against_phase(&investors[1], &id, &1);
    s.client.vote_phase(&investors[0], &id, &1, &true);
    s.at(70);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::AwaitingRepayment);
    assert_eq!(s.investment.balance(&s.owner), MAX_RAISE);
}

#[test]
fn test_tie_approves_immediately() {
    let s = setup();
    let (id, investors) = open_second_phase(&s, &[500_000, 500_000]);

    s.client.vote_against_phase(&investors[0], &id, &1);
    assert_eq!(s.client.status(&id), ProjectStatus::PhaseVotingOpen);
    s.client.vote_phase(&investors[1], &id, &1, &true);

    // Every stake has voted, so the phase resolves without waiting for tick 70.
    assert_eq!(s.client.status(&id), ProjectStatus::AwaitingRepayment);
    assert_eq!(s.client.current_phase(&id), 2);
    assert_conservation(&s, &id);
}

#[test]
fn test_majority_against_denies_immediately() {
    let s = setup();
    let (id, investors) = open_second_phase(&s, &[600_000, 400_000]);

    s.client.vote_against_phase(&investors[0], &id, &1);
    let project = s.client.get_project(&id);
    assert_eq!(project.status, ProjectStatus::PhaseDenied);
    assert_eq!(project.released_total, 800_000);
}

#[test]
fn test_first_phase_can_be_denied() {
    let s = setup();
    let (id, investors) = s.insured_project(1, &[MAX_RAISE]);
    s.at(50);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::PhaseVotingOpen);

    s.client.vote_against_phase(&investors[0], &id, &0);
    assert_eq!(s.client.status(&id), ProjectStatus::PhaseDenied);

    s.at(50 + REPLAN_WINDOW);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::LiquidationReady);
    s.client.liquidate(&id);
    assert_eq!(s.investment.balance(&investors[0]), MAX_RAISE);
    assert_conservation(&s, &id);
}

#[test]
fn test_vote_preconditions() {
    let s = setup();
    let (id, investors) = s.insured_project(1, &[MAX_RAISE]);

    // Phase 0 opens at tick 50.
    assert_eq!(
        s.client.try_vote_against_phase(&investors[0], &id, &0),
        Err(Ok(Error::VotingClosed))
    );

    s.at(50);
    s.client.heartbeat(&id);
    assert_eq!(
        s.client.try_vote_against_phase(&investors[0], &id, &1),
        Err(Ok(Error::WrongPhase))
    );

    let outsider = Address::generate(&s.env);
    assert_eq!(
        s.client.try_vote_against_phase(&outsider, &id, &0),
        Err(Ok(Error::NotInvestor))
    );
}
