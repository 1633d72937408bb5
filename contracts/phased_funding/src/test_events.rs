extern crate std;

use soroban_sdk::{symbol_short, testutils::Events, BytesN, IntoVal, Symbol, TryIntoVal, Val};

use crate::events::{
    InsurancePaid, Invested, Payout, PhaseReleased, PhaseVoted, ProjectCreated, ReplanFailed,
    ReplanSubmitted, StatusChanged, TemplateSet,
};
use crate::testutils::*;
use crate::{ProjectStatus, TemplateKind};

/// Data payloads of this contract's events whose first topic is `name`,
/// oldest first.
fn events_named(s: &Setup, name: Symbol) -> std::vec::Vec<(soroban_sdk::Vec<Val>, Val)> {
    let mut found = std::vec::Vec::new();
    for (contract, topics, data) in s.env.events().all().iter() {
        if contract != s.client.address {
            continue;
        }
        let Some(first) = topics.get(0) else { continue };
        let symbol: Result<Symbol, _> = first.try_into_val(&s.env);
        if symbol.map(|t| t == name).unwrap_or(false) {
            found.push((topics, data));
        }
    }
    found
}

fn last_event<T>(s: &Setup, name: Symbol, id: &BytesN<32>) -> T
where
    T: soroban_sdk::TryFromVal<soroban_sdk::Env, Val>,
{
    let (topics, data) = events_named(s, name)
        .pop()
        .expect("no matching event emitted");
    let topic_id: BytesN<32> = topics.get(1).unwrap().try_into_val(&s.env).unwrap();
    assert_eq!(&topic_id, id);
    data.try_into_val(&s.env).unwrap()
}

#[test]
fn test_project_created_event() {
    let s = setup();
    let id = s.create(1, PHASED, s.init_payload(s.default_phases()));

    let created: ProjectCreated = last_event(&s, symbol_short!("created"), &id);
    assert_eq!(created.template_id, PHASED);
    assert_eq!(created.owner, s.owner);
    assert_eq!(created.max_raise, MAX_RAISE);
    assert_eq!(created.fee_paid, MAX_RAISE);

    let status: StatusChanged = last_event(&s, symbol_short!("status"), &id);
    assert_eq!(status.from, ProjectStatus::Created);
    assert_eq!(status.to, ProjectStatus::PendingAudit);
    assert_eq!(status.tick, 1);
}

#[test]
fn test_invested_and_insured_events() {
    let s = setup();
    let id = s.create_audited(1, PHASED, s.init_payload(s.default_phases()));
    s.at(RAISE_START);
    let investor = s.investor(600_000);
    s.client.invest(&investor, &id, &600_000);

    let invested: Invested = last_event(&s, symbol_short!("invested"), &id);
    assert_eq!(invested.investor, investor);
    assert_eq!(invested.amount, 600_000);
    assert_eq!(invested.total_invested, 600_000);

    s.at(RAISE_END);
    s.client.heartbeat(&id);
    s.insure(&id);
    let insured: InsurancePaid = last_event(&s, symbol_short!("insured"), &id);
    assert_eq!(insured.payer, s.owner);
    assert_eq!(insured.amount, MAX_RAISE * INSURANCE_RATE_BPS as i128 / 10_000);
}

#[test]
fn test_heartbeat_emits_status_and_release() {
    let s = setup();
    let (id, _) = s.insured_project(1, &[MAX_RAISE]);

    s.at(52);
    s.client.heartbeat(&id);

    let status: StatusChanged = last_event(&s, symbol_short!("status"), &id);
    assert_eq!(status.from, ProjectStatus::PhaseVotingOpen);
    assert_eq!(status.to, ProjectStatus::PhaseActive);
    assert_eq!(status.phase_index, 1);
    assert_eq!(status.tick, 52);

    let released: PhaseReleased = last_event(&s, symbol_short!("released"), &id);
    assert_eq!(released.phase_index, 0);
    assert_eq!(released.recipient, s.owner);
    assert_eq!(released.amount, 800_000);
}

#[test]
fn test_status_events_carry_phase_at_each_move() {
    let s = setup();
    let (id, _) = s.insured_project(1, &[MAX_RAISE]);

    s.at(80);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::AwaitingRepayment);

    let moves: std::vec::Vec<StatusChanged> = events_named(&s, symbol_short!("status"))
        .into_iter()
        .map(|(_, data)| -> StatusChanged { data.try_into_val(&s.env).unwrap() })
        .filter(|status| status.tick == 80)
        .collect();
    let seen: std::vec::Vec<(ProjectStatus, ProjectStatus, u32)> = moves
        .iter()
        .map(|m| (m.from, m.to, m.phase_index))
        .collect();
    assert_eq!(
        seen,
        std::vec![
            (ProjectStatus::PhaseActive, ProjectStatus::PhaseVotingOpen, 0),
            (ProjectStatus::PhaseVotingOpen, ProjectStatus::PhaseActive, 1),
            (ProjectStatus::PhaseActive, ProjectStatus::PhaseVotingOpen, 1),
            (ProjectStatus::PhaseVotingOpen, ProjectStatus::AwaitingRepayment, 2),
        ]
    );
}

#[test]
fn test_vote_and_replan_events() {
    let s = setup();
    let (id, investors) = s.insured_project(1, &[300_000, 700_000]);
    s.at(52);
    s.client.heartbeat(&id);
    s.at(61);
    s.client.vote_against_phase(&investors[0], &id, &1);

    let voted: PhaseVoted = last_event(&s, symbol_short!("voted"), &id);
    assert_eq!(voted.voter, investors[0]);
    assert_eq!(voted.phase_index, 1);
    assert!(!voted.in_favor);
    assert_eq!(voted.weight, 300_000);

    s.at(70);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::PhaseDenied);
    s.at(71);
    s.client.replan(&s.owner, &id, &s.phases(&[(80, 90, 2_000)]));
    let submitted: ReplanSubmitted = last_event(&s, symbol_short!("replan"), &id);
    assert_eq!(submitted.proposer, s.owner);
    assert_eq!(submitted.from_phase, 1);
    assert_eq!(submitted.phase_count, 1);
    assert_eq!(submitted.proposed_at, 71);

    s.at(71 + REPLAN_VOTE_WINDOW);
    s.client.heartbeat(&id);
    let failed: ReplanFailed = last_event(&s, symbol_short!("rp_fail"), &id);
    assert_eq!(failed.failed_replan_count, 1);
}

#[test]
fn test_refund_events_on_failed_raise() {
    let s = setup();
    let id = s.create_audited(1, PHASED, s.init_payload(s.default_phases()));
    s.at(RAISE_START);
    let investor = s.investor(100_000);
    s.client.invest(&investor, &id, &100_000);

    s.at(RAISE_END);
    assert_eq!(s.client.heartbeat(&id), ProjectStatus::RaiseFailed);
    let refund: Payout = last_event(&s, symbol_short!("refunded"), &id);
    assert_eq!(refund.investor, investor);
    assert_eq!(refund.amount, 100_000);
}

#[test]
fn test_template_event() {
    let s = setup();
    s.client
        .set_template(&s.super_admin, &9, &TemplateKind::FullRelease);

    let (topics, data) = events_named(&s, symbol_short!("template")).pop().unwrap();
    let expected: soroban_sdk::Vec<Val> =
        soroban_sdk::vec![&s.env, symbol_short!("template").into_val(&s.env), 9u32.into_val(&s.env)];
    assert_eq!(topics, expected);
    let set: TemplateSet = data.try_into_val(&s.env).unwrap();
    assert_eq!(set.template_id, 9);
    assert_eq!(set.kind, TemplateKind::FullRelease);
}
