extern crate std;

use soroban_sdk::testutils::Address as _;
use soroban_sdk::{token, Address, String};

use crate::testutils::*;
use crate::{Error, ErrorKind, ProjectStatus, Role, TemplateKind};

fn metadata(s: &Setup) -> String {
    String::from_str(&s.env, "ipfs://project")
}

#[test]
fn test_init_only_once() {
    let s = setup();
    let config = s.client.platform_config();
    assert_eq!(config.ticks_per_year, TICKS_PER_YEAR);
    assert_eq!(
        s.client.try_init(&s.super_admin, &config),
        Err(Ok(Error::AlreadyInitialized))
    );
}

#[test]
fn test_init_rejects_zero_year() {
    let s = setup();
    let mut config = s.client.platform_config();
    config.ticks_per_year = 0;
    let contract_id = s.env.register(crate::PhasedFunding, ());
    let fresh = crate::PhasedFundingClient::new(&s.env, &contract_id);
    assert_eq!(
        fresh.try_init(&s.super_admin, &config),
        Err(Ok(Error::InvalidConfig))
    );
}

#[test]
fn test_unknown_template() {
    let s = setup();
    s.fund_fees(MAX_RAISE);
    assert_eq!(
        s.client.try_new_project(
            &s.owner,
            &77,
            &project_id(&s.env, 1),
            &MAX_RAISE,
            &metadata(&s),
            &s.init_payload(s.default_phases()),
        ),
        Err(Ok(Error::UnknownTemplate))
    );
}

#[test]
fn test_duplicate_project_id() {
    let s = setup();
    s.create(1, PHASED, s.init_payload(s.default_phases()));
    s.fund_fees(MAX_RAISE);
    assert_eq!(
        s.client.try_new_project(
            &s.owner,
            &PHASED,
            &project_id(&s.env, 1),
            &MAX_RAISE,
            &metadata(&s),
            &s.init_payload(s.default_phases()),
        ),
        Err(Ok(Error::DuplicateProjectId))
    );
}

#[test]
fn test_creation_fee_requires_allowance() {
    let s = setup();
    s.fee_admin.mint(&s.owner, &MAX_RAISE);
    let err = s
        .client
        .try_new_project(
            &s.owner,
            &PHASED,
            &project_id(&s.env, 1),
            &MAX_RAISE,
            &metadata(&s),
            &s.init_payload(s.default_phases()),
        )
        .unwrap_err()
        .unwrap();
    assert_eq!(err, Error::InsufficientBalance);
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(s.fee.balance(&s.owner), MAX_RAISE);
}

fn assert_rejected(s: &Setup, template_id: u32, init: crate::ProjectInit, expected: Error) {
    s.fund_fees(MAX_RAISE);
    assert_eq!(
        s.client.try_new_project(
            &s.owner,
            &template_id,
            &project_id(&s.env, 1),
            &MAX_RAISE,
            &metadata(s),
            &init,
        ),
        Err(Ok(expected))
    );
}

#[test]
fn test_phased_template_needs_two_phases() {
    let s = setup();
    let init = s.init_payload(s.phases(&[(50, 60, 10_000)]));
    assert_rejected(&s, PHASED, init, Error::InvalidPhaseSchedule);
}

#[test]
fn test_schedule_is_validated_at_creation() {
    let s = setup();

    let init = s.init_payload(s.phases(&[(50, 51, 8_000), (60, 70, 1_000)]));
    assert_rejected(&s, PHASED, init, Error::PercentSumMismatch);

    let init = s.init_payload(s.phases(&[(50, 65, 8_000), (60, 70, 2_000)]));
    assert_rejected(&s, PHASED, init, Error::InvalidPhaseSchedule);
    assert_eq!(Error::InvalidPhaseSchedule.kind(), ErrorKind::InvariantViolation);

    // Releases cannot start while the raise is still open.
    let init = s.init_payload(s.phases(&[(30, 45, 8_000), (60, 70, 2_000)]));
    assert_rejected(&s, PHASED, init, Error::InvalidPhaseSchedule);

    let mut init = s.init_payload(s.default_phases());
    init.repay_deadline = 65;
    assert_rejected(&s, PHASED, init, Error::InvalidPhaseSchedule);
}

#[test]
fn test_raise_parameters_are_validated() {
    let s = setup();

    let mut init = s.init_payload(s.default_phases());
    init.min_raise = MAX_RAISE + 1;
    assert_rejected(&s, PHASED, init, Error::InvalidRaiseBounds);

    let mut init = s.init_payload(s.default_phases());
    init.min_raise = 0;
    assert_rejected(&s, PHASED, init, Error::InvalidRaiseBounds);

    let mut init = s.init_payload(s.default_phases());
    init.raise_start = RAISE_END;
    assert_rejected(&s, PHASED, init, Error::InvalidRaiseWindow);

    let mut init = s.init_payload(s.default_phases());
    init.insurance_rate_bps = 10_001;
    assert_rejected(&s, PHASED, init, Error::InvalidRate);

    s.at(RAISE_END);
    let init = s.init_payload(s.default_phases());
    assert_rejected(&s, PHASED, init, Error::InvalidRaiseWindow);
}

#[test]
fn test_full_release_takes_no_phases() {
    let s = setup();
    let init = s.init_payload(s.default_phases());
    assert_rejected(&s, FULL_RELEASE, init, Error::InvalidPhaseSchedule);

    let id = s.create(2, FULL_RELEASE, s.init_payload(s.phases(&[])));
    let project = s.client.get_project(&id);
    assert_eq!(project.kind, TemplateKind::FullRelease);
    assert_eq!(project.phases.len(), 1);
    assert_eq!(project.phases.get(0).unwrap().percent_bps, 10_000);
    assert_eq!(project.phases.get(0).unwrap().release_start, RAISE_END);
}

#[test]
fn test_only_committee_audits() {
    let s = setup();
    let id = s.create(1, PHASED, s.init_payload(s.default_phases()));

    let err = s
        .client
        .try_audit_project(&s.owner, &id, &true, &None)
        .unwrap_err()
        .unwrap();
    assert_eq!(err, Error::NotAuthorized);
    assert_eq!(err.kind(), ErrorKind::AuthorizationDenied);

    // Admins configure the platform but do not audit.
    assert_eq!(
        s.client.try_audit_project(&s.super_admin, &id, &true, &None),
        Err(Ok(Error::NotAuthorized))
    );

    s.client.audit_project(&s.committee, &id, &true, &None);
    assert_eq!(s.client.status(&id), ProjectStatus::AwaitingRaiseStart);
    assert_eq!(
        s.client.try_audit_project(&s.committee, &id, &true, &None),
        Err(Ok(Error::WrongStatus))
    );
}

#[test]
fn test_template_admin() {
    let s = setup();
    let stranger = Address::generate(&s.env);
    assert_eq!(
        s.client.try_set_template(&stranger, &3, &TemplateKind::Phased),
        Err(Ok(Error::NotAuthorized))
    );
    assert_eq!(s.client.template_of(&3), None);

    let admin = Address::generate(&s.env);
    s.client.grant_role(&s.super_admin, &admin, &Role::Admin);
    s.client.set_template(&admin, &3, &TemplateKind::FullRelease);
    assert_eq!(s.client.template_of(&3), Some(TemplateKind::FullRelease));
}

#[test]
fn test_token_switch_only_affects_new_projects() {
    let s = setup();
    let first = s.create(1, PHASED, s.init_payload(s.default_phases()));

    let sac = s.env.register_stellar_asset_contract_v2(Address::generate(&s.env));
    let new_investment = token::Client::new(&s.env, &sac.address());
    s.client
        .set_tokens(&s.super_admin, &s.fee.address, &new_investment.address);

    let second = s.create(2, PHASED, s.init_payload(s.default_phases()));
    assert_eq!(
        s.client.get_project(&first).investment_token,
        s.investment.address
    );
    assert_eq!(
        s.client.get_project(&second).investment_token,
        new_investment.address
    );
}

#[test]
fn test_price_feed_switch() {
    let s = setup();
    let new_feed = s.env.register(MockOracle, ());
    MockOracleClient::new(&s.env, &new_feed).set_rate(&1, &2);

    let stranger = Address::generate(&s.env);
    assert_eq!(
        s.client.try_set_price_feed(&stranger, &new_feed),
        Err(Ok(Error::NotAuthorized))
    );
    s.client.set_price_feed(&s.super_admin, &new_feed);
    assert_eq!(s.client.platform_config().price_feed, new_feed);

    let before = s.fee.balance(&s.fee_receiver);
    s.create(1, PHASED, s.init_payload(s.default_phases()));
    assert_eq!(s.fee.balance(&s.fee_receiver) - before, MAX_RAISE / 2);
}

#[test]
fn test_role_management() {
    let s = setup();
    let admin = Address::generate(&s.env);
    let member = Address::generate(&s.env);

    s.client.grant_role(&s.super_admin, &admin, &Role::Admin);
    assert!(s.client.has_role(&admin, &Role::Admin));

    // Admins cannot mint new super admins.
    assert_eq!(
        s.client.try_grant_role(&admin, &member, &Role::SuperAdmin),
        Err(Ok(Error::NotAuthorized))
    );
    s.client.grant_role(&admin, &member, &Role::Committee);
    assert_eq!(s.client.role_of(&member), Some(Role::Committee));

    s.client.revoke_role(&admin, &member);
    assert_eq!(s.client.role_of(&member), None);
    assert_eq!(
        s.client.try_revoke_role(&admin, &s.super_admin),
        Err(Ok(Error::NotAuthorized))
    );

    let successor = Address::generate(&s.env);
    s.client.transfer_super_admin(&s.super_admin, &successor);
    assert!(s.client.has_role(&successor, &Role::SuperAdmin));
    assert_eq!(s.client.role_of(&s.super_admin), None);
}

#[test]
fn test_error_kinds() {
    assert_eq!(Error::DuplicateProjectId.kind(), ErrorKind::PreconditionViolation);
    assert_eq!(Error::RaiseNotOpen.kind(), ErrorKind::PreconditionViolation);
    assert_eq!(Error::NoReplanAuth.kind(), ErrorKind::AuthorizationDenied);
    assert_eq!(Error::PercentSumMismatch.kind(), ErrorKind::InvariantViolation);
    assert_eq!(
        Error::InsufficientCustodyBalance.kind(),
        ErrorKind::InsufficientFunds
    );
    assert_eq!(Error::AlreadyVoted.kind(), ErrorKind::AlreadyVoted);
    assert_eq!(Error::RetryLimitExceeded.kind(), ErrorKind::RetryLimitExceeded);
}
