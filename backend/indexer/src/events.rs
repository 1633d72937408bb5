//! Event kinds published by the phased-funding contract, and the shapes the
//! indexer stores them in.
//!
//! Topic symbols mirror `contracts/phased_funding/src/events.rs` and the role
//! events in `contracts/phased_funding/src/rbac.rs`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// `created`
    ProjectCreated,
    /// `audited`
    ProjectAudited,
    /// `invested`
    Invested,
    /// `insured`
    InsurancePaid,
    /// `status`: one lifecycle transition.
    StatusChanged,
    /// `voted`
    PhaseVoted,
    /// `replan`
    ReplanSubmitted,
    /// `rp_vote`
    ReplanVoted,
    /// `rp_fail`
    ReplanFailed,
    /// `released`: a phase share paid to the owner.
    PhaseReleased,
    /// `refunded`: raise-failure or liquidation payout.
    Refunded,
    /// `repaid`
    Repaid,
    /// `filled`: owner repayment deposit.
    RepayFilled,
    /// `template`
    TemplateSet,
    /// `platform`
    PlatformUpdated,
    /// `role_set`
    RoleSet,
    /// `role_del`
    RoleDel,
    Unknown,
}

impl EventKind {
    pub fn from_topic(topic: &str) -> Self {
        match topic {
            "created" => Self::ProjectCreated,
            "audited" => Self::ProjectAudited,
            "invested" => Self::Invested,
            "insured" => Self::InsurancePaid,
            "status" => Self::StatusChanged,
            "voted" => Self::PhaseVoted,
            "replan" => Self::ReplanSubmitted,
            "rp_vote" => Self::ReplanVoted,
            "rp_fail" => Self::ReplanFailed,
            "released" => Self::PhaseReleased,
            "refunded" => Self::Refunded,
            "repaid" => Self::Repaid,
            "filled" => Self::RepayFilled,
            "template" => Self::TemplateSet,
            "platform" => Self::PlatformUpdated,
            "role_set" => Self::RoleSet,
            "role_del" => Self::RoleDel,
            _ => Self::Unknown,
        }
    }

    /// Identifier stored in the `event_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectCreated => "project_created",
            Self::ProjectAudited => "project_audited",
            Self::Invested => "invested",
            Self::InsurancePaid => "insurance_paid",
            Self::StatusChanged => "status_changed",
            Self::PhaseVoted => "phase_voted",
            Self::ReplanSubmitted => "replan_submitted",
            Self::ReplanVoted => "replan_voted",
            Self::ReplanFailed => "replan_failed",
            Self::PhaseReleased => "phase_released",
            Self::Refunded => "refunded",
            Self::Repaid => "repaid",
            Self::RepayFilled => "repay_filled",
            Self::TemplateSet => "template_set",
            Self::PlatformUpdated => "platform_updated",
            Self::RoleSet => "role_set",
            Self::RoleDel => "role_del",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the second topic is a project id.
    pub fn is_project_scoped(&self) -> bool {
        !matches!(
            self,
            Self::TemplateSet
                | Self::PlatformUpdated
                | Self::RoleSet
                | Self::RoleDel
                | Self::Unknown
        )
    }
}

/// A decoded contract event, ready to be stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// RPC event id; unique per emitted event.
    pub event_uid: String,
    pub event_type: String,
    /// Hex-encoded 32-byte project id.
    pub project_id: Option<String>,
    pub actor: Option<String>,
    /// Decimal `i128` amount, kept as text.
    pub amount: Option<String>,
    /// Target status of a `status` event.
    pub status: Option<String>,
    pub phase_index: Option<i64>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_uid: String,
    pub event_type: String,
    pub project_id: Option<String>,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub status: Option<String>,
    pub phase_index: Option<i64>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
    pub created_at: i64,
}

/// Latest known lifecycle status of one project.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectStatusRecord {
    pub project_id: String,
    pub status: String,
    pub phase_index: Option<i64>,
    pub ledger: i64,
    pub updated_at: i64,
}
