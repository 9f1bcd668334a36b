//! Participant/event records and their issuance state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a record within a team registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// The registering participant; anchors the team.
    Leader,
    /// A team member listed on the leader's row.
    Member,
}

impl MemberRole {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leader => "leader",
            Self::Member => "member",
        }
    }

    /// Parses the stored string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "leader" => Some(Self::Leader),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issuance state of a record, derived from `(cert_url, generating, blocked)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuanceState {
    /// Eligible, not yet generated.
    Unissued,
    /// One request currently holds the generation claim.
    Claimed,
    /// A certificate URL has been persisted.
    Issued,
    /// An administrator disabled issuance.
    Suppressed,
}

impl IssuanceState {
    /// Returns the string form used in API responses and CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unissued => "unissued",
            Self::Claimed => "claimed",
            Self::Issued => "issued",
            Self::Suppressed => "suppressed",
        }
    }
}

impl fmt::Display for IssuanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant/event row: the unit of issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    /// Store row id.
    pub id: i64,
    /// Normalized (uppercase) roll number.
    pub roll_no: String,
    /// Participant name as synchronized (uppercase).
    pub name: String,
    /// Department as entered on the source sheet.
    pub department: String,
    /// Roman-numeral cohort (may be empty).
    pub year: String,
    /// Canonical event name.
    pub event: String,
    /// Name of the source the record was synchronized from.
    pub source: String,
    /// Permanent certificate URL, once issued.
    pub cert_url: Option<String>,
    /// Transient generation claim flag.
    pub generating: bool,
    /// Administrative suppression flag.
    pub blocked: bool,
    /// Team role.
    pub member_role: MemberRole,
    /// Leader roll number for member records.
    pub leader_roll_no: Option<String>,
    /// Ordering within a team (0 for leaders).
    pub member_position: u32,
    /// Last write time, when known.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ParticipantRecord {
    /// Returns the issuance state. `blocked` dominates every other flag.
    #[must_use]
    pub fn state(&self) -> IssuanceState {
        if self.blocked {
            IssuanceState::Suppressed
        } else if self.cert_url.is_some() {
            IssuanceState::Issued
        } else if self.generating {
            IssuanceState::Claimed
        } else {
            IssuanceState::Unissued
        }
    }

    /// Returns true once a certificate URL has been persisted.
    #[must_use]
    pub fn is_issued(&self) -> bool {
        self.cert_url.is_some()
    }
}

/// A participant as read from one source row, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    /// Normalized roll number.
    pub roll_no: String,
    /// Normalized name.
    pub name: String,
    /// Department.
    pub department: String,
    /// Cohort, explicit or derived.
    pub year: String,
}

/// A leader and the accepted members from one source row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamEntry {
    /// Canonical event name.
    pub event: String,
    /// Source name (provenance).
    pub source: String,
    /// The leader (or sole participant).
    pub leader: Entrant,
    /// Accepted team members, in position order.
    pub members: Vec<Entrant>,
}

/// Filter for administrative record listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Restrict to one event.
    pub event: Option<String>,
    /// Restrict to one roll number.
    pub roll_no: Option<String>,
}

/// Per-event issuance totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStats {
    /// Canonical event name.
    pub event: String,
    /// Number of records.
    pub records: u64,
    /// Records with a certificate URL.
    pub issued: u64,
    /// Blocked records.
    pub blocked: u64,
    /// Unblocked records still waiting for a certificate.
    pub pending: u64,
}

/// Unique participants attributed to one normalized department.
///
/// A roll number counts once, under the department of its earliest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentStats {
    /// Canonical department name.
    pub department: String,
    /// Unique roll numbers in this department.
    pub participants: u64,
}
