//! Display status and timeline for a commitment.
//!
//! [`project`] is a pure function of the record and a clock reading; it never
//! touches the ledger and can be recomputed at any time.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::commitment::{CommitmentView, Outcome, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Active,
    PendingValidation,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Created,
    Confirmed,
    ValidatorWindow,
    Resolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneState {
    Completed,
    Current,
    Pending,
    Failed,
    /// The step was bypassed (no confirmation before resolution).
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub state: MilestoneState,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub status: DisplayStatus,
    /// Anyone may call `resolve_expired` right now.
    pub resolvable: bool,
    pub timeline: Vec<Milestone>,
}

pub fn project(commitment: &CommitmentView, now: u64) -> Projection {
    let (status, resolvable) = match (commitment.status, commitment.outcome) {
        (Status::Active, _) => (DisplayStatus::Active, now >= commitment.deadline),
        (Status::PendingValidation, _) => (
            DisplayStatus::PendingValidation,
            now >= commitment.validator_deadline,
        ),
        (Status::Resolved, Outcome::Success) => (DisplayStatus::Success, false),
        (Status::Resolved, _) => (DisplayStatus::Failed, false),
    };

    Projection {
        status,
        resolvable,
        timeline: timeline(commitment, now),
    }
}

fn timestamp(secs: u64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
}

fn milestone(kind: MilestoneKind, state: MilestoneState, at: u64) -> Milestone {
    Milestone {
        kind,
        state,
        at: timestamp(at),
    }
}

fn timeline(c: &CommitmentView, now: u64) -> Vec<Milestone> {
    use MilestoneKind::*;
    use MilestoneState::*;

    let confirmed = c.confirmation_time != 0;

    let confirmation = match c.status {
        Status::Active if now < c.deadline => milestone(Confirmed, Current, c.deadline),
        Status::Active => milestone(Confirmed, Failed, c.deadline),
        _ if confirmed => milestone(Confirmed, Completed, c.confirmation_time),
        _ => milestone(Confirmed, Failed, c.deadline),
    };

    let window = match c.status {
        Status::Active => milestone(ValidatorWindow, Pending, 0),
        Status::PendingValidation if now < c.validator_deadline => {
            milestone(ValidatorWindow, Current, c.validator_deadline)
        }
        Status::PendingValidation => milestone(ValidatorWindow, Failed, c.validator_deadline),
        Status::Resolved if confirmed => {
            milestone(ValidatorWindow, Completed, c.validator_deadline)
        }
        Status::Resolved => milestone(ValidatorWindow, Skipped, 0),
    };

    let resolution = match (c.status, c.outcome) {
        (Status::Resolved, Outcome::Success) => milestone(Resolution, Completed, 0),
        (Status::Resolved, _) => milestone(Resolution, Failed, 0),
        (Status::Active, _) if now >= c.deadline => milestone(Resolution, Current, 0),
        (Status::PendingValidation, _) if now >= c.validator_deadline => {
            milestone(Resolution, Current, 0)
        }
        _ => milestone(Resolution, Pending, 0),
    };

    vec![
        milestone(Created, Completed, c.created_at),
        confirmation,
        window,
        resolution,
    ]
}
