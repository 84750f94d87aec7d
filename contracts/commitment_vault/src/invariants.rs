#![allow(dead_code)]

extern crate std;

use crate::types::{Commitment, CommitmentStatus, Outcome, VALIDATION_WINDOW};

/// INV-1: Stake is strictly positive and the deadline lies after creation.
pub fn assert_terms_valid(c: &Commitment) {
    assert!(
        c.amount > 0,
        "INV-1 violated: commitment {} has non-positive amount ({})",
        c.id,
        c.amount
    );
    assert!(
        c.deadline > c.created_at,
        "INV-1 violated: commitment {} deadline {} not after creation {}",
        c.id,
        c.deadline,
        c.created_at
    );
}

/// INV-2: Only forward transitions:
///   Active            -> PendingValidation | Resolved
///   PendingValidation -> Resolved
///   Resolved          -> (none)
/// Staying in place is not a transition and is always allowed.
pub fn assert_valid_status_transition(from: CommitmentStatus, to: CommitmentStatus) {
    let valid = from == to
        || matches!(
            (from, to),
            (CommitmentStatus::Active, CommitmentStatus::PendingValidation)
                | (CommitmentStatus::Active, CommitmentStatus::Resolved)
                | (CommitmentStatus::PendingValidation, CommitmentStatus::Resolved)
        );

    assert!(
        valid,
        "INV-2 violated: invalid status transition from {:?} to {:?}",
        from, to
    );
}

/// INV-3: `outcome` is set iff the commitment is resolved.
pub fn assert_outcome_matches_status(c: &Commitment) {
    let resolved = c.status == CommitmentStatus::Resolved;
    let decided = c.outcome != Outcome::None;
    assert_eq!(
        resolved, decided,
        "INV-3 violated: commitment {} has status {:?} with outcome {:?}",
        c.id, c.status, c.outcome
    );
}

/// INV-3: Once decided, the outcome never changes.
pub fn assert_outcome_write_once(before: &Commitment, after: &Commitment) {
    if before.outcome != Outcome::None {
        assert_eq!(
            before.outcome, after.outcome,
            "INV-3 violated: commitment {} outcome rewritten",
            before.id
        );
    }
}

/// INV-5/6: Confirmation fields are set together, and the validator deadline
/// is exactly one window after confirmation.
pub fn assert_confirmation_consistent(c: &Commitment) {
    if c.confirmation_time == 0 {
        assert_eq!(
            c.validator_deadline, 0,
            "INV-6 violated: commitment {} has a validator deadline without confirmation",
            c.id
        );
        assert_ne!(
            c.status,
            CommitmentStatus::PendingValidation,
            "INV-5 violated: commitment {} pending validation without confirmation",
            c.id
        );
    } else {
        assert!(
            c.confirmation_time < c.deadline,
            "INV-5 violated: commitment {} confirmed at {} on or after deadline {}",
            c.id,
            c.confirmation_time,
            c.deadline
        );
        assert_eq!(
            c.validator_deadline,
            c.confirmation_time + VALIDATION_WINDOW,
            "INV-6 violated: commitment {} validator deadline not derived from confirmation",
            c.id
        );
    }
}

/// Terms written at creation never change.
pub fn assert_terms_immutable(original: &Commitment, current: &Commitment) {
    assert_eq!(original.id, current.id, "commitment id changed");
    assert_eq!(original.creator, current.creator, "creator changed");
    assert_eq!(original.validator, current.validator, "validator changed");
    assert_eq!(original.charity, current.charity, "charity changed");
    assert_eq!(original.asset, current.asset, "asset changed");
    assert_eq!(original.amount, current.amount, "amount changed");
    assert_eq!(original.deadline, current.deadline, "deadline changed");
    assert_eq!(original.description, current.description, "description changed");
}

/// IDs are sequential starting from 1.
pub fn assert_sequential_ids(commitments: &[Commitment]) {
    for (i, c) in commitments.iter().enumerate() {
        assert_eq!(
            c.id,
            i as u64 + 1,
            "expected id {}, got {}",
            i + 1,
            c.id
        );
    }
}

/// Run all stateless commitment invariants.
pub fn assert_all_commitment_invariants(c: &Commitment) {
    assert_terms_valid(c);
    assert_outcome_matches_status(c);
    assert_confirmation_consistent(c);
}
