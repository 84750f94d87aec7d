use soroban_sdk::{symbol_short, testutils::Events, vec, IntoVal, TryIntoVal};

use crate::events::{CommitmentCreated, CommitmentResolved, CompletionConfirmed};
use crate::test::setup;
use crate::{Asset, Outcome, VALIDATION_WINDOW};

const DAY: u64 = 24 * 60 * 60;

#[test]
fn test_commitment_created_event() {
    let s = setup();
    let deadline = s.env.ledger().timestamp() + DAY;
    let id = s.stake(100, deadline);

    let all_events = s.env.events().all();
    let last_event = all_events.last().expect("No events found");

    // Topic: (symbol_short!("created"), id)
    assert_eq!(last_event.0, s.client.address);
    let expected_topics = vec![
        &s.env,
        symbol_short!("created").into_val(&s.env),
        id.into_val(&s.env),
    ];
    assert_eq!(last_event.1, expected_topics);

    let event_data: CommitmentCreated = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(
        event_data,
        CommitmentCreated {
            id,
            creator: s.creator.clone(),
            validator: s.validator.clone(),
            charity: s.charity.clone(),
            asset: Asset::Token(s.token.address.clone()),
            amount: 100,
            deadline,
        }
    );
}

#[test]
fn test_completion_confirmed_event() {
    let s = setup();
    let now = s.env.ledger().timestamp();
    let id = s.stake(100, now + DAY);
    s.client.confirm_completion(&s.creator, &id);

    let all_events = s.env.events().all();
    let last_event = all_events.last().expect("No events found");

    let expected_topics = vec![
        &s.env,
        symbol_short!("confirmed").into_val(&s.env),
        id.into_val(&s.env),
    ];
    assert_eq!(last_event.1, expected_topics);

    let event_data: CompletionConfirmed = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(
        event_data,
        CompletionConfirmed {
            id,
            confirmation_time: now,
            validator_deadline: now + VALIDATION_WINDOW,
        }
    );
}

#[test]
fn test_commitment_resolved_event_names_recipient() {
    let s = setup();
    let now = s.env.ledger().timestamp();
    let approved = s.stake(100, now + DAY);
    let expired = s.stake(40, now + DAY);

    s.client.confirm_completion(&s.creator, &approved);
    s.client.approve(&s.validator, &approved);

    let last_event = s.env.events().all().last().expect("No events found");
    let expected_topics = vec![
        &s.env,
        symbol_short!("resolved").into_val(&s.env),
        approved.into_val(&s.env),
    ];
    assert_eq!(last_event.1, expected_topics);
    let event_data: CommitmentResolved = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(
        event_data,
        CommitmentResolved {
            id: approved,
            outcome: Outcome::Success,
            recipient: s.creator.clone(),
            amount: 100,
        }
    );

    s.set_time(now + DAY);
    s.client.resolve_expired(&expired);

    let last_event = s.env.events().all().last().expect("No events found");
    let event_data: CommitmentResolved = last_event.2.try_into_val(&s.env).unwrap();
    assert_eq!(
        event_data,
        CommitmentResolved {
            id: expired,
            outcome: Outcome::Failed,
            recipient: s.charity.clone(),
            amount: 40,
        }
    );
}
