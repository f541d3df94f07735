// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;
use crate::nostr::event::{EventBuilder, Keys, KIND_USER_STATUS};
use crate::test_support::{refused_relay_url, MockRelay, RelayBehavior, TEST_SECRET_KEY};

fn signed(content: &str) -> anyhow::Result<Event> {
    let keys = Keys::parse(TEST_SECRET_KEY)?;
    EventBuilder::new(KIND_USER_STATUS, content).tag("d", "music").sign(&keys)
}

// ── parse_ok ──────────────────────────────────────────────────────────

#[yare::parameterized(
    accepted = { r#"["OK","abc",true,""]"#, Some((true, "")) },
    rejected = { r#"["OK","abc",false,"blocked: spam"]"#, Some((false, "blocked: spam")) },
    no_message = { r#"["OK","abc",true]"#, Some((true, "")) },
    other_id = { r#"["OK","def",true,""]"#, None },
    notice = { r#"["NOTICE","slow down"]"#, None },
    not_json = { "hello", None },
    bool_as_string = { r#"["OK","abc","true",""]"#, None },
)]
fn parse_ok_cases(text: &str, expected: Option<(bool, &str)>) {
    let parsed = parse_ok(text, "abc");
    assert_eq!(parsed.as_ref().map(|(a, m)| (*a, m.as_str())), expected);
}

// ── RelayPool ─────────────────────────────────────────────────────────

#[tokio::test]
async fn accepted_by_every_relay() -> anyhow::Result<()> {
    let a = MockRelay::spawn(RelayBehavior::Accept).await?;
    let b = MockRelay::spawn(RelayBehavior::Accept).await?;
    let pool = RelayPool::new(vec![a.url.clone(), b.url.clone()], Duration::from_secs(5));
    let event = signed("Song B - [Artist2]")?;

    let report = pool.publish(&event).await;
    assert_eq!(report.attempted(), 2);
    assert_eq!(report.accepted(), 2);
    assert_eq!(a.received(), vec![event.clone()]);
    assert_eq!(b.received(), vec![event]);
    Ok(())
}

#[tokio::test]
async fn one_refused_relay_does_not_stop_the_rest() -> anyhow::Result<()> {
    let mut relays = Vec::new();
    let mut mocks = Vec::new();
    for i in 0..8 {
        if i == 2 {
            relays.push(refused_relay_url().await?);
        } else {
            let mock = MockRelay::spawn(RelayBehavior::Accept).await?;
            relays.push(mock.url.clone());
            mocks.push(mock);
        }
    }
    let pool = RelayPool::new(relays.clone(), Duration::from_secs(5));
    let event = signed("Song A")?;

    let report = pool.publish(&event).await;
    assert_eq!(report.attempted(), 8);
    assert_eq!(report.accepted(), 7);
    assert!(matches!(report.results[2].outcome, RelayOutcome::Failed(_)));
    assert_eq!(report.results[2].relay, relays[2]);
    for mock in &mocks {
        assert_eq!(mock.received().len(), 1);
    }
    Ok(())
}

#[tokio::test]
async fn rejection_is_reported_with_reason() -> anyhow::Result<()> {
    let relay = MockRelay::spawn(RelayBehavior::Reject("blocked: not on allowlist")).await?;
    let pool = RelayPool::new(vec![relay.url.clone()], Duration::from_secs(5));
    let report = pool.publish(&signed("x")?).await;
    assert_eq!(
        report.results[0].outcome,
        RelayOutcome::Rejected("blocked: not on allowlist".into())
    );
    assert_eq!(report.accepted(), 0);
    Ok(())
}

#[tokio::test]
async fn silent_relay_times_out_and_next_still_runs() -> anyhow::Result<()> {
    let silent = MockRelay::spawn(RelayBehavior::Silent).await?;
    let ok = MockRelay::spawn(RelayBehavior::Accept).await?;
    let pool = RelayPool::new(vec![silent.url.clone(), ok.url.clone()], Duration::from_millis(200));

    let report = pool.publish(&signed("x")?).await;
    match &report.results[0].outcome {
        RelayOutcome::Failed(msg) => assert!(msg.contains("timed out"), "{msg}"),
        other => anyhow::bail!("expected timeout, got {other:?}"),
    }
    assert_eq!(report.results[1].outcome, RelayOutcome::Accepted);
    Ok(())
}

#[tokio::test]
async fn close_before_ok_is_a_failure() -> anyhow::Result<()> {
    let relay = MockRelay::spawn(RelayBehavior::Close).await?;
    let pool = RelayPool::new(vec![relay.url.clone()], Duration::from_secs(5));
    let report = pool.publish(&signed("x")?).await;
    assert!(matches!(report.results[0].outcome, RelayOutcome::Failed(_)));
    assert_eq!(relay.received().len(), 1);
    Ok(())
}

#[tokio::test]
async fn empty_pool_attempts_nothing() -> anyhow::Result<()> {
    let pool = RelayPool::new(vec![], Duration::from_secs(1));
    let report = pool.publish(&signed("x")?).await;
    assert_eq!(report, PublishReport::default());
    Ok(())
}
