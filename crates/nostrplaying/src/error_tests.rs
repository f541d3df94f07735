// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    exit = { "exit", FailurePolicy::Exit },
    skip = { "skip", FailurePolicy::Skip },
    upper = { "EXIT", FailurePolicy::Exit },
)]
fn policy_parses(input: &str, expected: FailurePolicy) {
    assert_eq!(input.parse::<FailurePolicy>().ok(), Some(expected));
    assert_eq!(expected.to_string().parse::<FailurePolicy>().ok(), Some(expected));
}

#[test]
fn unknown_policy_rejected() {
    assert!("retry".parse::<FailurePolicy>().is_err());
}

#[yare::parameterized(
    auth = { ErrorKind::Auth, FailurePolicy::Exit },
    control = { ErrorKind::Control, FailurePolicy::Skip },
    publish = { ErrorKind::Publish, FailurePolicy::Skip },
)]
fn fixed_kinds_ignore_configuration(kind: ErrorKind, expected: FailurePolicy) {
    let lenient = Policies { fetch: FailurePolicy::Skip, log: FailurePolicy::Skip };
    let strict = Policies { fetch: FailurePolicy::Exit, log: FailurePolicy::Exit };
    assert_eq!(lenient.for_kind(kind), expected);
    assert_eq!(strict.for_kind(kind), expected);
}

#[test]
fn configurable_kinds_follow_policies() {
    let policies = Policies { fetch: FailurePolicy::Exit, log: FailurePolicy::Skip };
    assert_eq!(policies.for_kind(ErrorKind::Fetch), FailurePolicy::Exit);
    assert_eq!(policies.for_kind(ErrorKind::LogIo), FailurePolicy::Skip);
}

#[test]
fn failure_display_includes_kind_and_context() {
    let result: anyhow::Result<()> =
        Err(anyhow::anyhow!("permission denied")).map_err(|e| e.context("couldn't open log"));
    let failure = result.kind(ErrorKind::LogIo).err();
    assert_eq!(failure.as_ref().map(|f| f.kind), Some(ErrorKind::LogIo));
    assert_eq!(
        failure.map(|f| f.to_string()).as_deref(),
        Some("LOG_IO: couldn't open log: permission denied")
    );
}
