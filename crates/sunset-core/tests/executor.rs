//! Execution engine: batching, cascade, dry run and the OTP protocol.

mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use sunset_core::otp::{NoOtp, OtpProvider, StaticOtp};
use sunset_core::plan::{
    create_plan, Executor, ExecutorOptions, OverallStatus, PackageAction, PlanOptions,
    ProgressEvent, RepoProvider, Step, StepStatus,
};
use support::{old_package, packument, CountingOtp, FakeRegistry, Method, RecordingArchiver};

fn executor(registry: Arc<FakeRegistry>, otp: Arc<dyn OtpProvider>) -> Executor {
    Executor::new(registry, otp, Arc::new(RecordingArchiver::default()))
}

fn deprecate_step() -> Step {
    Step::Deprecate {
        range: "*".into(),
        message: "No longer maintained".into(),
    }
}

#[tokio::test]
async fn test_dry_run_makes_no_registry_calls() {
    let registry = Arc::new(
        FakeRegistry::new("alice")
            .with_package(old_package("a", &["alice"]))
            .with_package(old_package("b", &["alice", "bob"])),
    );
    let plan = create_plan(
        vec![
            PackageAction::deprecate("a", "*", "bye").then(Step::OwnerRemove { user: "bob".into() }),
            PackageAction::tombstone("b", "nextMajor", "gone"),
        ],
        "alice",
        PlanOptions {
            dry_run: true,
            ..PlanOptions::default()
        },
    );

    let result = executor(registry.clone(), Arc::new(NoOtp))
        .execute(&plan, ExecutorOptions::default())
        .await;

    assert!(registry.calls().is_empty());
    assert_eq!(result.summary.succeeded, 2);
    for step in result.results.iter().flat_map(|r| &r.steps) {
        assert_eq!(step.status, StepStatus::Success);
        assert_eq!(step.message.as_deref(), Some("[DRY RUN] Skipped"));
    }
}

#[tokio::test]
async fn test_dry_run_override_beats_plan_option() {
    let registry = Arc::new(FakeRegistry::new("alice").with_package(old_package("a", &["alice"])));
    let plan = create_plan(
        vec![PackageAction::deprecate("a", "*", "bye")],
        "alice",
        PlanOptions::default(),
    );

    executor(registry.clone(), Arc::new(NoOtp))
        .execute(
            &plan,
            ExecutorOptions {
                dry_run: Some(true),
                ..ExecutorOptions::default()
            },
        )
        .await;

    assert!(registry.mutations().is_empty());
}

#[tokio::test]
async fn test_failure_skips_remaining_steps_in_package_only() {
    let registry = Arc::new(
        FakeRegistry::new("alice")
            .with_package(old_package("a", &["alice"]))
            .with_package(old_package("b", &["alice"])),
    );
    let plan = create_plan(
        vec![
            PackageAction::new(
                "a",
                vec![
                    deprecate_step(),
                    // 1.0.0 exists, so this fails.
                    Step::Tombstone {
                        target_version: "1.0.0".into(),
                        message: "gone".into(),
                    },
                    Step::OwnerAdd { user: "carol".into() },
                    Step::Undeprecate { range: "*".into() },
                ],
            ),
            PackageAction::owner_add("b", "carol"),
        ],
        "alice",
        PlanOptions::default(),
    );

    let result = executor(registry.clone(), Arc::new(NoOtp))
        .execute(&plan, ExecutorOptions::default())
        .await;

    let a = &result.results[0];
    let statuses: Vec<StepStatus> = a.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            StepStatus::Success,
            StepStatus::Failed,
            StepStatus::Skipped,
            StepStatus::Skipped
        ]
    );
    assert_eq!(a.steps[1].error.as_deref(), Some("Version 1.0.0 already exists"));
    for skipped in &a.steps[2..] {
        assert_eq!(skipped.message.as_deref(), Some("Skipped due to previous failure"));
    }
    assert_eq!(a.overall_status, OverallStatus::Partial);

    let b = &result.results[1];
    assert_eq!(b.overall_status, OverallStatus::Success);
    assert!(registry.stored("b").unwrap().maintainers.iter().any(|m| m.name == "carol"));

    assert_eq!(result.summary.total, 2);
    assert_eq!(result.summary.succeeded, 1);
    assert_eq!(result.summary.partial, 1);
    assert_eq!(result.summary.failed, 0);
}

#[tokio::test]
async fn test_batches_run_to_completion_before_the_next_starts() {
    let delays = [40, 10, 30, 5, 20];
    let mut fake = FakeRegistry::new("alice");
    for (i, ms) in delays.iter().enumerate() {
        let name = format!("p{i}");
        fake = fake
            .with_package(old_package(&name, &["alice"]))
            .with_delay(&name, Duration::from_millis(*ms));
    }
    let registry = Arc::new(fake);

    let actions = (0..5)
        .map(|i| PackageAction::owner_add(format!("p{i}"), "bob"))
        .collect();
    let plan = create_plan(
        actions,
        "alice",
        PlanOptions {
            concurrency: 2,
            ..PlanOptions::default()
        },
    );

    let result = executor(registry.clone(), Arc::new(NoOtp))
        .execute(&plan, ExecutorOptions::default())
        .await;
    assert_eq!(result.summary.succeeded, 5);

    let packages: Vec<&str> = result.results.iter().map(|r| r.package.as_str()).collect();
    assert_eq!(packages, vec!["p0", "p1", "p2", "p3", "p4"]);

    let batches: [&[&str]; 3] = [&["p0", "p1"], &["p2", "p3"], &["p4"]];
    for pair in batches.windows(2) {
        let previous_end = pair[0]
            .iter()
            .flat_map(|p| registry.calls_for(p))
            .map(|c| c.finished)
            .max()
            .unwrap();
        let next_start = pair[1]
            .iter()
            .flat_map(|p| registry.calls_for(p))
            .map(|c| c.started)
            .min()
            .unwrap();
        assert!(next_start >= previous_end, "batch started before the previous one finished");
    }
}

#[tokio::test]
async fn test_otp_challenge_retries_once_with_fresh_code() {
    let registry = Arc::new(
        FakeRegistry::new("alice")
            .with_package(old_package("a", &["alice"]))
            .requiring_otp("123456"),
    );
    let otp = Arc::new(CountingOtp::new("123456"));
    let plan = create_plan(
        vec![PackageAction::deprecate("a", "*", "bye")],
        "alice",
        PlanOptions::default(),
    );

    let result = executor(registry.clone(), otp.clone())
        .execute(&plan, ExecutorOptions::default())
        .await;

    assert_eq!(result.results[0].overall_status, OverallStatus::Success);
    assert_eq!(otp.calls(), 1);
    assert_eq!(registry.otp_challenges(), 1);

    let puts: Vec<Option<String>> = registry
        .mutations()
        .into_iter()
        .map(|c| c.otp)
        .collect();
    assert_eq!(puts, vec![None, Some("123456".to_string())]);
}

#[tokio::test]
async fn test_second_otp_challenge_fails_the_step() {
    let registry = Arc::new(
        FakeRegistry::new("alice")
            .with_package(old_package("a", &["alice"]))
            .requiring_otp("123456"),
    );
    let plan = create_plan(
        vec![PackageAction::deprecate("a", "*", "bye").then(Step::OwnerAdd { user: "bob".into() })],
        "alice",
        PlanOptions::default(),
    );

    let result = executor(registry.clone(), Arc::new(StaticOtp("000000".into())))
        .execute(&plan, ExecutorOptions::default())
        .await;

    let steps = &result.results[0].steps;
    assert_eq!(steps[0].status, StepStatus::Failed);
    assert_eq!(steps[0].error.as_deref(), Some("OTP required for this operation"));
    assert_eq!(steps[1].status, StepStatus::Skipped);
    assert_eq!(registry.otp_challenges(), 2);
}

#[tokio::test]
async fn test_missing_otp_provider_fails_step_without_retry() {
    let registry = Arc::new(
        FakeRegistry::new("alice")
            .with_package(old_package("a", &["alice"]))
            .requiring_otp("123456"),
    );
    let plan = create_plan(
        vec![PackageAction::owner_add("a", "bob")],
        "alice",
        PlanOptions::default(),
    );

    let result = executor(registry.clone(), Arc::new(NoOtp))
        .execute(&plan, ExecutorOptions::default())
        .await;

    let step = &result.results[0].steps[0];
    assert_eq!(step.status, StepStatus::Failed);
    assert!(step.error.as_deref().unwrap().starts_with("OTP required"));
    assert_eq!(registry.mutations().len(), 1);
}

#[tokio::test]
async fn test_concurrent_challenges_share_one_code() {
    let mut fake = FakeRegistry::new("alice").requiring_otp("654321");
    for name in ["a", "b", "c"] {
        fake = fake.with_package(old_package(name, &["alice"]));
    }
    let registry = Arc::new(fake);
    let otp = Arc::new(CountingOtp::new("654321"));
    let plan = create_plan(
        ["a", "b", "c"]
            .into_iter()
            .map(|p| PackageAction::owner_add(p, "bob"))
            .collect(),
        "alice",
        PlanOptions::default(),
    );

    let result = executor(registry.clone(), otp.clone())
        .execute(&plan, ExecutorOptions::default())
        .await;

    assert_eq!(result.summary.succeeded, 3);
    assert_eq!(otp.calls(), 1);
}

#[tokio::test]
async fn test_initial_otp_is_used_for_first_write() {
    let registry = Arc::new(
        FakeRegistry::new("alice")
            .with_package(old_package("a", &["alice"]))
            .requiring_otp("111111"),
    );
    let plan = create_plan(
        vec![PackageAction::owner_add("a", "bob")],
        "alice",
        PlanOptions::default(),
    );

    let result = executor(registry.clone(), Arc::new(NoOtp))
        .execute(
            &plan,
            ExecutorOptions {
                otp: Some("111111".into()),
                ..ExecutorOptions::default()
            },
        )
        .await;

    assert!(result.is_success());
    assert_eq!(registry.otp_challenges(), 0);
}

#[tokio::test]
async fn test_unpublish_is_skipped_when_disabled() {
    let registry = Arc::new(FakeRegistry::new("alice").with_package(old_package("a", &["alice"])));
    let plan = create_plan(
        vec![PackageAction::unpublish("a", Some("1.0.0".into()), false)
            .then(Step::OwnerAdd { user: "bob".into() })],
        "alice",
        PlanOptions::default(),
    );

    let result = executor(registry.clone(), Arc::new(NoOtp))
        .execute(&plan, ExecutorOptions::default())
        .await;

    let steps = &result.results[0].steps;
    assert_eq!(steps[0].status, StepStatus::Skipped);
    assert_eq!(
        steps[0].message.as_deref(),
        Some("Unpublish disabled (use --enable-unpublish)")
    );
    assert_eq!(steps[1].status, StepStatus::Success);
    assert!(registry.calls().iter().all(|c| c.method != Method::Delete));
}

#[tokio::test]
async fn test_unpublish_recent_version_when_enabled() {
    let now = Utc::now();
    let registry = Arc::new(FakeRegistry::new("alice").with_package(packument(
        "fresh",
        &["alice", "bob"],
        &[
            ("1.0.0", now - chrono::Duration::days(30)),
            ("1.0.1", now - chrono::Duration::hours(2)),
        ],
    )));
    let plan = create_plan(
        vec![PackageAction::unpublish("fresh", Some("1.0.1".into()), false)],
        "alice",
        PlanOptions {
            enable_unpublish: true,
            ..PlanOptions::default()
        },
    );

    let result = executor(registry.clone(), Arc::new(NoOtp))
        .execute(&plan, ExecutorOptions::default())
        .await;

    assert!(result.is_success());
    assert!(!registry.stored("fresh").unwrap().versions.contains_key("1.0.1"));
}

#[tokio::test]
async fn test_archive_repo_uses_archiver() {
    let registry = Arc::new(FakeRegistry::new("alice").with_package(old_package("a", &["alice"])));
    let archiver = Arc::new(RecordingArchiver::default());
    let plan = create_plan(
        vec![
            PackageAction::archive_repo("a", RepoProvider::Github, "https://github.com/acme/a", true),
            PackageAction::archive_repo("b", RepoProvider::Gitlab, "acme/b", true),
        ],
        "alice",
        PlanOptions::default(),
    );

    let result = Executor::new(registry, Arc::new(NoOtp), archiver.clone())
        .execute(&plan, ExecutorOptions::default())
        .await;

    assert_eq!(result.results[0].overall_status, OverallStatus::Success);
    assert_eq!(result.results[1].overall_status, OverallStatus::Failed);
    assert!(result.results[1].steps[0]
        .error
        .as_deref()
        .unwrap()
        .contains("not yet supported"));
    assert_eq!(
        *archiver.archived.lock().unwrap(),
        vec![("acme/a".to_string(), true)]
    );
}

#[tokio::test]
async fn test_progress_reports_every_package() {
    let registry = Arc::new(
        FakeRegistry::new("alice")
            .with_package(old_package("a", &["alice"]))
            .with_package(old_package("b", &["alice"])),
    );
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let plan = create_plan(
        vec![
            PackageAction::owner_add("a", "bob"),
            PackageAction::owner_add("b", "bob"),
        ],
        "alice",
        PlanOptions::default(),
    );

    executor(registry, Arc::new(NoOtp))
        .with_progress(Arc::new(move |event: ProgressEvent| {
            sink_events.lock().unwrap().push(event);
        }))
        .execute(&plan, ExecutorOptions::default())
        .await;

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].done, 2);
    assert_eq!(events[1].total, 2);
}
