mod support;

use std::time::Duration;

use lambda_basics_aws::cleanup::CreatedResources;
use lambda_basics_aws::runtime::error::FailureKind;
use lambda_basics_aws::ResourceOrchestrator;
use support::{config_in, rejected, write_ruby_sources, FakeFunctions, FakeIdentity, FakeOrchestrator};
use tokio_util::sync::CancellationToken;

const HANDLER: &str = "lambda_function.lambda_handler";

fn orchestrator(
    dir: &tempfile::TempDir,
    identity: FakeIdentity,
    functions: FakeFunctions,
) -> FakeOrchestrator {
    write_ruby_sources(dir.path());
    ResourceOrchestrator::new(identity, functions, config_in(dir.path()))
}

#[tokio::test(start_paused = true)]
async fn function_that_timed_out_activating_is_still_deleted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let orchestrator = orchestrator(&dir, FakeIdentity::new(), FakeFunctions::never_settles());
    let mut created = CreatedResources::new();

    let role = orchestrator.manage_role("test-fn-role", "create").await;
    created.note_role("test-fn-role", &role);
    let arn = role.expect("role should be created").role().expect("role").arn.clone();
    let package = orchestrator
        .create_deployment_package("lambda_function")
        .expect("package");
    let function = orchestrator
        .create_function("test-fn", HANDLER, &arn, &package)
        .await;
    created.note_function("test-fn", &function);

    assert_eq!(
        function.expect_err("activation should time out").kind(),
        FailureKind::TimedOut
    );
    assert!(orchestrator.functions().exists("test-fn"));

    let failures = created.teardown(&orchestrator).await;

    assert!(failures.is_empty(), "unexpected failures: {failures:?}");
    assert!(!orchestrator.functions().exists("test-fn"));
    assert!(!orchestrator.identity().role_exists("test-fn-role"));
}

#[tokio::test(start_paused = true)]
async fn role_whose_policy_attach_failed_is_still_deleted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let orchestrator = orchestrator(&dir, FakeIdentity::new(), FakeFunctions::new());
    orchestrator
        .identity()
        .fail("attach_role_policy", rejected("PolicyNotAttachable"));
    let mut created = CreatedResources::new();

    let role = orchestrator.manage_role("test-role", "create").await;
    created.note_role("test-role", &role);
    assert!(role.is_err());
    assert!(orchestrator.identity().role_exists("test-role"));

    let failures = created.teardown(&orchestrator).await;

    assert!(failures.is_empty(), "unexpected failures: {failures:?}");
    assert!(!orchestrator.identity().role_exists("test-role"));
    let calls = orchestrator.identity().calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &["detach_role_policy".to_string(), "delete_role".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn role_created_before_cancellation_is_deleted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cancel = CancellationToken::new();
    let orchestrator = orchestrator(&dir, FakeIdentity::new(), FakeFunctions::new())
        .with_cancellation(cancel.clone());
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        trigger.cancel();
    });
    let mut created = CreatedResources::new();

    let role = orchestrator.manage_role("test-role", "create").await;
    created.note_role("test-role", &role);
    assert_eq!(
        role.expect_err("grace period should be cancelled").kind(),
        FailureKind::Cancelled
    );

    let failures = created.teardown(&orchestrator).await;

    assert!(failures.is_empty(), "unexpected failures: {failures:?}");
    assert!(!orchestrator.identity().role_exists("test-role"));
}

#[tokio::test(start_paused = true)]
async fn refused_create_leaves_nothing_to_delete() {
    let dir = tempfile::tempdir().expect("tempdir");
    let orchestrator = orchestrator(&dir, FakeIdentity::new(), FakeFunctions::new());
    orchestrator
        .identity()
        .fail("create_role", rejected("EntityAlreadyExists"));
    let mut created = CreatedResources::new();

    let role = orchestrator.manage_role("someone-elses-role", "create").await;
    created.note_role("someone-elses-role", &role);

    assert!(created.is_empty());
    assert!(created.teardown(&orchestrator).await.is_empty());
    assert_eq!(orchestrator.identity().calls(), vec!["create_role".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn teardown_tolerates_resources_that_are_already_gone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let orchestrator = orchestrator(&dir, FakeIdentity::new(), FakeFunctions::new());
    let mut created = CreatedResources::new();
    created.note_role("gone-role", &Ok::<(), _>(()));
    created.note_function("gone-fn", &Ok::<(), _>(()));

    let failures = created.teardown(&orchestrator).await;

    assert!(failures.is_empty(), "unexpected failures: {failures:?}");
    assert!(orchestrator
        .functions()
        .calls()
        .contains(&"delete_function".to_string()));
    assert!(orchestrator
        .identity()
        .calls()
        .contains(&"delete_role".to_string()));
}

#[tokio::test(start_paused = true)]
async fn teardown_reports_other_failures_after_trying_both() {
    let dir = tempfile::tempdir().expect("tempdir");
    let orchestrator = orchestrator(&dir, FakeIdentity::new(), FakeFunctions::new());
    orchestrator
        .functions()
        .fail("delete_function", rejected("ResourceConflictException"));
    let mut created = CreatedResources::new();
    created.note_role("test-role", &Ok::<(), _>(()));
    created.note_function("test-fn", &Ok::<(), _>(()));

    let failures = created.teardown(&orchestrator).await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind(), FailureKind::Rejected);
    assert!(orchestrator
        .identity()
        .calls()
        .contains(&"delete_role".to_string()));
}
