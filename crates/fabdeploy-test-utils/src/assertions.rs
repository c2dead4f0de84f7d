//! Custom assertion helpers for integration tests.

use fabdeploy_client::model::ItemType;
use fabdeploy_core::{ExecutionIdentity, WorkspaceId};
use fabdeploy_flow::DeploymentOutcome;

use crate::memory::MemoryControlPlane;

/// Asserts that every call to `operation` ran under `identity`.
///
/// # Panics
///
/// Panics if no such call was made or one ran under another identity.
pub fn assert_called_as(plane: &MemoryControlPlane, operation: &str, identity: ExecutionIdentity) {
    let calls = plane.calls_to(operation);
    assert!(!calls.is_empty(), "Expected at least one call to {operation}");
    for call in calls {
        assert_eq!(
            call.identity, identity,
            "Expected {operation} to run as {identity}, but it ran as {}",
            call.identity
        );
    }
}

/// Asserts that `operation` was never called.
///
/// # Panics
///
/// Panics if the operation was called.
pub fn assert_not_called(plane: &MemoryControlPlane, operation: &str) {
    let count = plane.call_count(operation);
    assert_eq!(count, 0, "Expected no calls to {operation}, but saw {count}");
}

/// Asserts how many items of a type a workspace holds.
///
/// # Panics
///
/// Panics if the count differs.
pub fn assert_item_count(
    plane: &MemoryControlPlane,
    workspace: WorkspaceId,
    item_type: ItemType,
    expected: usize,
) {
    let actual = plane.items_of_type(workspace, item_type).len();
    assert_eq!(
        actual, expected,
        "Expected {expected} {item_type} item(s) in workspace {workspace}, found {actual}"
    );
}

/// Asserts that a run created nothing and reused everything it touched.
///
/// # Panics
///
/// Panics if the run created the workspace or any item.
pub fn assert_nothing_created(outcome: &DeploymentOutcome) {
    assert!(
        !outcome.workspace_created,
        "Expected the workspace to be reused"
    );
    assert!(
        outcome.created.is_empty(),
        "Expected no created items, but saw {:?}",
        outcome.created
    );
}

/// Asserts that a run created an item of `item_type` named `name`.
///
/// # Panics
///
/// Panics if no such item is listed as created.
pub fn assert_created(outcome: &DeploymentOutcome, item_type: ItemType, name: &str) {
    assert!(
        outcome
            .created
            .iter()
            .any(|(t, n)| *t == item_type && n == name),
        "Expected {item_type} {name} to be created, created list was {:?}",
        outcome.created
    );
}
