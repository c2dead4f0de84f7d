//! Resource client policy against the in-memory control plane: identity
//! rules, find-first creates, polling and the refresh retry.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{Duration, Utc};
use fabdeploy_client::Error;
use fabdeploy_client::resource::suffixed_name;
use fabdeploy_client::model::{ItemType, JobStatus};
use fabdeploy_core::{AuthenticationMode, ExecutionIdentity};
use fabdeploy_test_utils::{
    TestContext, assert_called_as, init_test_logging, web_datasource,
};

#[tokio::test(start_paused = true)]
async fn trial_capacity_is_assigned_as_delegated_user() {
    init_test_logging();
    let ctx = TestContext::with_capacity_sku("FT1", |_| {});
    let client = ctx.client();

    let workspace = client
        .create_workspace("Contoso", Some(ctx.capacity.id), None)
        .await
        .expect("create workspace");

    let assignments = ctx.plane.capacity_assignments();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].workspace, workspace.id);
    assert_eq!(assignments[0].identity, ExecutionIdentity::DelegatedUser);
    assert_called_as(&ctx.plane, "create workspace", ExecutionIdentity::ServicePrincipal);
    assert_called_as(&ctx.plane, "list capacities", ExecutionIdentity::DelegatedUser);
}

#[tokio::test(start_paused = true)]
async fn paid_capacity_is_assigned_as_service_principal() {
    let ctx = TestContext::new();
    let client = ctx.client();

    client
        .create_workspace("Contoso", Some(ctx.capacity.id), None)
        .await
        .expect("create workspace");

    let assignments = ctx.plane.capacity_assignments();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].identity, ExecutionIdentity::ServicePrincipal);
}

#[tokio::test(start_paused = true)]
async fn user_auth_provisions_everything_as_the_user() {
    let ctx = TestContext::with_capacity_sku("FT1", |settings| {
        settings.auth_mode = AuthenticationMode::User;
    });
    let client = ctx.client();
    assert_eq!(client.identity(), ExecutionIdentity::DelegatedUser);

    client
        .create_workspace("Contoso", Some(ctx.capacity.id), None)
        .await
        .expect("create workspace");

    assert_called_as(&ctx.plane, "create workspace", ExecutionIdentity::DelegatedUser);
    assert_called_as(&ctx.plane, "assign to capacity", ExecutionIdentity::DelegatedUser);
    assert_eq!(ctx.plane.call_count("list capacities"), 0);
}

#[tokio::test(start_paused = true)]
async fn paid_capacity_is_assigned_as_the_acting_identity() {
    let ctx = TestContext::with_profile();
    let workspace = ctx.plane.add_workspace("Contoso");
    let profile = ctx
        .client()
        .acting_as(ExecutionIdentity::ServicePrincipalProfile);

    profile
        .assign_workspace_to_capacity(workspace.id, ctx.capacity.id)
        .await
        .expect("assign");

    let assignments = ctx.plane.capacity_assignments();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].workspace, workspace.id);
    assert_eq!(
        assignments[0].identity,
        ExecutionIdentity::ServicePrincipalProfile
    );
}

#[tokio::test(start_paused = true)]
async fn trial_capacity_overrides_the_acting_identity() {
    let ctx = TestContext::with_capacity_sku("FT1", |_| {});
    let workspace = ctx.plane.add_workspace("Contoso");
    let profile = ctx
        .client()
        .acting_as(ExecutionIdentity::ServicePrincipalProfile);

    profile
        .assign_workspace_to_capacity(workspace.id, ctx.capacity.id)
        .await
        .expect("assign");

    assert_eq!(
        ctx.plane.capacity_assignments()[0].identity,
        ExecutionIdentity::DelegatedUser
    );
}

#[tokio::test(start_paused = true)]
async fn capacity_rejection_is_a_capacity_assignment_error() {
    let ctx = TestContext::new();
    let client = ctx.client();
    let workspace = ctx.plane.add_workspace("Contoso");
    ctx.plane.fail_next("assign to capacity", 403);

    let err = client
        .assign_workspace_to_capacity(workspace.id, ctx.capacity.id)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CapacityAssignment { .. }), "{err:?}");
}

#[tokio::test(start_paused = true)]
async fn taken_workspace_name_gets_a_suffix() {
    let ctx = TestContext::new();
    ctx.plane.add_workspace("Contoso");

    let created = ctx
        .client()
        .create_workspace("Contoso", None, None)
        .await
        .expect("create workspace");

    assert!(created.display_name.starts_with("Contoso-"));
    assert_eq!(created.display_name.len(), "Contoso-".len() + 14);
    assert_eq!(ctx.plane.workspaces().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn suffixed_name_skips_names_already_taken() {
    let ctx = TestContext::new();
    ctx.plane.add_workspace("Contoso");
    let now = Utc::now();
    let mut taken = Vec::new();
    for offset in -2..10 {
        let name = suffixed_name("Contoso", now + Duration::seconds(offset));
        ctx.plane.add_workspace(&name);
        taken.push(name);
    }

    let created = ctx
        .client()
        .create_workspace("Contoso", None, None)
        .await
        .expect("create workspace");

    assert!(created.display_name.starts_with("Contoso-"));
    assert!(!taken.contains(&created.display_name));
    assert_eq!(ctx.plane.call_count("create workspace"), 1);
    assert_eq!(ctx.plane.workspaces().len(), taken.len() + 2);
}

#[tokio::test(start_paused = true)]
async fn transient_create_failure_is_reissued_once_nothing_landed() {
    let ctx = TestContext::new();
    ctx.plane.fail_next("create workspace", 503);

    ctx.client()
        .create_workspace("Contoso", None, None)
        .await
        .expect("create workspace");

    assert_eq!(ctx.plane.call_count("create workspace"), 2);
    assert_eq!(ctx.plane.workspaces().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn conflicting_create_is_not_retried() {
    let ctx = TestContext::new();
    let workspace = ctx.plane.add_workspace("Contoso");
    ctx.plane.add_item(workspace.id, "sales", ItemType::Lakehouse);

    let err = ctx
        .client()
        .create_lakehouse(workspace.id, "sales", false)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(409));
    assert_eq!(ctx.plane.call_count("create item"), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_reads_are_retried() {
    let ctx = TestContext::new();
    ctx.plane.add_workspace("Contoso");
    ctx.plane.fail_next("list workspaces", 429);
    ctx.plane.fail_next("list workspaces", 503);

    let found = ctx
        .client()
        .find_workspace_by_name("contoso")
        .await
        .expect("lookup");

    assert!(found.is_some());
    assert_eq!(ctx.plane.call_count("list workspaces"), 3);
}

#[tokio::test(start_paused = true)]
async fn personal_workspaces_are_not_listed() {
    let ctx = TestContext::new();
    ctx.plane.add_workspace("Contoso");
    ctx.plane.add_personal_workspace("My workspace");

    let listed = ctx.client().list_workspaces().await.expect("list");

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].display_name, "Contoso");
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_is_retried_once() {
    let ctx = TestContext::new();
    let workspace = ctx.plane.add_workspace("Contoso");
    let model = ctx
        .plane
        .add_item(workspace.id, "Sales", ItemType::SemanticModel);
    ctx.plane.script_refresh_outcomes(["Failed"]);

    let refresh = ctx
        .client()
        .refresh_dataset(workspace.id, model.id)
        .await
        .expect("refresh");

    assert_eq!(refresh.status, "Completed");
    assert_eq!(ctx.plane.call_count("trigger refresh"), 2);
}

#[tokio::test(start_paused = true)]
async fn second_refresh_failure_surfaces() {
    let ctx = TestContext::new();
    let workspace = ctx.plane.add_workspace("Contoso");
    let model = ctx
        .plane
        .add_item(workspace.id, "Sales", ItemType::SemanticModel);
    ctx.plane.script_refresh_outcomes(["Failed", "Failed"]);

    let err = ctx
        .client()
        .refresh_dataset(workspace.id, model.id)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::JobExecution { .. }), "{err:?}");
    assert_eq!(ctx.plane.call_count("trigger refresh"), 2);
}

#[tokio::test(start_paused = true)]
async fn notebook_job_outcomes() {
    let ctx = TestContext::new();
    let workspace = ctx.plane.add_workspace("Contoso");
    let notebook = ctx
        .plane
        .add_item(workspace.id, "Create Lakehouse Tables", ItemType::Notebook);
    let client = ctx.client();

    let job = client
        .run_notebook(workspace.id, notebook.id)
        .await
        .expect("notebook");
    assert_eq!(job.status, JobStatus::Completed);

    ctx.plane.script_job_outcomes([JobStatus::Failed]);
    let err = client
        .run_notebook(workspace.id, notebook.id)
        .await
        .unwrap_err();
    match err {
        Error::JobExecution { reason, .. } => assert!(reason.contains("exception")),
        other => panic!("unexpected error: {other:?}"),
    }

    ctx.plane.set_job_trigger_status(400);
    let err = client
        .run_notebook(workspace.id, notebook.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::JobStart { status: 400, .. }), "{err:?}");
}

#[tokio::test(start_paused = true)]
async fn sql_endpoint_is_awaited_until_provisioned() {
    let ctx = TestContext::new();
    let workspace = ctx.plane.add_workspace("Contoso");
    let lakehouse = ctx.plane.add_item(workspace.id, "sales", ItemType::Lakehouse);
    ctx.plane.set_sql_endpoint_pending_polls(2);

    let endpoint = ctx
        .client()
        .get_sql_endpoint(workspace.id, lakehouse.id)
        .await
        .expect("sql endpoint");

    assert_eq!(endpoint.id, lakehouse.id.to_string());
    assert_eq!(ctx.plane.call_count("get lakehouse"), 3);
}

#[tokio::test(start_paused = true)]
async fn onelake_path_drops_the_tables_folder() {
    let ctx = TestContext::new();
    let workspace = ctx.plane.add_workspace("Contoso");
    let lakehouse = ctx.plane.add_item(workspace.id, "sales", ItemType::Lakehouse);

    let path = ctx
        .client()
        .get_onelake_path(workspace.id, lakehouse.id)
        .await
        .expect("path");

    assert_eq!(
        path,
        format!(
            "https://onelake.dfs.fabric.microsoft.com/{}/{}/",
            workspace.id, lakehouse.id
        )
    );
}

#[tokio::test(start_paused = true)]
async fn web_connection_is_found_before_create() {
    let ctx = TestContext::new();
    let workspace = ctx.plane.add_workspace("Contoso");
    let client = ctx.client();

    let first = client
        .create_anonymous_web_connection("https://example/data", workspace.id)
        .await
        .expect("first");
    let second = client
        .create_anonymous_web_connection("https://example/data", workspace.id)
        .await
        .expect("second");

    assert_eq!(first.id, second.id);
    assert_eq!(ctx.plane.connections().len(), 1);
    assert_eq!(ctx.plane.call_count("create connection"), 1);
    assert_eq!(ctx.plane.connection_role_assignments().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn anonymous_credentials_only_touch_gateway_web_sources() {
    let ctx = TestContext::new();
    let workspace = ctx.plane.add_workspace("Contoso");
    let model = ctx
        .plane
        .add_item(workspace.id, "Product Sales", ItemType::SemanticModel);
    ctx.plane.set_datasources(vec![
        web_datasource("https://example/data"),
        fabdeploy_test_utils::storage_datasource("https://onelake", "/sales"),
    ]);

    let patched = ctx
        .client()
        .patch_anonymous_web_credentials(workspace.id, model.id)
        .await
        .expect("patch");

    assert_eq!(patched, 1);
    assert_eq!(ctx.plane.anonymous_credentials().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn embedding_identity_prefers_the_profile() {
    let plain = TestContext::new();
    assert_eq!(
        plain.client().embedding_identity(),
        ExecutionIdentity::ServicePrincipal
    );

    let profiled = TestContext::with_profile();
    assert_eq!(
        profiled.client().embedding_identity(),
        ExecutionIdentity::ServicePrincipalProfile
    );
}

#[tokio::test(start_paused = true)]
async fn profiles_are_managed_as_the_service_principal() {
    let ctx = TestContext::with_capacity_sku("F64", |settings| {
        settings.auth_mode = AuthenticationMode::User;
    });
    let client = ctx.client();

    let profile = client.create_profile("Contoso Embedding").await.expect("create");
    let listed = client.list_profiles().await.expect("list");

    assert_eq!(listed, vec![profile]);
    assert_called_as(&ctx.plane, "create profile", ExecutionIdentity::ServicePrincipal);
    assert_called_as(&ctx.plane, "list profiles", ExecutionIdentity::ServicePrincipal);
}

#[tokio::test(start_paused = true)]
async fn missing_identity_credentials_surface() {
    let ctx = TestContext::new();
    ctx.plane
        .set_identity_unavailable(ExecutionIdentity::ServicePrincipal);

    let err = ctx.client().list_capacities().await.unwrap_err();

    assert!(
        matches!(
            err,
            Error::IdentityUnavailable {
                identity: ExecutionIdentity::ServicePrincipal
            }
        ),
        "{err:?}"
    );
}
