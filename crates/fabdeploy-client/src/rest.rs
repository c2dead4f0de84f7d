//! HTTP transport for both control-plane surfaces.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use fabdeploy_core::config::Endpoints;
use fabdeploy_core::{
    CapacityId, ConnectionId, ExecutionIdentity, ItemId, JobId, ProfileId, WorkspaceId,
};

use crate::auth::CredentialCache;
use crate::control_plane::ControlPlane;
use crate::error::{Error, Result};
use crate::jobs::{JobPoller, Observation, PollState};
use crate::model::{
    Capacity, Connection, ConnectionRoleAssignment, CreateConnectionRequest, CreateItemRequest,
    CreateWorkspaceRequest, DatasetRefresh, Datasource, EmbedToken, EmbedTokenRequest, Import,
    Item, JobInstance, JobTrigger, Lakehouse, Profile, RefreshSchedule, RefreshTrigger, Report,
    Workspace, WorkspaceRoleAssignment,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(100);

/// Header selecting the service principal profile a call acts as.
pub const PROFILE_HEADER: &str = "X-PowerBI-Profile-Id";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    value: Vec<T>,
    #[serde(default)]
    continuation_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationState {
    status: String,
    #[serde(default)]
    error: Option<Value>,
}

impl Observation for OperationState {
    fn state(&self) -> PollState {
        match self.status.as_str() {
            "Succeeded" => PollState::Succeeded,
            "Failed" | "Undefined" => PollState::Failed(
                self.error
                    .as_ref()
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("operation failed")
                    .to_string(),
            ),
            _ => PollState::Pending,
        }
    }

    fn status_label(&self) -> String {
        self.status.clone()
    }
}

#[derive(Debug, Deserialize)]
struct ImportHandle {
    id: String,
}

/// REST implementation of [`ControlPlane`].
#[derive(Debug, Clone)]
pub struct RestControlPlane {
    http: reqwest::Client,
    endpoints: Endpoints,
    credentials: Arc<CredentialCache>,
    profile_id: Option<ProfileId>,
    operations: JobPoller,
}

impl RestControlPlane {
    /// Creates a transport.
    ///
    /// `operations` bounds the wait on long-running creations.
    #[must_use]
    pub fn new(
        endpoints: Endpoints,
        credentials: Arc<CredentialCache>,
        profile_id: Option<ProfileId>,
        operations: JobPoller,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            endpoints,
            credentials,
            profile_id,
            operations,
        }
    }

    fn fabric_url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoints.fabric_api.trim_end_matches('/'))
    }

    fn powerbi_url(&self, path: &str) -> String {
        format!(
            "{}/v1.0/myorg/{path}",
            self.endpoints.powerbi_api.trim_end_matches('/')
        )
    }

    fn request(
        &self,
        identity: ExecutionIdentity,
        method: Method,
        url: &str,
        operation: &str,
    ) -> Result<RequestBuilder> {
        tracing::debug!(operation, %identity, %method, url, "control-plane call");
        let token = self.credentials.bearer(identity)?;
        let mut builder = self
            .http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, token.header_value());
        if identity == ExecutionIdentity::ServicePrincipalProfile {
            if let Some(profile) = self.profile_id {
                builder = builder.header(PROFILE_HEADER, profile.to_string());
            }
        }
        Ok(builder)
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| Error::Transport {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.bytes().await.map_err(|e| Error::Transport {
            operation: operation.to_string(),
            message: format!("failed reading error body: {e}"),
        })?;
        Err(Error::remote(operation, status.as_u16(), error_message(&body)))
    }

    async fn json<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| Error::malformed(operation, e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        identity: ExecutionIdentity,
        url: &str,
        operation: &str,
    ) -> Result<T> {
        let builder = self.request(identity, Method::GET, url, operation)?;
        let response = self.send(operation, builder).await?;
        Self::json(operation, response).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        identity: ExecutionIdentity,
        method: Method,
        url: &str,
        body: &(impl serde::Serialize + Sync),
        operation: &str,
    ) -> Result<T> {
        let builder = self.request(identity, method, url, operation)?.json(body);
        let response = self.send(operation, builder).await?;
        Self::json(operation, response).await
    }

    async fn send_unit(
        &self,
        identity: ExecutionIdentity,
        method: Method,
        url: &str,
        body: &(impl serde::Serialize + Sync),
        operation: &str,
    ) -> Result<()> {
        let builder = self.request(identity, method, url, operation)?.json(body);
        self.send(operation, builder).await?;
        Ok(())
    }

    async fn list_all<T: DeserializeOwned>(
        &self,
        identity: ExecutionIdentity,
        url: String,
        operation: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next.take() {
            let page: Page<T> = self.get_json(identity, &url, operation).await?;
            items.extend(page.value);
            next = page.continuation_uri.filter(|uri| !uri.is_empty());
        }
        Ok(items)
    }

    /// Follows a 202 + `Location` long-running operation to its result.
    async fn await_operation<T: DeserializeOwned>(
        &self,
        identity: ExecutionIdentity,
        headers: &HeaderMap,
        operation: &str,
    ) -> Result<T> {
        let location = header_str(headers, LOCATION.as_str())
            .ok_or_else(|| Error::malformed(operation, "accepted without a Location header"))?
            .to_string();

        let status_url = location.as_str();
        self.operations
            .poll(operation, move || async move {
                self.get_json::<OperationState>(identity, status_url, operation)
                    .await
            })
            .await?;

        self.get_json(identity, &format!("{}/result", location.trim_end_matches('/')), operation)
            .await
    }
}

#[async_trait]
impl ControlPlane for RestControlPlane {
    async fn list_workspaces(&self, identity: ExecutionIdentity) -> Result<Vec<Workspace>> {
        self.list_all(identity, self.fabric_url("workspaces"), "list workspaces")
            .await
    }

    async fn create_workspace(
        &self,
        identity: ExecutionIdentity,
        request: &CreateWorkspaceRequest,
    ) -> Result<Workspace> {
        self.send_json(
            identity,
            Method::POST,
            &self.fabric_url("workspaces"),
            request,
            "create workspace",
        )
        .await
    }

    async fn update_workspace_description(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        description: &str,
    ) -> Result<Workspace> {
        self.send_json(
            identity,
            Method::PATCH,
            &self.fabric_url(&format!("workspaces/{workspace}")),
            &json!({ "description": description }),
            "update workspace",
        )
        .await
    }

    async fn add_workspace_role_assignment(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        assignment: &WorkspaceRoleAssignment,
    ) -> Result<()> {
        self.send_unit(
            identity,
            Method::POST,
            &self.fabric_url(&format!("workspaces/{workspace}/roleAssignments")),
            assignment,
            "add workspace role assignment",
        )
        .await
    }

    async fn list_capacities(&self, identity: ExecutionIdentity) -> Result<Vec<Capacity>> {
        self.list_all(identity, self.fabric_url("capacities"), "list capacities")
            .await
    }

    async fn assign_to_capacity(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        capacity: CapacityId,
    ) -> Result<()> {
        self.send_unit(
            identity,
            Method::POST,
            &self.fabric_url(&format!("workspaces/{workspace}/assignToCapacity")),
            &json!({ "capacityId": capacity }),
            "assign to capacity",
        )
        .await
    }

    async fn list_items(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
    ) -> Result<Vec<Item>> {
        self.list_all(
            identity,
            self.fabric_url(&format!("workspaces/{workspace}/items")),
            "list items",
        )
        .await
    }

    async fn create_item(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        request: &CreateItemRequest,
    ) -> Result<Item> {
        let operation = "create item";
        let url = self.fabric_url(&format!("workspaces/{workspace}/items"));
        let builder = self.request(identity, Method::POST, &url, operation)?.json(request);
        let response = self.send(operation, builder).await?;

        if response.status() == StatusCode::ACCEPTED {
            let headers = response.headers().clone();
            return self.await_operation(identity, &headers, operation).await;
        }
        Self::json(operation, response).await
    }

    async fn get_lakehouse(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        lakehouse: ItemId,
    ) -> Result<Lakehouse> {
        self.get_json(
            identity,
            &self.fabric_url(&format!("workspaces/{workspace}/lakehouses/{lakehouse}")),
            "get lakehouse",
        )
        .await
    }

    async fn refresh_sql_endpoint_metadata(
        &self,
        identity: ExecutionIdentity,
        sql_endpoint_id: &str,
    ) -> Result<()> {
        self.send_unit(
            identity,
            Method::POST,
            &self.powerbi_url(&format!("lhdatamarts/{sql_endpoint_id}")),
            &json!({ "commands": [{ "$type": "MetadataRefreshCommand" }] }),
            "refresh sql endpoint metadata",
        )
        .await
    }

    async fn list_connections(&self, identity: ExecutionIdentity) -> Result<Vec<Connection>> {
        self.list_all(identity, self.fabric_url("connections"), "list connections")
            .await
    }

    async fn create_connection(
        &self,
        identity: ExecutionIdentity,
        request: &CreateConnectionRequest,
    ) -> Result<Connection> {
        self.send_json(
            identity,
            Method::POST,
            &self.fabric_url("connections"),
            request,
            "create connection",
        )
        .await
    }

    async fn add_connection_role_assignment(
        &self,
        identity: ExecutionIdentity,
        connection: ConnectionId,
        assignment: &ConnectionRoleAssignment,
    ) -> Result<()> {
        self.send_unit(
            identity,
            Method::POST,
            &self.fabric_url(&format!("connections/{connection}/roleAssignments")),
            assignment,
            "add connection role assignment",
        )
        .await
    }

    async fn run_item_job(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        item: ItemId,
        job_type: &str,
    ) -> Result<JobTrigger> {
        let operation = "run item job";
        let url = self.fabric_url(&format!("workspaces/{workspace}/items/{item}/jobs/instances"));
        let response = self
            .request(identity, Method::POST, &url, operation)?
            .query(&[("jobType", job_type)])
            .send()
            .await
            .map_err(|e| Error::Transport {
                operation: operation.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let job_id = header_str(response.headers(), LOCATION.as_str())
            .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
            .and_then(|segment| segment.parse::<JobId>().ok());
        Ok(JobTrigger { status, job_id })
    }

    async fn get_item_job(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        item: ItemId,
        job: JobId,
    ) -> Result<JobInstance> {
        self.get_json(
            identity,
            &self.fabric_url(&format!(
                "workspaces/{workspace}/items/{item}/jobs/instances/{job}"
            )),
            "get item job",
        )
        .await
    }

    async fn list_datasources(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
    ) -> Result<Vec<Datasource>> {
        self.list_all(
            identity,
            self.powerbi_url(&format!("groups/{workspace}/datasets/{dataset}/datasources")),
            "list datasources",
        )
        .await
    }

    async fn bind_to_connection(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
        connection: ConnectionId,
    ) -> Result<()> {
        self.send_unit(
            identity,
            Method::POST,
            &self.powerbi_url(&format!(
                "groups/{workspace}/datasets/{dataset}/Default.BindToGateway"
            )),
            &json!({ "datasourceObjectIds": [connection] }),
            "bind to connection",
        )
        .await
    }

    async fn trigger_refresh(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
    ) -> Result<RefreshTrigger> {
        let operation = "refresh dataset";
        let url = self.powerbi_url(&format!("groups/{workspace}/datasets/{dataset}/refreshes"));
        let builder = self
            .request(identity, Method::POST, &url, operation)?
            .json(&json!({ "notifyOption": "NoNotification", "type": "Automatic" }));
        let response = self.send(operation, builder).await?;

        let request_id = header_str(response.headers(), "x-ms-request-id")
            .or_else(|| header_str(response.headers(), "requestid"))
            .ok_or_else(|| Error::malformed(operation, "refresh accepted without a request id"))?;
        Ok(RefreshTrigger {
            request_id: request_id.to_string(),
        })
    }

    async fn get_refresh(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
        request_id: &str,
    ) -> Result<DatasetRefresh> {
        self.get_json(
            identity,
            &self.powerbi_url(&format!(
                "groups/{workspace}/datasets/{dataset}/refreshes/{request_id}"
            )),
            "get refresh",
        )
        .await
    }

    async fn set_anonymous_datasource_credentials(
        &self,
        identity: ExecutionIdentity,
        gateway: uuid::Uuid,
        datasource: uuid::Uuid,
    ) -> Result<()> {
        self.send_unit(
            identity,
            Method::PATCH,
            &self.powerbi_url(&format!("gateways/{gateway}/datasources/{datasource}")),
            &json!({
                "credentialDetails": {
                    "credentialType": "Anonymous",
                    "credentials": "{\"credentialData\":\"\"}",
                    "encryptedConnection": "NotEncrypted",
                    "encryptionAlgorithm": "None",
                    "privacyLevel": "Organizational"
                }
            }),
            "update datasource credentials",
        )
        .await
    }

    async fn update_refresh_schedule(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
        schedule: &RefreshSchedule,
    ) -> Result<()> {
        self.send_unit(
            identity,
            Method::PATCH,
            &self.powerbi_url(&format!("groups/{workspace}/datasets/{dataset}/refreshSchedule")),
            &json!({ "value": schedule }),
            "update refresh schedule",
        )
        .await
    }

    async fn post_import(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        name: &str,
        content: Vec<u8>,
    ) -> Result<Import> {
        let operation = "import pbix";
        let url = self.powerbi_url(&format!("groups/{workspace}/imports"));
        let part = reqwest::multipart::Part::bytes(content).file_name(format!("{name}.pbix"));
        let form = reqwest::multipart::Form::new().part("file", part);
        let builder = self
            .request(identity, Method::POST, &url, operation)?
            .query(&[("datasetDisplayName", name), ("nameConflict", "CreateOrOverwrite")])
            .multipart(form);
        let response = self.send(operation, builder).await?;
        let handle: ImportHandle = Self::json(operation, response).await?;
        Ok(Import {
            id: handle.id,
            import_state: "Publishing".to_string(),
            reports: Vec::new(),
            datasets: Vec::new(),
        })
    }

    async fn get_import(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        import_id: &str,
    ) -> Result<Import> {
        self.get_json(
            identity,
            &self.powerbi_url(&format!("groups/{workspace}/imports/{import_id}")),
            "get import",
        )
        .await
    }

    async fn get_report(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        report: ItemId,
    ) -> Result<Report> {
        self.get_json(
            identity,
            &self.powerbi_url(&format!("groups/{workspace}/reports/{report}")),
            "get report",
        )
        .await
    }

    async fn generate_embed_token(
        &self,
        identity: ExecutionIdentity,
        request: &EmbedTokenRequest,
    ) -> Result<EmbedToken> {
        self.send_json(
            identity,
            Method::POST,
            &self.powerbi_url("GenerateToken"),
            request,
            "generate embed token",
        )
        .await
    }

    async fn list_profiles(&self, identity: ExecutionIdentity) -> Result<Vec<Profile>> {
        self.list_all(identity, self.powerbi_url("profiles"), "list profiles")
            .await
    }

    async fn create_profile(
        &self,
        identity: ExecutionIdentity,
        display_name: &str,
    ) -> Result<Profile> {
        self.send_json(
            identity,
            Method::POST,
            &self.powerbi_url("profiles"),
            &json!({ "displayName": display_name }),
            "create profile",
        )
        .await
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenSource;
    use axum::Router;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use std::collections::HashMap;
    use tokio_util::sync::CancellationToken;

    const WORKSPACE: &str = "6f1c2a4e-0c3b-4f55-9f7e-2d9a1b0c3d4e";
    const ITEM: &str = "1a2b3c4d-0000-4000-8000-00000000abcd";
    const JOB: &str = "0e0d0c0b-1111-4222-8333-444455556666";
    const PROFILE: &str = "11111111-2222-4333-8444-555555555555";

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    async fn client(base_url: &str) -> RestControlPlane {
        let source = StaticTokenSource::new()
            .with_token(ExecutionIdentity::ServicePrincipal, "spn-token")
            .with_token(ExecutionIdentity::ServicePrincipalProfile, "spn-token");
        let credentials = CredentialCache::prime(Arc::new(source)).await.unwrap();
        let endpoints = Endpoints {
            fabric_api: format!("{base_url}/v1"),
            powerbi_api: base_url.to_string(),
            ..Endpoints::default()
        };
        RestControlPlane::new(
            endpoints,
            credentials,
            Some(PROFILE.parse().unwrap()),
            JobPoller::new(
                Duration::from_millis(10),
                Duration::from_secs(5),
                CancellationToken::new(),
            ),
        )
    }

    #[tokio::test]
    async fn list_workspaces_follows_continuation() {
        let app = Router::new().route(
            "/v1/workspaces",
            get(|Query(query): Query<HashMap<String, String>>, headers: AxumHeaders| async move {
                assert_eq!(headers["authorization"], "Bearer spn-token");
                if query.contains_key("page") {
                    axum::Json(json!({
                        "value": [{ "id": ITEM, "displayName": "Second", "type": "Workspace" }]
                    }))
                } else {
                    let host = headers["host"].to_str().unwrap().to_string();
                    axum::Json(json!({
                        "value": [{ "id": WORKSPACE, "displayName": "Contoso", "type": "Workspace" }],
                        "continuationUri": format!("http://{host}/v1/workspaces?page=2")
                    }))
                }
            }),
        );
        let base = spawn(app).await;

        let workspaces = client(&base)
            .await
            .list_workspaces(ExecutionIdentity::ServicePrincipal)
            .await
            .unwrap();
        let names: Vec<_> = workspaces.iter().map(|w| w.display_name.as_str()).collect();
        assert_eq!(names, vec!["Contoso", "Second"]);
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let app = Router::new().route(
            "/v1/capacities",
            get(|| async {
                (
                    AxumStatus::FORBIDDEN,
                    axum::Json(json!({ "error": { "code": "Unauthorized", "message": "no access" } })),
                )
            }),
        );
        let base = spawn(app).await;

        let err = client(&base)
            .await
            .list_capacities(ExecutionIdentity::ServicePrincipal)
            .await
            .unwrap_err();
        match err {
            Error::RemoteCall { status, message, .. } => {
                assert_eq!(status, 403);
                assert_eq!(message, "no access");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unprimed_identity_fails_before_sending() {
        let base = spawn(Router::new()).await;
        let err = client(&base)
            .await
            .list_workspaces(ExecutionIdentity::DelegatedUser)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IdentityUnavailable { .. }));
    }

    #[tokio::test]
    async fn profile_identity_sends_profile_header() {
        let app = Router::new().route(
            "/v1.0/myorg/groups/:workspace/reports/:report",
            get(|Path((_, report)): Path<(String, String)>, headers: AxumHeaders| async move {
                let profile = headers
                    .get(PROFILE_HEADER)
                    .map(|v| v.to_str().unwrap().to_string())
                    .unwrap_or_default();
                axum::Json(json!({ "id": report, "name": profile }))
            }),
        );
        let base = spawn(app).await;

        let report = client(&base)
            .await
            .get_report(
                ExecutionIdentity::ServicePrincipalProfile,
                WORKSPACE.parse().unwrap(),
                ITEM.parse().unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(report.name, PROFILE);
    }

    #[tokio::test]
    async fn run_item_job_reads_job_id_from_location() {
        let app = Router::new().route(
            "/v1/workspaces/:workspace/items/:item/jobs/instances",
            post(
                |Path((workspace, item)): Path<(String, String)>,
                 Query(query): Query<HashMap<String, String>>| async move {
                    assert_eq!(query["jobType"], "RunNotebook");
                    let location =
                        format!("/v1/workspaces/{workspace}/items/{item}/jobs/instances/{JOB}");
                    (AxumStatus::ACCEPTED, [("location", location)])
                },
            ),
        );
        let base = spawn(app).await;

        let trigger = client(&base)
            .await
            .run_item_job(
                ExecutionIdentity::ServicePrincipal,
                WORKSPACE.parse().unwrap(),
                ITEM.parse().unwrap(),
                "RunNotebook",
            )
            .await
            .unwrap();
        assert_eq!(trigger.status, 202);
        assert_eq!(trigger.job_id.unwrap().to_string(), JOB);
    }

    #[tokio::test]
    async fn create_item_follows_long_running_operation() {
        let app = Router::new()
            .route(
                "/v1/workspaces/:workspace/items",
                post(|headers: AxumHeaders| async move {
                    let host = headers["host"].to_str().unwrap().to_string();
                    (
                        AxumStatus::ACCEPTED,
                        [("location", format!("http://{host}/v1/operations/op-1"))],
                    )
                }),
            )
            .route(
                "/v1/operations/op-1",
                get(|| async { axum::Json(json!({ "status": "Succeeded" })) }),
            )
            .route(
                "/v1/operations/op-1/result",
                get(|| async {
                    axum::Json(json!({
                        "id": ITEM,
                        "displayName": "sales",
                        "type": "Lakehouse",
                        "workspaceId": WORKSPACE
                    }))
                }),
            );
        let base = spawn(app).await;

        let item = client(&base)
            .await
            .create_item(
                ExecutionIdentity::ServicePrincipal,
                WORKSPACE.parse().unwrap(),
                &CreateItemRequest::new("sales", crate::model::ItemType::Lakehouse),
            )
            .await
            .unwrap();
        assert_eq!(item.id.to_string(), ITEM);
        assert_eq!(item.display_name, "sales");
    }

    #[tokio::test]
    async fn trigger_refresh_reads_request_id_header() {
        let app = Router::new().route(
            "/v1.0/myorg/groups/:workspace/datasets/:dataset/refreshes",
            post(|| async { (AxumStatus::ACCEPTED, [("x-ms-request-id", "req-42")]) }),
        );
        let base = spawn(app).await;

        let trigger = client(&base)
            .await
            .trigger_refresh(
                ExecutionIdentity::ServicePrincipal,
                WORKSPACE.parse().unwrap(),
                ITEM.parse().unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(trigger.request_id, "req-42");
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message(b"plain failure"), "plain failure");
        assert_eq!(error_message(br#"{"message":"top"}"#), "top");
    }
}
