//! Idempotent-friendly resource operations over a [`ControlPlane`].
//!
//! [`ResourceClient`] layers policy over the raw transport: find-before-create,
//! per-class retries, identity selection (including the trial-capacity
//! dual-identity rule), job polling, and the single dataset-refresh retry.
//!
//! The client carries the [`ExecutionIdentity`] its calls run under.
//! [`ResourceClient::acting_as`] returns a view acting as another identity;
//! nothing is swapped in place.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use fabdeploy_core::config::Settings;
use fabdeploy_core::{
    AuthenticationMode, CapacityId, ExecutionIdentity, ItemId, Principal, WorkspaceId,
};

use crate::control_plane::ControlPlane;
use crate::error::{Error, Result};
use crate::jobs::JobPoller;
use crate::model::{
    Capacity, Connection, ConnectionRole, ConnectionRoleAssignment, CreateConnectionRequest,
    CreateItemRequest, CreateWorkspaceRequest, Credential, DatasetRefresh, Datasource,
    EmbedTokenDataset, EmbedTokenReport, EmbedTokenRequest, EmbedTokenWorkspace,
    EmbeddingCredential, Import, Item, ItemType, JobInstance, Lakehouse, Profile, RefreshSchedule,
    Report, ScheduleNotifyOption, SqlEndpoint, Workspace, WorkspaceRole, WorkspaceRoleAssignment,
};
use crate::retry::{DEFAULT_MAX_ATTEMPTS, OperationClass, RetryPolicy};

/// Job type that runs a notebook.
pub const RUN_NOTEBOOK_JOB: &str = "RunNotebook";

/// Timestamp format of the collision suffix appended to workspace names.
const SUFFIX_FORMAT: &str = "%Y%m%d%H%M%S";

/// Returns `name` with a timestamp suffix (`Contoso-20250101093000`).
#[must_use]
pub fn suffixed_name(name: &str, now: DateTime<Utc>) -> String {
    format!("{name}-{}", now.format(SUFFIX_FORMAT))
}

/// Display name of the anonymous Web connection owned by a workspace.
#[must_use]
pub fn web_connection_name(workspace: WorkspaceId) -> String {
    format!("Workspace[{workspace}]-Web")
}

/// Display name of the storage connection owned by a workspace lakehouse.
#[must_use]
pub fn storage_connection_name(workspace: WorkspaceId, lakehouse: &str) -> String {
    format!("Workspace[{workspace}]-Lakehouse[{lakehouse}]-ADLS")
}

/// Policy layer over a control-plane transport.
#[derive(Clone)]
pub struct ResourceClient {
    plane: Arc<dyn ControlPlane>,
    settings: Arc<Settings>,
    identity: ExecutionIdentity,
    cancel: CancellationToken,
}

impl fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClient")
            .field("identity", &self.identity)
            .field("auth_mode", &self.settings.auth_mode)
            .finish_non_exhaustive()
    }
}

impl ResourceClient {
    /// Creates a client acting as the provisioning identity.
    #[must_use]
    pub fn new(
        plane: Arc<dyn ControlPlane>,
        settings: Arc<Settings>,
        cancel: CancellationToken,
    ) -> Self {
        let identity = settings.auth_mode.provisioning_identity();
        Self {
            plane,
            settings,
            identity,
            cancel,
        }
    }

    /// Identity this client acts as.
    #[must_use]
    pub const fn identity(&self) -> ExecutionIdentity {
        self.identity
    }

    /// Settings the client was built with.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Cancellation token bounding waits.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns a view of this client acting as `identity`.
    #[must_use]
    pub fn acting_as(&self, identity: ExecutionIdentity) -> Self {
        Self {
            identity,
            ..self.clone()
        }
    }

    /// Identity that provisions resources under the configured auth mode.
    #[must_use]
    pub fn provisioning_identity(&self) -> ExecutionIdentity {
        self.settings.auth_mode.provisioning_identity()
    }

    /// Identity embed tokens are scoped to: the service principal profile when
    /// one is configured, else the provisioning identity.
    #[must_use]
    pub fn embedding_identity(&self) -> ExecutionIdentity {
        if self.settings.auth_mode.is_service_principal()
            && self.settings.principals.profile_id.is_some()
        {
            ExecutionIdentity::ServicePrincipalProfile
        } else {
            self.provisioning_identity()
        }
    }

    /// Principal granted Admin on new workspaces and Owner on new connections.
    ///
    /// Under service principal auth the admin user is preferred; otherwise (or
    /// when no admin user is configured) the service principal object.
    #[must_use]
    pub fn grantee(&self) -> Option<Principal> {
        let principals = &self.settings.principals;
        match (self.settings.auth_mode, principals.admin_user_id) {
            (AuthenticationMode::ServicePrincipal, Some(user)) => Some(Principal::user(user)),
            _ => principals
                .service_principal_object_id
                .map(Principal::service_principal),
        }
    }

    async fn read<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        RetryPolicy::for_class(OperationClass::IdempotentRead)
            .run(operation, op)
            .await
    }

    async fn mutate<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        RetryPolicy::for_class(OperationClass::Mutation)
            .run(operation, op)
            .await
    }

    /// Runs a create, re-issuing it after a transient failure only when a
    /// fresh lookup shows nothing was created.
    async fn create_find_first<T, C, CFut, L, LFut>(
        &self,
        operation: &str,
        mut create: C,
        mut lookup: L,
    ) -> Result<T>
    where
        C: FnMut() -> CFut,
        CFut: Future<Output = Result<T>>,
        L: FnMut() -> LFut,
        LFut: Future<Output = Result<Option<T>>>,
    {
        let backoff = RetryPolicy::for_class(OperationClass::IdempotentRead);
        let single = RetryPolicy::for_class(OperationClass::Create);
        let mut attempt = 1;
        loop {
            match single.run(operation, &mut create).await {
                Ok(created) => return Ok(created),
                Err(error) if error.is_transient() && attempt < DEFAULT_MAX_ATTEMPTS => {
                    tracing::warn!(operation, attempt, %error, "create failed, checking for a partial create");
                    self.sleep(backoff.delay_for(attempt), operation).await?;
                    if let Some(existing) = lookup().await? {
                        tracing::info!(operation, "create had landed, reusing");
                        return Ok(existing);
                    }
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn sleep(&self, duration: Duration, operation: &str) -> Result<()> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled {
                operation: operation.to_string(),
            }),
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }

    fn poller(&self, interval: Duration) -> JobPoller {
        JobPoller::new(interval, self.settings.polling.job_timeout(), self.cancel.clone())
    }

    // Workspaces and capacities.

    /// Lists shared workspaces.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let workspaces = self
            .read("list workspaces", || self.plane.list_workspaces(self.identity))
            .await?;
        Ok(workspaces.into_iter().filter(Workspace::is_shared).collect())
    }

    /// Finds a workspace by name, case-insensitively. The first match wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn find_workspace_by_name(&self, name: &str) -> Result<Option<Workspace>> {
        Ok(self
            .list_workspaces()
            .await?
            .into_iter()
            .find(|workspace| workspace.display_name.eq_ignore_ascii_case(name)))
    }

    /// Creates a workspace, grants the configured admin and assigns capacity.
    ///
    /// A name already in use gets a timestamp suffix; the existing workspace
    /// is never reused or overwritten here.
    ///
    /// # Errors
    ///
    /// Returns an error if creation or the role grant fails, or
    /// [`Error::CapacityAssignment`] if the capacity cannot be assigned.
    pub async fn create_workspace(
        &self,
        name: &str,
        capacity: Option<CapacityId>,
        description: Option<&str>,
    ) -> Result<Workspace> {
        let display_name = if self.find_workspace_by_name(name).await?.is_some() {
            let renamed = self.free_suffixed_name(name).await?;
            tracing::info!(requested = name, renamed = %renamed, "workspace name in use");
            renamed
        } else {
            name.to_string()
        };

        let request = CreateWorkspaceRequest {
            display_name: display_name.clone(),
            description: description.map(str::to_string),
        };
        let wanted = display_name.as_str();
        let workspace = self
            .create_find_first(
                "create workspace",
                || self.plane.create_workspace(self.identity, &request),
                move || async move {
                    let workspaces = self.plane.list_workspaces(self.identity).await?;
                    Ok(workspaces
                        .into_iter()
                        .find(|w| w.display_name.eq_ignore_ascii_case(wanted)))
                },
            )
            .await?;
        tracing::info!(workspace_id = %workspace.id, name = %workspace.display_name, "workspace created");

        self.add_workspace_admin(workspace.id).await?;
        if let Some(capacity) = capacity {
            self.assign_workspace_to_capacity(workspace.id, capacity)
                .await?;
        }
        Ok(workspace)
    }

    /// First suffixed form of `name` no workspace holds yet, stepping the
    /// timestamp forward a second at a time.
    async fn free_suffixed_name(&self, name: &str) -> Result<String> {
        let taken: Vec<String> = self
            .list_workspaces()
            .await?
            .into_iter()
            .map(|w| w.display_name.to_lowercase())
            .collect();
        let mut at = Utc::now();
        loop {
            let candidate = suffixed_name(name, at);
            if !taken.contains(&candidate.to_lowercase()) {
                return Ok(candidate);
            }
            at += chrono::Duration::seconds(1);
        }
    }

    /// Grants Admin on a workspace to the configured grantee, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the grant fails.
    pub async fn add_workspace_admin(&self, workspace: WorkspaceId) -> Result<()> {
        let Some(principal) = self.grantee() else {
            tracing::warn!(%workspace, "no admin principal configured, skipping workspace grant");
            return Ok(());
        };
        let assignment = WorkspaceRoleAssignment {
            principal,
            role: WorkspaceRole::Admin,
        };
        self.mutate("add workspace admin", || {
            self.plane
                .add_workspace_role_assignment(self.identity, workspace, &assignment)
        })
        .await
    }

    /// Lists role assignments of a workspace.
    ///
    /// # Errors
    ///
    /// Always [`Error::NotSupported`].
    pub async fn view_workspace_role_assignments(&self, workspace: WorkspaceId) -> Result<()> {
        tracing::info!(%workspace, "workspace role assignment listing is not available");
        Err(Error::not_supported("workspace role assignment listing"))
    }

    /// Assigns a workspace to a capacity.
    ///
    /// Runs as this client's identity. Trial capacities reject service
    /// principal assignment, so under service principal auth a trial capacity
    /// is assigned as the delegated user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityAssignment`] if the capacity is unknown or the
    /// assignment is rejected.
    pub async fn assign_workspace_to_capacity(
        &self,
        workspace: WorkspaceId,
        capacity: CapacityId,
    ) -> Result<()> {
        let assignment_failed = |message: String| Error::CapacityAssignment {
            capacity_id: capacity.to_string(),
            message,
        };

        let identity = if self.settings.auth_mode.is_service_principal() {
            let listing = self.acting_as(ExecutionIdentity::DelegatedUser);
            let target = listing
                .get_capacity(capacity)
                .await
                .map_err(|e| assignment_failed(e.to_string()))?
                .ok_or_else(|| assignment_failed("capacity not found".to_string()))?;
            if target.is_trial() {
                ExecutionIdentity::DelegatedUser
            } else {
                self.identity
            }
        } else {
            self.identity
        };

        tracing::info!(%workspace, %capacity, %identity, "assigning workspace to capacity");
        self.mutate("assign to capacity", || {
            self.plane.assign_to_capacity(identity, workspace, capacity)
        })
        .await
        .map_err(|e| match e {
            Error::RemoteCall { message, .. } => assignment_failed(message),
            other => assignment_failed(other.to_string()),
        })
    }

    /// Lists capacities.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn list_capacities(&self) -> Result<Vec<Capacity>> {
        self.read("list capacities", || self.plane.list_capacities(self.identity))
            .await
    }

    /// Looks up a capacity by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn get_capacity(&self, capacity: CapacityId) -> Result<Option<Capacity>> {
        Ok(self
            .list_capacities()
            .await?
            .into_iter()
            .find(|c| c.id == capacity))
    }

    /// Replaces a workspace description.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn update_workspace_description(
        &self,
        workspace: WorkspaceId,
        description: &str,
    ) -> Result<Workspace> {
        self.mutate("update workspace description", || {
            self.plane
                .update_workspace_description(self.identity, workspace, description)
        })
        .await
    }

    // Items.

    /// Lists items in a workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn list_items(&self, workspace: WorkspaceId) -> Result<Vec<Item>> {
        self.read("list items", || self.plane.list_items(self.identity, workspace))
            .await
    }

    /// Finds an item by its (name, type) key within a workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn find_item(
        &self,
        workspace: WorkspaceId,
        display_name: &str,
        item_type: ItemType,
    ) -> Result<Option<Item>> {
        Ok(self
            .list_items(workspace)
            .await?
            .into_iter()
            .find(|item| item.matches(display_name, item_type)))
    }

    /// Finds a report by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn find_report_by_name(
        &self,
        workspace: WorkspaceId,
        display_name: &str,
    ) -> Result<Option<Item>> {
        self.find_item(workspace, display_name, ItemType::Report)
            .await
    }

    /// Creates an item. Callers look the item up first.
    ///
    /// # Errors
    ///
    /// Returns an error if the create fails.
    pub async fn create_item(
        &self,
        workspace: WorkspaceId,
        request: &CreateItemRequest,
    ) -> Result<Item> {
        let item = self
            .create_find_first(
                "create item",
                || self.plane.create_item(self.identity, workspace, request),
                move || async move {
                    let items = self.plane.list_items(self.identity, workspace).await?;
                    Ok(items
                        .into_iter()
                        .find(|item| item.matches(&request.display_name, request.item_type)))
                },
            )
            .await?;
        tracing::info!(
            item_id = %item.id,
            item_type = %item.item_type,
            name = %item.display_name,
            "item created"
        );
        Ok(item)
    }

    /// Creates a lakehouse.
    ///
    /// # Errors
    ///
    /// Returns an error if the create fails.
    pub async fn create_lakehouse(
        &self,
        workspace: WorkspaceId,
        name: &str,
        enable_schemas: bool,
    ) -> Result<Item> {
        let mut request = CreateItemRequest::new(name, ItemType::Lakehouse);
        if enable_schemas {
            request.creation_payload = Some(json!({ "enableSchemas": true }));
        }
        self.create_item(workspace, &request).await
    }

    /// Reads lakehouse properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn get_lakehouse(
        &self,
        workspace: WorkspaceId,
        lakehouse: ItemId,
    ) -> Result<Lakehouse> {
        self.read("get lakehouse", || {
            self.plane.get_lakehouse(self.identity, workspace, lakehouse)
        })
        .await
    }

    /// Returns the OneLake root of a lakehouse (`.../{workspace}/{lakehouse}/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn get_onelake_path(
        &self,
        workspace: WorkspaceId,
        lakehouse: ItemId,
    ) -> Result<String> {
        let properties = self.get_lakehouse(workspace, lakehouse).await?.properties;
        let path = match properties.onelake_tables_path {
            Some(tables) => {
                let trimmed = tables.trim_end_matches('/');
                trimmed
                    .strip_suffix("Tables")
                    .map_or_else(|| format!("{trimmed}/"), str::to_string)
            }
            None => format!(
                "{}/{workspace}/{lakehouse}/",
                self.settings.endpoints.onelake.trim_end_matches('/')
            ),
        };
        Ok(path)
    }

    /// Waits for the lakehouse SQL endpoint to finish provisioning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobExecution`] if provisioning failed,
    /// [`Error::JobTimeout`] after the job timeout, or an error if the
    /// provisioned endpoint is incomplete.
    pub async fn get_sql_endpoint(
        &self,
        workspace: WorkspaceId,
        lakehouse: ItemId,
    ) -> Result<SqlEndpoint> {
        let operation = "get sql endpoint";
        let provisioned = self
            .poller(self.settings.polling.provisioning_poll_interval())
            .poll(&format!("sql-endpoint/{lakehouse}"), || {
                self.get_lakehouse(workspace, lakehouse)
            })
            .await?;

        let properties = provisioned
            .properties
            .sql_endpoint_properties
            .ok_or_else(|| Error::malformed(operation, "no SQL endpoint properties"))?;
        match (properties.id, properties.connection_string) {
            (Some(id), Some(connection_string)) => Ok(SqlEndpoint {
                id,
                connection_string,
            }),
            _ => Err(Error::malformed(
                operation,
                "provisioned SQL endpoint without id or connection string",
            )),
        }
    }

    /// Asks a SQL endpoint to resync table metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn refresh_sql_endpoint_metadata(&self, sql_endpoint_id: &str) -> Result<()> {
        self.mutate("refresh sql endpoint metadata", || {
            self.plane
                .refresh_sql_endpoint_metadata(self.identity, sql_endpoint_id)
        })
        .await
    }

    /// Lists lakehouse tables.
    ///
    /// # Errors
    ///
    /// Always [`Error::NotSupported`].
    pub async fn list_lakehouse_tables(
        &self,
        _workspace: WorkspaceId,
        _lakehouse: ItemId,
    ) -> Result<Vec<String>> {
        Err(Error::not_supported("lakehouse table listing"))
    }

    // Connections.

    /// Lists connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn list_connections(&self) -> Result<Vec<Connection>> {
        self.read("list connections", || self.plane.list_connections(self.identity))
            .await
    }

    /// Finds a connection by exact display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn find_connection(&self, display_name: &str) -> Result<Option<Connection>> {
        Ok(self
            .list_connections()
            .await?
            .into_iter()
            .find(|c| c.display_name == display_name))
    }

    /// Finds a connection by display name or creates it. A new connection is
    /// granted Owner for the configured grantee.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup, create or grant fails.
    pub async fn create_connection(&self, request: &CreateConnectionRequest) -> Result<Connection> {
        if let Some(existing) = self.find_connection(&request.display_name).await? {
            tracing::info!(connection_id = %existing.id, name = %existing.display_name, "reusing connection");
            return Ok(existing);
        }

        let connection = self
            .create_find_first(
                "create connection",
                || self.plane.create_connection(self.identity, request),
                || self.find_connection(&request.display_name),
            )
            .await?;
        tracing::info!(connection_id = %connection.id, name = %connection.display_name, "connection created");

        if let Some(principal) = self.grantee() {
            let assignment = ConnectionRoleAssignment {
                principal,
                role: ConnectionRole::Owner,
            };
            self.mutate("add connection owner", || {
                self.plane
                    .add_connection_role_assignment(self.identity, connection.id, &assignment)
            })
            .await?;
        }
        Ok(connection)
    }

    /// Finds or creates the anonymous Web connection of a workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be found or created.
    pub async fn create_anonymous_web_connection(
        &self,
        url: &str,
        workspace: WorkspaceId,
    ) -> Result<Connection> {
        let request = CreateConnectionRequest::cloud(
            web_connection_name(workspace),
            "Web",
            &[("url", url)],
            Credential::Anonymous,
        );
        self.create_connection(&request).await
    }

    /// Finds or creates a storage connection authenticated with the
    /// configured service principal.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if tenant, client id or secret is
    /// missing, or an error if the connection cannot be found or created.
    pub async fn create_storage_connection_with_service_principal(
        &self,
        server: &str,
        path: &str,
        workspace: WorkspaceId,
        lakehouse: &str,
    ) -> Result<Connection> {
        let credentials = &self.settings.credentials;
        let (Some(tenant_id), Some(client_id), Some(secret)) = (
            credentials.tenant_id.as_ref(),
            credentials.client_id.as_ref(),
            credentials.client_secret.as_ref(),
        ) else {
            return Err(fabdeploy_core::Error::configuration(
                "storage connections need FABDEPLOY_TENANT_ID, FABDEPLOY_CLIENT_ID and a client secret",
            )
            .into());
        };

        let request = CreateConnectionRequest::cloud(
            storage_connection_name(workspace, lakehouse),
            "AzureDataLakeStorage",
            &[("server", server), ("path", path)],
            Credential::ServicePrincipal {
                tenant_id: tenant_id.clone(),
                service_principal_client_id: client_id.clone(),
                service_principal_secret: secret.clone(),
            },
        );
        self.create_connection(&request).await
    }

    // Jobs.

    /// Runs an item job and waits for it to finish.
    ///
    /// # Errors
    ///
    /// - [`Error::JobStart`] if the trigger is not accepted
    /// - [`Error::JobExecution`] if the job fails
    /// - [`Error::JobTimeout`] or [`Error::Cancelled`] if the wait is cut short
    pub async fn run_job(
        &self,
        workspace: WorkspaceId,
        item: ItemId,
        job_type: &str,
    ) -> Result<JobInstance> {
        let operation = format!("run {job_type}");
        let trigger = self
            .plane
            .run_item_job(self.identity, workspace, item, job_type)
            .await?;
        let job = match (trigger.status, trigger.job_id) {
            (202, Some(job)) => job,
            (status, _) => return Err(Error::JobStart { operation, status }),
        };
        tracing::info!(%item, %job, job_type, "job accepted");

        self.poller(self.settings.polling.job_poll_interval())
            .poll(&job.to_string(), move || async move {
                self.read("get item job", move || {
                    self.plane.get_item_job(self.identity, workspace, item, job)
                })
                .await
            })
            .await
    }

    /// Runs a notebook and waits for it to finish.
    ///
    /// # Errors
    ///
    /// See [`ResourceClient::run_job`].
    pub async fn run_notebook(&self, workspace: WorkspaceId, notebook: ItemId) -> Result<JobInstance> {
        self.run_job(workspace, notebook, RUN_NOTEBOOK_JOB).await
    }

    // Datasets, imports and reports.

    /// Lists the data sources of a semantic model.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn list_datasources(
        &self,
        workspace: WorkspaceId,
        dataset: ItemId,
    ) -> Result<Vec<Datasource>> {
        self.read("list datasources", || {
            self.plane.list_datasources(self.identity, workspace, dataset)
        })
        .await
    }

    /// Binds a semantic model to a connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn bind_to_connection(
        &self,
        workspace: WorkspaceId,
        dataset: ItemId,
        connection: &Connection,
    ) -> Result<()> {
        tracing::info!(%dataset, connection = %connection.display_name, "binding semantic model");
        self.mutate("bind to connection", || {
            self.plane
                .bind_to_connection(self.identity, workspace, dataset, connection.id)
        })
        .await
    }

    async fn refresh_once(&self, workspace: WorkspaceId, dataset: ItemId) -> Result<DatasetRefresh> {
        let trigger = self
            .plane
            .trigger_refresh(self.identity, workspace, dataset)
            .await?;
        let request_id = trigger.request_id.as_str();
        tracing::info!(%dataset, request_id, "refresh started");

        self.poller(self.settings.polling.refresh_poll_interval())
            .poll(request_id, move || async move {
                self.read("get refresh", move || {
                    self.plane
                        .get_refresh(self.identity, workspace, dataset, request_id)
                })
                .await
            })
            .await
    }

    /// Refreshes a semantic model and waits for it. A failed refresh is
    /// retried once after the configured delay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobExecution`] if the retry also fails, or any error
    /// the trigger or the wait raises.
    pub async fn refresh_dataset(
        &self,
        workspace: WorkspaceId,
        dataset: ItemId,
    ) -> Result<DatasetRefresh> {
        match self.refresh_once(workspace, dataset).await {
            Err(Error::JobExecution { reason, .. }) => {
                let delay = self.settings.polling.refresh_retry_delay();
                tracing::warn!(%dataset, %reason, delay_secs = delay.as_secs(), "refresh failed, retrying once");
                self.sleep(delay, "refresh dataset").await?;
                self.refresh_once(workspace, dataset).await
            }
            other => other,
        }
    }

    /// Sets anonymous credentials on every gateway-bound Web source of a
    /// dataset. Returns how many sources were patched.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or patching fails.
    pub async fn patch_anonymous_web_credentials(
        &self,
        workspace: WorkspaceId,
        dataset: ItemId,
    ) -> Result<usize> {
        let mut patched = 0;
        for source in self.list_datasources(workspace, dataset).await? {
            let (true, Some(gateway), Some(datasource)) =
                (source.is_web(), source.gateway_id, source.datasource_id)
            else {
                continue;
            };
            self.mutate("patch datasource credentials", || {
                self.plane
                    .set_anonymous_datasource_credentials(self.identity, gateway, datasource)
            })
            .await?;
            patched += 1;
        }
        tracing::info!(%dataset, patched, "anonymous web credentials set");
        Ok(patched)
    }

    /// Schedules weekday refreshes. Failure mail is only requested under user
    /// auth, where the owner has a mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn set_refresh_schedule(&self, workspace: WorkspaceId, dataset: ItemId) -> Result<()> {
        let notify = match self.settings.auth_mode {
            AuthenticationMode::User => ScheduleNotifyOption::MailOnFailure,
            AuthenticationMode::ServicePrincipal => ScheduleNotifyOption::NoNotification,
        };
        let schedule = RefreshSchedule::weekdays(notify);
        self.mutate("set refresh schedule", || {
            self.plane
                .update_refresh_schedule(self.identity, workspace, dataset, &schedule)
        })
        .await
    }

    /// Uploads a PBIX file and waits for the import to publish.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobExecution`] if the import fails, or any upload or
    /// wait error.
    pub async fn import_pbix(
        &self,
        workspace: WorkspaceId,
        name: &str,
        content: Vec<u8>,
    ) -> Result<Import> {
        let started = self
            .plane
            .post_import(self.identity, workspace, name, content)
            .await?;
        let import_id = started.id.as_str();
        tracing::info!(import_id, name, "import started");

        self.poller(self.settings.polling.refresh_poll_interval())
            .poll(import_id, move || async move {
                self.read("get import", move || {
                    self.plane.get_import(self.identity, workspace, import_id)
                })
                .await
            })
            .await
    }

    /// Reads a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn get_report(&self, workspace: WorkspaceId, report: ItemId) -> Result<Report> {
        self.read("get report", || {
            self.plane.get_report(self.identity, workspace, report)
        })
        .await
    }

    /// Generates an embed token for a report, scoped to its workspace, its
    /// dataset (read-only) and the report itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the report lookup or token generation fails.
    pub async fn get_report_embedding(
        &self,
        workspace: WorkspaceId,
        report: ItemId,
    ) -> Result<EmbeddingCredential> {
        let details = self.get_report(workspace, report).await?;
        let request = EmbedTokenRequest {
            datasets: details
                .dataset_id
                .map(|id| EmbedTokenDataset {
                    id,
                    xmla_permissions: "ReadOnly".to_string(),
                })
                .into_iter()
                .collect(),
            reports: vec![EmbedTokenReport {
                id: report,
                allow_edit: false,
            }],
            target_workspaces: vec![EmbedTokenWorkspace { id: workspace }],
        };
        let token = self
            .mutate("generate embed token", || {
                self.plane.generate_embed_token(self.identity, &request)
            })
            .await?;

        let embed_url = details.embed_url.unwrap_or_else(|| {
            format!(
                "{}?reportId={report}&groupId={workspace}",
                self.settings.endpoints.embed_url
            )
        });
        Ok(EmbeddingCredential {
            report_id: report,
            report_name: details.name,
            workspace_id: workspace,
            embed_url,
            access_token: token.token,
            expires_at: token.expiration,
        })
    }

    // Service principal profiles.

    /// Lists service principal profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.read("list profiles", || {
            self.plane.list_profiles(ExecutionIdentity::ServicePrincipal)
        })
        .await
    }

    /// Creates a service principal profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn create_profile(&self, display_name: &str) -> Result<Profile> {
        let profile = self
            .plane
            .create_profile(ExecutionIdentity::ServicePrincipal, display_name)
            .await?;
        tracing::info!(profile_id = %profile.id, display_name, "profile created");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn suffix_uses_compact_timestamp() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(suffixed_name("Contoso", now), "Contoso-20250309070501");
    }

    #[test]
    fn connection_names_are_derived_from_owner() {
        let workspace: WorkspaceId = "6f1c2a4e-0c3b-4f55-9f7e-2d9a1b0c3d4e".parse().unwrap();
        assert_eq!(
            web_connection_name(workspace),
            "Workspace[6f1c2a4e-0c3b-4f55-9f7e-2d9a1b0c3d4e]-Web"
        );
        assert_eq!(
            storage_connection_name(workspace, "sales"),
            "Workspace[6f1c2a4e-0c3b-4f55-9f7e-2d9a1b0c3d4e]-Lakehouse[sales]-ADLS"
        );
    }
}
