//! In-memory control plane with call recording.
//!
//! [`MemoryControlPlane`] keeps workspaces, items, connections and datasets
//! in memory and behaves like the remote service where the flows depend on
//! it: duplicate names are rejected with 409, trial capacities only accept
//! assignment from the delegated user, SQL endpoints take a few polls to
//! provision, and a PBIX import overwrites same-named content.
//!
//! Every call is recorded with the identity it ran under.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use fabdeploy_client::control_plane::ControlPlane;
use fabdeploy_client::error::{Error, Result};
use fabdeploy_client::model::{
    Capacity, Connection, ConnectionDetails, ConnectionRoleAssignment, CreateConnectionRequest,
    CreateItemRequest, CreateWorkspaceRequest, DatasetRefresh, Datasource,
    DatasourceConnectionDetails, EmbedToken, EmbedTokenRequest, Import, ImportedArtifact, Item,
    ItemDefinition, ItemType, JobFailure, JobInstance, JobStatus, JobTrigger, Lakehouse,
    LakehouseProperties, Profile, RefreshSchedule, RefreshTrigger, Report, SqlEndpointProperties,
    Workspace, WorkspaceRoleAssignment,
};
use fabdeploy_core::{
    CapacityId, ConnectionId, ExecutionIdentity, ItemId, JobId, ProfileId, Redacted, WorkspaceId,
};

/// Server name handed out for provisioned SQL endpoints.
pub const SQL_ENDPOINT_SERVER: &str = "contoso-sql.datawarehouse.fabric.microsoft.com";

/// Record of a control-plane call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Operation name (`create workspace`, `trigger refresh`, ...).
    pub operation: &'static str,
    /// Identity the call ran under.
    pub identity: ExecutionIdentity,
}

/// A capacity assignment that was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityAssignment {
    /// Workspace assigned.
    pub workspace: WorkspaceId,
    /// Target capacity.
    pub capacity: CapacityId,
    /// Identity that made the assignment.
    pub identity: ExecutionIdentity,
}

#[derive(Debug, Clone)]
struct StoredItem {
    item: Item,
    definition: Option<ItemDefinition>,
}

#[derive(Debug, Default)]
struct PlaneState {
    workspaces: Vec<Workspace>,
    capacities: Vec<Capacity>,
    items: Vec<StoredItem>,
    sql_endpoint_pending_polls: usize,
    sql_endpoint_polls: HashMap<ItemId, usize>,
    sql_metadata_refreshes: Vec<String>,
    connections: Vec<Connection>,
    connection_requests: Vec<CreateConnectionRequest>,
    workspace_roles: Vec<(WorkspaceId, WorkspaceRoleAssignment)>,
    connection_roles: Vec<(ConnectionId, ConnectionRoleAssignment)>,
    capacity_assignments: Vec<CapacityAssignment>,
    job_trigger_status: Option<u16>,
    job_outcomes: VecDeque<JobStatus>,
    jobs: HashMap<JobId, JobStatus>,
    datasources: Vec<Datasource>,
    bindings: Vec<(ItemId, ConnectionId)>,
    refresh_outcomes: VecDeque<String>,
    refreshes: HashMap<String, String>,
    anonymous_credentials: Vec<(Uuid, Uuid)>,
    schedules: Vec<(ItemId, RefreshSchedule)>,
    imports: HashMap<String, Import>,
    embed_token_requests: Vec<EmbedTokenRequest>,
    profiles: Vec<Profile>,
    faults: HashMap<&'static str, VecDeque<u16>>,
    unavailable: HashSet<ExecutionIdentity>,
    calls: Vec<Call>,
}

impl PlaneState {
    fn workspace_mut(&mut self, operation: &str, id: WorkspaceId) -> Result<&mut Workspace> {
        self.workspaces
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| Error::remote(operation, 404, format!("workspace {id} not found")))
    }

    fn item(&self, operation: &str, workspace: WorkspaceId, id: ItemId) -> Result<&StoredItem> {
        self.items
            .iter()
            .find(|s| s.item.id == id && s.item.workspace_id == Some(workspace))
            .ok_or_else(|| Error::remote(operation, 404, format!("item {id} not found")))
    }

    fn upsert_item(&mut self, workspace: WorkspaceId, name: &str, item_type: ItemType) -> ItemId {
        if let Some(existing) = self
            .items
            .iter()
            .find(|s| s.item.workspace_id == Some(workspace) && s.item.matches(name, item_type))
        {
            return existing.item.id;
        }
        let item = Item {
            id: ItemId::generate(),
            display_name: name.to_string(),
            item_type,
            workspace_id: Some(workspace),
            description: None,
        };
        let id = item.id;
        self.items.push(StoredItem {
            item,
            definition: None,
        });
        id
    }
}

/// In-memory [`ControlPlane`].
///
/// Cloning shares the underlying state, so a test can keep a handle while the
/// resource client owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryControlPlane {
    state: Arc<Mutex<PlaneState>>,
}

impl MemoryControlPlane {
    /// Creates an empty control plane.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PlaneState> {
        self.state.lock().expect("lock")
    }

    /// Records the call, then applies identity and fault injection.
    fn begin(
        &self,
        operation: &'static str,
        identity: ExecutionIdentity,
    ) -> Result<MutexGuard<'_, PlaneState>> {
        let mut state = self.lock();
        state.calls.push(Call {
            operation,
            identity,
        });
        if state.unavailable.contains(&identity) {
            return Err(Error::IdentityUnavailable { identity });
        }
        if let Some(status) = state.faults.get_mut(operation).and_then(VecDeque::pop_front) {
            return Err(Error::remote(operation, status, "injected failure"));
        }
        Ok(state)
    }

    // Seeding.

    /// Registers a capacity and returns it.
    pub fn add_capacity(&self, display_name: &str, sku: &str) -> Capacity {
        let capacity = Capacity {
            id: CapacityId::generate(),
            display_name: display_name.to_string(),
            sku: sku.to_string(),
            region: Some("West Europe".to_string()),
            state: Some("Active".to_string()),
        };
        self.lock().capacities.push(capacity.clone());
        capacity
    }

    /// Seeds an existing shared workspace and returns it.
    pub fn add_workspace(&self, display_name: &str) -> Workspace {
        let workspace = Workspace {
            id: WorkspaceId::generate(),
            display_name: display_name.to_string(),
            description: None,
            kind: Some("Workspace".to_string()),
            capacity_id: None,
        };
        self.lock().workspaces.push(workspace.clone());
        workspace
    }

    /// Seeds a personal workspace, which listings filter out.
    pub fn add_personal_workspace(&self, display_name: &str) -> Workspace {
        let workspace = Workspace {
            id: WorkspaceId::generate(),
            display_name: display_name.to_string(),
            description: None,
            kind: Some("Personal".to_string()),
            capacity_id: None,
        };
        self.lock().workspaces.push(workspace.clone());
        workspace
    }

    /// Seeds an item in a workspace and returns it.
    pub fn add_item(&self, workspace: WorkspaceId, display_name: &str, item_type: ItemType) -> Item {
        let mut state = self.lock();
        let id = state.upsert_item(workspace, display_name, item_type);
        state
            .items
            .iter()
            .find(|s| s.item.id == id)
            .map(|s| s.item.clone())
            .expect("item just inserted")
    }

    /// Sets the data sources every semantic model declares.
    pub fn set_datasources(&self, datasources: Vec<Datasource>) {
        self.lock().datasources = datasources;
    }

    /// Number of polls a SQL endpoint reports `InProgress` before `Success`.
    pub fn set_sql_endpoint_pending_polls(&self, polls: usize) {
        self.lock().sql_endpoint_pending_polls = polls;
    }

    /// Status returned by job triggers (202 unless set).
    pub fn set_job_trigger_status(&self, status: u16) {
        self.lock().job_trigger_status = Some(status);
    }

    /// Terminal states of the next jobs, in order. Later jobs complete.
    pub fn script_job_outcomes(&self, outcomes: impl IntoIterator<Item = JobStatus>) {
        self.lock().job_outcomes.extend(outcomes);
    }

    /// Terminal states of the next refreshes, in order. Later refreshes
    /// complete.
    pub fn script_refresh_outcomes<'a>(&self, outcomes: impl IntoIterator<Item = &'a str>) {
        self.lock()
            .refresh_outcomes
            .extend(outcomes.into_iter().map(str::to_string));
    }

    /// Fails the next call to `operation` with `status`. Repeated calls queue
    /// further failures.
    pub fn fail_next(&self, operation: &'static str, status: u16) {
        self.lock()
            .faults
            .entry(operation)
            .or_default()
            .push_back(status);
    }

    /// Makes every call under `identity` fail as if it had no credentials.
    pub fn set_identity_unavailable(&self, identity: ExecutionIdentity) {
        self.lock().unavailable.insert(identity);
    }

    // Inspection.

    /// Returns all recorded calls.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Returns the recorded calls to one operation.
    pub fn calls_to(&self, operation: &str) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    /// Number of recorded calls to one operation.
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls_to(operation).len()
    }

    /// Clears recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// All workspaces, personal ones included.
    pub fn workspaces(&self) -> Vec<Workspace> {
        self.lock().workspaces.clone()
    }

    /// Items of a workspace.
    pub fn items(&self, workspace: WorkspaceId) -> Vec<Item> {
        self.lock()
            .items
            .iter()
            .filter(|s| s.item.workspace_id == Some(workspace))
            .map(|s| s.item.clone())
            .collect()
    }

    /// Items of one type in a workspace.
    pub fn items_of_type(&self, workspace: WorkspaceId, item_type: ItemType) -> Vec<Item> {
        self.items(workspace)
            .into_iter()
            .filter(|i| i.item_type == item_type)
            .collect()
    }

    /// Definition an item was created with.
    pub fn definition(&self, item: ItemId) -> Option<ItemDefinition> {
        self.lock()
            .items
            .iter()
            .find(|s| s.item.id == item)
            .and_then(|s| s.definition.clone())
    }

    /// All connections.
    pub fn connections(&self) -> Vec<Connection> {
        self.lock().connections.clone()
    }

    /// Connection creation requests, in order.
    pub fn connection_requests(&self) -> Vec<CreateConnectionRequest> {
        self.lock().connection_requests.clone()
    }

    /// Dataset to connection bindings, in order.
    pub fn bindings(&self) -> Vec<(ItemId, ConnectionId)> {
        self.lock().bindings.clone()
    }

    /// Accepted capacity assignments, in order.
    pub fn capacity_assignments(&self) -> Vec<CapacityAssignment> {
        self.lock().capacity_assignments.clone()
    }

    /// Workspace role grants, in order.
    pub fn workspace_role_assignments(&self) -> Vec<(WorkspaceId, WorkspaceRoleAssignment)> {
        self.lock().workspace_roles.clone()
    }

    /// Connection role grants, in order.
    pub fn connection_role_assignments(&self) -> Vec<(ConnectionId, ConnectionRoleAssignment)> {
        self.lock().connection_roles.clone()
    }

    /// SQL endpoint ids whose metadata was refreshed.
    pub fn sql_metadata_refreshes(&self) -> Vec<String> {
        self.lock().sql_metadata_refreshes.clone()
    }

    /// Gateway data sources patched with anonymous credentials.
    pub fn anonymous_credentials(&self) -> Vec<(Uuid, Uuid)> {
        self.lock().anonymous_credentials.clone()
    }

    /// Refresh schedules set, in order.
    pub fn schedules(&self) -> Vec<(ItemId, RefreshSchedule)> {
        self.lock().schedules.clone()
    }

    /// Embed token requests, in order.
    pub fn embed_token_requests(&self) -> Vec<EmbedTokenRequest> {
        self.lock().embed_token_requests.clone()
    }

    /// Profiles.
    pub fn profiles(&self) -> Vec<Profile> {
        self.lock().profiles.clone()
    }
}

/// A `Web` data source with a URL.
#[must_use]
pub fn web_datasource(url: &str) -> Datasource {
    Datasource {
        datasource_type: "Web".to_string(),
        connection_details: DatasourceConnectionDetails {
            url: Some(url.to_string()),
            ..DatasourceConnectionDetails::default()
        },
        datasource_id: Some(Uuid::new_v4()),
        gateway_id: Some(Uuid::new_v4()),
    }
}

/// An `AzureDataLakeStorage` data source.
#[must_use]
pub fn storage_datasource(server: &str, path: &str) -> Datasource {
    Datasource {
        datasource_type: "AzureDataLakeStorage".to_string(),
        connection_details: DatasourceConnectionDetails {
            server: Some(server.to_string()),
            path: Some(path.to_string()),
            ..DatasourceConnectionDetails::default()
        },
        datasource_id: None,
        gateway_id: None,
    }
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    async fn list_workspaces(&self, identity: ExecutionIdentity) -> Result<Vec<Workspace>> {
        let state = self.begin("list workspaces", identity)?;
        Ok(state.workspaces.clone())
    }

    async fn create_workspace(
        &self,
        identity: ExecutionIdentity,
        request: &CreateWorkspaceRequest,
    ) -> Result<Workspace> {
        let operation = "create workspace";
        let mut state = self.begin(operation, identity)?;
        if state
            .workspaces
            .iter()
            .any(|w| w.display_name.eq_ignore_ascii_case(&request.display_name))
        {
            return Err(Error::remote(
                operation,
                409,
                format!("workspace name {} already in use", request.display_name),
            ));
        }
        let workspace = Workspace {
            id: WorkspaceId::generate(),
            display_name: request.display_name.clone(),
            description: request.description.clone(),
            kind: Some("Workspace".to_string()),
            capacity_id: None,
        };
        state.workspaces.push(workspace.clone());
        Ok(workspace)
    }

    async fn update_workspace_description(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        description: &str,
    ) -> Result<Workspace> {
        let operation = "update workspace description";
        let mut state = self.begin(operation, identity)?;
        let stored = state.workspace_mut(operation, workspace)?;
        stored.description = Some(description.to_string());
        Ok(stored.clone())
    }

    async fn add_workspace_role_assignment(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        assignment: &WorkspaceRoleAssignment,
    ) -> Result<()> {
        let operation = "add workspace role assignment";
        let mut state = self.begin(operation, identity)?;
        state.workspace_mut(operation, workspace)?;
        state.workspace_roles.push((workspace, *assignment));
        Ok(())
    }

    async fn list_capacities(&self, identity: ExecutionIdentity) -> Result<Vec<Capacity>> {
        let state = self.begin("list capacities", identity)?;
        Ok(state.capacities.clone())
    }

    async fn assign_to_capacity(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        capacity: CapacityId,
    ) -> Result<()> {
        let operation = "assign to capacity";
        let mut state = self.begin(operation, identity)?;
        let target = state
            .capacities
            .iter()
            .find(|c| c.id == capacity)
            .cloned()
            .ok_or_else(|| Error::remote(operation, 404, format!("capacity {capacity} not found")))?;
        if target.is_trial() && identity != ExecutionIdentity::DelegatedUser {
            return Err(Error::remote(
                operation,
                403,
                "trial capacities only accept assignment from a user",
            ));
        }
        state.workspace_mut(operation, workspace)?.capacity_id = Some(capacity);
        state.capacity_assignments.push(CapacityAssignment {
            workspace,
            capacity,
            identity,
        });
        Ok(())
    }

    async fn list_items(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
    ) -> Result<Vec<Item>> {
        let operation = "list items";
        let mut state = self.begin(operation, identity)?;
        state.workspace_mut(operation, workspace)?;
        Ok(state
            .items
            .iter()
            .filter(|s| s.item.workspace_id == Some(workspace))
            .map(|s| s.item.clone())
            .collect())
    }

    async fn create_item(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        request: &CreateItemRequest,
    ) -> Result<Item> {
        let operation = "create item";
        let mut state = self.begin(operation, identity)?;
        state.workspace_mut(operation, workspace)?;
        if state.items.iter().any(|s| {
            s.item.workspace_id == Some(workspace)
                && s.item.matches(&request.display_name, request.item_type)
        }) {
            return Err(Error::remote(
                operation,
                409,
                format!("{} {} already exists", request.item_type, request.display_name),
            ));
        }
        let item = Item {
            id: ItemId::generate(),
            display_name: request.display_name.clone(),
            item_type: request.item_type,
            workspace_id: Some(workspace),
            description: request.description.clone(),
        };
        state.items.push(StoredItem {
            item: item.clone(),
            definition: request.definition.clone(),
        });
        Ok(item)
    }

    async fn get_lakehouse(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        lakehouse: ItemId,
    ) -> Result<Lakehouse> {
        let operation = "get lakehouse";
        let mut state = self.begin(operation, identity)?;
        let stored = state.item(operation, workspace, lakehouse)?.item.clone();
        if stored.item_type != ItemType::Lakehouse {
            return Err(Error::remote(operation, 404, "item is not a lakehouse"));
        }

        let pending = state.sql_endpoint_pending_polls;
        let polls = state.sql_endpoint_polls.entry(lakehouse).or_insert(0);
        *polls += 1;
        let sql = if *polls > pending {
            SqlEndpointProperties {
                id: Some(lakehouse.to_string()),
                connection_string: Some(SQL_ENDPOINT_SERVER.to_string()),
                provisioning_status: "Success".to_string(),
            }
        } else {
            SqlEndpointProperties {
                id: None,
                connection_string: None,
                provisioning_status: "InProgress".to_string(),
            }
        };

        Ok(Lakehouse {
            id: lakehouse,
            display_name: stored.display_name,
            properties: LakehouseProperties {
                onelake_tables_path: Some(format!(
                    "https://onelake.dfs.fabric.microsoft.com/{workspace}/{lakehouse}/Tables"
                )),
                onelake_files_path: Some(format!(
                    "https://onelake.dfs.fabric.microsoft.com/{workspace}/{lakehouse}/Files"
                )),
                sql_endpoint_properties: Some(sql),
            },
        })
    }

    async fn refresh_sql_endpoint_metadata(
        &self,
        identity: ExecutionIdentity,
        sql_endpoint_id: &str,
    ) -> Result<()> {
        let mut state = self.begin("refresh sql endpoint metadata", identity)?;
        state.sql_metadata_refreshes.push(sql_endpoint_id.to_string());
        Ok(())
    }

    async fn list_connections(&self, identity: ExecutionIdentity) -> Result<Vec<Connection>> {
        let state = self.begin("list connections", identity)?;
        Ok(state.connections.clone())
    }

    async fn create_connection(
        &self,
        identity: ExecutionIdentity,
        request: &CreateConnectionRequest,
    ) -> Result<Connection> {
        let operation = "create connection";
        let mut state = self.begin(operation, identity)?;
        if state
            .connections
            .iter()
            .any(|c| c.display_name == request.display_name)
        {
            return Err(Error::remote(
                operation,
                409,
                format!("connection {} already exists", request.display_name),
            ));
        }
        let connection = Connection {
            id: ConnectionId::generate(),
            display_name: request.display_name.clone(),
            connectivity_type: Some(request.connectivity_type.clone()),
            connection_details: Some(ConnectionDetails {
                connection_type: request.connection_details.connection_type.clone(),
                path: request
                    .parameter("url")
                    .or_else(|| request.parameter("path"))
                    .map(str::to_string),
            }),
        };
        state.connections.push(connection.clone());
        state.connection_requests.push(request.clone());
        Ok(connection)
    }

    async fn add_connection_role_assignment(
        &self,
        identity: ExecutionIdentity,
        connection: ConnectionId,
        assignment: &ConnectionRoleAssignment,
    ) -> Result<()> {
        let mut state = self.begin("add connection role assignment", identity)?;
        state.connection_roles.push((connection, *assignment));
        Ok(())
    }

    async fn run_item_job(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        item: ItemId,
        _job_type: &str,
    ) -> Result<JobTrigger> {
        let operation = "run item job";
        let mut state = self.begin(operation, identity)?;
        state.item(operation, workspace, item)?;
        let status = state.job_trigger_status.unwrap_or(202);
        if status != 202 {
            return Ok(JobTrigger {
                status,
                job_id: None,
            });
        }
        let job = JobId::generate();
        let outcome = state
            .job_outcomes
            .pop_front()
            .unwrap_or(JobStatus::Completed);
        state.jobs.insert(job, outcome);
        Ok(JobTrigger {
            status,
            job_id: Some(job),
        })
    }

    async fn get_item_job(
        &self,
        identity: ExecutionIdentity,
        _workspace: WorkspaceId,
        _item: ItemId,
        job: JobId,
    ) -> Result<JobInstance> {
        let operation = "get item job";
        let state = self.begin(operation, identity)?;
        let status = *state
            .jobs
            .get(&job)
            .ok_or_else(|| Error::remote(operation, 404, format!("job {job} not found")))?;
        Ok(JobInstance {
            id: job,
            status,
            failure_reason: (status == JobStatus::Failed).then(|| JobFailure {
                error_code: Some("NotebookFailed".to_string()),
                message: "notebook raised an exception".to_string(),
            }),
        })
    }

    async fn list_datasources(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
    ) -> Result<Vec<Datasource>> {
        let operation = "list datasources";
        let state = self.begin(operation, identity)?;
        state.item(operation, workspace, dataset)?;
        Ok(state.datasources.clone())
    }

    async fn bind_to_connection(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
        connection: ConnectionId,
    ) -> Result<()> {
        let operation = "bind to connection";
        let mut state = self.begin(operation, identity)?;
        state.item(operation, workspace, dataset)?;
        if !state.connections.iter().any(|c| c.id == connection) {
            return Err(Error::remote(operation, 404, "connection not found"));
        }
        state.bindings.push((dataset, connection));
        Ok(())
    }

    async fn trigger_refresh(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
    ) -> Result<RefreshTrigger> {
        let operation = "trigger refresh";
        let mut state = self.begin(operation, identity)?;
        state.item(operation, workspace, dataset)?;
        let request_id = Uuid::new_v4().to_string();
        let outcome = state
            .refresh_outcomes
            .pop_front()
            .unwrap_or_else(|| "Completed".to_string());
        state.refreshes.insert(request_id.clone(), outcome);
        Ok(RefreshTrigger { request_id })
    }

    async fn get_refresh(
        &self,
        identity: ExecutionIdentity,
        _workspace: WorkspaceId,
        _dataset: ItemId,
        request_id: &str,
    ) -> Result<DatasetRefresh> {
        let operation = "get refresh";
        let state = self.begin(operation, identity)?;
        let status = state
            .refreshes
            .get(request_id)
            .cloned()
            .ok_or_else(|| Error::remote(operation, 404, "refresh not found"))?;
        let service_exception_json = (status == "Failed")
            .then(|| serde_json::json!({ "errorCode": "ModelRefreshFailed" }).to_string());
        Ok(DatasetRefresh {
            status,
            service_exception_json,
        })
    }

    async fn set_anonymous_datasource_credentials(
        &self,
        identity: ExecutionIdentity,
        gateway: Uuid,
        datasource: Uuid,
    ) -> Result<()> {
        let mut state = self.begin("set datasource credentials", identity)?;
        state.anonymous_credentials.push((gateway, datasource));
        Ok(())
    }

    async fn update_refresh_schedule(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
        schedule: &RefreshSchedule,
    ) -> Result<()> {
        let operation = "update refresh schedule";
        let mut state = self.begin(operation, identity)?;
        state.item(operation, workspace, dataset)?;
        state.schedules.push((dataset, schedule.clone()));
        Ok(())
    }

    async fn post_import(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        name: &str,
        content: Vec<u8>,
    ) -> Result<Import> {
        let operation = "post import";
        let mut state = self.begin(operation, identity)?;
        state.workspace_mut(operation, workspace)?;
        if content.is_empty() {
            return Err(Error::remote(operation, 400, "empty upload"));
        }

        let report = state.upsert_item(workspace, name, ItemType::Report);
        let dataset = state.upsert_item(workspace, name, ItemType::SemanticModel);
        let id = Uuid::new_v4().to_string();
        state.imports.insert(
            id.clone(),
            Import {
                id: id.clone(),
                import_state: "Succeeded".to_string(),
                reports: vec![ImportedArtifact {
                    id: report,
                    name: name.to_string(),
                }],
                datasets: vec![ImportedArtifact {
                    id: dataset,
                    name: name.to_string(),
                }],
            },
        );
        Ok(Import {
            id,
            import_state: "Publishing".to_string(),
            reports: Vec::new(),
            datasets: Vec::new(),
        })
    }

    async fn get_import(
        &self,
        identity: ExecutionIdentity,
        _workspace: WorkspaceId,
        import_id: &str,
    ) -> Result<Import> {
        let operation = "get import";
        let state = self.begin(operation, identity)?;
        state
            .imports
            .get(import_id)
            .cloned()
            .ok_or_else(|| Error::remote(operation, 404, "import not found"))
    }

    async fn get_report(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        report: ItemId,
    ) -> Result<Report> {
        let operation = "get report";
        let state = self.begin(operation, identity)?;
        let stored = state.item(operation, workspace, report)?;
        let dataset_id = state
            .items
            .iter()
            .find(|s| {
                s.item.workspace_id == Some(workspace)
                    && s.item.item_type == ItemType::SemanticModel
            })
            .map(|s| s.item.id);
        Ok(Report {
            id: report,
            name: stored.item.display_name.clone(),
            dataset_id,
            embed_url: Some(format!(
                "https://app.powerbi.com/reportEmbed?reportId={report}&groupId={workspace}"
            )),
        })
    }

    async fn generate_embed_token(
        &self,
        identity: ExecutionIdentity,
        request: &EmbedTokenRequest,
    ) -> Result<EmbedToken> {
        let mut state = self.begin("generate embed token", identity)?;
        state.embed_token_requests.push(request.clone());
        let serial = state.embed_token_requests.len();
        Ok(EmbedToken {
            token: Redacted::new(format!("embed-token-{serial}")),
            token_id: Some(Uuid::new_v4().to_string()),
            expiration: None,
        })
    }

    async fn list_profiles(&self, identity: ExecutionIdentity) -> Result<Vec<Profile>> {
        let state = self.begin("list profiles", identity)?;
        Ok(state.profiles.clone())
    }

    async fn create_profile(
        &self,
        identity: ExecutionIdentity,
        display_name: &str,
    ) -> Result<Profile> {
        let operation = "create profile";
        let mut state = self.begin(operation, identity)?;
        if state.profiles.iter().any(|p| p.display_name == display_name) {
            return Err(Error::remote(operation, 409, "profile already exists"));
        }
        let profile = Profile {
            id: ProfileId::generate(),
            display_name: display_name.to_string(),
        };
        state.profiles.push(profile.clone());
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_workspace_name_conflicts() {
        let plane = MemoryControlPlane::new();
        plane.add_workspace("Contoso");
        let request = CreateWorkspaceRequest {
            display_name: "contoso".to_string(),
            description: None,
        };

        let err = plane
            .create_workspace(ExecutionIdentity::ServicePrincipal, &request)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
    }

    #[tokio::test]
    async fn injected_fault_fires_once() {
        let plane = MemoryControlPlane::new();
        plane.fail_next("list workspaces", 503);

        let identity = ExecutionIdentity::ServicePrincipal;
        assert!(plane.list_workspaces(identity).await.unwrap_err().is_transient());
        assert!(plane.list_workspaces(identity).await.is_ok());
        assert_eq!(plane.call_count("list workspaces"), 2);
    }

    #[tokio::test]
    async fn sql_endpoint_provisions_after_pending_polls() {
        let plane = MemoryControlPlane::new();
        plane.set_sql_endpoint_pending_polls(1);
        let workspace = plane.add_workspace("Contoso");
        let lakehouse = plane.add_item(workspace.id, "sales", ItemType::Lakehouse);
        let identity = ExecutionIdentity::ServicePrincipal;

        let first = plane.get_lakehouse(identity, workspace.id, lakehouse.id).await.unwrap();
        let second = plane.get_lakehouse(identity, workspace.id, lakehouse.id).await.unwrap();

        let status = |l: &Lakehouse| {
            l.properties
                .sql_endpoint_properties
                .as_ref()
                .unwrap()
                .provisioning_status
                .clone()
        };
        assert_eq!(status(&first), "InProgress");
        assert_eq!(status(&second), "Success");
    }

    #[tokio::test]
    async fn reimport_overwrites_same_named_content() {
        let plane = MemoryControlPlane::new();
        let workspace = plane.add_workspace("Contoso");
        let identity = ExecutionIdentity::ServicePrincipalProfile;

        let first = plane
            .post_import(identity, workspace.id, "Product Sales", vec![1])
            .await
            .unwrap();
        let second = plane
            .post_import(identity, workspace.id, "Product Sales", vec![1])
            .await
            .unwrap();

        let first = plane.get_import(identity, workspace.id, &first.id).await.unwrap();
        let second = plane.get_import(identity, workspace.id, &second.id).await.unwrap();
        assert_eq!(first.reports[0].id, second.reports[0].id);
        assert_eq!(plane.items(workspace.id).len(), 2);
    }
}
