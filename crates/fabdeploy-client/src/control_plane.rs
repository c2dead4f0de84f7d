//! Transport abstraction over the two control-plane surfaces.
//!
//! [`ControlPlane`] is one call per remote endpoint with no policy attached:
//! no find-before-create, no retries, no polling. Those live in
//! [`crate::resource::ResourceClient`], which is written against this trait so
//! that the REST transport and the in-memory fake used in tests are
//! interchangeable.
//!
//! Every method takes the [`ExecutionIdentity`] the call is made under.

use async_trait::async_trait;

use fabdeploy_core::{CapacityId, ConnectionId, ExecutionIdentity, ItemId, JobId, WorkspaceId};

use crate::error::Result;
use crate::model::{
    Capacity, Connection, ConnectionRoleAssignment, CreateConnectionRequest, CreateItemRequest,
    CreateWorkspaceRequest, DatasetRefresh, Datasource, EmbedToken, EmbedTokenRequest, Import,
    Item, JobInstance, JobTrigger, Lakehouse, Profile, RefreshSchedule, RefreshTrigger, Report,
    Workspace, WorkspaceRoleAssignment,
};

/// Raw control-plane operations.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    // Workspaces and capacities.

    /// Lists workspaces visible to the identity.
    async fn list_workspaces(&self, identity: ExecutionIdentity) -> Result<Vec<Workspace>>;

    /// Creates a workspace.
    async fn create_workspace(
        &self,
        identity: ExecutionIdentity,
        request: &CreateWorkspaceRequest,
    ) -> Result<Workspace>;

    /// Replaces a workspace description.
    async fn update_workspace_description(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        description: &str,
    ) -> Result<Workspace>;

    /// Grants a workspace role.
    async fn add_workspace_role_assignment(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        assignment: &WorkspaceRoleAssignment,
    ) -> Result<()>;

    /// Lists capacities visible to the identity.
    async fn list_capacities(&self, identity: ExecutionIdentity) -> Result<Vec<Capacity>>;

    /// Assigns a workspace to a capacity.
    async fn assign_to_capacity(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        capacity: CapacityId,
    ) -> Result<()>;

    // Items.

    /// Lists items in a workspace.
    async fn list_items(&self, identity: ExecutionIdentity, workspace: WorkspaceId)
    -> Result<Vec<Item>>;

    /// Creates an item, waiting for provisioning to finish.
    async fn create_item(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        request: &CreateItemRequest,
    ) -> Result<Item>;

    /// Reads lakehouse properties.
    async fn get_lakehouse(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        lakehouse: ItemId,
    ) -> Result<Lakehouse>;

    /// Asks the SQL endpoint to resync table metadata.
    async fn refresh_sql_endpoint_metadata(
        &self,
        identity: ExecutionIdentity,
        sql_endpoint_id: &str,
    ) -> Result<()>;

    // Connections.

    /// Lists connections visible to the identity.
    async fn list_connections(&self, identity: ExecutionIdentity) -> Result<Vec<Connection>>;

    /// Creates a connection.
    async fn create_connection(
        &self,
        identity: ExecutionIdentity,
        request: &CreateConnectionRequest,
    ) -> Result<Connection>;

    /// Grants a connection role.
    async fn add_connection_role_assignment(
        &self,
        identity: ExecutionIdentity,
        connection: ConnectionId,
        assignment: &ConnectionRoleAssignment,
    ) -> Result<()>;

    // Jobs.

    /// Triggers an on-demand item job. Does not wait.
    async fn run_item_job(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        item: ItemId,
        job_type: &str,
    ) -> Result<JobTrigger>;

    /// Reads a job instance.
    async fn get_item_job(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        item: ItemId,
        job: JobId,
    ) -> Result<JobInstance>;

    // Datasets (legacy surface).

    /// Lists the data sources a semantic model declares.
    async fn list_datasources(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
    ) -> Result<Vec<Datasource>>;

    /// Binds a semantic model's data sources to a connection.
    async fn bind_to_connection(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
        connection: ConnectionId,
    ) -> Result<()>;

    /// Starts a dataset refresh. Does not wait.
    async fn trigger_refresh(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
    ) -> Result<RefreshTrigger>;

    /// Reads the progress of a dataset refresh.
    async fn get_refresh(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
        request_id: &str,
    ) -> Result<DatasetRefresh>;

    /// Sets anonymous credentials on a gateway data source.
    async fn set_anonymous_datasource_credentials(
        &self,
        identity: ExecutionIdentity,
        gateway: uuid::Uuid,
        datasource: uuid::Uuid,
    ) -> Result<()>;

    /// Replaces a dataset refresh schedule.
    async fn update_refresh_schedule(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        dataset: ItemId,
        schedule: &RefreshSchedule,
    ) -> Result<()>;

    /// Uploads a PBIX file, overwriting same-named content.
    async fn post_import(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        name: &str,
        content: Vec<u8>,
    ) -> Result<Import>;

    /// Reads import progress.
    async fn get_import(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        import_id: &str,
    ) -> Result<Import>;

    // Reports and embedding (legacy surface).

    /// Reads a report.
    async fn get_report(
        &self,
        identity: ExecutionIdentity,
        workspace: WorkspaceId,
        report: ItemId,
    ) -> Result<Report>;

    /// Generates a V2 embed token.
    async fn generate_embed_token(
        &self,
        identity: ExecutionIdentity,
        request: &EmbedTokenRequest,
    ) -> Result<EmbedToken>;

    // Service principal profiles.

    /// Lists service principal profiles.
    async fn list_profiles(&self, identity: ExecutionIdentity) -> Result<Vec<Profile>>;

    /// Creates a service principal profile.
    async fn create_profile(&self, identity: ExecutionIdentity, display_name: &str)
    -> Result<Profile>;
}
