//! Resource model shared by the control-plane transport and its callers.
//!
//! These types mirror the JSON documents both control-plane surfaces
//! exchange. Only the fields the deployment flows read or write are modelled.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fabdeploy_core::{
    CapacityId, ConnectionId, ItemId, JobId, Principal, ProfileId, Redacted, WorkspaceId,
};

use crate::error::{Error, Result};

/// A workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Workspace id.
    pub id: WorkspaceId,
    /// Display name.
    pub display_name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Workspace kind (`Workspace`, `Personal`, ...).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Capacity the workspace is assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_id: Option<CapacityId>,
}

impl Workspace {
    /// Returns true for shared workspaces (personal workspaces excluded).
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.kind.as_deref().is_none_or(|kind| kind == "Workspace")
    }
}

/// Body of a workspace creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceRequest {
    /// Display name.
    pub display_name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capacity {
    /// Capacity id.
    pub id: CapacityId,
    /// Display name.
    pub display_name: String,
    /// SKU (`F2`, `FT1`, `P1`, ...).
    pub sku: String,
    /// Azure region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Provisioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Capacity {
    /// SKU of trial capacities, which only accept assignment from a user.
    pub const TRIAL_SKU: &'static str = "FT1";

    /// Returns true for a trial capacity.
    #[must_use]
    pub fn is_trial(&self) -> bool {
        self.sku.eq_ignore_ascii_case(Self::TRIAL_SKU)
    }
}

/// Workspace roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceRole {
    /// Full control.
    Admin,
    /// Member.
    Member,
    /// Contributor.
    Contributor,
    /// Viewer.
    Viewer,
}

/// A workspace role grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRoleAssignment {
    /// Grantee.
    pub principal: Principal,
    /// Role granted.
    pub role: WorkspaceRole,
}

/// Connection roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionRole {
    /// Owner.
    Owner,
    /// User.
    User,
    /// User allowed to reshare.
    UserWithReshare,
}

/// A connection role grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRoleAssignment {
    /// Grantee.
    pub principal: Principal,
    /// Role granted.
    pub role: ConnectionRole,
}

/// Item types the flows create or look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemType {
    /// Lakehouse.
    Lakehouse,
    /// Notebook.
    Notebook,
    /// Semantic model (dataset).
    SemanticModel,
    /// Report.
    Report,
    /// Warehouse.
    Warehouse,
    /// Eventhouse.
    Eventhouse,
    /// SQL analytics endpoint of a lakehouse.
    #[serde(rename = "SQLEndpoint")]
    SqlEndpoint,
    /// Any type the flows do not handle.
    #[serde(other)]
    Other,
}

impl ItemType {
    /// Vendor type tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lakehouse => "Lakehouse",
            Self::Notebook => "Notebook",
            Self::SemanticModel => "SemanticModel",
            Self::Report => "Report",
            Self::Warehouse => "Warehouse",
            Self::Eventhouse => "Eventhouse",
            Self::SqlEndpoint => "SQLEndpoint",
            Self::Other => "Other",
        }
    }

    /// Parses the type suffix of an item template folder (`Sales.SemanticModel`).
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Lakehouse" => Self::Lakehouse,
            "Notebook" => Self::Notebook,
            "SemanticModel" => Self::SemanticModel,
            "Report" => Self::Report,
            "Warehouse" => Self::Warehouse,
            "Eventhouse" => Self::Eventhouse,
            "SQLEndpoint" => Self::SqlEndpoint,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Item id.
    pub id: ItemId,
    /// Display name.
    pub display_name: String,
    /// Item type.
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Owning workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<WorkspaceId>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Item {
    /// Returns true when this item has the given identity key within its
    /// workspace. Names compare case-insensitively.
    #[must_use]
    pub fn matches(&self, display_name: &str, item_type: ItemType) -> bool {
        self.item_type == item_type && self.display_name.eq_ignore_ascii_case(display_name)
    }
}

/// Payload encoding of a definition part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadType {
    /// Base64-encoded inline bytes.
    #[default]
    InlineBase64,
}

/// One named payload of an item definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDefinitionPart {
    /// Logical file path within the item (`definition/expressions.tmdl`).
    pub path: String,
    /// Encoded payload.
    pub payload: String,
    /// Payload encoding.
    pub payload_type: PayloadType,
}

impl ItemDefinitionPart {
    /// Creates a part from raw bytes.
    #[must_use]
    pub fn from_bytes(path: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            path: path.into(),
            payload: BASE64.encode(bytes),
            payload_type: PayloadType::InlineBase64,
        }
    }

    /// Creates a part from UTF-8 text.
    #[must_use]
    pub fn from_text(path: impl Into<String>, text: &str) -> Self {
        Self::from_bytes(path, text.as_bytes())
    }

    /// Decodes the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.payload)
            .map_err(|e| Error::malformed("decode definition part", format!("{}: {e}", self.path)))
    }

    /// Decodes the payload as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid base64 or not UTF-8.
    pub fn decode_text(&self) -> Result<String> {
        String::from_utf8(self.decode()?)
            .map_err(|e| Error::malformed("decode definition part", format!("{}: {e}", self.path)))
    }
}

/// The ordered parts describing an item's content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDefinition {
    /// Definition format (`ipynb`, `TMDL`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Parts in submission order.
    pub parts: Vec<ItemDefinitionPart>,
}

impl ItemDefinition {
    /// Creates a definition from parts.
    #[must_use]
    pub fn new(parts: Vec<ItemDefinitionPart>) -> Self {
        Self { format: None, parts }
    }

    /// Finds a part by path.
    #[must_use]
    pub fn part(&self, path: &str) -> Option<&ItemDefinitionPart> {
        self.parts.iter().find(|part| part.path == path)
    }
}

/// Body of an item creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    /// Display name.
    pub display_name: String,
    /// Item type.
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Definition parts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<ItemDefinition>,
    /// Type-specific creation options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_payload: Option<serde_json::Value>,
}

impl CreateItemRequest {
    /// Creates a request without a definition.
    #[must_use]
    pub fn new(display_name: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            display_name: display_name.into(),
            item_type,
            description: None,
            definition: None,
            creation_payload: None,
        }
    }

    /// Attaches a definition.
    #[must_use]
    pub fn with_definition(mut self, definition: ItemDefinition) -> Self {
        self.definition = Some(definition);
        self
    }
}

/// SQL analytics endpoint properties of a lakehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlEndpointProperties {
    /// Endpoint id, set once provisioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Server connection string, set once provisioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    /// `InProgress`, `Success` or `Failed`.
    pub provisioning_status: String,
}

/// Lakehouse properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LakehouseProperties {
    /// OneLake path of the `Tables` folder.
    #[serde(default, rename = "oneLakeTablesPath", skip_serializing_if = "Option::is_none")]
    pub onelake_tables_path: Option<String>,
    /// OneLake path of the `Files` folder.
    #[serde(default, rename = "oneLakeFilesPath", skip_serializing_if = "Option::is_none")]
    pub onelake_files_path: Option<String>,
    /// SQL endpoint, absent until provisioning starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_endpoint_properties: Option<SqlEndpointProperties>,
}

/// A lakehouse with its properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lakehouse {
    /// Item id.
    pub id: ItemId,
    /// Display name.
    pub display_name: String,
    /// Properties.
    #[serde(default)]
    pub properties: LakehouseProperties,
}

/// A provisioned SQL endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlEndpoint {
    /// Endpoint id; doubles as the database name.
    pub id: String,
    /// Server connection string.
    pub connection_string: String,
}

/// A connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Connection id.
    pub id: ConnectionId,
    /// Display name.
    pub display_name: String,
    /// `ShareableCloud`, `OnPremisesGateway`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectivity_type: Option<String>,
    /// Endpoint details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_details: Option<ConnectionDetails>,
}

/// Endpoint summary of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    /// Connection type (`Web`, `AzureDataLakeStorage`, ...).
    #[serde(rename = "type")]
    pub connection_type: String,
    /// Endpoint path or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Named creation parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParameter {
    /// Parameter data type.
    pub data_type: String,
    /// Parameter name.
    pub name: String,
    /// Parameter value.
    pub value: String,
}

/// Endpoint portion of a connection creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionDetails {
    /// Connection type.
    #[serde(rename = "type")]
    pub connection_type: String,
    /// Creation method.
    pub creation_method: String,
    /// Creation parameters.
    pub parameters: Vec<ConnectionParameter>,
}

/// Credential kinds a connection can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "credentialType")]
pub enum Credential {
    /// No credentials.
    Anonymous,
    /// Service principal client credentials.
    #[serde(rename_all = "camelCase")]
    ServicePrincipal {
        /// Directory tenant.
        tenant_id: String,
        /// Application id.
        service_principal_client_id: String,
        /// Client secret.
        service_principal_secret: Redacted<String>,
    },
    /// The workspace's managed identity.
    WorkspaceIdentity,
}

/// Credential portion of a connection creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCredentialDetails {
    /// Single sign-on type.
    pub single_sign_on_type: String,
    /// Encryption requirement.
    pub connection_encryption: String,
    /// Skip the connectivity test on creation.
    pub skip_test_connection: bool,
    /// Credentials.
    pub credentials: Credential,
}

/// Body of a cloud connection creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionRequest {
    /// Always `ShareableCloud` for connections this tool creates.
    pub connectivity_type: String,
    /// Display name; the reuse key.
    pub display_name: String,
    /// Endpoint.
    pub connection_details: CreateConnectionDetails,
    /// Credentials.
    pub credential_details: CreateCredentialDetails,
}

impl CreateConnectionRequest {
    /// Creates a shareable cloud connection request.
    #[must_use]
    pub fn cloud(
        display_name: impl Into<String>,
        connection_type: &str,
        parameters: &[(&str, &str)],
        credentials: Credential,
    ) -> Self {
        Self {
            connectivity_type: "ShareableCloud".to_string(),
            display_name: display_name.into(),
            connection_details: CreateConnectionDetails {
                connection_type: connection_type.to_string(),
                creation_method: connection_type.to_string(),
                parameters: parameters
                    .iter()
                    .map(|(name, value)| ConnectionParameter {
                        data_type: "Text".to_string(),
                        name: (*name).to_string(),
                        value: (*value).to_string(),
                    })
                    .collect(),
            },
            credential_details: CreateCredentialDetails {
                single_sign_on_type: "None".to_string(),
                connection_encryption: "NotEncrypted".to_string(),
                skip_test_connection: false,
                credentials,
            },
        }
    }

    /// Returns a creation parameter value.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.connection_details
            .parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

/// Acknowledgement of a job trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTrigger {
    /// HTTP status of the trigger call; 202 means accepted.
    pub status: u16,
    /// Job handle, present when accepted.
    pub job_id: Option<JobId>,
}

/// Remote job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Queued.
    NotStarted,
    /// Running.
    InProgress,
    /// Finished successfully.
    #[serde(alias = "Succeeded")]
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled remotely.
    Cancelled,
    /// Dropped as a duplicate of a running instance.
    Deduped,
    /// A state this client does not know; polled again.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Returns true for states after which the job never changes.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Deduped
        )
    }
}

/// Failure details of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFailure {
    /// Error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

/// A job instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInstance {
    /// Job id.
    pub id: JobId,
    /// Current state.
    pub status: JobStatus,
    /// Failure details, set when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<JobFailure>,
}

/// Connection details of a dataset data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceConnectionDetails {
    /// URL (Web sources).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Server (storage and SQL sources).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Path (storage sources).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Database (SQL sources).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// A data source declared by a semantic model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datasource {
    /// Source type (`Web`, `AzureDataLakeStorage`, `Sql`, ...).
    pub datasource_type: String,
    /// Endpoint details.
    #[serde(default)]
    pub connection_details: DatasourceConnectionDetails,
    /// Datasource id within its gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource_id: Option<Uuid>,
    /// Gateway hosting the datasource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<Uuid>,
}

impl Datasource {
    /// Returns true for a `Web` source (compared case-insensitively).
    #[must_use]
    pub fn is_web(&self) -> bool {
        self.datasource_type.eq_ignore_ascii_case("web")
    }

    /// Returns true for an `AzureDataLakeStorage` source.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        self.datasource_type == "AzureDataLakeStorage"
    }
}

/// Handle of a triggered dataset refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTrigger {
    /// Request id used to query refresh progress.
    pub request_id: String,
}

/// Progress of one dataset refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRefresh {
    /// `Unknown` while running, then `Completed`, `Failed`, `Disabled` or
    /// `Cancelled`.
    pub status: String,
    /// Error payload of a failed refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_exception_json: Option<String>,
}

/// When notifications are sent for scheduled refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleNotifyOption {
    /// Never.
    NoNotification,
    /// Mail the owner on failure.
    MailOnFailure,
}

/// A dataset refresh schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSchedule {
    /// Schedule enabled.
    pub enabled: bool,
    /// Weekdays.
    pub days: Vec<String>,
    /// Times of day, `HH:MM`.
    pub times: Vec<String>,
    /// Time zone of `times`.
    pub local_time_zone_id: String,
    /// Notification behaviour.
    pub notify_option: ScheduleNotifyOption,
}

impl RefreshSchedule {
    /// Weekdays at 02:00 and 11:30 UTC.
    #[must_use]
    pub fn weekdays(notify_option: ScheduleNotifyOption) -> Self {
        Self {
            enabled: true,
            days: ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            times: vec!["02:00".to_string(), "11:30".to_string()],
            local_time_zone_id: "UTC".to_string(),
            notify_option,
        }
    }
}

/// Report or dataset produced by an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedArtifact {
    /// Artifact id.
    pub id: ItemId,
    /// Artifact name.
    #[serde(default)]
    pub name: String,
}

/// A PBIX import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Import {
    /// Import id.
    pub id: String,
    /// `Publishing`, `Succeeded` or `Failed`.
    pub import_state: String,
    /// Reports created by the import.
    #[serde(default)]
    pub reports: Vec<ImportedArtifact>,
    /// Datasets created by the import.
    #[serde(default)]
    pub datasets: Vec<ImportedArtifact>,
}

/// A report on the legacy surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Report id.
    pub id: ItemId,
    /// Report name.
    pub name: String,
    /// Dataset the report reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<ItemId>,
    /// Service embed URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
}

/// Dataset entry of an embed token request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedTokenDataset {
    /// Dataset id.
    pub id: ItemId,
    /// XMLA permissions.
    pub xmla_permissions: String,
}

/// Report entry of an embed token request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedTokenReport {
    /// Report id.
    pub id: ItemId,
    /// Allow editing in the embedded view.
    pub allow_edit: bool,
}

/// Workspace entry of an embed token request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedTokenWorkspace {
    /// Workspace id.
    pub id: WorkspaceId,
}

/// Body of a V2 embed token request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedTokenRequest {
    /// Datasets.
    pub datasets: Vec<EmbedTokenDataset>,
    /// Reports.
    pub reports: Vec<EmbedTokenReport>,
    /// Workspaces the token may act in.
    pub target_workspaces: Vec<EmbedTokenWorkspace>,
}

/// A generated embed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedToken {
    /// Token.
    pub token: Redacted<String>,
    /// Token id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    /// Expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

/// Everything needed to render an embedded report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingCredential {
    /// Report id.
    pub report_id: ItemId,
    /// Report name.
    pub report_name: String,
    /// Workspace id.
    pub workspace_id: WorkspaceId,
    /// Embed URL.
    pub embed_url: String,
    /// Embed token.
    pub access_token: Redacted<String>,
    /// Token expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// A service principal profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Profile id.
    pub id: ProfileId,
    /// Display name.
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_matches_case_insensitively_within_type() {
        let item = Item {
            id: ItemId::generate(),
            display_name: "Sales".into(),
            item_type: ItemType::Lakehouse,
            workspace_id: None,
            description: None,
        };
        assert!(item.matches("sales", ItemType::Lakehouse));
        assert!(!item.matches("sales", ItemType::Notebook));
    }

    #[test]
    fn unknown_item_type_deserializes_as_other() {
        let item: Item = serde_json::from_value(json!({
            "id": "6f1c2a4e-0c3b-4f55-9f7e-2d9a1b0c3d4e",
            "displayName": "Stream",
            "type": "Eventstream"
        }))
        .unwrap();
        assert_eq!(item.item_type, ItemType::Other);
    }

    #[test]
    fn part_text_roundtrip() {
        let part = ItemDefinitionPart::from_text("notebook-content.py", "print('hi')");
        assert_eq!(part.payload, "cHJpbnQoJ2hpJyk=");
        assert_eq!(part.decode_text().unwrap(), "print('hi')");
    }

    #[test]
    fn bad_payload_is_malformed() {
        let part = ItemDefinitionPart {
            path: "x".into(),
            payload: "***".into(),
            payload_type: PayloadType::InlineBase64,
        };
        assert!(matches!(part.decode(), Err(Error::MalformedResponse { .. })));
    }

    #[test]
    fn credential_serializes_with_type_tag() {
        let request = CreateConnectionRequest::cloud(
            "Workspace[x]-Web",
            "Web",
            &[("url", "https://example/data")],
            Credential::Anonymous,
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["credentialDetails"]["credentials"]["credentialType"],
            "Anonymous"
        );
        assert_eq!(value["connectionDetails"]["type"], "Web");
        assert_eq!(request.parameter("url"), Some("https://example/data"));
    }

    #[test]
    fn trial_capacity_detection() {
        let capacity = Capacity {
            id: CapacityId::generate(),
            display_name: "Trial".into(),
            sku: "FT1".into(),
            region: None,
            state: None,
        };
        assert!(capacity.is_trial());
    }

    #[test]
    fn weekday_schedule() {
        let schedule = RefreshSchedule::weekdays(ScheduleNotifyOption::NoNotification);
        assert_eq!(schedule.days.len(), 5);
        assert_eq!(schedule.times, vec!["02:00", "11:30"]);
        assert_eq!(schedule.local_time_zone_id, "UTC");
    }

    #[test]
    fn job_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Deduped.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
    }

    #[test]
    fn unrecognised_job_status_is_not_terminal() {
        let status: JobStatus = serde_json::from_str("\"Paused\"").unwrap();
        assert_eq!(status, JobStatus::Unknown);
        assert!(!status.is_terminal());

        let status: JobStatus = serde_json::from_str("\"Succeeded\"").unwrap();
        assert_eq!(status, JobStatus::Completed);
    }
}
