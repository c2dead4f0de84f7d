//! Deployment orchestrator.
//!
//! A deployment walks the [`StageGraph`] of its flow in topological order.
//! Each stage reads what it needs from the [`DeploymentState`] filled in by
//! earlier stages and writes what it produces back. Every find-or-create
//! stage looks the resource up by its (workspace, name, type) key first, so a
//! rerun against the same workspace reuses everything it finds.
//!
//! Any error aborts the remaining stages. Nothing is rolled back; the next
//! run finds and reuses whatever was already created.
//!
//! The power-bi flow reuses an existing workspace and creates a missing one
//! through the workspace API; it never deletes and recreates a group.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use fabdeploy_client::model::{CreateItemRequest, Item, ItemType, SqlEndpoint, Workspace};
use fabdeploy_client::ResourceClient;
use fabdeploy_core::observability::{deployment_span, stage_span};
use fabdeploy_core::{ItemId, WorkspaceId};

use crate::definitions::TemplateLibrary;
use crate::embed::{EmbeddingPageGenerator, NoViewer, Viewer};
use crate::error::{Error, Result};
use crate::stage::{FlowKind, Stage, StageGraph};
use crate::template::{Substitutions, substitute_part};

/// Token for the lakehouse OneLake root in model expressions.
pub const ONELAKE_PATH_TOKEN: &str = "{ONELAKE_PATH}";
/// Token for the SQL endpoint server in DirectLake models.
pub const SQL_ENDPOINT_SERVER_TOKEN: &str = "{SQL_ENDPOINT_SERVER}";
/// Token for the SQL endpoint database in DirectLake models.
pub const SQL_ENDPOINT_DATABASE_TOKEN: &str = "{SQL_ENDPOINT_DATABASE}";
/// Part of an item folder model holding its data source expressions.
pub const EXPRESSIONS_PART: &str = "definition/expressions.tmdl";

/// What happens when the requested workspace name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspacePolicy {
    /// Use the existing workspace; create one only when none exists.
    Reuse,
    /// Always create; a taken name gets a timestamp suffix.
    RenameWithSuffix,
    /// Use the existing workspace; fail when none exists.
    RequireExisting,
}

impl FlowKind {
    /// Collision policy of the flow's workspace stage.
    #[must_use]
    pub const fn workspace_policy(self) -> WorkspacePolicy {
        match self {
            Self::Hybrid | Self::PowerBi => WorkspacePolicy::Reuse,
            Self::Fabric => WorkspacePolicy::RenameWithSuffix,
            Self::EmbedOnly => WorkspacePolicy::RequireExisting,
        }
    }

    /// Returns true when the flow runs as the embedding identity throughout.
    #[must_use]
    pub const fn runs_as_embedding_identity(self) -> bool {
        matches!(self, Self::PowerBi | Self::EmbedOnly)
    }
}

/// Names of everything the flows create, and the templates they use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprint {
    /// Lakehouse name.
    pub lakehouse: String,
    /// Notebook name.
    pub notebook: String,
    /// Notebook source under `Notebooks/`.
    pub notebook_source: String,
    /// Item folder of the OneLake-backed model.
    pub onelake_model_folder: String,
    /// DirectLake model name.
    pub directlake_model: String,
    /// DirectLake model schema under `SemanticModels/`.
    pub directlake_bim: String,
    /// Report name.
    pub report: String,
    /// Report layout under `Reports/`.
    pub report_layout: String,
    /// PBIX file name.
    pub pbix_file: String,
    /// Name the PBIX import publishes under.
    pub pbix_name: String,
    /// Description of workspaces created by the hybrid flow.
    pub hybrid_description: String,
    /// Description set by the Fabric flow.
    pub fabric_description: String,
}

impl Default for Blueprint {
    fn default() -> Self {
        Self {
            lakehouse: "sales".to_string(),
            notebook: "Create Lakehouse Tables".to_string(),
            notebook_source: "CreateLakehouseTables.py".to_string(),
            onelake_model_folder: "Product Sales DirectLake Model on Onelake.SemanticModel"
                .to_string(),
            directlake_model: "Product Sales DirectLake Model".to_string(),
            directlake_bim: "sales_model_DirectLake.bim".to_string(),
            report: "Product Sales Summary".to_string(),
            report_layout: "product_sales_summary.json".to_string(),
            pbix_file: "ProductSales.pbix".to_string(),
            pbix_name: "Product Sales".to_string(),
            hybrid_description: "Hybrid Fabric Workspace".to_string(),
            fabric_description: "Custom Notebook Solution".to_string(),
        }
    }
}

/// Values produced by stages and consumed by later ones.
#[derive(Debug, Default)]
pub struct DeploymentState {
    workspace: Option<Workspace>,
    workspace_created: bool,
    lakehouse: Option<Item>,
    onelake_path: Option<String>,
    sql_endpoint: Option<SqlEndpoint>,
    tables: Vec<String>,
    semantic_model: Option<ItemId>,
    report: Option<ItemId>,
    page: Option<PathBuf>,
    created: Vec<(ItemType, String)>,
    reused: Vec<(ItemType, String)>,
}

impl DeploymentState {
    /// Resolved workspace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPrerequisite`] before the workspace stage ran.
    pub fn workspace(&self, stage: Stage) -> Result<&Workspace> {
        self.workspace
            .as_ref()
            .ok_or_else(|| Error::missing(stage, "workspace"))
    }

    /// Resolved lakehouse.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPrerequisite`] before the lakehouse stage ran.
    pub fn lakehouse(&self, stage: Stage) -> Result<&Item> {
        self.lakehouse
            .as_ref()
            .ok_or_else(|| Error::missing(stage, "lakehouse"))
    }

    /// OneLake root of the lakehouse.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPrerequisite`] before the path stage ran.
    pub fn onelake_path(&self, stage: Stage) -> Result<&str> {
        self.onelake_path
            .as_deref()
            .ok_or_else(|| Error::missing(stage, "onelake path"))
    }

    /// Provisioned SQL endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPrerequisite`] before the endpoint stage ran.
    pub fn sql_endpoint(&self, stage: Stage) -> Result<&SqlEndpoint> {
        self.sql_endpoint
            .as_ref()
            .ok_or_else(|| Error::missing(stage, "sql endpoint"))
    }

    /// Semantic model (dataset) id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPrerequisite`] before a model was resolved.
    pub fn semantic_model(&self, stage: Stage) -> Result<ItemId> {
        self.semantic_model
            .ok_or_else(|| Error::missing(stage, "semantic model"))
    }

    /// Report id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPrerequisite`] before a report was resolved.
    pub fn report(&self, stage: Stage) -> Result<ItemId> {
        self.report.ok_or_else(|| Error::missing(stage, "report"))
    }

    fn record(&mut self, item: &Item, created: bool) {
        let entry = (item.item_type, item.display_name.clone());
        if created {
            self.created.push(entry);
        } else {
            self.reused.push(entry);
        }
    }

    fn into_outcome(self, flow: FlowKind) -> Result<DeploymentOutcome> {
        let workspace = self
            .workspace
            .ok_or_else(|| Error::missing("outcome", "workspace"))?;
        Ok(DeploymentOutcome {
            flow,
            workspace,
            workspace_created: self.workspace_created,
            report_id: self.report,
            created: self.created,
            reused: self.reused,
            page_path: self.page,
        })
    }
}

/// Result of a deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentOutcome {
    /// Flow that ran.
    pub flow: FlowKind,
    /// Target workspace.
    pub workspace: Workspace,
    /// True when this run created the workspace.
    pub workspace_created: bool,
    /// Final report.
    pub report_id: Option<ItemId>,
    /// Items this run created, as (type, name).
    pub created: Vec<(ItemType, String)>,
    /// Items this run found and reused, as (type, name).
    pub reused: Vec<(ItemType, String)>,
    /// Generated embedding page.
    pub page_path: Option<PathBuf>,
}

struct Run<'a> {
    kind: FlowKind,
    workspace_name: &'a str,
    report_name: &'a str,
    client: ResourceClient,
    state: DeploymentState,
}

/// Runs deployment flows against a [`ResourceClient`].
pub struct Orchestrator {
    client: ResourceClient,
    templates: TemplateLibrary,
    pages: EmbeddingPageGenerator,
    viewer: Arc<dyn Viewer>,
    blueprint: Blueprint,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("client", &self.client)
            .field("templates", &self.templates)
            .field("pages", &self.pages)
            .field("blueprint", &self.blueprint)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator reading templates from the client's
    /// configured paths. Viewing is off until [`Orchestrator::with_viewer`].
    #[must_use]
    pub fn new(client: ResourceClient) -> Self {
        let paths = &client.settings().paths;
        let templates = TemplateLibrary::from_paths(paths);
        let pages = EmbeddingPageGenerator::from_paths(paths);
        Self {
            client,
            templates,
            pages,
            viewer: Arc::new(NoViewer),
            blueprint: Blueprint::default(),
        }
    }

    /// Replaces the viewer used for workspace links and generated pages.
    #[must_use]
    pub fn with_viewer(mut self, viewer: Arc<dyn Viewer>) -> Self {
        self.viewer = viewer;
        self
    }

    /// Replaces resource names and template file names.
    #[must_use]
    pub fn with_blueprint(mut self, blueprint: Blueprint) -> Self {
        self.blueprint = blueprint;
        self
    }

    /// Replaces the template library.
    #[must_use]
    pub fn with_templates(mut self, templates: TemplateLibrary) -> Self {
        self.templates = templates;
        self
    }

    /// Replaces the page generator.
    #[must_use]
    pub fn with_pages(mut self, pages: EmbeddingPageGenerator) -> Self {
        self.pages = pages;
        self
    }

    /// Names used by the flows.
    #[must_use]
    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    /// Runs a flow against the named workspace.
    ///
    /// # Errors
    ///
    /// Returns the first error any stage raises.
    pub async fn deploy(&self, kind: FlowKind, workspace_name: &str) -> Result<DeploymentOutcome> {
        let report_name = self.blueprint.report.clone();
        self.run(kind, workspace_name, &report_name)
            .instrument(deployment_span(&kind.to_string(), workspace_name))
            .await
    }

    /// Generates the embedding page for an existing report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceNotFound`] if the workspace or report does
    /// not exist, or any error of the embedding stage.
    pub async fn embed(&self, workspace_name: &str, report_name: &str) -> Result<DeploymentOutcome> {
        let kind = FlowKind::EmbedOnly;
        self.run(kind, workspace_name, report_name)
            .instrument(deployment_span(&kind.to_string(), workspace_name))
            .await
    }

    async fn run(
        &self,
        kind: FlowKind,
        workspace_name: &str,
        report_name: &str,
    ) -> Result<DeploymentOutcome> {
        let client = if kind.runs_as_embedding_identity() {
            self.client.acting_as(self.client.embedding_identity())
        } else {
            self.client.clone()
        };
        let order = StageGraph::for_flow(kind)?.order()?;
        tracing::info!(flow = %kind, identity = %client.identity(), stages = order.len(), "deployment started");

        let mut run = Run {
            kind,
            workspace_name,
            report_name,
            client,
            state: DeploymentState::default(),
        };
        for stage in order {
            self.run_stage(&mut run, stage)
                .instrument(stage_span(stage.as_str()))
                .await?;
        }

        let outcome = run.state.into_outcome(kind)?;
        tracing::info!(
            workspace_id = %outcome.workspace.id,
            created = outcome.created.len(),
            reused = outcome.reused.len(),
            "deployment finished"
        );
        Ok(outcome)
    }

    async fn run_stage(&self, run: &mut Run<'_>, stage: Stage) -> Result<()> {
        tracing::debug!("stage started");
        match stage {
            Stage::ResolveWorkspace => self.resolve_workspace(run).await,
            Stage::DescribeWorkspace => {
                let workspace = run.state.workspace(stage)?.id;
                let updated = run
                    .client
                    .update_workspace_description(workspace, &self.blueprint.fabric_description)
                    .await?;
                run.state.workspace = Some(updated);
                Ok(())
            }
            Stage::ResolveLakehouse => self.resolve_lakehouse(run, stage).await,
            Stage::BuildBronzeLayer => self.build_bronze_layer(run, stage).await,
            Stage::ResolveStoragePath => {
                let workspace = run.state.workspace(stage)?.id;
                let lakehouse = run.state.lakehouse(stage)?.id;
                let path = run.client.get_onelake_path(workspace, lakehouse).await?;
                tracing::info!(onelake_path = %path, "storage path resolved");
                run.state.onelake_path = Some(path);
                Ok(())
            }
            Stage::ResolveSqlEndpoint => {
                let workspace = run.state.workspace(stage)?.id;
                let lakehouse = run.state.lakehouse(stage)?.id;
                let endpoint = run.client.get_sql_endpoint(workspace, lakehouse).await?;
                tracing::info!(sql_endpoint_id = %endpoint.id, "sql endpoint ready");
                run.state.sql_endpoint = Some(endpoint);
                Ok(())
            }
            Stage::RefreshSqlMetadata => {
                let endpoint = run.state.sql_endpoint(stage)?.id.clone();
                run.client.refresh_sql_endpoint_metadata(&endpoint).await?;
                Ok(())
            }
            Stage::ListTables => {
                let workspace = run.state.workspace(stage)?.id;
                let lakehouse = run.state.lakehouse(stage)?.id;
                run.state.tables = match run.client.list_lakehouse_tables(workspace, lakehouse).await {
                    Ok(tables) => tables,
                    Err(fabdeploy_client::Error::NotSupported { capability }) => {
                        tracing::warn!(%capability, "not available, continuing with no tables");
                        Vec::new()
                    }
                    Err(e) => return Err(e.into()),
                };
                tracing::info!(tables = run.state.tables.len(), "lakehouse tables listed");
                Ok(())
            }
            Stage::CreateSemanticModel => self.create_semantic_model(run, stage).await,
            Stage::BindConnections => self.bind_connections(run, stage).await,
            Stage::CreateReport => {
                let workspace = run.state.workspace(stage)?.id;
                let model = run.state.semantic_model(stage)?;
                let report = self
                    .find_or_create(run, workspace, &self.blueprint.report, ItemType::Report, || {
                        self.templates
                            .report(&self.blueprint.report, &self.blueprint.report_layout, model)
                    })
                    .await?;
                run.state.report = Some(report.id);
                Ok(())
            }
            Stage::ImportPbix => self.import_pbix(run, stage).await,
            Stage::PatchCredentials => {
                let workspace = run.state.workspace(stage)?.id;
                let dataset = run.state.semantic_model(stage)?;
                run.client
                    .patch_anonymous_web_credentials(workspace, dataset)
                    .await?;
                Ok(())
            }
            Stage::ScheduleRefresh => {
                let workspace = run.state.workspace(stage)?.id;
                let dataset = run.state.semantic_model(stage)?;
                run.client.set_refresh_schedule(workspace, dataset).await?;
                Ok(())
            }
            Stage::RefreshDataset => {
                let workspace = run.state.workspace(stage)?.id;
                let dataset = run.state.semantic_model(stage)?;
                run.client.refresh_dataset(workspace, dataset).await?;
                Ok(())
            }
            Stage::ResolveReport => {
                let workspace = run.state.workspace(stage)?.id;
                let report = run
                    .client
                    .find_report_by_name(workspace, run.report_name)
                    .await?
                    .ok_or_else(|| Error::ResourceNotFound {
                        kind: "report".to_string(),
                        name: run.report_name.to_string(),
                    })?;
                run.state.record(&report, false);
                run.state.report = Some(report.id);
                Ok(())
            }
            Stage::OpenWorkspace => {
                let workspace = run.state.workspace(stage)?.id;
                let url = run.client.settings().endpoints.workspace_url(workspace);
                tracing::info!(%url, "workspace ready");
                self.view(&url).await;
                Ok(())
            }
            Stage::GenerateEmbedPage => self.generate_embed_page(run, stage).await,
        }
    }

    async fn resolve_workspace(&self, run: &mut Run<'_>) -> Result<()> {
        let name = run.workspace_name;
        let policy = run.kind.workspace_policy();
        let settings = run.client.settings();

        let (workspace, created) = match policy {
            WorkspacePolicy::RenameWithSuffix => {
                let capacity = settings.require_capacity()?;
                let workspace = run.client.create_workspace(name, Some(capacity), None).await?;
                (workspace, true)
            }
            WorkspacePolicy::Reuse | WorkspacePolicy::RequireExisting => {
                match run.client.find_workspace_by_name(name).await? {
                    Some(existing) => {
                        tracing::info!(workspace_id = %existing.id, "reusing workspace");
                        (existing, false)
                    }
                    None if policy == WorkspacePolicy::RequireExisting => {
                        return Err(Error::ResourceNotFound {
                            kind: "workspace".to_string(),
                            name: name.to_string(),
                        });
                    }
                    None if run.kind == FlowKind::Hybrid => {
                        let workspace = run
                            .client
                            .create_workspace(name, None, Some(&self.blueprint.hybrid_description))
                            .await?;
                        (workspace, true)
                    }
                    None => {
                        let capacity = settings.require_capacity()?;
                        let workspace = run.client.create_workspace(name, Some(capacity), None).await?;
                        (workspace, true)
                    }
                }
            }
        };

        // The hybrid flow assigns on every run so a reused workspace is
        // moved onto the configured capacity too.
        if run.kind == FlowKind::Hybrid {
            let capacity = settings.require_capacity()?;
            run.client
                .assign_workspace_to_capacity(workspace.id, capacity)
                .await?;
        }

        run.state.workspace_created = created;
        run.state.workspace = Some(workspace);
        Ok(())
    }

    async fn resolve_lakehouse(&self, run: &mut Run<'_>, stage: Stage) -> Result<()> {
        let workspace = run.state.workspace(stage)?.id;
        let name = self.blueprint.lakehouse.as_str();
        let (lakehouse, created) = match run
            .client
            .find_item(workspace, name, ItemType::Lakehouse)
            .await?
        {
            Some(existing) => (existing, false),
            None => (run.client.create_lakehouse(workspace, name, false).await?, true),
        };
        tracing::info!(lakehouse_id = %lakehouse.id, created, "lakehouse resolved");
        run.state.record(&lakehouse, created);
        run.state.lakehouse = Some(lakehouse);
        Ok(())
    }

    async fn build_bronze_layer(&self, run: &mut Run<'_>, stage: Stage) -> Result<()> {
        let workspace = run.state.workspace(stage)?.id;
        let lakehouse = run.state.lakehouse(stage)?.clone();
        let notebook = self
            .find_or_create(run, workspace, &self.blueprint.notebook, ItemType::Notebook, || {
                self.templates.notebook(
                    &self.blueprint.notebook,
                    &self.blueprint.notebook_source,
                    workspace,
                    lakehouse.id,
                    &lakehouse.display_name,
                )
            })
            .await?;

        let job = run.client.run_notebook(workspace, notebook.id).await?;
        tracing::info!(notebook_id = %notebook.id, job_id = %job.id, "bronze layer built");
        Ok(())
    }

    async fn create_semantic_model(&self, run: &mut Run<'_>, stage: Stage) -> Result<()> {
        let workspace = run.state.workspace(stage)?.id;
        let request = match run.kind {
            FlowKind::Fabric => {
                let endpoint = run.state.sql_endpoint(stage)?;
                let substitutions = Substitutions::new()
                    .with(SQL_ENDPOINT_SERVER_TOKEN, endpoint.connection_string.as_str())
                    .with(SQL_ENDPOINT_DATABASE_TOKEN, endpoint.id.as_str());
                substitutions.assert_disjoint()?;
                self.templates.semantic_model_from_bim(
                    &self.blueprint.directlake_model,
                    &self.blueprint.directlake_bim,
                    &substitutions,
                )?
            }
            _ => {
                let substitutions =
                    Substitutions::new().with(ONELAKE_PATH_TOKEN, run.state.onelake_path(stage)?);
                substitutions.assert_disjoint()?;
                let mut request = self
                    .templates
                    .item_from_folder(&self.blueprint.onelake_model_folder)?;
                if let Some(definition) = request.definition.take() {
                    request.definition =
                        Some(substitute_part(&definition, EXPRESSIONS_PART, &substitutions)?);
                }
                request
            }
        };

        let name = request.display_name.clone();
        let model = self
            .find_or_create(run, workspace, &name, ItemType::SemanticModel, || Ok(request))
            .await?;
        run.state.semantic_model = Some(model.id);
        Ok(())
    }

    async fn bind_connections(&self, run: &mut Run<'_>, stage: Stage) -> Result<()> {
        let workspace = run.state.workspace(stage)?.id;
        let model = run.state.semantic_model(stage)?;
        let sources = run.client.list_datasources(workspace, model).await?;
        tracing::info!(sources = sources.len(), "binding data sources");

        for source in sources {
            let details = &source.connection_details;
            let connection = if source.is_web() {
                let Some(url) = details.url.as_deref() else {
                    tracing::warn!(source_type = %source.datasource_type, "web source without url, skipping");
                    continue;
                };
                run.client
                    .create_anonymous_web_connection(url, workspace)
                    .await?
            } else if source.is_storage() {
                let (Some(server), Some(path)) = (details.server.as_deref(), details.path.as_deref())
                else {
                    tracing::warn!(source_type = %source.datasource_type, "storage source without server or path, skipping");
                    continue;
                };
                let lakehouse = run.state.lakehouse(stage)?.display_name.clone();
                run.client
                    .create_storage_connection_with_service_principal(server, path, workspace, &lakehouse)
                    .await?
            } else {
                tracing::info!(source_type = %source.datasource_type, "no connection needed");
                continue;
            };

            run.client
                .bind_to_connection(workspace, model, &connection)
                .await?;
            run.client.refresh_dataset(workspace, model).await?;
        }
        Ok(())
    }

    async fn import_pbix(&self, run: &mut Run<'_>, stage: Stage) -> Result<()> {
        let workspace = run.state.workspace(stage)?.id;
        let content = self.templates.read_pbix(&self.blueprint.pbix_file)?;
        let import = run
            .client
            .import_pbix(workspace, &self.blueprint.pbix_name, content)
            .await?;

        let operation = "import pbix";
        let report = import.reports.first().ok_or_else(|| {
            fabdeploy_client::Error::malformed(operation, "import published no report")
        })?;
        let dataset = import.datasets.first().ok_or_else(|| {
            fabdeploy_client::Error::malformed(operation, "import published no dataset")
        })?;
        tracing::info!(report_id = %report.id, dataset_id = %dataset.id, "pbix imported");

        run.state.created.push((ItemType::Report, report.name.clone()));
        run.state
            .created
            .push((ItemType::SemanticModel, dataset.name.clone()));
        run.state.report = Some(report.id);
        run.state.semantic_model = Some(dataset.id);
        Ok(())
    }

    async fn generate_embed_page(&self, run: &mut Run<'_>, stage: Stage) -> Result<()> {
        let workspace = run.state.workspace(stage)?.id;
        let report = run.state.report(stage)?;
        let embedder = run.client.acting_as(run.client.embedding_identity());
        tracing::info!(identity = %embedder.identity(), %report, "generating embedding page");

        let credential = embedder.get_report_embedding(workspace, report).await?;
        let page = self.pages.render(&credential)?;
        self.view(&page.display().to_string()).await;
        run.state.page = Some(page);
        Ok(())
    }

    async fn find_or_create<F>(
        &self,
        run: &mut Run<'_>,
        workspace: WorkspaceId,
        name: &str,
        item_type: ItemType,
        request: F,
    ) -> Result<Item>
    where
        F: FnOnce() -> Result<CreateItemRequest>,
    {
        if let Some(existing) = run.client.find_item(workspace, name, item_type).await? {
            tracing::info!(item_id = %existing.id, %item_type, name, "reusing item");
            run.state.record(&existing, false);
            return Ok(existing);
        }
        let item = run.client.create_item(workspace, &request()?).await?;
        run.state.record(&item, true);
        Ok(item)
    }

    async fn view(&self, target: &str) {
        if let Err(error) = self.viewer.open(target).await {
            tracing::warn!(location = target, %error, "could not open viewer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_flow_picks_its_collision_policy() {
        assert_eq!(FlowKind::Hybrid.workspace_policy(), WorkspacePolicy::Reuse);
        assert_eq!(FlowKind::PowerBi.workspace_policy(), WorkspacePolicy::Reuse);
        assert_eq!(
            FlowKind::Fabric.workspace_policy(),
            WorkspacePolicy::RenameWithSuffix
        );
        assert_eq!(
            FlowKind::EmbedOnly.workspace_policy(),
            WorkspacePolicy::RequireExisting
        );
    }

    #[test]
    fn prerequisites_fail_before_their_stage_ran() {
        let state = DeploymentState::default();
        let err = state.onelake_path(Stage::CreateSemanticModel).unwrap_err();
        match err {
            Error::MissingPrerequisite { stage, needs } => {
                assert_eq!(stage, "create-semantic-model");
                assert_eq!(needs, "onelake path");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(state.workspace(Stage::ResolveLakehouse).is_err());
        assert!(state.report(Stage::GenerateEmbedPage).is_err());
    }

    #[test]
    fn outcome_needs_a_workspace() {
        assert!(matches!(
            DeploymentState::default().into_outcome(FlowKind::Hybrid),
            Err(Error::MissingPrerequisite { .. })
        ));
    }

    #[test]
    fn default_blueprint_names() {
        let blueprint = Blueprint::default();
        assert_eq!(blueprint.lakehouse, "sales");
        assert_eq!(blueprint.report, "Product Sales Summary");
        assert!(blueprint.onelake_model_folder.ends_with(".SemanticModel"));
    }
}
