//! Deployment stages and the graph that orders them.

use std::fmt;

use serde::Serialize;

use fabdeploy_core::DeploymentFlow;

use crate::dag::Dag;
use crate::error::Result;

/// One step of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Find or create the target workspace and assign it to capacity.
    ResolveWorkspace,
    /// Set the workspace description.
    DescribeWorkspace,
    /// Find or create the lakehouse.
    ResolveLakehouse,
    /// Find or create the bronze-layer notebook and run it.
    BuildBronzeLayer,
    /// Read the lakehouse OneLake path.
    ResolveStoragePath,
    /// Wait for the lakehouse SQL endpoint.
    ResolveSqlEndpoint,
    /// Resync SQL endpoint table metadata.
    RefreshSqlMetadata,
    /// List lakehouse tables.
    ListTables,
    /// Find or create the semantic model.
    CreateSemanticModel,
    /// Create, bind and refresh data source connections.
    BindConnections,
    /// Find or create the report.
    CreateReport,
    /// Upload the PBIX file.
    ImportPbix,
    /// Set anonymous credentials on Web sources.
    PatchCredentials,
    /// Set the refresh schedule.
    ScheduleRefresh,
    /// Refresh the imported dataset.
    RefreshDataset,
    /// Find an existing report by name.
    ResolveReport,
    /// Open the workspace in the viewer.
    OpenWorkspace,
    /// Generate the embedding page as the embedding identity.
    GenerateEmbedPage,
}

impl Stage {
    /// Stable stage name used in logs and spans.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResolveWorkspace => "resolve-workspace",
            Self::DescribeWorkspace => "describe-workspace",
            Self::ResolveLakehouse => "resolve-lakehouse",
            Self::BuildBronzeLayer => "build-bronze-layer",
            Self::ResolveStoragePath => "resolve-storage-path",
            Self::ResolveSqlEndpoint => "resolve-sql-endpoint",
            Self::RefreshSqlMetadata => "refresh-sql-metadata",
            Self::ListTables => "list-tables",
            Self::CreateSemanticModel => "create-semantic-model",
            Self::BindConnections => "bind-connections",
            Self::CreateReport => "create-report",
            Self::ImportPbix => "import-pbix",
            Self::PatchCredentials => "patch-credentials",
            Self::ScheduleRefresh => "schedule-refresh",
            Self::RefreshDataset => "refresh-dataset",
            Self::ResolveReport => "resolve-report",
            Self::OpenWorkspace => "open-workspace",
            Self::GenerateEmbedPage => "generate-embed-page",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowKind {
    /// Reuse-or-create lakehouse, model and report.
    Hybrid,
    /// Fresh workspace with a DirectLake model over the SQL endpoint.
    Fabric,
    /// PBIX import.
    PowerBi,
    /// Page generation for an existing report.
    EmbedOnly,
}

impl From<DeploymentFlow> for FlowKind {
    fn from(flow: DeploymentFlow) -> Self {
        match flow {
            DeploymentFlow::Hybrid => Self::Hybrid,
            DeploymentFlow::Fabric => Self::Fabric,
            DeploymentFlow::PowerBi => Self::PowerBi,
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hybrid => "hybrid",
            Self::Fabric => "fabric",
            Self::PowerBi => "power-bi",
            Self::EmbedOnly => "embed-only",
        })
    }
}

/// Stages with explicit predecessors.
#[derive(Debug, Clone, Default)]
pub struct StageGraph {
    dag: Dag<Stage>,
}

impl StageGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `stage` to run after every stage in `after`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying graph rejects an edge.
    pub fn add(&mut self, stage: Stage, after: &[Stage]) -> Result<&mut Self> {
        let preds: Vec<_> = after.iter().map(|p| self.dag.add_node(*p)).collect();
        let node = self.dag.add_node(stage);
        for pred in preds {
            self.dag.add_edge(pred, node)?;
        }
        Ok(self)
    }

    /// Stages in execution order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CycleDetected`] if the graph has a cycle.
    pub fn order(&self) -> Result<Vec<Stage>> {
        self.dag.toposort()
    }

    /// Direct predecessors of a stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is not in the graph.
    pub fn predecessors(&self, stage: Stage) -> Result<Vec<Stage>> {
        self.dag.upstream(&stage)
    }

    /// Returns true if the stage is in the graph.
    #[must_use]
    pub fn contains(&self, stage: Stage) -> bool {
        self.dag.contains(&stage)
    }

    /// The stage graph of a flow.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in flows; the signature follows
    /// [`StageGraph::add`].
    pub fn for_flow(kind: FlowKind) -> Result<Self> {
        use Stage::{
            BindConnections, BuildBronzeLayer, CreateReport, CreateSemanticModel,
            DescribeWorkspace, GenerateEmbedPage, ImportPbix, ListTables, OpenWorkspace,
            PatchCredentials, RefreshDataset, RefreshSqlMetadata, ResolveLakehouse, ResolveReport,
            ResolveSqlEndpoint, ResolveStoragePath, ResolveWorkspace, ScheduleRefresh,
        };

        let mut graph = Self::new();
        match kind {
            FlowKind::Hybrid => {
                graph
                    .add(ResolveWorkspace, &[])?
                    .add(ResolveLakehouse, &[ResolveWorkspace])?
                    .add(BuildBronzeLayer, &[ResolveLakehouse])?
                    .add(ResolveStoragePath, &[ResolveLakehouse])?
                    .add(CreateSemanticModel, &[ResolveStoragePath, BuildBronzeLayer])?
                    .add(BindConnections, &[CreateSemanticModel])?
                    .add(CreateReport, &[CreateSemanticModel, BindConnections])?
                    .add(OpenWorkspace, &[CreateReport])?
                    .add(GenerateEmbedPage, &[CreateReport, OpenWorkspace])?;
            }
            FlowKind::Fabric => {
                graph
                    .add(ResolveWorkspace, &[])?
                    .add(DescribeWorkspace, &[ResolveWorkspace])?
                    .add(ResolveLakehouse, &[ResolveWorkspace])?
                    .add(BuildBronzeLayer, &[ResolveLakehouse])?
                    .add(ResolveSqlEndpoint, &[BuildBronzeLayer])?
                    .add(RefreshSqlMetadata, &[ResolveSqlEndpoint])?
                    .add(ListTables, &[RefreshSqlMetadata])?
                    .add(CreateSemanticModel, &[ResolveSqlEndpoint, ListTables])?
                    .add(BindConnections, &[CreateSemanticModel])?
                    .add(CreateReport, &[CreateSemanticModel, BindConnections])?
                    .add(OpenWorkspace, &[CreateReport])?;
            }
            FlowKind::PowerBi => {
                graph
                    .add(ResolveWorkspace, &[])?
                    .add(ImportPbix, &[ResolveWorkspace])?
                    .add(PatchCredentials, &[ImportPbix])?
                    .add(ScheduleRefresh, &[ImportPbix, PatchCredentials])?
                    .add(RefreshDataset, &[PatchCredentials, ScheduleRefresh])?
                    .add(OpenWorkspace, &[RefreshDataset])?
                    .add(GenerateEmbedPage, &[RefreshDataset, OpenWorkspace])?;
            }
            FlowKind::EmbedOnly => {
                graph
                    .add(ResolveWorkspace, &[])?
                    .add(ResolveReport, &[ResolveWorkspace])?
                    .add(GenerateEmbedPage, &[ResolveReport])?;
            }
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn hybrid_runs_the_eight_steps_in_order() {
        let order = StageGraph::for_flow(FlowKind::Hybrid).unwrap().order().unwrap();
        assert_eq!(
            order,
            vec![
                Stage::ResolveWorkspace,
                Stage::ResolveLakehouse,
                Stage::BuildBronzeLayer,
                Stage::ResolveStoragePath,
                Stage::CreateSemanticModel,
                Stage::BindConnections,
                Stage::CreateReport,
                Stage::OpenWorkspace,
                Stage::GenerateEmbedPage,
            ]
        );
    }

    #[test]
    fn storage_path_only_needs_the_lakehouse() {
        let graph = StageGraph::for_flow(FlowKind::Hybrid).unwrap();
        assert_eq!(
            graph.predecessors(Stage::ResolveStoragePath).unwrap(),
            vec![Stage::ResolveLakehouse]
        );
    }

    #[test]
    fn every_flow_starts_with_the_workspace() {
        for kind in [FlowKind::Hybrid, FlowKind::Fabric, FlowKind::PowerBi, FlowKind::EmbedOnly] {
            let order = StageGraph::for_flow(kind).unwrap().order().unwrap();
            assert_eq!(order.first(), Some(&Stage::ResolveWorkspace), "{kind}");
        }
    }

    #[test]
    fn fabric_flow_has_no_embedding() {
        let graph = StageGraph::for_flow(FlowKind::Fabric).unwrap();
        assert!(!graph.contains(Stage::GenerateEmbedPage));
        assert!(graph.contains(Stage::ListTables));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut graph = StageGraph::new();
        graph
            .add(Stage::CreateReport, &[Stage::CreateSemanticModel])
            .unwrap()
            .add(Stage::CreateSemanticModel, &[Stage::CreateReport])
            .unwrap();
        assert!(matches!(graph.order(), Err(Error::CycleDetected { .. })));
    }
}
