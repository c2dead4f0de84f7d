//! Pre-built test fixtures for common test scenarios.
//!
//! [`TemplateFixture`] lays out a temporary template tree with every file the
//! flows read, and [`TestContext`] wires a [`MemoryControlPlane`] and that
//! tree into a resource client.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use fabdeploy_client::ResourceClient;
use fabdeploy_client::model::Capacity;
use fabdeploy_core::config::{Credentials, Interaction, Paths, Principals, Settings};
use fabdeploy_core::{AuthenticationMode, PrincipalId, ProfileId, Redacted};
use fabdeploy_flow::Orchestrator;
use fabdeploy_flow::definitions::BASE_THEME_PART;

use crate::memory::MemoryControlPlane;

/// Item folder of the OneLake-backed model.
pub const ONELAKE_MODEL_FOLDER: &str = "Product Sales DirectLake Model on Onelake.SemanticModel";

const PLATFORM: &str = r#"{
  "$schema": "https://developer.microsoft.com/json-schemas/fabric/gitIntegration/platformProperties/2.0.0/schema.json",
  "metadata": {
    "type": "SemanticModel",
    "displayName": "Product Sales DirectLake Model on Onelake"
  },
  "config": {
    "version": "2.0",
    "logicalId": "00000000-0000-0000-0000-000000000000"
  }
}"#;

const EXPRESSIONS: &str = "expression DatabaseQuery =\n\t\tlet\n\t\t\tdatabase = AzureStorage.DataLake(\"{ONELAKE_PATH}\")\n\t\tin\n\t\t\tdatabase\n";

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>@AppName</title><link rel="stylesheet" href="css/embed.css"></head>
<body>
<div id="embedContainer"></div>
<script>
  const config = {
    type: "report",
    id: "@EmbedReportId",
    embedUrl: "@EmbedUrl",
    accessToken: "@EmbedToken",
    tokenType: EmbedTokenType
  };
</script>
</body>
</html>
"#;

/// A temporary template tree.
pub struct TemplateFixture {
    dir: TempDir,
    paths: Paths,
}

impl TemplateFixture {
    /// Writes the full template tree.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        let paths = Paths {
            item_templates: root.join("items"),
            template_files: root.join("files"),
            web_templates: root.join("web"),
            web_pages: root.join("web-pages"),
            pbix: root.join("pbix"),
        };

        let model = paths.item_templates.join(ONELAKE_MODEL_FOLDER);
        write(&model.join(".platform"), PLATFORM);
        write(&model.join("definition.pbism"), r#"{"version":"4.0","settings":{}}"#);
        write(&model.join("definition/expressions.tmdl"), EXPRESSIONS);

        let files = &paths.template_files;
        write(
            &files.join("Notebooks/CreateLakehouseTables.py"),
            "# Lakehouse {LAKEHOUSE_NAME} ({LAKEHOUSE_ID}) in workspace {WORKSPACE_ID}\n\
             spark.read.csv(\"Files/products.csv\").write.saveAsTable(\"products\")\n",
        );
        write(
            &files.join("SemanticModels/definition.pbism"),
            r#"{"version":"1.0"}"#,
        );
        write(
            &files.join("SemanticModels/sales_model_DirectLake.bim"),
            r#"{"model":{"expressions":[{"name":"DatabaseQuery","expression":"Sql.Database(\"{SQL_ENDPOINT_SERVER}\", \"{SQL_ENDPOINT_DATABASE}\")"}]}}"#,
        );
        write(
            &files.join("Reports/definition.pbir"),
            r#"{"version":"1.0","datasetReference":{"byConnection":{"pbiModelDatabaseName":"{SEMANTIC_MODEL_ID}"}}}"#,
        );
        write(
            &files.join("Reports/product_sales_summary.json"),
            r#"{"sections":[{"displayName":"Summary"}]}"#,
        );
        write(
            &files.join(format!("Reports/{BASE_THEME_PART}")),
            r#"{"name":"CY24SU02"}"#,
        );

        write(&paths.web_templates.join("EmbedReport.html"), PAGE);
        write(
            &paths.web_templates.join("css/embed.css"),
            "#embedContainer { height: 100vh; }\n",
        );

        fs::create_dir_all(&paths.pbix).expect("create pbix dir");
        fs::write(paths.pbix.join("ProductSales.pbix"), b"PK\x03\x04pbix").expect("write pbix");

        Self { dir, paths }
    }

    /// Root of the tree.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Paths to put in [`Settings::paths`].
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Path of the generated embedding page.
    pub fn page_path(&self) -> PathBuf {
        self.paths
            .web_pages
            .join(fabdeploy_flow::embed::PAGE_OUTPUT)
    }

    /// Deletes a file or folder of the tree.
    pub fn remove(&self, relative: &str) {
        let path = self.dir.path().join(relative);
        if path.is_dir() {
            fs::remove_dir_all(path).expect("remove dir");
        } else {
            fs::remove_file(path).expect("remove file");
        }
    }
}

impl Default for TemplateFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create template dir");
    }
    fs::write(path, contents).expect("write template");
}

/// Settings for tests: service principal auth with every credential present,
/// templates from `paths`, viewer disabled.
#[must_use]
pub fn test_settings(paths: &Paths) -> Settings {
    Settings {
        auth_mode: AuthenticationMode::ServicePrincipal,
        credentials: Credentials {
            tenant_id: Some("contoso.onmicrosoft.com".to_string()),
            client_id: Some("11111111-1111-1111-1111-111111111111".to_string()),
            client_secret: Some(Redacted::new("client-secret".to_string())),
            service_principal_token: Some(Redacted::new("sp-token".to_string())),
            user_token: Some(Redacted::new("user-token".to_string())),
            ..Credentials::default()
        },
        principals: Principals {
            admin_user_id: Some(PrincipalId::generate()),
            service_principal_object_id: Some(PrincipalId::generate()),
            profile_id: None,
        },
        paths: paths.clone(),
        interaction: Interaction {
            non_interactive: true,
            ..Interaction::default()
        },
        ..Settings::default()
    }
}

/// Test context with an in-memory control plane and a template tree.
pub struct TestContext {
    /// Shared control plane.
    pub plane: MemoryControlPlane,
    /// Template tree.
    pub templates: TemplateFixture,
    /// Settings the client uses.
    pub settings: Arc<Settings>,
    /// Capacity configured for new workspaces.
    pub capacity: Capacity,
    /// Cancellation token of the client.
    pub cancel: CancellationToken,
}

impl TestContext {
    /// Creates a context with a paid capacity configured.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity_sku("F64", |_| {})
    }

    /// Creates a context whose configured capacity has `sku`, with `tweak`
    /// applied to the settings.
    #[must_use]
    pub fn with_capacity_sku(sku: &str, tweak: impl FnOnce(&mut Settings)) -> Self {
        let plane = MemoryControlPlane::new();
        let templates = TemplateFixture::new();
        let capacity = plane.add_capacity("Contoso Capacity", sku);
        let mut settings = test_settings(templates.paths());
        settings.capacity_id = Some(capacity.id);
        tweak(&mut settings);
        Self {
            plane,
            templates,
            settings: Arc::new(settings),
            capacity,
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a context embedding through a service principal profile.
    #[must_use]
    pub fn with_profile() -> Self {
        Self::with_capacity_sku("F64", |settings| {
            settings.principals.profile_id = Some(ProfileId::generate());
        })
    }

    /// Resource client over the in-memory plane, acting as the provisioning
    /// identity.
    pub fn client(&self) -> ResourceClient {
        ResourceClient::new(
            Arc::new(self.plane.clone()),
            Arc::clone(&self.settings),
            self.cancel.clone(),
        )
    }

    /// Orchestrator over [`TestContext::client`].
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.client())
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
