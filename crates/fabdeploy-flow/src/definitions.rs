//! Item definitions built from local template files.
//!
//! Templates live under the folders configured in
//! [`fabdeploy_core::config::Paths`]:
//!
//! - `template_files`: loose files (notebook sources, model `.bim` files,
//!   report JSON) assembled into definitions part by part
//! - `item_templates`: whole item folders (`Name.Type/`) with a `.platform`
//!   metadata file; every file in the folder becomes one part
//! - `pbix`: PBIX files uploaded as-is
//!
//! A missing template is [`Error::TemplateMissing`], a configuration error.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use fabdeploy_client::model::{CreateItemRequest, ItemDefinition, ItemDefinitionPart, ItemType};
use fabdeploy_core::config::Paths;
use fabdeploy_core::{ItemId, WorkspaceId};

use crate::error::{Error, Result};
use crate::template::{Substitutions, substitute_text};

/// Metadata file of an item template folder.
pub const PLATFORM_FILE: &str = ".platform";

/// Part path of a notebook's source.
pub const NOTEBOOK_PART: &str = "notebook-content.py";
/// Part path of a semantic model's dataset descriptor.
pub const PBISM_PART: &str = "definition.pbism";
/// Part path of a semantic model's schema.
pub const MODEL_BIM_PART: &str = "model.bim";
/// Part path of a report's model binding.
pub const PBIR_PART: &str = "definition.pbir";
/// Part path of a report's layout.
pub const REPORT_JSON_PART: &str = "report.json";
/// Part path of a report's base theme.
pub const BASE_THEME_PART: &str = "StaticResources/SharedResources/BaseThemes/CY24SU02.json";

/// Token for the workspace id in notebook sources.
pub const WORKSPACE_ID_TOKEN: &str = "{WORKSPACE_ID}";
/// Token for the lakehouse id in notebook sources.
pub const LAKEHOUSE_ID_TOKEN: &str = "{LAKEHOUSE_ID}";
/// Token for the lakehouse name in notebook sources.
pub const LAKEHOUSE_NAME_TOKEN: &str = "{LAKEHOUSE_NAME}";
/// Token for the semantic model id in report bindings.
pub const SEMANTIC_MODEL_ID_TOKEN: &str = "{SEMANTIC_MODEL_ID}";

#[derive(Debug, Deserialize)]
struct PlatformFile {
    metadata: PlatformMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlatformMetadata {
    #[serde(rename = "type")]
    item_type: String,
    display_name: String,
}

/// Reads templates from the configured folders.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    item_templates: PathBuf,
    template_files: PathBuf,
    pbix: PathBuf,
}

impl TemplateLibrary {
    /// Creates a library over explicit folders.
    #[must_use]
    pub fn new(
        item_templates: impl Into<PathBuf>,
        template_files: impl Into<PathBuf>,
        pbix: impl Into<PathBuf>,
    ) -> Self {
        Self {
            item_templates: item_templates.into(),
            template_files: template_files.into(),
            pbix: pbix.into(),
        }
    }

    /// Creates a library over the configured folders.
    #[must_use]
    pub fn from_paths(paths: &Paths) -> Self {
        Self::new(&paths.item_templates, &paths.template_files, &paths.pbix)
    }

    /// Reads a loose template file as text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateMissing`] if the file does not exist.
    pub fn read_text(&self, relative: &str) -> Result<String> {
        let path = self.template_files.join(relative);
        std::fs::read_to_string(&path).map_err(|e| Error::template_read(path, e))
    }

    /// Reads a PBIX file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateMissing`] if the file does not exist.
    pub fn read_pbix(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = self.pbix.join(file_name);
        std::fs::read(&path).map_err(|e| Error::template_read(path, e))
    }

    /// Builds a creation request from an item template folder.
    ///
    /// Name and type come from the folder's `.platform` file. Every file in
    /// the folder, `.platform` included, becomes a part whose path is
    /// relative to the folder with `/` separators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateMissing`] if the folder or its `.platform`
    /// file is absent, and [`Error::InvalidTemplate`] if the metadata cannot
    /// be parsed.
    pub fn item_from_folder(&self, folder: &str) -> Result<CreateItemRequest> {
        let root = self.item_templates.join(folder);
        if !root.is_dir() {
            return Err(Error::TemplateMissing { path: root });
        }

        let platform_path = root.join(PLATFORM_FILE);
        let platform = std::fs::read_to_string(&platform_path)
            .map_err(|e| Error::template_read(platform_path.clone(), e))?;
        let platform: PlatformFile =
            serde_json::from_str(&platform).map_err(|e| Error::InvalidTemplate {
                path: platform_path,
                message: e.to_string(),
            })?;

        let mut parts = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::InvalidTemplate {
                path: root.clone(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let bytes = std::fs::read(entry.path())
                .map_err(|e| Error::io(format!("reading {}", entry.path().display()), e))?;
            parts.push(ItemDefinitionPart::from_bytes(
                part_path(&root, entry.path())?,
                &bytes,
            ));
        }

        let item_type = ItemType::from_tag(&platform.metadata.item_type);
        if item_type == ItemType::Other {
            return Err(Error::InvalidTemplate {
                path: root,
                message: format!("unsupported item type {}", platform.metadata.item_type),
            });
        }
        Ok(CreateItemRequest::new(platform.metadata.display_name, item_type)
            .with_definition(ItemDefinition::new(parts)))
    }

    /// Builds a notebook from a Python source under `Notebooks/`, with the
    /// workspace and lakehouse identifiers substituted in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateMissing`] if the source does not exist.
    pub fn notebook(
        &self,
        display_name: &str,
        source_file: &str,
        workspace: WorkspaceId,
        lakehouse_id: ItemId,
        lakehouse_name: &str,
    ) -> Result<CreateItemRequest> {
        let substitutions = Substitutions::new()
            .with(WORKSPACE_ID_TOKEN, workspace.to_string())
            .with(LAKEHOUSE_ID_TOKEN, lakehouse_id.to_string())
            .with(LAKEHOUSE_NAME_TOKEN, lakehouse_name);
        let source = substitute_text(
            &self.read_text(&format!("Notebooks/{source_file}"))?,
            &substitutions,
        );
        Ok(CreateItemRequest::new(display_name, ItemType::Notebook).with_definition(
            ItemDefinition::new(vec![ItemDefinitionPart::from_text(NOTEBOOK_PART, &source)]),
        ))
    }

    /// Builds a semantic model from a `.bim` file under `SemanticModels/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateMissing`] if a template file does not exist.
    pub fn semantic_model_from_bim(
        &self,
        display_name: &str,
        bim_file: &str,
        substitutions: &Substitutions,
    ) -> Result<CreateItemRequest> {
        let pbism = self.read_text("SemanticModels/definition.pbism")?;
        let bim = substitute_text(
            &self.read_text(&format!("SemanticModels/{bim_file}"))?,
            substitutions,
        );
        Ok(
            CreateItemRequest::new(display_name, ItemType::SemanticModel).with_definition(
                ItemDefinition::new(vec![
                    ItemDefinitionPart::from_text(PBISM_PART, &pbism),
                    ItemDefinitionPart::from_text(MODEL_BIM_PART, &bim),
                ]),
            ),
        )
    }

    /// Builds a report bound to `semantic_model` from a layout file under
    /// `Reports/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateMissing`] if a template file does not exist.
    pub fn report(
        &self,
        display_name: &str,
        report_json: &str,
        semantic_model: ItemId,
    ) -> Result<CreateItemRequest> {
        let binding = substitute_text(
            &self.read_text("Reports/definition.pbir")?,
            &Substitutions::new().with(SEMANTIC_MODEL_ID_TOKEN, semantic_model.to_string()),
        );
        let layout = self.read_text(&format!("Reports/{report_json}"))?;
        let theme = self.read_text(&format!("Reports/{BASE_THEME_PART}"))?;
        Ok(CreateItemRequest::new(display_name, ItemType::Report).with_definition(
            ItemDefinition::new(vec![
                ItemDefinitionPart::from_text(PBIR_PART, &binding),
                ItemDefinitionPart::from_text(REPORT_JSON_PART, &layout),
                ItemDefinitionPart::from_text(BASE_THEME_PART, &theme),
            ]),
        ))
    }
}

fn part_path(root: &Path, file: &Path) -> Result<String> {
    let relative = file.strip_prefix(root).map_err(|e| Error::InvalidTemplate {
        path: file.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn library() -> (tempfile::TempDir, TemplateLibrary) {
        let dir = tempfile::tempdir().unwrap();
        let items = dir.path().join("items");
        let files = dir.path().join("files");
        fs::create_dir_all(items.join("Sales Model.SemanticModel/definition")).unwrap();
        fs::write(
            items.join("Sales Model.SemanticModel/.platform"),
            r#"{"metadata":{"type":"SemanticModel","displayName":"Sales Model"},"config":{"version":"2.0","logicalId":"0"}}"#,
        )
        .unwrap();
        fs::write(items.join("Sales Model.SemanticModel/definition.pbism"), "{}").unwrap();
        fs::write(
            items.join("Sales Model.SemanticModel/definition/expressions.tmdl"),
            "expression DatabaseQuery = \"{ONELAKE_PATH}\"",
        )
        .unwrap();

        fs::create_dir_all(files.join("Notebooks")).unwrap();
        fs::write(
            files.join("Notebooks/Build.py"),
            "# lakehouse {LAKEHOUSE_ID} ({LAKEHOUSE_NAME}) in {WORKSPACE_ID}",
        )
        .unwrap();
        fs::create_dir_all(files.join("Reports/StaticResources/SharedResources/BaseThemes")).unwrap();
        fs::write(
            files.join("Reports/definition.pbir"),
            r#"{"datasetReference":{"byConnection":{"pbiModelDatabaseName":"{SEMANTIC_MODEL_ID}"}}}"#,
        )
        .unwrap();
        fs::write(files.join("Reports/summary.json"), "{}").unwrap();
        fs::write(files.join(format!("Reports/{BASE_THEME_PART}")), "{}").unwrap();

        let library = TemplateLibrary::new(items, files, dir.path().join("pbix"));
        (dir, library)
    }

    #[test]
    fn folder_becomes_parts_with_forward_slash_paths() {
        let (_dir, library) = library();
        let request = library.item_from_folder("Sales Model.SemanticModel").unwrap();

        assert_eq!(request.display_name, "Sales Model");
        assert_eq!(request.item_type, ItemType::SemanticModel);
        let definition = request.definition.unwrap();
        let paths: Vec<_> = definition.parts.iter().map(|p| p.path.as_str()).collect();
        assert!(paths.contains(&".platform"));
        assert!(paths.contains(&"definition.pbism"));
        assert!(paths.contains(&"definition/expressions.tmdl"));
    }

    #[test]
    fn missing_folder_is_template_missing() {
        let (_dir, library) = library();
        assert!(matches!(
            library.item_from_folder("Nope.Report"),
            Err(Error::TemplateMissing { .. })
        ));
    }

    #[test]
    fn notebook_gets_identifiers() {
        let (_dir, library) = library();
        let workspace = WorkspaceId::generate();
        let lakehouse = ItemId::generate();
        let request = library
            .notebook("Build", "Build.py", workspace, lakehouse, "sales")
            .unwrap();

        let source = request.definition.unwrap().parts[0].decode_text().unwrap();
        assert_eq!(
            source,
            format!("# lakehouse {lakehouse} (sales) in {workspace}")
        );
    }

    #[test]
    fn report_is_bound_to_model() {
        let (_dir, library) = library();
        let model = ItemId::generate();
        let request = library.report("Summary", "summary.json", model).unwrap();
        let definition = request.definition.unwrap();

        assert_eq!(definition.parts.len(), 3);
        let binding = definition.part(PBIR_PART).unwrap().decode_text().unwrap();
        assert!(binding.contains(&model.to_string()));
        assert!(definition.part(BASE_THEME_PART).is_some());
    }

    #[test]
    fn missing_file_is_template_missing() {
        let (_dir, library) = library();
        assert!(matches!(
            library.read_pbix("ProductSales.pbix"),
            Err(Error::TemplateMissing { .. })
        ));
    }
}
