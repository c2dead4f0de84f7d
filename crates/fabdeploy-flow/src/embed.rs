//! Embedding page generation and the viewer that opens it.
//!
//! The page template folder holds `EmbedReport.html` plus static assets.
//! Assets are copied to the output folder as-is; the HTML template gets the
//! embedding credential substituted in and is written as
//! `EmbedReport-AppOwnsData.html`, replacing any earlier page.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use fabdeploy_client::model::EmbeddingCredential;
use fabdeploy_core::config::Paths;

use crate::error::{Error, Result};
use crate::template::{Substitutions, substitute_text};

/// Page template file name.
pub const PAGE_TEMPLATE: &str = "EmbedReport.html";
/// Generated page file name.
pub const PAGE_OUTPUT: &str = "EmbedReport-AppOwnsData.html";
/// Application name shown on the page.
pub const APP_NAME: &str = "Embed Report - App-Owns-Data";
/// Token type expression the page hands to the embedding script.
pub const EMBED_TOKEN_TYPE: &str = "models.TokenType.Embed";

/// Writes the embedding page from a template folder.
#[derive(Debug, Clone)]
pub struct EmbeddingPageGenerator {
    web_templates: PathBuf,
    web_pages: PathBuf,
}

impl EmbeddingPageGenerator {
    /// Creates a generator reading from `web_templates` and writing to
    /// `web_pages`.
    #[must_use]
    pub fn new(web_templates: impl Into<PathBuf>, web_pages: impl Into<PathBuf>) -> Self {
        Self {
            web_templates: web_templates.into(),
            web_pages: web_pages.into(),
        }
    }

    /// Creates a generator over the configured folders.
    #[must_use]
    pub fn from_paths(paths: &Paths) -> Self {
        Self::new(&paths.web_templates, &paths.web_pages)
    }

    /// Output folder.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.web_pages
    }

    /// Copies every non-HTML file of the template folder to the output
    /// folder, keeping relative paths. Returns the number of files copied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateMissing`] if the template folder is absent,
    /// or an I/O error if a copy fails.
    pub fn copy_assets(&self) -> Result<usize> {
        if !self.web_templates.is_dir() {
            return Err(Error::TemplateMissing {
                path: self.web_templates.clone(),
            });
        }

        let mut copied = 0;
        for entry in WalkDir::new(&self.web_templates).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::InvalidTemplate {
                path: self.web_templates.clone(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.web_templates) else {
                continue;
            };
            if relative.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html")) {
                continue;
            }
            let target = self.web_pages.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::io(format!("creating {}", parent.display()), e))?;
            }
            std::fs::copy(entry.path(), &target)
                .map_err(|e| Error::io(format!("copying {}", entry.path().display()), e))?;
            copied += 1;
        }
        tracing::debug!(copied, dir = %self.web_pages.display(), "page assets copied");
        Ok(copied)
    }

    /// Renders the page for `credential` and returns the written path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateMissing`] if the page template is absent, or
    /// an I/O error if the page cannot be written.
    pub fn render(&self, credential: &EmbeddingCredential) -> Result<PathBuf> {
        let template_path = self.web_templates.join(PAGE_TEMPLATE);
        let template = std::fs::read_to_string(&template_path)
            .map_err(|e| Error::template_read(template_path, e))?;

        self.copy_assets()?;
        let page = substitute_text(&template, &page_substitutions(credential));

        std::fs::create_dir_all(&self.web_pages)
            .map_err(|e| Error::io(format!("creating {}", self.web_pages.display()), e))?;
        let output = self.web_pages.join(PAGE_OUTPUT);
        std::fs::write(&output, page)
            .map_err(|e| Error::io(format!("writing {}", output.display()), e))?;
        tracing::info!(
            report_id = %credential.report_id,
            path = %output.display(),
            "embedding page written"
        );
        Ok(output)
    }
}

fn page_substitutions(credential: &EmbeddingCredential) -> Substitutions {
    Substitutions::new()
        .with("@AppName", APP_NAME)
        .with("@EmbedReportId", credential.report_id.to_string())
        .with("@EmbedUrl", credential.embed_url.as_str())
        .with("@EmbedToken", credential.access_token.expose().as_str())
        .with("EmbedTokenType", EMBED_TOKEN_TYPE)
}

/// Opens URLs and local files for the operator.
#[async_trait]
pub trait Viewer: Send + Sync {
    /// Opens `target`, a URL or a file path.
    async fn open(&self, target: &str) -> Result<()>;
}

/// Launches an external command with the target as its last argument.
#[derive(Debug, Clone)]
pub struct BrowserViewer {
    command: String,
    args: Vec<String>,
}

impl BrowserViewer {
    /// Creates a viewer running `command args... target`.
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Builds a viewer from a command line (`["firefox", "--new-tab"]`).
    /// Returns `None` for an empty command line.
    #[must_use]
    pub fn from_command_line(command_line: &[String]) -> Option<Self> {
        let (command, args) = command_line.split_first()?;
        Some(Self::new(command.clone(), args.to_vec()))
    }

    /// The platform's default opener.
    #[must_use]
    pub fn system_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("open", Vec::new())
        } else if cfg!(target_os = "windows") {
            Self::new("cmd", vec!["/C".to_string(), "start".to_string(), String::new()])
        } else {
            Self::new("xdg-open", Vec::new())
        }
    }
}

#[async_trait]
impl Viewer for BrowserViewer {
    async fn open(&self, target: &str) -> Result<()> {
        tracing::info!(command = %self.command, location = target, "opening viewer");
        let status = tokio::process::Command::new(&self.command)
            .args(&self.args)
            .arg(target)
            .status()
            .await
            .map_err(|e| Error::io(format!("launching {}", self.command), e))?;
        if !status.success() {
            tracing::warn!(command = %self.command, %status, "viewer exited with failure");
        }
        Ok(())
    }
}

/// Viewer for batch runs: logs the target and opens nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoViewer;

#[async_trait]
impl Viewer for NoViewer {
    async fn open(&self, target: &str) -> Result<()> {
        tracing::info!(location = target, "viewer disabled, not opening");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabdeploy_core::{ItemId, Redacted, WorkspaceId};
    use std::fs;

    fn credential() -> EmbeddingCredential {
        EmbeddingCredential {
            report_id: ItemId::generate(),
            report_name: "Product Sales Summary".to_string(),
            workspace_id: WorkspaceId::generate(),
            embed_url: "https://app.powerbi.com/reportEmbed?reportId=r".to_string(),
            access_token: Redacted::new("tok-123".to_string()),
            expires_at: None,
        }
    }

    fn generator() -> (tempfile::TempDir, EmbeddingPageGenerator) {
        let dir = tempfile::tempdir().unwrap();
        let web = dir.path().join("web");
        fs::create_dir_all(web.join("css")).unwrap();
        fs::write(
            web.join(PAGE_TEMPLATE),
            "<title>@AppName</title>\nid=@EmbedReportId\nurl=@EmbedUrl\ntoken=@EmbedToken\ntype=EmbedTokenType",
        )
        .unwrap();
        fs::write(web.join("css/app.css"), "body{}").unwrap();
        fs::write(web.join("notes.html"), "<p>skip</p>").unwrap();
        let generator = EmbeddingPageGenerator::new(web, dir.path().join("out"));
        (dir, generator)
    }

    #[test]
    fn render_substitutes_credential_and_copies_assets() {
        let (dir, generator) = generator();
        let credential = credential();

        let path = generator.render(&credential).unwrap();

        assert_eq!(path, dir.path().join("out").join(PAGE_OUTPUT));
        let page = fs::read_to_string(&path).unwrap();
        assert_eq!(
            page,
            format!(
                "<title>{APP_NAME}</title>\nid={}\nurl={}\ntoken=tok-123\ntype={EMBED_TOKEN_TYPE}",
                credential.report_id, credential.embed_url
            )
        );
        assert!(dir.path().join("out/css/app.css").is_file());
        assert!(!dir.path().join("out/notes.html").exists());
        assert!(!dir.path().join("out").join(PAGE_TEMPLATE).exists());
    }

    #[test]
    fn only_html_files_are_left_behind() {
        let (dir, generator) = generator();
        let web = dir.path().join("web");
        fs::create_dir_all(web.join("html")).unwrap();
        fs::create_dir_all(web.join("js")).unwrap();
        fs::write(web.join("html/widget.js"), "void 0;").unwrap();
        fs::write(web.join("js/html5shiv.js"), "void 0;").unwrap();
        fs::write(web.join("Legacy.HTML"), "<p>skip</p>").unwrap();

        let copied = generator.copy_assets().unwrap();

        let out = dir.path().join("out");
        assert_eq!(copied, 3);
        assert!(out.join("css/app.css").is_file());
        assert!(out.join("html/widget.js").is_file());
        assert!(out.join("js/html5shiv.js").is_file());
        assert!(!out.join("Legacy.HTML").exists());
        assert!(!out.join("notes.html").exists());
    }

    #[test]
    fn page_is_overwritten_on_rerun() {
        let (_dir, generator) = generator();
        let first = generator.render(&credential()).unwrap();
        let second_credential = credential();
        let second = generator.render(&second_credential).unwrap();

        assert_eq!(first, second);
        let page = fs::read_to_string(&second).unwrap();
        assert!(page.contains(&second_credential.report_id.to_string()));
    }

    #[test]
    fn missing_template_folder_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let generator = EmbeddingPageGenerator::new(dir.path().join("absent"), dir.path().join("out"));
        assert!(matches!(
            generator.render(&credential()),
            Err(Error::TemplateMissing { .. })
        ));
    }

    #[test]
    fn browser_viewer_splits_command_line() {
        let viewer =
            BrowserViewer::from_command_line(&["firefox".to_string(), "--new-tab".to_string()])
                .unwrap();
        assert_eq!(viewer.command, "firefox");
        assert_eq!(viewer.args, vec!["--new-tab"]);
        assert!(BrowserViewer::from_command_line(&[]).is_none());
    }

    #[tokio::test]
    async fn no_viewer_opens_nothing() {
        NoViewer.open("https://app.powerbi.com/groups/x").await.unwrap();
    }
}
