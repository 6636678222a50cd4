//! The document-rendering collaborator.
//!
//! The core hands over `(markdown, title, filename)` and gets back a
//! filesystem path; it does not interpret rendering failures beyond
//! surfacing them.

use std::path::{Path, PathBuf};

use taskforge_core::error::ReportError;

/// Renders a markdown report to a document on disk.
pub trait DocumentRenderer: Send + Sync {
    /// Render `markdown` under `title`, saved as `filename` (no extension).
    /// Returns the path of the produced artifact.
    fn render(
        &self,
        markdown: &str,
        title: &str,
        filename: &str,
    ) -> Result<PathBuf, ReportError>;
}

/// Writes the report as a plain markdown file under a reports directory.
pub struct MarkdownFileRenderer {
    reports_dir: PathBuf,
}

impl MarkdownFileRenderer {
    pub fn new(reports_dir: impl AsRef<Path>) -> Self {
        Self {
            reports_dir: reports_dir.as_ref().to_path_buf(),
        }
    }
}

impl DocumentRenderer for MarkdownFileRenderer {
    fn render(
        &self,
        markdown: &str,
        title: &str,
        filename: &str,
    ) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(&self.reports_dir).map_err(|e| ReportError::WriteFailed {
            path: self.reports_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let path = self.reports_dir.join(format!("{filename}.md"));

        // Lead with the title unless the model already produced a heading.
        let document = if markdown.trim_start().starts_with('#') {
            markdown.to_string()
        } else {
            format!("# {title}\n\n{markdown}")
        };

        std::fs::write(&path, document).map_err(|e| ReportError::WriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_file_with_title_heading() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MarkdownFileRenderer::new(dir.path());

        let path = renderer
            .render("Body text.", "My Report", "report_abc123")
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "report_abc123.md");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# My Report"));
        assert!(content.contains("Body text."));
    }

    #[test]
    fn keeps_existing_heading() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MarkdownFileRenderer::new(dir.path());

        let path = renderer
            .render("# Already titled\n\nBody.", "Ignored", "report_x")
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Already titled"));
        assert!(!content.contains("Ignored"));
    }

    #[test]
    fn creates_reports_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep").join("reports");
        let renderer = MarkdownFileRenderer::new(&nested);

        let path = renderer.render("x", "t", "report_y").unwrap();
        assert!(path.exists());
        assert!(nested.is_dir());
    }

    #[test]
    fn rerendering_same_filename_overwrites_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MarkdownFileRenderer::new(dir.path());

        let p1 = renderer.render("first", "t", "report_z").unwrap();
        let p2 = renderer.render("second", "t", "report_z").unwrap();
        assert_eq!(p1, p2);

        let content = std::fs::read_to_string(&p2).unwrap();
        assert!(content.contains("second"));
        assert!(!content.contains("first"));
    }
}
