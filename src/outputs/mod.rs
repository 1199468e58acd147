//! Output generation: JSON persistence and document rendering.
//!
//! # Submodules
//!
//! - [`json`]: Reads and writes the persisted report JSON
//! - [`markdown`]: Converts a [`Report`] to a Markdown document
//! - [`command`]: Hands the report to an external layout engine (PDF)
//!
//! Every format implements [`DocumentRenderer`], so the caller writes any
//! of them the same way with [`write_document`].
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── Harry_Styles-coverage-20250506-143000.json
//! ├── Harry_Styles-coverage-20250506-143000.md
//! └── Harry_Styles-coverage-20250506-143000.pdf
//! ```

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

use crate::error::NewsError;
use crate::models::Report;

pub mod command;
pub mod json;
pub mod markdown;

pub use command::CommandRenderer;
pub use markdown::MarkdownRenderer;

/// Turns a finished [`Report`] into document bytes.
pub trait DocumentRenderer {
    /// File extension of the produced document, without the dot.
    fn extension(&self) -> &'static str;

    async fn render(&self, report: &Report) -> Result<Vec<u8>, NewsError>;
}

/// Render `report` and write it to `{output_dir}/{filename}`.
///
/// A filename without an extension gets the renderer's extension.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display(), %filename))]
pub async fn write_document<R>(
    renderer: &R,
    report: &Report,
    output_dir: &Path,
    filename: &str,
) -> Result<PathBuf, NewsError>
where
    R: DocumentRenderer,
{
    let bytes = renderer.render(report).await?;
    let mut path = output_dir.join(filename);
    if path.extension().is_none() {
        path.set_extension(renderer.extension());
    }
    fs::write(&path, &bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "Wrote document");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Section;

    #[tokio::test]
    async fn test_write_document_adds_extension() {
        let dir = std::env::temp_dir().join(format!("news_coverage_docs_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let report = Report::assemble("Quiet Topic Coverage Report", Vec::<Section>::new());

        let path = write_document(&MarkdownRenderer, &report, &dir, "quiet").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "quiet.md");
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "# Quiet Topic Coverage Report\n");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
