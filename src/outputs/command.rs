//! Rendering through an external command.
//!
//! The report JSON is written to the command's stdin and whatever it prints
//! on stdout is the document. This is how PDFs are produced: the layout
//! engine is configured as `pdf_command` and stays outside this crate.

use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::DocumentRenderer;
use crate::error::NewsError;
use crate::models::Report;
use crate::utils::truncate_for_log;

#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    extension: &'static str,
}

impl CommandRenderer {
    /// Build from an argv list such as `["report-pdf", "--a4"]`.
    pub fn from_argv(argv: &[String], extension: &'static str) -> Result<Self, NewsError> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            NewsError::Config(format!(
                "no command configured for {extension} rendering"
            ))
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            extension,
        })
    }
}

impl DocumentRenderer for CommandRenderer {
    fn extension(&self) -> &'static str {
        self.extension
    }

    #[instrument(level = "info", skip_all, fields(program = %self.program))]
    async fn render(&self, report: &Report) -> Result<Vec<u8>, NewsError> {
        let input = serde_json::to_vec(report)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NewsError::Render(format!("failed to start {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| NewsError::Render("renderer stdin unavailable".to_string()))?;
        let feed_input = async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        };
        // Both sides run together so a renderer that streams output before
        // reading all input cannot block on a full pipe.
        let (written, output) = tokio::join!(feed_input, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(status = %output.status, stderr = %truncate_for_log(&stderr, 500), "Renderer failed");
            return Err(NewsError::Render(stderr));
        }
        if let Err(e) = written {
            return Err(NewsError::Render(format!(
                "renderer closed its input early: {e}"
            )));
        }
        if output.stdout.is_empty() {
            return Err(NewsError::Render(format!(
                "{} produced no output",
                self.program
            )));
        }

        debug!(bytes = output.stdout.len(), "Renderer finished");
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_empty_command_is_a_config_error() {
        assert!(matches!(
            CommandRenderer::from_argv(&[], "pdf"),
            Err(NewsError::Config(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_becomes_the_document() {
        let renderer = CommandRenderer::from_argv(&argv(&["cat"]), "pdf").unwrap();
        let report = Report::assemble("Echo Coverage Report", vec![]);
        let bytes = renderer.render(&report).await.unwrap();
        let echoed: Report = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(echoed, report);
        assert_eq!(renderer.extension(), "pdf");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let renderer = CommandRenderer::from_argv(
            &argv(&["sh", "-c", "cat >/dev/null; echo 'font missing' >&2; exit 3"]),
            "pdf",
        )
        .unwrap();
        let report = Report::assemble("Broken Coverage Report", vec![]);
        match renderer.render(&report).await {
            Err(NewsError::Render(stderr)) => assert_eq!(stderr, "font missing\n"),
            other => panic!("expected render error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_a_render_error() {
        let renderer =
            CommandRenderer::from_argv(&argv(&["definitely-not-a-real-renderer-binary"]), "pdf")
                .unwrap();
        let report = Report::assemble("Missing Coverage Report", vec![]);
        assert!(matches!(
            renderer.render(&report).await,
            Err(NewsError::Render(_))
        ));
    }
}
