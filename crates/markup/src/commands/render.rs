//! `markup render` command implementation.

use std::collections::HashSet;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use markup_engine::Engine;
use rayon::prelude::*;

use crate::error::CliError;
use crate::output::Output;

/// Path that stands for standard input.
const STDIN: &str = "-";

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Files to render; none or "-" reads standard input.
    files: Vec<PathBuf>,

    /// Language identifier (e.g. md, adoc); overrides file extensions.
    #[arg(short, long)]
    language: Option<String>,

    /// Write HTML to FILE instead of stdout (single input only).
    #[arg(short, long, value_name = "FILE", conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Write each document to DIR/<stem>.html.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

/// Where a document comes from.
enum Source<'a> {
    Stdin,
    File(&'a Path),
}

impl Source<'_> {
    fn label(&self) -> String {
        match self {
            Self::Stdin => "<stdin>".to_owned(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// A rendered document.
struct Rendered<'a> {
    source: Source<'a>,
    html: String,
}

impl RenderArgs {
    pub(crate) fn execute(self, engine: &Engine) -> Result<(), CliError> {
        let sources = self.sources()?;

        if sources.len() > 1 && self.output.is_some() {
            return Err(CliError::Validation(
                "--output accepts a single input; use --out-dir for several".to_owned(),
            ));
        }

        // Collecting into Result preserves argument order.
        let documents = sources
            .into_par_iter()
            .map(|source| self.render_source(engine, source))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(out_dir) = &self.out_dir {
            return Self::write_out_dir(out_dir, &documents);
        }
        if let Some(path) = &self.output {
            let html = documents.first().map_or("", |doc| doc.html.as_str());
            std::fs::write(path, html)?;
            return Ok(());
        }

        let mut stdout = io::stdout().lock();
        for document in &documents {
            stdout.write_all(document.html.as_bytes())?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Resolve the argument list into document sources.
    fn sources(&self) -> Result<Vec<Source<'_>>, CliError> {
        let sources: Vec<_> = if self.files.is_empty() {
            vec![Source::Stdin]
        } else {
            self.files
                .iter()
                .map(|path| {
                    if path.as_os_str() == STDIN {
                        Source::Stdin
                    } else {
                        Source::File(path)
                    }
                })
                .collect()
        };

        let stdin_count = sources
            .iter()
            .filter(|source| matches!(source, Source::Stdin))
            .count();
        if stdin_count > 0 && self.language.is_none() {
            return Err(CliError::Validation(
                "reading standard input requires --language".to_owned(),
            ));
        }
        if stdin_count > 1 {
            return Err(CliError::Validation(
                "standard input can only be read once".to_owned(),
            ));
        }
        if stdin_count > 0 && self.out_dir.is_some() {
            return Err(CliError::Validation(
                "--out-dir requires file inputs".to_owned(),
            ));
        }

        Ok(sources)
    }

    fn render_source<'a>(
        &self,
        engine: &Engine,
        source: Source<'a>,
    ) -> Result<Rendered<'a>, CliError> {
        let html = match &source {
            Source::Stdin => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                let language = self.language.as_deref().unwrap_or_default();
                engine.render(language, &content)?
            }
            Source::File(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    io::Error::new(e.kind(), format!("{}: {e}", path.display()))
                })?;
                let identifier = self
                    .language
                    .clone()
                    .unwrap_or_else(|| path.to_string_lossy().into_owned());
                engine
                    .render(&identifier, &content)
                    .map_err(|source| CliError::RenderFile {
                        path: path.display().to_string(),
                        source,
                    })?
            }
        };
        tracing::debug!(source = %source.label(), bytes = html.len(), "Rendered");
        Ok(Rendered { source, html })
    }

    /// Write every document to `<out_dir>/<stem>.html`.
    fn write_out_dir(out_dir: &Path, documents: &[Rendered<'_>]) -> Result<(), CliError> {
        let mut targets = HashSet::new();
        let mut planned = Vec::with_capacity(documents.len());
        for document in documents {
            let Source::File(path) = document.source else {
                continue;
            };
            let stem = path.file_stem().ok_or_else(|| {
                CliError::Validation(format!("{} has no file name", path.display()))
            })?;
            let target = out_dir.join(format!("{}.html", stem.to_string_lossy()));
            if !targets.insert(target.clone()) {
                return Err(CliError::Validation(format!(
                    "several inputs would be written to {}",
                    target.display()
                )));
            }
            planned.push((target, document));
        }

        std::fs::create_dir_all(out_dir)?;
        let output = Output::new();
        for (target, document) in &planned {
            std::fs::write(target, &document.html)?;
            output.detail(&format!(
                "{} -> {}",
                document.source.label(),
                target.display()
            ));
        }
        output.success(&format!(
            "Rendered {} document(s) to {}",
            planned.len(),
            out_dir.display()
        ));
        Ok(())
    }
}
