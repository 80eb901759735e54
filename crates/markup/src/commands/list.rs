//! `markup list` command implementation.

use std::io::{self, Write};

use clap::Args;
use markup_engine::{Engine, RendererDescriptor};

use crate::error::CliError;

/// Arguments for the list command.
#[derive(Args)]
pub(crate) struct ListArgs {
    /// Only show languages whose renderer is installed.
    #[arg(long)]
    available: bool,
}

/// One table row.
struct Row {
    name: String,
    identifiers: String,
    strategy: String,
    available: bool,
}

impl Row {
    fn new(engine: &Engine, descriptor: &RendererDescriptor) -> Self {
        let available = descriptor
            .identifiers()
            .first()
            .and_then(|identifier| engine.registry().is_available(identifier))
            .unwrap_or(false);
        Self {
            name: descriptor.name().to_owned(),
            identifiers: descriptor.identifiers().join(", "),
            strategy: descriptor.kind().to_string(),
            available,
        }
    }
}

impl ListArgs {
    pub(crate) fn execute(self, engine: &Engine) -> Result<(), CliError> {
        let rows: Vec<Row> = engine
            .registry()
            .descriptors()
            .into_iter()
            .map(|descriptor| Row::new(engine, descriptor))
            .filter(|row| !self.available || row.available)
            .collect();

        let name_width = column_width(&rows, "LANGUAGE", |row| &row.name);
        let ids_width = column_width(&rows, "IDENTIFIERS", |row| &row.identifiers);
        let strategy_width = column_width(&rows, "RENDERER", |row| &row.strategy);

        let mut stdout = io::stdout().lock();
        writeln!(
            stdout,
            "{:name_width$}  {:ids_width$}  {:strategy_width$}  STATUS",
            "LANGUAGE", "IDENTIFIERS", "RENDERER"
        )?;
        for row in &rows {
            writeln!(
                stdout,
                "{:name_width$}  {:ids_width$}  {:strategy_width$}  {}",
                row.name,
                row.identifiers,
                row.strategy,
                if row.available { "available" } else { "missing" }
            )?;
        }
        stdout.flush()?;
        Ok(())
    }
}

fn column_width(rows: &[Row], header: &str, cell: impl Fn(&Row) -> &String) -> usize {
    rows.iter()
        .map(|row| cell(row).chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or_default()
}
