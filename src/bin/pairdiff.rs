//! pairdiff CLI entry point.
//!
//! Aligns two files on a shared row grid, copies rows between them through a
//! sync session, and shows the effective configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pairdiff::domain::{AlignedDiffResult, Side, normalize};
use pairdiff::infra::app_config::{config_path, load_config, save_config};
use pairdiff::infra::bus::SessionBus;
use pairdiff::infra::local::InMemoryBackend;
use pairdiff::infra::local::align::align_texts;
use pairdiff::infra::services::{CompareService, Services};
use pairdiff::session::{DiffSession, InitialPayload, PanelAction, SessionOptions};

#[derive(Parser, Debug)]
#[command(name = "pairdiff")]
#[command(version)]
#[command(about = "Line-aligned two-pane diff", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align two files and print the row grid
    Align {
        source: PathBuf,
        target: PathBuf,
        /// Print the alignment as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy a range of aligned rows from one file into the other
    Copy {
        source: PathBuf,
        target: PathBuf,
        /// Pane the rows are copied from
        #[arg(long, value_enum, default_value = "source")]
        from: PaneArg,
        /// First aligned row, 1-based
        #[arg(long)]
        start: usize,
        /// Last aligned row, 1-based (defaults to --start)
        #[arg(long)]
        end: Option<usize>,
        /// Write the result back instead of printing it
        #[arg(long)]
        write: bool,
    },

    /// Print the effective sync configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PaneArg {
    Source,
    Target,
}

impl From<PaneArg> for Side {
    fn from(pane: PaneArg) -> Self {
        match pane {
            PaneArg::Source => Side::Source,
            PaneArg::Target => Side::Target,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Align {
            source,
            target,
            json,
        } => {
            let result = align_texts(&read(&source)?, &read(&target)?);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result).context("Failed to encode alignment")?
                );
            } else {
                print_grid(&result);
            }
        }
        Commands::Copy {
            source,
            target,
            from,
            start,
            end,
            write,
        } => {
            let from = Side::from(from);
            let end = end.unwrap_or(start);
            if start == 0 || end == 0 {
                anyhow::bail!("rows are 1-based");
            }
            let text = copy_rows(&source, &target, from, start - 1, end - 1).await?;
            let destination = match from {
                Side::Source => &target,
                Side::Target => &source,
            };
            if write {
                std::fs::write(destination, &text)
                    .with_context(|| format!("Failed to write {}", destination.display()))?;
                eprintln!("Updated {}", destination.display());
            } else {
                print!("{text}");
            }
        }
        Commands::Config { save } => {
            let config = load_config();
            if save {
                save_config(&config).context("Failed to save config")?;
                eprintln!("saved {}", config_path().display());
            }
            println!("# {}", config_path().display());
            print!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to encode config")?
            );
            for warning in config.validate() {
                eprintln!("warning: {warning}");
            }
        }
    }

    Ok(())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_grid(result: &AlignedDiffResult) {
    let width = result
        .aligned_source_lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
        .min(60);

    for row in 0..result.aligned_line_count {
        let marker = result.aligned_diff_kinds[row].map_or(' ', |kind| kind.marker());
        let number = |side: Side| match result.line_numbers_by_row(side)[row] {
            0 => String::new(),
            n => n.to_string(),
        };
        println!(
            "{marker} {:>5} {:<width$} | {:>5} {}",
            number(Side::Source),
            result.aligned_source_lines[row],
            number(Side::Target),
            result.aligned_target_lines[row],
        );
    }
    eprintln!(
        "{} rows, {} differing",
        result.aligned_line_count,
        result.diff_row_indexes.len()
    );
}

/// Runs a copy through a sync session against in-memory documents and
/// returns the destination text.
async fn copy_rows(
    source: &Path,
    target: &Path,
    from: Side,
    start_row: usize,
    end_row: usize,
) -> Result<String> {
    let bus = SessionBus::new();
    let backend = Arc::new(InMemoryBackend::with_bus(bus.clone()));
    let source_id = backend.open(read(source)?);
    let target_id = backend.open(read(target)?);
    let aligned = backend.compare(&source_id, &target_id).await?;

    let rows = normalize(aligned.clone()).aligned_line_count;
    if start_row >= rows || end_row >= rows {
        anyhow::bail!("row range {}..={} outside 1..={}", start_row + 1, end_row + 1, rows);
    }

    let mut session = DiffSession::open(
        SessionOptions {
            tab_id: "cli".to_string(),
            source_id: source_id.clone(),
            target_id: target_id.clone(),
            initial: InitialPayload::Precomputed(aligned),
            config: load_config(),
        },
        Services::from_backend(backend.clone()),
        &bus,
    );
    session.dispatch_panel(PanelAction::CopyLines {
        from,
        start_row,
        end_row,
    });
    session.run_until_idle(Duration::from_millis(500)).await;
    session.close();

    let destination = match from {
        Side::Source => &target_id,
        Side::Target => &source_id,
    };
    Ok(backend.text(destination)?)
}
