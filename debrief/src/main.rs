//! Decision-tree questionnaire runner.
//!
//! Validates tree files, replays stored answers one step at a time, and walks
//! a tree interactively on the terminal to produce a debrief report.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use debrief::core::replay::TraversalOutcome;
use debrief::exit_codes;
use debrief::io::config::{DEFAULT_CONFIG_PATH, DebriefConfig, load_config};
use debrief::logging;
use debrief::session::{Session, render_pending};
use debrief::tree::NodeId;
use debrief::validate::{load_and_validate, load_valid_tree};
use debrief::walk::walk_from_files;

#[derive(Parser)]
#[command(
    name = "debrief",
    version,
    about = "Walk a decision-tree questionnaire and produce a debrief report"
)]
struct Cli {
    /// Config file; defaults apply when it does not exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a tree file and list every structural violation.
    Validate {
        /// Tree definition (`.csv` or `.json`).
        tree: PathBuf,
        /// Root node id (defaults to the minimum id).
        #[arg(long)]
        root: Option<NodeId>,
    },
    /// Replay stored answers from the root once; print the report or the next prompt.
    Walk {
        tree: PathBuf,
        /// JSON answers keyed by node id.
        #[arg(long)]
        answers: Option<PathBuf>,
        #[arg(long)]
        root: Option<NodeId>,
    },
    /// Ask every question on the terminal until a report is produced.
    ///
    /// Prompts go to stderr so stdout carries only the report.
    Run {
        tree: PathBuf,
        #[arg(long)]
        root: Option<NodeId>,
        /// Write the report here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    match cli.command {
        Command::Validate { tree, root } => cmd_validate(&tree, root, &config),
        Command::Walk {
            tree,
            answers,
            root,
        } => cmd_walk(&tree, answers.as_deref(), root, &config),
        Command::Run { tree, root, output } => cmd_run(&tree, root, output, &config),
    }
}

fn cmd_validate(tree: &Path, root: Option<NodeId>, config: &DebriefConfig) -> Result<i32> {
    let loaded = load_and_validate(tree, root, config)?;
    if !loaded.report.is_valid() {
        for message in loaded.report.messages() {
            println!("{message}");
        }
        return Ok(exit_codes::INVALID);
    }
    println!(
        "ok: {} nodes, root {}",
        loaded.rows.nodes.len(),
        loaded
            .report
            .root_id
            .map(|id| id.to_string())
            .unwrap_or_default()
    );
    Ok(exit_codes::OK)
}

fn cmd_walk(
    tree: &Path,
    answers: Option<&Path>,
    root: Option<NodeId>,
    config: &DebriefConfig,
) -> Result<i32> {
    match walk_from_files(tree, answers, root, config)? {
        TraversalOutcome::Completed(report) => {
            print!("{report}");
            Ok(exit_codes::OK)
        }
        TraversalOutcome::Suspended(pending) => {
            println!(
                "awaiting input at node {} (path {})",
                pending.node_id,
                pending.path_label()
            );
            print!("{}", render_pending(&pending));
            Ok(exit_codes::SUSPENDED)
        }
    }
}

fn cmd_run(
    tree: &Path,
    root: Option<NodeId>,
    output: Option<PathBuf>,
    config: &DebriefConfig,
) -> Result<i32> {
    let tree = load_valid_tree(tree, root, config)?;
    let mut session = Session::new(&tree.nodes, tree.root_id, config.max_iterations);
    let report = session.run(io::stdin().lock(), io::stderr())?;
    info!(answers = session.answers().len(), "session completed");

    match output {
        Some(path) => fs::write(&path, report.as_str())
            .with_context(|| format!("write report {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(report.as_str().as_bytes())
                .context("write report")?;
            stdout.flush().context("flush report")?;
        }
    }
    Ok(exit_codes::OK)
}
