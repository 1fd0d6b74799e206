//! CLI entry point for `mmsarc`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};

use mmsarc::archive::reader::read_archive;
use mmsarc::archive::writer::stage_attachments;
use mmsarc::content_type;
use mmsarc::index::builder::build_index;
use mmsarc::reconcile::{reconcile, verify_checksum, FailureMode, ReconcileOptions};

#[derive(Parser)]
#[command(
    name = "mmsarc",
    version,
    about = "Migrate MMS messages between a device database and a portable directory archive"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify checksums and bind every attachment to a file in the target tree
    Reconcile {
        /// Directory archive of messages
        archive: PathBuf,
        /// Target tree holding the authoritative attachment files
        target: PathBuf,
        /// Skip failed messages and report them at the end
        #[arg(long)]
        lenient: bool,
        /// Canonical attachment directory on the target device
        #[arg(long)]
        remote_parts_dir: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Recompute and check every message's stored checksum
    Verify {
        /// Directory archive of messages
        archive: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Build the content index of a target tree and show statistics
    Index {
        /// Target tree to index
        target: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Verify an archive and copy its attachment files into a parts directory
    Stage {
        /// Directory archive of messages
        archive: PathBuf,
        /// Flat directory receiving the attachment files
        parts_dir: PathBuf,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = mmsarc::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Reconcile {
            archive,
            target,
            lenient,
            remote_parts_dir,
            json,
        } => {
            let options = ReconcileOptions {
                mode: if lenient || config.reconcile.lenient {
                    FailureMode::Lenient
                } else {
                    FailureMode::Strict
                },
                remote_parts_dir: remote_parts_dir
                    .unwrap_or_else(|| config.reconcile.remote_parts_dir.clone()),
            };
            cmd_reconcile(&archive, &target, &options, json)
        }
        Commands::Verify { archive, json } => cmd_verify(&archive, json),
        Commands::Index { target, json } => cmd_index(&target, json),
        Commands::Stage { archive, parts_dir } => cmd_stage(&archive, &parts_dir),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &mmsarc::config::Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = mmsarc::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mmsarc.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mmsarc", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn progress_bar(len: u64, verb: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {verb} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})"
            ))
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb
}

/// Reconcile an archive against a target tree.
fn cmd_reconcile(
    archive: &Path,
    target: &Path,
    options: &ReconcileOptions,
    json: bool,
) -> anyhow::Result<()> {
    let mut messages = read_archive(archive)?;
    println!(
        "  Read {} message(s) from {}",
        messages.len(),
        archive.display()
    );

    let pb = progress_bar(messages.len() as u64, "Reconciling");
    let start = Instant::now();

    let report = reconcile(
        &mut messages,
        target,
        options,
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;

    pb.finish_and_clear();
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("  Reconciled:        {}", report.reconciled);
        println!("  Matched by index:  {}", report.matched_by_index);
        println!("  Recovered:         {}", report.recovered);
        println!(
            "  Index:             {} file(s), {} hashed, {} ambiguous",
            report.index.files,
            format_size(report.index.bytes, DECIMAL),
            report.index.ambiguous
        );
        println!("  Elapsed:           {:.2?}", elapsed);
        if !report.failures.is_empty() {
            println!("  Skipped {} message(s):", report.failures.len());
            for failure in &report.failures {
                println!("    {}: {}", failure.message, failure.error);
            }
        }
    }

    if report.failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} message(s) failed to reconcile", report.failures.len())
    }
}

/// Recompute and compare stored checksums across an archive.
fn cmd_verify(archive: &Path, json: bool) -> anyhow::Result<()> {
    let messages = read_archive(archive)?;

    let pb = progress_bar(messages.len() as u64, "Verifying");
    let mut failures: Vec<(String, String)> = Vec::new();
    for (i, msg) in messages.iter().enumerate() {
        pb.set_position(i as u64);
        if let Err(e) = verify_checksum(msg) {
            failures.push((msg.identity(), e.to_string()));
        }
    }
    pb.finish_and_clear();

    if json {
        let out: Vec<serde_json::Value> = failures
            .iter()
            .map(|(message, error)| serde_json::json!({ "message": message, "error": error }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "messages": messages.len(),
                "failures": out,
            }))?
        );
    } else {
        println!("  Verified {} message(s)", messages.len());
        for (message, error) in &failures {
            println!("    {message}: {error}");
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} message(s) failed verification", failures.len())
    }
}

/// Verify an archive's checksums, then stage its attachments into a
/// flat parts directory for the database importer to pick up.
fn cmd_stage(archive: &Path, parts_dir: &Path) -> anyhow::Result<()> {
    let mut messages = read_archive(archive)?;

    let pb = progress_bar(messages.len() as u64, "Staging");
    let mut copied = 0;
    for (i, msg) in messages.iter_mut().enumerate() {
        pb.set_position(i as u64);
        verify_checksum(msg)?;
        copied += stage_attachments(msg, parts_dir)?;
    }
    pb.finish_and_clear();

    println!(
        "  Staged {} file(s) from {} message(s) into {}",
        copied,
        messages.len(),
        parts_dir.display()
    );
    Ok(())
}

/// Build the content index and print statistics.
fn cmd_index(target: &Path, json: bool) -> anyhow::Result<()> {
    let pb = progress_bar(0, "Indexing");
    let start = Instant::now();

    let index = build_index(
        target,
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;

    pb.finish_and_clear();
    let elapsed = start.elapsed();

    let mut kinds: BTreeMap<&'static str, u64> = BTreeMap::new();
    for (_, name, _) in index.entries() {
        *kinds.entry(content_type::media_kind(name)).or_default() += 1;
    }

    let stats = index.stats();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "files": stats.files,
                "bytes": stats.bytes,
                "ambiguous": stats.ambiguous,
                "distinct_hashes": index.len(),
                "kinds": kinds,
                "elapsed_ms": elapsed.as_millis() as u64,
            }))?
        );
    } else {
        println!("  Files indexed:     {}", stats.files);
        println!(
            "  Bytes hashed:      {}",
            format_size(stats.bytes, DECIMAL)
        );
        println!("  Distinct hashes:   {}", index.len());
        println!("  Ambiguous entries: {}", stats.ambiguous);
        for (kind, count) in &kinds {
            println!("    {kind:<8} {count}");
        }
        println!("  Elapsed:           {:.2?}", elapsed);
    }

    Ok(())
}
