//! blobgate — pre-push synchronization gate for large-object-managed files.
//!
//! Before a push proceeds, every managed file introduced by the pushed
//! commits must have its content present in the remote object store. Blobs
//! are uploaded from the local cache when absent; a blob in neither place
//! blocks the push.
//!
//! # Usage
//!
//! ```bash
//! # Install the pre-push hook into the current repository
//! blobgate install
//!
//! # Run the gate directly (git invokes this via the hook)
//! git push origin main
//!
//! # Show configuration, cache, and last push
//! blobgate status
//!
//! # View the push log
//! blobgate log --ref refs/heads/main
//! ```

mod log_view;

use anyhow::{anyhow, Context, Result};
use blobgate_core::{
    repo_toplevel, Config, GitRepo, GsutilRemote, LocalCache, PushLog, PushLogEntry,
    RefUpdate, SyncEngine,
};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "blobgate")]
#[command(author = "Blobgate Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Pre-push large-object synchronization gate")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pre-push gate (invoked by git with ref updates on stdin)
    #[command(name = "pre-push")]
    PrePush,

    /// Install the pre-push hook into the current repository
    Install {
        /// Overwrite an existing pre-push hook
        #[arg(long)]
        force: bool,
    },

    /// Show configuration, cache statistics, and the latest push
    Status,

    /// View the push log
    Log {
        /// Only show entries for this ref
        #[arg(long = "ref")]
        ref_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("blobgate=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::PrePush => cmd_pre_push().await,
        Commands::Install { force } => cmd_install(force),
        Commands::Status => cmd_status().await,
        Commands::Log { ref_name } => cmd_log(ref_name),
    }
}

/// The hook entry point. Wires the gate to stdin and exits non-zero to
/// block the push when any ref fails.
async fn cmd_pre_push() -> Result<()> {
    let root = repo_toplevel()?;
    let config =
        Config::discover(&root).context("blobgate is not configured for this repository")?;
    config.ensure_cache_dir()?;

    let repo = GitRepo::new(root.clone(), config.filter.clone());
    let git_dir = repo.git_dir()?;
    let cache = LocalCache::new(config.cache_dir.clone());
    let remote = GsutilRemote::new(&config.remote);
    let engine = SyncEngine::new(&repo, &repo, &cache, &remote, &root);
    let push_log = PushLog::new(&git_dir);

    let stdin = std::io::stdin();
    let all_passed = run_gate(stdin.lock(), &engine, &push_log, &mut std::io::stderr()).await?;

    if !all_passed {
        eprintln!("Push aborted: large-object store is out of sync.");
        std::process::exit(1);
    }
    Ok(())
}

/// Drive the gate over ref-update lines from `input`. Every ref in the
/// batch is processed to its own verdict and push-log entry; returns
/// whether all of them passed.
async fn run_gate(
    input: impl BufRead,
    engine: &SyncEngine<'_>,
    push_log: &PushLog,
    out: &mut dyn Write,
) -> Result<bool> {
    let mut all_passed = true;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let update = RefUpdate::parse(&line)?;

        let start = std::time::Instant::now();
        let result = engine.process_ref(&update, &mut *out).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (summary, error) = match &result {
            Ok(s) => (*s, None),
            Err(e) => (Default::default(), Some(format!("{:#}", e))),
        };
        push_log.append(&PushLogEntry::new(
            update.remote_ref.clone(),
            update.local_rev.clone(),
            summary,
            duration_ms,
            error,
        ))?;
        let summary = result?;
        tracing::info!(
            refname = %update.remote_ref,
            uploaded = summary.uploaded,
            already = summary.already_remote,
            passed = summary.passed(),
            "processed ref update"
        );

        writeln!(out, "{}", summary)?;
        if summary.missing_locally > 0 {
            writeln!(
                out,
                "error: {} object(s) for {} are in neither the remote store nor the \
                 local cache; re-cache them before pushing.",
                summary.missing_locally, update.remote_ref
            )?;
        }
        if summary.upload_failed > 0 {
            writeln!(
                out,
                "error: {} upload(s) for {} failed; re-run the push to retry.",
                summary.upload_failed, update.remote_ref
            )?;
        }
        all_passed &= summary.passed();
    }

    Ok(all_passed)
}

fn cmd_install(force: bool) -> Result<()> {
    let root = repo_toplevel()?;
    let repo = GitRepo::new(root, blobgate_core::config::DEFAULT_FILTER.to_string());
    let git_dir = repo.git_dir()?;
    install_hook(&git_dir, force)?;
    println!("Installed pre-push hook in {}", git_dir.join("hooks").display());
    Ok(())
}

const HOOK_SCRIPT: &str = "#!/bin/sh\n\
# Installed by blobgate. Verifies large-object sync before a push proceeds.\n\
exec blobgate pre-push \"$@\"\n";

/// Write the pre-push hook script, refusing to clobber a foreign hook
/// unless `force` is set. Re-installing over our own hook is always fine.
fn install_hook(git_dir: &Path, force: bool) -> Result<()> {
    let hooks_dir = git_dir.join("hooks");
    std::fs::create_dir_all(&hooks_dir)?;
    let hook_path = hooks_dir.join("pre-push");

    if hook_path.exists() && !force {
        let existing = std::fs::read_to_string(&hook_path).unwrap_or_default();
        if !existing.contains("blobgate") {
            return Err(anyhow!(
                "A pre-push hook already exists at {}; re-run with --force to replace it",
                hook_path.display()
            ));
        }
    }

    std::fs::write(&hook_path, HOOK_SCRIPT)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&hook_path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

async fn cmd_status() -> Result<()> {
    let root = repo_toplevel()?;
    println!("Repository: {}", root.display());

    let config = match Config::discover(&root) {
        Ok(c) => c,
        Err(e) => {
            println!("\nNot configured: {}", e);
            return Ok(());
        }
    };

    println!("\nConfiguration:");
    println!("  Cache dir: {}", config.cache_dir.display());
    println!("  Remote:    {}", config.remote);
    println!("  Filter:    {}", config.filter);

    let cache = LocalCache::new(config.cache_dir.clone());
    let (count, bytes) = cache.stats()?;
    println!("\nLocal cache:");
    println!("  Entries: {}", count);
    println!("  Size:    {}", format_size(bytes));

    let repo = GitRepo::new(root, config.filter.clone());
    let push_log = PushLog::new(&repo.git_dir()?);
    match push_log.latest()? {
        Some(entry) => {
            println!("\nLatest push:");
            println!("  {}", log_view::format_entry(&entry));
        }
        None => {
            println!("\nNo pushes logged yet.");
        }
    }

    Ok(())
}

fn cmd_log(ref_name: Option<String>) -> Result<()> {
    let root = repo_toplevel()?;
    let repo = GitRepo::new(root, blobgate_core::config::DEFAULT_FILTER.to_string());
    let git_dir = repo.git_dir()?;
    log_view::print_push_log(&git_dir, ref_name.as_deref(), &mut std::io::stdout())?;
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
