mod cli;

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use bridge_desktop::TokioFileSystem;
use bridge_traits::time::{Clock, SystemClock};
use clap::Parser;
use cli::{Cli, Commands};
use core_runtime::{init_logging, LogLevel, SyncConfig};
use core_service::{CoreDependencies, CoreService, Pass, RunReport};
use core_sync::backup;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = SyncConfig::from_toml_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if cli.verbose {
        config.logging.level = LogLevel::Debug;
        config.logging.filter = None;
    }
    init_logging(config.logging.clone())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cli.command, config))
}

async fn run(command: Commands, config: SyncConfig) -> anyhow::Result<()> {
    // Backup housekeeping needs no catalog session
    let fs = TokioFileSystem::new();
    match &command {
        Commands::Restore => {
            let restored = backup::restore_originals(&fs, &config.parent_dir).await?;
            println!("restored {restored} records");
            return Ok(());
        }
        Commands::RemoveBackups => {
            let removed = backup::remove_backups(&fs, &config.parent_dir).await?;
            println!("removed {removed} backups");
            return Ok(());
        }
        Commands::Archive => {
            let today = SystemClock.today();
            let target =
                backup::archive_snapshot(&fs, &config.parent_dir, &config.stash_dir(), today)
                    .await?;
            println!("archived records to {}", target.display());
            return Ok(());
        }
        _ => {}
    }

    let service = CoreService::connect(config, CoreDependencies::desktop()?).await?;
    let top = |id: Option<String>| id.unwrap_or_else(|| service.landing_id().to_string());

    match command {
        Commands::Run => {
            let report = service.run().await?;
            print_report(&report);
            if report.has_failures() {
                bail!("{} documents failed", report.failed_documents());
            }
        }
        Commands::DeleteChildren(args) => {
            let report = service.delete_children(&top(args.id)).await?;
            println!("deleted {} pages", report.deleted);
            if !report.cleared {
                println!("the catalog still lists children; run again once it settles");
            }
        }
        Commands::FixFalseFolder(args) => {
            if service.fix_false_folder(&args.id).await? {
                println!("cleared Folder flag on {}", args.id);
            } else {
                bail!("{} still carries the Folder flag", args.id);
            }
        }
        Commands::Audit(args) => {
            let expectations: BTreeMap<String, usize> = args.expectations.into_iter().collect();
            let findings = service.audit(&top(args.id), &expectations).await?;
            for finding in &findings {
                println!(
                    "{} ({}): {} {}",
                    finding.title, finding.item_id, finding.field, finding.kind
                );
            }
            println!("{} findings", findings.len());
        }
        Commands::Inherit(args) => {
            let report = service.inherit(&top(args.id)).await?;
            println!("updated {} pages", report.updated);
            for (id, error) in &report.failures {
                println!("failed {id}: {error}");
            }
        }
        Commands::Extents(args) => {
            let report = service.set_extents(&top(args.id)).await?;
            println!("updated {} parent extents", report.updated);
        }
        Commands::Restore | Commands::RemoveBackups | Commands::Archive => {}
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("pages mapped: {}", report.mapped);
    println!(
        "documents: {} in scope, {} ok, {} failed, {} uploads",
        report.documents,
        report.succeeded_documents(),
        report.failed_documents(),
        report.uploaded()
    );
    for (pass, summary) in &report.passes {
        println!(
            "  {} pass: {} processed, {} skipped, {} failed",
            pass, summary.processed, summary.skipped, summary.failed
        );
    }
    for failure in report.failures() {
        println!(
            "  failed [{}] {}: {}",
            failure.step,
            failure.path.display(),
            failure.message
        );
    }
    for warning in report.warnings() {
        println!("  warning {}: {}", warning.path, warning.message);
    }
    if let Some(data) = report.pass(Pass::Data) {
        for file in &data.oversize_files {
            println!("  too large to upload: {}", file.display());
        }
    }
    if let Some(inheritance) = &report.inheritance {
        println!("inherited fields on {} pages", inheritance.updated);
    }
    if let Some(extent) = &report.extent {
        println!("updated {} parent extents", extent.updated);
    }
    if let Some(snapshot) = &report.snapshot {
        println!("snapshot: {}", snapshot.display());
    }
}
