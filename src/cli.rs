use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "sbsync")]
#[command(version)]
#[command(about = "Keep a local metadata release tree and its ScienceBase pages in step")]
pub struct Cli {
    #[arg(
        short = 'c',
        long,
        env = "SBSYNC_CONFIG",
        default_value = "sbsync.toml",
        help = "Release configuration file."
    )]
    pub config: PathBuf,

    #[arg(short, long, help = "Log at debug level regardless of the config file.")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Run every pass enabled in the configuration.")]
    Run,
    #[command(about = "Overwrite each record with its _orig backup.")]
    Restore,
    #[command(about = "Delete every _orig backup under the release root.")]
    RemoveBackups,
    #[command(about = "Copy the current records into a dated snapshot directory.")]
    Archive,
    #[command(about = "Delete every page below a page, deepest first.")]
    DeleteChildren(PageArgs),
    #[command(about = "Clear a stale Folder flag on a page that has no children.")]
    FixFalseFolder(RequiredPageArgs),
    #[command(about = "Report pages whose fields are missing, present or miscounted.")]
    Audit(AuditArgs),
    #[command(about = "Copy the configured inherited fields down the page tree.")]
    Inherit(PageArgs),
    #[command(about = "Set every parent page's extent from its children.")]
    Extents(PageArgs),
}

#[derive(Debug, Args)]
pub struct PageArgs {
    #[arg(long, help = "Top page id (default: the landing page).")]
    pub id: Option<String>,
}

#[derive(Debug, Args)]
pub struct RequiredPageArgs {
    #[arg(help = "Page id.")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    #[arg(long, help = "Top page id (default: the landing page).")]
    pub id: Option<String>,

    #[arg(
        long = "expect",
        value_name = "FIELD=COUNT",
        value_parser = parse_expectation,
        required = true,
        help = "Expected entry count of a field; 0 means the field must be absent."
    )]
    pub expectations: Vec<(String, usize)>,
}

pub fn parse_expectation(raw: &str) -> Result<(String, usize), String> {
    let (field, count) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=COUNT, got '{raw}'"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    let count = count
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid count in '{raw}': {e}"))?;
    Ok((field.to_string(), count))
}
