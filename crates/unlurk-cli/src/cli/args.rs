use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "unlurk",
    version,
    about = "Find the Hacker News threads with conversations happening right now"
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Threads with recent activity, as indented rows
    Active(ActiveArgs),
    /// Every reply under one item
    Tree(TreeArgs),
    /// Effective listing times scraped from the front page
    FrontPage(FrontPageArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(clap::Args, Clone, Debug)]
pub struct SourceArgs {
    /// JSON array of items to read threads from
    #[arg(long, env = "UNLURK_SNAPSHOT")]
    pub snapshot: PathBuf,
}

#[derive(clap::Args, Clone, Debug)]
pub struct ActiveArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Items posted within this window count as fresh (e.g. "30m")
    #[arg(long, default_value = "1h")]
    pub window: humantime::Duration,

    /// Drop threads whose effective time is older than this
    #[arg(long, default_value = "24h")]
    pub max_age: humantime::Duration,

    /// Minimum number of distinct fresh authors in a thread
    #[arg(long, default_value_t = 3)]
    pub min_by: usize,

    /// Leave author handles out of the rows
    #[arg(long)]
    pub hide_authors: bool,

    /// Skip the front page scrape; roots use their own post times
    #[arg(long)]
    pub offline: bool,

    #[command(flatten)]
    pub front_page: FrontPageSourceArgs,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Clone, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Item to start from
    pub id: u64,

    /// Leave author handles out of the rows
    #[arg(long)]
    pub hide_authors: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Where and how long to scrape the listing page.
#[derive(clap::Args, Clone, Debug)]
pub struct FrontPageSourceArgs {
    /// Listing page to scrape (overrides UNLURK_FRONT_PAGE_URL)
    #[arg(long)]
    pub front_page_url: Option<String>,

    /// Give up on the scrape after this long (e.g. "5s")
    #[arg(long)]
    pub deadline: Option<humantime::Duration>,
}

#[derive(clap::Args, Clone, Debug)]
pub struct FrontPageArgs {
    #[command(flatten)]
    pub front_page: FrontPageSourceArgs,
}
