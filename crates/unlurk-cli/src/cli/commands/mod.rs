use std::sync::Arc;

use anyhow::Context;
use unlurk_core::{Clock, FrontPageTimeResolver, UnlurkConfig};

use super::args::*;

pub mod active;
pub mod front_page;
pub mod tree;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Active(args) => active::run(args).await,
        Command::Tree(args) => tree::run(args).await,
        Command::FrontPage(args) => front_page::run(args).await,
    }
}

/// Environment configuration with command-line overrides applied.
pub(crate) fn load_config(front_page_url: Option<&str>) -> UnlurkConfig {
    let config = UnlurkConfig::from_env();
    match front_page_url {
        Some(url) => config.with_front_page_url(url),
        None => config,
    }
}

/// Listing resolver bounded by `--deadline` when given.
pub(crate) fn build_resolver(
    config: &UnlurkConfig,
    clock: Arc<dyn Clock>,
    args: &FrontPageSourceArgs,
) -> anyhow::Result<FrontPageTimeResolver> {
    let resolver = FrontPageTimeResolver::new(config, clock)
        .context("failed to set up front page resolver")?;

    Ok(match args.deadline {
        Some(deadline) => resolver.with_deadline(*deadline),
        None => resolver,
    })
}
