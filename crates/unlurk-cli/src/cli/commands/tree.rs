use std::sync::Arc;

use anyhow::Context;
use unlurk_core::{ActivityService, SnapshotSource, SystemClock};

use super::super::args::TreeArgs;
use super::super::output::print_tree;
use super::load_config;
use crate::exit_codes::EXIT_SUCCESS;

pub async fn run(args: TreeArgs) -> anyhow::Result<i32> {
    let config = load_config(None);
    let source = SnapshotSource::load(&args.source.snapshot)
        .await
        .context("failed to load item snapshot")?;

    let service = ActivityService::new(source, Arc::new(SystemClock), &config);
    let rows = service.item_tree(args.id, !args.hide_authors).await?;

    print_tree(&rows, args.format)?;
    Ok(EXIT_SUCCESS)
}
