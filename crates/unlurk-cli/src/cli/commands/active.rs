use std::sync::Arc;

use anyhow::Context;
use tracing::debug;
use unlurk_core::{ActiveQuery, ActivityService, Clock, SnapshotSource, SystemClock};

use super::super::args::ActiveArgs;
use super::super::output::print_active;
use super::{build_resolver, load_config};
use crate::exit_codes::EXIT_SUCCESS;

pub async fn run(args: ActiveArgs) -> anyhow::Result<i32> {
    let config = load_config(args.front_page.front_page_url.as_deref());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let source = SnapshotSource::load(&args.source.snapshot)
        .await
        .context("failed to load item snapshot")?;

    let mut service = ActivityService::new(source, Arc::clone(&clock), &config);
    if args.offline {
        debug!("front page scrape disabled");
    } else {
        let resolver = build_resolver(&config, clock, &args.front_page)?;
        service = service.with_resolver(Arc::new(resolver));
    }

    let query = ActiveQuery {
        window: *args.window,
        max_age: *args.max_age,
        min_by: args.min_by,
        show_authors: !args.hide_authors,
    };
    let response = service.active(&query).await?;

    print_active(&response, args.format)?;
    Ok(EXIT_SUCCESS)
}
