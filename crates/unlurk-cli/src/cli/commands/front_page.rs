use std::collections::BTreeMap;
use std::sync::Arc;

use unlurk_core::{Clock, SystemClock};

use super::super::args::FrontPageArgs;
use super::super::output::print_json;
use super::{build_resolver, load_config};
use crate::exit_codes::EXIT_SUCCESS;

pub async fn run(args: FrontPageArgs) -> anyhow::Result<i32> {
    let config = load_config(args.front_page.front_page_url.as_deref());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let resolver = build_resolver(&config, Arc::clone(&clock), &args.front_page)?;
    let times = resolver.resolve_times(clock.now()).await?;

    // Stable output order
    let sorted: BTreeMap<_, _> = times.iter().map(|(id, time)| (*id, *time)).collect();
    print_json(&sorted)?;
    Ok(EXIT_SUCCESS)
}
