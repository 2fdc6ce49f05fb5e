//! Sets up tracing for the provider using stdout/stderr

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

use crate::config::TracingConf;

/// Turn a config level string into a [`LevelFilter`], defaulting to info on garbage input
fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::INFO)
}

/// Setup the local stdout tracer/subscriber
///
/// # Arguments
///
/// * `name` - The name of the service to trace
/// * `conf` - The tracing settings to apply
pub fn setup(name: &str, conf: &TracingConf) {
    // build our stdout fmt layer filtered to the configured level
    let filter = parse_level(&conf.level);
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .try_init()
        .expect("Failed to register stdout tracing subscriber");
    tracing::event!(tracing::Level::INFO, msg = "Tracing initialized", name);
}
