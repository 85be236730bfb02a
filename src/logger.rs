use tracing_subscriber::{
    Layer, Registry,
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::{LoggerConfig, LoggerFormat};

pub fn init_logger(opts: LoggerConfig) {
    let filter = tracing_subscriber::EnvFilter::new(opts.level.clone());
    // Logs go to stderr, stdout carries the decoded output.
    let layer = match opts.format {
        LoggerFormat::Pretty => fmt::Layer::default()
            .pretty()
            .with_writer(std::io::stderr)
            .boxed(),
        LoggerFormat::Json => fmt::Layer::default()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LoggerFormat::Compact => fmt::Layer::default()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
    }
    .with_filter(filter);

    Registry::default().with(layer).init();
}
