use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{Registry, filter::Targets, prelude::*, reload};

/// Handle to change the log level of the running service.
pub struct LogLevel {
    reload: reload::Handle<Targets, Registry>,
}

impl LogLevel {
    pub fn set(&self, level: Level) -> Result<()> {
        self.reload.reload(targets(level))?;
        Ok(())
    }
}

/// Install the global subscriber, logging this crate at the given level.
pub fn init(level: Level) -> LogLevel {
    let (filter, reload) = reload::Layer::new(targets(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    LogLevel { reload }
}

/// Filter layer and handle that are not installed globally, for use in tests.
#[cfg(test)]
pub fn detached(level: Level) -> (reload::Layer<Targets, Registry>, LogLevel) {
    let (filter, reload) = reload::Layer::new(targets(level));
    (filter, LogLevel { reload })
}

fn targets(level: Level) -> Targets {
    Targets::new()
        .with_target(env!("CARGO_CRATE_NAME"), level)
        .with_target("tower_http", Level::DEBUG)
        .with_default(Level::INFO)
}
