use env_logger::{Builder, Env};
use log::LevelFilter;

/// Map the number of `-v` flags to a log level.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialise the global logger. `RUST_LOG` wins over `-v` when set.
pub fn init(verbosity: u8) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(level_for(verbosity));
    }
    builder.format_timestamp(None).format_target(false);

    // a logger may already be installed
    let _ = builder.try_init();
}
