use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logs to stderr so stdout stays clean for command output.
///
/// `RUST_LOG` wins when set; otherwise `-v` raises the workspace crates to
/// `info` and `-vv` to `debug`.
pub fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "moodline=warn,moodlift=warn,moodconfig=warn",
        1 => "moodline=info,moodlift=info,moodconfig=info,warn",
        _ => "moodline=debug,moodlift=debug,moodconfig=debug,warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .without_time();

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
