//! Process bootstrap: parse args, stand up tracing/metrics, load config,
//! then hand off to the subcommand dispatcher.

use clap::Parser;
use wayfarer_telemetry::{policy::TelemetryPolicy, tracing_init::init_tracing};

use super::args::CliArgs;
use super::dispatch;
use crate::errors::{classify, ExitCode};

pub async fn run() -> i32 {
    let args = CliArgs::parse();

    if std::env::var("WAYFARER_LOG").is_err() {
        std::env::set_var("WAYFARER_LOG", &args.log_level);
    }

    wayfarer_telemetry::policy::set_policy(TelemetryPolicy {
        prom_bind: format!("127.0.0.1:{}", args.metrics_port),
        ..TelemetryPolicy::default()
    });
    init_tracing();

    let config = match wayfarer_config::load_snapshot(args.config.as_deref()) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            tracing::error!(?err, "failed to load configuration");
            return ExitCode::LaunchFailure.code();
        }
    };

    match dispatch::dispatch(args, config).await {
        Ok(code) => code.code(),
        Err(err) => {
            tracing::error!(?err, "run failed");
            classify(&err).code()
        }
    }
}
