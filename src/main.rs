use clap::Parser;
use keystone::cli::Cli;
use keystone::config::Config;
use mimalloc::MiMalloc;
use opentelemetry::trace::TracerProvider as _;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;

    let telemetry = cfg.telemetry.clone();
    let provider =
        tokio::task::spawn_blocking(move || keystone::telemetry::tracer_provider(&telemetry))
            .await??;
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(env!("CARGO_PKG_NAME"))));

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .with(otel_layer)
        .init();

    if let Some(provider) = &provider {
        opentelemetry::global::set_tracer_provider(provider.clone());
        info!(
            endpoint = cfg.telemetry.otlp_endpoint.as_deref().unwrap_or_default(),
            service = %cfg.telemetry.service_name,
            "OTLP trace export enabled"
        );
    }

    let result = cli.command.run(cfg).await;

    if let Some(provider) = provider {
        // Flushes the spans still queued in the batch processor.
        if let Err(e) = tokio::task::spawn_blocking(move || provider.shutdown()).await? {
            warn!(error = %e, "OTLP exporter shutdown failed");
        }
    }

    result?;
    Ok(())
}
