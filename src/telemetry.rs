//! Optional OTLP span export for the `tracing` subscriber.

use crate::config::TelemetryConfig;
use opentelemetry_otlp::{ExporterBuildError, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::collections::HashMap;

/// Batch-exporting tracer provider, or `None` when no collector is configured.
///
/// Spans are buffered and shipped from a background thread over a blocking
/// HTTP client, so build and shut down the provider off the async workers.
/// Call `shutdown` before exit to flush the last batch.
pub fn tracer_provider(
    cfg: &TelemetryConfig,
) -> Result<Option<SdkTracerProvider>, ExporterBuildError> {
    let Some(endpoint) = cfg
        .otlp_endpoint
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
    else {
        return Ok(None);
    };

    let headers: HashMap<String, String> = cfg
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_headers(headers)
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_service_name(cfg.service_name.clone())
                .build(),
        )
        .build();

    Ok(Some(provider))
}
