//! Fetch command implementation

use crate::cli::watch::{init_tracing, load_config, shutdown_signal};
use crate::cli::{output, FetchArgs};
use crate::config::EdgePulseConfig;
use crate::fetch::{FetchScheduler, HttpFetcher, RequestDeduplicator, ResourceRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &FetchArgs,
) -> Result<EdgePulseConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;

    if let Some(ref api_url) = args.api_url {
        config.polling.base_url = api_url.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

/// Build the request described by the command line
pub fn build_request(args: &FetchArgs) -> ResourceRequest {
    let mut request = args
        .query
        .iter()
        .fold(ResourceRequest::new(args.resource.clone()), |req, (k, v)| {
            req.with_query(k.clone(), v.clone())
        });
    if let Some(ref key) = args.cache_key {
        request = request.with_cache_key(key.clone());
    }
    request
}

/// Main fetch command handler
pub async fn run_fetch(args: FetchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;
    init_tracing(&config.logging)?;

    let fetcher = Arc::new(HttpFetcher::new(
        config.polling.base_url.clone(),
        config.polling.request_timeout_seconds,
    )?);
    let dedup = Arc::new(RequestDeduplicator::new(config.polling.cache_ttl()));
    let scheduler = FetchScheduler::new(dedup, fetcher);
    let request = build_request(&args);

    let Some(interval_ms) = args.interval_ms else {
        let data = scheduler.fetch(&request, false).await?;
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    };

    if interval_ms == 0 {
        return Err("--interval-ms must be non-zero".into());
    }

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    let mut subscription = scheduler.subscribe(request, Some(Duration::from_millis(interval_ms)));

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            update = subscription.changed() => match update {
                Some(state) => {
                    if let Some(rendered) = output::format_poll_update(&state) {
                        println!("{}", rendered);
                    }
                }
                None => break,
            },
        }
    }

    subscription.close();
    cancel_token.cancel();
    Ok(())
}
