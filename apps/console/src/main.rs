use std::{path::PathBuf, rc::Rc, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    wait_all, BusyIndicator, FlashQueue, HttpBoundary, HttpPipeline, LogInterceptor,
    ReqwestTransport, Scheduler, TransitionBus,
};
use tokio::task::LocalSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

/// Fetches resources in parallel and reports the outcome as a flash notice.
#[derive(Parser, Debug)]
struct Args {
    /// Resource paths, relative to the base url.
    #[arg(required = true)]
    paths: Vec<String>,
    #[arg(long, default_value = "console.toml")]
    config: PathBuf,
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config)?;
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    LocalSet::new().run_until(run(args.paths, settings)).await
}

async fn run(paths: Vec<String>, settings: Settings) -> Result<()> {
    let scheduler = Scheduler::new();
    tokio::task::spawn_local(scheduler.clone().run());

    let transport = ReqwestTransport::new()
        .with_base_url(&settings.base_url)
        .context("invalid base url")?
        .with_timeout(Duration::from_millis(settings.request_timeout_ms));

    let busy = BusyIndicator::new();
    let pipeline = HttpPipeline::builder()
        .push_shared(Rc::new(busy.clone()))
        .push(LogInterceptor)
        .build();
    let http = HttpBoundary::new(&scheduler, Arc::new(transport), pipeline)
        .with_default_header("accept", "application/json");

    let routes = TransitionBus::new();
    let flash = FlashQueue::new();
    flash.subscribe(&routes)?;

    let requests: Vec<_> = paths.iter().map(|path| http.get(path.as_str())).collect();
    info!(requests = requests.len(), in_flight = busy.in_flight(), "requests dispatched");

    let failure = match wait_all(&scheduler, requests).await {
        Ok(responses) => {
            for response in &responses {
                println!(
                    "{} {} -> {}",
                    response.request_config.method, response.request_config.url, response.status
                );
                println!("{}", serde_json::to_string_pretty(&response.data)?);
            }
            if settings.flash_on_success {
                flash.enqueue(format!("Loaded {} resource(s)", responses.len()));
            }
            None
        }
        Err(rejection) => {
            let code = rejection
                .error_code()
                .map(|code| format!(" ({code:?})"))
                .unwrap_or_default();
            flash.enqueue(format!(
                "Request to {} failed with status {}{code}",
                rejection.request_config.url, rejection.status
            ));
            Some(rejection.status)
        }
    };

    routes.emit_transition();
    let notice = flash.current_message();
    if !notice.is_empty() {
        println!("{notice}");
    }

    if let Some(status) = failure {
        bail!("at least one request failed (status {status})");
    }
    Ok(())
}
