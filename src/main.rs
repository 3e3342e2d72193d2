//! shardlag binary

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shardlag::client::{build_http_client, BrokerClient, DebugVarsClient};
use shardlag::config::{merge_config_with_args, ConfigFile, LagArgs, LagConfig};
use shardlag::consumer::LagPass;
use shardlag::coordination::EtcdKeysClient;
use shardlag::error::ErrorHint;
use shardlag::{report, Result, ShardlagError};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("shardlag failed: {}", e.with_hint());
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let mut args = LagArgs::parse();

    if args.generate_config {
        println!("{}", ConfigFile::generate_example());
        return Ok(ExitCode::SUCCESS);
    }

    let config_file = if let Some(ref path) = args.config {
        Some(ConfigFile::load(path)?)
    } else {
        ConfigFile::load_default()
    };
    if let Some(ref config) = config_file {
        args = merge_config_with_args(args, config);
    }

    let log_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter)
        .init();

    let config = LagConfig::from_args(args)?;

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return Err(ShardlagError::Internal(format!(
                "Failed to create Tokio runtime: {}",
                e
            )));
        }
    };

    runtime.block_on(run_async(config))
}

async fn run_async(config: LagConfig) -> Result<ExitCode> {
    let http = build_http_client(config.request_timeout)?;
    let pass = LagPass::new(
        Arc::new(EtcdKeysClient::new(config.etcd_endpoint.clone(), http.clone())),
        Arc::new(BrokerClient::new(config.broker_endpoint.clone(), http.clone())),
        Arc::new(DebugVarsClient::new(config.debug_port, http)),
        config.pass_config(),
    );

    match config.monitor.clone() {
        Some(monitor) => run_monitor(pass, config.prefixes.clone(), monitor).await,
        None => run_once(&pass, &config).await,
    }
}

#[cfg(feature = "metrics")]
async fn run_monitor(
    pass: LagPass,
    prefixes: Vec<String>,
    monitor: shardlag::config::MonitorConfig,
) -> Result<ExitCode> {
    shardlag::monitor::run_monitor(pass, prefixes, monitor).await?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(not(feature = "metrics"))]
async fn run_monitor(
    _pass: LagPass,
    _prefixes: Vec<String>,
    _monitor: shardlag::config::MonitorConfig,
) -> Result<ExitCode> {
    Err(ShardlagError::Config(
        "monitor mode requires shardlag to be built with the `metrics` feature".to_string(),
    ))
}

/// Report every consumer once. A consumer whose pass failed is reported on
/// stderr and makes the exit code non-zero.
async fn run_once(pass: &LagPass, config: &LagConfig) -> Result<ExitCode> {
    let results = pass.run_all(&config.prefixes).await?;
    if results.is_empty() {
        warn!(prefixes = ?config.prefixes, "No consumers found");
    }

    let mut lags = Vec::with_capacity(results.len());
    let mut failed = 0usize;
    for (consumer, result) in results {
        match result {
            Ok(lag) => lags.push(lag),
            Err(e) => {
                failed += 1;
                eprintln!("Consumer {}: {}", consumer, e.with_hint());
            }
        }
    }

    println!("{}", report::render(config.format, &lags)?);
    info!(consumers = lags.len(), failed, "Report complete");

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
