//! `emit` command implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use dispatcher::{logger_log, Dispatcher, LogLevel};
use observability::{record_call_latency_us, record_queue_snapshot, record_sink_snapshot};
use observability::DispatchStatsAggregator;
use tracing::{error, info, warn};

use super::load_config;
use crate::cli::EmitArgs;
use crate::error::CliError;

/// Execute the `emit` command
pub async fn run_emit(args: &EmitArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ConfigLoader::load_or_default().context("Failed to load default config")?,
    };

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let dispatcher = Arc::new(
        Dispatcher::from_config(&config).context("Failed to set up configured sinks")?,
    );
    if args.asynchronous {
        dispatcher
            .enable_async()
            .context("Failed to enable queued delivery")?;
    }

    info!(
        sinks = ?dispatcher.sink_names(),
        producers = args.producers,
        count = args.count,
        asynchronous = dispatcher.is_async(),
        "Emitting records"
    );

    let stop = Arc::new(AtomicBool::new(false));
    let start = Instant::now();

    let handles: Vec<_> = (0..args.producers)
        .map(|producer| {
            let dispatcher = Arc::clone(&dispatcher);
            let stop = Arc::clone(&stop);
            let count = args.count;
            let level = args.level;
            let message = args.message.clone();
            tokio::task::spawn_blocking(move || {
                produce(&dispatcher, &stop, producer, count, level, &message)
            })
        })
        .collect();

    let join_all = async {
        let mut total = DispatchStatsAggregator::new();
        for handle in handles {
            let stats = handle
                .await
                .map_err(|e| CliError::producer(e.to_string()))?;
            total.merge(&stats);
        }
        Ok::<_, CliError>(total)
    };
    tokio::pin!(join_all);

    let mut stats = tokio::select! {
        result = &mut join_all => result?,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping producers...");
            stop.store(true, Ordering::Relaxed);
            join_all.await?
        }
    };
    let produced_in = start.elapsed();

    // flush waits for the queue to drain, so the snapshots below are final
    let flusher = Arc::clone(&dispatcher);
    tokio::task::spawn_blocking(move || flusher.flush())
        .await
        .context("Flush task failed")?;

    let sinks = dispatcher.metrics();
    let queue = dispatcher.queue_metrics();
    for (sink, snapshot) in &sinks {
        record_sink_snapshot(sink, snapshot);
    }
    record_queue_snapshot(&queue);
    stats.update_snapshots(sinks, queue);

    let closer = Arc::clone(&dispatcher);
    tokio::task::spawn_blocking(move || closer.close())
        .await
        .context("Close task failed")?;

    let summary = stats.summary();
    info!(
        calls = summary.total_calls,
        duration_secs = produced_in.as_secs_f64(),
        rate = format!("{:.0}", throughput(summary.total_calls, produced_in)),
        "Emit finished"
    );
    for (sink, snapshot) in &summary.sinks {
        if snapshot.failure_count > 0 {
            error!(sink = %sink, failed = snapshot.failure_count, "Sink reported write failures");
        }
    }
    println!("{summary}");
    Ok(())
}

fn produce(
    dispatcher: &Dispatcher,
    stop: &AtomicBool,
    producer: usize,
    count: u64,
    level: LogLevel,
    message: &str,
) -> DispatchStatsAggregator {
    let mut stats = DispatchStatsAggregator::new();
    for seq in 0..count {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let started = Instant::now();
        logger_log!(dispatcher, level, "producer={} seq={} {}", producer, seq, message);
        let latency_us = started.elapsed().as_secs_f64() * 1_000_000.0;
        record_call_latency_us(latency_us);
        stats.push_latency_us(latency_us);
    }
    stats
}

fn throughput(calls: u64, elapsed: Duration) -> f64 {
    if elapsed.as_secs_f64() > 0.0 {
        calls as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
