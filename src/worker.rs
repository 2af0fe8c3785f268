use std::time::Duration;

use tokio::sync::watch;

use crate::processor::QueueProcessor;

/// Start the queue scheduler on a dedicated Tokio runtime with its own thread pool.
/// This runs on a separate OS thread and blocks until shutdown is signaled.
pub fn run_pool(
    processor: QueueProcessor,
    shutdown: watch::Receiver<bool>,
    worker_threads: usize,
    interval: Duration,
    batch_size: usize,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("posting-scheduler".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(worker_threads.max(1))
                .thread_name("posting-worker")
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!("Failed to build scheduler runtime: {e}");
                    return;
                }
            };

            runtime.block_on(async {
                tracing::info!(
                    "Posting scheduler started (every {interval:?}, batch of {batch_size})"
                );
                run(processor, shutdown, interval, batch_size).await;
                tracing::info!("Posting scheduler stopped");
            });
        })
}

/// Trigger a batch every `interval`. A full batch means more work is likely
/// waiting, so the next one starts right away.
pub async fn run(
    processor: QueueProcessor,
    mut shutdown: watch::Receiver<bool>,
    interval: Duration,
    batch_size: usize,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        match processor.process_queue(batch_size).await {
            Ok(n) if n > 0 && n >= batch_size => continue,
            Ok(n) => {
                if n > 0 {
                    tracing::debug!("Processed {n} queue items");
                }
            }
            Err(e) => {
                tracing::error!("Failed to read posting queue: {e}");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}
