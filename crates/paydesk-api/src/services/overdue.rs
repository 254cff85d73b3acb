//! Overdue sweeper
//!
//! Background worker that periodically moves `sent`/`pending` invoices past
//! their due date to `overdue`.

use chrono::{NaiveDate, Utc};
use paydesk_core::AppError;
use paydesk_db::InvoiceStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Handle to the running sweeper. Dropping it stops the worker.
pub struct OverdueSweeper {
    shutdown_tx: mpsc::Sender<()>,
}

impl OverdueSweeper {
    /// Spawn the worker. Returns `None` when `interval_secs` is 0 (disabled).
    pub fn start(invoices: Arc<dyn InvoiceStore>, interval_secs: u64) -> Option<Self> {
        if interval_secs == 0 {
            tracing::info!("Overdue sweeper disabled");
            return None;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(async move {
            Self::worker_loop(invoices, Duration::from_secs(interval_secs), shutdown_rx).await;
        });

        Some(Self { shutdown_tx })
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    async fn worker_loop(
        invoices: Arc<dyn InvoiceStore>,
        period: Duration,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = period.as_secs(), "Overdue sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = sweep_once(invoices.as_ref(), Utc::now().date_naive()).await {
                        tracing::error!(error = %e, "Overdue sweep failed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Overdue sweeper shutting down");
                    break;
                }
            }
        }
    }
}

/// Run one sweep for `today`; returns how many invoices became overdue.
pub async fn sweep_once(invoices: &dyn InvoiceStore, today: NaiveDate) -> Result<u64, AppError> {
    let marked = invoices.mark_overdue(today).await?;
    if marked > 0 {
        tracing::info!(count = marked, %today, "Invoices marked overdue");
    } else {
        tracing::debug!(%today, "No overdue invoices");
    }
    Ok(marked)
}
