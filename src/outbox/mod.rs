//! Outbox Processor
//!
//! Single background worker that drains pending compensation events on a
//! fixed tick. Events are processed in creation order with bounded retries;
//! an event that exhausts its retries is marked FAILED with the error
//! message so nothing loops forever in PENDING.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::coordinator::{RevertRequest, TransactionCoordinator};
use crate::error::AppError;
use crate::ledger::models::EVENT_TYPE_WITHDRAW_REVERT;
use crate::ledger::{OutboxEvent, OutboxRepo, TransactionType};

/// Configuration for the outbox processor
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// How often to poll for pending events
    pub tick: Duration,
    /// Maximum events drained per tick
    pub batch_size: i64,
    /// Retries before an event is marked FAILED
    pub max_retries: i32,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(5),
            batch_size: 100,
            max_retries: 5,
        }
    }
}

/// Payload of a WITHDRAW_REVERT event
#[derive(Debug, Deserialize)]
struct WithdrawRevertData {
    user_id: i64,
    amount: Decimal,
    provider_tx_id: String,
}

/// Background drainer for deferred compensation
pub struct OutboxProcessor {
    pool: PgPool,
    coordinator: Arc<TransactionCoordinator>,
    config: OutboxConfig,
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl OutboxProcessor {
    pub fn new(pool: PgPool, coordinator: Arc<TransactionCoordinator>) -> Self {
        Self::with_config(pool, coordinator, OutboxConfig::default())
    }

    pub fn with_config(
        pool: PgPool,
        coordinator: Arc<TransactionCoordinator>,
        config: OutboxConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            pool,
            coordinator,
            config,
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    /// Start the background processing loop. Idempotent.
    pub fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock().unwrap();
        if handle.is_some() {
            warn!("Outbox processor is already running");
            return;
        }

        // Clear any flag left behind by a previous stop so a restarted
        // worker drains again
        let _ = self.shutdown_tx.send(false);

        let processor = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(processor.config.tick);
            // The first tick fires immediately; skip it so start() returns
            // before any database traffic happens.
            ticker.tick().await;

            info!(
                tick_secs = processor.config.tick.as_secs(),
                max_retries = processor.config.max_retries,
                "Outbox background processing started"
            );

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("Outbox background processing stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = processor.process_events().await {
                            error!(error = %e, "Outbox tick failed");
                        }
                    }
                }
            }
        }));
    }

    /// Stop the background loop and wait for the current tick to drain.
    /// Idempotent.
    pub async fn stop(&self) {
        let handle = self.handle.lock().unwrap().take();
        match handle {
            Some(h) => {
                info!("Stopping outbox background processing...");
                let _ = self.shutdown_tx.send(true);
                let _ = h.await;
            }
            None => {
                warn!("Outbox processor is not running");
            }
        }
    }

    /// Drain one batch of pending events in creation order
    pub async fn process_events(&self) -> Result<(), AppError> {
        let events = OutboxRepo::get_pending(&self.pool, self.config.batch_size).await?;
        if events.is_empty() {
            debug!("No pending outbox events");
            return Ok(());
        }

        info!(count = events.len(), "Draining outbox events");

        for event in &events {
            if *self.shutdown_tx.subscribe().borrow() {
                info!("Shutdown requested, stopping drain");
                return Ok(());
            }

            match self.process_event(event).await {
                Ok(()) => {
                    OutboxRepo::mark_processed(&self.pool, &event.id).await?;
                }
                Err(e) => {
                    error!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        retry_count = event.retry_count,
                        error = %e,
                        "Failed to process outbox event"
                    );

                    if event.retry_count < self.config.max_retries {
                        OutboxRepo::increment_retry(&self.pool, &event.id).await?;
                    } else {
                        OutboxRepo::mark_failed(&self.pool, &event.id, &e.to_string()).await?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Dispatch a single event by type
    pub async fn process_event(&self, event: &OutboxEvent) -> Result<(), AppError> {
        debug!(event_id = %event.id, event_type = %event.event_type, "Processing outbox event");

        if event.event_type == EVENT_TYPE_WITHDRAW_REVERT {
            return self.handle_withdraw_revert(event).await;
        }

        warn!(event_id = %event.id, event_type = %event.event_type, "Unknown event type");
        Err(AppError::InvalidFormat(format!(
            "unknown event type: {}",
            event.event_type
        )))
    }

    /// Revert a withdraw by depositing the amount back
    async fn handle_withdraw_revert(&self, event: &OutboxEvent) -> Result<(), AppError> {
        let data: WithdrawRevertData = serde_json::from_value(event.data.clone())
            .map_err(|e| AppError::InvalidFormat(format!("invalid event data: {e}")))?;

        // Lost bet, nothing was paid out: no wallet call needed
        if data.amount == Decimal::ZERO {
            info!(
                event_id = %event.id,
                provider_tx_id = %data.provider_tx_id,
                "Revert amount is 0 (lost bet), skipping wallet call"
            );
            return Ok(());
        }

        self.coordinator
            .revert(RevertRequest {
                user_id: data.user_id,
                provider_tx_id: data.provider_tx_id.clone(),
                amount: data.amount,
                origin_type: TransactionType::Withdraw,
            })
            .await?;

        info!(
            event_id = %event.id,
            provider_tx_id = %data.provider_tx_id,
            "Withdraw reverted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OutboxConfig::default();
        assert_eq!(config.tick, Duration::from_secs(5));
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_withdraw_revert_data_parses() {
        let data: WithdrawRevertData = serde_json::from_value(serde_json::json!({
            "user_id": 34633089486i64,
            "amount": 10.00,
            "provider_tx_id": "tx4",
        }))
        .unwrap();

        assert_eq!(data.user_id, 34633089486);
        assert_eq!(data.amount, Decimal::new(1000, 2));
        assert_eq!(data.provider_tx_id, "tx4");
    }

    #[test]
    fn test_withdraw_revert_data_rejects_missing_fields() {
        let result = serde_json::from_value::<WithdrawRevertData>(serde_json::json!({
            "user_id": 1,
        }));
        assert!(result.is_err());
    }
}
