// src/publish_loop.rs
use crate::{
    config::{Config, ReconnectConfig},
    drift::DriftSource,
    error::{Result, SimError},
    publisher::{ConnectionState, Publisher},
    store::SensorStateStore,
};
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Timing and addressing for the publish loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Topic every batch goes to
    pub topic: String,
    /// Pause after each tick's send
    pub interval: Duration,
    /// Deadline for a broker acknowledgement
    pub send_timeout: Duration,
    /// Deadline for one connection attempt
    pub connect_timeout: Duration,
    /// Retry policy for connect and reconnect phases
    pub reconnect: ReconnectConfig,
}

impl LoopSettings {
    /// Derive settings from validated configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            topic: config.topic(),
            interval: config.interval(),
            send_timeout: config.send_timeout(),
            connect_timeout: config.connect_timeout(),
            reconnect: config.reconnect.clone(),
        }
    }
}

/// Counters reported when the loop stops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishStats {
    /// Batches generated
    pub ticks: u64,
    /// Batches acknowledged by the broker
    pub published: u64,
    /// Batches dropped after a failed or timed out send
    pub send_failures: u64,
    /// Sessions re-established after a drop
    pub reconnects: u64,
    /// Wall time the loop ran for
    pub uptime_secs: u64,
}

enum Connect {
    Established,
    Cancelled,
}

/// Generates one batch per tick and pushes it through a [`Publisher`].
///
/// Each tick advances every sensor, encodes the batch and sends it, then
/// sleeps for the configured interval. A failed send drops that batch and the
/// loop carries on. A lost session is re-established with bounded exponential
/// backoff; running out of attempts ends the loop with [`SimError::Connect`].
///
/// Cancellation is observed while connecting, sending, backing off and
/// sleeping. Advancing and encoding never yield, so a cancelled loop never
/// leaves a half-advanced store behind.
pub struct PublishLoop<P, D> {
    publisher: P,
    store: SensorStateStore<D>,
    settings: LoopSettings,
    cancel: CancellationToken,
    stats: PublishStats,
}

impl<P: Publisher, D: DriftSource> PublishLoop<P, D> {
    /// Create a loop with its own cancellation token.
    pub fn new(publisher: P, store: SensorStateStore<D>, settings: LoopSettings) -> Self {
        Self {
            publisher,
            store,
            settings,
            cancel: CancellationToken::new(),
            stats: PublishStats::default(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that stops the loop at its next suspension point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until cancelled or until the broker cannot be reached.
    ///
    /// Returns the final counters on cancellation, [`SimError::Connect`] when
    /// connection attempts are exhausted and [`SimError::Encoding`] if a batch
    /// cannot be serialized. The publisher is disconnected in every case.
    pub async fn run(mut self) -> Result<PublishStats> {
        let started = Instant::now();
        info!(
            "Starting publish loop: {} sensors on tank {} -> '{}' every {:?} via {}",
            self.store.len(),
            self.store.tank_id(),
            self.settings.topic,
            self.settings.interval,
            self.publisher.name()
        );

        let result = self.drive().await;
        self.publisher.disconnect().await;
        self.stats.uptime_secs = started.elapsed().as_secs();

        info!(
            "Final stats: {} ticks, {} published, {} send failures, {} reconnects, uptime: {}s",
            self.stats.ticks,
            self.stats.published,
            self.stats.send_failures,
            self.stats.reconnects,
            self.stats.uptime_secs
        );

        match result {
            Ok(()) => {
                info!("Publish loop stopped");
                Ok(self.stats)
            }
            Err(e) => {
                error!("Publish loop terminated: {}", e);
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<()> {
        if let Connect::Cancelled = self.establish(false).await? {
            return Ok(());
        }

        loop {
            self.stats.ticks += 1;
            let tick = self.stats.ticks;

            let batch = self.store.advance_all();
            let payload = batch.to_json()?;

            let sent = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                sent = timeout(
                    self.settings.send_timeout,
                    self.publisher.publish(&self.settings.topic, payload.as_bytes()),
                ) => sent,
            };

            match sent.unwrap_or(Err(SimError::Timeout(self.settings.send_timeout))) {
                Ok(()) => {
                    self.stats.published += 1;
                    info!("Sent batch #{} ({} readings) to '{}'", tick, batch.len(), self.settings.topic);
                    debug!("Sent: {}", payload);
                }
                Err(e) => {
                    self.stats.send_failures += 1;
                    warn!("Publish of batch #{} failed, dropping it: {}", tick, e);
                }
            }

            if self.publisher.state() != ConnectionState::Connected {
                warn!(
                    "{} session is {}, reconnecting",
                    self.publisher.name(),
                    self.publisher.state()
                );
                if let Connect::Cancelled = self.establish(true).await? {
                    return Ok(());
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                _ = sleep(self.settings.interval) => {}
            }
        }
    }

    async fn establish(&mut self, reconnecting: bool) -> Result<Connect> {
        let max_attempts = self.settings.reconnect.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(Connect::Cancelled),
                outcome = timeout(self.settings.connect_timeout, self.publisher.connect()) => outcome,
            };

            let err = match outcome {
                Ok(Ok(())) => {
                    if reconnecting {
                        self.stats.reconnects += 1;
                        info!("Reconnected via {} after {} attempt(s)", self.publisher.name(), attempt);
                    }
                    return Ok(Connect::Established);
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timed out after {:?}", self.settings.connect_timeout),
            };

            if attempt == max_attempts {
                warn!("Connection attempt {}/{} failed: {}", attempt, max_attempts, err);
            } else {
                let delay = self.settings.reconnect.delay_for(attempt);
                warn!(
                    "Connection attempt {}/{} failed: {}; retrying in {:?}",
                    attempt, max_attempts, err, delay
                );
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Ok(Connect::Cancelled),
                    _ = sleep(delay) => {}
                }
            }
            last_error = err;
        }

        Err(SimError::Connect(format!(
            "gave up after {} attempt(s): {}",
            max_attempts, last_error
        )))
    }
}
