// Shared fixtures for publish loop tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tank_sensor_sim::{
    config::ReconnectConfig, ConnectionState, LoopSettings, Publisher, Result, SimError,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const SENSORS: [&str; 3] = ["SN-G-001", "CO-L-23B", "S3"];
pub const TOPIC: &str = "ship/MTGREATMANTA/sensors";

/// What the next `publish` call does.
#[derive(Debug, Clone, Copy)]
pub enum PublishStep {
    /// Broker acknowledges
    Ack,
    /// Broker rejects, session stays up
    Reject,
    /// Session drops underneath the publish
    Drop,
    /// Never completes
    Hang,
}

/// Everything the publisher observed.
#[derive(Debug, Default)]
pub struct Recorded {
    pub connects: usize,
    pub disconnects: usize,
    pub publishes: Vec<(Instant, String, String)>,
}

/// Publisher driven by a script; unscripted calls succeed.
pub struct ScriptedPublisher {
    state: ConnectionState,
    connects: VecDeque<bool>,
    publishes: VecDeque<PublishStep>,
    recorded: Arc<Mutex<Recorded>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedPublisher {
    pub fn new() -> (Self, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let publisher = Self {
            state: ConnectionState::Disconnected,
            connects: VecDeque::new(),
            publishes: VecDeque::new(),
            recorded: recorded.clone(),
            cancel_after: None,
        };
        (publisher, recorded)
    }

    /// Outcomes of successive `connect` calls (true = success).
    pub fn connects(mut self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        self.connects.extend(outcomes);
        self
    }

    /// Outcomes of successive `publish` calls.
    pub fn publishes(mut self, steps: impl IntoIterator<Item = PublishStep>) -> Self {
        self.publishes.extend(steps);
        self
    }

    /// Cancel `token` once `count` publish attempts have been made.
    pub fn cancel_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    async fn connect(&mut self) -> Result<()> {
        self.recorded.lock().unwrap().connects += 1;
        if self.connects.pop_front().unwrap_or(true) {
            self.state = ConnectionState::Connected;
            Ok(())
        } else {
            self.state = ConnectionState::Failed;
            Err(SimError::Connect("connection refused".to_string()))
        }
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        let attempts = {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.publishes.push((
                Instant::now(),
                topic.to_string(),
                String::from_utf8_lossy(payload).into_owned(),
            ));
            recorded.publishes.len()
        };
        if let Some((count, token)) = &self.cancel_after {
            if attempts >= *count {
                token.cancel();
            }
        }

        match self.publishes.pop_front().unwrap_or(PublishStep::Ack) {
            PublishStep::Ack => Ok(()),
            PublishStep::Reject => Err(SimError::Send("broker rejected message".to_string())),
            PublishStep::Drop => {
                self.state = ConnectionState::Failed;
                Err(SimError::Send("connection lost".to_string()))
            }
            PublishStep::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    async fn disconnect(&mut self) {
        self.recorded.lock().unwrap().disconnects += 1;
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn settings() -> LoopSettings {
    LoopSettings {
        topic: TOPIC.to_string(),
        interval: Duration::from_secs(3),
        send_timeout: Duration::from_millis(500),
        connect_timeout: Duration::from_secs(2),
        reconnect: ReconnectConfig {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
        },
    }
}
