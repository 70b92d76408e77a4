use crate::{
    config::MqttConfig,
    error::{Result, SimError},
    publisher::{ConnectionState, Publisher},
};
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    Transport,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

const REQUEST_CAPACITY: usize = 10;
const EVENT_CAPACITY: usize = 16;
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// What the event-loop driver reports back to the publisher.
#[derive(Debug)]
enum DriverEvent {
    /// A queued publish went out with this packet id
    Sent(u16),
    Acked(u16),
    Lost(String),
}

/// One live broker session: the client handle plus the task polling its event loop.
struct Session {
    client: AsyncClient,
    events: mpsc::Receiver<DriverEvent>,
    driver: JoinHandle<()>,
    /// Publishes queued on the client whose packet id has not been reported yet
    unsent: usize,
}

impl Session {
    /// Publish at QoS 1 and wait for the PUBACK carrying this message's packet id.
    ///
    /// Acks for publishes abandoned by an earlier caller are skipped. Errors
    /// carry the reason the session was lost.
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> std::result::Result<(), String> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload.to_vec())
            .await
            .map_err(|e| e.to_string())?;
        self.unsent += 1;

        // Requests leave in queue order, so ours is the last one reported
        let mut pkid = None;
        loop {
            match self.events.recv().await {
                Some(DriverEvent::Sent(id)) => {
                    self.unsent = self.unsent.saturating_sub(1);
                    if self.unsent == 0 {
                        pkid = Some(id);
                    }
                }
                Some(DriverEvent::Acked(id)) if pkid == Some(id) => {
                    trace!("PUBACK {} for {}", id, topic);
                    return Ok(());
                }
                Some(DriverEvent::Acked(id)) => trace!("Discarding late PUBACK {}", id),
                Some(DriverEvent::Lost(reason)) => return Err(reason),
                None => return Err("event loop stopped".to_string()),
            }
        }
    }
}

/// [`Publisher`] backed by an `rumqttc` client over TLS.
pub struct MqttPublisher {
    options: MqttOptions,
    broker: String,
    session: Option<Session>,
    state: ConnectionState,
}

impl MqttPublisher {
    /// Build connection options from configuration. Nothing is dialled yet.
    pub fn new(config: &MqttConfig) -> Result<Self> {
        let mut options = MqttOptions::new(
            &config.client_id,
            &config.broker.host,
            config.broker.port,
        );
        options.set_keep_alive(Duration::from_secs(config.keepalive_secs));
        options.set_clean_session(true);

        if let Some(username) = &config.username {
            options.set_credentials(username, config.password.as_deref().unwrap_or_default());
        }

        if config.tls.enabled {
            let transport = match &config.tls.ca_cert {
                Some(path) => {
                    let ca = std::fs::read(path)?;
                    debug!("Using CA bundle {}", path.display());
                    Transport::tls(ca, None, None)
                }
                None => Transport::tls_with_default_config(),
            };
            options.set_transport(transport);
        } else {
            warn!("TLS disabled, broker credentials travel in clear text");
        }

        Ok(Self {
            options,
            broker: format!("{}:{}", config.broker.host, config.broker.port),
            session: None,
            state: ConnectionState::Disconnected,
        })
    }

    /// Broker address as `host:port`.
    pub fn broker(&self) -> &str {
        &self.broker
    }

    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            session.driver.abort();
        }
    }

    async fn await_connack(eventloop: &mut EventLoop) -> Result<()> {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    return if ack.code == ConnectReturnCode::Success {
                        Ok(())
                    } else {
                        Err(SimError::Connect(format!("broker refused connection: {:?}", ack.code)))
                    };
                }
                Ok(event) => trace!("Pre-CONNACK event: {:?}", event),
                Err(e) => return Err(SimError::Connect(e.to_string())),
            }
        }
    }

    fn spawn_driver(mut eventloop: EventLoop, tx: mpsc::Sender<DriverEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Publish(pkid))) => {
                        if tx.send(DriverEvent::Sent(pkid)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::PubAck(ack))) => {
                        if tx.send(DriverEvent::Acked(ack.pkid)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        let _ = tx.send(DriverEvent::Lost("broker closed the session".into())).await;
                        break;
                    }
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(event) => trace!("MQTT event: {:?}", event),
                    Err(e) => {
                        let _ = tx.send(DriverEvent::Lost(e.to_string())).await;
                        break;
                    }
                }
            }
            debug!("MQTT event loop driver stopped");
        })
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn connect(&mut self) -> Result<()> {
        self.teardown();
        self.state = ConnectionState::Disconnected;

        debug!("Connecting to MQTT broker {}", self.broker);
        let (client, mut eventloop) = AsyncClient::new(self.options.clone(), REQUEST_CAPACITY);

        if let Err(e) = Self::await_connack(&mut eventloop).await {
            self.state = ConnectionState::Failed;
            return Err(e);
        }

        let (tx, events) = mpsc::channel(EVENT_CAPACITY);
        let driver = Self::spawn_driver(eventloop, tx);
        self.session = Some(Session { client, events, driver, unsent: 0 });
        self.state = ConnectionState::Connected;
        info!("Connected to MQTT broker {}", self.broker);
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        let result = match self.session.as_mut() {
            Some(session) if self.state == ConnectionState::Connected => {
                session.publish(topic, payload).await
            }
            _ => return Err(SimError::Send(format!("session is {}", self.state))),
        };

        result.map_err(|reason| {
            warn!("MQTT session to {} lost: {}", self.broker, reason);
            self.teardown();
            self.state = ConnectionState::Failed;
            SimError::Send(format!("connection lost: {}", reason))
        })
    }

    async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            if self.state == ConnectionState::Connected {
                if let Err(e) = session.client.disconnect().await {
                    debug!("MQTT disconnect request failed: {}", e);
                }
                if tokio::time::timeout(DISCONNECT_GRACE, &mut session.driver).await.is_err() {
                    debug!("MQTT driver did not stop within {:?}", DISCONNECT_GRACE);
                }
            }
            session.driver.abort();
            info!("Disconnected from MQTT broker {}", self.broker);
        }
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn name(&self) -> &str {
        "mqtt"
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        self.teardown();
    }
}
