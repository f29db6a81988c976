use std::time::Duration;

use rand::Rng;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{codec, transport, TransportError};
use crate::config::Config;

/// Store-and-forward hop between nodes that delays every message independently.
pub struct Relay {
    config: Config,
    read_timeout: Duration,
}

impl Relay {
    pub fn new(config: Config) -> Self {
        Relay {
            config,
            read_timeout: codec::READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub async fn bind(&self) -> Result<TcpListener, TransportError> {
        let addr = self.config.relay_addr()?;
        Ok(TcpListener::bind(addr).await?)
    }

    pub async fn run(self, listener: TcpListener) {
        info!(addr = ?listener.local_addr().ok(), nodes = self.config.nodes.len(), "Relay listening");
        loop {
            let (mut stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(%err, "Accept failed");
                    continue;
                }
            };

            let payload = match codec::read_frame_within(&mut stream, self.read_timeout).await {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(%peer, %err, "Dropping unreadable frame");
                    continue;
                }
            };

            let delay = self.draw_delay();
            let config = self.config.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                forward(&config, payload, delay).await;
            });
        }
    }

    fn draw_delay(&self) -> Duration {
        let min = self.config.network.min_delay_ms;
        let max = self.config.network.max_delay_ms;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

async fn forward(config: &Config, payload: Vec<u8>, delay: Duration) {
    let envelope = match codec::decode(&payload) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(%err, "Dropping undecodable envelope");
            return;
        }
    };
    let kind = envelope.message.kind();
    let ballot = envelope.message.ballot().to_string();

    let result = match config.node_addr(&envelope.recipient) {
        Ok(addr) => transport::send_frame(addr, &payload).await,
        Err(err) => Err(err.into()),
    };

    match result {
        Ok(()) => info!(
            sender = %envelope.sender,
            recipient = %envelope.recipient,
            kind,
            %ballot,
            delay_secs = delay.as_secs_f64(),
            "Forwarded"
        ),
        Err(err) => warn!(
            sender = %envelope.sender,
            recipient = %envelope.recipient,
            kind,
            %ballot,
            delay_secs = delay.as_secs_f64(),
            %err,
            "Forward failed to connect"
        ),
    }
}
