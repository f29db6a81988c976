pub mod codec;
pub mod node;
pub mod relay;
pub mod transport;

use thiserror::Error;

/*
    Messages never travel directly between nodes. Every envelope is handed to
    the relay, which delays it by a random amount and then forwards it to the
    recipient, or drops it if the recipient is unreachable. Delivery is
    at-most-once and unordered; the consensus processor is never told about
    a failed delivery.
*/

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot decode envelope: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("peer sent no frame within {0:?}")]
    Timeout(std::time::Duration),
    #[error("frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}
