use std::{net::SocketAddr, time::Duration};

use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc::{Receiver, Sender},
};
use tracing::{debug, warn};

use super::{codec, TransportError};
use crate::consensus::{message::Envelope, processor::Event};

/// Drains the processor's outgoing queue in order, one relay connection per envelope.
///
/// A failed hand-off is logged and the envelope is lost.
pub async fn run_outbox(relay: SocketAddr, mut msg_rx: Receiver<Envelope>) {
    while let Some(envelope) = msg_rx.recv().await {
        match deliver(relay, &envelope).await {
            Ok(()) => debug!(
                node = %envelope.sender,
                peer = %envelope.recipient,
                kind = envelope.message.kind(),
                ballot = %envelope.message.ballot(),
                "Handed to relay"
            ),
            Err(err) => warn!(
                node = %envelope.sender,
                peer = %envelope.recipient,
                kind = envelope.message.kind(),
                %err,
                "Relay unreachable, message lost"
            ),
        }
    }
}

/// Opens a connection to `addr` and writes one framed envelope.
pub async fn deliver(addr: SocketAddr, envelope: &Envelope) -> Result<(), TransportError> {
    let payload = codec::encode(envelope)?;
    send_frame(addr, &payload).await
}

pub async fn send_frame(addr: SocketAddr, payload: &[u8]) -> Result<(), TransportError> {
    let mut stream = TcpStream::connect(addr).await?;
    codec::write_frame(&mut stream, payload).await
}

/// Reads one envelope per inbound connection and feeds it to the processor in arrival order.
///
/// A connection that sends nothing within `read_timeout` is dropped.
pub async fn run_listener(listener: TcpListener, event_tx: Sender<Event>, read_timeout: Duration) {
    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(%err, "Accept failed");
                continue;
            }
        };

        let envelope = match codec::read_frame_within(&mut stream, read_timeout)
            .await
            .and_then(|bytes| codec::decode(&bytes)) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(%peer, %err, "Dropping unreadable frame");
                continue;
            }
        };

        if event_tx.send(Event::Message(envelope)).await.is_err() {
            debug!("Processor gone, listener stopping");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{ballot::Ballot, message::*};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_outbox_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (event_tx, mut event_rx) = mpsc::channel(10);
        tokio::spawn(run_listener(listener, event_tx, codec::READ_TIMEOUT));

        let (msg_tx, msg_rx) = mpsc::channel(10);
        tokio::spawn(run_outbox(addr, msg_rx));

        let first = Envelope::new("1", "2", Message::Prepare(Prepare { ballot: Ballot::new(0, "1", 0) }));
        let second = Envelope::new(
            "1",
            "2",
            Message::Ack(Ack { ballot: Ballot::new(0, "1", 0), accept_ballot: None, accept_value: None }),
        );
        msg_tx.send(first.clone()).await.unwrap();
        msg_tx.send(second.clone()).await.unwrap();

        for expected in [first, second] {
            match event_rx.recv().await.unwrap() {
                Event::Message(envelope) => assert_eq!(envelope, expected),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_silent_connection_does_not_block_later_ones() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (event_tx, mut event_rx) = mpsc::channel(10);
        tokio::spawn(run_listener(listener, event_tx, Duration::from_millis(100)));

        let _silent = TcpStream::connect(addr).await.unwrap();
        let envelope = Envelope::new("1", "2", Message::Prepare(Prepare { ballot: Ballot::new(0, "1", 0) }));
        deliver(addr, &envelope).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            Event::Message(received) => assert_eq!(received, envelope),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let envelope = Envelope::new("1", "2", Message::Prepare(Prepare { ballot: Ballot::new(0, "1", 0) }));

        assert!(matches!(deliver(addr, &envelope).await, Err(TransportError::Io(_))));
    }
}
