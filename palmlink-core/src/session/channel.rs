//! The WebSocket control channel.
//!
//! Wraps one `tokio-tungstenite` stream behind a pair of mpsc channels
//! driven by background reader and writer tasks, so callers send and
//! receive without touching the socket directly. Text frames carry
//! JSON control messages; binary frames are video and pass through
//! untouched for the frame layer to classify.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::PalmError;
use crate::protocol::ControlMessage;

/// One inbound channel message, already demultiplexed by frame type.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    /// A decoded JSON control message.
    Control(ControlMessage),
    /// A binary video payload.
    Binary(Bytes),
}

/// A control channel to the capture host.
#[derive(Debug)]
pub struct ControlChannel {
    // Channel to hand outbound messages to the background writer task
    tx: mpsc::Sender<ControlMessage>,
    // Channel to receive inbound messages from the background reader task
    rx: mpsc::Receiver<ChannelMessage>,
}

impl ControlChannel {
    /// Open a channel to `url` (`ws://` or `wss://`).
    pub async fn connect(url: &str) -> Result<Self, PalmError> {
        let (stream, _response) = connect_async(url).await?;
        Ok(Self::new(stream))
    }

    fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        let (mut net_writer, mut net_reader) = stream.split();

        // User -> Network
        let (user_tx, mut outbound_rx) = mpsc::channel::<ControlMessage>(100);

        // Network -> User
        let (inbound_tx, user_rx) = mpsc::channel::<ChannelMessage>(100);

        // Writer task: User -> Network
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let text = match msg.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to encode outbound message, skipped");
                        continue;
                    }
                };
                if let Err(e) = net_writer.send(Message::Text(text)).await {
                    warn!(error = %e, "channel write error");
                    break;
                }
            }
            // Sender side dropped: initiate a clean close.
            let _ = net_writer.send(Message::Close(None)).await;
        });

        // Reader task: Network -> User
        tokio::spawn(async move {
            while let Some(result) = net_reader.next().await {
                match result {
                    Ok(Message::Text(text)) => match ControlMessage::from_json(&text) {
                        Ok(msg) => {
                            if inbound_tx.send(ChannelMessage::Control(msg)).await.is_err() {
                                // user_rx was dropped, stop reading
                                break;
                            }
                        }
                        Err(e) => {
                            // Malformed JSON never kills the connection.
                            warn!(error = %e, "malformed control message, skipped");
                        }
                    },
                    Ok(Message::Binary(data)) => {
                        if inbound_tx
                            .send(ChannelMessage::Binary(Bytes::from(data)))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        debug!(?frame, "channel closed by remote");
                        break;
                    }
                    // Ping/pong are answered by the library.
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "channel read error");
                        break;
                    }
                }
            }
        });

        Self {
            tx: user_tx,
            rx: user_rx,
        }
    }

    /// Queue an outbound control message.
    pub async fn send(&self, msg: ControlMessage) -> Result<(), PalmError> {
        self.tx.send(msg).await.map_err(Into::into)
    }

    /// Receive the next inbound message. `None` means the channel
    /// closed (remote close, IO error, or local shutdown).
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        self.rx.recv().await
    }

    /// A cloneable outbound sender. Dropping every sender (including
    /// the channel itself) triggers a clean WebSocket close.
    pub fn sender(&self) -> mpsc::Sender<ControlMessage> {
        self.tx.clone()
    }

    /// Split into the outbound sender and the inbound receiver, so the
    /// two halves can live on different tasks.
    pub fn split(self) -> (mpsc::Sender<ControlMessage>, mpsc::Receiver<ChannelMessage>) {
        (self.tx, self.rx)
    }
}
