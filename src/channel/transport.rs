//! Transport layer: moves encoded envelopes between two contexts.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::error::DebuggerResult;

/// One end of a bidirectional, ordered frame pipe.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Deliver a frame to the peer. A frame sent to a peer that has gone away
    /// is silently lost.
    async fn send(&self, frame: String) -> DebuggerResult<()>;

    /// Next frame from the peer; `None` once the peer has closed.
    async fn recv(&self) -> Option<String>;

    /// Stop sending. The peer's `recv` drains and then yields `None`.
    async fn close(&self) -> DebuggerResult<()>;
}

/// In-process transport built on tokio channels.
pub struct LocalTransport {
    outgoing: Mutex<Option<mpsc::UnboundedSender<String>>>,
    incoming: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl LocalTransport {
    /// Two connected ends.
    pub fn pair() -> (LocalTransport, LocalTransport) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            LocalTransport {
                outgoing: Mutex::new(Some(a_tx)),
                incoming: Mutex::new(b_rx),
            },
            LocalTransport {
                outgoing: Mutex::new(Some(b_tx)),
                incoming: Mutex::new(a_rx),
            },
        )
    }
}

#[async_trait]
impl ChannelTransport for LocalTransport {
    async fn send(&self, frame: String) -> DebuggerResult<()> {
        let outgoing = self.outgoing.lock().await;
        match outgoing.as_ref() {
            Some(tx) if tx.send(frame).is_ok() => {}
            _ => debug!("peer gone, frame dropped"),
        }
        Ok(())
    }

    async fn recv(&self) -> Option<String> {
        self.incoming.lock().await.recv().await
    }

    async fn close(&self) -> DebuggerResult<()> {
        self.outgoing.lock().await.take();
        Ok(())
    }
}
