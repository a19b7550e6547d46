//! Cross-context channel between the instrumented page and the observer view.
//!
//! Each side opens a [`Channel`] on its end of a [`ChannelTransport`] with the
//! shared scope and its origin, binds the methods it answers, and then:
//!
//! - [`call`](Channel::call)s the peer, getting an [`Acknowledgment`] that
//!   resolves once the peer's handler ran (never, if the peer went away);
//! - pulls incoming calls with [`next_call`](Channel::next_call), applies them
//!   to its own state and [`acknowledge`](Channel::acknowledge)s them.
//!
//! A background task reads the transport, routes acknowledgments to waiting
//! callers and answers calls for unbound methods with `METHOD_NOT_FOUND`.

pub mod protocol;
pub mod request;
pub mod transport;

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

pub use protocol::{Envelope, Frame, JsonRpcError, JsonRpcId};
pub use request::{methods, ChannelRequest};
pub use transport::{ChannelTransport, LocalTransport};

use crate::console::Console;
use crate::error::{DebuggerError, DebuggerResult};
use protocol::{error_codes, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Waiters for outgoing calls; `None` once the peer closed.
type Pending = Arc<Mutex<Option<HashMap<JsonRpcId, oneshot::Sender<JsonRpcResponse>>>>>;
type Bound = Arc<Mutex<BTreeSet<String>>>;

/// A call received from the peer, waiting to be applied and acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingCall {
    /// `None` for notifications, which are never acknowledged.
    pub id: Option<JsonRpcId>,
    pub request: ChannelRequest,
}

/// Completion of an outgoing call.
#[derive(Debug)]
pub struct Acknowledgment {
    receiver: oneshot::Receiver<JsonRpcResponse>,
}

impl Acknowledgment {
    /// Wait for the peer. `None` if the peer closed before answering.
    pub async fn received(self) -> Option<DebuggerResult<serde_json::Value>> {
        self.receiver.await.ok().map(JsonRpcResponse::into_result)
    }
}

pub struct Channel {
    scope: String,
    origin: String,
    transport: Arc<dyn ChannelTransport>,
    bound: Bound,
    pending: Pending,
    incoming: mpsc::UnboundedReceiver<IncomingCall>,
    next_id: AtomicI64,
    console: Console,
    pump: JoinHandle<()>,
}

impl Channel {
    /// Start listening on `transport`. Must run inside a tokio runtime.
    pub fn open(
        transport: Arc<dyn ChannelTransport>,
        scope: impl Into<String>,
        origin: impl Into<String>,
        console: Console,
    ) -> Self {
        let scope = scope.into();
        let origin = origin.into();
        let bound: Bound = Arc::new(Mutex::new(BTreeSet::new()));
        let pending: Pending = Arc::new(Mutex::new(Some(HashMap::new())));
        let (incoming_tx, incoming) = mpsc::unbounded_channel();

        let pump = Pump {
            scope: scope.clone(),
            origin: origin.clone(),
            transport: transport.clone(),
            bound: bound.clone(),
            pending: pending.clone(),
            incoming: incoming_tx,
            console: console.clone(),
        };
        let pump = tokio::spawn(pump.run());

        Self {
            scope,
            origin,
            transport,
            bound,
            pending,
            incoming,
            next_id: AtomicI64::new(1),
            console,
            pump,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Accept calls of `method` from the peer.
    pub fn bind(&self, method: &str) {
        lock(&self.bound).insert(method.to_string());
    }

    pub fn unbind(&self, method: &str) {
        lock(&self.bound).remove(method);
    }

    pub fn is_bound(&self, method: &str) -> bool {
        lock(&self.bound).contains(method)
    }

    async fn send_frame(&self, frame: Frame) -> DebuggerResult<()> {
        let text = Envelope::new(&self.scope, &self.origin, frame).encode()?;
        self.transport.send(text).await
    }

    /// Call the peer. The returned acknowledgment may never resolve.
    pub async fn call(&self, request: &ChannelRequest) -> DebuggerResult<Acknowledgment> {
        let id = JsonRpcId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, receiver) = oneshot::channel();
        // No waiter once the pump is gone; the dropped sender resolves the ack to `None`.
        if let Some(waiters) = lock(&self.pending).as_mut() {
            waiters.insert(id.clone(), tx);
        }

        let frame = JsonRpcRequest::new(id, request.method()).with_params(request.params());
        debug!(method = request.method(), "channel call");
        self.send_frame(Frame::Request(frame)).await?;
        Ok(Acknowledgment { receiver })
    }

    /// Fire-and-forget call.
    pub async fn notify(&self, request: &ChannelRequest) -> DebuggerResult<()> {
        let frame = JsonRpcNotification::new(request.method(), request.params());
        self.send_frame(Frame::Notification(frame)).await
    }

    /// Next call from the peer; `None` once the peer closed.
    pub async fn next_call(&mut self) -> Option<IncomingCall> {
        self.incoming.recv().await
    }

    /// Next already-received call, without waiting.
    pub fn try_next_call(&mut self) -> Option<IncomingCall> {
        self.incoming.try_recv().ok()
    }

    /// Tell the peer `call` has been applied.
    pub async fn acknowledge(&self, call: &IncomingCall) -> DebuggerResult<()> {
        let Some(id) = call.id.clone() else {
            return Ok(());
        };
        self.send_frame(Frame::Response(JsonRpcResponse::success(id, json!(null))))
            .await
    }

    /// Tell the peer applying `call` failed.
    pub async fn reject(&self, call: &IncomingCall, error: &DebuggerError) -> DebuggerResult<()> {
        self.console.error(
            "channel",
            &error.to_string(),
            json!({ "method": call.request.method() }),
        );
        let Some(id) = call.id.clone() else {
            return Ok(());
        };
        let error = JsonRpcError::new(error_codes::INTERNAL_ERROR, error.to_string());
        self.send_frame(Frame::Response(JsonRpcResponse::error(id, error)))
            .await
    }

    /// Stop listening and close our end. Outstanding acknowledgments resolve to `None`.
    pub async fn close(self) -> DebuggerResult<()> {
        self.pump.abort();
        lock(&self.pending).take();
        self.transport.close().await
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Background reader for one channel end.
struct Pump {
    scope: String,
    origin: String,
    transport: Arc<dyn ChannelTransport>,
    bound: Bound,
    pending: Pending,
    incoming: mpsc::UnboundedSender<IncomingCall>,
    console: Console,
}

impl Pump {
    async fn run(self) {
        while let Some(text) = self.transport.recv().await {
            if let Err(error) = self.handle(&text).await {
                self.console
                    .warn("channel", "frame dropped", json!({ "error": error.to_string() }));
            }
        }
        debug!(scope = %self.scope, "peer closed channel");
        // Waiting callers see `None`.
        lock(&self.pending).take();
    }

    async fn handle(&self, text: &str) -> DebuggerResult<()> {
        let envelope = Envelope::decode(text)?;
        envelope.verify(&self.scope, &self.origin)?;

        match envelope.frame {
            Frame::Response(response) => {
                let waiter = lock(&self.pending)
                    .as_mut()
                    .and_then(|waiters| waiters.remove(&response.id));
                match waiter {
                    // The caller may have stopped waiting; that is fine.
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => debug!(id = ?response.id, "acknowledgment without a waiting call"),
                }
                Ok(())
            }
            Frame::Request(request) => {
                let id = request.id.clone();
                match self.accept(&request.method, request.params.as_ref()) {
                    Ok(request) => self.deliver(Some(id), request),
                    Err((code, message)) => {
                        let error = JsonRpcError::new(code, message);
                        let frame = Frame::Response(JsonRpcResponse::error(id, error));
                        let text = Envelope::new(&self.scope, &self.origin, frame).encode()?;
                        self.transport.send(text).await
                    }
                }
            }
            Frame::Notification(notification) => {
                match self.accept(&notification.method, notification.params.as_ref()) {
                    Ok(request) => self.deliver(None, request),
                    Err((_, message)) => Err(DebuggerError::Channel {
                        scope: self.scope.clone(),
                        message,
                    }),
                }
            }
        }
    }

    fn accept(
        &self,
        method: &str,
        params: Option<&serde_json::Value>,
    ) -> Result<ChannelRequest, (i32, String)> {
        if !lock(&self.bound).contains(method) {
            return Err((
                error_codes::METHOD_NOT_FOUND,
                DebuggerError::MethodNotFound(method.to_string()).to_string(),
            ));
        }
        ChannelRequest::parse(method, params).map_err(|e| {
            let code = match e {
                DebuggerError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
                _ => error_codes::INVALID_PARAMS,
            };
            (code, e.to_string())
        })
    }

    fn deliver(&self, id: Option<JsonRpcId>, request: ChannelRequest) -> DebuggerResult<()> {
        self.incoming
            .send(IncomingCall { id, request })
            .map_err(|_| DebuggerError::Channel {
                scope: self.scope.clone(),
                message: "receiving side dropped".into(),
            })
    }
}
