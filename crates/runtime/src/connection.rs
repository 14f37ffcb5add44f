//! DevTools websocket connection.
//!
//! Implements request/response correlation on top of the websocket:
//! - sequential request ids from an atomic counter
//! - a pending map of oneshot senders keyed by id
//! - a background reader task that completes pending requests and fans events
//!   out over a broadcast channel
//!
//! Dropping the connection aborts the reader task; outstanding requests then
//! resolve to [`RuntimeError::ConnectionClosed`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use solarbridge_protocol::{CdpEvent, CdpMessage, CdpRequest};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{Result, RuntimeError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = Arc<Mutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>;

const EVENT_BUFFER: usize = 256;
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Correlated DevTools connection to a single target.
pub struct CdpConnection {
	last_id: AtomicU32,
	pending: Pending,
	sink: tokio::sync::Mutex<SplitSink<Socket, Message>>,
	events: broadcast::Sender<CdpEvent>,
	reader: JoinHandle<()>,
	command_timeout: Duration,
}

impl CdpConnection {
	/// Connects to a target's `webSocketDebuggerUrl`.
	pub async fn connect(url: &str) -> Result<Self> {
		let (socket, _) = tokio_tungstenite::connect_async(url).await?;
		let (sink, stream) = socket.split();
		let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
		let (events, _) = broadcast::channel(EVENT_BUFFER);

		let reader = tokio::spawn(read_loop(stream, Arc::clone(&pending), events.clone()));
		debug!(target = "solarbridge.browser", %url, "devtools connection established");

		Ok(Self {
			last_id: AtomicU32::new(0),
			pending,
			sink: tokio::sync::Mutex::new(sink),
			events,
			reader,
			command_timeout: DEFAULT_COMMAND_TIMEOUT,
		})
	}

	/// Overrides the per-command response timeout.
	pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
		self.command_timeout = timeout;
		self
	}

	/// Sends `method` and waits for its correlated result.
	pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
		let (tx, rx) = oneshot::channel();
		self.pending.lock().insert(id, tx);

		let request = CdpRequest {
			id,
			method: method.to_string(),
			params,
		};
		let payload = serde_json::to_string(&request)?;
		trace!(target = "solarbridge.browser", id, %method, "devtools request");

		if let Err(err) = self.sink.lock().await.send(Message::Text(payload.into())).await {
			self.pending.lock().remove(&id);
			return Err(err.into());
		}

		let outcome = match tokio::time::timeout(self.command_timeout, rx).await {
			Ok(Ok(result)) => result,
			Ok(Err(_)) => Err(RuntimeError::ConnectionClosed),
			Err(_) => {
				self.pending.lock().remove(&id);
				Err(RuntimeError::Timeout {
					what: format!("{method} response"),
					after: self.command_timeout,
				})
			}
		};

		outcome.map_err(|err| match err {
			RuntimeError::Protocol { message, .. } => RuntimeError::Protocol {
				method: method.to_string(),
				message,
			},
			other => other,
		})
	}

	/// Subscribes to events received after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
		self.events.subscribe()
	}

	/// Closes the websocket and stops the reader task.
	pub async fn close(self) {
		let _ = self.sink.lock().await.close().await;
	}
}

impl Drop for CdpConnection {
	fn drop(&mut self) {
		self.reader.abort();
	}
}

async fn read_loop(mut stream: SplitStream<Socket>, pending: Pending, events: broadcast::Sender<CdpEvent>) {
	while let Some(frame) = stream.next().await {
		let text = match frame {
			Ok(Message::Text(text)) => text,
			Ok(Message::Close(_)) => break,
			Ok(_) => continue,
			Err(err) => {
				debug!(target = "solarbridge.browser", error = %err, "devtools stream error");
				break;
			}
		};

		let message: CdpMessage = match serde_json::from_str(&text) {
			Ok(message) => message,
			Err(err) => {
				debug!(target = "solarbridge.browser", error = %err, "ignoring unparsable devtools frame");
				continue;
			}
		};

		match message {
			CdpMessage::Response(response) => {
				let Some(tx) = pending.lock().remove(&response.id) else {
					trace!(target = "solarbridge.browser", id = response.id, "response for unknown request");
					continue;
				};
				let result = match response.error {
					Some(error) => Err(RuntimeError::Protocol {
						method: String::new(),
						message: error.message,
					}),
					None => Ok(response.result.unwrap_or(Value::Null)),
				};
				let _ = tx.send(result);
			}
			CdpMessage::Event(event) => {
				trace!(target = "solarbridge.browser", method = %event.method, "devtools event");
				let _ = events.send(event);
			}
		}
	}

	// Dropping the senders wakes every waiter with ConnectionClosed.
	pending.lock().clear();
}
