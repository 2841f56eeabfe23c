use crate::protocol::{
    CreateParams, CreateResult, ExitParams, IncomingMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, KillParams, OutputParams, ResizeParams, WriteParams,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use termpanel_core::constants::host as methods;
use termpanel_core::error::{PanelError, Result};
use termpanel_core::events::HostEventBus;
use termpanel_core::host::{HostEvent, ProcessHost, SessionId, SpawnedProcess, TermSize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// State shared between the client handle and its reader/writer tasks.
struct Connection {
    pending: PendingMap,
    events: HostEventBus,
    closed: AtomicBool,
}

impl Connection {
    /// Mark the connection dead and fail every outstanding request.
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let dropped: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .collect();
        if !dropped.is_empty() {
            warn!("Process host closed with {} request(s) pending", dropped.len());
        }
        info!("Process host connection closed");
    }

    fn handle_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        match IncomingMessage::parse(line) {
            Ok(IncomingMessage::Response(response)) => {
                let sender = self
                    .pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&response.id);
                match sender {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => debug!("Response for unknown request {}", response.id),
                }
            }
            Ok(IncomingMessage::Notification(notification)) => self.handle_notification(notification),
            Err(e) => warn!("Unparseable message from process host: {e}"),
        }
    }

    fn handle_notification(&self, notification: JsonRpcNotification) {
        let params = notification.params.unwrap_or(Value::Null);
        match notification.method.as_str() {
            methods::NOTIFY_OUTPUT => match serde_json::from_value::<OutputParams>(params) {
                Ok(output) => self.events.publish(HostEvent::Output {
                    session_id: SessionId::new(output.terminal_id),
                    data: output.data.into_bytes(),
                }),
                Err(e) => warn!("Malformed {} notification: {e}", methods::NOTIFY_OUTPUT),
            },
            methods::NOTIFY_EXIT => match serde_json::from_value::<ExitParams>(params) {
                Ok(exit) => self.events.publish(HostEvent::Exit {
                    session_id: SessionId::new(exit.terminal_id),
                    exit_code: exit.exit_code,
                }),
                Err(e) => warn!("Malformed {} notification: {e}", methods::NOTIFY_EXIT),
            },
            other => debug!("Unhandled process host notification: {other}"),
        }
    }
}

/// `ProcessHost` backed by a process-host program speaking line-delimited
/// JSON-RPC 2.0.
pub struct RpcProcessHost {
    outgoing: mpsc::UnboundedSender<String>,
    connection: Arc<Connection>,
    next_id: AtomicU64,
}

impl RpcProcessHost {
    /// Speak the protocol over any byte stream pair. Must be called inside a
    /// tokio runtime.
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let connection = Arc::new(Connection {
            pending: Arc::new(Mutex::new(HashMap::new())),
            events: HostEventBus::new(),
            closed: AtomicBool::new(false),
        });
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();

        tokio::spawn(Self::write_loop(writer, outgoing_rx, Arc::clone(&connection)));
        tokio::spawn(Self::read_loop(reader, Arc::clone(&connection)));

        Self {
            outgoing,
            connection,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.connection.closed.load(Ordering::SeqCst)
    }

    /// Send a request and wait for its response. There is no timeout; a
    /// request only fails early when the connection closes.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.connection
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);

        // `close` drains after setting the flag, so checking after insert
        // cannot miss it.
        if self.is_closed() {
            self.forget(id);
            return Err(PanelError::host("connection closed"));
        }

        let mut line = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;
        line.push('\n');
        if self.outgoing.send(line).is_err() {
            self.forget(id);
            return Err(PanelError::host("connection closed"));
        }

        let response = rx
            .await
            .map_err(|_| PanelError::host("connection closed before response"))?;
        response.into_result().map_err(PanelError::Host)
    }

    fn forget(&self, id: u64) {
        self.connection
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    /// Fire-and-forget. Failures are logged, never returned.
    fn notify(&self, method: &str, params: impl Serialize) {
        if self.is_closed() {
            debug!("Dropping {method}: connection closed");
            return;
        }
        let notification = match serde_json::to_value(params) {
            Ok(params) => JsonRpcNotification::new(method, Some(params)),
            Err(e) => {
                warn!("Failed to encode {method}: {e}");
                return;
            }
        };
        match serde_json::to_string(&notification) {
            Ok(mut line) => {
                line.push('\n');
                let _ = self.outgoing.send(line);
            }
            Err(e) => warn!("Failed to encode {method}: {e}"),
        }
    }

    async fn write_loop<W>(
        mut writer: W,
        mut outgoing: mpsc::UnboundedReceiver<String>,
        connection: Arc<Connection>,
    ) where
        W: AsyncWrite + Unpin,
    {
        while let Some(line) = outgoing.recv().await {
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                warn!("Write to process host failed: {e}");
                break;
            }
            if let Err(e) = writer.flush().await {
                warn!("Flush to process host failed: {e}");
                break;
            }
        }
        connection.close();
    }

    async fn read_loop<R>(reader: R, connection: Arc<Connection>)
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => connection.handle_line(&line),
                Ok(None) => break,
                Err(e) => {
                    warn!("Read from process host failed: {e}");
                    break;
                }
            }
        }
        connection.close();
    }
}

#[async_trait]
impl ProcessHost for RpcProcessHost {
    async fn create(&self, cwd: Option<&Path>) -> Result<SpawnedProcess> {
        let params = CreateParams {
            cwd: cwd.map(Path::to_path_buf),
        };
        let value = self
            .call(methods::METHOD_CREATE, Some(serde_json::to_value(params)?))
            .await?;
        let created: CreateResult = serde_json::from_value(value)?;
        Ok(SpawnedProcess {
            session_id: SessionId::new(created.terminal_id),
            shell: created.shell,
            cwd: created.cwd,
            is_pty: created.is_pty,
        })
    }

    fn write(&self, session_id: &SessionId, data: &[u8]) {
        self.notify(
            methods::METHOD_WRITE,
            WriteParams {
                terminal_id: session_id.to_string(),
                data: String::from_utf8_lossy(data).into_owned(),
            },
        );
    }

    fn resize(&self, session_id: &SessionId, size: TermSize) {
        self.notify(
            methods::METHOD_RESIZE,
            ResizeParams {
                terminal_id: session_id.to_string(),
                cols: size.cols,
                rows: size.rows,
            },
        );
    }

    fn kill(&self, session_id: &SessionId) {
        self.notify(
            methods::METHOD_KILL,
            KillParams {
                terminal_id: session_id.to_string(),
            },
        );
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<HostEvent> {
        self.connection.events.subscribe()
    }
}
