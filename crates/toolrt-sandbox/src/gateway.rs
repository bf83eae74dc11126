//! `ToolGateway` — the host-side callback surface every isolation backend
//! calls into for tool access. Two implementations: a direct in-process
//! delegate, and a proxy serialized as a generic framed request/response
//! protocol over a pluggable connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;
use toolrt_exec::{DetailLevel, ExecError, Tools};
use toolrt_runner::RunStep;
use toolrt_types::{Tool, ToolId};

use crate::error::SandboxError;

#[async_trait]
pub trait ToolGateway: Send + Sync {
    async fn search_tools(
        &self,
        ctx: &CancellationToken,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Tool>, SandboxError>;

    async fn list_namespaces(&self, ctx: &CancellationToken) -> Result<Vec<String>, SandboxError>;

    async fn describe_tool(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        detail: DetailLevel,
    ) -> Result<Option<String>, SandboxError>;

    async fn list_tool_examples(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        max: usize,
    ) -> Result<Vec<String>, SandboxError>;

    async fn run_tool(
        &self,
        ctx: &CancellationToken,
        id: &ToolId,
        args: HashMap<String, Value>,
    ) -> Result<Value, SandboxError>;

    async fn run_chain(
        &self,
        ctx: &CancellationToken,
        steps: Vec<RunStep>,
    ) -> Result<Value, SandboxError>;
}

fn map_exec_error(err: ExecError) -> SandboxError {
    SandboxError::Remote(err.to_string())
}

/// In-process delegate wrapping the real [`Tools`] environment. Its
/// accounting is whatever `Tools` was constructed with — this type adds no
/// additional limits of its own.
pub struct DirectGateway {
    tools: Arc<Tools>,
}

impl DirectGateway {
    pub fn new(tools: Arc<Tools>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl ToolGateway for DirectGateway {
    async fn search_tools(
        &self,
        ctx: &CancellationToken,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Tool>, SandboxError> {
        self.tools.search_tools(ctx, query, limit).await.map_err(map_exec_error)
    }

    async fn list_namespaces(&self, ctx: &CancellationToken) -> Result<Vec<String>, SandboxError> {
        self.tools.list_namespaces(ctx).await.map_err(map_exec_error)
    }

    async fn describe_tool(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        detail: DetailLevel,
    ) -> Result<Option<String>, SandboxError> {
        self.tools
            .describe_tool(ctx, full_tool_id, detail)
            .await
            .map_err(map_exec_error)
    }

    async fn list_tool_examples(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        max: usize,
    ) -> Result<Vec<String>, SandboxError> {
        self.tools
            .list_tool_examples(ctx, full_tool_id, max)
            .await
            .map_err(map_exec_error)
    }

    async fn run_tool(
        &self,
        ctx: &CancellationToken,
        id: &ToolId,
        args: HashMap<String, Value>,
    ) -> Result<Value, SandboxError> {
        self.tools.run_tool(ctx, id, args).await.map_err(map_exec_error)
    }

    async fn run_chain(
        &self,
        ctx: &CancellationToken,
        steps: Vec<RunStep>,
    ) -> Result<Value, SandboxError> {
        self.tools.run_chain(ctx, steps).await.map_err(map_exec_error)
    }
}

/// The pluggable bidirectional transport a [`ProxyGateway`] serializes
/// requests over. A concrete driver supplies stdio-pipe or socket framing;
/// this abstraction only knows about whole frames.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn send(&self, frame: Vec<u8>) -> Result<(), SandboxError>;
    async fn receive(&self) -> Result<Vec<u8>, SandboxError>;
    async fn close(&self) -> Result<(), SandboxError>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireDetailLevel {
    Summary,
    Full,
}

impl From<DetailLevel> for WireDetailLevel {
    fn from(d: DetailLevel) -> Self {
        match d {
            DetailLevel::Summary => WireDetailLevel::Summary,
            DetailLevel::Full => WireDetailLevel::Full,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireStep {
    id: String,
    args: HashMap<String, Value>,
    use_previous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GatewayMessageBody {
    SearchTools { query: String, limit: usize },
    ListNamespaces,
    DescribeTool { full_tool_id: String, detail: WireDetailLevel },
    ListToolExamples { full_tool_id: String, max: usize },
    RunTool { id: String, args: HashMap<String, Value> },
    RunChain { steps: Vec<WireStep> },
    Response { payload: Value },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GatewayMessage {
    id: u64,
    #[serde(flatten)]
    body: GatewayMessageBody,
}

type PendingMap = Mutex<HashMap<u64, oneshot::Sender<Result<Value, String>>>>;

/// Requests carry a monotonic correlation id; responses are matched by id
/// via a pending-requests map, since the connection makes no ordering
/// guarantee. Once the connection closes, every subsequent call fails
/// immediately.
pub struct ProxyGateway {
    conn: Arc<dyn Connection>,
    next_id: AtomicU64,
    pending: PendingMap,
    closed: AtomicBool,
}

impl ProxyGateway {
    pub fn spawn(conn: Arc<dyn Connection>) -> Arc<Self> {
        let gateway = Arc::new(Self {
            conn,
            next_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        });
        let reader = gateway.clone();
        tokio::spawn(async move { reader.read_loop().await });
        gateway
    }

    async fn read_loop(self: Arc<Self>) {
        loop {
            match self.conn.receive().await {
                Ok(frame) => {
                    let Ok(message) = serde_json::from_slice::<GatewayMessage>(&frame) else {
                        continue;
                    };
                    let resolved = match message.body {
                        GatewayMessageBody::Response { payload } => Ok(payload),
                        GatewayMessageBody::Error { message } => Err(message),
                        _ => continue,
                    };
                    if let Some(sender) = self.pending.lock().await.remove(&message.id) {
                        let _ = sender.send(resolved);
                    }
                }
                Err(_) => {
                    self.closed.store(true, Ordering::SeqCst);
                    let mut pending = self.pending.lock().await;
                    for (_, sender) in pending.drain() {
                        let _ = sender.send(Err("connection closed".to_string()));
                    }
                    break;
                }
            }
        }
    }

    async fn call(&self, body: GatewayMessageBody) -> Result<Value, SandboxError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SandboxError::ClientNotConfigured(
                "gateway connection is closed".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let message = GatewayMessage { id, body };
        let frame = serde_json::to_vec(&message)
            .map_err(|e| SandboxError::InvalidRequest(format!("failed to encode gateway message: {e}")))?;
        self.conn.send(frame).await?;

        let resolved = rx.await.map_err(|_| {
            SandboxError::ClientNotConfigured("gateway connection closed before response".to_string())
        })?;
        resolved.map_err(SandboxError::Remote)
    }
}

#[async_trait]
impl ToolGateway for ProxyGateway {
    async fn search_tools(
        &self,
        _ctx: &CancellationToken,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Tool>, SandboxError> {
        let payload = self
            .call(GatewayMessageBody::SearchTools {
                query: query.to_string(),
                limit,
            })
            .await?;
        serde_json::from_value(payload)
            .map_err(|e| SandboxError::Remote(format!("malformed search_tools response: {e}")))
    }

    async fn list_namespaces(&self, _ctx: &CancellationToken) -> Result<Vec<String>, SandboxError> {
        let payload = self.call(GatewayMessageBody::ListNamespaces).await?;
        serde_json::from_value(payload)
            .map_err(|e| SandboxError::Remote(format!("malformed list_namespaces response: {e}")))
    }

    async fn describe_tool(
        &self,
        _ctx: &CancellationToken,
        full_tool_id: &str,
        detail: DetailLevel,
    ) -> Result<Option<String>, SandboxError> {
        let payload = self
            .call(GatewayMessageBody::DescribeTool {
                full_tool_id: full_tool_id.to_string(),
                detail: detail.into(),
            })
            .await?;
        serde_json::from_value(payload)
            .map_err(|e| SandboxError::Remote(format!("malformed describe_tool response: {e}")))
    }

    async fn list_tool_examples(
        &self,
        _ctx: &CancellationToken,
        full_tool_id: &str,
        max: usize,
    ) -> Result<Vec<String>, SandboxError> {
        let payload = self
            .call(GatewayMessageBody::ListToolExamples {
                full_tool_id: full_tool_id.to_string(),
                max,
            })
            .await?;
        serde_json::from_value(payload)
            .map_err(|e| SandboxError::Remote(format!("malformed list_tool_examples response: {e}")))
    }

    async fn run_tool(
        &self,
        _ctx: &CancellationToken,
        id: &ToolId,
        args: HashMap<String, Value>,
    ) -> Result<Value, SandboxError> {
        self.call(GatewayMessageBody::RunTool {
            id: id.to_string(),
            args,
        })
        .await
    }

    async fn run_chain(
        &self,
        _ctx: &CancellationToken,
        steps: Vec<RunStep>,
    ) -> Result<Value, SandboxError> {
        let wire_steps = steps
            .into_iter()
            .map(|s| WireStep {
                id: s.id.to_string(),
                args: s.args,
                use_previous: s.use_previous,
            })
            .collect();
        self.call(GatewayMessageBody::RunChain { steps: wire_steps }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct LoopbackConnection {
        inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
    }

    #[async_trait]
    impl Connection for LoopbackConnection {
        async fn send(&self, frame: Vec<u8>) -> Result<(), SandboxError> {
            self.outbound
                .send(frame)
                .map_err(|_| SandboxError::ClientNotConfigured("peer gone".to_string()))
        }
        async fn receive(&self) -> Result<Vec<u8>, SandboxError> {
            self.inbound
                .lock()
                .await
                .recv()
                .await
                .ok_or_else(|| SandboxError::ClientNotConfigured("peer closed".to_string()))
        }
        async fn close(&self) -> Result<(), SandboxError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn proxy_round_trips_run_tool_through_a_fake_peer() {
        let (to_peer_tx, mut to_peer_rx) = mpsc::unbounded_channel();
        let (from_peer_tx, from_peer_rx) = mpsc::unbounded_channel();

        let conn = Arc::new(LoopbackConnection {
            inbound: Mutex::new(from_peer_rx),
            outbound: to_peer_tx,
        });
        let gateway = ProxyGateway::spawn(conn);

        tokio::spawn(async move {
            let frame = to_peer_rx.recv().await.expect("request frame");
            let request: GatewayMessage = serde_json::from_slice(&frame).expect("decode");
            let response = GatewayMessage {
                id: request.id,
                body: GatewayMessageBody::Response {
                    payload: serde_json::json!({"echoed": true}),
                },
            };
            from_peer_tx
                .send(serde_json::to_vec(&response).unwrap())
                .unwrap();
        });

        let result = gateway
            .run_tool(&CancellationToken::new(), &ToolId::new("local", "echo"), HashMap::new())
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"echoed": true}));
    }

    #[tokio::test]
    async fn closed_connection_fails_subsequent_calls() {
        let (to_peer_tx, _to_peer_rx) = mpsc::unbounded_channel();
        let (_from_peer_tx, from_peer_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        let conn = Arc::new(LoopbackConnection {
            inbound: Mutex::new(from_peer_rx),
            outbound: to_peer_tx,
        });
        let gateway = ProxyGateway::spawn(conn);
        drop(_from_peer_tx);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let err = gateway
            .run_tool(&CancellationToken::new(), &ToolId::new("local", "echo"), HashMap::new())
            .await
            .unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::ClientNotConfigured));
    }
}
