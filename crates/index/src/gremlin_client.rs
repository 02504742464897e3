//! Gremlin session over a WebSocket connection, reopened after it drops.
//!
//! Requests are GraphSON v2 `eval` messages carrying the traversal script and
//! its bindings. Authentication is SASL PLAIN, answered when the server
//! replies with status 407.
//!
//! A submission whose connection drops before the server answered it is sent
//! once more on a fresh connection.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{GraphError, Result};
use crate::executor::{SubmitOutcome, TraversalExecutor};
use crate::graphson;
use crate::traversal::Traversal;

const MIME_TYPE: &str = "application/vnd.gremlin-v2.0+json";

type Session = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection settings for a Cosmos DB Gremlin account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GremlinConfig {
    /// `wss://<account>.gremlin.cosmos.azure.com:443/`
    pub endpoint: String,
    pub database: String,
    pub collection: String,
    pub access_key: String,
}

impl GremlinConfig {
    pub fn username(&self) -> String {
        format!("/dbs/{}/colls/{}", self.database, self.collection)
    }
}

pub struct GremlinClient {
    config: GremlinConfig,
    // `None` after the connection dropped; reopened by the next submission
    session: Mutex<Option<Session>>,
}

impl GremlinClient {
    pub async fn connect(config: GremlinConfig) -> Result<Self> {
        info!(endpoint = %config.endpoint, graph = %config.username(), "Initialising Gremlin client");
        let session = Self::open(&config).await?;
        info!("Gremlin client initialised");

        Ok(Self {
            config,
            session: Mutex::new(Some(session)),
        })
    }

    async fn open(config: &GremlinConfig) -> Result<Session> {
        let (session, _) = connect_async(config.endpoint.as_str())
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;
        Ok(session)
    }

    async fn send(session: &mut Session, request: &GremlinRequest<'_>) -> Result<()> {
        let frame = encode_request(request)?;
        session
            .send(Message::Binary(frame))
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))
    }

    fn credentials(&self) -> String {
        let plain = format!("\0{}\0{}", self.config.username(), self.config.access_key);
        STANDARD.encode(plain)
    }

    /// Send one request and collect its rows.
    ///
    /// `answered` is set once the server has replied to this request.
    async fn exchange(
        &self,
        session: &mut Session,
        request_id: &str,
        traversal: &Traversal,
        answered: &mut bool,
    ) -> Result<Vec<Value>> {
        Self::send(session, &GremlinRequest::eval(request_id, traversal)).await?;

        let mut rows = Vec::new();
        loop {
            let message = session
                .next()
                .await
                .ok_or_else(|| GraphError::Connection("Gremlin session closed".to_string()))?
                .map_err(|e| GraphError::Connection(e.to_string()))?;

            let payload = match message {
                Message::Text(text) => text.into_bytes(),
                Message::Binary(bytes) => bytes,
                Message::Close(frame) => {
                    return Err(GraphError::Connection(format!(
                        "Gremlin server closed the session: {:?}",
                        frame
                    )));
                }
                _ => continue,
            };

            let response: GremlinResponse = serde_json::from_slice(&payload)?;
            if response.request_id.as_deref().is_some_and(|id| id != request_id) {
                warn!(request_id = ?response.request_id, "Ignoring response for another request");
                continue;
            }
            *answered = true;

            match response.status.code {
                200 => {
                    rows.extend(graphson::rows(response.result.data));
                    return Ok(rows);
                }
                204 => return Ok(rows),
                206 => rows.extend(graphson::rows(response.result.data)),
                407 => {
                    debug!("Gremlin server requested authentication");
                    let auth = GremlinRequest::authentication(request_id, self.credentials());
                    Self::send(session, &auth).await?;
                }
                _ => return Err(response.status.into_error()),
            }
        }
    }
}

#[async_trait]
impl TraversalExecutor for GremlinClient {
    async fn submit(&self, traversal: &Traversal) -> Result<SubmitOutcome> {
        // One request in flight per session
        let mut guard = self.session.lock().await;

        let request_id = Uuid::new_v4().to_string();
        debug!(
            request_id = %request_id,
            write = traversal.is_write(),
            script = traversal.script(),
            "Submitting traversal"
        );

        let mut retried = false;
        loop {
            let mut session = match guard.take() {
                Some(session) => session,
                None => {
                    info!(endpoint = %self.config.endpoint, "Reopening Gremlin session");
                    Self::open(&self.config).await?
                }
            };

            let mut answered = false;
            match self.exchange(&mut session, &request_id, traversal, &mut answered).await {
                Ok(rows) => {
                    *guard = Some(session);
                    return Ok(SubmitOutcome::from_rows(rows));
                }
                // The dropped session stays out of the slot
                Err(err @ GraphError::Connection(_)) => {
                    // Only resend what the server never answered
                    if retried || answered {
                        return Err(err);
                    }
                    warn!(error = %err, "Gremlin session dropped, reconnecting");
                    retried = true;
                }
                Err(err) => {
                    *guard = Some(session);
                    return Err(err);
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GremlinRequest<'a> {
    request_id: &'a str,
    op: &'static str,
    processor: &'static str,
    args: Value,
}

impl<'a> GremlinRequest<'a> {
    fn eval(request_id: &'a str, traversal: &Traversal) -> Self {
        Self {
            request_id,
            op: "eval",
            processor: "",
            args: json!({
                "gremlin": traversal.script(),
                "bindings": traversal.bindings(),
                "language": "gremlin-groovy",
            }),
        }
    }

    fn authentication(request_id: &'a str, sasl: String) -> Self {
        Self {
            request_id,
            op: "authentication",
            processor: "",
            args: json!({
                "saslMechanism": "PLAIN",
                "sasl": sasl,
            }),
        }
    }
}

/// `[mime length][mime type][json body]`
fn encode_request(request: &GremlinRequest<'_>) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(request)?;
    let mut frame = Vec::with_capacity(1 + MIME_TYPE.len() + body.len());
    frame.push(MIME_TYPE.len() as u8);
    frame.extend_from_slice(MIME_TYPE.as_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GremlinResponse {
    request_id: Option<String>,
    status: ResponseStatus,
    #[serde(default)]
    result: ResponseResult,
}

#[derive(Debug, Deserialize)]
struct ResponseStatus {
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    attributes: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseResult {
    #[serde(default)]
    data: Value,
}

impl ResponseStatus {
    fn into_error(self) -> GraphError {
        let backend_status = self
            .attributes
            .get("x-ms-status-code")
            .and_then(graphson::as_count);

        match backend_status {
            Some(409) => GraphError::Conflict(self.message),
            _ => GraphError::Server {
                code: self.code,
                message: self.message,
            },
        }
    }
}
