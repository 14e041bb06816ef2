use super::DistributorState;
use crate::dispatcher;
use crate::error::DistributorError;
use crate::proto::LogPacket;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response};
use serde::Deserialize;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

fn json_response(status: u16, body: String) -> Response<BoxBody> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(full_body(body))
        .unwrap()
}

/// 400s every `DistributorError::MalformedRequest` with a structured JSON body.
fn malformed_request_response(err: DistributorError) -> Response<BoxBody> {
    json_response(400, serde_json::json!({"error": err.to_string()}).to_string())
}

/// Wire schema for `POST /ingest`: a strict, explicitly-optional shape
/// validated once at the edge rather than trusted loosely downstream.
#[derive(Deserialize)]
struct IngestRequest {
    #[serde(default = "default_source_id")]
    source_id: String,
    messages: Vec<IngestMessage>,
}

fn default_source_id() -> String {
    "sim".to_string()
}

#[derive(Deserialize)]
struct IngestMessage {
    #[serde(default)]
    timestamp: String,
    #[serde(default = "default_level")]
    level: String,
    message: String,
    #[serde(default)]
    attrs: std::collections::HashMap<String, String>,
}

fn default_level() -> String {
    "INFO".to_string()
}

pub async fn handle_request(
    req: Request<Incoming>,
    state: DistributorState,
) -> Result<Response<BoxBody>, hyper::Error> {
    let path = req.uri().path().to_string();
    match (req.method(), path.as_str()) {
        (&hyper::Method::POST, "/ingest") => Ok(handle_ingest(req, state).await),
        (&hyper::Method::GET, "/health" | "/healthz") => Ok(handle_health(&state)),
        (&hyper::Method::GET, "/metrics") => Ok(Response::builder()
            .status(200)
            .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
            .body(full_body(state.metrics.render()))
            .unwrap()),
        _ => Ok(json_response(404, r#"{"error":"not found"}"#.to_string())),
    }
}

async fn handle_ingest(req: Request<Incoming>, state: DistributorState) -> Response<BoxBody> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return malformed_request_response(DistributorError::MalformedRequest("unreadable body".to_string())),
    };

    let parsed: IngestRequest = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => return malformed_request_response(DistributorError::MalformedRequest(e.to_string())),
    };

    if parsed.messages.is_empty() {
        return malformed_request_response(DistributorError::MalformedRequest(
            "messages must be non-empty".to_string(),
        ));
    }

    if parsed.messages.iter().any(|m| m.message.is_empty()) {
        return malformed_request_response(DistributorError::MalformedRequest(
            "message must be non-empty".to_string(),
        ));
    }

    let packet = LogPacket {
        source_id: parsed.source_id,
        messages: parsed
            .messages
            .into_iter()
            .map(|m| crate::proto::LogMessage {
                timestamp: m.timestamp,
                level: m.level,
                message: m.message,
                attrs: m.attrs,
            })
            .collect(),
    };

    let weights = state.current_weights();
    let outcome = dispatcher::dispatch(
        packet,
        &state.analyzer_names,
        &weights,
        &state.breakers,
        state.pool.as_ref(),
        state.config.analyzer_timeout,
    )
    .await;

    match outcome {
        Ok(o) => json_response(
            200,
            serde_json::json!({"accepted_by": o.accepted_by, "count": o.count}).to_string(),
        ),
        Err(DistributorError::NoAnalyzers) => {
            json_response(503, r#"{"error":"no analyzers configured"}"#.to_string())
        }
        Err(DistributorError::AllBlocked) => json_response(
            503,
            r#"{"error":"all analyzers blocked by circuit breakers"}"#.to_string(),
        ),
        Err(e) => json_response(500, serde_json::json!({"error": e.to_string()}).to_string()),
    }
}

fn handle_health(state: &DistributorState) -> Response<BoxBody> {
    let weights: &std::collections::HashMap<String, f64> = &state.current_weights();
    let breakers = state.breakers.snapshot_all();
    let body = serde_json::json!({
        "ok": true,
        "analyzers": state.analyzer_names.as_ref(),
        "weights": weights,
        "breakers": breakers,
    });
    json_response(200, body.to_string())
}
