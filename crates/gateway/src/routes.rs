use std::sync::Arc;

use {
    axum::{
        body::Bytes,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Json, Response},
    },
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::{info, warn},
};

use pairgate_session::{SessionError, SessionStatus, user_jid};

use crate::{error::GatewayError, state::GatewayState};

/// Outcome of a successful send.
const SENT: &str = "EXITO";

#[derive(Debug, Serialize)]
pub struct StatusBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
}

impl StatusBody {
    fn session(status: SessionStatus) -> Json<Self> {
        Json(Self {
            status: status.as_str(),
            result: None,
        })
    }
}

/// Body of `POST /enviar`. `datos` stays raw so the signature is checked
/// against exactly what the caller sent. An explicit `null` is signed like
/// any other value; only a missing key is `None`.
#[derive(Debug, Deserialize)]
struct SendRequest {
    #[serde(default, deserialize_with = "present")]
    datos: Option<Value>,
    hash: Option<String>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
struct OutboundMessage {
    telefono: String,
    contenido: String,
}

pub async fn ping() -> StatusCode {
    StatusCode::OK
}

pub async fn estado(State(state): State<Arc<GatewayState>>) -> Json<StatusBody> {
    StatusBody::session(state.session.status())
}

/// Connected: report it. Otherwise re-announce the current pairing code on
/// the broadcast channel; the response does not wait for the render.
pub async fn qr(State(state): State<Arc<GatewayState>>) -> Response {
    if state.session.is_connected() {
        return StatusBody::session(SessionStatus::Connected).into_response();
    }
    state
        .broadcaster
        .code(state.session.publisher().code(), false);
    StatusCode::ACCEPTED.into_response()
}

pub async fn enviar(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Result<Json<StatusBody>, GatewayError> {
    let request: SendRequest =
        serde_json::from_slice(&body).map_err(|e| GatewayError::BadRequest(e.to_string()))?;

    let hash = request
        .hash
        .filter(|h| !h.is_empty())
        .ok_or(GatewayError::MissingSignature)?;
    let datos = request
        .datos
        .ok_or_else(|| GatewayError::Payload("missing datos".into()))?;
    if !state.signer.verify(&datos, &hash) {
        return Err(GatewayError::SignatureMismatch);
    }

    if !state.session.is_connected() {
        return Ok(StatusBody::session(SessionStatus::Disconnected));
    }

    let message: OutboundMessage =
        serde_json::from_value(datos).map_err(|e| GatewayError::Payload(e.to_string()))?;
    let jid = user_jid(&message.telefono);

    match state.session.send_message(&jid, &message.contenido).await {
        Ok(receipt) => {
            info!(%jid, "message sent");
            Ok(Json(StatusBody {
                status: SENT,
                result: Some(receipt),
            }))
        },
        Err(SessionError::NotConnected) => {
            warn!(%jid, "session dropped before send");
            Ok(StatusBody::session(SessionStatus::Disconnected))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn health(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "connections": state.client_count(),
        "session": state.session.status().as_str(),
    }))
}
