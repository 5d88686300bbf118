use axum::Json;
use serde::Serialize;

/// Success body shared by every route: `{ "success": true, "message": ..., ...payload }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

#[derive(Debug, Serialize)]
pub struct NoPayload {}

pub fn ok<T: Serialize>(message: &str, payload: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message: Some(message.to_string()),
        payload,
    })
}

pub fn ok_message(message: &str) -> Json<Envelope<NoPayload>> {
    ok(message, NoPayload {})
}

pub fn data<T: Serialize>(payload: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message: None,
        payload,
    })
}
