use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

// Every endpoint answers with the same envelope: success flag, a short
// human-readable message, and the payload under `data`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: "Success".to_string(),
            data: Some(data),
        })
    }

    pub fn message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }

    pub fn created(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        (
            StatusCode::CREATED,
            Json(Self {
                success: true,
                message: message.into(),
                data: Some(data),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let Json(body) = ApiResponse::ok(serde_json::json!({ "value": 1 }));
        let rendered = serde_json::to_value(&body).unwrap();
        assert_eq!(rendered["success"], true);
        assert_eq!(rendered["message"], "Success");
        assert_eq!(rendered["data"]["value"], 1);
    }
}
