use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// HTTP-facing error taxonomy. Every handler returns `Result<_, AppError>`;
/// internal driver/store errors stay on the `anyhow` side and never reach here.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String, valid: Valid },
    NotFound { path: String },
    Internal(anyhow::Error),
}

#[derive(Debug)]
pub enum Valid {
    Coins(Vec<String>),
    Exchanges(Vec<String>),
    None,
}

impl AppError {
    pub fn bad_coin(coin: &str, valid_coins: &[&str]) -> Self {
        AppError::BadRequest {
            message: format!("unknown coin '{coin}'"),
            valid: Valid::Coins(valid_coins.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn bad_exchange(exchange: &str, valid_exchanges: &[&str]) -> Self {
        AppError::BadRequest {
            message: format!("unknown exchange '{exchange}'"),
            valid: Valid::Exchanges(valid_exchanges.iter().map(|s| s.to_string()).collect()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest { message, valid } => {
                let mut body = json!({ "error": message });
                match valid {
                    Valid::Coins(c) => body["validCoins"] = json!(c),
                    Valid::Exchanges(e) => body["validExchanges"] = json!(e),
                    Valid::None => {}
                }
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            AppError::NotFound { path } => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Not Found", "path": path })),
            )
                .into_response(),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "handler failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error", "message": err.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
