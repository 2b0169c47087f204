use crate::core::error::RateError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use tracing::warn;

const ERROR_KEY: &str = "Ошибка";
const RATE_NOT_FOUND: &str = "Обменный курс не найден";
const PARAMETERS_ERROR: &str = "Ошибка в параметрах";
const UPSTREAM_UNAVAILABLE: &str = "Источник данных недоступен";

pub type ApiResult<T> = Result<T, RateError>;

fn error_body(key: &str, message: impl Into<String>) -> Value {
    let mut body = Map::new();
    body.insert(key.to_string(), Value::String(message.into()));
    Value::Object(body)
}

impl RateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RateError::NotFound(_) => StatusCode::NOT_FOUND,
            RateError::MalformedInput(_) | RateError::Validation { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            RateError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RateError {
    fn into_response(self) -> Response {
        warn!(error = %self, "Request failed");
        let status = self.status_code();
        let body = match self {
            RateError::NotFound(_) => error_body(ERROR_KEY, RATE_NOT_FOUND),
            RateError::MalformedInput(_) => error_body("error", "Error in parameters"),
            RateError::Validation { message } => error_body(
                ERROR_KEY,
                message.unwrap_or_else(|| PARAMETERS_ERROR.to_string()),
            ),
            RateError::UpstreamUnavailable(_) => error_body(ERROR_KEY, UPSTREAM_UNAVAILABLE),
        };
        (status, Json(body)).into_response()
    }
}
