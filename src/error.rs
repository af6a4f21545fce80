//! Error types shared by the sync, storage and AI layers

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("TIMEOUT_ERROR: Quá thời gian chờ ({0}s). Kiểm tra mạng.")]
    Timeout(u32),

    #[error("CORS_ERROR: Trình duyệt chặn hoặc Mất mạng. Kiểm tra Internet và quyền Script.")]
    Cors,

    #[error("AUTH_ERROR: Link đúng nhưng chưa cấp quyền 'Anyone' hoặc URL sai.")]
    Auth,

    #[error("JSON_ERROR: Dữ liệu trả về không đúng định dạng JSON.")]
    InvalidJson,

    #[error("EMPTY_ERROR: Server trả về dữ liệu rỗng.")]
    EmptyResponse,

    #[error("Lỗi Server Google ({status} - {status_text}).")]
    Server { status: u16, status_text: String },

    #[error("{0}")]
    Script(String),

    #[error("Chưa cấu hình {0}.")]
    MissingConfig(&'static str),

    #[error("URL Google Script không hợp lệ.")]
    InvalidUrl,

    #[error("{0}")]
    Ai(String),

    #[error("Lỗi trình duyệt: {0}")]
    Js(String),

    #[error("Lỗi dữ liệu: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AppError {
    /// Short code used in the trace log
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Timeout(_) => "TIMEOUT_ERROR",
            AppError::Cors => "CORS_ERROR",
            AppError::Auth => "AUTH_ERROR",
            AppError::InvalidJson => "JSON_ERROR",
            AppError::EmptyResponse => "EMPTY_ERROR",
            AppError::Server { .. } => "SERVER_ERROR",
            AppError::Script(_) => "SCRIPT_ERROR",
            AppError::MissingConfig(_) => "CONFIG_ERROR",
            AppError::InvalidUrl => "URL_ERROR",
            AppError::Ai(_) => "AI_ERROR",
            AppError::Js(_) => "JS_ERROR",
            AppError::Serde(_) => "SERDE_ERROR",
        }
    }

    /// Classifies a rejected `fetch` promise.
    /// AbortError comes from our own timeout, TypeError is what browsers
    /// report for CORS rejections and offline networks.
    pub fn from_fetch_rejection(err: &JsValue, timeout_secs: u32) -> Self {
        let name = js_sys::Reflect::get(err, &JsValue::from_str("name"))
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        match name.as_str() {
            "AbortError" => AppError::Timeout(timeout_secs),
            "TypeError" => AppError::Cors,
            _ => AppError::Js(format!("{:?}", err)),
        }
    }
}

impl From<JsValue> for AppError {
    fn from(value: JsValue) -> Self {
        AppError::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_keep_legacy_prefixes() {
        assert!(AppError::Timeout(15).to_string().starts_with("TIMEOUT_ERROR: "));
        assert!(AppError::Timeout(15).to_string().contains("(15s)"));
        assert!(AppError::Cors.to_string().starts_with("CORS_ERROR: "));
        assert!(AppError::Auth.to_string().starts_with("AUTH_ERROR: "));
        assert!(AppError::InvalidJson.to_string().starts_with("JSON_ERROR: "));
        assert!(AppError::EmptyResponse.to_string().starts_with("EMPTY_ERROR: "));
    }

    #[test]
    fn test_server_error_message() {
        let err = AppError::Server { status: 404, status_text: "Not Found".into() };
        assert_eq!(err.to_string(), "Lỗi Server Google (404 - Not Found).");
        assert_eq!(err.code(), "SERVER_ERROR");
    }

    #[test]
    fn test_serde_error_converts() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.code(), "SERDE_ERROR");
    }
}
