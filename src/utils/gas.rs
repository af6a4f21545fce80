//! Google Apps Script sync
//!
//! The deployed script (`gas/PoliceAppSync.gs`) exposes one sheet per record
//! list. Writes are POSTed as `text/plain` so the browser skips the CORS
//! preflight; the script parses `postData.contents` as JSON.

use serde::Serialize;
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Request, RequestCredentials, RequestInit, RequestRedirect, Response};

use crate::crud::Record;
use crate::error::{AppError, AppResult};
use crate::models::{AppData, CloudData, GoogleSheetsConfig};
use crate::utils::log_trace::{log_error, log_error_with_data, log_info, log_warn, Category};
use crate::utils::{firebase, now_millis, sheet_rows, storage_get, storage_set};

const CONFIG_KEY: &str = "policeApp_GoogleConfig_Script";
pub const DEFAULT_SCRIPT_URL: &str = "https://script.google.com/macros/s/AKfycbyynB7OHAZbWIE_LHzNooxtXYjqF_DWIMvq_jwnI1LtdEdIwRveEoJ-G3lnIxZ1foqm/exec";
const IMPORT_TIMEOUT_SECS: u32 = 15;

// ============================================
// Configuration
// ============================================

/// Build time of the bundled Apps Script, embedded by build.rs
pub fn format_gas_modified_time() -> String {
    let timestamp: i64 = option_env!("GAS_SCRIPT_MODIFIED")
        .unwrap_or("0")
        .parse()
        .unwrap_or(0);
    let Some(utc) = chrono::DateTime::from_timestamp(timestamp, 0).filter(|_| timestamp > 0) else {
        return "Mã Apps Script cập nhật: không rõ".to_string();
    };
    // Hanoi is UTC+7
    let local = chrono::FixedOffset::east_opt(7 * 3600).map(|tz| utc.with_timezone(&tz));
    match local {
        Some(t) => format!("Mã Apps Script cập nhật: {}", t.format("%d/%m/%Y %H:%M")),
        None => format!("Mã Apps Script cập nhật: {}", utc.format("%d/%m/%Y %H:%M UTC")),
    }
}

pub fn load_config() -> Option<GoogleSheetsConfig> {
    serde_json::from_str(&storage_get(CONFIG_KEY)?).ok()
}

/// The configured script URL, or the built-in deployment
pub fn script_url() -> String {
    load_config()
        .map(|c| c.script_url)
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_SCRIPT_URL.to_string())
}

/// Only deployed web-app URLs (`.../exec`) are accepted
pub fn validate_script_url(url: &str) -> AppResult<()> {
    if url.trim().contains("/exec") {
        Ok(())
    } else {
        Err(AppError::Script(
            "Lưu thất bại: URL không hợp lệ. URL phải kết thúc bằng \"/exec\"".to_string(),
        ))
    }
}

/// Stores the config and switches the app to the Sheets backend.
/// Callers reload the page afterwards.
pub fn save_config(config: &GoogleSheetsConfig) -> AppResult<()> {
    validate_script_url(&config.script_url)?;
    let config = GoogleSheetsConfig {
        script_url: config.script_url.trim().to_string(),
        auto_sync: config.auto_sync,
    };
    storage_set(CONFIG_KEY, &serde_json::to_string(&config)?);
    firebase::set_enabled(false);
    log_info(Category::GasSync, &format!("Đã lưu URL Apps Script: {}", config.script_url));
    Ok(())
}

/// Reads `?gas=<url>` and stores it, then strips the parameter from the address bar
pub fn init_gas_from_url_params() -> Option<String> {
    let window = web_sys::window()?;
    let search = window.location().search().ok()?;
    let encoded = search.strip_prefix("?gas=")?;
    let decoded = js_sys::decode_uri_component(encoded).ok()?.as_string()?;
    if validate_script_url(&decoded).is_err() {
        log_warn(Category::GasSync, "Bỏ qua tham số ?gas= không hợp lệ");
        return None;
    }

    let config = GoogleSheetsConfig { script_url: decoded.clone(), auto_sync: true };
    storage_set(CONFIG_KEY, &serde_json::to_string(&config).ok()?);

    let pathname = window.location().pathname().ok()?;
    let hash = window.location().hash().ok().unwrap_or_default();
    if let Ok(history) = window.history() {
        let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(&format!("{}{}", pathname, hash)));
    }
    log_info(Category::GasSync, "Đã nhận URL Apps Script từ liên kết chia sẻ");
    Some(decoded)
}

/// Link to this app that carries the current script URL
pub fn generate_gas_share_url() -> Option<String> {
    let gas_url = script_url();
    let location = web_sys::window()?.location();
    let base_url = format!(
        "{}//{}{}",
        location.protocol().ok()?,
        location.host().ok()?,
        location.pathname().ok()?
    );
    let encoded = js_sys::encode_uri_component(&gas_url).as_string()?;
    Some(format!("{}?gas={}", base_url, encoded))
}

// ============================================
// Payloads
// ============================================

pub fn append_payload<T: Serialize>(sheet_name: &str, item: &T) -> AppResult<Value> {
    let data = serde_json::to_value(item)?;
    Ok(json!({ "action": "append", "sheetName": sheet_name, "data": data }))
}

pub fn update_sheet_payload<T: Serialize>(sheet_name: &str, list: &[T]) -> AppResult<Value> {
    let data = serde_json::to_value(list)?;
    Ok(json!({ "action": "update_sheet", "sheetName": sheet_name, "data": data }))
}

/// Older script versions read the lists from the top level, newer ones from `data`
pub fn full_sync_payload(data: &AppData) -> AppResult<Value> {
    let data_value = serde_json::to_value(data)?;
    let mut payload = match &data_value {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    payload.insert("action".into(), json!("full_sync"));
    payload.insert("data".into(), data_value);
    Ok(Value::Object(payload))
}

/// Query string for a read, cache-busted with the current time
pub fn read_url(script_url: &str, now_ms: u64) -> AppResult<String> {
    let url = script_url.trim();
    if url.is_empty() {
        return Err(AppError::MissingConfig("URL (Link) của Google Script"));
    }
    if !url.starts_with("http") {
        return Err(AppError::InvalidUrl);
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}t={}&action=read", url, sep, now_ms))
}

/// `{status:"error", message}` replies from the script
fn script_error(body: &str) -> Option<AppError> {
    let value: Value = serde_json::from_str(body).ok()?;
    if value.get("status").and_then(Value::as_str) != Some("error") {
        return None;
    }
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Script trả về lỗi.");
    Some(AppError::Script(message.to_string()))
}

// ============================================
// Transport
// ============================================

async fn response_text(resp: &Response) -> AppResult<String> {
    let text = JsFuture::from(resp.text()?).await?;
    Ok(text.as_string().unwrap_or_default())
}

async fn post(script_url: &str, payload: &Value) -> AppResult<()> {
    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_body(&JsValue::from_str(&payload.to_string()));

    let request = Request::new_with_str_and_init(script_url, &opts)?;
    request.headers().set("Content-Type", "text/plain;charset=utf-8")?;

    let window = web_sys::window().ok_or_else(|| AppError::Js("window".into()))?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| AppError::from_fetch_rejection(&e, 0))?;
    let resp: Response = resp_value.dyn_into()?;

    let body = response_text(&resp).await?;
    match script_error(&body) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Sends a write and logs the outcome. A CORS rejection may still mean the
/// script received the data, so it is only a warning.
async fn send_payload(script_url: &str, payload: Value) -> AppResult<()> {
    if script_url.is_empty() {
        return Ok(());
    }
    let action = payload.get("action").and_then(Value::as_str).unwrap_or("?").to_string();
    let result = post(script_url, &payload).await;
    match &result {
        Ok(()) => log_info(Category::GasSync, &format!("Gửi '{}' thành công", action)),
        Err(AppError::Cors) => log_warn(
            Category::GasSync,
            "Trình duyệt chặn phản hồi (CORS); dữ liệu có thể đã được gửi",
        ),
        Err(e) => log_error_with_data(
            Category::GasSync,
            &format!("Gửi '{}' thất bại: {}", action, e),
            json!({ "action": action, "code": e.code() }),
        ),
    }
    result
}

/// Appends one new row to the record's sheet
pub async fn append_row<T: Record>(item: &T) {
    match append_payload(T::COLLECTION, item) {
        Ok(payload) => {
            let _ = send_payload(&script_url(), payload).await;
        }
        Err(e) => log_error(Category::GasSync, &e.to_string()),
    }
}

/// Replaces the record's sheet with the whole list
pub async fn update_sheet<T: Record>(list: &[T]) {
    match update_sheet_payload(T::COLLECTION, list) {
        Ok(payload) => {
            let _ = send_payload(&script_url(), payload).await;
        }
        Err(e) => log_error(Category::GasSync, &e.to_string()),
    }
}

/// Manual push of every list
pub async fn full_sync(data: &AppData) -> AppResult<()> {
    let url = script_url();
    if url.is_empty() {
        return Err(AppError::MissingConfig("URL (Link) của Google Script"));
    }
    send_payload(&url, full_sync_payload(data)?).await
}

/// Reads every sheet. Aborts after 15 s.
pub async fn import_from_sheets(script_url: &str) -> AppResult<CloudData> {
    let url = read_url(script_url, now_millis() as u64)?;
    log_info(Category::GasSync, "Đang tải dữ liệu từ Google Sheets");

    let controller = AbortController::new()?;
    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_redirect(RequestRedirect::Follow);
    opts.set_credentials(RequestCredentials::Omit);
    opts.set_signal(Some(&controller.signal()));

    let request = Request::new_with_str_and_init(&url, &opts)?;
    let window = web_sys::window().ok_or_else(|| AppError::Js("window".into()))?;

    // Dropping the timer before it fires cancels the abort
    let abort_timer = {
        let controller = controller.clone();
        gloo::timers::callback::Timeout::new(IMPORT_TIMEOUT_SECS * 1000, move || controller.abort())
    };

    let result = async {
        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| AppError::from_fetch_rejection(&e, IMPORT_TIMEOUT_SECS))?;
        let resp: Response = resp_value.dyn_into()?;
        if !resp.ok() {
            return Err(AppError::Server { status: resp.status(), status_text: resp.status_text() });
        }
        let text = JsFuture::from(resp.text()?)
            .await
            .map_err(|e| AppError::from_fetch_rejection(&e, IMPORT_TIMEOUT_SECS))?;
        sheet_rows::parse_read_response(&text.as_string().unwrap_or_default())
    }
    .await;
    drop(abort_timer);

    match &result {
        Ok(_) => log_info(Category::GasSync, "Tải dữ liệu Google Sheets hoàn tất"),
        Err(e) => log_error(Category::GasSync, &format!("[{}] {}", e.code(), e)),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DailyTask;

    #[test]
    fn test_append_payload() {
        let task = DailyTask { id: "d1".into(), date: "2024-05-01".into(), ..Default::default() };
        let payload = append_payload("dailyTasks", &task).unwrap();
        assert_eq!(payload["action"], "append");
        assert_eq!(payload["sheetName"], "dailyTasks");
        assert_eq!(payload["data"]["id"], "d1");
    }

    #[test]
    fn test_update_sheet_payload_sends_whole_list() {
        let tasks = vec![DailyTask { id: "a".into(), ..Default::default() }, DailyTask { id: "b".into(), ..Default::default() }];
        let payload = update_sheet_payload("dailyTasks", &tasks).unwrap();
        assert_eq!(payload["action"], "update_sheet");
        assert_eq!(payload["data"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_full_sync_payload_has_legacy_top_level_lists() {
        let mut data = AppData::default();
        data.daily_tasks.push(DailyTask { id: "d1".into(), ..Default::default() });
        let payload = full_sync_payload(&data).unwrap();
        assert_eq!(payload["action"], "full_sync");
        assert_eq!(payload["dailyTasks"][0]["id"], "d1");
        assert_eq!(payload["data"]["dailyTasks"][0]["id"], "d1");
        assert!(payload["data"].get("action").is_none());
    }

    #[test]
    fn test_read_url() {
        assert_eq!(
            read_url("https://script.google.com/macros/s/X/exec", 42).unwrap(),
            "https://script.google.com/macros/s/X/exec?t=42&action=read"
        );
        assert_eq!(read_url("https://h/exec?v=1", 1).unwrap(), "https://h/exec?v=1&t=1&action=read");
        assert!(matches!(read_url("", 1), Err(AppError::MissingConfig(_))));
        assert!(matches!(read_url("ftp://x", 1), Err(AppError::InvalidUrl)));
    }

    #[test]
    fn test_missing_url_message() {
        let err = read_url("  ", 1).unwrap_err();
        assert_eq!(err.to_string(), "Chưa cấu hình URL (Link) của Google Script.");
    }

    #[test]
    fn test_script_error_detection() {
        assert!(script_error(r#"{"status":"success"}"#).is_none());
        assert!(script_error("not json").is_none());
        let err = script_error(r#"{"status":"error","message":"Sheet not found"}"#).unwrap();
        assert_eq!(err.to_string(), "Sheet not found");
        let err = script_error(r#"{"status":"error"}"#).unwrap();
        assert_eq!(err.to_string(), "Script trả về lỗi.");
    }

    #[test]
    fn test_validate_script_url() {
        assert!(validate_script_url(DEFAULT_SCRIPT_URL).is_ok());
        assert!(validate_script_url("https://script.google.com/macros/s/X/dev").is_err());
    }
}
