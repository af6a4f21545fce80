//! Browser helpers and the sync / AI clients

pub mod cache;
pub mod download;
pub mod firebase;
pub mod gas;
pub mod gemini;
pub mod log_trace;
pub mod period;
pub mod sheet_rows;
pub mod template;

use base64::Engine;
use web_sys::Storage;

// Shared helpers

pub fn local_storage() -> Option<Storage> {
    web_sys::window()?.local_storage().ok()?
}

pub fn storage_get(key: &str) -> Option<String> {
    let value = local_storage()?.get_item(key).ok()??;
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Returns false when storage is unavailable or full
pub fn storage_set(key: &str, value: &str) -> bool {
    local_storage()
        .map(|s| s.set_item(key, value).is_ok())
        .unwrap_or(false)
}

pub fn storage_remove(key: &str) {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(key);
    }
}

/// Base64 of raw bytes, for inline image payloads
pub fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Today's local date as `YYYY-MM-DD`
pub fn today_iso() -> String {
    let now = js_sys::Date::new_0();
    format!(
        "{:04}-{:02}-{:02}",
        now.get_full_year(),
        now.get_month() + 1,
        now.get_date()
    )
}

pub fn today() -> chrono::NaiveDate {
    period::parse_date(&today_iso()).unwrap_or_default()
}

/// Local wall-clock time as `HH:MM`
pub fn now_hhmm() -> String {
    let now = js_sys::Date::new_0();
    format!("{:02}:{:02}", now.get_hours(), now.get_minutes())
}

pub fn now_millis() -> f64 {
    js_sys::Date::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_base64() {
        assert_eq!(encode_base64(b"\x89PNG"), "iVBORw==");
        assert_eq!(encode_base64(b""), "");
    }
}
