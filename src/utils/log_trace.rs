//! Time-ordered trace log
//! Every sync, storage and AI step is recorded here so it can be inspected
//! or exported from the settings page after the fact.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::utils::{download, storage_get, storage_set};

const MAX_LOG_ENTRIES: usize = 1000;
const STORAGE_KEY: &str = "policeApp_LogTrace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Storage,
    GasSync,
    Firebase,
    Ai,
    UiAction,
    Report,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Storage => "storage",
            Category::GasSync => "gas-sync",
            Category::Firebase => "firebase",
            Category::Ai => "ai",
            Category::UiAction => "ui-action",
            Category::Report => "report",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub category: Category,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

pub struct LogTrace {
    logs: VecDeque<LogEntry>,
}

impl LogTrace {
    fn empty() -> Self {
        LogTrace {
            logs: VecDeque::with_capacity(MAX_LOG_ENTRIES),
        }
    }

    pub fn new() -> Self {
        let mut trace = Self::empty();
        if let Some(json) = storage_get(STORAGE_KEY) {
            if let Ok(logs) = serde_json::from_str::<Vec<LogEntry>>(&json) {
                trace.logs = logs.into_iter().collect();
            }
        }
        trace
    }

    /// Appends to the ring buffer, dropping the oldest entry when full
    fn record(&mut self, entry: LogEntry) {
        while self.logs.len() >= MAX_LOG_ENTRIES {
            self.logs.pop_front();
        }
        self.logs.push_back(entry);
    }

    pub fn log(&mut self, level: LogLevel, category: Category, message: &str, data: Option<serde_json::Value>) {
        let timestamp = js_sys::Date::new_0().to_iso_string().as_string().unwrap_or_default();

        let line = wasm_bindgen::JsValue::from_str(&format!("[{}] {}", category.as_str(), message));
        // Plain objects so the console can expand them
        let detail = data
            .as_ref()
            .and_then(|d| d.serialize(&serde_wasm_bindgen::Serializer::json_compatible()).ok())
            .unwrap_or(wasm_bindgen::JsValue::UNDEFINED);
        match level {
            LogLevel::Error => web_sys::console::error_2(&line, &detail),
            LogLevel::Warn => web_sys::console::warn_2(&line, &detail),
            LogLevel::Debug => web_sys::console::debug_2(&line, &detail),
            LogLevel::Info => web_sys::console::log_2(&line, &detail),
        }

        self.record(LogEntry {
            timestamp,
            level,
            category,
            message: message.to_string(),
            data,
        });
        self.save_to_storage();
    }

    pub fn get_logs_json(&self) -> String {
        serde_json::to_string_pretty(&self.logs).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn clear(&mut self) {
        self.logs.clear();
        self.save_to_storage();
    }

    fn save_to_storage(&self) {
        let json = serde_json::to_string(&self.logs).unwrap_or_else(|_| "[]".to_string());
        storage_set(STORAGE_KEY, &json);
    }
}

// Global instance
thread_local! {
    static LOG_TRACE: std::cell::RefCell<LogTrace> = std::cell::RefCell::new(LogTrace::new());
}

fn with_trace<R>(f: impl FnOnce(&mut LogTrace) -> R) -> R {
    LOG_TRACE.with(|trace| f(&mut trace.borrow_mut()))
}

pub fn log_debug(category: Category, message: &str) {
    with_trace(|t| t.log(LogLevel::Debug, category, message, None));
}

pub fn log_info(category: Category, message: &str) {
    with_trace(|t| t.log(LogLevel::Info, category, message, None));
}

pub fn log_info_with_data(category: Category, message: &str, data: serde_json::Value) {
    with_trace(|t| t.log(LogLevel::Info, category, message, Some(data)));
}

pub fn log_warn(category: Category, message: &str) {
    with_trace(|t| t.log(LogLevel::Warn, category, message, None));
}

pub fn log_error(category: Category, message: &str) {
    with_trace(|t| t.log(LogLevel::Error, category, message, None));
}

pub fn log_error_with_data(category: Category, message: &str, data: serde_json::Value) {
    with_trace(|t| t.log(LogLevel::Error, category, message, Some(data)));
}

pub fn clear_logs() {
    with_trace(|t| t.clear());
}

pub fn get_logs_json() -> String {
    with_trace(|t| t.get_logs_json())
}

pub fn download_logs() {
    let json = get_logs_json();
    let timestamp = js_sys::Date::new_0().to_iso_string().as_string().unwrap_or_default();
    let filename = format!("log_trace_{}.json", timestamp.replace([':', '.'], "-"));
    download::download_file(&filename, "application/json", &json);
}

pub async fn copy_logs_to_clipboard() -> Result<(), String> {
    let json = get_logs_json();
    let window = web_sys::window().ok_or_else(|| "Không truy cập được cửa sổ trình duyệt".to_string())?;
    let promise = window.navigator().clipboard().write_text(&json);
    match wasm_bindgen_futures::JsFuture::from(promise).await {
        Ok(_) => {
            log_info(Category::UiAction, "Đã sao chép nhật ký vào bộ nhớ tạm");
            Ok(())
        }
        Err(e) => {
            let msg = format!("Sao chép nhật ký thất bại: {:?}", e);
            log_error(Category::UiAction, &msg);
            Err(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: usize) -> LogEntry {
        LogEntry {
            timestamp: format!("t{}", i),
            level: LogLevel::Info,
            category: Category::Storage,
            message: i.to_string(),
            data: None,
        }
    }

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let mut trace = LogTrace::empty();
        for i in 0..MAX_LOG_ENTRIES + 5 {
            trace.record(entry(i));
        }
        assert_eq!(trace.logs.len(), MAX_LOG_ENTRIES);
        assert_eq!(trace.logs.front().map(|e| e.message.as_str()), Some("5"));
    }

    #[test]
    fn test_entry_wire_format() {
        let json = serde_json::to_value(LogEntry {
            category: Category::GasSync,
            level: LogLevel::Warn,
            ..entry(1)
        })
        .unwrap();
        assert_eq!(json["category"], "gas-sync");
        assert_eq!(json["level"], "warn");
        assert!(json.get("data").is_none());
    }
}
