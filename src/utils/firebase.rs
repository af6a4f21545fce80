//! Cloud Firestore sync over the REST API
//!
//! Each record list is one collection whose document ids are the record ids.
//! Listeners poll the collection and hand over the whole list when it changes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{json, Map, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Request, RequestInit, Response};

use crate::crud::Record;
use crate::error::{AppError, AppResult};
use crate::models::{AppData, FirebaseConfig};
use crate::utils::log_trace::{log_debug, log_error, log_info, Category};
use crate::utils::{storage_get, storage_set};

const CONFIG_KEY: &str = "policeApp_FirebaseConfig";
const POLL_INTERVAL_MS: u32 = 5000;
const PAGE_SIZE: u32 = 300;
const SETTINGS_COLLECTION: &str = "settings";
const TEMPLATES_DOC: &str = "templates";

// ============================================
// Configuration
// ============================================

pub fn load_config() -> FirebaseConfig {
    storage_get(CONFIG_KEY)
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

/// Stores the config with the backend switched on
pub fn save_config(config: &FirebaseConfig) -> AppResult<()> {
    let config = FirebaseConfig { enabled: true, ..config.clone() };
    storage_set(CONFIG_KEY, &serde_json::to_string(&config)?);
    log_info(Category::Firebase, &format!("Đã lưu cấu hình Firebase cho dự án '{}'", config.project_id));
    Ok(())
}

pub fn set_enabled(enabled: bool) {
    let mut config = load_config();
    if config.enabled == enabled {
        return;
    }
    config.enabled = enabled;
    if let Ok(json) = serde_json::to_string(&config) {
        storage_set(CONFIG_KEY, &json);
    }
}

fn documents_base(config: &FirebaseConfig) -> String {
    format!(
        "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
        config.project_id
    )
}

fn encode(part: &str) -> String {
    js_sys::encode_uri_component(part).as_string().unwrap_or_default()
}

// ============================================
// Value codec
// ============================================

/// JSON value to a Firestore typed value
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_firestore_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": to_firestore_fields(map) } }),
    }
}

pub fn to_firestore_fields(map: &Map<String, Value>) -> Value {
    let fields: Map<String, Value> = map
        .iter()
        .map(|(k, v)| (k.clone(), to_firestore_value(v)))
        .collect();
    Value::Object(fields)
}

/// Firestore typed value back to plain JSON. Unknown kinds become null.
pub fn from_firestore_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|m| m.iter().next()) else {
        return Value::Null;
    };
    match kind.as_str() {
        "booleanValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| inner.as_i64())
            .map(Value::from)
            .unwrap_or(Value::Null),
        "doubleValue" => inner
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(from_firestore_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(from_firestore_fields(inner.get("fields"))),
        _ => Value::Null,
    }
}

pub fn from_firestore_fields(fields: Option<&Value>) -> Map<String, Value> {
    fields
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), from_firestore_value(v))).collect())
        .unwrap_or_default()
}

/// A listed document as plain JSON, with `id` taken from the document name
pub fn decode_document(doc: &Value) -> Value {
    let mut map = from_firestore_fields(doc.get("fields"));
    let id = doc
        .get("name")
        .and_then(Value::as_str)
        .and_then(|name| name.rsplit('/').next())
        .unwrap_or_default();
    map.insert("id".into(), Value::String(id.to_string()));
    Value::Object(map)
}

/// Field path for an update mask; non-identifier keys are backquoted
fn field_path(key: &str) -> String {
    let simple = key.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        key.to_string()
    } else {
        format!("`{}`", key.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

pub fn update_mask_query(map: &Map<String, Value>) -> String {
    map.keys()
        .map(|k| format!("updateMask.fieldPaths={}", encode_query_part(&field_path(k))))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_query_part(part: &str) -> String {
    if part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        part.to_string()
    } else {
        encode(part)
    }
}

fn as_object(value: Value) -> AppResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Js("Bản ghi không phải là đối tượng".into())),
    }
}

// ============================================
// REST transport
// ============================================

async fn request(method: &str, url: &str, body: Option<&Value>) -> AppResult<Value> {
    let opts = RequestInit::new();
    opts.set_method(method);
    if let Some(body) = body {
        opts.set_body(&JsValue::from_str(&body.to_string()));
    }
    let request = Request::new_with_str_and_init(url, &opts)?;
    if body.is_some() {
        request.headers().set("Content-Type", "application/json")?;
    }

    let window = web_sys::window().ok_or_else(|| AppError::Js("window".into()))?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| AppError::from_fetch_rejection(&e, 0))?;
    let resp: Response = resp_value.dyn_into()?;
    let text = JsFuture::from(resp.text()?).await?.as_string().unwrap_or_default();

    if !resp.ok() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| resp.status_text());
        return Err(AppError::Server { status: resp.status(), status_text: message });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// All documents of a collection, following page tokens
pub async fn list_documents(config: &FirebaseConfig, collection: &str) -> AppResult<Vec<Value>> {
    let mut docs = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let mut url = format!(
            "{}/{}?key={}&pageSize={}",
            documents_base(config),
            collection,
            encode(&config.api_key),
            PAGE_SIZE
        );
        if let Some(token) = &page_token {
            url.push_str(&format!("&pageToken={}", encode(token)));
        }
        let page = request("GET", &url, None).await?;
        if let Some(items) = page.get("documents").and_then(Value::as_array) {
            docs.extend(items.iter().map(decode_document));
        }
        page_token = page.get("nextPageToken").and_then(Value::as_str).map(str::to_string);
        if page_token.is_none() {
            break;
        }
    }
    Ok(docs)
}

fn document_url(config: &FirebaseConfig, collection: &str, id: &str) -> String {
    format!(
        "{}/{}/{}?key={}",
        documents_base(config),
        collection,
        encode(id),
        encode(&config.api_key)
    )
}

/// Writes the whole document, replacing any previous content
pub async fn set_document(config: &FirebaseConfig, collection: &str, id: &str, data: &Map<String, Value>) -> AppResult<()> {
    let body = json!({ "fields": to_firestore_fields(data) });
    request("PATCH", &document_url(config, collection, id), Some(&body)).await?;
    Ok(())
}

/// Writes only the given fields
pub async fn merge_document(config: &FirebaseConfig, collection: &str, id: &str, data: &Map<String, Value>) -> AppResult<()> {
    let url = format!("{}&{}", document_url(config, collection, id), update_mask_query(data));
    let body = json!({ "fields": to_firestore_fields(data) });
    request("PATCH", &url, Some(&body)).await?;
    Ok(())
}

pub async fn delete_document(config: &FirebaseConfig, collection: &str, id: &str) -> AppResult<()> {
    request("DELETE", &document_url(config, collection, id), None).await?;
    Ok(())
}

// ============================================
// Record operations
// ============================================

/// Stores a new record under its own id
pub async fn add_item<T: Record>(config: &FirebaseConfig, item: &T) {
    let result = async {
        let data = as_object(serde_json::to_value(item)?)?;
        set_document(config, T::COLLECTION, item.id(), &data).await
    }
    .await;
    if let Err(e) = result {
        log_error(Category::Firebase, &format!("Lỗi thêm vào {}: {}", T::COLLECTION, e));
    }
}

pub async fn update_item<T: Record>(config: &FirebaseConfig, item: &T) {
    if item.id().is_empty() {
        return;
    }
    let result = async {
        let data = as_object(serde_json::to_value(item)?)?;
        merge_document(config, T::COLLECTION, item.id(), &data).await
    }
    .await;
    if let Err(e) = result {
        log_error(Category::Firebase, &format!("Lỗi cập nhật {}: {}", T::COLLECTION, e));
    }
}

pub async fn delete_item<T: Record>(config: &FirebaseConfig, id: &str) {
    if let Err(e) = delete_document(config, T::COLLECTION, id).await {
        log_error(Category::Firebase, &format!("Lỗi xoá khỏi {}: {}", T::COLLECTION, e));
    }
}

async fn push_list<T: Record>(config: &FirebaseConfig, list: &[T]) -> AppResult<()> {
    for item in list {
        let data = as_object(serde_json::to_value(item)?)?;
        set_document(config, T::COLLECTION, item.id(), &data).await?;
    }
    log_debug(Category::Firebase, &format!("Đã đẩy {} bản ghi vào {}", list.len(), T::COLLECTION));
    Ok(())
}

/// One-time upload of every list plus the letter templates
pub async fn push_all(config: &FirebaseConfig, data: &AppData) -> AppResult<()> {
    if !config.is_usable() {
        return Err(AppError::MissingConfig("Firebase"));
    }
    push_list(config, &data.traffic_accidents).await?;
    push_list(config, &data.vehicle_registrations).await?;
    push_list(config, &data.events).await?;
    push_list(config, &data.daily_tasks).await?;
    push_list(config, &data.verification_requests).await?;
    push_list(config, &data.advisory_documents).await?;

    let templates = json!({
        "list": serde_json::to_value(&data.response_document_templates)?,
        "selectedId": data.selected_document_template_id,
    });
    set_document(config, SETTINGS_COLLECTION, TEMPLATES_DOC, &as_object(templates)?).await?;
    log_info(Category::Firebase, "Đã đẩy toàn bộ dữ liệu lên Firebase");
    Ok(())
}

// ============================================
// Listeners
// ============================================

/// Decodes a listed collection; documents that do not fit the record shape are skipped
pub fn decode_records<T: Record>(docs: Vec<Value>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| serde_json::from_value(doc).ok())
        .collect()
}

/// Checks that the project answers before listeners are attached
pub async fn connect(config: &FirebaseConfig) -> AppResult<()> {
    if !config.is_usable() {
        return Err(AppError::MissingConfig("Firebase"));
    }
    list_documents(config, SETTINGS_COLLECTION).await?;
    log_info(Category::Firebase, &format!("Đã kết nối Firestore dự án '{}'", config.project_id));
    Ok(())
}

/// Polls a collection and calls `on_change` with the full list whenever it
/// differs from the previous snapshot. Runs until the page unloads.
pub fn subscribe<T: Record>(config: FirebaseConfig, on_change: impl Fn(Vec<T>) + 'static) {
    let last: Rc<RefCell<Option<Vec<T>>>> = Rc::new(RefCell::new(None));
    let in_flight = Rc::new(Cell::new(false));
    let on_change = Rc::new(on_change);

    let poll = move || {
        if in_flight.replace(true) {
            return;
        }
        let config = config.clone();
        let last = last.clone();
        let in_flight = in_flight.clone();
        let on_change = on_change.clone();
        spawn_local(async move {
            match list_documents(&config, T::COLLECTION).await {
                Ok(docs) => {
                    let records = decode_records::<T>(docs);
                    let changed = last.borrow().as_ref() != Some(&records);
                    if changed {
                        *last.borrow_mut() = Some(records.clone());
                        on_change(records);
                    }
                }
                Err(e) => log_error(Category::Firebase, &format!("Lỗi lắng nghe {}: {}", T::COLLECTION, e)),
            }
            in_flight.set(false);
        });
    };

    poll();
    gloo::timers::callback::Interval::new(POLL_INTERVAL_MS, poll).forget();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    #[test]
    fn test_typed_values() {
        assert_eq!(to_firestore_value(&json!(3)), json!({ "integerValue": "3" }));
        assert_eq!(to_firestore_value(&json!(2.5)), json!({ "doubleValue": 2.5 }));
        assert_eq!(to_firestore_value(&json!(null)), json!({ "nullValue": null }));
        assert_eq!(
            to_firestore_value(&json!(["a", true])),
            json!({ "arrayValue": { "values": [{ "stringValue": "a" }, { "booleanValue": true }] } })
        );
    }

    #[test]
    fn test_codec_round_trip_of_event() {
        let event = Event {
            id: "e1".into(),
            name: "Cao điểm".into(),
            targets: vec![EventTarget {
                id: "t1".into(),
                goal: 10.0,
                unit: UnitType::Turns,
                results: vec![EventTargetResult { date: "2024-05-02".into(), result: 2.5 }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let Value::Object(map) = serde_json::to_value(&event).unwrap() else { panic!("object") };
        let fields = to_firestore_fields(&map);
        let back = from_firestore_fields(Some(&fields));
        let decoded: Event = serde_json::from_value(Value::Object(back)).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_integer_value_accepts_string_or_number() {
        assert_eq!(from_firestore_value(&json!({ "integerValue": "42" })), json!(42));
        assert_eq!(from_firestore_value(&json!({ "integerValue": 7 })), json!(7));
        assert_eq!(from_firestore_value(&json!({ "geoPointValue": {} })), Value::Null);
    }

    #[test]
    fn test_decode_document_takes_id_from_name() {
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/dailyTasks/abc123",
            "fields": { "id": { "stringValue": "stale" }, "description": { "stringValue": "Tuần tra" } }
        });
        let decoded = decode_document(&doc);
        assert_eq!(decoded["id"], "abc123");
        assert_eq!(decoded["description"], "Tuần tra");
    }

    #[test]
    fn test_decode_records_skips_misshapen_documents() {
        let docs = vec![
            json!({ "id": "a", "date": "2024-01-01", "category": "Tham mưu" }),
            json!("not a record"),
        ];
        let tasks = decode_records::<DailyTask>(docs);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].category, TaskCategory::Advisory);
    }

    #[test]
    fn test_decode_records_keeps_double_and_null_counts() {
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/trafficAccidents/x1",
            "fields": {
                "date": { "stringValue": "2024-05-01" },
                "deaths": { "doubleValue": 2.0 },
                "injuries": { "nullValue": null },
                "estimatedDamageVND": { "integerValue": "1500000" }
            }
        });
        let accidents = decode_records::<TrafficAccident>(vec![decode_document(&doc)]);
        assert_eq!(accidents.len(), 1);
        assert_eq!(accidents[0].id, "x1");
        assert_eq!(accidents[0].deaths, 2);
        assert_eq!(accidents[0].injuries, 0);
        assert_eq!(accidents[0].estimated_damage_vnd, 1_500_000);
    }

    #[test]
    fn test_update_mask() {
        let mut map = Map::new();
        map.insert("docNumber".into(), json!("1"));
        map.insert("id".into(), json!("x"));
        assert_eq!(update_mask_query(&map), "updateMask.fieldPaths=docNumber&updateMask.fieldPaths=id");
        assert_eq!(field_path("estimatedDamageVND"), "estimatedDamageVND");
        assert_eq!(field_path("a-b"), "`a-b`");
    }
}
