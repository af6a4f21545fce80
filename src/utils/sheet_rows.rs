//! Cleaning of the JSON a Google Apps Script returns for `action=read`
//!
//! Sheets hand back whatever the cells contain: header rows, numbers typed
//! as text, ISO timestamps, keys in any case. Everything is coerced here
//! before it reaches application state.

use serde_json::{Map, Value};

use crate::crud::new_id;
use crate::error::{AppError, AppResult};
use crate::models::*;

// ============================================
// Scalar coercion
// ============================================

/// Case-insensitive key lookup
pub fn find_key_ci<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let wanted = key.to_lowercase();
    obj.iter().find(|(k, _)| k.to_lowercase() == wanted).map(|(_, v)| v)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Integer coercion for counts and money. Every character except digits and
/// `-` is dropped, so both `1.000.000` and `1,000,000` read as one million.
pub fn safe_int(value: Option<&Value>) -> i64 {
    if is_blank(value) {
        return 0;
    }
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.floor() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let cleaned: String = s.trim().chars().filter(|c| c.is_ascii_digit() || *c == '-').collect();
            leading_int(&cleaned)
        }
        _ => 0,
    }
}

/// Parses the longest `-?digits` prefix, 0 when there is none
fn leading_int(s: &str) -> i64 {
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    match digits.parse::<i64>() {
        Ok(n) if negative => -n,
        Ok(n) => n,
        Err(_) => 0,
    }
}

/// Decimal coercion for target goals and results.
/// With both separators present the last one is the decimal mark
/// (`1.000,50` and `1,000.50` are both 1000.5); a lone comma is decimal.
pub fn safe_num(value: Option<&Value>) -> f64 {
    if is_blank(value) {
        return 0.0;
    }
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            let normalized = match (s.rfind(','), s.rfind('.')) {
                (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
                (Some(_), Some(_)) => s.replace(',', ""),
                (Some(_), None) => s.replace(',', "."),
                _ => s.to_string(),
            };
            leading_float(&normalized)
        }
        _ => 0.0,
    }
}

/// Longest numeric prefix, 0 when there is none
fn leading_float(s: &str) -> f64 {
    let candidate: String = s
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        .collect();
    (1..=candidate.len())
        .rev()
        .filter_map(|end| candidate.get(..end))
        .find_map(|prefix| prefix.parse::<f64>().ok())
        .filter(|f| f.is_finite())
        .unwrap_or(0.0)
}

/// String coercion: trims, blanks out `undefined`/`null`, and cuts ISO
/// timestamps that Sheets produces for date cells down to the date.
pub fn safe_str(value: Option<&Value>) -> String {
    let s = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    };
    let lower = s.to_lowercase();
    if lower == "undefined" || lower == "null" {
        return String::new();
    }
    if is_iso_timestamp(&s) {
        return s.chars().take(10).collect();
    }
    s
}

fn is_iso_timestamp(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() > 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
        && b[10] == b'T'
}

/// A sheet's first row repeats the column names; it is recognised by the
/// value under `key` being the key itself.
pub fn is_header_row(item: &Map<String, Value>, key: &str) -> bool {
    match find_key_ci(item, key) {
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case(key),
        _ => false,
    }
}

// ============================================
// Row mapping
// ============================================

struct Row<'a>(&'a Map<String, Value>);

impl Row<'_> {
    fn get(&self, key: &str) -> Option<&Value> {
        find_key_ci(self.0, key)
    }

    fn str(&self, key: &str) -> String {
        safe_str(self.get(key))
    }

    fn int(&self, key: &str) -> i64 {
        safe_int(self.get(key))
    }

    fn id(&self) -> String {
        let id = self.str("id");
        if id.is_empty() {
            new_id()
        } else {
            id
        }
    }

    fn str_or(&self, key: &str, fallback: &str) -> String {
        let s = self.str(key);
        if s.is_empty() {
            fallback.to_string()
        } else {
            s
        }
    }
}

fn rows<'a>(list: &'a Value, header_key: &'a str) -> impl Iterator<Item = Row<'a>> + 'a {
    list.as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .filter(move |item| !is_header_row(item, header_key))
        .map(Row)
}

pub fn map_traffic_accidents(list: &Value) -> Vec<TrafficAccident> {
    rows(list, "id")
        .map(|r| TrafficAccident {
            id: r.id(),
            date: r.str("date"),
            time: r.str("time"),
            location: r.str("location"),
            content: r.str("content"),
            consequences: r.str("consequences"),
            deaths: r.int("deaths"),
            injuries: r.int("injuries"),
            estimated_damage_vnd: r.int("estimatedDamageVND"),
            alcohol_level: AlcoholLevel::from(r.str_or("alcoholLevel", "Unknown")),
            handling_unit: r.str("handlingUnit"),
            processing_result: r.str("processingResult"),
        })
        .collect()
}

pub fn map_vehicle_registrations(list: &Value) -> Vec<VehicleRegistration> {
    rows(list, "vehicleType")
        .map(|r| VehicleRegistration {
            id: r.id(),
            date: r.str("date"),
            vehicle_type: VehicleType::from(r.str("vehicleType")),
            first_time_count: r.int("firstTimeCount"),
            transfer_count: r.int("transferCount"),
            recall_count: r.int("recallCount"),
            renewal_count: r.int("renewalCount"),
        })
        .collect()
}

/// Targets arrive either as a JSON array or as the JSON text the script
/// wrote into a single cell.
fn parse_targets(raw: Option<&Value>) -> Vec<EventTarget> {
    let raw = match raw {
        Some(Value::Array(_)) => raw.cloned(),
        Some(Value::String(s)) if s.starts_with('[') => serde_json::from_str::<Value>(s).ok(),
        _ => None,
    };
    let Some(Value::Array(items)) = raw else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|t| {
            let t = Row(t);
            EventTarget {
                id: t.id(),
                name: t.str("name"),
                goal: safe_num(t.get("goal")),
                unit: UnitType::from(t.str_or("unit", UnitType::default().label())),
                results: t
                    .get("results")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_object)
                    .map(|res| {
                        let res = Row(res);
                        EventTargetResult {
                            date: res.str("date"),
                            result: safe_num(res.get("result")),
                        }
                    })
                    .collect(),
            }
        })
        .collect()
}

pub fn map_events(list: &Value) -> Vec<Event> {
    rows(list, "id")
        .map(|r| Event {
            id: r.id(),
            name: r.str("name"),
            from_date: r.str("fromDate"),
            to_date: r.str("toDate"),
            content: r.str("content"),
            targets: parse_targets(r.get("targets")),
        })
        .collect()
}

pub fn map_daily_tasks(list: &Value) -> Vec<DailyTask> {
    rows(list, "category")
        .map(|r| DailyTask {
            id: r.id(),
            date: r.str("date"),
            category: TaskCategory::from(r.str("category")),
            description: r.str("description"),
            result: r.str("result"),
        })
        .collect()
}

pub fn map_verification_requests(list: &Value) -> Vec<VerificationRequest> {
    rows(list, "docNumber")
        .map(|r| VerificationRequest {
            id: r.id(),
            doc_number: r.str("docNumber"),
            doc_date: r.str("docDate"),
            offender_name: r.str("offenderName"),
            citizen_id: r.str("citizenId"),
            date_of_birth: r.str("dateOfBirth"),
            address: r.str("address"),
            violation_behavior: r.str("violationBehavior"),
            verification_result: VerificationStatus::from(
                r.str_or("verificationResult", VerificationStatus::NotStarted.label()),
            ),
            end_date: r.str("endDate"),
            result_content: r.str("resultContent"),
        })
        .collect()
}

pub fn map_advisory_documents(list: &Value) -> Vec<AdvisoryDocument> {
    rows(list, "docNumber")
        .map(|r| AdvisoryDocument {
            id: r.id(),
            doc_number: r.str("docNumber"),
            doc_date: r.str("docDate"),
            doc_type: AdvisoryDocType::from(r.str("docType")),
            content: r.str("content"),
            recipient_unit: r.str("recipientUnit"),
            release_date: r.str("releaseDate"),
        })
        .collect()
}

// ============================================
// Whole payload
// ============================================

/// Maps every list the payload carries. Lists that are absent stay `None`
/// so the merge leaves local data alone.
pub fn clean(data: &Map<String, Value>) -> CloudData {
    let list = |key: &str| find_key_ci(data, key).filter(|v| !v.is_null());

    CloudData {
        traffic_accidents: list("trafficAccidents").map(map_traffic_accidents),
        vehicle_registrations: list("vehicleRegistrations").map(map_vehicle_registrations),
        events: list("events").map(map_events),
        daily_tasks: list("dailyTasks").map(map_daily_tasks),
        verification_requests: list("verificationRequests").map(map_verification_requests),
        advisory_documents: list("advisoryDocuments").map(map_advisory_documents),
        response_document_templates: list("responseDocumentTemplates")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
        selected_document_template_id: list("selectedDocumentTemplateId")
            .map(|v| safe_str(Some(v)))
            .filter(|s| !s.is_empty()),
    }
}

/// Interprets the body of a `read` response
pub fn parse_read_response(text: &str) -> AppResult<CloudData> {
    if text.trim_start().starts_with('<') {
        return Err(AppError::Auth);
    }
    let data: Value = serde_json::from_str(text).map_err(|_| AppError::InvalidJson)?;

    if data.get("status").and_then(Value::as_str) == Some("error") {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or("Script trả về lỗi.");
        return Err(AppError::Script(message.to_string()));
    }

    let payload = match data.get("data") {
        Some(inner) if is_truthy(inner) => inner,
        _ => &data,
    };
    match payload.as_object() {
        Some(obj) => Ok(clean(obj)),
        None => Err(AppError::EmptyResponse),
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_int() {
        assert_eq!(safe_int(Some(&json!("1.000.000"))), 1_000_000);
        assert_eq!(safe_int(Some(&json!("1,000,000 đ"))), 1_000_000);
        assert_eq!(safe_int(Some(&json!("-3"))), -3);
        assert_eq!(safe_int(Some(&json!(2.9))), 2);
        assert_eq!(safe_int(Some(&json!(""))), 0);
        assert_eq!(safe_int(Some(&json!("abc"))), 0);
        assert_eq!(safe_int(None), 0);
        assert_eq!(safe_int(Some(&json!(null))), 0);
    }

    #[test]
    fn test_safe_num() {
        assert_eq!(safe_num(Some(&json!("1.000,50"))), 1000.5);
        assert_eq!(safe_num(Some(&json!("1,000.50"))), 1000.5);
        assert_eq!(safe_num(Some(&json!("10,5"))), 10.5);
        assert_eq!(safe_num(Some(&json!("12.5 giờ"))), 12.5);
        assert_eq!(safe_num(Some(&json!(7))), 7.0);
        assert_eq!(safe_num(Some(&json!("x"))), 0.0);
    }

    #[test]
    fn test_safe_str() {
        assert_eq!(safe_str(Some(&json!("  a  "))), "a");
        assert_eq!(safe_str(Some(&json!("undefined"))), "");
        assert_eq!(safe_str(Some(&json!("NULL"))), "");
        assert_eq!(safe_str(Some(&json!("2024-05-01T17:00:00.000Z"))), "2024-05-01");
        assert_eq!(safe_str(Some(&json!("2024-05-01"))), "2024-05-01");
        assert_eq!(safe_str(Some(&json!(15))), "15");
        assert_eq!(safe_str(None), "");
    }

    #[test]
    fn test_header_rows_are_skipped() {
        let list = json!([
            {"ID": "id", "Date": "date"},
            {"ID": 7, "Date": "2024-05-01T00:00:00.000Z", "Deaths": "2", "estimateddamagevnd": "5.000.000"}
        ]);
        let out = map_traffic_accidents(&list);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "7");
        assert_eq!(out[0].date, "2024-05-01");
        assert_eq!(out[0].deaths, 2);
        assert_eq!(out[0].estimated_damage_vnd, 5_000_000);
        assert_eq!(out[0].alcohol_level, AlcoholLevel::Unknown);
    }

    #[test]
    fn test_missing_ids_are_generated() {
        let out = map_daily_tasks(&json!([{"date": "2024-05-01", "category": "Tham mưu"}, {"category": "Khác"}]));
        assert_eq!(out.len(), 2);
        assert!(!out[0].id.is_empty());
        assert_ne!(out[0].id, out[1].id);
        assert_eq!(out[0].category, TaskCategory::Advisory);
    }

    #[test]
    fn test_vehicle_type_and_defaults() {
        let out = map_vehicle_registrations(&json!([
            {"vehicleType": "vehicleType"},
            {"id": "a", "vehicleType": "XE MÁY", "firstTimeCount": "12"},
            {"id": "b", "vehicleType": "", "renewalCount": 3}
        ]));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].vehicle_type, VehicleType::Motorbike);
        assert_eq!(out[0].first_time_count, 12);
        assert_eq!(out[1].vehicle_type, VehicleType::Car);
    }

    #[test]
    fn test_event_targets_from_json_text() {
        let out = map_events(&json!([{
            "id": "e1",
            "name": "Cao điểm",
            "targets": "[{\"id\":\"t1\",\"name\":\"Xử lý\",\"goal\":\"100\",\"unit\":\"Trường hợp\",\"results\":[{\"date\":\"2024-05-01\",\"result\":4}]}]"
        }, {
            "id": "e2",
            "targets": "không hợp lệ"
        }]));
        assert_eq!(out[0].targets.len(), 1);
        assert_eq!(out[0].targets[0].goal, 100.0);
        assert_eq!(out[0].targets[0].achieved(), 4.0);
        assert!(out[1].targets.is_empty());
    }

    #[test]
    fn test_verification_status_default() {
        let out = map_verification_requests(&json!([{"id": "v", "docNumber": "12/CV"}]));
        assert_eq!(out[0].verification_result, VerificationStatus::NotStarted);
        assert_eq!(out[0].result_content, "");
    }

    #[test]
    fn test_clean_keeps_absent_lists_none() {
        let data = json!({
            "DailyTasks": [],
            "selectedDocumentTemplateId": "template2",
            "responseDocumentTemplates": [{"id": "template2", "name": "B", "content": "<p/>"}]
        });
        let cloud = clean(data.as_object().unwrap());
        assert_eq!(cloud.daily_tasks, Some(vec![]));
        assert!(cloud.traffic_accidents.is_none());
        assert_eq!(cloud.selected_document_template_id.as_deref(), Some("template2"));
        assert_eq!(cloud.response_document_templates.unwrap()[0].name, "B");
    }

    #[test]
    fn test_parse_read_response_errors() {
        assert!(matches!(parse_read_response("<!DOCTYPE html>"), Err(AppError::Auth)));
        assert!(matches!(parse_read_response("{oops"), Err(AppError::InvalidJson)));
        match parse_read_response(r#"{"status":"error","message":"Sheet missing"}"#) {
            Err(AppError::Script(m)) => assert_eq!(m, "Sheet missing"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse_read_response("42"), Err(AppError::EmptyResponse)));
    }

    #[test]
    fn test_parse_read_response_unwraps_data() {
        let cloud = parse_read_response(r#"{"status":"success","data":{"events":[{"id":"e"}]}}"#).unwrap();
        assert_eq!(cloud.events.unwrap()[0].id, "e");

        let flat = parse_read_response(r#"{"events":[{"id":"f"}]}"#).unwrap();
        assert_eq!(flat.events.unwrap()[0].id, "f");
    }
}
