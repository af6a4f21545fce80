//! Local storage persistence of the application data

use std::cell::RefCell;

use gloo::timers::callback::Timeout;

use crate::models::{AppData, StoredAppData};
use crate::utils::log_trace::{log_error, log_warn, Category};
use crate::utils::{storage_get, storage_set};

pub const STORAGE_KEY: &str = "policeManagementAppData_Production";
pub const BACKUP_KEY: &str = "policeManagementAppData_Unreadable";
const SAVE_DEBOUNCE_MS: u32 = 1000;

/// Parses a stored blob, upgrading older layouts on the way
pub fn decode_app_data(json: &str) -> Result<AppData, serde_json::Error> {
    let stored: StoredAppData = serde_json::from_str(json)?;
    Ok(stored.into())
}

pub fn encode_app_data(data: &AppData) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Loads the saved data; `Ok(None)` when nothing is stored.
/// A blob that fails to parse is copied to [`BACKUP_KEY`] so a later save
/// cannot destroy it.
pub fn load_app_data() -> Result<Option<AppData>, serde_json::Error> {
    let Some(json) = storage_get(STORAGE_KEY) else {
        return Ok(None);
    };
    decode_app_data(&json).map(Some).map_err(|e| {
        log_error(Category::Storage, &format!("Không đọc được dữ liệu đã lưu: {}", e));
        if storage_set(BACKUP_KEY, &json) {
            log_warn(Category::Storage, &format!("Đã sao lưu dữ liệu gốc vào khoá {}", BACKUP_KEY));
        }
        e
    })
}

pub fn save_app_data(data: &AppData) {
    match encode_app_data(data) {
        Ok(json) => {
            if !storage_set(STORAGE_KEY, &json) {
                log_warn(Category::Storage, "Không ghi được vào bộ nhớ trình duyệt (có thể đã đầy)");
            }
        }
        Err(e) => log_error(Category::Storage, &format!("Lỗi mã hoá dữ liệu: {}", e)),
    }
}

thread_local! {
    static PENDING_SAVE: RefCell<Option<Timeout>> = const { RefCell::new(None) };
}

/// Saves one second after the last call; earlier pending saves are dropped
pub fn schedule_save(data: AppData) {
    let timeout = Timeout::new(SAVE_DEBOUNCE_MS, move || {
        save_app_data(&data);
        PENDING_SAVE.with(|p| p.borrow_mut().take());
    });
    // Dropping the previous Timeout cancels it
    PENDING_SAVE.with(|p| p.replace(Some(timeout)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    fn sample() -> AppData {
        let mut data = AppData::default();
        data.traffic_accidents.push(TrafficAccident {
            id: "a1".into(),
            date: "2024-05-01".into(),
            deaths: 1,
            estimated_damage_vnd: 25_000_000,
            alcohol_level: AlcoholLevel::Yes,
            ..Default::default()
        });
        data.events.push(Event {
            id: "e1".into(),
            name: "Tháng cao điểm".into(),
            targets: vec![EventTarget {
                id: "t1".into(),
                goal: 12.5,
                unit: UnitType::Hours,
                results: vec![EventTargetResult { date: "2024-05-02".into(), result: 2.5 }],
                ..Default::default()
            }],
            ..Default::default()
        });
        data.daily_tasks.push(DailyTask {
            id: "d1".into(),
            category: TaskCategory::Other("Trực ban".into()),
            ..Default::default()
        });
        data.selected_document_template_id = "template2".into();
        data
    }

    #[test]
    fn test_round_trip_is_structurally_equal() {
        let data = sample();
        let json = encode_app_data(&data).unwrap();
        assert_eq!(decode_app_data(&json).unwrap(), data);
    }

    #[test]
    fn test_wire_names_match_stored_layout() {
        let json: serde_json::Value = serde_json::from_str(&encode_app_data(&sample()).unwrap()).unwrap();
        assert_eq!(json["trafficAccidents"][0]["estimatedDamageVND"], 25_000_000);
        assert_eq!(json["trafficAccidents"][0]["alcoholLevel"], "Yes");
        assert_eq!(json["events"][0]["targets"][0]["unit"], "Giờ");
        assert_eq!(json["selectedDocumentTemplateId"], "template2");
    }

    #[test]
    fn test_loosely_typed_numbers_keep_the_blob() {
        let json = r#"{
            "trafficAccidents": [
                {"id": "a", "deaths": 1.5, "injuries": null, "estimatedDamageVND": "2.000.000"},
                {"id": "b", "deaths": "3"}
            ],
            "vehicleRegistrations": [{"id": 7, "vehicleType": "Xe máy", "firstTimeCount": 4.0, "recallCount": null}],
            "events": [{"id": "e", "targets": [{"id": "t", "goal": "10,5", "results": [{"date": "2024-05-02", "result": null}]}]}],
            "dailyTasks": [{"id": "d"}]
        }"#;
        let data = decode_app_data(json).unwrap();
        let a = &data.traffic_accidents[0];
        assert_eq!((a.deaths, a.injuries, a.estimated_damage_vnd), (1, 0, 2_000_000));
        assert_eq!(data.traffic_accidents[1].deaths, 3);
        let r = &data.vehicle_registrations[0];
        assert_eq!((r.id.as_str(), r.first_time_count, r.recall_count), ("7", 4, 0));
        let t = &data.events[0].targets[0];
        assert_eq!((t.goal, t.results[0].result), (10.5, 0.0));
        assert_eq!(data.daily_tasks.len(), 1);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_app_data("not json").is_err());
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn local_storage_round_trip() {
        let mut data = AppData::default();
        data.daily_tasks.push(crate::models::DailyTask { id: "x".into(), ..Default::default() });
        save_app_data(&data);
        assert_eq!(load_app_data().unwrap(), Some(data));
    }
}
