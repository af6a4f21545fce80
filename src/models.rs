//! Data structures for every record the unit keeps

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::utils::sheet_rows::{safe_int, safe_num};

// ============================================
// Enumerations backed by the Vietnamese labels
// ============================================

/// Declares an enum whose wire form is its Vietnamese label.
/// Unknown labels are kept in `Other` so nothing typed by hand is lost.
macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(&self) -> &str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Other(s) => s.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $(if s.trim() == $label {
                    return $name::$variant;
                })+
                $name::Other(s)
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> String {
                v.label().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

label_enum!(
    /// Work log categories
    TaskCategory {
        Patrol => "Tuần tra xử lý",
        Propaganda => "Tuyên truyền",
        Advisory => "Tham mưu",
        Summary => "Tổng hợp",
        EventSecurity => "Bảo vệ kỳ cuộc",
        Enforcement => "Cưỡng chế",
        Coordination => "Phối hợp",
        Misc => "Khác",
    }
);

label_enum!(
    /// Resolution state of an inbound verification request
    VerificationStatus {
        NotStarted => "Chưa xác minh",
        InProgress => "Đang xác minh",
        Verified => "Đã xác minh",
        Undetermined => "Không xác định",
    }
);

label_enum!(
    AdvisoryDocType {
        OfficialLetter => "Công văn",
        Petition => "Kiến nghị",
        Program => "Chương trình",
        Plan => "Kế hoạch",
        Scheme => "Phương án",
        Report => "Báo cáo",
        Misc => "Khác",
    }
);

label_enum!(
    /// Measurement unit of an event target
    UnitType {
        Vnd => "VNĐ",
        Cases => "Trường hợp",
        Quantity => "Số lượng",
        Hours => "Giờ",
        Turns => "Lượt",
    }
);

impl Default for TaskCategory {
    fn default() -> Self {
        TaskCategory::Patrol
    }
}

impl Default for VerificationStatus {
    fn default() -> Self {
        VerificationStatus::NotStarted
    }
}

impl Default for AdvisoryDocType {
    fn default() -> Self {
        AdvisoryDocType::OfficialLetter
    }
}

impl Default for UnitType {
    fn default() -> Self {
        UnitType::Cases
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VehicleType {
    #[default]
    Car,
    Motorbike,
}

impl VehicleType {
    pub const ALL: [VehicleType; 2] = [VehicleType::Car, VehicleType::Motorbike];

    pub fn label(&self) -> &'static str {
        match self {
            VehicleType::Car => "Ô tô",
            VehicleType::Motorbike => "Xe máy",
        }
    }
}

impl From<String> for VehicleType {
    fn from(s: String) -> Self {
        // Sheets rows carry free text; anything mentioning "máy" is a motorbike
        if s.to_lowercase().contains("máy") {
            VehicleType::Motorbike
        } else {
            VehicleType::Car
        }
    }
}

impl From<VehicleType> for String {
    fn from(v: VehicleType) -> String {
        v.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlcoholLevel {
    Yes,
    No,
    #[default]
    Unknown,
}

impl AlcoholLevel {
    pub const ALL: [AlcoholLevel; 3] = [AlcoholLevel::Yes, AlcoholLevel::No, AlcoholLevel::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlcoholLevel::Yes => "Yes",
            AlcoholLevel::No => "No",
            AlcoholLevel::Unknown => "Unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlcoholLevel::Yes => "Có",
            AlcoholLevel::No => "Không",
            AlcoholLevel::Unknown => "Không rõ",
        }
    }
}

impl From<String> for AlcoholLevel {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "yes" | "có" => AlcoholLevel::Yes,
            "no" | "không" => AlcoholLevel::No,
            _ => AlcoholLevel::Unknown,
        }
    }
}

impl From<AlcoholLevel> for String {
    fn from(v: AlcoholLevel) -> String {
        v.as_str().to_string()
    }
}

// ============================================
// Records
// ============================================

/// Ids may have been stored as numbers by older data; coerce to string.
pub fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Counts and money may arrive as floats, numeric text or null
pub fn de_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(safe_int(Some(&value)))
}

pub fn de_num<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(safe_num(Some(&value)))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficAccident {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub consequences: String,
    #[serde(default, deserialize_with = "de_int")]
    pub deaths: i64,
    #[serde(default, deserialize_with = "de_int")]
    pub injuries: i64,
    #[serde(default, rename = "estimatedDamageVND", deserialize_with = "de_int")]
    pub estimated_damage_vnd: i64,
    #[serde(default)]
    pub alcohol_level: AlcoholLevel,
    #[serde(default)]
    pub handling_unit: String,
    #[serde(default)]
    pub processing_result: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRegistration {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub vehicle_type: VehicleType,
    #[serde(default, deserialize_with = "de_int")]
    pub first_time_count: i64,
    #[serde(default, deserialize_with = "de_int")]
    pub transfer_count: i64,
    #[serde(default, deserialize_with = "de_int")]
    pub recall_count: i64,
    #[serde(default, deserialize_with = "de_int")]
    pub renewal_count: i64,
}

impl VehicleRegistration {
    pub fn total(&self) -> i64 {
        self.first_time_count + self.transfer_count + self.recall_count + self.renewal_count
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventTargetResult {
    #[serde(default)]
    pub date: String,
    #[serde(default, deserialize_with = "de_num")]
    pub result: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventTarget {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_num")]
    pub goal: f64,
    #[serde(default)]
    pub unit: UnitType,
    #[serde(default)]
    pub results: Vec<EventTargetResult>,
}

impl EventTarget {
    pub fn achieved(&self) -> f64 {
        self.results.iter().map(|r| r.result).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub from_date: String,
    #[serde(default)]
    pub to_date: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub targets: Vec<EventTarget>,
}

impl Event {
    /// Overall completion in percent, uncapped
    pub fn progress(&self) -> f64 {
        let goal: f64 = self.targets.iter().map(|t| t.goal).sum();
        if goal == 0.0 {
            return 0.0;
        }
        let achieved: f64 = self.targets.iter().map(EventTarget::achieved).sum();
        achieved / goal * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyTask {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub category: TaskCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub doc_number: String,
    #[serde(default)]
    pub doc_date: String,
    #[serde(default)]
    pub offender_name: String,
    #[serde(default)]
    pub citizen_id: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub violation_behavior: String,
    #[serde(default)]
    pub verification_result: VerificationStatus,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub result_content: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryDocument {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub doc_number: String,
    #[serde(default)]
    pub doc_date: String,
    #[serde(default)]
    pub doc_type: AdvisoryDocType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub recipient_unit: String,
    #[serde(default)]
    pub release_date: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentTemplate {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

// ============================================
// Application state
// ============================================

pub const DEFAULT_TEMPLATE_ID: &str = "template1";

pub fn default_templates() -> Vec<DocumentTemplate> {
    vec![
        DocumentTemplate {
            id: "template1".to_string(),
            name: "Mẫu Công văn 1".to_string(),
            content: include_str!("../templates/response_letter_1.html").to_string(),
        },
        DocumentTemplate {
            id: "template2".to_string(),
            name: "Mẫu Công văn 2 (Biến thể)".to_string(),
            content: include_str!("../templates/response_letter_2.html").to_string(),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    pub traffic_accidents: Vec<TrafficAccident>,
    pub vehicle_registrations: Vec<VehicleRegistration>,
    pub events: Vec<Event>,
    pub daily_tasks: Vec<DailyTask>,
    pub verification_requests: Vec<VerificationRequest>,
    pub response_document_templates: Vec<DocumentTemplate>,
    pub selected_document_template_id: String,
    pub advisory_documents: Vec<AdvisoryDocument>,
}

impl Default for AppData {
    fn default() -> Self {
        Self {
            traffic_accidents: Vec::new(),
            vehicle_registrations: Vec::new(),
            events: Vec::new(),
            daily_tasks: Vec::new(),
            verification_requests: Vec::new(),
            response_document_templates: default_templates(),
            selected_document_template_id: DEFAULT_TEMPLATE_ID.to_string(),
            advisory_documents: Vec::new(),
        }
    }
}

impl AppData {
    pub fn selected_template(&self) -> Option<&DocumentTemplate> {
        self.response_document_templates
            .iter()
            .find(|t| t.id == self.selected_document_template_id)
    }

    /// Overwrites every list the cloud copy carries, keeps the rest
    pub fn merge_cloud(&mut self, cloud: CloudData) {
        if let Some(v) = cloud.traffic_accidents {
            self.traffic_accidents = v;
        }
        if let Some(v) = cloud.vehicle_registrations {
            self.vehicle_registrations = v;
        }
        if let Some(v) = cloud.events {
            self.events = v;
        }
        if let Some(v) = cloud.daily_tasks {
            self.daily_tasks = v;
        }
        if let Some(v) = cloud.verification_requests {
            self.verification_requests = v;
        }
        if let Some(v) = cloud.advisory_documents {
            self.advisory_documents = v;
        }
        if let Some(v) = cloud.response_document_templates {
            self.response_document_templates = v;
        }
        if let Some(v) = cloud.selected_document_template_id {
            self.selected_document_template_id = v;
        }
    }
}

/// Partial application data as returned by a remote backend
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloudData {
    pub traffic_accidents: Option<Vec<TrafficAccident>>,
    pub vehicle_registrations: Option<Vec<VehicleRegistration>>,
    pub events: Option<Vec<Event>>,
    pub daily_tasks: Option<Vec<DailyTask>>,
    pub verification_requests: Option<Vec<VerificationRequest>>,
    pub advisory_documents: Option<Vec<AdvisoryDocument>>,
    pub response_document_templates: Option<Vec<DocumentTemplate>>,
    pub selected_document_template_id: Option<String>,
}

/// Shape of the JSON blob in local storage, tolerant of older versions
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAppData {
    #[serde(default)]
    pub traffic_accidents: Option<Vec<TrafficAccident>>,
    #[serde(default)]
    pub vehicle_registrations: Option<Vec<VehicleRegistration>>,
    #[serde(default)]
    pub events: Option<Vec<Event>>,
    #[serde(default)]
    pub daily_tasks: Option<Vec<DailyTask>>,
    #[serde(default)]
    pub verification_requests: Option<Vec<VerificationRequest>>,
    #[serde(default)]
    pub response_document_templates: Option<Vec<DocumentTemplate>>,
    #[serde(default)]
    pub selected_document_template_id: Option<String>,
    #[serde(default)]
    pub advisory_documents: Option<Vec<AdvisoryDocument>>,
    /// Single template string written by the first releases
    #[serde(default)]
    pub response_document_template: Option<String>,
}

impl From<StoredAppData> for AppData {
    fn from(stored: StoredAppData) -> Self {
        let defaults = AppData::default();

        let (templates, selected) = match (stored.response_document_template, stored.response_document_templates) {
            (Some(legacy), _) => (
                vec![DocumentTemplate {
                    id: DEFAULT_TEMPLATE_ID.to_string(),
                    name: "Mẫu Công văn 1".to_string(),
                    content: legacy,
                }],
                DEFAULT_TEMPLATE_ID.to_string(),
            ),
            (None, Some(list)) => (
                list,
                stored
                    .selected_document_template_id
                    .filter(|s| !s.is_empty())
                    .unwrap_or(defaults.selected_document_template_id),
            ),
            (None, None) => (defaults.response_document_templates, defaults.selected_document_template_id),
        };

        AppData {
            traffic_accidents: stored.traffic_accidents.unwrap_or_default(),
            vehicle_registrations: stored.vehicle_registrations.unwrap_or_default(),
            events: stored.events.unwrap_or_default(),
            daily_tasks: stored.daily_tasks.unwrap_or_default(),
            verification_requests: stored.verification_requests.unwrap_or_default(),
            response_document_templates: templates,
            selected_document_template_id: selected,
            advisory_documents: stored.advisory_documents.unwrap_or_default(),
        }
    }
}

// ============================================
// Remote backend configuration
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSheetsConfig {
    #[serde(default)]
    pub script_url: String,
    #[serde(default = "default_true")]
    pub auto_sync: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub auth_domain: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub storage_bucket: String,
    #[serde(default)]
    pub messaging_sender_id: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

impl FirebaseConfig {
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.api_key.is_empty() && !self.project_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_enum_keeps_unknown_labels() {
        let cat: TaskCategory = serde_json::from_str("\"Trực ban\"").unwrap();
        assert_eq!(cat, TaskCategory::Other("Trực ban".to_string()));
        assert_eq!(serde_json::to_string(&cat).unwrap(), "\"Trực ban\"");

        let status: VerificationStatus = serde_json::from_str("\"Đã xác minh\"").unwrap();
        assert_eq!(status, VerificationStatus::Verified);
    }

    #[test]
    fn test_vehicle_type_normalization() {
        assert_eq!(VehicleType::from("xe Máy".to_string()), VehicleType::Motorbike);
        assert_eq!(VehicleType::from("oto".to_string()), VehicleType::Car);
        assert_eq!(serde_json::to_string(&VehicleType::Motorbike).unwrap(), "\"Xe máy\"");
    }

    #[test]
    fn test_numeric_id_is_coerced() {
        let task: DailyTask = serde_json::from_str(
            r#"{"id": 42, "date": "2024-05-01", "category": "Tuyên truyền", "description": "", "result": ""}"#,
        )
        .unwrap();
        assert_eq!(task.id, "42");
        assert_eq!(task.category, TaskCategory::Propaganda);
    }

    #[test]
    fn test_legacy_single_template_is_migrated() {
        let stored: StoredAppData = serde_json::from_str(
            r#"{"trafficAccidents": [], "responseDocumentTemplate": "<p><<docNumber>></p>"}"#,
        )
        .unwrap();
        let data: AppData = stored.into();
        assert_eq!(data.response_document_templates.len(), 1);
        assert_eq!(data.response_document_templates[0].id, "template1");
        assert_eq!(data.response_document_templates[0].content, "<p><<docNumber>></p>");
        assert_eq!(data.selected_document_template_id, "template1");
        assert!(data.events.is_empty());
    }

    #[test]
    fn test_missing_fields_are_default_filled() {
        let stored: StoredAppData = serde_json::from_str(
            r#"{"verificationRequests": [{"id": "a", "docNumber": "12/CV", "docDate": "2024-01-02"}]}"#,
        )
        .unwrap();
        let data: AppData = stored.into();
        let req = &data.verification_requests[0];
        assert_eq!(req.result_content, "");
        assert_eq!(req.verification_result, VerificationStatus::NotStarted);
        assert_eq!(data.response_document_templates, default_templates());
        assert!(data.advisory_documents.is_empty());
    }

    #[test]
    fn test_event_progress() {
        let event = Event {
            targets: vec![
                EventTarget {
                    goal: 10.0,
                    results: vec![EventTargetResult { date: "2024-01-01".into(), result: 4.0 }],
                    ..Default::default()
                },
                EventTarget {
                    goal: 10.0,
                    results: vec![EventTargetResult { date: "2024-01-02".into(), result: 6.0 }],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(event.progress(), 50.0);
        assert_eq!(Event::default().progress(), 0.0);
    }

    #[test]
    fn test_merge_cloud_keeps_untouched_lists() {
        let mut data = AppData::default();
        data.daily_tasks.push(DailyTask { id: "t".into(), ..Default::default() });
        data.merge_cloud(CloudData {
            events: Some(vec![Event { id: "e".into(), ..Default::default() }]),
            ..Default::default()
        });
        assert_eq!(data.daily_tasks.len(), 1);
        assert_eq!(data.events[0].id, "e");
    }
}
