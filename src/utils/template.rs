//! `<<field>>` placeholder substitution for response letters
//!
//! A template is scanned once. Each token is looked up and replaced; unknown
//! tokens stay exactly as written and substituted text is never rescanned.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::models::VerificationRequest;
use crate::utils::period::parse_date;

pub const DEFAULT_DATE_FORMAT: &str = "DD/MM/YYYY";
pub const DEFAULT_REQUESTING_UNIT: &str = "Phòng CSGT - Công an TP Hà Nội";
pub const EMPTY_RESULT_CONTENT: &str = "Chưa có nội dung kết quả xác minh chi tiết.";

/// Placeholders offered in the template editor, with their help text
pub const PLACEHOLDERS: &[(&str, &str)] = &[
    ("docNumber", "Số công văn yêu cầu xác minh."),
    ("docDate", "Ngày công văn yêu cầu (YYYY-MM-DD). Ví dụ: <<docDate:DD/MM/YYYY>>"),
    ("offenderName", "Họ tên người vi phạm."),
    ("citizenId", "Số căn cước công dân."),
    ("dateOfBirth", "Ngày sinh của đối tượng (YYYY-MM-DD). Ví dụ: <<dateOfBirth:DD/MM/YYYY>>"),
    ("address", "Nơi cư trú/Địa chỉ hiện tại."),
    ("violationBehavior", "Mô tả hành vi vi phạm cần xác minh."),
    ("verificationResult", "Kết quả xác minh (e.g., \"Đã xác minh\")."),
    ("endDate", "Ngày hoàn thành xác minh (YYYY-MM-DD). Ví dụ: <<endDate:DD/MM/YYYY>>"),
    ("resultContent", "Nội dung chi tiết kết quả xác minh."),
    ("responseDocNumber", "Số công văn của văn bản trả lời."),
    ("requestingUnitName", "Tên đơn vị yêu cầu xác minh. Mặc định: Phòng CSGT - Công an TP Hà Nội"),
    ("currentDay", "Ngày hiện tại (2 chữ số). Sử dụng cho ngày tạo công văn."),
    ("currentMonth", "Tháng hiện tại (2 chữ số). Sử dụng cho ngày tạo công văn."),
    ("currentYear", "Năm hiện tại (4 chữ số). Sử dụng cho ngày tạo công văn."),
    ("currentDate", "Ngày đầy đủ hiện tại (YYYY-MM-DD). Ví dụ: <<currentDate:DD/MM/YYYY>>"),
    ("currentTime", "Thời gian hiện tại (HH:MM)."),
];

fn token_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<<(\w+)(?::([^>]*))?>>").ok()).as_ref()
}

/// Renders a stored `YYYY-MM-DD` date with `DD`, `MM` and `YYYY` tokens.
/// Each token is replaced once, left to right. Empty input renders empty;
/// a value that is not a date is passed through as written.
pub fn format_date(date: &str, format: &str) -> String {
    if date.trim().is_empty() {
        return String::new();
    }
    let Some(parsed) = parse_date(date) else {
        return date.to_string();
    };
    let day = parsed.format("%d").to_string();
    let month = parsed.format("%m").to_string();
    let year = parsed.format("%Y").to_string();
    format
        .replacen("DD", &day, 1)
        .replacen("MM", &month, 1)
        .replacen("YYYY", &year, 1)
}

#[derive(Debug, Clone)]
enum Slot {
    Text(String),
    Date(String),
}

/// Values for one rendering pass
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    slots: HashMap<String, Slot>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Literal value for `<<key>>`
    pub fn text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.slots.insert(key.to_string(), Slot::Text(value.into()));
        self
    }

    /// `YYYY-MM-DD` value for `<<key>>` or `<<key:FORMAT>>`
    pub fn date(mut self, key: &str, value: impl Into<String>) -> Self {
        self.slots.insert(key.to_string(), Slot::Date(value.into()));
        self
    }

    pub fn render(&self, template: &str) -> String {
        let Some(re) = token_regex() else {
            return template.to_string();
        };
        re.replace_all(template, |caps: &Captures| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let format = caps.get(2).map(|m| m.as_str());
            match (self.slots.get(key), format) {
                (Some(Slot::Date(value)), fmt) => {
                    let fmt = fmt.filter(|f| !f.is_empty()).unwrap_or(DEFAULT_DATE_FORMAT);
                    format_date(value, fmt)
                }
                (Some(Slot::Text(value)), None) => value.clone(),
                _ => whole.to_string(),
            }
        })
        .into_owned()
    }
}

/// Inputs of the "generate response letter" dialog
#[derive(Debug, Clone)]
pub struct ResponseLetter<'a> {
    pub request: &'a VerificationRequest,
    /// Creation date of the letter, `YYYY-MM-DD`
    pub doc_date: &'a str,
    pub requesting_unit: &'a str,
    pub response_doc_number: &'a str,
    /// `HH:MM`
    pub time: &'a str,
}

impl ResponseLetter<'_> {
    pub fn placeholders(&self) -> Placeholders {
        let req = self.request;
        let created = parse_date(self.doc_date);
        let part = |fmt: &str| created.map(|d| d.format(fmt).to_string()).unwrap_or_default();
        let result_content = if req.result_content.is_empty() {
            EMPTY_RESULT_CONTENT.to_string()
        } else {
            req.result_content.clone()
        };

        Placeholders::new()
            .text("docNumber", req.doc_number.as_str())
            .text("offenderName", req.offender_name.as_str())
            .text("citizenId", req.citizen_id.as_str())
            .text("address", req.address.as_str())
            .text("violationBehavior", req.violation_behavior.as_str())
            .text("verificationResult", req.verification_result.label())
            .text("resultContent", result_content)
            .text("requestingUnitName", self.requesting_unit)
            .text("responseDocNumber", self.response_doc_number)
            .text("currentDay", part("%d"))
            .text("currentMonth", part("%m"))
            .text("currentYear", part("%Y"))
            .text("currentTime", self.time)
            .date("docDate", req.doc_date.as_str())
            .date("dateOfBirth", req.date_of_birth.as_str())
            .date("endDate", req.end_date.as_str())
            .date("currentDate", self.doc_date)
    }

    pub fn render(&self, template: &str) -> String {
        self.placeholders().render(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VerificationStatus;

    fn request() -> VerificationRequest {
        VerificationRequest {
            id: "r1".into(),
            doc_number: "125/CSGT".into(),
            doc_date: "2024-03-05".into(),
            offender_name: "Nguyễn Văn A".into(),
            citizen_id: "001099000111".into(),
            date_of_birth: "1990-12-01".into(),
            address: "Kiều Phú".into(),
            violation_behavior: "Vượt đèn đỏ".into(),
            verification_result: VerificationStatus::Verified,
            end_date: String::new(),
            result_content: String::new(),
        }
    }

    fn letter(req: &VerificationRequest) -> ResponseLetter<'_> {
        ResponseLetter {
            request: req,
            doc_date: "2024-04-09",
            requesting_unit: DEFAULT_REQUESTING_UNIT,
            response_doc_number: "77/CAX",
            time: "08:30",
        }
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-05", DEFAULT_DATE_FORMAT), "05/03/2024");
        assert_eq!(format_date("2024-03-05", "ngày DD tháng MM năm YYYY"), "ngày 05 tháng 03 năm 2024");
        assert_eq!(format_date("2024-03-05", "DD-DD"), "05-DD");
        assert_eq!(format_date("", "DD/MM/YYYY"), "");
        assert_eq!(format_date("không rõ", "DD/MM/YYYY"), "không rõ");
    }

    #[test]
    fn test_render_response_letter() {
        let req = request();
        let tpl = "Số: <<responseDocNumber>> ngày <<currentDay>>/<<currentMonth>>/<<currentYear>> \
                   trả lời CV <<docNumber>> ngày <<docDate>> về <<offenderName>> (<<dateOfBirth:YYYY>>) \
                   kết quả <<verificationResult>>: <<resultContent>>. Hoàn thành <<endDate>>. <<currentTime>>";
        let out = letter(&req).render(tpl);
        assert_eq!(
            out,
            "Số: 77/CAX ngày 09/04/2024 trả lời CV 125/CSGT ngày 05/03/2024 về Nguyễn Văn A (1990) \
             kết quả Đã xác minh: Chưa có nội dung kết quả xác minh chi tiết.. Hoàn thành . 08:30"
        );
    }

    #[test]
    fn test_current_date_uses_letter_date() {
        let req = request();
        assert_eq!(letter(&req).render("<<currentDate:DD.MM.YYYY>>"), "09.04.2024");
    }

    #[test]
    fn test_unknown_tokens_untouched() {
        let req = request();
        let tpl = "<<unknownField>> <<docNumber:XX>> <<not closed";
        assert_eq!(letter(&req).render(tpl), tpl);
    }

    #[test]
    fn test_single_pass_does_not_rescan() {
        let mut req = request();
        req.offender_name = "<<docNumber>>".into();
        assert_eq!(letter(&req).render("<<offenderName>>"), "<<docNumber>>");
    }

    #[test]
    fn test_idempotent_without_placeholders() {
        let req = request();
        let once = letter(&req).render("<p><<docNumber>> - <<docDate>></p>");
        assert_eq!(letter(&req).render(&once), once);
    }

    #[test]
    fn test_default_templates_render_fully() {
        let req = request();
        for tpl in crate::models::default_templates() {
            let out = letter(&req).render(&tpl.content);
            assert!(!out.contains("<<"), "unresolved token in {}", tpl.id);
        }
    }

    #[test]
    fn test_catalogue_keys_are_all_known() {
        let req = request();
        for (key, _) in PLACEHOLDERS {
            let token = format!("<<{}>>", key);
            assert_ne!(letter(&req).render(&token), token, "{} not substituted", key);
        }
    }
}
