//! Gemini API client: period report writing and request-letter extraction

use chrono::{Datelike, NaiveDate};
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response};

use crate::error::{AppError, AppResult};
use crate::models::VerificationRequest;
use crate::summary::{display_date, format_vnd, ReportSummary};
use crate::utils::log_trace::{log_error, log_info, log_info_with_data, Category};
use crate::utils::period::format_iso;
use crate::utils::{encode_base64, storage_get, storage_remove, storage_set};

const API_KEY_STORAGE: &str = "policeApp_GeminiApiKey";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REPORT_MODEL: &str = "gemini-2.5-pro";
const VISION_MODEL: &str = "gemini-2.5-flash";

const REPORT_ERROR: &str = "Không thể tạo báo cáo bằng AI. Vui lòng thử lại hoặc kiểm tra kết nối. Chi tiết: ";
const EXTRACT_ERROR: &str = "Không thể trích xuất thông tin từ ảnh. Vui lòng thử lại hoặc nhập thủ công. Chi tiết: ";

// ============================================
// API key
// ============================================

/// Stored key, else the one baked in at build time
pub fn api_key() -> Option<String> {
    storage_get(API_KEY_STORAGE).or_else(|| {
        option_env!("GEMINI_API_KEY")
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    })
}

pub fn save_api_key(key: &str) {
    let key = key.trim();
    if key.is_empty() {
        storage_remove(API_KEY_STORAGE);
    } else {
        storage_set(API_KEY_STORAGE, key);
    }
    log_info(Category::Ai, "Đã cập nhật khoá Gemini API");
}

// ============================================
// Report prompt
// ============================================

/// Tab-separated table; a placeholder sentence when there are no rows
fn format_table(columns: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return "Không có dữ liệu.".to_string();
    }
    let mut out = columns.join("\t");
    for row in rows {
        out.push('\n');
        out.push_str(&row.join("\t"));
    }
    out
}

fn count_rows(counts: &[(String, usize)]) -> Vec<Vec<String>> {
    counts.iter().map(|(label, n)| vec![label.clone(), n.to_string()]).collect()
}

pub fn build_report_prompt(summary: &ReportSummary, today: NaiveDate) -> String {
    let (from, to) = summary
        .range
        .bounds()
        .map(|(f, t)| (display_date(&format_iso(f)), display_date(&format_iso(t))))
        .unwrap_or_default();
    let (d, m, y) = (today.day(), today.month(), today.year());

    let registration_table = format_table(
        &["type", "first", "transfer", "recall", "renewal", "total"],
        &summary
            .registration_stats
            .iter()
            .map(|s| {
                vec![
                    s.label.to_string(),
                    s.first.to_string(),
                    s.transfer.to_string(),
                    s.recall.to_string(),
                    s.renewal.to_string(),
                    s.total.to_string(),
                ]
            })
            .collect::<Vec<_>>(),
    );
    let task_table = format_table(&["category", "count"], &count_rows(&summary.task_categories));
    let advisory_table = format_table(&["type", "count"], &count_rows(&summary.advisory_types));
    let status = |i: usize| summary.verification_statuses[i].1;
    let a = &summary.accidents;

    format!(
        r#"
Bạn là một trợ lý chuyên nghiệp có khả năng tạo báo cáo hành chính theo chuẩn Nghị định số 30/2020/NĐ-CP ngày 05 tháng 3 năm 2020 của Chính phủ.
Hãy tạo một báo cáo tổng hợp công tác cho lực lượng cảnh sát trật tự, sử dụng các DỮ LIỆU TÓM TẮT cung cấp dưới đây trong khoảng thời gian từ {from} đến {to}.
Báo cáo phải được định dạng hoàn chỉnh bằng HTML, tuân thủ nghiêm ngặt các quy định về thể thức văn bản hành chính:

1.  **Cấu trúc chung**:
    *   Sử dụng font 'Times New Roman', cỡ chữ 12pt (riêng tiêu đề chính 14pt, các tiêu đề phụ và quốc hiệu 13pt).
    *   Giãn dòng 1.35.
    *   Lề: Trên 2cm, dưới 2cm, trái 3cm, phải 2cm.
    *   Các đoạn văn bản có text-align: justify; và text-indent: 40px; (trừ tiêu đề và danh sách).
    *   Các tiêu đề chính (h1) in hoa, in đậm, căn giữa.
    *   Các tiêu đề phụ (h2, h3, h4) in đậm, căn giữa hoặc căn trái tùy cấp độ.
    *   Sử dụng thẻ HTML <strong> cho chữ in đậm.

2.  **Quốc hiệu và tiêu ngữ**:
    *   Bên trái trên cùng: CÔNG AN TP HÀ NỘI<br>CÔNG AN XÃ KIỀU PHÚ
    *   Bên phải trên cùng: CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM<br>Độc lập - Tự do - Hạnh phúc
    *   Cỡ chữ 13pt, in đậm, căn giữa. Dòng "CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM" không xuống dòng.
    *   Ngày tháng báo cáo ở góc phải, cỡ chữ 12pt: "Kiều Phú, ngày {d} tháng {m} năm {y}"

3.  **Nội dung báo cáo**: Chia thành các mục lớn (I, II, III, IV, V, VI) tương ứng với các module và các tiêu đề nhỏ hơn (h4) nếu có chi tiết bảng biểu.
    *   AI PHẢI VIẾT BÁO CÁO CÓ TÍNH TƯỜNG THUẬT, PHÂN TÍCH, KHÔNG CHỈ KỂ LẠI DỮ LIỆU.

    **TIÊU ĐỀ CHÍNH CỦA BÁO CÁO:** BÁO CÁO TỔNG HỢP CÔNG TÁC<br>Từ ngày {from} đến ngày {to}

    ---

    **DỮ LIỆU TÓM TẮT ĐỂ TẠO BÁO CÁO (AI CHỈ DỰA VÀO ĐÂY ĐỂ VIẾT, KHÔNG TỰ TẠO THÊM SỐ LIỆU):**

    **1. Quản Lý Vụ Việc Tai Nạn Giao Thông ({from} - {to}):**
    - Tổng số vụ: {accidents}
    - Tổng số người chết: {deaths}
    - Tổng số người bị thương: {injuries}
    - Tổng số vụ có nồng độ cồn: {alcohol}
    - Tổng thiệt hại ước tính: {damage}

    **2. Theo Dõi Kết Quả Đăng Ký Xe ({from} - {to}):**
    - Tổng số lượt đăng ký: {registrations}
    - Thống kê chi tiết theo loại xe:
      {registration_table}

    **3. Tạo và Theo Dõi Sự Kiện (Đợt Công Tác/Cao Điểm) ({from} - {to}):**
    - Tổng số sự kiện trong kỳ: {events}
    - Tổng tiến độ mục tiêu đạt được: {goal}

    **4. Theo Dõi Công Tác Thường Xuyên & Công Tác Theo Giai Đoạn ({from} - {to}):**
    - Tổng số công tác đã ghi nhận: {tasks}
    - Phân loại theo danh mục:
      {task_table}

    **5. Quản Lý Phối Hợp Xác Minh ({from} - {to}):**
    - Tổng số yêu cầu xác minh: {requests}
    - Số yêu cầu đã xác minh: {verified}
    - Số yêu cầu đang xác minh: {in_progress}
    - Số yêu cầu chưa xác minh: {not_started}
    - Số yêu cầu không xác định: {undetermined}

    **6. Quản Lý Công Tác Tham Mưu ({from} - {to}):**
    - Tổng số công văn/kế hoạch tham mưu: {advisories}
    - Phân loại theo loại công văn:
      {advisory_table}

    **Yêu cầu cuối báo cáo:**
    - Ghi ngày tháng hiện tại (ngày {d} tháng {m} năm {y}) ở góc phải.
    - Chức danh "NGƯỜI LẬP BÁO CÁO" (in đậm, cỡ 13pt).
    - Dòng "(Ký, ghi rõ họ tên)" (cỡ 12pt).
    - Dòng tên người lập báo cáo (cỡ 13pt, in đậm, cách 2cm).

Hãy tạo toàn bộ nội dung HTML cho báo cáo, bao gồm cả thẻ <div> chính với style cho font, cỡ chữ, giãn dòng và padding.
"#,
        accidents = a.count,
        deaths = a.deaths,
        injuries = a.injuries,
        alcohol = a.alcohol,
        damage = format_vnd(a.damage_vnd),
        registrations = summary.total_registrations,
        events = summary.event_count,
        goal = summary.goal_achievement,
        tasks = summary.task_count,
        requests = summary.verification_count,
        verified = status(0),
        in_progress = status(1),
        not_started = status(2),
        undetermined = status(3),
        advisories = summary.advisory_count,
    )
}

/// Removes a Markdown code fence wrapped around the whole answer
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.ends_with("```") {
        return trimmed.to_string();
    }
    let inner = if let Some(rest) = trimmed.strip_prefix("```html") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        return trimmed.to_string();
    };
    inner
        .strip_suffix("```")
        .unwrap_or(inner)
        .trim()
        .to_string()
}

// ============================================
// Request-letter extraction
// ============================================

const EXTRACT_PROMPT: &str = "Bạn là một trợ lý thông minh chuyên trích xuất thông tin từ các công văn yêu cầu xác minh.
Hãy đọc tài liệu hình ảnh được cung cấp và trích xuất các thông tin sau vào định dạng JSON:
- Số CV (Số công văn yêu cầu xác minh)
- Ngày CV (Ngày công văn yêu cầu, định dạng YYYY-MM-DD)
- Họ tên VP (Họ tên người vi phạm)
- CCCD (Số căn cước công dân)
- Ngày sinh (Ngày sinh của đối tượng, định dạng YYYY-MM-DD)
- Địa chỉ (Nơi cư trú hoặc địa chỉ hiện tại)
- Hành vi vi phạm (Mô tả hành vi vi phạm cần xác minh)

Nếu một trường thông tin không tìm thấy trong tài liệu, hãy để giá trị là một chuỗi rỗng (\"\").
Đảm bảo định dạng ngày tháng là YYYY-MM-DD.";

const EXTRACT_FIELDS: [(&str, &str); 7] = [
    ("docNumber", "Số công văn yêu cầu xác minh."),
    ("docDate", "Ngày công văn yêu cầu, định dạng YYYY-MM-DD."),
    ("offenderName", "Họ tên người vi phạm."),
    ("citizenId", "Số căn cước công dân."),
    ("dateOfBirth", "Ngày sinh của đối tượng, định dạng YYYY-MM-DD."),
    ("address", "Nơi cư trú hoặc địa chỉ hiện tại."),
    ("violationBehavior", "Mô tả hành vi vi phạm cần xác minh."),
];

fn extraction_schema() -> Value {
    let properties: serde_json::Map<String, Value> = EXTRACT_FIELDS
        .iter()
        .map(|(name, description)| {
            (name.to_string(), json!({ "type": "STRING", "description": description }))
        })
        .collect();
    let required: Vec<&str> = EXTRACT_FIELDS.iter().map(|(name, _)| *name).collect();
    json!({ "type": "OBJECT", "properties": properties, "required": required })
}

fn is_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b.iter().enumerate().all(|(i, c)| match i {
            4 | 7 => *c == b'-',
            _ => c.is_ascii_digit(),
        })
}

/// Turns the model's JSON answer into a prefilled request.
/// Missing fields stay empty and dates not in `YYYY-MM-DD` are dropped.
pub fn parse_extraction(text: &str) -> AppResult<VerificationRequest> {
    let value: Value = serde_json::from_str(text.trim()).map_err(|_| AppError::InvalidJson)?;
    let field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let date = |key: &str| Some(field(key)).filter(|d| is_iso_date(d)).unwrap_or_default();
    Ok(VerificationRequest {
        doc_number: field("docNumber"),
        doc_date: date("docDate"),
        offender_name: field("offenderName"),
        citizen_id: field("citizenId"),
        date_of_birth: date("dateOfBirth"),
        address: field("address"),
        violation_behavior: field("violationBehavior"),
        ..Default::default()
    })
}

// ============================================
// Transport
// ============================================

/// Concatenated text parts of the first candidate
pub fn response_text(response: &Value) -> Option<String> {
    let parts = response.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

async fn generate_content(model: &str, body: Value) -> AppResult<String> {
    let key = api_key().ok_or(AppError::MissingConfig("khoá Gemini API"))?;
    let url = format!("{}/{}:generateContent?key={}", API_BASE, model, key);

    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_body(&JsValue::from_str(&body.to_string()));
    let request = Request::new_with_str_and_init(&url, &opts)?;
    request.headers().set("Content-Type", "application/json")?;

    let window = web_sys::window().ok_or_else(|| AppError::Js("window".into()))?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| AppError::from_fetch_rejection(&e, 0))?;
    let resp: Response = resp_value.dyn_into()?;
    let text = JsFuture::from(resp.text()?).await?.as_string().unwrap_or_default();
    let json: Value = serde_json::from_str(&text).map_err(|_| AppError::InvalidJson)?;

    if !resp.ok() {
        let message = json
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| resp.status_text());
        return Err(AppError::Server { status: resp.status(), status_text: message });
    }
    response_text(&json).ok_or_else(|| AppError::Ai("Mô hình không trả về nội dung.".into()))
}

/// Writes the period report as HTML
pub async fn generate_report(summary: &ReportSummary, today: NaiveDate) -> AppResult<String> {
    let body = json!({
        "contents": [{ "parts": [{ "text": build_report_prompt(summary, today) }] }],
        "generationConfig": { "temperature": 0.7, "maxOutputTokens": 16384 },
    });
    log_info(Category::Ai, "Đang tạo báo cáo bằng AI");
    match generate_content(REPORT_MODEL, body).await {
        Ok(text) => {
            log_info_with_data(
                Category::Ai,
                "Tạo báo cáo AI hoàn tất",
                json!({ "model": REPORT_MODEL, "chars": text.chars().count() }),
            );
            Ok(strip_code_fence(&text))
        }
        Err(e) => {
            log_error(Category::Ai, &format!("[{}] {}", e.code(), e));
            Err(AppError::Ai(format!("{}{}", REPORT_ERROR, e)))
        }
    }
}

/// Reads a photographed request letter
pub async fn extract_verification_data(file: web_sys::File) -> AppResult<VerificationRequest> {
    let result = async {
        let mime = file.type_();
        let file = gloo::file::File::from(file);
        let bytes = gloo::file::futures::read_as_bytes(&file)
            .await
            .map_err(|e| AppError::Js(e.to_string()))?;
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": EXTRACT_PROMPT },
                    { "inline_data": { "mime_type": mime, "data": encode_base64(&bytes) } },
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": extraction_schema(),
            },
        });
        let text = generate_content(VISION_MODEL, body).await?;
        parse_extraction(&text)
    }
    .await;

    match result {
        Ok(request) => {
            log_info(Category::Ai, "Trích xuất thông tin từ ảnh thành công");
            Ok(request)
        }
        Err(e) => {
            log_error(Category::Ai, &format!("[{}] {}", e.code(), e));
            Err(AppError::Ai(format!("{}{}", EXTRACT_ERROR, e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppData;
    use crate::summary::report_summary;
    use crate::utils::period::DateRange;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```html\n<div>x</div>\n```"), "<div>x</div>");
        assert_eq!(strip_code_fence("```\n<p>y</p>```"), "<p>y</p>");
        assert_eq!(strip_code_fence("  <div>z</div> "), "<div>z</div>");
        assert_eq!(strip_code_fence("<div>```</div>```"), "<div>```</div>```");
    }

    #[test]
    fn test_report_prompt_carries_period_and_totals() {
        let range = DateRange::new(day("2024-05-16"), day("2024-06-15"));
        let summary = report_summary(&AppData::default(), &range, day("2024-06-17"));
        let prompt = build_report_prompt(&summary, day("2024-06-17"));
        assert!(prompt.contains("từ 16/05/2024 đến 15/06/2024"));
        assert!(prompt.contains("Kiều Phú, ngày 17 tháng 6 năm 2024"));
        assert!(prompt.contains("Tổng thiệt hại ước tính: 0 ₫"));
        assert!(prompt.contains("Phân loại theo danh mục:\n      Không có dữ liệu."));
        assert!(prompt.contains("type\tfirst\ttransfer\trecall\trenewal\ttotal\nÔ tô\t0"));
    }

    #[test]
    fn test_parse_extraction_drops_malformed_dates() {
        let text = r#"{"docNumber":" 123/CSGT ","docDate":"12/05/2024","offenderName":"Nguyễn Văn A",
            "citizenId":"001","dateOfBirth":"1990-01-02","address":"Hà Nội"}"#;
        let req = parse_extraction(text).unwrap();
        assert_eq!(req.doc_number, "123/CSGT");
        assert_eq!(req.doc_date, "");
        assert_eq!(req.date_of_birth, "1990-01-02");
        assert_eq!(req.violation_behavior, "");
        assert!(parse_extraction("oops").is_err());
    }

    #[test]
    fn test_response_text() {
        let resp = json!({ "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }] });
        assert_eq!(response_text(&resp).as_deref(), Some("ab"));
        assert_eq!(response_text(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn test_extraction_schema_requires_all_fields() {
        let schema = extraction_schema();
        assert_eq!(schema["required"].as_array().map(Vec::len), Some(7));
        assert_eq!(schema["properties"]["citizenId"]["type"], "STRING");
    }
}
