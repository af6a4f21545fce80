//! File downloads and print windows for generated documents

use std::sync::OnceLock;

use regex::Regex;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

const DOCUMENT_CSS: &str = include_str!("../../templates/document.css");

/// Wraps a document body in a standalone A4 page
pub fn wrap_document(title: &str, body_html: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        title, DOCUMENT_CSS, body_html
    )
}

fn tag_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").ok()).as_ref()
}

fn space_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").ok()).as_ref()
}

/// Plain-text rendition for `.txt` downloads: tags dropped, `&nbsp;`
/// expanded and whitespace runs collapsed.
pub fn strip_html(html: &str) -> String {
    let (Some(tags), Some(spaces)) = (tag_regex(), space_regex()) else {
        return html.to_string();
    };
    let text = tags.replace_all(html, "");
    let text = text.replace("&nbsp;", " ");
    spaces.replace_all(&text, " ").trim().to_string()
}

/// Offers `content` as a file download
pub fn download_file(filename: &str, mime: &str, content: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    let parts = js_sys::Array::new();
    parts.push(&JsValue::from_str(content));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(mime);

    let Ok(blob) = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options) else {
        return;
    };
    let Ok(url) = web_sys::Url::create_object_url_with_blob(&blob) else {
        return;
    };
    if let Ok(a) = document.create_element("a") {
        let _ = a.set_attribute("href", &url);
        let _ = a.set_attribute("download", filename);
        if let Some(element) = a.dyn_ref::<web_sys::HtmlElement>() {
            element.click();
        }
    }
    let _ = web_sys::Url::revoke_object_url(&url);
}

/// Opens the document in a new window and starts printing
pub fn print_document(title: &str, body_html: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(Some(print_window)) = window.open_with_url_and_target("", "_blank") else {
        return;
    };
    if let Some(root) = print_window.document().and_then(|d| d.document_element()) {
        root.set_inner_html(&inner_html_of(&wrap_document(title, body_html)));
    }
    let _ = print_window.print();
}

/// Contents between `<html>` and `</html>`, for assigning to the root element
fn inner_html_of(page: &str) -> String {
    let start = page.find("<html>").map(|i| i + "<html>".len()).unwrap_or(0);
    let end = page.rfind("</html>").unwrap_or(page.len());
    page.get(start..end).unwrap_or(page).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        let html = "<div><h1>BÁO CÁO</h1>\n  <p>Tổng&nbsp;số   vụ: <strong>3</strong></p></div>";
        assert_eq!(strip_html(html), "BÁO CÁO Tổng số vụ: 3");
    }

    #[test]
    fn test_wrap_document() {
        let page = wrap_document("Báo cáo", "<p>x</p>");
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Báo cáo</title>"));
        assert!(page.contains("size: A4"));
        assert!(page.contains("<body>\n<p>x</p>\n</body>"));
    }

    #[test]
    fn test_inner_html_of() {
        assert_eq!(inner_html_of("<!DOCTYPE html><html><head></head></html>"), "<head></head>");
    }
}
