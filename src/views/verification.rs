//! Verification requests from other units, AI intake and response letters

use leptos::*;
use wasm_bindgen_futures::spawn_local;

use crate::components::*;
use crate::context::AppContext;
use crate::models::{VerificationRequest, VerificationStatus};
use crate::summary::{display_date, newest_first};
use crate::utils::download::{download_file, print_document, wrap_document};
use crate::utils::log_trace::{log_error, Category};
use crate::utils::template::{format_date, ResponseLetter, DEFAULT_REQUESTING_UNIT, PLACEHOLDERS};
use crate::utils::{gemini, now_hhmm, today_iso};

const LETTER_TITLE: &str = "Công văn trả lời xác minh";
const NO_IMAGE: &str = "Vui lòng tải lên một hình ảnh để trích xuất.";

/// `CongVanTraLoi_<request number>_<YYYYMMDD>` without extension
fn letter_filename(doc_number: &str, created: &str) -> String {
    let number = if doc_number.trim().is_empty() { "XacMinh" } else { doc_number };
    format!("CongVanTraLoi_{}_{}", number, format_date(created, "YYYYMMDD"))
}

#[derive(Clone, Copy)]
struct RequestForm {
    id: RwSignal<String>,
    doc_number: RwSignal<String>,
    doc_date: RwSignal<String>,
    offender_name: RwSignal<String>,
    citizen_id: RwSignal<String>,
    date_of_birth: RwSignal<String>,
    address: RwSignal<String>,
    violation_behavior: RwSignal<String>,
    status: RwSignal<String>,
    end_date: RwSignal<String>,
    result_content: RwSignal<String>,
}

impl RequestForm {
    fn new() -> Self {
        RequestForm {
            id: create_rw_signal(String::new()),
            doc_number: create_rw_signal(String::new()),
            doc_date: create_rw_signal(String::new()),
            offender_name: create_rw_signal(String::new()),
            citizen_id: create_rw_signal(String::new()),
            date_of_birth: create_rw_signal(String::new()),
            address: create_rw_signal(String::new()),
            violation_behavior: create_rw_signal(String::new()),
            status: create_rw_signal(String::new()),
            end_date: create_rw_signal(String::new()),
            result_content: create_rw_signal(String::new()),
        }
    }

    fn load(&self, r: &VerificationRequest) {
        self.id.set(r.id.clone());
        self.doc_number.set(r.doc_number.clone());
        self.doc_date.set(r.doc_date.clone());
        self.offender_name.set(r.offender_name.clone());
        self.citizen_id.set(r.citizen_id.clone());
        self.date_of_birth.set(r.date_of_birth.clone());
        self.address.set(r.address.clone());
        self.violation_behavior.set(r.violation_behavior.clone());
        self.status.set(r.verification_result.label().to_string());
        self.end_date.set(r.end_date.clone());
        self.result_content.set(r.result_content.clone());
    }

    fn record(&self) -> VerificationRequest {
        VerificationRequest {
            id: self.id.get_untracked(),
            doc_number: self.doc_number.get_untracked(),
            doc_date: self.doc_date.get_untracked(),
            offender_name: self.offender_name.get_untracked(),
            citizen_id: self.citizen_id.get_untracked(),
            date_of_birth: self.date_of_birth.get_untracked(),
            address: self.address.get_untracked(),
            violation_behavior: self.violation_behavior.get_untracked(),
            verification_result: VerificationStatus::from(self.status.get_untracked()),
            end_date: self.end_date.get_untracked(),
            result_content: self.result_content.get_untracked(),
        }
    }
}

#[component]
pub fn VerificationView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let form = RequestForm::new();
    let form_mode = create_rw_signal(None::<bool>);
    let result_open = create_rw_signal(false);
    let upload_open = create_rw_signal(false);
    let letter_open = create_rw_signal(false);

    let sorted = create_memo(move |_| {
        newest_first(ctx.data.with(|d| d.verification_requests.clone()), |r| r.doc_date.as_str())
    });

    // Extracted fields prefill a new request; status and result start blank
    let open_add = move |prefill: VerificationRequest| {
        let doc_date = if prefill.doc_date.is_empty() { today_iso() } else { prefill.doc_date.clone() };
        form.load(&VerificationRequest {
            id: String::new(),
            doc_date,
            verification_result: VerificationStatus::NotStarted,
            end_date: String::new(),
            result_content: String::new(),
            ..prefill
        });
        form_mode.set(Some(false));
    };
    let open_edit = move |r: VerificationRequest| {
        form.load(&r);
        form_mode.set(Some(true));
    };
    let open_result = move |r: VerificationRequest| {
        form.load(&r);
        result_open.set(true);
    };

    let submit_form = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let record = form.record();
        if form_mode.get_untracked() == Some(true) {
            ctx.update(record);
        } else {
            ctx.create(record);
        }
        form_mode.set(None);
    };
    let submit_result = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        ctx.update(form.record());
        result_open.set(false);
    };

    let close_form = Callback::new(move |_| form_mode.set(None));
    let close_result = Callback::new(move |_| result_open.set(false));

    view! {
        <div class="page verification">
            <h2>"Quản Lý Phối Hợp Xác Minh"</h2>
            <div class="toolbar">
                <button class="btn primary" on:click=move |_| open_add(VerificationRequest::default())>"Thêm Yêu Cầu Xác Minh Mới"</button>
                <button class="btn outline" on:click=move |_| upload_open.set(true)>"Tải ảnh để xác minh (AI)"</button>
                <button class="btn primary" on:click=move |_| letter_open.set(true)>"Tạo Công Văn Trả Lời"</button>
            </div>

            <table class="data-table">
                <thead>
                    <tr>
                        <th>"Số CV"</th>
                        <th>"Ngày CV"</th>
                        <th>"Họ tên VP"</th>
                        <th>"CCCD"</th>
                        <th>"Hành vi vi phạm"</th>
                        <th>"Kết quả xác minh"</th>
                        <th>"Ngày kết thúc"</th>
                        <th>"Thao tác"</th>
                    </tr>
                </thead>
                <tbody>
                    {move || sorted.get().into_iter().map(|r| {
                        let for_edit = r.clone();
                        let for_result = r.clone();
                        let id = r.id.clone();
                        view! {
                            <tr>
                                <td>{r.doc_number.clone()}</td>
                                <td>{display_date(&r.doc_date)}</td>
                                <td>{r.offender_name.clone()}</td>
                                <td>{r.citizen_id.clone()}</td>
                                <td class="truncate">{r.violation_behavior.clone()}</td>
                                <td>{r.verification_result.label().to_string()}</td>
                                <td>{display_date(&r.end_date)}</td>
                                <td class="actions">
                                    <button class="btn secondary small" on:click=move |_| open_edit(for_edit.clone())>"Sửa"</button>
                                    <button class="btn small" on:click=move |_| open_result(for_result.clone())>"Cập nhật KQ"</button>
                                    <DeleteButton
                                        prompt="Bạn có chắc chắn muốn xóa yêu cầu xác minh này không? Hành động này không thể hoàn tác."
                                        on_confirm=Callback::new(move |_| ctx.delete::<VerificationRequest>(id.clone())) />
                                </td>
                            </tr>
                        }
                    }).collect_view()}
                </tbody>
            </table>

            <Show when=move || form_mode.get().is_some()>
                <Modal
                    title=if form_mode.get_untracked() == Some(true) { "Sửa Yêu Cầu Xác Minh" } else { "Thêm Yêu Cầu Xác Minh Mới" }
                    on_close=close_form
                    footer=view! { <span></span> }.into_view()
                >
                    <form class="form-grid" on:submit=submit_form>
                        <TextField label="Số CV" value=form.doc_number />
                        <DateField label="Ngày CV" value=form.doc_date />
                        <TextField label="Họ tên VP" value=form.offender_name />
                        <TextField label="CCCD" value=form.citizen_id />
                        <DateField label="Ngày sinh" value=form.date_of_birth />
                        <TextArea label="Địa chỉ" value=form.address />
                        <TextArea label="Hành vi vi phạm" value=form.violation_behavior />
                        <div class="form-actions">
                            <button type="button" class="btn secondary" on:click=move |_| close_form.call(())>"Hủy"</button>
                            <button type="submit" class="btn primary">
                                {if form_mode.get_untracked() == Some(true) { "Lưu Thay Đổi" } else { "Thêm Yêu Cầu" }}
                            </button>
                        </div>
                    </form>
                </Modal>
            </Show>

            <Show when=move || result_open.get()>
                <Modal title="Cập Nhật Kết Quả Xác Minh" on_close=close_result footer=view! { <span></span> }.into_view()>
                    <form class="form-grid" on:submit=submit_result>
                        <SelectField label="Kết quả xác minh" value=form.status
                            options=label_options(VerificationStatus::ALL.iter().map(|s| s.label())) />
                        <DateField label="Ngày kết thúc" value=form.end_date />
                        <TextArea label="Nội dung kết quả xác minh" value=form.result_content rows=5 />
                        <div class="form-actions">
                            <button type="button" class="btn secondary" on:click=move |_| close_result.call(())>"Hủy"</button>
                            <button type="submit" class="btn primary">"Lưu Kết Quả"</button>
                        </div>
                    </form>
                </Modal>
            </Show>

            <Show when=move || upload_open.get()>
                <ExtractDialog
                    on_close=Callback::new(move |_| upload_open.set(false))
                    on_extracted=Callback::new(move |r: VerificationRequest| {
                        upload_open.set(false);
                        open_add(r);
                    })
                />
            </Show>

            <Show when=move || letter_open.get()>
                <ResponseLetterDialog on_close=Callback::new(move |_| letter_open.set(false)) />
            </Show>
        </div>
    }
}

// ============================================
// Image extraction
// ============================================

#[component]
fn ExtractDialog(on_close: Callback<()>, on_extracted: Callback<VerificationRequest>) -> impl IntoView {
    let file = create_rw_signal(None::<web_sys::File>);
    let preview = create_rw_signal(None::<String>);
    let extracting = create_rw_signal(false);
    let error = create_rw_signal(None::<String>);

    // Also runs on cleanup, when the signal may already be gone
    let release_preview = move || {
        if let Some(url) = preview.try_get_untracked().flatten() {
            let _ = web_sys::Url::revoke_object_url(&url);
        }
        let _ = preview.try_set(None);
    };
    on_cleanup(release_preview);

    let on_file = move |ev: web_sys::Event| {
        let input = event_target::<web_sys::HtmlInputElement>(&ev);
        let selected = input.files().and_then(|list| list.get(0));
        release_preview();
        if let Some(f) = &selected {
            preview.set(web_sys::Url::create_object_url_with_blob(f).ok());
        }
        error.set(None);
        file.set(selected);
    };

    let extract = move |_| {
        let Some(f) = file.get_untracked() else {
            error.set(Some(NO_IMAGE.to_string()));
            return;
        };
        extracting.set(true);
        error.set(None);
        spawn_local(async move {
            match gemini::extract_verification_data(f).await {
                Ok(request) => on_extracted.call(request),
                Err(e) => {
                    log_error(Category::Ai, &format!("[{}] {}", e.code(), e));
                    let _ = error.try_set(Some(e.to_string()));
                }
            }
            // The dialog closes itself on success
            let _ = extracting.try_set(false);
        });
    };

    let footer = view! {
        <button class="btn secondary" on:click=move |_| on_close.call(())>"Hủy"</button>
        <button class="btn primary" on:click=extract
            disabled=move || file.with(Option::is_none) || extracting.get()>
            {move || if extracting.get() { "Đang trích xuất..." } else { "Trích xuất dữ liệu" }}
        </button>
    }
    .into_view();

    view! {
        <Modal title="Tải Ảnh Công Văn để Trích Xuất Thông Tin" on_close=on_close footer=footer>
            <p class="muted">
                "Vui lòng tải lên hình ảnh của công văn yêu cầu xác minh. Hệ thống sẽ sử dụng AI để trích xuất các trường thông tin và điền tự động vào biểu mẫu."
            </p>
            <input type="file" accept="image/*" on:change=on_file />
            {move || preview.get().map(|src| view! {
                <div class="image-preview">
                    <h4>"Xem trước ảnh:"</h4>
                    <img src=src alt="Ảnh công văn" />
                </div>
            })}
            {move || error.get().map(|msg| view! {
                <div class="alert error">
                    <p class="strong">"Lỗi trích xuất:"</p>
                    <p>{msg}</p>
                </div>
            })}
        </Modal>
    }
}

// ============================================
// Response letters
// ============================================

#[component]
fn ResponseLetterDialog(on_close: Callback<()>) -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let request_id = create_rw_signal(String::new());
    let created = create_rw_signal(today_iso());
    let requesting_unit = create_rw_signal(DEFAULT_REQUESTING_UNIT.to_string());
    let response_number = create_rw_signal(String::new());
    let editing_template = create_rw_signal(None::<String>);
    let template_draft = create_rw_signal(String::new());

    let generated = create_memo(move |_| {
        let id = request_id.get();
        let created = created.get();
        let unit = requesting_unit.get();
        let number = response_number.get();
        let time = now_hhmm();
        ctx.data.with(|d| {
            let request = d.verification_requests.iter().find(|r| r.id == id)?;
            let template = d.selected_template()?;
            let letter = ResponseLetter {
                request,
                doc_date: &created,
                requesting_unit: &unit,
                response_doc_number: &number,
                time: &time,
            };
            Some(letter.render(&template.content))
        })
    });
    // Hand edits in the preview; reset whenever the inputs change
    let edited = create_rw_signal(String::new());
    create_effect(move |_| edited.set(generated.get().unwrap_or_default()));

    let selected_request = move || {
        let id = request_id.get_untracked();
        ctx.data.with_untracked(|d| d.verification_requests.iter().find(|r| r.id == id).cloned())
    };
    let download = move |ext: &'static str, mime: &'static str| {
        let number = selected_request().map(|r| r.doc_number).unwrap_or_default();
        let filename = format!("{}.{}", letter_filename(&number, &created.get_untracked()), ext);
        download_file(&filename, mime, &wrap_document(LETTER_TITLE, &edited.get_untracked()));
    };
    let no_request = move || generated.with(Option::is_none);

    let edit_template = move |_| {
        let current = ctx.data.with_untracked(|d| d.selected_template().cloned());
        if let Some(t) = current {
            template_draft.set(t.content);
            editing_template.set(Some(t.id));
        }
    };
    let save_template = move |_| {
        if let Some(id) = editing_template.get_untracked() {
            let content = template_draft.get_untracked();
            let templates = ctx.data.with_untracked(|d| {
                d.response_document_templates
                    .iter()
                    .cloned()
                    .map(|mut t| {
                        if t.id == id {
                            t.content = content.clone();
                        }
                        t
                    })
                    .collect::<Vec<_>>()
            });
            ctx.set_templates(templates);
        }
        editing_template.set(None);
    };

    let template_options = move || {
        ctx.data.with(|d| {
            d.response_document_templates
                .iter()
                .map(|t| (t.id.clone(), t.name.clone()))
                .collect::<Vec<_>>()
        })
    };
    let request_options = move || {
        let mut options = vec![(String::new(), "--- Chọn yêu cầu ---".to_string())];
        ctx.data.with(|d| {
            options.extend(
                d.verification_requests
                    .iter()
                    .map(|r| (r.id.clone(), format!("{} - {}", r.doc_number, r.offender_name))),
            )
        });
        options
    };

    let footer = view! {
        <div class="footer-split">
            {move || ctx.data.with(|d| d.selected_template().map(|t| t.name.clone())).map(|name| view! {
                <button class="btn outline small" on:click=edit_template>{format!("Chỉnh sửa Mẫu: {}", name)}</button>
            })}
            <div class="footer-actions">
                <button class="btn primary" disabled=no_request
                    on:click=move |_| print_document(LETTER_TITLE, &edited.get_untracked())>"In Công Văn"</button>
                <button class="btn secondary" disabled=no_request
                    on:click=move |_| download("html", "text/html;charset=utf-8")>"Tải HTML"</button>
                <button class="btn secondary" disabled=no_request
                    on:click=move |_| download("doc", "application/msword")>"Tải DOC"</button>
                <button class="btn secondary" on:click=move |_| on_close.call(())>"Đóng"</button>
            </div>
        </div>
    }
    .into_view();

    view! {
        <Modal title="Tạo Công Văn Trả Lời" on_close=on_close wide=true footer=footer>
            <div class="form-grid">
                <label class="field">
                    <span class="field-label">"Chọn Mẫu Công Văn"</span>
                    <select on:change=move |ev| ctx.select_template(event_target_value(&ev))>
                        {move || template_options().into_iter().map(|(id, name)| {
                            let selected = ctx.data.with(|d| d.selected_document_template_id == id);
                            view! { <option value=id selected=selected>{name}</option> }
                        }).collect_view()}
                    </select>
                </label>
                <DateField label="Ngày Công Văn" value=created />
                <TextField label="Số Công văn trả lời" value=response_number placeholder="Ví dụ: 123/CSGT-ĐKX" />
                <TextField label="Đơn vị yêu cầu" value=requesting_unit />
                <label class="field full">
                    <span class="field-label">"Chọn Yêu Cầu Xác Minh *"</span>
                    <select on:change=move |ev| request_id.set(event_target_value(&ev))>
                        {move || request_options().into_iter().map(|(id, text)| {
                            let selected = request_id.get_untracked() == id;
                            view! { <option value=id selected=selected>{text}</option> }
                        }).collect_view()}
                    </select>
                </label>
            </div>
            {move || generated.get().map(|html| view! {
                <div class="doc-preview-block">
                    <h4>"Xem trước & Chỉnh sửa Công văn:"</h4>
                    <div class="doc-preview" contenteditable="true" inner_html=html
                        on:input=move |ev| edited.set(event_target::<web_sys::HtmlElement>(&ev).inner_html())></div>
                </div>
            })}

            <Show when=move || editing_template.with(Option::is_some)>
                <Modal
                    title=format!(
                        "Chỉnh sửa Mẫu Công văn: {}",
                        ctx.data.with_untracked(|d| d.selected_template().map(|t| t.name.clone()).unwrap_or_default())
                    )
                    on_close=Callback::new(move |_| editing_template.set(None))
                    wide=true
                    footer=view! {
                        <button class="btn secondary" on:click=move |_| editing_template.set(None)>"Hủy"</button>
                        <button class="btn primary" on:click=save_template>"Lưu Mẫu"</button>
                    }.into_view()
                >
                    <p class="muted">
                        "Bạn có thể chỉnh sửa mẫu công văn trả lời bằng HTML. Sử dụng các placeholder dưới đây (ví dụ: <<docNumber>>) để tự động điền thông tin."
                    </p>
                    <div class="placeholder-list">
                        {PLACEHOLDERS.iter().map(|(key, help)| view! {
                            <div class="placeholder-item">
                                <code>{format!("<<{}>>", key)}</code>
                                <span>{*help}</span>
                            </div>
                        }).collect_view()}
                    </div>
                    <TextArea label="Nội dung mẫu (HTML)" value=template_draft rows=20 />
                </Modal>
            </Show>
        </Modal>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_filename_uses_request_number_and_compact_date() {
        assert_eq!(letter_filename("125/CSGT", "2024-03-05"), "CongVanTraLoi_125/CSGT_20240305");
    }

    #[test]
    fn test_letter_filename_without_number() {
        assert_eq!(letter_filename("  ", "2024-12-31"), "CongVanTraLoi_XacMinh_20241231");
    }
}
