//! Advisory letters, plans and reports issued by the unit

use leptos::*;

use crate::components::*;
use crate::context::AppContext;
use crate::models::{AdvisoryDocType, AdvisoryDocument};
use crate::summary::{display_date, newest_first};
use crate::utils::today_iso;

#[derive(Clone, Copy)]
struct AdvisoryForm {
    id: RwSignal<String>,
    doc_number: RwSignal<String>,
    doc_date: RwSignal<String>,
    doc_type: RwSignal<String>,
    content: RwSignal<String>,
    recipient_unit: RwSignal<String>,
    release_date: RwSignal<String>,
}

impl AdvisoryForm {
    fn new() -> Self {
        AdvisoryForm {
            id: create_rw_signal(String::new()),
            doc_number: create_rw_signal(String::new()),
            doc_date: create_rw_signal(String::new()),
            doc_type: create_rw_signal(String::new()),
            content: create_rw_signal(String::new()),
            recipient_unit: create_rw_signal(String::new()),
            release_date: create_rw_signal(String::new()),
        }
    }

    fn load(&self, d: &AdvisoryDocument) {
        self.id.set(d.id.clone());
        self.doc_number.set(d.doc_number.clone());
        self.doc_date.set(d.doc_date.clone());
        self.doc_type.set(d.doc_type.label().to_string());
        self.content.set(d.content.clone());
        self.recipient_unit.set(d.recipient_unit.clone());
        self.release_date.set(d.release_date.clone());
    }

    fn record(&self) -> AdvisoryDocument {
        AdvisoryDocument {
            id: self.id.get_untracked(),
            doc_number: self.doc_number.get_untracked(),
            doc_date: self.doc_date.get_untracked(),
            doc_type: AdvisoryDocType::from(self.doc_type.get_untracked()),
            content: self.content.get_untracked(),
            recipient_unit: self.recipient_unit.get_untracked(),
            release_date: self.release_date.get_untracked(),
        }
    }
}

#[component]
pub fn AdvisoryView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let editing = create_rw_signal(None::<bool>);
    let form = AdvisoryForm::new();

    let sorted = create_memo(move |_| {
        newest_first(ctx.data.with(|d| d.advisory_documents.clone()), |d| d.doc_date.as_str())
    });

    let open_add = move |_| {
        let today = today_iso();
        form.load(&AdvisoryDocument {
            doc_date: today.clone(),
            release_date: today,
            ..Default::default()
        });
        editing.set(Some(false));
    };
    let open_edit = move |d: AdvisoryDocument| {
        form.load(&d);
        editing.set(Some(true));
    };
    let close = Callback::new(move |_| editing.set(None));
    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let record = form.record();
        if editing.get_untracked() == Some(true) {
            ctx.update(record);
        } else {
            ctx.create(record);
        }
        editing.set(None);
    };

    view! {
        <div class="page advisory">
            <h2>"Quản Lý Công Tác Tham Mưu"</h2>
            <div class="toolbar">
                <button class="btn primary" on:click=open_add>"Thêm Công Văn/Kế Hoạch Mới"</button>
            </div>

            <table class="data-table">
                <thead>
                    <tr>
                        <th>"Số CV/KH"</th>
                        <th>"Ngày BH"</th>
                        <th>"Loại CV"</th>
                        <th>"Nội dung"</th>
                        <th>"Đơn vị nhận"</th>
                        <th>"Ngày phát hành"</th>
                        <th>"Thao tác"</th>
                    </tr>
                </thead>
                <tbody>
                    {move || sorted.get().into_iter().map(|doc| {
                        let for_edit = doc.clone();
                        let id = doc.id.clone();
                        view! {
                            <tr>
                                <td>{doc.doc_number.clone()}</td>
                                <td>{display_date(&doc.doc_date)}</td>
                                <td>{doc.doc_type.label().to_string()}</td>
                                <td class="truncate">{doc.content.clone()}</td>
                                <td>{doc.recipient_unit.clone()}</td>
                                <td>{display_date(&doc.release_date)}</td>
                                <td class="actions">
                                    <button class="btn small" on:click=move |_| open_edit(for_edit.clone())>"Sửa"</button>
                                    <DeleteButton
                                        prompt="Bạn có chắc chắn muốn xóa công văn/kế hoạch này không? Hành động này không thể hoàn tác."
                                        on_confirm=Callback::new(move |_| ctx.delete::<AdvisoryDocument>(id.clone())) />
                                </td>
                            </tr>
                        }
                    }).collect_view()}
                </tbody>
            </table>

            <Show when=move || editing.get().is_some()>
                <Modal
                    title=if editing.get_untracked() == Some(true) { "Sửa Công Văn/Kế Hoạch Tham Mưu" } else { "Thêm Công Văn/Kế Hoạch Tham Mưu Mới" }
                    on_close=close
                    footer=view! { <span></span> }.into_view()
                >
                    <form class="form-grid" on:submit=submit>
                        <TextField label="Số công văn/kế hoạch" value=form.doc_number required=true />
                        <DateField label="Ngày ban hành" value=form.doc_date required=true />
                        <SelectField label="Loại công văn" value=form.doc_type
                            options=label_options(AdvisoryDocType::ALL.iter().map(|t| t.label())) />
                        <TextArea label="Nội dung" value=form.content />
                        <TextField label="Đơn vị nhận" value=form.recipient_unit />
                        <DateField label="Ngày phát hành" value=form.release_date />
                        <div class="form-actions">
                            <button type="button" class="btn secondary" on:click=move |_| close.call(())>"Hủy"</button>
                            <button type="submit" class="btn primary">
                                {if editing.get_untracked() == Some(true) { "Lưu Thay Đổi" } else { "Thêm Công Văn" }}
                            </button>
                        </div>
                    </form>
                </Modal>
            </Show>
        </div>
    }
}
