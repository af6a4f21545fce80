//! Traffic accident register

use leptos::*;

use crate::components::*;
use crate::context::AppContext;
use crate::models::{AlcoholLevel, TrafficAccident};
use crate::summary::{accident_stats, display_date, format_vnd};
use crate::utils::period::{parse_date, DateRange};

#[derive(Clone, Copy)]
struct AccidentForm {
    id: RwSignal<String>,
    date: RwSignal<String>,
    time: RwSignal<String>,
    location: RwSignal<String>,
    content: RwSignal<String>,
    consequences: RwSignal<String>,
    deaths: RwSignal<f64>,
    injuries: RwSignal<f64>,
    damage: RwSignal<f64>,
    alcohol: RwSignal<String>,
    handling_unit: RwSignal<String>,
    processing_result: RwSignal<String>,
}

impl AccidentForm {
    fn new() -> Self {
        AccidentForm {
            id: create_rw_signal(String::new()),
            date: create_rw_signal(String::new()),
            time: create_rw_signal(String::new()),
            location: create_rw_signal(String::new()),
            content: create_rw_signal(String::new()),
            consequences: create_rw_signal(String::new()),
            deaths: create_rw_signal(0.0),
            injuries: create_rw_signal(0.0),
            damage: create_rw_signal(0.0),
            alcohol: create_rw_signal(AlcoholLevel::No.as_str().to_string()),
            handling_unit: create_rw_signal(String::new()),
            processing_result: create_rw_signal(String::new()),
        }
    }

    fn load(&self, a: &TrafficAccident) {
        self.id.set(a.id.clone());
        self.date.set(a.date.clone());
        self.time.set(a.time.clone());
        self.location.set(a.location.clone());
        self.content.set(a.content.clone());
        self.consequences.set(a.consequences.clone());
        self.deaths.set(a.deaths as f64);
        self.injuries.set(a.injuries as f64);
        self.damage.set(a.estimated_damage_vnd as f64);
        self.alcohol.set(a.alcohol_level.as_str().to_string());
        self.handling_unit.set(a.handling_unit.clone());
        self.processing_result.set(a.processing_result.clone());
    }

    fn record(&self) -> TrafficAccident {
        let alcohol = self.alcohol.get_untracked();
        TrafficAccident {
            id: self.id.get_untracked(),
            date: self.date.get_untracked(),
            time: self.time.get_untracked(),
            location: self.location.get_untracked(),
            content: self.content.get_untracked(),
            consequences: self.consequences.get_untracked(),
            deaths: self.deaths.get_untracked() as i64,
            injuries: self.injuries.get_untracked() as i64,
            estimated_damage_vnd: self.damage.get_untracked() as i64,
            alcohol_level: AlcoholLevel::ALL
                .iter()
                .copied()
                .find(|a| a.as_str() == alcohol)
                .unwrap_or(AlcoholLevel::Unknown),
            handling_unit: self.handling_unit.get_untracked(),
            processing_result: self.processing_result.get_untracked(),
        }
    }
}

#[component]
pub fn AccidentsView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let filter_from = create_rw_signal(String::new());
    let filter_to = create_rw_signal(String::new());
    // None: closed, Some(false): adding, Some(true): editing
    let editing = create_rw_signal(None::<bool>);
    let detail = create_rw_signal(None::<TrafficAccident>);
    let form = AccidentForm::new();

    let filtered = create_memo(move |_| {
        let range = DateRange {
            from: parse_date(&filter_from.get()),
            to: parse_date(&filter_to.get()),
        };
        ctx.data.with(|d| {
            d.traffic_accidents
                .iter()
                .filter(|a| range.admits(&a.date))
                .cloned()
                .collect::<Vec<_>>()
        })
    });
    let stats = create_memo(move |_| filtered.with(|list| accident_stats(list)));

    let open_add = move |_| {
        form.load(&TrafficAccident { alcohol_level: AlcoholLevel::No, ..Default::default() });
        editing.set(Some(false));
    };
    let open_edit = move |a: TrafficAccident| {
        form.load(&a);
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
        <div class="page accidents">
            <h2>"Quản Lý Vụ Việc Tai Nạn Giao Thông"</h2>

            <div class="toolbar">
                <button class="btn primary" on:click=open_add>"Thêm Vụ Việc Mới"</button>
                <div class="filters">
                    <DateField label="Từ Ngày" value=filter_from />
                    <DateField label="Đến Ngày" value=filter_to />
                </div>
            </div>

            <div class="stat-grid five">
                <StatCard title="Tổng số vụ" value=Signal::derive(move || stats.with(|s| s.count.to_string())) tone="blue" />
                <StatCard title="Vụ có Cồn" value=Signal::derive(move || stats.with(|s| s.alcohol.to_string())) tone="purple" />
                <StatCard title="Người chết" value=Signal::derive(move || stats.with(|s| s.deaths.to_string())) tone="red" />
                <StatCard title="Người bị thương" value=Signal::derive(move || stats.with(|s| s.injuries.to_string())) tone="yellow" />
                <StatCard title="Thiệt hại (VNĐ)" value=Signal::derive(move || stats.with(|s| format_vnd(s.damage_vnd))) tone="green" />
            </div>

            <table class="data-table">
                <thead>
                    <tr>
                        <th>"Ngày"</th>
                        <th>"Giờ"</th>
                        <th>"Địa điểm"</th>
                        <th>"Nội dung"</th>
                        <th>"Người Chết"</th>
                        <th>"Người Bị thương"</th>
                        <th>"Thiệt hại (VNĐ)"</th>
                        <th>"Nồng độ cồn"</th>
                        <th>"Thao tác"</th>
                    </tr>
                </thead>
                <tbody>
                    {move || filtered.get().into_iter().map(|a| {
                        let for_detail = a.clone();
                        let for_edit = a.clone();
                        let id = a.id.clone();
                        view! {
                            <tr>
                                <td>{display_date(&a.date)}</td>
                                <td>{a.time.clone()}</td>
                                <td>{a.location.clone()}</td>
                                <td class="truncate">{a.content.clone()}</td>
                                <td>{a.deaths}</td>
                                <td>{a.injuries}</td>
                                <td>{format_vnd(a.estimated_damage_vnd)}</td>
                                <td>{a.alcohol_level.label()}</td>
                                <td class="actions">
                                    <button class="btn outline small" on:click=move |_| detail.set(Some(for_detail.clone()))>"Xem"</button>
                                    <button class="btn small" on:click=move |_| open_edit(for_edit.clone())>"Sửa"</button>
                                    <DeleteButton
                                        prompt="Bạn có chắc chắn muốn xóa vụ tai nạn này không? Hành động này không thể hoàn tác."
                                        on_confirm=Callback::new(move |_| ctx.delete::<TrafficAccident>(id.clone())) />
                                </td>
                            </tr>
                        }
                    }).collect_view()}
                </tbody>
            </table>

            <Show when=move || editing.get().is_some()>
                <Modal
                    title=if editing.get_untracked() == Some(true) { "Sửa Vụ Việc Tai Nạn" } else { "Thêm Vụ Việc Tai Nạn Mới" }
                    on_close=close
                    footer=view! { <span></span> }.into_view()
                >
                    <form class="form-grid" on:submit=submit>
                        <DateField label="Ngày" value=form.date required=true />
                        <TimeField label="Giờ" value=form.time />
                        <TextField label="Địa điểm" value=form.location />
                        <TextArea label="Nội dung" value=form.content />
                        <TextArea label="Hậu quả" value=form.consequences />
                        <NumberField label="Người Chết" value=form.deaths />
                        <NumberField label="Người Bị thương" value=form.injuries />
                        <NumberField label="Thiệt hại Ước tính (VNĐ)" value=form.damage />
                        <SelectField label="Nồng độ cồn" value=form.alcohol
                            options=AlcoholLevel::ALL.iter().map(|a| (a.as_str().to_string(), a.label().to_string())).collect() />
                        <TextField label="Đơn vị thụ lý" value=form.handling_unit />
                        <TextArea label="Kết quả xử lý" value=form.processing_result />
                        <div class="form-actions">
                            <button type="button" class="btn secondary" on:click=move |_| close.call(())>"Hủy"</button>
                            <button type="submit" class="btn primary">
                                {if editing.get_untracked() == Some(true) { "Lưu Thay Đổi" } else { "Thêm Vụ Việc" }}
                            </button>
                        </div>
                    </form>
                </Modal>
            </Show>

            {move || detail.get().map(|a| view! {
                <Modal title="Chi Tiết Vụ Việc Tai Nạn" on_close=Callback::new(move |_| detail.set(None))>
                    <dl class="detail-grid">
                        <dt>"Ngày xảy ra"</dt><dd>{display_date(&a.date)}</dd>
                        <dt>"Giờ xảy ra"</dt><dd>{a.time.clone()}</dd>
                        <dt>"Địa điểm"</dt><dd>{a.location.clone()}</dd>
                        <dt>"Nội dung vụ việc"</dt><dd class="pre">{a.content.clone()}</dd>
                        <dt>"Hậu quả"</dt><dd class="pre">{a.consequences.clone()}</dd>
                        <dt>"Người chết"</dt><dd class="danger">{a.deaths}</dd>
                        <dt>"Người bị thương"</dt><dd class="warning">{a.injuries}</dd>
                        <dt>"Nồng độ cồn"</dt><dd>{a.alcohol_level.label()}</dd>
                        <dt>"Thiệt hại ước tính"</dt><dd>{format_vnd(a.estimated_damage_vnd)}</dd>
                        <dt>"Đơn vị thụ lý"</dt><dd>{a.handling_unit.clone()}</dd>
                        <dt>"Kết quả xử lý"</dt><dd class="pre">{a.processing_result.clone()}</dd>
                    </dl>
                </Modal>
            })}
        </div>
    }
}
