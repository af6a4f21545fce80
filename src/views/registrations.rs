//! Vehicle registration tallies

use chrono::NaiveDate;
use leptos::*;

use crate::components::*;
use crate::context::AppContext;
use crate::models::{VehicleRegistration, VehicleType};
use crate::summary::{display_date, registration_stats};
use crate::utils::period::{format_iso, parse_date, period_bounds, DateRange, ReportPeriod};
use crate::utils::{today, today_iso};
use crate::views::dashboard::RegistrationTable;

const FILTERS: [(&str, &str); 4] = [
    ("week", "Theo Tuần (T4 tuần trước - T3 tuần này)"),
    ("month", "Theo Tháng (16 tháng trước - 15 tháng này)"),
    ("custom", "Tùy Chọn"),
    ("all", "Tất Cả"),
];

/// Dates a preset filter fills in; `None` leaves the inputs as typed
fn preset_bounds(filter: &str, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    match filter {
        "week" => period_bounds(ReportPeriod::Weekly, today),
        "month" => period_bounds(ReportPeriod::Monthly, today),
        "all" => Some((
            NaiveDate::from_ymd_opt(2020, 1, 1)?,
            NaiveDate::from_ymd_opt(2030, 12, 31)?,
        )),
        _ => None,
    }
}

#[derive(Clone, Copy)]
struct RegistrationForm {
    id: RwSignal<String>,
    date: RwSignal<String>,
    vehicle_type: RwSignal<String>,
    first: RwSignal<f64>,
    transfer: RwSignal<f64>,
    recall: RwSignal<f64>,
    renewal: RwSignal<f64>,
}

impl RegistrationForm {
    fn new() -> Self {
        RegistrationForm {
            id: create_rw_signal(String::new()),
            date: create_rw_signal(String::new()),
            vehicle_type: create_rw_signal(VehicleType::Car.label().to_string()),
            first: create_rw_signal(0.0),
            transfer: create_rw_signal(0.0),
            recall: create_rw_signal(0.0),
            renewal: create_rw_signal(0.0),
        }
    }

    fn load(&self, r: &VehicleRegistration) {
        self.id.set(r.id.clone());
        self.date.set(r.date.clone());
        self.vehicle_type.set(r.vehicle_type.label().to_string());
        self.first.set(r.first_time_count as f64);
        self.transfer.set(r.transfer_count as f64);
        self.recall.set(r.recall_count as f64);
        self.renewal.set(r.renewal_count as f64);
    }

    fn record(&self) -> VehicleRegistration {
        VehicleRegistration {
            id: self.id.get_untracked(),
            date: self.date.get_untracked(),
            vehicle_type: VehicleType::from(self.vehicle_type.get_untracked()),
            first_time_count: self.first.get_untracked() as i64,
            transfer_count: self.transfer.get_untracked() as i64,
            recall_count: self.recall.get_untracked() as i64,
            renewal_count: self.renewal.get_untracked() as i64,
        }
    }
}

#[component]
pub fn RegistrationsView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let filter = create_rw_signal("week".to_string());
    let date_from = create_rw_signal(String::new());
    let date_to = create_rw_signal(String::new());
    let editing = create_rw_signal(None::<bool>);
    let form = RegistrationForm::new();

    create_effect(move |_| {
        if let Some((from, to)) = preset_bounds(&filter.get(), today()) {
            date_from.set(format_iso(from));
            date_to.set(format_iso(to));
        }
    });

    let range = create_memo(move |_| DateRange {
        from: parse_date(&date_from.get()),
        to: parse_date(&date_to.get()),
    });
    let filtered = create_memo(move |_| {
        let range = range.get();
        ctx.data.with(|d| {
            d.vehicle_registrations
                .iter()
                .filter(|r| range.contains(&r.date))
                .cloned()
                .collect::<Vec<_>>()
        })
    });

    let range_caption = move || {
        let from = date_from.get();
        let to = date_to.get();
        if from.is_empty() || to.is_empty() {
            "Tất cả".to_string()
        } else {
            format!("{} - {}", display_date(&from), display_date(&to))
        }
    };

    let edit_date = move |target: RwSignal<String>| {
        move |ev: web_sys::Event| {
            target.set(event_target_value(&ev));
            filter.set("custom".to_string());
        }
    };

    let open_add = move |_| {
        form.load(&VehicleRegistration { date: today_iso(), ..Default::default() });
        editing.set(Some(false));
    };
    let open_edit = move |r: VehicleRegistration| {
        form.load(&r);
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
        <div class="page registrations">
            <h2>"Theo Dõi Kết Quả Đăng Ký Xe"</h2>

            <div class="toolbar">
                <SelectField label="Bộ Lọc Thời Gian" value=filter
                    options=FILTERS.iter().map(|(v, l)| (v.to_string(), l.to_string())).collect() />
                <label class="field">
                    <span class="field-label">"Từ Ngày"</span>
                    <input type="date" prop:value=move || date_from.get() on:input=edit_date(date_from) />
                </label>
                <label class="field">
                    <span class="field-label">"Đến Ngày"</span>
                    <input type="date" prop:value=move || date_to.get() on:input=edit_date(date_to) />
                </label>
                <button class="btn primary" on:click=open_add>"Nhập Kết Quả Mới"</button>
            </div>

            <section class="card">
                <h3>"Thống Kê Tổng Hợp (" {range_caption} ")"</h3>
                {move || {
                    let rows = filtered.with(|list| registration_stats(list).to_vec());
                    view! { <RegistrationTable rows=rows /> }
                }}
            </section>

            <section class="card">
                <h3>"Chi Tiết Nhật Ký Nhập Liệu"</h3>
                <table class="data-table">
                    <thead>
                        <tr>
                            <th>"Ngày"</th>
                            <th>"Loại xe"</th>
                            <th>"Lần đầu"</th>
                            <th>"Sang tên"</th>
                            <th>"Thu hồi"</th>
                            <th>"Cấp đổi"</th>
                            <th>"Tổng cộng"</th>
                            <th>"Thao tác"</th>
                        </tr>
                    </thead>
                    <tbody>
                        {move || filtered.get().into_iter().map(|r| {
                            let for_edit = r.clone();
                            let id = r.id.clone();
                            view! {
                                <tr>
                                    <td>{display_date(&r.date)}</td>
                                    <td>{r.vehicle_type.label()}</td>
                                    <td>{r.first_time_count}</td>
                                    <td>{r.transfer_count}</td>
                                    <td>{r.recall_count}</td>
                                    <td>{r.renewal_count}</td>
                                    <td class="strong">{r.total()}</td>
                                    <td class="actions">
                                        <button class="btn small" on:click=move |_| open_edit(for_edit.clone())>"Sửa"</button>
                                        <DeleteButton
                                            prompt="Bạn có chắc chắn muốn xóa bản ghi đăng ký xe này không? Hành động này không thể hoàn tác."
                                            on_confirm=Callback::new(move |_| ctx.delete::<VehicleRegistration>(id.clone())) />
                                    </td>
                                </tr>
                            }
                        }).collect_view()}
                    </tbody>
                </table>
            </section>

            <Show when=move || editing.get().is_some()>
                <Modal
                    title=if editing.get_untracked() == Some(true) { "Sửa Kết Quả Đăng Ký Xe" } else { "Nhập Kết Quả Đăng Ký Xe" }
                    on_close=close
                    footer=view! { <span></span> }.into_view()
                >
                    <form class="form-grid" on:submit=submit>
                        <DateField label="Ngày" value=form.date required=true />
                        <SelectField label="Loại xe" value=form.vehicle_type
                            options=label_options(VehicleType::ALL.iter().map(|v| v.label())) />
                        <NumberField label="Lần đầu (số lượng)" value=form.first />
                        <NumberField label="Sang tên (số lượng)" value=form.transfer />
                        <NumberField label="Thu hồi (số lượng)" value=form.recall />
                        <NumberField label="Cấp đổi (số lượng)" value=form.renewal />
                        <div class="form-actions">
                            <button type="button" class="btn secondary" on:click=move |_| close.call(())>"Hủy"</button>
                            <button type="submit" class="btn primary">
                                {if editing.get_untracked() == Some(true) { "Lưu Thay Đổi" } else { "Lưu Kết Quả" }}
                            </button>
                        </div>
                    </form>
                </Modal>
            </Show>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_week_preset_ends_on_tuesday() {
        // 2024-05-09 is a Thursday
        let (from, to) = preset_bounds("week", d("2024-05-09")).unwrap();
        assert_eq!(from, d("2024-05-08"));
        assert_eq!(to, d("2024-05-14"));
    }

    #[test]
    fn test_month_preset_runs_16th_to_15th() {
        let (from, to) = preset_bounds("month", d("2024-05-10")).unwrap();
        assert_eq!(from, d("2024-04-16"));
        assert_eq!(to, d("2024-05-15"));
    }

    #[test]
    fn test_all_preset_is_wide_and_custom_keeps_inputs() {
        let (from, to) = preset_bounds("all", d("2024-05-10")).unwrap();
        assert_eq!(from, d("2020-01-01"));
        assert_eq!(to, d("2030-12-31"));
        assert!(preset_bounds("custom", d("2024-05-10")).is_none());
    }
}
