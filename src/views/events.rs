//! Campaigns with measurable targets

use leptos::*;

use crate::components::*;
use crate::context::AppContext;
use crate::models::{Event, EventTarget, UnitType};
use crate::summary::{display_date, newest_first};
use crate::utils::today_iso;

fn is_ongoing(event: &Event, today: &str) -> bool {
    event.from_date.as_str() <= today && event.to_date.as_str() >= today
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[component]
fn EventCard(event: Event, on_edit: Callback<Event>, on_add_target: Callback<String>, on_result: Callback<(String, String)>) -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let progress = event.progress().min(100.0);
    let ongoing = is_ongoing(&event, &today_iso());
    let event_id = event.id.clone();
    let for_edit = event.clone();

    let targets = if event.targets.is_empty() {
        view! { <li class="muted">"Chưa có chỉ tiêu nào được thêm."</li> }.into_view()
    } else {
        event
            .targets
            .iter()
            .map(|target| {
                let ids = (event.id.clone(), target.id.clone());
                view! {
                    <li>
                        {format!("{}: {} / {} {}", target.name, format_amount(target.achieved()), format_amount(target.goal), target.unit)}
                        <button class="btn outline tiny" on:click=move |_| on_result.call(ids.clone())>"Nhập KQ"</button>
                    </li>
                }
            })
            .collect_view()
    };

    let delete_id = event.id.clone();
    view! {
        <div class="event-card">
            <h3>{event.name.clone()}</h3>
            <p class="muted">{format!("Từ: {} - Đến: {}", display_date(&event.from_date), display_date(&event.to_date))}</p>
            <p>{event.content.clone()}</p>
            <div class="progress-block">
                <div class="progress-caption">
                    <span>"Tiến độ:"</span>
                    <span>{format!("{:.1}%", progress)}</span>
                </div>
                <div class="progress-track">
                    <div class="progress-fill" style=format!("width: {}%", progress)></div>
                </div>
                <span class=if ongoing { "badge blue" } else { "badge gray" }>
                    {if ongoing { "Đang diễn ra" } else { "Đã kết thúc" }}
                </span>
            </div>
            <h4>"Chỉ tiêu:"</h4>
            <ul class="target-list">{targets}</ul>
            <div class="card-actions">
                <button class="btn small" on:click=move |_| on_add_target.call(event_id.clone())>"Thêm Chỉ Tiêu"</button>
                <button class="btn secondary small" on:click=move |_| on_edit.call(for_edit.clone())>"Sửa"</button>
                <DeleteButton
                    prompt="Bạn có chắc chắn muốn xóa sự kiện này và toàn bộ chỉ tiêu liên quan không? Hành động này không thể hoàn tác."
                    on_confirm=Callback::new(move |_| ctx.delete::<Event>(delete_id.clone())) />
            </div>
        </div>
    }
}

#[component]
pub fn EventsView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");

    // Event form
    let editing = create_rw_signal(None::<bool>);
    let event_id = create_rw_signal(String::new());
    let name = create_rw_signal(String::new());
    let from_date = create_rw_signal(String::new());
    let to_date = create_rw_signal(String::new());
    let content = create_rw_signal(String::new());
    // Targets survive an edit of the event details
    let targets = create_rw_signal(Vec::<EventTarget>::new());

    // Target form
    let target_event = create_rw_signal(None::<String>);
    let target_name = create_rw_signal(String::new());
    let target_goal = create_rw_signal(0.0);
    let target_unit = create_rw_signal(UnitType::Cases.label().to_string());

    // Result form
    let result_for = create_rw_signal(None::<(String, String)>);
    let result_date = create_rw_signal(String::new());
    let result_value = create_rw_signal(0.0);

    let sorted = create_memo(move |_| newest_first(ctx.data.with(|d| d.events.clone()), |e| e.from_date.as_str()));

    let load_event = move |e: &Event| {
        event_id.set(e.id.clone());
        name.set(e.name.clone());
        from_date.set(e.from_date.clone());
        to_date.set(e.to_date.clone());
        content.set(e.content.clone());
        targets.set(e.targets.clone());
    };
    let open_add = move |_| {
        let today = today_iso();
        load_event(&Event { from_date: today.clone(), to_date: today, ..Default::default() });
        editing.set(Some(false));
    };
    let on_edit = Callback::new(move |e: Event| {
        load_event(&e);
        editing.set(Some(true));
    });
    let on_add_target = Callback::new(move |id: String| {
        target_name.set(String::new());
        target_goal.set(0.0);
        target_unit.set(UnitType::Cases.label().to_string());
        target_event.set(Some(id));
    });
    let on_result = Callback::new(move |ids: (String, String)| {
        result_date.set(today_iso());
        result_value.set(0.0);
        result_for.set(Some(ids));
    });

    let submit_event = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let record = Event {
            id: event_id.get_untracked(),
            name: name.get_untracked(),
            from_date: from_date.get_untracked(),
            to_date: to_date.get_untracked(),
            content: content.get_untracked(),
            targets: targets.get_untracked(),
        };
        if editing.get_untracked() == Some(true) {
            ctx.update(record);
        } else {
            ctx.create(record);
        }
        editing.set(None);
    };
    let submit_target = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if let Some(id) = target_event.get_untracked() {
            let target = EventTarget {
                name: target_name.get_untracked(),
                goal: target_goal.get_untracked(),
                unit: UnitType::from(target_unit.get_untracked()),
                ..Default::default()
            };
            ctx.add_event_target(&id, target);
        }
        target_event.set(None);
    };
    let submit_result = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if let Some((event, target)) = result_for.get_untracked() {
            ctx.record_target_result(&event, &target, &result_date.get_untracked(), result_value.get_untracked());
        }
        result_for.set(None);
    };

    let close_event = Callback::new(move |_| editing.set(None));
    let close_target = Callback::new(move |_| target_event.set(None));
    let close_result = Callback::new(move |_| result_for.set(None));
    let no_footer = || view! { <span></span> }.into_view();

    view! {
        <div class="page events">
            <h2>"Tạo và Theo Dõi Sự Kiện (Đợt Công Tác/Cao Điểm)"</h2>
            <div class="toolbar">
                <button class="btn primary" on:click=open_add>"Tạo Sự Kiện Mới"</button>
            </div>

            <div class="card-grid">
                {move || sorted.get().into_iter().map(|event| view! {
                    <EventCard event=event on_edit=on_edit on_add_target=on_add_target on_result=on_result />
                }).collect_view()}
            </div>

            <Show when=move || editing.get().is_some()>
                <Modal
                    title=if editing.get_untracked() == Some(true) { "Sửa Thông Tin Sự Kiện" } else { "Tạo Sự Kiện Mới" }
                    on_close=close_event
                    footer=no_footer()
                >
                    <form class="form-grid" on:submit=submit_event>
                        <TextField label="Tên Sự Kiện" value=name required=true />
                        <DateField label="Từ Ngày" value=from_date required=true />
                        <DateField label="Đến Ngày" value=to_date required=true />
                        <TextArea label="Nội dung" value=content />
                        <div class="form-actions">
                            <button type="button" class="btn secondary" on:click=move |_| close_event.call(())>"Hủy"</button>
                            <button type="submit" class="btn primary">
                                {if editing.get_untracked() == Some(true) { "Lưu Thay Đổi" } else { "Tạo Sự Kiện" }}
                            </button>
                        </div>
                    </form>
                </Modal>
            </Show>

            <Show when=move || target_event.with(Option::is_some)>
                <Modal title="Thêm Chỉ Tiêu Mới" on_close=close_target footer=no_footer()>
                    <form class="form-grid" on:submit=submit_target>
                        <TextField label="Tên Chỉ Tiêu" value=target_name required=true />
                        <NumberField label="Số lượng/Mục tiêu" value=target_goal step="any" />
                        <SelectField label="Đơn vị tính" value=target_unit
                            options=label_options(UnitType::ALL.iter().map(|u| u.label())) />
                        <div class="form-actions">
                            <button type="button" class="btn secondary" on:click=move |_| close_target.call(())>"Hủy"</button>
                            <button type="submit" class="btn primary">"Thêm Chỉ Tiêu"</button>
                        </div>
                    </form>
                </Modal>
            </Show>

            <Show when=move || result_for.with(Option::is_some)>
                <Modal title="Nhập Kết Quả Chỉ Tiêu" on_close=close_result footer=no_footer()>
                    <form class="form-grid" on:submit=submit_result>
                        <DateField label="Ngày nhập kết quả" value=result_date required=true />
                        <NumberField label="Kết quả đạt được" value=result_value step="any" />
                        <div class="form-actions">
                            <button type="button" class="btn secondary" on:click=move |_| close_result.call(())>"Hủy"</button>
                            <button type="submit" class="btn primary">"Lưu Kết Quả"</button>
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

    fn event(id: &str, from: &str, to: &str) -> Event {
        Event {
            id: id.to_string(),
            from_date: from.to_string(),
            to_date: to.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_events_sorted_by_start() {
        let sorted = newest_first(
            vec![
                event("a", "2024-01-01", "2024-01-31"),
                event("b", "2024-06-01", "2024-06-30"),
                event("c", "2024-03-01", "2024-03-31"),
            ],
            |e| e.from_date.as_str(),
        );
        let ids: Vec<_> = sorted.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_is_ongoing_includes_both_ends() {
        let e = event("a", "2024-06-01", "2024-06-30");
        assert!(is_ongoing(&e, "2024-06-01"));
        assert!(is_ongoing(&e, "2024-06-30"));
        assert!(!is_ongoing(&e, "2024-07-01"));
    }

    #[test]
    fn test_format_amount_drops_trailing_zero() {
        assert_eq!(format_amount(12.0), "12");
        assert_eq!(format_amount(2.5), "2.5");
    }
}
