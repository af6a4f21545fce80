use leptos::*;

use crate::components::*;
use crate::context::AppContext;
use crate::models::{DailyTask, TaskCategory};
use crate::summary::{display_date, newest_first};
use crate::utils::today_iso;

#[component]
pub fn DailyTasksView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let open = create_rw_signal(false);
    let date = create_rw_signal(String::new());
    let category = create_rw_signal(String::new());
    let description = create_rw_signal(String::new());
    let result = create_rw_signal(String::new());

    let sorted = create_memo(move |_| newest_first(ctx.data.with(|d| d.daily_tasks.clone()), |t| t.date.as_str()));

    let open_add = move |_| {
        date.set(today_iso());
        category.set(TaskCategory::default().label().to_string());
        description.set(String::new());
        result.set(String::new());
        open.set(true);
    };
    let close = Callback::new(move |_| open.set(false));
    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        ctx.create(DailyTask {
            id: String::new(),
            date: date.get_untracked(),
            category: TaskCategory::from(category.get_untracked()),
            description: description.get_untracked(),
            result: result.get_untracked(),
        });
        open.set(false);
    };

    view! {
        <div class="page daily-tasks">
            <h2>"Theo Dõi Công Tác Thường Xuyên & Công Tác Theo Giai Đoạn"</h2>
            <div class="toolbar">
                <button class="btn primary" on:click=open_add>"Ghi Nhận Công Tác Mới"</button>
            </div>

            <table class="data-table">
                <thead>
                    <tr>
                        <th>"Ngày"</th>
                        <th>"Loại công tác"</th>
                        <th>"Mô tả"</th>
                        <th>"Kết quả"</th>
                        <th>"Thao tác"</th>
                    </tr>
                </thead>
                <tbody>
                    {move || sorted.get().into_iter().map(|task| {
                        let id = task.id.clone();
                        view! {
                            <tr>
                                <td>{display_date(&task.date)}</td>
                                <td>{task.category.label().to_string()}</td>
                                <td class="truncate">{task.description.clone()}</td>
                                <td class="truncate">{task.result.clone()}</td>
                                <td class="actions">
                                    <DeleteButton
                                        prompt="Bạn có chắc chắn muốn xóa công tác này không? Hành động này không thể hoàn tác."
                                        on_confirm=Callback::new(move |_| ctx.delete::<DailyTask>(id.clone())) />
                                </td>
                            </tr>
                        }
                    }).collect_view()}
                </tbody>
            </table>

            <Show when=move || open.get()>
                <Modal title="Ghi Nhận Công Tác Hàng Ngày" on_close=close footer=view! { <span></span> }.into_view()>
                    <form class="form-grid" on:submit=submit>
                        <DateField label="Ngày" value=date required=true />
                        <SelectField label="Loại công tác" value=category
                            options=label_options(TaskCategory::ALL.iter().map(|c| c.label())) />
                        <TextArea label="Mô tả công tác" value=description />
                        <TextArea label="Kết quả" value=result rows=2 />
                        <div class="form-actions">
                            <button type="button" class="btn secondary" on:click=move |_| close.call(())>"Hủy"</button>
                            <button type="submit" class="btn primary">"Lưu Công Tác"</button>
                        </div>
                    </form>
                </Modal>
            </Show>
        </div>
    }
}
