//! Overview page

use leptos::*;

use crate::components::StatCard;
use crate::context::AppContext;
use crate::summary::{dashboard, RegistrationStat};
use crate::utils::today_iso;

#[component]
pub fn DashboardView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let metrics = create_memo(move |_| ctx.data.with(|d| dashboard(d, &today_iso())));

    let stat = move |f: fn(&crate::summary::DashboardMetrics) -> String| {
        Signal::derive(move || metrics.with(f))
    };

    view! {
        <div class="page dashboard">
            <h2>"Tổng Quan Ứng Dụng"</h2>

            <div class="stat-grid">
                <StatCard title="Tổng Vụ TNGT" value=stat(|m| m.total_accidents.to_string()) tone="blue" />
                <StatCard title="Tổng Số Người Chết" value=stat(|m| m.total_deaths.to_string()) tone="red" />
                <StatCard title="Đăng Ký Xe Hôm Nay" value=stat(|m| m.registrations_today.to_string()) tone="green" />
                <StatCard title="Sự Kiện Đang Diễn Ra" value=stat(|m| m.active_events.to_string()) tone="purple" />
            </div>

            <div class="panel-grid">
                <section class="panel">
                    <h3>"Xu Hướng Vụ TNGT Hàng Tháng"</h3>
                    {move || {
                        let months = metrics.with(|m| m.accidents_per_month.clone());
                        let peak = months.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);
                        if months.is_empty() {
                            return view! { <p class="empty">"Chưa có dữ liệu."</p> }.into_view();
                        }
                        view! {
                            <div class="bar-chart">
                                {months.into_iter().map(|(month, n)| view! {
                                    <div class="bar-row">
                                        <span class="bar-label">{month}</span>
                                        <div class="bar-track">
                                            <div class="bar-fill" style=format!("width: {}%", n * 100 / peak)></div>
                                        </div>
                                        <span class="bar-value">{n}</span>
                                    </div>
                                }).collect_view()}
                            </div>
                        }.into_view()
                    }}
                </section>

                <section class="panel">
                    <h3>"Thống Kê Tổng Hợp Đăng Ký Xe"</h3>
                    {move || view! { <RegistrationTable rows=metrics.with(|m| m.registration_stats.to_vec()) /> }}
                </section>

                <section class="panel">
                    <h3>"Tiến Độ Thực Hiện Sự Kiện (%)"</h3>
                    {move || {
                        let events = metrics.with(|m| m.event_progress.clone());
                        if events.is_empty() {
                            return view! { <p class="empty">"Chưa có sự kiện."</p> }.into_view();
                        }
                        events.into_iter().map(|e| view! {
                            <div class="bar-row">
                                <span class="bar-label">{e.name}</span>
                                <div class="bar-track">
                                    <div class="bar-fill" style=format!("width: {}%", e.progress.min(100.0))></div>
                                </div>
                                <span class="bar-value">{format!("{}%", e.progress)}</span>
                            </div>
                        }).collect_view()
                    }}
                </section>
            </div>
        </div>
    }
}

/// Per-vehicle-type registration table, shared with the registration and report pages
#[component]
pub fn RegistrationTable(rows: Vec<RegistrationStat>) -> impl IntoView {
    view! {
        <table class="data-table compact">
            <thead>
                <tr>
                    <th>"Loại phương tiện"</th>
                    <th>"Đăng ký mới"</th>
                    <th>"Sang tên"</th>
                    <th>"Thu hồi"</th>
                    <th>"Cấp đổi"</th>
                    <th>"Tổng cộng"</th>
                </tr>
            </thead>
            <tbody>
                {rows.into_iter().map(|r| view! {
                    <tr class=if r.label == crate::summary::GRAND_TOTAL_LABEL { "total-row" } else { "" }>
                        <td>{r.label}</td>
                        <td>{r.first}</td>
                        <td>{r.transfer}</td>
                        <td>{r.recall}</td>
                        <td>{r.renewal}</td>
                        <td><strong>{r.total}</strong></td>
                    </tr>
                }).collect_view()}
            </tbody>
        </table>
    }
}
