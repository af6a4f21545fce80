//! Period summary and AI-written report

use leptos::*;
use wasm_bindgen_futures::spawn_local;

use crate::components::*;
use crate::context::AppContext;
use crate::models::{AlcoholLevel, AppData, TrafficAccident, VerificationStatus};
use crate::summary::{display_date, format_vnd, report_summary, ReportSummary};
use crate::utils::download::{download_file, print_document, strip_html, wrap_document};
use crate::utils::log_trace::{log_error, log_info, Category};
use crate::utils::period::{format_iso, resolve_range, DateRange, ReportPeriod};
use crate::utils::{gemini, today, today_iso};
use crate::views::dashboard::RegistrationTable;

const NO_RANGE: &str = "Vui lòng chọn khoảng thời gian hoặc nhập đầy đủ ngày tùy chọn.";
const FAILED_REPORT: &str = "<p class=\"error\">Không thể tạo báo cáo. Vui lòng thử lại.</p>";

/// `BaoCao_<period>_<from>-<to>.<ext>`, dates as shown on screen
fn report_filename(period: ReportPeriod, range: &DateRange, ext: &str) -> String {
    let (from, to) = range
        .bounds()
        .map(|(f, t)| (display_date(&format_iso(f)), display_date(&format_iso(t))))
        .unwrap_or_default();
    format!("BaoCao_{}_{}-{}.{}", period.value(), from, to, ext)
}

/// Drill-down lists behind the summary cards
#[derive(Debug, Clone, PartialEq)]
enum Detail {
    Accidents(AccidentFilter),
    Events,
    Tasks,
    Verification(Option<VerificationStatus>),
    Advisory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccidentFilter {
    All,
    Alcohol,
    Deaths,
    Injuries,
    Damage,
}

impl AccidentFilter {
    fn title(&self) -> String {
        let suffix = match self {
            AccidentFilter::All => "",
            AccidentFilter::Alcohol => " (Có nồng độ cồn)",
            AccidentFilter::Deaths => " (Có người chết)",
            AccidentFilter::Injuries => " (Có người bị thương)",
            AccidentFilter::Damage => " (Thiệt hại tài sản)",
        };
        format!("Danh sách Vụ việc TNGT{}", suffix)
    }

    fn admits(&self, a: &TrafficAccident) -> bool {
        match self {
            AccidentFilter::Alcohol => a.alcohol_level == AlcoholLevel::Yes,
            AccidentFilter::Deaths => a.deaths > 0,
            AccidentFilter::Injuries => a.injuries > 0,
            AccidentFilter::All | AccidentFilter::Damage => true,
        }
    }
}

fn detail_title(detail: &Detail) -> String {
    match detail {
        Detail::Accidents(filter) => filter.title(),
        Detail::Events => "Danh sách Sự kiện (Đợt cao điểm)".to_string(),
        Detail::Tasks => "Danh sách Công tác Hàng ngày".to_string(),
        Detail::Verification(None) => "Danh sách Yêu cầu Xác minh".to_string(),
        Detail::Verification(Some(status)) => format!("Danh sách Yêu cầu Xác minh ({})", status.label()),
        Detail::Advisory => "Danh sách Văn bản Tham mưu".to_string(),
    }
}

fn header(cols: &[&'static str]) -> impl IntoView {
    view! { <thead><tr>{cols.iter().map(|c| view! { <th>{*c}</th> }).collect_view()}</tr></thead> }
}

fn detail_table(detail: &Detail, data: &AppData, range: &DateRange) -> View {
    match detail {
        Detail::Accidents(filter) => {
            let rows = data
                .traffic_accidents
                .iter()
                .filter(|a| range.contains(&a.date) && filter.admits(a))
                .map(|a| view! {
                    <tr>
                        <td>{display_date(&a.date)}</td>
                        <td>{a.location.clone()}</td>
                        <td>{a.content.clone()}</td>
                        <td>{a.deaths}</td>
                        <td>{a.injuries}</td>
                        <td>{a.alcohol_level.label()}</td>
                        <td>{format_vnd(a.estimated_damage_vnd)}</td>
                    </tr>
                })
                .collect_view();
            view! {
                <table class="data-table">
                    {header(&["Ngày", "Địa điểm", "Nội dung", "Chết", "Bị thương", "Cồn", "Thiệt hại"])}
                    <tbody>{rows}</tbody>
                </table>
            }
            .into_view()
        }
        Detail::Events => {
            let rows = data
                .events
                .iter()
                .filter(|e| range.overlaps(&e.from_date, &e.to_date))
                .map(|e| view! {
                    <tr>
                        <td>{e.name.clone()}</td>
                        <td>{display_date(&e.from_date)}</td>
                        <td>{display_date(&e.to_date)}</td>
                        <td>{e.content.clone()}</td>
                        <td>{e.targets.len()}</td>
                    </tr>
                })
                .collect_view();
            view! {
                <table class="data-table">
                    {header(&["Tên Sự Kiện", "Từ ngày", "Đến ngày", "Nội dung", "Số chỉ tiêu"])}
                    <tbody>{rows}</tbody>
                </table>
            }
            .into_view()
        }
        Detail::Tasks => {
            let rows = data
                .daily_tasks
                .iter()
                .filter(|t| range.contains(&t.date))
                .map(|t| view! {
                    <tr>
                        <td>{display_date(&t.date)}</td>
                        <td>{t.category.label().to_string()}</td>
                        <td>{t.description.clone()}</td>
                        <td>{t.result.clone()}</td>
                    </tr>
                })
                .collect_view();
            view! {
                <table class="data-table">
                    {header(&["Ngày", "Loại công tác", "Mô tả", "Kết quả"])}
                    <tbody>{rows}</tbody>
                </table>
            }
            .into_view()
        }
        Detail::Verification(status) => {
            let status = status.clone();
            let rows = data
                .verification_requests
                .iter()
                .filter(|r| range.contains(&r.doc_date))
                .filter(|r| status.as_ref().map_or(true, |s| r.verification_result == *s))
                .map(|r| view! {
                    <tr>
                        <td>{display_date(&r.doc_date)}</td>
                        <td>{r.doc_number.clone()}</td>
                        <td>{r.offender_name.clone()}</td>
                        <td class="truncate">{r.violation_behavior.clone()}</td>
                        <td>{r.verification_result.label().to_string()}</td>
                    </tr>
                })
                .collect_view();
            view! {
                <table class="data-table">
                    {header(&["Ngày CV", "Số CV", "Đối tượng", "Nội dung", "Kết quả"])}
                    <tbody>{rows}</tbody>
                </table>
            }
            .into_view()
        }
        Detail::Advisory => {
            let rows = data
                .advisory_documents
                .iter()
                .filter(|d| range.contains(&d.doc_date))
                .map(|d| view! {
                    <tr>
                        <td>{display_date(&d.doc_date)}</td>
                        <td>{d.doc_number.clone()}</td>
                        <td>{d.doc_type.label().to_string()}</td>
                        <td class="truncate">{d.content.clone()}</td>
                        <td>{d.recipient_unit.clone()}</td>
                    </tr>
                })
                .collect_view();
            view! {
                <table class="data-table">
                    {header(&["Ngày ban hành", "Số CV/KH", "Loại", "Nội dung", "Đơn vị nhận"])}
                    <tbody>{rows}</tbody>
                </table>
            }
            .into_view()
        }
    }
}

fn count_table(heading: &'static str, rows: Vec<(String, usize)>) -> impl IntoView {
    view! {
        <table class="data-table compact">
            <thead><tr><th>{heading}</th><th>"Số lượng"</th></tr></thead>
            <tbody>
                {rows.into_iter().map(|(label, n)| view! { <tr><td>{label}</td><td>{n}</td></tr> }).collect_view()}
            </tbody>
        </table>
    }
}

#[component]
pub fn ReportsView() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let period = create_rw_signal(ReportPeriod::Monthly.value().to_string());
    let reference = create_rw_signal(today_iso());
    let custom_from = create_rw_signal(String::new());
    let custom_to = create_rw_signal(String::new());

    let report = create_rw_signal(String::new());
    let edited = create_rw_signal(String::new());
    let generating = create_rw_signal(false);
    let error = create_rw_signal(None::<String>);
    let detail = create_rw_signal(None::<Detail>);

    let selected_period = move || ReportPeriod::from_value(&period.get()).unwrap_or(ReportPeriod::Monthly);
    let range = create_memo(move |_| {
        resolve_range(selected_period(), &reference.get(), &custom_from.get(), &custom_to.get(), today())
    });
    // Switching to custom starts from the dates of the last preset
    create_effect(move |_| {
        if selected_period() != ReportPeriod::Custom {
            if let Some((from, to)) = range.get().bounds() {
                custom_from.set(format_iso(from));
                custom_to.set(format_iso(to));
            }
        }
    });
    let summary = create_memo(move |_| {
        let range = range.get();
        ctx.data.with(|d| report_summary(d, &range, today()))
    });
    create_effect(move |_| edited.set(report.get()));

    let range_caption = move || match range.get().bounds() {
        Some((from, to)) => format!("{} - {}", display_date(&format_iso(from)), display_date(&format_iso(to))),
        None => "Vui lòng chọn ngày".to_string(),
    };

    let generate = move |_| {
        error.set(None);
        report.set(String::new());
        let summary: ReportSummary = summary.get_untracked();
        if !summary.range.is_bounded() {
            error.set(Some(NO_RANGE.to_string()));
            return;
        }
        generating.set(true);
        log_info(Category::Report, "Tạo báo cáo bằng AI");
        spawn_local(async move {
            match gemini::generate_report(&summary, today()).await {
                Ok(html) => {
                    let _ = report.try_set(html);
                }
                Err(e) => {
                    log_error(Category::Report, &format!("[{}] {}", e.code(), e));
                    let _ = error.try_set(Some(e.to_string()));
                    let _ = report.try_set(FAILED_REPORT.to_string());
                }
            }
            let _ = generating.try_set(false);
        });
    };
    let download = move |ext: &'static str| {
        let filename = report_filename(selected_period(), &range.get_untracked(), ext);
        let body = edited.get_untracked();
        if ext == "txt" {
            download_file(&filename, "text/plain;charset=utf-8", &strip_html(&body));
        } else {
            download_file(&filename, "text/html;charset=utf-8", &wrap_document("Báo cáo", &body));
        }
    };
    let no_report = move || report.with(String::is_empty);
    let show = move |d: Detail| Callback::new(move |_| detail.set(Some(d.clone())));
    let stat = move |f: fn(&ReportSummary) -> String| Signal::derive(move || summary.with(f));

    view! {
        <div class="page reports">
            <h2>"Tạo Báo Cáo Tự Động"</h2>

            <section class="card no-print">
                <h3>"Cấu hình Báo cáo"</h3>
                <div class="form-grid three">
                    <SelectField label="Chọn Kỳ Báo Cáo" value=period
                        options=ReportPeriod::ALL.iter().map(|p| (p.value().to_string(), p.label().to_string())).collect() />
                    <Show
                        when=move || selected_period() == ReportPeriod::Custom
                        fallback=move || view! { <DateField label="Ngày Báo Cáo (để xác định kỳ)" value=reference /> }
                    >
                        <DateField label="Từ Ngày" value=custom_from />
                        <DateField label="Đến Ngày" value=custom_to />
                    </Show>
                </div>
                <div class="form-actions">
                    <button class="btn primary" on:click=generate disabled=move || generating.get()>
                        {move || if generating.get() { "Đang tạo báo cáo..." } else { "Tạo Báo Cáo" }}
                    </button>
                    <button class="btn secondary" disabled=no_report
                        on:click=move |_| print_document("Báo cáo", &edited.get_untracked())>"In Báo Cáo"</button>
                    <button class="btn secondary" disabled=no_report on:click=move |_| download("html")>"Tải HTML"</button>
                    <button class="btn secondary" disabled=no_report on:click=move |_| download("txt")>"Tải TXT"</button>
                </div>
                {move || error.get().map(|msg| view! {
                    <div class="alert error">
                        <p class="strong">"Lỗi tạo báo cáo:"</p>
                        <p>{msg}</p>
                    </div>
                })}
            </section>

            <section class="card no-print">
                <h3>"Tổng hợp dữ liệu trong kỳ (" {range_caption} ")"</h3>
                <div class="two-col">
                    <div>
                        <h4>"Vụ việc Tai nạn Giao thông"</h4>
                        <div class="stat-grid two">
                            <StatCard title="Tổng số vụ" tone="blue"
                                value=stat(|s| s.accidents.count.to_string()) on_click=show(Detail::Accidents(AccidentFilter::All)) />
                            <StatCard title="Vụ có Nồng độ cồn" tone="red"
                                value=stat(|s| s.accidents.alcohol.to_string()) on_click=show(Detail::Accidents(AccidentFilter::Alcohol)) />
                            <StatCard title="Người chết" tone="red"
                                value=stat(|s| s.accidents.deaths.to_string()) on_click=show(Detail::Accidents(AccidentFilter::Deaths)) />
                            <StatCard title="Người bị thương" tone="yellow"
                                value=stat(|s| s.accidents.injuries.to_string()) on_click=show(Detail::Accidents(AccidentFilter::Injuries)) />
                            <StatCard title="Thiệt hại Ước tính" tone="green"
                                value=stat(|s| format_vnd(s.accidents.damage_vnd)) on_click=show(Detail::Accidents(AccidentFilter::Damage)) />
                        </div>
                    </div>
                    <div>
                        <h4>"Kết quả Đăng ký xe"</h4>
                        {move || view! { <RegistrationTable rows=summary.with(|s| s.registration_stats.to_vec()) /> }}
                    </div>
                </div>

                <div class="two-col">
                    <div>
                        <h4>"Sự kiện (Đợt Công tác/Cao điểm)"</h4>
                        <div class="stat-grid two">
                            <StatCard title="Tổng số sự kiện" tone="indigo"
                                value=stat(|s| s.event_count.to_string()) on_click=show(Detail::Events) />
                            <StatCard title="Tiến độ đạt được" tone="teal" value=stat(|s| s.goal_achievement.clone()) />
                        </div>
                    </div>
                    <div>
                        <h4>"Công tác Thường xuyên & Giai đoạn"</h4>
                        <div class="stat-grid two">
                            <StatCard title="Tổng số công tác" tone="purple"
                                value=stat(|s| s.task_count.to_string()) on_click=show(Detail::Tasks) />
                        </div>
                        {move || count_table("Loại công tác", summary.with(|s| s.task_categories.clone()))}
                    </div>
                </div>

                <div class="two-col">
                    <div>
                        <h4>"Phối hợp Xác minh"</h4>
                        <div class="stat-grid two">
                            <StatCard title="Tổng số yêu cầu" tone="pink"
                                value=stat(|s| s.verification_count.to_string()) on_click=show(Detail::Verification(None)) />
                            {[VerificationStatus::Verified, VerificationStatus::InProgress, VerificationStatus::NotStarted]
                                .into_iter()
                                .enumerate()
                                .map(|(i, status)| {
                                    let tone = ["green", "yellow", "red"][i];
                                    let value = Signal::derive(move || summary.with(|s| s.verification_statuses[i].1.to_string()));
                                    view! {
                                        <StatCard title=status.label().to_string() tone=tone value=value
                                            on_click=show(Detail::Verification(Some(status.clone()))) />
                                    }
                                })
                                .collect_view()}
                        </div>
                    </div>
                    <div>
                        <h4>"Công tác Tham mưu"</h4>
                        <div class="stat-grid two">
                            <StatCard title="Tổng số công văn/KH" tone="orange"
                                value=stat(|s| s.advisory_count.to_string()) on_click=show(Detail::Advisory) />
                        </div>
                        {move || count_table("Loại công văn", summary.with(|s| s.advisory_types.clone()))}
                    </div>
                </div>
            </section>

            <section class="card report-container">
                <h3>"Xem trước & Chỉnh sửa Báo cáo"</h3>
                {move || {
                    let html = report.get();
                    view! {
                        <div class="doc-preview" contenteditable="true" inner_html=html
                            on:input=move |ev| edited.set(event_target::<web_sys::HtmlElement>(&ev).inner_html())></div>
                    }
                }}
            </section>

            {move || detail.get().map(|d| {
                let table = ctx.data.with(|data| detail_table(&d, data, &range.get_untracked()));
                view! {
                    <Modal title=detail_title(&d) wide=true on_close=Callback::new(move |_| detail.set(None))>
                        <div class="scroll-box">{table}</div>
                    </Modal>
                }
            })}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::period::parse_date;

    #[test]
    fn test_report_filename() {
        let range = DateRange::new(parse_date("2024-04-16").unwrap(), parse_date("2024-05-15").unwrap());
        assert_eq!(
            report_filename(ReportPeriod::Monthly, &range, "txt"),
            "BaoCao_monthly_16/04/2024-15/05/2024.txt"
        );
    }

    #[test]
    fn test_accident_filters() {
        let a = TrafficAccident { deaths: 1, injuries: 0, alcohol_level: AlcoholLevel::Yes, ..Default::default() };
        assert!(AccidentFilter::Alcohol.admits(&a));
        assert!(AccidentFilter::Deaths.admits(&a));
        assert!(!AccidentFilter::Injuries.admits(&a));
        assert!(AccidentFilter::Damage.admits(&a));
        assert_eq!(AccidentFilter::All.title(), "Danh sách Vụ việc TNGT");
    }

    #[test]
    fn test_verification_detail_title_names_status() {
        assert_eq!(
            detail_title(&Detail::Verification(Some(VerificationStatus::Verified))),
            "Danh sách Yêu cầu Xác minh (Đã xác minh)"
        );
    }
}
