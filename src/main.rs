use leptos::*;

mod components;
mod context;
mod crud;
mod error;
mod models;
mod summary;
mod utils;
mod views;

use components::{Modal, Sidebar, StatusBar};
use context::AppContext;
use models::AppData;
use utils::log_trace::{log_info, Category};
use utils::{cache, gas};
use views::*;

// ============================================
// Pages
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Accidents,
    Registrations,
    Events,
    DailyTasks,
    Verification,
    Reports,
    Advisory,
    Settings,
}

impl Page {
    pub const ALL: [Page; 9] = [
        Page::Dashboard,
        Page::Accidents,
        Page::Registrations,
        Page::Events,
        Page::DailyTasks,
        Page::Verification,
        Page::Reports,
        Page::Advisory,
        Page::Settings,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Page::Dashboard => "Tổng Quan",
            Page::Accidents => "QL Vụ Việc TNGT",
            Page::Registrations => "Theo Dõi Đăng Ký Xe",
            Page::Events => "Tạo & Theo Dõi Sự Kiện",
            Page::DailyTasks => "Theo Dõi Công Tác",
            Page::Verification => "QL Phối Hợp Xác Minh",
            Page::Reports => "Tạo Báo Cáo",
            Page::Advisory => "QL Công Tác Tham Mưu",
            Page::Settings => "Cài Đặt Đồng Bộ",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Page::Dashboard => "🏠",
            Page::Accidents => "🚗",
            Page::Registrations => "📋",
            Page::Events => "📅",
            Page::DailyTasks => "✅",
            Page::Verification => "🔍",
            Page::Reports => "📄",
            Page::Advisory => "🗂",
            Page::Settings => "⚙",
        }
    }
}

// ============================================
// App
// ============================================

#[component]
fn App() -> impl IntoView {
    if let Some(url) = gas::init_gas_from_url_params() {
        log_info(Category::GasSync, &format!("Đã nhận cấu hình Apps Script từ liên kết: {}", url));
    }

    let (initial, readable) = match cache::load_app_data() {
        Ok(data) => (data.unwrap_or_default(), true),
        Err(_) => (AppData::default(), false),
    };
    let ctx = AppContext::new(initial);
    provide_context(ctx);

    // Debounced write-through to localStorage. After an unreadable load the
    // first run is skipped so the empty state does not replace the stored blob.
    create_effect(move |prev: Option<()>| {
        let data = ctx.data.get();
        if readable || prev.is_some() {
            cache::schedule_save(data);
        }
    });

    let current = create_rw_signal(Page::Dashboard);
    let ask_sync = create_rw_signal(AppContext::has_remote());

    let decline = Callback::new(move |_| {
        log_info(Category::UiAction, "Bỏ qua đồng bộ khi khởi động");
        ask_sync.set(false);
    });
    let accept = move |_| {
        ask_sync.set(false);
        ctx.background_sync();
    };

    view! {
        <div class="app">
            <Sidebar current=current />
            <main class="container">
                <header class="app-header">
                    <h1>{move || current.get().title()}</h1>
                </header>
                {move || match current.get() {
                    Page::Dashboard => view! { <DashboardView /> }.into_view(),
                    Page::Accidents => view! { <AccidentsView /> }.into_view(),
                    Page::Registrations => view! { <RegistrationsView /> }.into_view(),
                    Page::Events => view! { <EventsView /> }.into_view(),
                    Page::DailyTasks => view! { <DailyTasksView /> }.into_view(),
                    Page::Verification => view! { <VerificationView /> }.into_view(),
                    Page::Reports => view! { <ReportsView /> }.into_view(),
                    Page::Advisory => view! { <AdvisoryView /> }.into_view(),
                    Page::Settings => view! { <SettingsView /> }.into_view(),
                }}
            </main>
            <StatusBar />

            <Show when=move || ask_sync.get()>
                <Modal
                    title="Đồng bộ dữ liệu"
                    on_close=decline
                    footer=view! {
                        <button class="btn secondary" on:click=move |_| decline.call(())>"Không, dùng dữ liệu cũ"</button>
                        <button class="btn primary" on:click=accept>"Có, đồng bộ ngay"</button>
                    }.into_view()
                >
                    <p>"Bạn có muốn đồng bộ dữ liệu mới nhất từ Cloud (Google Sheets/Firebase) không?"</p>
                </Modal>
            </Show>
        </div>
    }
}

fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(App);
}
