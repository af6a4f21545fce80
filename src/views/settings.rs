//! Sync backends, AI key and diagnostics

use leptos::*;
use wasm_bindgen_futures::{spawn_local, JsFuture};

use crate::components::*;
use crate::context::AppContext;
use crate::models::{FirebaseConfig, GoogleSheetsConfig};
use crate::utils::log_trace::{clear_logs, copy_logs_to_clipboard, download_logs, log_info, Category};
use crate::utils::{firebase, gas, gemini};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Sheets,
    Firebase,
    Ai,
    Logs,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Sheets, Tab::Firebase, Tab::Ai, Tab::Logs];

    fn label(&self) -> &'static str {
        match self {
            Tab::Sheets => "Google Sheets (Cơ bản)",
            Tab::Firebase => "Firebase (Nâng cao - Realtime)",
            Tab::Ai => "Gemini AI",
            Tab::Logs => "Nhật ký hệ thống",
        }
    }
}

fn alert(message: &str) {
    if let Some(w) = web_sys::window() {
        let _ = w.alert_with_message(message);
    }
}

fn reload() {
    if let Some(w) = web_sys::window() {
        let _ = w.location().reload();
    }
}

/// Result line under the sync buttons
#[derive(Clone, Default)]
struct Status {
    message: String,
    error: bool,
}

#[component]
pub fn SettingsView() -> impl IntoView {
    let firebase_enabled = firebase::load_config().enabled;
    let tab = create_rw_signal(if firebase_enabled { Tab::Firebase } else { Tab::Sheets });

    view! {
        <div class="page settings">
            <h2>"Cấu hình Đồng bộ Dữ liệu"</h2>
            <div class="tabs">
                {Tab::ALL.iter().copied().map(|t| view! {
                    <button
                        class=move || if tab.get() == t { "tab active" } else { "tab" }
                        on:click=move |_| tab.set(t)
                    >{t.label()}</button>
                }).collect_view()}
            </div>
            {move || match tab.get() {
                Tab::Sheets => view! { <SheetsSettings /> }.into_view(),
                Tab::Firebase => view! { <FirebaseSettings /> }.into_view(),
                Tab::Ai => view! { <AiSettings /> }.into_view(),
                Tab::Logs => view! { <LogSettings /> }.into_view(),
            }}
        </div>
    }
}

#[component]
fn StatusLine(status: RwSignal<Status>) -> impl IntoView {
    move || {
        status.with(|s| {
            (!s.message.is_empty()).then(|| {
                let class = if s.error { "alert error" } else { "alert success" };
                view! { <div class=class>{s.message.clone()}</div> }
            })
        })
    }
}

#[component]
fn SheetsSettings() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let saved = gas::load_config();
    let url = create_rw_signal(gas::script_url());
    let auto_sync = create_rw_signal(saved.map(|c| c.auto_sync).unwrap_or(true));
    let busy = create_rw_signal(false);
    let status = create_rw_signal(Status::default());
    let share_url = create_rw_signal(None::<String>);

    let save = move |_| {
        let config = GoogleSheetsConfig { script_url: url.get_untracked(), auto_sync: auto_sync.get_untracked() };
        match gas::save_config(&config) {
            Ok(()) => {
                alert("Đã lưu cấu hình Google Sheets! Chế độ Firebase đã tắt.");
                reload();
            }
            Err(e) => alert(&e.to_string()),
        }
    };

    let push = move |_| {
        if url.get_untracked().trim().is_empty() {
            alert("Lỗi: Chưa nhập đường dẫn Google Script URL.");
            return;
        }
        busy.set(true);
        status.set(Status { message: "⏳ Đang đẩy dữ liệu lên Google Sheets...".to_string(), error: false });
        spawn_local(async move {
            let result = ctx.push_to_sheets().await;
            let ok = result.is_ok();
            let _ = status.try_set(match result {
                Ok(message) => Status { message, error: false },
                Err(message) => Status { message, error: true },
            });
            let _ = busy.try_set(false);
            if ok {
                alert("Đồng bộ lên Cloud thành công!");
            }
        });
    };

    let pull = move |_| {
        busy.set(true);
        status.set(Status { message: "⏳ Đang tải dữ liệu về...".to_string(), error: false });
        spawn_local(async move {
            let result = ctx.pull_from_sheets().await;
            let ok = result.is_ok();
            let _ = status.try_set(match result {
                Ok(message) => Status { message, error: false },
                Err(message) => Status { message, error: true },
            });
            let _ = busy.try_set(false);
            if ok {
                alert("Đã khôi phục dữ liệu từ Google Sheets thành công.");
            }
        });
    };

    let share = move |_| {
        let Some(link) = gas::generate_gas_share_url() else {
            return;
        };
        share_url.set(Some(link.clone()));
        spawn_local(async move {
            let Some(window) = web_sys::window() else {
                return;
            };
            let promise = window.navigator().clipboard().write_text(&link);
            if JsFuture::from(promise).await.is_ok() {
                log_info(Category::UiAction, "Đã sao chép liên kết chia sẻ");
            }
        });
    };

    view! {
        <div class="settings-panel">
            <div class="info-box blue">
                <p>"Google Sheets là giải pháp miễn phí, dễ cài đặt nhưng tốc độ chậm hơn."</p>
            </div>
            <TextField label="Google Apps Script Web App URL:" value=url
                placeholder="https://script.google.com/macros/s/.../exec" />
            <div class="row between">
                <label class="checkbox">
                    <input type="checkbox" prop:checked=move || auto_sync.get()
                        on:change=move |ev| auto_sync.set(event_target_checked(&ev)) />
                    "Tự động sao lưu"
                </label>
                <button class="btn small primary" on:click=save>"Lưu & Sử dụng Sheets"</button>
            </div>
            <hr />
            <div class="button-grid">
                <button class="btn outline" on:click=push disabled=move || busy.get()>"Sao lưu lên Sheets (Push)"</button>
                <button class="btn danger" on:click=pull disabled=move || busy.get()>"Khôi phục từ Sheets (Pull)"</button>
            </div>
            <StatusLine status=status />
            <hr />
            <div class="row between">
                <span class="muted">{gas::format_gas_modified_time()}</span>
                <button class="btn small secondary" on:click=share>"Sao chép liên kết chia sẻ"</button>
            </div>
            {move || share_url.get().map(|link| view! {
                <input class="share-link" type="text" readonly=true prop:value=link />
            })}
        </div>
    }
}

#[component]
fn FirebaseSettings() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");
    let saved = firebase::load_config();
    let api_key = create_rw_signal(saved.api_key.clone());
    let project_id = create_rw_signal(saved.project_id.clone());
    let auth_domain = create_rw_signal(saved.auth_domain.clone());
    let storage_bucket = create_rw_signal(saved.storage_bucket.clone());
    let sender_id = create_rw_signal(saved.messaging_sender_id.clone());
    let app_id = create_rw_signal(saved.app_id.clone());
    let measurement_id = create_rw_signal(saved.measurement_id.clone().unwrap_or_default());
    let busy = create_rw_signal(false);
    let status = create_rw_signal(Status::default());

    let config = move || {
        let measurement = measurement_id.get_untracked();
        FirebaseConfig {
            api_key: api_key.get_untracked().trim().to_string(),
            auth_domain: auth_domain.get_untracked(),
            project_id: project_id.get_untracked().trim().to_string(),
            storage_bucket: storage_bucket.get_untracked(),
            messaging_sender_id: sender_id.get_untracked(),
            app_id: app_id.get_untracked(),
            measurement_id: (!measurement.is_empty()).then_some(measurement),
            enabled: true,
        }
    };

    let save = move |_| match firebase::save_config(&config()) {
        Ok(()) => {
            alert("Đã lưu cấu hình Firebase! Ứng dụng sẽ tải lại để kết nối.");
            reload();
        }
        Err(e) => alert(&e.to_string()),
    };

    let push = move |_| {
        let config = config();
        if !config.is_usable() {
            status.set(Status { message: "❌ Cần nhập API Key và Project ID.".to_string(), error: true });
            return;
        }
        busy.set(true);
        status.set(Status { message: "⏳ Đang đẩy dữ liệu lên Firebase...".to_string(), error: false });
        spawn_local(async move {
            let result = ctx.push_to_firebase(&config).await;
            let _ = status.try_set(match result {
                Ok(message) => Status { message, error: false },
                Err(message) => Status { message, error: true },
            });
            let _ = busy.try_set(false);
        });
    };

    view! {
        <div class="settings-panel">
            <div class="info-box green">
                <p>"Firebase mang lại tốc độ cực nhanh và đồng bộ tức thời giữa các thiết bị."</p>
                <p class="strong">"Cách lấy cấu hình:"</p>
                <ul>
                    <li>"Truy cập " <a href="https://console.firebase.google.com/" target="_blank">"Firebase Console"</a> "."</li>
                    <li>"Tạo Project mới -> Thêm Web App."</li>
                    <li>"Copy config (apiKey, projectId...) vào bên dưới."</li>
                    <li>"Vào mục Firestore Database -> Create Database (chọn Test Mode để bắt đầu)."</li>
                </ul>
            </div>
            <div class="form-grid">
                <TextField label="API Key" value=api_key />
                <TextField label="Project ID" value=project_id />
                <TextField label="Auth Domain" value=auth_domain />
                <TextField label="Storage Bucket" value=storage_bucket />
                <TextField label="Messaging Sender ID" value=sender_id />
                <TextField label="App ID" value=app_id />
                <TextField label="Measurement ID" value=measurement_id />
            </div>
            <div class="row end">
                <button class="btn outline" on:click=push disabled=move || busy.get()>"Đẩy toàn bộ dữ liệu lên Firebase"</button>
                <button class="btn primary" on:click=save>"Lưu & Kích hoạt Firebase"</button>
            </div>
            <StatusLine status=status />
        </div>
    }
}

#[component]
fn AiSettings() -> impl IntoView {
    let key = create_rw_signal(gemini::api_key().unwrap_or_default());
    let saved = create_rw_signal(false);

    view! {
        <div class="settings-panel">
            <div class="info-box blue">
                <p>"Khoá Gemini API dùng cho tạo báo cáo và trích xuất thông tin từ ảnh công văn."</p>
            </div>
            <TextField label="Gemini API Key" value=key />
            <div class="row end">
                <button class="btn primary" on:click=move |_| {
                    gemini::save_api_key(&key.get_untracked());
                    saved.set(true);
                }>"Lưu khoá"</button>
            </div>
            <Show when=move || saved.get()>
                <div class="alert success">"✅ Đã lưu khoá API."</div>
            </Show>
        </div>
    }
}

#[component]
fn LogSettings() -> impl IntoView {
    let status = create_rw_signal(Status::default());

    let copy = move |_| {
        spawn_local(async move {
            let _ = status.try_set(match copy_logs_to_clipboard().await {
                Ok(()) => Status { message: "✅ Đã sao chép nhật ký.".to_string(), error: false },
                Err(e) => Status { message: format!("❌ Không thể sao chép: {}", e), error: true },
            });
        });
    };

    view! {
        <div class="settings-panel">
            <p class="muted">"Nhật ký hoạt động của ứng dụng, dùng khi cần báo lỗi."</p>
            <div class="button-grid">
                <button class="btn secondary" on:click=move |_| download_logs()>"Tải nhật ký"</button>
                <button class="btn secondary" on:click=copy>"Sao chép nhật ký"</button>
                <button class="btn danger" on:click=move |_| {
                    clear_logs();
                    status.set(Status { message: "Đã xoá nhật ký.".to_string(), error: false });
                }>"Xoá nhật ký"</button>
            </div>
            <StatusLine status=status />
        </div>
    }
}
