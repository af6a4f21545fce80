//! Application state shared through Leptos context
//!
//! Record changes are routed to one backend: when Firestore is connected it
//! is the source of truth and the local lists only change through its
//! listeners; otherwise lists change locally and the change is mirrored to
//! the Apps Script sheets.

use leptos::*;
use wasm_bindgen_futures::spawn_local;

use crate::crud::{self, Record};
use crate::error::AppError;
use crate::models::*;
use crate::utils::log_trace::{log_error, log_info, Category};
use crate::utils::{cache, firebase, gas, now_hhmm};

const STATUS_HIDE_MS: u32 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Success,
    Error,
}

#[derive(Clone, Copy)]
pub struct AppContext {
    pub data: RwSignal<AppData>,
    pub sync_status: RwSignal<SyncStatus>,
    pub sync_message: RwSignal<String>,
    pub using_firebase: RwSignal<bool>,
}

impl AppContext {
    pub fn new(initial: AppData) -> Self {
        AppContext {
            data: create_rw_signal(initial),
            sync_status: create_rw_signal(SyncStatus::Idle),
            sync_message: create_rw_signal(String::new()),
            using_firebase: create_rw_signal(false),
        }
    }

    fn set_status(&self, status: SyncStatus, message: impl Into<String>) {
        self.sync_status.set(status);
        self.sync_message.set(message.into());
    }

    /// Shows a success message that clears itself
    fn flash_success(&self, message: impl Into<String>) {
        self.set_status(SyncStatus::Success, message);
        let status = self.sync_status;
        spawn_local(async move {
            gloo::timers::future::TimeoutFuture::new(STATUS_HIDE_MS).await;
            if status.get_untracked() == SyncStatus::Success {
                status.set(SyncStatus::Idle);
            }
        });
    }

    // ============================================
    // Record changes
    // ============================================

    pub fn create<T: Record>(&self, item: T) {
        let list = self.data.with_untracked(|d| crud::create(T::list(d), item));
        let Some(created) = list.last().cloned() else {
            return;
        };
        log_info(Category::UiAction, &format!("Thêm bản ghi vào {}", T::COLLECTION));

        if self.using_firebase.get_untracked() {
            let config = firebase::load_config();
            spawn_local(async move { firebase::add_item(&config, &created).await });
        } else {
            self.data.update(|d| *T::list_mut(d) = list);
            spawn_local(async move { gas::append_row(&created).await });
        }
    }

    pub fn update<T: Record>(&self, item: T) {
        log_info(Category::UiAction, &format!("Cập nhật bản ghi {} trong {}", item.id(), T::COLLECTION));
        if self.using_firebase.get_untracked() {
            let config = firebase::load_config();
            spawn_local(async move { firebase::update_item(&config, &item).await });
        } else {
            let list = self.data.with_untracked(|d| crud::update(T::list(d), item));
            self.data.update(|d| *T::list_mut(d) = list.clone());
            spawn_local(async move { gas::update_sheet(&list).await });
        }
    }

    pub fn delete<T: Record>(&self, id: String) {
        log_info(Category::UiAction, &format!("Xoá bản ghi {} khỏi {}", id, T::COLLECTION));
        if self.using_firebase.get_untracked() {
            let config = firebase::load_config();
            spawn_local(async move { firebase::delete_item::<T>(&config, &id).await });
        } else {
            let list = self.data.with_untracked(|d| crud::delete(T::list(d), &id));
            self.data.update(|d| *T::list_mut(d) = list.clone());
            spawn_local(async move { gas::update_sheet(&list).await });
        }
    }

    fn event_by_id(events: &[Event], id: &str) -> Option<Event> {
        events.iter().find(|e| e.id == id).cloned()
    }

    pub fn add_event_target(&self, event_id: &str, target: EventTarget) {
        let events = self.data.with_untracked(|d| crud::add_event_target(&d.events, event_id, target));
        if let Some(event) = Self::event_by_id(&events, event_id) {
            self.update(event);
        }
    }

    pub fn record_target_result(&self, event_id: &str, target_id: &str, date: &str, value: f64) {
        let events = self
            .data
            .with_untracked(|d| crud::upsert_target_result(&d.events, event_id, target_id, date, value));
        if let Some(event) = Self::event_by_id(&events, event_id) {
            self.update(event);
        }
    }

    /// Templates are device settings and never leave local storage except in a full push
    pub fn set_templates(&self, templates: Vec<DocumentTemplate>) {
        self.data.update(|d| d.response_document_templates = templates);
    }

    pub fn select_template(&self, id: String) {
        self.data.update(|d| d.selected_document_template_id = id);
    }

    // ============================================
    // Sync
    // ============================================

    /// Whether the startup prompt should offer a cloud sync
    pub fn has_remote() -> bool {
        let fb = firebase::load_config();
        (fb.enabled && !fb.api_key.is_empty()) || !gas::script_url().is_empty()
    }

    fn listen<T: Record>(&self, config: &FirebaseConfig) {
        let data = self.data;
        firebase::subscribe::<T>(config.clone(), move |list| {
            data.update(|d| *T::list_mut(d) = list);
        });
    }

    fn attach_listeners(&self, config: FirebaseConfig) {
        self.listen::<TrafficAccident>(&config);
        self.listen::<VehicleRegistration>(&config);
        self.listen::<Event>(&config);
        self.listen::<DailyTask>(&config);
        self.listen::<VerificationRequest>(&config);
        self.listen::<AdvisoryDocument>(&config);
    }

    /// Firestore first when configured, Apps Script otherwise or on failure
    pub fn background_sync(&self) {
        let ctx = *self;
        ctx.set_status(SyncStatus::Syncing, "Đang kết nối và đồng bộ dữ liệu...");
        spawn_local(async move {
            let fb = firebase::load_config();
            if fb.enabled && !fb.api_key.is_empty() {
                ctx.set_status(SyncStatus::Syncing, "Đang đồng bộ trực tiếp từ Firebase...");
                match firebase::connect(&fb).await {
                    Ok(()) => {
                        ctx.using_firebase.set(true);
                        ctx.attach_listeners(fb);
                        ctx.flash_success("Đã kết nối Firebase thành công!");
                        return;
                    }
                    Err(e) => {
                        log_error(Category::Firebase, &format!("[{}] {}", e.code(), e));
                        ctx.set_status(SyncStatus::Syncing, "Kết nối Firebase thất bại. Thử Google Sheets...");
                    }
                }
            }

            let url = gas::script_url();
            if url.is_empty() {
                ctx.set_status(SyncStatus::Idle, "");
                return;
            }
            ctx.set_status(SyncStatus::Syncing, "Đang tải dữ liệu từ Google Sheets...");
            match gas::import_from_sheets(&url).await {
                Ok(cloud) => {
                    ctx.data.update(|d| d.merge_cloud(cloud));
                    ctx.flash_success("Đồng bộ Google Sheets hoàn tất!");
                }
                Err(e) => ctx.set_status(SyncStatus::Error, format!("Lỗi đồng bộ: {}", e)),
            }
        });
    }

    /// Manual pull from the sheets; the result is saved right away
    pub async fn pull_from_sheets(&self) -> Result<String, String> {
        let result: Result<(), AppError> = async {
            let cloud = gas::import_from_sheets(&gas::script_url()).await?;
            self.data.update(|d| d.merge_cloud(cloud));
            self.data.with_untracked(cache::save_app_data);
            Ok(())
        }
        .await;
        match result {
            Ok(()) => Ok("✅ Đã tải dữ liệu thành công!".to_string()),
            Err(e) => Err(format!("❌ Lỗi tải dữ liệu: {}", e)),
        }
    }

    pub async fn push_to_sheets(&self) -> Result<String, String> {
        let data = self.data.get_untracked();
        match gas::full_sync(&data).await {
            Ok(()) => Ok(format!("✅ Đồng bộ thành công lúc {}", now_hhmm())),
            Err(e) => Err(format!("❌ Đồng bộ thất bại: {}", e)),
        }
    }

    pub async fn push_to_firebase(&self, config: &FirebaseConfig) -> Result<String, String> {
        let data = self.data.get_untracked();
        match firebase::push_all(config, &data).await {
            Ok(()) => Ok("✅ Đã đẩy toàn bộ dữ liệu lên Firebase!".to_string()),
            Err(e) => Err(format!("❌ Đẩy dữ liệu thất bại: {}", e)),
        }
    }
}
