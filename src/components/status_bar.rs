use leptos::*;

use crate::context::{AppContext, SyncStatus};

/// Thin banner above the page while a background sync runs or just finished
#[component]
pub fn StatusBar() -> impl IntoView {
    let ctx = use_context::<AppContext>().expect("AppContext not found");

    view! {
        {move || {
            let (class, icon) = match ctx.sync_status.get() {
                SyncStatus::Idle => return view! { <></> }.into_view(),
                SyncStatus::Syncing => ("status-bar syncing", "⟳"),
                SyncStatus::Success => ("status-bar success", "✓"),
                SyncStatus::Error => ("status-bar error", "✗"),
            };
            view! {
                <div class=class>
                    <span class="status-icon">{icon}</span>
                    {move || ctx.sync_message.get()}
                </div>
            }.into_view()
        }}
    }
}
