use leptos::*;

/// Delete button that asks for confirmation first
#[component]
pub fn DeleteButton(
    #[prop(into)] prompt: String,
    on_confirm: Callback<()>,
) -> impl IntoView {
    let on_click = move |_| {
        let confirmed = web_sys::window()
            .and_then(|w| w.confirm_with_message(&prompt).ok())
            .unwrap_or(false);
        if confirmed {
            on_confirm.call(());
        }
    };
    view! { <button class="btn danger small" on:click=on_click>"Xóa"</button> }
}
