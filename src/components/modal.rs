//! Modal dialog

use leptos::*;

/// Dialog with a title bar, scrollable body and footer.
/// Clicking the backdrop or × calls `on_close`; without a `footer` a close
/// button is shown.
#[component]
pub fn Modal(
    #[prop(into)] title: String,
    on_close: Callback<()>,
    #[prop(optional)] wide: bool,
    #[prop(optional)] footer: Option<View>,
    children: Children,
) -> impl IntoView {
    let footer = footer.unwrap_or_else(|| {
        view! {
            <button class="btn secondary" on:click=move |_| on_close.call(())>"Đóng"</button>
        }
        .into_view()
    });

    view! {
        <div class="modal-root" role="dialog" aria-modal="true">
            <div class="modal-backdrop" on:click=move |_| on_close.call(())></div>
            <div class=if wide { "modal wide" } else { "modal" }>
                <div class="modal-header">
                    <h3>{title}</h3>
                    <button class="close-btn" on:click=move |_| on_close.call(())>"×"</button>
                </div>
                <div class="modal-body">{children()}</div>
                <div class="modal-footer">{footer}</div>
            </div>
        </div>
    }
}
