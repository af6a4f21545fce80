//! Navigation sidebar

use leptos::*;

use crate::Page;

#[component]
pub fn Sidebar(current: RwSignal<Page>) -> impl IntoView {
    let (collapsed, set_collapsed) = create_signal(false);

    view! {
        <aside class=move || if collapsed.get() { "sidebar collapsed" } else { "sidebar" }>
            <div class="sidebar-header">
                <span class="logo">"🛡"</span>
                <Show when=move || !collapsed.get()>
                    <span class="app-name">"Police App"</span>
                </Show>
                <button class="collapse-btn" on:click=move |_| set_collapsed.update(|c| *c = !*c)>
                    {move || if collapsed.get() { "»" } else { "«" }}
                </button>
            </div>
            <nav class="sidebar-nav">
                {Page::ALL.iter().copied().map(|page| view! {
                    <button
                        class=move || if current.get() == page { "nav-item active" } else { "nav-item" }
                        title=page.title()
                        on:click=move |_| current.set(page)
                    >
                        <span class="nav-icon">{page.icon()}</span>
                        <Show when=move || !collapsed.get()>
                            <span class="nav-label">{page.title()}</span>
                        </Show>
                    </button>
                }).collect_view()}
            </nav>
        </aside>
    }
}
