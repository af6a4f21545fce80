use leptos::*;

/// Headline figure; clickable when `on_click` is given
#[component]
pub fn StatCard(
    #[prop(into)] title: String,
    #[prop(into)] value: Signal<String>,
    #[prop(optional, into)] tone: Option<&'static str>,
    #[prop(optional)] on_click: Option<Callback<()>>,
) -> impl IntoView {
    let class = format!(
        "stat-card {}{}",
        tone.unwrap_or("blue"),
        if on_click.is_some() { " clickable" } else { "" }
    );
    view! {
        <div class=class on:click=move |_| {
            if let Some(cb) = on_click {
                cb.call(());
            }
        }>
            <span class="stat-title">{title}</span>
            <span class="stat-value">{move || value.get()}</span>
        </div>
    }
}
