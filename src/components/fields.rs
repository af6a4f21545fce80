//! Labelled form inputs bound to signals

use leptos::*;

#[component]
pub fn TextField(
    #[prop(into)] label: String,
    value: RwSignal<String>,
    #[prop(optional)] required: bool,
    #[prop(optional, into)] placeholder: Option<String>,
) -> impl IntoView {
    view! {
        <label class="field">
            <span class="field-label">{label}{required.then_some(" *")}</span>
            <input type="text"
                placeholder=placeholder.unwrap_or_default()
                prop:value=move || value.get()
                on:input=move |ev| value.set(event_target_value(&ev)) />
        </label>
    }
}

#[component]
pub fn DateField(
    #[prop(into)] label: String,
    value: RwSignal<String>,
    #[prop(optional)] required: bool,
) -> impl IntoView {
    view! {
        <label class="field">
            <span class="field-label">{label}{required.then_some(" *")}</span>
            <input type="date"
                prop:value=move || value.get()
                on:input=move |ev| value.set(event_target_value(&ev)) />
        </label>
    }
}

#[component]
pub fn TimeField(#[prop(into)] label: String, value: RwSignal<String>) -> impl IntoView {
    view! {
        <label class="field">
            <span class="field-label">{label}</span>
            <input type="time"
                prop:value=move || value.get()
                on:input=move |ev| value.set(event_target_value(&ev)) />
        </label>
    }
}

/// Numeric input; text that does not parse reads as zero
#[component]
pub fn NumberField(
    #[prop(into)] label: String,
    value: RwSignal<f64>,
    #[prop(optional, into)] step: Option<String>,
) -> impl IntoView {
    view! {
        <label class="field">
            <span class="field-label">{label}</span>
            <input type="number" min="0" step=step.unwrap_or_else(|| "1".to_string())
                prop:value=move || value.get().to_string()
                on:input=move |ev| value.set(event_target_value(&ev).parse().unwrap_or(0.0)) />
        </label>
    }
}

#[component]
pub fn TextArea(
    #[prop(into)] label: String,
    value: RwSignal<String>,
    #[prop(optional)] rows: Option<u32>,
) -> impl IntoView {
    view! {
        <label class="field full">
            <span class="field-label">{label}</span>
            <textarea rows=rows.unwrap_or(3)
                prop:value=move || value.get()
                on:input=move |ev| value.set(event_target_value(&ev))></textarea>
        </label>
    }
}

/// Drop-down over `(value, label)` pairs
#[component]
pub fn SelectField(
    #[prop(into)] label: String,
    value: RwSignal<String>,
    options: Vec<(String, String)>,
) -> impl IntoView {
    view! {
        <label class="field">
            <span class="field-label">{label}</span>
            <select on:change=move |ev| value.set(event_target_value(&ev))>
                {options.into_iter().map(|(v, text)| {
                    let selected_value = v.clone();
                    view! {
                        <option value=v selected=move || value.get() == selected_value>{text}</option>
                    }
                }).collect_view()}
            </select>
        </label>
    }
}

/// Options from a list of labels, value and text being the same
pub fn label_options<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<(String, String)> {
    labels.into_iter().map(|l| (l.to_string(), l.to_string())).collect()
}
