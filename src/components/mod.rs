//! Shared UI building blocks

pub mod delete_button;
pub mod fields;
pub mod modal;
pub mod sidebar;
pub mod stat_card;
pub mod status_bar;

pub use delete_button::DeleteButton;
pub use fields::{label_options, DateField, NumberField, SelectField, TextArea, TextField, TimeField};
pub use modal::Modal;
pub use sidebar::Sidebar;
pub use stat_card::StatCard;
pub use status_bar::StatusBar;
