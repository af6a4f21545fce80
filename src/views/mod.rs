//! One view per sidebar page

pub mod accidents;
pub mod advisory;
pub mod daily_tasks;
pub mod dashboard;
pub mod events;
pub mod registrations;
pub mod reports;
pub mod settings;
pub mod verification;

pub use accidents::AccidentsView;
pub use advisory::AdvisoryView;
pub use daily_tasks::DailyTasksView;
pub use dashboard::DashboardView;
pub use events::EventsView;
pub use registrations::RegistrationsView;
pub use reports::ReportsView;
pub use settings::SettingsView;
pub use verification::VerificationView;
