pub mod dashboard;
pub mod fetch_progress;

pub use dashboard::{run_dashboard, DashboardAction, DashboardState, Focus};
pub use fetch_progress::run_fetch_progress;
