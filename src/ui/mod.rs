pub mod layout;
pub mod renderer;
pub mod terminal;

pub use layout::{render_layout, DashboardSnapshot};
pub use terminal::run_ui;
