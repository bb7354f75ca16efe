pub mod clock;
pub mod controller;
pub mod debouncer;
pub mod scoring;
pub mod state;

pub use controller::SessionController;
pub use state::{SessionSnapshot, SessionState, SessionSummary};
