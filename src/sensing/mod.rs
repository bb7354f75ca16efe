pub mod controller;
pub mod fusion;
pub mod loop_worker;
pub mod scheduler;
pub mod simulated;

pub use controller::SensingController;
pub use fusion::{fuse, AttentionStatus, DistractionReason, FusionResult};
pub use loop_worker::DetectionSchedule;
pub use scheduler::FrameScheduler;
