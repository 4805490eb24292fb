pub mod controller;
pub mod state;

pub use controller::{PauseController, PauseSnapshot, ResumeSignal};
pub use state::{PauseMode, PauseState, PauseStatus};
