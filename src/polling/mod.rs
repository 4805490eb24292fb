pub mod controller;
pub mod loop_worker;

pub use controller::PollingController;
pub use loop_worker::{polling_loop, CheckKind, Poller, TickOutcome};
