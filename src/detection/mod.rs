pub mod cycle;
pub mod diff;
pub mod filter;

pub use cycle::{CycleReport, DetectCycle, NOTIFY_STAGGER};
pub use diff::{dedupe_by_id, diff, LeadDiff};
pub use filter::CategoryFilter;
