pub mod first_seen;
pub mod sound_gate;

pub use first_seen::{FirstSeenLedger, FirstSeenMap};
pub use sound_gate::SoundGate;
