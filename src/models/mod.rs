pub mod lead;

pub use lead::{Identified, Lead, LeadView, NewLeadSummary, StoredLead};
