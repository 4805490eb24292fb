use std::collections::HashSet;

use crate::models::{Identified, Lead};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadDiff {
    pub new_leads: Vec<Lead>,
}

impl LeadDiff {
    pub fn is_empty(&self) -> bool {
        self.new_leads.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.new_leads.iter().map(|lead| lead.id.clone()).collect()
    }
}

/// Leads in `current` whose id does not appear in `previous`, in `current`
/// order. Repeated ids within `current` are reported once, at their first
/// position.
pub fn diff<P: Identified>(current: &[Lead], previous: &[P]) -> LeadDiff {
    let known: HashSet<&str> = previous.iter().map(|lead| lead.id()).collect();
    let mut reported = HashSet::new();

    let new_leads = current
        .iter()
        .filter(|lead| !known.contains(lead.id()))
        .filter(|lead| reported.insert(lead.id.clone()))
        .cloned()
        .collect();

    LeadDiff { new_leads }
}

/// Stable de-duplication: the first occurrence of each id wins.
pub fn dedupe_by_id<T: Identified + Clone>(items: &[T]) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.id().to_string()))
        .cloned()
        .collect()
}
