use crate::models::Lead;

/// Case-insensitive substring match against a lead's category. A lead passes
/// when any configured filter occurs in it.
#[derive(Debug, Clone)]
pub struct CategoryFilter {
    needles: Vec<String>,
}

impl CategoryFilter {
    pub fn new(filters: &[String]) -> Self {
        Self {
            needles: filters
                .iter()
                .map(|filter| filter.trim().to_lowercase())
                .filter(|filter| !filter.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, category: &str) -> bool {
        let category = category.to_lowercase();
        self.needles.iter().any(|needle| category.contains(needle))
    }

    pub fn apply(&self, leads: Vec<Lead>) -> Vec<Lead> {
        leads
            .into_iter()
            .filter(|lead| self.matches(&lead.category))
            .collect()
    }
}
