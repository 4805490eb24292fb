use serde::{Deserialize, Serialize};

/// How long after its first sighting a lead still counts as "recently new".
pub const RECENTLY_NEW_WINDOW_MS: i64 = 60_000;

const UNKNOWN: &str = "Unknown";

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Anything carrying a lead identifier. Diffing only looks at identity.
pub trait Identified {
    fn id(&self) -> &str;
}

/// A lead as currently visible on the page. Identity is `id`; every other
/// field may change between observations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    #[serde(default = "unknown")]
    pub status: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "unknown")]
    pub customer_name: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default = "unknown")]
    pub location: String,
}

impl Lead {
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: unknown(),
            category: category.into(),
            customer_name: unknown(),
            timestamp: None,
            location: unknown(),
        }
    }

    pub fn to_stored(&self) -> StoredLead {
        StoredLead {
            id: self.id.clone(),
            status: self.status.clone(),
            category: self.category.clone(),
            timestamp: self.timestamp.clone(),
        }
    }

    pub fn to_summary(&self) -> NewLeadSummary {
        NewLeadSummary {
            id: self.id.clone(),
            customer_name: self.customer_name.clone(),
            location: self.location.clone(),
            status: self.status.clone(),
        }
    }
}

impl Identified for Lead {
    fn id(&self) -> &str {
        &self.id
    }
}

/// The persisted projection of a lead: the baseline the next diff runs against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredLead {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Identified for StoredLead {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A row of the `GET_LEADS` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeadView {
    pub id: String,
    pub customer_name: String,
    pub location: String,
    pub status: String,
    pub category: String,
    pub timestamp: Option<String>,
    pub first_seen: Option<i64>,
    pub recently_new: bool,
}

impl LeadView {
    pub fn from_lead(lead: &Lead, first_seen: Option<i64>, now_ms: i64) -> Self {
        Self {
            id: lead.id.clone(),
            customer_name: lead.customer_name.clone(),
            location: lead.location.clone(),
            status: lead.status.clone(),
            category: lead.category.clone(),
            timestamp: lead.timestamp.clone(),
            first_seen,
            recently_new: is_recently_new(first_seen, now_ms),
        }
    }
}

/// A row of the `NEW_LEADS_DETECTED` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewLeadSummary {
    pub id: String,
    pub customer_name: String,
    pub location: String,
    pub status: String,
}

pub fn is_recently_new(first_seen: Option<i64>, now_ms: i64) -> bool {
    match first_seen {
        Some(seen) => now_ms.saturating_sub(seen) < RECENTLY_NEW_WINDOW_MS,
        None => false,
    }
}
