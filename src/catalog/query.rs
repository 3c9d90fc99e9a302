use serde::{Deserialize, Serialize};

use super::types::{CatalogRecord, Mission, Status};

/// Upper bound on the page size of a single listing.
pub const MAX_LIST_LIMIT: usize = 500;

/// Page size used when the caller gives none.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Filters and page window for a catalog listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub mission: Option<Mission>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            mission: None,
            status: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl ListQuery {
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            limit,
            offset,
            ..Self::default()
        }
    }

    pub fn with_mission(mut self, mission: Mission) -> Self {
        self.mission = Some(mission);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Page size after applying [`MAX_LIST_LIMIT`].
    pub fn effective_limit(&self) -> usize {
        self.limit.min(MAX_LIST_LIMIT)
    }

    pub fn matches(&self, record: &CatalogRecord) -> bool {
        self.mission.is_none_or(|mission| record.mission == mission)
            && self.status.is_none_or(|status| record.status == status)
    }

    /// Filter `records`, then return the `[offset, offset + limit)` window.
    pub fn apply(&self, records: &[CatalogRecord]) -> Vec<CatalogRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .skip(self.offset)
            .take(self.effective_limit())
            .cloned()
            .collect()
    }
}
