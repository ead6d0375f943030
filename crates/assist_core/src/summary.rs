use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageMode {
    Listing,
    SingleRecord,
    #[default]
    Other,
}

/// What caused a reconciliation pass to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassOrigin {
    StagedRetry,
    Mutation,
    Health,
}

/// The slice of a published detection result the scheduler reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PassSummary {
    pub page_mode: PageMode,
    /// Rows that ended up with a writable reply input.
    pub row_count: usize,
    /// Rows counted structurally without any input (diagnostic only).
    pub bare_row_count: usize,
    pub reply_input_found: bool,
    pub displayed_count_hint: Option<u32>,
}

impl PassSummary {
    /// A staged retry sequence stops early once this holds.
    pub fn is_converged(&self) -> bool {
        match self.page_mode {
            PageMode::Listing => self.row_count > 0,
            PageMode::SingleRecord => self.reply_input_found,
            PageMode::Other => false,
        }
    }

    /// The periodic health check re-runs detection only while this holds.
    pub fn is_unhealthy(&self) -> bool {
        // A positive displayed-count hint with zero rows falls under the listing clause.
        !self.reply_input_found || (self.page_mode == PageMode::Listing && self.row_count == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::{PageMode, PassSummary};

    #[test]
    fn listing_with_bare_rows_only_is_not_converged() {
        let summary = PassSummary {
            page_mode: PageMode::Listing,
            bare_row_count: 8,
            ..PassSummary::default()
        };
        assert!(!summary.is_converged());
        assert!(summary.is_unhealthy());
    }

    #[test]
    fn single_record_with_input_is_healthy() {
        let summary = PassSummary {
            page_mode: PageMode::SingleRecord,
            reply_input_found: true,
            ..PassSummary::default()
        };
        assert!(summary.is_converged());
        assert!(!summary.is_unhealthy());
    }

    #[test]
    fn listing_with_hint_and_rows_is_healthy() {
        let summary = PassSummary {
            page_mode: PageMode::Listing,
            row_count: 5,
            reply_input_found: true,
            displayed_count_hint: Some(20),
            ..PassSummary::default()
        };
        assert!(!summary.is_unhealthy());
    }
}
