use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay before each staged attempt, measured from the previous one.
    pub staged_delays_ms: Vec<u64>,
    pub debounce_ms: u64,
    pub health_check_ms: u64,
    pub url_poll_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            staged_delays_ms: vec![0, 500, 1000, 2000, 4000],
            debounce_ms: 300,
            health_check_ms: 3000,
            url_poll_ms: 1000,
        }
    }
}

impl SchedulerConfig {
    pub(crate) fn staged_delay(&self, attempt: usize) -> Option<u64> {
        if self.staged_delays_ms.is_empty() && attempt == 0 {
            return Some(0);
        }
        self.staged_delays_ms.get(attempt).copied()
    }

    pub(crate) fn staged_attempts(&self) -> usize {
        self.staged_delays_ms.len().max(1)
    }
}
