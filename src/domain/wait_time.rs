//! Wait-time estimation from table turnover statistics.

use serde::{Deserialize, Serialize};

/// Per-restaurant inputs to the wait-time estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnoverSettings {
    /// Average minutes a table stays occupied.
    pub average_table_turnover: u32,
    /// Tables that free up in parallel. Treated as 1 when zero.
    pub concurrent_tables: u32,
}

impl TurnoverSettings {
    /// Creates settings with the given turnover and table count.
    #[must_use]
    pub const fn new(average_table_turnover: u32, concurrent_tables: u32) -> Self {
        Self {
            average_table_turnover,
            concurrent_tables,
        }
    }

    /// Estimated wait in minutes for a party with `parties_ahead` waiting
    /// parties in front of it.
    ///
    /// `ceil(ahead * turnover / tables)`. With a single table this is the
    /// linear `ahead * turnover` estimate.
    #[must_use]
    pub fn estimate(&self, parties_ahead: u32) -> u32 {
        let tables = u64::from(self.concurrent_tables.max(1));
        let total = u64::from(parties_ahead) * u64::from(self.average_table_turnover);
        u32::try_from(total.div_ceil(tables)).unwrap_or(u32::MAX)
    }
}

impl Default for TurnoverSettings {
    fn default() -> Self {
        Self::new(25, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_queue_has_no_wait() {
        assert_eq!(TurnoverSettings::default().estimate(0), 0);
    }

    #[test]
    fn single_table_is_linear() {
        let settings = TurnoverSettings::new(25, 1);
        assert_eq!(settings.estimate(1), 25);
        assert_eq!(settings.estimate(4), 100);
    }

    #[test]
    fn multiple_tables_round_up() {
        let settings = TurnoverSettings::new(25, 2);
        assert_eq!(settings.estimate(1), 13);
        assert_eq!(settings.estimate(2), 25);
        assert_eq!(settings.estimate(3), 38);
    }

    #[test]
    fn zero_tables_behaves_like_one() {
        let settings = TurnoverSettings::new(10, 0);
        assert_eq!(settings.estimate(3), 30);
    }
}
