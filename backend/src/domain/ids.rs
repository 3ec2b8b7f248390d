use chrono::Utc;
use log::warn;

pub const PROFILE_ID_PREFIX: &str = "profile";
pub const EXPENSE_ID_PREFIX: &str = "exp";

/// Observed ids further ahead of the clock than this are not generated ones
const MAX_CLOCK_SKEW_MILLIS: i64 = 365 * 24 * 60 * 60 * 1000;

/// Generates identifiers in format: "<prefix>_<epoch_millis>"
///
/// The numeric part never goes backwards: when the clock has not advanced
/// since the last id (or data loaded from disk already holds a larger one)
/// the previous value plus one is used instead. Identifiers are therefore
/// never reused for the lifetime of a store.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for an id that already exists so it is never handed out again
    pub fn observe(&mut self, id: &str) {
        self.observe_at(id, Utc::now().timestamp_millis());
    }

    fn observe_at(&mut self, id: &str, now_millis: i64) {
        let Some(value) = numeric_suffix(id) else {
            return;
        };
        if value > now_millis.saturating_add(MAX_CLOCK_SKEW_MILLIS) {
            warn!("Ignoring id {} from far in the future", id);
            return;
        }
        self.last = self.last.max(value);
    }

    pub fn next_profile_id(&mut self) -> String {
        self.next(PROFILE_ID_PREFIX)
    }

    pub fn next_expense_id(&mut self) -> String {
        self.next(EXPENSE_ID_PREFIX)
    }

    pub fn next(&mut self, prefix: &str) -> String {
        self.next_at(prefix, Utc::now().timestamp_millis())
    }

    fn next_at(&mut self, prefix: &str, now_millis: i64) -> String {
        let value = now_millis.max(self.last.saturating_add(1));
        self.last = value;
        format!("{}_{}", prefix, value)
    }
}

fn numeric_suffix(id: &str) -> Option<i64> {
    id.rsplit('_').next()?.parse::<i64>().ok()
}
