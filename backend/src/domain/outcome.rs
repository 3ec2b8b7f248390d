/// Result of a store mutation that did not fail outright.
///
/// Only `Applied` means state changed and was persisted. The other variants
/// describe why nothing happened, so callers can tell "nothing to do" apart
/// from a stale reference without the store treating either as an error.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    /// State changed and the record was persisted
    Applied(T),
    /// Valid request with no effect (e.g. duplicate category)
    Unchanged,
    /// The operation is profile-scoped and nobody is logged in
    NoActiveProfile,
    /// The referenced profile, expense or category does not exist
    NotFound,
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Applied(value) => Outcome::Applied(f(value)),
            Outcome::Unchanged => Outcome::Unchanged,
            Outcome::NoActiveProfile => Outcome::NoActiveProfile,
            Outcome::NotFound => Outcome::NotFound,
        }
    }

    /// Short label for logs and CLI messages
    pub fn describe(&self) -> &'static str {
        match self {
            Outcome::Applied(_) => "applied",
            Outcome::Unchanged => "unchanged",
            Outcome::NoActiveProfile => "no active profile",
            Outcome::NotFound => "not found",
        }
    }
}
