//! Result of a phase that may complete with reduced quality.

/// Leaf phases report `Ok` or `Degraded`; hard failures travel as `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseOutcome<T> {
    Ok(T),
    Degraded(T, String),
}

impl<T> PhaseOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(..))
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Ok(value) | Self::Degraded(value, _) => value,
        }
    }

    pub fn into_parts(self) -> (T, Option<String>) {
        match self {
            Self::Ok(value) => (value, None),
            Self::Degraded(value, reason) => (value, Some(reason)),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PhaseOutcome<U> {
        match self {
            Self::Ok(value) => PhaseOutcome::Ok(f(value)),
            Self::Degraded(value, reason) => PhaseOutcome::Degraded(f(value), reason),
        }
    }

    /// Degrade with `reason` when `degraded` is true.
    pub fn degraded_if(value: T, degraded: bool, reason: impl FnOnce() -> String) -> Self {
        if degraded {
            Self::Degraded(value, reason())
        } else {
            Self::Ok(value)
        }
    }
}
