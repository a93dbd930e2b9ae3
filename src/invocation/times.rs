//! Call-count constraints.

use std::fmt;

/// How many matching calls a verification expects.
///
/// # Example
///
/// ```rust
/// use testkit_double::invocation::Times;
///
/// assert!(Times::exactly(2).is_satisfied_by(2));
/// assert!(Times::at_least(1).is_satisfied_by(5));
/// assert!(!Times::never().is_satisfied_by(1));
/// assert_eq!(Times::between(1, 3).to_string(), "between 1 and 3 times");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Times {
    /// Exactly `n` calls.
    Exactly(usize),
    /// `n` or more calls.
    AtLeast(usize),
    /// At most `n` calls.
    AtMost(usize),
    /// Between `min` and `max` calls, inclusive.
    Between(usize, usize),
}

impl Times {
    /// Exactly `n` calls.
    #[must_use]
    pub fn exactly(n: usize) -> Self {
        Self::Exactly(n)
    }

    /// Exactly one call.
    #[must_use]
    pub fn once() -> Self {
        Self::Exactly(1)
    }

    /// No calls at all.
    #[must_use]
    pub fn never() -> Self {
        Self::Exactly(0)
    }

    /// `n` or more calls.
    #[must_use]
    pub fn at_least(n: usize) -> Self {
        Self::AtLeast(n)
    }

    /// At most `n` calls.
    #[must_use]
    pub fn at_most(n: usize) -> Self {
        Self::AtMost(n)
    }

    /// Between `min` and `max` calls, inclusive. The bounds may be given in
    /// either order.
    #[must_use]
    pub fn between(min: usize, max: usize) -> Self {
        Self::Between(min.min(max), min.max(max))
    }

    /// Whether `count` observed calls satisfy this constraint.
    #[must_use]
    pub fn is_satisfied_by(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
            Self::AtMost(n) => count <= n,
            Self::Between(min, max) => (min..=max).contains(&count),
        }
    }
}

impl Default for Times {
    fn default() -> Self {
        Self::once()
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "time"
    } else {
        "times"
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Exactly(0) => write!(f, "never"),
            Self::Exactly(n) => write!(f, "exactly {n} {}", plural(n)),
            Self::AtLeast(n) => write!(f, "at least {n} {}", plural(n)),
            Self::AtMost(n) => write!(f, "at most {n} {}", plural(n)),
            Self::Between(min, max) => write!(f, "between {min} and {max} times"),
        }
    }
}
