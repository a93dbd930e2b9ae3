//! Argument patterns used by stubs and verifications.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::matcher::{anything, eq, ArgMatcher, Matcher};
use super::Args;

/// Decides whether a call's arguments are accepted by a stub or a verification.
///
/// A pattern holds one matcher per positional argument and one per keyword
/// argument. By default the call must have exactly those arguments;
/// [`ArgsPattern::any_rest`] also accepts extra trailing positional and
/// unknown keyword arguments.
///
/// Plain [`Args`] convert into a pattern that compares every argument for
/// equality.
///
/// # Example
///
/// ```rust
/// use testkit_double::args;
/// use testkit_double::invocation::{matcher::{anything, contains_str}, ArgsPattern};
///
/// let pattern = ArgsPattern::new()
///     .arg(anything())
///     .kwarg("path", contains_str("/tmp"));
///
/// assert!(pattern.matches(&args![1].kwarg("path", "/tmp/x")));
/// assert!(!pattern.matches(&args![1]));
/// assert!(!pattern.matches(&args![1, 2].kwarg("path", "/tmp/x")));
/// ```
#[derive(Default)]
pub struct ArgsPattern {
    positional: Vec<ArgMatcher>,
    keyword: BTreeMap<String, ArgMatcher>,
    any_rest: bool,
}

impl ArgsPattern {
    /// Pattern accepting only calls without arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pattern accepting every call.
    #[must_use]
    pub fn any() -> Self {
        Self::new().any_rest()
    }

    /// Expect the next positional argument to satisfy `matcher`.
    #[must_use]
    pub fn arg(mut self, matcher: impl Matcher<Value> + Send + Sync + 'static) -> Self {
        self.positional.push(Box::new(matcher));
        self
    }

    /// Expect the next positional argument to equal `value`.
    #[must_use]
    pub fn value(self, value: impl Into<Value>) -> Self {
        self.arg(eq(value))
    }

    /// Expect the next positional argument to be present, whatever its value.
    #[must_use]
    pub fn any_arg(self) -> Self {
        self.arg(anything())
    }

    /// Expect keyword argument `name` to satisfy `matcher`.
    #[must_use]
    pub fn kwarg(
        mut self,
        name: impl Into<String>,
        matcher: impl Matcher<Value> + Send + Sync + 'static,
    ) -> Self {
        self.keyword.insert(name.into(), Box::new(matcher));
        self
    }

    /// Also accept arguments beyond the ones this pattern names.
    #[must_use]
    pub fn any_rest(mut self) -> Self {
        self.any_rest = true;
        self
    }

    /// Check whether `args` are accepted.
    #[must_use]
    pub fn matches(&self, args: &Args) -> bool {
        let positional = args.positional();
        if positional.len() < self.positional.len()
            || (!self.any_rest && positional.len() != self.positional.len())
        {
            return false;
        }
        if !self
            .positional
            .iter()
            .zip(positional)
            .all(|(matcher, value)| matcher.matches(value))
        {
            return false;
        }

        let keyword = args.keyword();
        if !self.any_rest && keyword.keys().any(|k| !self.keyword.contains_key(k)) {
            return false;
        }
        self.keyword.iter().all(|(name, matcher)| {
            keyword
                .get(name)
                .is_some_and(|value| matcher.matches(value))
        })
    }

    /// Render the pattern the way a call would be written.
    #[must_use]
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Explain why `args` are not accepted, or `None` if they are.
    #[must_use]
    pub fn describe_mismatch(&self, args: &Args) -> Option<String> {
        if self.matches(args) {
            return None;
        }
        let positional = args.positional();
        if positional.len() < self.positional.len()
            || (!self.any_rest && positional.len() != self.positional.len())
        {
            return Some(format!(
                "expected {} positional argument(s), got {}",
                self.positional.len(),
                positional.len()
            ));
        }
        for (index, (matcher, value)) in self.positional.iter().zip(positional).enumerate() {
            if !matcher.matches(value) {
                return Some(format!(
                    "argument {index}: {}",
                    matcher.describe_mismatch(value)
                ));
            }
        }
        for (name, matcher) in &self.keyword {
            match args.keyword().get(name) {
                Some(value) if !matcher.matches(value) => {
                    return Some(format!("keyword `{name}`: {}", matcher.describe_mismatch(value)));
                }
                None => return Some(format!("missing keyword `{name}`")),
                Some(_) => {}
            }
        }
        Some("unexpected keyword argument(s)".to_string())
    }
}

impl From<Args> for ArgsPattern {
    fn from(args: Args) -> Self {
        let Args {
            positional,
            keyword,
        } = args;
        Self {
            positional: positional
                .into_iter()
                .map(|v| Box::new(eq(v)) as ArgMatcher)
                .collect(),
            keyword: keyword
                .into_iter()
                .map(|(k, v)| (k, Box::new(eq(v)) as ArgMatcher))
                .collect(),
            any_rest: false,
        }
    }
}

impl fmt::Display for ArgsPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.positional.iter().map(|m| m.describe()).collect();
        parts.extend(
            self.keyword
                .iter()
                .map(|(k, m)| format!("{k}={}", m.describe())),
        );
        if self.any_rest {
            parts.push("..".to_string());
        }
        write!(f, "({})", parts.join(", "))
    }
}

impl fmt::Debug for ArgsPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArgsPattern").field(&self.to_string()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::invocation::matcher::gt;

    #[test]
    fn test_exact_args() {
        let pattern = ArgsPattern::from(args![1, 2]);
        assert!(pattern.matches(&args![1, 2]));
        assert!(!pattern.matches(&args![1]));
        assert!(!pattern.matches(&args![1, 2, 3]));
        assert!(!pattern.matches(&args![2, 1]));
    }

    #[test]
    fn test_empty_pattern_only_accepts_no_args() {
        let pattern = ArgsPattern::new();
        assert!(pattern.matches(&Args::new()));
        assert!(!pattern.matches(&args![1]));
        assert!(!pattern.matches(&Args::new().kwarg("k", 1)));
    }

    #[test]
    fn test_any_accepts_everything() {
        let pattern = ArgsPattern::any();
        assert!(pattern.matches(&Args::new()));
        assert!(pattern.matches(&args![1, "x"].kwarg("k", 1)));
    }

    #[test]
    fn test_any_rest_keeps_leading_matchers() {
        let pattern = ArgsPattern::new().arg(gt(5)).any_rest();
        assert!(pattern.matches(&args![6]));
        assert!(pattern.matches(&args![6, 0, 0]));
        assert!(!pattern.matches(&args![5, 0]));
        assert!(!pattern.matches(&Args::new()));
    }

    #[test]
    fn test_keyword_matching() {
        let pattern = ArgsPattern::from(Args::new().kwarg("a", 1));
        assert!(pattern.matches(&Args::new().kwarg("a", 1)));
        assert!(!pattern.matches(&Args::new().kwarg("a", 2)));
        assert!(!pattern.matches(&Args::new().kwarg("a", 1).kwarg("b", 2)));
    }

    #[test]
    fn test_display() {
        assert_eq!(ArgsPattern::from(args![1, "x"]).to_string(), "(1, \"x\")");
        assert_eq!(ArgsPattern::any().to_string(), "(..)");
        assert_eq!(
            ArgsPattern::new().any_arg().kwarg("k", gt(1)).to_string(),
            "(any, k=> 1)"
        );
    }

    #[test]
    fn test_describe_mismatch() {
        let pattern = ArgsPattern::from(args![1]);
        assert_eq!(pattern.describe_mismatch(&args![1]), None);
        assert!(pattern
            .describe_mismatch(&args![2])
            .is_some_and(|m| m.starts_with("argument 0")));
        assert!(pattern
            .describe_mismatch(&Args::new())
            .is_some_and(|m| m.contains("positional")));
    }
}
