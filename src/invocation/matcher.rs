// Allow must_use_candidate for matcher factory functions since returning the matcher
// without using it is the common pattern for test setup
#![allow(clippy::must_use_candidate)]

//! Value matchers for call arguments.
//!
//! Argument patterns are built from matchers over [`Value`]:
//!
//! - [`Matcher`] trait for custom matchers
//! - Built-in matchers: [`eq`], [`gt`], [`lt`], [`contains_str`], [`of_kind`], etc.
//! - Combinators: [`all_of`], [`any_of`], [`not`]
//!
//! # Example
//!
//! ```rust
//! use testkit_double::Value;
//! use testkit_double::invocation::matcher::{eq, gt, not, Matcher};
//!
//! let m = eq(42);
//! assert!(m.matches(&Value::from(42)));
//!
//! let m = gt(0);
//! assert!(m.matches(&Value::from(50)));
//!
//! let m = not(eq(0));
//! assert!(m.matches(&Value::from(1)));
//! ```

use std::cmp::Ordering;
use std::fmt::Debug;

use serde_json::Value;

/// A matcher for testing values.
///
/// # Implementing Custom Matchers
///
/// ```rust
/// use testkit_double::Value;
/// use testkit_double::invocation::matcher::Matcher;
///
/// struct IsEven;
///
/// impl Matcher<Value> for IsEven {
///     fn matches(&self, value: &Value) -> bool {
///         value.as_i64().is_some_and(|n| n % 2 == 0)
///     }
///
///     fn describe(&self) -> String {
///         "is even".to_string()
///     }
///
///     fn describe_mismatch(&self, value: &Value) -> String {
///         format!("{value} is not even")
///     }
/// }
///
/// assert!(IsEven.matches(&Value::from(4)));
/// assert!(!IsEven.matches(&Value::from(3)));
/// ```
pub trait Matcher<T: ?Sized> {
    /// Check if the value matches.
    fn matches(&self, value: &T) -> bool;

    /// Describe what this matcher expects.
    fn describe(&self) -> String;

    /// Describe why a value didn't match.
    fn describe_mismatch(&self, value: &T) -> String;
}

/// A boxed argument matcher, as stored inside patterns.
pub type ArgMatcher = Box<dyn Matcher<Value> + Send + Sync>;

/// Orders two values of the same JSON kind.
///
/// Numbers compare numerically, strings and booleans by their natural order.
/// Values of different kinds are unordered.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

// =============================================================================
// Built-in Matchers
// =============================================================================

/// Create an equality matcher.
///
/// # Example
///
/// ```rust
/// use testkit_double::Value;
/// use testkit_double::invocation::matcher::{Matcher, eq};
///
/// let m = eq("x");
/// assert!(m.matches(&Value::from("x")));
/// assert!(!m.matches(&Value::from("y")));
/// ```
pub fn eq(expected: impl Into<Value>) -> EqMatcher {
    EqMatcher {
        expected: expected.into(),
    }
}

/// Matcher for equality.
#[derive(Debug, Clone)]
pub struct EqMatcher {
    expected: Value,
}

impl Matcher<Value> for EqMatcher {
    fn matches(&self, value: &Value) -> bool {
        value == &self.expected
    }

    fn describe(&self) -> String {
        self.expected.to_string()
    }

    fn describe_mismatch(&self, value: &Value) -> String {
        format!("{value} does not equal {}", self.expected)
    }
}

/// Create a greater-than matcher.
pub fn gt(threshold: impl Into<Value>) -> CompareMatcher {
    CompareMatcher::new(threshold.into(), &[Ordering::Greater], ">")
}

/// Create a greater-than-or-equal matcher.
pub fn gte(threshold: impl Into<Value>) -> CompareMatcher {
    CompareMatcher::new(threshold.into(), &[Ordering::Greater, Ordering::Equal], ">=")
}

/// Create a less-than matcher.
///
/// # Example
///
/// ```rust
/// use testkit_double::Value;
/// use testkit_double::invocation::matcher::{Matcher, lt};
///
/// let m = lt(10);
/// assert!(m.matches(&Value::from(5)));
/// assert!(!m.matches(&Value::from(20)));
/// assert!(!m.matches(&Value::from("5")));
/// ```
pub fn lt(threshold: impl Into<Value>) -> CompareMatcher {
    CompareMatcher::new(threshold.into(), &[Ordering::Less], "<")
}

/// Create a less-than-or-equal matcher.
pub fn lte(threshold: impl Into<Value>) -> CompareMatcher {
    CompareMatcher::new(threshold.into(), &[Ordering::Less, Ordering::Equal], "<=")
}

/// Matcher for ordered comparison against a threshold.
#[derive(Debug, Clone)]
pub struct CompareMatcher {
    threshold: Value,
    accepted: Vec<Ordering>,
    symbol: &'static str,
}

impl CompareMatcher {
    fn new(threshold: Value, accepted: &[Ordering], symbol: &'static str) -> Self {
        Self {
            threshold,
            accepted: accepted.to_vec(),
            symbol,
        }
    }
}

impl Matcher<Value> for CompareMatcher {
    fn matches(&self, value: &Value) -> bool {
        compare(value, &self.threshold).is_some_and(|ord| self.accepted.contains(&ord))
    }

    fn describe(&self) -> String {
        format!("{} {}", self.symbol, self.threshold)
    }

    fn describe_mismatch(&self, value: &Value) -> String {
        format!("{value} is not {} {}", self.symbol, self.threshold)
    }
}

/// Create a substring matcher for string values.
///
/// # Example
///
/// ```rust
/// use testkit_double::Value;
/// use testkit_double::invocation::matcher::{Matcher, contains_str};
///
/// let m = contains_str("world");
/// assert!(m.matches(&Value::from("hello world")));
/// assert!(!m.matches(&Value::from("hello")));
/// ```
pub fn contains_str(substring: &str) -> StrMatcher {
    StrMatcher {
        needle: substring.to_string(),
        mode: StrMode::Contains,
    }
}

/// Create a prefix matcher for string values.
pub fn starts_with(prefix: &str) -> StrMatcher {
    StrMatcher {
        needle: prefix.to_string(),
        mode: StrMode::StartsWith,
    }
}

/// Create a suffix matcher for string values.
pub fn ends_with(suffix: &str) -> StrMatcher {
    StrMatcher {
        needle: suffix.to_string(),
        mode: StrMode::EndsWith,
    }
}

#[derive(Debug, Clone, Copy)]
enum StrMode {
    Contains,
    StartsWith,
    EndsWith,
}

/// Matcher for string contents.
#[derive(Debug, Clone)]
pub struct StrMatcher {
    needle: String,
    mode: StrMode,
}

impl StrMatcher {
    fn verb(&self) -> &'static str {
        match self.mode {
            StrMode::Contains => "contains",
            StrMode::StartsWith => "starts with",
            StrMode::EndsWith => "ends with",
        }
    }
}

impl Matcher<Value> for StrMatcher {
    fn matches(&self, value: &Value) -> bool {
        let Some(s) = value.as_str() else {
            return false;
        };
        match self.mode {
            StrMode::Contains => s.contains(&self.needle),
            StrMode::StartsWith => s.starts_with(&self.needle),
            StrMode::EndsWith => s.ends_with(&self.needle),
        }
    }

    fn describe(&self) -> String {
        format!("{} {:?}", self.verb(), self.needle)
    }

    fn describe_mismatch(&self, value: &Value) -> String {
        format!("{value} does not {} {:?}", self.verb(), self.needle)
    }
}

/// Create a contains-element matcher for array values.
///
/// # Example
///
/// ```rust
/// use testkit_double::Value;
/// use testkit_double::invocation::matcher::{Matcher, contains};
///
/// let m = contains(2);
/// assert!(m.matches(&Value::from(vec![1, 2, 3])));
/// assert!(!m.matches(&Value::from(vec![1, 3])));
/// ```
pub fn contains(element: impl Into<Value>) -> ContainsMatcher {
    ContainsMatcher {
        element: element.into(),
    }
}

/// Matcher for array contains element.
#[derive(Debug, Clone)]
pub struct ContainsMatcher {
    element: Value,
}

impl Matcher<Value> for ContainsMatcher {
    fn matches(&self, value: &Value) -> bool {
        value
            .as_array()
            .is_some_and(|items| items.contains(&self.element))
    }

    fn describe(&self) -> String {
        format!("contains {}", self.element)
    }

    fn describe_mismatch(&self, value: &Value) -> String {
        format!("{value} does not contain {}", self.element)
    }
}

/// Create a length matcher for arrays, strings and objects.
///
/// ```rust
/// use testkit_double::Value;
/// use testkit_double::invocation::matcher::{Matcher, has_length};
///
/// assert!(has_length(3).matches(&Value::from(vec![1, 2, 3])));
/// assert!(has_length(2).matches(&Value::from("ab")));
/// assert!(!has_length(1).matches(&Value::from(7)));
/// ```
pub fn has_length(length: usize) -> HasLengthMatcher {
    HasLengthMatcher { length }
}

/// Matcher for collection length.
#[derive(Debug, Clone, Copy)]
pub struct HasLengthMatcher {
    length: usize,
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => Some(items.len()),
        Value::String(s) => Some(s.chars().count()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

impl Matcher<Value> for HasLengthMatcher {
    fn matches(&self, value: &Value) -> bool {
        length_of(value) == Some(self.length)
    }

    fn describe(&self) -> String {
        format!("has length {}", self.length)
    }

    fn describe_mismatch(&self, value: &Value) -> String {
        match length_of(value) {
            Some(actual) => format!(
                "expected length {}, but was {actual} (value: {value})",
                self.length
            ),
            None => format!("{value} has no length"),
        }
    }
}

/// JSON kinds an argument can be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// `null`
    Null,
    /// `true` or `false`
    Bool,
    /// Any number.
    Number,
    /// A string.
    String,
    /// An array.
    Array,
    /// An object.
    Object,
}

impl Kind {
    /// The kind of a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

/// Create a matcher that accepts any value of the given kind.
///
/// ```rust
/// use testkit_double::Value;
/// use testkit_double::invocation::matcher::{of_kind, Kind, Matcher};
///
/// let m = of_kind(Kind::Number);
/// assert!(m.matches(&Value::from(1.5)));
/// assert!(!m.matches(&Value::from("1.5")));
/// ```
pub fn of_kind(kind: Kind) -> KindMatcher {
    KindMatcher { kind }
}

/// Matcher for the JSON kind of a value.
#[derive(Debug, Clone, Copy)]
pub struct KindMatcher {
    kind: Kind,
}

impl Matcher<Value> for KindMatcher {
    fn matches(&self, value: &Value) -> bool {
        Kind::of(value) == self.kind
    }

    fn describe(&self) -> String {
        format!("any {:?}", self.kind)
    }

    fn describe_mismatch(&self, value: &Value) -> String {
        format!("{value} is a {:?}, not a {:?}", Kind::of(value), self.kind)
    }
}

/// Create a matcher that always matches.
pub fn anything() -> AnythingMatcher {
    AnythingMatcher
}

/// Matcher that matches anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnythingMatcher;

impl Matcher<Value> for AnythingMatcher {
    fn matches(&self, _value: &Value) -> bool {
        true
    }

    fn describe(&self) -> String {
        "any".to_string()
    }

    fn describe_mismatch(&self, _value: &Value) -> String {
        "matches anything".to_string()
    }
}

/// Create a predicate-based matcher.
///
/// # Example
///
/// ```rust
/// use testkit_double::Value;
/// use testkit_double::invocation::matcher::{Matcher, satisfies};
///
/// let m = satisfies(|v: &Value| v.as_i64().is_some_and(|n| n % 2 == 0), "is even");
/// assert!(m.matches(&Value::from(4)));
/// assert!(!m.matches(&Value::from(3)));
/// ```
pub fn satisfies<F>(predicate: F, description: &str) -> PredicateMatcher<F>
where
    F: Fn(&Value) -> bool,
{
    PredicateMatcher {
        predicate,
        description: description.to_string(),
    }
}

/// Matcher based on a predicate function.
pub struct PredicateMatcher<F> {
    predicate: F,
    description: String,
}

impl<F: Fn(&Value) -> bool> Matcher<Value> for PredicateMatcher<F> {
    fn matches(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn describe_mismatch(&self, value: &Value) -> String {
        format!("{value} does not satisfy: {}", self.description)
    }
}

impl<F> Debug for PredicateMatcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateMatcher")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Combinators
// =============================================================================

/// Create a matcher that matches when all matchers match.
///
/// ```rust
/// use testkit_double::Value;
/// use testkit_double::invocation::matcher::{all_of, gt, lt, ArgMatcher, Matcher};
///
/// let m = all_of(vec![Box::new(gt(0)) as ArgMatcher, Box::new(lt(100))]);
/// assert!(m.matches(&Value::from(50)));
/// assert!(!m.matches(&Value::from(0)));
/// ```
pub fn all_of(matchers: Vec<ArgMatcher>) -> AllOfMatcher {
    AllOfMatcher { matchers }
}

/// Matcher that requires all inner matchers to match.
pub struct AllOfMatcher {
    matchers: Vec<ArgMatcher>,
}

impl Matcher<Value> for AllOfMatcher {
    fn matches(&self, value: &Value) -> bool {
        self.matchers.iter().all(|m| m.matches(value))
    }

    fn describe(&self) -> String {
        let descriptions: Vec<_> = self.matchers.iter().map(|m| m.describe()).collect();
        format!("all of [{}]", descriptions.join(", "))
    }

    fn describe_mismatch(&self, value: &Value) -> String {
        let failures: Vec<_> = self
            .matchers
            .iter()
            .filter(|m| !m.matches(value))
            .map(|m| m.describe_mismatch(value))
            .collect();
        format!("failed: {}", failures.join("; "))
    }
}

/// Create a matcher that matches when any matcher matches.
///
/// ```rust
/// use testkit_double::Value;
/// use testkit_double::invocation::matcher::{any_of, eq, Matcher};
///
/// let m = any_of(vec![eq(1), eq(2), eq(3)]);
/// assert!(m.matches(&Value::from(2)));
/// assert!(!m.matches(&Value::from(4)));
/// ```
pub fn any_of<M>(matchers: Vec<M>) -> AnyOfMatcher
where
    M: Matcher<Value> + Send + Sync + 'static,
{
    AnyOfMatcher {
        matchers: matchers
            .into_iter()
            .map(|m| Box::new(m) as ArgMatcher)
            .collect(),
    }
}

/// Matcher that requires at least one inner matcher to match.
pub struct AnyOfMatcher {
    matchers: Vec<ArgMatcher>,
}

impl Matcher<Value> for AnyOfMatcher {
    fn matches(&self, value: &Value) -> bool {
        self.matchers.iter().any(|m| m.matches(value))
    }

    fn describe(&self) -> String {
        let descriptions: Vec<_> = self.matchers.iter().map(|m| m.describe()).collect();
        format!("any of [{}]", descriptions.join(", "))
    }

    fn describe_mismatch(&self, value: &Value) -> String {
        format!("{value} matched none of {}", self.describe())
    }
}

/// Create a negating matcher.
pub fn not<M: Matcher<Value> + Send + Sync + 'static>(matcher: M) -> NotMatcher {
    NotMatcher {
        inner: Box::new(matcher),
    }
}

/// Matcher that negates another matcher.
pub struct NotMatcher {
    inner: ArgMatcher,
}

impl Matcher<Value> for NotMatcher {
    fn matches(&self, value: &Value) -> bool {
        !self.inner.matches(value)
    }

    fn describe(&self) -> String {
        format!("not {}", self.inner.describe())
    }

    fn describe_mismatch(&self, value: &Value) -> String {
        format!("{value} unexpectedly matched: {}", self.inner.describe())
    }
}

// Implement Matcher for boxed matchers to allow nesting
impl<T: ?Sized> Matcher<T> for Box<dyn Matcher<T> + Send + Sync> {
    fn matches(&self, value: &T) -> bool {
        (**self).matches(value)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn describe_mismatch(&self, value: &T) -> String {
        (**self).describe_mismatch(value)
    }
}
