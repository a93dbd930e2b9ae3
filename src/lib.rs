//! # testkit-double 🧰
//!
//! > Mocks, stubs and spies for Rust tests
//!
//! **testkit-double** provides test doubles that record the calls they
//! receive, answer them from configured stubs, and verify afterwards that the
//! expected calls happened. A double can stand alone or take over members of
//! a live object for the duration of a test.
//!
//! ## Quick Start
//!
//! ```rust
//! use testkit_double::prelude::*;
//!
//! let mock = Mock::new();
//! mock.when("load").unwrap().invoke(args!["config"]).unwrap().then_return("debug=true");
//!
//! assert_eq!(mock.record("load", args!["config"]).unwrap(), Value::from("debug=true"));
//! assert_eq!(mock.verify().unwrap().called("load", args!["config"]).unwrap(), 1);
//! ```
//!
//! ## Patching a live object
//!
//! ```rust
//! use testkit_double::prelude::*;
//!
//! let clock = DynObject::new("clock").with_method("now", Binding::free(|_| Ok(Value::from(1_000))));
//! let mock = Mock::of(clock.clone());
//!
//! mock.when("now").unwrap().invoke(args![]).unwrap().then_return(0);
//! assert_eq!(clock.invoke("now", args![]).unwrap(), Value::from(0));
//!
//! mock.unstub();
//! assert_eq!(clock.invoke("now", args![]).unwrap(), Value::from(1_000));
//! ```
//!
//! ## Features
//!
//! - 🎭 **Three modes** - Record, stub and verify through one dispatch point
//! - 🩹 **Reversible patching** - Stubbed members are restored in reverse order
//! - 🔍 **Argument matchers** - Match calls by value, predicate or shape
//! - 🧹 **Registry teardown** - Reset or unstub every mock after a test

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod invocation;
pub mod mock;
pub mod registry;
pub mod subject;

/// Prelude for convenient imports
///
/// ```rust
/// use testkit_double::prelude::*;
/// ```
pub mod prelude {
    pub use crate::args;
    pub use crate::error::{Error, Result};
    pub use crate::invocation::matcher::*;
    pub use crate::invocation::{Args, ArgsPattern, Invocation, Times, Value};
    pub use crate::mock::{Mock, MockBuilder, Mode, UnmatchedPolicy};
    pub use crate::subject::{Binding, Dispatch, DynObject, Patchable};
}

// Re-exports
pub use error::{Error, Result};
pub use invocation::{Args, Value};
pub use mock::Mock;

// Re-export the test macro when macros feature is enabled
#[cfg(feature = "macros")]
pub use testkit_double_macros::test;
