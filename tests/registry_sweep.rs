//! Global registry sweeps.
//!
//! Global sweeps touch every mock in the process, so this binary holds a
//! single test.

use testkit_double::prelude::*;
use testkit_double::registry::{self, Registry, Teardown, TeardownScope};

#[test]
fn test_global_sweeps() {
    let before = Registry::global().live_count();

    let clock = DynObject::new("clock").with_method("now", Binding::free(|_| Ok(Value::from(0))));
    let real = Mock::of(clock.clone());
    let plain = Mock::new();
    let unlisted = Mock::builder().register(false).build();
    assert_eq!(Registry::global().live_count(), before + 2);

    real.when("now").unwrap().invoke(args![]).unwrap().then_return(7);
    plain.record("a", args![]).unwrap();
    unlisted.record("a", args![]).unwrap();
    assert_eq!(clock.invoke("now", args![]).unwrap(), Value::from(7));

    assert!(registry::reset_all() >= 2);
    assert_eq!(plain.call_count(), 0);
    assert_eq!(real.call_count(), 0);
    assert_eq!(unlisted.call_count(), 1);
    assert_eq!(clock.invoke("now", args![]).unwrap(), Value::from(7));

    assert!(registry::unstub_all() >= 2);
    assert_eq!(clock.invoke("now", args![]).unwrap(), Value::from(0));
    assert_eq!(real.stub_count(), 0);

    drop(plain);
    assert_eq!(Registry::global().live_count(), before + 1);

    {
        let _teardown = Teardown::new(TeardownScope::All);
        real.when("now").unwrap().invoke(args![]).unwrap().then_return(8);
        real.record("now", args![]).unwrap();
    }
    assert_eq!(clock.invoke("now", args![]).unwrap(), Value::from(0));
    assert_eq!(real.call_count(), 0);
}
