//! Example: Patching a live object and restoring it
//!
//! This example shows how a mock takes over members of a real object, how
//! stubs stack up, and how unstubbing and registry sweeps put the object back
//! exactly as it was.

use testkit_double::prelude::*;
use testkit_double::registry;

fn main() -> Result<()> {
    println!("🧰 testkit-double - Patch Round Trip Examples\n");

    example_stub_and_restore()?;
    example_stacked_stubs()?;
    example_class_receivers()?;
    example_registry_sweep()?;

    println!("\n✅ All patching examples completed!");
    Ok(())
}

fn clock() -> DynObject {
    DynObject::new("clock").with_method("now", Binding::free(|_| Ok(Value::from(1_000))))
}

/// Stubbing one member and putting it back
fn example_stub_and_restore() -> Result<()> {
    println!("📌 Example 1: Stub and Restore");
    println!("   Freeze a clock, then hand it back untouched\n");

    let clock = clock();
    let original = clock.binding("now");
    let mock = Mock::of(clock.clone());

    println!("   Real time: {}", clock.invoke("now", args![])?);
    mock.when("now")?.invoke(args![])?.then_return(0);
    println!("   Patched time: {}", clock.invoke("now", args![])?);

    let calls = mock.verify()?.called("now", args![])?;
    println!("   Calls seen by the mock: {calls}");

    mock.unstub();
    println!("   Restored time: {}", clock.invoke("now", args![])?);
    assert_eq!(clock.binding("now"), original);
    println!("   ✓ Original binding is back!\n");
    Ok(())
}

/// Later stubs win; unstubbing unwinds all of them
fn example_stacked_stubs() -> Result<()> {
    println!("📌 Example 2: Stacked Stubs");
    println!("   A narrower stub overrides a broader one\n");

    let store = DynObject::new("store").with_method("get", Binding::free(|_| Ok(Value::Null)));
    let mock = Mock::of(store.clone());

    mock.when("get")?.with_any_args()?.then_return("default");
    mock.when("get")?.invoke(args!["admin"])?.then_return("root");

    println!("   get(\"guest\") -> {}", store.invoke("get", args!["guest"])?);
    println!("   get(\"admin\") -> {}", store.invoke("get", args!["admin"])?);
    println!("   Patched entries: {:?}", mock.patched_members());

    mock.unstub();
    println!("   After unstub: get(\"admin\") -> {}", store.invoke("get", args!["admin"])?);
    println!();
    Ok(())
}

/// Class-like objects pass a receiver that the mock never sees
fn example_class_receivers() -> Result<()> {
    println!("📌 Example 3: Class Receivers");
    println!("   Instance methods on a class get the class as first argument\n");

    let class = DynObject::class("Greeter").with_method(
        "greet",
        Binding::instance(|args| Ok(Value::from(format!("hello from {}", args.positional()[0])))),
    );
    println!("   Real: {}", class.invoke("greet", args!["bob"])?);

    let mock = Mock::of(class.clone());
    mock.when("greet")?.invoke(args!["bob"])?.then_return("hi bob");
    println!("   Patched: {}", class.invoke("greet", args!["bob"])?);
    println!("   Recorded: {}", mock.history()[0]);

    mock.unstub();
    println!();
    Ok(())
}

/// Sweeping every mock at once
fn example_registry_sweep() -> Result<()> {
    println!("📌 Example 4: Registry Sweep");
    println!("   Two mocks stack patches on one object; one sweep undoes both\n");

    let clock = clock();
    let first = Mock::of(clock.clone());
    let second = Mock::of(clock.clone());
    first.when("now")?.invoke(args![])?.then_return(1);
    second.when("now")?.invoke(args![])?.then_return(2);
    println!("   Patched time: {}", clock.invoke("now", args![])?);

    let swept = registry::unstub_all();
    println!("   Swept {swept} mock(s)");
    println!("   Restored time: {}", clock.invoke("now", args![])?);
    assert_eq!(clock.invoke("now", args![])?, Value::from(1_000));
    Ok(())
}
