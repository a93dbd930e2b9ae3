//! Mocks wrapping live objects: patching, restoring and receivers.

use testkit_double::invocation::matcher::{anything, gt, starts_with};
use testkit_double::mock::UnmatchedPolicy;
use testkit_double::prelude::*;
use testkit_double::subject::BindingKind;

fn greeter_class() -> DynObject {
    DynObject::class("Greeter")
        .with_method(
            "greet",
            Binding::instance(|args| Ok(Value::from(format!("hello {}", args.positional()[1])))),
        )
        .with_method("create", Binding::class(|args| Ok(args.positional()[0].clone())))
        .with_method("version", Binding::static_method(|_| Ok(Value::from("1.0"))))
}

fn lenient(subject: &DynObject) -> Mock {
    Mock::builder()
        .subject(subject.clone())
        .strict(false)
        .register(false)
        .build()
}

#[test]
fn test_stub_call_verify_scenario() {
    let mock = Mock::builder().register(false).build();
    mock.begin_stub().unwrap();
    mock.call("foo", args![1])
        .unwrap()
        .into_stub()
        .unwrap()
        .then_return("x");

    assert_eq!(mock.call("foo", args![1]).unwrap().into_value(), Some(Value::from("x")));

    mock.begin_verify(Some(Times::once())).unwrap();
    let outcome = mock.call("foo", args![1]).unwrap();
    assert_eq!(outcome.verified_count(), Some(1));
}

#[test]
fn test_real_subject_scenario() {
    let obj = DynObject::new("obj").with_method("bar", Binding::free(|_| Ok(Value::from(1))));
    let mock = Mock::builder().subject(obj.clone()).register(false).build();

    mock.when("bar").unwrap().invoke(args![]).unwrap().then_return(99);
    assert_eq!(obj.invoke("bar", args![]).unwrap(), Value::from(99));
    assert_eq!(mock.verify().unwrap().called("bar", args![]).unwrap(), 1);

    mock.unstub();
    assert_eq!(obj.invoke("bar", args![]).unwrap(), Value::from(1));
}

#[test]
fn test_narrower_restub_wins_then_unstub_restores() {
    let original = Binding::free(|args| Ok(Value::from(format!("real{}", args.len()))));
    let obj = DynObject::new("store").with_method("get", original.clone());
    let mock = Mock::builder().subject(obj.clone()).register(false).build();

    mock.when("get")
        .unwrap()
        .invoke_matching(ArgsPattern::new().arg(anything()))
        .unwrap()
        .then_return("any");
    mock.when("get").unwrap().invoke(args!["admin"]).unwrap().then_return("admin");

    assert_eq!(obj.invoke("get", args!["admin"]).unwrap(), Value::from("admin"));
    assert_eq!(obj.invoke("get", args!["guest"]).unwrap(), Value::from("any"));
    assert_eq!(mock.patched_members(), vec!["get", "get"]);

    mock.unstub();
    assert!(mock.patched_members().is_empty());
    assert_eq!(obj.binding("get"), Some(original));
    assert_eq!(obj.invoke("get", args!["admin"]).unwrap(), Value::from("real1"));
}

#[test]
fn test_absent_member_round_trip() {
    let obj = DynObject::new("obj");
    let mock = lenient(&obj);
    assert!(!obj.has_member("ghost"));

    mock.when("ghost").unwrap().invoke(args![]).unwrap().then_return("boo");
    assert_eq!(obj.invoke("ghost", args![]).unwrap(), Value::from("boo"));

    mock.unstub();
    assert!(!obj.has_member("ghost"));
    assert!(obj.invoke("ghost", args![]).is_err());
}

#[test]
fn test_inherited_member_round_trip() {
    let class = greeter_class();
    let instance = DynObject::instance_of(&class, "alice");
    let mock = Mock::builder().subject(instance.clone()).register(false).build();

    mock.when("version").unwrap().invoke(args![]).unwrap().then_return("2.0");
    assert_eq!(instance.invoke("version", args![]).unwrap(), Value::from("2.0"));
    assert_eq!(class.invoke("version", args![]).unwrap(), Value::from("1.0"));

    mock.unstub();
    assert!(instance.binding("version").is_none());
    assert_eq!(instance.invoke("version", args![]).unwrap(), Value::from("1.0"));
}

#[test]
fn test_class_receiver_is_stripped() {
    let class = greeter_class();
    let mock = Mock::builder().subject(class.clone()).register(false).build();

    mock.when("greet").unwrap().invoke(args!["bob"]).unwrap().then_return("hi bob");
    mock.when("create").unwrap().with_any_args().unwrap().then_return("created");
    mock.when("version").unwrap().invoke(args![]).unwrap().then_return("3.0");

    assert_eq!(class.invoke("greet", args!["bob"]).unwrap(), Value::from("hi bob"));
    assert_eq!(class.invoke("create", args![7]).unwrap(), Value::from("created"));
    assert_eq!(class.invoke("version", args![]).unwrap(), Value::from("3.0"));

    let recorded = mock.calls_to("create");
    assert_eq!(recorded[0].args(), &args![7]);

    let kinds: Vec<BindingKind> = ["greet", "create", "version"]
        .iter()
        .filter_map(|member| class.binding(member))
        .map(|binding| binding.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![BindingKind::Instance, BindingKind::Class, BindingKind::Static]
    );

    mock.unstub();
    assert_eq!(class.invoke("greet", args!["bob"]).unwrap(), Value::from("hello \"bob\""));
}

#[test]
fn test_instance_receives_no_receiver() {
    let class = greeter_class();
    let instance = DynObject::instance_of(&class, "alice");
    instance.define("greet", Binding::instance(|args| Ok(Value::from(args.len()))));
    let mock = Mock::builder().subject(instance.clone()).register(false).build();

    mock.when("greet")
        .unwrap()
        .invoke_matching(ArgsPattern::new().arg(anything()))
        .unwrap()
        .then_answer(|args| Ok(Value::from(args.len())));
    assert_eq!(instance.invoke("greet", args!["x"]).unwrap(), Value::from(1));
}

#[test]
fn test_matchers_through_patched_member() {
    let obj = DynObject::new("store").with_method("get", Binding::free(|_| Ok(Value::Null)));
    let mock = Mock::builder()
        .subject(obj.clone())
        .unmatched(UnmatchedPolicy::ReturnDefault)
        .default_value(-1)
        .register(false)
        .build();

    mock.when("get")
        .unwrap()
        .invoke_matching(ArgsPattern::new().arg(starts_with("user:")))
        .unwrap()
        .then_return("user");
    mock.when("get")
        .unwrap()
        .invoke_matching(ArgsPattern::new().arg(gt(100)))
        .unwrap()
        .then_return("big");

    assert_eq!(obj.invoke("get", args!["user:1"]).unwrap(), Value::from("user"));
    assert_eq!(obj.invoke("get", args![500]).unwrap(), Value::from("big"));
    assert_eq!(obj.invoke("get", args![5]).unwrap(), Value::from(-1));

    let count = mock
        .verify_times(Times::at_least(1))
        .unwrap()
        .called_matching("get", ArgsPattern::new().arg(gt(0)))
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn test_strict_unexpected_call_through_subject() {
    let obj = DynObject::new("obj")
        .with_method("a", Binding::free(|_| Ok(Value::from("a"))))
        .with_method("b", Binding::free(|_| Ok(Value::from("b"))));
    let mock = Mock::builder().subject(obj.clone()).register(false).build();

    mock.when("a").unwrap().invoke(args![1]).unwrap().then_return("stubbed");
    let err = obj.invoke("a", args![2]).unwrap_err();
    assert!(matches!(err, Error::UnexpectedCall { .. }));
    assert_eq!(obj.invoke("b", args![]).unwrap(), Value::from("b"));
    assert_eq!(mock.call_count(), 1);
}

#[test]
fn test_collaborator_takes_either() {
    fn describe(source: &dyn Dispatch) -> Result<String> {
        let value = source.dispatch("describe", args![])?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    let real = DynObject::new("real").with_method("describe", Binding::free(|_| Ok(Value::from("real"))));
    let mock = Mock::builder().register(false).build();
    mock.when("describe").unwrap().invoke(args![]).unwrap().then_return("fake");

    assert_eq!(describe(&real).unwrap(), "real");
    assert_eq!(describe(&mock).unwrap(), "fake");
    assert_eq!(mock.verify().unwrap().called("describe", args![]).unwrap(), 1);
}
