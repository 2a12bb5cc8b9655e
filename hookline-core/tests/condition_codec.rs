use hookline_core::condition::{decode, encode, CallScope, EventScope};
use hookline_core::Condition;
use proptest::prelude::*;

fn name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_]{0,8}(\\.[a-zA-Z][a-zA-Z0-9_]{0,8}){0,3}"
}

fn call_scope() -> impl Strategy<Value = CallScope> {
    prop_oneof![
        Just(CallScope::All),
        name().prop_map(CallScope::Service),
        (name(), name()).prop_map(|(s, m)| CallScope::Method(format!("/{s}/{m}"))),
    ]
}

fn condition() -> impl Strategy<Value = Condition> {
    prop_oneof![
        call_scope().prop_map(Condition::Request),
        call_scope().prop_map(Condition::Response),
        Just(Condition::Event(EventScope::All)),
        name().prop_map(|g| Condition::Event(EventScope::Group(g))),
        name().prop_map(|e| Condition::Event(EventScope::Event(e))),
        name().prop_map(Condition::Function),
    ]
}

proptest! {
    #[test]
    fn decode_inverts_encode(c in condition()) {
        prop_assert_eq!(decode(&encode(&c)), Ok(c));
    }

    #[test]
    fn distinct_conditions_never_collide(a in condition(), b in condition()) {
        prop_assume!(a != b);
        prop_assert_ne!(encode(&a), encode(&b));
    }

    #[test]
    fn group_and_event_of_same_name_differ(n in name()) {
        let group = Condition::event_group(n.clone()).unwrap();
        let event = Condition::event(n).unwrap();
        prop_assert_ne!(group.id(), event.id());
    }
}

#[test]
fn api_shape_and_id_describe_the_same_condition() {
    let from_json: Condition =
        serde_json::from_str(r#"{"event":{"group":"user.human"}}"#).unwrap();
    let from_id: Condition = "event/user.human.*".parse().unwrap();
    assert_eq!(from_json, from_id);
}
