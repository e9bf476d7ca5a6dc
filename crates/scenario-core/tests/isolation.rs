mod common;

use common::{Recorder, no_dispatch_env, recorder_spec};
use scenario_core::{Runtime, State, config::RuntimeConfig, workflow::DispatchHooks};
use scenario_testkit::{Fake, env_lock};
use serde_cbor::Value;
use std::{cell::RefCell, rc::Rc};

fn fired(state: &State, key: &str) -> Option<Value> {
    state
        .stored("recorder/StoredStateData[_stored]")
        .and_then(|bag| bag.content.get(key).cloned())
}

#[test]
fn two_runtimes_only_see_their_own_relation() {
    let _guard = env_lock();
    let one = Runtime::<Recorder>::new(recorder_spec(), RuntimeConfig::default()).expect("config");
    let two = Runtime::<Recorder>::new(
        recorder_spec(),
        RuntimeConfig::default().with_unit_name("recorder/1"),
    )
    .expect("config");

    let rel_one = Fake::relation(11, "db");
    let rel_two = Fake::relation(22, "db");
    let state_one = State::new().with_relation(rel_one.clone());
    let state_two = State::new().with_relation(rel_two.clone());

    let units = Rc::new(RefCell::new(Vec::new()));
    let hooks = |units: &Rc<RefCell<Vec<String>>>| {
        let units = Rc::clone(units);
        DispatchHooks::new().with_post_event(move |charm: &Recorder| {
            units.borrow_mut().push(charm.unit_name.clone());
        })
    };

    let out_one = one
        .exec_with(&state_one, &rel_one.changed_event(), hooks(&units))
        .expect("one");
    let out_two = two
        .exec_with(&state_two, &rel_two.changed_event(), hooks(&units))
        .expect("two");

    assert_eq!(out_one.relation(11).expect("rel").local_app_data["seen"], "11");
    assert_eq!(out_two.relation(22).expect("rel").local_app_data["seen"], "22");
    assert!(out_one.relation(22).is_none());
    assert!(out_two.relation(11).is_none());

    // each session fired its relation-changed exactly once
    assert_eq!(fired(&out_one, "db_changed"), Some(Value::Integer(1)));
    assert_eq!(fired(&out_two, "db_changed"), Some(Value::Integer(1)));
    assert_eq!(*units.borrow(), vec!["recorder/0".to_string(), "recorder/1".to_string()]);
    assert!(no_dispatch_env());
}

#[test]
fn repeated_dispatches_on_one_runtime_do_not_stack_observers() {
    let _guard = env_lock();
    let rt = Runtime::<Recorder>::new(recorder_spec(), RuntimeConfig::default()).expect("config");
    let relation = Fake::relation(5, "db");
    let state = State::new().with_relation(relation.clone());

    for _ in 0..3 {
        let out = rt.exec(&state, &relation.changed_event()).expect("dispatch");
        assert_eq!(fired(&out, "db_changed"), Some(Value::Integer(1)));
    }
}
