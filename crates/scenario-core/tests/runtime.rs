mod common;

use common::{
    Faulty, Recorder, deferrer_spec, faulty_spec, no_dispatch_env, recorder_spec,
};
use scenario_core::{
    CharmSpec, Error, ErrorClass, Event, Runtime, State,
    config::{RuntimeConfig, SKIP_CONSISTENCY_ENV},
    model::{CharmMeta, Container, Relation},
    workflow::DispatchHooks,
};
use scenario_testkit::{Fake, env_lock};
use serde_cbor::Value;
use std::{cell::RefCell, fs, rc::Rc};

fn runtime<C: scenario_core::Charm>(spec: CharmSpec<C>) -> Runtime<C> {
    Runtime::new(spec, RuntimeConfig::default()).expect("valid config")
}

#[test]
fn relation_event_without_matching_relation_is_inconsistent() {
    let _guard = env_lock();
    let rt = runtime(recorder_spec());

    let bare = rt.exec(&State::new(), &Event::new("db_relation_changed"));
    let wrong = rt.exec(
        &State::new().with_relation(Relation::new("cache", 2)),
        &Event::new("db_relation_changed").with_relation(Relation::new("cache", 2)),
    );

    for result in [bare, wrong] {
        let err = result.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Consistency);
    }
    assert!(no_dispatch_env());
}

#[test]
fn string_config_is_not_coerced_to_integer() {
    let _guard = env_lock();
    let rt = runtime(recorder_spec());

    let err = rt
        .exec(&State::new().with_config("replicas", "3"), &Event::new("start"))
        .unwrap_err();

    let diagnostics = err.diagnostics().expect("inconsistency diagnostics");
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].contains("replicas"));
    assert!(diagnostics[0].contains("integer"));
    assert!(diagnostics[0].contains("string"));
}

#[test]
fn declared_container_ready_succeeds_undeclared_reports_both_sides() {
    let _guard = env_lock();
    let rt = runtime(recorder_spec());
    let state = State::new().with_container(Container::new("cache").connectable());

    let out = rt
        .exec(&state, &Container::new("cache").pebble_ready_event())
        .expect("cache is declared");
    let bag = out.stored("recorder/StoredStateData[_stored]").expect("bag");
    assert_eq!(bag.content["workload"], Value::Text("cache".into()));

    let err = rt
        .exec(&state, &Container::new("other").pebble_ready_event())
        .unwrap_err();
    let diagnostics = err.diagnostics().expect("diagnostics");
    assert_eq!(diagnostics.len(), 2, "{diagnostics:?}");
    assert!(diagnostics.iter().any(|d| d.contains("metadata")));
    assert!(diagnostics.iter().any(|d| d.contains("state")));
}

#[test]
fn environment_is_set_during_dispatch_and_gone_after() {
    let _guard = env_lock();
    let rt = runtime(recorder_spec());
    let seen = Rc::new(RefCell::new(Vec::new()));

    let during = Rc::clone(&seen);
    let hooks = DispatchHooks::new().with_pre_event(move |charm: &Recorder| {
        during.borrow_mut().push((
            charm.unit_name.clone(),
            std::env::var("JUJU_DISPATCH_PATH").ok(),
            std::env::var("JUJU_RELATION_ID").ok(),
        ));
    });

    let relation = Fake::relation(4, "db");
    let state = State::new()
        .with_model(Fake::model(1))
        .with_relation(relation.clone());
    rt.exec_with(&state, &relation.changed_event(), hooks)
        .expect("dispatch");

    assert_eq!(
        seen.borrow().as_slice(),
        &[(
            "recorder/0".to_string(),
            Some("hooks/db_relation_changed".to_string()),
            Some("4".to_string()),
        )]
    );
    assert!(no_dispatch_env());
}

#[test]
fn charm_errors_are_wrapped_and_environment_still_cleared() {
    let _guard = env_lock();
    let rt = runtime(faulty_spec());

    let err = rt.exec(&State::new(), &Event::new("start")).unwrap_err();
    assert!(matches!(err, Error::UncaughtCharm { .. }));
    assert_eq!(err.class(), ErrorClass::Charm);
    let cause = std::error::Error::source(&err).expect("charm error");
    assert_eq!(cause.to_string(), "cannot start workload");
    assert_eq!(
        cause.source().map(ToString::to_string).as_deref(),
        Some("disk full")
    );
    assert!(no_dispatch_env());

    let err = rt.exec(&State::new(), &Event::new("install")).unwrap_err();
    assert!(err.to_string().contains("install exploded"));
    assert!(no_dispatch_env());
}

#[test]
fn unobserved_event_is_a_usage_error() {
    let _guard = env_lock();
    let rt = runtime::<Faulty>(faulty_spec());

    let err = rt.exec(&State::new(), &Event::new("stop")).unwrap_err();

    assert!(matches!(
        err,
        Error::NoObserverRegistered { ref event, ref charm } if event == "stop" && charm == "faulty"
    ));
    assert_eq!(err.class(), ErrorClass::Usage);
    assert!(no_dispatch_env());
}

#[test]
fn dirty_custom_root_fails_before_env_and_store() {
    let _guard = env_lock();
    let root = tempfile::tempdir().expect("tempdir");
    fs::write(root.path().join("metadata.yaml"), "name: stale\n").expect("seed");

    let rt = Runtime::new(
        recorder_spec(),
        RuntimeConfig::default().with_charm_root(root.path()),
    )
    .expect("valid config");
    let err = rt.exec(&State::new(), &Event::new("start")).unwrap_err();

    assert!(matches!(err, Error::DirtyExecutionRoot { ref path } if path == root.path()));
    assert!(!root.path().join(".unit-state.db").exists());
    assert_eq!(
        fs::read_to_string(root.path().join("metadata.yaml")).expect("kept"),
        "name: stale\n"
    );
    assert!(no_dispatch_env());
}

#[test]
fn custom_root_keeps_documents_and_store() {
    let _guard = env_lock();
    let root = tempfile::tempdir().expect("tempdir");

    let rt = Runtime::new(
        recorder_spec(),
        RuntimeConfig::default()
            .with_charm_root(root.path())
            .with_unit_name("recorder/3"),
    )
    .expect("valid config");
    rt.exec(&State::new(), &Event::new("start")).expect("dispatch");

    assert!(root.path().join("metadata.yaml").exists());
    assert!(root.path().join(".unit-state.db").exists());
}

#[test]
fn input_state_is_never_mutated() {
    let _guard = env_lock();
    let rt = runtime(recorder_spec());
    let relation = Fake::relation(9, "db");
    let state = State::new().with_relation(relation.clone());

    let out = rt
        .exec(&state, &relation.changed_event())
        .expect("dispatch");

    assert!(state.relation(9).expect("rel").local_app_data.is_empty());
    assert_eq!(out.relation(9).expect("rel").local_app_data["seen"], "9");
    assert!(state.stored_state.is_empty());
}

#[test]
fn skipping_checks_lets_inconsistent_state_through() {
    let _guard = env_lock();
    let rt = Runtime::new(
        deferrer_spec(),
        RuntimeConfig::default().skipping_consistency_checks(),
    )
    .expect("valid config");

    let out = rt
        .exec(&State::new().with_config("undeclared", 1_i64), &Event::new("update_status"))
        .expect("checks skipped");

    assert_eq!(out.deferred.len(), 1);
}

#[test]
fn skip_env_var_lets_inconsistent_state_through_unless_empty() {
    struct Unset;
    impl Drop for Unset {
        fn drop(&mut self) {
            // SAFETY: env_lock() serialises every test that touches the environment.
            unsafe { std::env::remove_var(SKIP_CONSISTENCY_ENV) };
        }
    }

    let _guard = env_lock();
    let _unset = Unset;
    let rt = runtime(deferrer_spec());
    let state = State::new().with_config("undeclared", 1_i64);

    // SAFETY: env_lock() serialises every test that touches the environment.
    unsafe { std::env::set_var(SKIP_CONSISTENCY_ENV, "1") };
    let out = rt
        .exec(&state, &Event::new("update_status"))
        .expect("checks skipped by env");
    assert_eq!(out.deferred.len(), 1);

    // SAFETY: as above.
    unsafe { std::env::set_var(SKIP_CONSISTENCY_ENV, "") };
    let err = rt.exec(&state, &Event::new("update_status")).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Consistency);
}

#[test]
fn custom_root_store_does_not_leak_between_dispatches() {
    let _guard = env_lock();
    let root = tempfile::tempdir().expect("tempdir");
    fs::write(root.path().join("metadata.yaml"), "name: recorder\n").expect("seed");

    let spec = CharmSpec::<Recorder>::autoload(root.path()).expect("autoload");
    let rt = Runtime::new(spec, RuntimeConfig::default().with_charm_root(root.path()))
        .expect("valid config");

    for _ in 0..2 {
        let out = rt.exec(&State::new(), &Event::new("start")).expect("dispatch");
        let bag = out.stored("recorder/StoredStateData[_stored]").expect("bag");
        assert_eq!(bag.content["start"], Value::Integer(1));
        assert!(out.deferred.is_empty());
    }
}

#[test]
fn autoloaded_spec_may_reuse_its_own_root() {
    let _guard = env_lock();
    let root = tempfile::tempdir().expect("tempdir");
    fs::write(root.path().join("metadata.yaml"), "name: recorder\n").expect("seed");

    let spec = CharmSpec::<Recorder>::autoload(root.path()).expect("autoload");
    let rt = Runtime::new(spec, RuntimeConfig::default().with_charm_root(root.path()))
        .expect("valid config");

    rt.exec(&State::new(), &Event::new("start"))
        .expect("autoloaded spec overwrites");
}

#[test]
fn invalid_runtime_config_is_rejected() {
    let err = Runtime::new(
        CharmSpec::<Recorder>::new(CharmMeta::new("recorder")),
        RuntimeConfig::default().with_unit_name("no-slash"),
    )
    .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Setup);
}
