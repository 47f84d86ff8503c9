mod common;

use common::recording::{Faults, Recorder};
use common::{mappings, Hero};
use ormgate_core::{
    ConnectParams, Entity, OrmError, OrmFacade, RuntimeError, UnitOfWork, UnitOp, UnitState,
};

fn connected(recorder: &Recorder) -> OrmFacade {
    let facade = OrmFacade::new(recorder.runtime(), mappings());
    assert!(facade.connect(&ConnectParams::sqlite("recorded.db")));
    recorder.clear();
    facade
}

#[test]
fn connect_builds_factory_then_updates_schema() {
    let recorder = Recorder::new();
    let facade = OrmFacade::new(recorder.runtime(), mappings());
    assert!(facade.connect(&ConnectParams::sqlite("recorded.db")));
    assert_eq!(recorder.events(), vec!["factory_open", "schema_update"]);
    assert!(facade.has_factory());
}

#[test]
fn schema_failure_during_connect_releases_the_factory() {
    let recorder = Recorder::new();
    recorder.set_faults(Faults {
        schema: true,
        ..Faults::default()
    });
    let facade = OrmFacade::new(recorder.runtime(), mappings());

    let err = facade
        .try_connect(&ConnectParams::sqlite("recorded.db"))
        .unwrap_err();
    assert!(matches!(err, OrmError::Schema(_)));
    assert_eq!(
        recorder.events(),
        vec!["factory_open", "schema_update", "factory_close"]
    );
    assert!(!facade.has_factory());
}

#[test]
fn reconnect_releases_previous_factory_first() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);
    assert!(facade.connect(&ConnectParams::sqlite("other.db")));
    assert_eq!(
        recorder.events(),
        vec!["factory_close", "factory_open", "schema_update"]
    );
}

#[test]
fn successful_save_commits_then_closes() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);

    assert!(facade.save_or_update(&Hero::new(1, "Ada")));
    assert_eq!(
        recorder.events(),
        vec!["open", "begin", "save:1", "commit", "close"]
    );
}

#[test]
fn failing_write_rolls_back_and_skips_the_rest() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);
    recorder.set_faults(Faults {
        write_at: Some(2),
        ..Faults::default()
    });

    let batch = [Hero::new(1, "Ada"), Hero::new(2, "Bob"), Hero::new(3, "Cy")];
    assert!(!facade.save_or_update_all(&batch));
    assert_eq!(
        recorder.events(),
        vec!["open", "begin", "save:1", "save:2!", "rollback", "close"]
    );
    assert_eq!(recorder.count("commit"), 0);
}

#[test]
fn validation_failure_never_reaches_the_session() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);

    let batch = [Hero::new(1, "Ada"), Hero::new(2, " ")];
    let err = facade.try_save_or_update_all(&batch).unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
    assert_eq!(
        recorder.events(),
        vec!["open", "begin", "save:1", "rollback", "close"]
    );
}

#[test]
fn failed_commit_is_rolled_back_before_close() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);
    recorder.set_faults(Faults {
        commit: true,
        ..Faults::default()
    });

    let err = facade.try_delete(&Hero::new(4, "Dee")).unwrap_err();
    assert!(matches!(err, OrmError::Transaction(_)));
    assert_eq!(
        recorder.events(),
        vec!["open", "begin", "delete:4", "commit!", "rollback", "close"]
    );
}

#[test]
fn failing_rollback_still_closes_exactly_once() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);
    recorder.set_faults(Faults {
        write_at: Some(1),
        rollback: true,
        ..Faults::default()
    });

    assert!(!facade.delete(&Hero::new(9, "Ivy")));
    assert_eq!(
        recorder.events(),
        vec!["open", "begin", "delete:9!", "rollback!", "close"]
    );
}

#[test]
fn close_failure_does_not_undo_a_commit() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);
    recorder.set_faults(Faults {
        close: true,
        ..Faults::default()
    });

    assert!(facade.save_or_update(&Hero::new(5, "Eve")));
    assert_eq!(
        recorder.events(),
        vec!["open", "begin", "save:5", "commit", "close!"]
    );
}

#[test]
fn open_failure_leaves_nothing_to_close() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);
    recorder.set_faults(Faults {
        open: true,
        ..Faults::default()
    });

    let err = facade.try_save_or_update(&Hero::new(1, "Ada")).unwrap_err();
    assert!(matches!(err, OrmError::SessionOpen(_)));
    assert!(facade.select_all::<Hero>().is_empty());
    assert!(!facade.is_connected());
    assert_eq!(recorder.events(), vec!["open!", "open!", "open!"]);
}

#[test]
fn begin_failure_closes_the_session_without_rollback() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);
    recorder.set_faults(Faults {
        begin: true,
        ..Faults::default()
    });

    assert!(!facade.save_or_update(&Hero::new(1, "Ada")));
    assert_eq!(recorder.events(), vec!["open", "begin!", "close"]);
}

#[test]
fn reads_use_get_cache_mode_and_no_transaction() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);

    assert!(facade.select_all::<Hero>().is_empty());
    assert_eq!(facade.select_by_id::<Hero>(7), None);
    assert_eq!(
        recorder.events(),
        vec![
            "open",
            "cache:Get",
            "list:heroes",
            "close",
            "open",
            "cache:Get",
            "get:heroes:7",
            "close",
        ]
    );
}

#[test]
fn liveness_check_opens_and_closes_a_throwaway_session() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);

    assert!(facade.is_connected());
    assert_eq!(recorder.events(), vec!["open", "ping", "close"]);
}

#[test]
fn empty_batch_still_runs_one_transaction() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);

    assert!(facade.save_or_update_all::<Hero>(&[]));
    assert_eq!(recorder.events(), vec!["open", "begin", "commit", "close"]);
}

#[test]
fn heterogeneous_batch_runs_in_one_unit() {
    let recorder = Recorder::new();
    let facade = connected(&recorder);
    let ada = Hero::new(1, "Ada");
    let robin = common::Sidekick {
        code: "robin".to_string(),
        hero_id: 1,
    };

    let batch: [&dyn Entity; 2] = [&ada, &robin];
    assert!(facade.save_or_update_all(&batch));
    assert_eq!(
        recorder.events(),
        vec!["open", "begin", "save:1", "save:'robin'", "commit", "close"]
    );
}

#[test]
fn unit_of_work_history_tracks_commit_path() {
    let recorder = Recorder::new();
    let factory = recorder.runtime().open_factory().expect("factory");
    let mut unit = UnitOfWork::begin(factory.as_ref(), UnitOp::SaveOrUpdate).expect("begin");
    assert_eq!(unit.state(), UnitState::TransactionBegun);

    unit.apply(&Hero::new(1, "Ada")).expect("apply");
    unit.commit().expect("commit");
    assert_eq!(
        unit.history(),
        &[
            UnitState::Idle,
            UnitState::SessionOpen,
            UnitState::TransactionBegun,
            UnitState::AllApplied,
            UnitState::Committed,
            UnitState::Closed,
        ]
    );
}

#[test]
fn unit_of_work_rolls_back_on_drop() {
    let recorder = Recorder::new();
    let factory = recorder.runtime().open_factory().expect("factory");
    {
        let mut unit = UnitOfWork::begin(factory.as_ref(), UnitOp::Delete).expect("begin");
        unit.apply(&Hero::new(3, "Cy")).expect("apply");
    }
    assert_eq!(
        recorder.events(),
        vec!["factory_open", "open", "begin", "delete:3", "rollback", "close"]
    );
}

#[test]
fn closed_unit_refuses_further_work() {
    let recorder = Recorder::new();
    let factory = recorder.runtime().open_factory().expect("factory");
    let mut unit = UnitOfWork::begin(factory.as_ref(), UnitOp::SaveOrUpdate).expect("begin");
    unit.rollback();
    assert_eq!(unit.state(), UnitState::Closed);
    assert_eq!(
        unit.history(),
        &[
            UnitState::Idle,
            UnitState::SessionOpen,
            UnitState::TransactionBegun,
            UnitState::RolledBack,
            UnitState::Closed,
        ]
    );

    let err = unit.apply(&Hero::new(1, "Ada")).unwrap_err();
    assert!(matches!(
        err,
        OrmError::Transaction(RuntimeError::NoTransaction)
    ));
    assert!(unit.commit().is_err());
    assert_eq!(recorder.count("close"), 1);
}
