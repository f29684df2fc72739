//! Nesting behaviour of the adapter against a scripted driver.

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use nestdb::db::{
    Database, DatabaseAccess, LevelState, PhysicalTransactions, QueryDriver,
};
use nestdb::error::{DbError, DriverFault, ErrorKind};
use nestdb::models::{DatabaseType, ParamType, QueryParam, Record};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Begin,
    Commit,
    Rollback,
}

/// Driver that records every physical call and answers from a script.
#[derive(Default)]
struct ScriptedDriver {
    calls: Vec<Call>,
    fail_on: Option<Call>,
    rows: Vec<Record>,
    query_fault: Option<DriverFault>,
    last_params: Vec<QueryParam>,
}

impl ScriptedDriver {
    fn with_rows(rows: Vec<Record>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    fn failing_on(call: Call) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }

    fn record(&mut self, call: Call) -> Result<bool, DriverFault> {
        self.calls.push(call);
        if self.fail_on == Some(call) {
            return Err(DriverFault::new(
                Some("08S01".to_string()),
                "server has gone away",
            ));
        }
        Ok(true)
    }
}

impl PhysicalTransactions for ScriptedDriver {
    async fn begin(&mut self) -> Result<bool, DriverFault> {
        self.record(Call::Begin)
    }

    async fn commit(&mut self) -> Result<bool, DriverFault> {
        self.record(Call::Commit)
    }

    async fn rollback(&mut self) -> Result<bool, DriverFault> {
        self.record(Call::Rollback)
    }
}

impl QueryDriver for ScriptedDriver {
    fn kind(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    fn fetch<'a>(
        &'a mut self,
        _sql: &'a str,
        params: Vec<QueryParam>,
    ) -> BoxStream<'a, Result<Record, DriverFault>> {
        self.last_params = params;
        match self.query_fault.clone() {
            Some(fault) => stream::iter(vec![Err(fault)]).boxed(),
            None => stream::iter(self.rows.clone().into_iter().map(Ok)).boxed(),
        }
    }
}

fn row(n: i64) -> Record {
    let mut r = Record::new();
    r.insert("n".to_string(), json!(n));
    r
}

#[tokio::test]
async fn test_example_scenario_levels_and_physical_calls() {
    let mut db = Database::new(ScriptedDriver::default());
    let mut levels = vec![db.level()];

    assert!(db.start_transaction().await.unwrap());
    levels.push(db.level());
    assert!(db.start_transaction().await.unwrap());
    levels.push(db.level());
    assert!(db.commit_transaction().await.unwrap());
    levels.push(db.level());
    assert!(db.commit_transaction().await.unwrap());
    levels.push(db.level());

    assert_eq!(levels, vec![0, 1, 2, 1, 0]);
    assert_eq!(db.driver().calls, vec![Call::Begin, Call::Commit]);
}

#[tokio::test]
async fn test_nested_begins_issue_one_physical_begin() {
    let mut db = Database::new(ScriptedDriver::default());

    db.start_transaction().await.unwrap();
    assert_eq!(db.driver().calls, vec![Call::Begin]);

    db.start_transaction().await.unwrap();
    db.start_transaction().await.unwrap();
    assert_eq!(db.level(), 3);
    assert_eq!(db.level_state(), LevelState::Open(3));
    assert_eq!(db.driver().calls, vec![Call::Begin]);
}

#[tokio::test]
async fn test_unwinding_commits_physically_only_at_the_end() {
    let mut db = Database::new(ScriptedDriver::default());
    for _ in 0..3 {
        db.start_transaction().await.unwrap();
    }

    db.commit_transaction().await.unwrap();
    db.commit_transaction().await.unwrap();
    assert_eq!(db.level(), 1);
    assert_eq!(db.driver().calls, vec![Call::Begin]);

    db.commit_transaction().await.unwrap();
    assert_eq!(db.level(), 0);
    assert_eq!(db.driver().calls, vec![Call::Begin, Call::Commit]);
}

#[tokio::test]
async fn test_inner_rollback_has_no_physical_effect() {
    let mut db = Database::new(ScriptedDriver::default());
    db.start_transaction().await.unwrap();
    db.start_transaction().await.unwrap();

    assert!(db.rollback_transaction().await.unwrap());
    assert_eq!(db.level(), 1);
    assert_eq!(db.driver().calls, vec![Call::Begin]);

    db.rollback_transaction().await.unwrap();
    assert_eq!(db.driver().calls, vec![Call::Begin, Call::Rollback]);
}

#[tokio::test]
async fn test_inner_rollback_then_outer_commit_still_commits() {
    let mut db = Database::new(ScriptedDriver::default());
    db.start_transaction().await.unwrap();
    db.start_transaction().await.unwrap();
    db.rollback_transaction().await.unwrap();
    db.commit_transaction().await.unwrap();

    assert_eq!(db.driver().calls, vec![Call::Begin, Call::Commit]);
}

/// Every well-nested begin/end sequence forming one outer transaction, with
/// the end operation of each pair alternating between commit and rollback.
fn single_group_sequences(max_pairs: usize) -> Vec<Vec<bool>> {
    fn extend(prefix: Vec<bool>, open: usize, pairs_left: usize, out: &mut Vec<Vec<bool>>) {
        if open == 0 && pairs_left == 0 {
            out.push(prefix);
            return;
        }
        // the outer group must not close before the end
        if pairs_left > 0 && (open > 0 || prefix.is_empty()) {
            let mut next = prefix.clone();
            next.push(true);
            extend(next, open + 1, pairs_left - 1, out);
        }
        if open > 1 || (open == 1 && pairs_left == 0) {
            let mut next = prefix;
            next.push(false);
            extend(next, open - 1, pairs_left, out);
        }
    }

    let mut out = Vec::new();
    for pairs in 1..=max_pairs {
        extend(Vec::new(), 0, pairs, &mut out);
    }
    out
}

#[tokio::test]
async fn test_balanced_sequences_touch_the_driver_twice() {
    let sequences = single_group_sequences(5);
    assert!(sequences.len() > 10);

    for (case, sequence) in sequences.iter().enumerate() {
        let mut db = Database::new(ScriptedDriver::default());
        let mut ends = 0;
        for &begin in sequence {
            if begin {
                db.start_transaction().await.unwrap();
            } else {
                ends += 1;
                if ends % 2 == 0 {
                    db.rollback_transaction().await.unwrap();
                } else {
                    db.commit_transaction().await.unwrap();
                }
            }
            assert!(db.level() >= 0, "case {} went negative", case);
        }

        assert_eq!(db.level(), 0, "case {} did not return to 0", case);
        let calls = &db.driver().calls;
        assert_eq!(calls.len(), 2, "case {}: {:?}", case, calls);
        assert_eq!(calls[0], Call::Begin);
        assert!(matches!(calls[1], Call::Commit | Call::Rollback));
    }
}

#[tokio::test]
async fn test_commit_at_level_zero_corrupts_the_adapter() {
    let mut db = Database::new(ScriptedDriver::default());

    let err = db.commit_transaction().await.unwrap_err();
    match &err {
        DbError::LevelIntegrity { database, level } => {
            assert_eq!(database, db.id());
            assert_eq!(*level, -1);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(db.level(), -1);
    assert_eq!(db.level_state(), LevelState::Corrupt(-1));

    // every later commit/rollback fails too
    let err = db.rollback_transaction().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LevelIntegrity);
    let err = db.commit_transaction().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LevelIntegrity);
    assert_eq!(db.level(), -3);

    // and so does begin, without moving the counter
    let err = db.start_transaction().await.unwrap_err();
    assert!(matches!(err, DbError::LevelIntegrity { level: -3, .. }));
    assert_eq!(db.level(), -3);

    assert!(db.driver().calls.is_empty());
}

#[tokio::test]
async fn test_rollback_at_level_zero_corrupts_the_adapter() {
    let mut db = Database::new(ScriptedDriver::default());
    db.start_transaction().await.unwrap();
    db.rollback_transaction().await.unwrap();

    let err = db.rollback_transaction().await.unwrap_err();
    assert!(matches!(err, DbError::LevelIntegrity { level: -1, .. }));
    assert_eq!(db.driver().calls, vec![Call::Begin, Call::Rollback]);
}

#[tokio::test]
async fn test_begin_fault_leaves_level_at_one() {
    let mut db = Database::new(ScriptedDriver::failing_on(Call::Begin));

    let err = db.start_transaction().await.unwrap_err();
    match &err {
        DbError::Communication {
            database,
            code,
            message,
            ..
        } => {
            assert_eq!(database, db.id());
            assert_eq!(code, "08S01");
            assert_eq!(message, "server has gone away");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(db.level(), 1);

    // the counter now believes a transaction is open: the next begin is nested
    db.start_transaction().await.unwrap();
    assert_eq!(db.level(), 2);
    assert_eq!(db.driver().calls, vec![Call::Begin]);
}

#[tokio::test]
async fn test_rollback_fault_is_communication_error() {
    let mut db = Database::new(ScriptedDriver::failing_on(Call::Rollback));
    db.start_transaction().await.unwrap();

    let err = db.rollback_transaction().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Communication);
    assert!(err.suggestion().is_some());
    assert_eq!(db.level(), 0);
}

#[tokio::test]
async fn test_run_query_streams_rows() {
    let mut db = Database::new(ScriptedDriver::with_rows(vec![row(1), row(2), row(3)]));

    let mut cursor = db.run_query("SELECT n FROM t", &[], &[]).await.unwrap();
    let first = cursor.next().await.unwrap().unwrap();
    assert_eq!(first["n"], json!(1));
    assert_eq!(cursor.rows_read(), 1);

    let rest = cursor.collect_records().await.unwrap();
    assert_eq!(rest.len(), 2);
    assert_eq!(rest[1]["n"], json!(3));
}

#[tokio::test]
async fn test_run_query_fault_is_query_error() {
    let mut driver = ScriptedDriver::default();
    driver.query_fault = Some(DriverFault::new(
        Some("42S02".to_string()),
        "Table 'shop.t' doesn't exist",
    ));
    let mut db = Database::new(driver);
    db.start_transaction().await.unwrap();

    let err = db.run_query("SELECT * FROM t", &[], &[]).await.unwrap_err();
    match &err {
        DbError::Query {
            database,
            code,
            info,
        } => {
            assert_eq!(database, db.id());
            assert_eq!(code, "42S02");
            assert!(info.contains("doesn't exist"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // query failures never move the counter
    assert_eq!(db.level(), 1);
}

#[tokio::test]
async fn test_run_query_applies_hints_before_binding() {
    let mut db = Database::new(ScriptedDriver::default());
    let params = vec![
        QueryParam::String("10".to_string()),
        QueryParam::Int(1),
        QueryParam::Float(0.5),
    ];

    db.run_query("SELECT ?, ?, ?", &params, &[ParamType::Int, ParamType::Bool])
        .await
        .unwrap();

    assert_eq!(
        db.driver().last_params,
        vec![
            QueryParam::Int(10),
            QueryParam::Bool(true),
            QueryParam::Float(0.5)
        ]
    );
}

/// Unit of work written against the capability trait only.
async fn transfer<A: DatabaseAccess>(db: &mut A, fail: bool) -> nestdb::DbResult<()> {
    db.start_transaction().await?;
    db.run_query("UPDATE accounts SET balance = balance - 1", &[], &[])
        .await?;
    if fail {
        db.rollback_transaction().await?;
    } else {
        db.commit_transaction().await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_capability_trait_composes_units_of_work() {
    let mut db = Database::new(ScriptedDriver::default());

    db.start_transaction().await.unwrap();
    transfer(&mut db, false).await.unwrap();
    transfer(&mut db, true).await.unwrap();
    assert_eq!(DatabaseAccess::level(&db), 1);
    db.commit_transaction().await.unwrap();

    assert_eq!(db.driver().calls, vec![Call::Begin, Call::Commit]);
}
