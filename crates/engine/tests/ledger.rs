use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Clock, DepositCmd, Engine, EngineError, EntryKind, EntryPage, MoneyCents, SortOrder,
    TransferCmd, WithdrawCmd,
};
use migration::MigratorTrait;
use uuid::Uuid;

/// Clock advancing by one second on every reading.
#[derive(Debug)]
struct StepClock(AtomicI64);

impl Clock for StepClock {
    fn now_unix(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_clock(start: i64) -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder()
        .database(db)
        .clock(Arc::new(StepClock(AtomicI64::new(start))))
        .build()
        .await
        .unwrap()
}

async fn file_db() -> (DatabaseConnection, String, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("ledger_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    (db, url, path)
}

async fn engine_with_file_db() -> (Engine, DatabaseConnection, String, std::path::PathBuf) {
    let (db, url, path) = file_db().await;
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    (engine, db, url, path)
}

async fn fail_inserts(db: &DatabaseConnection, when: &str) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_string(
        backend,
        format!(
            "CREATE TRIGGER fail_inserts BEFORE INSERT ON transactions {when} \
             BEGIN SELECT RAISE(ABORT, 'ledger unavailable'); END"
        ),
    ))
    .await
    .unwrap();
}

async fn entry_count(engine: &Engine, account_id: i64) -> usize {
    engine
        .list_entries(account_id, EntryPage::new(0, 1_000, SortOrder::Asc))
        .await
        .unwrap()
        .len()
}

async fn ledger_sum(engine: &Engine, account_id: i64) -> i64 {
    engine
        .list_entries(account_id, EntryPage::new(0, 1_000, SortOrder::Asc))
        .await
        .unwrap()
        .iter()
        .map(|entry| entry.signed_amount())
        .sum()
}

#[tokio::test]
async fn deposit_creates_account_and_entry() {
    let (engine, _db) = engine_with_db().await;

    let entry = engine
        .record_deposit(DepositCmd::new(1, 5_000))
        .await
        .unwrap();
    assert_eq!(entry.account_id, 1);
    assert_eq!(entry.amount, MoneyCents::new(5_000));
    assert_eq!(entry.kind, EntryKind::Deposit);
    assert_eq!(entry.details, "receiving external funds");

    let balance = engine.balance(1).await.unwrap();
    assert_eq!(balance.balance, MoneyCents::new(5_000));
    assert_eq!(ledger_sum(&engine, 1).await, 5_000);
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let (engine, _db) = engine_with_db().await;

    let err = engine.balance(42).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let page = engine
        .list_entries(42, EntryPage::new(0, 10, SortOrder::Desc))
        .await
        .unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_write() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .record_deposit(DepositCmd::new(1, -1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .record_deposit(DepositCmd::new(-1, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAccount(_)));

    let err = engine
        .record_transfer(TransferCmd::new(1, 1, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAccount(_)));

    assert!(matches!(
        engine.balance(1).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
}

#[tokio::test]
async fn zero_amount_deposit_is_recorded() {
    let (engine, _db) = engine_with_db().await;

    engine.record_deposit(DepositCmd::new(3, 0)).await.unwrap();
    assert_eq!(engine.balance(3).await.unwrap().balance, MoneyCents::ZERO);
    assert_eq!(entry_count(&engine, 3).await, 1);
}

#[tokio::test]
async fn overdraft_is_rejected_without_side_effects() {
    let (engine, _db) = engine_with_db().await;
    engine
        .record_deposit(DepositCmd::new(1, 1_000))
        .await
        .unwrap();

    let err = engine
        .record_withdraw(WithdrawCmd::new(1, 1_001))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientFunds { account_id: 1 });

    assert_eq!(engine.balance(1).await.unwrap().balance, MoneyCents::new(1_000));
    assert_eq!(entry_count(&engine, 1).await, 1);
}

#[tokio::test]
async fn withdraw_from_unseen_account_leaves_no_trace() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .record_withdraw(WithdrawCmd::new(9, 1))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientFunds { account_id: 9 });
    assert!(matches!(
        engine.balance(9).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
}

#[tokio::test]
async fn withdraw_down_to_zero_is_allowed() {
    let (engine, _db) = engine_with_db().await;
    engine.record_deposit(DepositCmd::new(1, 700)).await.unwrap();

    let entry = engine
        .record_withdraw(WithdrawCmd::new(1, 700))
        .await
        .unwrap();
    assert_eq!(entry.kind, EntryKind::Withdraw);
    assert_eq!(entry.details, "withdrawal of funds");
    assert_eq!(engine.balance(1).await.unwrap().balance, MoneyCents::ZERO);
}

#[tokio::test]
async fn transfer_moves_funds_with_paired_entries() {
    let (engine, _db) = engine_with_db().await;
    engine
        .record_deposit(DepositCmd::new(1, 5_000))
        .await
        .unwrap();
    engine
        .record_withdraw(WithdrawCmd::new(1, 2_000))
        .await
        .unwrap();

    let (withdraw, deposit) = engine
        .record_transfer(TransferCmd::new(1, 2, 3_000).note("rent"))
        .await
        .unwrap();

    assert_eq!(withdraw.account_id, 1);
    assert_eq!(withdraw.kind, EntryKind::Withdraw);
    assert_eq!(withdraw.details, "transfer to account 2: rent");
    assert_eq!(deposit.account_id, 2);
    assert_eq!(deposit.kind, EntryKind::Deposit);
    assert_eq!(deposit.details, "transfer from account 1: rent");
    assert_eq!(withdraw.timestamp, deposit.timestamp);
    assert_eq!(withdraw.amount, deposit.amount);

    assert_eq!(engine.balance(1).await.unwrap().balance, MoneyCents::ZERO);
    assert_eq!(engine.balance(2).await.unwrap().balance, MoneyCents::new(3_000));
    assert_eq!(ledger_sum(&engine, 1).await, 0);
    assert_eq!(ledger_sum(&engine, 2).await, 3_000);
}

#[tokio::test]
async fn failed_transfer_writes_nothing() {
    let (engine, _db) = engine_with_db().await;
    engine.record_deposit(DepositCmd::new(1, 100)).await.unwrap();

    let err = engine
        .record_transfer(TransferCmd::new(1, 2, 101))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientFunds { account_id: 1 });

    assert_eq!(engine.balance(1).await.unwrap().balance, MoneyCents::new(100));
    assert_eq!(entry_count(&engine, 1).await, 1);
    assert!(matches!(
        engine.balance(2).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert_eq!(entry_count(&engine, 2).await, 0);
}

#[tokio::test]
async fn listing_orders_and_pages_entries() {
    let engine = engine_with_clock(1_000).await;
    for amount in [100, 200, 300] {
        engine
            .record_deposit(DepositCmd::new(1, amount))
            .await
            .unwrap();
    }

    let asc = engine
        .list_entries(1, EntryPage::new(0, 10, SortOrder::Asc))
        .await
        .unwrap();
    let amounts: Vec<i64> = asc.iter().map(|entry| entry.amount.cents()).collect();
    assert_eq!(amounts, vec![100, 200, 300]);
    assert!(asc.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    let desc = engine
        .list_entries(1, EntryPage::new(0, 10, SortOrder::Desc))
        .await
        .unwrap();
    let reversed: Vec<_> = asc.iter().rev().cloned().collect();
    assert_eq!(desc, reversed);

    let second = engine
        .list_entries(1, EntryPage::numbered(2, 2, SortOrder::Asc).unwrap())
        .await
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].amount, MoneyCents::new(300));

    let past_end = engine
        .list_entries(1, EntryPage::new(3, 10, SortOrder::Asc))
        .await
        .unwrap();
    assert!(past_end.is_empty());

    let err = engine
        .list_entries(1, EntryPage::new(0, 0, SortOrder::Asc))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPage(_)));
}

#[tokio::test]
async fn equal_timestamps_fall_back_to_id_order() {
    let (engine, _db) = engine_with_db().await;
    engine.record_deposit(DepositCmd::new(1, 900)).await.unwrap();
    let (withdraw, deposit) = engine
        .record_transfer(TransferCmd::new(1, 2, 400))
        .await
        .unwrap();
    assert!(withdraw.id < deposit.id);

    // Both legs of the transfer share a timestamp; a second transfer back
    // does too.
    let (back_withdraw, back_deposit) = engine
        .record_transfer(TransferCmd::new(2, 1, 400))
        .await
        .unwrap();
    assert_eq!(back_withdraw.timestamp, back_deposit.timestamp);

    let asc = engine
        .list_entries(1, EntryPage::new(0, 10, SortOrder::Asc))
        .await
        .unwrap();
    let desc = engine
        .list_entries(1, EntryPage::new(0, 10, SortOrder::Desc))
        .await
        .unwrap();
    let asc_ids: Vec<i64> = asc.iter().map(|entry| entry.id).collect();
    let mut desc_ids: Vec<i64> = desc.iter().map(|entry| entry.id).collect();
    desc_ids.reverse();
    assert_eq!(asc_ids, desc_ids);
}

#[tokio::test]
async fn reads_are_idempotent() {
    let (engine, _db) = engine_with_db().await;
    engine.record_deposit(DepositCmd::new(1, 250)).await.unwrap();

    let first = engine.balance(1).await.unwrap();
    let second = engine.balance(1).await.unwrap();
    assert_eq!(first, second);

    let page = EntryPage::new(0, 10, SortOrder::Desc);
    assert_eq!(
        engine.list_entries(1, page).await.unwrap(),
        engine.list_entries(1, page).await.unwrap()
    );
}

#[tokio::test]
async fn recompute_matches_stored_balance() {
    let (engine, _db) = engine_with_db().await;
    engine
        .record_deposit(DepositCmd::new(1, 4_000))
        .await
        .unwrap();
    engine
        .record_withdraw(WithdrawCmd::new(1, 1_500))
        .await
        .unwrap();

    let balance = engine.recompute_balance(1).await.unwrap();
    assert_eq!(balance.balance, MoneyCents::new(2_500));
}

#[tokio::test]
async fn recompute_reports_tampered_balance() {
    let (engine, db) = engine_with_db().await;
    engine.record_deposit(DepositCmd::new(1, 500)).await.unwrap();

    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE balances SET balance = ? WHERE account_id = ?",
        vec![999i64.into(), 1i64.into()],
    ))
    .await
    .unwrap();

    let err = engine.recompute_balance(1).await.unwrap_err();
    assert!(matches!(err, EngineError::Inconsistent(_)));
    // Verification never repairs.
    assert_eq!(engine.balance(1).await.unwrap().balance, MoneyCents::new(999));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_withdrawals_never_overdraw() {
    let (engine, _db, _url, path) = engine_with_file_db().await;
    let engine = Arc::new(engine);
    engine
        .record_deposit(DepositCmd::new(1, 100))
        .await
        .unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.record_withdraw(WithdrawCmd::new(1, 80)).await })
        })
        .collect();

    let mut ok = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(EngineError::InsufficientFunds { account_id: 1 }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!((ok, rejected), (1, 1));
    assert_eq!(engine.balance(1).await.unwrap().balance, MoneyCents::new(20));
    assert_eq!(ledger_sum(&engine, 1).await, 20);

    drop(engine);
    let _ = std::fs::remove_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposing_transfers_do_not_deadlock() {
    let (engine, _db, _url, path) = engine_with_file_db().await;
    let engine = Arc::new(engine);
    engine
        .record_deposit(DepositCmd::new(1, 10_000))
        .await
        .unwrap();
    engine
        .record_deposit(DepositCmd::new(2, 10_000))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let engine = Arc::clone(&engine);
        let (from, to) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
        handles.push(tokio::spawn(async move {
            engine.record_transfer(TransferCmd::new(from, to, 100)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let total = engine.balance(1).await.unwrap().balance.cents()
        + engine.balance(2).await.unwrap().balance.cents();
    assert_eq!(total, 20_000);
    engine.recompute_balance(1).await.unwrap();
    engine.recompute_balance(2).await.unwrap();

    drop(engine);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn deposit_overflow_is_rejected_without_side_effects() {
    let (engine, _db) = engine_with_db().await;
    engine
        .record_deposit(DepositCmd::new(1, i64::MAX))
        .await
        .unwrap();

    let err = engine
        .record_deposit(DepositCmd::new(1, 1))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::BalanceOverflow { account_id: 1 });
    assert!(!err.is_validation());

    assert_eq!(engine.balance(1).await.unwrap().balance, MoneyCents::new(i64::MAX));
    assert_eq!(entry_count(&engine, 1).await, 1);
}

#[tokio::test]
async fn failed_entry_insert_rolls_back_balance() {
    let (engine, db) = engine_with_db().await;
    engine.record_deposit(DepositCmd::new(1, 500)).await.unwrap();
    fail_inserts(&db, "").await;

    let err = engine
        .record_deposit(DepositCmd::new(1, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));

    let err = engine
        .record_withdraw(WithdrawCmd::new(1, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));

    assert_eq!(engine.balance(1).await.unwrap().balance, MoneyCents::new(500));
    assert_eq!(entry_count(&engine, 1).await, 1);
    engine.recompute_balance(1).await.unwrap();
}

#[tokio::test]
async fn failed_deposit_leg_rolls_back_transfer() {
    let (engine, db) = engine_with_db().await;
    engine.record_deposit(DepositCmd::new(1, 500)).await.unwrap();
    // Only the second leg of a transfer is a deposit.
    fail_inserts(&db, "WHEN NEW.kind = 'deposit'").await;

    let err = engine
        .record_transfer(TransferCmd::new(1, 2, 200))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));

    assert_eq!(engine.balance(1).await.unwrap().balance, MoneyCents::new(500));
    assert_eq!(entry_count(&engine, 1).await, 1);
    assert!(matches!(
        engine.balance(2).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert_eq!(entry_count(&engine, 2).await, 0);

    // The withdraw leg alone still goes through.
    engine
        .record_withdraw(WithdrawCmd::new(1, 200))
        .await
        .unwrap();
    assert_eq!(engine.balance(1).await.unwrap().balance, MoneyCents::new(300));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn timestamps_follow_commit_order_under_contention() {
    let (db, _url, path) = file_db().await;
    let engine = Arc::new(
        Engine::builder()
            .database(db)
            .clock(Arc::new(StepClock(AtomicI64::new(1_000))))
            .build()
            .await
            .unwrap(),
    );

    let handles: Vec<_> = (0..200)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.record_deposit(DepositCmd::new(1, 1)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let asc = engine
        .list_entries(1, EntryPage::new(0, 1_000, SortOrder::Asc))
        .await
        .unwrap();
    assert_eq!(asc.len(), 200);
    assert!(asc.windows(2).all(|w| w[0].id < w[1].id));
    assert!(asc.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    drop(engine);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn state_survives_restart() {
    let (engine, db, url, path) = engine_with_file_db().await;
    engine
        .record_deposit(DepositCmd::new(7, 1_234))
        .await
        .unwrap();
    engine
        .record_transfer(TransferCmd::new(7, 8, 234))
        .await
        .unwrap();
    drop(engine);
    db.close().await.unwrap();

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();

    assert_eq!(engine.balance(7).await.unwrap().balance, MoneyCents::new(1_000));
    assert_eq!(engine.balance(8).await.unwrap().balance, MoneyCents::new(234));
    assert_eq!(entry_count(&engine, 7).await, 2);

    drop(engine);
    let _ = std::fs::remove_file(path);
}
