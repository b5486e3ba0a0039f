/// Transaction tests
///
/// Mapper operations inside DbMap::begin, with commit, rollback and drop.
/// Run with: cargo test --test transaction_tests

use std::sync::Arc;

use rustmapper::memory::{MemoryClient, TableDef};
use rustmapper::{DbMap, DialectKind, Record, SqlExecutor, SqlExecutorExt, Value};

#[derive(Debug, Default, Clone, Record)]
struct Account {
    id: i64,
    owner: String,
    balance: i64,
    version: i64,
}

fn setup() -> (Arc<MemoryClient>, DbMap) {
    let client = Arc::new(MemoryClient::new());
    client
        .create_table(
            TableDef::new("accounts")
                .auto_increment("id")
                .columns(["owner", "balance", "version"]),
        )
        .unwrap();

    let mut dbmap = DbMap::new(client.clone(), DialectKind::Sqlite);
    dbmap
        .add_table_with_name::<Account>("accounts")
        .set_keys(true, &["id"])
        .unwrap()
        .set_version_col("version")
        .unwrap();
    (client, dbmap)
}

fn account(owner: &str, balance: i64) -> Account {
    Account {
        owner: owner.into(),
        balance,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_commit_publishes_changes() {
    let (client, dbmap) = setup();
    let mut alice = account("alice", 100);
    let mut bob = account("bob", 0);
    dbmap.insert(&mut [&mut alice, &mut bob]).await.unwrap();

    let tx = dbmap.begin().await.unwrap();
    alice.balance -= 40;
    bob.balance += 40;
    assert_eq!(tx.update(&mut [&mut alice, &mut bob]).await.unwrap(), 2);

    // not visible outside the transaction yet
    let outside = dbmap.get_one::<Account>(&[alice.id.into()]).await.unwrap().unwrap();
    assert_eq!(outside.balance, 100);
    let inside = tx.get_one::<Account>(&[alice.id.into()]).await.unwrap().unwrap();
    assert_eq!(inside.balance, 60);

    tx.commit().await.unwrap();

    let after = dbmap.get_one::<Account>(&[bob.id.into()]).await.unwrap().unwrap();
    assert_eq!((after.balance, after.version), (40, 2));

    let log = client.statement_log();
    assert_eq!(log.iter().filter(|sql| *sql == "begin;").count(), 1);
    assert_eq!(log.last().map(String::as_str), Some("select \"id\",\"owner\",\"balance\",\"version\" from \"accounts\" where \"id\"=?;"));
    assert!(log.contains(&"commit;".to_string()));
}

#[tokio::test]
async fn test_rollback_discards_changes() {
    let (client, dbmap) = setup();
    let mut alice = account("alice", 100);
    dbmap.insert(&mut [&mut alice]).await.unwrap();

    let tx = dbmap.begin().await.unwrap();
    let mut carol = account("carol", 5);
    tx.insert(&mut [&mut carol]).await.unwrap();
    tx.delete(&mut [&mut alice]).await.unwrap();
    assert_eq!(
        tx.query("select id from accounts", &[]).await.unwrap().row_count(),
        1
    );
    tx.rollback().await.unwrap();

    assert_eq!(client.row_count("accounts").unwrap(), 1);
    assert!(dbmap.get_one::<Account>(&[alice.id.into()]).await.unwrap().is_some());
}

#[tokio::test]
async fn test_drop_without_commit_rolls_back() {
    let (client, dbmap) = setup();

    {
        let tx = dbmap.begin().await.unwrap();
        let mut dave = account("dave", 1);
        tx.insert(&mut [&mut dave]).await.unwrap();
        assert_eq!(tx.dbmap().registry().len(), 1);
    }

    assert_eq!(client.row_count("accounts").unwrap(), 0);
}

#[tokio::test]
async fn test_lock_conflict_inside_transaction() {
    let (_client, dbmap) = setup();
    let mut acct = account("erin", 10);
    dbmap.insert(&mut [&mut acct]).await.unwrap();

    let mut stale = acct.clone();
    acct.balance = 20;
    dbmap.update(&mut [&mut acct]).await.unwrap();

    let tx = dbmap.begin().await.unwrap();
    stale.balance = 30;
    let err = tx.update(&mut [&mut stale]).await.unwrap_err();
    let lock = err.as_optimistic_lock().unwrap();
    assert!(lock.row_exists);
    assert_eq!(lock.keys, vec![Value::Integer(acct.id)]);
    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn test_raw_exec_in_transaction() {
    let (client, dbmap) = setup();
    let mut acct = account("frank", 10);
    dbmap.insert(&mut [&mut acct]).await.unwrap();

    let tx = dbmap.begin().await.unwrap();
    let res = tx
        .exec("update accounts set balance = balance * 2 where id = ?", &[acct.id.into()])
        .await
        .unwrap();
    assert_eq!(res.rows_affected, 1);
    tx.commit().await.unwrap();

    let rows = client
        .statement_log()
        .into_iter()
        .filter(|sql| sql.starts_with("update accounts"))
        .count();
    assert_eq!(rows, 1);
    let stored = dbmap.get_one::<Account>(&[acct.id.into()]).await.unwrap().unwrap();
    assert_eq!(stored.balance, 20);
}
