/// Lifecycle hook tests
///
/// Ordering, aborting on error, post_get after a select is fully read, and
/// hooks receiving the transaction as their executor.
/// Run with: cargo test --test hooks_tests

use std::sync::Arc;

use rustmapper::memory::{MemoryClient, TableDef};
use rustmapper::{
    DbError, DbMap, DialectKind, Hooks, Record, Result, SqlExecutor, SqlExecutorExt, Value,
    async_trait,
};

#[derive(Debug, Default, Record)]
#[record(hooks(
    pre_insert,
    post_insert,
    pre_update,
    post_update,
    pre_delete,
    post_delete,
    post_get
))]
struct Audited {
    id: i64,
    name: String,
    version: i64,
    #[record(skip)]
    events: Vec<String>,
}

#[async_trait]
impl Hooks for Audited {
    async fn pre_insert(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        self.events.push(format!("pre_insert id={}", self.id));
        Ok(())
    }

    async fn post_insert(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        self.events.push(format!("post_insert id={}", self.id));
        Ok(())
    }

    async fn pre_update(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        self.events.push(format!("pre_update version={}", self.version));
        Ok(())
    }

    async fn post_update(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        self.events.push(format!("post_update version={}", self.version));
        Ok(())
    }

    async fn pre_delete(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        self.events.push("pre_delete".into());
        Ok(())
    }

    async fn post_delete(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        self.events.push("post_delete".into());
        Ok(())
    }

    async fn post_get(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
        // runs while the select's result is no longer held
        let total = exec.query("select id from audited", &[]).await?.row_count();
        self.events.push(format!("post_get rows={}", total));
        Ok(())
    }
}

/// Refuses to be written without a title.
#[derive(Debug, Default, Record)]
#[record(hooks(pre_insert, post_get))]
struct Strict {
    id: i64,
    title: String,
}

#[async_trait]
impl Hooks for Strict {
    async fn pre_insert(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        if self.title.is_empty() {
            return Err(DbError::Hook("title is required".into()));
        }
        Ok(())
    }

    // rows titled "cursed" cannot be loaded
    async fn post_get(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        if self.title == "cursed" {
            return Err(DbError::Hook("cursed row".into()));
        }
        Ok(())
    }
}

/// Declares no hooks.
#[derive(Debug, Default, Record)]
struct Undeclared {
    id: i64,
}

#[derive(Debug, Default, Record)]
#[record(hooks(post_insert))]
struct Invoice {
    id: i64,
    memo: String,
}

#[async_trait]
impl Hooks for Invoice {
    async fn post_insert(&mut self, exec: &dyn SqlExecutor) -> Result<()> {
        let mut line = InvoiceLine {
            invoice_id: self.id,
            note: format!("line for {}", self.memo),
            ..Default::default()
        };
        exec.insert(&mut [&mut line]).await
    }
}

#[derive(Debug, Default, Record)]
struct InvoiceLine {
    id: i64,
    invoice_id: i64,
    note: String,
}

fn setup() -> (Arc<MemoryClient>, DbMap) {
    let client = Arc::new(MemoryClient::new());
    client
        .create_table(TableDef::new("audited").auto_increment("id").columns(["name", "version"]))
        .unwrap();
    client
        .create_table(TableDef::new("strict").auto_increment("id").column("title"))
        .unwrap();
    client
        .create_table(TableDef::new("invoices").auto_increment("id").column("memo"))
        .unwrap();
    client
        .create_table(
            TableDef::new("invoice_lines")
                .auto_increment("id")
                .columns(["invoice_id", "note"]),
        )
        .unwrap();

    let mut dbmap = DbMap::new(client.clone(), DialectKind::Sqlite);
    dbmap
        .add_table_with_name::<Audited>("audited")
        .set_keys(true, &["id"])
        .unwrap()
        .set_version_col("version")
        .unwrap();
    dbmap
        .add_table_with_name::<Strict>("strict")
        .set_keys(true, &["id"])
        .unwrap();
    dbmap
        .add_table_with_name::<Invoice>("invoices")
        .set_keys(true, &["id"])
        .unwrap();
    dbmap
        .add_table_with_name::<InvoiceLine>("invoice_lines")
        .set_keys(true, &["id"])
        .unwrap();
    (client, dbmap)
}

#[tokio::test]
async fn test_hook_order_around_each_statement() {
    let (_client, dbmap) = setup();

    let mut rec = Audited {
        name: "first".into(),
        ..Default::default()
    };
    dbmap.insert(&mut [&mut rec]).await.unwrap();
    rec.name = "second".into();
    dbmap.update(&mut [&mut rec]).await.unwrap();
    dbmap.delete(&mut [&mut rec]).await.unwrap();

    assert_eq!(
        rec.events,
        vec![
            "pre_insert id=0",
            "post_insert id=1",
            "pre_update version=1",
            "post_update version=2",
            "pre_delete",
            "post_delete",
        ]
    );
}

#[tokio::test]
async fn test_post_get_runs_for_get_and_select() {
    let (_client, dbmap) = setup();

    for name in ["a", "b", "c"] {
        let mut rec = Audited {
            name: name.into(),
            ..Default::default()
        };
        dbmap.insert(&mut [&mut rec]).await.unwrap();
    }

    let one = dbmap.get_one::<Audited>(&[Value::Integer(2)]).await.unwrap().unwrap();
    assert_eq!(one.events, vec!["post_get rows=3"]);

    let all = dbmap
        .select::<Audited>("select * from audited order by id", &[])
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|r| r.events == vec!["post_get rows=3"]));
}

#[tokio::test]
async fn test_pre_insert_error_aborts_batch() {
    let (client, dbmap) = setup();

    let mut good = Strict {
        title: "ok".into(),
        ..Default::default()
    };
    let mut bad = Strict::default();
    let mut never = Strict {
        title: "later".into(),
        ..Default::default()
    };

    let err = dbmap
        .insert(&mut [&mut good, &mut bad, &mut never])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Hook(ref msg) if msg == "title is required"));

    assert_eq!(good.id, 1);
    assert_eq!(never.id, 0);
    assert_eq!(client.row_count("strict").unwrap(), 1);
}

#[tokio::test]
async fn test_post_get_error_fails_select() {
    let (_client, dbmap) = setup();

    let mut cursed = Strict {
        title: "cursed".into(),
        ..Default::default()
    };
    dbmap.insert(&mut [&mut cursed]).await.unwrap();

    let err = dbmap
        .select::<Strict>("select id, title from strict", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Hook(_)));

    let err = dbmap.get_one::<Strict>(&[cursed.id.into()]).await.unwrap_err();
    assert!(matches!(err, DbError::Hook(_)));
}

#[tokio::test]
async fn test_undeclared_hooks_are_not_invoked() {
    let client = Arc::new(MemoryClient::new());
    client.create_table(TableDef::new("undeclared").auto_increment("id")).unwrap();
    let mut dbmap = DbMap::new(client.clone(), DialectKind::Postgres);
    dbmap
        .add_table_with_name::<Undeclared>("undeclared")
        .set_keys(true, &["id"])
        .unwrap();

    let mut rec = Undeclared::default();
    dbmap.insert(&mut [&mut rec]).await.unwrap();
    assert_eq!(rec.id, 1);
    assert_eq!(client.statement_log().len(), 1);
}

#[tokio::test]
async fn test_hook_uses_active_executor() {
    let (client, dbmap) = setup();

    let mut committed = Invoice {
        memo: "paid".into(),
        ..Default::default()
    };
    dbmap.insert(&mut [&mut committed]).await.unwrap();
    assert_eq!(client.row_count("invoice_lines").unwrap(), 1);

    let tx = dbmap.begin().await.unwrap();
    let mut rolled_back = Invoice {
        memo: "draft".into(),
        ..Default::default()
    };
    tx.insert(&mut [&mut rolled_back]).await.unwrap();

    // the hook's insert went through the transaction, not the shared store
    assert_eq!(client.row_count("invoice_lines").unwrap(), 1);
    let lines = tx
        .select::<InvoiceLine>("select * from invoice_lines", &[])
        .await
        .unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].invoice_id, rolled_back.id);

    tx.rollback().await.unwrap();
    assert_eq!(client.row_count("invoices").unwrap(), 1);
    assert_eq!(client.row_count("invoice_lines").unwrap(), 1);
}
