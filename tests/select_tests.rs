/// Raw select tests
///
/// Scanning arbitrary SQL results into records, in return and append mode.
/// Run with: cargo test --test select_tests

use std::sync::Arc;

use rustmapper::memory::{MemoryClient, TableDef};
use rustmapper::{
    DatabaseClient, DbError, DbMap, DialectKind, Record, SqlExecutor, SqlExecutorExt, Value,
};

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Invoice {
    id: i64,
    #[record(column = "memo_text")]
    memo: String,
    amount: f64,
    paid: bool,
    version: i64,
}

/// Not registered with any table; scanned purely by field name.
#[derive(Debug, Default, Record)]
struct InvoiceSummary {
    memo: String,
    total: Option<f64>,
}

async fn setup() -> (Arc<MemoryClient>, DbMap) {
    let client = Arc::new(MemoryClient::new());
    client
        .create_table(
            TableDef::new("invoices")
                .auto_increment("id")
                .columns(["memo_text", "amount", "paid", "version"]),
        )
        .unwrap();

    let mut dbmap = DbMap::new(client.clone(), DialectKind::Postgres);
    dbmap
        .add_table_with_name::<Invoice>("invoices")
        .set_keys(true, &["id"])
        .unwrap()
        .set_version_col("version")
        .unwrap();

    for (memo, amount, paid) in [("rent", 1200.0, true), ("power", 80.5, false), ("water", 31.25, false)] {
        let mut inv = Invoice {
            memo: memo.into(),
            amount,
            paid,
            ..Default::default()
        };
        dbmap.insert(&mut [&mut inv]).await.unwrap();
    }

    (client, dbmap)
}

#[tokio::test]
async fn test_select_returns_records() {
    let (_client, dbmap) = setup().await;

    let unpaid = dbmap
        .select::<Invoice>(
            "select * from invoices where paid = $1 order by amount desc",
            &[false.into()],
        )
        .await
        .unwrap();

    let memos: Vec<&str> = unpaid.iter().map(|i| i.memo.as_str()).collect();
    assert_eq!(memos, ["power", "water"]);
    assert_eq!(unpaid[0].version, 1);
}

#[tokio::test]
async fn test_select_into_appends() {
    let (_client, dbmap) = setup().await;

    let mut dest = vec![Invoice {
        memo: "already here".into(),
        ..Default::default()
    }];
    dbmap
        .select_into(&mut dest, "select id, memo_text from invoices where id = $1", &[Value::Integer(3)])
        .await
        .unwrap();

    assert_eq!(dest.len(), 2);
    assert_eq!(dest[0].memo, "already here");
    assert_eq!((dest[1].id, dest[1].memo.as_str()), (3, "water"));
    // columns that were not selected keep their defaults
    assert_eq!(dest[1].amount, 0.0);
}

#[tokio::test]
async fn test_empty_result() {
    let (_client, dbmap) = setup().await;

    let none = dbmap
        .select::<Invoice>("select * from invoices where amount > $1", &[10_000.0.into()])
        .await
        .unwrap();
    assert!(none.is_empty());

    let mut dest: Vec<Invoice> = Vec::new();
    dbmap
        .select_into(&mut dest, "select * from invoices where id = $1", &[Value::Integer(42)])
        .await
        .unwrap();
    assert!(dest.is_empty());
}

#[tokio::test]
async fn test_columns_match_fields_case_insensitively() {
    let (_client, dbmap) = setup().await;

    let rows = dbmap
        .select::<Invoice>("select ID, MEMO_TEXT, Amount from invoices where id = 1", &[])
        .await
        .unwrap();
    assert_eq!(rows[0].memo, "rent");
    assert_eq!(rows[0].amount, 1200.0);

    let rows = dbmap
        .select::<Invoice>("select id, memo_text as Memo from invoices where id = 2", &[])
        .await
        .unwrap();
    assert_eq!(rows[0].memo, "power");

    // "Note" is neither a field, an alias nor a mapped column
    let rows = dbmap
        .select::<Invoice>("select id, memo_text as Note from invoices", &[])
        .await;
    assert!(matches!(rows, Err(DbError::ColumnMismatch { ref column, .. }) if column == "Note"));
}

#[tokio::test]
async fn test_unmapped_type_uses_field_names() {
    let (_client, dbmap) = setup().await;

    let summaries = dbmap
        .select::<InvoiceSummary>(
            "select memo_text as memo, amount as total from invoices order by id limit 2",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[1].memo, "power");
    assert_eq!(summaries[1].total, Some(80.5));

    let err = dbmap
        .select::<InvoiceSummary>("select memo_text from invoices", &[])
        .await
        .unwrap_err();
    match err {
        DbError::ColumnMismatch {
            column,
            type_name,
            query,
        } => {
            assert_eq!(column, "memo_text");
            assert_eq!(type_name, "InvoiceSummary");
            assert_eq!(query, "select memo_text from invoices");
        }
        other => panic!("expected column mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_null_into_required_field_is_an_error() {
    let (client, dbmap) = setup().await;
    client
        .execute("update invoices set memo_text = null where id = 2", &[])
        .await
        .unwrap();

    let err = dbmap
        .select::<Invoice>("select * from invoices where id = 2", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::TypeMismatch(_)));
}

#[tokio::test]
async fn test_raw_exec_and_query() {
    let (_client, dbmap) = setup().await;

    let res = dbmap
        .exec("update invoices set paid = $1 where paid = $2", &[true.into(), false.into()])
        .await
        .unwrap();
    assert_eq!(res.rows_affected, 2);

    let rows = dbmap
        .query("select memo_text from invoices where paid = $1", &[true.into()])
        .await
        .unwrap();
    assert_eq!(rows.row_count(), 3);
    assert_eq!(rows.columns(), &["memo_text".to_string()]);
}
