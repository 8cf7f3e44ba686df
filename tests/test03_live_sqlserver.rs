//! Runs against a real server when `SQLSERVER_TEST_HOST`, `SQLSERVER_TEST_DATABASE`,
//! `SQLSERVER_TEST_USERNAME` and `SQLSERVER_TEST_PASSWORD` are set
//! (`SQLSERVER_TEST_PORT` optional). Without them every test returns early.

use std::time::{SystemTime, UNIX_EPOCH};

use sqlserver_helpers::prelude::*;

fn live_options() -> Option<SqlServerOptions> {
    let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
    let port = var("SQLSERVER_TEST_PORT")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1433);
    Some(
        SqlServerOptions::builder(
            var("SQLSERVER_TEST_HOST")?,
            var("SQLSERVER_TEST_DATABASE")?,
            var("SQLSERVER_TEST_USERNAME")?,
            var("SQLSERVER_TEST_PASSWORD")?,
        )
        .port(port)
        .finish(),
    )
}

fn unique_table(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}_{nanos}")
}

async fn create_table(db: &mut SqlServer, table: &str) {
    let ddl = format!(
        "CREATE TABLE [dbo].[{table}] (id INT NOT NULL, label NVARCHAR(50) NULL, as_of_dtm DATETIME2(7) NULL)"
    );
    db.do_query(&ddl, QueryOptions::default().with_commit(true))
        .await
        .unwrap();
}

async fn drop_table(db: &mut SqlServer, table: &str) {
    let ddl = format!("DROP TABLE IF EXISTS [dbo].[{table}]");
    db.do_query(&ddl, QueryOptions::default().with_commit(true))
        .await
        .unwrap();
}

async fn count(db: &mut SqlServer, table: &str) -> i64 {
    let rs = db
        .do_query(
            &format!("SELECT COUNT(*) AS n FROM [dbo].[{table}]"),
            QueryOptions::default(),
        )
        .await
        .unwrap();
    *rs.results[0].get("n").unwrap().as_int().unwrap()
}

#[tokio::test]
async fn select_one() {
    let Some(opts) = live_options() else {
        return;
    };
    let mut db = SqlServer::connect(opts).await.unwrap();
    let rs = db.do_query("SELECT 1", QueryOptions::default()).await.unwrap();
    assert_eq!(rs.len(), 1);
    assert_eq!(rs.results[0].get_by_index(0), Some(&RowValues::Int(1)));

    let rs = db
        .do_query(
            "SELECT ? AS a, ? AS b",
            QueryOptions::default().with_params(vec![RowValues::Int(5), "x".into()]),
        )
        .await
        .unwrap();
    assert_eq!(rs.results[0].get("a"), Some(&RowValues::Int(5)));
    assert_eq!(rs.results[0].get("b"), Some(&RowValues::Text("x".into())));
    db.close().await.unwrap();
}

#[tokio::test]
async fn uncommitted_writes_are_rolled_back_on_close() {
    let Some(opts) = live_options() else {
        return;
    };
    let table = unique_table("helpers_rollback");
    let mut db = SqlServer::connect(opts.clone()).await.unwrap();
    create_table(&mut db, &table).await;

    db.do_query(
        &format!("INSERT INTO [dbo].[{table}] (id) VALUES (?)"),
        QueryOptions::default().with_params(vec![RowValues::Int(1)]),
    )
    .await
    .unwrap();
    db.close().await.unwrap();

    let mut db = SqlServer::connect(opts).await.unwrap();
    assert_eq!(count(&mut db, &table).await, 0);
    drop_table(&mut db, &table).await;
    db.close().await.unwrap();
}

#[tokio::test]
async fn write_paginate_and_mirror() {
    let Some(opts) = live_options() else {
        return;
    };
    let source = unique_table("helpers_src");
    let dest = unique_table("helpers_dst");
    let mut db = SqlServer::connect(opts).await.unwrap();
    create_table(&mut db, &source).await;
    create_table(&mut db, &dest).await;

    let records: Vec<Vec<RowValues>> = (0..250)
        .map(|i| vec![RowValues::Int(i), RowValues::Text(format!("row {i}"))])
        .collect();
    let written = db
        .write_records(
            &records,
            &["id", "label"],
            &source,
            WriteOptions::default().with_dtm_column(0).with_page_size(100),
        )
        .await
        .unwrap();
    assert_eq!(written, 250);
    assert_eq!(count(&mut db, &source).await, 250);

    let (page, next) = db
        .do_query_paginated(
            &format!("SELECT id, as_of_dtm FROM [dbo].[{source}] ORDER BY id"),
            200,
            100,
            QueryOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(next, 300);
    assert_eq!(page.len(), 50);
    assert_eq!(page.results[0].get("id"), Some(&RowValues::Int(200)));
    assert!(page.results[0].get("as_of_dtm").unwrap().as_timestamp().is_some());

    let mirrored = db
        .mirror_table_within(
            &source,
            &["id", "label"],
            &dest,
            MirrorOptions::default()
                .with_page_size(40)
                .with_limit(Some(90))
                .with_where("id >= 10"),
        )
        .await
        .unwrap();
    assert_eq!(mirrored, 90);
    assert_eq!(count(&mut db, &dest).await, 90);

    let err = db
        .do_query_paginated("SELECT 1", 0, 10, QueryOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_parameter_error());

    drop_table(&mut db, &source).await;
    drop_table(&mut db, &dest).await;
    db.close().await.unwrap();
}

async fn scalar(db: &mut SqlServer, sql: &str) -> i64 {
    let rs = db.do_query(sql, QueryOptions::default()).await.unwrap();
    *rs.results[0].get_by_index(0).unwrap().as_int().unwrap()
}

async fn insert_ids(db: &mut SqlServer, table: &str, ids: std::ops::Range<i64>, commit: bool) {
    let sets = ids.map(|i| vec![RowValues::Int(i)]).collect();
    db.do_query(
        &format!("INSERT INTO [dbo].[{table}] (id) VALUES (?)"),
        QueryOptions::default().with_many(sets).with_commit(commit),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn implicit_transactions_outlive_connect() {
    let Some(opts) = live_options() else {
        return;
    };
    // IMPLICIT_TRANSACTIONS is bit 2 of @@OPTIONS
    let mut db = SqlServer::connect(opts.clone()).await.unwrap();
    assert_eq!(scalar(&mut db, "SELECT @@OPTIONS & 2").await, 2);
    db.close().await.unwrap();

    let opts = SqlServerOptions { autocommit: true, ..opts };
    let mut db = SqlServer::connect(opts).await.unwrap();
    assert_eq!(scalar(&mut db, "SELECT @@OPTIONS & 2").await, 0);
    db.close().await.unwrap();
}

#[tokio::test]
async fn commit_and_rollback_control_pending_writes() {
    let Some(opts) = live_options() else {
        return;
    };
    let table = unique_table("helpers_txn");
    let mut db = SqlServer::connect(opts.clone()).await.unwrap();
    create_table(&mut db, &table).await;

    insert_ids(&mut db, &table, 0..2, false).await;
    assert_eq!(scalar(&mut db, "SELECT @@TRANCOUNT").await, 1);
    db.rollback().await.unwrap();
    assert_eq!(count(&mut db, &table).await, 0);

    insert_ids(&mut db, &table, 0..3, false).await;
    db.commit().await.unwrap();
    assert_eq!(scalar(&mut db, "SELECT @@TRANCOUNT").await, 0);
    db.close().await.unwrap();

    let mut db = SqlServer::connect(opts).await.unwrap();
    assert_eq!(count(&mut db, &table).await, 3);
    drop_table(&mut db, &table).await;
    db.close().await.unwrap();
}

#[tokio::test]
async fn truncate_table_empties_and_commits() {
    let Some(opts) = live_options() else {
        return;
    };
    let table = unique_table("helpers_trunc");
    let mut db = SqlServer::connect(opts.clone()).await.unwrap();
    create_table(&mut db, &table).await;
    insert_ids(&mut db, &table, 0..5, true).await;
    assert_eq!(count(&mut db, &table).await, 5);

    assert!(db.truncate_table(&format!("[dbo].[{table}]")).await.unwrap());
    db.close().await.unwrap();

    let mut db = SqlServer::connect(opts).await.unwrap();
    assert_eq!(count(&mut db, &table).await, 0);

    let err = db.truncate_table("[dbo].[no_such_table_here]").await.unwrap_err();
    assert!(err.to_string().starts_with("truncate_table(): SqlServer "));
    db.rollback().await.unwrap();

    drop_table(&mut db, &table).await;
    db.close().await.unwrap();
}

#[tokio::test]
async fn mirror_between_connections_respects_order_and_limit() {
    let Some(opts) = live_options() else {
        return;
    };
    let source = unique_table("helpers_msrc");
    let dest = unique_table("helpers_mdst");
    let mut src = SqlServer::connect(opts.clone()).await.unwrap();
    let mut dst = SqlServer::connect(opts).await.unwrap();
    create_table(&mut src, &source).await;
    create_table(&mut dst, &dest).await;
    insert_ids(&mut src, &source, 0..20, true).await;
    insert_ids(&mut dst, &dest, 100..103, true).await;

    let mirrored = src
        .mirror_table(
            &source,
            &["id", "label"],
            &mut dst,
            &dest,
            MirrorOptions::default()
                .with_order_by(0, true)
                .with_page_size(3)
                .with_limit(Some(5))
                .with_dtm_column(2),
        )
        .await
        .unwrap();
    assert_eq!(mirrored, 5);

    // the destination was truncated, then got the five highest ids
    assert_eq!(count(&mut dst, &dest).await, 5);
    let lowest = scalar(&mut dst, &format!("SELECT MIN(id) FROM [dbo].[{dest}]")).await;
    assert_eq!(lowest, 15);
    let stamped = scalar(
        &mut dst,
        &format!("SELECT COUNT(*) FROM [dbo].[{dest}] WHERE as_of_dtm IS NOT NULL"),
    )
    .await;
    assert_eq!(stamped, 5);

    let err = src
        .mirror_table(
            &source,
            &["id"],
            &mut dst,
            &dest,
            MirrorOptions::default().with_order_by(1, false),
        )
        .await
        .unwrap_err();
    assert!(err.is_parameter_error());

    drop_table(&mut src, &source).await;
    drop_table(&mut dst, &dest).await;
    src.close().await.unwrap();
    dst.close().await.unwrap();
}
