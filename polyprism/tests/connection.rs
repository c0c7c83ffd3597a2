use std::collections::BTreeMap;

use polyprism::{
    ErrorClass, ErrorKind, ExecuteOptions, Value,
    prism::{ConnectionResponse, StatementId},
};

mod server;

use server::FRUITS;

#[tokio::test]
async fn fetch_sizes_page_all_rows_in_order() {
    for fetch_size in [1, 5, FRUITS as u32, 60] {
        let (con, harness) = server::connect().await.unwrap();
        let mut cur = con.cursor().await.unwrap();

        let options = ExecuteOptions::default().fetch_size(fetch_size);
        cur.execute_any("sql", "SELECT id, name FROM fruits", (), options).await.unwrap();
        assert_eq!(cur.rowcount(), -1);

        let labels: Vec<_> = cur.description().unwrap().iter().map(|c| c.name()).collect();
        assert_eq!(labels, ["id", "name"]);

        let rows = cur.fetch_all().await.unwrap();
        assert_eq!(rows.len(), FRUITS);
        for (i, row) in rows.into_iter().enumerate() {
            let (id, name) = row.decode::<(i32, String)>().unwrap();
            assert_eq!(id as usize, i + 1);
            assert_eq!(name, format!("fruit-{}", i + 1));
        }

        assert!(cur.fetch_one().await.unwrap().is_none());
        con.close().await.unwrap();

        let log = harness.finish().await;
        let expect_fetches = FRUITS.div_ceil(fetch_size as usize) - 1;
        assert_eq!(log.lock().unwrap().fetches, expect_fetches, "fetch size {fetch_size}");
    }
}

#[tokio::test]
async fn fetch_many_uses_arraysize() {
    let (con, _harness) = server::connect().await.unwrap();
    let mut cur = con.cursor().await.unwrap();
    cur.execute("SELECT id, name FROM fruits", ()).await.unwrap();

    assert_eq!(cur.arraysize(), 1);
    assert_eq!(cur.fetch_many(None).await.unwrap().len(), 1);

    cur.set_arraysize(12);
    let rows = cur.fetch_many(None).await.unwrap();
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[0].try_get::<_, i64>("id").unwrap(), 2);

    assert_eq!(cur.fetch_many(Some(100)).await.unwrap().len(), FRUITS - 13);
    assert!(cur.fetch_many(Some(5)).await.unwrap().is_empty());
}

#[tokio::test]
async fn connection_request() {
    let (con, harness) = server::connect().await.unwrap();
    con.close().await.unwrap();

    let log = harness.finish().await;
    let log = log.lock().unwrap();
    assert_eq!(log.connection, Some((Some(String::from("pa")), false)));
    assert_eq!(log.disconnects, 1);
    assert_eq!(log.rollbacks, 1);
}

#[tokio::test]
async fn close_cascades_to_cursors() {
    let (con, harness) = server::connect().await.unwrap();

    let mut first = con.cursor().await.unwrap();
    let mut second = con.cursor().await.unwrap();
    first.execute("SELECT id, name FROM fruits", ()).await.unwrap();
    second.execute("SELECT id, name FROM fruits", ()).await.unwrap();
    assert_eq!(con.open_cursors().await, 2);

    con.close().await.unwrap();
    con.close().await.unwrap();
    assert!(con.is_closed().await);

    let err = first.fetch_one().await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Programming);
    let err = second.execute("SELECT id, name FROM fruits", ()).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Programming);

    // closing a cursor of a closed connection is a no-op
    first.close().await.unwrap();
    first.close().await.unwrap();
    assert!(first.is_closed());

    let err = con.cursor().await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Programming);
    assert_eq!(con.commit().await.unwrap_err().class(), ErrorClass::Programming);
    assert_eq!(con.rollback().await.unwrap_err().class(), ErrorClass::Programming);

    let log = harness.finish().await;
    let log = log.lock().unwrap();
    let mut closed = log.closed.clone();
    closed.sort_by_key(|id| id.get());
    assert_eq!(closed, [StatementId::new(1), StatementId::new(2)]);
    assert_eq!(log.rollbacks, 1);
    assert_eq!(log.disconnects, 1);
}

#[tokio::test]
async fn cursor_close_releases_statement() {
    let (con, harness) = server::connect().await.unwrap();
    let mut cur = con.cursor().await.unwrap();
    cur.execute("SELECT id, name FROM fruits", ()).await.unwrap();

    cur.close().await.unwrap();
    cur.close().await.unwrap();
    assert_eq!(con.open_cursors().await, 0);
    assert_eq!(cur.fetch_one().await.unwrap_err().class(), ErrorClass::Programming);

    con.close().await.unwrap();
    let log = harness.finish().await;
    assert_eq!(log.lock().unwrap().closed, [StatementId::new(1)]);
}

#[tokio::test]
async fn reexecute_releases_previous_statement() {
    let (con, harness) = server::connect().await.unwrap();
    let mut cur = con.cursor().await.unwrap();
    cur.execute("SELECT id, name FROM fruits", ()).await.unwrap();
    cur.execute("SELECT id, name FROM fruits", ()).await.unwrap();

    let log = harness.log.clone();
    assert_eq!(log.lock().unwrap().closed, [StatementId::new(1)]);

    con.close().await.unwrap();
    harness.finish().await;
    assert_eq!(log.lock().unwrap().closed, [StatementId::new(1), StatementId::new(2)]);
}

#[tokio::test]
async fn dropped_cursor_statement_is_released() {
    let (con, harness) = server::connect().await.unwrap();

    let mut cur = con.cursor().await.unwrap();
    cur.execute("SELECT id, name FROM fruits", ()).await.unwrap();
    drop(cur);
    assert_eq!(con.open_cursors().await, 0);
    assert!(harness.log.lock().unwrap().closed.is_empty());

    con.commit().await.unwrap();
    {
        let log = harness.log.lock().unwrap();
        assert_eq!(log.closed, [StatementId::new(1)]);
        assert_eq!(log.commits, 1);
    }

    con.close().await.unwrap();
    let log = harness.finish().await;
    assert_eq!(log.lock().unwrap().closed.len(), 1);
}

#[tokio::test]
async fn incompatible_server_version() {
    let version = ConnectionResponse {
        is_compatible: true,
        major_api_version: 3,
        minor_api_version: 1,
    };
    let (con, harness) = server::start(version).await;
    let err = con.unwrap_err();

    assert!(matches!(err.kind(), ErrorKind::Incompatible(_)));
    let message = err.to_string();
    assert!(message.contains("2.0"), "{message}");
    assert!(message.contains("3.1"), "{message}");

    let log = harness.finish().await;
    let log = log.lock().unwrap();
    assert_eq!(log.disconnects, 0);
    assert!(log.connection.is_some());
}

#[tokio::test]
async fn incompatible_flag() {
    let version = ConnectionResponse {
        is_compatible: false,
        major_api_version: 2,
        minor_api_version: 0,
    };
    let (con, harness) = server::start(version).await;
    assert!(matches!(con.unwrap_err().kind(), ErrorKind::Incompatible(_)));
    assert_eq!(harness.finish().await.lock().unwrap().disconnects, 0);
}

#[tokio::test]
async fn update_count() {
    let (con, _harness) = server::connect().await.unwrap();
    let mut cur = con.cursor().await.unwrap();

    let err = cur.fetch_one().await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Programming);

    cur.execute("INSERT INTO fruits (id, name) VALUES (31, 'Fig')", ()).await.unwrap();
    assert_eq!(cur.rowcount(), 1);
    assert!(cur.description().is_none());

    let err = cur.fetch_one().await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Programming);

    cur.execute_many(
        "INSERT INTO fruits (id, name) VALUES (?, ?)",
        [(32, "Lime"), (33, "Plum"), (34, "Date")],
    )
    .await
    .unwrap();
    assert_eq!(cur.rowcount(), 3);

    con.commit().await.unwrap();
}

#[tokio::test]
async fn document_results() {
    let (con, _harness) = server::connect().await.unwrap();
    let mut cur = con.cursor().await.unwrap();
    cur.execute_any("mongo", "db.fruits.find({})", (), ExecuteOptions::default().namespace("public"))
        .await
        .unwrap();
    assert!(cur.description().is_none());

    let rows = cur.fetch_all().await.unwrap();
    assert_eq!(rows.len(), 2);

    let row = &rows[0];
    assert_eq!(row.len(), 1);
    assert!(row.columns().is_none());
    let Some(Value::Document(doc)) = row.get(0) else {
        panic!("expected document, found {row:?}");
    };
    assert_eq!(doc.get("name"), Some(&Value::String("Pear".into())));
    let keys: Vec<_> = doc.iter().map(|(key, _)| key).collect();
    assert_eq!(keys, ["_id", "name"]);
}

#[tokio::test]
async fn parameterized_statements() {
    let (con, _harness) = server::connect().await.unwrap();
    let mut cur = con.cursor().await.unwrap();

    cur.execute("SELECT id, name FROM fruits WHERE id = ?", (7,)).await.unwrap();
    let row = cur.fetch_one().await.unwrap().unwrap();
    assert_eq!(row.try_get::<_, String>("name").unwrap(), "fruit-7");
    assert!(cur.fetch_one().await.unwrap().is_none());

    let named = BTreeMap::from([("id", 3)]);
    cur.execute("SELECT id, name FROM fruits WHERE id = :id", named).await.unwrap();
    let (id, name) = cur.fetch_one().await.unwrap().unwrap().decode::<(i64, String)>().unwrap();
    assert_eq!((id, name.as_str()), (3, "fruit-3"));
}

#[tokio::test]
async fn server_error_keeps_session() {
    let (con, harness) = server::connect().await.unwrap();
    let mut cur = con.cursor().await.unwrap();

    let err = cur.execute("SELECT 1 / 0", ()).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Data);
    assert_eq!(err.sqlstate(), Some("22012"));
    assert!(err.to_string().contains("division by zero"));

    // failed prepared execution releases its statement
    let err = cur.execute("SELECT id, name FROM fruits WHERE id = ?", ("seven",)).await.unwrap_err();
    assert_eq!(err.sqlstate(), Some("07001"));
    assert_eq!(harness.log.lock().unwrap().closed, [StatementId::new(1), StatementId::new(2)]);

    cur.execute("SELECT id, name FROM fruits", ()).await.unwrap();
    assert_eq!(cur.fetch_all().await.unwrap().len(), FRUITS);
}

#[tokio::test]
async fn failed_unparameterized_statement_is_closed() {
    let (con, harness) = server::connect().await.unwrap();
    let mut cur = con.cursor().await.unwrap();

    let err = cur.execute("SELECT 1 / 0", ()).await.unwrap_err();
    assert_eq!(err.sqlstate(), Some("22012"));
    assert_eq!(harness.log.lock().unwrap().closed, [StatementId::new(1)]);
    assert_eq!(con.open_cursors().await, 1);

    con.close().await.unwrap();
    let log = harness.finish().await;
    assert_eq!(log.lock().unwrap().closed, [StatementId::new(1)]);
}
