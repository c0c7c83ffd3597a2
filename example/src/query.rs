use std::collections::HashMap;
use polyprism::{Connection, ErrorClass, ExecuteOptions, Result};

pub async fn main() -> Result<()> {
    let conn = Connection::connect_env().await?;
    let mut cur = conn.cursor().await?;

    // Execute

    cur.execute("DROP TABLE IF EXISTS polyprism", ()).await?;
    cur.execute("CREATE TABLE polyprism(id INTEGER PRIMARY KEY, name VARCHAR(64))", ()).await?;

    cur.execute("INSERT INTO polyprism(id, name) VALUES (?, ?)", (1, "Deez")).await?;
    assert_eq!(cur.rowcount(), 1);

    cur.execute_many(
        "INSERT INTO polyprism(id, name) VALUES (?, ?)",
        [(2, "Foo"), (3, "Bar")],
    )
    .await?;
    assert_eq!(cur.rowcount(), 2);

    conn.commit().await?;

    // Queries

    cur.execute("SELECT id, name FROM polyprism ORDER BY id", ()).await?;
    let datas = cur.fetch_all().await?;
    assert_eq!(datas.len(), 3);

    let (_id, name) = datas[0].clone().decode::<(i32, String)>()?;
    assert_eq!(name.as_str(), "Deez");
    assert_eq!(datas[1].try_get::<_, String>("name")?.as_str(), "Foo");

    let params = HashMap::from([("id", 3)]);
    cur.execute("SELECT name FROM polyprism WHERE id = :id", params).await?;
    let row = cur.fetch_one().await?;
    assert!(row.is_some());
    assert!(cur.fetch_one().await?.is_none());

    let options = ExecuteOptions::default().fetch_size(1);
    cur.execute_any("sql", "SELECT id, name FROM polyprism", (), options).await?;
    cur.set_arraysize(2);
    assert_eq!(cur.fetch_many(None).await?.len(), 2);

    // Rollback

    cur.execute("DELETE FROM polyprism", ()).await?;
    conn.rollback().await?;

    // Error case

    let err = cur.execute("SELECT foo FROM polyprism", ()).await.unwrap_err();
    tracing::info!(class = ?err.class(), state = ?err.sqlstate(), "{err}");

    cur.execute("INSERT INTO polyprism(id, name) VALUES (4, 'Baz')", ()).await?;
    let err = cur.fetch_one().await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Programming);

    cur.close().await?;
    conn.close().await?;

    Ok(())
}
