use polyprism::{Connection, Document, ExecuteOptions, Json, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Fruit {
    name: String,
}

pub async fn main() -> Result<()> {
    let conn = Connection::connect_env().await?;
    let mut cur = conn.cursor().await?;

    let options = ExecuteOptions::default().namespace("public");
    cur.execute_any("mongo", r#"db.fruits.insertOne({"name": "Pear"})"#, (), options.clone())
        .await?;

    cur.execute_any("mongo", "db.fruits.find({})", (), options).await?;
    while let Some(row) = cur.fetch_one().await? {
        let doc = row.try_get::<_, Document>(0)?;
        tracing::info!(len = doc.len(), "{:?}", doc.get("name"));

        let Json(fruit) = row.try_get::<_, Json<Fruit>>(0)?;
        tracing::info!("{fruit:?}");
    }

    conn.commit().await?;
    conn.close().await?;

    Ok(())
}
