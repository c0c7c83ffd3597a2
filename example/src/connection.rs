use std::env::var;
use polyprism::{Config, Connection, Result};

pub async fn main() -> Result<()> {
    if let Ok(url) = var("POLYPHENY_URL") {
        let conn = Connection::connect(&url).await?;
        conn.close().await?;

        let conn = polyprism::connect(&url).await?;
        conn.close().await?;
    }

    let conn = Connection::connect_env().await?;
    let mut cur = conn.cursor().await?;
    cur.execute("SELECT 1", ()).await?;
    assert_eq!(cur.fetch_all().await?.len(), 1);
    conn.close().await?;

    // closing twice is fine
    conn.close().await?;

    let config = Config::from_env()?.user("pa");
    let conn = Connection::connect_with(config).await?;
    conn.close().await?;

    Ok(())
}
