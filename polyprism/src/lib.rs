//! Polypheny Prism Driver
//!
//! # Examples
//!
//! ```no_run
//! use polyprism::Connection;
//!
//! # async fn app() -> polyprism::Result<()> {
//! let con = Connection::connect("plain://pa@localhost:20590").await?;
//! let mut cur = con.cursor().await?;
//!
//! cur.execute("SELECT id, name FROM fruits WHERE name = ?", ("Pear",)).await?;
//!
//! while let Some(row) = cur.fetch_one().await? {
//!     let (id, name) = row.decode::<(i32, String)>()?;
//!     println!("{id}: {name}");
//! }
//!
//! cur.execute("INSERT INTO fruits (id, name) VALUES (?, ?)", (7, "Kiwi")).await?;
//! assert_eq!(cur.rowcount(), 1);
//! con.commit().await?;
//!
//! con.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Other query languages:
//!
//! ```no_run
//! use polyprism::{Connection, ExecuteOptions, Value};
//!
//! # async fn app(con: Connection) -> polyprism::Result<()> {
//! let mut cur = con.cursor().await?;
//! cur.execute_any("mongo", r#"db.fruits.find({"id": 1})"#, (), ExecuteOptions::default())
//!     .await?;
//!
//! if let Some(row) = cur.fetch_one().await? {
//!     let Some(Value::Document(doc)) = row.get(0) else { unreachable!() };
//!     println!("{:?}", doc.get("name"));
//! }
//! # Ok(())
//! # }
//! ```

mod common;
mod ext;
mod net;

// Protocol
pub mod prism;
pub mod transport;
pub mod session;

// Encoding
pub mod value;
pub mod codec;

// Operation
pub mod statement;
pub mod cursor;
pub mod row;
pub mod types;

// Connection
pub mod connection;

mod error;

pub use value::{Document, Interval, Value};
pub use row::{Decode, DecodeError, FromRow, Row};
pub use cursor::{ColumnDescriptor, Cursor, ExecuteOptions, Params};
pub use connection::{Address, Config, Connection};
pub use net::Socket;
pub use transport::{Stream, Transport};
pub use error::{Error, ErrorClass, ErrorKind, NotSupported, Result, ServerError, UsageError};

#[cfg(feature = "json")]
pub use types::Json;

/// Database api level.
pub const API_LEVEL: &str = "2.0";

/// Threads may not share the module.
///
/// Every operation of a connection, and its cursors, is serialized.
pub const THREADSAFETY: u8 = 0;

/// Positional parameter marker, `?`.
pub const PARAM_STYLE: &str = "qmark";

/// Connect using url, see [`Config::parse`].
pub async fn connect(url: &str) -> Result<Connection> {
    Connection::connect(url).await
}
