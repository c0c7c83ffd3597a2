//! Prism connection.
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::sync::Mutex;

use crate::{
    Result,
    common::{suppressed, verbose},
    cursor::Cursor,
    error::UsageError,
    prism::{API_MAJOR, API_MINOR, StatementId},
    session::Session,
    statement,
    transport::{Stream, Transport},
};

mod config;

pub use config::{Address, Config, DEFAULT_PORT, ParseError};

/// A single prism connection.
///
/// Connection and all of its cursors share one lock, every operation holds
/// it for the whole request and response exchange.
///
/// Auto commit is always disabled, call [`commit`][Connection::commit] to
/// persist changes. Closing the connection rolls back uncommitted work.
pub struct Connection<T: Transport = Stream> {
    shared: Arc<Mutex<Shared<T>>>,
}

/// State shared between a connection and its cursors.
pub(crate) struct Shared<T> {
    /// `None` after close.
    session: Option<Session<T>>,
    /// Registered cursors and their live statement.
    cursors: HashMap<u64, Option<StatementId>>,
    next_cursor: u64,
    /// Statements of dropped cursors, closed before the next operation.
    orphans: Vec<StatementId>,
}

impl Connection<Stream> {
    /// Connect using url, see [`Config::parse`].
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(Config::parse(url)?).await
    }

    /// Connect using environment variable, see [`Config::from_env`].
    pub async fn connect_env() -> Result<Self> {
        Self::connect_with(Config::from_env()?).await
    }

    /// Connect using [`Config`].
    pub async fn connect_with(config: Config) -> Result<Self> {
        let stream = Stream::connect(&config.address).await?;
        Self::establish(stream, &config).await
    }
}

impl<T: Transport> Connection<T> {
    /// Authenticate over an already handshaked transport.
    ///
    /// The transport is closed without disconnect when the server api
    /// version is incompatible.
    pub async fn establish(transport: T, config: &Config) -> Result<Self> {
        let mut session = Session::new(transport);

        let response = match session.connect(config.user.as_deref(), config.pass.as_deref()).await {
            Ok(ok) => ok,
            Err(err) => {
                abort(&mut session).await;
                return Err(err);
            }
        };

        verbose!(
            compatible = response.is_compatible,
            major = response.major_api_version,
            minor = response.minor_api_version,
            "connected"
        );

        if !response.is_compatible || response.major_api_version != API_MAJOR {
            abort(&mut session).await;
            return Err(Incompatible {
                major: response.major_api_version,
                minor: response.minor_api_version,
            }
            .into());
        }

        let shared = Shared {
            session: Some(session),
            cursors: HashMap::new(),
            next_cursor: 0,
            orphans: Vec::new(),
        };
        Ok(Self { shared: Arc::new(Mutex::new(shared)) })
    }

    /// Create new cursor.
    pub async fn cursor(&self) -> Result<Cursor<T>> {
        let mut shared = self.shared.lock().await;
        shared.session().await?;
        let id = shared.register();
        Ok(Cursor::new(self.shared.clone(), id))
    }

    /// Commit current transaction.
    ///
    /// Note that DDL statements commit implicitly on the server.
    pub async fn commit(&self) -> Result<()> {
        let mut shared = self.shared.lock().await;
        shared.session().await?.commit().await
    }

    /// Rollback current transaction.
    ///
    /// DDL statements can not be rolled back.
    pub async fn rollback(&self) -> Result<()> {
        let mut shared = self.shared.lock().await;
        shared.session().await?.rollback().await
    }

    /// Returns `true` if the connection is closed.
    pub async fn is_closed(&self) -> bool {
        self.shared.lock().await.session.is_none()
    }

    /// Close all cursors, rollback uncommitted work and disconnect.
    ///
    /// Calling it again is a no-op.
    pub async fn close(&self) -> Result<()> {
        let mut shared = self.shared.lock().await;
        let Some(mut session) = shared.session.take() else {
            return Ok(());
        };

        let mut statements: Vec<_> = shared.cursors.drain().filter_map(|(_, id)| id).collect();
        statements.append(&mut shared.orphans);
        for id in statements {
            statement::close_statement(&mut session, id).await;
        }

        if let Err(_err) = session.rollback().await {
            suppressed!("rollback on close failed: {_err}");
        }

        session.close().await
    }
}

impl<T: Transport> fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

async fn abort<T: Transport>(session: &mut Session<T>) {
    if let Err(_err) = session.abort().await {
        suppressed!("failed to close transport: {_err}");
    }
}

impl<T: Transport> Shared<T> {
    /// Returns the open session after closing orphaned statements.
    pub(crate) async fn session(&mut self) -> Result<&mut Session<T>> {
        let Some(session) = self.session.as_mut() else {
            return Err(UsageError::ConnectionClosed.into());
        };
        for id in self.orphans.drain(..) {
            statement::close_statement(session, id).await;
        }
        Ok(session)
    }

    fn register(&mut self) -> u64 {
        let id = self.next_cursor;
        self.next_cursor += 1;
        self.cursors.insert(id, None);
        id
    }

    /// Returns the registry entry of a cursor, [`UsageError::CursorClosed`]
    /// when the cursor or its connection was closed.
    pub(crate) fn entry(&mut self, cursor: u64) -> Result<&mut Option<StatementId>> {
        match self.cursors.get_mut(&cursor) {
            Some(entry) if self.session.is_some() => Ok(entry),
            _ => Err(UsageError::CursorClosed.into()),
        }
    }

    /// Deregister a cursor, returning its live statement.
    pub(crate) fn deregister(&mut self, cursor: u64) -> Option<StatementId> {
        self.cursors.remove(&cursor).flatten()
    }

    /// Queue a statement to be closed before the next operation.
    pub(crate) fn orphan(&mut self, statement: StatementId) {
        self.orphans.push(statement);
    }

    /// Number of registered cursors.
    pub(crate) fn live_cursors(&self) -> usize {
        self.cursors.len()
    }
}

impl<T: Transport> Connection<T> {
    /// Number of cursors that are not closed.
    pub async fn open_cursors(&self) -> usize {
        self.shared.lock().await.live_cursors()
    }
}

/// Server speaks an incompatible prism api version.
pub struct Incompatible {
    pub major: i32,
    pub minor: i32,
}

impl std::error::Error for Incompatible { }

impl fmt::Display for Incompatible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "client api version {API_MAJOR}.{API_MINOR} is incompatible with server api version {}.{}",
            self.major, self.minor
        )
    }
}

impl fmt::Debug for Incompatible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
