//! Statement execution and result paging.
//!
//! - [`Cursor`]
//! - [`Params`]
//! - [`ExecuteOptions`]
//! - [`ColumnDescriptor`]
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    fmt,
    sync::Arc,
};
use tokio::sync::Mutex;

use crate::{
    Result, codec,
    common::verbose,
    connection::Shared,
    error::{NotSupported, UsageError},
    prism::{ColumnMeta, Frame, FrameData, StatementId, StatementResult, WireValue},
    row::Row,
    statement,
    transport::{Stream, Transport},
    value::Value,
};

/// Statement parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    /// Execute without preparing.
    #[default]
    None,
    /// Positional parameters, `?` in sql.
    Indexed(Vec<Value>),
    /// Named parameters, `:name` in sql.
    Named(Vec<(String, Value)>),
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Params::None
    }
}

impl<V: Into<Value>> From<Vec<V>> for Params {
    fn from(values: Vec<V>) -> Self {
        Params::Indexed(values.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>, const N: usize> From<[V; N]> for Params {
    fn from(values: [V; N]) -> Self {
        Params::Indexed(values.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>, S> From<HashMap<K, V, S>> for Params {
    fn from(values: HashMap<K, V, S>) -> Self {
        Params::Named(values.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> From<BTreeMap<K, V>> for Params {
    fn from(values: BTreeMap<K, V>) -> Self {
        Params::Named(values.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

macro_rules! params_tuple {
    ($($t:ident $i:tt),*) => {
        impl<$($t),*> From<($($t,)*)> for Params
        where
            $($t: Into<Value>),*
        {
            fn from(values: ($($t,)*)) -> Self {
                Params::Indexed(vec![$(values.$i.into()),*])
            }
        }
    };
}

params_tuple!(T0 0);
params_tuple!(T0 0, T1 1);
params_tuple!(T0 0, T1 1, T2 2);
params_tuple!(T0 0, T1 1, T2 2, T3 3);
params_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4);
params_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);

/// Optional arguments of [`Cursor::execute_any`].
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Rows per frame, `None` or zero for server default.
    pub fetch_size: Option<u32>,
    /// Default namespace of the statement.
    pub namespace: Option<String>,
}

impl ExecuteOptions {
    pub fn fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = Some(fetch_size);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Metadata of a result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub label: String,
    pub precision: i32,
    pub scale: i32,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn name(&self) -> &str {
        &self.label
    }
}

impl From<ColumnMeta> for ColumnDescriptor {
    fn from(meta: ColumnMeta) -> Self {
        Self {
            label: meta.label,
            precision: meta.precision,
            scale: meta.scale,
            nullable: meta.nullable,
        }
    }
}

/// Result of the last executed statement.
enum ResultCursor {
    /// Statement produced an update count.
    NoResult,
    /// Rows pending, more frames may follow unless `last`.
    Streaming {
        statement_id: StatementId,
        rows: VecDeque<Vec<WireValue>>,
        last: bool,
    },
    /// All rows yielded.
    Exhausted,
    Closed,
}

/// A statement handle of a [`Connection`][crate::Connection].
///
/// Re-executing releases the previous statement first.
///
/// Dropping an open cursor does not release its statement immediately, it is
/// released before the next operation on the connection.
pub struct Cursor<T: Transport = Stream> {
    shared: Arc<Mutex<Shared<T>>>,
    id: u64,
    result: Option<ResultCursor>,
    description: Option<Arc<[ColumnDescriptor]>>,
    rowcount: i64,
    arraysize: usize,
    fetch_size: Option<u32>,
    closed: bool,
}

impl<T: Transport> Cursor<T> {
    pub(crate) fn new(shared: Arc<Mutex<Shared<T>>>, id: u64) -> Self {
        Self {
            shared,
            id,
            result: None,
            description: None,
            rowcount: -1,
            arraysize: 1,
            fetch_size: None,
            closed: false,
        }
    }

    /// Execute sql statement.
    ///
    /// ```no_run
    /// # async fn app(con: polyprism::Connection) -> polyprism::Result<()> {
    /// let mut cur = con.cursor().await?;
    /// cur.execute("SELECT name FROM fruits WHERE id = ?", (1,)).await?;
    /// let row = cur.fetch_one().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute(&mut self, sql: &str, params: impl Into<Params>) -> Result<()> {
        self.execute_any("sql", sql, params, ExecuteOptions::default()).await
    }

    /// Execute statement in any query language supported by the server.
    ///
    /// Graph results are not supported.
    pub async fn execute_any(
        &mut self,
        language: &str,
        statement: &str,
        params: impl Into<Params>,
        options: ExecuteOptions,
    ) -> Result<()> {
        let shared = self.shared.clone();
        let mut shared = shared.lock().await;
        self.reset(&mut shared).await?;

        let ExecuteOptions { fetch_size, namespace } = options;
        let namespace = namespace.as_deref();
        let session = shared.session().await?;

        let (statement_id, result) = match params.into() {
            Params::None => {
                statement::execute_unparameterized(session, language, statement, fetch_size, namespace)
                    .await?
            }
            Params::Indexed(values) => {
                let id = statement::prepare_indexed(session, language, statement, namespace).await?;
                match statement::execute_indexed(session, id, &values, fetch_size).await {
                    Ok(result) => (id, result),
                    Err(err) => {
                        statement::close_statement(session, id).await;
                        return Err(err);
                    }
                }
            }
            Params::Named(values) => {
                let id = statement::prepare_named(session, language, statement, namespace).await?;
                match statement::execute_named(session, id, &values, fetch_size).await {
                    Ok(result) => (id, result),
                    Err(err) => {
                        statement::close_statement(session, id).await;
                        return Err(err);
                    }
                }
            }
        };

        let StatementResult { scalar, frame } = result;
        let mut description = None;
        let streaming = match frame {
            Some(frame) => {
                if let FrameData::Relational { columns, .. } = &frame.data {
                    description = Some(columns.iter().cloned().map(ColumnDescriptor::from).collect());
                }
                match frame_rows(frame) {
                    Ok(ok) => Some(ok),
                    Err(err) => {
                        statement::close_statement(session, statement_id).await;
                        return Err(err);
                    }
                }
            }
            None => None,
        };

        *shared.entry(self.id)? = Some(statement_id);
        self.fetch_size = fetch_size;
        self.description = description;

        self.result = match streaming {
            Some((rows, last)) => Some(ResultCursor::Streaming { statement_id, rows, last }),
            None => {
                verbose!(%statement_id, scalar, "no result set");
                self.rowcount = scalar;
                Some(ResultCursor::NoResult)
            }
        };
        Ok(())
    }

    /// Execute the statement once for every parameter set.
    ///
    /// [`rowcount`][Cursor::rowcount] is the sum of all update counts.
    pub async fn execute_many<P, I>(&mut self, sql: &str, params: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<Params>,
    {
        let mut total = 0;
        for params in params {
            self.execute(sql, params).await?;
            if self.rowcount >= 0 {
                total += self.rowcount;
            }
        }
        self.rowcount = total;
        Ok(())
    }

    /// Fetch the next row, fetching next frame from the server when needed.
    ///
    /// Returns `None` when all rows are yielded.
    pub async fn fetch_one(&mut self) -> Result<Option<Row>> {
        let shared = self.shared.clone();
        let mut shared = shared.lock().await;
        shared.entry(self.id)?;

        loop {
            let (statement_id, rows, last) = match &mut self.result {
                None => return Err(UsageError::NotExecuted.into()),
                Some(ResultCursor::NoResult) => return Err(UsageError::NoResultSet.into()),
                Some(ResultCursor::Closed) => return Err(UsageError::CursorClosed.into()),
                Some(ResultCursor::Exhausted) => return Ok(None),
                Some(ResultCursor::Streaming { statement_id, rows, last }) => (*statement_id, rows, last),
            };

            if let Some(values) = rows.pop_front() {
                let values = values
                    .into_iter()
                    .map(codec::decode)
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Some(Row::new(self.description.clone(), values)));
            }

            if *last {
                self.result = Some(ResultCursor::Exhausted);
                return Ok(None);
            }

            let frame = statement::fetch(shared.session().await?, statement_id, self.fetch_size).await?;
            verbose!(%statement_id, offset = frame.offset, rows = frame.data.len(), "frame");
            let (next, is_last) = frame_rows(frame)?;
            *rows = next;
            *last = is_last;
        }
    }

    /// Fetch up to `size` rows, defaults to [`arraysize`][Cursor::arraysize].
    pub async fn fetch_many(&mut self, size: Option<usize>) -> Result<Vec<Row>> {
        let size = size.unwrap_or(self.arraysize);
        let mut rows = Vec::with_capacity(size);
        while rows.len() < size {
            match self.fetch_one().await? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    /// Fetch all remaining rows.
    pub async fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_one().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Release the statement and deregister from the connection.
    ///
    /// Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.result = Some(ResultCursor::Closed);

        let mut shared = self.shared.lock().await;
        if let Some(statement_id) = shared.deregister(self.id) {
            if let Ok(session) = shared.session().await {
                statement::close_statement(session, statement_id).await;
            }
        }
        Ok(())
    }

    /// Columns of the last relational result, `None` before that.
    pub fn description(&self) -> Option<&[ColumnDescriptor]> {
        self.description.as_deref()
    }

    /// Update count of the last statement, `-1` for result sets or before any execute.
    pub fn rowcount(&self) -> i64 {
        self.rowcount
    }

    /// Default row count of [`fetch_many`][Cursor::fetch_many].
    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    pub fn set_arraysize(&mut self, arraysize: usize) {
        self.arraysize = arraysize;
    }

    /// Returns `true` if [`close`][Cursor::close] was called.
    ///
    /// A cursor of a closed connection is not reported here, but every
    /// operation on it fails.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the previous statement and clear result state.
    async fn reset(&mut self, shared: &mut Shared<T>) -> Result<()> {
        if self.closed {
            return Err(UsageError::CursorClosed.into());
        }
        let previous = shared.entry(self.id)?.take();
        if let Some(statement_id) = previous {
            statement::close_statement(shared.session().await?, statement_id).await;
        }
        self.result = None;
        self.description = None;
        self.rowcount = -1;
        Ok(())
    }
}

impl<T: Transport> Drop for Cursor<T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // without the lock the statement stays registered and is released on connection close
        if let Ok(mut shared) = self.shared.try_lock() {
            if let Some(statement_id) = shared.deregister(self.id) {
                shared.orphan(statement_id);
            }
        }
    }
}

impl<T: Transport> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("rowcount", &self.rowcount)
            .field("arraysize", &self.arraysize)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// Split a frame into undecoded rows and its `is_last` flag.
fn frame_rows(frame: Frame) -> Result<(VecDeque<Vec<WireValue>>, bool)> {
    let rows: VecDeque<_> = match frame.data {
        FrameData::Relational { rows, .. } => rows.into(),
        FrameData::Document(docs) => docs.into_iter().map(|doc| vec![WireValue::Document(doc)]).collect(),
        FrameData::Graph(_) => return Err(NotSupported::new("graph result").into()),
    };
    Ok((rows, frame.is_last))
}
