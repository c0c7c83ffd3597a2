//! In-process prism server over [`tokio::io::duplex`].
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, DuplexStream},
    task::JoinHandle,
};

use polyprism::{
    Config, Connection, Result,
    connection::Address,
    prism::{
        ColumnMeta, ConnectionResponse, Envelope, ErrorResponse, Frame, FrameData, Request,
        Response, StatementId, StatementResult, Wire, WireDocument, WireValue,
    },
    transport::{Stream, TransportKind},
};

/// Rows in the `fruits` table.
pub const FRUITS: usize = 30;

/// Rows per frame when the client leaves it to the server.
const DEFAULT_FETCH_SIZE: usize = 10;

pub type Client = Connection<Stream<DuplexStream>>;

/// Requests the server observed.
#[derive(Debug, Default)]
pub struct Log {
    pub closed: Vec<StatementId>,
    pub commits: usize,
    pub rollbacks: usize,
    pub disconnects: usize,
    pub fetches: usize,
    pub connection: Option<(Option<String>, bool)>,
}

#[derive(Clone, Copy)]
enum Query {
    Fruits,
    FruitById,
    Documents,
    Insert,
    DivideByZero,
}

impl Query {
    fn parse(statement: &str) -> Query {
        match statement {
            s if s.starts_with("db.") => Query::Documents,
            s if s.starts_with("INSERT") => Query::Insert,
            s if s.contains("1 / 0") => Query::DivideByZero,
            s if s.contains("WHERE id") => Query::FruitById,
            _ => Query::Fruits,
        }
    }
}

struct Open {
    rows: Vec<Vec<WireValue>>,
    offset: usize,
}

pub struct Server {
    io: DuplexStream,
    log: Arc<Mutex<Log>>,
    version: ConnectionResponse,
    prepared: HashMap<i32, Query>,
    open: HashMap<i32, Open>,
    next_statement: i32,
}

pub struct Harness {
    pub log: Arc<Mutex<Log>>,
    pub handle: JoinHandle<()>,
}

impl Harness {
    /// Wait for the client to hang up.
    pub async fn finish(self) -> Arc<Mutex<Log>> {
        self.handle.await.unwrap();
        self.log
    }
}

/// Start a server speaking api 2.0.
pub async fn connect() -> Result<(Client, Harness)> {
    let (con, harness) = start(ConnectionResponse {
        is_compatible: true,
        major_api_version: 2,
        minor_api_version: 0,
    })
    .await;
    Ok((con?, harness))
}

/// Start a server answering the connection request with `version`.
pub async fn start(version: ConnectionResponse) -> (Result<Client>, Harness) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let log = Arc::new(Mutex::new(Log::default()));
    let server = Server {
        io: server,
        log: log.clone(),
        version,
        prepared: HashMap::new(),
        open: HashMap::new(),
        next_statement: 1,
    };
    let handle = tokio::spawn(server.run());
    let harness = Harness { log, handle };

    let config = Config::new(Address::Tcp { host: "localhost".into(), port: 20590 })
        .user("pa")
        .password("secret");
    let con = match Stream::handshake(client, TransportKind::Plain).await {
        Ok(stream) => Connection::establish(stream, &config).await,
        Err(err) => Err(err),
    };
    (con, harness)
}

fn fruit(id: usize) -> Vec<WireValue> {
    vec![WireValue::Integer(id as i32), WireValue::String(format!("fruit-{id}"))]
}

fn columns() -> Vec<ColumnMeta> {
    let column = |label: &str, nullable| ColumnMeta {
        label: label.into(),
        precision: 0,
        scale: 0,
        nullable,
    };
    vec![column("id", false), column("name", true)]
}

fn error(message: &str, state: &str) -> Response {
    Response::Error(ErrorResponse {
        message: message.into(),
        state: Some(state.into()),
        code: Some(-1),
    })
}

impl Server {
    async fn run(mut self) {
        let token = TransportKind::Plain.token().as_bytes();
        self.io.write_u8(token.len() as u8).await.unwrap();
        self.io.write_all(token).await.unwrap();

        let len = self.io.read_u8().await.unwrap();
        let mut echo = vec![0u8; len as usize];
        self.io.read_exact(&mut echo).await.unwrap();
        assert_eq!(echo, token);

        loop {
            let Ok(len) = self.io.read_u64_le().await else {
                return;
            };
            let mut buf = vec![0u8; len as usize];
            if self.io.read_exact(&mut buf).await.is_err() {
                return;
            }
            let envelope = Envelope::<Request>::from_bytes(buf.into()).unwrap();
            assert!(envelope.last);
            self.handle(envelope.id, envelope.payload).await;
        }
    }

    async fn reply(&mut self, id: u64, last: bool, payload: Response) {
        let bytes = Envelope { id, last, payload }.to_bytes();
        self.io.write_u64_le(bytes.len() as u64).await.unwrap();
        self.io.write_all(&bytes).await.unwrap();
        self.io.flush().await.unwrap();
    }

    async fn handle(&mut self, id: u64, request: Request) {
        let response = match request {
            Request::Connection { username, auto_commit, .. } => {
                self.log.lock().unwrap().connection = Some((username, auto_commit));
                Response::Connection(self.version)
            }
            Request::Disconnect => {
                self.log.lock().unwrap().disconnects += 1;
                Response::Disconnect
            }
            Request::Commit => {
                self.log.lock().unwrap().commits += 1;
                Response::Commit
            }
            Request::Rollback => {
                self.log.lock().unwrap().rollbacks += 1;
                Response::Rollback
            }
            Request::ExecuteUnparameterized { statement, fetch_size, .. } => {
                // acknowledged before it runs, so a failing statement still exists
                let statement_id = self.allocate();
                let ack = Response::Statement { statement_id, result: None };
                self.reply(id, false, ack).await;
                match self.execute(statement_id, Query::parse(&statement), None, fetch_size) {
                    Ok(result) => Response::Statement { statement_id, result: Some(result) },
                    Err(err) => err,
                }
            }
            Request::PrepareIndexed { statement, .. } | Request::PrepareNamed { statement, .. } => {
                let statement_id = self.allocate();
                self.prepared.insert(statement_id.get(), Query::parse(&statement));
                Response::PreparedStatementSignature { statement_id }
            }
            Request::ExecuteIndexed { statement_id, parameters, fetch_size } => {
                let query = self.prepared[&statement_id.get()];
                let param = parameters.into_iter().next();
                match self.execute(statement_id, query, param, fetch_size) {
                    Ok(result) => Response::StatementResult(result),
                    Err(err) => err,
                }
            }
            Request::ExecuteNamed { statement_id, parameters, fetch_size } => {
                let query = self.prepared[&statement_id.get()];
                let param = parameters.into_iter().find(|(name, _)| name == "id").map(|(_, v)| v);
                match self.execute(statement_id, query, param, fetch_size) {
                    Ok(result) => Response::StatementResult(result),
                    Err(err) => err,
                }
            }
            Request::Fetch { statement_id, fetch_size } => {
                self.log.lock().unwrap().fetches += 1;
                match self.open.get_mut(&statement_id.get()) {
                    Some(open) => Response::Frame(page(open, fetch_size)),
                    None => error("statement not found", "HY010"),
                }
            }
            Request::CloseStatement { statement_id } => {
                self.log.lock().unwrap().closed.push(statement_id);
                self.prepared.remove(&statement_id.get());
                self.open.remove(&statement_id.get());
                Response::CloseStatement
            }
        };
        self.reply(id, true, response).await;
    }

    fn allocate(&mut self) -> StatementId {
        let id = StatementId::new(self.next_statement);
        self.next_statement += 1;
        id
    }

    fn execute(
        &mut self,
        statement_id: StatementId,
        query: Query,
        param: Option<WireValue>,
        fetch_size: Option<i32>,
    ) -> Result<StatementResult, Response> {
        let frame = match query {
            Query::Insert => return Ok(StatementResult { scalar: 1, frame: None }),
            Query::DivideByZero => return Err(error("division by zero", "22012")),
            Query::Documents => {
                let doc = |id: i32, name: &str| WireDocument {
                    entries: vec![
                        (WireValue::String("_id".into()), WireValue::Integer(id)),
                        (WireValue::String("name".into()), WireValue::String(name.into())),
                    ],
                };
                Frame {
                    is_last: true,
                    offset: 0,
                    data: FrameData::Document(vec![doc(1, "Pear"), doc(2, "Kiwi")]),
                }
            }
            Query::Fruits => {
                let mut open = Open { rows: (1..=FRUITS).map(fruit).collect(), offset: 0 };
                let frame = page(&mut open, fetch_size);
                self.open.insert(statement_id.get(), open);
                frame
            }
            Query::FruitById => {
                let Some(WireValue::Integer(id)) = param else {
                    return Err(error("id parameter missing", "07001"));
                };
                let mut open = Open { rows: vec![fruit(id as usize)], offset: 0 };
                let frame = page(&mut open, fetch_size);
                self.open.insert(statement_id.get(), open);
                frame
            }
        };
        Ok(StatementResult { scalar: -1, frame: Some(frame) })
    }
}

fn page(open: &mut Open, fetch_size: Option<i32>) -> Frame {
    let size = fetch_size.map_or(DEFAULT_FETCH_SIZE, |n| n as usize);
    let end = (open.offset + size).min(open.rows.len());
    let rows = open.rows[open.offset..end].to_vec();
    let frame = Frame {
        is_last: end == open.rows.len(),
        offset: open.offset as u64,
        data: FrameData::Relational { columns: columns(), rows },
    };
    open.offset = end;
    frame
}
