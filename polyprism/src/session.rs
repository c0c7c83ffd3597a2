//! Request and response correlation over a [`Transport`].
use crate::{
    Result,
    common::{expect_response, suppressed, verbose},
    prism::{
        API_MAJOR, API_MINOR, ConnectionResponse, Envelope, ProtocolError, Request, Response,
        StatementId, StatementResult, Wire,
    },
    transport::{Stream, Transport},
};

/// A prism protocol session.
///
/// Every request gets a new id, starting at 1. Exactly one request is in
/// flight at a time.
#[derive(Debug)]
pub struct Session<T = Stream> {
    transport: T,
    next_id: u64,
}

impl<T: Transport> Session<T> {
    /// Create new session over an already handshaked transport.
    pub fn new(transport: T) -> Self {
        Self { transport, next_id: 1 }
    }

    /// Send `request` and receive its single terminal response.
    ///
    /// An error response is returned as [`ErrorKind::Server`][crate::ErrorKind::Server],
    /// the session stays usable afterwards.
    pub async fn call(&mut self, request: Request) -> Result<Response> {
        let id = self.send(request).await?;
        let envelope = self.recv(id).await?;
        if !envelope.last {
            return Err(ProtocolError::NotLast { id }.into());
        }
        Ok(envelope.payload)
    }

    /// Send an unparameterized execute and read its acknowledgement.
    ///
    /// The statement exists on the server from here on, even when
    /// [`finish_unparameterized`][Session::finish_unparameterized] fails.
    pub async fn begin_unparameterized(&mut self, request: Request) -> Result<Acknowledged> {
        let id = self.send(request).await?;

        let ack = self.recv(id).await?;
        let statement_id = expect_response!(
            ack.payload,
            "Statement",
            Response::Statement { statement_id, .. } => statement_id
        );
        verbose!(id, %statement_id, "statement acknowledged");

        Ok(Acknowledged { id, statement_id })
    }

    /// Read the terminal result of an acknowledged unparameterized execute.
    pub async fn finish_unparameterized(&mut self, ack: &Acknowledged) -> Result<StatementResult> {
        let terminal = self.recv(ack.id).await?;
        if !terminal.last {
            return Err(ProtocolError::NotLast { id: ack.id }.into());
        }
        Ok(expect_response!(
            terminal.payload,
            "Statement",
            Response::Statement { result: Some(result), .. } => result
        ))
    }

    /// Authenticate and exchange api versions.
    ///
    /// Compatibility is not enforced here.
    pub async fn connect(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<ConnectionResponse> {
        let request = Request::Connection {
            username: username.map(Into::into),
            password: password.map(Into::into),
            major_api_version: API_MAJOR,
            minor_api_version: API_MINOR,
            auto_commit: false,
        };
        let response = self.call(request).await?;
        Ok(expect_response!(response, "Connection", Response::Connection(c) => c))
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        let response = self.call(Request::Disconnect).await?;
        expect_response!(response, "Disconnect", Response::Disconnect => Ok(()))
    }

    pub async fn commit(&mut self) -> Result<()> {
        let response = self.call(Request::Commit).await?;
        expect_response!(response, "Commit", Response::Commit => Ok(()))
    }

    pub async fn rollback(&mut self) -> Result<()> {
        let response = self.call(Request::Rollback).await?;
        expect_response!(response, "Rollback", Response::Rollback => Ok(()))
    }

    /// Best-effort disconnect, then close the transport.
    pub async fn close(&mut self) -> Result<()> {
        if let Err(_err) = self.disconnect().await {
            suppressed!("disconnect failed: {_err}");
        }
        self.transport.close().await
    }

    /// Close the transport without telling the server.
    pub async fn abort(&mut self) -> Result<()> {
        self.transport.close().await
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(&mut self, request: Request) -> Result<u64> {
        let id = self.next_id;
        self.next_id += 1;

        verbose!(id, request = Request::message_name(request.kind()), "send");

        let envelope = Envelope::new(id, request);
        self.transport.send(&envelope.to_bytes()).await?;
        Ok(id)
    }

    async fn recv(&mut self, id: u64) -> Result<Envelope<Response>> {
        let bytes = self.transport.recv().await?;
        let envelope = Envelope::<Response>::from_bytes(bytes)?;

        verbose!(id = envelope.id, last = envelope.last, response = envelope.payload.name(), "recv");

        if envelope.id != id {
            return Err(ProtocolError::IdMismatch { expect: id, found: envelope.id }.into());
        }

        match envelope.payload {
            Response::Error(err) => Err(err.into()),
            _ => Ok(envelope),
        }
    }
}

/// An unparameterized execute whose terminal result is pending.
#[derive(Debug)]
pub struct Acknowledged {
    id: u64,
    /// Statement created by the server.
    pub statement_id: StatementId,
}
