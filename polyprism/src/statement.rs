//! Statement lifecycle operation over a [`Session`].
//!
//! - [`execute_unparameterized`]
//! - [`prepare_indexed`], [`execute_indexed`]
//! - [`prepare_named`], [`execute_named`]
//! - [`fetch`]
//! - [`close_statement`]
use crate::{
    Result, codec,
    common::{expect_response, suppressed, verbose},
    prism::{Frame, Request, Response, StatementId, StatementResult},
    session::Session,
    transport::Transport,
    value::Value,
};

/// Reject statement text the wire can not prefix.
fn check_text(language: &str, statement: &str, namespace: Option<&str>) -> Result<()> {
    codec::check_len(language.len(), "language")?;
    codec::check_len(statement.len(), "statement")?;
    codec::check_len(namespace.map_or(0, str::len), "namespace")?;
    Ok(())
}

/// Fetch size that is actually sent, zero means server default.
fn wire_fetch_size(n: Option<u32>) -> Option<i32> {
    match n {
        None | Some(0) => None,
        Some(n) => Some(i32::try_from(n).unwrap_or(i32::MAX)),
    }
}

/// Execute statement text without parameters.
///
/// An acknowledged statement whose result fails is closed before the error
/// is returned.
pub async fn execute_unparameterized<T: Transport>(
    session: &mut Session<T>,
    language: &str,
    statement: &str,
    fetch_size: Option<u32>,
    namespace: Option<&str>,
) -> Result<(StatementId, StatementResult)> {
    verbose!(language, statement, "execute");
    check_text(language, statement, namespace)?;
    let request = Request::ExecuteUnparameterized {
        language: language.into(),
        statement: statement.into(),
        fetch_size: wire_fetch_size(fetch_size),
        namespace: namespace.map(Into::into),
    };
    let ack = session.begin_unparameterized(request).await?;
    match session.finish_unparameterized(&ack).await {
        Ok(result) => Ok((ack.statement_id, result)),
        Err(err) => {
            close_statement(session, ack.statement_id).await;
            Err(err)
        }
    }
}

/// Prepare statement with positional `?` parameters.
pub async fn prepare_indexed<T: Transport>(
    session: &mut Session<T>,
    language: &str,
    statement: &str,
    namespace: Option<&str>,
) -> Result<StatementId> {
    verbose!(language, statement, "prepare indexed");
    check_text(language, statement, namespace)?;
    let request = Request::PrepareIndexed {
        language: language.into(),
        statement: statement.into(),
        namespace: namespace.map(Into::into),
    };
    let response = session.call(request).await?;
    Ok(expect_response!(
        response,
        "PreparedStatementSignature",
        Response::PreparedStatementSignature { statement_id } => statement_id
    ))
}

/// Execute prepared statement with positional parameters.
pub async fn execute_indexed<T: Transport>(
    session: &mut Session<T>,
    statement_id: StatementId,
    parameters: &[Value],
    fetch_size: Option<u32>,
) -> Result<StatementResult> {
    codec::check_len(parameters.len(), "parameter list")?;
    let parameters = parameters
        .iter()
        .map(codec::encode)
        .collect::<Result<Vec<_>, _>>()?;
    let request = Request::ExecuteIndexed {
        statement_id,
        parameters,
        fetch_size: wire_fetch_size(fetch_size),
    };
    let response = session.call(request).await?;
    Ok(expect_response!(response, "StatementResult", Response::StatementResult(r) => r))
}

/// Prepare statement with named `:name` parameters.
pub async fn prepare_named<T: Transport>(
    session: &mut Session<T>,
    language: &str,
    statement: &str,
    namespace: Option<&str>,
) -> Result<StatementId> {
    verbose!(language, statement, "prepare named");
    check_text(language, statement, namespace)?;
    let request = Request::PrepareNamed {
        language: language.into(),
        statement: statement.into(),
        namespace: namespace.map(Into::into),
    };
    let response = session.call(request).await?;
    Ok(expect_response!(
        response,
        "PreparedStatementSignature",
        Response::PreparedStatementSignature { statement_id } => statement_id
    ))
}

/// Execute prepared statement with named parameters.
pub async fn execute_named<T: Transport>(
    session: &mut Session<T>,
    statement_id: StatementId,
    parameters: &[(String, Value)],
    fetch_size: Option<u32>,
) -> Result<StatementResult> {
    codec::check_len(parameters.len(), "parameter list")?;
    let mut encoded = Vec::with_capacity(parameters.len());
    for (name, value) in parameters {
        codec::check_len(name.len(), "parameter name")?;
        encoded.push((name.clone(), codec::encode(value)?));
    }
    let request = Request::ExecuteNamed {
        statement_id,
        parameters: encoded,
        fetch_size: wire_fetch_size(fetch_size),
    };
    let response = session.call(request).await?;
    Ok(expect_response!(response, "StatementResult", Response::StatementResult(r) => r))
}

/// Fetch the next frame of an executed statement.
pub async fn fetch<T: Transport>(
    session: &mut Session<T>,
    statement_id: StatementId,
    fetch_size: Option<u32>,
) -> Result<Frame> {
    verbose!(%statement_id, "fetch");
    let request = Request::Fetch {
        statement_id,
        fetch_size: wire_fetch_size(fetch_size),
    };
    let response = session.call(request).await?;
    Ok(expect_response!(response, "Frame", Response::Frame(f) => f))
}

/// Release the server side statement.
///
/// Failure is logged and suppressed.
pub async fn close_statement<T: Transport>(session: &mut Session<T>, statement_id: StatementId) {
    verbose!(%statement_id, "close statement");
    if let Err(_err) = try_close_statement(session, statement_id).await {
        suppressed!("failed to close statement {statement_id}: {_err}");
    }
}

async fn try_close_statement<T: Transport>(
    session: &mut Session<T>,
    statement_id: StatementId,
) -> Result<()> {
    let response = session.call(Request::CloseStatement { statement_id }).await?;
    expect_response!(response, "CloseStatement", Response::CloseStatement => Ok(()))
}
