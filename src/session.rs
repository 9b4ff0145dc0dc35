//! Blocking SQL Server sessions.
//!
//! tiberius is async-only. A session owns a current-thread tokio runtime and
//! blocks on each call, so callers stay synchronous. A session is meant to be
//! opened, used for a statement or two, and closed again. It must not be used
//! from inside another tokio runtime.
use std::process::Command;

use tiberius::error::Error as SqlError;
use tiberius::{Client, Config};
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::connection_string::ConnectionString;
use crate::error::{Result, TempDbError};

/// Data source prefix that selects a LocalDB instance, e.g. `(localdb)\MSSQLLocalDB`.
pub const LOCALDB_LOCATOR: &str = "(localdb)";

enum Transport {
    Tcp(Compat<tokio::net::TcpStream>),
    #[cfg(windows)]
    Pipe(Compat<tokio::net::windows::named_pipe::NamedPipeClient>),
}

enum SessionClient {
    Tcp(Client<Compat<tokio::net::TcpStream>>),
    #[cfg(windows)]
    Pipe(Client<Compat<tokio::net::windows::named_pipe::NamedPipeClient>>),
}

// Both transports expose the same client API; dispatch on the stream type.
macro_rules! with_client {
    ($client:expr, $c:ident => $body:expr) => {
        match $client {
            SessionClient::Tcp($c) => $body,
            #[cfg(windows)]
            SessionClient::Pipe($c) => $body,
        }
    };
}

pub struct SqlSession {
    runtime: Runtime,
    client: SessionClient,
}

impl SqlSession {
    /// Open a session from an ADO.NET style connection string.
    pub fn connect(connection_string: &str) -> Result<SqlSession> {
        let parsed: ConnectionString = connection_string.parse()?;
        let mut config = Config::from_ado_string(connection_string).map_err(TempDbError::Connect)?;
        // Local administrative context: the engine's self-signed certificate is accepted.
        config.trust_cert();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let data_source = parsed.get_data_source().unwrap_or("");
        debug!(data_source, "Opening SQL Server session");

        let transport = match localdb_instance(data_source) {
            Some(instance) => {
                let pipe = localdb_pipe_name(instance)?;
                open_pipe(&runtime, &pipe)?
            }
            None => {
                let tcp = runtime
                    .block_on(tokio::net::TcpStream::connect(config.get_addr()))
                    .map_err(|e| TempDbError::Connect(e.into()))?;
                tcp.set_nodelay(true)
                    .map_err(|e| TempDbError::Connect(e.into()))?;
                Transport::Tcp(tcp.compat_write())
            }
        };

        let client = match transport {
            Transport::Tcp(stream) => SessionClient::Tcp(
                runtime
                    .block_on(Client::connect(config, stream))
                    .map_err(TempDbError::Connect)?,
            ),
            #[cfg(windows)]
            Transport::Pipe(stream) => SessionClient::Pipe(
                runtime
                    .block_on(Client::connect(config, stream))
                    .map_err(TempDbError::Connect)?,
            ),
        };

        Ok(SqlSession { runtime, client })
    }

    /// Run a batch of statements, discarding any result sets.
    pub fn execute(&mut self, sql: &str) -> Result<()> {
        debug!(sql, "Executing batch");
        let runtime = &self.runtime;
        with_client!(&mut self.client, client => runtime.block_on(async {
            client.simple_query(sql).await?.into_results().await?;
            Ok::<_, SqlError>(())
        }))
        .map_err(TempDbError::Statement)
    }

    /// Run a query and return the first column of its first row.
    pub fn query_scalar_i32(&mut self, sql: &str) -> Result<Option<i32>> {
        debug!(sql, "Executing scalar query");
        let runtime = &self.runtime;
        with_client!(&mut self.client, client => runtime.block_on(async {
            let row = client.simple_query(sql).await?.into_row().await?;
            match row {
                Some(row) => row.try_get::<i32, _>(0),
                None => Ok(None),
            }
        }))
        .map_err(TempDbError::Statement)
    }

    /// Close the connection gracefully.
    pub fn close(self) -> Result<()> {
        let SqlSession { runtime, client } = self;
        with_client!(client, client => runtime.block_on(client.close()))
            .map_err(TempDbError::Close)
    }
}

/// The instance name of a `(localdb)\<instance>` data source.
fn localdb_instance(data_source: &str) -> Option<&str> {
    let (locator, instance) = data_source.split_once('\\')?;
    if locator.trim().eq_ignore_ascii_case(LOCALDB_LOCATOR) {
        Some(instance.trim())
    } else {
        None
    }
}

/// Start the LocalDB instance (a no-op when it is running) and look up the
/// named pipe it listens on.
fn localdb_pipe_name(instance: &str) -> Result<String> {
    run_sqllocaldb(instance, &["start", instance])?;
    let info = run_sqllocaldb(instance, &["info", instance])?;
    parse_pipe_name(&info).ok_or_else(|| TempDbError::LocalDbInstance {
        instance: instance.to_string(),
        message: "instance has no pipe name; is it running?".to_string(),
    })
}

fn run_sqllocaldb(instance: &str, args: &[&str]) -> Result<String> {
    debug!(?args, "Running SqlLocalDB");
    let output = Command::new("SqlLocalDB")
        .args(args)
        .output()
        .map_err(|e| TempDbError::LocalDbInstance {
            instance: instance.to_string(),
            message: format!("failed to run SqlLocalDB: {}", e),
        })?;

    if !output.status.success() {
        return Err(TempDbError::LocalDbInstance {
            instance: instance.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extract the pipe path from `SqlLocalDB info` output, dropping the `np:` prefix.
fn parse_pipe_name(info: &str) -> Option<String> {
    info.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(label, _)| label.trim().eq_ignore_ascii_case("Instance pipe name"))
        .map(|(_, value)| value.trim())
        .map(|value| value.strip_prefix("np:").unwrap_or(value).to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(windows)]
fn open_pipe(runtime: &Runtime, pipe: &str) -> Result<Transport> {
    use tokio::net::windows::named_pipe::ClientOptions;
    use tokio_util::compat::TokioAsyncReadCompatExt;

    // Opening a pipe client registers it with the reactor, so it needs the runtime context.
    let _guard = runtime.enter();
    let client = ClientOptions::new()
        .open(pipe)
        .map_err(|e| TempDbError::Connect(e.into()))?;
    Ok(Transport::Pipe(client.compat()))
}

#[cfg(not(windows))]
fn open_pipe(_runtime: &Runtime, pipe: &str) -> Result<Transport> {
    Err(TempDbError::Connect(SqlError::Io {
        kind: std::io::ErrorKind::Unsupported,
        message: format!("named pipe transport is only available on Windows: {}", pipe),
    }))
}
