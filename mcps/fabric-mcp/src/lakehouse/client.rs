//! TDS connection to the Lakehouse SQL endpoint
//!
//! Authenticates with an Azure AD access token for the SQL scope. One
//! connection is cached; it is taken out of the slot for the duration of a
//! query and only put back if the query succeeded, so a broken socket is
//! never reused.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use serde_json::Value;
use tiberius::{AuthMethod, Client, EncryptionLevel, QueryItem, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, instrument, warn};

use fabric_common::auth::{TokenCredential, SQL_SCOPE};

use super::convert::row_to_json;
use super::{LakehouseBackend, LakehouseError};
use crate::config::{LakehouseConfig, SqlTarget};
use crate::types::QueryResult;

type TdsClient = Client<Compat<TcpStream>>;

/// Lakehouse backend speaking TDS via tiberius
pub struct TdsLakehouse {
    target: SqlTarget,
    credential: Arc<dyn TokenCredential>,
    timeout: Duration,
    max_rows: usize,
    conn: Mutex<Option<TdsClient>>,
}

impl TdsLakehouse {
    pub fn new(target: SqlTarget, credential: Arc<dyn TokenCredential>, settings: &LakehouseConfig) -> Self {
        Self {
            target,
            credential,
            timeout: Duration::from_secs(settings.timeout_secs),
            max_rows: settings.max_rows,
            conn: Mutex::new(None),
        }
    }

    fn tds_config(&self, token: &str) -> tiberius::Config {
        let mut config = tiberius::Config::new();
        config.host(&self.target.host);
        config.port(self.target.port);
        config.database(&self.target.database);
        config.authentication(AuthMethod::AADToken(token.to_string()));
        config.encryption(EncryptionLevel::Required);
        config.application_name("fabric-mcp");
        config
    }

    #[instrument(skip(self), fields(host = %self.target.host, database = %self.target.database))]
    async fn connect(&self) -> Result<TdsClient, LakehouseError> {
        let token = self.credential.get_token(SQL_SCOPE).await?;
        let config = self.tds_config(token.secret());

        match open(config.clone()).await {
            // The gateway may hand us off to the node that owns the database
            Err(LakehouseError::Sql(tiberius::error::Error::Routing { host, port })) => {
                debug!(%host, port, "following TDS routing redirect");
                let mut routed = config;
                routed.host(&host);
                routed.port(port);
                open(routed).await
            }
            other => other,
        }
    }

    async fn run(
        client: &mut TdsClient,
        sql: &str,
        params: &[String],
        max_rows: usize,
    ) -> Result<QueryResult, tiberius::error::Error> {
        let refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();

        let stream = if refs.is_empty() {
            client.simple_query(sql).await?
        } else {
            client.query(sql, &refs).await?
        };

        first_result_set(stream.map_ok(ResultItem::from), max_rows).await
    }
}

/// A TDS stream item reduced to what a [`QueryResult`] keeps
#[derive(Debug)]
enum ResultItem {
    Columns { result: usize, names: Vec<String> },
    Row { result: usize, values: Vec<Value> },
}

impl From<QueryItem> for ResultItem {
    fn from(item: QueryItem) -> Self {
        match item {
            QueryItem::Metadata(meta) => ResultItem::Columns {
                result: meta.result_index(),
                names: meta.columns().iter().map(|c| c.name().to_string()).collect(),
            },
            QueryItem::Row(row) => ResultItem::Row {
                result: row.result_index(),
                values: row_to_json(row),
            },
        }
    }
}

/// Columns and at most `max_rows` rows of the first result set
///
/// Reading stops at the first item of the second result set; the
/// connection drains the rest before its next request.
async fn first_result_set<S, E>(mut items: S, max_rows: usize) -> Result<QueryResult, E>
where
    S: Stream<Item = Result<ResultItem, E>> + Unpin,
{
    let mut columns = Vec::new();
    let mut rows = Vec::new();
    let mut truncated = false;

    while let Some(item) = items.try_next().await? {
        match item {
            ResultItem::Columns { result: 0, names } => columns = names,
            ResultItem::Row { result: 0, values } => {
                if rows.len() == max_rows {
                    truncated = true;
                    break;
                }
                rows.push(values);
            }
            ResultItem::Columns { .. } | ResultItem::Row { .. } => break,
        }
    }

    Ok(QueryResult::new(columns, rows, truncated))
}

async fn open(config: tiberius::Config) -> Result<TdsClient, LakehouseError> {
    let addr = config.get_addr();

    let tcp = TcpStream::connect(&addr)
        .await
        .map_err(|source| LakehouseError::Connect { addr: addr.clone(), source })?;
    tcp.set_nodelay(true)
        .map_err(|source| LakehouseError::Connect { addr, source })?;

    Ok(Client::connect(config, tcp.compat_write()).await?)
}

#[async_trait]
impl LakehouseBackend for TdsLakehouse {
    fn describe(&self) -> String {
        format!("{}/{}", self.target.host, self.target.database)
    }

    async fn query(&self, sql: &str, params: &[String]) -> Result<QueryResult, LakehouseError> {
        let mut slot = self.conn.lock().await;

        let mut client = match slot.take() {
            Some(client) => client,
            None => {
                info!("Connecting to {}", self.describe());
                self.connect().await?
            }
        };

        match tokio::time::timeout(self.timeout, Self::run(&mut client, sql, params, self.max_rows)).await {
            Ok(Ok(result)) => {
                *slot = Some(client);
                Ok(result)
            }
            Ok(Err(e)) => {
                // Server-side errors leave the connection usable
                if matches!(e, tiberius::error::Error::Server(_)) {
                    *slot = Some(client);
                } else {
                    warn!("dropping lakehouse connection after error: {}", e);
                }
                Err(e.into())
            }
            Err(_) => {
                warn!("query exceeded {}s, dropping connection", self.timeout.as_secs());
                Err(LakehouseError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;
    use std::convert::Infallible;

    fn columns(result: usize, names: &[&str]) -> Result<ResultItem, Infallible> {
        Ok(ResultItem::Columns {
            result,
            names: names.iter().map(|n| n.to_string()).collect(),
        })
    }

    fn row(result: usize, values: Vec<Value>) -> Result<ResultItem, Infallible> {
        Ok(ResultItem::Row { result, values })
    }

    #[tokio::test]
    async fn test_only_first_result_set_is_kept() {
        let items = stream::iter(vec![
            columns(0, &["a"]),
            row(0, vec![json!(1)]),
            columns(1, &["x", "y"]),
            row(1, vec![json!("x"), json!("y")]),
        ]);

        let result = first_result_set(items, 100).await.unwrap();
        assert_eq!(result.columns, vec!["a"]);
        assert_eq!(result.rows, vec![vec![json!(1)]]);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_truncates_at_max_rows() {
        let items = stream::iter(vec![
            columns(0, &["n"]),
            row(0, vec![json!(1)]),
            row(0, vec![json!(2)]),
            row(0, vec![json!(3)]),
        ]);

        let result = first_result_set(items, 2).await.unwrap();
        assert_eq!(result.row_count, 2);
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn test_empty_first_result_set_keeps_columns() {
        let items = stream::iter(vec![columns(0, &["id", "name"]), columns(1, &["other"])]);

        let result = first_result_set(items, 10).await.unwrap();
        assert_eq!(result.columns, vec!["id", "name"]);
        assert!(result.rows.is_empty());
    }
}
