//! HTTP driver for Cypher endpoints

use crate::config::GraphConfig;
use crate::driver::{AccessMode, Driver, QueryResult, QueryStats};
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use graphframe_core::{Params, Record, Value};
use reqwest::{Client, ClientBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Driver that POSTs statements as JSON to `<base>/cypher`
#[derive(Debug, Clone)]
pub struct HttpDriver {
    /// HTTP client
    client: Client,
    /// Fully resolved statement endpoint
    endpoint: Url,
    api_key: Option<String>,
    username: Option<String>,
    password: Option<String>,
    max_retries: u32,
}

#[derive(Debug, Serialize)]
struct CypherRequest<'a> {
    query: &'a str,
    parameters: &'a Params,
}

#[derive(Debug, Deserialize)]
struct CypherResponse {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<serde_json::Value>,
    #[serde(default)]
    stats: Option<QueryStats>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpDriver {
    /// Build a driver from validated configuration
    ///
    /// ```no_run
    /// use graphframe::{GraphConfig, HttpDriver};
    ///
    /// let driver = HttpDriver::new(&GraphConfig::new("http://localhost:15474"))?;
    /// # Ok::<(), graphframe::Error>(())
    /// ```
    pub fn new(config: &GraphConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = Self::endpoint(&config.base_url()?, config.database.as_deref())?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("graphframe/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Statement endpoint: `<base>/cypher` or `<base>/db/<database>/cypher`
    fn endpoint(base: &Url, database: Option<&str>) -> Result<Url> {
        let path = match database {
            Some(db) if !db.is_empty() => format!("db/{}/cypher", db),
            _ => "cypher".to_string(),
        };
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(&path)?)
    }

    /// Resolved statement endpoint
    pub fn url(&self) -> &Url {
        &self.endpoint
    }

    pub(crate) fn add_auth_headers(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            builder = builder.header("X-API-Key", api_key);
        } else if let (Some(username), Some(password)) = (&self.username, &self.password) {
            let auth = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", username, password));
            builder = builder.header("Authorization", format!("Basic {}", auth));
        }
        builder
    }

    /// Send with exponential backoff on timeouts, connect failures and 5xx
    pub(crate) async fn execute_with_retry(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<Response> {
        let max_retries = self.max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            let Some(cloned_builder) = builder.try_clone() else {
                return builder.send().await.map_err(map_send_error);
            };
            match cloned_builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && attempt < max_retries {
                        tracing::warn!(
                            "Server returned {} (attempt {}/{}), retrying",
                            status,
                            attempt + 1,
                            max_retries + 1
                        );
                        backoff(attempt).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    let is_retryable = e.is_timeout() || e.is_connect();
                    if is_retryable && attempt < max_retries {
                        tracing::warn!(
                            "Request failed (attempt {}/{}): {}, retrying",
                            attempt + 1,
                            max_retries + 1,
                            e
                        );
                        last_error = Some(e);
                        backoff(attempt).await;
                        continue;
                    }
                    last_error = Some(e);
                    break;
                }
            }
        }

        match last_error {
            Some(e) => Err(map_send_error(e)),
            None => Err(Error::Connection(
                "Request failed after retries".to_string(),
            )),
        }
    }

    async fn handle_response(&self, response: Response) -> Result<QueryResult> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Api {
                message: error_text,
                status: status.as_u16(),
            });
        }

        let body: CypherResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        if let Some(message) = body.error {
            return Err(Error::Api {
                message,
                status: status.as_u16(),
            });
        }

        let records = body
            .rows
            .into_iter()
            .map(|row| to_record(&body.columns, row))
            .collect::<Result<Vec<_>>>()?;
        Ok(QueryResult {
            records,
            stats: body.stats,
        })
    }
}

#[async_trait]
impl Driver for HttpDriver {
    async fn run(&self, mode: AccessMode, query: &str, params: &Params) -> Result<QueryResult> {
        let request = CypherRequest {
            query,
            parameters: params,
        };
        tracing::debug!("POST {} ({})", self.endpoint, mode);

        let builder = self.client.post(self.endpoint.clone()).json(&request);
        let builder = self.add_auth_headers(builder);

        let response = self.execute_with_retry(builder).await?;
        self.handle_response(response).await
    }
}

async fn backoff(attempt: u32) {
    let delay_ms = 100u64 * (1u64 << attempt.min(5));
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

fn map_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else if e.is_connect() {
        Error::Connection(e.to_string())
    } else {
        Error::Http(e)
    }
}

/// Arrays are zipped with the column names, objects are taken as-is and a
/// bare scalar lands under the first column
fn to_record(columns: &[String], row: serde_json::Value) -> Result<Record> {
    match row {
        serde_json::Value::Array(values) => {
            if values.len() != columns.len() {
                return Err(Error::InvalidResponse(format!(
                    "row has {} values for {} columns",
                    values.len(),
                    columns.len()
                )));
            }
            Ok(columns
                .iter()
                .cloned()
                .zip(values.into_iter().map(Value::from))
                .collect())
        }
        serde_json::Value::Object(map) => {
            Ok(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
        }
        scalar => match columns.first() {
            Some(column) => Ok(Record::from([(column.clone(), Value::from(scalar))])),
            None => Err(Error::InvalidResponse(
                "scalar row without a column name".to_string(),
            )),
        },
    }
}
