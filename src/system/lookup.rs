// src/system/lookup.rs

use crate::{
    dev_utils::BlockTimer,
    models::{LookupRecord, LookupRequest, LookupResponse, LookupSettings},
};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Why a lookup produced no records.
#[derive(Error, Debug)]
pub enum LookupError {
    /// Connection failure, timeout, or a body that could not be read.
    #[error("Lookup request to '{url}' failed: {source}")]
    Network {
        /// The endpoint that was queried.
        url: String,
        /// The transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered with a non-2xx status.
    #[error("Lookup endpoint '{url}' answered with HTTP {status}.")]
    Status {
        /// The endpoint that was queried.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// The body is not JSON, or lacks the `data` array or a record field.
    #[error("Lookup response was malformed: {0}")]
    Malformed(String),
    /// The HTTP client itself could not be constructed.
    #[error("Could not build the lookup client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Anything able to answer option lookups for a selector chain.
#[async_trait]
pub trait LookupService: Send + Sync {
    /// Fetches the `(actualvalue, displayvalue)` records answering `request`, in order.
    async fn lookup(&self, request: &LookupRequest) -> Result<Vec<LookupRecord>, LookupError>;
}

/// Queries the backend lookup route over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLookupClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLookupClient {
    /// Builds a client for the endpoint described by `settings`, honouring its timeout.
    pub fn new(settings: &LookupSettings) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(LookupError::Client)?;

        Ok(Self {
            client,
            endpoint: settings.endpoint_url(),
        })
    }

    /// The full URL every lookup is sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LookupService for HttpLookupClient {
    async fn lookup(&self, request: &LookupRequest) -> Result<Vec<LookupRecord>, LookupError> {
        let _timer = BlockTimer::new(format!("lookup {}", request.table));
        log::debug!(
            "GET {} table={} valuefield={} filter='{}'",
            self.endpoint,
            request.table,
            request.value_field,
            request.filter_string()
        );

        let response = self
            .client
            .get(&self.endpoint)
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(|e| LookupError::Network {
                url: self.endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                url: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| LookupError::Network {
            url: self.endpoint.clone(),
            source: e,
        })?;

        parse_lookup_body(&body)
    }
}

/// Decodes a `{ "data": [ { actualvalue, displayvalue }, ... ] }` body.
pub fn parse_lookup_body(body: &str) -> Result<Vec<LookupRecord>, LookupError> {
    serde_json::from_str::<LookupResponse>(body)
        .map(|response| response.data)
        .map_err(|e| LookupError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectorDecl;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves a single canned HTTP response and hands back the request head it received.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&head).into_owned()
        });

        (base_url, handle)
    }

    fn station_request() -> LookupRequest {
        let decl = SelectorDecl::new("login_station", 3, "stationid", "stationname", "lu_station");
        LookupRequest::for_selector(
            &decl,
            vec![
                ("agency".to_string(), "SCCWRP".to_string()),
                ("datatype".to_string(), "field trawl".to_string()),
            ],
        )
    }

    #[tokio::test]
    async fn test_http_lookup_sends_ordered_query_and_parses_records() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"data": [{"actualvalue": "a1", "displayvalue": "A One"}]}"#,
        )
        .await;
        let client = HttpLookupClient::new(&LookupSettings::new(base_url)).unwrap();

        let records = client.lookup(&station_request()).await.unwrap();
        assert_eq!(records, vec![LookupRecord::new("a1", "A One")]);

        let head = server.await.unwrap();
        let request_line = head.lines().next().unwrap();
        assert!(request_line.starts_with(
            "GET /checker/login_values?valuefield=stationid&displayfield=stationname&table=lu_station&agency=SCCWRP&datatype=field"
        ), "unexpected request line: {}", request_line);
    }

    #[tokio::test]
    async fn test_http_lookup_reports_non_success_status() {
        let (base_url, server) = serve_once("HTTP/1.1 500 Internal Server Error", "{}").await;
        let client = HttpLookupClient::new(&LookupSettings::new(base_url)).unwrap();

        let err = client.lookup(&station_request()).await.unwrap_err();
        assert!(matches!(err, LookupError::Status { status: 500, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_lookup_reports_malformed_body() {
        let (base_url, server) = serve_once("HTTP/1.1 200 OK", r#"{"rows": []}"#).await;
        let client = HttpLookupClient::new(&LookupSettings::new(base_url)).unwrap();

        let err = client.lookup(&station_request()).await.unwrap_err();
        assert!(matches!(err, LookupError::Malformed(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_lookup_reports_unreachable_host() {
        // Bind then drop so the port is very likely closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = HttpLookupClient::new(&LookupSettings::new(base_url)).unwrap();
        let err = client.lookup(&station_request()).await.unwrap_err();
        assert!(matches!(err, LookupError::Network { .. }));
    }

    #[test]
    fn test_parse_lookup_body_rejects_non_json() {
        let err = parse_lookup_body("<html>oops</html>").unwrap_err();
        assert!(matches!(err, LookupError::Malformed(_)));
    }
}
