use std::time::Duration;

use reqwest::header::ACCEPT;

use super::error::XrefError;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// One SPARQL request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlRequest<'a> {
    pub service: &'static str,
    pub endpoint: &'a str,
    pub query: &'a str,
    /// Value of the `format` query parameter, for endpoints that need it.
    pub format: Option<&'static str>,
}

/// Something that can answer SPARQL queries with a results document.
pub trait SparqlTransport {
    fn query(&self, request: &SparqlRequest<'_>) -> Result<serde_json::Value, XrefError>;
}

/// Blocking HTTP transport with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, XrefError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl SparqlTransport for HttpTransport {
    fn query(&self, request: &SparqlRequest<'_>) -> Result<serde_json::Value, XrefError> {
        let mut params = vec![("query", request.query)];
        if let Some(format) = request.format {
            params.push(("format", format));
        }
        tracing::debug!(service = request.service, endpoint = request.endpoint, "SPARQL query");

        let response = self
            .client
            .get(request.endpoint)
            .query(&params)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(XrefError::Status {
                service: request.service,
                status: status.as_u16(),
            });
        }
        Ok(response.json()?)
    }
}
