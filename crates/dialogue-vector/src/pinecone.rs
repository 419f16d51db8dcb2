//! Pinecone data-plane client (dotproduct index, hybrid dense + sparse).

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use dialogue_core::config::VectorConfig;
use dialogue_core::traits::VectorStore;
use dialogue_core::types::{ChunkMetadata, MetadataFilter, QueryMatch, QueryRequest, SparseVector, UpsertRecord};

#[derive(Clone)]
pub struct PineconeStore {
    client: Client,
    host: String,
    max_retries: usize,
}

impl PineconeStore {
    pub fn new(api_key: String, host: &str, timeout: Duration, max_retries: usize) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Pinecone API key");
        anyhow::ensure!(
            host.starts_with("http://") || host.starts_with("https://"),
            "Pinecone host must be an http(s) URL"
        );
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("api-key", HeaderValue::from_str(api_key.trim()).context("invalid Pinecone API key")?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Pinecone HTTP client")?;
        Ok(Self { client, host: host.trim_end_matches('/').to_string(), max_retries: max_retries.max(1) })
    }

    pub fn from_config(config: &VectorConfig) -> Result<Self> {
        let host = config.pinecone_host.as_deref().context("vector.pinecone_host is not configured")?;
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("environment variable {} is not set", config.api_key_env))?;
        Self::new(api_key, host, Duration::from_secs(config.timeout_secs), config.max_retries)
    }

    fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = format!("{}{}", self.host, path);
        let mut attempt = 0usize;
        loop {
            match self.client.post(&url).json(body).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json().with_context(|| format!("failed to parse Pinecone response from {path}"));
                    }
                    let text = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(%status, attempt, path, "Pinecone request failed, retrying");
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    anyhow::bail!("Pinecone request {} failed ({}): {}", path, status, text);
                }
                Err(err) => {
                    if (err.is_connect() || err.is_timeout() || err.is_request() || err.is_body())
                        && attempt + 1 < self.max_retries
                    {
                        attempt += 1;
                        warn!(error = %err, attempt, path, "Pinecone request error, retrying");
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

impl VectorStore for PineconeStore {
    fn upsert(&self, namespace: &str, records: Vec<UpsertRecord>) -> dialogue_core::Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let vectors: Vec<PineconeVector> = records.iter().map(PineconeVector::from).collect();
        let body = UpsertRequest { vectors, namespace };
        let resp: UpsertResponse = self.post("/vectors/upsert", &body).map_err(dialogue_core::Error::store)?;
        debug!(namespace, upserted = resp.upserted_count, "upserted batch");
        Ok(resp.upserted_count)
    }

    fn query(&self, request: &QueryRequest) -> dialogue_core::Result<Vec<QueryMatch>> {
        let body = query_body(request);
        let resp: QueryResponse = self.post("/query", &body).map_err(dialogue_core::Error::store)?;
        Ok(resp
            .matches
            .into_iter()
            .map(|m| QueryMatch { id: m.id, score: m.score, metadata: m.metadata })
            .collect())
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

fn filter_json(filter: &MetadataFilter) -> serde_json::Value {
    let mut clauses = serde_json::Map::new();
    clauses.insert("source_id".into(), json!({ "$eq": filter.source_id }));
    if let Some(category) = filter.category {
        clauses.insert("category".into(), json!({ "$eq": category.as_str() }));
    }
    serde_json::Value::Object(clauses)
}

fn query_body(request: &QueryRequest) -> serde_json::Value {
    let mut body = json!({
        "namespace": request.namespace,
        "vector": request.dense,
        "topK": request.top_k,
        "filter": filter_json(&request.filter),
        "includeMetadata": request.include_metadata,
        "includeValues": false,
    });
    // Pinecone rejects empty sparse vectors
    if !request.sparse.is_empty() {
        body["sparseVector"] = json!(SparseValues::from(&request.sparse));
    }
    body
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    #[serde(skip_serializing_if = "Option::is_none")]
    sparse_values: Option<SparseValues<'a>>,
    metadata: &'a ChunkMetadata,
}

impl<'a> From<&'a UpsertRecord> for PineconeVector<'a> {
    fn from(r: &'a UpsertRecord) -> Self {
        Self {
            id: &r.id,
            values: &r.dense,
            sparse_values: (!r.sparse.is_empty()).then(|| SparseValues::from(&r.sparse)),
            metadata: &r.metadata,
        }
    }
}

#[derive(Serialize)]
struct SparseValues<'a> {
    indices: &'a [u32],
    values: &'a [f32],
}

impl<'a> From<&'a SparseVector> for SparseValues<'a> {
    fn from(v: &'a SparseVector) -> Self {
        Self { indices: &v.indices, values: &v.values }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Debug, Deserialize)]
struct PineconeMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Option<ChunkMetadata>,
}
