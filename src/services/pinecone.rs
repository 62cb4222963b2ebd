//! Pinecone REST client: index provisioning and vector upserts.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::IndexError;
use crate::models::{Metric, PineconeConfig, VectorRecord};

const API_KEY_HEADER: &str = "Api-Key";

/// Seam over the index control plane.
#[async_trait]
pub trait IndexControl: Send + Sync {
    /// List the names of all indexes in the project.
    async fn list_index_names(&self) -> Result<Vec<String>, IndexError>;

    /// Describe a single index.
    async fn describe_index(&self, name: &str) -> Result<IndexModel, IndexError>;

    /// Create a serverless index.
    async fn create_index(
        &self,
        name: &str,
        dimension: usize,
        metric: Metric,
    ) -> Result<(), IndexError>;
}

/// Seam over the remote vector index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert-or-replace one batch of vectors. Returns the count accepted
    /// by the store.
    async fn upsert(
        &self,
        vectors: &[VectorRecord],
        namespace: Option<&str>,
    ) -> Result<usize, IndexError>;

    /// Total vector count currently held by the index.
    async fn total_vector_count(&self) -> Result<u64, IndexError>;
}

/// Index description returned by the control plane.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexModel {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub host: String,
    pub status: IndexStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexModel>,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: String,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

/// Control-plane client (index management).
#[derive(Debug, Clone)]
pub struct PineconeClient {
    client: Client,
    base_url: String,
    api_key: String,
    config: PineconeConfig,
}

impl PineconeClient {
    pub fn new(config: &PineconeConfig, api_key: String) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IndexError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key,
            config: config.clone(),
        })
    }

    /// Ensure an index of the given dimension and metric exists and is
    /// ready, creating it when absent.
    pub async fn ensure_index(
        &self,
        name: &str,
        dimension: usize,
        metric: Metric,
    ) -> Result<IndexModel, IndexError> {
        ensure_index(
            self,
            name,
            dimension,
            metric,
            Duration::from_secs(self.config.poll_interval_secs),
            self.config.max_ready_checks,
        )
        .await
    }

    /// Open a data-plane handle for a described index.
    pub fn index(&self, model: &IndexModel) -> PineconeIndex {
        PineconeIndex::new(self.client.clone(), &model.host, self.api_key.clone())
    }
}

#[async_trait]
impl IndexControl for PineconeClient {
    async fn list_index_names(&self) -> Result<Vec<String>, IndexError> {
        let url = format!("{}/indexes", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let response = check_status(response).await?;
        let list: IndexList = response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;

        Ok(list.indexes.into_iter().map(|i| i.name).collect())
    }

    async fn describe_index(&self, name: &str) -> Result<IndexModel, IndexError> {
        let url = format!("{}/indexes/{}", self.base_url, name);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))
    }

    /// Creation uses the configured cloud and region.
    async fn create_index(
        &self,
        name: &str,
        dimension: usize,
        metric: Metric,
    ) -> Result<(), IndexError> {
        let url = format!("{}/indexes", self.base_url);
        let request = CreateIndexRequest {
            name,
            dimension,
            metric: metric.to_string(),
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.config.cloud,
                    region: &self.config.region,
                },
            },
        };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

/// Ensure an index of the given dimension and metric exists and is
/// ready, creating it when absent.
///
/// Idempotent: an index already present in the listing is reused without
/// a create call. Reusing an existing index whose dimension or metric
/// differs from the request fails fast instead of producing silently
/// broken upserts. Readiness polling is bounded; a stuck index surfaces
/// as [`IndexError::ProvisioningTimeout`] rather than hanging the run.
pub async fn ensure_index(
    control: &dyn IndexControl,
    name: &str,
    dimension: usize,
    metric: Metric,
    poll_interval: Duration,
    max_ready_checks: u32,
) -> Result<IndexModel, IndexError> {
    let existing = control.list_index_names().await?;

    if existing.iter().any(|n| n == name) {
        let model = control.describe_index(name).await?;
        if model.dimension != dimension || model.metric != metric.to_string() {
            return Err(IndexError::IndexMismatch {
                name: name.to_string(),
                existing_dimension: model.dimension,
                requested_dimension: dimension,
                existing_metric: model.metric,
                requested_metric: metric.to_string(),
            });
        }
        return Ok(model);
    }

    control.create_index(name, dimension, metric).await?;

    for attempt in 0..max_ready_checks {
        let model = control.describe_index(name).await?;
        if model.status.ready {
            return Ok(model);
        }
        if attempt + 1 < max_ready_checks {
            sleep(poll_interval).await;
        }
    }

    Err(IndexError::ProvisioningTimeout(
        name.to_string(),
        max_ready_checks,
    ))
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStatsResponse {
    #[serde(default)]
    total_vector_count: u64,
}

/// Data-plane client bound to one index host.
#[derive(Debug, Clone)]
pub struct PineconeIndex {
    client: Client,
    host_url: String,
    api_key: String,
}

impl PineconeIndex {
    fn new(client: Client, host: &str, api_key: String) -> Self {
        // The control plane reports bare hostnames.
        let host_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };

        Self {
            client,
            host_url,
            api_key,
        }
    }

    pub fn host_url(&self) -> &str {
        &self.host_url
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(
        &self,
        vectors: &[VectorRecord],
        namespace: Option<&str>,
    ) -> Result<usize, IndexError> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/vectors/upsert", self.host_url);
        let request = UpsertRequest { vectors, namespace };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| IndexError::UpsertError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::UpsertError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let upsert_response: UpsertResponse = response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;

        Ok(upsert_response.upserted_count)
    }

    async fn total_vector_count(&self) -> Result<u64, IndexError> {
        let url = format!("{}/describe_index_stats", self.host_url);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let response = check_status(response).await?;
        let stats: IndexStatsResponse = response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;

        Ok(stats.total_vector_count)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, IndexError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::ApiError(format!("status {}: {}", status, body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_host_url_gains_scheme() {
        let client = Client::new();
        let index = PineconeIndex::new(
            client.clone(),
            "my-index-abc123.svc.us-east-1.pinecone.io",
            "key".to_string(),
        );
        assert_eq!(
            index.host_url(),
            "https://my-index-abc123.svc.us-east-1.pinecone.io"
        );

        let index = PineconeIndex::new(client, "http://localhost:5080/", "key".to_string());
        assert_eq!(index.host_url(), "http://localhost:5080");
    }

    #[test]
    fn test_index_model_deserialization() {
        let json = r#"{
            "name": "energy-policies",
            "dimension": 1536,
            "metric": "cosine",
            "host": "energy-policies-abc.svc.us-east-1.pinecone.io",
            "status": {"ready": true, "state": "Ready"},
            "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}}
        }"#;
        let model: IndexModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.name, "energy-policies");
        assert_eq!(model.dimension, 1536);
        assert!(model.status.ready);
    }

    #[test]
    fn test_upsert_request_omits_empty_namespace() {
        let request = UpsertRequest {
            vectors: &[],
            namespace: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("namespace"));

        let request = UpsertRequest {
            vectors: &[],
            namespace: Some("policies"),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"namespace\":\"policies\""));
    }

    struct StubControl {
        existing: Mutex<Vec<IndexModel>>,
        create_calls: AtomicUsize,
        ready_on_create: bool,
    }

    impl StubControl {
        fn empty() -> Self {
            Self {
                existing: Mutex::new(Vec::new()),
                create_calls: AtomicUsize::new(0),
                ready_on_create: true,
            }
        }

        fn with_index(model: IndexModel) -> Self {
            Self {
                existing: Mutex::new(vec![model]),
                create_calls: AtomicUsize::new(0),
                ready_on_create: true,
            }
        }

        fn never_ready() -> Self {
            Self {
                ready_on_create: false,
                ..Self::empty()
            }
        }
    }

    fn model(name: &str, dimension: usize, metric: &str, ready: bool) -> IndexModel {
        IndexModel {
            name: name.to_string(),
            dimension,
            metric: metric.to_string(),
            host: format!("{name}-abc.svc.us-east-1.pinecone.io"),
            status: IndexStatus {
                ready,
                state: if ready { "Ready" } else { "Initializing" }.to_string(),
            },
        }
    }

    #[async_trait]
    impl IndexControl for StubControl {
        async fn list_index_names(&self) -> Result<Vec<String>, IndexError> {
            Ok(self
                .existing
                .lock()
                .unwrap()
                .iter()
                .map(|m| m.name.clone())
                .collect())
        }

        async fn describe_index(&self, name: &str) -> Result<IndexModel, IndexError> {
            self.existing
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.name == name)
                .cloned()
                .ok_or_else(|| IndexError::ApiError(format!("status 404: index {name} not found")))
        }

        async fn create_index(
            &self,
            name: &str,
            dimension: usize,
            metric: Metric,
        ) -> Result<(), IndexError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.existing.lock().unwrap().push(model(
                name,
                dimension,
                &metric.to_string(),
                self.ready_on_create,
            ));
            Ok(())
        }
    }

    fn fast_ensure<'a>(
        control: &'a StubControl,
        name: &'a str,
        dimension: usize,
        metric: Metric,
    ) -> impl std::future::Future<Output = Result<IndexModel, IndexError>> + 'a {
        ensure_index(
            control,
            name,
            dimension,
            metric,
            Duration::from_millis(1),
            3,
        )
    }

    #[tokio::test]
    async fn test_ensure_index_creates_once() {
        let control = StubControl::empty();

        let first = fast_ensure(&control, "policies", 8, Metric::Cosine)
            .await
            .unwrap();
        assert_eq!(first.dimension, 8);
        assert_eq!(control.create_calls.load(Ordering::SeqCst), 1);

        // Second call finds the index in the listing and issues no create.
        let second = fast_ensure(&control, "policies", 8, Metric::Cosine)
            .await
            .unwrap();
        assert_eq!(second.name, "policies");
        assert_eq!(control.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ensure_index_preexisting_is_untouched() {
        let control = StubControl::with_index(model("policies", 8, "cosine", true));

        fast_ensure(&control, "policies", 8, Metric::Cosine)
            .await
            .unwrap();
        assert_eq!(control.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ensure_index_rejects_dimension_mismatch() {
        let control = StubControl::with_index(model("policies", 1536, "cosine", true));

        let err = fast_ensure(&control, "policies", 8, Metric::Cosine)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::IndexMismatch { .. }));
        assert_eq!(control.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ensure_index_rejects_metric_mismatch() {
        let control = StubControl::with_index(model("policies", 8, "euclidean", true));

        let err = fast_ensure(&control, "policies", 8, Metric::Cosine)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::IndexMismatch { .. }));
    }

    #[tokio::test]
    async fn test_ensure_index_bounded_readiness_poll() {
        let control = StubControl::never_ready();

        let err = fast_ensure(&control, "policies", 8, Metric::Cosine)
            .await
            .unwrap_err();
        match err {
            IndexError::ProvisioningTimeout(name, checks) => {
                assert_eq!(name, "policies");
                assert_eq!(checks, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stats_response_default() {
        let stats: IndexStatsResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(stats.total_vector_count, 0);
        let stats: IndexStatsResponse =
            serde_json::from_str(r#"{"totalVectorCount": 250}"#).unwrap();
        assert_eq!(stats.total_vector_count, 250);
    }
}
