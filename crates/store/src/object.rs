use async_trait::async_trait;
use base64::Engine;
use hyper::client::HttpConnector;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Client, Method, Request, StatusCode};

use crate::error::{Result, StoreError};
use crate::{BundleStore, StoredBundle};

/// Object-store backend for S3-compatible gateways (MinIO and the like)
/// speaking plain HTTP with static credentials. Bundles live under a
/// versioned prefix so the layout can evolve without breaking readers.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    client: Client<HttpConnector>,
    endpoint: String,
    bucket: String,
    auth_header: String,
}

const KEY_PREFIX: &str = "evidence/v1";

impl ObjectStore {
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Self {
        let credentials = format!("{access_key_id}:{secret_access_key}");
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            auth_header: format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(credentials)
            ),
        }
    }

    pub fn key_for(incident_id: &str) -> String {
        format!("{KEY_PREFIX}/{incident_id}.json")
    }

    fn request_uri(&self, incident_id: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, Self::key_for(incident_id))
    }

    fn object_uri(&self, incident_id: &str) -> String {
        format!("s3://{}/{}", self.bucket, Self::key_for(incident_id))
    }
}

#[async_trait]
impl BundleStore for ObjectStore {
    async fn get(&self, incident_id: &str) -> Result<Option<StoredBundle>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.request_uri(incident_id))
            .header(AUTHORIZATION, &self.auth_header)
            .body(Body::empty())?;

        let response = self.client.request(request).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = hyper::body::to_bytes(response.into_body()).await?;
                let raw = serde_json::from_slice(&bytes)?;
                Ok(Some(StoredBundle {
                    uri: self.object_uri(incident_id),
                    raw,
                }))
            }
            status => Err(StoreError::UpstreamStatus {
                status: status.as_u16(),
                uri: self.object_uri(incident_id),
            }),
        }
    }

    async fn put(&self, incident_id: &str, raw: &serde_json::Value) -> Result<String> {
        let body = serde_json::to_vec(raw)?;
        let request = Request::builder()
            .method(Method::PUT)
            .uri(self.request_uri(incident_id))
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))?;

        let response = self.client.request(request).await?;
        if !response.status().is_success() {
            return Err(StoreError::UpstreamStatus {
                status: response.status().as_u16(),
                uri: self.object_uri(incident_id),
            });
        }
        Ok(self.object_uri(incident_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_versioned_prefix() {
        assert_eq!(ObjectStore::key_for("inc_9"), "evidence/v1/inc_9.json");
    }

    #[test]
    fn uris_are_bucket_scoped() {
        let store = ObjectStore::new("http://localhost:9000/", "triage-artifacts", "ak", "sk");
        assert_eq!(store.object_uri("inc_9"), "s3://triage-artifacts/evidence/v1/inc_9.json");
        assert_eq!(
            store.request_uri("inc_9"),
            "http://localhost:9000/triage-artifacts/evidence/v1/inc_9.json"
        );
    }
}
