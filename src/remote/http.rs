//! HTTP object-store adapter.
//!
//! Speaks a minimal REST surface: `POST /objects` (upload, name carried in
//! a header), `GET /objects?contains=` (listing), `GET /objects/{id}`
//! (download) and `DELETE /objects/{id}`. The client is constructed once at
//! startup and injected into the pipelines; the bearer token, if any, rides
//! on every request.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{RemoteObject, RemoteStore, StoredObject};
use crate::utils::errors::{BackupError, Result};

#[derive(Debug, Clone)]
pub struct HttpStoreClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
    link: String,
}

impl HttpStoreClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn remote_err(context: &str, e: reqwest::Error) -> BackupError {
    BackupError::Remote(format!("{context}: {e}"))
}

fn status_err(context: &str, status: reqwest::StatusCode) -> BackupError {
    BackupError::Remote(format!("{context} failed with status {status}"))
}

#[async_trait]
impl RemoteStore for HttpStoreClient {
    async fn put(&self, data: &[u8], name: &str) -> Result<StoredObject> {
        let url = format!("{}/objects", self.base_url);
        let resp = self
            .authorized(self.client.post(&url))
            .header("x-object-name", name)
            .header("content-type", "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| remote_err("upload", e))?;

        if !resp.status().is_success() {
            return Err(status_err("upload", resp.status()));
        }

        let parsed: UploadResponse = resp
            .json()
            .await
            .map_err(|e| remote_err("upload response", e))?;
        debug!(name, id = %parsed.id, "object uploaded");
        Ok(StoredObject {
            id: parsed.id,
            link: parsed.link,
        })
    }

    async fn list(&self, name_contains: &str) -> Result<Vec<RemoteObject>> {
        let url = format!("{}/objects", self.base_url);
        let resp = self
            .authorized(self.client.get(&url))
            .query(&[("contains", name_contains)])
            .send()
            .await
            .map_err(|e| remote_err("list", e))?;

        if !resp.status().is_success() {
            return Err(status_err("list", resp.status()));
        }

        resp.json::<Vec<RemoteObject>>()
            .await
            .map_err(|e| remote_err("list response", e))
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/objects/{id}", self.base_url);
        let resp = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| remote_err("download", e))?;

        if !resp.status().is_success() {
            return Err(status_err("download", resp.status()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| remote_err("download body", e))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = format!("{}/objects/{id}", self.base_url);
        let resp = self
            .authorized(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| remote_err("delete", e))?;

        if !resp.status().is_success() {
            return Err(status_err("delete", resp.status()));
        }
        Ok(())
    }
}
