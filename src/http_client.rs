//! A `reqwest`-backed [`ContainerGroupClient`] implementation
//!
//! Talks to the Cloud Container Service's REST API directly: plain
//! create/get/list/delete/logs/capabilities calls with bearer-token auth.
//! Retry policy, token refresh, and connection pooling tuning are the kind
//! of transport-level plumbing a production deployment layers on top of
//! `reqwest::Client` itself (e.g. via `reqwest-retry`); this client issues
//! one request per call and lets failures surface immediately.
use reqwest::{Client, StatusCode};

use crate::client::{ContainerGroupClient, LogOptions};
use crate::error::Error;
use crate::remote::{ContainerGroup, RegionCapability};

/// A Cloud Container Service client that speaks directly to its REST API
pub struct HttpContainerGroupClient {
    http: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpContainerGroupClient {
    /// Build a new client
    ///
    /// # Arguments
    ///
    /// * `base_url` - The Cloud Container Service's REST API base URL, no trailing slash
    /// * `bearer_token` - The bearer token to present on every request, if configured
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>) -> Self {
        HttpContainerGroupClient {
            http: Client::new(),
            base_url: base_url.into(),
            bearer_token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, url);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Translate a non-2xx response into the appropriate [`Error`] variant
    async fn fail(resp: reqwest::Response) -> Error {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            Error::not_found(body)
        } else {
            Error::remote(format!("Code: {status} Error: {body}"))
        }
    }
}

#[async_trait::async_trait]
impl ContainerGroupClient for HttpContainerGroupClient {
    async fn create_container_group(
        &self,
        resource_group: &str,
        group: &ContainerGroup,
    ) -> Result<ContainerGroup, Error> {
        let path = format!("/resourceGroups/{resource_group}/containerGroups/{}", group.name);
        let resp = self.request(reqwest::Method::PUT, &path).json(group).send().await?;
        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn get_container_group_info(
        &self,
        resource_group: &str,
        _namespace: &str,
        name: &str,
        _node_name: &str,
    ) -> Result<ContainerGroup, Error> {
        let path = format!("/resourceGroups/{resource_group}/containerGroups/{name}");
        let resp = self.request(reqwest::Method::GET, &path).send().await?;
        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn get_container_group_list(
        &self,
        resource_group: &str,
    ) -> Result<Vec<ContainerGroup>, Error> {
        let path = format!("/resourceGroups/{resource_group}/containerGroups");
        let resp = self.request(reqwest::Method::GET, &path).send().await?;
        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn delete_container_group(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), Error> {
        let path = format!("/resourceGroups/{resource_group}/containerGroups/{name}");
        let resp = self.request(reqwest::Method::DELETE, &path).send().await?;
        if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
            return Err(Self::fail(resp).await);
        }
        Ok(())
    }

    async fn list_logs(
        &self,
        resource_group: &str,
        container_group: &str,
        container: &str,
        opts: &LogOptions,
    ) -> Result<Option<String>, Error> {
        let path = format!(
            "/resourceGroups/{resource_group}/containerGroups/{container_group}/containers/{container}/logs"
        );
        let mut req = self.request(reqwest::Method::GET, &path);
        if let Some(tail) = opts.tail_lines {
            req = req.query(&[("tail", tail)]);
        }
        if let Some(since) = opts.since_seconds {
            req = req.query(&[("since", since)]);
        }
        if opts.timestamps {
            req = req.query(&[("timestamps", "true")]);
        }
        if opts.previous {
            req = req.query(&[("previous", "true")]);
        }
        let resp = req.send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }
        let body = resp.text().await?;
        if body.is_empty() {
            Ok(None)
        } else {
            Ok(Some(body))
        }
    }

    async fn list_capabilities(&self, region: &str) -> Result<Vec<RegionCapability>, Error> {
        let path = format!("/locations/{region}/capabilities");
        let resp = self.request(reqwest::Method::GET, &path).send().await?;
        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }
        Ok(resp.json().await?)
    }
}
