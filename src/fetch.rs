//! HTTP transport for the task API
//!
//! Attaches the stored bearer token to outgoing requests and routes every
//! failure through the [`ErrorClassifier`] before it reaches the caller.

use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use url::Url;

use crate::classifier::{ErrorClassifier, Failure};
use crate::error::{Error, Result};
use crate::store::SessionStore;

/// Shared HTTP client for the remote gateways
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
    client_info: String,
    store: SessionStore,
    classifier: Arc<ErrorClassifier>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        http: Client,
        client_info: &str,
        store: SessionStore,
        classifier: Arc<ErrorClassifier>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!("not a base URL: {}", base_url)));
        }
        Ok(Self {
            base_url,
            http,
            client_info: client_info.to_string(),
            store,
            classifier,
        })
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("not a base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn request(&self, method: Method, segments: &[&str]) -> Result<FetchBuilder<'_>> {
        Ok(FetchBuilder::new(self, self.endpoint(segments)?, method))
    }

    pub fn get(&self, segments: &[&str]) -> Result<FetchBuilder<'_>> {
        self.request(Method::GET, segments)
    }

    pub fn post(&self, segments: &[&str]) -> Result<FetchBuilder<'_>> {
        self.request(Method::POST, segments)
    }

    pub fn put(&self, segments: &[&str]) -> Result<FetchBuilder<'_>> {
        self.request(Method::PUT, segments)
    }

    pub fn patch(&self, segments: &[&str]) -> Result<FetchBuilder<'_>> {
        self.request(Method::PATCH, segments)
    }

    pub fn delete(&self, segments: &[&str]) -> Result<FetchBuilder<'_>> {
        self.request(Method::DELETE, segments)
    }

    fn reject(&self, failure: Failure) -> Error {
        self.classifier.classify(failure)
    }
}

/// Helper for building and executing one request
pub struct FetchBuilder<'a> {
    api: &'a ApiClient,
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl<'a> FetchBuilder<'a> {
    fn new(api: &'a ApiClient, url: Url, method: Method) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&api.client_info) {
            headers.insert(HeaderName::from_static("x-client-info"), value);
        }

        Self {
            api,
            url,
            method,
            headers,
            body: None,
        }
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    fn build(&self) -> RequestBuilder {
        let mut headers = self.headers.clone();
        // Read at send time so a token stored after construction is used
        if let Some(token) = self.api.store.access_token() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        let mut req = self
            .api
            .http
            .request(self.method.clone(), self.url.clone())
            .headers(headers);
        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }
        req
    }

    async fn send(&self) -> Result<Response> {
        debug!("{} {}", self.method, self.url);
        let response = self
            .build()
            .send()
            .await
            .map_err(|e| self.api.reject(Failure::from_transport(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(self
                .api
                .reject(Failure::from_status(status.as_u16(), &body)));
        }
        Ok(response)
    }

    /// Execute the request and parse the response as JSON
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T> {
        let response = self.send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.api.reject(Failure::from_transport(&e)))?;

        serde_json::from_slice::<T>(&body).map_err(|e| {
            self.api.reject(Failure::Malformed {
                status,
                detail: e.to_string(),
            })
        })
    }

    /// Execute the request and parse the response as JSON when there is
    /// something to parse. A 2xx with an empty or undecodable body is still
    /// a success and yields `None`.
    pub async fn execute_optional<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let response = self.send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.api.reject(Failure::from_transport(&e)))?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        match serde_json::from_slice::<T>(&body) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                debug!("Ignoring {} response body from {}: {}", status, self.url, e);
                Ok(None)
            }
        }
    }

    /// Execute the request, discarding the response body
    pub async fn execute_empty(&self) -> Result<()> {
        self.send().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionHandle;
    use crate::navigation::RouteState;
    use crate::notice::LogNoticeSink;

    fn api(base: &str) -> Result<ApiClient> {
        let store = SessionStore::in_memory();
        let classifier = ErrorClassifier::new(
            Arc::new(LogNoticeSink),
            SessionHandle::new(store.clone()),
            Arc::new(RouteState::default()),
        );
        ApiClient::new(base, Client::new(), "test/0.0.0", store, Arc::new(classifier))
    }

    #[test]
    fn endpoint_joins_and_encodes_segments() {
        let api = api("http://localhost:3000").unwrap();
        assert_eq!(
            api.endpoint(&["api", "task", "42"]).unwrap().as_str(),
            "http://localhost:3000/api/task/42"
        );
        assert_eq!(
            api.endpoint(&["api", "task", "a/b c"]).unwrap().as_str(),
            "http://localhost:3000/api/task/a%2Fb%20c"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let api = api("http://localhost:3000/v2/").unwrap();
        assert_eq!(
            api.endpoint(&["api", "auth", "login"]).unwrap().as_str(),
            "http://localhost:3000/v2/api/auth/login"
        );
    }

    #[test]
    fn non_base_urls_are_rejected() {
        assert!(matches!(api("mailto:someone@example.com"), Err(Error::Config(_))));
        assert!(matches!(api("not a url"), Err(Error::Url(_))));
    }
}
