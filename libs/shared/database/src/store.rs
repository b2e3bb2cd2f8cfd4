use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// REST client for the document store. Collections are addressed as
/// `/v1/{collection}` with filter expressions in the query string
/// (`field=eq.X`, `date=gte.T`, `status=in.(a,b)`, `order=`, `limit=`,
/// `offset=`). The client authenticates with the service key from config;
/// request-level authorization happens in the handlers.
pub struct StoreClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl StoreClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.store_url.clone(),
            service_key: config.store_service_key.clone(),
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.service_key)) {
            headers.insert(AUTHORIZATION, value);
        }

        headers
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers();
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Store error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("Store error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Fetch all documents matching a filter expression.
    pub async fn find(&self, collection: &str, query: &str) -> Result<Vec<Value>> {
        let path = if query.is_empty() {
            format!("/v1/{}", collection)
        } else {
            format!("/v1/{}?{}", collection, query)
        };
        self.request(Method::GET, &path, None).await
    }

    /// Fetch the first document matching a filter expression, if any.
    pub async fn find_one(&self, collection: &str, query: &str) -> Result<Option<Value>> {
        let result = self.find(collection, query).await?;
        Ok(result.into_iter().next())
    }

    /// Insert a document and return the stored representation.
    pub async fn insert(&self, collection: &str, document: Value) -> Result<Value> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .request_with_headers(
                Method::POST,
                &format!("/v1/{}", collection),
                Some(document),
                Some(headers),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Insert into {} returned no document", collection))
    }

    /// Patch documents matching a filter expression and return the updated
    /// representations.
    pub async fn update(&self, collection: &str, query: &str, patch: Value) -> Result<Vec<Value>> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(
            Method::PATCH,
            &format!("/v1/{}?{}", collection, query),
            Some(patch),
            Some(headers),
        )
        .await
    }

    /// Count documents matching a filter expression via an id projection.
    pub async fn count(&self, collection: &str, query: &str) -> Result<i64> {
        let path = if query.is_empty() {
            format!("/v1/{}?select=id", collection)
        } else {
            format!("/v1/{}?{}&select=id", collection, query)
        };
        let result: Vec<Value> = self.request(Method::GET, &path, None).await?;
        Ok(result.len() as i64)
    }
}
