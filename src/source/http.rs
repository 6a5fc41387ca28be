//! HTTP node source
//!
//! Talks JSON to a remote entity store exposing `POST /nodes/list`,
//! `POST /nodes/search` and `POST /nodes/byids`.

use crate::error::SourceError;
use crate::source::NodeSource;
use crate::types::{Node, NodeFilter, NodeId, NodePage, PageRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct HttpSource {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    filter: &'a NodeFilter,
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
    aggregated_properties: [&'static str; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    search: SearchText<'a>,
    filter: &'a NodeFilter,
    limit: u32,
    aggregated_properties: [&'static str; 1],
}

#[derive(Serialize)]
struct SearchText<'a> {
    query: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveRequest<'a> {
    items: Vec<IdRef<'a>>,
    ignore_unknown_ids: bool,
    aggregated_properties: [&'static str; 1],
}

#[derive(Serialize)]
struct IdRef<'a> {
    id: &'a NodeId,
}

#[derive(Deserialize)]
struct ItemsResponse {
    items: Vec<Node>,
}

const CHILD_COUNT: [&str; 1] = ["childCount"];

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Request(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, SourceError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                code: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

fn map_http_error(error: reqwest::Error) -> SourceError {
    if error.is_timeout() {
        SourceError::Unavailable(format!("Request timed out: {}", error))
    } else if error.is_connect() {
        SourceError::Unavailable(format!("Connection failed: {}", error))
    } else {
        SourceError::Request(error.to_string())
    }
}

#[async_trait]
impl NodeSource for HttpSource {
    async fn list(&self, filter: &NodeFilter, page: &PageRequest) -> Result<NodePage, SourceError> {
        let body = ListRequest {
            filter,
            limit: page.limit,
            cursor: page.cursor.as_deref(),
            aggregated_properties: CHILD_COUNT,
        };
        self.post("nodes/list", &body).await
    }

    async fn search(
        &self,
        query: &str,
        filter: &NodeFilter,
        limit: u32,
    ) -> Result<Vec<Node>, SourceError> {
        let body = SearchRequest {
            search: SearchText { query },
            filter,
            limit,
            aggregated_properties: CHILD_COUNT,
        };
        let response: ItemsResponse = self.post("nodes/search", &body).await?;
        Ok(response.items)
    }

    async fn retrieve(&self, ids: &[NodeId]) -> Result<Vec<Node>, SourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = RetrieveRequest {
            items: ids.iter().map(|id| IdRef { id }).collect(),
            ignore_unknown_ids: true,
            aggregated_properties: CHILD_COUNT,
        };
        let response: ItemsResponse = self.post("nodes/byids", &body).await?;
        Ok(response.items)
    }

    fn source_name(&self) -> &str {
        "http"
    }
}
