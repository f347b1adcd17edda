//! Elasticsearch-backed document store
//!
//! Speaks the store's JSON-over-HTTP API directly: conditional writes
//! ride on `if_seq_no`/`if_primary_term` query parameters and a
//! rejected precondition comes back as HTTP 409. Every write uses
//! `refresh=true` so the next search sees it, which is what lets the
//! two writers observe each other's revisions deterministically.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use urlencoding::encode;

use crate::config::Settings;
use crate::domain::{
    DocumentId, ItemId, PrimaryTerm, SeqNo, StockItem, VersionTokens, VersionedDocument,
};
use crate::error::{Error, Result};
use crate::store::{DocumentStore, IndexName, WriteOutcome};

use async_trait::async_trait;

type HttpClient = hyper_util::client::legacy::Client<
    hyper_util::client::legacy::connect::HttpConnector,
    Full<Bytes>,
>;

pub struct ElasticsearchStore {
    client: HttpClient,
    base_url: String,
    index: IndexName,
    request_timeout: Duration,
}

impl ElasticsearchStore {
    pub fn new(address: impl Into<String>, index: IndexName, request_timeout: Duration) -> Self {
        let client =
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build_http();

        Self {
            client,
            base_url: address.into().trim_end_matches('/').to_string(),
            index,
            request_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let index = IndexName::try_new(settings.store.index.clone())
            .map_err(|e| Error::InvalidIndexName(e.to_string()))?;

        Ok(Self::new(
            settings.store.address.clone(),
            index,
            settings.request_timeout(),
        ))
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, encode(self.index.as_ref()))
    }

    fn request(&self, method: Method, uri: &str, body: Full<Bytes>) -> Result<Request<Full<Bytes>>> {
        let uri: hyper::Uri = uri
            .parse()
            .map_err(|_| Error::InvalidUri(uri.to_string()))?;

        Ok(Request::builder()
            .method(method)
            .uri(uri)
            .header(hyper::header::CONTENT_TYPE, "application/json")
            .body(body)?)
    }

    fn json_request(
        &self,
        method: Method,
        uri: &str,
        payload: &impl Serialize,
    ) -> Result<Request<Full<Bytes>>> {
        let body = Full::new(Bytes::from(serde_json::to_vec(payload)?));
        self.request(method, uri, body)
    }

    async fn send(&self, request: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes)> {
        let response = tokio::time::timeout(self.request_timeout, self.client.request(request))
            .await
            .map_err(|_| Error::Timeout(self.request_timeout))??;

        let (parts, body) = response.into_parts();
        let bytes = body.collect().await?.to_bytes();

        Ok((parts.status, bytes))
    }
}

#[async_trait]
impl DocumentStore for ElasticsearchStore {
    async fn recreate_index(&self) -> Result<()> {
        let url = self.index_url();

        let delete = self.request(Method::DELETE, &url, Full::new(Bytes::new()))?;
        let (status, body) = self.send(delete).await?;
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(Error::Store {
                status,
                body: response_text(body),
            });
        }

        let mappings = json!({
            "mappings": {
                "properties": {
                    "id": { "type": "long" },
                    "stock": { "type": "long" },
                },
            },
        });
        let create = self.json_request(Method::PUT, &url, &mappings)?;
        let (status, body) = self.send(create).await?;
        if !status.is_success() {
            return Err(Error::Store {
                status,
                body: response_text(body),
            });
        }

        debug!(index = %self.index, "index recreated");
        Ok(())
    }

    async fn seed(&self, item: StockItem) -> Result<DocumentId> {
        let url = format!("{}/_doc?refresh=true", self.index_url());
        let request = self.json_request(Method::POST, &url, &item)?;

        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(Error::Store {
                status,
                body: response_text(body),
            });
        }

        let indexed: WriteResponse = serde_json::from_slice(&body)?;
        DocumentId::try_new(indexed.id)
            .map_err(|_| Error::InvalidResponse("empty document id".to_string()))
    }

    async fn find_by_item_id(&self, item_id: ItemId) -> Result<VersionedDocument> {
        let url = format!("{}/_search", self.index_url());
        let query = json!({
            "query": {
                "term": {
                    "id": item_id.into_inner(),
                },
            },
            "seq_no_primary_term": true,
        });
        let request = self.json_request(Method::POST, &url, &query)?;

        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(Error::Store {
                status,
                body: response_text(body),
            });
        }

        let response: SearchResponse = serde_json::from_slice(&body)?;
        let mut hits = response.hits.hits;
        match hits.len() {
            0 => Err(Error::DocumentMissing(item_id)),
            1 => hits.remove(0).into_document(),
            count => Err(Error::AmbiguousDocument { item_id, count }),
        }
    }

    async fn upsert(
        &self,
        id: &DocumentId,
        item: StockItem,
        precondition: Option<&VersionTokens>,
    ) -> Result<WriteOutcome> {
        let mut url = format!(
            "{}/_doc/{}?refresh=true",
            self.index_url(),
            encode(id.as_ref())
        );
        if let Some(version) = precondition {
            url.push_str(&format!(
                "&if_seq_no={}&if_primary_term={}",
                version.seq_no, version.primary_term
            ));
        }
        let request = self.json_request(Method::PUT, &url, &item)?;

        let (status, body) = self.send(request).await?;
        if status == StatusCode::CONFLICT {
            debug!(document_id = %id, "conditional write rejected");
            return Ok(WriteOutcome::VersionConflict);
        }
        if !status.is_success() {
            return Err(Error::Store {
                status,
                body: response_text(body),
            });
        }

        let written: WriteResponse = serde_json::from_slice(&body)?;
        Ok(WriteOutcome::Stored(version_tokens(
            written.seq_no,
            written.primary_term,
        )?))
    }
}

fn response_text(body: Bytes) -> String {
    String::from_utf8_lossy(&body).into_owned()
}

fn version_tokens(seq_no: u64, primary_term: u64) -> Result<VersionTokens> {
    let primary_term = PrimaryTerm::try_new(primary_term).map_err(|_| {
        Error::InvalidResponse(format!("primary term {primary_term} out of range"))
    })?;

    Ok(VersionTokens::new(SeqNo::from(seq_no), primary_term))
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_seq_no")]
    seq_no: u64,
    #[serde(rename = "_primary_term")]
    primary_term: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_seq_no")]
    seq_no: u64,
    #[serde(rename = "_primary_term")]
    primary_term: u64,
    #[serde(rename = "_source")]
    source: StockItem,
}

impl Hit {
    fn into_document(self) -> Result<VersionedDocument> {
        let id = DocumentId::try_new(self.id)
            .map_err(|_| Error::InvalidResponse("empty document id".to_string()))?;
        let version = version_tokens(self.seq_no, self.primary_term)?;

        Ok(VersionedDocument {
            id,
            item: self.source,
            version,
        })
    }
}
