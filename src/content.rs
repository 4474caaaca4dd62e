use std::collections::HashSet;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use url::Url;

use crate::document::{ApiRoot, RawDocument, SearchResponse};
use crate::error::ContentError;
use crate::fetcher::Fetcher;

const REF_TTL: Duration = Duration::from_secs(5);
const ENUMERATION_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }

    fn to_query(&self) -> String {
        match self {
            Predicate::At { path, value } => {
                let quoted = serde_json::Value::String(value.clone()).to_string();
                format!("[at({path},{quoted})]")
            }
        }
    }
}

pub fn query_string(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(Predicate::to_query).collect();
    format!("[{inner}]")
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub page_size: Option<u32>,
    pub page: Option<u32>,
    pub orderings: Option<String>,
}

#[derive(Clone)]
pub struct ContentClient {
    endpoint: Url,
    search_url: Url,
    access_token: Option<String>,
    fetcher: Fetcher,
    master_ref: std::sync::Arc<Mutex<Option<(Instant, String)>>>,
}

impl ContentClient {
    pub fn new(
        endpoint: Url,
        access_token: Option<String>,
        fetcher: Fetcher,
    ) -> anyhow::Result<Self> {
        let mut search_url = endpoint.clone();
        search_url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("endpoint {} cannot be a base url", endpoint))?
            .pop_if_empty()
            .push("documents")
            .push("search");
        Ok(Self {
            endpoint,
            search_url,
            access_token: access_token.filter(|t| !t.trim().is_empty()),
            fetcher,
            master_ref: std::sync::Arc::new(Mutex::new(None)),
        })
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<SearchResponse, ContentError> {
        let reference = self.master_ref().await?;
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", &reference);
            pairs.append_pair("q", &query_string(predicates));
            if let Some(size) = options.page_size {
                pairs.append_pair("pageSize", &size.to_string());
            }
            if let Some(page) = options.page {
                pairs.append_pair("page", &page.to_string());
            }
            if let Some(orderings) = &options.orderings {
                pairs.append_pair("orderings", orderings);
            }
            if let Some(token) = &self.access_token {
                pairs.append_pair("access_token", token);
            }
        }
        tracing::debug!(%url, "query");
        self.fetcher.get_json(&url).await
    }

    pub async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
    ) -> Result<Option<RawDocument>, ContentError> {
        let predicate = Predicate::at(format!("my.{doc_type}.uid"), uid);
        let resp = self
            .query(
                &[predicate],
                &QueryOptions {
                    page_size: Some(1),
                    ..QueryOptions::default()
                },
            )
            .await?;
        Ok(resp.results.into_iter().next())
    }

    pub async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse, ContentError> {
        let mut url = self.check_cursor(cursor)?;
        if let Some(token) = &self.access_token {
            if !url.query_pairs().any(|(k, _)| k == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }
        self.fetcher.get_json(&url).await
    }

    pub async fn all_uids(
        &self,
        doc_type: &str,
        orderings: Option<&str>,
    ) -> Result<Vec<String>, ContentError> {
        let options = QueryOptions {
            page_size: Some(ENUMERATION_PAGE_SIZE),
            orderings: orderings.map(str::to_string),
            ..QueryOptions::default()
        };
        let mut resp = self
            .query(&[Predicate::at("document.type", doc_type)], &options)
            .await?;

        let mut seen_cursors = HashSet::new();
        let mut uids = Vec::new();
        loop {
            for doc in &resp.results {
                match &doc.uid {
                    Some(uid) if !uid.is_empty() => uids.push(uid.clone()),
                    _ => tracing::warn!(id = ?doc.id, "document without uid skipped"),
                }
            }
            let Some(next) = resp.next_page.filter(|n| !n.is_empty()) else {
                break;
            };
            if !seen_cursors.insert(next.clone()) {
                tracing::warn!(cursor = %next, "pagination cycle detected; stopping");
                break;
            }
            resp = self.fetch_page(&next).await?;
        }
        Ok(uids)
    }

    /// Only cursors on the configured endpoint's origin are followed.
    pub fn check_cursor(&self, cursor: &str) -> Result<Url, ContentError> {
        let url = Url::parse(cursor.trim())
            .map_err(|_| ContentError::ForeignCursor(cursor.to_string()))?;
        let same_origin = url.scheme() == self.endpoint.scheme()
            && url.host_str() == self.endpoint.host_str()
            && url.port_or_known_default() == self.endpoint.port_or_known_default();
        if !same_origin {
            return Err(ContentError::ForeignCursor(cursor.to_string()));
        }
        Ok(url)
    }

    async fn master_ref(&self) -> Result<String, ContentError> {
        let mut cached = self.master_ref.lock().await;
        if let Some((at, reference)) = cached.as_ref() {
            if at.elapsed() < REF_TTL {
                return Ok(reference.clone());
            }
        }

        let mut url = self.endpoint.clone();
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        let root: ApiRoot = self.fetcher.get_json(&url).await?;
        let reference = root
            .master_ref()
            .ok_or(ContentError::NoMasterRef)?
            .to_string();
        tracing::debug!(reference = %reference, "resolved master ref");
        *cached = Some((Instant::now(), reference.clone()));
        Ok(reference)
    }
}
