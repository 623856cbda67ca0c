//! HTTP plumbing for inkport: the shared fetcher, the WordPress read API client
//! and the Sanity content store client.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use inkport_core::{AssetReference, LocaleString, NewDocument, StoredCategory};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use tracing::{debug, info_span, Instrument};

pub const CRATE_NAME: &str = "inkport-storage";

/// Status the WordPress REST API answers with once `page` runs past the last page.
pub const WP_PAGE_OUT_OF_RANGE: StatusCode = StatusCode::BAD_REQUEST;

const ERROR_DETAIL_LIMIT: usize = 300;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}: {detail}")]
    HttpStatus {
        status: u16,
        url: String,
        detail: String,
    },
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected response from {url}: {reason}")]
    UnexpectedResponse { url: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

/// Thin wrapper over a shared `reqwest::Client`. Requests are never retried.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// GET `url` and return the body of a 2xx response.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let span = info_span!("http_fetch", url);
        async {
            let resp = self.client.get(url).send().await?;
            if !resp.status().is_success() {
                return Err(status_error(resp).await);
            }
            if resp.url().as_str() != url {
                debug!(final_url = %resp.url(), "followed redirect");
            }
            let body = resp.bytes().await?.to_vec();
            debug!(bytes = body.len(), "fetched");
            Ok(body)
        }
        .instrument(span)
        .await
    }
}

async fn status_error(resp: reqwest::Response) -> FetchError {
    let status = resp.status().as_u16();
    let url = resp.url().to_string();
    let mut detail = resp.text().await.unwrap_or_default();
    if detail.len() > ERROR_DETAIL_LIMIT {
        let mut cut = ERROR_DETAIL_LIMIT;
        while !detail.is_char_boundary(cut) {
            cut -= 1;
        }
        detail.truncate(cut);
    }
    FetchError::HttpStatus {
        status,
        url,
        detail,
    }
}

fn decode_json<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, FetchError> {
    serde_json::from_slice(body).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Downloads binary payloads (images) by absolute URL.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
impl Downloader for HttpFetcher {
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_bytes(url).await
    }
}

/// Final non-empty path segment of `url`, or `image.jpg` when there is none.
pub fn filename_from_url(url: &str) -> Result<String, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| "image.jpg".to_string()))
}

/// One page of a paginated source listing.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePage {
    Items(Vec<JsonValue>),
    /// The source signalled that `page` is past the end.
    OutOfRange,
}

/// Read side of the source blogging platform. Records are returned raw and
/// mapped into core types by `inkport-adapters`.
#[async_trait]
pub trait SourceApi: Send + Sync {
    async fn fetch_page(
        &self,
        endpoint: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SourcePage, FetchError>;

    /// `None` when the record cannot be read (private profile, deleted user, ...).
    async fn fetch_user(&self, user_id: u64) -> Result<Option<JsonValue>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct WordPressClient {
    base_url: String,
    http: HttpFetcher,
}

impl WordPressClient {
    pub fn new(base_url: impl Into<String>, http: HttpFetcher) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn page_url(&self, endpoint: &str, page: u32, per_page: u32) -> String {
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}per_page={}&page={}",
            self.base_url, endpoint, separator, per_page, page
        )
    }
}

#[async_trait]
impl SourceApi for WordPressClient {
    async fn fetch_page(
        &self,
        endpoint: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SourcePage, FetchError> {
        let url = self.page_url(endpoint, page, per_page);
        let span = info_span!("wp_page", endpoint, page, per_page);
        async {
            let resp = self.http.client().get(&url).send().await?;
            let status = resp.status();
            if status == WP_PAGE_OUT_OF_RANGE {
                return Ok(SourcePage::OutOfRange);
            }
            if !status.is_success() {
                return Err(status_error(resp).await);
            }
            let body = resp.bytes().await?;
            match decode_json::<JsonValue>(&url, &body)? {
                JsonValue::Array(items) => Ok(SourcePage::Items(items)),
                _ => Ok(SourcePage::Items(Vec::new())),
            }
        }
        .instrument(span)
        .await
    }

    async fn fetch_user(&self, user_id: u64) -> Result<Option<JsonValue>, FetchError> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        let resp = self.http.client().get(&url).send().await?;
        if !resp.status().is_success() {
            debug!(user_id, status = resp.status().as_u16(), "user lookup not available");
            return Ok(None);
        }
        let body = resp.bytes().await?;
        decode_json(&url, &body).map(Some)
    }
}

/// Newest post in a category that carries a main image. The image is kept
/// as stored (hotspot, crop and any other fields included).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LatestPostImage {
    #[serde(default)]
    pub title: LocaleString,
    #[serde(rename = "mainImage", default)]
    pub main_image: Option<JsonValue>,
}

/// Query, create, patch and asset upload operations on the destination store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<String>, FetchError>;
    async fn find_author_by_name(&self, name: &str) -> Result<Option<String>, FetchError>;
    async fn find_category_by_title(&self, title: &str) -> Result<Option<String>, FetchError>;
    /// Persist a new document and return its generated id.
    async fn create_document(&self, doc: &NewDocument) -> Result<String, FetchError>;
    async fn upload_image(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<AssetReference, FetchError>;
    async fn list_categories(&self) -> Result<Vec<StoredCategory>, FetchError>;
    async fn latest_post_image(
        &self,
        category_id: &str,
    ) -> Result<Option<LatestPostImage>, FetchError>;
    async fn set_category_image(
        &self,
        category_id: &str,
        image: &JsonValue,
    ) -> Result<(), FetchError>;
}

pub const POST_BY_SLUG_QUERY: &str = r#"*[_type == "post" && slug.current == $slug][0]._id"#;
pub const AUTHOR_BY_NAME_QUERY: &str = r#"*[_type == "author" && name == $name][0]._id"#;
pub const CATEGORY_BY_TITLE_QUERY: &str = r#"*[_type == "category" && title.sv == $name][0]._id"#;
pub const ALL_CATEGORIES_QUERY: &str = r#"*[_type == "category"]{ _id, title }"#;
pub const LATEST_POST_IMAGE_QUERY: &str = r#"*[_type == "post" && references($catId) && defined(mainImage)] | order(publishedAt desc)[0]{ title, mainImage }"#;

#[derive(Debug, Clone)]
pub struct SanityConfig {
    pub project_id: String,
    pub dataset: String,
    pub token: String,
    pub api_version: String,
    /// Overrides `https://{project_id}.api.sanity.io`.
    pub api_host: Option<String>,
}

impl SanityConfig {
    pub fn api_base(&self) -> String {
        let host = match &self.api_host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://{}.api.sanity.io", self.project_id),
        };
        format!("{}/v{}", host, self.api_version.trim_start_matches('v'))
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    #[serde(default)]
    results: Vec<MutationResult>,
}

#[derive(Debug, Deserialize)]
struct MutationResult {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AssetUploadResponse {
    document: AssetDocument,
}

#[derive(Debug, Deserialize)]
struct AssetDocument {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Clone)]
pub struct SanityClient {
    config: SanityConfig,
    api_base: String,
    http: HttpFetcher,
}

impl SanityClient {
    pub fn new(config: SanityConfig, http: HttpFetcher) -> Self {
        let api_base = config.api_base();
        Self {
            config,
            api_base,
            http,
        }
    }

    pub fn query_url(&self, groq: &str, params: &[(&str, &str)]) -> Result<Url, FetchError> {
        let raw = format!("{}/data/query/{}", self.api_base, self.config.dataset);
        let mut url = Url::parse(&raw).map_err(|e| FetchError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", groq);
            for (name, value) in params {
                // Parameter values travel JSON-encoded.
                pairs.append_pair(&format!("${name}"), &JsonValue::from(*value).to_string());
            }
        }
        Ok(url)
    }

    pub async fn query<T: DeserializeOwned>(
        &self,
        groq: &str,
        params: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = self.query_url(groq, params)?;
        let resp = self
            .http
            .client()
            .get(url.clone())
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        let body = resp.bytes().await?;
        let parsed: QueryResponse<T> = decode_json(url.as_str(), &body)?;
        Ok(parsed.result)
    }

    async fn mutate(&self, mutation: JsonValue) -> Result<MutationResponse, FetchError> {
        let url = format!(
            "{}/data/mutate/{}?returnIds=true",
            self.api_base, self.config.dataset
        );
        let resp = self
            .http
            .client()
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&json!({ "mutations": [mutation] }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        let body = resp.bytes().await?;
        decode_json(&url, &body)
    }
}

#[async_trait]
impl ContentStore for SanityClient {
    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<String>, FetchError> {
        self.query(POST_BY_SLUG_QUERY, &[("slug", slug)]).await
    }

    async fn find_author_by_name(&self, name: &str) -> Result<Option<String>, FetchError> {
        self.query(AUTHOR_BY_NAME_QUERY, &[("name", name)]).await
    }

    async fn find_category_by_title(&self, title: &str) -> Result<Option<String>, FetchError> {
        self.query(CATEGORY_BY_TITLE_QUERY, &[("name", title)]).await
    }

    async fn create_document(&self, doc: &NewDocument) -> Result<String, FetchError> {
        let span = info_span!("sanity_create", doc_type = doc.type_name());
        async {
            let payload = serde_json::to_value(doc).map_err(|source| FetchError::Decode {
                url: self.api_base.clone(),
                source,
            })?;
            let response = self.mutate(json!({ "create": payload })).await?;
            response
                .results
                .into_iter()
                .next()
                .map(|r| r.id)
                .ok_or_else(|| FetchError::UnexpectedResponse {
                    url: self.api_base.clone(),
                    reason: "create mutation returned no document id".to_string(),
                })
        }
        .instrument(span)
        .await
    }

    async fn upload_image(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<AssetReference, FetchError> {
        let raw = format!("{}/assets/images/{}", self.api_base, self.config.dataset);
        let mut url = Url::parse(&raw).map_err(|e| FetchError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("filename", filename);

        let resp = self
            .http
            .client()
            .post(url.clone())
            .bearer_auth(&self.config.token)
            .body(bytes)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        let body = resp.bytes().await?;
        let uploaded: AssetUploadResponse = decode_json(url.as_str(), &body)?;
        Ok(AssetReference::to(uploaded.document.id))
    }

    async fn list_categories(&self) -> Result<Vec<StoredCategory>, FetchError> {
        self.query(ALL_CATEGORIES_QUERY, &[]).await
    }

    async fn latest_post_image(
        &self,
        category_id: &str,
    ) -> Result<Option<LatestPostImage>, FetchError> {
        self.query(LATEST_POST_IMAGE_QUERY, &[("catId", category_id)])
            .await
    }

    async fn set_category_image(
        &self,
        category_id: &str,
        image: &JsonValue,
    ) -> Result<(), FetchError> {
        self.mutate(json!({
            "patch": {
                "id": category_id,
                "set": { "image": image },
            }
        }))
        .await?;
        Ok(())
    }
}
