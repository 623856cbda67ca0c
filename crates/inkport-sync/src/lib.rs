//! Migration orchestration: category sync, per-post assembly, asset re-hosting
//! and the category image linker.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use inkport_adapters::{html_to_drafts, parse_author, parse_category, parse_post, AdapterError, BlockDraft};
use inkport_core::{
    author_slug, AssetReference, AuthorDocument, CategoryDocument, ContentBlock, ImageBlock,
    KeyGenerator, KeyedReference, LocaleBlock, LocaleString, MainImage, NewDocument, PostDocument,
    RandomKeys, Reference, Slug, SourceCategory, SourcePost,
};
use inkport_storage::{
    filename_from_url, ContentStore, Downloader, HttpClientConfig, HttpFetcher, SanityClient,
    SanityConfig, SourceApi, SourcePage, WordPressClient,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "inkport-sync";

pub const DEFAULT_WP_BASE_URL: &str =
    "https://public-api.wordpress.com/wp/v2/sites/dagsaktuell.wordpress.com";
pub const DEFAULT_SANITY_API_VERSION: &str = "2024-02-09";
pub const DEFAULT_FALLBACK_AUTHOR: &str = "Dagsaktuellt";
const TOKEN_PLACEHOLDER: &str = "YOUR_SANITY_WRITE_TOKEN";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("SANITY_TOKEN still holds the placeholder value; set a real write token")]
    PlaceholderToken,
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub sanity: SanityConfig,
    pub wp_base_url: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub settings: DriverSettings,
}

impl MigrationConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let token = required("SANITY_TOKEN")?;
        if token.contains(TOKEN_PLACEHOLDER) {
            return Err(ConfigError::PlaceholderToken);
        }
        let project_id = required("SANITY_PROJECT_ID")?;
        let dataset = required("SANITY_DATASET")?;

        let millis = |key: &str, default: u64| {
            Duration::from_millis(
                lookup(key)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default),
            )
        };

        Ok(Self {
            sanity: SanityConfig {
                project_id,
                dataset,
                token,
                api_version: lookup("SANITY_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_SANITY_API_VERSION.to_string()),
                api_host: lookup("SANITY_API_HOST").filter(|v| !v.trim().is_empty()),
            },
            wp_base_url: lookup("WP_BASE_URL").unwrap_or_else(|| DEFAULT_WP_BASE_URL.to_string()),
            user_agent: lookup("INKPORT_USER_AGENT").unwrap_or_else(|| "inkport/0.1".to_string()),
            http_timeout_secs: lookup("INKPORT_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            settings: DriverSettings {
                page_delay: millis("INKPORT_PAGE_DELAY_MS", 300),
                post_delay: millis("INKPORT_POST_DELAY_MS", 500),
                fallback_author: lookup("INKPORT_FALLBACK_AUTHOR")
                    .unwrap_or_else(|| DEFAULT_FALLBACK_AUTHOR.to_string()),
                ..DriverSettings::default()
            },
        })
    }

    pub fn http_fetcher(&self) -> Result<HttpFetcher> {
        HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: Some(self.user_agent.clone()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub page_delay: Duration,
    pub post_delay: Duration,
    pub fallback_author: String,
    pub categories_per_page: u32,
    pub posts_per_page: u32,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_millis(300),
            post_delay: Duration::from_millis(500),
            fallback_author: DEFAULT_FALLBACK_AUTHOR.to_string(),
            categories_per_page: 100,
            posts_per_page: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Read every page of `endpoint` until an empty page or an out-of-range signal.
pub async fn fetch_all<T>(
    source: &dyn SourceApi,
    endpoint: &str,
    per_page: u32,
    delay: Duration,
    parse: fn(&JsonValue) -> Result<T, AdapterError>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    let mut page = 1u32;
    loop {
        info!(endpoint, page, per_page, "fetching page");
        let items = match source
            .fetch_page(endpoint, page, per_page)
            .await
            .with_context(|| format!("fetching {endpoint} page {page}"))?
        {
            SourcePage::OutOfRange => break,
            SourcePage::Items(items) if items.is_empty() => break,
            SourcePage::Items(items) => items,
        };
        for item in &items {
            out.push(parse(item).with_context(|| format!("parsing {endpoint} page {page}"))?);
        }
        page += 1;
        tokio::time::sleep(delay).await;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Asset re-hosting
// ---------------------------------------------------------------------------

/// Downloads an image and uploads it to the destination store. Every failure
/// degrades to `None`.
pub struct AssetRehoster<'a> {
    downloader: &'a dyn Downloader,
    store: &'a dyn ContentStore,
}

impl<'a> AssetRehoster<'a> {
    pub fn new(downloader: &'a dyn Downloader, store: &'a dyn ContentStore) -> Self {
        Self { downloader, store }
    }

    pub async fn rehost(&self, url: &str) -> Option<AssetReference> {
        info!(url, "downloading image");
        let bytes = match self.downloader.download(url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(url, error = %err, "failed to download image");
                return None;
            }
        };
        let filename = match filename_from_url(url) {
            Ok(name) => name,
            Err(err) => {
                warn!(url, error = %err, "cannot derive image filename");
                return None;
            }
        };
        match self.store.upload_image(&filename, bytes).await {
            Ok(asset) => {
                info!(asset = %asset.id, "uploaded image");
                Some(asset)
            }
            Err(err) => {
                warn!(url, error = %err, "image upload failed");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entity resolution
// ---------------------------------------------------------------------------

/// Run-scoped find-or-create for authors and categories, keyed by source id.
/// Names are matched exactly; stored entities are never updated.
#[derive(Debug, Default)]
pub struct EntityResolver {
    authors: HashMap<u64, String>,
    categories: HashMap<u64, String>,
    fallback_author: String,
}

impl EntityResolver {
    pub fn new(fallback_author: impl Into<String>) -> Self {
        Self {
            fallback_author: fallback_author.into(),
            ..Self::default()
        }
    }

    pub fn category_id(&self, source_id: u64) -> Option<&str> {
        self.categories.get(&source_id).map(String::as_str)
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub async fn resolve_category(
        &mut self,
        store: &dyn ContentStore,
        category: &SourceCategory,
    ) -> Result<String> {
        if let Some(id) = self.categories.get(&category.id) {
            return Ok(id.clone());
        }
        let id = match store
            .find_category_by_title(&category.name)
            .await
            .with_context(|| format!("looking up category {:?}", category.name))?
        {
            Some(existing) => {
                info!(name = %category.name, id = %existing, "category already exists");
                existing
            }
            None => {
                let doc = NewDocument::Category(CategoryDocument {
                    title: LocaleString::swedish(category.name.clone()),
                    description: LocaleString::swedish(
                        category.description.clone().unwrap_or_default(),
                    ),
                });
                let id = store
                    .create_document(&doc)
                    .await
                    .with_context(|| format!("creating category {:?}", category.name))?;
                info!(name = %category.name, id = %id, "created category");
                id
            }
        };
        self.categories.insert(category.id, id.clone());
        Ok(id)
    }

    pub async fn resolve_author(
        &mut self,
        source: &dyn SourceApi,
        store: &dyn ContentStore,
        author_id: u64,
    ) -> Result<String> {
        if let Some(id) = self.authors.get(&author_id) {
            return Ok(id.clone());
        }
        info!(author_id, "resolving author");
        let name = self.author_name(source, author_id).await;
        let id = find_or_create_author(store, &name).await?;
        self.authors.insert(author_id, id.clone());
        Ok(id)
    }

    /// Display name from the source user record, or the fallback when the
    /// lookup fails or the record has no name.
    async fn author_name(&self, source: &dyn SourceApi, author_id: u64) -> String {
        let record = match source.fetch_user(author_id).await {
            Ok(record) => record,
            Err(err) => {
                warn!(author_id, error = %err, "source user lookup failed");
                None
            }
        };
        let author = record.and_then(|value| match parse_author(&value) {
            Ok(author) => author,
            Err(err) => {
                warn!(author_id, error = %err, "unreadable source user");
                None
            }
        });
        author
            .map(|a| a.name)
            .unwrap_or_else(|| self.fallback_author.clone())
    }
}

pub async fn find_or_create_author(store: &dyn ContentStore, name: &str) -> Result<String> {
    if let Some(existing) = store
        .find_author_by_name(name)
        .await
        .with_context(|| format!("looking up author {name:?}"))?
    {
        info!(name, id = %existing, "author already exists");
        return Ok(existing);
    }
    let doc = NewDocument::Author(AuthorDocument {
        name: name.to_string(),
        slug: Slug {
            current: author_slug(name),
        },
    });
    let id = store
        .create_document(&doc)
        .await
        .with_context(|| format!("creating author {name:?}"))?;
    info!(name, id = %id, "created author");
    Ok(id)
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MigrationPhase {
    Pending,
    SyncingCategories,
    FetchingPosts,
    ProcessingPosts { index: usize, total: usize },
    Summarizing,
    Done,
    /// Preflight rejected the configuration; nothing was attempted.
    Failed,
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::SyncingCategories => write!(f, "syncing categories"),
            Self::FetchingPosts => write!(f, "fetching posts"),
            Self::ProcessingPosts { index, total } => {
                write!(f, "processing post {}/{}", index + 1, total)
            }
            Self::Summarizing => write!(f, "summarizing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    AllPosts,
    /// Smoke test: only the newest post.
    FirstPostOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PostOutcome {
    Created { id: String },
    Skipped { existing_id: String },
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PostReport {
    pub source_id: u64,
    pub slug: String,
    pub title: String,
    pub outcome: PostOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub categories: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub posts: Vec<PostReport>,
}

/// Preflight: read the configuration from the environment, logging the
/// `Failed` phase when it is unusable.
pub fn preflight_from_env() -> Result<MigrationConfig, ConfigError> {
    MigrationConfig::from_env().inspect_err(|err| {
        error!(phase = %MigrationPhase::Failed, error = %err, "refusing to start");
    })
}

pub struct MigrationDriver {
    source: Arc<dyn SourceApi>,
    store: Arc<dyn ContentStore>,
    downloader: Arc<dyn Downloader>,
    keys: Arc<dyn KeyGenerator>,
    settings: DriverSettings,
    resolver: EntityResolver,
    phase: MigrationPhase,
}

impl MigrationDriver {
    pub fn new(
        source: Arc<dyn SourceApi>,
        store: Arc<dyn ContentStore>,
        downloader: Arc<dyn Downloader>,
        keys: Arc<dyn KeyGenerator>,
        settings: DriverSettings,
    ) -> Self {
        let resolver = EntityResolver::new(settings.fallback_author.clone());
        Self {
            source,
            store,
            downloader,
            keys,
            settings,
            resolver,
            phase: MigrationPhase::Pending,
        }
    }

    pub fn from_config(config: &MigrationConfig) -> Result<Self> {
        let http = config.http_fetcher()?;
        let source = WordPressClient::new(config.wp_base_url.clone(), http.clone());
        let store = SanityClient::new(config.sanity.clone(), http.clone());
        Ok(Self::new(
            Arc::new(source),
            Arc::new(store),
            Arc::new(http),
            Arc::new(RandomKeys),
            config.settings.clone(),
        ))
    }

    pub fn phase(&self) -> MigrationPhase {
        self.phase
    }

    fn enter(&mut self, phase: MigrationPhase) {
        self.phase = phase;
        info!(phase = %phase, "migration phase");
    }

    pub async fn run(&mut self, mode: RunMode) -> Result<MigrationSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("migration", %run_id);
        self.run_inner(run_id, mode).instrument(span).await
    }

    async fn run_inner(&mut self, run_id: Uuid, mode: RunMode) -> Result<MigrationSummary> {
        let started_at = Utc::now();
        info!(?mode, "starting migration");

        self.enter(MigrationPhase::SyncingCategories);
        self.sync_categories().await?;

        self.enter(MigrationPhase::FetchingPosts);
        let posts = self.fetch_posts(mode).await?;
        info!(count = posts.len(), "posts to migrate");

        let total = posts.len();
        let mut reports = Vec::with_capacity(total);
        for (index, post) in posts.iter().enumerate() {
            self.enter(MigrationPhase::ProcessingPosts { index, total });
            info!(title = %post.title, slug = %post.slug, date = %post.published_at, "processing post");

            let outcome = self
                .migrate_post(post)
                .instrument(info_span!("post", source_id = post.id, slug = %post.slug))
                .await;
            match &outcome {
                PostOutcome::Created { id } => info!(title = %post.title, id = %id, "created post"),
                PostOutcome::Skipped { existing_id } => {
                    info!(slug = %post.slug, existing = %existing_id, "post already exists, skipping")
                }
                PostOutcome::Failed { message } => {
                    error!(title = %post.title, error = %message, "failed to migrate post")
                }
            }
            let wrote = !matches!(outcome, PostOutcome::Skipped { .. });
            reports.push(PostReport {
                source_id: post.id,
                slug: post.slug.clone(),
                title: post.title.clone(),
                outcome,
            });
            if wrote {
                tokio::time::sleep(self.settings.post_delay).await;
            }
        }

        self.enter(MigrationPhase::Summarizing);
        let count = |pred: fn(&PostOutcome) -> bool| reports.iter().filter(|r| pred(&r.outcome)).count();
        let summary = MigrationSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            categories: self.resolver.category_count(),
            total,
            succeeded: count(|o| matches!(o, PostOutcome::Created { .. })),
            failed: count(|o| matches!(o, PostOutcome::Failed { .. })),
            skipped: count(|o| matches!(o, PostOutcome::Skipped { .. })),
            posts: reports,
        };
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "migration complete"
        );
        self.enter(MigrationPhase::Done);
        Ok(summary)
    }

    async fn sync_categories(&mut self) -> Result<()> {
        let categories = fetch_all(
            self.source.as_ref(),
            "/categories",
            self.settings.categories_per_page,
            self.settings.page_delay,
            parse_category,
        )
        .await?;
        info!(count = categories.len(), "source categories");
        for category in &categories {
            self.resolver
                .resolve_category(self.store.as_ref(), category)
                .await?;
        }
        Ok(())
    }

    async fn fetch_posts(&self, mode: RunMode) -> Result<Vec<SourcePost>> {
        match mode {
            RunMode::AllPosts => {
                fetch_all(
                    self.source.as_ref(),
                    "/posts",
                    self.settings.posts_per_page,
                    self.settings.page_delay,
                    parse_post,
                )
                .await
            }
            RunMode::FirstPostOnly => {
                let page = self
                    .source
                    .fetch_page("/posts", 1, 1)
                    .await
                    .context("fetching first post")?;
                match page {
                    SourcePage::OutOfRange => Ok(Vec::new()),
                    SourcePage::Items(items) => items
                        .iter()
                        .take(1)
                        .map(|v| parse_post(v).context("parsing first post"))
                        .collect(),
                }
            }
        }
    }

    /// Assemble and persist one post; any error becomes a `Failed` outcome.
    pub async fn migrate_post(&mut self, post: &SourcePost) -> PostOutcome {
        match self.try_migrate_post(post).await {
            Ok(outcome) => outcome,
            Err(err) => PostOutcome::Failed {
                message: format!("{err:#}"),
            },
        }
    }

    async fn try_migrate_post(&mut self, post: &SourcePost) -> Result<PostOutcome> {
        if let Some(existing_id) = self
            .store
            .find_post_by_slug(&post.slug)
            .await
            .context("checking for an existing post")?
        {
            return Ok(PostOutcome::Skipped { existing_id });
        }

        let author_id = self
            .resolver
            .resolve_author(self.source.as_ref(), self.store.as_ref(), post.author_id)
            .await?;

        info!("converting body html");
        let drafts = html_to_drafts(&post.body_html, self.keys.as_ref());
        let body = self.resolve_drafts(drafts).await;
        info!(blocks = body.len(), "converted body");

        let rehoster = AssetRehoster::new(self.downloader.as_ref(), self.store.as_ref());
        let main_image = match &post.featured_image_url {
            Some(url) => {
                info!("processing featured image");
                rehoster.rehost(url).await.map(|asset| MainImage {
                    asset,
                    alt: Some(post.title.clone()),
                })
            }
            None => None,
        };

        let categories = post
            .category_ids
            .iter()
            .filter_map(|id| self.resolver.category_id(*id))
            .map(|id| KeyedReference {
                id: id.to_string(),
                key: self.keys.next_key(),
            })
            .collect();

        let doc = NewDocument::Post(PostDocument {
            title: LocaleString::swedish(post.title.clone()),
            slug: Slug {
                current: post.slug.clone(),
            },
            author: Reference::to(author_id),
            published_at: post.published_at.clone(),
            body: LocaleBlock { sv: body },
            main_image,
            categories,
        });
        let id = self
            .store
            .create_document(&doc)
            .await
            .context("creating post document")?;
        Ok(PostOutcome::Created { id })
    }

    /// Re-host image drafts in document order; images that fail to upload are dropped.
    async fn resolve_drafts(&self, drafts: Vec<BlockDraft>) -> Vec<ContentBlock> {
        let rehoster = AssetRehoster::new(self.downloader.as_ref(), self.store.as_ref());
        let mut blocks = Vec::with_capacity(drafts.len());
        for draft in drafts {
            match draft {
                BlockDraft::Text(block) => blocks.push(ContentBlock::Text(block)),
                BlockDraft::Image(image) => {
                    if let Some(asset) = rehoster.rehost(&image.src).await {
                        blocks.push(ContentBlock::Image(ImageBlock {
                            key: self.keys.next_key(),
                            asset,
                            caption: image.caption,
                            alt: image.alt,
                        }));
                    }
                }
            }
        }
        blocks
    }
}

// ---------------------------------------------------------------------------
// Category image linker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Points every category's `image` at the main image of its newest post.
pub struct CategoryImageLinker {
    store: Arc<dyn ContentStore>,
}

impl CategoryImageLinker {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub fn from_config(config: &MigrationConfig) -> Result<Self> {
        let http = config.http_fetcher()?;
        Ok(Self::new(Arc::new(SanityClient::new(config.sanity.clone(), http))))
    }

    pub async fn run(&self) -> Result<LinkSummary> {
        let categories = self
            .store
            .list_categories()
            .await
            .context("listing categories")?;
        info!(count = categories.len(), "categories to link");

        let mut summary = LinkSummary::default();
        for category in &categories {
            let title = category.title.display();
            info!(category = title, id = %category.id, "processing category");

            let latest = self
                .store
                .latest_post_image(&category.id)
                .await
                .with_context(|| format!("finding latest post for category {}", category.id))?;
            let Some(latest) = latest else {
                info!(category = title, "no posts with images in category");
                summary.skipped += 1;
                continue;
            };
            let Some(image) = latest.main_image else {
                info!(post = latest.title.display(), "latest post has no main image");
                summary.skipped += 1;
                continue;
            };

            match self.store.set_category_image(&category.id, &image).await {
                Ok(()) => {
                    info!(category = title, post = latest.title.display(), "updated category image");
                    summary.updated += 1;
                }
                Err(err) => {
                    error!(category = title, error = %err, "failed to update category");
                    summary.failed += 1;
                }
            }
        }
        info!(
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            "category image linking complete"
        );
        Ok(summary)
    }
}
