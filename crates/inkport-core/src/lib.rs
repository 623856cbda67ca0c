//! Core content model for inkport: source records, portable content blocks and
//! destination documents.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CRATE_NAME: &str = "inkport-core";

/// Post record as read from the source platform, after entity decoding of the title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePost {
    pub id: u64,
    pub slug: String,
    pub title: String,
    pub body_html: String,
    /// Copied verbatim into the destination document.
    pub published_at: String,
    pub author_id: u64,
    pub category_ids: Vec<u64>,
    pub featured_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCategory {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAuthor {
    pub id: u64,
    pub name: String,
}

/// Allocates `_key` values for blocks, spans, annotations and keyed references.
pub trait KeyGenerator: Send + Sync {
    fn next_key(&self) -> String;
}

/// 12 hex characters taken from a random UUID.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeys;

impl KeyGenerator for RandomKeys {
    fn next_key(&self) -> String {
        let mut key = Uuid::new_v4().simple().to_string();
        key.truncate(12);
        key
    }
}

/// Deterministic `k1`, `k2`, ... sequence.
#[derive(Debug, Default)]
pub struct SequentialKeys {
    next: AtomicU64,
}

impl SequentialKeys {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyGenerator for SequentialKeys {
    fn next_key(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("k{n}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStyle {
    Normal,
    H1,
    H2,
    H3,
    H4,
    Blockquote,
}

impl BlockStyle {
    pub fn heading(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::H1),
            2 => Some(Self::H2),
            3 => Some(Self::H3),
            4 => Some(Self::H4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bullet,
    Number,
}

pub const MARK_STRONG: &str = "strong";
pub const MARK_EM: &str = "em";

/// Inline run of text. Marks are decorator names or link annotation keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type", rename = "span")]
pub struct Span {
    #[serde(rename = "_key")]
    pub key: String,
    pub text: String,
    pub marks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type", rename = "link")]
pub struct LinkAnnotation {
    #[serde(rename = "_key")]
    pub key: String,
    pub href: String,
}

/// Reference to another document or to an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "_type", rename = "reference")]
pub struct Reference {
    #[serde(rename = "_ref")]
    pub id: String,
}

impl Reference {
    pub fn to(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Reference living inside an array, which needs its own `_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type", rename = "reference")]
pub struct KeyedReference {
    #[serde(rename = "_ref")]
    pub id: String,
    #[serde(rename = "_key")]
    pub key: String,
}

/// Handle returned by the destination store after an image upload.
pub type AssetReference = Reference;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(rename = "_key")]
    pub key: String,
    pub style: BlockStyle,
    #[serde(rename = "listItem", default, skip_serializing_if = "Option::is_none")]
    pub list_item: Option<ListKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(rename = "markDefs")]
    pub mark_defs: Vec<LinkAnnotation>,
    pub children: Vec<Span>,
}

impl TextBlock {
    pub fn plain_text(&self) -> String {
        self.children.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(rename = "_key")]
    pub key: String,
    pub asset: AssetReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum ContentBlock {
    #[serde(rename = "block")]
    Text(TextBlock),
    #[serde(rename = "image")]
    Image(ImageBlock),
}

impl ContentBlock {
    pub fn key(&self) -> &str {
        match self {
            Self::Text(block) => &block.key,
            Self::Image(block) => &block.key,
        }
    }
}

/// Bilingual string: Swedish is the source language, English awaits translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "_type", rename = "localeString")]
pub struct LocaleString {
    #[serde(default)]
    pub sv: String,
    #[serde(default)]
    pub en: String,
}

impl LocaleString {
    pub fn swedish(text: impl Into<String>) -> Self {
        Self {
            sv: text.into(),
            en: String::new(),
        }
    }

    /// Swedish value, falling back to English, then to `Untitled`.
    pub fn display(&self) -> &str {
        if !self.sv.is_empty() {
            &self.sv
        } else if !self.en.is_empty() {
            &self.en
        } else {
            "Untitled"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "_type", rename = "localeBlock")]
pub struct LocaleBlock {
    pub sv: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type", rename = "slug")]
pub struct Slug {
    pub current: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type", rename = "image")]
pub struct MainImage {
    pub asset: AssetReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDocument {
    pub title: LocaleString,
    pub slug: Slug,
    pub author: Reference,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    pub body: LocaleBlock,
    #[serde(rename = "mainImage", default, skip_serializing_if = "Option::is_none")]
    pub main_image: Option<MainImage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<KeyedReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorDocument {
    pub name: String,
    pub slug: Slug,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDocument {
    pub title: LocaleString,
    pub description: LocaleString,
}

/// Document payload for a create mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum NewDocument {
    #[serde(rename = "post")]
    Post(PostDocument),
    #[serde(rename = "author")]
    Author(AuthorDocument),
    #[serde(rename = "category")]
    Category(CategoryDocument),
}

impl NewDocument {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Post(_) => "post",
            Self::Author(_) => "author",
            Self::Category(_) => "category",
        }
    }
}

/// Category as listed back from the destination store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCategory {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: LocaleString,
}

/// Author slug: lowercase, Swedish vowels folded, everything else non-alphanumeric collapsed to `-`.
pub fn author_slug(name: &str) -> String {
    let folded = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'å' | 'ä' => 'a',
            'ö' => 'o',
            c if c.is_ascii_lowercase() || c.is_ascii_digit() => c,
            _ => '-',
        })
        .collect::<String>();
    folded
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
