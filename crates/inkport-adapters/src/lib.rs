//! WordPress record mapping and HTML body conversion into portable content blocks.

use inkport_core::{
    BlockStyle, KeyGenerator, LinkAnnotation, ListKind, SourceAuthor, SourceCategory, SourcePost,
    Span, TextBlock, MARK_EM, MARK_STRONG,
};
use scraper::{ElementRef, Html};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

pub const CRATE_NAME: &str = "inkport-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid {kind} record: {source}")]
    Record {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Typed HTML tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Element(HtmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<HtmlNode>,
}

impl HtmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// First descendant element with `tag`, in document order.
    pub fn find_first(&self, tag: &str) -> Option<&HtmlElement> {
        for child in &self.children {
            if let HtmlNode::Element(el) = child {
                if el.tag == tag {
                    return Some(el);
                }
                if let Some(found) = el.find_first(tag) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn child_elements<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a HtmlElement> + 'a {
        self.children.iter().filter_map(move |child| match child {
            HtmlNode::Element(el) if el.tag == tag => Some(el),
            _ => None,
        })
    }
}

fn collect_text(nodes: &[HtmlNode], out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Element(el) => collect_text(&el.children, out),
        }
    }
}

/// Parse an HTML body fragment into its top-level nodes. Comments, doctypes
/// and processing instructions are dropped.
pub fn parse_fragment(html: &str) -> Vec<HtmlNode> {
    let fragment = Html::parse_fragment(html);
    convert_children(fragment.root_element())
}

fn convert_children(element: ElementRef<'_>) -> Vec<HtmlNode> {
    element
        .children()
        .filter_map(|child| {
            if let Some(el) = ElementRef::wrap(child) {
                return Some(HtmlNode::Element(HtmlElement {
                    tag: el.value().name().to_ascii_lowercase(),
                    attrs: el
                        .value()
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    children: convert_children(el),
                }));
            }
            child
                .value()
                .as_text()
                .map(|text| HtmlNode::Text(String::from(&**text)))
        })
        .collect()
}

/// Decode HTML entities (`&amp;`, `&#8220;`, ...) and drop any markup.
pub fn decode_entities(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect::<String>()
}

// ---------------------------------------------------------------------------
// Inline spans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpanRuns {
    pub spans: Vec<Span>,
    pub annotations: Vec<LinkAnnotation>,
}

impl SpanRuns {
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Flatten `element` into spans, accumulating marks from every ancestor on the way down.
pub fn extract_spans(element: &HtmlElement, keys: &dyn KeyGenerator) -> SpanRuns {
    let mut runs = SpanRuns::default();
    walk_marks(element, &[], keys, &mut runs);
    runs
}

fn walk_marks(element: &HtmlElement, marks: &[String], keys: &dyn KeyGenerator, out: &mut SpanRuns) {
    if matches!(element.tag.as_str(), "img" | "figure") {
        return;
    }

    let mut marks = marks.to_vec();
    match element.tag.as_str() {
        "strong" | "b" => marks.push(MARK_STRONG.to_string()),
        "em" | "i" => marks.push(MARK_EM.to_string()),
        "a" => {
            if let Some(href) = element.attr("href").filter(|h| !h.is_empty()) {
                let key = keys.next_key();
                out.annotations.push(LinkAnnotation {
                    key: key.clone(),
                    href: href.to_string(),
                });
                marks.push(key);
            }
        }
        _ => {}
    }

    for child in &element.children {
        match child {
            HtmlNode::Text(text) if text.is_empty() => {}
            HtmlNode::Text(text) => out.spans.push(Span {
                key: keys.next_key(),
                text: text.clone(),
                marks: marks.clone(),
            }),
            HtmlNode::Element(el) => walk_marks(el, &marks, keys, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Block walker
// ---------------------------------------------------------------------------

/// Image found in the body, awaiting upload to the destination store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDraft {
    pub src: String,
    pub caption: Option<String>,
    pub alt: String,
}

/// Walker output: text blocks are final, images still need re-hosting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockDraft {
    Text(TextBlock),
    Image(ImageDraft),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockTag {
    Figure,
    Img,
    Heading(u8),
    Blockquote,
    List(ListKind),
    Paragraph,
    Other,
}

impl BlockTag {
    fn classify(tag: &str) -> Self {
        match tag {
            "figure" => Self::Figure,
            "img" => Self::Img,
            "h1" => Self::Heading(1),
            "h2" => Self::Heading(2),
            "h3" => Self::Heading(3),
            "h4" => Self::Heading(4),
            "blockquote" => Self::Blockquote,
            "ul" => Self::List(ListKind::Bullet),
            "ol" => Self::List(ListKind::Number),
            "p" | "div" => Self::Paragraph,
            _ => Self::Other,
        }
    }
}

/// Convert a post body into block drafts, in document order.
pub fn html_to_drafts(html: &str, keys: &dyn KeyGenerator) -> Vec<BlockDraft> {
    let nodes = parse_fragment(html);
    walk_nodes(&nodes, keys)
}

/// Walk the direct children only; nested block elements are merged into their parent.
pub fn walk_nodes(nodes: &[HtmlNode], keys: &dyn KeyGenerator) -> Vec<BlockDraft> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            HtmlNode::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push(BlockDraft::Text(plain_block(text, keys)));
                }
            }
            HtmlNode::Element(el) => walk_element(el, keys, &mut out),
        }
    }
    out
}

fn walk_element(el: &HtmlElement, keys: &dyn KeyGenerator, out: &mut Vec<BlockDraft>) {
    match BlockTag::classify(&el.tag) {
        BlockTag::Figure => out.extend(figure_draft(el)),
        BlockTag::Img => out.extend(image_draft(el, None)),
        BlockTag::Heading(level) => {
            let runs = extract_spans(el, keys);
            if runs.is_empty() {
                return;
            }
            if let Some(style) = BlockStyle::heading(level) {
                out.push(BlockDraft::Text(styled_block(runs, style, None, keys)));
            }
        }
        BlockTag::Blockquote => {
            if el.text_content().trim().is_empty() {
                return;
            }
            let runs = extract_spans(el, keys);
            out.push(BlockDraft::Text(styled_block(
                runs,
                BlockStyle::Blockquote,
                None,
                keys,
            )));
        }
        BlockTag::List(kind) => {
            for li in el.child_elements("li") {
                let runs = extract_spans(li, keys);
                if runs.is_empty() {
                    continue;
                }
                out.push(BlockDraft::Text(styled_block(
                    runs,
                    BlockStyle::Normal,
                    Some(kind),
                    keys,
                )));
            }
        }
        BlockTag::Paragraph => {
            if let Some(img) = el.find_first("img") {
                if el.text_content().trim().is_empty() {
                    out.extend(image_draft(img, None));
                    return;
                }
            }
            if let Some(figure) = el.find_first("figure") {
                out.extend(figure_draft(figure));
                return;
            }
            let runs = extract_spans(el, keys);
            if !runs.is_empty() {
                out.push(BlockDraft::Text(styled_block(
                    runs,
                    BlockStyle::Normal,
                    None,
                    keys,
                )));
            }
        }
        // Known limitation: internal structure and marks of unrecognised elements are flattened.
        BlockTag::Other => {
            let text = el.text_content();
            let text = text.trim();
            if !text.is_empty() {
                out.push(BlockDraft::Text(plain_block(text, keys)));
            }
        }
    }
}

fn figure_draft(figure: &HtmlElement) -> Option<BlockDraft> {
    let img = figure.find_first("img")?;
    let caption = figure
        .find_first("figcaption")
        .map(|c| c.text_content().trim().to_string())
        .filter(|c| !c.is_empty());
    image_draft(img, caption)
}

/// `data-orig-file` wins over `src`; WordPress often serves a scaled `src`.
fn image_draft(img: &HtmlElement, caption: Option<String>) -> Option<BlockDraft> {
    let src = img
        .attr("data-orig-file")
        .filter(|s| !s.is_empty())
        .or_else(|| img.attr("src").filter(|s| !s.is_empty()))?;
    Some(BlockDraft::Image(ImageDraft {
        src: src.to_string(),
        caption,
        alt: img.attr("alt").unwrap_or_default().to_string(),
    }))
}

fn styled_block(
    runs: SpanRuns,
    style: BlockStyle,
    list_item: Option<ListKind>,
    keys: &dyn KeyGenerator,
) -> TextBlock {
    TextBlock {
        key: keys.next_key(),
        style,
        list_item,
        level: list_item.map(|_| 1),
        mark_defs: runs.annotations,
        children: runs.spans,
    }
}

fn plain_block(text: &str, keys: &dyn KeyGenerator) -> TextBlock {
    let key = keys.next_key();
    TextBlock {
        key,
        style: BlockStyle::Normal,
        list_item: None,
        level: None,
        mark_defs: Vec::new(),
        children: vec![Span {
            key: keys.next_key(),
            text: text.to_string(),
            marks: Vec::new(),
        }],
    }
}

// ---------------------------------------------------------------------------
// WordPress REST records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct WpRendered {
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WpPost {
    id: u64,
    slug: String,
    date: String,
    title: WpRendered,
    content: WpRendered,
    author: u64,
    #[serde(default)]
    categories: Vec<u64>,
    #[serde(default)]
    jetpack_featured_media_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WpCategory {
    id: u64,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WpUser {
    id: u64,
    #[serde(default)]
    name: Option<String>,
}

pub fn parse_post(value: &JsonValue) -> Result<SourcePost, AdapterError> {
    let wp: WpPost = WpPost::deserialize(value).map_err(|source| AdapterError::Record {
        kind: "post",
        source,
    })?;
    Ok(SourcePost {
        id: wp.id,
        slug: wp.slug,
        title: decode_entities(&wp.title.rendered),
        body_html: wp.content.rendered,
        published_at: wp.date,
        author_id: wp.author,
        category_ids: wp.categories,
        featured_image_url: wp.jetpack_featured_media_url.filter(|u| !u.is_empty()),
    })
}

pub fn parse_category(value: &JsonValue) -> Result<SourceCategory, AdapterError> {
    let wp: WpCategory = WpCategory::deserialize(value).map_err(|source| AdapterError::Record {
        kind: "category",
        source,
    })?;
    Ok(SourceCategory {
        id: wp.id,
        name: wp.name,
        description: wp.description.filter(|d| !d.is_empty()),
    })
}

/// `None` when the user record carries no display name.
pub fn parse_author(value: &JsonValue) -> Result<Option<SourceAuthor>, AdapterError> {
    let wp: WpUser = WpUser::deserialize(value).map_err(|source| AdapterError::Record {
        kind: "user",
        source,
    })?;
    Ok(wp
        .name
        .filter(|n| !n.is_empty())
        .map(|name| SourceAuthor { id: wp.id, name }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkport_core::SequentialKeys;
    use serde_json::json;

    fn drafts(html: &str) -> Vec<BlockDraft> {
        html_to_drafts(html, &SequentialKeys::new())
    }

    fn text_blocks(drafts: &[BlockDraft]) -> Vec<&TextBlock> {
        drafts
            .iter()
            .filter_map(|d| match d {
                BlockDraft::Text(t) => Some(t),
                BlockDraft::Image(_) => None,
            })
            .collect()
    }

    fn first_element(html: &str) -> HtmlElement {
        parse_fragment(html)
            .into_iter()
            .find_map(|n| match n {
                HtmlNode::Element(el) => Some(el),
                HtmlNode::Text(_) => None,
            })
            .expect("element")
    }

    #[test]
    fn whitespace_and_empty_elements_produce_no_blocks() {
        for html in [
            "",
            "   \n\t  ",
            "<p></p>",
            "<div></div>\n<p></p>",
            "<h2></h2><h3></h3>",
            "<blockquote></blockquote>",
            "<ul></ul><ol><li></li></ol>",
            "<section></section>",
            "<figure></figure>",
        ] {
            assert!(drafts(html).is_empty(), "expected no blocks for {html:?}");
        }
    }

    #[test]
    fn plain_paragraph_is_one_unmarked_span() {
        let out = drafts("<p>Hej världen</p>");
        assert_eq!(out.len(), 1);
        let BlockDraft::Text(block) = &out[0] else {
            panic!("expected text block");
        };
        assert_eq!(block.style, BlockStyle::Normal);
        assert_eq!(block.list_item, None);
        assert_eq!(block.children.len(), 1);
        assert_eq!(block.children[0].text, "Hej världen");
        assert!(block.children[0].marks.is_empty());
        assert!(block.mark_defs.is_empty());
    }

    #[test]
    fn marks_split_at_element_edges() {
        let el = first_element("<p><strong>bold</strong> and <em>italic</em></p>");
        let runs = extract_spans(&el, &SequentialKeys::new());
        let got: Vec<(&str, Vec<&str>)> = runs
            .spans
            .iter()
            .map(|s| (s.text.as_str(), s.marks.iter().map(String::as_str).collect()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("bold", vec!["strong"]),
                (" and ", vec![]),
                ("italic", vec!["em"]),
            ]
        );
        assert!(runs.annotations.is_empty());
    }

    #[test]
    fn link_allocates_one_annotation() {
        let el = first_element(r#"<a href="https://x.example">link</a>"#);
        let runs = extract_spans(&el, &SequentialKeys::new());
        assert_eq!(runs.annotations.len(), 1);
        assert_eq!(runs.annotations[0].href, "https://x.example");
        assert_eq!(runs.spans.len(), 1);
        assert_eq!(runs.spans[0].text, "link");
        assert_eq!(runs.spans[0].marks, vec![runs.annotations[0].key.clone()]);
    }

    #[test]
    fn link_without_href_adds_no_mark() {
        let el = first_element(r#"<p><a>anchor</a> <a href="">empty</a></p>"#);
        let runs = extract_spans(&el, &SequentialKeys::new());
        assert!(runs.annotations.is_empty());
        assert!(runs.spans.iter().all(|s| s.marks.is_empty()));
    }

    #[test]
    fn nested_marks_accumulate_and_do_not_merge() {
        let el = first_element(
            r#"<p><strong>a<em>b</em></strong><strong>c</strong><a href="/x"><b>d</b></a></p>"#,
        );
        let runs = extract_spans(&el, &SequentialKeys::new());
        let link_key = runs.annotations[0].key.clone();
        let got: Vec<(String, Vec<String>)> = runs
            .spans
            .iter()
            .map(|s| (s.text.clone(), s.marks.clone()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("a".to_string(), vec!["strong".to_string()]),
                ("b".to_string(), vec!["strong".to_string(), "em".to_string()]),
                ("c".to_string(), vec!["strong".to_string()]),
                ("d".to_string(), vec![link_key, "strong".to_string()]),
            ]
        );
    }

    #[test]
    fn whitespace_only_text_inside_an_element_is_a_span() {
        let el = first_element("<p><em>a</em> <em>b</em></p>");
        let runs = extract_spans(&el, &SequentialKeys::new());
        assert_eq!(runs.spans.len(), 3);
        assert_eq!(runs.spans[1].text, " ");
    }

    #[test]
    fn images_are_never_inline_spans() {
        let el = first_element(r#"<p>före<img src="https://cdn.example/a.jpg" alt="x">efter</p>"#);
        let runs = extract_spans(&el, &SequentialKeys::new());
        let texts: Vec<&str> = runs.spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["före", "efter"]);
    }

    #[test]
    fn list_skips_empty_items_and_keeps_order() {
        let out = drafts("<ul><li>first</li><li></li><li>third</li></ul>");
        let blocks = text_blocks(&out);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].plain_text(), "first");
        assert_eq!(blocks[1].plain_text(), "third");
        for block in blocks {
            assert_eq!(block.list_item, Some(ListKind::Bullet));
            assert_eq!(block.level, Some(1));
            assert_eq!(block.style, BlockStyle::Normal);
        }
    }

    #[test]
    fn ordered_list_items_are_numbered() {
        let out = drafts("<ol><li>ett</li><li>två</li></ol>");
        let blocks = text_blocks(&out);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.list_item == Some(ListKind::Number)));
    }

    #[test]
    fn nested_list_text_merges_into_parent_item() {
        let out = drafts("<ul><li>outer<ul><li>inner</li></ul></li></ul>");
        let blocks = text_blocks(&out);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].plain_text(), "outerinner");
    }

    #[test]
    fn headings_one_to_four_are_styled() {
        let out = drafts("<h1>A</h1><h2>B</h2><h3>C</h3><h4>D</h4><h5>E</h5>");
        let styles: Vec<BlockStyle> = text_blocks(&out).iter().map(|b| b.style).collect();
        assert_eq!(
            styles,
            vec![
                BlockStyle::H1,
                BlockStyle::H2,
                BlockStyle::H3,
                BlockStyle::H4,
                BlockStyle::Normal,
            ]
        );
    }

    #[test]
    fn blockquote_keeps_inner_marks() {
        let out = drafts("<blockquote><p>Citat <em>här</em></p></blockquote>");
        let blocks = text_blocks(&out);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].style, BlockStyle::Blockquote);
        assert_eq!(blocks[0].plain_text(), "Citat här");
        assert_eq!(blocks[0].children[1].marks, vec!["em".to_string()]);
    }

    #[test]
    fn unknown_elements_flatten_to_plain_text() {
        let out = drafts("<section><p>one</p><p><strong>two</strong></p></section>");
        let blocks = text_blocks(&out);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].children.len(), 1);
        assert_eq!(blocks[0].plain_text(), "onetwo");
        assert!(blocks[0].children[0].marks.is_empty());
    }

    #[test]
    fn div_with_several_paragraphs_collapses_to_one_block() {
        let out = drafts("<div><p>one</p><p>two</p></div>");
        let blocks = text_blocks(&out);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].plain_text(), "onetwo");
    }

    #[test]
    fn top_level_text_is_trimmed_into_a_block() {
        let out = drafts("  lös text  <p>stycke</p>");
        let blocks = text_blocks(&out);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].plain_text(), "lös text");
    }

    #[test]
    fn figure_prefers_original_file_and_reads_caption() {
        let out = drafts(
            r#"<figure><img src="https://cdn.example/a-300x200.jpg" data-orig-file="https://cdn.example/a.jpg" alt="Alt"><figcaption> Bildtext </figcaption></figure>"#,
        );
        assert_eq!(
            out,
            vec![BlockDraft::Image(ImageDraft {
                src: "https://cdn.example/a.jpg".into(),
                caption: Some("Bildtext".into()),
                alt: "Alt".into(),
            })]
        );
    }

    #[test]
    fn bare_image_without_alt_gets_empty_alt_and_no_caption() {
        let out = drafts(r#"<img src="https://cdn.example/b.png">"#);
        assert_eq!(
            out,
            vec![BlockDraft::Image(ImageDraft {
                src: "https://cdn.example/b.png".into(),
                caption: None,
                alt: String::new(),
            })]
        );
    }

    #[test]
    fn image_without_source_is_dropped() {
        assert!(drafts(r#"<img alt="nothing">"#).is_empty());
        assert!(drafts(r#"<p><img src=""></p>"#).is_empty());
    }

    #[test]
    fn paragraph_holding_only_an_image_becomes_an_image() {
        let out = drafts(r#"<p> <a href="https://cdn.example/c.jpg"><img src="https://cdn.example/c.jpg"></a> </p>"#);
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], BlockDraft::Image(img) if img.src == "https://cdn.example/c.jpg"));
    }

    #[test]
    fn paragraph_with_text_and_image_keeps_text_only() {
        let out = drafts(r#"<p>Text <img src="https://cdn.example/d.jpg"></p>"#);
        let blocks = text_blocks(&out);
        assert_eq!(out.len(), 1);
        assert_eq!(blocks[0].plain_text(), "Text ");
    }

    #[test]
    fn div_wrapping_a_figure_delegates_to_the_figure() {
        let out = drafts(
            r#"<div class="wp-block"><figure><img src="https://cdn.example/e.jpg"><figcaption>Foto</figcaption></figure></div>"#,
        );
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], BlockDraft::Image(img) if img.caption.as_deref() == Some("Foto")));
    }

    #[test]
    fn block_and_span_keys_are_unique() {
        let out = drafts("<p>a <strong>b</strong></p><h2>c</h2>plain");
        let mut keys = Vec::new();
        for block in text_blocks(&out) {
            keys.push(block.key.clone());
            keys.extend(block.children.iter().map(|s| s.key.clone()));
        }
        let mut deduped = keys.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(keys.len(), deduped.len());
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(decode_entities("Kultur &amp; n&#246;je &#8211; &#8220;nu&#8221;"), "Kultur & nöje – “nu”");
        assert_eq!(decode_entities("Plain"), "Plain");
    }

    #[test]
    fn parses_wordpress_post_record() {
        let value = json!({
            "id": 42,
            "slug": "hej-varlden",
            "date": "2024-02-09T10:15:00",
            "title": { "rendered": "Hej &amp; v&auml;lkommen" },
            "content": { "rendered": "<p>Body</p>" },
            "author": 7,
            "categories": [3, 5],
            "jetpack_featured_media_url": ""
        });
        let post = parse_post(&value).unwrap();
        assert_eq!(post.id, 42);
        assert_eq!(post.title, "Hej & välkommen");
        assert_eq!(post.published_at, "2024-02-09T10:15:00");
        assert_eq!(post.category_ids, vec![3, 5]);
        assert_eq!(post.featured_image_url, None);
    }

    #[test]
    fn rejects_post_without_slug() {
        let err = parse_post(&json!({ "id": 1 })).unwrap_err();
        assert!(err.to_string().starts_with("invalid post record"));
    }

    #[test]
    fn parses_category_and_author_records() {
        let cat = parse_category(&json!({ "id": 3, "name": "Sport", "description": "" })).unwrap();
        assert_eq!(cat.description, None);
        let author = parse_author(&json!({ "id": 7, "name": "Åsa" })).unwrap();
        assert_eq!(author.map(|a| a.name), Some("Åsa".to_string()));
        assert_eq!(parse_author(&json!({ "id": 8, "name": "" })).unwrap(), None);
    }
}
