use maud::{Markup, PreEscaped, html};
use serde_json::Value;

use crate::sanitize;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichText {
    blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Inline),
    Heading(u8, Inline),
    Preformatted(Inline),
    ListItem { ordered: bool, inline: Inline },
    Image { url: String, alt: String },
    Embed { url: String, html: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inline {
    pub text: String,
    pub spans: Vec<Span>,
}

// Offsets count UTF-16 code units, as the CMS editor measures them.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpanKind {
    Strong,
    Em,
    Label(String),
    Hyperlink {
        href: Option<String>,
        new_tab: bool,
    },
}

impl RichText {
    /// Lenient parse: anything that is not a block array yields empty rich text,
    /// and blocks of unknown type are skipped.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(items) = value.and_then(Value::as_array) else {
            if value.is_some_and(|v| !v.is_null()) {
                tracing::warn!("rich text field is not an array; rendering empty");
            }
            return Self::default();
        };
        let blocks = items.iter().filter_map(parse_block).collect();
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn as_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(i)
                | Block::Heading(_, i)
                | Block::Preformatted(i)
                | Block::ListItem { inline: i, .. } => Some(i.text.as_str()),
                Block::Image { .. } | Block::Embed { .. } => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Image { url, .. } if !url.is_empty() => Some(url.as_str()),
            _ => None,
        })
    }

    pub fn map_image_urls(&self, f: impl Fn(&str) -> String) -> RichText {
        let blocks = self
            .blocks
            .iter()
            .map(|b| match b {
                Block::Image { url, alt } => Block::Image {
                    url: f(url),
                    alt: alt.clone(),
                },
                other => other.clone(),
            })
            .collect();
        RichText { blocks }
    }

    pub fn as_html(&self) -> String {
        let mut out = String::new();
        let mut idx = 0;
        while idx < self.blocks.len() {
            if let Block::ListItem { ordered, .. } = &self.blocks[idx] {
                let ordered = *ordered;
                let mut items = Vec::new();
                while let Some(Block::ListItem {
                    ordered: o,
                    inline,
                }) = self.blocks.get(idx)
                {
                    if *o != ordered {
                        break;
                    }
                    items.push(inline);
                    idx += 1;
                }
                out.push_str(&render_list(ordered, &items).into_string());
                continue;
            }
            out.push_str(&render_block(&self.blocks[idx]).into_string());
            idx += 1;
        }
        out
    }
}

fn parse_block(value: &Value) -> Option<Block> {
    let kind = value.get("type")?.as_str()?;
    let block = match kind {
        "paragraph" => Block::Paragraph(parse_inline(value)),
        "preformatted" => Block::Preformatted(parse_inline(value)),
        "list-item" => Block::ListItem {
            ordered: false,
            inline: parse_inline(value),
        },
        "o-list-item" => Block::ListItem {
            ordered: true,
            inline: parse_inline(value),
        },
        "image" => Block::Image {
            url: str_at(value, "url"),
            alt: str_at(value, "alt"),
        },
        "embed" => {
            let oembed = value.get("oembed");
            Block::Embed {
                url: oembed.map(|o| str_at(o, "embed_url")).unwrap_or_default(),
                html: oembed.map(|o| str_at(o, "html")).unwrap_or_default(),
            }
        }
        heading if heading.starts_with("heading") => {
            let level = heading["heading".len()..].parse::<u8>().ok()?;
            if !(1..=6).contains(&level) {
                return None;
            }
            Block::Heading(level, parse_inline(value))
        }
        other => {
            tracing::debug!(kind = other, "skipping unknown rich text block");
            return None;
        }
    };
    Some(block)
}

fn parse_inline(value: &Value) -> Inline {
    let text = str_at(value, "text");
    let spans = value
        .get("spans")
        .and_then(Value::as_array)
        .map(|spans| spans.iter().filter_map(parse_span).collect())
        .unwrap_or_default();
    Inline { text, spans }
}

fn parse_span(value: &Value) -> Option<Span> {
    let start = value.get("start")?.as_u64()? as usize;
    let end = value.get("end")?.as_u64()? as usize;
    let data = value.get("data");
    let kind = match value.get("type")?.as_str()? {
        "strong" => SpanKind::Strong,
        "em" => SpanKind::Em,
        "label" => SpanKind::Label(data.map(|d| str_at(d, "label")).unwrap_or_default()),
        "hyperlink" => SpanKind::Hyperlink {
            href: data.and_then(resolve_link),
            new_tab: data
                .and_then(|d| d.get("target"))
                .and_then(Value::as_str)
                .is_some_and(|t| t == "_blank"),
        },
        _ => return None,
    };
    Some(Span { start, end, kind })
}

fn str_at(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn resolve_link(data: &Value) -> Option<String> {
    match data.get("link_type").and_then(Value::as_str) {
        Some("Document") => {
            let uid = data.get("uid").and_then(Value::as_str)?;
            Some(format!("/post/{uid}"))
        }
        _ => {
            let url = data.get("url").and_then(Value::as_str)?.trim();
            is_safe_href(url).then(|| url.to_string())
        }
    }
}

pub fn is_safe_href(href: &str) -> bool {
    let lowered = href.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return false;
    }
    if lowered.starts_with("http://")
        || lowered.starts_with("https://")
        || lowered.starts_with("mailto:")
    {
        return true;
    }
    (lowered.starts_with('/') && !lowered.starts_with("//")) || lowered.starts_with('#')
}

fn render_list(ordered: bool, items: &[&Inline]) -> Markup {
    html! {
        @if ordered {
            ol { @for item in items { li { (render_inline(item, true)) } } }
        } @else {
            ul { @for item in items { li { (render_inline(item, true)) } } }
        }
    }
}

fn render_block(block: &Block) -> Markup {
    match block {
        Block::Paragraph(inline) => html! { p { (render_inline(inline, true)) } },
        Block::Preformatted(inline) => html! { pre { (render_inline(inline, false)) } },
        Block::Heading(level, inline) => {
            let inner = render_inline(inline, true);
            match level {
                1 => html! { h1 { (inner) } },
                2 => html! { h2 { (inner) } },
                3 => html! { h3 { (inner) } },
                4 => html! { h4 { (inner) } },
                5 => html! { h5 { (inner) } },
                _ => html! { h6 { (inner) } },
            }
        }
        Block::ListItem { ordered, inline } => render_list(*ordered, &[inline]),
        Block::Image { url, alt } => html! {
            @if is_safe_href(url) {
                p class="block-img" { img src=(url) alt=(alt); }
            }
        },
        Block::Embed { url, html } => {
            let cleaned = sanitize::sanitize_embed(html).unwrap_or_else(|e| {
                tracing::warn!(error = %e, url = %url, "dropping unsanitizable embed");
                String::new()
            });
            html! {
                div data-oembed=(url) { (PreEscaped(cleaned)) }
            }
        }
    }
}

/// Render text with its spans. Overlapping spans are closed and reopened at
/// boundaries so the output is always well nested.
fn render_inline(inline: &Inline, line_breaks: bool) -> Markup {
    let offsets = utf16_byte_offsets(&inline.text);
    let len16 = offsets.len() - 1;

    let spans: Vec<&Span> = inline
        .spans
        .iter()
        .filter(|s| s.start < s.end.min(len16))
        .collect();

    let mut bounds: Vec<usize> = vec![0, len16];
    for s in &spans {
        bounds.push(s.start);
        bounds.push(s.end.min(len16));
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut out = String::new();
    let mut stack: Vec<usize> = Vec::new();
    for pair in bounds.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let mut active: Vec<usize> = (0..spans.len())
            .filter(|&i| spans[i].start <= from && from < spans[i].end)
            .collect();
        active.sort_by_key(|&i| (spans[i].start, std::cmp::Reverse(spans[i].end), i));

        let common = stack
            .iter()
            .zip(active.iter())
            .take_while(|(a, b)| a == b)
            .count();
        for &i in stack[common..].iter().rev() {
            out.push_str(close_tag(&spans[i].kind));
        }
        for &i in &active[common..] {
            out.push_str(&open_tag(&spans[i].kind));
        }
        stack = active;

        let segment = &inline.text[offsets[from]..offsets[to]];
        let escaped = escape(segment);
        if line_breaks {
            out.push_str(&escaped.replace('\n', "<br />"));
        } else {
            out.push_str(&escaped);
        }
    }
    for &i in stack.iter().rev() {
        out.push_str(close_tag(&spans[i].kind));
    }
    PreEscaped(out)
}

fn open_tag(kind: &SpanKind) -> String {
    match kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Label(label) => format!("<span class=\"{}\">", escape(label)),
        SpanKind::Hyperlink {
            href: Some(href),
            new_tab: true,
        } => format!(
            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">",
            escape(href)
        ),
        SpanKind::Hyperlink {
            href: Some(href),
            new_tab: false,
        } => format!("<a href=\"{}\">", escape(href)),
        SpanKind::Hyperlink { href: None, .. } => String::new(),
    }
}

fn close_tag(kind: &SpanKind) -> &'static str {
    match kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Label(_) => "</span>",
        SpanKind::Hyperlink { href: Some(_), .. } => "</a>",
        SpanKind::Hyperlink { href: None, .. } => "",
    }
}

fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

/// Byte offset for every UTF-16 index of `text`, plus one for the end.
/// The second unit of a surrogate pair maps to the end of its character.
fn utf16_byte_offsets(text: &str) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(text.len() + 1);
    for (byte, ch) in text.char_indices() {
        offsets.push(byte);
        if ch.len_utf16() == 2 {
            offsets.push(byte + ch.len_utf8());
        }
    }
    offsets.push(text.len());
    offsets
}
