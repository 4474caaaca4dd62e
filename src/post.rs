use serde::Serialize;

use crate::date::display_publication_date;
use crate::document::{RawDocument, SearchResponse};
use crate::richtext::RichText;

pub const POST_TYPE: &str = "posts";

pub const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSummary {
    pub uid: String,
    pub first_publication_date: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    pub fn from_document(doc: &RawDocument) -> Option<Self> {
        let uid = doc.uid.as_deref().filter(|u| !u.is_empty())?;
        Some(Self {
            uid: uid.to_string(),
            first_publication_date: display_publication_date(
                doc.first_publication_date.as_deref(),
            ),
            title: doc.text_field("title"),
            subtitle: doc.text_field("subtitle"),
            author: doc.text_field("author"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostPage {
    pub results: Vec<PostSummary>,
    pub next_page: String,
}

impl PostPage {
    pub fn from_response(resp: SearchResponse) -> Self {
        let results = resp
            .results
            .iter()
            .filter_map(|doc| {
                let summary = PostSummary::from_document(doc);
                if summary.is_none() {
                    tracing::warn!(id = ?doc.id, "post without uid left out of listing");
                }
                summary
            })
            .collect();
        Self {
            results,
            next_page: normalize_cursor(resp.next_page),
        }
    }
}

/// Missing, `null` and blank cursors all mean "no more pages".
pub fn normalize_cursor(cursor: Option<String>) -> String {
    match cursor {
        Some(c) if !c.trim().is_empty() => c,
        _ => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentSection {
    pub heading: String,
    pub body: RichText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostDetail {
    pub uid: String,
    pub first_publication_date: String,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub content: Vec<ContentSection>,
}

impl PostDetail {
    pub fn from_document(doc: &RawDocument) -> Option<Self> {
        let uid = doc.uid.as_deref().filter(|u| !u.is_empty())?;
        let banner_url = doc
            .field("banner")
            .and_then(|b| b.get("url"))
            .and_then(|u| u.as_str())
            .unwrap_or("")
            .to_string();
        let content = doc
            .field("content")
            .and_then(|c| c.as_array())
            .map(|sections| {
                sections
                    .iter()
                    .map(|section| ContentSection {
                        heading: section
                            .get("heading")
                            .and_then(|h| h.as_str())
                            .unwrap_or("")
                            .to_string(),
                        body: RichText::from_value(section.get("body")),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            uid: uid.to_string(),
            first_publication_date: display_publication_date(
                doc.first_publication_date.as_deref(),
            ),
            title: doc.text_field("title"),
            banner_url,
            author: doc.text_field("author"),
            content,
        })
    }

    /// Every word-bearing text of the body: section headings and their rich text.
    pub fn reading_text(&self) -> String {
        self.content
            .iter()
            .flat_map(|s| [s.heading.clone(), s.body.as_text()])
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn reading_time(&self) -> usize {
        reading_time_minutes(&self.reading_text())
    }

    pub fn image_urls(&self) -> Vec<&str> {
        let mut urls = Vec::new();
        if !self.banner_url.is_empty() {
            urls.push(self.banner_url.as_str());
        }
        for section in &self.content {
            urls.extend(section.body.image_urls());
        }
        urls
    }

    pub fn with_image_urls(&self, f: impl Fn(&str) -> String) -> PostDetail {
        PostDetail {
            banner_url: if self.banner_url.is_empty() {
                String::new()
            } else {
                f(&self.banner_url)
            },
            content: self
                .content
                .iter()
                .map(|s| ContentSection {
                    heading: s.heading.clone(),
                    body: s.body.map_image_urls(&f),
                })
                .collect(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageStatus {
    NotFound,
    Loading,
    Ready(PostDetail),
}

impl PageStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PageStatus::NotFound => "not-found",
            PageStatus::Loading => "loading",
            PageStatus::Ready(_) => "ready",
        }
    }
}

pub fn reading_time_minutes(text: &str) -> usize {
    text.split_whitespace().count().div_ceil(WORDS_PER_MINUTE)
}
