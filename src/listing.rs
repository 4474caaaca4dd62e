use std::collections::HashSet;

use crate::content::ContentClient;
use crate::error::ContentError;
use crate::post::{PostPage, PostSummary};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    posts: Vec<PostSummary>,
    next_page: String,
}

impl Listing {
    pub fn first(page: PostPage) -> Self {
        Self::default().merged(page)
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn next_page(&self) -> Option<&str> {
        (!self.next_page.is_empty()).then_some(self.next_page.as_str())
    }

    pub fn has_more(&self) -> bool {
        !self.next_page.is_empty()
    }

    pub fn merged(&self, page: PostPage) -> Listing {
        let mut seen: HashSet<String> = self.posts.iter().map(|p| p.uid.clone()).collect();
        let mut posts = self.posts.clone();
        for summary in page.results {
            if !seen.insert(summary.uid.clone()) {
                tracing::debug!(uid = %summary.uid, "duplicate summary dropped");
                continue;
            }
            posts.push(summary);
        }
        Listing {
            posts,
            next_page: page.next_page,
        }
    }

    /// Fetch the next page and return the merged listing. Without a cursor this
    /// is a copy of `self` and no request is made.
    pub async fn load_more(&self, client: &ContentClient) -> Result<Listing, ContentError> {
        let Some(cursor) = self.next_page() else {
            return Ok(self.clone());
        };
        let resp = client.fetch_page(cursor).await?;
        let page = PostPage::from_response(resp);
        tracing::info!(
            fetched = page.results.len(),
            more = !page.next_page.is_empty(),
            "loaded more posts"
        );
        Ok(self.merged(page))
    }
}
