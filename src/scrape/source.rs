//! Feed page source backed by the scraping client

use std::sync::Arc;

use async_trait::async_trait;

use crate::creds::Credentials;
use crate::error::Result;
use crate::feed::{CredentialedFetch, Page};

use super::client::ScrapeClient;
use super::section::{ScrapeToken, SectionNode};

/// Parser turning one scraped section into a typed feed page
pub type SectionParser<T> = fn(&SectionNode) -> Result<Page<T, ScrapeToken>>;

/// Pages of one scraped collection
///
/// The first page is extracted from the markup at `path`; later pages
/// come from continuation requests resuming the token the previous page
/// carried.
pub struct SectionSource<T> {
    client: Arc<ScrapeClient>,
    path: String,
    parse: SectionParser<T>,
}

impl<T> SectionSource<T> {
    /// Create a source scraping `path`, parsing sections with `parse`
    pub fn new(client: Arc<ScrapeClient>, path: impl Into<String>, parse: SectionParser<T>) -> Self {
        Self {
            client,
            path: path.into(),
            parse,
        }
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> CredentialedFetch<T, ScrapeToken> for SectionSource<T> {
    async fn fetch_page(
        &self,
        creds: Option<&Credentials>,
        token: Option<&ScrapeToken>,
    ) -> Result<Page<T, ScrapeToken>> {
        let section = match token {
            None => self.client.load_section(creds, &self.path).await?,
            Some(token) => {
                self.client
                    .continue_section(creds, &self.path, token)
                    .await?
            }
        };
        (self.parse)(&section)
    }
}
