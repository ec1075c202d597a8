use std::time::Duration;

use futures_core::future::BoxFuture;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to retrieve website: {0}")]
    Reqwest(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketLink {
    pub site: String,
    pub url: String,
}

impl TicketLink {
    pub fn new(site: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            url: url.into(),
        }
    }
}

/// Finds ticket offers for a team. Failures are handled inside and simply
/// yield fewer (or no) links.
pub trait TicketLookup: Send + Sync {
    fn find_tickets<'a>(&'a self, team: &'a str) -> BoxFuture<'a, Vec<TicketLink>>;
}

/// One ticket seller: where to look and how to recognise an offer.
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn listing_url(&self) -> &str;

    /// Returns the absolute URL of the first offer on `page` matching `team`.
    fn find_match(&self, page: &str, team: &str) -> Option<String>;
}

lazy_static! {
    static ref LINK_SELECTOR: Selector = Selector::parse("a[href]").unwrap();
}

pub fn extract_text(e: &ElementRef) -> String {
    e.text().map(str::trim).collect::<Vec<_>>().concat()
}

pub fn resolve_url(base: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_owned()
    } else if href.starts_with('/') {
        format!("{base}{href}")
    } else {
        format!("{base}/{href}")
    }
}

/// Matches the first link whose visible text contains the team name,
/// ignoring case.
pub struct AnchorTextSource {
    name: String,
    listing_url: String,
    base_url: String,
}

impl AnchorTextSource {
    pub fn new(name: &str, listing_url: &str, base_url: &str) -> Self {
        Self {
            name: name.to_owned(),
            listing_url: listing_url.to_owned(),
            base_url: base_url.to_owned(),
        }
    }
}

impl SourceAdapter for AnchorTextSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn listing_url(&self) -> &str {
        &self.listing_url
    }

    fn find_match(&self, page: &str, team: &str) -> Option<String> {
        let document = Html::parse_document(page);

        for error in &document.errors {
            log::debug!("Parser error on {}: {error}", self.name);
        }

        let team = team.to_lowercase();

        document
            .select(&LINK_SELECTOR)
            .find(|a| extract_text(a).to_lowercase().contains(&team))
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve_url(&self.base_url, href))
    }
}

pub fn default_sources() -> Vec<Box<dyn SourceAdapter>> {
    vec![
        Box::new(AnchorTextSource::new(
            "Mobilet",
            "https://mobilet.com/etkinlikler",
            "https://mobilet.com",
        )),
        Box::new(AnchorTextSource::new(
            "Passo",
            "https://www.passo.com.tr/tr/etkinlik-spor",
            "https://www.passo.com.tr",
        )),
        Box::new(AnchorTextSource::new(
            "Biletinial",
            "https://www.biletinial.com/tr-tr/spor",
            "https://www.biletinial.com",
        )),
    ]
}

pub fn http_client(timeout: Duration) -> Result<reqwest::Client, Error> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String, Error> {
    log::debug!("Get site {url}");
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Queries every source in order, at most one link per source.
pub struct HttpTicketLookup {
    client: reqwest::Client,
    sources: Vec<Box<dyn SourceAdapter>>,
}

impl HttpTicketLookup {
    pub fn new(client: reqwest::Client, sources: Vec<Box<dyn SourceAdapter>>) -> Self {
        Self { client, sources }
    }

    async fn search(&self, team: &str) -> Vec<TicketLink> {
        let mut links = Vec::new();

        for source in &self.sources {
            let page = match fetch_page(&self.client, source.listing_url()).await {
                Ok(page) => page,
                Err(e) => {
                    log::warn!("Failed to search {} for {team}: {e}", source.name());
                    continue;
                }
            };

            match source.find_match(&page, team) {
                Some(url) => links.push(TicketLink::new(source.name(), url)),
                None => log::debug!("{}: nothing for {team}", source.name()),
            }
        }

        links
    }
}

impl TicketLookup for HttpTicketLookup {
    fn find_tickets<'a>(&'a self, team: &'a str) -> BoxFuture<'a, Vec<TicketLink>> {
        Box::pin(self.search(team))
    }
}
