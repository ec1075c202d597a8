use std::collections::BTreeMap;

use lazy_static::lazy_static;
use scraper::{Html, Selector};

use crate::lookup;

pub const STANDINGS_URL: &str = "https://beinsports.com.tr/lig/super-lig/puan-durumu";

const FALLBACK_TEAMS: [&str; 5] = [
    "Fenerbahçe",
    "Galatasaray",
    "Beşiktaş",
    "Trabzonspor",
    "Başakşehir FK",
];

lazy_static! {
    static ref ROW_SELECTOR: Selector = Selector::parse("tr").unwrap();
    static ref IMG_SELECTOR: Selector = Selector::parse("img").unwrap();
}

/// Team name -> logo URL, iterated in alphabetical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamDirectory(BTreeMap<String, Option<String>>);

impl TeamDirectory {
    pub fn fallback() -> Self {
        Self(
            FALLBACK_TEAMS
                .iter()
                .map(|name| (name.to_string(), None))
                .collect(),
        )
    }

    /// Reads the league table. Every row with an image names a team through
    /// the image's `alt` or `title`.
    pub fn parse_standings(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut teams = BTreeMap::new();

        for row in document.select(&ROW_SELECTOR) {
            let Some(img) = row.select(&IMG_SELECTOR).next() else {
                continue;
            };
            let img = img.value();

            let Some(name) = img
                .attr("alt")
                .filter(|s| !s.is_empty())
                .or_else(|| img.attr("title"))
                .map(str::trim)
                .filter(|s| !s.is_empty())
            else {
                continue;
            };

            let logo = img.attr("src").map(|src| match src.strip_prefix("//") {
                Some(rest) => format!("https://{rest}"),
                None => src.to_owned(),
            });

            teams.entry(name.to_owned()).or_insert(logo);
        }

        Self(teams)
    }

    pub async fn load(client: &reqwest::Client) -> Self {
        let teams = match lookup::fetch_page(client, STANDINGS_URL).await {
            Ok(html) => Self::parse_standings(&html),
            Err(e) => {
                log::warn!("Cannot load team list: {e}");
                Self::default()
            }
        };

        let teams = if teams.is_empty() {
            Self::fallback()
        } else {
            teams
        };

        log::info!("{} teams loaded", teams.len());
        teams
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    // the menu shows names only for now
    #[allow(unused)]
    pub fn logo(&self, name: &str) -> Option<&str> {
        self.0.get(name)?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
