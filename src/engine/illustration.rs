use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;

use crate::settings::Credentials;

const UNSPLASH_SEARCH_URL: &str = "https://api.unsplash.com/search/photos";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_KEYWORDS: &str = "fantasy,story,adventure";

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "for", "nor", "on", "at", "to", "by", "is", "are",
    "was", "were", "be", "been", "being", "i", "you", "he", "she", "it", "we", "they", "this",
    "that", "these", "those", "my", "your", "his", "her", "its", "our", "their", "in", "of",
    "from", "with",
];

/// Best-effort picture for a finished segment. Failures resolve to `None`.
pub trait IllustrationLookup {
    fn illustrate(&self, story: &str) -> Option<String>;
}

impl<T: IllustrationLookup + ?Sized> IllustrationLookup for Box<T> {
    fn illustrate(&self, story: &str) -> Option<String> {
        (**self).illustrate(story)
    }
}

pub fn build_illustrator(credentials: &Credentials) -> Box<dyn IllustrationLookup + Send> {
    match &credentials.unsplash_access_key {
        Some(key) => match UnsplashLookup::new(key.clone()) {
            Some(lookup) => Box::new(lookup),
            None => Box::new(KeywordImageLookup),
        },
        None => Box::new(KeywordImageLookup),
    }
}

/// Up to three most frequent meaningful words, most frequent first.
pub fn extract_keywords(story: &str) -> Vec<String> {
    let cleaned: String = story
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for word in cleaned.split_whitespace() {
        if word.chars().count() <= 3 || STOP_WORDS.contains(&word) {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(3).map(str::to_string).collect()
}

/// Keyword image URL that needs no API key.
pub fn keyword_image_url(story: &str) -> String {
    let keywords = extract_keywords(story);
    let keywords = if keywords.is_empty() {
        DEFAULT_KEYWORDS.to_string()
    } else {
        keywords.join(",")
    };
    let seed: u32 = rand::thread_rng().gen_range(0..1000);
    format!("https://source.unsplash.com/1200x800/?{keywords}&{seed}")
}

pub struct KeywordImageLookup;

impl IllustrationLookup for KeywordImageLookup {
    fn illustrate(&self, story: &str) -> Option<String> {
        Some(keyword_image_url(story))
    }
}

pub struct NoIllustration;

impl IllustrationLookup for NoIllustration {
    fn illustrate(&self, _story: &str) -> Option<String> {
        None
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Deserialize)]
struct PhotoUrls {
    regular: String,
}

/// Unsplash photo search, falling back to [`keyword_image_url`].
pub struct UnsplashLookup {
    client: Client,
    access_key: String,
}

impl UnsplashLookup {
    pub fn new(access_key: String) -> Option<Self> {
        let client = Client::builder().timeout(LOOKUP_TIMEOUT).build().ok()?;
        Some(Self { client, access_key })
    }

    fn search(&self, keywords: &[String]) -> Result<Option<String>, String> {
        let query = keywords.join(" ");
        let url = Url::parse_with_params(
            UNSPLASH_SEARCH_URL,
            &[
                ("query", query.as_str()),
                ("per_page", "1"),
                ("orientation", "landscape"),
            ],
        )
        .map_err(|e| e.to_string())?;

        let resp = self
            .client
            .get(url)
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .send()
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            return Err(format!("status {}", resp.status()));
        }

        let body: SearchResponse = resp.json().map_err(|e| e.to_string())?;
        Ok(body.results.into_iter().next().map(|p| p.urls.regular))
    }
}

impl IllustrationLookup for UnsplashLookup {
    fn illustrate(&self, story: &str) -> Option<String> {
        let keywords = extract_keywords(story);
        if keywords.is_empty() {
            return Some(keyword_image_url(story));
        }

        match self.search(&keywords) {
            Ok(Some(url)) => Some(url),
            Ok(None) => Some(keyword_image_url(story)),
            Err(e) => {
                tracing::warn!(error = %e, "unsplash lookup failed");
                Some(keyword_image_url(story))
            }
        }
    }
}
