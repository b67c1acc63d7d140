//! Regex-driven HTML scraper.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::ScraperConfig;

use super::error::ScrapeError;
use super::traits::{PageScraper, ScrapedPage};

static IMG_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<img\b[^>]*>").unwrap());
static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .unwrap()
});
static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

/// Scraper that downloads a page and extracts tagged `<img>` sources.
///
/// Only images whose `id` attribute starts with the configured prefix are
/// collected. Relative sources are resolved against the page URL.
pub struct HtmlPageScraper {
    client: Client,
    config: ScraperConfig,
}

impl HtmlPageScraper {
    /// Creates a scraper. `client` should carry the same proxy and identity
    /// as image downloads.
    pub fn new(client: Client, config: ScraperConfig) -> Self {
        Self { client, config }
    }

    /// Extracts image URLs and title from `html` served at `page_url`.
    pub fn parse(&self, html: &str, page_url: &Url) -> ScrapedPage {
        let mut images = Vec::new();

        for tag in IMG_TAG_RE.find_iter(html) {
            let mut id = None;
            let mut src = None;
            for caps in ATTRIBUTE_RE.captures_iter(tag.as_str()) {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                if name.eq_ignore_ascii_case("id") {
                    id = Some(value);
                } else if name.eq_ignore_ascii_case("src") {
                    src = Some(value);
                }
            }

            let (Some(id), Some(src)) = (id, src) else {
                continue;
            };
            if !id.starts_with(&self.config.image_id_prefix) {
                continue;
            }
            let src = decode_entities(src.trim());
            if src.is_empty() {
                continue;
            }
            match page_url.join(&src) {
                Ok(resolved) => images.push(resolved.to_string()),
                Err(e) => debug!(src = %src, error = %e, "Skipping unresolvable image source"),
            }
        }

        let title = TITLE_RE
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| decode_entities(m.as_str()))
            .and_then(|raw| {
                let head = raw
                    .split(self.config.title_separator.as_str())
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                if head.is_empty() {
                    None
                } else {
                    Some(head)
                }
            });

        ScrapedPage { images, title }
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[async_trait]
impl PageScraper for HtmlPageScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        let page_url = Url::parse(url).map_err(|_| ScrapeError::InvalidUrl(url.to_string()))?;
        if !matches!(page_url.scheme(), "http" | "https") {
            return Err(ScrapeError::InvalidUrl(url.to_string()));
        }

        let response = self
            .client
            .get(page_url.clone())
            .send()
            .await
            .map_err(|e| ScrapeError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(|e| ScrapeError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let page = self.parse(&html, &page_url);
        debug!(url = %url, images = page.images.len(), title = ?page.title, "Scraped page");
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GALLERY: &str = r#"<!DOCTYPE html>
<html>
<head><title>Chapter 12 &amp; Epilogue | Some Reader Site</title></head>
<body>
  <img src="/static/logo.png" id="logo">
  <div class="page">
    <img id="image-0" class="lazy" src="https://cdn.example.com/ch12/001.jpg" alt="1">
    <IMG ID='image-1' SRC='002.jpg'>
    <img src="https://cdn.example.com/ch12/003.jpg?token=a&amp;exp=1" id="image-2" />
    <img id="thumbnail-3" src="https://cdn.example.com/thumbs/003.jpg">
    <img id="image-4">
  </div>
</body>
</html>"#;

    fn scraper() -> HtmlPageScraper {
        HtmlPageScraper::new(Client::new(), ScraperConfig::default())
    }

    #[test]
    fn test_parse_gallery() {
        let page_url = Url::parse("https://reader.example.com/series/ch12/").unwrap();
        let page = scraper().parse(GALLERY, &page_url);

        assert_eq!(
            page.images,
            vec![
                "https://cdn.example.com/ch12/001.jpg",
                "https://reader.example.com/series/ch12/002.jpg",
                "https://cdn.example.com/ch12/003.jpg?token=a&exp=1",
            ]
        );
        assert_eq!(page.title.as_deref(), Some("Chapter 12 & Epilogue"));
    }

    #[test]
    fn test_parse_custom_prefix_and_separator() {
        let scraper = HtmlPageScraper::new(
            Client::new(),
            ScraperConfig {
                image_id_prefix: "thumbnail-".to_string(),
                title_separator: "-".to_string(),
            },
        );
        let page_url = Url::parse("https://reader.example.com/").unwrap();
        let page = scraper.parse(
            r#"<title>Gallery - Site</title><img id="thumbnail-1" src="t1.jpg">"#,
            &page_url,
        );

        assert_eq!(page.images, vec!["https://reader.example.com/t1.jpg"]);
        assert_eq!(page.title.as_deref(), Some("Gallery"));
    }

    #[test]
    fn test_parse_no_title_no_images() {
        let page_url = Url::parse("https://reader.example.com/").unwrap();
        let page = scraper().parse("<html><body><p>nothing</p></body></html>", &page_url);
        assert!(page.images.is_empty());
        assert_eq!(page.title, None);

        let page = scraper().parse("<title>   | Site</title>", &page_url);
        assert_eq!(page.title, None);
    }

    #[tokio::test]
    async fn test_scrape_rejects_non_http() {
        let err = scraper().scrape("ftp://example.com/page").await.unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidUrl(_)));

        let err = scraper().scrape("not a url").await.unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_scrape_live_page() {
        use axum::{response::Html, routing::get, Router};

        let app = Router::new().route("/ch/1", get(|| async { Html(GALLERY) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let page = scraper()
            .scrape(&format!("http://{}/ch/1", addr))
            .await
            .unwrap();
        assert_eq!(page.images.len(), 3);
        assert_eq!(page.images[1], format!("http://{}/ch/002.jpg", addr));

        let err = scraper()
            .scrape(&format!("http://{}/missing", addr))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 404, .. }));
    }
}
