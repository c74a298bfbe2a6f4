//! News feed
//!
//! Articles come from the RSS feed named in the distribution index. The
//! newest one raises an alert until the player dismisses it.

use crate::config::NewsCache;
use crate::util::hash::sha1_hex;
use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static RELATIVE_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="(.+?)""#).expect("src pattern"));

const FEED_TIMEOUT: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub link: String,
    /// Display date, e.g. `Oct 18, 2026, 3:05 PM`
    pub date: String,
    pub published: Option<DateTime<Utc>>,
    pub author: String,
    /// HTML body with absolute image sources
    pub content: String,
    /// e.g. `1 Comment`, `4 Comments`
    pub comments: String,
    pub comments_link: String,
}

pub fn format_article_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%b %-d, %Y, %-I:%M %p").to_string()
}

/// `scheme://host[:port]/` of a URL
fn feed_origin(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let host = rest.split(['/', '?', '#']).next()?;
    Some(format!("{}://{}/", scheme, host))
}

fn absolutize_sources(content: &str, origin: &str) -> String {
    RELATIVE_SRC
        .replace_all(content, |c: &regex::Captures| {
            let src = &c[1];
            if src.starts_with("http://") || src.starts_with("https://") {
                c[0].to_string()
            } else {
                format!("src=\"{}{}\"", origin, src)
            }
        })
        .into_owned()
}

fn comments_label(count: &str) -> String {
    let count = if count.is_empty() { "0" } else { count };
    let plural = if count == "1" { "" } else { "s" };
    format!("{} Comment{}", count, plural)
}

#[derive(Default)]
struct RawItem {
    title: String,
    link: String,
    pub_date: String,
    creator: String,
    content: String,
    comments: String,
}

impl RawItem {
    fn field(&mut self, name: &[u8]) -> Option<&mut String> {
        match name {
            b"title" => Some(&mut self.title),
            b"link" => Some(&mut self.link),
            b"pubDate" => Some(&mut self.pub_date),
            b"dc:creator" => Some(&mut self.creator),
            b"content:encoded" => Some(&mut self.content),
            b"slash:comments" => Some(&mut self.comments),
            _ => None,
        }
    }

    fn into_article(self, origin: &str) -> Article {
        let published = DateTime::parse_from_rfc2822(self.pub_date.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc));
        let date = published
            .map(|d| format_article_date(&d.with_timezone(&Local)))
            .unwrap_or_default();
        let link = self.link.trim().to_string();

        Article {
            title: self.title.trim().to_string(),
            comments_link: format!("{}#comments", link),
            link,
            date,
            published,
            author: self.creator.trim().to_string(),
            content: absolutize_sources(&self.content, origin),
            comments: comments_label(self.comments.trim()),
        }
    }
}

/// Parse an RSS document into articles, newest first as published
pub fn parse_feed(xml: &str, feed_url: &str) -> Result<Vec<Article>> {
    let origin = feed_origin(feed_url).context("Invalid feed URL")?;
    let mut reader = Reader::from_str(xml);

    let mut articles = Vec::new();
    let mut item: Option<RawItem> = None;
    let mut field: Option<Vec<u8>> = None;

    loop {
        match reader.read_event().context("Malformed news feed")? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if name == b"item" {
                    item = Some(RawItem::default());
                } else if item.is_some() {
                    field = Some(name);
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == b"item" {
                    if let Some(done) = item.take() {
                        articles.push(done.into_article(&origin));
                    }
                }
                field = None;
            }
            Event::Text(t) => {
                if let (Some(item), Some(name)) = (item.as_mut(), field.as_deref()) {
                    if let Some(target) = item.field(name) {
                        target.push_str(&t.unescape()?);
                    }
                }
            }
            Event::CData(t) => {
                if let (Some(item), Some(name)) = (item.as_mut(), field.as_deref()) {
                    if let Some(target) = item.field(name) {
                        target.push_str(&String::from_utf8_lossy(&t));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(articles)
}

/// Download and parse the feed
pub async fn load_news(client: &reqwest::Client, url: &str) -> Result<Vec<Article>> {
    let body = client
        .get(url)
        .timeout(FEED_TIMEOUT)
        .send()
        .await
        .context("Failed to load news feed")?
        .error_for_status()?
        .text()
        .await?;
    parse_feed(&body, url)
}

/// Whether to raise the news alert, and the cache to store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsCheck {
    pub alert: bool,
    /// Replacement cache, `None` when it stays as is
    pub cache: Option<NewsCache>,
}

/// Compare the newest article against what the player has already seen
///
/// An older or equally old article alerts when its content changed or it
/// was never dismissed. An empty feed resets the cache.
pub fn evaluate(cache: &NewsCache, articles: &[Article]) -> NewsCheck {
    let Some(latest) = articles.first() else {
        return NewsCheck {
            alert: false,
            cache: Some(NewsCache::default()),
        };
    };

    let hash = sha1_hex(latest.content.as_bytes());
    let date = latest.published.map(|d| d.timestamp_millis());

    let is_new = match (cache.date, cache.content.as_deref(), date) {
        (Some(cached_date), Some(cached_hash), Some(date)) if cached_date >= date => {
            cached_hash != hash || !cache.dismissed
        }
        _ => true,
    };

    NewsCheck {
        alert: is_new,
        cache: is_new.then(|| NewsCache {
            date,
            content: Some(hash),
            dismissed: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:slash="http://purl.org/rss/1.0/modules/slash/">
  <channel>
    <title>Songs of War</title>
    <link>https://songs-of-war.com</link>
    <item>
      <title>Season 3 &amp; more</title>
      <link>https://songs-of-war.com/news/season-3</link>
      <pubDate>Sun, 18 Oct 2026 15:05:00 +0000</pubDate>
      <dc:creator><![CDATA[Aeldra]]></dc:creator>
      <content:encoded><![CDATA[<p>Hi</p><img src="uploads/map.png"><img src="https://cdn.example/a.png">]]></content:encoded>
      <slash:comments>1</slash:comments>
    </item>
    <item>
      <title>Patch notes</title>
      <link>https://songs-of-war.com/news/patch</link>
      <pubDate>Sat, 10 Oct 2026 09:00:00 +0000</pubDate>
      <dc:creator>Staff</dc:creator>
      <content:encoded><![CDATA[<p>Fixes</p>]]></content:encoded>
    </item>
  </channel>
</rss>"#;

    fn articles() -> Vec<Article> {
        parse_feed(FEED, "https://songs-of-war.com/feed").unwrap()
    }

    #[test]
    fn test_parse_feed() {
        let articles = articles();
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.title, "Season 3 & more");
        assert_eq!(first.author, "Aeldra");
        assert_eq!(first.comments, "1 Comment");
        assert_eq!(
            first.comments_link,
            "https://songs-of-war.com/news/season-3#comments"
        );
        assert!(first
            .content
            .contains(r#"src="https://songs-of-war.com/uploads/map.png""#));
        assert!(first.content.contains(r#"src="https://cdn.example/a.png""#));
        assert_eq!(
            first.published.unwrap().timestamp(),
            Utc.with_ymd_and_hms(2026, 10, 18, 15, 5, 0).unwrap().timestamp()
        );
        assert!(!first.date.is_empty());

        assert_eq!(articles[1].comments, "0 Comments");
        assert_eq!(articles[1].author, "Staff");
    }

    #[test]
    fn test_format_article_date() {
        let date = Utc.with_ymd_and_hms(2026, 10, 8, 15, 5, 0).unwrap();
        assert_eq!(format_article_date(&date), "Oct 8, 2026, 3:05 PM");
        let date = Utc.with_ymd_and_hms(2026, 1, 2, 0, 30, 0).unwrap();
        assert_eq!(format_article_date(&date), "Jan 2, 2026, 12:30 AM");
    }

    #[test]
    fn test_feed_origin() {
        assert_eq!(
            feed_origin("https://songs-of-war.com/feed?x=1").as_deref(),
            Some("https://songs-of-war.com/")
        );
        assert_eq!(
            feed_origin("http://localhost:8080").as_deref(),
            Some("http://localhost:8080/")
        );
        assert!(feed_origin("not a url").is_none());
    }

    #[test]
    fn test_evaluate_first_visit_alerts() {
        let check = evaluate(&NewsCache::default(), &articles());
        assert!(check.alert);
        let cache = check.cache.unwrap();
        assert!(!cache.dismissed);
        assert_eq!(cache.content.as_deref().map(str::len), Some(40));
    }

    #[test]
    fn test_evaluate_dismissed_article_stays_quiet() {
        let articles = articles();
        let mut cache = evaluate(&NewsCache::default(), &articles).cache.unwrap();
        cache.dismissed = true;

        let check = evaluate(&cache, &articles);
        assert!(!check.alert);
        assert!(check.cache.is_none());

        // Edited article alerts again
        let mut edited = articles.clone();
        edited[0].content.push_str("<p>Update</p>");
        assert!(evaluate(&cache, &edited).alert);
    }

    #[test]
    fn test_evaluate_empty_feed_resets() {
        let cache = NewsCache {
            date: Some(1),
            content: Some("abc".to_string()),
            dismissed: true,
        };
        let check = evaluate(&cache, &[]);
        assert!(!check.alert);
        assert_eq!(check.cache, Some(NewsCache::default()));
    }
}
