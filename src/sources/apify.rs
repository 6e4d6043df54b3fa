//! TikTok and Twitter/X trends through Apify actors.
//!
//! Both sources start an actor run synchronously and read back its default
//! dataset in the same request (`run-sync-get-dataset-items`). Actor output
//! schemas drift over time, so titles and links are looked up under several
//! candidate field names.

use super::{TrendSource, first_str, read_json};
use crate::error::SourceError;
use crate::models::TrendItem;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

const TIKTOK_PROVIDER: &str = "tiktok_trends";
const TIKTOK_ACTOR: &str = "novi~tiktok-trend-api";
const TWITTER_PROVIDER: &str = "twitter_trends";
const TWITTER_ACTOR: &str = "fastcrawler~x-twitter-trends-scraper-2025";

/// Run `actor` with `input` and return its dataset items.
#[instrument(level = "info", skip(http, base_url, token, input))]
pub async fn run_actor(
    provider: &'static str,
    http: &Client,
    base_url: &str,
    token: &str,
    actor: &str,
    input: &Value,
) -> Result<Vec<Value>, SourceError> {
    let url = format!("{base_url}/v2/acts/{actor}/run-sync-get-dataset-items");
    let request = http.post(url).query(&[("token", token)]).json(input);
    match read_json(provider, request).await? {
        Value::Array(items) => Ok(items),
        other => Err(SourceError::Malformed {
            provider,
            message: format!("expected a dataset array, got {}", type_name(&other)),
        }),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub struct TikTokTrends {
    pub http: Client,
    pub base_url: String,
    pub token: String,
    /// Two-letter region code, e.g. `IN`.
    pub region: String,
    pub limit: usize,
}

impl TrendSource for TikTokTrends {
    fn name(&self) -> &'static str {
        TIKTOK_PROVIDER
    }

    #[instrument(level = "info", skip_all, fields(region = %self.region, limit = self.limit))]
    async fn fetch(&self) -> Result<Vec<TrendItem>, SourceError> {
        let input = json!({
            "isDownloadVideo": false,
            "isDownloadVideoCover": false,
            "limit": self.limit,
            "region": self.region,
        });
        let records = run_actor(TIKTOK_PROVIDER, &self.http, &self.base_url, &self.token, TIKTOK_ACTOR, &input).await?;
        let items = parse_tiktok(&records);
        info!(count = items.len(), "Fetched TikTok trends");
        Ok(items)
    }
}

pub fn parse_tiktok(records: &[Value]) -> Vec<TrendItem> {
    let items: Vec<TrendItem> = records
        .iter()
        .filter_map(|r| {
            let link = first_str(r, &["video_url", "webVideoUrl", "share_url", "url", "link"])?;
            let title = first_str(r, &["title", "desc", "description", "text"]).unwrap_or_default();
            Some(TrendItem::new(title, link))
        })
        .collect();
    if items.len() < records.len() {
        warn!(skipped = records.len() - items.len(), "Skipped TikTok records without a video link");
    }
    items
}

pub struct TwitterTrends {
    pub http: Client,
    pub base_url: String,
    pub token: String,
    /// Country slug, e.g. `new-zealand`.
    pub country: String,
}

impl TrendSource for TwitterTrends {
    fn name(&self) -> &'static str {
        TWITTER_PROVIDER
    }

    #[instrument(level = "info", skip_all, fields(country = %self.country))]
    async fn fetch(&self) -> Result<Vec<TrendItem>, SourceError> {
        let input = json!({ "country": self.country });
        let records = run_actor(TWITTER_PROVIDER, &self.http, &self.base_url, &self.token, TWITTER_ACTOR, &input).await?;
        let items = parse_twitter(&records);
        info!(count = items.len(), "Fetched Twitter/X trends");
        Ok(items)
    }
}

/// Trends without their own URL link to an x.com search for the trend name.
pub fn parse_twitter(records: &[Value]) -> Vec<TrendItem> {
    records
        .iter()
        .filter_map(|r| {
            let title = first_str(r, &["trend", "name", "title", "topic"])?;
            let link = first_str(r, &["url", "link"])
                .map(str::to_string)
                .unwrap_or_else(|| format!("https://x.com/search?q={}", urlencoding::encode(title)));
            Some(TrendItem::new(title, link))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_tiktok_field_fallbacks() {
        let records = vec![
            json!({"desc": "Dance challenge", "webVideoUrl": "https://www.tiktok.com/@a/video/1"}),
            json!({"title": "No link"}),
            json!({"video_url": "https://www.tiktok.com/@b/video/2"}),
        ];
        let items = parse_tiktok(&records);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Dance challenge");
        assert_eq!(items[1].title, "");
        assert_eq!(items[1].link, "https://www.tiktok.com/@b/video/2");
    }

    #[test]
    fn test_parse_twitter_builds_search_link() {
        let records = vec![
            json!({"trend": "#NZvAUS"}),
            json!({"name": "Budget 2025", "url": "https://x.com/search?q=Budget"}),
            json!({"volume": 1200}),
        ];
        let items = parse_twitter(&records);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link, "https://x.com/search?q=%23NZvAUS");
        assert_eq!(items[1].link, "https://x.com/search?q=Budget");
    }

    #[tokio::test]
    async fn test_tiktok_fetch_runs_actor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/acts/novi~tiktok-trend-api/run-sync-get-dataset-items"))
            .and(query_param("token", "t"))
            .and(body_partial_json(json!({"region": "IN", "limit": 3})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                {"title": "Clip", "url": "https://www.tiktok.com/@a/video/1"}
            ])))
            .mount(&server)
            .await;

        let source = TikTokTrends {
            http: Client::new(),
            base_url: server.uri(),
            token: "t".into(),
            region: "IN".into(),
            limit: 3,
        };
        let items = source.fetch().await.unwrap();
        assert_eq!(items, vec![TrendItem::new("Clip", "https://www.tiktok.com/@a/video/1")]);
    }

    #[tokio::test]
    async fn test_actor_object_response_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "actor not found"})))
            .mount(&server)
            .await;

        let err = run_actor("test", &Client::new(), &server.uri(), "t", "x~y", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }
}
