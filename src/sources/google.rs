//! Google Trends "trending now" via SearchApi.io.
//!
//! Each trend is a cluster of related search keywords. The top five keywords
//! are kept on the item and joined with `OR` to form the search query that
//! search-based retrievers use; the item link is the matching Google search.

use super::{TrendSource, array_field, first_str, read_json};
use crate::error::SourceError;
use crate::models::TrendItem;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument};

const PROVIDER: &str = "google_trends";
const KEYWORDS_PER_TREND: usize = 5;

pub struct GoogleTrends {
    pub http: Client,
    pub endpoint: String,
    pub api_key: String,
    /// Country code, e.g. `NZ`.
    pub geo: String,
    /// Time window, e.g. `past_7_days`.
    pub time: String,
}

impl TrendSource for GoogleTrends {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(level = "info", skip_all, fields(geo = %self.geo, time = %self.time))]
    async fn fetch(&self) -> Result<Vec<TrendItem>, SourceError> {
        let request = self.http.get(&self.endpoint).query(&[
            ("engine", "google_trends_trending_now"),
            ("geo", self.geo.as_str()),
            ("time", self.time.as_str()),
            ("api_key", self.api_key.as_str()),
        ]);
        let data = read_json(PROVIDER, request).await?;
        let items = parse_trends(&data)?;
        info!(count = items.len(), "Fetched Google trends");
        Ok(items)
    }
}

/// Map a `google_trends_trending_now` response onto trend items.
pub fn parse_trends(data: &Value) -> Result<Vec<TrendItem>, SourceError> {
    let trends = array_field(PROVIDER, data, "trends")?;

    let items: Vec<TrendItem> = trends
        .iter()
        .filter_map(|trend| {
            let keywords: Vec<String> = trend
                .get("keywords")
                .and_then(Value::as_array)
                .map(|kws| {
                    kws.iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .take(KEYWORDS_PER_TREND)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let title = first_str(trend, &["query", "title"])
                .map(str::to_string)
                .or_else(|| keywords.first().cloned())?;

            let item = TrendItem::new(title, "").with_keywords(keywords);
            let link = google_search_link(&item.search_query());
            Some(TrendItem { link, ..item })
        })
        .collect();

    debug!(count = items.len(), "Parsed Google trends");
    Ok(items)
}

pub fn google_search_link(query: &str) -> String {
    format!("https://www.google.com/search?q={}", urlencoding::encode(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_trends_keeps_top_five_keywords() {
        let data = json!({
            "trends": [
                {
                    "query": "all blacks",
                    "keywords": ["all blacks", "rugby", "bledisloe", "nz vs aus", "haka", "eden park"]
                },
                {"keywords": ["cyclone gabrielle"]},
                {"keywords": []}
            ]
        });

        let items = parse_trends(&data).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "all blacks");
        assert_eq!(items[0].keywords.len(), 5);
        assert_eq!(items[0].search_query(), "all blacks OR rugby OR bledisloe OR nz vs aus OR haka");
        assert_eq!(
            items[0].link,
            "https://www.google.com/search?q=all%20blacks%20OR%20rugby%20OR%20bledisloe%20OR%20nz%20vs%20aus%20OR%20haka"
        );
        assert_eq!(items[1].title, "cyclone gabrielle");
    }

    #[test]
    fn test_parse_trends_without_trends_key() {
        let err = parse_trends(&json!({"error": "quota"})).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_fetch_sends_engine_and_geo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("engine", "google_trends_trending_now"))
            .and(query_param("geo", "NZ"))
            .and(query_param("api_key", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "trends": [{"query": "storm", "keywords": ["storm", "metservice"]}]
            })))
            .mount(&server)
            .await;

        let source = GoogleTrends {
            http: Client::new(),
            endpoint: server.uri(),
            api_key: "k".into(),
            geo: "NZ".into(),
            time: "past_7_days".into(),
        };
        let items = source.fetch().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].keywords, vec!["storm".to_string(), "metservice".to_string()]);
    }
}
