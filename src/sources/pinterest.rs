//! Pinterest trending keywords (v5 trends API, business accounts only).

use super::{TrendSource, array_field, first_str, read_json};
use crate::error::SourceError;
use crate::models::TrendItem;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, instrument};

const PROVIDER: &str = "pinterest_trends";

pub struct PinterestTrends {
    pub http: Client,
    pub base_url: String,
    /// Bearer token of an approved Pinterest app.
    pub token: String,
    pub region: String,
    pub trend_type: String,
}

impl TrendSource for PinterestTrends {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(level = "info", skip_all, fields(region = %self.region, trend_type = %self.trend_type))]
    async fn fetch(&self) -> Result<Vec<TrendItem>, SourceError> {
        let url = format!(
            "{}/v5/trends/keywords/{}/top/{}",
            self.base_url, self.region, self.trend_type
        );
        let request = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json");
        let data = read_json(PROVIDER, request).await?;
        let items = parse_keywords(&data)?;
        info!(count = items.len(), "Fetched Pinterest trends");
        Ok(items)
    }
}

pub fn parse_keywords(data: &Value) -> Result<Vec<TrendItem>, SourceError> {
    let trends = array_field(PROVIDER, data, "trends")?;
    Ok(trends
        .iter()
        .filter_map(|t| first_str(t, &["keyword"]))
        .map(|keyword| {
            let link = format!("https://www.pinterest.com/search/pins/?q={}", urlencoding::encode(keyword));
            TrendItem::new(keyword, link).with_keywords(vec![keyword.to_string()])
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_keywords() {
        let data = json!({"trends": [
            {"keyword": "summer outfits", "pct_growth_wow": 40},
            {"pct_growth_wow": 10}
        ]});
        let items = parse_keywords(&data).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://www.pinterest.com/search/pins/?q=summer%20outfits");
        assert_eq!(items[0].search_query(), "summer outfits");
    }

    #[tokio::test]
    async fn test_fetch_uses_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/trends/keywords/US/top/growth"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"trends": [{"keyword": "garden ideas"}]})))
            .mount(&server)
            .await;

        let source = PinterestTrends {
            http: Client::new(),
            base_url: server.uri(),
            token: "tok".into(),
            region: "US".into(),
            trend_type: "growth".into(),
        };
        let items = source.fetch().await.unwrap();
        assert_eq!(items[0].title, "garden ideas");
    }
}
