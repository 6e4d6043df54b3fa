//! YouTube trending videos via SearchApi.io.

use super::{TrendSource, array_field, first_str, read_json};
use crate::error::SourceError;
use crate::models::TrendItem;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, instrument, warn};

const PROVIDER: &str = "youtube_trends";

pub struct YouTubeTrends {
    pub http: Client,
    pub endpoint: String,
    pub api_key: String,
    /// Country code.
    pub gl: String,
    /// Language code.
    pub hl: String,
    /// Category: `now` (default), `music`, `gaming` or `films`.
    pub bp: Option<String>,
}

impl TrendSource for YouTubeTrends {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(level = "info", skip_all, fields(gl = %self.gl, hl = %self.hl))]
    async fn fetch(&self) -> Result<Vec<TrendItem>, SourceError> {
        let mut query = vec![
            ("engine", "youtube_trends"),
            ("gl", self.gl.as_str()),
            ("hl", self.hl.as_str()),
            ("api_key", self.api_key.as_str()),
        ];
        if let Some(bp) = self.bp.as_deref() {
            query.push(("bp", bp));
        }

        let data = read_json(PROVIDER, self.http.get(&self.endpoint).query(&query)).await?;
        let items = parse_trending(&data)?;
        info!(count = items.len(), "Fetched YouTube trending videos");
        Ok(items)
    }
}

/// Keep only videos that carry both a title and a link.
pub fn parse_trending(data: &Value) -> Result<Vec<TrendItem>, SourceError> {
    let trending = array_field(PROVIDER, data, "trending")?;
    let items: Vec<TrendItem> = trending
        .iter()
        .filter_map(|video| {
            let title = first_str(video, &["title"])?;
            let link = first_str(video, &["link"])?;
            Some(TrendItem::new(title, link))
        })
        .collect();

    let skipped = trending.len() - items.len();
    if skipped > 0 {
        warn!(skipped, "Skipped trending entries without a title or link");
    }
    Ok(items)
}
