//! Trend sources: the providers that supply the list of items to process.
//!
//! Each source performs a single request and maps the response onto
//! [`TrendItem`]s. Any failure here (transport error, non-2xx status,
//! malformed JSON) is fatal for the run.
//!
//! # Supported Sources
//!
//! | Source | Module | API | Item locator |
//! |--------|--------|-----|--------------|
//! | Google Trends | [`google`] | SearchApi.io `google_trends_trending_now` | Google search link for the keyword cluster |
//! | YouTube Trends | [`youtube`] | SearchApi.io `youtube_trends` | Video URL |
//! | TikTok Trends | [`apify`] | Apify actor `novi~tiktok-trend-api` | Video URL |
//! | Twitter/X Trends | [`apify`] | Apify actor `fastcrawler~x-twitter-trends-scraper-2025` | Trend URL or x.com search link |
//! | Pinterest Trends | [`pinterest`] | Pinterest v5 trends API | Pinterest search link |

pub mod apify;
pub mod google;
pub mod pinterest;
pub mod youtube;

use crate::config::{RunConfig, SourceKind};
use crate::error::{ConfigError, SourceError};
use crate::models::TrendItem;
use crate::utils::truncate_for_log;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use apify::{TikTokTrends, TwitterTrends};
use google::GoogleTrends;
use pinterest::PinterestTrends;
use youtube::YouTubeTrends;

/// A provider of trend items.
pub trait TrendSource {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Fetch the current trend list.
    async fn fetch(&self) -> Result<Vec<TrendItem>, SourceError>;
}

/// The source selected for this run.
pub enum Source {
    Google(GoogleTrends),
    YouTube(YouTubeTrends),
    TikTok(TikTokTrends),
    Twitter(TwitterTrends),
    Pinterest(PinterestTrends),
}

impl Source {
    pub fn from_config(config: &RunConfig, http: &Client) -> Result<Self, ConfigError> {
        let key = config
            .credentials
            .require(config.source.credential())?
            .to_string();
        let params = &config.params;
        let endpoints = &config.endpoints;

        let source = match config.source {
            SourceKind::Google => Source::Google(GoogleTrends {
                http: http.clone(),
                endpoint: endpoints.searchapi.clone(),
                api_key: key,
                geo: params.geo.clone(),
                time: params.time.clone(),
            }),
            SourceKind::Youtube => Source::YouTube(YouTubeTrends {
                http: http.clone(),
                endpoint: endpoints.searchapi.clone(),
                api_key: key,
                gl: params.gl.clone(),
                hl: params.hl.clone(),
                bp: params.bp.clone(),
            }),
            SourceKind::Tiktok => Source::TikTok(TikTokTrends {
                http: http.clone(),
                base_url: endpoints.apify.clone(),
                token: key,
                region: params.region.clone().unwrap_or_else(|| "IN".to_string()),
                limit: config.limit.unwrap_or(10),
            }),
            SourceKind::Twitter => Source::Twitter(TwitterTrends {
                http: http.clone(),
                base_url: endpoints.apify.clone(),
                token: key,
                country: params.country.clone(),
            }),
            SourceKind::Pinterest => Source::Pinterest(PinterestTrends {
                http: http.clone(),
                base_url: endpoints.pinterest.clone(),
                token: key,
                region: params.region.clone().unwrap_or_else(|| "US".to_string()),
                trend_type: params.trend_type.clone(),
            }),
        };
        Ok(source)
    }
}

impl TrendSource for Source {
    fn name(&self) -> &'static str {
        match self {
            Source::Google(s) => s.name(),
            Source::YouTube(s) => s.name(),
            Source::TikTok(s) => s.name(),
            Source::Twitter(s) => s.name(),
            Source::Pinterest(s) => s.name(),
        }
    }

    async fn fetch(&self) -> Result<Vec<TrendItem>, SourceError> {
        match self {
            Source::Google(s) => s.fetch().await,
            Source::YouTube(s) => s.fetch().await,
            Source::TikTok(s) => s.fetch().await,
            Source::Twitter(s) => s.fetch().await,
            Source::Pinterest(s) => s.fetch().await,
        }
    }
}

/// Send `request` and decode a JSON body, mapping every failure to [`SourceError`].
pub(crate) async fn read_json(provider: &'static str, request: RequestBuilder) -> Result<Value, SourceError> {
    let response = request.send().await.map_err(|e| SourceError::Request {
        provider,
        message: e.to_string(),
    })?;
    let status = response.status();
    let body = response.text().await.map_err(|e| SourceError::Request {
        provider,
        message: e.to_string(),
    })?;

    if !status.is_success() {
        return Err(SourceError::Status {
            provider,
            status: status.as_u16(),
            body: truncate_for_log(&body, 300),
        });
    }

    serde_json::from_str(&body).map_err(|e| SourceError::Malformed {
        provider,
        message: e.to_string(),
    })
}

/// Take the array at `key`, or explain that it is missing.
pub(crate) fn array_field<'a>(provider: &'static str, data: &'a Value, key: &str) -> Result<&'a Vec<Value>, SourceError> {
    data.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Malformed {
            provider,
            message: format!("missing '{key}' array"),
        })
}

/// First non-blank string found under any of `keys`.
pub(crate) fn first_str<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| record.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}
