//! Clash Royale API client for the leaderboard and battlelog endpoints

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use shared::{ParticipantMetadata, ParticipantRef, RawBattle};

use crate::error::{MetaError, MetaResult, RetrievalError};
use crate::traits::{BattlelogClient, LeaderboardClient};

pub const DEFAULT_BASE_URL: &str = "https://api.clashroyale.com/v1";
pub const TOKEN_ENV: &str = "CLASH_ROYALE_API_TOKEN";
pub const BASE_URL_ENV: &str = "CLASH_ROYALE_API_URL";

const LEADERBOARD_PATH: [&str; 4] = ["locations", "global", "pathoflegend", "players"];
const LEADERBOARD_TARGET: &str = "leaderboard";

#[derive(Debug, Deserialize)]
struct LeaderboardPage {
    #[serde(default)]
    items: Vec<LeaderboardEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaderboardEntry {
    #[serde(default)]
    tag: String,
    name: Option<String>,
    rank: Option<u32>,
    #[serde(alias = "trophies")]
    elo_rating: Option<u32>,
    clan: Option<ClanRef>,
}

#[derive(Debug, Deserialize)]
struct ClanRef {
    name: Option<String>,
}

impl LeaderboardEntry {
    fn into_participant(self, index: usize) -> ParticipantRef {
        ParticipantRef::new(self.tag, index).with_metadata(ParticipantMetadata {
            name: self.name,
            rank: self.rank,
            rating: self.elo_rating,
            clan: self.clan.and_then(|c| c.name),
        })
    }
}

/// HTTP client for the public Clash Royale API
#[derive(Debug, Clone)]
pub struct ClashApiClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ClashApiClient {
    /// Create a client against `base_url`.
    ///
    /// A missing token is accepted here; requests then fail with
    /// `RetrievalError::MissingToken`.
    pub fn new(base_url: &str, token: Option<String>, request_timeout: Duration) -> MetaResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| MetaError::config(format!("invalid API base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(MetaError::config(format!("API base URL {base_url} cannot carry a path")));
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| MetaError::config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Build a client from the environment, reading `.env` when present.
    ///
    /// `base_url_override` takes precedence over `CLASH_ROYALE_API_URL`.
    pub fn from_env(base_url_override: Option<&str>, request_timeout: Duration) -> MetaResult<Self> {
        dotenv::dotenv().ok();

        let token = std::env::var(TOKEN_ENV).ok();
        if token.is_none() {
            tracing::warn!("{} is not set; API requests will fail", TOKEN_ENV);
        }
        let base_url = match base_url_override {
            Some(url) => url.to_string(),
            None => std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        };

        Self::new(&base_url, token, request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, target: &str) -> Result<T, RetrievalError> {
        let token = self.token.as_deref().ok_or(RetrievalError::MissingToken)?;

        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RetrievalError::Network {
                target: target.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status {
                target: target.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| RetrievalError::Decode {
            target: target.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl LeaderboardClient for ClashApiClient {
    async fn fetch_population(&self, limit: usize) -> Result<Vec<ParticipantRef>, RetrievalError> {
        let mut url = self.endpoint(LEADERBOARD_PATH);
        url.query_pairs_mut().append_pair("limit", &limit.to_string());

        let page: LeaderboardPage = self.get_json(url, LEADERBOARD_TARGET).await?;
        Ok(page
            .items
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, entry)| entry.into_participant(index))
            .collect())
    }
}

#[async_trait]
impl BattlelogClient for ClashApiClient {
    async fn fetch_recent(&self, tag: &str) -> Result<Vec<RawBattle>, RetrievalError> {
        let url = self.endpoint(["players", tag, "battlelog"]);
        self.get_json(url, tag).await
    }
}
