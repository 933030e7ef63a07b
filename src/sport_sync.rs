use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::observability::SPORT_SYNC_TOTAL;

/// One entry of the upstream sports list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSport {
    pub sport_id: String,
    pub name: String,
}

/// Source of the sport catalog.
#[async_trait]
pub trait SportFeed: Send + Sync {
    async fn fetch(&self) -> Result<Vec<FeedSport>, Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Deserialize)]
struct FeedEnvelope {
    #[serde(default)]
    data: Vec<FeedEntry>,
}

#[derive(Deserialize)]
struct FeedEntry {
    sport_id: serde_json::Value,
    sport_name: serde_json::Value,
}

fn value_to_text(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse `{"data": [{"sport_id": .., "sport_name": ..}, ..]}`.
/// Ids may be numbers or strings; entries missing either field are skipped.
pub fn parse_feed(body: &str) -> Result<Vec<FeedSport>, serde_json::Error> {
    let envelope: FeedEnvelope = serde_json::from_str(body)?;
    Ok(envelope
        .data
        .iter()
        .filter_map(|e| {
            Some(FeedSport {
                sport_id: value_to_text(&e.sport_id)?,
                name: value_to_text(&e.sport_name)?,
            })
        })
        .collect())
}

pub struct HttpSportFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpSportFeed {
    pub fn new(url: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl SportFeed for HttpSportFeed {
    async fn fetch(&self) -> Result<Vec<FeedSport>, Box<dyn std::error::Error + Send + Sync>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_feed(&body)?)
    }
}

/// Fetch once and upsert every sport. Returns how many records changed.
pub async fn sync_once(
    engine: &Engine,
    feed: &dyn SportFeed,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let sports = feed.fetch().await?;
    let mut changed = 0;
    for sport in sports {
        if engine.upsert_sport(sport.sport_id, sport.name).await? {
            changed += 1;
        }
    }
    Ok(changed)
}

/// Background task: sync immediately, then every `interval`, until cancelled.
/// Failures are logged and swallowed; they never reach the booking path.
pub async fn run_sport_sync(
    engine: Arc<Engine>,
    feed: Arc<dyn SportFeed>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.cancelled() => {
                debug!("sport sync stopped");
                return;
            }
        }
        match sync_once(&engine, feed.as_ref()).await {
            Ok(changed) => {
                metrics::counter!(SPORT_SYNC_TOTAL, "outcome" => "ok").increment(1);
                info!("sport catalog synced, {changed} changed");
            }
            Err(e) => {
                metrics::counter!(SPORT_SYNC_TOTAL, "outcome" => "error").increment(1);
                warn!("sport catalog sync failed: {e}");
            }
        }
    }
}
