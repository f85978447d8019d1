//! Movie catalog contract. Films are sourced entirely from a remote public
//! catalog and never persisted; the catalog's own ids are the only movie
//! identity this system knows.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod ghibli;

pub use ghibli::GhibliCatalog;

/// Raw catalog record after normalization. Field names follow the upstream
/// payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Film {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub running_time: Option<String>,
    #[serde(default)]
    pub rt_score: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub movie_banner: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Film {
    /// Release year as a number, when the catalog provides one.
    pub fn year(&self) -> Option<i32> {
        self.release_date.as_deref().and_then(|s| s.parse().ok())
    }

    /// Critic score as a number; missing or malformed scores count as 0.
    pub fn score(&self) -> i32 {
        self.rt_score
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}

/// Listing projection exposed on `GET /movies`.
#[derive(Debug, Clone, Serialize)]
pub struct MovieSummary {
    pub id: String,
    pub title: String,
    pub year: Option<String>,
    pub runtime: Option<String>,
    #[serde(rename = "posterUrl")]
    pub poster_url: Option<String>,
    pub synopsis: Option<String>,
    pub score: Option<String>,
    pub director: Option<String>,
}

/// Detail projection exposed on `GET /movies/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct MovieDetail {
    pub id: String,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<String>,
    pub runtime: Option<String>,
    #[serde(rename = "posterUrl")]
    pub poster_url: Option<String>,
    #[serde(rename = "bannerUrl")]
    pub banner_url: Option<String>,
    pub synopsis: Option<String>,
    pub score: Option<String>,
    pub director: Option<String>,
    pub producer: Option<String>,
    pub url: Option<String>,
}

impl From<&Film> for MovieSummary {
    fn from(f: &Film) -> Self {
        Self {
            id: f.id.clone(),
            title: f.title.clone(),
            year: f.release_date.clone(),
            runtime: f.running_time.clone(),
            poster_url: f.image.clone(),
            synopsis: f.description.clone(),
            score: f.rt_score.clone(),
            director: f.director.clone(),
        }
    }
}

impl From<&Film> for MovieDetail {
    fn from(f: &Film) -> Self {
        Self {
            id: f.id.clone(),
            title: f.title.clone(),
            original_title: f.original_title.clone(),
            year: f.release_date.clone(),
            runtime: f.running_time.clone(),
            poster_url: f.image.clone(),
            banner_url: f.movie_banner.clone(),
            synopsis: f.description.clone(),
            score: f.rt_score.clone(),
            director: f.director.clone(),
            producer: f.producer.clone(),
            url: f.url.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog transport error: {0}")]
    Transport(String),

    #[error("catalog returned status {status}")]
    Upstream { status: u16 },

    #[error("catalog payload error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Fetch the full film list. No caching and no retries; failures map to
    /// 502/503 at the HTTP surface.
    async fn films(&self) -> Result<Vec<Film>, CatalogError>;
}
