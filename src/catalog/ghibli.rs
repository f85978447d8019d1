//! Studio Ghibli films API client.

use async_trait::async_trait;

use super::{CatalogError, Film, MovieCatalog};

pub struct GhibliCatalog {
    http: reqwest::Client,
    films_url: String,
}

impl GhibliCatalog {
    pub fn new(http: reqwest::Client, films_url: impl Into<String>) -> Self {
        Self {
            http,
            films_url: films_url.into(),
        }
    }
}

#[async_trait]
impl MovieCatalog for GhibliCatalog {
    async fn films(&self) -> Result<Vec<Film>, CatalogError> {
        let resp = self
            .http
            .get(&self.films_url)
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CatalogError::Upstream {
                status: resp.status().as_u16(),
            });
        }

        let mut films: Vec<Film> = resp
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;

        // Upstream occasionally omits these; normalize so downstream
        // sorting and projection never special-case them.
        for film in &mut films {
            if film.rt_score.is_none() {
                film.rt_score = Some("0".to_string());
            }
        }

        Ok(films)
    }
}
