use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{Film, MovieDetail, MovieSummary};
use crate::error::ApiError;
use crate::models::review;
use crate::sentiment::{LABEL_NEGATIVE, LABEL_NEUTRAL, LABEL_POSITIVE};
use crate::state::AppState;

const DEFAULT_PAGE: usize = 1;
const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

/// Average-score bands for the per-movie aggregate label.
const POSITIVE_THRESHOLD: f64 = 0.2;
const NEGATIVE_THRESHOLD: f64 = -0.2;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Substring match on title / original title / synopsis
    pub q: Option<String>,
    /// Filter by release year
    pub year: Option<i32>,
    /// "title|year|score" with ":asc" or ":desc"
    pub sort: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// GET /movies - list films from the public catalog with filtering, sorting
/// and pagination applied over the fetched set.
pub async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<MovieSummary>>, ApiError> {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if page < 1 {
        return Err(ApiError::validation_error("page must be >= 1"));
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation_error(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let films = state.catalog.films().await?;
    let selected = select_films(films, &query);

    // Saturate so an absurdly large page is an empty page, not an overflow
    let start = (page - 1).saturating_mul(limit);
    let items: Vec<MovieSummary> = selected
        .iter()
        .skip(start)
        .take(limit)
        .map(MovieSummary::from)
        .collect();

    Ok(Json(items))
}

/// GET /movies/:movie_id - single film detail.
pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> Result<Json<MovieDetail>, ApiError> {
    let films = state.catalog.films().await?;
    films
        .iter()
        .find(|f| f.id == movie_id)
        .map(|f| Json(MovieDetail::from(f)))
        .ok_or_else(|| ApiError::not_found("Movie not found"))
}

#[derive(Debug, Serialize)]
pub struct MovieSentiment {
    pub movie_id: String,
    pub review_count: usize,
    pub average_rating: Option<f64>,
    pub overall_sentiment: String,
    pub sentiment_score: Option<f64>,
}

/// GET /movies/:movie_id/sentiment - aggregate sentiment over all stored
/// reviews for one movie. Zero reviews is a neutral result, not an error.
pub async fn movie_sentiment(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> Result<Json<MovieSentiment>, ApiError> {
    let docs = state
        .store
        .query(
            review::COLLECTION,
            &[("movie_id", Value::String(movie_id.clone()))],
            None,
        )
        .await?;

    let reviews: Result<Vec<_>, _> = docs.into_iter().map(ReviewDoc::from_document).collect();
    let reviews = reviews?;

    Ok(Json(aggregate_sentiment(movie_id, &reviews)))
}

// Minimal projection of a review for aggregation
struct ReviewDoc {
    rating: i64,
    sentiment_score: Option<f64>,
}

impl ReviewDoc {
    fn from_document(doc: crate::store::Document) -> Result<Self, ApiError> {
        let review = crate::models::Review::from_document(doc)?;
        Ok(Self {
            rating: review.rating,
            sentiment_score: review.sentiment_score,
        })
    }
}

fn aggregate_sentiment(movie_id: String, reviews: &[ReviewDoc]) -> MovieSentiment {
    if reviews.is_empty() {
        return MovieSentiment {
            movie_id,
            review_count: 0,
            average_rating: None,
            overall_sentiment: LABEL_NEUTRAL.to_string(),
            sentiment_score: Some(0.0),
        };
    }

    let count = reviews.len();
    let average_rating = reviews.iter().map(|r| r.rating as f64).sum::<f64>() / count as f64;

    let scores: Vec<f64> = reviews.iter().filter_map(|r| r.sentiment_score).collect();
    let sentiment_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    let overall_sentiment = match sentiment_score {
        Some(avg) if avg > POSITIVE_THRESHOLD => LABEL_POSITIVE,
        Some(avg) if avg < NEGATIVE_THRESHOLD => LABEL_NEGATIVE,
        _ => LABEL_NEUTRAL,
    };

    MovieSentiment {
        movie_id,
        review_count: count,
        average_rating: Some(average_rating),
        overall_sentiment: overall_sentiment.to_string(),
        sentiment_score,
    }
}

/// Apply the text/year filters and the requested sort order.
fn select_films(mut films: Vec<Film>, query: &ListQuery) -> Vec<Film> {
    if let Some(q) = query.q.as_deref().filter(|q| !q.is_empty()) {
        let needle = q.to_lowercase();
        films.retain(|f| {
            let haystacks = [
                Some(f.title.as_str()),
                f.original_title.as_deref(),
                f.description.as_deref(),
            ];
            haystacks
                .into_iter()
                .flatten()
                .any(|h| h.to_lowercase().contains(&needle))
        });
    }

    if let Some(year) = query.year {
        films.retain(|f| f.year() == Some(year));
    }

    let (key, reverse) = parse_sort(query.sort.as_deref());
    match key {
        SortKey::Title => films.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        SortKey::Year => films.sort_by_key(|f| f.year().unwrap_or(0)),
        SortKey::Score => films.sort_by_key(Film::score),
    }
    if reverse {
        films.reverse();
    }

    films
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKey {
    Title,
    Year,
    Score,
}

fn parse_sort(sort: Option<&str>) -> (SortKey, bool) {
    let raw = sort.unwrap_or("title:asc");
    let (key, direction) = match raw.split_once(':') {
        Some((k, d)) => (k, d),
        None => (raw, "asc"),
    };

    let key = match key.to_lowercase().as_str() {
        "year" => SortKey::Year,
        "score" | "rating" => SortKey::Score,
        _ => SortKey::Title,
    };

    (key, direction.eq_ignore_ascii_case("desc"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film(id: &str, title: &str, year: &str, score: &str) -> Film {
        Film {
            id: id.to_string(),
            title: title.to_string(),
            release_date: Some(year.to_string()),
            rt_score: Some(score.to_string()),
            description: Some(format!("About {}", title)),
            ..Film::default()
        }
    }

    fn sample() -> Vec<Film> {
        vec![
            film("1", "Castle in the Sky", "1986", "95"),
            film("2", "My Neighbor Totoro", "1988", "93"),
            film("3", "Howl's Moving Castle", "2004", "87"),
        ]
    }

    #[test]
    fn text_filter_is_case_insensitive() {
        let query = ListQuery {
            q: Some("CASTLE".to_string()),
            ..ListQuery::default()
        };
        let out = select_films(sample(), &query);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn year_filter_matches_exactly() {
        let query = ListQuery {
            year: Some(2004),
            ..ListQuery::default()
        };
        let out = select_films(sample(), &query);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "3");
    }

    #[test]
    fn sorts_by_score_descending() {
        let query = ListQuery {
            sort: Some("score:desc".to_string()),
            ..ListQuery::default()
        };
        let out = select_films(sample(), &query);
        assert_eq!(out[0].id, "1");
        assert_eq!(out[2].id, "3");
    }

    #[test]
    fn unknown_sort_key_falls_back_to_title() {
        assert_eq!(parse_sort(Some("banana:desc")), (SortKey::Title, true));
        assert_eq!(parse_sort(None), (SortKey::Title, false));
        assert_eq!(parse_sort(Some("year")), (SortKey::Year, false));
    }

    #[test]
    fn zero_reviews_aggregate_to_a_defined_neutral_result() {
        let agg = aggregate_sentiment("m1".to_string(), &[]);
        assert_eq!(agg.review_count, 0);
        assert_eq!(agg.overall_sentiment, LABEL_NEUTRAL);
        assert_eq!(agg.sentiment_score, Some(0.0));
        assert_eq!(agg.average_rating, None);
    }

    #[test]
    fn aggregate_averages_only_present_scores() {
        let reviews = vec![
            ReviewDoc { rating: 5, sentiment_score: Some(0.8) },
            ReviewDoc { rating: 4, sentiment_score: None },
            ReviewDoc { rating: 1, sentiment_score: Some(0.4) },
        ];
        let agg = aggregate_sentiment("m1".to_string(), &reviews);
        assert_eq!(agg.review_count, 3);
        assert!((agg.sentiment_score.unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(agg.overall_sentiment, LABEL_POSITIVE);
        assert!((agg.average_rating.unwrap() - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_without_any_scores_is_neutral_with_null_score() {
        let reviews = vec![ReviewDoc { rating: 3, sentiment_score: None }];
        let agg = aggregate_sentiment("m1".to_string(), &reviews);
        assert_eq!(agg.sentiment_score, None);
        assert_eq!(agg.overall_sentiment, LABEL_NEUTRAL);
    }
}
