//! Static movie catalog.
//!
//! The catalog is fixed at startup: either the built-in sample list or the
//! contents of a JSON file holding an array of movie entries.

use std::path::Path;

use thiserror::Error;

use crate::{
    domain::{ContentId, Movie, MovieCatalog, Timestamp, ValueObjectError},
    infrastructure::dto::http::MovieDto,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid catalog entry: {0}")]
    InvalidEntry(#[from] ValueObjectError),
}

/// In-memory catalog in declaration order.
#[derive(Debug, Clone)]
pub struct StaticMovieCatalog {
    movies: Vec<Movie>,
}

impl StaticMovieCatalog {
    pub fn new(movies: Vec<Movie>) -> Self {
        Self { movies }
    }

    /// The two sample entries served when no catalog file is configured.
    pub fn with_samples(now: Timestamp) -> Self {
        let sample = |id: &str, title: &str, description: &str, duration: u32| MovieDto {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            thumbnail: format!("/api/thumbnails/sample{id}.jpg"),
            video_url: format!("/api/videos/sample{id}.mp4"),
            duration,
            created_at: None,
        };
        let movies = [
            sample("1", "Sample Movie 1", "This is a sample movie description", 7200),
            sample("2", "Sample Movie 2", "Another sample movie", 5400),
        ]
        .into_iter()
        .filter_map(|dto| dto.into_movie(now).ok())
        .collect();
        Self::new(movies)
    }

    /// Load a JSON array of movie entries.
    pub async fn from_file(path: &Path, now: Timestamp) -> Result<Self, CatalogError> {
        let contents = tokio::fs::read_to_string(path).await?;
        Self::from_json(&contents, now)
    }

    fn from_json(contents: &str, now: Timestamp) -> Result<Self, CatalogError> {
        let entries: Vec<MovieDto> = serde_json::from_str(contents)?;
        let movies = entries
            .into_iter()
            .map(|dto| dto.into_movie(now))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!("Loaded {} movie(s) from catalog file", movies.len());
        Ok(Self::new(movies))
    }
}

impl MovieCatalog for StaticMovieCatalog {
    fn list(&self) -> Vec<Movie> {
        self.movies.clone()
    }

    fn get(&self, id: &ContentId) -> Option<Movie> {
        self.movies.iter().find(|movie| &movie.id == id).cloned()
    }
}
