//! Interfaces of the media collaborators: movie catalog and transcoding tool.

use std::path::Path;

use async_trait::async_trait;

use super::{ContentId, Movie, TranscodeError};

/// Read-only lookup of watchable movies.
pub trait MovieCatalog: Send + Sync {
    fn list(&self) -> Vec<Movie>;

    fn get(&self, id: &ContentId) -> Option<Movie>;
}

/// External transcoding tool.
///
/// Every operation is best-effort from the caller's point of view: failures
/// are reported, never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Extract one still frame at `offset` (`HH:MM:SS`), scaled to 320px wide.
    async fn generate_thumbnail(
        &self,
        input: &Path,
        output: &Path,
        offset: &str,
    ) -> Result<(), TranscodeError>;

    /// Re-encode to H.264/AAC with fast-start for progressive download.
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;

    /// Duration of the media file in seconds.
    async fn probe_duration(&self, input: &Path) -> Result<f64, TranscodeError>;
}
