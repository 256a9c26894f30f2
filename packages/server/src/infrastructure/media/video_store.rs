//! Video and thumbnail files on the local filesystem.

use std::{
    io::SeekFrom,
    path::{Path, PathBuf},
};

use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, Take},
};
use uuid::Uuid;

use crate::domain::{ByteRange, MediaError, MediaFileName};

/// File name served when a requested thumbnail does not exist.
pub const DEFAULT_THUMBNAIL: &str = "default.jpg";

/// Chunk size used when writing uploads to disk.
const COPY_BUF_SIZE: usize = 64 * 1024;

/// An opened video, positioned and limited to the bytes to send.
#[derive(Debug)]
pub struct VideoStream {
    pub reader: Take<File>,
    /// Total size of the file in bytes.
    pub size: u64,
    /// `Some` for a partial content response.
    pub range: Option<ByteRange>,
}

impl VideoStream {
    /// Number of bytes the reader yields.
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.size, |range| range.len())
    }
}

/// Media directories for uploaded videos and their thumbnails.
#[derive(Debug, Clone)]
pub struct LocalVideoStore {
    videos_dir: PathBuf,
    thumbnails_dir: PathBuf,
}

impl LocalVideoStore {
    pub fn new(videos_dir: impl Into<PathBuf>, thumbnails_dir: impl Into<PathBuf>) -> Self {
        Self {
            videos_dir: videos_dir.into(),
            thumbnails_dir: thumbnails_dir.into(),
        }
    }

    /// Create both directories if they are missing.
    pub async fn ensure_dirs(&self) -> Result<(), MediaError> {
        tokio::fs::create_dir_all(&self.videos_dir).await?;
        tokio::fs::create_dir_all(&self.thumbnails_dir).await?;
        Ok(())
    }

    pub fn video_path(&self, name: &MediaFileName) -> PathBuf {
        self.videos_dir.join(name.as_str())
    }

    pub fn thumbnail_path(&self, name: &MediaFileName) -> PathBuf {
        self.thumbnails_dir.join(name.as_str())
    }

    /// Where the thumbnail of an uploaded video is written: `<stem>.jpg`.
    pub fn thumbnail_path_for_video(&self, video: &MediaFileName) -> PathBuf {
        self.thumbnails_dir.join(format!("{}.jpg", video.stem()))
    }

    /// The requested thumbnail, or the default one when it does not exist.
    pub async fn thumbnail_or_default(&self, name: &MediaFileName) -> PathBuf {
        let path = self.thumbnail_path(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            path
        } else {
            tracing::debug!("Thumbnail {} not found, serving default", name);
            self.thumbnails_dir.join(DEFAULT_THUMBNAIL)
        }
    }

    /// Open a video for streaming, honoring an optional `Range` header.
    pub async fn open(
        &self,
        name: &MediaFileName,
        range_header: Option<&str>,
    ) -> Result<VideoStream, MediaError> {
        let path = self.video_path(name);
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MediaError::NotFound(name.as_str().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();

        let Some(header) = range_header else {
            return Ok(VideoStream {
                reader: file.take(size),
                size,
                range: None,
            });
        };

        let range = ByteRange::parse(header, size)?;
        file.seek(SeekFrom::Start(range.start)).await?;
        Ok(VideoStream {
            reader: file.take(range.len()),
            size,
            range: Some(range),
        })
    }

    /// Write an uploaded video, replacing any file of the same name.
    /// Returns the number of bytes written.
    ///
    /// The body goes to a hidden temporary file first and is renamed into
    /// place only after it has been read to the end, so an interrupted upload
    /// never becomes streamable.
    pub async fn save<R>(&self, name: &MediaFileName, mut reader: R) -> Result<u64, MediaError>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.video_path(name);
        let partial = self
            .videos_dir
            .join(format!(".{}.{}.part", name, Uuid::new_v4().simple()));

        let written = match write_file(&partial, &mut reader).await {
            Ok(written) => written,
            Err(e) => {
                discard(&partial).await;
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            discard(&partial).await;
            return Err(e.into());
        }

        tracing::info!("Saved video {} ({} bytes)", path.display(), written);
        Ok(written)
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    pub fn thumbnails_dir(&self) -> &Path {
        &self.thumbnails_dir
    }
}

/// Copy `reader` into a new file at `path`. Read failures are reported as
/// [`MediaError::Incomplete`], write failures as [`MediaError::Io`].
async fn write_file<R>(path: &Path, reader: &mut R) -> Result<u64, MediaError>
where
    R: AsyncRead + Unpin,
{
    let mut file = File::create(path).await?;
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut written = 0u64;
    loop {
        let n = reader.read(&mut buf).await.map_err(MediaError::Incomplete)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).await?;
        written += n as u64;
    }
    file.sync_all().await?;
    Ok(written)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Could not remove partial upload {}: {}", path.display(), e);
    }
}
