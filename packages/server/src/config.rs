//! Server configuration.

use std::{path::PathBuf, time::Duration};

use crate::hub::DEFAULT_MAILBOX_CAPACITY;

/// Default grace window before an empty room is evicted.
pub const DEFAULT_ROOM_GRACE: Duration = Duration::from_secs(300);

/// Default interval between cleanup sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Default capacity of each session's outbound queue, in frames.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default time a single WebSocket write may take before the session is closed.
pub const DEFAULT_WRITE_DEADLINE: Duration = Duration::from_secs(10);

/// Default upload body limit: 200 MiB.
pub const DEFAULT_UPLOAD_LIMIT: usize = 200 << 20;

/// Runtime settings of the watch party server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Where uploaded videos are stored and streamed from
    pub videos_dir: PathBuf,
    /// Where thumbnails (including `default.jpg`) are served from
    pub thumbnails_dir: PathBuf,
    /// JSON movie catalog; the built-in samples are used when absent
    pub catalog_file: Option<PathBuf>,
    pub room_grace: Duration,
    pub sweep_interval: Duration,
    pub queue_capacity: usize,
    pub mailbox_capacity: usize,
    /// A session whose socket accepts no write for this long is closed
    pub write_deadline: Duration,
    pub upload_limit: usize,
    /// Also re-encode uploads to H.264/AAC
    pub transcode_on_upload: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            videos_dir: PathBuf::from("videos"),
            thumbnails_dir: PathBuf::from("thumbnails"),
            catalog_file: None,
            room_grace: DEFAULT_ROOM_GRACE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            write_deadline: DEFAULT_WRITE_DEADLINE,
            upload_limit: DEFAULT_UPLOAD_LIMIT,
            transcode_on_upload: false,
        }
    }
}
