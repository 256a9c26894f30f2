//! Watch party server.
//!
//! Serves the movie catalog, video streaming and uploads over HTTP, and
//! synchronized playback rooms over WebSocket.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin watchparty-server
//! cargo run --bin watchparty-server -- --host 0.0.0.0 --port 3000
//! PORT=9000 WATCHPARTY_VIDEOS_DIR=/srv/videos cargo run --bin watchparty-server
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use watchparty_server::{
    config::{
        DEFAULT_QUEUE_CAPACITY, DEFAULT_ROOM_GRACE, DEFAULT_SWEEP_INTERVAL, DEFAULT_UPLOAD_LIMIT,
        DEFAULT_WRITE_DEADLINE, ServerConfig,
    },
    hub::DEFAULT_MAILBOX_CAPACITY,
    ui::Server,
};
use watchparty_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "watchparty-server")]
#[command(about = "Watch party server with synchronized playback rooms", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "WATCHPARTY_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Directory of uploaded and streamed videos
    #[arg(long, env = "WATCHPARTY_VIDEOS_DIR", default_value = "videos")]
    videos_dir: PathBuf,

    /// Directory of thumbnails (default.jpg is the fallback)
    #[arg(long, env = "WATCHPARTY_THUMBNAILS_DIR", default_value = "thumbnails")]
    thumbnails_dir: PathBuf,

    /// JSON file with the movie catalog; built-in samples when omitted
    #[arg(long, env = "WATCHPARTY_CATALOG")]
    catalog: Option<PathBuf>,

    /// Seconds an empty room is kept before it is evicted
    #[arg(long, env = "WATCHPARTY_ROOM_GRACE_SECS", default_value_t = DEFAULT_ROOM_GRACE.as_secs())]
    room_grace_secs: u64,

    /// Seconds between cleanup sweeps
    #[arg(long, env = "WATCHPARTY_SWEEP_INTERVAL_SECS", default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs())]
    sweep_interval_secs: u64,

    /// Outbound queue capacity per connection, in frames
    #[arg(long, env = "WATCHPARTY_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Mailbox capacity per room hub
    #[arg(long, env = "WATCHPARTY_MAILBOX_CAPACITY", default_value_t = DEFAULT_MAILBOX_CAPACITY)]
    mailbox_capacity: usize,

    /// Seconds a single WebSocket write may block before the session is closed
    #[arg(long, env = "WATCHPARTY_WRITE_DEADLINE_SECS", default_value_t = DEFAULT_WRITE_DEADLINE.as_secs())]
    write_deadline_secs: u64,

    /// Maximum upload size in bytes
    #[arg(long, env = "WATCHPARTY_UPLOAD_LIMIT", default_value_t = DEFAULT_UPLOAD_LIMIT)]
    upload_limit: usize,

    /// Re-encode uploaded videos to H.264/AAC
    #[arg(long, env = "WATCHPARTY_TRANSCODE_ON_UPLOAD")]
    transcode_on_upload: bool,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            videos_dir: args.videos_dir,
            thumbnails_dir: args.thumbnails_dir,
            catalog_file: args.catalog,
            room_grace: Duration::from_secs(args.room_grace_secs),
            sweep_interval: Duration::from_secs(args.sweep_interval_secs.max(1)),
            queue_capacity: args.queue_capacity,
            mailbox_capacity: args.mailbox_capacity,
            write_deadline: Duration::from_secs(args.write_deadline_secs.max(1)),
            upload_limit: args.upload_limit,
            transcode_on_upload: args.transcode_on_upload,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let host = args.host.clone();
    let port = args.port;

    // 1. Build configuration
    let config = ServerConfig::from(args);
    tracing::debug!("Configuration: {:?}", config);

    // 2. Wire repository, use cases and state
    let server = match Server::from_config(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to initialize server: {}", e);
            std::process::exit(1);
        }
    };

    // 3. Run the server
    if let Err(e) = server.run(host, port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
