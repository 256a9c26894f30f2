//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use watchparty_shared::time::{Clock, SystemClock};

use crate::{
    config::ServerConfig,
    domain::{MediaError, MovieCatalog, Timestamp, Transcoder},
    infrastructure::{
        media::{FfmpegTranscoder, LocalVideoStore, StaticMovieCatalog, catalog::CatalogError},
        repository::InMemoryRoomRepository,
    },
    usecase::{
        CleanupRoomsUseCase, ConnectParticipantUseCase, CreateRoomUseCase,
        DisconnectParticipantUseCase, GetRoomsUseCase, ProcessUploadUseCase, RoomSweeper,
        SendMessageUseCase,
    },
};

use super::{
    handler::{
        create_room, get_movie, get_movies, get_room_detail, get_rooms, get_thumbnail,
        health_check, stream_video, upload_video, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Startup failures
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to prepare media directories: {0}")]
    Media(#[from] MediaError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Watch party server
///
/// Owns the wired application state and the room sweeper; the sweeper runs
/// for exactly as long as the server serves requests.
///
/// # Example
///
/// ```ignore
/// let server = Server::from_config(ServerConfig::default()).await?;
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    sweeper: RoomSweeper,
    upload_limit: usize,
}

impl Server {
    /// Create a new Server instance from already-built parts.
    pub fn new(state: Arc<AppState>, sweeper: RoomSweeper, upload_limit: usize) -> Self {
        Self {
            state,
            sweeper,
            upload_limit,
        }
    }

    /// Wire every dependency from a configuration, using the system clock
    /// and the `ffmpeg` tools on `PATH`.
    pub async fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        Self::with_collaborators(
            config,
            Arc::new(SystemClock),
            Arc::new(FfmpegTranscoder::default()),
        )
        .await
    }

    /// Wire every dependency from a configuration with the given clock and
    /// transcoder.
    pub async fn with_collaborators(
        config: ServerConfig,
        clock: Arc<dyn Clock>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Result<Self, ServerError> {
        // Initialize dependencies in order:
        // 1. Media store and catalog
        // 2. Repository
        // 3. UseCases
        // 4. AppState and sweeper

        // 1. Media store and catalog
        let video_store = LocalVideoStore::new(&config.videos_dir, &config.thumbnails_dir);
        video_store.ensure_dirs().await?;
        let now = Timestamp::new(clock.now_millis());
        let catalog: Arc<dyn MovieCatalog> = match &config.catalog_file {
            Some(path) => Arc::new(StaticMovieCatalog::from_file(path, now).await?),
            None => Arc::new(StaticMovieCatalog::with_samples(now)),
        };

        // 2. Create Repository (in-memory room registry)
        let repository = Arc::new(InMemoryRoomRepository::new());

        // 3. Create UseCases
        let create_room_usecase = Arc::new(CreateRoomUseCase::new(
            repository.clone(),
            clock.clone(),
            config.mailbox_capacity,
        ));
        let get_rooms_usecase = Arc::new(GetRoomsUseCase::new(repository.clone()));
        let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
            repository.clone(),
            clock.clone(),
            config.queue_capacity,
        ));
        let disconnect_participant_usecase = Arc::new(DisconnectParticipantUseCase::new(
            repository.clone(),
            clock.clone(),
        ));
        let send_message_usecase = Arc::new(SendMessageUseCase::new(clock.clone()));
        let process_upload_usecase = Arc::new(ProcessUploadUseCase::new(
            video_store.clone(),
            transcoder,
            config.transcode_on_upload,
        ));
        let cleanup_rooms_usecase = Arc::new(CleanupRoomsUseCase::new(
            repository,
            clock.clone(),
            config.room_grace,
        ));

        // 4. AppState and sweeper
        let state = Arc::new(AppState {
            create_room_usecase,
            get_rooms_usecase,
            connect_participant_usecase,
            disconnect_participant_usecase,
            send_message_usecase,
            process_upload_usecase,
            catalog,
            video_store,
            clock,
            write_deadline: config.write_deadline,
        });
        let sweeper = RoomSweeper::new(cleanup_rooms_usecase, config.sweep_interval);

        Ok(Self::new(state, sweeper, config.upload_limit))
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/health", get(health_check))
            .route("/movies", get(get_movies))
            .route("/movies/{id}", get(get_movie))
            .route(
                "/upload",
                post(upload_video).layer(DefaultBodyLimit::max(self.upload_limit)),
            )
            .route("/videos/{filename}", get(stream_video))
            .route("/thumbnails/{filename}", get(get_thumbnail))
            .route("/rooms", post(create_room).get(get_rooms))
            .route("/rooms/{id}", get(get_room_detail))
            // WebSocket エンドポイント（/ws は互換用の別名）
            .route("/rooms/{id}/connect", get(websocket_handler))
            .route("/rooms/{id}/ws", get(websocket_handler));

        Router::new()
            .nest("/api", api)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl+C or SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), ServerError> {
        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Watch party server listening on {}", listener.local_addr()?);
        tracing::info!("Video streaming: http://{}/api/videos/", bind_addr);
        tracing::info!("WebSocket: ws://{}/api/rooms/{{roomId}}/connect", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        // The sweeper stops together with the server.
        let token = CancellationToken::new();
        let sweeper = self.sweeper.spawn(token.clone());

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        token.cancel();
        if let Err(e) = sweeper.await {
            tracing::error!("Room sweeper task failed: {}", e);
        }
        tracing::info!("Server shutdown complete");

        result.map_err(ServerError::from)
    }
}
