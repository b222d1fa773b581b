mod auth;
mod catalog;
mod config;
mod lyrics;
mod pages;
mod paging;
mod random;
mod recommend;
mod related;
mod session;
mod spotify;
#[cfg(test)]
mod testsupport;
mod types;
mod views;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use config::Config;
use lyrics::{LrclibClient, LyricsSource};
use spotify::{SpotifyApi, SpotifyClient};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub spotify: Arc<dyn SpotifyApi>,
    pub lyrics: Arc<dyn LyricsSource>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunedeck=info,tower_http=info".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n⚠️  {}", e);
            eprintln!("   Get credentials from: https://developer.spotify.com/dashboard\n");
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState {
        spotify: Arc::new(SpotifyClient::new(&config)),
        lyrics: Arc::new(LrclibClient::new(&config.lyrics_base_url)),
        config: Arc::new(config),
    };

    let app = router(state.clone())
        .fallback_service(ServeDir::new(&state.config.public_dir))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("0.0.0.0:{}", state.config.port);
    info!("Starting server on {}", addr);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}

/// Everything except static files. Signed-in pages sit behind the session gate.
fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(pages::home))
        .route("/albums", get(pages::new_releases))
        .route("/albums/pages/:page", get(pages::new_releases))
        .route("/albums/:album_id", get(pages::album_detail))
        .route("/artists/:artist_id", get(pages::artist_detail))
        .route("/artists/:artist_id/albums", get(pages::artist_albums))
        .route("/artists/:artist_id/albums/pages/:page", get(pages::artist_albums))
        .route("/playlists", get(pages::playlists))
        .route("/playlists/pages/:page", get(pages::playlists))
        .route("/playlists/:playlist_id", get(pages::playlist_detail))
        .route("/explore", get(pages::explore))
        .route("/explore/pages/:page", get(pages::explore))
        .route("/explore/:category_id", get(pages::category))
        .route("/explore/:category_id/pages/:page", get(pages::category))
        .route("/profile", get(pages::profile))
        .route("/profile/top/artists", get(pages::top_artists))
        .route("/profile/top/artists/pages/:page", get(pages::top_artists))
        .route("/profile/top/tracks", get(pages::top_tracks))
        .route("/profile/top/tracks/pages/:page", get(pages::top_tracks))
        .route("/tracks/:track_id", get(pages::track_detail))
        .route("/search", post(pages::search_submit))
        .route("/search/all/:query", get(pages::search_all))
        .route("/search/albums/:query", get(pages::search_albums))
        .route("/search/albums/:query/pages/:page", get(pages::search_albums))
        .route("/search/artists/:query", get(pages::search_artists))
        .route("/search/artists/:query/pages/:page", get(pages::search_artists))
        .route("/search/playlists/:query", get(pages::search_playlists))
        .route("/search/playlists/:query/pages/:page", get(pages::search_playlists))
        .route("/search/tracks/:query", get(pages::search_tracks))
        .route("/search/tracks/:query/pages/:page", get(pages::search_tracks))
        .route("/api/token", get(auth::access_token))
        .route_layer(middleware::from_fn(session::require_session));

    let public = Router::new()
        .route("/health", get(health_handler))
        .route("/login", get(auth::login))
        .route("/logout", get(auth::logout))
        .route("/auth", get(auth::authorize))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/refresh_tokens", get(auth::refresh_tokens));

    protected.merge(public).with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}
