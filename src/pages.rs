use axum::{
    extract::{OriginalUri, Path, State},
    http::Uri,
    response::Html,
    Extension, Form,
};
use serde::Deserialize;
use tracing::info;

use crate::catalog::{Catalog, SearchKind};
use crate::config::{DEFAULT_LIMIT, LOWER_LIMIT};
use crate::lyrics::track_lyrics;
use crate::random::request_rng;
use crate::recommend::{featured_playlists, recommended_albums, recommended_artists};
use crate::related::related_artists;
use crate::session::{session_failure, Session, SessionRedirect};
use crate::spotify::SpotifyError;
use crate::types::Track;
use crate::views::{self, Chrome};
use crate::AppState;

/// Track lists page further than card grids.
pub const TRACKS_LIMIT: u32 = 50;

pub type PageResult = Result<Html<String>, SessionRedirect>;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistAlbumsParams {
    artist_id: String,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryParams {
    category_id: String,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: String,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    query: String,
}

fn catalog<'a>(state: &'a AppState, session: &'a Session) -> Catalog<'a> {
    Catalog::new(
        state.spotify.as_ref(),
        &session.access_token,
        &state.config.market,
    )
}

fn original_url(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

fn page_number(params: Option<Path<PageParams>>) -> Option<u32> {
    params.and_then(|Path(p)| p.page)
}

async fn chrome(catalog: &Catalog<'_>) -> Result<Chrome, SpotifyError> {
    let (profile, recent) =
        tokio::try_join!(catalog.profile(), catalog.recent_tracks(LOWER_LIMIT))?;
    Ok(Chrome { profile, recent })
}

fn render(title: &str, chrome: &Chrome, content: String) -> Html<String> {
    Html(views::layout(title, chrome, &content))
}

pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let mut albums_rng = request_rng();
    let mut playlists_rng = request_rng();
    let mut artists_rng = request_rng();

    let (chrome, albums, playlists, artists) = tokio::try_join!(
        chrome(&catalog),
        async {
            Ok::<_, SpotifyError>(recommended_albums(&catalog, &mut albums_rng, LOWER_LIMIT).await)
        },
        async {
            Ok::<_, SpotifyError>(
                featured_playlists(&catalog, &mut playlists_rng, None, LOWER_LIMIT).await,
            )
        },
        recommended_artists(&catalog, &mut artists_rng, LOWER_LIMIT),
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let content = [
        views::track_list("Recently played", &chrome.recent, None),
        views::album_cards("Recommended albums", &albums.items, Some("/albums")),
        views::playlist_cards("Featured playlists", &playlists.items, Some("/playlists")),
        views::artist_cards("Artists you might like", &artists.items, None),
    ]
    .concat();
    Ok(render("Home", &chrome, content))
}

pub async fn new_releases(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    params: Option<Path<PageParams>>,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let page = page_number(params);

    let (chrome, albums) = tokio::try_join!(
        chrome(&catalog),
        catalog.new_releases(page, DEFAULT_LIMIT)
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let content = views::album_cards("New releases", &albums.items, None) + &views::pager(&albums);
    Ok(render("New releases", &chrome, content))
}

pub async fn album_detail(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    Path(album_id): Path<String>,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let url = original_url(&uri);

    let (chrome, album) = tokio::try_join!(chrome(&catalog), catalog.album(&album_id))
        .map_err(|e| session_failure(&e, &url))?;

    let mut content = views::banner(
        album.album_type.as_deref().unwrap_or("album"),
        &album.name,
        &album.images,
        &[
            album
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            album.release_date.clone().unwrap_or_default(),
            format!("{} tracks", album.total_tracks),
        ],
        album.uri.as_deref(),
    );
    let tracks = album.tracks.as_ref().map(|t| t.items.as_slice()).unwrap_or_default();
    content.push_str(&views::track_list("Tracks", tracks, None));

    if let Some(artist) = album.artists.first() {
        let more = catalog
            .artist_albums(&artist.id, None, LOWER_LIMIT)
            .await
            .map_err(|e| session_failure(&e, &url))?;
        let others: Vec<_> = more.items.into_iter().filter(|a| a.id != album.id).collect();
        content.push_str(&views::album_cards(
            &format!("More by {}", artist.name),
            &others,
            Some(more.base_url.as_str()),
        ));
    }
    Ok(render(&album.name, &chrome, content))
}

pub async fn artist_detail(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    Path(artist_id): Path<String>,
) -> PageResult {
    let catalog = catalog(&state, &session);

    let (chrome, artist, albums, top_tracks, related) = tokio::try_join!(
        chrome(&catalog),
        catalog.artist(&artist_id),
        catalog.artist_albums(&artist_id, None, LOWER_LIMIT),
        catalog.artist_top_tracks(&artist_id),
        async { Ok::<_, SpotifyError>(related_artists(&catalog, &artist_id).await) },
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let followers = artist.followers.as_ref().map_or(0, |f| f.total);
    let content = [
        views::banner(
            "Artist",
            &artist.name,
            &artist.images,
            &[format!("{} followers", followers), artist.genres.join(", ")],
            None,
        ),
        views::track_list("Popular", &top_tracks, None),
        views::album_cards("Albums", &albums.items, Some(albums.base_url.as_str())),
        views::artist_cards("Fans also like", &related, None),
    ]
    .concat();
    Ok(render(&artist.name, &chrome, content))
}

pub async fn artist_albums(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    Path(params): Path<ArtistAlbumsParams>,
) -> PageResult {
    let catalog = catalog(&state, &session);

    let (chrome, artist, albums) = tokio::try_join!(
        chrome(&catalog),
        catalog.artist(&params.artist_id),
        catalog.artist_albums(&params.artist_id, params.page, DEFAULT_LIMIT),
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let title = format!("Albums by {}", artist.name);
    let content = views::album_cards(&title, &albums.items, None) + &views::pager(&albums);
    Ok(render(&title, &chrome, content))
}

pub async fn playlists(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    params: Option<Path<PageParams>>,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let page = page_number(params);
    let mut rng = request_rng();

    let (chrome, playlists) = tokio::try_join!(chrome(&catalog), async {
        Ok::<_, SpotifyError>(featured_playlists(&catalog, &mut rng, page, DEFAULT_LIMIT).await)
    })
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let content =
        views::playlist_cards("Featured playlists", &playlists.items, None) + &views::pager(&playlists);
    Ok(render("Playlists", &chrome, content))
}

pub async fn playlist_detail(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    Path(playlist_id): Path<String>,
) -> PageResult {
    let catalog = catalog(&state, &session);

    let (chrome, playlist) = tokio::try_join!(chrome(&catalog), catalog.playlist(&playlist_id))
        .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let owner = playlist
        .owner
        .as_ref()
        .and_then(|o| o.display_name.clone())
        .unwrap_or_default();
    let tracks: Vec<Track> = playlist
        .tracks
        .iter()
        .flat_map(|t| t.items.iter())
        .filter_map(|item| item.track.clone())
        .collect();
    let content = [
        views::banner(
            "Playlist",
            &playlist.name,
            &playlist.images,
            &[
                playlist.description.clone().unwrap_or_default(),
                owner,
                format!("{} tracks", playlist.track_count()),
            ],
            playlist.uri.as_deref(),
        ),
        views::track_list("Tracks", &tracks, None),
    ]
    .concat();
    Ok(render(&playlist.name, &chrome, content))
}

pub async fn explore(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    params: Option<Path<PageParams>>,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let page = page_number(params);

    let (chrome, categories) = tokio::try_join!(
        chrome(&catalog),
        catalog.categories(page, DEFAULT_LIMIT)
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let content = views::category_cards("Browse all", &categories.items) + &views::pager(&categories);
    Ok(render("Explore", &chrome, content))
}

pub async fn category(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    Path(params): Path<CategoryParams>,
) -> PageResult {
    let catalog = catalog(&state, &session);

    let (chrome, category, playlists) = tokio::try_join!(
        chrome(&catalog),
        catalog.category(&params.category_id),
        catalog.category_playlists(&params.category_id, params.page, DEFAULT_LIMIT),
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let content = views::banner("Category", &category.name, &category.icons, &[], None)
        + &views::playlist_cards("Playlists", &playlists.items, None)
        + &views::pager(&playlists);
    Ok(render(&category.name, &chrome, content))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
) -> PageResult {
    let catalog = catalog(&state, &session);

    let (chrome, top_artists, top_tracks, followed) = tokio::try_join!(
        chrome(&catalog),
        catalog.top_artists(None, LOWER_LIMIT),
        catalog.top_tracks(None, LOWER_LIMIT / 2),
        catalog.followed_artists(LOWER_LIMIT),
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let user = &chrome.profile;
    let name = user.display_name.clone().unwrap_or_else(|| user.id.clone());
    let content = [
        views::banner(
            "Profile",
            &name,
            &user.images,
            &[
                format!("{} followers", user.followers.as_ref().map_or(0, |f| f.total)),
                format!("{} following", followed.total),
            ],
            None,
        ),
        views::artist_cards("Top artists this month", &top_artists.items, Some("/profile/top/artists")),
        views::track_list("Top tracks this month", &top_tracks.items, Some("/profile/top/tracks")),
        views::artist_cards("Following", &followed.items, None),
    ]
    .concat();
    Ok(render(&name, &chrome, content))
}

pub async fn top_artists(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    params: Option<Path<PageParams>>,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let page = page_number(params);

    let (chrome, artists) = tokio::try_join!(
        chrome(&catalog),
        catalog.top_artists(page, DEFAULT_LIMIT)
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let content = views::artist_cards("Top artists", &artists.items, None) + &views::pager(&artists);
    Ok(render("Top artists", &chrome, content))
}

pub async fn top_tracks(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    params: Option<Path<PageParams>>,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let page = page_number(params);

    let (chrome, tracks) = tokio::try_join!(
        chrome(&catalog),
        catalog.top_tracks(page, TRACKS_LIMIT)
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let content = views::track_list("Top tracks", &tracks.items, None) + &views::pager(&tracks);
    Ok(render("Top tracks", &chrome, content))
}

pub async fn track_detail(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    Path(track_id): Path<String>,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let url = original_url(&uri);

    let (chrome, track) = tokio::try_join!(chrome(&catalog), catalog.track(&track_id))
        .map_err(|e| session_failure(&e, &url))?;

    let artist_ids: Vec<String> = track.artists.iter().map(|a| a.id.clone()).collect();
    let credits = track
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let main_artist = track.artists.first();

    let (artists, top_tracks, related, lyrics) = tokio::try_join!(
        catalog.several_artists(&artist_ids),
        async {
            match main_artist {
                Some(a) => catalog.artist_top_tracks(&a.id).await,
                None => Ok(Vec::new()),
            }
        },
        async {
            Ok::<_, SpotifyError>(match main_artist {
                Some(a) => related_artists(&catalog, &a.id).await,
                None => Vec::new(),
            })
        },
        async {
            Ok::<_, SpotifyError>(track_lyrics(state.lyrics.as_ref(), &track.name, &credits).await)
        },
    )
    .map_err(|e| session_failure(&e, &url))?;

    info!(
        "Track {} rendered with {} artists, lyrics found: {}",
        track.id,
        artists.len(),
        lyrics.found
    );

    let album = track.album.as_deref();
    let more_by = main_artist
        .map(|a| format!("Popular tracks by {}", a.name))
        .unwrap_or_else(|| "Popular tracks".to_string());
    let content = [
        views::banner(
            "Song",
            &track.name,
            album.map(|a| a.images.as_slice()).unwrap_or_default(),
            &[
                credits.clone(),
                album.map(|a| a.name.clone()).unwrap_or_default(),
                views::format_duration(track.duration_ms),
            ],
            None,
        ),
        views::lyrics_section(&lyrics),
        views::artist_cards("Artists", &artists, None),
        views::track_list(&more_by, &top_tracks, None),
        views::artist_cards("Fans also like", &related, None),
    ]
    .concat();
    Ok(render(&track.name, &chrome, content))
}

pub async fn search_submit(Form(form): Form<SearchForm>) -> SessionRedirect {
    let query = form.query.trim();
    if query.is_empty() {
        return SessionRedirect::to("/");
    }
    SessionRedirect::to(format!("/search/all/{}", urlencoding::encode(query)))
}

pub async fn search_all(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    Path(query): Path<String>,
) -> PageResult {
    let catalog = catalog(&state, &session);

    let (chrome, results) = tokio::try_join!(chrome(&catalog), catalog.search_all(&query))
        .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let encoded = urlencoding::encode(&query);
    let see_all = |kind: SearchKind| format!("/search/{}/{}", kind.plural(), encoded);
    let mut content = String::new();
    if let Some(albums) = &results.albums {
        content += &views::album_cards("Albums", &albums.items, Some(see_all(SearchKind::Album).as_str()));
    }
    if let Some(playlists) = &results.playlists {
        content += &views::playlist_cards(
            "Playlists",
            &playlists.items,
            Some(see_all(SearchKind::Playlist).as_str()),
        );
    }
    if let Some(artists) = &results.artists {
        content += &views::artist_cards("Artists", &artists.items, Some(see_all(SearchKind::Artist).as_str()));
    }
    if let Some(tracks) = &results.tracks {
        content += &views::track_list("Songs", &tracks.items, Some(see_all(SearchKind::Track).as_str()));
    }
    Ok(render(&format!("Search: {}", query), &chrome, content))
}

pub async fn search_albums(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    Path(params): Path<SearchParams>,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let (chrome, albums) = tokio::try_join!(
        chrome(&catalog),
        catalog.search_page(&params.query, SearchKind::Album, params.page, DEFAULT_LIMIT)
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let title = format!("Albums for \"{}\"", params.query);
    let content = views::album_cards(&title, &albums.items, None) + &views::pager(&albums);
    Ok(render(&title, &chrome, content))
}

pub async fn search_artists(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    Path(params): Path<SearchParams>,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let (chrome, artists) = tokio::try_join!(
        chrome(&catalog),
        catalog.search_page(&params.query, SearchKind::Artist, params.page, DEFAULT_LIMIT)
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let title = format!("Artists for \"{}\"", params.query);
    let content = views::artist_cards(&title, &artists.items, None) + &views::pager(&artists);
    Ok(render(&title, &chrome, content))
}

pub async fn search_playlists(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    Path(params): Path<SearchParams>,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let (chrome, playlists) = tokio::try_join!(
        chrome(&catalog),
        catalog.search_page(&params.query, SearchKind::Playlist, params.page, DEFAULT_LIMIT)
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let title = format!("Playlists for \"{}\"", params.query);
    let content = views::playlist_cards(&title, &playlists.items, None) + &views::pager(&playlists);
    Ok(render(&title, &chrome, content))
}

pub async fn search_tracks(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    Path(params): Path<SearchParams>,
) -> PageResult {
    let catalog = catalog(&state, &session);
    let (chrome, tracks) = tokio::try_join!(
        chrome(&catalog),
        catalog.search_page(&params.query, SearchKind::Track, params.page, TRACKS_LIMIT)
    )
    .map_err(|e| session_failure(&e, &original_url(&uri)))?;

    let title = format!("Songs for \"{}\"", params.query);
    let content = views::track_list(&title, &tracks.items, None) + &views::pager(&tracks);
    Ok(render(&title, &chrome, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::LyricsHit;
    use crate::testsupport::{test_state, test_state_with_lyrics, FakeLyrics, FakeSpotify};
    use axum::http::header;
    use axum::response::IntoResponse;
    use serde_json::json;

    fn session() -> Extension<Session> {
        Extension(Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        })
    }

    fn at(path: &'static str) -> OriginalUri {
        OriginalUri(Uri::from_static(path))
    }

    fn signed_in() -> FakeSpotify {
        FakeSpotify::new()
            .route("/me", json!({ "id": "u1", "display_name": "Listener" }))
            .route(
                "/me/player/recently-played",
                json!({ "items": [{
                    "track": {
                        "id": "t0",
                        "name": "Yesterday's Song",
                        "artists": [{ "id": "a1", "name": "Alpha" }],
                        "album": { "id": "al0", "name": "Old" }
                    }
                }]}),
            )
    }

    fn unauthorized() -> SpotifyError {
        SpotifyError::Status {
            status: 401,
            body: "The access token expired".to_string(),
        }
    }

    fn set_cookies(response: &axum::response::Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn expired_token_on_profile_resumes_through_refresh() {
        let fake = signed_in()
            .route("/me/following", json!({ "artists": { "items": [] } }))
            .fail("/me/top", unauthorized());
        let state = test_state(fake);

        let redirect = profile(State(state), session(), at("/profile"))
            .await
            .unwrap_err();
        let response = redirect.into_response();

        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/refresh_tokens?redirect_to=%2Fprofile"
        );
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("access_token=;"));
    }

    #[tokio::test]
    async fn other_upstream_failures_force_login() {
        let fake = signed_in().fail(
            "/albums/al1",
            SpotifyError::Status {
                status: 503,
                body: String::new(),
            },
        );
        let state = test_state(fake);

        let response = album_detail(
            State(state),
            session(),
            at("/albums/al1"),
            Path("al1".to_string()),
        )
        .await
        .unwrap_err()
        .into_response();

        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
        let cookies = set_cookies(&response);
        assert!(cookies.iter().any(|c| c.starts_with("access_token=;")));
        assert!(cookies.iter().any(|c| c.starts_with("refresh_token=;")));
    }

    #[tokio::test]
    async fn home_renders_recommendations_with_chrome() {
        let fake = signed_in().route(
            "/search",
            json!({
                "albums": { "items": [{ "id": "n1", "name": "Fresh Album", "release_date": "2024-02-02" }] },
                "playlists": { "items": [null, { "id": "p1", "name": "Mix", "tracks": { "total": 9 } }] },
                "artists": { "items": [{ "id": "b1", "name": "Bravo", "popularity": 50 }] }
            }),
        );
        let state = test_state(fake.clone());

        let Html(body) = home(State(state), session(), at("/")).await.unwrap();

        assert!(body.contains("Listener"));
        assert!(body.contains("Yesterday&#39;s Song"));
        assert!(body.contains("Fresh Album"));
        assert!(body.contains("Mix"));
        assert!(body.contains("Bravo"));
        assert!(fake.count("/search?q=artist%3A%22Alpha%22&type=album") == 1);
    }

    #[tokio::test]
    async fn home_swallows_album_and_playlist_search_failures() {
        let fake = signed_in()
            .route(
                "/search?q=Alpha&type=artist",
                json!({ "artists": { "items": [] } }),
            )
            .fail("/search", SpotifyError::Network("reset".to_string()));
        let state = test_state(fake);

        assert!(home(State(state), session(), at("/")).await.is_ok());
    }

    #[tokio::test]
    async fn home_for_a_listener_without_history_stays_signed_in() {
        let fake = FakeSpotify::new()
            .route("/me", json!({ "id": "u1" }))
            .route("/me/player/recently-played", json!({ "items": [] }))
            .fail(
                "/search",
                SpotifyError::Status {
                    status: 400,
                    body: "No search query".to_string(),
                },
            );
        let state = test_state(fake);

        let Html(body) = home(State(state), session(), at("/")).await.unwrap();
        assert!(body.contains("Artists you might like"));
    }

    #[tokio::test]
    async fn playlist_with_local_files_renders() {
        let fake = signed_in().route(
            "/playlists/p1",
            json!({
                "id": "p1",
                "name": "Mixed",
                "tracks": { "total": 2, "items": [
                    { "track": {
                        "id": null,
                        "name": "Demo take",
                        "album": { "id": null, "name": "Home recordings" },
                        "artists": [{ "id": null, "name": "Me" }]
                    }},
                    { "track": { "id": "t2", "name": "Song", "artists": [{ "id": "a1", "name": "A" }] } }
                ]}
            }),
        );
        let state = test_state(fake);

        let Html(body) = playlist_detail(
            State(state),
            session(),
            at("/playlists/p1"),
            Path("p1".to_string()),
        )
        .await
        .unwrap();

        assert!(body.contains("Demo take"));
        assert!(body.contains(r#"href="/tracks/t2""#));
        assert!(!body.contains(r#"href="/tracks/""#));
    }

    #[tokio::test]
    async fn new_releases_link_the_next_page() {
        let fake = signed_in().route(
            "/browse/new-releases",
            json!({ "albums": { "items": [{ "id": "n1", "name": "New" }], "total": 100 } }),
        );
        let state = test_state(fake.clone());

        let Html(body) = new_releases(
            State(state),
            session(),
            at("/albums/pages/2"),
            Some(Path(PageParams { page: Some(2) })),
        )
        .await
        .unwrap();

        assert!(fake
            .calls()
            .contains(&"/browse/new-releases?limit=28&offset=28".to_string()));
        assert!(body.contains(r#"href="/albums/pages/3""#));
        assert!(body.contains(r#"href="/albums""#));
    }

    #[tokio::test]
    async fn album_detail_shows_more_by_first_artist() {
        let fake = signed_in()
            .route(
                "/albums/al1",
                json!({
                    "id": "al1",
                    "name": "Record",
                    "artists": [{ "id": "a1", "name": "Alpha" }],
                    "tracks": { "items": [{ "id": "t1", "name": "Opener", "duration_ms": 61000 }] }
                }),
            )
            .route(
                "/artists/a1/albums",
                json!({ "items": [
                    { "id": "al1", "name": "Record" },
                    { "id": "al2", "name": "Sequel" }
                ], "total": 2 }),
            );
        let state = test_state(fake.clone());

        let Html(body) = album_detail(
            State(state),
            session(),
            at("/albums/al1"),
            Path("al1".to_string()),
        )
        .await
        .unwrap();

        assert!(body.contains("More by Alpha"));
        assert!(body.contains("Sequel"));
        assert!(body.contains("1:01"));
        assert_eq!(fake.count("/artists/a1/albums?include_groups=album,single&market=US&limit=12"), 1);
    }

    #[tokio::test]
    async fn track_detail_looks_up_lyrics_with_cleaned_names() {
        let fake = signed_in()
            .route(
                "/tracks/t1",
                json!({
                    "id": "t1",
                    "name": "Song (Live) - 2020 Remaster",
                    "artists": [
                        { "id": "a1", "name": "A" },
                        { "id": "b1", "name": "B & C" }
                    ]
                }),
            )
            .route(
                "/artists?ids=a1,b1",
                json!({ "artists": [
                    { "id": "a1", "name": "A" },
                    { "id": "b1", "name": "B & C" }
                ]}),
            )
            .route("/artists/a1", json!({ "id": "a1", "name": "A", "genres": [] }))
            .route("/artists/a1/top-tracks", json!({ "tracks": [] }));
        let lyrics = FakeLyrics::found(LyricsHit {
            title: "Song".to_string(),
            artist: "A".to_string(),
            url: None,
            lyrics: Some("first line\nsecond line".to_string()),
        });
        let state = test_state_with_lyrics(fake, lyrics.clone());

        let Html(body) = track_detail(
            State(state),
            session(),
            at("/tracks/t1"),
            Path("t1".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(lyrics.queries(), vec!["Song A".to_string()]);
        assert!(body.contains("first line"));
        assert!(!body.contains("second line"));
    }

    #[tokio::test]
    async fn search_pages_use_their_own_limits() {
        let fake = signed_in().route(
            "/search",
            json!({
                "tracks": { "items": [], "total": 0 },
                "albums": { "items": [], "total": 0 }
            }),
        );
        let state = test_state(fake.clone());

        search_tracks(
            State(state.clone()),
            session(),
            at("/search/tracks/lo-fi"),
            Path(SearchParams {
                query: "lo fi".to_string(),
                page: None,
            }),
        )
        .await
        .unwrap();
        search_albums(
            State(state),
            session(),
            at("/search/albums/lo-fi/pages/2"),
            Path(SearchParams {
                query: "lo fi".to_string(),
                page: Some(2),
            }),
        )
        .await
        .unwrap();

        let calls = fake.calls();
        assert!(calls.contains(&"/search?q=lo%20fi&type=track&limit=50&offset=0&market=US".to_string()));
        assert!(calls.contains(&"/search?q=lo%20fi&type=album&limit=28&offset=28&market=US".to_string()));
    }

    #[tokio::test]
    async fn search_form_redirects_to_all_results() {
        let response = search_submit(Form(SearchForm {
            query: " daft punk ".to_string(),
        }))
        .await
        .into_response();
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/search/all/daft%20punk"
        );

        let response = search_submit(Form(SearchForm {
            query: "   ".to_string(),
        }))
        .await
        .into_response();
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }
}
