use std::collections::HashSet;
use time::{Date, Month};
use tracing::{info, warn};

use crate::catalog::{Catalog, SearchKind};
use crate::paging::{paginate, Envelope};
use crate::random::{pick, sample, shuffle, RandomSource};
use crate::spotify::SpotifyError;
use crate::types::{Album, Artist, PlayHistory, Playlist};

const MAX_SEED_ARTISTS: usize = 5;
const PER_ARTIST_LIMIT: u32 = 10;
const PLAYLIST_SEARCH_LIMIT: u32 = 20;
const PLAYLIST_QUERY_ARTISTS: usize = 3;
/// Candidate pool size relative to the requested count.
const POOL_FACTOR: usize = 3;

pub const MOODS: [&str; 6] = ["chill", "workout", "party", "focus", "relax", "energy"];
pub const GENRES: [&str; 6] = ["pop", "rock", "hip hop", "electronic", "indie", "jazz"];

/// What recent plays say about the listener.
#[derive(Debug, Default, PartialEq)]
pub struct RecentSummary {
    /// Artist names in first-seen order, one per artist id.
    pub artist_names: Vec<String>,
    pub artist_ids: HashSet<String>,
    pub album_ids: HashSet<String>,
}

pub fn summarize_recent(history: &[PlayHistory]) -> RecentSummary {
    let mut summary = RecentSummary::default();
    for entry in history {
        for artist in &entry.track.artists {
            if summary.artist_ids.insert(artist.id.clone()) {
                summary.artist_names.push(artist.name.clone());
            }
        }
        if let Some(album) = &entry.track.album {
            if !album.id.is_empty() {
                summary.album_ids.insert(album.id.clone());
            }
        }
    }
    summary
}

/// One query per seed artist; with no seeds the single query is empty.
fn seed_queries(names: &[String], render: impl Fn(&str) -> String) -> Vec<String> {
    if names.is_empty() {
        return vec![String::new()];
    }
    names
        .iter()
        .take(MAX_SEED_ARTISTS)
        .map(|n| render(n))
        .collect()
}

/// Release date as a sortable date; partial dates ("1999", "1999-07") pad to the first day.
pub fn release_date(album: &Album) -> Option<Date> {
    let raw = album.release_date.as_deref()?;
    let mut parts = raw.split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next().map_or(Some(1), |m| m.parse().ok())?;
    let day: u8 = parts.next().map_or(Some(1), |d| d.parse().ok())?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// Newest first; undated albums last. Stable, so ties keep upstream order.
pub fn sort_by_release_date(albums: &mut [Album]) {
    albums.sort_by(|a, b| release_date(b).cmp(&release_date(a)));
}

/// Most tracks first. Stable.
pub fn sort_by_track_count(playlists: &mut [Playlist]) {
    playlists.sort_by(|a, b| b.track_count().cmp(&a.track_count()));
}

/// Most popular first. Stable.
pub fn sort_by_popularity(artists: &mut [Artist]) {
    artists.sort_by(|a, b| b.popularity.cmp(&a.popularity));
}

/// Albums by the artists the listener has been playing, minus the albums
/// they already played from.
pub async fn recommended_albums(
    catalog: &Catalog<'_>,
    rng: &mut dyn RandomSource,
    limit: u32,
) -> Envelope<Album> {
    let history = match catalog.recently_played(limit).await {
        Ok(history) => history,
        Err(e) => {
            warn!("Recommended albums unavailable: {}", e);
            return Envelope::empty("/albums", None, limit);
        }
    };
    let summary = summarize_recent(&history);
    let queries = seed_queries(&summary.artist_names, |name| format!("artist:\"{}\"", name));
    let pool_size = limit as usize * POOL_FACTOR;

    let mut merged: Vec<Album> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for query in &queries {
        if merged.len() >= pool_size {
            break;
        }
        match catalog
            .search::<Album>(query, SearchKind::Album, PER_ARTIST_LIMIT, 0)
            .await
        {
            Ok(page) => {
                for album in page.items {
                    if summary.album_ids.contains(&album.id) || !seen.insert(album.id.clone()) {
                        continue;
                    }
                    merged.push(album);
                }
            }
            Err(e) => warn!("Album search failed for query {:?}: {}", query, e),
        }
    }

    sort_by_release_date(&mut merged);
    shuffle(&mut merged, rng);
    merged.truncate(limit as usize);
    info!("Recommended {} albums from {} seed queries", merged.len(), queries.len());

    let total = merged.len() as u32;
    Envelope::new("/albums", None, limit, merged, total)
}

/// Playlists matching the listener's artists plus a random mood and genre.
pub async fn featured_playlists(
    catalog: &Catalog<'_>,
    rng: &mut dyn RandomSource,
    page: Option<u32>,
    limit: u32,
) -> Envelope<Playlist> {
    let history = match catalog.recently_played(limit).await {
        Ok(history) => history,
        Err(e) => {
            warn!("Featured playlists unavailable: {}", e);
            return Envelope::empty("/playlists", page, limit);
        }
    };
    let summary = summarize_recent(&history);

    let queries = [
        sample(&summary.artist_names, PLAYLIST_QUERY_ARTISTS, rng).join(" "),
        pick(&MOODS, rng).copied().unwrap_or_default().to_string(),
        pick(&GENRES, rng).copied().unwrap_or_default().to_string(),
    ];

    let (first, second, third) = tokio::join!(
        catalog.search::<Playlist>(&queries[0], SearchKind::Playlist, PLAYLIST_SEARCH_LIMIT, 0),
        catalog.search::<Playlist>(&queries[1], SearchKind::Playlist, PLAYLIST_SEARCH_LIMIT, 0),
        catalog.search::<Playlist>(&queries[2], SearchKind::Playlist, PLAYLIST_SEARCH_LIMIT, 0),
    );

    let mut merged: Vec<Playlist> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for (query, result) in queries.iter().zip([first, second, third]) {
        match result {
            Ok(page) => {
                for playlist in page.items {
                    if playlist.track_count() == 0 || !seen.insert(playlist.id.clone()) {
                        continue;
                    }
                    merged.push(playlist);
                }
            }
            Err(e) => warn!("Playlist search failed for query {:?}: {}", query, e),
        }
    }

    sort_by_track_count(&mut merged);
    merged.truncate(limit as usize * POOL_FACTOR);
    shuffle(&mut merged, rng);

    paginate("/playlists", page, limit, merged)
}

/// Artists surfaced by searching for the listener's recent artists,
/// excluding those artists themselves. With no history there is nothing to
/// search for, and the shelf is empty.
pub async fn recommended_artists(
    catalog: &Catalog<'_>,
    rng: &mut dyn RandomSource,
    limit: u32,
) -> Result<Envelope<Artist>, SpotifyError> {
    let history = catalog.recently_played(limit).await?;
    let summary = summarize_recent(&history);
    if summary.artist_names.is_empty() {
        info!("No recent artists, skipping artist recommendations");
        return Ok(Envelope::empty("/", None, limit));
    }
    let queries = seed_queries(&summary.artist_names, |name| name.to_string());
    let pool_size = limit as usize * POOL_FACTOR;

    let mut merged: Vec<Artist> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for query in &queries {
        if merged.len() >= pool_size {
            break;
        }
        let page = catalog
            .search::<Artist>(query, SearchKind::Artist, PER_ARTIST_LIMIT, 0)
            .await?;
        for artist in page.items {
            if summary.artist_ids.contains(&artist.id) || !seen.insert(artist.id.clone()) {
                continue;
            }
            merged.push(artist);
        }
    }

    sort_by_popularity(&mut merged);
    shuffle(&mut merged, rng);
    merged.truncate(limit as usize);

    let total = merged.len() as u32;
    Ok(Envelope::new("/", None, limit, merged, total))
}
