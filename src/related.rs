//! Related artists, assembled from genre searches and top-track credits.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::catalog::{Catalog, SearchKind};
use crate::types::Artist;

pub const MAX_RELATED: usize = 20;
const MAX_GENRE_SEARCHES: usize = 3;
const GENRE_SEARCH_LIMIT: u32 = 10;
const MAX_COLLABORATOR_LOOKUPS: usize = 5;

struct Candidate {
    artist: Artist,
    score: usize,
    collaborator: bool,
}

/// Candidates keyed by id, in insertion order.
#[derive(Default)]
struct Pool {
    candidates: Vec<Candidate>,
    index: HashMap<String, usize>,
}

impl Pool {
    fn len(&self) -> usize {
        self.candidates.len()
    }

    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn add(&mut self, artist: Artist, score: usize, collaborator: bool) {
        if let Some(&i) = self.index.get(&artist.id) {
            let existing = &mut self.candidates[i];
            existing.score = existing.score.max(score);
            existing.collaborator |= collaborator;
            return;
        }
        self.index.insert(artist.id.clone(), self.candidates.len());
        self.candidates.push(Candidate {
            artist,
            score,
            collaborator,
        });
    }

    fn flag_collaborator(&mut self, id: &str) {
        if let Some(&i) = self.index.get(id) {
            self.candidates[i].collaborator = true;
        }
    }

    /// Collaborators first, then genre overlap, then popularity.
    fn ranked(mut self) -> Vec<Artist> {
        self.candidates.sort_by(|a, b| {
            b.collaborator
                .cmp(&a.collaborator)
                .then(b.score.cmp(&a.score))
                .then(b.artist.popularity.cmp(&a.artist.popularity))
        });
        self.candidates
            .into_iter()
            .take(MAX_RELATED)
            .map(|c| c.artist)
            .collect()
    }
}

/// Number of genres the two artists share.
pub fn genre_overlap(target: &[String], candidate: &[String]) -> usize {
    candidate.iter().filter(|g| target.contains(g)).count()
}

fn genre_query(genres: &[&String]) -> String {
    genres
        .iter()
        .map(|g| format!("genre:\"{}\"", g))
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn related_artists(catalog: &Catalog<'_>, artist_id: &str) -> Vec<Artist> {
    let target = match catalog.artist(artist_id).await {
        Ok(artist) => artist,
        Err(e) => {
            warn!("Related artists unavailable for {}: {}", artist_id, e);
            return Vec::new();
        }
    };

    let mut pool = Pool::default();
    let admit = |pool: &mut Pool, artists: Vec<Artist>, collaborator: bool| {
        for artist in artists {
            if artist.id == target.id || artist.id.is_empty() {
                continue;
            }
            // Collaborators looked up by id rank on the flag alone
            let score = if collaborator {
                0
            } else {
                genre_overlap(&target.genres, &artist.genres)
            };
            pool.add(artist, score, collaborator);
        }
    };

    for genre in target.genres.iter().take(MAX_GENRE_SEARCHES) {
        let query = genre_query(&[genre]);
        match catalog
            .search::<Artist>(&query, SearchKind::Artist, GENRE_SEARCH_LIMIT, 0)
            .await
        {
            Ok(page) => admit(&mut pool, page.items, false),
            Err(e) => warn!("Genre search {:?} failed: {}", query, e),
        }
    }

    let mut collaborators: Vec<String> = Vec::new();
    match catalog.artist_top_tracks(&target.id).await {
        Ok(tracks) => {
            for artist in tracks.iter().flat_map(|t| t.artists.iter()) {
                if artist.id != target.id
                    && !artist.id.is_empty()
                    && !collaborators.contains(&artist.id)
                {
                    collaborators.push(artist.id.clone());
                }
            }
        }
        Err(e) => warn!("Top tracks for {} unavailable: {}", target.id, e),
    }
    for id in &collaborators {
        pool.flag_collaborator(id);
    }

    if pool.len() < MAX_RELATED && target.genres.len() >= 2 {
        let pair: Vec<&String> = target.genres.iter().take(2).collect();
        let query = genre_query(&pair);
        match catalog
            .search::<Artist>(&query, SearchKind::Artist, GENRE_SEARCH_LIMIT, 0)
            .await
        {
            Ok(page) => admit(&mut pool, page.items, false),
            Err(e) => warn!("Combined genre search {:?} failed: {}", query, e),
        }
    }

    let missing: Vec<String> = collaborators
        .into_iter()
        .filter(|id| !pool.contains(id))
        .take(MAX_COLLABORATOR_LOOKUPS)
        .collect();
    if !missing.is_empty() {
        match catalog.several_artists(&missing).await {
            Ok(artists) => admit(&mut pool, artists, true),
            Err(e) => warn!("Collaborator lookup failed: {}", e),
        }
    }

    debug!("{} related candidates for {}", pool.len(), target.id);
    pool.ranked()
}
