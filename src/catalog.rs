use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::paging::{calculate_offset, Envelope};
use crate::spotify::{SpotifyApi, SpotifyError};
use crate::types::{
    Album, Artist, Category, PlayHistory, Playlist, Paging, SearchResults, Track, UserProfile,
};

/// Catalog reads on behalf of one signed-in request.
#[derive(Clone, Copy)]
pub struct Catalog<'a> {
    api: &'a dyn SpotifyApi,
    token: &'a str,
    market: &'a str,
}

/// Item types the search endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Album,
    Artist,
    Playlist,
    Track,
}

impl SearchKind {
    fn type_param(self) -> &'static str {
        match self {
            SearchKind::Album => "album",
            SearchKind::Artist => "artist",
            SearchKind::Playlist => "playlist",
            SearchKind::Track => "track",
        }
    }

    /// Key of the paging object in the search response, also the URL segment.
    pub fn plural(self) -> &'static str {
        match self {
            SearchKind::Album => "albums",
            SearchKind::Artist => "artists",
            SearchKind::Playlist => "playlists",
            SearchKind::Track => "tracks",
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, SpotifyError> {
    serde_json::from_value(value).map_err(|e| SpotifyError::Parse(format!("{}: {}", what, e)))
}

/// Pull `key` out of a wrapper object such as `{"albums": {...}}`.
fn decode_field<T: DeserializeOwned>(mut value: Value, key: &str) -> Result<T, SpotifyError> {
    let inner = value
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| SpotifyError::Parse(format!("missing `{}` in response", key)))?;
    decode(inner, key)
}

fn id_segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

impl<'a> Catalog<'a> {
    pub fn new(api: &'a dyn SpotifyApi, token: &'a str, market: &'a str) -> Self {
        Self { api, token, market }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SpotifyError> {
        let value = self.api.get(path, self.token).await?;
        decode(value, path)
    }

    async fn get_field<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<T, SpotifyError> {
        let value = self.api.get(path, self.token).await?;
        decode_field(value, key)
    }

    pub async fn profile(&self) -> Result<UserProfile, SpotifyError> {
        self.get("/me").await
    }

    pub async fn recently_played(&self, limit: u32) -> Result<Vec<PlayHistory>, SpotifyError> {
        let page: Paging<PlayHistory> = self
            .get(&format!("/me/player/recently-played?limit={}", limit))
            .await?;
        Ok(page.items)
    }

    /// Recently played tracks in play order, for the sidebar.
    pub async fn recent_tracks(&self, limit: u32) -> Result<Vec<Track>, SpotifyError> {
        Ok(self
            .recently_played(limit)
            .await?
            .into_iter()
            .map(|h| h.track)
            .collect())
    }

    pub async fn new_releases(
        &self,
        page: Option<u32>,
        limit: u32,
    ) -> Result<Envelope<Album>, SpotifyError> {
        let offset = calculate_offset(page, limit);
        let paging: Paging<Album> = self
            .get_field(
                &format!("/browse/new-releases?limit={}&offset={}", limit, offset),
                "albums",
            )
            .await?;
        Ok(Envelope::from_paging("/albums", page, limit, paging))
    }

    pub async fn album(&self, album_id: &str) -> Result<Album, SpotifyError> {
        self.get(&format!("/albums/{}?market={}", id_segment(album_id), self.market))
            .await
    }

    pub async fn artist(&self, artist_id: &str) -> Result<Artist, SpotifyError> {
        self.get(&format!("/artists/{}", id_segment(artist_id))).await
    }

    /// Batch profile lookup. Unknown ids come back as `null` and are dropped.
    pub async fn several_artists(&self, artist_ids: &[String]) -> Result<Vec<Artist>, SpotifyError> {
        if artist_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = artist_ids.iter().map(|id| id_segment(id)).collect();
        let artists: Vec<Option<Artist>> = self
            .get_field(&format!("/artists?ids={}", ids.join(",")), "artists")
            .await?;
        Ok(artists.into_iter().flatten().collect())
    }

    pub async fn artist_albums(
        &self,
        artist_id: &str,
        page: Option<u32>,
        limit: u32,
    ) -> Result<Envelope<Album>, SpotifyError> {
        let offset = calculate_offset(page, limit);
        let id = id_segment(artist_id);
        let paging: Paging<Album> = self
            .get(&format!(
                "/artists/{}/albums?include_groups=album,single&market={}&limit={}&offset={}",
                id, self.market, limit, offset
            ))
            .await?;
        Ok(Envelope::from_paging(
            &format!("/artists/{}/albums", id),
            page,
            limit,
            paging,
        ))
    }

    pub async fn track(&self, track_id: &str) -> Result<Track, SpotifyError> {
        self.get(&format!("/tracks/{}?market={}", id_segment(track_id), self.market))
            .await
    }

    pub async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<Track>, SpotifyError> {
        self.get_field(
            &format!(
                "/artists/{}/top-tracks?market={}",
                id_segment(artist_id),
                self.market
            ),
            "tracks",
        )
        .await
    }

    pub async fn playlist(&self, playlist_id: &str) -> Result<Playlist, SpotifyError> {
        self.get(&format!(
            "/playlists/{}?market={}",
            id_segment(playlist_id),
            self.market
        ))
        .await
    }

    pub async fn categories(
        &self,
        page: Option<u32>,
        limit: u32,
    ) -> Result<Envelope<Category>, SpotifyError> {
        let offset = calculate_offset(page, limit);
        let paging: Paging<Category> = self
            .get_field(
                &format!("/browse/categories?limit={}&offset={}", limit, offset),
                "categories",
            )
            .await?;
        Ok(Envelope::from_paging("/explore", page, limit, paging))
    }

    pub async fn category(&self, category_id: &str) -> Result<Category, SpotifyError> {
        self.get(&format!("/browse/categories/{}", id_segment(category_id)))
            .await
    }

    pub async fn category_playlists(
        &self,
        category_id: &str,
        page: Option<u32>,
        limit: u32,
    ) -> Result<Envelope<Playlist>, SpotifyError> {
        let offset = calculate_offset(page, limit);
        let id = id_segment(category_id);
        let paging: Paging<Playlist> = self
            .get_field(
                &format!(
                    "/browse/categories/{}/playlists?limit={}&offset={}",
                    id, limit, offset
                ),
                "playlists",
            )
            .await?;
        Ok(Envelope::from_paging(
            &format!("/explore/{}", id),
            page,
            limit,
            paging,
        ))
    }

    /// One raw search call. An empty query is still sent; the upstream
    /// decides what it means.
    pub async fn search<T: DeserializeOwned>(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u32,
        offset: u32,
    ) -> Result<Paging<T>, SpotifyError> {
        self.get_field(
            &format!(
                "/search?q={}&type={}&limit={}&offset={}&market={}",
                urlencoding::encode(query),
                kind.type_param(),
                limit,
                offset,
                self.market
            ),
            kind.plural(),
        )
        .await
    }

    pub async fn search_all(&self, query: &str) -> Result<SearchResults, SpotifyError> {
        self.get(&format!(
            "/search?q={}&type=album,playlist,artist,track&limit=12&market={}",
            urlencoding::encode(query),
            self.market
        ))
        .await
    }

    /// A search results page, linked under `/search/<kind>/<query>`.
    pub async fn search_page<T: DeserializeOwned>(
        &self,
        query: &str,
        kind: SearchKind,
        page: Option<u32>,
        limit: u32,
    ) -> Result<Envelope<T>, SpotifyError> {
        let offset = calculate_offset(page, limit);
        let paging = self.search(query, kind, limit, offset).await?;
        let base_url = format!("/search/{}/{}", kind.plural(), urlencoding::encode(query));
        Ok(Envelope::from_paging(&base_url, page, limit, paging))
    }

    pub async fn top_artists(
        &self,
        page: Option<u32>,
        limit: u32,
    ) -> Result<Envelope<Artist>, SpotifyError> {
        let offset = calculate_offset(page, limit);
        let paging: Paging<Artist> = self
            .get(&format!("/me/top/artists?limit={}&offset={}", limit, offset))
            .await?;
        Ok(Envelope::from_paging("/profile/top/artists", page, limit, paging))
    }

    pub async fn top_tracks(
        &self,
        page: Option<u32>,
        limit: u32,
    ) -> Result<Envelope<Track>, SpotifyError> {
        let offset = calculate_offset(page, limit);
        let paging: Paging<Track> = self
            .get(&format!("/me/top/tracks?limit={}&offset={}", limit, offset))
            .await?;
        Ok(Envelope::from_paging("/profile/top/tracks", page, limit, paging))
    }

    pub async fn followed_artists(&self, limit: u32) -> Result<Paging<Artist>, SpotifyError> {
        #[derive(Deserialize)]
        struct Followed {
            artists: Paging<Artist>,
        }
        let followed: Followed = self
            .get(&format!("/me/following?type=artist&limit={}", limit))
            .await?;
        Ok(followed.artists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::FakeSpotify;
    use serde_json::json;

    #[tokio::test]
    async fn new_releases_builds_envelope_from_page() {
        let fake = FakeSpotify::new().route(
            "/browse/new-releases",
            json!({ "albums": {
                "items": [{ "id": "al1", "name": "Fresh" }],
                "total": 100, "limit": 12, "offset": 24, "next": "https://upstream/next"
            }}),
        );
        let catalog = Catalog::new(&fake, "token", "US");

        let env = catalog.new_releases(Some(3), 12).await.unwrap();
        assert_eq!(fake.calls(), vec!["/browse/new-releases?limit=12&offset=24"]);
        assert_eq!(env.base_url, "/albums");
        assert_eq!(env.offset, 24);
        assert_eq!(env.items[0].name, "Fresh");
        assert_eq!(env.next.as_deref(), Some("/albums/pages/4"));
    }

    #[tokio::test]
    async fn search_page_encodes_query_in_request_and_links() {
        let fake = FakeSpotify::new().route(
            "/search",
            json!({ "artists": { "items": [], "total": 0 } }),
        );
        let catalog = Catalog::new(&fake, "token", "US");

        let env: Envelope<Artist> = catalog
            .search_page("daft punk", SearchKind::Artist, None, 28)
            .await
            .unwrap();
        assert_eq!(
            fake.calls(),
            vec!["/search?q=daft%20punk&type=artist&limit=28&offset=0&market=US"]
        );
        assert_eq!(env.base_url, "/search/artists/daft%20punk");
        assert!(env.next.is_none());
    }

    #[tokio::test]
    async fn several_artists_skips_unknown_ids_and_short_circuits_empty() {
        let fake = FakeSpotify::new().route(
            "/artists?ids=",
            json!({ "artists": [{ "id": "a1", "name": "A" }, null] }),
        );
        let catalog = Catalog::new(&fake, "token", "US");

        assert!(catalog.several_artists(&[]).await.unwrap().is_empty());
        assert!(fake.calls().is_empty());

        let artists = catalog
            .several_artists(&["a1".to_string(), "gone".to_string()])
            .await
            .unwrap();
        assert_eq!(artists.len(), 1);
        assert_eq!(fake.calls(), vec!["/artists?ids=a1,gone"]);
    }

    #[tokio::test]
    async fn upstream_errors_propagate_unchanged() {
        let fake = FakeSpotify::new().fail(
            "/me",
            SpotifyError::Status {
                status: 401,
                body: "expired".to_string(),
            },
        );
        let catalog = Catalog::new(&fake, "token", "US");
        let err = catalog.profile().await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn missing_wrapper_key_is_a_parse_error() {
        let fake = FakeSpotify::new().route("/browse/categories", json!({ "unexpected": {} }));
        let catalog = Catalog::new(&fake, "token", "US");
        let err = catalog.categories(None, 28).await.unwrap_err();
        assert!(matches!(err, SpotifyError::Parse(_)));
    }
}
