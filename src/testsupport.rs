//! In-memory stand-ins for the upstream services.

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::lyrics::{LyricsHit, LyricsSource};
use crate::random::RandomSource;
use crate::spotify::{SpotifyApi, SpotifyError, TokenResponse};
use crate::AppState;

type Route = (String, Result<Value, SpotifyError>);

/// Fake catalog: the longest registered prefix matching the request path
/// wins. Unmatched paths answer 404.
#[derive(Clone, Default)]
pub struct FakeSpotify {
    routes: Arc<Mutex<Vec<Route>>>,
    exchange: Arc<Mutex<Option<Result<TokenResponse, SpotifyError>>>>,
    refresh: Arc<Mutex<Option<Result<TokenResponse, SpotifyError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeSpotify {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, prefix: &str, body: Value) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((prefix.to_string(), Ok(body)));
        self
    }

    pub fn fail(self, prefix: &str, err: SpotifyError) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((prefix.to_string(), Err(err)));
        self
    }

    pub fn with_exchange(self, result: Result<TokenResponse, SpotifyError>) -> Self {
        *self.exchange.lock().unwrap() = Some(result);
        self
    }

    pub fn with_refresh(self, result: Result<TokenResponse, SpotifyError>) -> Self {
        *self.refresh.lock().unwrap() = Some(result);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl SpotifyApi for FakeSpotify {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SpotifyError> {
        self.calls.lock().unwrap().push(format!("exchange:{}", code));
        self.exchange
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(SpotifyError::Network("no exchange configured".to_string())))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, SpotifyError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("refresh:{}", refresh_token));
        self.refresh
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(SpotifyError::Network("no refresh configured".to_string())))
    }

    async fn get(&self, path: &str, _access_token: &str) -> Result<Value, SpotifyError> {
        self.calls.lock().unwrap().push(path.to_string());
        let routes = self.routes.lock().unwrap();
        routes
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| {
                Err(SpotifyError::Status {
                    status: 404,
                    body: format!("no fake route for {}", path),
                })
            })
    }
}

#[derive(Clone, Default)]
pub struct FakeLyrics {
    hit: Option<LyricsHit>,
    fail: bool,
    queries: Arc<Mutex<Vec<String>>>,
}

impl FakeLyrics {
    pub fn found(hit: LyricsHit) -> Self {
        Self {
            hit: Some(hit),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LyricsSource for FakeLyrics {
    async fn search(&self, query: &str) -> Result<Option<LyricsHit>, String> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err("lyrics service unavailable".to_string());
        }
        Ok(self.hit.clone())
    }
}

/// Deterministic random source cycling through fixed values.
pub struct Sequence {
    values: VecDeque<usize>,
}

impl Sequence {
    pub fn new(values: &[usize]) -> Self {
        Self {
            values: values.iter().copied().collect(),
        }
    }

    /// Never swaps: every Fisher–Yates step picks the current position.
    pub fn identity() -> Self {
        Self::new(&[])
    }
}

impl RandomSource for Sequence {
    fn index(&mut self, upper: usize) -> usize {
        match self.values.pop_front() {
            Some(v) => {
                self.values.push_back(v);
                v % upper
            }
            None => upper - 1,
        }
    }
}

pub fn test_state(spotify: FakeSpotify) -> AppState {
    test_state_with_lyrics(spotify, FakeLyrics::default())
}

pub fn test_state_with_lyrics(spotify: FakeSpotify, lyrics: FakeLyrics) -> AppState {
    AppState {
        spotify: Arc::new(spotify),
        lyrics: Arc::new(lyrics),
        config: Arc::new(Config::for_tests()),
    }
}

pub fn cookie_headers(cookie: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
    headers
}
