use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{info, warn};

const SOURCE: &str = "lrclib";
const MAX_SHOWN_LINES: usize = 16;
const MIN_LYRICS_CHARS: usize = 4;

static PARENTHESES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*?\)").expect("Invalid parentheses regex"));
static BRACKETS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("Invalid brackets regex"));
static REMASTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*-\s*.*?remaster.*$").expect("Invalid remaster regex"));
static FEATURING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\b(feat|ft)\..*$").expect("Invalid featuring regex"));
static SECTION_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]]*\]$").expect("Invalid section header regex"));
static LRC_TIMESTAMP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d{1,2}:\d{2}(?:\.\d{1,3})?\]").expect("Invalid LRC regex"));

pub fn clean_track_name(name: &str) -> String {
    let name = PARENTHESES_REGEX.replace_all(name, "");
    let name = BRACKETS_REGEX.replace_all(&name, "");
    let name = REMASTER_REGEX.replace(&name, "");
    let name = FEATURING_REGEX.replace(&name, "");
    name.trim().to_string()
}

/// First credited name from strings like "A, B & C".
pub fn primary_artist(artist: &str) -> String {
    artist
        .split(',')
        .next()
        .unwrap_or_default()
        .split('&')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Drop section headers and timestamps, trim lines, collapse blank runs.
pub fn clean_lyrics_text(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.lines() {
        let line = LRC_TIMESTAMP_REGEX.replace_all(line, "");
        let line = line.trim();
        if SECTION_HEADER_REGEX.is_match(line) {
            continue;
        }
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line.to_string());
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartialLyrics {
    pub lyrics: String,
    pub is_partial: bool,
    pub total_lines: usize,
    pub shown_lines: usize,
}

/// Half the lines (rounded up) or 16, whichever is smaller.
pub fn partial_lyrics(cleaned: &str) -> PartialLyrics {
    let lines: Vec<&str> = cleaned.lines().collect();
    let total_lines = lines.len();
    let shown_lines = total_lines.div_ceil(2).min(MAX_SHOWN_LINES);
    PartialLyrics {
        lyrics: lines[..shown_lines].join("\n"),
        is_partial: shown_lines < total_lines,
        total_lines,
        shown_lines,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricsHit {
    pub title: String,
    pub artist: String,
    pub url: Option<String>,
    pub lyrics: Option<String>,
}

#[async_trait]
pub trait LyricsSource: Send + Sync {
    /// Best match for a free-text query, if any.
    async fn search(&self, query: &str) -> Result<Option<LyricsHit>, String>;
}

/// What the track page shows. Never an error: misses are reported in-band.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LyricsResult {
    pub source: &'static str,
    pub found: bool,
    pub lyrics: Option<String>,
    pub is_partial: bool,
    pub total_lines: usize,
    pub shown_lines: usize,
    pub song_title: Option<String>,
    pub song_artist: Option<String>,
    pub song_url: Option<String>,
    pub message: String,
    pub error: Option<String>,
}

impl LyricsResult {
    fn not_found(message: &str) -> Self {
        Self {
            source: SOURCE,
            found: false,
            lyrics: None,
            is_partial: false,
            total_lines: 0,
            shown_lines: 0,
            song_title: None,
            song_artist: None,
            song_url: None,
            message: message.to_string(),
            error: None,
        }
    }
}

pub async fn track_lyrics(
    source: &dyn LyricsSource,
    track_name: &str,
    artist_name: &str,
) -> LyricsResult {
    let query = format!("{} {}", clean_track_name(track_name), primary_artist(artist_name));

    let hit = match source.search(&query).await {
        Ok(Some(hit)) => hit,
        Ok(None) => {
            info!("No lyrics match for {:?}", query);
            return LyricsResult::not_found("Lyrics not found for this track");
        }
        Err(e) => {
            warn!("Lyrics lookup failed for {:?}: {}", query, e);
            return LyricsResult {
                error: Some(e),
                ..LyricsResult::not_found("Unable to fetch lyrics at this time!")
            };
        }
    };

    let Some(raw) = hit.lyrics.as_deref().filter(|l| !l.trim().is_empty()) else {
        return LyricsResult::not_found("Lyrics not available for this track!");
    };
    let cleaned = clean_lyrics_text(raw);
    if cleaned.chars().count() < MIN_LYRICS_CHARS {
        return LyricsResult::not_found("Lyrics not available for this track!");
    }

    let partial = partial_lyrics(&cleaned);
    LyricsResult {
        source: SOURCE,
        found: true,
        message: if partial.is_partial {
            "Partial lyrics shown".to_string()
        } else {
            "Full lyrics shown".to_string()
        },
        lyrics: Some(partial.lyrics),
        is_partial: partial.is_partial,
        total_lines: partial.total_lines,
        shown_lines: partial.shown_lines,
        song_title: Some(hit.title),
        song_artist: Some(hit.artist),
        song_url: hit.url,
        error: None,
    }
}

#[derive(Debug, Deserialize)]
struct LrclibRecord {
    id: i64,
    #[serde(rename = "trackName")]
    track_name: String,
    #[serde(rename = "artistName")]
    artist_name: String,
    #[serde(rename = "plainLyrics")]
    plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

pub struct LrclibClient {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibClient {
    const USER_AGENT: &'static str = concat!("tunedeck/", env!("CARGO_PKG_VERSION"));

    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl LyricsSource for LrclibClient {
    async fn search(&self, query: &str) -> Result<Option<LyricsHit>, String> {
        let url = format!("{}/search?q={}", self.base_url, urlencoding::encode(query));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(format!("LRCLIB search error: {}", response.status()));
        }

        let records: Vec<LrclibRecord> = response
            .json()
            .await
            .map_err(|e| format!("Parse failed: {}", e))?;

        // Prefer a record with plain text; fall back to synced lyrics
        let best = records
            .iter()
            .find(|r| r.plain_lyrics.is_some())
            .or_else(|| records.first());

        Ok(best.map(|r| LyricsHit {
            title: r.track_name.clone(),
            artist: r.artist_name.clone(),
            url: Some(format!("https://lrclib.net/api/get/{}", r.id)),
            lyrics: r.plain_lyrics.clone().or_else(|| r.synced_lyrics.clone()),
        }))
    }
}
