use crate::lyrics::LyricsResult;
use crate::paging::Envelope;
use crate::types::{Album, Artist, Category, Image, Playlist, Track, UserProfile};

const APP_NAME: &str = "Tunedeck";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// First image, or an empty cover block when the upstream has none.
fn cover(images: &[Image], attrs: &str) -> String {
    match images.first() {
        Some(image) => format!(r#"<img src="{}" alt=""{}>"#, escape(&image.url), attrs),
        None => r#"<span class="cover"></span>"#.to_string(),
    }
}

/// Local files have no id, so they get no detail link.
fn track_link(track: &Track) -> String {
    if track.id.is_empty() {
        return format!("<span>{}</span>", escape(&track.name));
    }
    format!(
        r#"<a href="/tracks/{}">{}</a>"#,
        escape(&track.id),
        escape(&track.name)
    )
}

fn artist_names(track: &Track) -> String {
    track
        .artists
        .iter()
        .map(|a| escape(&a.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `m:ss`
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// What every signed-in page shows around its content.
#[derive(Debug, Clone, Default)]
pub struct Chrome {
    pub profile: UserProfile,
    pub recent: Vec<Track>,
}

pub fn login_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Log in | {app}</title>
</head>
<body class="login">
    <main>
        <h1>{app}</h1>
        <p>Listen to your music, your way.</p>
        <a class="btn" href="/auth">Log in with Spotify</a>
    </main>
</body>
</html>"#,
        app = APP_NAME
    )
}

pub fn layout(title: &str, chrome: &Chrome, content: &str) -> String {
    let user = chrome
        .profile
        .display_name
        .as_deref()
        .unwrap_or(&chrome.profile.id);
    let recent: String = chrome
        .recent
        .iter()
        .map(|t| {
            format!(
                r#"<li>{link} <span>{artists}</span></li>"#,
                link = track_link(t),
                artists = artist_names(t)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title} | {app}</title>
</head>
<body>
    <header>
        <a href="/" class="logo">{app}</a>
        <form action="/search" method="post"><input type="search" name="query" placeholder="What do you want to listen to?"></form>
        <nav><a href="/explore">Explore</a> <a href="/profile">{user}</a> <a href="/logout">Log out</a></nav>
    </header>
    <aside><h2>Recently played</h2><ul>{recent}</ul></aside>
    <main>
{content}
    </main>
{player}
    <script src="https://sdk.scdn.co/spotify-player.js"></script>
    <script src="/js/player.js"></script>
</body>
</html>"#,
        title = escape(title),
        app = APP_NAME,
        user = escape(user),
        recent = recent,
        content = content,
        player = player_bar()
    )
}

fn player_bar() -> &'static str {
    r#"    <div class="player hide disabled" data-player>
        <img data-track-banner width="64" height="64" alt="">
        <div><p data-track-name></p><p data-track-artists></p></div>
        <button data-player-prev-btn aria-label="Previous track">&#9198;</button>
        <button data-player-play-btn data-play-btn="paused" aria-label="Play track">&#9654;</button>
        <button data-player-next-btn aria-label="Next track">&#9197;</button>
        <input type="range" data-player-progress min="0" max="100" value="0">
        <input type="range" data-volume-progress min="0" max="100" value="100">
    </div>"#
}

fn play_button(uri: Option<&str>, attribute: &str) -> String {
    match uri {
        Some(uri) => format!(
            r#"<button data-play-btn="paused" {}="{}" aria-label="Play track">&#9654;</button>"#,
            attribute,
            escape(uri)
        ),
        None => String::new(),
    }
}

fn section(title: &str, more: Option<&str>, body: String) -> String {
    let more = more
        .map(|href| format!(r#" <a href="{}">See all</a>"#, escape(href)))
        .unwrap_or_default();
    format!(
        "<section>\n<h2>{}{}</h2>\n{}\n</section>\n",
        escape(title),
        more,
        body
    )
}

fn card(href: &str, cover: String, title: &str, subtitle: &str, play: String) -> String {
    format!(
        r#"<div class="card"><a href="{href}">{cover}<h3>{title}</h3><p>{subtitle}</p></a>{play}</div>"#,
        href = escape(href),
        cover = cover,
        title = escape(title),
        subtitle = subtitle,
        play = play
    )
}

pub fn album_cards(title: &str, albums: &[Album], more: Option<&str>) -> String {
    let cards: String = albums
        .iter()
        .map(|a| {
            let by = a
                .artists
                .iter()
                .map(|ar| escape(&ar.name))
                .collect::<Vec<_>>()
                .join(", ");
            card(
                &format!("/albums/{}", a.id),
                cover(&a.images, r#" loading="lazy""#),
                &a.name,
                &by,
                play_button(a.uri.as_deref(), "data-uri"),
            )
        })
        .collect();
    section(title, more, format!(r#"<div class="grid">{}</div>"#, cards))
}

pub fn artist_cards(title: &str, artists: &[Artist], more: Option<&str>) -> String {
    let cards: String = artists
        .iter()
        .map(|a| {
            card(
                &format!("/artists/{}", a.id),
                cover(&a.images, r#" loading="lazy""#),
                &a.name,
                "Artist",
                String::new(),
            )
        })
        .collect();
    section(title, more, format!(r#"<div class="grid">{}</div>"#, cards))
}

pub fn playlist_cards(title: &str, playlists: &[Playlist], more: Option<&str>) -> String {
    let cards: String = playlists
        .iter()
        .map(|p| {
            card(
                &format!("/playlists/{}", p.id),
                cover(&p.images, r#" loading="lazy""#),
                &p.name,
                &format!("{} tracks", p.track_count()),
                play_button(p.uri.as_deref(), "data-uri"),
            )
        })
        .collect();
    section(title, more, format!(r#"<div class="grid">{}</div>"#, cards))
}

pub fn category_cards(title: &str, categories: &[Category]) -> String {
    let cards: String = categories
        .iter()
        .map(|c| {
            card(
                &format!("/explore/{}", c.id),
                cover(&c.icons, r#" loading="lazy""#),
                &c.name,
                "",
                String::new(),
            )
        })
        .collect();
    section(title, None, format!(r#"<div class="grid">{}</div>"#, cards))
}

pub fn track_list(title: &str, tracks: &[Track], more: Option<&str>) -> String {
    let rows: String = tracks
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                r#"<li><span>{n}</span>{play}{link}{explicit} <span>{artists}</span> <span>{duration}</span></li>"#,
                n = i + 1,
                play = play_button(t.uri.as_deref(), "data-track-uri"),
                link = track_link(t),
                explicit = if t.explicit { r#" <abbr title="Explicit">E</abbr>"# } else { "" },
                artists = artist_names(t),
                duration = format_duration(t.duration_ms)
            )
        })
        .collect();
    section(title, more, format!(r#"<ol class="tracks">{}</ol>"#, rows))
}

pub fn pager<T>(envelope: &Envelope<T>) -> String {
    let previous = envelope
        .previous()
        .map(|href| format!(r#"<a rel="prev" href="{}">Previous</a>"#, escape(&href)))
        .unwrap_or_default();
    let next = envelope
        .next
        .as_deref()
        .map(|href| format!(r#"<a rel="next" href="{}">Next</a>"#, escape(href)))
        .unwrap_or_default();
    if previous.is_empty() && next.is_empty() {
        return String::new();
    }
    format!(
        r#"<nav class="pager">{} <span>Page {}</span> {}</nav>"#,
        previous, envelope.page, next
    )
}

/// Big header over a detail page.
pub fn banner(kind: &str, title: &str, images: &[Image], facts: &[String], play_uri: Option<&str>) -> String {
    let facts: String = facts
        .iter()
        .map(|f| format!("<li>{}</li>", escape(f)))
        .collect();
    format!(
        r#"<header class="banner">{cover}<p>{kind}</p><h1>{title}</h1><ul>{facts}</ul>{play}</header>"#,
        cover = cover(images, ""),
        kind = escape(kind),
        title = escape(title),
        facts = facts,
        play = play_button(play_uri, "data-uri")
    )
}

pub fn lyrics_section(lyrics: &LyricsResult) -> String {
    let body = match (&lyrics.lyrics, lyrics.found) {
        (Some(text), true) => {
            let credit = match &lyrics.song_url {
                Some(url) => format!(
                    r#"<p><a href="{}" rel="noopener" target="_blank">{} by {}</a></p>"#,
                    escape(url),
                    escape(lyrics.song_title.as_deref().unwrap_or_default()),
                    escape(lyrics.song_artist.as_deref().unwrap_or_default())
                ),
                None => String::new(),
            };
            let more = if lyrics.is_partial {
                format!(
                    "<p>Showing {} of {} lines</p>",
                    lyrics.shown_lines, lyrics.total_lines
                )
            } else {
                String::new()
            };
            format!("<pre>{}</pre>{}{}", escape(text), more, credit)
        }
        _ => format!("<p>{}</p>", escape(&lyrics.message)),
    };
    section("Lyrics", None, body)
}
