//! Video reference handling: embed-id extraction, the playability predicate and
//! player embed URLs.
//!
//! Only YouTube links are recognized as embeddable. Anything else is either
//! rejected (`PlayabilityPolicy::Strict`) or accepted as a direct link
//! (`PlayabilityPolicy::AllowDirectLinks`).

use url::Url;

const EMBED_BASE: &str = "https://www.youtube.com/embed/";
const EMBED_PARAMS: &str = "rel=0&modestbranding=1&playsinline=1&controls=1&showinfo=1&autoplay=0";
const VIDEO_ID_LEN: usize = 11;

/// How to treat video references whose host is not a recognized video service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayabilityPolicy {
    /// Only references with an extractable embed id are playable.
    #[default]
    Strict,
    /// Well-formed http(s) links on unrecognized hosts are playable too.
    AllowDirectLinks,
}

/// Extract the 11-character YouTube video id from a watch, embed, short or share link.
#[must_use]
pub fn youtube_id(raw: &str) -> Option<String> {
    let url = parse_lenient(raw)?;
    let host = normalized_host(&url)?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = match host {
        "youtu.be" => segments.next().map(str::to_owned),
        "youtube.com" | "youtube-nocookie.com" => match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed" | "v" | "e" | "shorts" | "live") => segments.next().map(str::to_owned),
            _ => None,
        },
        _ => None,
    }?;

    is_valid_id(&candidate).then_some(candidate)
}

/// Whether the reference points at a recognized video host, regardless of id validity.
#[must_use]
pub fn is_recognized_host(raw: &str) -> bool {
    parse_lenient(raw)
        .as_ref()
        .and_then(normalized_host)
        .is_some_and(|host| matches!(host, "youtu.be" | "youtube.com" | "youtube-nocookie.com"))
}

/// A lecture video is playable when it has a reference and that reference can be embedded.
#[must_use]
pub fn is_playable(video_url: Option<&str>, policy: PlayabilityPolicy) -> bool {
    let Some(raw) = video_url.map(str::trim).filter(|s| !s.is_empty()) else {
        return false;
    };
    if youtube_id(raw).is_some() {
        return true;
    }
    match policy {
        PlayabilityPolicy::Strict => false,
        PlayabilityPolicy::AllowDirectLinks => {
            !is_recognized_host(raw)
                && Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
        }
    }
}

/// Player URL for an embeddable reference.
#[must_use]
pub fn embed_url(raw: &str) -> Option<String> {
    youtube_id(raw).map(|id| format!("{EMBED_BASE}{id}?{EMBED_PARAMS}"))
}

fn parse_lenient(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains("://") {
        Url::parse(raw).ok()
    } else {
        Url::parse(&format!("https://{raw}")).ok()
    }
}

fn normalized_host(url: &Url) -> Option<&str> {
    let host = url.host_str()?;
    Some(
        ["www.", "m.", "music."]
            .iter()
            .find_map(|prefix| host.strip_prefix(prefix))
            .unwrap_or(host),
    )
}

fn is_valid_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
