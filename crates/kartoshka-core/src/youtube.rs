//! YouTube URL inspection.
//!
//! Only lightweight checks live here. The downloading tool has the final say
//! on whether a URL resolves.

const HOSTS: [&str; 4] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];
const SHORT_HOST: &str = "youtu.be";

/// Host and path of a URL, without scheme, query or fragment.
fn host_and_path(url: &str) -> Option<(&str, &str)> {
    let rest = url.trim();
    let rest = rest
        .strip_prefix("https://")
        .or_else(|| rest.strip_prefix("http://"))
        .unwrap_or(rest);
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let rest = &rest[..end];
    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    (!host.is_empty()).then_some((host, path))
}

/// Value of query parameter `key`, if present and non-empty.
pub fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

pub fn is_youtube_url(url: &str) -> bool {
    host_and_path(url).is_some_and(|(host, _)| {
        let host = host.to_ascii_lowercase();
        host == SHORT_HOST || HOSTS.contains(&host.as_str())
    })
}

/// Whether the URL names a playlist, either directly or through `list=`.
pub fn is_playlist_url(url: &str) -> bool {
    is_youtube_url(url) && extract_playlist_id(url).is_some()
}

/// Video id from `watch?v=`, `youtu.be/`, `/shorts/` or `/embed/` URLs.
pub fn extract_video_id(url: &str) -> Option<&str> {
    let (host, path) = host_and_path(url)?;
    if host.eq_ignore_ascii_case(SHORT_HOST) {
        return path.split('/').next().filter(|id| !id.is_empty());
    }
    if let Some(id) = query_param(url, "v") {
        return Some(id);
    }
    ["shorts/", "embed/", "live/"]
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))
        .and_then(|rest| rest.split('/').next())
        .filter(|id| !id.is_empty())
}

pub fn extract_playlist_id(url: &str) -> Option<&str> {
    query_param(url, "list")
}

/// True when the URL points at one video inside a playlist.
pub fn is_video_in_playlist(url: &str) -> bool {
    extract_video_id(url).is_some() && extract_playlist_id(url).is_some()
}
