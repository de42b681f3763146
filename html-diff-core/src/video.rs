use std::borrow::Cow;

/// Query parameter every embedded video player must carry.
pub const PRIVACY_QUERY: &str = "nocookie=true";

const VIDEO_HOSTS: &[&str] = &[
    "channel9.msdn.com/",
    "www.youtube.com/embed/",
    "www.youtube-nocookie.com/embed/",
    "www.microsoft.com/videoplayer/embed/",
    "player.vimeo.com/video/",
];

/// Append [`PRIVACY_QUERY`] to a known video-embed URL when it is missing.
///
/// URLs on other hosts are returned unchanged.
pub fn canonical_embed_url(url: &str) -> Cow<'_, str> {
    let trimmed = url.trim();
    if !VIDEO_HOSTS.iter().any(|host| trimmed.contains(host)) {
        return Cow::Borrowed(url);
    }

    let (base, fragment) = match trimmed.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (trimmed, None),
    };
    if base
        .split_once('?')
        .is_some_and(|(_, query)| query.split('&').any(|pair| pair == PRIVACY_QUERY))
    {
        return Cow::Borrowed(url);
    }

    let separator = match base.split_once('?') {
        Some((_, "")) => "",
        Some(_) => "&",
        None => "?",
    };
    let mut out = format!("{base}{separator}{PRIVACY_QUERY}");
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::canonical_embed_url;

    #[test]
    fn appends_suffix_to_known_hosts_only() {
        assert_eq!(
            canonical_embed_url("https://channel9.msdn.com/Shows/x/player"),
            "https://channel9.msdn.com/Shows/x/player?nocookie=true"
        );
        assert_eq!(
            canonical_embed_url("https://www.youtube.com/embed/abc?start=5"),
            "https://www.youtube.com/embed/abc?start=5&nocookie=true"
        );
        assert_eq!(
            canonical_embed_url("https://example.com/video?x=1"),
            "https://example.com/video?x=1"
        );
    }

    #[test]
    fn existing_suffix_is_left_alone() {
        let url = "https://www.youtube.com/embed/abc?nocookie=true&start=5";
        assert_eq!(canonical_embed_url(url), url);
    }
}
