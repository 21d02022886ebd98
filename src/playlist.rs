//! Flat segment-list extraction from M3U8 playlists.
//!
//! Only what the merger needs: every non-comment line naming a `.ts` file,
//! resolved against the playlist URL. Tags, variants and byte ranges are
//! ignored.

use reqwest::Url;

/// Extension of the transport-stream segments the merger consumes
const SEGMENT_EXTENSION: &str = ".ts";

/// Extract segment URLs from playlist text, in playlist order.
pub fn parse_playlist(playlist_url: &Url, text: &str) -> Vec<Url> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match playlist_url.join(line) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Skipping unparseable playlist entry {:?}: {}", line, e);
                None
            }
        })
        .filter(is_segment_url)
        .collect()
}

/// Whether a URL's path names a transport-stream segment (query ignored).
pub fn is_segment_url(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(SEGMENT_EXTENSION)
}

/// Whether a URL's path names an M3U8 playlist.
pub fn is_playlist_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    path.ends_with(".m3u8") || path.ends_with(".m3u")
}

/// The last path segment of a URL, used as the local file name.
pub fn segment_file_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .next_back()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn resolves_relative_and_absolute_entries() {
        let text = "#EXTM3U\n\
                    #EXT-X-TARGETDURATION:6\n\
                    #EXTINF:6.0,\n\
                    seg001.ts\n\
                    #EXTINF:6.0,\n\
                    https://mirror.example.com/live/bak0_seg001.ts\n\
                    \n\
                    #EXT-X-ENDLIST\n";
        let segments = parse_playlist(&url("https://cdn.example.com/live/index.m3u8"), text);
        assert_eq!(
            segments,
            vec![
                url("https://cdn.example.com/live/seg001.ts"),
                url("https://mirror.example.com/live/bak0_seg001.ts"),
            ]
        );
    }

    #[test]
    fn skips_non_segment_lines() {
        let text = "#EXTM3U\nvariant/index.m3u8\ninit.mp4\nseg.ts?token=abc\n";
        let segments = parse_playlist(&url("http://h/p/list.m3u8"), text);
        assert_eq!(segments, vec![url("http://h/p/seg.ts?token=abc")]);
    }

    #[test]
    fn empty_playlist() {
        assert!(parse_playlist(&url("http://h/list.m3u8"), "#EXTM3U\n").is_empty());
    }

    #[test]
    fn file_names() {
        assert_eq!(
            segment_file_name(&url("http://h/a/bak1_seg.ts?x=1")),
            Some("bak1_seg.ts".to_string())
        );
        assert_eq!(segment_file_name(&url("http://h/a/")), None);
    }

    #[test]
    fn url_kinds() {
        assert!(is_playlist_url(&url("http://h/live/INDEX.M3U8")));
        assert!(!is_playlist_url(&url("http://h/live/seg.ts")));
        assert!(is_segment_url(&url("http://h/live/seg.TS")));
    }
}
