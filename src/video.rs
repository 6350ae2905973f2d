//! YouTube link handling for exercise demo videos

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YouTubeVideo {
    pub id: String,
    pub start_seconds: u32,
}

impl YouTubeVideo {
    /// Recognizes `youtu.be/<id>`, `youtube.com/watch?v=<id>` and
    /// `youtube.com/embed/<id>`, with an optional `t` or `start` offset
    pub fn parse(link: &str) -> Option<Self> {
        let url = Url::parse(link).ok()?;
        let host = url.host_str()?;

        let id = if host == "youtu.be" {
            url.path().trim_start_matches('/').to_string()
        } else if host.ends_with("youtube.com") {
            if url.path() == "/watch" {
                query_param(&url, "v").unwrap_or_default()
            } else if let Some(rest) = url.path().strip_prefix("/embed/") {
                rest.to_string()
            } else {
                String::new()
            }
        } else {
            String::new()
        };

        if id.is_empty() {
            return None;
        }

        let start_seconds = query_param(&url, "t")
            .or_else(|| query_param(&url, "start"))
            .and_then(|t| parse_offset(&t))
            .unwrap_or(0);

        Some(Self { id, start_seconds })
    }

    /// Privacy-enhanced embed URL that autoplays without related videos
    pub fn embed_url(&self) -> String {
        let mut url = format!("https://www.youtube-nocookie.com/embed/{}?autoplay=1&rel=0", self.id);
        if self.start_seconds > 0 {
            url.push_str(&format!("&start={}", self.start_seconds));
        }
        url
    }
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// "42" or "42s"
fn parse_offset(t: &str) -> Option<u32> {
    let digits = t.strip_suffix(['s', 'S']).unwrap_or(t);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_link() {
        let v = YouTubeVideo::parse("https://youtu.be/dQw4w9WgXcQ?t=42").unwrap();
        assert_eq!(v, YouTubeVideo { id: "dQw4w9WgXcQ".into(), start_seconds: 42 });
    }

    #[test]
    fn test_watch_and_embed_links() {
        let v = YouTubeVideo::parse("https://www.youtube.com/watch?v=abc123&t=15s").unwrap();
        assert_eq!(v.id, "abc123");
        assert_eq!(v.start_seconds, 15);

        let v = YouTubeVideo::parse("https://m.youtube.com/embed/xyz?start=7").unwrap();
        assert_eq!(v.id, "xyz");
        assert_eq!(v.start_seconds, 7);
    }

    #[test]
    fn test_unusable_offset_is_ignored() {
        let v = YouTubeVideo::parse("https://youtu.be/abc?t=1m30s").unwrap();
        assert_eq!(v.start_seconds, 0);
    }

    #[test]
    fn test_rejects_other_links() {
        assert_eq!(YouTubeVideo::parse("https://vimeo.com/123"), None);
        assert_eq!(YouTubeVideo::parse("https://www.youtube.com/channel/abc"), None);
        assert_eq!(YouTubeVideo::parse("not a url"), None);
    }

    #[test]
    fn test_embed_url() {
        let v = YouTubeVideo { id: "abc".into(), start_seconds: 0 };
        assert_eq!(v.embed_url(), "https://www.youtube-nocookie.com/embed/abc?autoplay=1&rel=0");
        let v = YouTubeVideo { id: "abc".into(), start_seconds: 30 };
        assert_eq!(v.embed_url(), "https://www.youtube-nocookie.com/embed/abc?autoplay=1&rel=0&start=30");
    }
}
