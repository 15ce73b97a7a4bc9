//! Small helpers shared by header generation and consumers.

use super::Headers;

/// Headers whose value depends on the individual request rather than the
/// browser identity.
const REQUEST_DEPENDENT: [&str; 9] = [
    "accept",
    "accept-encoding",
    "cache-control",
    "pragma",
    "sec-fetch-dest",
    "sec-fetch-mode",
    "sec-fetch-site",
    "sec-fetch-user",
    "upgrade-insecure-requests",
];

pub(crate) fn user_agent(headers: &Headers) -> Option<&str> {
    headers.get("User-Agent").or_else(|| headers.get("user-agent"))
}

/// Browser family a User-Agent string belongs to. Edge is checked before
/// Chrome since Chromium-based Edge carries both tokens.
pub(crate) fn browser_family(user_agent: &str) -> Option<&'static str> {
    if user_agent.contains("Firefox") {
        Some("firefox")
    } else if user_agent.contains("Edg/") {
        Some("edge")
    } else if user_agent.contains("Chrome") {
        Some("chrome")
    } else if user_agent.contains("Safari") {
        Some("safari")
    } else {
        None
    }
}

/// Strips request-dependent headers, keeping only the browser-wide ones
/// that are safe to replay across arbitrary requests. The `TE` header is
/// only ever sent by Firefox, so it is dropped for every other family.
pub fn only_injectable_headers(headers: &Headers, browser_name: &str) -> Headers {
    let firefox = browser_name.to_ascii_lowercase().contains("firefox");
    let mut filtered = Headers::default();
    for (name, value) in headers.iter() {
        let lower = name.to_ascii_lowercase();
        if REQUEST_DEPENDENT.contains(&lower.as_str()) {
            continue;
        }
        if lower == "te" && !firefox {
            continue;
        }
        filtered.push(name, value);
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_detection_prefers_edge_over_chrome() {
        let edge = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                    (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36 Edg/121.0.2277.83";
        assert_eq!(browser_family(edge), Some("edge"));

        let chrome = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                      (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
        assert_eq!(browser_family(chrome), Some("chrome"));
    }

    #[test]
    fn injectable_filter_drops_request_dependent_headers() {
        let mut headers = Headers::default();
        headers.push("User-Agent", "ua");
        headers.push("Accept", "text/html");
        headers.push("Accept-Language", "en-US");
        headers.push("Sec-Fetch-Mode", "navigate");
        headers.push("TE", "trailers");

        let filtered = only_injectable_headers(&headers, "chrome");
        assert!(filtered.contains("User-Agent"));
        assert!(filtered.contains("Accept-Language"));
        assert!(!filtered.contains("Accept"));
        assert!(!filtered.contains("Sec-Fetch-Mode"));
        assert!(!filtered.contains("TE"));

        let firefox = only_injectable_headers(&headers, "firefox");
        assert!(firefox.contains("TE"));
    }
}
