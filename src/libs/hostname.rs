//! URL classification: aggregation hostname, internal pages, media hosts.

use url::{Host, Url};

/// Sentinel bucket for URLs that cannot be parsed.
pub const UNKNOWN_HOST: &str = "unknown";

const INTERNAL_SCHEMES: [&str; 8] = [
    "chrome://",
    "chrome-extension://",
    "edge://",
    "about:",
    "brave://",
    "moz-extension://",
    "view-source:",
    "devtools://",
];

/// Browser-owned pages never count as a trackable tab.
pub fn is_internal_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    INTERNAL_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

/// Any non-empty URL that is not a browser page. Unparsable ones are booked
/// under [`UNKNOWN_HOST`].
pub fn is_trackable_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && !is_internal_url(url)
}

/// Domain part of a tab URL, the key dwell time is aggregated under.
///
/// Paths, queries, ports and credentials are dropped. Anything that is not
/// `http(s)://` gets `https://` put in front before parsing. Unparsable input
/// resolves to [`UNKNOWN_HOST`].
pub fn extract_hostname(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return UNKNOWN_HOST.to_string();
    }

    let lower = url.to_ascii_lowercase();
    let parsed = if lower.starts_with("http://") || lower.starts_with("https://") {
        Url::parse(url)
    } else {
        Url::parse(&format!("https://{}", url))
    };

    let host = match parsed.as_ref().ok().and_then(Url::host) {
        Some(Host::Domain(domain)) => domain.trim_end_matches('.').to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => String::new(),
    };
    if host.is_empty() {
        UNKNOWN_HOST.to_string()
    } else {
        host
    }
}

/// Whether `hostname` belongs to one of the streaming `media_hosts`.
///
/// Matches the host itself and its subdomains, so `m.youtube.com` counts for
/// `youtube.com` but `notyoutube.com` does not.
pub fn is_media_host(hostname: &str, media_hosts: &[String]) -> bool {
    media_hosts.iter().any(|media| {
        let media = media.trim().to_ascii_lowercase();
        !media.is_empty() && (hostname == media || hostname.ends_with(&format!(".{}", media)))
    })
}
