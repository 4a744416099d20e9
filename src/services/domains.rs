//! Hostname and registrable-domain helpers.
//!
//! Grouping analytics by bare hostnames splits `www.example.com` and
//! `blog.example.com` into separate sites, so aggregation keys on the
//! registrable domain (public-suffix aware). The suffix table below covers
//! the common multi-label public suffixes; single-label TLDs need no entry.

use url::Url;

/// Multi-label public suffixes where the registrable domain is the third
/// label from the right (e.g. `bbc.co.uk`, not `co.uk`).
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    // United Kingdom
    "co.uk", "org.uk", "ac.uk", "gov.uk", "net.uk", "me.uk", "ltd.uk", "plc.uk",
    // Australia / New Zealand
    "com.au", "net.au", "org.au", "edu.au", "gov.au", "co.nz", "net.nz", "org.nz",
    // Japan / Korea
    "co.jp", "ne.jp", "or.jp", "ac.jp", "go.jp", "co.kr", "or.kr", "go.kr",
    // Americas
    "com.br", "net.br", "org.br", "com.mx", "com.ar", "com.co",
    // Asia
    "co.in", "net.in", "org.in", "com.cn", "net.cn", "org.cn",
    "com.tw", "com.hk", "com.sg", "co.id", "com.my", "co.th",
    // Europe / Africa / Middle East
    "com.tr", "co.il", "co.za", "com.ua", "com.pl", "com.ru",
];

/// Extracts the lowercased hostname from a URL string.
///
/// Returns `None` for URLs that fail to parse or carry no host
/// (e.g. `about:blank`, `file:` paths).
pub fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

/// Returns the registrable (effective top-level-plus-one) domain of a
/// hostname.
///
/// IPv4 literals and single-label hosts are returned unchanged.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_matches('.').to_ascii_lowercase();
    if is_ipv4(&host) {
        return host;
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host;
    }
    let last_two = labels[labels.len() - 2..].join(".");
    let take = if MULTI_LABEL_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };
    if labels.len() <= take {
        host
    } else {
        labels[labels.len() - take..].join(".")
    }
}

/// First DNS label of a hostname (`"mail"` for `mail.example.com`).
pub fn first_label(host: &str) -> &str {
    host.split('.').next().unwrap_or(host)
}

/// Whether the string looks like an IPv4 literal (four numeric octets).
pub fn is_ipv4(host: &str) -> bool {
    let octets: Vec<&str> = host.split('.').collect();
    octets.len() == 4 && octets.iter().all(|o| !o.is_empty() && o.parse::<u8>().is_ok())
}
