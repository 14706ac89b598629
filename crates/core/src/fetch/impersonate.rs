//! Browser-like header sets for sites that turn away obvious bots.

use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

/// One coherent combination of browser request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderProfile {
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
}

const PROFILES: &[HeaderProfile] = &[
    HeaderProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        accept_language: "en-US,en;q=0.9",
    },
    HeaderProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        accept_language: "en-GB,en;q=0.9",
    },
    HeaderProfile {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        accept_language: "en-US,en;q=0.5",
    },
    HeaderProfile {
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        accept_language: "en-US,en;q=0.8",
    },
];

/// Picks one profile at random.
pub fn random_profile() -> &'static HeaderProfile {
    PROFILES.choose(&mut rand::thread_rng()).unwrap_or(&PROFILES[0])
}

/// All known profiles, in declaration order.
pub fn profiles() -> &'static [HeaderProfile] {
    PROFILES
}

impl HeaderProfile {
    /// Renders the profile as request headers.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(self.user_agent));
        headers.insert(ACCEPT, HeaderValue::from_static(self.accept));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(self.accept_language));
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_profile_is_from_pool() {
        for _ in 0..20 {
            let profile = random_profile();
            assert!(profiles().contains(profile));
        }
    }

    #[test]
    fn test_headers_are_complete() {
        for profile in profiles() {
            let headers = profile.headers();
            assert_eq!(headers.len(), 3);
            assert!(headers.get(USER_AGENT).unwrap().to_str().unwrap().starts_with("Mozilla/5.0"));
        }
    }
}
