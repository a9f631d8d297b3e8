//! Browser-like default headers for scraping requests.
//!
//! Hosting sites gate plain HTTP clients behind bot checks, so every
//! session presents itself as a mainstream desktop browser. A profile is
//! picked once per session and stays fixed for its lifetime.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT,
};

/// Browser identity sent with every page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    /// Client hints; empty for browsers that don't send them.
    pub sec_ch_ua: String,
    pub sec_ch_ua_platform: String,
}

const CHROME_VERSIONS: &[(&str, &str)] = &[
    ("131", "131.0.0.0"),
    ("130", "130.0.0.0"),
    ("129", "129.0.0.0"),
];

const FIREFOX_VERSIONS: &[&str] = &["133.0", "132.0", "131.0"];

const LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-IN,en;q=0.9,hi;q=0.8",
    "en-US,en;q=0.9,hi;q=0.8",
];

#[derive(Debug, Clone, Copy)]
enum Platform {
    Windows,
    MacOS,
    Linux,
}

impl Platform {
    fn random() -> Self {
        let roll: f32 = rand::thread_rng().gen();
        if roll < 0.7 {
            Platform::Windows
        } else if roll < 0.9 {
            Platform::MacOS
        } else {
            Platform::Linux
        }
    }

    fn os_string(self) -> &'static str {
        match self {
            Platform::Windows => "Windows NT 10.0; Win64; x64",
            Platform::MacOS => "Macintosh; Intel Mac OS X 10_15_7",
            Platform::Linux => "X11; Linux x86_64",
        }
    }

    fn client_hint(self) -> &'static str {
        match self {
            Platform::Windows => "\"Windows\"",
            Platform::MacOS => "\"macOS\"",
            Platform::Linux => "\"Linux\"",
        }
    }
}

fn pick<'a>(items: &'a [&'a str], fallback: &'a str) -> &'a str {
    items.choose(&mut rand::thread_rng()).copied().unwrap_or(fallback)
}

/// Chrome on a random desktop platform.
#[must_use]
pub fn chrome_profile() -> BrowserProfile {
    let platform = Platform::random();
    let (major, full) = CHROME_VERSIONS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(("131", "131.0.0.0"));

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{full} Safari/537.36",
            platform.os_string()
        ),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
            .to_string(),
        accept_language: pick(LANGUAGES, "en-US,en;q=0.9").to_string(),
        sec_ch_ua: format!(
            "\"Google Chrome\";v=\"{major}\", \"Chromium\";v=\"{major}\", \"Not_A Brand\";v=\"24\""
        ),
        sec_ch_ua_platform: platform.client_hint().to_string(),
    }
}

/// Firefox on a random desktop platform. Firefox sends no client hints.
#[must_use]
pub fn firefox_profile() -> BrowserProfile {
    let platform = Platform::random();
    let version = pick(FIREFOX_VERSIONS, "133.0");

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 ({}; rv:{version}) Gecko/20100101 Firefox/{version}",
            platform.os_string()
        ),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        accept_language: pick(LANGUAGES, "en-US,en;q=0.9").to_string(),
        sec_ch_ua: String::new(),
        sec_ch_ua_platform: String::new(),
    }
}

/// Weighted towards Chrome, matching typical traffic on these sites.
#[must_use]
pub fn random_profile() -> BrowserProfile {
    if rand::thread_rng().gen_bool(0.8) {
        chrome_profile()
    } else {
        firefox_profile()
    }
}

impl BrowserProfile {
    /// Render the profile as request headers.
    ///
    /// Values that are not valid header text are skipped rather than
    /// failing the whole session.
    #[must_use]
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let mut put = |name: HeaderName, value: &str| {
            if value.is_empty() {
                return;
            }
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        };

        put(USER_AGENT, &self.user_agent);
        put(ACCEPT, &self.accept);
        put(ACCEPT_LANGUAGE, &self.accept_language);
        put(HeaderName::from_static("sec-ch-ua"), &self.sec_ch_ua);
        put(HeaderName::from_static("sec-ch-ua-platform"), &self.sec_ch_ua_platform);
        if !self.sec_ch_ua.is_empty() {
            put(HeaderName::from_static("sec-ch-ua-mobile"), "?0");
        }
        put(HeaderName::from_static("sec-fetch-dest"), "document");
        put(HeaderName::from_static("sec-fetch-mode"), "navigate");
        put(HeaderName::from_static("upgrade-insecure-requests"), "1");
        put(CACHE_CONTROL, "max-age=0");

        headers
    }
}
