//! Browser cookies as a [`KvStore`].
//!
//! The submission log lives in the visitor's browser, exactly where the
//! page script used to keep it. A `CookieJar` is built from the request's
//! `Cookie` header, collects writes, and turns them into `Set-Cookie`
//! headers for the response. Values are percent-encoded on the wire.

use std::collections::HashMap;
use std::time::Duration;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use folio_core::{CoreError, CoreResult, KvStore};

use crate::config::{CookieConfig, SameSite};

/// Browsers reject cookies whose name and value exceed this many bytes.
pub const MAX_COOKIE_BYTES: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingCookie {
    name: String,
    encoded_value: String,
    max_age: Duration,
}

#[derive(Debug, Default)]
pub struct CookieJar {
    values: HashMap<String, String>,
    pending: Vec<PendingCookie>,
    secure: bool,
    same_site: SameSite,
}

impl CookieJar {
    /// Collects every `name=value` pair from the request's `Cookie` headers.
    ///
    /// When a name repeats, the first occurrence wins.
    pub fn from_headers(headers: &HeaderMap, config: &CookieConfig) -> Self {
        let mut values = HashMap::new();
        for header in headers.get_all(COOKIE) {
            let Ok(raw) = header.to_str() else {
                tracing::debug!("Ignoring non-ASCII Cookie header");
                continue;
            };
            for pair in raw.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    values
                        .entry(name.trim().to_string())
                        .or_insert_with(|| value.trim().to_string());
                }
            }
        }
        Self {
            values,
            pending: Vec::new(),
            // Browsers drop `SameSite=None` cookies that are not `Secure`.
            secure: config.secure || config.same_site == SameSite::None,
            same_site: config.same_site,
        }
    }

    /// Renders pending writes as `Set-Cookie` response headers.
    pub fn into_set_cookie_headers(self) -> Vec<(HeaderName, HeaderValue)> {
        let (secure, same_site) = (self.secure, self.same_site);
        self.pending
            .into_iter()
            .filter_map(|cookie| {
                let rendered = render(&cookie, same_site, secure);
                match HeaderValue::from_str(&rendered) {
                    Ok(value) => Some((SET_COOKIE, value)),
                    Err(e) => {
                        tracing::warn!("Dropping unrepresentable cookie {}: {e}", cookie.name);
                        None
                    }
                }
            })
            .collect()
    }
}

fn render(cookie: &PendingCookie, same_site: SameSite, secure: bool) -> String {
    let mut rendered = format!(
        "{}={}; Path=/; Max-Age={}; SameSite={}; HttpOnly",
        cookie.name,
        cookie.encoded_value,
        cookie.max_age.as_secs(),
        same_site.as_str()
    );
    if secure {
        rendered.push_str("; Secure");
    }
    rendered
}

impl KvStore for CookieJar {
    fn get(&self, key: &str) -> Option<String> {
        let raw = self.values.get(key)?;
        match urlencoding::decode(raw) {
            Ok(decoded) => Some(decoded.into_owned()),
            Err(e) => {
                tracing::debug!("Cookie {key} is not valid percent-encoding: {e}");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> CoreResult<()> {
        let encoded_value = urlencoding::encode(value).into_owned();
        if key.len() + encoded_value.len() > MAX_COOKIE_BYTES {
            return Err(CoreError::Storage(format!(
                "cookie {key} would exceed {MAX_COOKIE_BYTES} bytes"
            )));
        }

        self.values.insert(key.to_string(), encoded_value.clone());
        self.pending.retain(|c| c.name != key);
        self.pending.push(PendingCookie {
            name: key.to_string(),
            encoded_value,
            max_age: ttl,
        });
        Ok(())
    }
}
