use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_EMAILJS_API_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub cookie: CookieConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub tls: TlsConfig,
}

/// EmailJS credentials. The public key is sent as `user_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CookieConfig {
    /// Adds the `Secure` attribute to the submission log cookie.
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: SameSite,
}

/// `SameSite` attribute of the submission log cookie.
///
/// `None` is required when the page calling the API is on another site;
/// browsers drop `Strict`/`Lax` cookies on those fetches and the quota
/// would never see earlier submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Origin of the portfolio page when it is served from another host.
    #[serde(default)]
    pub allowed_origin: Option<String>,
}

/// Per-IP request throttle in front of the contact route. Independent of the
/// per-browser submission quota.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_contact_rpm")]
    pub contact_requests_per_minute: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            email: EmailConfig::default(),
            cookie: CookieConfig::default(),
            cors: CorsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            tls: TlsConfig::default(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            service_id: String::new(),
            template_id: String::new(),
            public_key: String::new(),
            api_url: default_api_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { contact_requests_per_minute: default_contact_rpm() }
    }
}

impl RateLimitConfig {
    /// Milliseconds between replenished requests. Never zero.
    pub fn replenish_interval_ms(&self) -> u64 {
        (60_000 / u64::from(self.contact_requests_per_minute.max(1))).max(1)
    }

    pub fn burst_size(&self) -> u32 {
        self.contact_requests_per_minute.max(1)
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_api_url() -> String { DEFAULT_EMAILJS_API_URL.to_string() }
fn default_timeout_seconds() -> u64 { 10 }
fn default_contact_rpm() -> u32 { 5 }

impl EmailConfig {
    /// Returns `true` once every EmailJS credential is filled in.
    pub fn is_configured(&self) -> bool {
        !self.service_id.is_empty() && !self.template_id.is_empty() && !self.public_key.is_empty()
    }
}

impl ServerConfig {
    pub fn tls_enabled(&self) -> bool {
        self.tls.cert_path.is_some() && self.tls.key_path.is_some()
    }

    /// Reads `FOLIO_WEB_CONFIG` (if set) and applies `FOLIO_*` overrides.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("FOLIO_WEB_CONFIG").map(PathBuf::from).ok();

        let config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies overrides looked up by variable name, then validates.
    pub fn with_overrides<F>(mut self, var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = var("FOLIO_BIND_ADDR") {
            self.bind_addr = addr.parse()?;
        }

        if let Some(id) = var("FOLIO_EMAILJS_SERVICE_ID") {
            self.email.service_id = id;
        }
        if let Some(id) = var("FOLIO_EMAILJS_TEMPLATE_ID") {
            self.email.template_id = id;
        }
        if let Some(key) = var("FOLIO_EMAILJS_PUBLIC_KEY") {
            self.email.public_key = key;
        }
        if let Some(api_url) = var("FOLIO_EMAILJS_API_URL") {
            self.email.api_url = api_url;
        }

        if let Some(val) = var("FOLIO_COOKIE_SECURE") {
            self.cookie.secure = matches!(val.as_str(), "1" | "true" | "yes");
        }
        if let Some(val) = var("FOLIO_COOKIE_SAME_SITE") {
            self.cookie.same_site = SameSite::parse(&val).ok_or_else(|| {
                anyhow::anyhow!("FOLIO_COOKIE_SAME_SITE must be strict, lax or none, got {val:?}")
            })?;
        }

        if let Some(val) = var("FOLIO_CONTACT_RPM") {
            if let Ok(rpm) = val.parse::<u32>() {
                self.rate_limit.contact_requests_per_minute = rpm;
            }
        }

        if let Some(origin) = var("FOLIO_ALLOWED_ORIGIN") {
            self.cors.allowed_origin = Some(origin);
        }

        if let Some(cert) = var("FOLIO_TLS_CERT") {
            self.tls.cert_path = Some(cert);
        }
        if let Some(key) = var("FOLIO_TLS_KEY") {
            self.tls.key_path = Some(key);
        }

        url::Url::parse(&self.email.api_url)
            .map_err(|e| anyhow::anyhow!("invalid EmailJS api_url {:?}: {e}", self.email.api_url))?;

        if !self.email.is_configured() {
            tracing::warn!(
                "EmailJS credentials are incomplete. Contact submissions will fail to deliver. \
                 Set FOLIO_EMAILJS_SERVICE_ID, FOLIO_EMAILJS_TEMPLATE_ID and FOLIO_EMAILJS_PUBLIC_KEY."
            );
        }

        if self.tls_enabled() && !self.cookie.secure {
            tracing::info!("TLS enabled: marking submission cookie Secure");
            self.cookie.secure = true;
        }

        if self.cookie.same_site == SameSite::None && !self.cookie.secure {
            tracing::warn!("SameSite=None cookies must be Secure: marking submission cookie Secure");
            self.cookie.secure = true;
        }

        if self.cross_site_cookie_at_risk() {
            tracing::warn!(
                "CORS origin {:?} is configured but the submission cookie is SameSite={}. \
                 If that page is on another site, browsers will drop the cookie and the \
                 submission quota will never deny. Set cookie.same_site = \"none\" \
                 (FOLIO_COOKIE_SAME_SITE=none) for cross-site pages.",
                self.cors.allowed_origin.as_deref().unwrap_or_default(),
                self.cookie.same_site.as_str()
            );
        }

        Ok(self)
    }

    /// Returns `true` when a page on another origin may call the API while
    /// the cookie is restricted to same-site requests.
    pub fn cross_site_cookie_at_risk(&self) -> bool {
        self.cors.allowed_origin.is_some() && self.cookie.same_site != SameSite::None
    }
}
