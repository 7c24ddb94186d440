//! Central configuration for the http_session crate
//!
//! A [`SessionConfig`] is built once at startup, either programmatically or from
//! environment variables, and is immutable afterwards. Every component receives it
//! by reference.

use std::env;

use crate::session::SessionError;

/// Minimum length of the long-term server secret.
pub const MIN_SERVER_SECRET_LEN: usize = 64;

const DEFAULT_SIGNING_SALT: &str = "http-session";
const DEFAULT_SESSION_MAX_AGE: u64 = 3600;
const DEFAULT_REFRESH_TOKEN_MAX_AGE: u64 = 60 * 60 * 24 * 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Which transport carries the session, CSRF and refresh values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Cookie,
    Header,
}

/// Attributes of one cookie slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    pub name: String,
    pub domain: Option<String>,
    pub path: String,
    /// Max-Age in seconds; `None` makes it a browser-session cookie.
    pub max_age: Option<u64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl CookieConfig {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            domain: None,
            path: "/".to_string(),
            max_age: None,
            secure: false,
            http_only: true,
            same_site: SameSite::Lax,
        }
    }
}

/// Header names of one header slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderConfig {
    /// Response header the server uses to hand the value to the client
    pub send_to_client_name: String,
    /// Request header the client echoes the value back on
    pub get_from_client_name: String,
}

impl HeaderConfig {
    fn new(send: &str, get: &str) -> Self {
        Self {
            send_to_client_name: send.to_string(),
            get_from_client_name: get.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct SessionConfig {
    pub server_secret: String,
    pub signing_salt: String,
    /// Session token lifetime in seconds; `None` issues non-expiring tokens.
    pub session_max_age: Option<u64>,
    pub encrypt_data: bool,
    pub transport: TransportKind,

    pub session_cookie: CookieConfig,
    pub csrf_cookie: CookieConfig,
    pub refresh_cookie: CookieConfig,

    pub session_header: HeaderConfig,
    pub csrf_header: HeaderConfig,
    pub refresh_header: HeaderConfig,

    /// Request header a client must echo the CSRF token on for state-changing calls
    pub csrf_submitted_name: String,
    pub refresh_token_max_age: u64,
}

// The secret must never show up in logs.
impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("server_secret", &"<redacted>")
            .field("signing_salt", &self.signing_salt)
            .field("session_max_age", &self.session_max_age)
            .field("encrypt_data", &self.encrypt_data)
            .field("transport", &self.transport)
            .field("session_cookie", &self.session_cookie)
            .field("csrf_cookie", &self.csrf_cookie)
            .field("refresh_cookie", &self.refresh_cookie)
            .field("session_header", &self.session_header)
            .field("csrf_header", &self.csrf_header)
            .field("refresh_header", &self.refresh_header)
            .field("csrf_submitted_name", &self.csrf_submitted_name)
            .field("refresh_token_max_age", &self.refresh_token_max_age)
            .finish()
    }
}

impl SessionConfig {
    /// Configuration with default settings for the given server secret.
    pub fn new(server_secret: impl Into<String>) -> Self {
        let mut refresh_cookie = CookieConfig::named("_refreshtoken");
        refresh_cookie.max_age = Some(DEFAULT_REFRESH_TOKEN_MAX_AGE);

        let mut csrf_cookie = CookieConfig::named("XSRF-TOKEN");
        // Client script has to read the token to echo it back
        csrf_cookie.http_only = false;

        Self {
            server_secret: server_secret.into(),
            signing_salt: DEFAULT_SIGNING_SALT.to_string(),
            session_max_age: Some(DEFAULT_SESSION_MAX_AGE),
            encrypt_data: false,
            transport: TransportKind::Cookie,
            session_cookie: CookieConfig::named("_sessiondata"),
            csrf_cookie,
            refresh_cookie,
            session_header: HeaderConfig::new("Set-Authorization", "Authorization"),
            csrf_header: HeaderConfig::new("Set-Xsrf-Token", "Xsrf-Token"),
            refresh_header: HeaderConfig::new("Set-Refresh-Token", "Refresh-Token"),
            csrf_submitted_name: "X-XSRF-TOKEN".to_string(),
            refresh_token_max_age: DEFAULT_REFRESH_TOKEN_MAX_AGE,
        }
    }

    /// Build a configuration from environment variables.
    ///
    /// `SESSION_SERVER_SECRET` is required; everything else falls back to the
    /// defaults of [`SessionConfig::new`].
    pub fn from_env() -> Result<Self, SessionError> {
        let secret = env::var("SESSION_SERVER_SECRET").map_err(|_| {
            SessionError::Config("SESSION_SERVER_SECRET must be set".to_string())
        })?;
        let mut config = Self::new(secret);

        if let Ok(salt) = env::var("SESSION_SIGNING_SALT") {
            config.signing_salt = salt;
        }
        if let Some(max_age) = parse_env::<u64>("SESSION_MAX_AGE")? {
            // 0 disables session token expiry
            config.session_max_age = (max_age > 0).then_some(max_age);
        }
        if let Some(encrypt) = parse_env_bool("SESSION_ENCRYPT_DATA")? {
            config.encrypt_data = encrypt;
        }
        if let Ok(transport) = env::var("SESSION_TRANSPORT") {
            config.transport = match transport.to_lowercase().as_str() {
                "cookie" => TransportKind::Cookie,
                "header" => TransportKind::Header,
                t => {
                    return Err(SessionError::Config(format!(
                        "Unsupported session transport: {t}. Supported values are 'cookie' and 'header'"
                    )));
                }
            };
        }
        if let Ok(name) = env::var("SESSION_COOKIE_NAME") {
            config.session_cookie.name = name;
        }
        if let Ok(domain) = env::var("SESSION_COOKIE_DOMAIN") {
            for cookie in config.cookies_mut() {
                cookie.domain = Some(domain.clone());
            }
        }
        if let Ok(path) = env::var("SESSION_COOKIE_PATH") {
            for cookie in config.cookies_mut() {
                cookie.path = path.clone();
            }
        }
        if let Some(secure) = parse_env_bool("SESSION_COOKIE_SECURE")? {
            for cookie in config.cookies_mut() {
                cookie.secure = secure;
            }
        }
        if let Ok(name) = env::var("CSRF_COOKIE_NAME") {
            config.csrf_cookie.name = name;
        }
        if let Ok(name) = env::var("CSRF_SUBMITTED_NAME") {
            config.csrf_submitted_name = name;
        }
        if let Some(max_age) = parse_env::<u64>("CSRF_TOKEN_MAX_AGE")? {
            config = config.with_csrf_token_max_age(Some(max_age));
        }
        if let Ok(name) = env::var("REFRESH_COOKIE_NAME") {
            config.refresh_cookie.name = name;
        }
        if let Some(max_age) = parse_env::<u64>("REFRESH_TOKEN_MAX_AGE")? {
            config = config.with_refresh_token_max_age(max_age);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.server_secret.len() < MIN_SERVER_SECRET_LEN {
            return Err(SessionError::Config(format!(
                "Server secret must be at least {MIN_SERVER_SECRET_LEN} characters long"
            )));
        }
        if self.refresh_token_max_age == 0 {
            return Err(SessionError::Config(
                "Refresh token max age must be greater than zero".to_string(),
            ));
        }
        let names = [
            &self.session_cookie.name,
            &self.csrf_cookie.name,
            &self.refresh_cookie.name,
        ];
        if names.iter().any(|n| n.is_empty()) {
            return Err(SessionError::Config("Cookie names must not be empty".to_string()));
        }
        if !all_distinct(&names) {
            return Err(SessionError::Config(
                "Session, CSRF and refresh cookies must have distinct names".to_string(),
            ));
        }

        let headers = [&self.session_header, &self.csrf_header, &self.refresh_header];
        let send = headers.map(|h| h.send_to_client_name.to_ascii_lowercase());
        let get = headers.map(|h| h.get_from_client_name.to_ascii_lowercase());
        if !all_distinct(&send.each_ref()) || !all_distinct(&get.each_ref()) {
            return Err(SessionError::Config(
                "Session, CSRF and refresh headers must have distinct names".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_signing_salt(mut self, salt: impl Into<String>) -> Self {
        self.signing_salt = salt.into();
        self
    }

    pub fn with_session_max_age(mut self, max_age: Option<u64>) -> Self {
        self.session_max_age = max_age;
        self
    }

    pub fn with_encrypt_data(mut self, encrypt: bool) -> Self {
        self.encrypt_data = encrypt;
        self
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        for cookie in self.cookies_mut() {
            cookie.secure = secure;
        }
        self
    }

    /// Lifetime of the CSRF cookie, independent of the session lifetime.
    ///
    /// Header slots carry no lifetime; a header client keeps the token until the
    /// server replaces or clears it.
    pub fn with_csrf_token_max_age(mut self, max_age: Option<u64>) -> Self {
        self.csrf_cookie.max_age = max_age;
        self
    }

    pub fn with_refresh_token_max_age(mut self, max_age: u64) -> Self {
        self.refresh_token_max_age = max_age;
        self.refresh_cookie.max_age = Some(max_age);
        self
    }

    fn cookies_mut(&mut self) -> [&mut CookieConfig; 3] {
        [
            &mut self.session_cookie,
            &mut self.csrf_cookie,
            &mut self.refresh_cookie,
        ]
    }
}

fn all_distinct(names: &[&String; 3]) -> bool {
    names[0] != names[1] && names[0] != names[2] && names[1] != names[2]
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, SessionError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| SessionError::Config(format!("Invalid value for {key}: {value}"))),
        Err(_) => Ok(None),
    }
}

fn parse_env_bool(key: &str) -> Result<Option<bool>, SessionError> {
    match env::var(key) {
        Ok(value) => match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(SessionError::Config(format!(
                "Invalid value for {key}: {value}"
            ))),
        },
        Err(_) => Ok(None),
    }
}
