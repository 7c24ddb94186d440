use http::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use http_session::{SessionConfig, TransportKind};
use std::collections::HashMap;

/// Mock browser for integration testing
///
/// Keeps what the server hands out, the way a browser or an API client would, and
/// replays it on the next request. With the cookie transport it acts as a cookie
/// jar; with the header transport it stores the values of the send headers and
/// echoes them on the matching get headers.
#[derive(Clone)]
pub struct MockBrowser {
    config: SessionConfig,
    /// Slot values keyed by cookie name (cookie transport) or request header name
    /// (header transport)
    jar: HashMap<String, String>,
}

impl MockBrowser {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            config: config.clone(),
            jar: HashMap::new(),
        }
    }

    fn slot_keys(&self) -> [String; 3] {
        match self.config.transport {
            TransportKind::Cookie => [
                self.config.session_cookie.name.clone(),
                self.config.csrf_cookie.name.clone(),
                self.config.refresh_cookie.name.clone(),
            ],
            TransportKind::Header => [
                self.config.session_header.get_from_client_name.clone(),
                self.config.csrf_header.get_from_client_name.clone(),
                self.config.refresh_header.get_from_client_name.clone(),
            ],
        }
    }

    pub fn session(&self) -> Option<&str> {
        let [session, _, _] = self.slot_keys();
        self.jar.get(&session).map(String::as_str)
    }

    pub fn csrf(&self) -> Option<&str> {
        let [_, csrf, _] = self.slot_keys();
        self.jar.get(&csrf).map(String::as_str)
    }

    pub fn refresh(&self) -> Option<&str> {
        let [_, _, refresh] = self.slot_keys();
        self.jar.get(&refresh).map(String::as_str)
    }

    /// Overwrite the held session value, e.g. with an expired or forged token
    pub fn set_session(&mut self, value: &str) {
        let [session, _, _] = self.slot_keys();
        self.jar.insert(session, value.to_string());
    }

    /// Overwrite the held refresh value
    pub fn set_refresh(&mut self, value: &str) {
        let [_, _, refresh] = self.slot_keys();
        self.jar.insert(refresh, value.to_string());
    }

    /// Request headers carrying everything the browser holds
    pub fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match self.config.transport {
            TransportKind::Cookie => {
                if !self.jar.is_empty() {
                    let cookies = self
                        .jar
                        .iter()
                        .map(|(name, value)| format!("{name}={value}"))
                        .collect::<Vec<_>>()
                        .join("; ");
                    headers.insert(COOKIE, HeaderValue::from_str(&cookies).unwrap());
                }
            }
            TransportKind::Header => {
                for (name, value) in &self.jar {
                    headers.insert(
                        HeaderName::from_bytes(name.as_bytes()).unwrap(),
                        HeaderValue::from_str(value).unwrap(),
                    );
                }
            }
        }
        headers
    }

    /// Request headers that also echo the CSRF token, as client script would
    pub fn request_headers_with_csrf(&self) -> HeaderMap {
        let mut headers = self.request_headers();
        if let Some(csrf) = self.csrf() {
            headers.insert(
                HeaderName::from_bytes(self.config.csrf_submitted_name.as_bytes()).unwrap(),
                HeaderValue::from_str(csrf).unwrap(),
            );
        }
        headers
    }

    /// Take in a response's headers
    pub fn receive(&mut self, response: &HeaderMap) {
        match self.config.transport {
            TransportKind::Cookie => {
                for set_cookie in response.get_all(SET_COOKIE) {
                    let set_cookie = set_cookie.to_str().unwrap();
                    let (pair, attributes) =
                        set_cookie.split_once(';').unwrap_or((set_cookie, ""));
                    let (name, value) = pair.split_once('=').unwrap();
                    if value.is_empty() || attributes.contains("Max-Age=0") {
                        self.jar.remove(name);
                    } else {
                        self.jar.insert(name.to_string(), value.to_string());
                    }
                }
            }
            TransportKind::Header => {
                for config in [
                    &self.config.session_header,
                    &self.config.csrf_header,
                    &self.config.refresh_header,
                ] {
                    let Some(value) = response.get(config.send_to_client_name.as_str()) else {
                        continue;
                    };
                    let value = value.to_str().unwrap();
                    if value.is_empty() {
                        self.jar.remove(&config.get_from_client_name);
                    } else {
                        self.jar
                            .insert(config.get_from_client_name.clone(), value.to_string());
                    }
                }
            }
        }
    }
}
