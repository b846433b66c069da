//! MAPI/HTTP session context: request numbering and the cookie jar that
//! ties requests to the server-side session.

use uuid::Uuid;

/// A cookie as set by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
}

impl Cookie {
    /// Create a cookie.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse the `name=value` part of a `Set-Cookie` header value; the
    /// attributes after the first `;` are dropped.
    #[must_use]
    pub fn parse_set_cookie(header: &str) -> Option<Self> {
        let pair = header.split(';').next()?;
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, value.trim()))
    }

    /// Cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Cookies returned by the last exchange.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    /// Empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a jar from `Set-Cookie` header values. A later cookie with the
    /// same name overrides an earlier one.
    pub fn from_set_cookie<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut jar = Self::new();
        for cookie in headers.into_iter().filter_map(Cookie::parse_set_cookie) {
            jar.insert(cookie);
        }
        jar
    }

    /// Add a cookie, replacing one with the same name.
    pub fn insert(&mut self, cookie: Cookie) {
        match self.cookies.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
    }

    /// Value of the named cookie.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(Cookie::value)
    }

    /// Number of cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether the jar is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Value for a `Cookie` request header, or `None` when empty.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Some(pairs.join("; "))
    }
}

/// State of one bound MAPI/HTTP session.
///
/// Created when bind is sent and dropped at unbind; the jar is replaced
/// wholesale by the cookies of every response.
#[derive(Debug, Clone)]
pub struct HttpSession {
    id: Uuid,
    counter: u32,
    cookies: CookieJar,
}

impl HttpSession {
    /// Start a session with a fresh identifier and an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// Start a session with a known identifier.
    #[must_use]
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            counter: 0,
            cookies: CookieJar::new(),
        }
    }

    /// Session identifier used in request IDs.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Requests sent so far.
    #[must_use]
    pub fn request_count(&self) -> u32 {
        self.counter
    }

    /// Next `X-RequestId` value: `{session-uuid}:counter`.
    pub fn next_request_id(&mut self) -> String {
        self.counter = self.counter.wrapping_add(1);
        format!("{{{}}}:{}", self.id.hyphenated(), self.counter)
    }

    /// Current cookies.
    #[must_use]
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Replace the jar with the cookies of the latest response.
    pub fn replace_cookies(&mut self, jar: CookieJar) {
        self.cookies = jar;
    }
}

impl Default for HttpSession {
    fn default() -> Self {
        Self::new()
    }
}
