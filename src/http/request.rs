//! Incoming request snapshots.
//!
//! # Responsibilities
//! - Assign each queued request a unique opaque identifier
//! - Split headers into a fixed well-known table and ordered extension headers
//! - Enforce the header byte budget (best effort: excess headers are dropped)
//!
//! # Design Decisions
//! - Snapshots own their data; nothing aliases the front end's buffers
//! - Well-known header order is the enumeration order of [`KnownHeader`]
//! - Extension header names are re-cased (`x-trace` → `X-Trace`) because the
//!   HTTP stack lowercases names on receipt

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::http::{HeaderMap, Method};
use uuid::Uuid;

/// Global atomic counter for request IDs.
/// Relaxed ordering is enough: only uniqueness matters.
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier correlating a request with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Generate a new unique request ID.
    pub fn next() -> Self {
        Self(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

macro_rules! known_headers {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Request headers with a dedicated slot in [`HeaderTable`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum KnownHeader {
            $($variant),+
        }

        impl KnownHeader {
            /// Every well-known header, in table order.
            pub const ALL: &'static [KnownHeader] = &[$(KnownHeader::$variant),+];

            /// Canonical header name.
            pub fn name(self) -> &'static str {
                match self {
                    $(KnownHeader::$variant => $name),+
                }
            }
        }
    };
}

known_headers! {
    CacheControl => "Cache-Control",
    Connection => "Connection",
    Date => "Date",
    KeepAlive => "Keep-Alive",
    Pragma => "Pragma",
    Trailer => "Trailer",
    TransferEncoding => "Transfer-Encoding",
    Upgrade => "Upgrade",
    Via => "Via",
    Warning => "Warning",
    Allow => "Allow",
    ContentLength => "Content-Length",
    ContentType => "Content-Type",
    ContentEncoding => "Content-Encoding",
    ContentLanguage => "Content-Language",
    ContentLocation => "Content-Location",
    ContentMd5 => "Content-MD5",
    ContentRange => "Content-Range",
    Expires => "Expires",
    LastModified => "Last-Modified",
    Accept => "Accept",
    AcceptCharset => "Accept-Charset",
    AcceptEncoding => "Accept-Encoding",
    AcceptLanguage => "Accept-Language",
    Authorization => "Authorization",
    Cookie => "Cookie",
    Expect => "Expect",
    From => "From",
    Host => "Host",
    IfMatch => "If-Match",
    IfModifiedSince => "If-Modified-Since",
    IfNoneMatch => "If-None-Match",
    IfRange => "If-Range",
    IfUnmodifiedSince => "If-Unmodified-Since",
    MaxForwards => "Max-Forwards",
    ProxyAuthorization => "Proxy-Authorization",
    Referer => "Referer",
    Range => "Range",
    Te => "TE",
    Translate => "Translate",
    UserAgent => "User-Agent",
}

impl KnownHeader {
    /// Number of slots in the well-known table.
    pub const COUNT: usize = Self::ALL.len();

    /// Look up a header name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|known| known.name().eq_ignore_ascii_case(name))
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Re-case a header name into `Train-Case`.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

/// Header set of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTable {
    known: Vec<Option<String>>,
    extension: Vec<(String, String)>,
}

impl HeaderTable {
    /// Empty table.
    pub fn new() -> Self {
        Self {
            known: vec![None; KnownHeader::COUNT],
            extension: Vec::new(),
        }
    }

    /// Add a header in receipt order.
    ///
    /// Repeated well-known headers are joined with `", "`.
    pub fn insert(&mut self, name: &str, value: &str) {
        match KnownHeader::from_name(name) {
            Some(known) => {
                let slot = &mut self.known[known.index()];
                match slot {
                    Some(existing) => {
                        existing.push_str(", ");
                        existing.push_str(value);
                    }
                    None => *slot = Some(value.to_string()),
                }
            }
            None => self.extension.push((name.to_string(), value.to_string())),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    /// Value of a well-known header.
    pub fn known(&self, header: KnownHeader) -> Option<&str> {
        self.known[header.index()].as_deref()
    }

    /// Extension headers in receipt order.
    pub fn extension(&self) -> &[(String, String)] {
        &self.extension
    }

    /// Every present header: well-known first in table order, then extension
    /// headers in receipt order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        let known = KnownHeader::ALL
            .iter()
            .filter_map(move |h| self.known(*h).map(|v| (h.name(), v)));
        let extension = self
            .extension
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()));
        known.chain(extension)
    }

    /// Number of present headers.
    pub fn len(&self) -> usize {
        self.known.iter().filter(|v| v.is_some()).count() + self.extension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HeaderTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable view of one request handed to the dispatch loop.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    /// Correlates the eventual response.
    pub id: RequestId,
    /// Correlation id for logs, returned as `X-Request-Id`.
    pub correlation_id: Uuid,
    pub method: Method,
    /// Absolute path, without the query string.
    pub path: String,
    pub headers: HeaderTable,
    /// Whether headers were dropped to respect the buffer budget.
    pub truncated: bool,
}

impl IncomingRequest {
    /// Request with no headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: RequestId::next(),
            correlation_id: Uuid::new_v4(),
            method,
            path: path.into(),
            headers: HeaderTable::new(),
            truncated: false,
        }
    }

    /// Builder-style header insertion.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Raw `Authorization` value, if present.
    pub fn authorization(&self) -> Option<&str> {
        self.headers.known(KnownHeader::Authorization)
    }

    /// Snapshot request parts from the HTTP stack.
    ///
    /// Header names and values count against `header_budget`; the first header
    /// that does not fit and every header after it are dropped.
    ///
    /// `HeaderMap` keeps names in first-arrival order but groups repeated
    /// values behind the first occurrence of their name, so a repeated
    /// extension header is listed (and budgeted) next to its first value
    /// rather than where it arrived.
    pub fn snapshot(method: &Method, path: &str, headers: &HeaderMap, header_budget: usize) -> Self {
        let mut request = Self::new(method.clone(), path);
        let mut remaining = header_budget;

        for (name, value) in headers {
            let cost = name.as_str().len() + value.len();
            if cost > remaining {
                request.truncated = true;
                break;
            }
            remaining -= cost;

            let value = String::from_utf8_lossy(value.as_bytes());
            let name = canonical_header_name(name.as_str());
            request.headers.insert(&name, &value);
        }

        if request.truncated {
            tracing::debug!(
                request_id = %request.id,
                budget = header_budget,
                kept = request.headers.len(),
                "Header buffer exhausted; processing with partial headers"
            );
        }
        request
    }
}
