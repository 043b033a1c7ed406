/// What to fetch next in a paginated listing.
///
/// Both variants hold an endpoint relative to the provider's API root.
/// `Next` values only come out of a [`PageEnvelope`] produced by the same
/// listing; cursors are forward-only and single-use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// The initial query (filters, sort, page size)
    First(String),
    /// A continuation extracted from the previous page
    Next(String),
}

impl PageRequest {
    pub fn first(endpoint: impl Into<String>) -> Self {
        Self::First(endpoint.into())
    }

    /// Turn a provider's raw `next` link into a continuation.
    ///
    /// Empty links mean the listing is exhausted. Links that start with the
    /// provider's API `origin` are made relative to it; anything else is
    /// taken as already relative.
    pub fn continuation(origin: &str, raw: Option<&str>) -> Option<Self> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
        let origin = origin.trim_end_matches('/');

        let relative = match raw.strip_prefix(origin) {
            Some(rest) if origin.is_empty() => rest,
            Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') => {
                rest.trim_start_matches('/')
            }
            _ => raw,
        };

        Some(Self::Next(relative.to_string()))
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Self::First(endpoint) | Self::Next(endpoint) => endpoint,
        }
    }
}

/// One decoded page.
///
/// `size` and `page` are informational only; the walk ends when `next` is
/// absent, never because of these counters.
#[derive(Debug, Clone)]
pub struct PageEnvelope<T> {
    pub items: Vec<T>,
    pub next: Option<PageRequest>,
    pub size: Option<u64>,
    pub page: Option<u64>,
}

impl<T> PageEnvelope<T> {
    pub fn new(items: Vec<T>, next: Option<PageRequest>) -> Self {
        Self {
            items,
            next,
            size: None,
            page: None,
        }
    }
}
