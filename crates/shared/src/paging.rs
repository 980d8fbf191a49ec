use serde::{Deserialize, Serialize};

/// Default and maximum page size accepted by one list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

pub const DIRECTORY_LIMITS: PageLimits = PageLimits {
    default_limit: 10,
    max_limit: 100,
};

pub const RESIDENT_REQUEST_LIMITS: PageLimits = PageLimits {
    default_limit: 10,
    max_limit: 100,
};

pub const ADMIN_REQUEST_LIMITS: PageLimits = PageLimits {
    default_limit: 20,
    max_limit: 500,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Lenient parse of raw query values: anything unparsable, zero, or above
    /// the cap falls back to the defaults.
    pub fn parse(page: Option<&str>, limit: Option<&str>, limits: PageLimits) -> Self {
        let page = page
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|page| *page > 0)
            .unwrap_or(1);
        let limit = limit
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|limit| *limit > 0 && *limit <= limits.max_limit)
            .unwrap_or(limits.default_limit);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub pages: u32,
}

impl PageMeta {
    pub fn new(total: i64, request: PageRequest) -> Self {
        Self {
            total,
            page: request.page,
            limit: request.limit,
            pages: page_count(total, request.limit),
        }
    }
}

/// `max(1, ceil(total / limit))`
pub fn page_count(total: i64, limit: u32) -> u32 {
    if total <= 0 || limit == 0 {
        return 1;
    }
    let limit = i64::from(limit);
    let pages = (total + limit - 1) / limit;
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

/// Client-side pagination state for one list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,
    pub limit: u32,
    pub pages: u32,
    pub total: i64,
}

impl PageCursor {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            pages: 1,
            total: 0,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    /// Returns whether the page changed.
    pub fn next(&mut self) -> bool {
        if self.has_next() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.has_prev() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn set_limit(&mut self, limit: u32) {
        if limit > 0 {
            self.limit = limit;
            self.page = 1;
        }
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Adopts what the server reported. A missing `pages` is derived from the
    /// total.
    pub fn apply(&mut self, page: Option<u32>, pages: Option<u32>, total: Option<i64>) {
        let total = total.unwrap_or(0);
        self.total = total;
        if let Some(page) = page.filter(|page| *page > 0) {
            self.page = page;
        }
        self.pages = pages
            .filter(|pages| *pages > 0)
            .unwrap_or_else(|| page_count(total, self.limit));
    }

    pub fn request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            limit: self.limit,
        }
    }
}
