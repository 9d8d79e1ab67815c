//! Forgiving page-number pagination shared by every post list.
//!
//! The requested page comes from an untrusted query parameter. It never
//! produces an error: missing or garbage input means the first page, and
//! out-of-range numbers clamp to the nearest valid page.

use serde::Serialize;

/// Page size for every post list (index, group, profile, feed).
pub const POSTS_PER_PAGE: u64 = 10;

/// Resolves requested page numbers against a result count.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(POSTS_PER_PAGE)
    }
}

impl Paginator {
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of pages for `count` items. An empty sequence still has one page.
    pub fn num_pages(&self, count: u64) -> u64 {
        count.div_ceil(self.per_page).max(1)
    }

    /// Pick the page to show for a raw `page` parameter.
    pub fn resolve(&self, count: u64, requested: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) if n < 1 => 1,
            Some(Ok(n)) => (n as u64).min(num_pages),
            _ => 1,
        };

        PageWindow {
            number,
            num_pages,
            count,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }

    /// Paginate an already materialised, ordered sequence.
    pub fn page_of<T>(&self, items: Vec<T>, requested: Option<&str>) -> Page<T> {
        let window = self.resolve(items.len() as u64, requested);
        let slice = items
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .collect();
        window.into_page(slice)
    }
}

/// The slice of a result set a page covers, before items are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
        }
    }
}

/// One page of results plus navigation metadata. Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    /// 1-based index of the first item on this page, 0 for an empty page.
    pub fn start_index(&self, per_page: u64) -> u64 {
        if self.count == 0 {
            0
        } else {
            (self.number - 1) * per_page + 1
        }
    }

    /// 1-based index of the last item on this page.
    pub fn end_index(&self, per_page: u64) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.start_index(per_page) + self.items.len() as u64 - 1
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
        }
    }
}
