//! Paginated collections: an ordered sequence of pages, each with its
//! records and the cursor of the page that follows it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub records: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, next_cursor: Option<String>) -> Self {
        Self {
            records,
            next_cursor,
        }
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            next_cursor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfiniteData<T> {
    pub pages: Vec<Page<T>>,
    /// Cursor each page was requested with (`None` for the first page)
    #[serde(default)]
    pub page_params: Vec<Option<String>>,
}

impl<T> InfiniteData<T> {
    /// Collection holding only its first page
    pub fn first(page: Page<T>) -> Self {
        Self {
            pages: vec![page],
            page_params: vec![None],
        }
    }

    /// Collection with one empty first page
    pub fn empty() -> Self {
        Self::first(Page::empty())
    }

    pub fn push_page(&mut self, cursor: Option<String>, page: Page<T>) {
        self.pages.push(page);
        self.page_params.push(cursor);
    }

    /// Cursor for the next page, if any
    pub fn next_cursor(&self) -> Option<&str> {
        self.pages.last().and_then(|p| p.next_cursor.as_deref())
    }

    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|p| p.records.iter())
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.pages.iter_mut().flat_map(|p| p.records.iter_mut())
    }

    /// Drop every record matching the predicate; returns how many were removed
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = 0;
        for page in &mut self.pages {
            let before = page.records.len();
            page.records.retain(|r| !predicate(r));
            removed += before - page.records.len();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|p| p.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
