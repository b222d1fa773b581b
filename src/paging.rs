use serde::Serialize;

use crate::types::Paging;

/// Zero-based offset for a 1-indexed page. A missing page means page 1.
/// Saturates instead of wrapping on absurd page numbers.
pub fn calculate_offset(page: Option<u32>, limit: u32) -> u32 {
    limit.saturating_mul(page.unwrap_or(1).max(1) - 1)
}

/// The uniform list shape handed to page views.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub base_url: String,
    pub page: u32,
    pub items: Vec<T>,
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
    /// Link to the following page, present only while `offset + limit < total`.
    pub next: Option<String>,
}

impl<T> Envelope<T> {
    pub fn new(base_url: &str, page: Option<u32>, limit: u32, items: Vec<T>, total: u32) -> Self {
        let page = page.unwrap_or(1).max(1);
        let offset = calculate_offset(Some(page), limit);
        let next = (offset.saturating_add(limit) < total)
            .then(|| format!("{}/pages/{}", base_url, page.saturating_add(1)));
        Self {
            base_url: base_url.to_string(),
            page,
            items,
            total,
            limit,
            offset,
            next,
        }
    }

    /// Wrap an upstream paging object, keeping its total.
    pub fn from_paging(base_url: &str, page: Option<u32>, limit: u32, paging: Paging<T>) -> Self {
        Self::new(base_url, page, limit, paging.items, paging.total)
    }

    /// The empty-safe fallback used when an aggregator gives up.
    pub fn empty(base_url: &str, page: Option<u32>, limit: u32) -> Self {
        Self::new(base_url, page, limit, Vec::new(), 0)
    }

    pub fn previous(&self) -> Option<String> {
        match self.page {
            0 | 1 => None,
            2 => Some(self.base_url.clone()),
            p => Some(format!("{}/pages/{}", self.base_url, p - 1)),
        }
    }
}

/// Slice one page out of an in-memory candidate list.
pub fn paginate<T>(base_url: &str, page: Option<u32>, limit: u32, all: Vec<T>) -> Envelope<T> {
    let total = all.len() as u32;
    let offset = calculate_offset(page, limit) as usize;
    let items = all.into_iter().skip(offset).take(limit as usize).collect();
    Envelope::new(base_url, page, limit, items, total)
}
