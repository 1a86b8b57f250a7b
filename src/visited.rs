use std::collections::HashSet;
use url::Url;

/// Outcome of asking the visited set to admit a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The URL is now marked visited and must be processed
    Admitted,
    /// The URL was scheduled earlier in this crawl
    AlreadyVisited,
    /// The page budget is used up
    BudgetExhausted,
}

/// URLs dispatched for crawling, bounded by the page budget.
///
/// Marking happens at schedule time, before any I/O, so a page that links
/// back to itself or to an ancestor is never scheduled twice. The set only
/// grows during a crawl.
#[derive(Debug)]
pub struct VisitedSet {
    max_pages: usize,
    seen: HashSet<String>,
    order: Vec<Url>,
}

impl VisitedSet {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            seen: HashSet::new(),
            order: Vec::new(),
        }
    }

    /// Check the budget and membership, then mark `url` visited if it passes.
    pub fn admit(&mut self, url: &Url) -> Admission {
        if self.is_exhausted() {
            return Admission::BudgetExhausted;
        }
        if !self.seen.insert(url.as_str().to_string()) {
            return Admission::AlreadyVisited;
        }
        self.order.push(url.clone());
        Admission::Admitted
    }

    pub fn is_exhausted(&self) -> bool {
        self.order.len() >= self.max_pages
    }

    #[cfg(test)]
    fn contains(&self, url: &Url) -> bool {
        self.seen.contains(url.as_str())
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// Visited URLs in admission order
    pub fn into_order(self) -> Vec<Url> {
        self.order
    }
}
