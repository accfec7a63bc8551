//! Prioritized endpoint list.

/// Immutable list of completion endpoints, highest priority first.
#[derive(Debug, Clone)]
pub struct EndpointList {
    urls: Vec<String>,
}

impl EndpointList {
    /// Returns `None` for an empty list. Duplicates are dropped.
    pub fn new(urls: Vec<String>) -> Option<Self> {
        let mut deduped: Vec<String> = Vec::with_capacity(urls.len());
        for url in urls {
            if !deduped.contains(&url) {
                deduped.push(url);
            }
        }
        if deduped.is_empty() {
            return None;
        }
        Some(Self { urls: deduped })
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.urls.get(index).map(String::as_str)
    }

    pub fn index_of(&self, url: &str) -> Option<usize> {
        self.urls.iter().position(|u| u == url)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Order in which one call visits endpoints: the preferred index first,
    /// then every other endpoint in priority order.
    pub fn attempt_order(&self, preferred: Option<usize>) -> Vec<usize> {
        let preferred = preferred.filter(|&i| i < self.urls.len());
        let mut order = Vec::with_capacity(self.urls.len());
        if let Some(p) = preferred {
            order.push(p);
        }
        order.extend((0..self.urls.len()).filter(|&i| Some(i) != preferred));
        order
    }
}
