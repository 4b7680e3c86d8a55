use crate::storage::KeyValueStore;

/// Storage key of the selected page.
pub const PAGE_KEY: &str = "imageNum";

/// The 1-based page being viewed, persisted between sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageSelection {
    page: u32,
}

impl PageSelection {
    pub const DEFAULT_PAGE: u32 = 1;

    /// Reads the stored page, falling back to page 1.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let page = match store.get(PAGE_KEY) {
            None => Self::DEFAULT_PAGE,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(page) if page >= 1 => page,
                _ => {
                    log::warn!("Ignoring stored page index {raw:?}");
                    Self::DEFAULT_PAGE
                }
            },
        };
        Self { page }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Changes the page and writes it to `store`.
    ///
    /// A failed write is logged; the selection still changes for this session.
    pub fn set(&mut self, page: u32, store: &mut dyn KeyValueStore) {
        self.page = page;
        if let Err(e) = store.set(PAGE_KEY, &page.to_string()) {
            log::warn!("Failed to persist page {page}: {e}");
        }
    }
}

/// Page markers with exactly one highlighted.
#[derive(Clone, Debug)]
pub struct Pagination {
    markers: Vec<u32>,
    highlighted: usize,
}

impl Pagination {
    /// Markers `1..=page_count`, highlighting `selected` or else the first.
    pub fn new(page_count: u32, selected: u32) -> Self {
        let markers: Vec<u32> = (1..=page_count.max(1)).collect();
        let highlighted = markers.iter().position(|&m| m == selected).unwrap_or(0);
        Self {
            markers,
            highlighted,
        }
    }

    pub fn markers(&self) -> &[u32] {
        &self.markers
    }

    pub fn highlighted(&self) -> u32 {
        self.markers[self.highlighted]
    }

    pub fn is_highlighted(&self, page: u32) -> bool {
        self.highlighted() == page
    }

    /// Moves the highlight to `page`. Returns false if there is no such marker.
    pub fn highlight(&mut self, page: u32) -> bool {
        match self.markers.iter().position(|&m| m == page) {
            Some(idx) => {
                self.highlighted = idx;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_defaults_to_first_page() {
        let store = MemoryStore::default();
        assert_eq!(PageSelection::load(&store).page(), 1);
    }

    #[test]
    fn test_malformed_value_falls_back() {
        let mut store = MemoryStore::default();
        for raw in ["abc", "0", "-2", ""] {
            store.set(PAGE_KEY, raw).unwrap();
            assert_eq!(PageSelection::load(&store).page(), 1, "{raw:?}");
        }
    }

    #[test]
    fn test_set_persists() {
        let mut store = MemoryStore::default();
        let mut selection = PageSelection::load(&store);
        selection.set(3, &mut store);
        assert_eq!(selection.page(), 3);
        assert_eq!(store.get(PAGE_KEY).as_deref(), Some("3"));
        assert_eq!(PageSelection::load(&store).page(), 3);
    }

    #[test]
    fn test_exactly_one_marker_highlighted() {
        let mut pagination = Pagination::new(5, 2);
        assert_eq!(pagination.markers(), &[1, 2, 3, 4, 5]);
        assert!(pagination.is_highlighted(2));

        assert!(pagination.highlight(4));
        let lit: Vec<u32> = pagination
            .markers()
            .iter()
            .copied()
            .filter(|&m| pagination.is_highlighted(m))
            .collect();
        assert_eq!(lit, vec![4]);
    }

    #[test]
    fn test_unknown_page_highlights_first() {
        let mut pagination = Pagination::new(3, 9);
        assert_eq!(pagination.highlighted(), 1);
        assert!(!pagination.highlight(9));
        assert_eq!(pagination.highlighted(), 1);
    }
}
