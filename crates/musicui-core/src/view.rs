//! Catalog view state: search text, page and the top-tracks toggle, and the
//! query they select.

/// Rows per catalog page.
pub const PAGE_SIZE: usize = 10;

/// Which of the three catalog reads is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewQuery {
    /// Substring match on the track name; unpaginated.
    SearchByName(String),
    /// Every track flagged as a top track; unpaginated.
    TopTracksOnly,
    /// One page of the full catalog. `page` is 1-based.
    Paged { page: usize, size: usize },
}

impl ViewQuery {
    /// Row offset for a paged read, `None` for the unpaginated reads.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Paged { page, size } => Some(page.saturating_sub(1) * size),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::SearchByName(text) => format!("search \"{}\"", text),
            Self::TopTracksOnly => "top tracks".to_string(),
            Self::Paged { page, .. } => format!("page {}", page),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogView {
    search: String,
    current_page: usize,
    top_tracks: bool,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self {
            search: String::new(),
            current_page: 1,
            top_tracks: false,
        }
    }
}

impl CatalogView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_text(&self) -> &str {
        &self.search
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn top_tracks(&self) -> bool {
        self.top_tracks
    }

    /// Replace the search text and go back to the first page.
    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search = text.into();
        self.current_page = 1;
    }

    pub fn toggle_top_tracks(&mut self) {
        self.top_tracks = !self.top_tracks;
        self.current_page = 1;
    }

    /// Pages are 1-based; anything lower is treated as the first page.
    /// The page only reaches the query while the search text is empty.
    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    /// Search beats the top-tracks toggle, which beats pagination.
    pub fn compute_query(&self) -> ViewQuery {
        if !self.search.is_empty() {
            ViewQuery::SearchByName(self.search.clone())
        } else if self.top_tracks {
            ViewQuery::TopTracksOnly
        } else {
            ViewQuery::Paged {
                page: self.current_page,
                size: PAGE_SIZE,
            }
        }
    }

    /// Number of page buttons derived from the loaded result length.
    pub fn page_count(&self, result_len: usize) -> usize {
        result_len.div_ceil(PAGE_SIZE)
    }

    /// Page controls are hidden while a search is active. Top-tracks mode
    /// keeps them, with the count taken from its unbounded result.
    pub fn pagination_visible(&self) -> bool {
        self.search.is_empty()
    }
}
