//! Scrollable cursor list.

pub struct ScrollableList<T> {
    pub items: Vec<T>,
    pub selected: usize,
    pub scroll_offset: usize,
}

impl<T> Default for ScrollableList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
            scroll_offset: 0,
        }
    }
}

impl<T> ScrollableList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the items; the cursor goes back to the top.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + n).min(self.items.len() - 1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    pub fn select_index(&mut self, idx: usize) {
        if idx < self.items.len() {
            self.selected = idx;
        }
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    /// Returns (index, &item) pairs visible in `height` rows.
    /// Call ensure_visible first to update scroll_offset.
    pub fn visible_items(&self, height: usize) -> Vec<(usize, &T)> {
        if height == 0 || self.items.is_empty() {
            return Vec::new();
        }
        let end = (self.scroll_offset + height).min(self.items.len());
        (self.scroll_offset..end).map(|i| (i, &self.items[i])).collect()
    }

    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }

    /// Handle a click at `row` within the rendered area.
    /// Returns true if `row` landed on an item.
    pub fn handle_click(&mut self, row: usize) -> bool {
        let target = self.scroll_offset + row;
        if target < self.items.len() {
            self.selected = target;
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(n: usize) -> ScrollableList<usize> {
        let mut l = ScrollableList::new();
        l.set_items((0..n).collect());
        l
    }

    #[test]
    fn test_cursor_bounds() {
        let mut l = list(3);
        l.select_up(1);
        assert_eq!(l.selected, 0);
        l.select_down(10);
        assert_eq!(l.selected, 2);
        l.select_first();
        assert_eq!(l.selected_item(), Some(&0));
        l.select_last();
        assert_eq!(l.selected_item(), Some(&2));
    }

    #[test]
    fn test_empty_list() {
        let mut l = list(0);
        l.select_down(1);
        l.select_last();
        assert_eq!(l.selected, 0);
        assert!(l.selected_item().is_none());
        assert!(l.visible_items(5).is_empty());
    }

    #[test]
    fn test_scrolls_to_cursor() {
        let mut l = list(20);
        l.select_index(12);
        l.ensure_visible(5);
        assert_eq!(l.scroll_offset, 8);
        let rows: Vec<usize> = l.visible_items(5).into_iter().map(|(i, _)| i).collect();
        assert_eq!(rows, vec![8, 9, 10, 11, 12]);

        l.select_up(10);
        l.ensure_visible(5);
        assert_eq!(l.scroll_offset, 2);
    }

    #[test]
    fn test_click() {
        let mut l = list(4);
        assert!(l.handle_click(2));
        assert_eq!(l.selected, 2);
        assert!(!l.handle_click(9));
        assert_eq!(l.selected, 2);
    }

    #[test]
    fn test_set_items_resets_cursor() {
        let mut l = list(10);
        l.select_index(7);
        l.set_items(vec![1, 2]);
        assert_eq!(l.selected, 0);
        assert_eq!(l.len(), 2);
    }
}
