//! FocusRing: manages keyboard focus cycling between components.

use crate::action::ComponentId;

pub struct FocusRing {
    items: Vec<ComponentId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<ComponentId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + self.items.len() - 1) % self.items.len();
        self.current()
    }

    pub fn set(&mut self, id: ComponentId) {
        if let Some(pos) = self.items.iter().position(|&x| x == id) {
            self.current = pos;
        }
    }

    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.current() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle() {
        let mut ring = FocusRing::new(vec![ComponentId::TrackList, ComponentId::NowPlaying]);
        assert!(ring.is_focused(ComponentId::TrackList));
        assert_eq!(ring.next(), Some(ComponentId::NowPlaying));
        assert_eq!(ring.next(), Some(ComponentId::TrackList));
        assert_eq!(ring.prev(), Some(ComponentId::NowPlaying));
    }

    #[test]
    fn test_set_and_empty() {
        let mut ring = FocusRing::new(vec![ComponentId::TrackList, ComponentId::NowPlaying]);
        ring.set(ComponentId::NowPlaying);
        assert!(ring.is_focused(ComponentId::NowPlaying));

        let mut empty = FocusRing::new(Vec::new());
        assert_eq!(empty.next(), None);
        assert_eq!(empty.current(), None);
    }
}
