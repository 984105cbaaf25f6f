/// Bounded visit history, newest entry first.
///
/// `position` is a cursor into `entries`; `back` moves towards older
/// entries, `forward` towards newer ones. Adding an entry resets the
/// cursor to the newest one.
#[derive(Debug, Clone)]
pub struct History<T> {
    max: usize,
    entries: Vec<T>,
    position: usize,
}

impl<T: PartialEq + Clone> History<T> {
    pub fn new(max: usize) -> Self {
        Self {
            max: max.max(1),
            entries: Vec::new(),
            position: 0,
        }
    }

    /// Restores a saved history, newest first.
    pub fn from_entries(max: usize, entries: Vec<T>) -> Self {
        let mut history = Self::new(max);
        history.entries = entries;
        history.entries.truncate(history.max);
        history
    }

    pub fn add(&mut self, item: T) {
        if let Some(position) = self.entries.iter().position(|i| *i == item) {
            // seen before: move it to the front
            let item = self.entries.remove(position);
            self.entries.insert(0, item);
        } else {
            self.entries.insert(0, item);
        }
        self.entries.truncate(self.max);
        self.position = 0;
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.position)
    }

    pub fn can_back(&self) -> bool {
        self.position + 1 < self.entries.len()
    }

    pub fn can_forward(&self) -> bool {
        self.position > 0
    }

    pub fn first(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        self.position = self.entries.len() - 1;
        self.current().cloned()
    }

    pub fn back(&mut self) -> Option<T> {
        if !self.can_back() {
            return None;
        }
        self.position += 1;
        self.current().cloned()
    }

    pub fn forward(&mut self) -> Option<T> {
        if !self.can_forward() {
            return None;
        }
        self.position -= 1;
        self.current().cloned()
    }

    pub fn last(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        self.position = 0;
        self.current().cloned()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor back to a position returned by [`History::position`].
    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.entries.len().saturating_sub(1));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn export(&self) -> Vec<T> {
        self.entries.clone()
    }
}
