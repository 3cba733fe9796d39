use super::phase::PassengerId;
use std::collections::VecDeque;

/// FIFO line in front of the car. Only the head may board.
#[derive(Debug, Clone, Default)]
pub struct FairnessQueue {
    line: VecDeque<PassengerId>,
}

impl FairnessQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id` to the back of the line. Returns `false` if already in line.
    pub fn enqueue(&mut self, id: PassengerId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.line.push_back(id);
        true
    }

    /// Removes `id` only when it is at the head of the line.
    pub fn dequeue_if_head(&mut self, id: PassengerId) -> bool {
        if self.head() == Some(id) {
            self.line.pop_front();
            true
        } else {
            false
        }
    }

    /// Removes `id` wherever it stands.
    pub fn remove(&mut self, id: PassengerId) -> bool {
        match self.line.iter().position(|p| *p == id) {
            Some(index) => {
                self.line.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn head(&self) -> Option<PassengerId> {
        self.line.front().copied()
    }

    pub fn contains(&self, id: PassengerId) -> bool {
        self.line.contains(&id)
    }

    /// 1-based place in line.
    pub fn position(&self, id: PassengerId) -> Option<usize> {
        self.line.iter().position(|p| *p == id).map(|i| i + 1)
    }

    pub fn len(&self) -> usize {
        self.line.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PassengerId> {
        self.line.iter()
    }
}
