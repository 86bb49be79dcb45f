use std::fmt;
use std::iter::FusedIterator;

use super::{Position, PositionError, Stamps};

/// Index of the sentinel node. Its `next` is the head and its `prev` is the tail.
const SENTINEL: usize = 0;

#[derive(Clone, Copy)]
struct Node<T> {
    value: Option<T>,
    prev: usize,
    next: usize,
    stamp: u64,
}

impl<T> Node<T> {
    fn sentinel() -> Self {
        Self {
            value: None,
            prev: SENTINEL,
            next: SENTINEL,
            stamp: 0,
        }
    }
}

/// A doubly-linked list whose nodes live in an index arena.
///
/// Pushing at either end and inserting or removing at a [`Position`] take constant time.
#[derive(Clone)]
pub struct LinkedList<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    len: usize,
    stamps: Stamps,
}

/// An iterator over the elements of a `LinkedList`.
///
/// This `struct` is created by [`LinkedList::iter`].
pub struct Iter<'a, T> {
    list: &'a LinkedList<T>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.len).finish()
    }
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<T> LinkedList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::sentinel()],
            free: Vec::new(),
            len: 0,
            stamps: Stamps::new(),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of the first element, or [`Position::END`] if the list is empty.
    pub fn begin(&self) -> Position {
        self.position_of(self.nodes[SENTINEL].next)
    }

    /// The end position.
    pub fn end(&self) -> Position {
        Position::END
    }

    /// Position following `pos`. Advancing past the last element yields the end position.
    pub fn next(&self, pos: Position) -> Result<Position, PositionError> {
        let index = self.resolve(pos)?;
        Ok(self.position_of(self.nodes[index].next))
    }

    /// Position preceding `pos`. The predecessor of the end position is the last element, and
    /// the predecessor of the first element is the end position.
    pub fn prev(&self, pos: Position) -> Result<Position, PositionError> {
        let index = if pos.is_end() {
            SENTINEL
        } else {
            self.resolve(pos)?
        };
        Ok(self.position_of(self.nodes[index].prev))
    }

    /// The element at `pos`.
    pub fn get(&self, pos: Position) -> Result<&T, PositionError> {
        let index = self.resolve(pos)?;
        self.nodes[index].value.as_ref().ok_or(PositionError::Stale)
    }

    /// The element at `pos`, mutably.
    pub fn get_mut(&mut self, pos: Position) -> Result<&mut T, PositionError> {
        let index = self.resolve(pos)?;
        self.nodes[index].value.as_mut().ok_or(PositionError::Stale)
    }

    /// The first element.
    pub fn front(&self) -> Option<&T> {
        self.nodes[self.nodes[SENTINEL].next].value.as_ref()
    }

    /// The first element, mutably.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        let head = self.nodes[SENTINEL].next;
        self.nodes[head].value.as_mut()
    }

    /// The last element.
    pub fn back(&self) -> Option<&T> {
        self.nodes[self.nodes[SENTINEL].prev].value.as_ref()
    }

    /// The last element, mutably.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        let tail = self.nodes[SENTINEL].prev;
        self.nodes[tail].value.as_mut()
    }

    /// Adds an element to the front of the list.
    pub fn push_front(&mut self, value: T) -> Position {
        self.link_after(SENTINEL, value)
    }

    /// Adds an element to the back of the list.
    pub fn push_back(&mut self, value: T) -> Position {
        let tail = self.nodes[SENTINEL].prev;
        self.link_after(tail, value)
    }

    /// Inserts `value` right after `pos`. Inserting at the end position appends.
    pub fn insert(&mut self, pos: Position, value: T) -> Result<Position, PositionError> {
        if pos.is_end() {
            return Ok(self.push_back(value));
        }
        let index = self.resolve(pos)?;
        Ok(self.link_after(index, value))
    }

    /// Removes the element at `pos`, returning it with the position that followed it.
    pub fn remove(&mut self, pos: Position) -> Result<(T, Position), PositionError> {
        let index = self.resolve(pos)?;
        let next = self.position_of(self.nodes[index].next);
        let value = self.unlink(index).ok_or(PositionError::Stale)?;
        Ok((value, next))
    }

    /// Removes and returns the first element.
    pub fn pop_front(&mut self) -> Option<T> {
        match self.nodes[SENTINEL].next {
            SENTINEL => None,
            head => self.unlink(head),
        }
    }

    /// Removes and returns the last element.
    pub fn pop_back(&mut self) -> Option<T> {
        match self.nodes[SENTINEL].prev {
            SENTINEL => None,
            tail => self.unlink(tail),
        }
    }

    /// Removes all elements. Every outstanding position becomes stale.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[SENTINEL] = Node::sentinel();
        self.free.clear();
        self.len = 0;
    }

    /// Iterates over the elements from front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            head: self.nodes[SENTINEL].next,
            tail: self.nodes[SENTINEL].prev,
            len: self.len,
        }
    }

    fn position_of(&self, index: usize) -> Position {
        if index == SENTINEL {
            Position::END
        } else {
            Position::new(index, self.nodes[index].stamp)
        }
    }

    fn resolve(&self, pos: Position) -> Result<usize, PositionError> {
        if pos.is_end() {
            return Err(PositionError::End);
        }
        match self.nodes.get(pos.index()) {
            Some(node) if node.stamp != 0 && node.stamp == pos.stamp() => Ok(pos.index()),
            _ => Err(PositionError::Stale),
        }
    }

    fn link_after(&mut self, prev: usize, value: T) -> Position {
        let next = self.nodes[prev].next;
        let node = Node {
            value: Some(value),
            prev,
            next,
            stamp: self.stamps.next(),
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.nodes[prev].next = index;
        self.nodes[next].prev = index;
        self.len += 1;
        self.position_of(index)
    }

    fn unlink(&mut self, index: usize) -> Option<T> {
        let Node { prev, next, .. } = self.nodes[index];
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        let node = &mut self.nodes[index];
        node.stamp = 0;
        let value = node.value.take();
        self.len -= 1;

        if self.len == 0 {
            // Back to a lone sentinel.
            self.nodes.truncate(1);
            self.free.clear();
        } else {
            self.free.push(index);
        }
        value
    }
}

impl<T> Default for LinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for LinkedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for LinkedList<T> {}

impl<T> FromIterator<T> for LinkedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<T> Extend<T> for LinkedList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            let _ = self.push_back(value);
        }
    }
}

impl<'a, T> IntoIterator for &'a LinkedList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.len == 0 {
            return None;
        }
        let node = &self.list.nodes[self.head];
        self.head = node.next;
        self.len -= 1;
        node.value.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.len == 0 {
            return None;
        }
        let node = &self.list.nodes[self.tail];
        self.tail = node.prev;
        self.len -= 1;
        node.value.as_ref()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_places_after_position() {
        let mut list = LinkedList::new();
        let a = list.push_back(1);
        let _ = list.push_back(3);
        let _ = list.insert(a, 2).unwrap();
        let _ = list.insert(Position::END, 4).unwrap();
        assert!(list.iter().copied().eq([1, 2, 3, 4]));
    }

    #[test]
    fn removing_neighbor_keeps_position_valid() {
        let mut list: LinkedList<_> = (0..4).collect();
        let first = list.begin();
        let second = list.next(first).unwrap();
        let third = list.next(second).unwrap();

        let (value, next) = list.remove(second).unwrap();
        assert_eq!(value, 1);
        assert_eq!(next, third);
        assert_eq!(list.get(first), Ok(&0));
        assert_eq!(list.get(third), Ok(&2));
        assert_eq!(list.get(second), Err(PositionError::Stale));

        // The freed slot is reused under a new stamp.
        let reused = list.push_front(9);
        assert_eq!(reused.index(), second.index());
        assert_eq!(list.get(second), Err(PositionError::Stale));
    }

    #[test]
    fn emptying_restores_initial_state() {
        let mut list = LinkedList::new();
        let pos = list.push_back(5);
        let (_, next) = list.remove(pos).unwrap();
        assert!(next.is_end());
        assert!(list.is_empty());
        assert_eq!(list.begin(), Position::END);
        assert_eq!(list.nodes.len(), 1);
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
    }

    #[test]
    fn prev_walks_backwards_from_end() {
        let list: LinkedList<_> = (0..3).collect();
        let last = list.prev(Position::END).unwrap();
        assert_eq!(list.get(last), Ok(&2));
        let first = list.begin();
        assert_eq!(list.prev(first), Ok(Position::END));
        assert_eq!(list.next(Position::END), Err(PositionError::End));
    }
}
