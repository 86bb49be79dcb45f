//! Arena-backed red-black tree.
//!
//! Slot 0 is a black sentinel standing in for every leaf and for the root's parent. The removal
//! fix-up may temporarily write the sentinel's parent link, which nothing else reads.
//!
//! When a node with two children is removed, its in-order successor is relinked into its place
//! rather than having its key moved, so a position naming the successor stays valid.

use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;

use thiserror::Error;

use super::{Comparator, NaturalOrder, Position, PositionError, Stamps};

const NIL: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Clone, Copy)]
struct Node<K> {
    key: Option<K>,
    color: Color,
    parent: usize,
    left: usize,
    right: usize,
    stamp: u64,
}

impl<K> Node<K> {
    fn sentinel() -> Self {
        Self {
            key: None,
            color: Color::Black,
            parent: NIL,
            left: NIL,
            right: NIL,
            stamp: 0,
        }
    }
}

/// A broken red-black tree invariant, as reported by [`RbTree::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The root is red.
    #[error("the root is red")]
    RedRoot,
    /// A red node has a red child.
    #[error("red node at slot {0} has a red child")]
    RedChild(usize),
    /// Two paths from one node down to the leaves cross different numbers of black nodes.
    #[error("black heights below slot {node} differ: {left} on the left, {right} on the right")]
    BlackHeight {
        /// Slot of the unbalanced node.
        node: usize,
        /// Black height of the left subtree.
        left: usize,
        /// Black height of the right subtree.
        right: usize,
    },
    /// In-order traversal yields a key smaller than its predecessor.
    #[error("key at slot {0} is smaller than its in-order predecessor")]
    Order(usize),
    /// A child does not point back at its parent.
    #[error("slot {0} does not point back at its parent")]
    ParentLink(usize),
    /// The number of reachable nodes disagrees with the cached length.
    #[error("{reachable} nodes are reachable but the length is {len}")]
    Length {
        /// Nodes reachable from the root.
        reachable: usize,
        /// Cached length.
        len: usize,
    },
}

/// A red-black tree of keys ordered by a [`Comparator`], allowing duplicates.
#[derive(Clone)]
pub struct RbTree<K, C = NaturalOrder> {
    nodes: Vec<Node<K>>,
    free: Vec<usize>,
    root: usize,
    len: usize,
    stamps: Stamps,
    cmp: C,
}

/// An in-order iterator over the keys of an `RbTree`.
pub struct Iter<'a, K, C> {
    tree: &'a RbTree<K, C>,
    front: usize,
    back: usize,
    len: usize,
}

impl<K, C> fmt::Debug for Iter<'_, K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.len).finish()
    }
}

impl<K, C> Clone for Iter<'_, K, C> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<K> RbTree<K> {
    /// Creates an empty tree in the natural order of `K`.
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, C: Default> Default for RbTree<K, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, C> RbTree<K, C> {
    /// Creates an empty tree ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            nodes: vec![Node::sentinel()],
            free: Vec::new(),
            root: NIL,
            len: 0,
            stamps: Stamps::new(),
            cmp,
        }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The comparator ordering the tree.
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// The key at `pos`.
    pub fn get(&self, pos: Position) -> Result<&K, PositionError> {
        let index = self.resolve(pos)?;
        Ok(self.key(index))
    }

    /// The key at `pos`, mutably. The caller must not change how the key orders.
    pub(crate) fn get_mut(&mut self, pos: Position) -> Result<&mut K, PositionError> {
        let index = self.resolve(pos)?;
        self.nodes[index].key.as_mut().ok_or(PositionError::Stale)
    }

    /// Position of the smallest key.
    pub fn minimum(&self) -> Option<Position> {
        (self.root != NIL).then(|| self.position_of(self.min_from(self.root)))
    }

    /// Position of the largest key.
    pub fn maximum(&self) -> Option<Position> {
        (self.root != NIL).then(|| self.position_of(self.max_from(self.root)))
    }

    /// In-order successor of `pos`, or the end position after the largest key.
    pub fn successor(&self, pos: Position) -> Result<Position, PositionError> {
        let index = self.resolve(pos)?;
        Ok(self.position_of(self.next_index(index)))
    }

    /// In-order predecessor of `pos`. The predecessor of the end position is the largest key, and
    /// the predecessor of the smallest key is the end position.
    pub fn predecessor(&self, pos: Position) -> Result<Position, PositionError> {
        if pos.is_end() {
            return Ok(self.maximum().unwrap_or(Position::END));
        }
        let index = self.resolve(pos)?;
        Ok(self.position_of(self.prev_index(index)))
    }

    /// Position of the leftmost key for which `locate` returns `Equal`.
    ///
    /// `locate` compares a stored key against the target and must be consistent with the tree's
    /// ordering.
    pub fn find_by<F>(&self, mut locate: F) -> Option<Position>
    where
        F: FnMut(&K) -> Ordering,
    {
        let mut cursor = self.root;
        let mut found = NIL;
        while cursor != NIL {
            match locate(self.key(cursor)) {
                Ordering::Less => cursor = self.nodes[cursor].right,
                Ordering::Greater => cursor = self.nodes[cursor].left,
                Ordering::Equal => {
                    found = cursor;
                    cursor = self.nodes[cursor].left;
                }
            }
        }
        (found != NIL).then(|| self.position_of(found))
    }

    /// Position of the first key for which `locate` does not return `Less`.
    pub fn lower_bound_by<F>(&self, mut locate: F) -> Position
    where
        F: FnMut(&K) -> Ordering,
    {
        let mut cursor = self.root;
        let mut bound = NIL;
        while cursor != NIL {
            if locate(self.key(cursor)) == Ordering::Less {
                cursor = self.nodes[cursor].right;
            } else {
                bound = cursor;
                cursor = self.nodes[cursor].left;
            }
        }
        self.position_of(bound)
    }

    /// Removes the key at `pos`, returning it with the position of its in-order successor.
    pub fn remove(&mut self, pos: Position) -> Result<(K, Position), PositionError> {
        let z = self.resolve(pos)?;
        let successor = self.next_index(z);

        if self.nodes[z].left != NIL && self.nodes[z].right != NIL {
            self.swap_with_successor(z, successor);
        }

        // `z` now has at most one child.
        let child = if self.nodes[z].left != NIL {
            self.nodes[z].left
        } else {
            self.nodes[z].right
        };
        let parent = self.nodes[z].parent;
        self.nodes[child].parent = parent;
        self.replace_child(parent, z, child);

        if self.nodes[z].color == Color::Black {
            self.remove_fixup(child);
        }

        let key = self.release(z).ok_or(PositionError::Stale)?;
        Ok((key, self.position_of(successor)))
    }

    /// Removes every key. Outstanding positions become stale.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[NIL] = Node::sentinel();
        self.free.clear();
        self.root = NIL;
        self.len = 0;
    }

    /// Iterates over the keys in order.
    pub fn iter(&self) -> Iter<'_, K, C> {
        let (front, back) = if self.root == NIL {
            (NIL, NIL)
        } else {
            (self.min_from(self.root), self.max_from(self.root))
        };
        Iter {
            tree: self,
            front,
            back,
            len: self.len,
        }
    }

    fn key(&self, index: usize) -> &K {
        match &self.nodes[index].key {
            Some(key) => key,
            None => unreachable!("only occupied slots are linked into the tree"),
        }
    }

    fn color(&self, index: usize) -> Color {
        self.nodes[index].color
    }

    fn set_color(&mut self, index: usize, color: Color) {
        self.nodes[index].color = color;
    }

    fn parent(&self, index: usize) -> usize {
        self.nodes[index].parent
    }

    fn position_of(&self, index: usize) -> Position {
        if index == NIL {
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

    fn min_from(&self, mut index: usize) -> usize {
        while self.nodes[index].left != NIL {
            index = self.nodes[index].left;
        }
        index
    }

    fn max_from(&self, mut index: usize) -> usize {
        while self.nodes[index].right != NIL {
            index = self.nodes[index].right;
        }
        index
    }

    fn next_index(&self, mut index: usize) -> usize {
        if self.nodes[index].right != NIL {
            return self.min_from(self.nodes[index].right);
        }
        let mut parent = self.parent(index);
        while parent != NIL && index == self.nodes[parent].right {
            index = parent;
            parent = self.parent(parent);
        }
        parent
    }

    fn prev_index(&self, mut index: usize) -> usize {
        if self.nodes[index].left != NIL {
            return self.max_from(self.nodes[index].left);
        }
        let mut parent = self.parent(index);
        while parent != NIL && index == self.nodes[parent].left {
            index = parent;
            parent = self.parent(parent);
        }
        parent
    }

    fn alloc(&mut self, key: K, parent: usize) -> usize {
        let node = Node {
            key: Some(key),
            color: Color::Red,
            parent,
            left: NIL,
            right: NIL,
            stamp: self.stamps.next(),
        };
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize) -> Option<K> {
        let node = &mut self.nodes[index];
        node.stamp = 0;
        node.parent = NIL;
        node.left = NIL;
        node.right = NIL;
        let key = node.key.take();
        self.len -= 1;
        if self.len == 0 {
            self.clear();
        } else {
            self.free.push(index);
        }
        key
    }

    /// Makes `new` the child of `parent` that `old` was, or the root if `parent` is the sentinel.
    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        if parent == NIL {
            self.root = new;
        } else if self.nodes[parent].left == old {
            self.nodes[parent].left = new;
        } else {
            self.nodes[parent].right = new;
        }
    }

    fn rotate_left(&mut self, x: usize) {
        let y = self.nodes[x].right;
        let inner = self.nodes[y].left;
        self.nodes[x].right = inner;
        if inner != NIL {
            self.nodes[inner].parent = x;
        }
        let parent = self.parent(x);
        self.nodes[y].parent = parent;
        self.replace_child(parent, x, y);
        self.nodes[y].left = x;
        self.nodes[x].parent = y;
    }

    fn rotate_right(&mut self, x: usize) {
        let y = self.nodes[x].left;
        let inner = self.nodes[y].right;
        self.nodes[x].left = inner;
        if inner != NIL {
            self.nodes[inner].parent = x;
        }
        let parent = self.parent(x);
        self.nodes[y].parent = parent;
        self.replace_child(parent, x, y);
        self.nodes[y].right = x;
        self.nodes[x].parent = y;
    }

    fn attach(&mut self, parent: usize, go_left: bool, key: K) -> Position {
        let index = self.alloc(key, parent);
        if parent == NIL {
            self.root = index;
        } else if go_left {
            self.nodes[parent].left = index;
        } else {
            self.nodes[parent].right = index;
        }
        self.len += 1;
        self.insert_fixup(index);
        self.position_of(index)
    }

    fn insert_fixup(&mut self, mut z: usize) {
        while self.color(self.parent(z)) == Color::Red {
            let p = self.parent(z);
            let g = self.parent(p);
            if p == self.nodes[g].left {
                let uncle = self.nodes[g].right;
                if self.color(uncle) == Color::Red {
                    self.set_color(p, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(g, Color::Red);
                    z = g;
                } else {
                    if z == self.nodes[p].right {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.nodes[g].left;
                if self.color(uncle) == Color::Red {
                    self.set_color(p, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(g, Color::Red);
                    z = g;
                } else {
                    if z == self.nodes[p].left {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    /// Puts the successor `s` of `z` where `z` is and `z` where `s` was, swapping their colors.
    /// `z` has two children, so `s` is the leftmost node of its right subtree and has no left
    /// child.
    fn swap_with_successor(&mut self, z: usize, s: usize) {
        let z_parent = self.nodes[z].parent;
        let z_left = self.nodes[z].left;
        let z_right = self.nodes[z].right;
        let s_right = self.nodes[s].right;

        self.replace_child(z_parent, z, s);
        self.nodes[s].left = z_left;
        self.nodes[z_left].parent = s;
        self.nodes[z].left = NIL;

        if s == z_right {
            self.nodes[s].right = z;
            self.nodes[z].parent = s;
        } else {
            let s_parent = self.nodes[s].parent;
            self.replace_child(s_parent, s, z);
            self.nodes[z].parent = s_parent;
            self.nodes[s].right = z_right;
            self.nodes[z_right].parent = s;
        }

        self.nodes[z].right = s_right;
        if s_right != NIL {
            self.nodes[s_right].parent = z;
        }
        self.nodes[s].parent = z_parent;

        let z_color = self.color(z);
        let s_color = self.color(s);
        self.set_color(z, s_color);
        self.set_color(s, z_color);
    }

    fn remove_fixup(&mut self, mut x: usize) {
        while x != self.root && self.color(x) == Color::Black {
            let p = self.parent(x);
            if x == self.nodes[p].left {
                let mut w = self.nodes[p].right;
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_left(p);
                    w = self.nodes[self.parent(x)].right;
                }
                let (near, far) = (self.nodes[w].left, self.nodes[w].right);
                if self.color(near) == Color::Black && self.color(far) == Color::Black {
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(far) == Color::Black {
                        self.set_color(near, Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_right(w);
                        w = self.nodes[self.parent(x)].right;
                    }
                    let p = self.parent(x);
                    let far = self.nodes[w].right;
                    self.set_color(w, self.color(p));
                    self.set_color(p, Color::Black);
                    self.set_color(far, Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                }
            } else {
                let mut w = self.nodes[p].left;
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_right(p);
                    w = self.nodes[self.parent(x)].left;
                }
                let (near, far) = (self.nodes[w].right, self.nodes[w].left);
                if self.color(near) == Color::Black && self.color(far) == Color::Black {
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(far) == Color::Black {
                        self.set_color(near, Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_left(w);
                        w = self.nodes[self.parent(x)].left;
                    }
                    let p = self.parent(x);
                    let far = self.nodes[w].left;
                    self.set_color(w, self.color(p));
                    self.set_color(p, Color::Black);
                    self.set_color(far, Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                }
            }
        }
        self.set_color(x, Color::Black);
        // The sentinel may have been used as `x`; keep it black.
        self.set_color(NIL, Color::Black);
    }
}

impl<K, C: Comparator<K>> RbTree<K, C> {
    /// Inserts `key`, replacing an equal key if one is present.
    pub fn insert(&mut self, key: K) -> Position {
        let mut parent = NIL;
        let mut cursor = self.root;
        let mut go_left = false;
        while cursor != NIL {
            parent = cursor;
            match self.cmp.compare(&key, self.key(cursor)) {
                Ordering::Equal => {
                    self.nodes[cursor].key = Some(key);
                    return self.position_of(cursor);
                }
                Ordering::Less => {
                    go_left = true;
                    cursor = self.nodes[cursor].left;
                }
                Ordering::Greater => {
                    go_left = false;
                    cursor = self.nodes[cursor].right;
                }
            }
        }
        self.attach(parent, go_left, key)
    }

    /// Inserts `key` after any equal keys.
    pub fn insert_multi(&mut self, key: K) -> Position {
        let mut parent = NIL;
        let mut cursor = self.root;
        let mut go_left = false;
        while cursor != NIL {
            parent = cursor;
            go_left = self.cmp.compare(&key, self.key(cursor)) == Ordering::Less;
            cursor = if go_left {
                self.nodes[cursor].left
            } else {
                self.nodes[cursor].right
            };
        }
        self.attach(parent, go_left, key)
    }

    /// Position of the leftmost key equal to `key`.
    pub fn find(&self, key: &K) -> Option<Position> {
        self.find_by(|stored| self.cmp.compare(stored, key))
    }

    /// Checks every red-black invariant, returning the black height of the tree.
    pub fn validate(&self) -> Result<usize, InvariantViolation> {
        if self.color(self.root) == Color::Red {
            return Err(InvariantViolation::RedRoot);
        }
        if self.root != NIL && self.parent(self.root) != NIL {
            return Err(InvariantViolation::ParentLink(self.root));
        }
        let height = self.check_subtree(self.root)?;

        let mut reachable = 0;
        let mut prev: Option<&K> = None;
        let mut cursor = if self.root == NIL {
            NIL
        } else {
            self.min_from(self.root)
        };
        while cursor != NIL {
            let key = self.key(cursor);
            if let Some(prev) = prev {
                if self.cmp.compare(prev, key) == Ordering::Greater {
                    return Err(InvariantViolation::Order(cursor));
                }
            }
            prev = Some(key);
            reachable += 1;
            if reachable > self.len {
                break;
            }
            cursor = self.next_index(cursor);
        }
        if reachable != self.len {
            return Err(InvariantViolation::Length {
                reachable,
                len: self.len,
            });
        }
        Ok(height)
    }

    fn check_subtree(&self, index: usize) -> Result<usize, InvariantViolation> {
        if index == NIL {
            return Ok(1);
        }
        let node = &self.nodes[index];
        for child in [node.left, node.right] {
            if child != NIL && self.parent(child) != index {
                return Err(InvariantViolation::ParentLink(child));
            }
            if node.color == Color::Red && self.color(child) == Color::Red {
                return Err(InvariantViolation::RedChild(index));
            }
        }
        let left = self.check_subtree(node.left)?;
        let right = self.check_subtree(node.right)?;
        if left != right {
            return Err(InvariantViolation::BlackHeight {
                node: index,
                left,
                right,
            });
        }
        Ok(left + usize::from(node.color == Color::Black))
    }
}

impl<K: fmt::Debug, C> fmt::Debug for RbTree<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, K, C> IntoIterator for &'a RbTree<K, C> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, C> Iterator for Iter<'a, K, C> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        if self.len == 0 {
            return None;
        }
        let key = self.tree.key(self.front);
        self.front = self.tree.next_index(self.front);
        self.len -= 1;
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, K, C> DoubleEndedIterator for Iter<'a, K, C> {
    fn next_back(&mut self) -> Option<&'a K> {
        if self.len == 0 {
            return None;
        }
        let key = self.tree.key(self.back);
        self.back = self.tree.prev_index(self.back);
        self.len -= 1;
        Some(key)
    }
}

impl<K, C> ExactSizeIterator for Iter<'_, K, C> {}

impl<K, C> FusedIterator for Iter<'_, K, C> {}
