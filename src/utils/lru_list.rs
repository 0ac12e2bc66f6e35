//! Arena-backed doubly-linked recency list.
//!
//! Nodes live in a `Vec` and refer to their neighbours by index, so splicing
//! a node in or out is O(1) without any reference cycles. Two sentinels are
//! always present:
//!
//! * `HEAD` sits on the most-recently-used side (`HEAD.prev` is the MRU entry)
//! * `TAIL` sits on the least-recently-used side (`TAIL.next` is the LRU entry)
//!
//! The links form a ring, so an empty list is simply `TAIL <-> HEAD`.

use bevy::log::error;

use crate::error::{PathCacheError, Result};

/// Handle to a slot in an [`LruList`].
pub type NodeId = usize;

/// Most-recently-used sentinel.
pub const HEAD: NodeId = 0;
/// Least-recently-used sentinel.
pub const TAIL: NodeId = 1;

/// Extra steps a bounded walk tolerates past the expected length.
pub const WALK_SLACK: usize = 4;

#[derive(Debug, Clone)]
struct Node<T> {
    value: Option<T>,
    prev: NodeId,
    next: NodeId,
    linked: bool,
}

impl<T> Node<T> {
    fn sentinel(prev: NodeId, next: NodeId) -> Self {
        Self {
            value: None,
            prev,
            next,
            linked: true,
        }
    }
}

/// Outcome of a bounded traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Walk {
    /// Real entries visited before the walk stopped.
    pub count: usize,
    /// True when the walk was aborted because the links are inconsistent.
    pub corrupted: bool,
}

/// Doubly-linked list whose nodes are stored in a slab with a free list.
#[derive(Debug, Clone)]
pub struct LruList<T> {
    nodes: Vec<Node<T>>,
    free: Vec<NodeId>,
}

impl<T> Default for LruList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LruList<T> {
    /// Creates an empty list holding only the two sentinels.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::sentinel(TAIL, TAIL), Node::sentinel(HEAD, HEAD)],
            free: Vec::new(),
        }
    }

    /// Creates an empty list with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut list = Self::new();
        list.nodes.reserve(capacity);
        list
    }

    /// Reserves an empty, unlinked node, reusing a freed one if possible.
    fn alloc_slot(&mut self) -> NodeId {
        if let Some(id) = self.free.pop() {
            let node = &mut self.nodes[id];
            node.value = None;
            node.prev = id;
            node.next = id;
            node.linked = false;
            id
        } else {
            let id = self.nodes.len();
            self.nodes.push(Node {
                value: None,
                prev: id,
                next: id,
                linked: false,
            });
            id
        }
    }

    /// Splices `node` in directly on the least-recently-used side of `anchor`.
    ///
    /// Anchoring on `HEAD` makes `node` the most-recently-used entry.
    pub fn link_before(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        if anchor == TAIL || !self.is_linked(anchor) {
            return Err(PathCacheError::InvalidAnchor(anchor));
        }
        if !self.holds_value(node) || self.nodes[node].linked {
            return Err(PathCacheError::DetachedNode(node));
        }

        self.splice_before(anchor, node);
        Ok(())
    }

    fn splice_before(&mut self, anchor: NodeId, node: NodeId) {
        let before = self.nodes[anchor].prev;
        self.nodes[node].prev = before;
        self.nodes[node].next = anchor;
        self.nodes[before].next = node;
        self.nodes[anchor].prev = node;
        self.nodes[node].linked = true;
    }

    /// Splices `node` out, reconnecting its neighbours to each other.
    ///
    /// Sentinels and nodes that are not currently linked are rejected.
    pub fn unlink(&mut self, node: NodeId) -> Result<()> {
        if node == HEAD || node == TAIL || !self.is_linked(node) {
            return Err(PathCacheError::DetachedNode(node));
        }

        let Node { prev, next, .. } = self.nodes[node];
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;

        let n = &mut self.nodes[node];
        n.prev = node;
        n.next = node;
        n.linked = false;
        Ok(())
    }

    /// Moves a linked node to the most-recently-used end.
    pub fn promote(&mut self, node: NodeId) -> Result<()> {
        self.unlink(node)?;
        self.link_before(HEAD, node)
    }

    /// Allocates `value` and links it as the most-recently-used entry.
    pub fn push_mru(&mut self, value: T) -> (NodeId, &T) {
        let id = self.alloc_slot();
        // HEAD is always linked and a fresh slot never is.
        self.splice_before(HEAD, id);
        (id, &*self.nodes[id].value.insert(value))
    }

    /// Frees an unlinked node and hands back its value.
    fn release(&mut self, node: NodeId) -> Option<T> {
        if node == HEAD || node == TAIL || self.is_linked(node) {
            return None;
        }
        let value = self.nodes.get_mut(node)?.value.take();
        if value.is_some() {
            self.free.push(node);
        }
        value
    }

    /// Unlinks and frees a node in one step.
    pub fn remove(&mut self, node: NodeId) -> Result<T> {
        self.unlink(node)?;
        self.release(node).ok_or(PathCacheError::DetachedNode(node))
    }

    /// The least-recently-used entry, if any.
    pub fn lru(&self) -> Option<NodeId> {
        let id = self.nodes[TAIL].next;
        (id != HEAD).then_some(id)
    }

    /// The most-recently-used entry, if any.
    pub fn mru(&self) -> Option<NodeId> {
        let id = self.nodes[HEAD].prev;
        (id != TAIL).then_some(id)
    }

    /// Neighbour on the least-recently-used side.
    pub fn prev(&self, node: NodeId) -> NodeId {
        self.nodes[node].prev
    }

    /// Neighbour on the most-recently-used side.
    pub fn next(&self, node: NodeId) -> NodeId {
        self.nodes[node].next
    }

    pub fn is_linked(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|n| n.linked)
    }

    fn holds_value(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|n| n.value.is_some())
    }

    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.nodes.get(node).and_then(|n| n.value.as_ref())
    }

    /// Drops every entry, keeping only the sentinels.
    pub fn clear(&mut self) {
        self.nodes.truncate(2);
        self.nodes[HEAD] = Node::sentinel(TAIL, TAIL);
        self.nodes[TAIL] = Node::sentinel(HEAD, HEAD);
        self.free.clear();
    }

    /// Iterates values from least- to most-recently used.
    pub fn iter_lru(&self) -> IterLru<'_, T> {
        IterLru {
            list: self,
            cursor: self.nodes[TAIL].next,
            remaining: self.nodes.len(),
        }
    }

    /// Counts real entries from the MRU sentinel toward the LRU sentinel,
    /// giving up after `limit` steps.
    ///
    /// Should never report corruption while every splice goes through
    /// `link_before`/`unlink`. Self-links, short cycles that skip the
    /// sentinels, and overruns are logged and end the walk early.
    pub fn walk_len(&self, limit: usize) -> Walk {
        let mut count = 0;
        let mut cursor = self.nodes[HEAD].prev;

        while cursor != TAIL {
            if count >= limit {
                error!(
                    "LRU list: walk exceeded {} steps without reaching the tail",
                    limit
                );
                return Walk { count, corrupted: true };
            }
            let Some(node) = self.nodes.get(cursor) else {
                error!("LRU list: link points outside the arena ({})", cursor);
                return Walk { count, corrupted: true };
            };
            if cursor == HEAD || node.prev == cursor {
                error!("LRU list: node {} links back to itself", cursor);
                return Walk { count, corrupted: true };
            }
            if self.is_short_cycle(cursor) {
                error!("LRU list: node {} sits on a 3-cycle", cursor);
                return Walk { count, corrupted: true };
            }
            count += 1;
            cursor = node.prev;
        }

        Walk { count, corrupted: false }
    }

    fn is_short_cycle(&self, node: NodeId) -> bool {
        let a = self.nodes[node].prev;
        let b = self.nodes.get(a).map(|n| n.prev);
        let c = b.and_then(|b| self.nodes.get(b)).map(|n| n.prev);
        match (b, c) {
            (Some(b), Some(c)) => {
                c == node && ![a, b].iter().any(|&id| id == HEAD || id == TAIL)
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_prev_for_test(&mut self, node: NodeId, prev: NodeId) {
        self.nodes[node].prev = prev;
    }
}

/// Iterator returned by [`LruList::iter_lru`].
pub struct IterLru<'a, T> {
    list: &'a LruList<T>,
    cursor: NodeId,
    remaining: usize,
}

impl<'a, T> Iterator for IterLru<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor != HEAD && self.remaining > 0 {
            self.remaining -= 1;
            let id = self.cursor;
            let node = self.list.nodes.get(id)?;
            self.cursor = node.next;
            if let Some(value) = node.value.as_ref() {
                return Some((id, value));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(list: &LruList<&'static str>) -> Vec<&'static str> {
        list.iter_lru().map(|(_, v)| *v).collect()
    }

    #[test]
    fn test_empty_list_sentinels() {
        let list: LruList<&str> = LruList::new();
        assert_eq!(list.prev(HEAD), TAIL);
        assert_eq!(list.next(TAIL), HEAD);
        assert_eq!(list.lru(), None);
        assert_eq!(list.mru(), None);
        assert_eq!(list.walk_len(10), Walk { count: 0, corrupted: false });
    }

    #[test]
    fn test_link_relinks_all_four_pointers() {
        let mut list = LruList::new();
        let a = list.push_mru("a").0;

        assert_eq!(list.prev(HEAD), a);
        assert_eq!(list.next(a), HEAD);
        assert_eq!(list.prev(a), TAIL);
        assert_eq!(list.next(TAIL), a);

        let b = list.push_mru("b").0;
        assert_eq!(list.prev(HEAD), b);
        assert_eq!(list.next(b), HEAD);
        assert_eq!(list.prev(b), a);
        assert_eq!(list.next(a), b);
        assert_eq!(order(&list), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_then_relink_becomes_mru() {
        let mut list = LruList::new();
        let a = list.push_mru("a").0;
        let _b = list.push_mru("b").0;
        let _c = list.push_mru("c").0;

        list.unlink(a).unwrap();
        assert!(!list.is_linked(a));
        assert_eq!(order(&list), vec!["b", "c"]);

        list.link_before(HEAD, a).unwrap();
        assert_eq!(list.mru(), Some(a));
        assert_eq!(order(&list), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_push_hands_back_stored_value() {
        let mut list = LruList::new();
        let (id, value) = list.push_mru("a");
        assert_eq!(*value, "a");
        assert_eq!(list.get(id), Some(&"a"));
    }

    #[test]
    fn test_promote_moves_to_mru() {
        let mut list = LruList::new();
        let a = list.push_mru("a").0;
        let b = list.push_mru("b").0;
        list.promote(a).unwrap();
        assert_eq!(list.mru(), Some(a));
        assert_eq!(list.lru(), Some(b));
    }

    #[test]
    fn test_unlink_detached_or_sentinel_is_rejected() {
        let mut list = LruList::new();
        let a = list.push_mru("a").0;
        list.unlink(a).unwrap();

        assert!(matches!(list.unlink(a), Err(PathCacheError::DetachedNode(_))));
        assert!(matches!(list.unlink(HEAD), Err(PathCacheError::DetachedNode(_))));
        assert!(matches!(list.unlink(TAIL), Err(PathCacheError::DetachedNode(_))));
        assert!(matches!(
            list.link_before(TAIL, a),
            Err(PathCacheError::InvalidAnchor(TAIL))
        ));
    }

    #[test]
    fn test_released_slots_are_reused() {
        let mut list = LruList::new();
        let a = list.push_mru("a").0;
        assert_eq!(list.remove(a).unwrap(), "a");
        let b = list.push_mru("b").0;
        assert_eq!(a, b);
        assert_eq!(order(&list), vec!["b"]);
    }

    #[test]
    fn test_walk_detects_self_link() {
        let mut list = LruList::new();
        let _a = list.push_mru("a").0;
        let b = list.push_mru("b").0;
        list.set_prev_for_test(b, b);

        let walk = list.walk_len(10);
        assert!(walk.corrupted);
        assert_eq!(walk.count, 0);
    }

    #[test]
    fn test_walk_detects_three_cycle() {
        let mut list = LruList::new();
        let a = list.push_mru("a").0;
        let _b = list.push_mru("b").0;
        let c = list.push_mru("c").0;
        // c -> b -> a -> c, never reaching TAIL
        list.set_prev_for_test(a, c);

        let walk = list.walk_len(100);
        assert!(walk.corrupted);
        assert!(walk.count < 3);
    }

    #[test]
    fn test_walk_is_bounded() {
        let mut list = LruList::new();
        for name in ["a", "b", "c", "d", "e"] {
            list.push_mru(name);
        }
        let walk = list.walk_len(3);
        assert!(walk.corrupted);
        assert_eq!(walk.count, 3);
        assert_eq!(list.walk_len(5 + WALK_SLACK).count, 5);
    }

    #[test]
    fn test_clear_resets_sentinels() {
        let mut list = LruList::new();
        list.push_mru("a");
        list.push_mru("b");
        list.clear();
        assert_eq!(list.prev(HEAD), TAIL);
        assert_eq!(list.next(TAIL), HEAD);
        assert_eq!(list.iter_lru().count(), 0);
    }
}
