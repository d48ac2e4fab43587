//! An ordered map implemented with an AVL tree.

use std::borrow::Borrow;
use std::cmp::{self, Ordering};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::ControlFlow;
use std::ptr::{self, NonNull};

use tracing::trace;

use crate::error::{Error, Result};

mod cursor;

pub use cursor::{Cursor, CursorMut, RevCursor};

/// An ordered map implemented with an AVL tree.
///
/// ```
/// use avl_dict::AvlTreeMap;
/// let mut map = AvlTreeMap::new();
/// map.insert(0, "zero");
/// map.insert(1, "one");
/// map.insert(2, "two");
/// assert_eq!(map.get(&1), Some(&"one"));
/// map.remove(&1);
/// assert!(map.get(&1).is_none());
/// assert!(map.find(&1).is_end());
/// ```
pub struct AvlTreeMap<K, V> {
    root: Link<K, V>,
    marker: PhantomData<Box<Node<K, V>>>,
}

struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
    parent: Link<K, V>,
    height: usize,
}

type NodePtr<K, V> = NonNull<Node<K, V>>;
type Link<K, V> = Option<NodePtr<K, V>>;
type LinkPtr<K, V> = NonNull<Link<K, V>>;

/// The order in which [`AvlTreeMap::traverse`] visits the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Node before its left and right subtrees.
    #[default]
    Preorder,
    /// Left subtree, node, right subtree: ascending key order.
    Inorder,
    /// Left and right subtrees before the node.
    Postorder,
}

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

/// An iterator over the entries of a map, sorted by key.
pub struct Iter<'a, K, V> {
    front: Link<K, V>,
    back: Link<K, V>,
    marker: PhantomData<&'a Node<K, V>>,
}

/// A mutable iterator over the entries of a map, sorted by key.
pub struct IterMut<'a, K, V> {
    front: Link<K, V>,
    back: Link<K, V>,
    marker: PhantomData<&'a mut Node<K, V>>,
}

/// An iterator over the keys of a map, in ascending order.
pub struct Keys<'a, K, V> {
    iter: Iter<'a, K, V>,
}

/// An iterator over the values of a map, in key order.
pub struct Values<'a, K, V> {
    iter: Iter<'a, K, V>,
}

/// Prints one `key: .., value: ..` line per entry in a given traversal order.
///
/// This `struct` is created by the [`display`] method on [`AvlTreeMap`].
///
/// [`display`]: AvlTreeMap::display
pub struct DisplayOrder<'a, K, V> {
    map: &'a AvlTreeMap<K, V>,
    order: Order,
}

impl<K, V> AvlTreeMap<K, V> {
    /// Creates an empty map.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self {
            root: None,
            marker: PhantomData,
        }
    }

    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of elements in the map.
    ///
    /// The map does not keep a count, so this walks every node.
    pub fn len(&self) -> usize {
        let mut num_nodes = 0;
        let _ = self.walk(Order::Inorder, |_| {
            num_nodes += 1;
            ControlFlow::<()>::Continue(())
        });
        num_nodes
    }

    /// Returns the height of the tree, 0 for an empty map.
    pub fn height(&self) -> usize {
        Node::height(self.root)
    }

    /// Clears the map, deallocating all memory.
    ///
    /// The map is emptied before any node is freed. Should dropping a key or
    /// value panic, the remaining nodes leak and the map stays usable.
    pub fn clear(&mut self) {
        let root = self.root.take();
        let _ = Self::walk_from(root, Order::Postorder, |node_ptr| {
            unsafe { Node::destroy(node_ptr) };
            ControlFlow::<()>::Continue(())
        });
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            front: self.root.map(Node::min),
            back: self.root.map(Node::max),
            marker: PhantomData,
        }
    }

    /// Gets a mutable iterator over the entries of the map, sorted by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            front: self.root.map(Node::min),
            back: self.root.map(Node::max),
            marker: PhantomData,
        }
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { iter: self.iter() }
    }

    /// Gets an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { iter: self.iter() }
    }

    /// Returns a cursor at the entry with the smallest key,
    /// or the end cursor if the map is empty.
    pub fn begin(&self) -> Cursor<'_, K, V> {
        Cursor::new(self, self.root.map(Node::min))
    }

    /// Returns the end cursor, which points past the entry with the largest key.
    pub fn end(&self) -> Cursor<'_, K, V> {
        Cursor::new(self, None)
    }

    /// Returns a reverse cursor at the entry with the largest key,
    /// or the reverse end cursor if the map is empty.
    pub fn rbegin(&self) -> RevCursor<'_, K, V> {
        RevCursor::new(Cursor::new(self, self.root.map(Node::max)))
    }

    /// Returns the reverse end cursor, which points before the entry with the smallest key.
    pub fn rend(&self) -> RevCursor<'_, K, V> {
        RevCursor::new(Cursor::new(self, None))
    }

    /// Returns a mutable cursor at the entry with the smallest key.
    pub fn begin_mut(&mut self) -> CursorMut<'_, K, V> {
        let node = self.root.map(Node::min);
        CursorMut::new(self, node)
    }

    /// Visits every entry in the given order.
    ///
    /// The visitor gets a read-only cursor for each entry. Returning
    /// [`ControlFlow::Break`] stops the traversal at once; the break value
    /// is passed back to the caller.
    ///
    /// ```
    /// use std::ops::ControlFlow;
    /// use avl_dict::{AvlTreeMap, Order};
    ///
    /// let map: AvlTreeMap<_, _> = [(11, 'a'), (12, 'b'), (13, 'c')].into_iter().collect();
    /// let mut keys = Vec::new();
    /// let _ = map.traverse(Order::Preorder, |cursor| {
    ///     keys.push(*cursor.key());
    ///     ControlFlow::<()>::Continue(())
    /// });
    /// assert_eq!(keys, [12, 11, 13]);
    /// ```
    pub fn traverse<'a, B, F>(&'a self, order: Order, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(Cursor<'a, K, V>) -> ControlFlow<B>,
    {
        self.walk(order, |node_ptr| visitor(Cursor::new(self, Some(node_ptr))))
    }

    /// Returns a cursor at the first entry, in the given traversal order,
    /// for which the predicate holds, or the end cursor if there is none.
    pub fn find_first<P>(&self, order: Order, mut predicate: P) -> Cursor<'_, K, V>
    where
        P: FnMut(&K, &V) -> bool,
    {
        let found = self.traverse(order, |cursor| match cursor.get() {
            Some((key, value)) if predicate(key, value) => ControlFlow::Break(cursor),
            _ => ControlFlow::Continue(()),
        });
        match found {
            ControlFlow::Break(cursor) => cursor,
            ControlFlow::Continue(()) => self.end(),
        }
    }

    /// Returns a value that prints the entries in the given traversal order,
    /// one `key: .., value: ..` line per entry.
    pub fn display(&self, order: Order) -> DisplayOrder<'_, K, V> {
        DisplayOrder { map: self, order }
    }

    fn walk<B, F>(&self, order: Order, visit: F) -> ControlFlow<B>
    where
        F: FnMut(NodePtr<K, V>) -> ControlFlow<B>,
    {
        Self::walk_from(self.root, order, visit)
    }

    /// Walks the subtree at `root` without a stack, following parent links back up.
    fn walk_from<B, F>(root: Link<K, V>, order: Order, mut visit: F) -> ControlFlow<B>
    where
        F: FnMut(NodePtr<K, V>) -> ControlFlow<B>,
    {
        if let Some(mut node_ptr) = root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        if order == Order::Preorder {
                            if let ControlFlow::Break(value) = visit(node_ptr) {
                                return ControlFlow::Break(value);
                            }
                        }
                        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                            node_ptr = left_ptr;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        if order == Order::Inorder {
                            if let ControlFlow::Break(value) = visit(node_ptr) {
                                return ControlFlow::Break(value);
                            }
                        }
                        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
                            node_ptr = right_ptr;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        // Post order traversal is used for node deletion,
                        // so make sure not to use node pointer after visiting it.
                        let parent = unsafe { node_ptr.as_ref().parent };
                        if let Some(parent_ptr) = parent {
                            if Some(node_ptr) == unsafe { parent_ptr.as_ref().left } {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                        }
                        if order == Order::Postorder {
                            if let ControlFlow::Break(value) = visit(node_ptr) {
                                return ControlFlow::Break(value);
                            }
                        }
                        match parent {
                            Some(parent_ptr) => node_ptr = parent_ptr,
                            None => break,
                        }
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }
}

impl<K: Ord, V> AvlTreeMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key)
            .map(|node_ptr| &unsafe { &*node_ptr.as_ptr() }.value)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key)
            .map(|node_ptr| &mut unsafe { &mut *node_ptr.as_ptr() }.value)
    }

    /// Returns true if the map contains a value for the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key).is_some()
    }

    /// Returns a cursor at the entry for the key,
    /// or the end cursor if the key is not in the map.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self, self.find_node(key))
    }

    /// Returns a mutable cursor at the entry for the key,
    /// or the end cursor if the key is not in the map.
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find_node(key);
        CursorMut::new(self, node)
    }

    /// Inserts a key-value pair into the map.
    /// Returns false and leaves the map unchanged if the key was already present.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.insert_node(key, value).is_ok()
    }

    /// Inserts a key-value pair into the map.
    ///
    /// Returns whether the pair was inserted together with a cursor at the
    /// entry for the key: the new entry, or the entry that was already
    /// present, which is left unchanged.
    ///
    /// ```
    /// use avl_dict::AvlTreeMap;
    /// let mut counts = AvlTreeMap::new();
    /// for word in ["a", "b", "a"] {
    ///     let (inserted, mut cursor) = counts.insert_with_cursor(word, 1);
    ///     if !inserted {
    ///         *cursor.value_mut() += 1;
    ///     }
    /// }
    /// assert_eq!(counts.get("a"), Some(&2));
    /// ```
    pub fn insert_with_cursor(&mut self, key: K, value: V) -> (bool, CursorMut<'_, K, V>) {
        let (inserted, node_ptr) = match self.insert_node(key, value) {
            Ok(node_ptr) => (true, node_ptr),
            Err((_, node_ptr)) => (false, node_ptr),
        };
        (inserted, CursorMut::new(self, Some(node_ptr)))
    }

    /// Inserts a key-value pair into the map and returns a cursor at the new entry.
    ///
    /// Fails with [`Error::DuplicateKey`] if the key was already present;
    /// the map is left unchanged and the given pair is dropped.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<CursorMut<'_, K, V>> {
        match self.insert_node(key, value) {
            Ok(node_ptr) => Ok(CursorMut::new(self, Some(node_ptr))),
            Err((err, _)) => Err(err),
        }
    }

    /// Removes a key from the map.
    /// Returns whether the key was previously in the map.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.take_node(key).is_ok()
    }

    /// Removes a key from the map.
    /// Returns the stored key and value if the key was previously in the map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.take_node(key).ok().map(|node| {
            let node = *node;
            (node.key, node.value)
        })
    }

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        unsafe {
            // Check root link
            if let Some(root_node_ptr) = self.root {
                assert!(root_node_ptr.as_ref().parent.is_none());
            }

            // Check tree nodes
            let _ = self.walk(Order::Preorder, |node_ptr| {
                let mut left_height = 0;
                let mut right_height = 0;

                // Check link for left child node
                if let Some(left_ptr) = node_ptr.as_ref().left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(left_ptr.as_ref().key < node_ptr.as_ref().key);
                    left_height = left_ptr.as_ref().height;
                }

                // Check link for right child node
                if let Some(right_ptr) = node_ptr.as_ref().right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(right_ptr.as_ref().key > node_ptr.as_ref().key);
                    right_height = right_ptr.as_ref().height;
                }

                // Check height
                assert_eq!(node_ptr.as_ref().height, cmp::max(left_height, right_height) + 1);

                // Check AVL condition (nearly balance)
                assert!(left_height <= right_height + 1);
                assert!(right_height <= left_height + 1);

                ControlFlow::<()>::Continue(())
            });
        }

        // Check key order across subtrees
        let mut keys = self.keys();
        if let Some(mut prev) = keys.next() {
            for key in keys {
                assert!(prev < key);
                prev = key;
            }
        }
    }

    fn find_node<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match key.cmp(node_ptr.as_ref().key.borrow()) {
                    Ordering::Equal => break,
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    /// Returns the parent and the empty link where the key belongs,
    /// or the node already holding the key.
    fn find_insert_pos(
        &mut self,
        key: &K,
    ) -> std::result::Result<(Link<K, V>, LinkPtr<K, V>), NodePtr<K, V>> {
        let mut parent: Link<K, V> = None;
        let mut link_ptr: LinkPtr<K, V> = NonNull::from(&mut self.root);
        unsafe {
            while let Some(mut node_ptr) = *link_ptr.as_ref() {
                parent = Some(node_ptr);
                link_ptr = match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => return Err(node_ptr),
                    Ordering::Less => NonNull::from(&mut node_ptr.as_mut().left),
                    Ordering::Greater => NonNull::from(&mut node_ptr.as_mut().right),
                };
            }
        }
        Ok((parent, link_ptr))
    }

    fn insert_node(
        &mut self,
        key: K,
        value: V,
    ) -> std::result::Result<NodePtr<K, V>, (Error, NodePtr<K, V>)> {
        match self.find_insert_pos(&key) {
            Err(node_ptr) => Err((Error::DuplicateKey, node_ptr)),
            Ok((parent, mut link_ptr)) => {
                let node_ptr = Node::create(parent, key, value);
                unsafe {
                    *link_ptr.as_mut() = Some(node_ptr);
                }
                self.rebalance_after_insert(node_ptr);
                Ok(node_ptr)
            }
        }
    }

    fn take_node<Q>(&mut self, key: &Q) -> Result<Box<Node<K, V>>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node_ptr = self.find_node(key).ok_or(Error::KeyNotFound)?;
        let node_ptr = self.unlink_node(node_ptr);
        Ok(unsafe { Box::from_raw(node_ptr.as_ptr()) })
    }

    /// Unlinks the entry held by the given node from the tree and rebalances.
    /// Returns the detached node now holding that entry.
    fn unlink_node(&mut self, mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            // Node with two children takes over the entry of its in-order successor,
            // which has no left child and is unlinked in its place.
            if let (Some(_), Some(right_ptr)) = (node_ptr.as_ref().left, node_ptr.as_ref().right) {
                let mut min_child_ptr = Node::min(right_ptr);
                mem::swap(&mut node_ptr.as_mut().key, &mut min_child_ptr.as_mut().key);
                mem::swap(&mut node_ptr.as_mut().value, &mut min_child_ptr.as_mut().value);
                node_ptr = min_child_ptr;
            }

            // Node to-unlink is stem or leaf, splice in its only child
            debug_assert!(node_ptr.as_ref().left.is_none() || node_ptr.as_ref().right.is_none());
            let child = node_ptr.as_ref().left.or(node_ptr.as_ref().right);
            let parent = node_ptr.as_ref().parent;
            if let Some(mut child_ptr) = child {
                child_ptr.as_mut().parent = parent;
            }
            self.replace_child(parent, node_ptr, child);

            node_ptr.as_mut().left = None;
            node_ptr.as_mut().right = None;
            node_ptr.as_mut().parent = None;

            // Every ancestor might be out of balance now
            self.rebalance(parent);
            node_ptr
        }
    }

    /// Restores balance on the path from a freshly inserted node up to the root.
    /// The case is picked by comparing the inserted key with the child on the heavy side.
    /// One single or double rotation brings the subtree back to its height
    /// before the insertion, so propagation stops after the first one.
    fn rebalance_after_insert(&mut self, inserted_ptr: NodePtr<K, V>) {
        let mut current = unsafe { inserted_ptr.as_ref().parent };
        while let Some(node_ptr) = current {
            Node::adjust_height(node_ptr);
            let balance = Node::balance(node_ptr);
            unsafe {
                if balance > 1 {
                    if let Some(left_ptr) = node_ptr.as_ref().left {
                        if inserted_ptr.as_ref().key > left_ptr.as_ref().key {
                            trace!("insert: left-right case");
                            self.rotate_left(left_ptr);
                        }
                    }
                    self.rotate_right(node_ptr);
                    break;
                } else if balance < -1 {
                    if let Some(right_ptr) = node_ptr.as_ref().right {
                        if inserted_ptr.as_ref().key < right_ptr.as_ref().key {
                            trace!("insert: right-left case");
                            self.rotate_right(right_ptr);
                        }
                    }
                    self.rotate_left(node_ptr);
                    break;
                }
                current = node_ptr.as_ref().parent;
            }
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    fn rebalance(&mut self, start_from: Link<K, V>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            self.rebalance_node(node_ptr);
            current = parent;
        }
    }

    /// Restores AVL condition (balance) at given node if necessary and adjusts height.
    /// The rotation is picked by the balance of the child on the heavy side.
    /// Initial balance must not exceed +2 or -2, which always holds after a single update.
    /// Returns the root of the rebalanced subtree.
    fn rebalance_node(&mut self, node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        Node::adjust_height(node_ptr);
        let balance = Node::balance(node_ptr);
        debug_assert!((-2..=2).contains(&balance));
        unsafe {
            if balance > 1 {
                if let Some(left_ptr) = node_ptr.as_ref().left {
                    if Node::balance(left_ptr) < 0 {
                        trace!("remove: left-right case");
                        self.rotate_left(left_ptr);
                    }
                }
                self.rotate_right(node_ptr)
            } else if balance < -1 {
                if let Some(right_ptr) = node_ptr.as_ref().right {
                    if Node::balance(right_ptr) > 0 {
                        trace!("remove: right-left case");
                        self.rotate_right(right_ptr);
                    }
                }
                self.rotate_left(node_ptr)
            } else {
                node_ptr
            }
        }
    }

    /// Rotates the subtree at the given node to the left and returns its new root.
    fn rotate_left(&mut self, mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            let Some(mut right_ptr) = node_ptr.as_ref().right else {
                return node_ptr;
            };
            trace!(height = node_ptr.as_ref().height, "rotate left");

            node_ptr.as_mut().right = right_ptr.as_ref().left;
            if let Some(mut right_left_ptr) = right_ptr.as_ref().left {
                right_left_ptr.as_mut().parent = Some(node_ptr);
            }

            let parent = node_ptr.as_ref().parent;
            right_ptr.as_mut().parent = parent;
            self.replace_child(parent, node_ptr, Some(right_ptr));

            right_ptr.as_mut().left = Some(node_ptr);
            node_ptr.as_mut().parent = Some(right_ptr);

            Node::adjust_height(node_ptr);
            Node::adjust_height(right_ptr);
            right_ptr
        }
    }

    /// Rotates the subtree at the given node to the right and returns its new root.
    fn rotate_right(&mut self, mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            let Some(mut left_ptr) = node_ptr.as_ref().left else {
                return node_ptr;
            };
            trace!(height = node_ptr.as_ref().height, "rotate right");

            node_ptr.as_mut().left = left_ptr.as_ref().right;
            if let Some(mut left_right_ptr) = left_ptr.as_ref().right {
                left_right_ptr.as_mut().parent = Some(node_ptr);
            }

            let parent = node_ptr.as_ref().parent;
            left_ptr.as_mut().parent = parent;
            self.replace_child(parent, node_ptr, Some(left_ptr));

            left_ptr.as_mut().right = Some(node_ptr);
            node_ptr.as_mut().parent = Some(left_ptr);

            Node::adjust_height(node_ptr);
            Node::adjust_height(left_ptr);
            left_ptr
        }
    }

    /// Points the link that holds `old` (the root link, or a child link of `parent`) to `new`.
    fn replace_child(&mut self, parent: Link<K, V>, old: NodePtr<K, V>, new: Link<K, V>) {
        match parent {
            None => self.root = new,
            Some(mut parent_ptr) => unsafe {
                if parent_ptr.as_ref().left == Some(old) {
                    parent_ptr.as_mut().left = new;
                } else {
                    parent_ptr.as_mut().right = new;
                }
            },
        }
    }
}

impl<K, V> Drop for AvlTreeMap<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> Default for AvlTreeMap<K, V> {
    /// Creates an empty map.
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for AvlTreeMap<K, V> {
    /// Copies every node, keeping the shape and heights of the tree.
    fn clone(&self) -> Self {
        Self {
            root: self.root.map(|root_ptr| Node::copy(root_ptr, None)),
            marker: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.root = source.root.map(|root_ptr| Node::copy(root_ptr, None));
    }
}

/// Structural equality: same shape, and equal keys and values at every position.
/// Two maps holding the same entries in differently shaped trees compare unequal.
impl<K: PartialEq, V: PartialEq> PartialEq for AvlTreeMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other) || Node::subtree_eq(self.root, other.root)
    }
}

impl<K: Eq, V: Eq> Eq for AvlTreeMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTreeMap<K, V> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTreeMap<K, V> {
    /// Builds a map from key-value pairs; the first pair wins for a repeated key.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlTreeMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        iter.into_iter().for_each(move |(key, value)| {
            self.insert(key, value);
        });
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut AvlTreeMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

unsafe impl<K: Send, V: Send> Send for AvlTreeMap<K, V> {}

unsafe impl<K: Sync, V: Sync> Sync for AvlTreeMap<K, V> {}

unsafe impl<K: Sync, V: Sync> Send for Iter<'_, K, V> {}

unsafe impl<K: Sync, V: Sync> Sync for Iter<'_, K, V> {}

unsafe impl<K: Sync, V: Send> Send for IterMut<'_, K, V> {}

unsafe impl<K: Sync, V: Sync> Sync for IterMut<'_, K, V> {}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for DisplayOrder<'_, K, V> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let written = self.map.traverse(self.order, |cursor| match writeln!(fmt, "{cursor}") {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => ControlFlow::Break(err),
        });
        match written {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(err) => Err(err),
        }
    }
}

// Auto derived clone seems to have an invalid type bound of K: Clone
impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            back: self.back,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = Node::successor(node_ptr);
        }
        let node = unsafe { &*node_ptr.as_ptr() };
        Some((&node.key, &node.value))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node_ptr = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = Node::predecessor(node_ptr);
        }
        let node = unsafe { &*node_ptr.as_ptr() };
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = Node::successor(node_ptr);
        }
        let node = node_ptr.as_ptr();
        Some(unsafe { (&(*node).key, &mut (*node).value) })
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node_ptr = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = Node::predecessor(node_ptr);
        }
        let node = node_ptr.as_ptr();
        Some(unsafe { (&(*node).key, &mut (*node).value) })
    }
}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            iter: self.iter.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(k, _)| k)
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.iter.next_back().map(|(k, _)| k)
    }
}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            iter: self.iter.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(_, v)| v)
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.iter.next_back().map(|(_, v)| v)
    }
}

// Navigation reads links through raw pointers only, so that it never overlaps
// with a `&mut V` handed out by `IterMut` or `CursorMut`.
impl<K, V> Node<K, V> {
    fn create(parent: Link<K, V>, key: K, value: V) -> NodePtr<K, V> {
        let boxed = Box::new(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            height: 1,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    unsafe fn destroy(node_ptr: NodePtr<K, V>) {
        drop(Box::from_raw(node_ptr.as_ptr()));
    }

    fn height(link: Link<K, V>) -> usize {
        match link {
            None => 0,
            Some(node_ptr) => unsafe { (*node_ptr.as_ptr()).height },
        }
    }

    fn balance(node_ptr: NodePtr<K, V>) -> isize {
        let (left, right) = unsafe { ((*node_ptr.as_ptr()).left, (*node_ptr.as_ptr()).right) };
        Self::height(left) as isize - Self::height(right) as isize
    }

    fn adjust_height(node_ptr: NodePtr<K, V>) {
        unsafe {
            let node = node_ptr.as_ptr();
            (*node).height = cmp::max(Self::height((*node).left), Self::height((*node).right)) + 1;
        }
    }

    fn min(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        while let Some(left_ptr) = unsafe { (*node_ptr.as_ptr()).left } {
            node_ptr = left_ptr;
        }
        node_ptr
    }

    fn max(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        while let Some(right_ptr) = unsafe { (*node_ptr.as_ptr()).right } {
            node_ptr = right_ptr;
        }
        node_ptr
    }

    /// In-order successor: leftmost node of the right subtree, or the first
    /// ancestor reached from a left child.
    fn successor(node_ptr: NodePtr<K, V>) -> Link<K, V> {
        unsafe {
            if let Some(right_ptr) = (*node_ptr.as_ptr()).right {
                return Some(Self::min(right_ptr));
            }
            let mut current = node_ptr;
            let mut parent = (*current.as_ptr()).parent;
            while let Some(parent_ptr) = parent {
                if (*parent_ptr.as_ptr()).right != Some(current) {
                    break;
                }
                current = parent_ptr;
                parent = (*current.as_ptr()).parent;
            }
            parent
        }
    }

    /// In-order predecessor, the mirror image of [`Node::successor`].
    fn predecessor(node_ptr: NodePtr<K, V>) -> Link<K, V> {
        unsafe {
            if let Some(left_ptr) = (*node_ptr.as_ptr()).left {
                return Some(Self::max(left_ptr));
            }
            let mut current = node_ptr;
            let mut parent = (*current.as_ptr()).parent;
            while let Some(parent_ptr) = parent {
                if (*parent_ptr.as_ptr()).left != Some(current) {
                    break;
                }
                current = parent_ptr;
                parent = (*current.as_ptr()).parent;
            }
            parent
        }
    }
}

impl<K: Clone, V: Clone> Node<K, V> {
    /// Deep copies the subtree at the given node, linking the copy to `parent`.
    /// Recursion depth is bounded by the tree height.
    fn copy(node_ptr: NodePtr<K, V>, parent: Link<K, V>) -> NodePtr<K, V> {
        unsafe {
            let node = node_ptr.as_ref();
            let mut copy_ptr = Node::create(parent, node.key.clone(), node.value.clone());
            let left = node.left.map(|left_ptr| Self::copy(left_ptr, Some(copy_ptr)));
            let right = node.right.map(|right_ptr| Self::copy(right_ptr, Some(copy_ptr)));
            copy_ptr.as_mut().left = left;
            copy_ptr.as_mut().right = right;
            copy_ptr.as_mut().height = node.height;
            copy_ptr
        }
    }
}

impl<K: PartialEq, V: PartialEq> Node<K, V> {
    fn subtree_eq(lhs: Link<K, V>, rhs: Link<K, V>) -> bool {
        match (lhs, rhs) {
            (None, None) => true,
            (Some(lhs_ptr), Some(rhs_ptr)) if lhs_ptr == rhs_ptr => true,
            (Some(lhs_ptr), Some(rhs_ptr)) => unsafe {
                let (lhs, rhs) = (lhs_ptr.as_ref(), rhs_ptr.as_ref());
                lhs.key == rhs.key
                    && lhs.value == rhs.value
                    && Self::subtree_eq(lhs.left, rhs.left)
                    && Self::subtree_eq(lhs.right, rhs.right)
            },
            _ => false,
        }
    }
}
