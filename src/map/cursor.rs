//! Bidirectional cursors over an [`AvlTreeMap`].
//!
//! A cursor points at an entry of the map or at the end position, which
//! lies both past the largest and before the smallest key: stepping
//! forward from the end lands on the smallest key, stepping backward lands
//! on the largest. Cursors walk the tree through parent links, so moving
//! is O(1) amortized and needs no stack.
//!
//! [`Cursor`] and [`RevCursor`] borrow the map shared and only read;
//! [`CursorMut`] borrows it exclusively and can modify the value it points at.
//! All three move the same way.

use std::fmt;
use std::ptr;

use super::{AvlTreeMap, Link, Node};
use crate::error::{Error, Result};

/// A read-only cursor over the entries of an [`AvlTreeMap`], in ascending key order.
///
/// ```
/// use avl_dict::AvlTreeMap;
/// let map: AvlTreeMap<_, _> = [(10, 1), (20, 2), (30, 3)].into_iter().collect();
/// let mut cursor = map.begin();
/// let mut keys = Vec::new();
/// while cursor != map.end() {
///     keys.push(*cursor.key());
///     cursor.move_next();
/// }
/// assert_eq!(keys, [10, 20, 30]);
/// ```
pub struct Cursor<'a, K, V> {
    map: Option<&'a AvlTreeMap<K, V>>,
    node: Link<K, V>,
}

/// A read-only cursor over the entries of an [`AvlTreeMap`], in descending key order.
///
/// Moving a reverse cursor forward moves the underlying cursor backward and vice versa.
pub struct RevCursor<'a, K, V> {
    base: Cursor<'a, K, V>,
}

/// A cursor over the entries of an [`AvlTreeMap`] that can modify values.
///
/// A mutable cursor is always attached to a map, so moving it never fails.
pub struct CursorMut<'a, K, V> {
    map: &'a mut AvlTreeMap<K, V>,
    node: Link<K, V>,
}

fn step_forward<K, V>(root: Link<K, V>, node: Link<K, V>) -> Link<K, V> {
    match node {
        None => root.map(Node::min),
        Some(node_ptr) => Node::successor(node_ptr),
    }
}

fn step_backward<K, V>(root: Link<K, V>, node: Link<K, V>) -> Link<K, V> {
    match node {
        None => root.map(Node::max),
        Some(node_ptr) => Node::predecessor(node_ptr),
    }
}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(super) fn new(map: &'a AvlTreeMap<K, V>, node: Link<K, V>) -> Self {
        Self {
            map: Some(map),
            node,
        }
    }

    /// Creates a cursor that is not attached to any map.
    /// It is an end cursor that cannot be moved.
    pub fn detached() -> Self {
        Self {
            map: None,
            node: None,
        }
    }

    /// Returns true if the cursor points at no entry.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// Returns true if the cursor belongs to a map.
    pub fn is_attached(&self) -> bool {
        self.map.is_some()
    }

    /// Returns the entry the cursor points at, or `None` at the end.
    pub fn get(&self) -> Option<(&'a K, &'a V)> {
        self.node.map(|node_ptr| {
            let node = unsafe { &*node_ptr.as_ptr() };
            (&node.key, &node.value)
        })
    }

    /// Returns the key the cursor points at.
    ///
    /// Fails with [`Error::InvalidAccess`] at the end.
    pub fn try_key(&self) -> Result<&'a K> {
        self.get().map(|(k, _)| k).ok_or(Error::InvalidAccess)
    }

    /// Returns the value the cursor points at.
    ///
    /// Fails with [`Error::InvalidAccess`] at the end.
    pub fn try_value(&self) -> Result<&'a V> {
        self.get().map(|(_, v)| v).ok_or(Error::InvalidAccess)
    }

    /// Returns the key the cursor points at.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is at the end.
    #[track_caller]
    pub fn key(&self) -> &'a K {
        match self.try_key() {
            Ok(key) => key,
            Err(err) => panic!("{err}"),
        }
    }

    /// Returns the value the cursor points at.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is at the end.
    #[track_caller]
    pub fn value(&self) -> &'a V {
        match self.try_value() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Moves to the entry with the next larger key,
    /// from the end to the smallest key, or from the largest key to the end.
    ///
    /// Fails with [`Error::InvalidOwner`] if the cursor is detached.
    pub fn try_move_next(&mut self) -> Result<()> {
        let map = self.map.ok_or(Error::InvalidOwner)?;
        self.node = step_forward(map.root, self.node);
        Ok(())
    }

    /// Moves to the entry with the next smaller key,
    /// from the end to the largest key, or from the smallest key to the end.
    ///
    /// Fails with [`Error::InvalidOwner`] if the cursor is detached.
    pub fn try_move_prev(&mut self) -> Result<()> {
        let map = self.map.ok_or(Error::InvalidOwner)?;
        self.node = step_backward(map.root, self.node);
        Ok(())
    }

    /// Moves to the entry with the next larger key.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is detached.
    #[track_caller]
    pub fn move_next(&mut self) {
        if let Err(err) = self.try_move_next() {
            panic!("{err}");
        }
    }

    /// Moves to the entry with the next smaller key.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is detached.
    #[track_caller]
    pub fn move_prev(&mut self) {
        if let Err(err) = self.try_move_prev() {
            panic!("{err}");
        }
    }

    /// Turns the cursor into a reverse cursor at the same position.
    pub fn rev(self) -> RevCursor<'a, K, V> {
        RevCursor::new(self)
    }
}

unsafe impl<K: Sync, V: Sync> Send for Cursor<'_, K, V> {}

unsafe impl<K: Sync, V: Sync> Sync for Cursor<'_, K, V> {}

impl<K, V> Default for Cursor<'_, K, V> {
    /// Creates a detached cursor.
    fn default() -> Self {
        Self::detached()
    }
}

// Auto derived clone seems to have an invalid type bound of K: Clone
impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Cursor<'_, K, V> {}

/// Cursors are equal if they point at the same position of the same map.
/// Cursors of different maps are never equal, not even at the end.
impl<K, V> PartialEq for Cursor<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        let same_map = match (self.map, other.map) {
            (None, None) => true,
            (Some(lhs), Some(rhs)) => ptr::eq(lhs, rhs),
            _ => false,
        };
        same_map && self.node == other.node
    }
}

impl<K, V> Eq for Cursor<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.get() {
            Some((key, value)) => f.debug_tuple("Cursor").field(key).field(value).finish(),
            None => f.write_str("Cursor(end)"),
        }
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.get() {
            Some((key, value)) => write!(f, "key: {key}, value: {value}"),
            None => write!(f, "key: -, value: -"),
        }
    }
}

impl<'a, K, V> RevCursor<'a, K, V> {
    pub(super) fn new(base: Cursor<'a, K, V>) -> Self {
        Self { base }
    }

    /// Returns the underlying forward cursor at the same position.
    pub fn base(&self) -> Cursor<'a, K, V> {
        self.base
    }

    /// Returns true if the cursor points at no entry.
    pub fn is_end(&self) -> bool {
        self.base.is_end()
    }

    /// Returns the entry the cursor points at, or `None` at the end.
    pub fn get(&self) -> Option<(&'a K, &'a V)> {
        self.base.get()
    }

    /// Returns the key the cursor points at.
    pub fn try_key(&self) -> Result<&'a K> {
        self.base.try_key()
    }

    /// Returns the value the cursor points at.
    pub fn try_value(&self) -> Result<&'a V> {
        self.base.try_value()
    }

    /// Returns the key the cursor points at.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is at the end.
    #[track_caller]
    pub fn key(&self) -> &'a K {
        self.base.key()
    }

    /// Returns the value the cursor points at.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is at the end.
    #[track_caller]
    pub fn value(&self) -> &'a V {
        self.base.value()
    }

    /// Moves to the entry with the next smaller key.
    pub fn try_move_next(&mut self) -> Result<()> {
        self.base.try_move_prev()
    }

    /// Moves to the entry with the next larger key.
    pub fn try_move_prev(&mut self) -> Result<()> {
        self.base.try_move_next()
    }

    /// Moves to the entry with the next smaller key.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is detached.
    #[track_caller]
    pub fn move_next(&mut self) {
        self.base.move_prev();
    }

    /// Moves to the entry with the next larger key.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is detached.
    #[track_caller]
    pub fn move_prev(&mut self) {
        self.base.move_next();
    }
}

impl<K, V> Clone for RevCursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for RevCursor<'_, K, V> {}

impl<K, V> PartialEq for RevCursor<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}

impl<K, V> Eq for RevCursor<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RevCursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.get() {
            Some((key, value)) => f.debug_tuple("RevCursor").field(key).field(value).finish(),
            None => f.write_str("RevCursor(end)"),
        }
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for RevCursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.base, f)
    }
}

impl<'a, K, V> CursorMut<'a, K, V> {
    pub(super) fn new(map: &'a mut AvlTreeMap<K, V>, node: Link<K, V>) -> Self {
        Self { map, node }
    }

    /// Returns true if the cursor points at no entry.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// Returns a read-only cursor at the same position.
    pub fn as_cursor(&self) -> Cursor<'_, K, V> {
        Cursor::new(&*self.map, self.node)
    }

    /// Returns the entry the cursor points at, or `None` at the end.
    pub fn get(&self) -> Option<(&K, &V)> {
        self.node.map(|node_ptr| {
            let node = unsafe { &*node_ptr.as_ptr() };
            (&node.key, &node.value)
        })
    }

    /// Returns the key the cursor points at.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is at the end.
    #[track_caller]
    pub fn key(&self) -> &K {
        match self.get() {
            Some((key, _)) => key,
            None => panic!("{}", Error::InvalidAccess),
        }
    }

    /// Returns the value the cursor points at.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is at the end.
    #[track_caller]
    pub fn value(&self) -> &V {
        match self.get() {
            Some((_, value)) => value,
            None => panic!("{}", Error::InvalidAccess),
        }
    }

    /// Returns a mutable reference to the value the cursor points at.
    ///
    /// Fails with [`Error::InvalidAccess`] at the end.
    pub fn try_value_mut(&mut self) -> Result<&mut V> {
        match self.node {
            Some(node_ptr) => Ok(unsafe { &mut (*node_ptr.as_ptr()).value }),
            None => Err(Error::InvalidAccess),
        }
    }

    /// Returns a mutable reference to the value the cursor points at.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is at the end.
    #[track_caller]
    pub fn value_mut(&mut self) -> &mut V {
        match self.try_value_mut() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Converts the cursor into a mutable reference to the value it points at,
    /// or `None` at the end.
    pub fn into_value_mut(self) -> Option<&'a mut V> {
        self.node
            .map(|node_ptr| unsafe { &mut (*node_ptr.as_ptr()).value })
    }

    /// Moves to the entry with the next larger key,
    /// from the end to the smallest key, or from the largest key to the end.
    pub fn move_next(&mut self) {
        self.node = step_forward(self.map.root, self.node);
    }

    /// Moves to the entry with the next smaller key,
    /// from the end to the largest key, or from the smallest key to the end.
    pub fn move_prev(&mut self) {
        self.node = step_backward(self.map.root, self.node);
    }
}

unsafe impl<K: Send, V: Send> Send for CursorMut<'_, K, V> {}

unsafe impl<K: Sync, V: Sync> Sync for CursorMut<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CursorMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.get() {
            Some((key, value)) => f.debug_tuple("CursorMut").field(key).field(value).finish(),
            None => f.write_str("CursorMut(end)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cursor;
    use crate::{AvlTreeMap, Error};

    fn sample() -> AvlTreeMap<i32, i32> {
        [(10, 1), (20, 2), (30, 3), (50, 4), (40, 5), (60, 6)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_forward_walk() {
        let map = sample();
        let mut keys = Vec::new();
        let mut cursor = map.begin();
        while cursor != map.end() {
            keys.push(*cursor.key());
            cursor.move_next();
        }
        assert_eq!(keys, [10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn test_reverse_walk() {
        let map = sample();
        let mut keys = Vec::new();
        let mut cursor = map.rbegin();
        while cursor != map.rend() {
            keys.push(*cursor.key());
            cursor.move_next();
        }
        assert_eq!(keys, [60, 50, 40, 30, 20, 10]);
    }

    #[test]
    fn test_end_wraps_around() {
        let map = sample();

        let mut cursor = map.end();
        cursor.move_next();
        assert_eq!(cursor, map.begin());

        let mut cursor = map.begin();
        cursor.move_prev();
        assert_eq!(cursor, map.end());

        let mut cursor = map.rend();
        cursor.move_next();
        assert_eq!(cursor, map.rbegin());

        let mut cursor = map.rbegin();
        cursor.move_prev();
        assert_eq!(cursor, map.rend());

        let mut cursor = map.end();
        cursor.move_prev();
        assert_eq!(cursor.key(), &60);
    }

    #[test]
    fn test_empty_map() {
        let map = AvlTreeMap::<i32, i32>::new();
        assert!(map.begin().is_end());
        assert_eq!(map.begin(), map.end());
        assert_eq!(map.rbegin(), map.rend());

        let mut cursor = map.end();
        cursor.move_next();
        assert!(cursor.is_end());
        cursor.move_prev();
        assert!(cursor.is_end());
    }

    #[test]
    fn test_access() {
        let map = sample();
        let cursor = map.begin();
        assert_eq!(*cursor.value(), 1);
        assert_eq!(cursor.get(), Some((&10, &1)));

        let end = map.end();
        assert!(end.get().is_none());
        assert_eq!(end.try_key(), Err(Error::InvalidAccess));
        assert_eq!(end.try_value(), Err(Error::InvalidAccess));
    }

    #[test]
    #[should_panic(expected = "cursor does not point at an entry")]
    fn test_end_key_panics() {
        let map = sample();
        map.end().key();
    }

    #[test]
    #[should_panic(expected = "cursor does not point at an entry")]
    fn test_end_value_panics() {
        let map = sample();
        map.rend().value();
    }

    #[test]
    fn test_detached() {
        let mut cursor = Cursor::<i32, i32>::detached();
        assert!(!cursor.is_attached());
        assert!(cursor.is_end());
        assert_eq!(cursor.try_move_next(), Err(Error::InvalidOwner));
        assert_eq!(cursor.try_move_prev(), Err(Error::InvalidOwner));
        assert_eq!(cursor, Cursor::default());

        let map = sample();
        assert_ne!(cursor, map.end());
    }

    #[test]
    #[should_panic(expected = "cursor is not attached to a map")]
    fn test_detached_move_panics() {
        let mut cursor = Cursor::<i32, i32>::default();
        cursor.move_next();
    }

    #[test]
    fn test_cursors_of_different_maps() {
        let lhs = sample();
        let rhs = lhs.clone();
        assert_ne!(lhs.end(), rhs.end());
        assert_ne!(lhs.begin(), rhs.begin());
        assert_eq!(lhs.begin().get(), rhs.begin().get());
    }

    #[test]
    fn test_rev_base() {
        let map = sample();
        let rev = map.begin().rev();
        assert_eq!(rev.key(), &10);
        let mut rev = rev;
        rev.move_next();
        assert!(rev.is_end());
        assert_eq!(rev.base(), map.end());
    }

    #[test]
    fn test_cursor_mut() {
        let mut map = sample();
        let mut cursor = map.begin_mut();
        while !cursor.is_end() {
            *cursor.value_mut() *= 10;
            cursor.move_next();
        }
        assert!(cursor.try_value_mut().is_err());
        cursor.move_prev();
        assert_eq!(cursor.key(), &60);
        assert_eq!(cursor.as_cursor().get(), Some((&60, &60)));

        let values: Vec<i32> = map.values().copied().collect();
        assert_eq!(values, [10, 20, 30, 50, 40, 60]);

        if let Some(value) = map.find_mut(&40).into_value_mut() {
            *value = 0;
        }
        assert_eq!(map.get(&40), Some(&0));
        assert!(map.find_mut(&41).into_value_mut().is_none());
    }

    #[test]
    fn test_display() {
        let map = sample();
        assert_eq!(map.find(&40).to_string(), "key: 40, value: 5");
        assert_eq!(map.end().to_string(), "key: -, value: -");
        assert_eq!(format!("{:?}", map.rbegin()), "RevCursor(60, 6)");
    }
}
