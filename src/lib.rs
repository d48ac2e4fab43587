//! An ordered dictionary implemented with an AVL tree.
//!
//! [`AvlTreeMap`] keeps its entries sorted by key in a height-balanced binary
//! search tree whose nodes link back to their parents. The parent links let
//! [`Cursor`]s walk the entries in both directions without a stack, and let
//! [`AvlTreeMap::traverse`] visit the tree in pre-, in- or postorder with the
//! option to stop early.
//!
//! ```
//! use avl_dict::AvlTreeMap;
//!
//! let mut map = AvlTreeMap::new();
//! for key in [20, 10, 30, 5, 15] {
//!     map.insert(key, key * 2);
//! }
//! map.remove(&30);
//!
//! let keys: Vec<_> = map.keys().copied().collect();
//! assert_eq!(keys, [5, 10, 15, 20]);
//!
//! let mut cursor = map.rbegin();
//! assert_eq!(cursor.key(), &20);
//! cursor.move_next();
//! assert_eq!(cursor.value(), &30);
//! ```

mod error;
pub mod frequency;
mod map;

pub use error::{Error, Result};
pub use map::{
    AvlTreeMap, Cursor, CursorMut, DisplayOrder, Iter, IterMut, Keys, Order, RevCursor, Values,
};
