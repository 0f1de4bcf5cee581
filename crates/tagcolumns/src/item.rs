//! The row-item protocol consumed by providers.
//!
//! Albums, tracks and files are opaque to this crate. Anything that shows up
//! as a row implements [`Item`]: a keyed `column` lookup, an optional
//! [`Metadata`] mapping and a couple of flags the script cache consults.
//!
//! # Weak references
//!
//! Providers cache per item without owning it. An item opts into that by
//! embedding an [`ItemAnchor`] and returning it from [`Item::anchor`]; caches
//! then keep only a [`WeakAnchor`] and treat the entry as gone once the
//! anchor is dropped. Items without an anchor but with a host-assigned
//! [`Item::row_id`] are cached in a small bounded store instead. Items with
//! neither are never cached, since their address says nothing about which
//! row they are once they move.
//!
//! ```
//! use tagcolumns::{Item, ItemAnchor, LookupError, Metadata};
//!
//! struct Track {
//!     anchor: ItemAnchor,
//!     metadata: Metadata,
//! }
//!
//! impl Item for Track {
//!     fn column(&self, key: &str) -> Result<String, LookupError> {
//!         Ok(self.metadata.get(key).unwrap_or_default())
//!     }
//!
//!     fn metadata(&self) -> Option<&Metadata> {
//!         Some(&self.metadata)
//!     }
//!
//!     fn anchor(&self) -> Option<&ItemAnchor> {
//!         Some(&self.anchor)
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;

/// Separator used when a multi-valued tag is read as a single string.
pub const MULTI_VALUE_JOINER: &str = "; ";

/// Errors an item may report from [`Item::column`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The item has no column lookup at all.
    #[error("item does not support column lookup")]
    Unsupported,

    /// The item does not know the requested key.
    #[error("unknown column key: {0}")]
    UnknownKey(String),

    /// The lookup failed for an item-specific reason.
    #[error("column lookup failed: {0}")]
    Failed(String),
}

/// A row object rendered by a view.
///
/// Every method has a default so minimal items only implement what they
/// actually expose.
pub trait Item {
    /// Returns the display value for a column key.
    fn column(&self, _key: &str) -> Result<String, LookupError> {
        Err(LookupError::Unsupported)
    }

    /// Returns the tag metadata used as script evaluation context.
    fn metadata(&self) -> Option<&Metadata> {
        None
    }

    /// Returns the anchor used to reference this item weakly.
    ///
    /// `None` means the item cannot be weakly referenced.
    fn anchor(&self) -> Option<&ItemAnchor> {
        None
    }

    /// Returns a stable id the host assigned to this row.
    ///
    /// Used as the cache key for items without an anchor. The id must not
    /// be reused for a different row while a provider may still hold it.
    fn row_id(&self) -> Option<u64> {
        None
    }

    /// Returns `true` for aggregate rows (albums, clusters) whose children
    /// may still be arriving.
    fn is_album_like(&self) -> bool {
        false
    }

    /// Returns `false` while an aggregate row is still loading.
    fn is_loaded(&self) -> bool {
        true
    }
}

impl fmt::Debug for dyn Item + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("anchor", &self.anchor().map(ItemAnchor::key))
            .field("row_id", &self.row_id())
            .finish()
    }
}

/// Liveness handle that lets caches reference an item weakly.
///
/// Cloning an anchor creates a new identity: a cloned item is a different
/// row as far as caches are concerned.
#[derive(Debug)]
pub struct ItemAnchor(Rc<()>);

impl ItemAnchor {
    /// Creates a fresh anchor.
    pub fn new() -> Self {
        ItemAnchor(Rc::new(()))
    }

    /// Creates a weak handle to this anchor.
    pub fn downgrade(&self) -> WeakAnchor {
        WeakAnchor(Rc::downgrade(&self.0))
    }

    /// Returns the stable key of this anchor.
    pub fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl Default for ItemAnchor {
    fn default() -> Self {
        ItemAnchor::new()
    }
}

impl Clone for ItemAnchor {
    fn clone(&self) -> Self {
        ItemAnchor::new()
    }
}

/// Weak counterpart of [`ItemAnchor`].
///
/// Holding a `WeakAnchor` keeps the anchor's allocation reserved, so its key
/// cannot be handed to another anchor while the weak handle exists.
#[derive(Debug, Clone)]
pub struct WeakAnchor(Weak<()>);

impl WeakAnchor {
    /// Returns `true` while the anchor (and therefore its item) is alive.
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Returns the key of the anchor this handle was created from.
    pub fn key(&self) -> usize {
        self.0.as_ptr() as usize
    }
}

/// Tag metadata of an item: tag name to one or more values.
///
/// Hidden (computed) tags use a `~` prefix, e.g. `~bitrate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    tags: BTreeMap<String, Vec<String>>,
}

impl Metadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Metadata::default()
    }

    /// Returns the tag's values joined with `"; "`, or `None` if unset.
    pub fn get(&self, tag: &str) -> Option<String> {
        self.tags
            .get(tag)
            .map(|values| values.join(MULTI_VALUE_JOINER))
    }

    /// Returns all values of a tag (empty when unset).
    pub fn get_all(&self, tag: &str) -> &[String] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `true` if the tag is set.
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// Replaces the tag with a single value.
    pub fn set(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(tag.into(), vec![value.into()]);
    }

    /// Replaces the tag with several values.
    pub fn set_all<I, S>(&mut self, tag: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags
            .insert(tag.into(), values.into_iter().map(Into::into).collect());
    }

    /// Appends a value to the tag.
    pub fn add(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.tags.entry(tag.into()).or_default().push(value.into());
    }

    /// Removes the tag, returning its values.
    pub fn remove(&mut self, tag: &str) -> Option<Vec<String>> {
        self.tags.remove(tag)
    }

    /// Iterates `(tag, joined value)` pairs in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.tags
            .iter()
            .map(|(tag, values)| (tag.as_str(), values.join(MULTI_VALUE_JOINER)))
    }

    /// Iterates `(tag, values)` pairs without joining.
    pub fn rawitems(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.tags
            .iter()
            .map(|(tag, values)| (tag.as_str(), values.as_slice()))
    }

    /// Returns the number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if no tag is set.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut metadata = Metadata::new();
        for (tag, value) in iter {
            metadata.add(tag, value);
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl Item for Bare {}

    #[test]
    fn default_item_has_no_lookup() {
        let item = Bare;
        assert_eq!(item.column("artist"), Err(LookupError::Unsupported));
        assert!(item.metadata().is_none());
        assert!(item.anchor().is_none());
        assert!(!item.is_album_like());
        assert!(item.is_loaded());
    }

    #[test]
    fn metadata_joins_multiple_values() {
        let mut md = Metadata::new();
        md.add("artist", "A");
        md.add("artist", "B");
        md.set("album", "X");

        assert_eq!(md.get("artist").as_deref(), Some("A; B"));
        assert_eq!(md.get_all("artist"), ["A", "B"]);
        assert_eq!(md.get("missing"), None);
        assert!(md.get_all("missing").is_empty());
    }

    #[test]
    fn metadata_iteration_orders_by_tag() {
        let md: Metadata = [("title", "T"), ("artist", "A"), ("artist", "B")]
            .into_iter()
            .collect();

        let joined: Vec<_> = md.iter().collect();
        assert_eq!(
            joined,
            vec![("artist", "A; B".to_string()), ("title", "T".to_string())]
        );

        let raw: Vec<_> = md.rawitems().map(|(tag, values)| (tag, values.len())).collect();
        assert_eq!(raw, vec![("artist", 2), ("title", 1)]);
    }

    #[test]
    fn metadata_set_and_remove() {
        let mut md = Metadata::new();
        md.set_all("genre", ["rock", "pop"]);
        assert_eq!(md.len(), 1);
        assert_eq!(md.remove("genre"), Some(vec!["rock".into(), "pop".into()]));
        assert!(md.is_empty());
    }

    #[test]
    fn weak_anchor_tracks_liveness() {
        let anchor = ItemAnchor::new();
        let weak = anchor.downgrade();
        assert!(weak.is_alive());
        assert_eq!(weak.key(), anchor.key());

        drop(anchor);
        assert!(!weak.is_alive());
    }

    #[test]
    fn cloned_anchor_is_a_new_identity() {
        let anchor = ItemAnchor::new();
        let cloned = anchor.clone();
        assert_ne!(anchor.key(), cloned.key());
    }
}
