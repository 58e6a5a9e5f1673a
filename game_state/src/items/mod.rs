//! Item definitions - the static catalog of collectible rewards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for items. Authored as `[A-Za-z0-9_]+` in templates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An item the player can be rewarded with. Immutable once defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,

    /// Display name shown in the inventory listing.
    pub name: String,

    /// Flavor text shown when the player examines the item.
    pub flavor_text: String,
}

impl Item {
    /// Create a new item with an empty flavor text.
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            flavor_text: String::new(),
        }
    }

    /// Set the examine/flavor text.
    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor_text = flavor.into();
        self
    }
}

/// Serialized shape of one catalog entry; the id is the surrounding map key.
#[derive(Debug, Deserialize)]
struct ItemEntry {
    name: String,
    #[serde(default)]
    flavor_text: String,
}

/// The static catalog of every item the stories can grant.
///
/// Items are defined once, up front, and referenced by id from reward
/// annotations. The catalog never changes during play.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: HashMap<ItemId, Item>,
}

impl ItemCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item definition, replacing any previous one with the same id.
    pub fn insert(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    /// Get an item definition by id.
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    /// Check whether an id names a defined item.
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Find an item by its display name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<&Item> {
        self.items
            .values()
            .find(|item| item.name.eq_ignore_ascii_case(name))
    }

    /// Load a catalog from a JSON document mapping item id to definition.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let entries: HashMap<String, ItemEntry> = serde_json::from_str(json)?;

        let mut catalog = Self::new();
        for (id, entry) in entries {
            catalog.insert(Item::new(id, entry.name).with_flavor(entry.flavor_text));
        }
        Ok(catalog)
    }

    /// Iterate over all item definitions.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Number of defined items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
