//! Insertion-ordered, name-keyed registries for declared catalog items.

use indexmap::IndexMap;

/// Anything stored in a [`Registry`] is keyed by its unique name.
pub trait Named {
    fn name(&self) -> &str;
}

/// Mapping from name to item. Iteration follows insertion order, which is
/// only used to keep remote writes and cache files stable between runs.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    items: IndexMap<String, T>,
}

impl<T: Named> Registry<T> {
    pub fn new() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }

    /// Insert an item. Returns the rejected item when its name is taken;
    /// the registry keeps the first registration.
    pub fn insert(&mut self, item: T) -> Result<(), T> {
        if self.items.contains_key(item.name()) {
            return Err(item);
        }
        self.items.insert(item.name().to_string(), item);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.items.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }
}

impl<T: Named> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Named> FromIterator<T> for Registry<T> {
    /// Later duplicates are dropped.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for item in iter {
            let _ = registry.insert(item);
        }
        registry
    }
}
