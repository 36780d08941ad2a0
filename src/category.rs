//! Category labels shared across tracked applications. [CategoryRegistry] is a
//! deduplicating cache: at any moment exactly one [Category] instance exists per
//! canonical (lowercase-folded) name, and every application holds an [Arc] into it.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::error::TrackerError;

/// Name returned for applications that were never assigned a category.
pub const DEFAULT_CATEGORY_NAME: &str = "uncategorized";

const MAX_NAME_LENGTH: usize = 50;

/// A single category label. Shared through [Arc], so a rename through the registry
/// is visible to every application holding the category without re-fetching.
#[derive(Debug)]
pub struct Category {
    name: RwLock<Arc<str>>,
}

impl Category {
    fn new(canonical: Arc<str>) -> Self {
        Self {
            name: RwLock::new(canonical),
        }
    }

    /// Current canonical name of the category.
    pub fn name(&self) -> Arc<str> {
        self.name.read().expect("category name lock poisoned").clone()
    }

    fn rename(&self, canonical: Arc<str>) {
        *self.name.write().expect("category name lock poisoned") = canonical;
    }
}

/// Canonical, deduplicated set of categories, keyed by lowercase-folded name.
/// Explicitly owned and passed around rather than process-global, so tests can run
/// against isolated instances.
#[derive(Debug)]
pub struct CategoryRegistry {
    entries: HashMap<Arc<str>, Arc<Category>>,
    default: Arc<Category>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        let default = Arc::new(Category::new(DEFAULT_CATEGORY_NAME.into()));
        let mut entries = HashMap::new();
        entries.insert(default.name(), default.clone());
        Self { entries, default }
    }

    /// The always-available category used for newly added applications.
    pub fn default_category(&self) -> Arc<Category> {
        self.default.clone()
    }

    /// Returns the category registered under the canonical form of `raw`, creating
    /// and registering it on first reference.
    pub fn get_or_create(&mut self, raw: &str) -> Result<Arc<Category>, TrackerError> {
        let canonical = canonicalize(raw)?;
        let entry = self
            .entries
            .entry(canonical.clone())
            .or_insert_with(|| Arc::new(Category::new(canonical)));
        Ok(entry.clone())
    }

    /// Registers a category. A no-op if the canonical name already exists.
    pub fn add(&mut self, raw: &str) -> Result<(), TrackerError> {
        self.get_or_create(raw).map(|_| ())
    }

    /// Re-keys an existing category in place. The [Category] object is preserved, so
    /// applications holding it observe the new name through their existing reference.
    /// All checks happen before any mutation: an invalid `new` name fails with
    /// [TrackerError::InvalidCategoryName], as does a `new` name whose canonical form
    /// already belongs to a different category — re-keying onto a live entry would
    /// orphan its holders without anyone asking for a removal.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), TrackerError> {
        let new_canonical = canonicalize(new)?;
        let old_canonical = old.to_lowercase();
        if !self.entries.contains_key(old_canonical.as_str()) {
            return Err(TrackerError::CategoryNotFound(old.to_owned()));
        }
        if new_canonical.as_ref() != old_canonical.as_str()
            && self.entries.contains_key(new_canonical.as_ref())
        {
            return Err(TrackerError::InvalidCategoryName(new.to_owned()));
        }
        if let Some(category) = self.entries.remove(old_canonical.as_str()) {
            category.rename(new_canonical.clone());
            self.entries.insert(new_canonical, category);
        }
        Ok(())
    }

    /// Deletes a category. Applications still holding it keep their now-orphaned
    /// reference; reassigning them is the caller's responsibility.
    pub fn remove(&mut self, raw: &str) -> Result<(), TrackerError> {
        self.entries
            .remove(raw.to_lowercase().as_str())
            .map(|_| ())
            .ok_or_else(|| TrackerError::CategoryNotFound(raw.to_owned()))
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.entries.contains_key(raw.to_lowercase().as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates the raw (pre-fold) name and produces the canonical registry key.
/// Internal whitespace is preserved; only the case is folded.
fn canonicalize(raw: &str) -> Result<Arc<str>, TrackerError> {
    let length = raw.chars().count();
    let all_whitespace = !raw.chars().any(|c| !c.is_whitespace());
    if length == 0 || length > MAX_NAME_LENGTH || all_whitespace {
        return Err(TrackerError::InvalidCategoryName(raw.to_owned()));
    }
    Ok(raw.to_lowercase().into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::TrackerError;

    use super::{CategoryRegistry, DEFAULT_CATEGORY_NAME};

    #[test]
    fn get_or_create_deduplicates_case_variants() {
        let mut registry = CategoryRegistry::new();
        let first = registry.get_or_create("Productivity").unwrap();
        let second = registry.get_or_create("productivity").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name().as_ref(), "productivity");
        // The default plus one user category.
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn default_category_always_available() {
        let registry = CategoryRegistry::new();
        assert_eq!(registry.default_category().name().as_ref(), DEFAULT_CATEGORY_NAME);
        assert!(registry.contains(DEFAULT_CATEGORY_NAME));
    }

    #[test]
    fn add_is_idempotent() {
        let mut registry = CategoryRegistry::new();
        registry.add("Gaming").unwrap();
        registry.add("gaming").unwrap();
        registry.add("GAMING").unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn rename_preserves_identity() {
        let mut registry = CategoryRegistry::new();
        let held = registry.get_or_create("Gaming").unwrap();

        registry.rename("Gaming", "Fitness").unwrap();

        assert_eq!(held.name().as_ref(), "fitness");
        assert!(registry.contains("fitness"));
        assert!(!registry.contains("gaming"));
        assert!(Arc::ptr_eq(&held, &registry.get_or_create("fitness").unwrap()));
    }

    #[test]
    fn rename_of_unregistered_name_fails() {
        let mut registry = CategoryRegistry::new();
        assert_eq!(
            registry.rename("missing", "present"),
            Err(TrackerError::CategoryNotFound("missing".to_owned()))
        );
        assert!(!registry.contains("present"));
    }

    #[test]
    fn rename_onto_another_live_category_is_rejected() {
        let mut registry = CategoryRegistry::new();
        let gaming = registry.get_or_create("Gaming").unwrap();
        let media = registry.get_or_create("Media").unwrap();

        assert_eq!(
            registry.rename("Gaming", "MEDIA"),
            Err(TrackerError::InvalidCategoryName("MEDIA".to_owned()))
        );
        // Nothing moved: both categories keep their names and registry entries.
        assert_eq!(gaming.name().as_ref(), "gaming");
        assert_eq!(media.name().as_ref(), "media");
        assert!(registry.contains("gaming"));
        assert!(registry.contains("media"));
    }

    #[test]
    fn rename_to_a_case_variant_of_itself_succeeds() {
        let mut registry = CategoryRegistry::new();
        let held = registry.get_or_create("Gaming").unwrap();

        registry.rename("gaming", "GAMING").unwrap();

        assert_eq!(held.name().as_ref(), "gaming");
        assert!(registry.contains("gaming"));
    }

    #[test]
    fn rename_to_invalid_name_leaves_registry_untouched() {
        let mut registry = CategoryRegistry::new();
        registry.add("Gaming").unwrap();

        let result = registry.rename("Gaming", "   ");
        assert!(matches!(result, Err(TrackerError::InvalidCategoryName(_))));
        assert!(registry.contains("gaming"));
    }

    #[test]
    fn remove_orphans_held_references() {
        let mut registry = CategoryRegistry::new();
        let held = registry.get_or_create("Media").unwrap();

        registry.remove("MEDIA").unwrap();

        assert!(!registry.contains("media"));
        // The held reference survives with its last name.
        assert_eq!(held.name().as_ref(), "media");
        assert_eq!(
            registry.remove("media"),
            Err(TrackerError::CategoryNotFound("media".to_owned()))
        );
    }

    #[test]
    fn name_length_boundaries() {
        let mut registry = CategoryRegistry::new();

        assert!(matches!(
            registry.add(""),
            Err(TrackerError::InvalidCategoryName(_))
        ));
        assert!(registry.add("a").is_ok());
        assert!(registry.add(&"b".repeat(50)).is_ok());
        assert!(matches!(
            registry.add(&"c".repeat(51)),
            Err(TrackerError::InvalidCategoryName(_))
        ));
    }

    #[test]
    fn all_whitespace_names_are_rejected() {
        let mut registry = CategoryRegistry::new();
        for raw in [" ", "   ", "\t \t", &" ".repeat(50)] {
            assert!(matches!(
                registry.add(raw),
                Err(TrackerError::InvalidCategoryName(_))
            ));
        }
        // Internal whitespace is fine and preserved.
        let spaced = registry.get_or_create("Deep Work").unwrap();
        assert_eq!(spaced.name().as_ref(), "deep work");
    }
}
