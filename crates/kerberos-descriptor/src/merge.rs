//! Merging of descriptor trees and their leaf values.
//!
//! There are two directions:
//!
//! - [`Merge`] fills in what is *missing* on `self` from a set of defaults. Values already set on
//!   `self` win. This is what a reference identity does with the identity it points to: every
//!   field it sets itself stays, everything else is inherited.
//! - [`Update`] lays an overlay *on top* of `self`. Values set in the overlay win, keys that only
//!   exist on `self` survive, and nested containers are updated recursively. This is how a
//!   descriptor tree is combined with a second one (for example a stack default with a user
//!   supplied descriptor).
//!
//! Neither direction ever removes a key.
use std::hash::Hash;

use indexmap::{IndexMap, map::Entry};

/// A type that can be merged with itself, preferring its own values.
///
/// # Example
///
/// ```
/// # use kerberos_descriptor::merge::{Merge, merge};
/// # use kerberos_descriptor::descriptor::KeytabAccess;
/// let reference = KeytabAccess {
///     name: None,
///     access: Some("r".to_owned()),
/// };
/// let target = KeytabAccess {
///     name: Some("hdfs".to_owned()),
///     access: Some("rw".to_owned()),
/// };
///
/// assert_eq!(merge(reference, &target), KeytabAccess {
///     name: Some("hdfs".to_owned()), // Fallback is used
///     access: Some("r".to_owned()),  // Kept from the reference
/// });
/// ```
pub trait Merge {
    /// Merge with `defaults`, preferring values from `self` if they are set there
    fn merge(&mut self, defaults: &Self);
}

/// A type that can be updated in place by an overlay of the same type, preferring the overlay.
pub trait Update {
    /// Apply `overlay` on top of `self`. `overlay` is never modified.
    fn update(&mut self, overlay: &Self);
}

// Strings are leaves: they are either kept or replaced as a whole.
impl Merge for String {
    fn merge(&mut self, _defaults: &Self) {}
}

impl Update for String {
    fn update(&mut self, overlay: &Self) {
        self.clone_from(overlay);
    }
}

impl Merge for bool {
    fn merge(&mut self, _defaults: &Self) {}
}

impl Update for bool {
    fn update(&mut self, overlay: &Self) {
        *self = *overlay;
    }
}

impl<T: Merge + Clone> Merge for Option<T> {
    fn merge(&mut self, defaults: &Self) {
        if let Some(default_value) = defaults {
            match self {
                Some(value) => value.merge(default_value),
                None => *self = Some(default_value.clone()),
            }
        }
    }
}

impl<T: Update + Clone> Update for Option<T> {
    fn update(&mut self, overlay: &Self) {
        if let Some(overlay_value) = overlay {
            match self {
                Some(value) => value.update(overlay_value),
                None => *self = Some(overlay_value.clone()),
            }
        }
    }
}

impl<K: Hash + Eq + Clone, V: Merge + Clone> Merge for IndexMap<K, V> {
    fn merge(&mut self, defaults: &Self) {
        for (k, default_v) in defaults {
            match self.entry(k.clone()) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().merge(default_v);
                }
                Entry::Vacant(entry) => {
                    entry.insert(default_v.clone());
                }
            }
        }
    }
}

impl<K: Hash + Eq + Clone, V: Update + Clone> Update for IndexMap<K, V> {
    fn update(&mut self, overlay: &Self) {
        for (k, overlay_v) in overlay {
            match self.entry(k.clone()) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().update(overlay_v);
                }
                Entry::Vacant(entry) => {
                    entry.insert(overlay_v.clone());
                }
            }
        }
    }
}

/// Moving version of [`Merge::merge`], to produce slightly nicer test output
pub fn merge<T: Merge>(mut overrides: T, defaults: &T) -> T {
    overrides.merge(defaults);
    overrides
}

/// Moving version of [`Update::update`]
pub fn update<T: Update>(mut base: T, overlay: &T) -> T {
    base.update(overlay);
    base
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn properties(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Accumulator(u8);

    impl Update for Accumulator {
        fn update(&mut self, overlay: &Self) {
            self.0 += overlay.0;
        }
    }

    impl Merge for Accumulator {
        fn merge(&mut self, defaults: &Self) {
            self.0 += defaults.0;
        }
    }

    #[test]
    fn update_properties_is_right_biased_union() {
        let base = properties(&[
            ("realm", "${cluster-env/kerberos_domain}"),
            ("keytab_dir", "/etc/security/keytabs"),
        ]);
        let overlay = properties(&[("realm", "EXAMPLE.COM"), ("some.property", "Hello World")]);

        let updated = update(base, &overlay);

        assert_eq!(
            updated,
            properties(&[
                ("realm", "EXAMPLE.COM"),
                ("keytab_dir", "/etc/security/keytabs"),
                ("some.property", "Hello World"),
            ])
        );
        // Existing keys keep their position, new ones are appended
        assert_eq!(
            updated.keys().collect::<Vec<_>>(),
            ["realm", "keytab_dir", "some.property"]
        );
    }

    #[test]
    fn merge_properties_is_left_biased_union() {
        let own = properties(&[("realm", "OWN.COM")]);
        let defaults = properties(&[("realm", "EXAMPLE.COM"), ("keytab_dir", "/etc")]);

        assert_eq!(
            merge(own, &defaults),
            properties(&[("realm", "OWN.COM"), ("keytab_dir", "/etc")])
        );
    }

    #[test]
    fn update_map_recurses_into_existing_keys() {
        let mut base = IndexMap::from([("a".to_owned(), Accumulator(1))]);
        let overlay = IndexMap::from([
            ("a".to_owned(), Accumulator(2)),
            ("b".to_owned(), Accumulator(5)),
        ]);

        base.update(&overlay);

        assert_eq!(base["a"], Accumulator(3));
        assert_eq!(base["b"], Accumulator(5));
        assert_eq!(overlay["a"], Accumulator(2));
    }

    #[test]
    fn merge_map_recurses_into_existing_keys() {
        let mut own = IndexMap::from([("a".to_owned(), Accumulator(1))]);
        own.merge(&IndexMap::from([("a".to_owned(), Accumulator(4))]));
        assert_eq!(own["a"], Accumulator(5));
    }

    #[test]
    fn option_update() {
        assert_eq!(update(None, &Some("b".to_owned())), Some("b".to_owned()));
        assert_eq!(
            update(Some("a".to_owned()), &Some("b".to_owned())),
            Some("b".to_owned())
        );
        assert_eq!(update(Some("a".to_owned()), &None), Some("a".to_owned()));
    }

    #[test]
    fn option_merge() {
        assert_eq!(merge(None, &Some("b".to_owned())), Some("b".to_owned()));
        assert_eq!(
            merge(Some("a".to_owned()), &Some("b".to_owned())),
            Some("a".to_owned())
        );
        assert_eq!(merge::<Option<String>>(None, &None), None);
    }

    #[test]
    fn update_never_drops_keys() {
        let base = properties(&[("a", "1"), ("b", "2")]);
        let overlay = properties(&[("b", "3"), ("c", "4")]);
        let updated = update(base.clone(), &overlay);

        assert!(updated.len() >= base.len().max(overlay.len()));
        for key in base.keys().chain(overlay.keys()) {
            assert!(updated.contains_key(key), "{key} was dropped");
        }
    }
}
