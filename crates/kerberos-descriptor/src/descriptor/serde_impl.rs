//! Wire representations of the child containers.
//!
//! The serialized form stores children as lists, the in-memory form as maps keyed by name (or
//! configuration type). Duplicate keys inside one list are rejected.

/// Descriptors stored in a parent map under their own name.
pub(crate) trait Named {
    fn name(&self) -> &str;
}

/// (De)serializes `IndexMap<String, T>` as a list of `T`, keyed by [`Named::name`].
pub(crate) mod named_list {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

    use super::Named;

    pub(crate) fn serialize<S, T>(
        map: &IndexMap<String, T>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub(crate) fn deserialize<'de, D, T>(deserializer: D) -> Result<IndexMap<String, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Named,
    {
        let items = Vec::<T>::deserialize(deserializer)?;
        let mut map = IndexMap::with_capacity(items.len());

        for item in items {
            let name = item.name().to_owned();
            if map.contains_key(&name) {
                return Err(D::Error::custom(format!("duplicate entry named {name:?}")));
            }
            map.insert(name, item);
        }

        Ok(map)
    }
}

/// (De)serializes configurations as a list of `{ <type>: { <property>: <value> } }` maps.
///
/// A single list entry may hold several types. Rendering always writes one entry per type.
pub(crate) mod configuration_list {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    use super::super::ConfigurationDescriptor;

    pub(crate) fn serialize<S>(
        map: &IndexMap<String, ConfigurationDescriptor>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(map.values().map(|configuration| {
            IndexMap::from([(&configuration.config_type, &configuration.properties)])
        }))
    }

    pub(crate) fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<IndexMap<String, ConfigurationDescriptor>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<IndexMap<String, IndexMap<String, String>>>::deserialize(deserializer)?;
        let mut map = IndexMap::new();

        for (config_type, properties) in entries.into_iter().flatten() {
            if map.contains_key(&config_type) {
                return Err(D::Error::custom(format!(
                    "duplicate configuration type {config_type:?}"
                )));
            }
            map.insert(
                config_type.clone(),
                ConfigurationDescriptor::new(config_type, properties),
            );
        }

        Ok(map)
    }
}

