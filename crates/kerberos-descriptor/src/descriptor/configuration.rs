use indexmap::IndexMap;

use crate::merge::Update;

/// A named bag of properties, one per configuration type (roughly: one per config file).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigurationDescriptor {
    pub config_type: String,
    pub properties: IndexMap<String, String>,
}

impl ConfigurationDescriptor {
    pub fn new(config_type: impl Into<String>, properties: IndexMap<String, String>) -> Self {
        Self {
            config_type: config_type.into(),
            properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Sets a single property, returning the value it replaced.
    pub fn put_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.properties.insert(name.into(), value.into())
    }
}

impl<K, V, const N: usize> From<(&str, [(K, V); N])> for ConfigurationDescriptor
where
    K: Into<String>,
    V: Into<String>,
{
    fn from((config_type, properties): (&str, [(K, V); N])) -> Self {
        Self::new(
            config_type,
            properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Update for ConfigurationDescriptor {
    fn update(&mut self, overlay: &Self) {
        self.properties.update(&overlay.properties);
    }
}
