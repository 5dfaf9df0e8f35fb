use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{
    ConfigurationDescriptor, Container, Descriptor, DescriptorType, IdentityDescriptor,
    serde_impl::{self, Named},
};
use crate::merge::Update;

/// A component of a service, for example the NameNode of HDFS.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentDescriptor {
    pub name: String,

    #[serde(
        default,
        skip_serializing_if = "IndexMap::is_empty",
        with = "serde_impl::configuration_list"
    )]
    pub configurations: IndexMap<String, ConfigurationDescriptor>,

    #[serde(
        default,
        skip_serializing_if = "IndexMap::is_empty",
        with = "serde_impl::named_list"
    )]
    pub identities: IndexMap<String, IdentityDescriptor>,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_identity(mut self, identity: IdentityDescriptor) -> Self {
        self.identities.insert(identity.name.clone(), identity);
        self
    }

    pub fn with_configuration(mut self, configuration: ConfigurationDescriptor) -> Self {
        self.configurations
            .insert(configuration.config_type.clone(), configuration);
        self
    }
}

impl Named for ComponentDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Descriptor for ComponentDescriptor {
    const DESCRIPTOR_TYPE: DescriptorType = DescriptorType::Component;
}

impl Container for ComponentDescriptor {
    fn identities(&self) -> &IndexMap<String, IdentityDescriptor> {
        &self.identities
    }

    fn configurations(&self) -> &IndexMap<String, ConfigurationDescriptor> {
        &self.configurations
    }
}

impl Update for ComponentDescriptor {
    fn update(&mut self, overlay: &Self) {
        self.configurations.update(&overlay.configurations);
        self.identities.update(&overlay.identities);
    }
}
