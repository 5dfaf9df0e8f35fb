//! The Kerberos descriptor tree.
//!
//! A descriptor describes which Kerberos identities (principal plus keytab) a cluster needs and
//! which configuration properties have to be set once they exist. It is a strict tree:
//!
//! ```yaml
//! properties:            # root only, global variables
//!   realm: EXAMPLE.COM
//! identities: []         # root level, usually shared identities like the smoke test user
//! configurations: []
//! services:
//!   - name: HDFS
//!     identities: []
//!     configurations: []
//!     components:
//!       - name: NAMENODE
//!         identities: []
//!         configurations: []
//! ```
//!
//! The wire format (JSON or YAML) stores every child container as a list. `services`,
//! `components` and `identities` are lists of objects carrying a `name`, `configurations` is a
//! list of `{ <type>: { <property>: <value> } }` maps. In memory, all of them are insertion
//! ordered maps keyed by name (or configuration type), see [`serde_impl`].
//!
//! Resolution (walking up the tree, following identity references) does not live on the
//! descriptors themselves but on [`Scope`](crate::scope::Scope), which borrows the path from the
//! root down to the container it looks at.
use std::{ffi::OsStr, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use snafu::{ResultExt, Snafu};
use strum::{AsRefStr, Display, EnumString};

use crate::merge::Update;

mod component;
mod configuration;
mod identity;
mod serde_impl;
mod service;

pub use component::ComponentDescriptor;
pub use configuration::ConfigurationDescriptor;
pub use identity::{
    IdentityDescriptor, KeytabAccess, KeytabDescriptor, PrincipalDescriptor, PrincipalType,
};
pub use service::ServiceDescriptor;

type Result<T, E = Error> = std::result::Result<T, E>;

/// Represents every error which can be encountered while reading or rendering descriptors.
///
/// All of them are format errors: the input does not have the shape of a descriptor. No partial
/// tree is ever returned alongside one of these.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse {descriptor_type} descriptor from JSON"))]
    ParseJson {
        source: serde_json::Error,
        descriptor_type: DescriptorType,
    },

    #[snafu(display("failed to parse {descriptor_type} descriptor from YAML"))]
    ParseYaml {
        source: serde_yaml::Error,
        descriptor_type: DescriptorType,
    },

    #[snafu(display("failed to build {descriptor_type} descriptor from structured value"))]
    ParseValue {
        source: serde_json::Error,
        descriptor_type: DescriptorType,
    },

    #[snafu(display("failed to read descriptor file {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[snafu(display("failed to render {descriptor_type} descriptor as JSON"))]
    RenderJson {
        source: serde_json::Error,
        descriptor_type: DescriptorType,
    },

    #[snafu(display("failed to render {descriptor_type} descriptor as YAML"))]
    RenderYaml {
        source: serde_yaml::Error,
        descriptor_type: DescriptorType,
    },
}

/// The closed set of node kinds found in a descriptor tree.
#[derive(AsRefStr, Clone, Copy, Debug, Display, EnumString, Eq, Hash, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum DescriptorType {
    #[strum(serialize = "kerberos")]
    Root,
    Service,
    Component,
    Identity,
    Principal,
    Keytab,
    Configuration,
}

impl DescriptorType {
    /// The key under which a list of descriptors of this type is stored in the parent.
    pub fn plural_name(self) -> &'static str {
        match self {
            Self::Root => "kerberos",
            Self::Service => "services",
            Self::Component => "components",
            Self::Identity => "identities",
            Self::Principal => "principals",
            Self::Keytab => "keytabs",
            Self::Configuration => "configurations",
        }
    }

    /// Whether descriptors of this type own child descriptors.
    pub fn is_container(self) -> bool {
        matches!(self, Self::Root | Self::Service | Self::Component)
    }
}

/// Conversions shared by every descriptor that can be read and rendered on its own.
pub trait Descriptor: Serialize + DeserializeOwned {
    const DESCRIPTOR_TYPE: DescriptorType;

    fn descriptor_type(&self) -> DescriptorType {
        Self::DESCRIPTOR_TYPE
    }

    fn is_container(&self) -> bool {
        Self::DESCRIPTOR_TYPE.is_container()
    }

    fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).context(ParseJsonSnafu {
            descriptor_type: Self::DESCRIPTOR_TYPE,
        })
    }

    /// Parses YAML input. Since YAML is a superset of JSON, this accepts JSON as well.
    fn from_yaml_str(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context(ParseYamlSnafu {
            descriptor_type: Self::DESCRIPTOR_TYPE,
        })
    }

    /// Builds the descriptor from a generic nested map, as produced by any JSON-like parser.
    fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).context(ParseValueSnafu {
            descriptor_type: Self::DESCRIPTOR_TYPE,
        })
    }

    /// Reads a descriptor file. Files ending in `.json` are parsed as JSON, everything else as
    /// YAML.
    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;

        if path.extension() == Some(OsStr::new("json")) {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        }
    }

    /// Renders the descriptor back into the generic nested map it can be built from.
    fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).context(RenderJsonSnafu {
            descriptor_type: Self::DESCRIPTOR_TYPE,
        })
    }

    fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context(RenderJsonSnafu {
            descriptor_type: Self::DESCRIPTOR_TYPE,
        })
    }

    fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context(RenderYamlSnafu {
            descriptor_type: Self::DESCRIPTOR_TYPE,
        })
    }
}

/// A descriptor which holds identities and configurations: the root, a service or a component.
pub trait Container {
    fn identities(&self) -> &IndexMap<String, IdentityDescriptor>;

    fn configurations(&self) -> &IndexMap<String, ConfigurationDescriptor>;

    /// Looks up an identity defined directly on this container, by exact name.
    fn identity(&self, name: &str) -> Option<&IdentityDescriptor> {
        self.identities().get(name)
    }

    /// Looks up a configuration defined directly on this container, by exact type.
    fn configuration(&self, config_type: &str) -> Option<&ConfigurationDescriptor> {
        self.configurations().get(config_type)
    }
}

/// The root of a descriptor tree.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KerberosDescriptor {
    /// Global variables, addressable as `${name}` without a configuration type.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, String>,

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

    #[serde(
        default,
        skip_serializing_if = "IndexMap::is_empty",
        with = "serde_impl::named_list"
    )]
    pub services: IndexMap<String, ServiceDescriptor>,
}

impl Descriptor for KerberosDescriptor {
    const DESCRIPTOR_TYPE: DescriptorType = DescriptorType::Root;
}

impl Container for KerberosDescriptor {
    fn identities(&self) -> &IndexMap<String, IdentityDescriptor> {
        &self.identities
    }

    fn configurations(&self) -> &IndexMap<String, ConfigurationDescriptor> {
        &self.configurations
    }
}

impl Update for KerberosDescriptor {
    fn update(&mut self, overlay: &Self) {
        self.properties.update(&overlay.properties);
        self.configurations.update(&overlay.configurations);
        self.identities.update(&overlay.identities);
        self.services.update(&overlay.services);
    }
}

impl KerberosDescriptor {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    pub fn services(&self) -> &IndexMap<String, ServiceDescriptor> {
        &self.services
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.get(name)
    }

    /// Adds (or replaces) a service, keyed by its name.
    pub fn put_service(&mut self, service: ServiceDescriptor) {
        self.services.insert(service.name.clone(), service);
    }

    /// Adds (or replaces) a root level identity, keyed by its name.
    pub fn put_identity(&mut self, identity: IdentityDescriptor) {
        self.identities.insert(identity.name.clone(), identity);
    }

    /// Adds (or replaces) a root level configuration, keyed by its type.
    pub fn put_configuration(&mut self, configuration: ConfigurationDescriptor) {
        self.configurations
            .insert(configuration.config_type.clone(), configuration);
    }
}
