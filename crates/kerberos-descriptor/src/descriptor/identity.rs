use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{Descriptor, DescriptorType, serde_impl::Named};
use crate::merge::{Merge, Update};

/// A Kerberos identity: a principal and the keytab holding its key.
///
/// An identity either defines its principal and keytab itself, or it *references* another
/// identity somewhere up the tree and only overrides single fields of it. An identity is a
/// reference if [`IdentityDescriptor::reference`] is set, or if its name starts with a `/`
/// (`/smokeuser` references the root level identity `smokeuser`).
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityDescriptor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<PrincipalDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keytab: Option<KeytabDescriptor>,
}

impl IdentityDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates an identity that references `target` and defines nothing else.
    pub fn reference_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: Some(target.into()),
            ..Default::default()
        }
    }

    pub fn with_principal(mut self, principal: PrincipalDescriptor) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_keytab(mut self, keytab: KeytabDescriptor) -> Self {
        self.keytab = Some(keytab);
        self
    }

    /// The name of the identity this one points to, if it is a reference.
    ///
    /// An explicit [`IdentityDescriptor::reference`] takes precedence over a `/`-prefixed name.
    pub fn reference_target(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .or_else(|| self.name.starts_with('/').then_some(self.name.as_str()))
    }

    pub fn is_reference(&self) -> bool {
        self.reference_target().is_some()
    }

    /// Fills every field not set on `self` from `target`.
    ///
    /// Overrides are per field: a reference that only sets the keytab owner keeps that owner
    /// and takes the keytab file, group and configuration from `target`.
    pub fn inherit_from(&mut self, target: &Self) {
        self.principal.merge(&target.principal);
        self.keytab.merge(&target.keytab);
    }
}

impl Named for IdentityDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Descriptor for IdentityDescriptor {
    const DESCRIPTOR_TYPE: DescriptorType = DescriptorType::Identity;
}

impl Update for IdentityDescriptor {
    fn update(&mut self, overlay: &Self) {
        self.reference.update(&overlay.reference);
        self.principal.update(&overlay.principal);
        self.keytab.update(&overlay.keytab);
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrincipalType {
    User,
    Service,
}

impl Merge for PrincipalType {
    fn merge(&mut self, _defaults: &Self) {}
}

impl Update for PrincipalType {
    fn update(&mut self, overlay: &Self) {
        *self = *overlay;
    }
}

/// The principal of an identity. The value is a pattern which may contain `${...}` variables.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrincipalDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub principal_type: Option<PrincipalType>,

    /// The `type/property` that receives the resolved principal name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_username: Option<String>,
}

impl PrincipalDescriptor {
    pub fn new(value: impl Into<String>, principal_type: PrincipalType) -> Self {
        Self {
            value: Some(value.into()),
            principal_type: Some(principal_type),
            ..Default::default()
        }
    }

    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }
}

impl Descriptor for PrincipalDescriptor {
    const DESCRIPTOR_TYPE: DescriptorType = DescriptorType::Principal;
}

impl Merge for PrincipalDescriptor {
    fn merge(&mut self, defaults: &Self) {
        self.value.merge(&defaults.value);
        self.principal_type.merge(&defaults.principal_type);
        self.configuration.merge(&defaults.configuration);
        self.local_username.merge(&defaults.local_username);
    }
}

impl Update for PrincipalDescriptor {
    fn update(&mut self, overlay: &Self) {
        self.value.update(&overlay.value);
        self.principal_type.update(&overlay.principal_type);
        self.configuration.update(&overlay.configuration);
        self.local_username.update(&overlay.local_username);
    }
}

/// Where a keytab file lives, who may read it and which property receives its path.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeytabDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<KeytabAccess>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<KeytabAccess>,

    /// The `type/property` that receives the resolved keytab path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cachable: Option<bool>,
}

impl KeytabDescriptor {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            ..Default::default()
        }
    }

    pub fn with_owner(mut self, name: impl Into<String>, access: impl Into<String>) -> Self {
        self.owner = Some(KeytabAccess::new(name, access));
        self
    }

    pub fn with_group(mut self, name: impl Into<String>, access: impl Into<String>) -> Self {
        self.group = Some(KeytabAccess::new(name, access));
        self
    }

    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }
}

impl Descriptor for KeytabDescriptor {
    const DESCRIPTOR_TYPE: DescriptorType = DescriptorType::Keytab;
}

impl Merge for KeytabDescriptor {
    fn merge(&mut self, defaults: &Self) {
        self.file.merge(&defaults.file);
        self.owner.merge(&defaults.owner);
        self.group.merge(&defaults.group);
        self.configuration.merge(&defaults.configuration);
        self.cachable.merge(&defaults.cachable);
    }
}

impl Update for KeytabDescriptor {
    fn update(&mut self, overlay: &Self) {
        self.file.update(&overlay.file);
        self.owner.update(&overlay.owner);
        self.group.update(&overlay.group);
        self.configuration.update(&overlay.configuration);
        self.cachable.update(&overlay.cachable);
    }
}

/// Owner or group of a keytab file together with its access mode (`r`, `rw`, ...).
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeytabAccess {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
}

impl KeytabAccess {
    pub fn new(name: impl Into<String>, access: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            access: Some(access.into()),
        }
    }
}

impl Merge for KeytabAccess {
    fn merge(&mut self, defaults: &Self) {
        self.name.merge(&defaults.name);
        self.access.merge(&defaults.access);
    }
}

impl Update for KeytabAccess {
    fn update(&mut self, overlay: &Self) {
        self.name.update(&overlay.name);
        self.access.update(&overlay.access);
    }
}
