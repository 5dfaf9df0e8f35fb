//! Turns a [`Scope`] into concrete values for the layer that creates keytabs and writes
//! configuration files.
//!
//! Materializing resolves all identities and configurations visible from the scope and expands
//! every variable in them. Variables are looked up in the cluster configurations supplied by the
//! caller. The global properties of the root descriptor are available under the empty type,
//! unless the caller already supplied a global value of the same name.
use std::collections::BTreeMap;

use serde::Serialize;
use snafu::{ResultExt, Snafu};
use tracing::{debug, instrument, warn};

use crate::{
    descriptor::{IdentityDescriptor, KeytabAccess, KeytabDescriptor, PrincipalDescriptor},
    scope::Scope,
    variables::{self, Configurations, replace_variables},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("failed to expand variables of identity {identity:?}"))]
    ExpandIdentity {
        source: variables::Error,
        identity: String,
    },

    #[snafu(display("failed to expand variables of property {property:?} in {config_type:?}"))]
    ExpandConfiguration {
        source: variables::Error,
        config_type: String,
        property: String,
    },
}

/// Everything a consumer needs to provision one scope.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MaterializedScope {
    pub identities: Vec<MaterializedIdentity>,
    pub configurations: Configurations,
}

/// A fully resolved identity with all variables expanded.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MaterializedIdentity {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<PrincipalDescriptor>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keytab: Option<KeytabDescriptor>,
}

impl Scope<'_> {
    /// Resolves and expands all identities and configurations visible from this scope.
    ///
    /// Identities whose reference cannot be resolved are skipped.
    #[instrument(skip_all, fields(scope = %self.descriptor_type()))]
    pub fn materialize(
        &self,
        cluster_configurations: &Configurations,
    ) -> Result<MaterializedScope> {
        let context = self.variable_context(cluster_configurations);

        let mut identities = Vec::new();
        for collected in self.collect_identities() {
            if collected.dangling {
                warn!(
                    identity = %collected.identity.name,
                    "skipping identity with unresolved reference"
                );
                continue;
            }

            identities.push(materialize_identity(collected.identity, &context)?);
        }

        let mut configurations = Configurations::new();
        for (config_type, configuration) in self.configurations(true) {
            let properties = configuration
                .properties
                .iter()
                .map(|(property, value)| -> Result<_> {
                    let value = replace_variables(value, &context).with_context(|_| {
                        ExpandConfigurationSnafu {
                            config_type: config_type.clone(),
                            property: property.clone(),
                        }
                    })?;
                    Ok((property.clone(), value))
                })
                .collect::<Result<BTreeMap<_, _>>>()?;
            configurations.insert(config_type, properties);
        }

        debug!(
            identities = identities.len(),
            configurations = configurations.len(),
            "materialized scope"
        );

        Ok(MaterializedScope {
            identities,
            configurations,
        })
    }

    /// The values variables are looked up in: the cluster configurations, plus the root
    /// descriptor properties as globals where the cluster does not define them.
    pub fn variable_context(&self, cluster_configurations: &Configurations) -> Configurations {
        let mut context = cluster_configurations.clone();
        let globals = context.entry(String::new()).or_default();

        for (name, value) in self.properties() {
            globals
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }

        context
    }
}

fn materialize_identity(
    identity: IdentityDescriptor,
    context: &Configurations,
) -> Result<MaterializedIdentity> {
    let name = identity.name;
    let expand = |value: Option<String>| -> Result<Option<String>> {
        value
            .map(|value| replace_variables(&value, context))
            .transpose()
            .with_context(|_| ExpandIdentitySnafu {
                identity: name.clone(),
            })
    };
    let expand_access = |access: Option<KeytabAccess>| -> Result<Option<KeytabAccess>> {
        access
            .map(|access| {
                Ok(KeytabAccess {
                    name: expand(access.name)?,
                    access: access.access,
                })
            })
            .transpose()
    };

    let principal = identity
        .principal
        .map(|principal| -> Result<_> {
            Ok(PrincipalDescriptor {
                value: expand(principal.value)?,
                principal_type: principal.principal_type,
                configuration: expand(principal.configuration)?,
                local_username: expand(principal.local_username)?,
            })
        })
        .transpose()?;

    let keytab = identity
        .keytab
        .map(|keytab| -> Result<_> {
            Ok(KeytabDescriptor {
                file: expand(keytab.file)?,
                owner: expand_access(keytab.owner)?,
                group: expand_access(keytab.group)?,
                configuration: expand(keytab.configuration)?,
                cachable: keytab.cachable,
            })
        })
        .transpose()?;

    Ok(MaterializedIdentity {
        name,
        principal,
        keytab,
    })
}
