//! Resolution of identities and configurations along the path from the root to a container.
//!
//! Descriptors only own their children, they do not know their parents. A [`Scope`] borrows the
//! whole path instead (root, optionally a service, optionally one of its components) and walks
//! it outward whenever something has to be inherited or looked up by name. The walk is bounded by
//! the depth of the tree.
//!
//! # Identities
//!
//! [`Scope::identities`] with `resolve = true` returns the identities of the container itself,
//! followed by every identity of its ancestors that is not shadowed by a closer one. References
//! are replaced by copies that inherit all fields they do not set themselves from their target.
//!
//! # Configurations
//!
//! [`Scope::configurations`] with `resolve = true` returns the union of all configuration types
//! along the path. A type defined on a closer level replaces the same type of a farther level
//! as a whole, properties are *not* merged across levels.
use std::{collections::HashSet, ptr};

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::descriptor::{
    ComponentDescriptor, ConfigurationDescriptor, Container, DescriptorType, IdentityDescriptor,
    KerberosDescriptor, ServiceDescriptor,
};

/// The path from the root of a descriptor tree down to one container.
#[derive(Clone, Copy, Debug)]
pub struct Scope<'a> {
    root: &'a KerberosDescriptor,
    service: Option<&'a ServiceDescriptor>,
    // Only ever set together with `service`
    component: Option<&'a ComponentDescriptor>,
}

/// An identity as produced by the resolution walk, plus whether a reference in it dangles.
pub(crate) struct CollectedIdentity {
    pub(crate) identity: IdentityDescriptor,
    pub(crate) dangling: bool,
}

impl KerberosDescriptor {
    /// The scope of the root itself.
    pub fn scope(&self) -> Scope<'_> {
        Scope {
            root: self,
            service: None,
            component: None,
        }
    }

    /// The scope of a service, if the service exists.
    pub fn service_scope(&self, service: &str) -> Option<Scope<'_>> {
        self.scope().service(service)
    }

    /// The scope of a component, if both the service and the component exist.
    pub fn component_scope(&self, service: &str, component: &str) -> Option<Scope<'_>> {
        self.scope().service(service)?.component(component)
    }
}

impl<'a> Scope<'a> {
    /// Descends into a service of the root descriptor.
    pub fn service(&self, name: &str) -> Option<Self> {
        let service = self.root.service(name)?;
        Some(Self {
            root: self.root,
            service: Some(service),
            component: None,
        })
    }

    /// Descends into a component of the current service. Returns [`None`] on the root scope.
    pub fn component(&self, name: &str) -> Option<Self> {
        let service = self.service?;
        let component = service.component(name)?;
        Some(Self {
            root: self.root,
            service: Some(service),
            component: Some(component),
        })
    }

    /// The enclosing scope, [`None`] for the root.
    pub fn parent(&self) -> Option<Self> {
        match (self.service, self.component) {
            (Some(_), Some(_)) => Some(Self {
                component: None,
                ..*self
            }),
            (Some(_), None) => Some(self.root.scope()),
            (None, _) => None,
        }
    }

    /// This scope followed by all of its ancestors, closest first.
    pub fn ancestry(&self) -> impl Iterator<Item = Self> + use<'a> {
        std::iter::successors(Some(*self), Self::parent)
    }

    pub fn root(&self) -> &'a KerberosDescriptor {
        self.root
    }

    pub fn service_descriptor(&self) -> Option<&'a ServiceDescriptor> {
        self.service
    }

    pub fn component_descriptor(&self) -> Option<&'a ComponentDescriptor> {
        self.component
    }

    pub fn descriptor_type(&self) -> DescriptorType {
        match (self.service, self.component) {
            (_, Some(_)) => DescriptorType::Component,
            (Some(_), None) => DescriptorType::Service,
            (None, None) => DescriptorType::Root,
        }
    }

    /// The container this scope points at.
    pub fn container(&self) -> &'a dyn Container {
        match (self.service, self.component) {
            (_, Some(component)) => component,
            (Some(service), None) => service,
            (None, None) => self.root,
        }
    }

    /// The global properties of the root descriptor.
    pub fn properties(&self) -> &'a IndexMap<String, String> {
        &self.root.properties
    }

    /// Looks up an identity by name.
    ///
    /// A name starting with `/` is absolute and only matches identities of the root descriptor
    /// (`/shared` finds the root identity `shared`). Any other name is searched on this container
    /// first, then outward through all ancestors. The first match wins.
    pub fn identity(&self, name: &str) -> Option<&'a IdentityDescriptor> {
        self.find_identity(name, None)
            .map(|(_, identity)| identity)
    }

    /// Returns the identities visible from this scope.
    ///
    /// With `resolve = false` these are exactly the identities stored on this container, in
    /// their stored order, with references left untouched.
    ///
    /// With `resolve = true` every reference is replaced by a copy that inherits from its target,
    /// and the identities of all ancestors that are not shadowed by a closer identity are
    /// appended. An ancestor identity is shadowed if a closer identity has the same name, where
    /// `/shared` counts as the name of the root identity `shared`. Being the target of a closer
    /// reference does not shadow an identity. References whose target cannot be found are kept
    /// as stored.
    pub fn identities(&self, resolve: bool) -> Vec<IdentityDescriptor> {
        if !resolve {
            return self.container().identities().values().cloned().collect();
        }

        self.collect_identities()
            .into_iter()
            .map(|collected| collected.identity)
            .collect()
    }

    /// Returns the configurations visible from this scope, keyed by type.
    ///
    /// With `resolve = false` these are the configurations stored on this container. With
    /// `resolve = true` the configurations of all ancestors are added, where the closest
    /// definition of a type replaces all farther ones entirely.
    pub fn configurations(&self, resolve: bool) -> IndexMap<String, ConfigurationDescriptor> {
        if !resolve {
            return self.container().configurations().clone();
        }

        let levels = self.ancestry().collect::<Vec<_>>();
        let mut configurations = IndexMap::new();

        for level in levels.iter().rev() {
            for (config_type, configuration) in level.container().configurations() {
                if configurations
                    .insert(config_type.clone(), configuration.clone())
                    .is_some()
                {
                    trace!(
                        config_type = %config_type,
                        level = %level.descriptor_type(),
                        "configuration type shadows an ancestor definition"
                    );
                }
            }
        }

        configurations
    }

    pub(crate) fn collect_identities(&self) -> Vec<CollectedIdentity> {
        let mut collected = Vec::new();
        let mut seen_names = HashSet::new();

        for level in self.ancestry() {
            let mut level_names = Vec::new();

            for identity in level.container().identities().values() {
                let name = identity.name.as_str();
                // `/shared` on any level is the same name as `shared` on the root
                let shadowed = seen_names.contains(name)
                    || (level.descriptor_type() == DescriptorType::Root
                        && seen_names.contains(format!("/{name}").as_str()));
                if shadowed {
                    debug!(
                        identity = %identity.name,
                        level = %level.descriptor_type(),
                        "identity is shadowed by a closer definition"
                    );
                    continue;
                }

                level_names.push(name);

                match level.resolve_reference_chain(identity) {
                    Some(chain) => {
                        let mut resolved = identity.clone();
                        for target in &chain {
                            resolved.inherit_from(target);
                        }
                        collected.push(CollectedIdentity {
                            identity: resolved,
                            dangling: false,
                        });
                    }
                    None => collected.push(CollectedIdentity {
                        identity: identity.clone(),
                        dangling: true,
                    }),
                }
            }

            // Identities on the same level never shadow each other
            seen_names.extend(level_names);
        }

        collected
    }

    /// Follows the references starting at `identity`, which lives on this scope's container.
    ///
    /// Returns every identity on the way, nearest first. The list is empty if `identity` is not
    /// a reference and [`None`] if the chain dangles or loops.
    fn resolve_reference_chain(
        &self,
        identity: &'a IdentityDescriptor,
    ) -> Option<Vec<&'a IdentityDescriptor>> {
        let mut chain: Vec<&'a IdentityDescriptor> = Vec::new();
        let mut current = identity;
        let mut scope = *self;

        while let Some(target_name) = current.reference_target() {
            let Some((target_scope, target)) = scope.find_identity(target_name, Some(current))
            else {
                warn!(
                    identity = %identity.name,
                    reference = target_name,
                    "referenced identity not found"
                );
                return None;
            };

            if ptr::eq(target, identity) || chain.iter().any(|seen| ptr::eq(*seen, target)) {
                warn!(
                    identity = %identity.name,
                    reference = target_name,
                    "identity references form a loop"
                );
                return None;
            }

            trace!(
                identity = %identity.name,
                reference = target_name,
                level = %target_scope.descriptor_type(),
                "followed identity reference"
            );
            chain.push(target);
            current = target;
            scope = target_scope;
        }

        Some(chain)
    }

    /// Name lookup shared by [`Scope::identity`] and reference resolution.
    ///
    /// `exclude` is never returned, so that a reference named like its own target resolves to
    /// the next definition outward instead of to itself.
    fn find_identity(
        &self,
        name: &str,
        exclude: Option<&IdentityDescriptor>,
    ) -> Option<(Self, &'a IdentityDescriptor)> {
        let is_excluded =
            |candidate: &IdentityDescriptor| exclude.is_some_and(|ex| ptr::eq(ex, candidate));

        if let Some(absolute) = name.strip_prefix('/') {
            let root = self.root;
            return [absolute, name]
                .into_iter()
                .filter_map(|candidate| root.identities.get(candidate))
                .find(|candidate| !is_excluded(candidate))
                .map(|identity| (root.scope(), identity));
        }

        self.ancestry().find_map(|level| {
            level
                .container()
                .identity(name)
                .filter(|candidate| !is_excluded(candidate))
                .map(|identity| (level, identity))
        })
    }
}
