use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{
    ComponentDescriptor, ConfigurationDescriptor, Container, Descriptor, DescriptorType,
    IdentityDescriptor,
    serde_impl::{self, Named},
};
use crate::merge::Update;

/// A service (HDFS, YARN, ...) together with its components.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDescriptor {
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

    #[serde(
        default,
        skip_serializing_if = "IndexMap::is_empty",
        with = "serde_impl::named_list"
    )]
    pub components: IndexMap<String, ComponentDescriptor>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn components(&self) -> &IndexMap<String, ComponentDescriptor> {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.components.get(name)
    }

    pub fn with_component(mut self, component: ComponentDescriptor) -> Self {
        self.components.insert(component.name.clone(), component);
        self
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

impl Named for ServiceDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Descriptor for ServiceDescriptor {
    const DESCRIPTOR_TYPE: DescriptorType = DescriptorType::Service;
}

impl Container for ServiceDescriptor {
    fn identities(&self) -> &IndexMap<String, IdentityDescriptor> {
        &self.identities
    }

    fn configurations(&self) -> &IndexMap<String, ConfigurationDescriptor> {
        &self.configurations
    }
}

impl Update for ServiceDescriptor {
    fn update(&mut self, overlay: &Self) {
        self.configurations.update(&overlay.configurations);
        self.identities.update(&overlay.identities);
        self.components.update(&overlay.components);
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::descriptor::{KeytabDescriptor, PrincipalDescriptor, PrincipalType};

    const SERVICE_YAML: &str = indoc! {"
        name: SERVICE_NAME
        identities:
          - name: service1_spnego
            reference: /spnego
          - name: service1_identity
            principal:
              value: service1/_HOST@${realm}
              type: service
        configurations:
          - service-site:
              service.property1: value1
              service.property2: value2
        components:
          - name: COMPONENT_NAME
            identities:
              - name: component1_identity
                principal:
                  value: component1/_HOST@${realm}
                  type: service
                keytab:
                  file: ${keytab_dir}/component1.keytab
    "};

    #[test]
    fn yaml_deserialize() {
        let service = ServiceDescriptor::from_yaml_str(SERVICE_YAML).expect("test YAML is valid");

        assert!(service.is_container());
        assert_eq!(service.name, "SERVICE_NAME");
        assert_eq!(
            service.identities.keys().collect::<Vec<_>>(),
            ["service1_spnego", "service1_identity"]
        );
        assert!(
            service
                .identity("service1_spnego")
                .is_some_and(IdentityDescriptor::is_reference)
        );
        assert_eq!(
            service
                .configuration("service-site")
                .and_then(|configuration| configuration.property("service.property2")),
            Some("value2")
        );
        assert_eq!(service.components().len(), 1);
        assert!(service.component("COMPONENT_NAME").is_some());
        assert!(service.component("A_DIFFERENT_COMPONENT_NAME").is_none());
    }

    #[test]
    fn update_recurses_into_components() {
        let mut service =
            ServiceDescriptor::from_yaml_str(SERVICE_YAML).expect("test YAML is valid");
        let overlay = ServiceDescriptor::new("SERVICE_NAME")
            .with_component(
                ComponentDescriptor::new("COMPONENT_NAME").with_identity(
                    IdentityDescriptor::new("component1_identity")
                        .with_keytab(KeytabDescriptor::new("/tmp/component1.keytab")),
                ),
            )
            .with_component(
                ComponentDescriptor::new("A_DIFFERENT_COMPONENT_NAME").with_identity(
                    IdentityDescriptor::new("other").with_principal(PrincipalDescriptor::new(
                        "other@${realm}",
                        PrincipalType::User,
                    )),
                ),
            )
            .with_configuration(ConfigurationDescriptor::from((
                "service-site",
                [("service.property1", "overridden")],
            )));

        let overlay_before = overlay.clone();
        service.update(&overlay);
        assert_eq!(overlay, overlay_before);

        assert_eq!(service.components.len(), 2);
        let identity = service
            .component("COMPONENT_NAME")
            .and_then(|component| component.identity("component1_identity"))
            .expect("identity is kept");
        assert_eq!(
            identity.keytab.as_ref().and_then(|keytab| keytab.file.as_deref()),
            Some("/tmp/component1.keytab")
        );
        // Untouched by the overlay
        assert_eq!(
            identity
                .principal
                .as_ref()
                .and_then(|principal| principal.value.as_deref()),
            Some("component1/_HOST@${realm}")
        );

        let configuration = service
            .configuration("service-site")
            .expect("configuration is kept");
        assert_eq!(configuration.property("service.property1"), Some("overridden"));
        assert_eq!(configuration.property("service.property2"), Some("value2"));
        assert_eq!(service.identities.len(), 2);
    }
}
