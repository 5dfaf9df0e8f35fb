//! ## Kerberos descriptors
//!
//! This crate reads, combines and resolves Kerberos descriptors: hierarchical documents that
//! declare which Kerberos identities a cluster needs and which configuration properties must be
//! set once they exist.
//!
//! - [`descriptor`] contains the tree itself and its JSON/YAML representation.
//! - [`merge`] combines trees and fills reference identities from their targets.
//! - [`scope`] resolves identities and configurations as seen from one container.
//! - [`variables`] expands `${type/property}` variables.
//! - [`materialize`] ties everything together for the layer that provisions principals.
//!
//! ```
//! use kerberos_descriptor::{Configurations, Descriptor, KerberosDescriptor};
//!
//! let descriptor = KerberosDescriptor::from_yaml_str(
//!     r#"
//! properties:
//!   realm: EXAMPLE.COM
//! identities:
//!   - name: spnego
//!     principal:
//!       value: HTTP/_HOST@${realm}
//!       type: service
//! services:
//!   - name: HDFS
//!     components:
//!       - name: NAMENODE
//!         identities:
//!           - name: /spnego
//! "#,
//! )
//! .unwrap();
//!
//! let scope = descriptor.component_scope("HDFS", "NAMENODE").unwrap();
//! let materialized = scope.materialize(&Configurations::new()).unwrap();
//!
//! assert_eq!(
//!     materialized.identities[0]
//!         .principal
//!         .as_ref()
//!         .and_then(|principal| principal.value.as_deref()),
//!     Some("HTTP/_HOST@EXAMPLE.COM")
//! );
//! ```
pub mod descriptor;
pub mod materialize;
pub mod merge;
pub mod scope;
pub mod variables;

pub use descriptor::{
    ComponentDescriptor, ConfigurationDescriptor, Container, Descriptor, DescriptorType,
    IdentityDescriptor, KerberosDescriptor, KeytabAccess, KeytabDescriptor, PrincipalDescriptor,
    PrincipalType, ServiceDescriptor,
};
pub use materialize::{MaterializedIdentity, MaterializedScope};
pub use merge::{Merge, Update};
pub use scope::Scope;
pub use variables::{Configurations, replace_all_variables, replace_variables};
