//! Core data model: manifest, package identity, dependencies, profiles.

pub mod dependency;
pub mod edition;
pub mod manifest;
pub mod profile;

pub use dependency::{DepKey, Dependency, GitDependency, PathDependency, SystemDependency};
pub use edition::Edition;
pub use manifest::{validate_package_name, Manifest, Package, MANIFEST_FILE};
pub use profile::{BuildProfile, Profile};
