//! cabin - a package manager and build system for C++.
//!
//! This crate provides the core library functionality for cabin:
//! manifest parsing, dependency resolution and installation, build
//! planning against a ninja-compatible executor, and compilation-database
//! aggregation.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod util;

pub use builder::{Builder, BuildGraph, ScheduleOptions};
pub use core::{BuildProfile, Dependency, Edition, Manifest, Package, Profile};
