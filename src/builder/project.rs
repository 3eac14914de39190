//! Project paths and baseline compiler options.

use std::path::PathBuf;

use anyhow::Result;

use crate::builder::opts::{CompilerOpts, IncludeDir};
use crate::core::manifest::Manifest;
use crate::core::profile::BuildProfile;
use crate::util::fs::weakly_canonical;

/// A loaded project: the manifest plus every derived path and the baseline
/// compiler options for the selected profile. Dependency options are merged
/// in later by the resolver.
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory containing `cabin.toml`.
    pub root_path: PathBuf,

    /// `cabin-out/<profile>`: everything the plan produces lives beneath
    /// this, and executor targets are expressed relative to it.
    pub out_base_path: PathBuf,

    /// Root for object files (coincides with `out_base_path`; library
    /// objects get a `lib/` subdirectory on top).
    pub build_out_path: PathBuf,

    /// Root for unit-test binaries.
    pub unittest_out_path: PathBuf,

    /// Root for integration-test binaries.
    pub integration_test_out_path: PathBuf,

    pub manifest: Manifest,

    /// Baseline options, extended by the resolver with dependency options.
    pub compiler_opts: CompilerOpts,
}

impl Project {
    pub fn init(profile_key: BuildProfile, manifest: Manifest) -> Result<Project> {
        let root_path = weakly_canonical(manifest.dir());
        let out_base_path = root_path.join("cabin-out").join(profile_key.to_string());
        let build_out_path = out_base_path.clone();
        let unittest_out_path = out_base_path.join("unit");
        let integration_test_out_path = out_base_path.join("intg");

        let profile = manifest.profile(profile_key);

        let mut compiler_opts = CompilerOpts::default();
        compiler_opts
            .c_flags
            .others
            .push(manifest.package.edition.as_std_flag());
        compiler_opts
            .c_flags
            .others
            .push(format!("-O{}", profile.opt_level));
        if profile.debug {
            compiler_opts.c_flags.others.push("-g".to_string());
        }
        if profile.lto {
            compiler_opts.c_flags.others.push("-flto".to_string());
            compiler_opts.ld_flags.others.push("-flto".to_string());
        }
        compiler_opts
            .c_flags
            .others
            .extend(profile.cxxflags.iter().cloned());
        compiler_opts
            .ld_flags
            .others
            .extend(profile.ldflags.iter().cloned());

        let include_dir = root_path.join("include");
        if include_dir.is_dir() {
            compiler_opts
                .c_flags
                .include_dirs
                .push(IncludeDir::new(include_dir, false));
        }

        Ok(Project {
            root_path,
            out_base_path,
            build_out_path,
            unittest_out_path,
            integration_test_out_path,
            manifest,
            compiler_opts,
        })
    }
}
