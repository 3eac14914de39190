//! The build graph: per-translation-unit planning.
//!
//! For every TU the graph runs a compiler dependency scan, derives an
//! object path by source-root-relative mapping, and records a compile
//! edge. Link closures walk header-to-object mappings with an explicit
//! visited set. The whole plan is expressed relative to
//! `cabin-out/<profile>/` and handed to the executor.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::SystemTime;

use anyhow::{bail, ensure, Context, Result};
use parking_lot::Mutex;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::builder::compdb;
use crate::builder::layout::{
    is_header_file, is_source_file, list_source_files, SourceRoot, SOURCE_FILE_EXTS,
};
use crate::builder::plan::{NinjaEdge, NinjaPlan, NinjaToolchain};
use crate::builder::project::Project;
use crate::builder::toolchain::Compiler;
use crate::core::manifest::Manifest;
use crate::core::profile::BuildProfile;
use crate::resolver;
use crate::util::fs::{relative_from, weakly_canonical};
use crate::util::process::ProcessBuilder;
use crate::util::{parallel, shell};

/// A translation unit paired with its inferred header dependencies.
#[derive(Debug, Clone)]
struct CompileUnit {
    #[allow(dead_code)]
    source: String,
    dependencies: HashSet<String>,
    #[allow(dead_code)]
    is_test: bool,
}

/// Kind of a planned test binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    Unit,
    Integration,
}

impl TestKind {
    pub fn label(self) -> &'static str {
        match self {
            TestKind::Unit => "unit",
            TestKind::Integration => "integration",
        }
    }
}

/// A planned test binary.
#[derive(Debug, Clone)]
pub struct TestTarget {
    /// Executor target, relative to the out base.
    pub ninja_target: String,
    /// Project-relative source path, stable for display.
    pub source_path: String,
    pub kind: TestKind,
}

/// Result of scanning one TU.
struct ScanOutput {
    obj_target: String,
    source: String,
    dependencies: HashSet<String>,
}

/// The build graph for one project and profile.
#[derive(Debug)]
pub struct BuildGraph {
    out_base_path: PathBuf,
    project: Project,
    compiler: Compiler,
    profile_key: BuildProfile,
    lib_name: String,

    has_binary_target: bool,
    has_library_target: bool,

    compile_units: HashMap<String, CompileUnit>,
    test_targets: Vec<TestTarget>,
    src_object_targets: HashSet<String>,
    archiver: String,

    cxxflags: String,
    defines: String,
    includes: String,
    ldflags: String,
    libs: String,

    plan: NinjaPlan,
}

/// Parse make-style dependency-scan output: the target is everything up to
/// the first `:`; the first token after it (the source file) is skipped,
/// as are line-continuation tokens.
pub fn parse_scan_output(output: &str) -> (String, HashSet<String>) {
    let (target, rest) = output.split_once(':').unwrap_or((output, ""));

    let mut deps = HashSet::new();
    let mut is_first = true;
    for token in rest.split_whitespace() {
        if token.starts_with('\\') {
            continue;
        }
        if is_first {
            is_first = false;
            continue;
        }
        deps.insert(token.to_string());
    }
    (target.to_string(), deps)
}

fn parent_dir_or_dot(path: &str) -> String {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.to_string_lossy().into_owned()
        }
        _ => ".".to_string(),
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn compile_edge(obj_target: &str, source: &str, dependencies: &HashSet<String>, is_test: bool) -> NinjaEdge {
    let mut implicit_inputs: Vec<String> = dependencies.iter().cloned().collect();
    implicit_inputs.sort();

    NinjaEdge {
        outputs: vec![obj_target.to_string()],
        rule: "cxx_compile".to_string(),
        inputs: vec![source.to_string()],
        implicit_inputs,
        order_only_inputs: vec![],
        bindings: vec![
            ("out_dir".to_string(), parent_dir_or_dot(obj_target)),
            (
                "extra_flags".to_string(),
                if is_test { "-DCABIN_TEST" } else { "" }.to_string(),
            ),
        ],
    }
}

fn link_edge(output: &str, inputs: Vec<String>) -> NinjaEdge {
    NinjaEdge {
        outputs: vec![output.to_string()],
        rule: "cxx_link_exe".to_string(),
        inputs,
        order_only_inputs: vec![],
        implicit_inputs: vec![],
        bindings: vec![("out_dir".to_string(), parent_dir_or_dot(output))],
    }
}

impl BuildGraph {
    /// Build a graph for `manifest` under `profile`.
    pub fn create(manifest: Manifest, profile_key: BuildProfile) -> Result<BuildGraph> {
        let lib_name = if manifest.package.name.starts_with("lib") {
            format!("{}.a", manifest.package.name)
        } else {
            format!("lib{}.a", manifest.package.name)
        };

        let project = Project::init(profile_key, manifest)?;
        let compiler = Compiler::probe()?;
        let out_base_path = project.out_base_path.clone();
        let plan = NinjaPlan::new(out_base_path.clone());

        Ok(BuildGraph {
            out_base_path,
            project,
            compiler,
            profile_key,
            lib_name,
            has_binary_target: false,
            has_library_target: false,
            compile_units: HashMap::new(),
            test_targets: Vec::new(),
            src_object_targets: HashSet::new(),
            archiver: "ar".to_string(),
            cxxflags: String::new(),
            defines: String::new(),
            includes: String::new(),
            ldflags: String::new(),
            libs: String::new(),
            plan,
        })
    }

    pub fn out_base_path(&self) -> &Path {
        &self.out_base_path
    }

    pub fn manifest(&self) -> &Manifest {
        &self.project.manifest
    }

    pub fn profile_key(&self) -> BuildProfile {
        self.profile_key
    }

    pub fn has_binary_target(&self) -> bool {
        self.has_binary_target
    }

    pub fn has_library_target(&self) -> bool {
        self.has_library_target
    }

    pub fn library_name(&self) -> &str {
        &self.lib_name
    }

    pub fn test_targets(&self) -> &[TestTarget] {
        &self.test_targets
    }

    /// Resolve and install the dependency closure, merging every
    /// dependency's compiler options into the project's.
    pub fn install_deps(&mut self, include_dev_deps: bool, suppress_dep_diag: bool) -> Result<()> {
        let dep_opts = resolver::install_deps(
            &self.project.manifest,
            self.profile_key,
            include_dev_deps,
            suppress_dep_diag,
        )?;
        for opts in &dep_opts {
            self.project.compiler_opts.merge(opts);
        }
        Ok(())
    }

    /// Add `--coverage` to both compile and link flags.
    pub fn enable_coverage(&mut self) {
        self.project
            .compiler_opts
            .c_flags
            .others
            .push("--coverage".to_string());
        self.project
            .compiler_opts
            .ld_flags
            .others
            .push("--coverage".to_string());
    }

    /// `build.ninja` is up to date iff it exists and is newer than every
    /// file under the watched roots (`src/`, `lib/`, `include/`) and the
    /// manifest itself.
    fn is_up_to_date(&self, file_name: &str) -> bool {
        let file_path = self.out_base_path.join(file_name);
        let Ok(config_time) = modified_time(&file_path) else {
            return false;
        };

        let watched = ["src", "lib", "include"];
        for dir in watched {
            let dir_path = self.project.root_path.join(dir);
            if !dir_path.exists() {
                continue;
            }
            for entry in WalkDir::new(&dir_path).into_iter().filter_map(|e| e.ok()) {
                if let Ok(mtime) = modified_time(entry.path()) {
                    if mtime > config_time {
                        return false;
                    }
                }
            }
        }

        match modified_time(&self.project.manifest.path) {
            Ok(manifest_time) => manifest_time <= config_time,
            Err(_) => false,
        }
    }

    /// Map a header reported by the scanner into the object file its
    /// translation unit would produce, observing source-root boundaries:
    /// `src/` maps directly, `include/` and `lib/` map under `lib/`.
    /// Headers outside all roots get a flat fallback.
    fn map_header_to_obj(&self, header_path: &Path) -> String {
        let obj_base = relative_from(&self.project.build_out_path, &self.out_base_path)
            .unwrap_or_default();
        let stem = header_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let make_obj_path = |rel_dir: &Path, prefix: Option<&str>| -> String {
            let mut obj = PathBuf::new();
            if !obj_base.as_os_str().is_empty() && obj_base != Path::new(".") {
                obj.push(&obj_base);
            }
            if let Some(prefix) = prefix {
                obj.push(prefix);
            }
            if !rel_dir.as_os_str().is_empty() && rel_dir != Path::new(".") {
                obj.push(rel_dir);
            }
            obj.push(format!("{}.o", stem));
            path_to_string(&obj)
        };

        let try_map = |root: PathBuf, prefix: Option<&str>| -> Option<String> {
            let parent = header_path.parent().unwrap_or(Path::new(""));
            let rel = relative_from(parent, &root)?;
            if rel.components().next() == Some(std::path::Component::ParentDir) {
                return None;
            }
            Some(make_obj_path(&rel, prefix))
        };

        if let Some(mapped) = try_map(self.project.root_path.join("src"), None) {
            return mapped;
        }
        if let Some(mapped) = try_map(self.project.root_path.join("include"), Some("lib")) {
            return mapped;
        }
        if let Some(mapped) = try_map(self.project.root_path.join("lib"), Some("lib")) {
            return mapped;
        }

        make_obj_path(Path::new(""), None)
    }

    fn register_compile_unit(
        &mut self,
        obj_target: String,
        source: String,
        dependencies: HashSet<String>,
        is_test: bool,
    ) {
        self.plan
            .add_edge(compile_edge(&obj_target, &source, &dependencies, is_test));
        self.compile_units.insert(
            obj_target,
            CompileUnit {
                source,
                dependencies,
                is_test,
            },
        );
    }

    fn run_scan(&self, source: &str, is_test: bool) -> Result<String> {
        let mut cmd = self
            .compiler
            .scan_cmd(&self.project.compiler_opts, source);
        if is_test {
            cmd = cmd.arg("-DCABIN_TEST");
        }
        let output = cmd.cwd(&self.out_base_path).output_checked()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// A TU carries a unit test iff its preprocessed expansion differs
    /// under `-DCABIN_TEST`. Cheap textual pre-filter first: only run the
    /// preprocessor when the token appears at all.
    fn contains_test_code(&self, source: &str) -> Result<bool> {
        let content = std::fs::read_to_string(source)
            .with_context(|| format!("failed to read source: {}", source))?;
        if !content.contains("CABIN_TEST") {
            return Ok(false);
        }

        let base_cmd = self
            .compiler
            .preprocess_cmd(&self.project.compiler_opts, source);
        let plain = base_cmd.clone().output_checked()?;
        let with_test = base_cmd.arg("-DCABIN_TEST").output_checked()?;

        let contains_test = plain.stdout != with_test.stdout;
        if contains_test {
            tracing::trace!("found test code: {}", source);
        }
        Ok(contains_test)
    }

    /// Scan one TU and derive its object target. The TU must lie strictly
    /// beneath its declared root.
    fn scan_source(&self, source_path: &Path, root: &SourceRoot) -> Result<ScanOutput> {
        let source = path_to_string(source_path);
        let (obj_target, dependencies) = parse_scan_output(&self.run_scan(&source, false)?);

        let parent = source_path.parent().unwrap_or(Path::new(""));
        let target_base_dir = relative_from(parent, &root.directory).with_context(|| {
            format!("failed to compute relative path for {}", source)
        })?;
        ensure!(
            target_base_dir.components().next() != Some(std::path::Component::ParentDir),
            "source file `{}` must reside under `{}`",
            source,
            root.directory.display()
        );

        let mut build_target_base = self.project.build_out_path.clone();
        if let Some(subdir) = root.object_subdir {
            build_target_base.push(subdir);
        }
        if !target_base_dir.as_os_str().is_empty() && target_base_dir != Path::new(".") {
            build_target_base.push(&target_base_dir);
        }

        let obj_output = build_target_base.join(&obj_target);
        let build_obj_target = relative_from(&obj_output, &self.out_base_path)
            .with_context(|| {
                format!("failed to compute relative path for {}", obj_output.display())
            })?;

        Ok(ScanOutput {
            obj_target: path_to_string(&build_obj_target),
            source,
            dependencies,
        })
    }

    /// Scan every TU under a source root in parallel. The shared unit map
    /// and object-target set are the only mutable state; the lock is held
    /// just for the inserts. Scan failures are collected across workers
    /// and reported together.
    fn process_sources(
        &mut self,
        source_files: &[PathBuf],
        root: &SourceRoot,
    ) -> Result<HashSet<String>> {
        type Registered = (HashMap<String, CompileUnit>, Vec<NinjaEdge>, HashSet<String>);
        let registered: Mutex<Registered> = Mutex::new(Default::default());
        let errors: Mutex<Vec<String>> = Mutex::new(Vec::new());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallel::jobs())
            .build()
            .context("failed to build scan thread pool")?;

        let this = &*self;
        pool.install(|| {
            source_files.par_iter().for_each(|source_path| {
                match this.scan_source(source_path, root) {
                    Ok(scanned) => {
                        let edge = compile_edge(
                            &scanned.obj_target,
                            &scanned.source,
                            &scanned.dependencies,
                            false,
                        );
                        let unit = CompileUnit {
                            source: scanned.source,
                            dependencies: scanned.dependencies,
                            is_test: false,
                        };
                        let mut guard = registered.lock();
                        guard.2.insert(scanned.obj_target.clone());
                        guard.0.insert(scanned.obj_target, unit);
                        guard.1.push(edge);
                    }
                    Err(err) => errors.lock().push(err.to_string()),
                }
            });
        });

        let errors = errors.into_inner();
        if !errors.is_empty() {
            bail!("{}", errors.join("\n"));
        }

        let (units, edges, obj_targets) = registered.into_inner();
        self.compile_units.extend(units);
        for edge in edges {
            self.plan.add_edge(edge);
        }
        Ok(obj_targets)
    }

    /// Expand the transitive object closure reachable from `seed` headers.
    /// Traversal is worklist-based with `deps` doubling as the visited
    /// set, so pathological include graphs cannot recurse unboundedly.
    fn collect_bin_dep_objs(
        &self,
        deps: &mut HashSet<String>,
        source_stem: &str,
        seed: &HashSet<String>,
        buildable: &HashSet<String>,
    ) {
        let mut pending: Vec<String> = seed.iter().cloned().collect();
        while let Some(dep) = pending.pop() {
            let header_path = Path::new(&dep);
            let stem = header_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if stem == source_stem {
                continue;
            }
            if !is_header_file(header_path) {
                continue;
            }

            let obj_target = self.map_header_to_obj(header_path);
            if !buildable.contains(&obj_target) {
                continue;
            }
            if !deps.insert(obj_target.clone()) {
                continue;
            }

            if let Some(unit) = self.compile_units.get(&obj_target) {
                pending.extend(unit.dependencies.iter().cloned());
            }
        }
    }

    fn process_unittest_src(&mut self, source_path: &Path) -> Result<Option<TestTarget>> {
        let source = path_to_string(source_path);
        if !self.contains_test_code(&source)? {
            return Ok(None);
        }

        let (obj_target, dependencies) = parse_scan_output(&self.run_scan(&source, true)?);

        let mut rel_base = PathBuf::from("unit");
        let canonical_source = weakly_canonical(source_path);
        let src_root = weakly_canonical(&self.project.root_path.join("src"));
        let lib_root = weakly_canonical(&self.project.root_path.join("lib"));

        let mut is_src_unit = false;
        if let Ok(remainder) = canonical_source.strip_prefix(&src_root) {
            rel_base.push("src");
            if let Some(parent) = remainder.parent() {
                if !parent.as_os_str().is_empty() {
                    rel_base.push(parent);
                }
            }
            is_src_unit = true;
        } else if let Ok(remainder) = canonical_source.strip_prefix(&lib_root) {
            rel_base.push("lib");
            if let Some(parent) = remainder.parent() {
                if !parent.as_os_str().is_empty() {
                    rel_base.push(parent);
                }
            }
        } else {
            let parent = source_path.parent().unwrap_or(Path::new(""));
            let rel_root_parent =
                relative_from(parent, &self.project.root_path).with_context(|| {
                    format!("failed to compute relative path for {}", source)
                })?;
            if !rel_root_parent.as_os_str().is_empty() && rel_root_parent != Path::new(".") {
                rel_base.push(&rel_root_parent);
            }
        }

        let test_obj_target = path_to_string(&rel_base.join(&obj_target));
        let file_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let test_binary = path_to_string(&rel_base.join(format!("{}.test", file_name)));

        self.register_compile_unit(test_obj_target.clone(), source.clone(), dependencies.clone(), true);

        let mut link_inputs = vec![test_obj_target];
        if is_src_unit {
            let mut deps = HashSet::new();
            let stem = source_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let src_targets = self.src_object_targets.clone();
            self.collect_bin_dep_objs(&mut deps, &stem, &dependencies, &src_targets);

            let mut src_deps: Vec<String> = deps.into_iter().collect();
            src_deps.sort();
            link_inputs.extend(src_deps);
        }
        if self.has_library_target {
            link_inputs.push(self.lib_name.clone());
        }

        self.plan.add_edge(link_edge(&test_binary, link_inputs));

        let source_path_display = relative_from(source_path, &self.project.root_path)
            .map(|p| path_to_string(&p))
            .unwrap_or_else(|| source.clone());

        Ok(Some(TestTarget {
            ninja_target: test_binary,
            source_path: source_path_display,
            kind: TestKind::Unit,
        }))
    }

    fn process_integration_test_src(&mut self, source_path: &Path) -> Result<Option<TestTarget>> {
        let source = path_to_string(source_path);
        let (obj_target, dependencies) = parse_scan_output(&self.run_scan(&source, true)?);

        let tests_root = self.project.root_path.join("tests");
        let parent = source_path.parent().unwrap_or(Path::new(""));
        let target_base_dir = relative_from(parent, &tests_root).with_context(|| {
            format!("failed to compute relative path for {}", source)
        })?;

        let mut test_target_base = self.project.integration_test_out_path.clone();
        if !target_base_dir.as_os_str().is_empty() && target_base_dir != Path::new(".") {
            test_target_base.push(&target_base_dir);
        }

        let test_obj_output = test_target_base.join(&obj_target);
        let test_obj_target = relative_from(&test_obj_output, &self.out_base_path)
            .map(|p| path_to_string(&p))
            .with_context(|| {
                format!(
                    "failed to compute relative path for {}",
                    test_obj_output.display()
                )
            })?;

        let stem = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let test_binary_path = test_target_base.join(&stem);
        let test_binary = relative_from(&test_binary_path, &self.out_base_path)
            .map(|p| path_to_string(&p))
            .with_context(|| {
                format!(
                    "failed to compute relative path for {}",
                    test_binary_path.display()
                )
            })?;

        let mut link_inputs = vec![test_obj_target.clone()];
        if self.has_library_target {
            link_inputs.push(self.lib_name.clone());
        }
        link_inputs.sort();

        self.register_compile_unit(test_obj_target, source.clone(), dependencies, true);
        self.plan.add_edge(link_edge(&test_binary, link_inputs));

        let source_path_display = relative_from(source_path, &self.project.root_path)
            .map(|p| path_to_string(&p))
            .unwrap_or_else(|| source.clone());

        Ok(Some(TestTarget {
            ninja_target: test_binary,
            source_path: source_path_display,
            kind: TestKind::Integration,
        }))
    }

    /// Assemble the full in-memory plan from the source tree.
    fn configure(&mut self) -> Result<()> {
        let src_dir = self.project.root_path.join("src");
        let has_src_dir = src_dir.exists();
        let lib_dir = self.project.root_path.join("lib");

        let profile = self.project.manifest.profile(self.profile_key).clone();
        self.archiver = self.compiler.detect_archiver(profile.lto);

        self.has_binary_target = false;
        self.has_library_target = false;

        let is_main_source = |path: &Path| {
            path.file_stem()
                .map(|s| s == std::ffi::OsStr::new("main"))
                .unwrap_or(false)
        };

        let mut main_source = PathBuf::new();
        if has_src_dir {
            for entry in std::fs::read_dir(&src_dir)
                .with_context(|| format!("failed to read {}", src_dir.display()))?
            {
                let path = entry?.path();
                if !is_source_file(&path) || !is_main_source(&path) {
                    continue;
                }
                if !main_source.as_os_str().is_empty() {
                    bail!("multiple main sources were found");
                }
                main_source = path;
                self.has_binary_target = true;
            }
        }

        std::fs::create_dir_all(&self.out_base_path).with_context(|| {
            format!("failed to create directory: {}", self.out_base_path.display())
        })?;

        self.compile_units.clear();
        self.plan.reset();
        self.test_targets.clear();

        let opts = &self.project.compiler_opts;
        self.cxxflags = join_display(&opts.c_flags.others);
        self.defines = join_display(&opts.c_flags.macros);
        self.includes = join_display(&opts.c_flags.include_dirs);
        let ld_others = join_display(&opts.ld_flags.others);
        let lib_dirs = join_display(&opts.ld_flags.lib_dirs);
        self.ldflags = combine_flags(&[&ld_others, &lib_dirs]);
        self.libs = join_display(&opts.ld_flags.libs);

        let mut source_file_paths = Vec::new();
        if has_src_dir {
            source_file_paths = list_source_files(&src_dir);
            for path in &source_file_paths {
                if path != &main_source && is_main_source(path) {
                    shell::warn(format!(
                        "source file `{}` is named `main` but is not located directly in the \
                         `src/` directory. This file will not be treated as the program's entry \
                         point. Move it directly to 'src/' if intended as such.",
                        path.display()
                    ));
                }
            }
        }

        let mut public_source_file_paths = Vec::new();
        if lib_dir.exists() {
            public_source_file_paths = list_source_files(&lib_dir);
        }
        self.has_library_target = !public_source_file_paths.is_empty();

        if !self.has_binary_target && !self.has_library_target {
            bail!(
                "expected either `src/main{{{}}}` or at least one source file under `lib/` \
                 matching {{{}}}",
                SOURCE_FILE_EXTS.map(|e| format!(".{}", e)).join(","),
                SOURCE_FILE_EXTS.map(|e| format!(".{}", e)).join(",")
            );
        }

        let src_root = SourceRoot::new(src_dir);
        let lib_root = SourceRoot::with_object_subdir(lib_dir, "lib");

        let src_obj_targets = self.process_sources(&source_file_paths, &src_root)?;
        self.src_object_targets = src_obj_targets.clone();
        self.src_object_targets
            .retain(|obj| obj != "main.o" && !obj.ends_with("/main.o"));

        let mut lib_obj_targets = HashSet::new();
        if !public_source_file_paths.is_empty() {
            lib_obj_targets = self.process_sources(&public_source_file_paths, &lib_root)?;
        }

        let mut build_obj_targets = src_obj_targets;
        build_obj_targets.extend(lib_obj_targets.iter().cloned());

        if self.has_binary_target {
            let main_obj_path = self.project.build_out_path.join("main.o");
            let main_obj = relative_from(&main_obj_path, &self.out_base_path)
                .map(|p| path_to_string(&p))
                .unwrap_or_else(|| "main.o".to_string());
            ensure!(
                self.compile_units.contains_key(&main_obj),
                "internal error: missing compile unit for {}",
                main_obj
            );

            let mut deps: HashSet<String> = HashSet::from([main_obj.clone()]);
            let main_deps = self.compile_units[&main_obj].dependencies.clone();
            self.collect_bin_dep_objs(&mut deps, "", &main_deps, &build_obj_targets);

            let inputs = if self.has_library_target {
                deps.remove(&main_obj);
                let mut src_inputs: Vec<String> = deps
                    .into_iter()
                    .filter(|dep| !lib_obj_targets.contains(dep))
                    .collect();
                src_inputs.sort();

                let mut inputs = vec![main_obj];
                inputs.extend(src_inputs);
                inputs.push(self.lib_name.clone());
                inputs
            } else {
                let mut inputs: Vec<String> = deps.into_iter().collect();
                inputs.sort();
                inputs
            };

            let bin_name = self.project.manifest.package.name.clone();
            self.plan.add_edge(link_edge(&bin_name, inputs));
            self.plan.add_default_target(bin_name);
        }

        if self.has_library_target {
            let mut library_inputs: Vec<String> = lib_obj_targets.iter().cloned().collect();
            ensure!(
                !library_inputs.is_empty(),
                "internal error: expected objects for library target"
            );
            library_inputs.sort();

            let archive_edge = NinjaEdge {
                outputs: vec![self.lib_name.clone()],
                rule: "cxx_link_static_lib".to_string(),
                inputs: library_inputs,
                implicit_inputs: vec![],
                order_only_inputs: vec![],
                bindings: vec![("out_dir".to_string(), parent_dir_or_dot(&self.lib_name))],
            };
            self.plan.add_edge(archive_edge);
            self.plan.add_default_target(self.lib_name.clone());
        }

        if self.profile_key == BuildProfile::Test {
            let mut discovered = Vec::new();
            for source_path in &source_file_paths {
                if let Some(target) = self.process_unittest_src(source_path)? {
                    discovered.push(target);
                }
            }
            for source_path in &public_source_file_paths {
                if let Some(target) = self.process_unittest_src(source_path)? {
                    discovered.push(target);
                }
            }

            let integration_test_dir = self.project.root_path.join("tests");
            if integration_test_dir.exists() {
                for source_path in list_source_files(&integration_test_dir) {
                    if let Some(target) = self.process_integration_test_src(&source_path)? {
                        discovered.push(target);
                    }
                }
            }

            discovered.sort_by(|a, b| a.ninja_target.cmp(&b.ninja_target));
            let names: Vec<String> = discovered.iter().map(|t| t.ninja_target.clone()).collect();
            self.test_targets = discovered;
            self.plan.set_test_targets(names);
        } else {
            self.test_targets.clear();
            self.plan.set_test_targets(Vec::new());
        }

        Ok(())
    }

    fn toolchain(&self) -> NinjaToolchain {
        NinjaToolchain {
            cxx: self.compiler.cxx.clone(),
            cxxflags: self.cxxflags.clone(),
            defines: self.defines.clone(),
            includes: self.includes.clone(),
            ldflags: self.ldflags.clone(),
            libs: self.libs.clone(),
            archiver: self.archiver.clone(),
        }
    }

    fn write_build_files(&self) -> Result<()> {
        self.plan.write_files(&self.toolchain())
    }

    /// Re-emit the plan files only when the freshness oracle says they are
    /// stale.
    pub fn write_build_files_if_needed(&self) -> Result<()> {
        if self.is_up_to_date("build.ninja") {
            return Ok(());
        }
        self.write_build_files()
    }

    /// Aggregate `compile_commands.json` across sibling build directories.
    pub fn generate_compdb(&self) -> Result<()> {
        compdb::generate(&self.out_base_path)
    }

    /// Build the plan in memory, write the plan files if stale, and
    /// refresh the compilation database. Idempotent.
    pub fn plan(&mut self, log_analysis: bool) -> Result<()> {
        if log_analysis {
            shell::status("Analyzing", "project dependencies...");
        }

        let stale = !self.is_up_to_date("build.ninja");
        tracing::debug!("build.ninja is {}up to date", if stale { "NOT " } else { "" });

        self.configure()?;
        if stale {
            self.write_build_files()?;
        }
        self.generate_compdb()?;

        Ok(())
    }

    fn ninja_command(&self, for_dry_run: bool) -> ProcessBuilder {
        let mut ninja = ProcessBuilder::new("ninja");
        if !shell::is_verbose() && !for_dry_run {
            ninja = ninja.arg("--quiet");
        } else if shell::is_very_verbose() {
            ninja = ninja.arg("--verbose");
        }
        ninja.arg(format!("-j{}", parallel::jobs()))
    }

    /// Dry-run the executor to decide whether the targets need any work.
    pub fn needs_build(&self, targets: &[String]) -> Result<bool> {
        let mut cmd = self
            .ninja_command(true)
            .arg("-C")
            .arg(&self.out_base_path)
            .arg("-n");
        for target in targets {
            cmd = cmd.arg(target);
        }

        let output = cmd.output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let has_no_work = stdout.contains("ninja: no work to do.");
        Ok(!has_no_work || !output.status.success())
    }

    /// Run the executor on the given targets, printing a `Compiling` line
    /// only when the dry run reports non-empty work.
    pub fn build_targets(&self, targets: &[String], display_name: &str) -> Result<ExitStatus> {
        let mut cmd = self.ninja_command(false).arg("-C").arg(&self.out_base_path);
        for target in targets {
            cmd = cmd.arg(target);
        }

        if self.needs_build(targets)? {
            shell::status(
                "Compiling",
                format!(
                    "{} v{} ({})",
                    display_name,
                    self.project.manifest.package.version,
                    self.project.manifest.dir().display()
                ),
            );
        }

        cmd.status()
    }
}

fn modified_time(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}

fn join_display<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn combine_flags(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}
