//! Compiler and linker option sets.
//!
//! Every resolved dependency contributes a [`CompilerOpts`]; merging
//! appends macros, include dirs, and free-form flags, extends library
//! search dirs, and deduplicates libraries by name preserving first
//! occurrence.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// A preprocessor macro definition, rendered as `-DNAME` or `-DNAME=VALUE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pub name: String,
    pub value: String,
}

impl Macro {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Macro {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "-D{}", self.name)
        } else {
            write!(f, "-D{}={}", self.name, self.value)
        }
    }
}

/// An include directory, rendered as `-I<dir>` or `-isystem <dir>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDir {
    pub path: PathBuf,
    pub is_system: bool,
}

impl IncludeDir {
    pub fn new(path: impl Into<PathBuf>, is_system: bool) -> Self {
        IncludeDir {
            path: path.into(),
            is_system,
        }
    }
}

impl fmt::Display for IncludeDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_system {
            write!(f, "-isystem {}", self.path.display())
        } else {
            write!(f, "-I{}", self.path.display())
        }
    }
}

/// A library search directory, rendered as `-L<dir>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibDir {
    pub path: PathBuf,
}

impl LibDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LibDir { path: path.into() }
    }
}

impl fmt::Display for LibDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-L{}", self.path.display())
    }
}

/// A library, rendered as `-l<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lib {
    pub name: String,
}

impl Lib {
    pub fn new(name: impl Into<String>) -> Self {
        Lib { name: name.into() }
    }
}

impl fmt::Display for Lib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-l{}", self.name)
    }
}

/// Compile-time flags.
#[derive(Debug, Clone, Default)]
pub struct CFlags {
    pub macros: Vec<Macro>,
    pub include_dirs: Vec<IncludeDir>,
    pub others: Vec<String>,
}

impl CFlags {
    /// Append all of `other`'s entries.
    pub fn merge(&mut self, other: &CFlags) {
        self.macros.extend(other.macros.iter().cloned());
        self.include_dirs.extend(other.include_dirs.iter().cloned());
        self.others.extend(other.others.iter().cloned());
    }

    /// Parse whitespace-delimited compiler flags (pkg-config `--cflags`
    /// output) into macros, include dirs, and the rest.
    pub fn parse_flags(output: &str) -> CFlags {
        let mut flags = CFlags::default();
        for flag in output.split_whitespace() {
            if let Some(def) = flag.strip_prefix("-D") {
                match def.split_once('=') {
                    Some((name, value)) => flags.macros.push(Macro::new(name, value)),
                    None => flags.macros.push(Macro::new(def, "")),
                }
            } else if let Some(dir) = flag.strip_prefix("-I") {
                flags.include_dirs.push(IncludeDir::new(dir, false));
            } else {
                flags.others.push(flag.to_string());
            }
        }
        flags
    }
}

/// Link-time flags. Libraries are deduplicated by name on construction and
/// on every merge, keeping the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct LdFlags {
    pub lib_dirs: Vec<LibDir>,
    pub libs: Vec<Lib>,
    pub others: Vec<String>,
}

impl LdFlags {
    pub fn new(lib_dirs: Vec<LibDir>, libs: Vec<Lib>, others: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let libs = libs
            .into_iter()
            .filter(|lib| seen.insert(lib.name.clone()))
            .collect();
        LdFlags {
            lib_dirs,
            libs,
            others,
        }
    }

    /// Extend dirs and others; merge libs deduplicated by name.
    pub fn merge(&mut self, other: &LdFlags) {
        self.lib_dirs.extend(other.lib_dirs.iter().cloned());
        self.others.extend(other.others.iter().cloned());

        for lib in &other.libs {
            if !self.libs.iter().any(|l| l.name == lib.name) {
                self.libs.push(lib.clone());
            }
        }
    }

    /// Parse whitespace-delimited linker flags (pkg-config `--libs`
    /// output) into search dirs, libraries, and the rest.
    pub fn parse_flags(output: &str) -> LdFlags {
        let mut lib_dirs = Vec::new();
        let mut libs = Vec::new();
        let mut others = Vec::new();
        for flag in output.split_whitespace() {
            if let Some(dir) = flag.strip_prefix("-L") {
                lib_dirs.push(LibDir::new(dir));
            } else if let Some(name) = flag.strip_prefix("-l") {
                libs.push(Lib::new(name));
            } else {
                others.push(flag.to_string());
            }
        }
        LdFlags::new(lib_dirs, libs, others)
    }
}

/// The combined option set a dependency (or the project itself)
/// contributes to compilation and linking.
#[derive(Debug, Clone, Default)]
pub struct CompilerOpts {
    pub c_flags: CFlags,
    pub ld_flags: LdFlags,
}

impl CompilerOpts {
    pub fn merge(&mut self, other: &CompilerOpts) {
        self.c_flags.merge(&other.c_flags);
        self.ld_flags.merge(&other.ld_flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_display() {
        assert_eq!(Macro::new("NDEBUG", "").to_string(), "-DNDEBUG");
        assert_eq!(Macro::new("VERSION", "3").to_string(), "-DVERSION=3");
    }

    #[test]
    fn test_include_dir_display() {
        assert_eq!(
            IncludeDir::new("/usr/include", false).to_string(),
            "-I/usr/include"
        );
        assert_eq!(
            IncludeDir::new("/opt/include", true).to_string(),
            "-isystem /opt/include"
        );
    }

    #[test]
    fn test_cflags_parse() {
        let flags = CFlags::parse_flags("-DNDEBUG -DVER=2 -I/usr/include -pthread -fPIC");
        assert_eq!(flags.macros.len(), 2);
        assert_eq!(flags.macros[1], Macro::new("VER", "2"));
        assert_eq!(flags.include_dirs.len(), 1);
        assert_eq!(flags.others, vec!["-pthread", "-fPIC"]);
    }

    #[test]
    fn test_ldflags_parse() {
        let flags = LdFlags::parse_flags("-L/usr/lib -lz -lm -Wl,-rpath,/opt/lib");
        assert_eq!(flags.lib_dirs.len(), 1);
        assert_eq!(flags.libs.len(), 2);
        assert_eq!(flags.others, vec!["-Wl,-rpath,/opt/lib"]);
    }

    #[test]
    fn test_ldflags_dedup_on_construction() {
        let flags = LdFlags::new(
            vec![],
            vec![Lib::new("z"), Lib::new("m"), Lib::new("z")],
            vec![],
        );
        let names: Vec<&str> = flags.libs.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["z", "m"]);
    }

    #[test]
    fn test_ldflags_merge_dedups_preserving_first() {
        let mut left = LdFlags::new(vec![], vec![Lib::new("z"), Lib::new("m")], vec![]);
        let right = LdFlags::new(vec![], vec![Lib::new("m"), Lib::new("ssl")], vec![]);
        left.merge(&right);
        let names: Vec<&str> = left.libs.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["z", "m", "ssl"]);
    }

    #[test]
    fn test_ldflags_merge_lib_set_is_order_independent() {
        let a = LdFlags::new(vec![], vec![Lib::new("z"), Lib::new("m")], vec![]);
        let b = LdFlags::new(vec![], vec![Lib::new("ssl"), Lib::new("z")], vec![]);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        let set_ab: HashSet<&str> = ab.libs.iter().map(|l| l.name.as_str()).collect();
        let set_ba: HashSet<&str> = ba.libs.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(set_ab, set_ba);
    }

    #[test]
    fn test_compiler_opts_merge_appends() {
        let mut opts = CompilerOpts::default();
        opts.c_flags.others.push("-Wall".into());

        let mut dep = CompilerOpts::default();
        dep.c_flags.macros.push(Macro::new("FOO", ""));
        dep.c_flags.include_dirs.push(IncludeDir::new("/dep", false));
        dep.ld_flags.libs.push(Lib::new("dep"));

        opts.merge(&dep);
        assert_eq!(opts.c_flags.others, vec!["-Wall"]);
        assert_eq!(opts.c_flags.macros.len(), 1);
        assert_eq!(opts.c_flags.include_dirs.len(), 1);
        assert_eq!(opts.ld_flags.libs.len(), 1);
    }
}
