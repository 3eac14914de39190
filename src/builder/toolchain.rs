//! C++ compiler and archiver selection.
//!
//! The compiler comes from `$CXX` or the first of `c++`, `g++`, `clang++`
//! on PATH. The archiver is `ar` unless LTO is enabled, in which case a
//! toolchain-matched `llvm-ar`/`gcc-ar` is derived from the compiler name
//! by suffix replacement (`clang++-19` becomes `llvm-ar-19`).

use std::path::Path;

use anyhow::{bail, Result};

use crate::builder::opts::CompilerOpts;
use crate::util::process::{command_exists, ProcessBuilder};

/// The selected C++ compiler.
#[derive(Debug, Clone)]
pub struct Compiler {
    pub cxx: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompilerFlavor {
    Clang,
    Gcc,
    Other,
}

fn detect_flavor(cxx: &str) -> CompilerFlavor {
    let name = Path::new(cxx)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.contains("clang") {
        CompilerFlavor::Clang
    } else if name.contains("g++") || name.contains("gcc") {
        CompilerFlavor::Gcc
    } else {
        CompilerFlavor::Other
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Derive a tool name from a compiler name by replacing `suffix` with
/// `tool`, keeping any prefix and version postfix: `clang++-19` with
/// suffix `clang++` and tool `llvm-ar` yields `llvm-ar-19`.
fn make_tool_name(compiler_name: &str, suffix: &str, tool: &str) -> Option<String> {
    let pos = compiler_name.rfind(suffix)?;
    if pos > 0 {
        let prev = compiler_name.as_bytes()[pos - 1];
        if prev.is_ascii_alphanumeric() {
            return None;
        }
    }
    let prefix = &compiler_name[..pos];
    let postfix = &compiler_name[pos + suffix.len()..];
    Some(format!("{}{}{}", prefix, tool, postfix))
}

fn find_sibling(cxx_path: &Path, candidate: &str) -> Option<String> {
    let sibling = cxx_path.parent()?.join(candidate);
    if sibling.exists() {
        return Some(sibling.to_string_lossy().into_owned());
    }
    None
}

fn resolve_tool_with_suffix(cxx_path: &Path, suffix: &str, tool: &str) -> Option<String> {
    let filename = cxx_path.file_name()?.to_string_lossy().into_owned();
    let candidate = make_tool_name(&filename, suffix, tool)?;
    if let Some(sibling) = find_sibling(cxx_path, &candidate) {
        return Some(sibling);
    }
    if command_exists(&candidate) {
        return Some(candidate);
    }
    None
}

fn resolve_llvm_ar(cxx_path: &Path) -> Option<String> {
    resolve_tool_with_suffix(cxx_path, "clang++", "llvm-ar")
        .or_else(|| resolve_tool_with_suffix(cxx_path, "clang", "llvm-ar"))
        .or_else(|| command_exists("llvm-ar").then(|| "llvm-ar".to_string()))
}

fn resolve_gcc_ar(cxx_path: &Path) -> Option<String> {
    resolve_tool_with_suffix(cxx_path, "g++", "gcc-ar")
        .or_else(|| resolve_tool_with_suffix(cxx_path, "gcc", "gcc-ar"))
        .or_else(|| command_exists("gcc-ar").then(|| "gcc-ar".to_string()))
}

fn env_archiver_override() -> Option<String> {
    env_var("CABIN_AR")
        .or_else(|| env_var("AR"))
        .or_else(|| env_var("LLVM_AR"))
        .or_else(|| env_var("GCC_AR"))
}

impl Compiler {
    /// Select the C++ compiler: `$CXX`, then `c++`, `g++`, `clang++`.
    pub fn probe() -> Result<Compiler> {
        if let Some(cxx) = env_var("CXX") {
            return Ok(Compiler { cxx });
        }
        for candidate in ["c++", "g++", "clang++"] {
            if command_exists(candidate) {
                return Ok(Compiler {
                    cxx: candidate.to_string(),
                });
            }
        }
        bail!("failed to locate a C++ compiler, set $CXX");
    }

    /// Compile command: `cxx <others> <macros> <includes> -c <src> -o <obj>`.
    pub fn compile_cmd(&self, opts: &CompilerOpts, source: &str, obj: &str) -> ProcessBuilder {
        self.base_cmd(opts)
            .arg("-c")
            .arg(source)
            .arg("-o")
            .arg(obj)
    }

    /// Dependency-scan command: `cxx <others> <macros> <includes> -MM <src>`.
    pub fn scan_cmd(&self, opts: &CompilerOpts, source: &str) -> ProcessBuilder {
        self.base_cmd(opts).arg("-MM").arg(source)
    }

    /// Preprocess command: `cxx -E <others> <macros> <includes> <src>`.
    pub fn preprocess_cmd(&self, opts: &CompilerOpts, source: &str) -> ProcessBuilder {
        let cmd = ProcessBuilder::new(&self.cxx).arg("-E");
        add_opts(cmd, opts).arg(source)
    }

    fn base_cmd(&self, opts: &CompilerOpts) -> ProcessBuilder {
        add_opts(ProcessBuilder::new(&self.cxx), opts)
    }

    /// Pick the archiver: env overrides first, `ar` unless LTO wants a
    /// toolchain-specific one.
    pub fn detect_archiver(&self, use_lto: bool) -> String {
        if let Some(overridden) = env_archiver_override() {
            return overridden;
        }
        if !use_lto {
            return "ar".to_string();
        }

        let cxx_path = Path::new(&self.cxx);
        let resolved = match detect_flavor(&self.cxx) {
            CompilerFlavor::Clang => resolve_llvm_ar(cxx_path),
            CompilerFlavor::Gcc => resolve_gcc_ar(cxx_path),
            CompilerFlavor::Other => None,
        };
        resolved.unwrap_or_else(|| "ar".to_string())
    }
}

fn add_opts(mut cmd: ProcessBuilder, opts: &CompilerOpts) -> ProcessBuilder {
    cmd = cmd.args(&opts.c_flags.others);
    cmd = cmd.args(opts.c_flags.macros.iter().map(|m| m.to_string()));
    // `-isystem` renders as two words; split so each reaches the compiler
    // as its own argv entry.
    for dir in &opts.c_flags.include_dirs {
        if dir.is_system {
            cmd = cmd.arg("-isystem").arg(&dir.path);
        } else {
            cmd = cmd.arg(format!("-I{}", dir.path.display()));
        }
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::opts::{IncludeDir, Macro};

    #[test]
    fn test_make_tool_name() {
        assert_eq!(
            make_tool_name("clang++", "clang++", "llvm-ar").as_deref(),
            Some("llvm-ar")
        );
        assert_eq!(
            make_tool_name("clang++-19", "clang++", "llvm-ar").as_deref(),
            Some("llvm-ar-19")
        );
        assert_eq!(
            make_tool_name("aarch64-linux-gnu-clang++", "clang++", "llvm-ar").as_deref(),
            Some("aarch64-linux-gnu-llvm-ar")
        );
        assert_eq!(
            make_tool_name("x86_64-w64-mingw32-g++-13", "g++", "gcc-ar").as_deref(),
            Some("x86_64-w64-mingw32-gcc-ar-13")
        );

        assert_eq!(make_tool_name("clang++", "g++", "gcc-ar"), None);
        assert_eq!(make_tool_name("foo", "clang++", "llvm-ar"), None);
    }

    #[test]
    fn test_detect_flavor() {
        assert_eq!(detect_flavor("clang++"), CompilerFlavor::Clang);
        assert_eq!(detect_flavor("/usr/bin/clang++-19"), CompilerFlavor::Clang);
        assert_eq!(detect_flavor("g++"), CompilerFlavor::Gcc);
        assert_eq!(
            detect_flavor("x86_64-w64-mingw32-gcc-13"),
            CompilerFlavor::Gcc
        );
        assert_eq!(detect_flavor("icc"), CompilerFlavor::Other);
    }

    #[test]
    fn test_command_shapes() {
        let compiler = Compiler {
            cxx: "g++".to_string(),
        };
        let mut opts = CompilerOpts::default();
        opts.c_flags.others.push("-std=c++20".into());
        opts.c_flags.macros.push(Macro::new("NDEBUG", ""));
        opts.c_flags
            .include_dirs
            .push(IncludeDir::new("include", false));

        let compile = compiler.compile_cmd(&opts, "src/main.cc", "main.o");
        assert_eq!(
            compile.get_args(),
            ["-std=c++20", "-DNDEBUG", "-Iinclude", "-c", "src/main.cc", "-o", "main.o"]
        );

        let scan = compiler.scan_cmd(&opts, "src/main.cc");
        assert_eq!(
            scan.get_args(),
            ["-std=c++20", "-DNDEBUG", "-Iinclude", "-MM", "src/main.cc"]
        );

        let preprocess = compiler.preprocess_cmd(&opts, "src/main.cc");
        assert_eq!(
            preprocess.get_args(),
            ["-E", "-std=c++20", "-DNDEBUG", "-Iinclude", "src/main.cc"]
        );
    }
}
