//! Executor plan files.
//!
//! The planner emits four files beneath `cabin-out/<profile>/`:
//! `build.ninja` (protocol version + includes), `config.ninja` (toolchain
//! bindings), `rules.ninja` (the three rules), and `targets.ninja` (all
//! build edges plus the `all`/`tests` phony aggregates). Each file is
//! written all-or-none.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;

use crate::util::fs::write_atomic;

/// One build edge in the executor's graph.
#[derive(Debug, Clone, Default)]
pub struct NinjaEdge {
    pub outputs: Vec<String>,
    pub rule: String,
    pub inputs: Vec<String>,
    pub implicit_inputs: Vec<String>,
    pub order_only_inputs: Vec<String>,
    pub bindings: Vec<(String, String)>,
}

/// Toolchain bindings written to `config.ninja`.
#[derive(Debug, Clone, Default)]
pub struct NinjaToolchain {
    pub cxx: String,
    pub cxxflags: String,
    pub defines: String,
    pub includes: String,
    pub ldflags: String,
    pub libs: String,
    pub archiver: String,
}

/// The in-memory plan: edges, default targets, and test targets.
#[derive(Debug, Default)]
pub struct NinjaPlan {
    out_base_path: PathBuf,
    edges: Vec<NinjaEdge>,
    default_targets: Vec<String>,
    test_targets: Vec<String>,
}

/// Escape a path or target for the executor's syntax.
fn ninja_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ' ' | ':' | '$' => {
                escaped.push('$');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

fn push_list(out: &mut String, items: &[String]) {
    for item in items {
        out.push(' ');
        out.push_str(&ninja_escape(item));
    }
}

impl NinjaPlan {
    pub fn new(out_base_path: PathBuf) -> Self {
        NinjaPlan {
            out_base_path,
            ..Default::default()
        }
    }

    pub fn reset(&mut self) {
        self.edges.clear();
        self.default_targets.clear();
        self.test_targets.clear();
    }

    pub fn add_edge(&mut self, edge: NinjaEdge) {
        self.edges.push(edge);
    }

    pub fn add_default_target(&mut self, target: String) {
        self.default_targets.push(target);
    }

    pub fn set_test_targets(&mut self, test_targets: Vec<String>) {
        self.test_targets = test_targets;
    }

    /// Write all four plan files.
    pub fn write_files(&self, toolchain: &NinjaToolchain) -> Result<()> {
        write_atomic(&self.out_base_path.join("build.ninja"), &self.render_build())?;
        write_atomic(
            &self.out_base_path.join("config.ninja"),
            &self.render_config(toolchain),
        )?;
        write_atomic(&self.out_base_path.join("rules.ninja"), &self.render_rules())?;
        write_atomic(
            &self.out_base_path.join("targets.ninja"),
            &self.render_targets(),
        )?;
        Ok(())
    }

    fn render_build(&self) -> String {
        "ninja_required_version = 1.3\n\n\
         include config.ninja\n\
         include rules.ninja\n\
         include targets.ninja\n"
            .to_string()
    }

    fn render_config(&self, tc: &NinjaToolchain) -> String {
        format!(
            "CXX = {}\n\
             CXXFLAGS = {}\n\
             DEFINES = {}\n\
             INCLUDES = {}\n\
             LDFLAGS = {}\n\
             LIBS = {}\n\
             AR = {}\n",
            tc.cxx, tc.cxxflags, tc.defines, tc.includes, tc.ldflags, tc.libs, tc.archiver
        )
    }

    fn render_rules(&self) -> String {
        "rule cxx_compile\n\
         \x20 command = $CXX $CXXFLAGS $DEFINES $INCLUDES $extra_flags -c $in -o $out\n\
         \x20 description = compiling $in\n\
         \n\
         rule cxx_link_exe\n\
         \x20 command = $CXX $LDFLAGS -o $out $in $LIBS\n\
         \x20 description = linking $out\n\
         \n\
         rule cxx_link_static_lib\n\
         \x20 command = $AR rcs $out $in\n\
         \x20 description = archiving $out\n"
            .to_string()
    }

    fn render_targets(&self) -> String {
        // Parallel scanning registers edges in nondeterministic order;
        // sorting by primary output keeps the file byte-stable.
        let mut edges: Vec<&NinjaEdge> = self.edges.iter().collect();
        edges.sort_by(|a, b| a.outputs.cmp(&b.outputs));

        let mut out = String::new();
        for edge in edges {
            out.push_str("build");
            push_list(&mut out, &edge.outputs);
            out.push_str(": ");
            out.push_str(&edge.rule);
            push_list(&mut out, &edge.inputs);
            if !edge.implicit_inputs.is_empty() {
                out.push_str(" |");
                push_list(&mut out, &edge.implicit_inputs);
            }
            if !edge.order_only_inputs.is_empty() {
                out.push_str(" ||");
                push_list(&mut out, &edge.order_only_inputs);
            }
            out.push('\n');
            for (key, value) in &edge.bindings {
                let _ = writeln!(out, "  {} = {}", key, value);
            }
        }

        out.push_str("\nbuild all: phony");
        push_list(&mut out, &self.default_targets);
        out.push('\n');

        out.push_str("build tests: phony");
        push_list(&mut out, &self.test_targets);
        out.push('\n');

        out.push_str("\ndefault all\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_edge(output: &str) -> NinjaEdge {
        NinjaEdge {
            outputs: vec![output.to_string()],
            rule: "cxx_compile".to_string(),
            inputs: vec!["src/main.cc".to_string()],
            implicit_inputs: vec!["include/a.hpp".to_string()],
            order_only_inputs: vec![],
            bindings: vec![("out_dir".to_string(), ".".to_string())],
        }
    }

    #[test]
    fn test_targets_rendering() {
        let mut plan = NinjaPlan::new(PathBuf::from("/out"));
        plan.add_edge(sample_edge("main.o"));
        plan.add_default_target("demo".to_string());
        plan.set_test_targets(vec!["unit/src/main.cc.test".to_string()]);

        let rendered = plan.render_targets();
        assert!(rendered.contains(
            "build main.o: cxx_compile src/main.cc | include/a.hpp\n  out_dir = .\n"
        ));
        assert!(rendered.contains("build all: phony demo\n"));
        assert!(rendered.contains("build tests: phony unit/src/main.cc.test\n"));
        assert!(rendered.contains("default all\n"));
    }

    #[test]
    fn test_targets_rendering_is_sorted_by_output() {
        let mut unordered = NinjaPlan::new(PathBuf::from("/out"));
        unordered.add_edge(sample_edge("zeta.o"));
        unordered.add_edge(sample_edge("alpha.o"));

        let mut ordered = NinjaPlan::new(PathBuf::from("/out"));
        ordered.add_edge(sample_edge("alpha.o"));
        ordered.add_edge(sample_edge("zeta.o"));

        assert_eq!(unordered.render_targets(), ordered.render_targets());
        let rendered = ordered.render_targets();
        let alpha = rendered.find("build alpha.o").unwrap();
        let zeta = rendered.find("build zeta.o").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn test_ninja_escape() {
        assert_eq!(ninja_escape("plain/path.o"), "plain/path.o");
        assert_eq!(ninja_escape("a b"), "a$ b");
        assert_eq!(ninja_escape("c:drive"), "c$:drive");
        assert_eq!(ninja_escape("do$llar"), "do$$llar");
    }

    #[test]
    fn test_write_files() {
        let tmp = TempDir::new().unwrap();
        let mut plan = NinjaPlan::new(tmp.path().to_path_buf());
        plan.add_edge(sample_edge("main.o"));
        plan.add_default_target("demo".to_string());

        let toolchain = NinjaToolchain {
            cxx: "g++".to_string(),
            cxxflags: "-std=c++20 -O0 -g".to_string(),
            archiver: "ar".to_string(),
            ..Default::default()
        };
        plan.write_files(&toolchain).unwrap();

        for name in ["build.ninja", "config.ninja", "rules.ninja", "targets.ninja"] {
            assert!(tmp.path().join(name).exists(), "{} missing", name);
        }

        let build = std::fs::read_to_string(tmp.path().join("build.ninja")).unwrap();
        assert!(build.starts_with("ninja_required_version"));
        assert!(build.contains("include rules.ninja"));

        let config = std::fs::read_to_string(tmp.path().join("config.ninja")).unwrap();
        assert!(config.contains("CXX = g++"));
        assert!(config.contains("CXXFLAGS = -std=c++20 -O0 -g"));
        assert!(config.contains("AR = ar"));

        let rules = std::fs::read_to_string(tmp.path().join("rules.ninja")).unwrap();
        assert!(rules.contains("rule cxx_compile"));
        assert!(rules.contains("rule cxx_link_exe"));
        assert!(rules.contains("rule cxx_link_static_lib"));
    }

    #[test]
    fn test_write_files_deterministic() {
        let tmp = TempDir::new().unwrap();
        let toolchain = NinjaToolchain::default();

        let mut plan = NinjaPlan::new(tmp.path().to_path_buf());
        plan.add_edge(sample_edge("b.o"));
        plan.add_edge(sample_edge("a.o"));
        plan.write_files(&toolchain).unwrap();
        let first = std::fs::read_to_string(tmp.path().join("targets.ninja")).unwrap();

        plan.reset();
        plan.add_edge(sample_edge("a.o"));
        plan.add_edge(sample_edge("b.o"));
        plan.write_files(&toolchain).unwrap();
        let second = std::fs::read_to_string(tmp.path().join("targets.ninja")).unwrap();

        assert_eq!(first, second);
    }
}
