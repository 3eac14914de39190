//! Project scaffolding for `new` and `init`.

use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};

use crate::util::shell;

const MAIN_CC: &str = r#"#include <print>

int main(int argc, char* argv[]) {
  std::println("Hello, world!");
  return 0;
}
"#;

fn to_namespace_name(project_name: &str) -> String {
    project_name.replace('-', "_")
}

fn to_macro_name(project_name: &str) -> String {
    project_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Author string from the default git config, empty when unavailable.
fn get_author() -> String {
    let author = || -> Result<String, git2::Error> {
        let config = git2::Config::open_default()?;
        let name = config.get_string("user.name")?;
        let email = config.get_string("user.email")?;
        Ok(format!("{} <{}>", name, email))
    };
    match author() {
        Ok(author) => author,
        Err(err) => {
            tracing::debug!("{}", err);
            String::new()
        }
    }
}

fn render_manifest(project_name: &str) -> String {
    format!(
        r#"[package]
name = "{}"
version = "0.1.0"
authors = ["{}"]
edition = "23"
"#,
        project_name,
        get_author()
    )
}

fn render_header(project_name: &str) -> String {
    let macro_name = to_macro_name(project_name);
    let namespace = to_namespace_name(project_name);
    format!(
        r#"#ifndef {0}_HPP
#define {0}_HPP

namespace {1} {{
void hello_world();
}}  // namespace {1}

#endif  // !{0}_HPP
"#,
        macro_name, namespace
    )
}

fn render_lib_impl(project_name: &str) -> String {
    let namespace = to_namespace_name(project_name);
    format!(
        r#"#include "{0}/{0}.hpp"
#include <print>

namespace {1} {{
void hello_world() {{
  std::println("Hello, world from {0}!");
}}
}}  // namespace {1}
"#,
        project_name, namespace
    )
}

struct FileTemplate {
    path: PathBuf,
    contents: String,
}

fn write_template(file: &FileTemplate, skip_if_exists: bool) -> Result<()> {
    if file.path.exists() {
        if skip_if_exists {
            return Ok(());
        }
        bail!(
            "refusing to overwrite `{}`; file already exists",
            file.path.display()
        );
    }
    std::fs::write(&file.path, &file.contents)
        .with_context(|| format!("writing `{}` failed", file.path.display()))
}

/// Lay out a new binary or library project under `root`.
pub fn create_project_files(
    is_bin: bool,
    root: &Path,
    project_name: &str,
    skip_existing: bool,
) -> Result<()> {
    let mut templates = Vec::new();

    if is_bin {
        std::fs::create_dir_all(root.join("src"))
            .with_context(|| format!("failed to create {}", root.join("src").display()))?;
        templates.push(FileTemplate {
            path: root.join("cabin.toml"),
            contents: render_manifest(project_name),
        });
        templates.push(FileTemplate {
            path: root.join(".gitignore"),
            contents: "/cabin-out\n".to_string(),
        });
        templates.push(FileTemplate {
            path: root.join("src").join("main.cc"),
            contents: MAIN_CC.to_string(),
        });
    } else {
        let include_dir = root.join("include").join(project_name);
        std::fs::create_dir_all(&include_dir)
            .with_context(|| format!("failed to create {}", include_dir.display()))?;
        std::fs::create_dir_all(root.join("lib"))
            .with_context(|| format!("failed to create {}", root.join("lib").display()))?;

        templates.push(FileTemplate {
            path: root.join("cabin.toml"),
            contents: render_manifest(project_name),
        });
        templates.push(FileTemplate {
            path: root.join(".gitignore"),
            contents: "/cabin-out\ncabin.lock\n".to_string(),
        });
        templates.push(FileTemplate {
            path: include_dir.join(format!("{}.hpp", project_name)),
            contents: render_header(project_name),
        });
        templates.push(FileTemplate {
            path: root.join("lib").join(format!("{}.cc", project_name)),
            contents: render_lib_impl(project_name),
        });
    }

    for template in &templates {
        write_template(template, skip_existing)?;
    }

    shell::status(
        "Created",
        format!(
            "{} `{}` package",
            if is_bin { "binary (application)" } else { "library" },
            project_name
        ),
    );
    Ok(())
}

/// `cabin new`: create a fresh project directory and a git repository.
pub fn new_project(is_bin: bool, package_name: &str) -> Result<()> {
    crate::core::validate_package_name(package_name)?;
    ensure!(
        !Path::new(package_name).exists(),
        "directory `{}` already exists",
        package_name
    );

    let root = PathBuf::from(package_name);
    create_project_files(is_bin, &root, package_name, false)?;
    git2::Repository::init(&root)
        .with_context(|| format!("failed to initialize git repository in `{}`", package_name))?;
    Ok(())
}

/// `cabin init`: scaffold into the current directory, keeping whatever
/// already exists.
pub fn init_project(is_bin: bool) -> Result<()> {
    ensure!(
        !Path::new("cabin.toml").exists(),
        "cannot initialize an existing cabin package"
    );

    let root = std::env::current_dir().context("failed to get current directory")?;
    let package_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    crate::core::validate_package_name(&package_name)?;

    create_project_files(is_bin, &root, &package_name, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_to_namespace_name() {
        assert_eq!(to_namespace_name("my-lib"), "my_lib");
        assert_eq!(to_namespace_name("plain"), "plain");
    }

    #[test]
    fn test_to_macro_name() {
        assert_eq!(to_macro_name("my-lib"), "MY_LIB");
        assert_eq!(to_macro_name("hello_world"), "HELLO_WORLD");
    }

    #[test]
    fn test_create_binary_project() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("hello_world");
        create_project_files(true, &root, "hello_world", false).unwrap();

        assert!(root.join("cabin.toml").exists());
        assert!(root.join(".gitignore").exists());
        let main = std::fs::read_to_string(root.join("src").join("main.cc")).unwrap();
        assert!(main.contains("Hello, world!"));

        let manifest = std::fs::read_to_string(root.join("cabin.toml")).unwrap();
        assert!(manifest.contains("name = \"hello_world\""));
        assert!(manifest.contains("edition = \"23\""));
    }

    #[test]
    fn test_create_library_project_hyphenated() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("my-lib");
        create_project_files(false, &root, "my-lib", false).unwrap();

        let header =
            std::fs::read_to_string(root.join("include").join("my-lib").join("my-lib.hpp"))
                .unwrap();
        assert!(header.contains("namespace my_lib"));
        assert!(header.contains("MY_LIB_HPP"));

        let lib_impl = std::fs::read_to_string(root.join("lib").join("my-lib.cc")).unwrap();
        assert!(lib_impl.contains("namespace my_lib"));
        assert!(lib_impl.contains("#include \"my-lib/my-lib.hpp\""));
    }

    #[test]
    fn test_create_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("app");
        create_project_files(true, &root, "app", false).unwrap();
        let err = create_project_files(true, &root, "app", false).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));
    }

    #[test]
    fn test_create_skip_existing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("app");
        create_project_files(true, &root, "app", false).unwrap();
        std::fs::write(root.join("src").join("main.cc"), "// custom\n").unwrap();

        create_project_files(true, &root, "app", true).unwrap();
        let main = std::fs::read_to_string(root.join("src").join("main.cc")).unwrap();
        assert_eq!(main, "// custom\n");
    }
}
