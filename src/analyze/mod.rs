//! Reading package import graphs out of source trees.
//!
//! The same walk covers the working copy on disk and the committed tree of
//! any dependency revision in the git cache. Along the way the analyzer
//! notes the blob hashes of the files that identify a module: its
//! changelog and its embedded lockfiles.

use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Result};

use crate::core::module::Module;
use crate::core::packages::Packages;
use crate::git::GitCache;
use crate::types::{Hash, StringSet};
use crate::walk::{walk, FsEntry, GitEntry, TreeEntry};

/// Directory names that never contain vendorable source.
pub fn default_excludes() -> StringSet {
    [".git", crate::CACHE_DIR, "vendor", "testdata"]
        .into_iter()
        .collect()
}

/// Infer the working copy's package name from its position beneath a
/// GOPATH-like root and read the import graph of all of its packages.
pub fn read_own_packages(
    work_dir: &str,
    go_path: &[String],
    excludes: &StringSet,
) -> Result<(String, Packages)> {
    let mut name = None;
    let mut src_dir = String::new();
    for root in go_path {
        let prefix = format!("{root}/src");
        if work_dir == prefix {
            name = Some(String::new());
            src_dir = prefix;
        } else if let Some(rest) = work_dir.strip_prefix(&format!("{prefix}/")) {
            name = Some(rest.to_string());
            src_dir = prefix;
        }
    }
    let Some(name) = name else {
        bail!("the working copy {work_dir} is not beneath any source root");
    };

    let mut module = Module::named(&name);
    let mut excludes = excludes.clone();
    excludes.include(&default_excludes());

    let entry = FsEntry::dir(Path::new(&src_dir).join(&name));
    read_packages(Box::new(entry), &mut module, &excludes)?;
    Ok((name, module.packages))
}

/// Read the package import graph for all source files in a committed tree,
/// filling in the module's changelog and lockfile blob hashes and a
/// warning for any package whose import comment disagrees with its path.
pub fn read_git_packages(repo: Rc<GitCache>, tree: Hash, module: &mut Module) -> Result<()> {
    let base = module
        .name
        .rsplit('/')
        .next()
        .unwrap_or(&module.name)
        .to_string();
    let entry = GitEntry::tree(repo, base, tree);
    read_packages(Box::new(entry), module, &default_excludes())
}

fn read_packages(
    entry: Box<dyn TreeEntry>,
    module: &mut Module,
    excludes: &StringSet,
) -> Result<()> {
    module.packages = Packages::new();
    let dir = match module.name.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => ".".to_string(),
    };
    let mut walker = walk(&dir, entry);
    while let Some((path, entry)) = walker.next()? {
        if path == format!("{}/CHANGELOG.md", module.name) {
            module.changelog = entry.hash();
        } else if path == format!("{}/glide.lock", module.name) {
            module.glidelock = entry.hash();
        } else if path == format!("{}/Gopkg.lock", module.name) {
            module.deplock = entry.hash();
        } else if entry.is_dir() && excludes.has(&entry.name()) {
            walker.skip();
        } else if !entry.is_dir() && entry.name().ends_with(".go") {
            let mut source = String::new();
            match entry.reader().and_then(|mut reader| {
                reader.read_to_string(&mut source)?;
                Ok(())
            }) {
                Ok(()) => digest_source_file(&path, &source, module),
                Err(err) => module
                    .warnings
                    .push(format!("Unable to read source file {path}: {err}")),
            }
        }
    }
    Ok(())
}

/// Extract the package clause, import list, and import comment from one
/// source file and fold them into the module's package graph.
fn digest_source_file(path: &str, source: &str, module: &mut Module) {
    let exp = match path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    };

    let parsed = match scan_imports(source) {
        Some(parsed) => parsed,
        None => {
            module
                .warnings
                .push(format!("Unable to parse source file {path}: no package clause"));
            return;
        }
    };

    if let Some(canonical) = &parsed.import_comment {
        if *canonical != exp {
            module.warnings.push(format!(
                "The package {exp:?} must be imported as {canonical:?} according to its \
                 package import comment."
            ));
        }
    }

    let test = path.ends_with("_test.go");
    if !test {
        if parsed.package == "main" {
            module.packages.command(&exp);
        } else {
            module.packages.export(&exp);
        }
    }
    for import in parsed.imports {
        if test {
            module.packages.test_import(&exp, &import);
        } else {
            module.packages.import(&exp, &import);
        }
    }
}

struct ScannedFile {
    package: String,
    import_comment: Option<String>,
    imports: Vec<String>,
}

/// A minimal scan of a source file: the package clause, the `// import`
/// comment hint beside it, and every import spec. Build tags are not
/// honored; imports are collected from every file.
fn scan_imports(source: &str) -> Option<ScannedFile> {
    let mut package = None;
    let mut import_comment = None;
    let mut imports = Vec::new();
    let mut in_block_comment = false;
    let mut in_import_group = false;

    for raw_line in source.lines() {
        let mut line = raw_line.trim().to_string();

        if in_block_comment {
            match line.find("*/") {
                Some(end) => {
                    line = line[end + 2..].trim_start().to_string();
                    in_block_comment = false;
                }
                None => continue,
            }
        }
        // Strip block comments that open and close on this line.
        while let (Some(open), Some(close)) = (line.find("/*"), line.find("*/")) {
            if close < open {
                break;
            }
            line = format!("{} {}", line[..open].trim_end(), line[close + 2..].trim_start())
                .trim()
                .to_string();
        }
        if let Some(open) = line.find("/*") {
            in_block_comment = true;
            line = line[..open].trim_end().to_string();
        }

        if line.is_empty() {
            continue;
        }
        let line = line.as_str();

        if package.is_none() {
            if line.starts_with("//") {
                continue;
            }
            if let Some(rest) = line.strip_prefix("package ") {
                let mut parts = rest.splitn(2, "//");
                let name = parts.next().unwrap_or_default().trim();
                package = Some(name.to_string());
                if let Some(comment) = parts.next() {
                    if let Some(quoted) = comment.trim().strip_prefix("import ") {
                        import_comment = unquote(quoted.trim());
                    }
                }
            }
            continue;
        }

        if line.starts_with("//") {
            continue;
        }

        if in_import_group {
            if line.starts_with(')') {
                in_import_group = false;
            } else if let Some(path) = import_spec(line) {
                imports.push(path);
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("import") {
            let rest = rest.trim_start();
            if let Some(group) = rest.strip_prefix('(') {
                match group.find(')') {
                    // The whole group on one line.
                    Some(end) => {
                        if let Some(path) = import_spec(group[..end].trim()) {
                            imports.push(path);
                        }
                    }
                    None => {
                        in_import_group = true;
                        if let Some(path) = import_spec(group.trim()) {
                            imports.push(path);
                        }
                    }
                }
            } else if let Some(path) = import_spec(rest) {
                imports.push(path);
            }
            continue;
        }

        // The import section is over at the first other declaration.
        if ["func", "var", "type", "const"]
            .iter()
            .any(|kw| line == *kw || line.starts_with(&format!("{kw} ")))
        {
            break;
        }
    }

    package.map(|package| ScannedFile {
        package,
        import_comment,
        imports,
    })
}

/// Parse one import spec: an optional alias followed by a quoted path.
fn import_spec(line: &str) -> Option<String> {
    let line = line.split("//").next().unwrap_or_default().trim();
    if line.is_empty() {
        return None;
    }
    let quoted = match line.find('"') {
        Some(start) => &line[start..],
        None => return None,
    };
    unquote(quoted.split(';').next().unwrap_or(quoted).trim())
}

fn unquote(s: &str) -> Option<String> {
    let s = s.trim();
    let s = s.strip_prefix('"')?;
    let end = s.find('"')?;
    Some(s[..end].to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn digest(path: &str, source: &str) -> Module {
        let mut module = Module::named("example.com/avery");
        digest_source_file(path, source, &mut module);
        module
    }

    #[test]
    fn test_export_with_imports() {
        let module = digest(
            "example.com/avery/main.go",
            r#"package avery

import (
    "fmt"
    "example.com/blake"
    util "example.com/carey/util"
)

func main() {}
"#,
        );
        assert!(module.packages.exports.has("example.com/avery"));
        assert!(module
            .packages
            .imports
            .has("example.com/avery", "example.com/blake"));
        assert!(module
            .packages
            .imports
            .has("example.com/avery", "example.com/carey/util"));
        // Builtins stay out of the graph.
        assert!(!module.packages.all.has("fmt"));
    }

    #[test]
    fn test_command() {
        let module = digest(
            "example.com/avery/cmd/avery/main.go",
            "package main\n\nimport \"example.com/blake\"\n",
        );
        assert!(module.packages.commands.has("example.com/avery/cmd/avery"));
        assert!(!module.packages.exports.has("example.com/avery/cmd/avery"));
    }

    #[test]
    fn test_test_imports() {
        let module = digest(
            "example.com/avery/avery_test.go",
            "package avery\n\nimport \"example.com/drew\"\n",
        );
        assert!(module
            .packages
            .test_imports
            .has("example.com/avery", "example.com/drew"));
        assert!(!module.packages.exports.has("example.com/avery"));
    }

    #[test]
    fn test_import_comment_mismatch_warns() {
        let module = digest(
            "example.com/avery/avery.go",
            "package avery // import \"example.com/official\"\n",
        );
        assert_eq!(module.warnings.len(), 1);
        assert!(module.warnings[0].contains("example.com/official"));

        let module = digest(
            "example.com/avery/avery.go",
            "package avery // import \"example.com/avery\"\n",
        );
        assert!(module.warnings.is_empty());
    }

    #[test]
    fn test_single_import() {
        let module = digest(
            "example.com/avery/avery.go",
            "package avery\n\nimport \"example.com/blake\"\n",
        );
        assert!(module
            .packages
            .imports
            .has("example.com/avery", "example.com/blake"));
    }

    #[test]
    fn test_comments_skipped() {
        let module = digest(
            "example.com/avery/avery.go",
            r#"// Package avery does things.
/* block
   comment */
package avery

import (
    // a comment
    "example.com/blake" // trailing
)
"#,
        );
        assert!(module.packages.exports.has("example.com/avery"));
        assert!(module
            .packages
            .imports
            .has("example.com/avery", "example.com/blake"));
    }

    #[test]
    fn test_read_own_packages() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_string_lossy().to_string();
        let work = format!("{root}/src/example.com/avery");
        fs::create_dir_all(format!("{work}/sub")).unwrap();
        fs::create_dir_all(format!("{work}/vendor/example.com/blake")).unwrap();
        fs::write(
            format!("{work}/main.go"),
            "package main\n\nimport \"example.com/avery/sub\"\n",
        )
        .unwrap();
        fs::write(format!("{work}/sub/sub.go"), "package sub\n").unwrap();
        fs::write(
            format!("{work}/vendor/example.com/blake/blake.go"),
            "package blake\n",
        )
        .unwrap();

        let (name, packages) =
            read_own_packages(&work, &[root.clone()], &StringSet::new()).unwrap();
        assert_eq!(name, "example.com/avery");
        assert!(packages.commands.has("example.com/avery"));
        assert!(packages.exports.has("example.com/avery/sub"));
        // The vendor tree is excluded.
        assert!(!packages.all.has("example.com/blake"));
    }

    #[test]
    fn test_read_own_packages_outside_roots() {
        let err = read_own_packages("/nowhere/avery", &["/go".to_string()], &StringSet::new())
            .unwrap_err();
        assert!(err.to_string().contains("not beneath any source root"));
    }
}
