//! Source file collection.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ShuntError, ShuntResult};

/// Expand the caller-supplied paths into the sorted list of source files.
///
/// A file path is taken as-is; a directory is walked recursively for `.py`
/// files. Relative paths are resolved against `fallback`. A path that does
/// not exist is an error before any file is touched.
///
/// Hidden directories and the usual generated trees (`__pycache__`, `venv`,
/// `node_modules`, `target`) are skipped during directory walks. The result
/// is sorted and deduplicated so batch runs visit files in a stable order.
pub fn expand_paths(paths: &[PathBuf], fallback: &Path) -> ShuntResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for path in paths {
        let resolved = if path.is_absolute() {
            path.clone()
        } else {
            fallback.join(path)
        };
        if resolved.is_file() {
            files.push(resolved);
        } else if resolved.is_dir() {
            collect_source_files(&resolved, &mut files);
        } else {
            return Err(ShuntError::PathNotFound {
                path: resolved.display().to_string(),
            });
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn collect_source_files(root: &Path, out: &mut Vec<PathBuf>) {
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let rel_path = match path.strip_prefix(root) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if rel_path
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        {
            continue;
        }
        if rel_path.components().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            name == "__pycache__" || name == "node_modules" || name == "venv" || name == "target"
        }) {
            continue;
        }
        if path.extension().is_some_and(|ext| ext == "py") {
            out.push(path.to_path_buf());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_workspace() -> TempDir {
        let dir = TempDir::new().unwrap();

        let src_dir = dir.path().join("src");
        fs::create_dir_all(&src_dir).unwrap();
        File::create(src_dir.join("main.py"))
            .unwrap()
            .write_all(b"def main():\n    pass\n")
            .unwrap();
        File::create(src_dir.join("utils.py"))
            .unwrap()
            .write_all(b"def helper():\n    return 42\n")
            .unwrap();
        File::create(dir.path().join("notes.txt"))
            .unwrap()
            .write_all(b"not python")
            .unwrap();

        let cache_dir = dir.path().join("__pycache__");
        fs::create_dir_all(&cache_dir).unwrap();
        File::create(cache_dir.join("main.py"))
            .unwrap()
            .write_all(b"# cached")
            .unwrap();

        let hidden_dir = dir.path().join(".hidden");
        fs::create_dir_all(&hidden_dir).unwrap();
        File::create(hidden_dir.join("secret.py"))
            .unwrap()
            .write_all(b"# hidden")
            .unwrap();

        dir
    }

    #[test]
    fn directories_expand_to_their_python_files() {
        let workspace = create_test_workspace();
        let files = expand_paths(&[workspace.path().to_path_buf()], workspace.path()).unwrap();
        assert_eq!(
            files,
            vec![
                workspace.path().join("src/main.py"),
                workspace.path().join("src/utils.py"),
            ]
        );
    }

    #[test]
    fn excluded_directories_are_skipped() {
        let workspace = create_test_workspace();
        let files = expand_paths(&[workspace.path().to_path_buf()], workspace.path()).unwrap();
        assert!(!files.iter().any(|p| {
            let text = p.to_string_lossy();
            text.contains("__pycache__") || text.contains(".hidden")
        }));
    }

    #[test]
    fn explicit_files_are_taken_as_is() {
        let workspace = create_test_workspace();
        let target = workspace.path().join("src/main.py");
        let files = expand_paths(&[target.clone()], workspace.path()).unwrap();
        assert_eq!(files, vec![target]);
    }

    #[test]
    fn relative_paths_resolve_against_the_fallback() {
        let workspace = create_test_workspace();
        let files = expand_paths(&[PathBuf::from("src/main.py")], workspace.path()).unwrap();
        assert_eq!(files, vec![workspace.path().join("src/main.py")]);
    }

    #[test]
    fn missing_paths_are_an_error() {
        let workspace = create_test_workspace();
        let result = expand_paths(&[PathBuf::from("no/such/file.py")], workspace.path());
        assert!(matches!(result, Err(ShuntError::PathNotFound { .. })));
    }

    #[test]
    fn overlapping_inputs_deduplicate() {
        let workspace = create_test_workspace();
        let files = expand_paths(
            &[
                workspace.path().to_path_buf(),
                workspace.path().join("src/main.py"),
            ],
            workspace.path(),
        )
        .unwrap();
        let mains = files
            .iter()
            .filter(|p| p.ends_with("src/main.py"))
            .count();
        assert_eq!(mains, 1);
    }
}
