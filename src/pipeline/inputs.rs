use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use super::RunError;
use crate::label::LabelConfig;

/// Label files under `path`, sorted by path. A single file must itself be a
/// label of the configured format.
pub fn collect_labels(path: &Path, config: &LabelConfig) -> Result<Vec<PathBuf>, RunError> {
    if path.is_file() {
        return if config.matches(path) {
            Ok(vec![path.to_path_buf()])
        } else {
            Err(RunError::InvalidInput(path.to_path_buf()))
        };
    }
    if !path.is_dir() {
        return Err(RunError::InvalidInput(path.to_path_buf()));
    }

    let walker = WalkBuilder::new(path)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .build();

    let mut labels = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
                if is_file && config.matches(entry.path()) {
                    labels.push(entry.into_path());
                }
            }
            Err(e) => log::warn!("Skipping unreadable entry under {}: {}", path.display(), e),
        }
    }
    labels.sort();
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::builtin;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn walks_recursively_including_hidden_and_ignored() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("2019/01")).unwrap();
        fs::create_dir_all(root.join(".staging")).unwrap();
        fs::write(root.join(".gitignore"), "*.xml\n").unwrap();
        fs::write(root.join("2019/01/b.xml"), "").unwrap();
        fs::write(root.join("2019/a.XML"), "").unwrap();
        fs::write(root.join(".staging/c.xml"), "").unwrap();
        fs::write(root.join("2019/01/b.fit"), "").unwrap();

        let config = builtin("hyb2-onc-t").unwrap().label;
        let labels = collect_labels(root, &config).unwrap();
        assert_eq!(
            labels,
            vec![
                root.join(".staging/c.xml"),
                root.join("2019/01/b.xml"),
                root.join("2019/a.XML"),
            ]
        );
    }

    #[test]
    fn single_file_must_be_a_label() {
        let dir = TempDir::new().unwrap();
        let label = dir.path().join("frame.xml");
        let image = dir.path().join("frame.fit");
        fs::write(&label, "").unwrap();
        fs::write(&image, "").unwrap();

        let config = builtin("hyb2-onc-t").unwrap().label;
        assert_eq!(collect_labels(&label, &config).unwrap(), vec![label]);
        assert!(matches!(
            collect_labels(&image, &config),
            Err(RunError::InvalidInput(_))
        ));
        assert!(matches!(
            collect_labels(&dir.path().join("absent"), &config),
            Err(RunError::InvalidInput(_))
        ));
    }
}
