// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::path::{Path, PathBuf};

use crate::include::Include;

/// A provider which resolves include names relative to a directory of the file system.
///
/// The content is prefixed with a `#line 0 <path>` marker, so the diagnostics
/// of the included text report the path of the file and its own line numbers.
pub struct IncludeDirectory {
    directory: PathBuf,
}

impl IncludeDirectory {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }
}

impl Include for IncludeDirectory {
    fn has_file(&self, name: &str) -> bool {
        self.resolve(name).is_file()
    }

    fn get_file(&self, name: &str) -> Result<String, std::io::Error> {
        let path = self.resolve(name);
        let content = std::fs::read_to_string(&path)?;
        Ok(format!("#line 0 {}\n{}", path.display(), content))
    }
}

#[cfg(test)]
mod tests {
    use std::{env, path::PathBuf};

    use pretty_assertions::assert_eq;

    use crate::{include::Include, include_directory::IncludeDirectory};

    fn get_shaders_path() -> PathBuf {
        // `env::current_dir()` returns the current Rust project's root folder
        let mut dir = env::current_dir().unwrap();
        dir.push("tests");
        dir.push("resources");
        dir.push("shaders");
        dir
    }

    #[test]
    fn test_include_directory() {
        let directory = get_shaders_path();
        let include = IncludeDirectory::new(&directory);

        assert!(include.has_file("common/constants.glsl"));
        assert!(!include.has_file("common/missing.glsl"));

        // directories are not files
        assert!(!include.has_file("common"));

        let content = include.get_file("common/constants.glsl").unwrap();
        let marker = format!(
            "#line 0 {}\n",
            directory.join("common/constants.glsl").display()
        );
        assert!(content.starts_with(&marker));
        assert!(content.contains("#define PI 3.14159265"));

        assert!(include.get_file("common/missing.glsl").is_err());
    }
}
