// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::io::ErrorKind;

use crate::include::Include;

/// An in-memory provider which supplies one fixed content under one fixed name.
///
/// e.g. `IncludeString::new("#define MAX_LIGHTS 8", "config.glsl")`
/// resolves `#include <config.glsl>`.
pub struct IncludeString {
    content: String,
    name: String,
}

impl IncludeString {
    pub fn new(content: &str, name: &str) -> Self {
        Self {
            content: content.to_owned(),
            name: name.to_owned(),
        }
    }
}

impl Include for IncludeString {
    fn has_file(&self, name: &str) -> bool {
        self.name == name
    }

    fn get_file(&self, name: &str) -> Result<String, std::io::Error> {
        if self.has_file(name) {
            Ok(self.content.clone())
        } else {
            Err(std::io::Error::new(
                ErrorKind::NotFound,
                format!("'{}' is not provided by this include string.", name),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{include::Include, include_string::IncludeString};

    #[test]
    fn test_include_string() {
        let include = IncludeString::new("#define X 9", "lib");

        assert!(include.has_file("lib"));
        assert!(!include.has_file("lib2"));
        assert_eq!(include.get_file("lib").unwrap(), "#define X 9");
        assert!(include.get_file("lib2").is_err());
    }
}
