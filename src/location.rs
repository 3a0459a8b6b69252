// Copyright (c) 2026 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

/// The position state of a preprocessor at the moment a diagnostic is raised.
///
/// `line` starts from 1 and follows `#line` directives, so it is the line number
/// the shader author expects to see, not necessarily the physical line of the input.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Location {
    pub line: usize,
    pub file_name: String,
}

impl Location {
    pub fn new(line: usize, file_name: &str) -> Self {
        Self {
            line,
            file_name: file_name.to_owned(),
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {} in {}", self.line, self.file_name)
    }
}
