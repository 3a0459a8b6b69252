// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

use crate::location::Location;

/// `Prompt` is similar to `PreprocessError`, but is intended for user-facing messages
/// that do not stop the preprocessing, such as the text of a `#warning` directive
/// or the notice of a macro redefinition.
#[derive(Debug, PartialEq, Clone)]
pub struct Prompt {
    pub level: PromptLevel,
    pub message: String,
    pub location: Location,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PromptLevel {
    Warning,
}

impl Prompt {
    pub fn new(level: PromptLevel, message: &str, location: Location) -> Self {
        Self {
            level,
            message: message.to_owned(),
            location,
        }
    }

    /// Forwards the prompt to the `log` facade.
    pub fn log(&self) {
        match self.level {
            PromptLevel::Warning => log::warn!("{}", self),
        }
    }
}

impl Display for PromptLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptLevel::Warning => write!(f, "warning"),
        }
    }
}

impl Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.level, self.message)
    }
}
