// Copyright (c) 2026 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

use crate::location::Location;

/// The error raised by a preprocessor run.
///
/// There is no recovery: the first error aborts the whole `preprocess()` call,
/// including every including (parent) file waiting on it.
#[derive(Debug, PartialEq, Clone)]
pub enum PreprocessError {
    /// A malformed directive, an unresolved include, an invalid macro invocation, etc.
    Message(String, Location),

    /// The input ended inside a block comment or an open conditional directive.
    UnexpectedEndOfDocument(String, Location),

    /// Raised by the `#error` directive.
    UserDefined(String, Location),
}

impl PreprocessError {
    pub fn message(&self) -> &str {
        match self {
            PreprocessError::Message(message, _)
            | PreprocessError::UnexpectedEndOfDocument(message, _)
            | PreprocessError::UserDefined(message, _) => message,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            PreprocessError::Message(_, location)
            | PreprocessError::UnexpectedEndOfDocument(_, location)
            | PreprocessError::UserDefined(_, location) => location,
        }
    }
}

impl Display for PreprocessError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.location(), self.message())
    }
}

impl std::error::Error for PreprocessError {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{error::PreprocessError, location::Location};

    #[test]
    fn test_display_error() {
        assert_eq!(
            PreprocessError::Message(
                "Unknown directive 'foo'.".to_owned(),
                Location::new(3, "main.frag")
            )
            .to_string(),
            "Line 3 in main.frag: Unknown directive 'foo'."
        );

        assert_eq!(
            PreprocessError::UserDefined("stop".to_owned(), Location::new(1, "Unknown file"))
                .to_string(),
            "Line 1 in Unknown file: stop"
        );
    }
}
