// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

/// Resolves the name of an `#include` directive to source text.
///
/// Providers are borrowed by the preprocessor, so they must outlive it.
pub trait Include {
    /// Checks whether this provider can supply the named file.
    fn has_file(&self, name: &str) -> bool;

    /// Loads the contents of the named file.
    /// Returns an `std::io::Error` if the file cannot be found or read.
    fn get_file(&self, name: &str) -> Result<String, std::io::Error>;
}
