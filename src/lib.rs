// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

mod expression;
mod invocation;
mod lexer;
mod predefined;
mod token;

pub mod error;
pub mod error_printer;
pub mod include;
pub mod include_directory;
pub mod include_string;
pub mod location;
pub mod macro_map;
pub mod processor;
pub mod prompt;

pub use error::PreprocessError;
pub use include::Include;
pub use include_directory::IncludeDirectory;
pub use include_string::IncludeString;
pub use location::Location;
pub use macro_map::Macro;
pub use processor::{MAX_INCLUDE_LEVEL, MAX_LINE_NUMBER, Preprocessor};
pub use prompt::{Prompt, PromptLevel};
