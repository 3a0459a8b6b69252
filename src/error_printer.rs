// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::error::PreprocessError;

const LEADING_LENGTH: usize = 15;
const SNIPPET_LENGTH: usize = 40;

// The visible part of a source line and the highlighted text within it.
//
// ```diagram
//                 /-- snippet start in the line
//                 |
//                 |            |-- snippet length
//                 v            v
// prefix -->   ...sni[ppet]_text...  <-- suffix
//                     ^^^^
//                     |  |-- highlight length
//                     |
//                     \----- highlight offset in the snippet
// ```
struct Snippet {
    prefix_ellipsis: bool,
    suffix_ellipsis: bool,
    start: usize,
    length: usize,
    highlight_offset: usize,
    highlight_length: usize,
}

impl Snippet {
    /// Positions and lengths are counted in chars.
    fn new(highlight_start: usize, highlight_length: usize, line_length: usize) -> Self {
        let (prefix_ellipsis, start, highlight_offset) =
            if line_length < SNIPPET_LENGTH || highlight_start < LEADING_LENGTH {
                (false, 0, highlight_start)
            } else if highlight_start + SNIPPET_LENGTH > line_length {
                let start = line_length - SNIPPET_LENGTH;
                (true, start, highlight_start - start)
            } else {
                (true, highlight_start - LEADING_LENGTH, LEADING_LENGTH)
            };

        let (suffix_ellipsis, length) = if start + SNIPPET_LENGTH >= line_length {
            (false, line_length - start)
        } else {
            (true, SNIPPET_LENGTH)
        };

        Self {
            prefix_ellipsis,
            suffix_ellipsis,
            start,
            length,
            highlight_offset,
            highlight_length: highlight_length.min(length.saturating_sub(highlight_offset)),
        }
    }

    /// Renders the snippet line and the indication line.
    fn render(&self, line_text: &str, message: &str) -> (String, String) {
        let mut snippet = String::from("| ");
        let mut indication = String::from("| ");

        if self.prefix_ellipsis {
            snippet.push_str("...");
            indication.push_str("   ");
        }

        snippet.extend(
            line_text
                .chars()
                .skip(self.start)
                .take(self.length)
                .map(|c| if c == '\t' { ' ' } else { c }),
        );

        if self.suffix_ellipsis {
            snippet.push_str("...");
        }

        indication.push_str(&" ".repeat(self.highlight_offset));
        indication.push_str(&"^".repeat(self.highlight_length.max(1)));
        indication.push_str("___ ");
        indication.push_str(message);

        (snippet, indication)
    }
}

impl PreprocessError {
    /// Renders the error followed by the offending line of the source text
    /// and an indication of it, e.g.
    ///
    /// ```text
    /// Line 2 in a.glsl: Unknown directive 'foo'.
    /// |   #foo bar
    /// |   ^^^^^^^^___ Unknown directive 'foo'.
    /// ```
    ///
    /// Only the error message is rendered if the line number of the error
    /// does not refer to a line of the source text (e.g. after a `#line` directive).
    pub fn with_source(&self, source_text: &str) -> String {
        let title = self.to_string();

        let line_text = match self {
            PreprocessError::UnexpectedEndOfDocument(..) => source_text.lines().last(),
            _ => self
                .location()
                .line
                .checked_sub(1)
                .and_then(|index| source_text.lines().nth(index)),
        };

        let Some(line_text) = line_text else {
            return title;
        };

        let line_length = line_text.chars().count();
        let (highlight_start, highlight_length) = match self {
            PreprocessError::UnexpectedEndOfDocument(..) => (line_length, 0),
            _ => {
                let leading = line_text.chars().take_while(|c| c.is_whitespace()).count();
                (leading, line_text.trim().chars().count())
            }
        };

        let (snippet_line, indication_line) =
            Snippet::new(highlight_start, highlight_length, line_length)
                .render(line_text, self.message());
        format!("{}\n{}\n{}", title, snippet_line, indication_line)
    }
}
