// Copyright (c) 2026 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::token::{is_identifier_start, split_identifier};

/// A raw token taken apart for macro expansion.
///
/// e.g. `" #ADD(a, (b, c))"` is parsed as:
///
/// - leading: `" "`
/// - stringify: `true`
/// - name: `"ADD"`
/// - call: `"(a, (b, c))"` with the arguments `["a", " (b, c)"]`
/// - rest: `""`
#[derive(Debug, PartialEq)]
pub struct Invocation<'a> {
    pub leading: &'a str,
    pub stringify: bool,
    pub name: &'a str,
    pub call: Option<Call<'a>>,

    // the text after the name (and the call), kept verbatim
    pub rest: &'a str,
}

#[derive(Debug, PartialEq)]
pub struct Call<'a> {
    /// The raw parameter text including the parentheses.
    pub parameter_string: &'a str,

    /// The untrimmed arguments. `"()"` has no arguments.
    pub arguments: Vec<&'a str>,
}

impl<'a> Invocation<'a> {
    pub fn parse(token: &'a str) -> Self {
        let body = token.trim_start();
        let leading = &token[..token.len() - body.len()];

        let (stringify, body) = match body.strip_prefix('#') {
            Some(after) if after.starts_with(is_identifier_start) => (true, after),
            _ => (false, body),
        };

        let (name, after_name) = split_identifier(body);

        let (call, rest) = match find_closing_parenthesis(after_name) {
            Some(close) => {
                let parameter_string = &after_name[..=close];
                let call = Call {
                    parameter_string,
                    arguments: split_arguments(&parameter_string[1..close]),
                };
                (Some(call), &after_name[close + 1..])
            }
            None => (None, after_name),
        };

        Self {
            leading,
            stringify,
            name,
            call,
            rest,
        }
    }
}

/// Finds the `)` matching the `(` at the beginning of the text.
///
/// Returns `None` if the text does not start with `(` or the parentheses
/// are unbalanced. Parentheses in string and character literals are ignored.
pub fn find_closing_parenthesis(text: &str) -> Option<usize> {
    if !text.starts_with('(') {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (index, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }

    None
}

/// Splits the text between the parentheses of a call on the top-level commas.
pub fn split_arguments(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return vec![];
    }

    let mut arguments = vec![];
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                arguments.push(&text[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    arguments.push(&text[start..]);
    arguments
}

/// Converts the text into a string literal, e.g. `say "hi"` into `"say \"hi\""`.
pub fn stringify(text: &str) -> String {
    let mut output = String::with_capacity(text.len() + 2);
    output.push('"');
    for c in text.trim().chars() {
        if c == '"' || c == '\\' {
            output.push('\\');
        }
        output.push(c);
    }
    output.push('"');
    output
}
