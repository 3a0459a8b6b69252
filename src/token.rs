// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::{collections::HashSet, sync::LazyLock};

/// Single-character punctuators. A token always ends before and after one of these,
/// unless the pair forms one of the `TWO_CHAR_PUNCTUATORS`.
///
/// Note that `(`, `)` and `#` are absent: parentheses are handled by the parenthesis
/// group of the lexer, and `#` must stick to the following identifier to mark stringizing.
pub const SINGLE_CHAR_PUNCTUATORS: [char; 24] = [
    ',', '"', '\'', '{', '}', '[', ']', '~', '.', '|', '&', '^', '+', '-', '*', '/', '=', ';',
    '!', '%', '>', '<', ':', '?',
];

pub const TWO_CHAR_PUNCTUATORS: [&str; 21] = [
    ">>", "<<", "++", "--", "+=", "-=", "*=", "/=", "&=", "|=", "^=", "%=", "==", "!=", ">=",
    "<=", "&&", "||", "->", "::", "##",
];

/// Identifiers which can never be defined or undefined by `#define` and `#undef`.
///
/// They are the keywords of C (including the alternative operator spellings of C++),
/// the macros that the ANSI C standard reserves for the implementation, and the
/// bookkeeping macros maintained by the preprocessor itself.
pub const RESERVED_IDENTIFIERS: [&str; 64] = [
    // keywords
    "auto",
    "break",
    "case",
    "char",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extern",
    "float",
    "for",
    "goto",
    "if",
    "inline",
    "int",
    "long",
    "register",
    "restrict",
    "return",
    "short",
    "signed",
    "sizeof",
    "static",
    "struct",
    "switch",
    "typedef",
    "union",
    "unsigned",
    "void",
    "volatile",
    "while",
    // alternative operator spellings
    "and",
    "and_eq",
    "bitand",
    "bitor",
    "compl",
    "not",
    "not_eq",
    "or",
    "or_eq",
    "xor",
    "xor_eq",
    // operators of the conditional directives
    "defined",
    // standard predefined macros
    "__FILE__",
    "__LINE__",
    "__DATE__",
    "__TIME__",
    "__STDC__",
    "__STDC_VERSION__",
    "__STDC_HOSTED__",
    "__STDC_IEC_559__",
    "__STDC_IEC_559_COMPLEX__",
    "__STDC_ISO_10646__",
    "__cplusplus",
    "__BASE_FILE__",
    // preprocessor bookkeeping
    "__INCLUDE_LEVEL__",
    "__IF_SCOPE__",
    "__CURRENT_IF_SCOPE__",
    "__SHADEPP__",
    "__VA_ARGS__",
    "__COUNTER__",
];

static RESERVED_IDENTIFIER_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| RESERVED_IDENTIFIERS.into_iter().collect());

static TWO_CHAR_PUNCTUATOR_SET: LazyLock<HashSet<(char, char)>> = LazyLock::new(|| {
    TWO_CHAR_PUNCTUATORS
        .iter()
        .filter_map(|p| {
            let mut chars = p.chars();
            Some((chars.next()?, chars.next()?))
        })
        .collect()
});

pub fn is_reserved_identifier(name: &str) -> bool {
    RESERVED_IDENTIFIER_SET.contains(name)
}

pub fn is_single_char_punctuator(c: char) -> bool {
    SINGLE_CHAR_PUNCTUATORS.contains(&c)
}

pub fn is_two_char_punctuator(first: char, second: char) -> bool {
    TWO_CHAR_PUNCTUATOR_SET.contains(&(first, second))
}

/// Checks whether `current` begins a new token, given the `last` character
/// of the token being accumulated.
///
/// A whitespace always begins a new token (and the whitespace itself becomes
/// the head of that token), so tokens look like `" foo"` and `"+"`.
/// Two-character punctuators are checked first so that `==` is not split into `=` `=`.
pub fn is_new_token(last: char, current: char) -> bool {
    if current.is_whitespace() {
        return true;
    }

    if is_two_char_punctuator(last, current) {
        return false;
    }

    is_single_char_punctuator(last) || is_single_char_punctuator(current)
}

pub fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

pub fn is_identifier_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => chars.all(is_identifier_char),
        _ => false,
    }
}

/// Splits the leading identifier from the text, e.g. `"FOO(a) a"` yields `("FOO", "(a) a")`.
pub fn split_identifier(text: &str) -> (&str, &str) {
    let end = text
        .char_indices()
        .find(|(index, c)| {
            if *index == 0 {
                !is_identifier_start(*c)
            } else {
                !is_identifier_char(*c)
            }
        })
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    text.split_at(end)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::token::{
        is_new_token, is_reserved_identifier, is_valid_identifier, split_identifier,
    };

    #[test]
    fn test_is_new_token() {
        // whitespace
        assert!(is_new_token('a', ' '));
        assert!(is_new_token(' ', '\t'));
        assert!(!is_new_token(' ', 'a'));

        // identifiers and numbers
        assert!(!is_new_token('a', 'b'));
        assert!(!is_new_token('1', 'f'));

        // single-character punctuators
        assert!(is_new_token('a', ';'));
        assert!(is_new_token(';', 'a'));
        assert!(is_new_token('.', '5'));
        assert!(is_new_token('a', '"'));

        // two-character punctuators
        assert!(!is_new_token('=', '='));
        assert!(!is_new_token('<', '<'));
        assert!(!is_new_token('-', '>'));
        assert!(!is_new_token('#', '#'));
        assert!(is_new_token('=', '!'));

        // the stringizing operator sticks to the identifier
        assert!(!is_new_token('#', 'x'));

        // parentheses are not punctuators of the token accumulator
        assert!(!is_new_token('f', '('));
        assert!(is_new_token('<', '('));
    }

    #[test]
    fn test_reserved_identifiers() {
        assert!(is_reserved_identifier("if"));
        assert!(is_reserved_identifier("and"));
        assert!(is_reserved_identifier("__LINE__"));
        assert!(is_reserved_identifier("__IF_SCOPE__"));
        assert!(!is_reserved_identifier("main"));
        assert!(!is_reserved_identifier("vec3"));
    }

    #[test]
    fn test_identifiers() {
        assert!(is_valid_identifier("foo"));
        assert!(is_valid_identifier("_foo123"));
        assert!(is_valid_identifier("变量"));
        assert!(!is_valid_identifier("1foo"));
        assert!(!is_valid_identifier("foo-bar"));
        assert!(!is_valid_identifier(""));

        assert_eq!(split_identifier("FOO(a) a"), ("FOO", "(a) a"));
        assert_eq!(split_identifier("BAR 1"), ("BAR", " 1"));
        assert_eq!(split_identifier("BAZ"), ("BAZ", ""));
        assert_eq!(split_identifier("(x)"), ("", "(x)"));
        assert_eq!(split_identifier("1abc"), ("", "1abc"));
    }
}
