// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::{borrow::Cow, collections::HashMap};

use unicode_normalization::UnicodeNormalization;

use crate::{
    PreprocessError,
    invocation::find_closing_parenthesis,
    location::Location,
    token::{is_valid_identifier, split_identifier},
};

/// A macro definition.
///
/// `parameter_string` is the raw parameter list including the parentheses,
/// e.g. `"(a, b)"`. It is empty for object-like macros, so `#define F() x`
/// (no parameters, but `"()"`) is still function-like.
#[derive(Debug, PartialEq, Clone)]
pub struct Macro {
    pub name: String,
    pub definition: String,
    pub parameters: Vec<String>,
    pub parameter_string: String,
}

impl Macro {
    pub fn new_object_like(name: &str, definition: &str) -> Self {
        Self {
            name: name.to_owned(),
            definition: definition.to_owned(),
            parameters: vec![],
            parameter_string: String::new(),
        }
    }

    pub fn new_function_like(name: &str, parameters: &[&str], definition: &str) -> Self {
        Self {
            name: name.to_owned(),
            definition: definition.to_owned(),
            parameters: parameters.iter().map(|p| (*p).to_owned()).collect(),
            parameter_string: format!("({})", parameters.join(", ")),
        }
    }

    pub fn is_function_like(&self) -> bool {
        !self.parameter_string.is_empty()
    }
}

/// Parses the parameters of a `#define` directive, e.g. `"ADD(a, b) a+b"`.
///
/// A `(` immediately after the name (no whitespace) starts the parameter list
/// of a function-like macro.
pub fn parse_macro_definition(text: &str, location: &Location) -> Result<Macro, PreprocessError> {
    let (name, rest) = split_identifier(text.trim());

    if name.is_empty() {
        return Err(PreprocessError::Message(
            format!("Invalid macro name in '#define {}'.", text.trim()),
            location.clone(),
        ));
    }

    if !rest.starts_with('(') {
        return Ok(Macro::new_object_like(name, rest.trim()));
    }

    let Some(close) = find_closing_parenthesis(rest) else {
        return Err(PreprocessError::Message(
            format!("Unbalanced parentheses in the parameter list of macro '{}'.", name),
            location.clone(),
        ));
    };

    let parameter_string = &rest[..=close];
    let inner = &parameter_string[1..parameter_string.len() - 1];

    let mut parameters: Vec<String> = vec![];
    if !inner.trim().is_empty() {
        for parameter in inner.split(',').map(str::trim) {
            if parameter == "..." {
                return Err(PreprocessError::Message(
                    format!("Variadic macro '{}' is not supported.", name),
                    location.clone(),
                ));
            }

            if !is_valid_identifier(parameter) {
                return Err(PreprocessError::Message(
                    format!("Invalid parameter name '{}' of macro '{}'.", parameter, name),
                    location.clone(),
                ));
            }

            if parameters.iter().any(|p| p == parameter) {
                return Err(PreprocessError::Message(
                    format!("Duplicate parameter '{}' of macro '{}'.", parameter, name),
                    location.clone(),
                ));
            }

            parameters.push(parameter.to_owned());
        }
    }

    Ok(Macro {
        name: name.to_owned(),
        definition: rest[close + 1..].trim().to_owned(),
        parameters,
        parameter_string: parameter_string.to_owned(),
    })
}

/// The macro table of a preprocessor.
///
/// Names are normalized to NFC before being stored or looked up.
#[derive(Debug, Clone, Default)]
pub struct MacroMap {
    macros: HashMap<String, Macro>,
}

fn normalize(name: &str) -> Cow<'_, str> {
    if name.is_ascii() {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(name.nfc().collect())
    }
}

impl MacroMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a macro, returns the replaced one.
    pub fn insert(&mut self, mut item: Macro) -> Option<Macro> {
        let name = normalize(&item.name).into_owned();
        item.name.clone_from(&name);
        self.macros.insert(name, item)
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(normalize(name).as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(normalize(name).as_ref())
    }

    pub fn remove(&mut self, name: &str) -> Option<Macro> {
        self.macros.remove(normalize(name).as_ref())
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        PreprocessError,
        location::Location,
        macro_map::{Macro, MacroMap, parse_macro_definition},
    };

    fn parse(text: &str) -> Result<Macro, PreprocessError> {
        parse_macro_definition(text, &Location::new(1, "test.glsl"))
    }

    #[test]
    fn test_parse_object_like() {
        assert_eq!(parse("FOO 42").unwrap(), Macro::new_object_like("FOO", "42"));
        assert_eq!(parse("EMPTY").unwrap(), Macro::new_object_like("EMPTY", ""));
        assert_eq!(
            parse("PI  3.14159 ").unwrap(),
            Macro::new_object_like("PI", "3.14159")
        );

        // a space before '(' makes it part of the definition
        let item = parse("GROUP (a)").unwrap();
        assert!(!item.is_function_like());
        assert_eq!(item.definition, "(a)");
    }

    #[test]
    fn test_parse_function_like() {
        let item = parse("ADD(a, b) a+b").unwrap();
        assert!(item.is_function_like());
        assert_eq!(item.name, "ADD");
        assert_eq!(item.parameters, vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(item.parameter_string, "(a, b)");
        assert_eq!(item.definition, "a+b");

        let item = parse("ONE() 1").unwrap();
        assert!(item.is_function_like());
        assert!(item.parameters.is_empty());
        assert_eq!(item.definition, "1");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse(""), Err(PreprocessError::Message(..))));
        assert!(matches!(parse("1ABC 1"), Err(PreprocessError::Message(..))));
        assert!(matches!(
            parse("F(a, b a+b"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            parse("F(a, a) a"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            parse("F(a, ...) a"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            parse("F(a, 1) a"),
            Err(PreprocessError::Message(..))
        ));
    }

    #[test]
    fn test_macro_map() {
        let mut macro_map = MacroMap::new();
        assert!(macro_map.is_empty());

        macro_map.insert(Macro::new_object_like("MAX_LIGHTS", "8"));
        macro_map.insert(Macro::new_object_like("USE_SHADOW", ""));

        assert_eq!(macro_map.len(), 2);
        assert_eq!(macro_map.get("MAX_LIGHTS").unwrap().definition, "8");
        assert!(macro_map.contains("USE_SHADOW"));

        // redefine
        let replaced = macro_map.insert(Macro::new_object_like("MAX_LIGHTS", "16"));
        assert_eq!(replaced.unwrap().definition, "8");
        assert_eq!(macro_map.get("MAX_LIGHTS").unwrap().definition, "16");

        assert!(macro_map.remove("USE_SHADOW").is_some());
        assert!(macro_map.remove("USE_SHADOW").is_none());
        assert_eq!(macro_map.len(), 1);
    }

    #[test]
    fn test_normalized_names() {
        let mut macro_map = MacroMap::new();

        // "e" + U+0301 (combining acute accent)
        macro_map.insert(Macro::new_object_like("caf\u{65}\u{301}", "1"));

        // U+00E9 (precomposed)
        assert!(macro_map.contains("caf\u{e9}"));
        assert_eq!(macro_map.get("caf\u{e9}").unwrap().name, "caf\u{e9}");
    }
}
