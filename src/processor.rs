// Copyright (c) 2026 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::{collections::HashMap, path::Path};

use chrono::Local;

use crate::{
    error::PreprocessError,
    expression::evaluate,
    include::Include,
    include_directory::IncludeDirectory,
    invocation::{Call, Invocation, stringify},
    lexer::{Lexeme, lex_from_str},
    location::Location,
    macro_map::{Macro, MacroMap, parse_macro_definition},
    predefined::{STANDARD_MACROS, format_date, format_time, os_macros},
    prompt::{Prompt, PromptLevel},
    token::{is_identifier_char, is_identifier_start, is_reserved_identifier, is_valid_identifier},
};

pub const DEFAULT_FILE_NAME: &str = "Unknown file";

/// The maximum nesting depth of `#include` directives.
pub const MAX_INCLUDE_LEVEL: usize = 200;

/// The maximum line number accepted by `#line`.
pub const MAX_LINE_NUMBER: usize = 2147483647;

const MARKER: &str = "__SHADEPP__";
const INCLUDE_LEVEL: &str = "__INCLUDE_LEVEL__";
const IF_SCOPE: &str = "__IF_SCOPE__";
const CURRENT_IF_SCOPE: &str = "__CURRENT_IF_SCOPE__";
const LINE: &str = "__LINE__";
const FILE: &str = "__FILE__";

/// Preprocesses shader text with C-style directives and macros.
///
/// e.g.
///
/// ```rust
/// use shadepp::{IncludeString, Preprocessor};
///
/// let lib = IncludeString::new("#define X 9", "lib");
/// let mut preprocessor = Preprocessor::new("#include <lib>\nX");
/// preprocessor.add_include(&lib);
/// assert_eq!(preprocessor.preprocess().unwrap(), "\n\n9");
/// ```
///
/// Include providers are borrowed, so they must outlive the preprocessor.
pub struct Preprocessor<'a> {
    input: String,
    file_name: String,

    // starts from 1, see `advance_line()`
    line: usize,

    macro_map: MacroMap,
    includes: Vec<&'a dyn Include>,
    prompts: Vec<Prompt>,
}

/// The state of the conditional directives of one preprocessing run.
struct ConditionalState {
    output_enabled: bool,
    branches: Vec<Branch>,
}

/// One level of `#if ... #endif`.
struct Branch {
    // whether one of the branches of the chain has been emitted
    taken: bool,
    has_else: bool,
}

/// The context of a macro expansion.
#[derive(Default)]
struct Scope {
    // the expanded arguments bound to the parameters of a function-like macro
    bindings: HashMap<String, String>,

    // the names of the macros being expanded, which must not be expanded again
    expanding: Vec<String>,
}

impl Scope {
    fn enter(&self, name: &str, bindings: HashMap<String, String>) -> Self {
        let mut expanding = self.expanding.clone();
        expanding.push(name.to_owned());
        Self {
            bindings,
            expanding,
        }
    }

    fn without_bindings(&self) -> Self {
        Self {
            bindings: HashMap::new(),
            expanding: self.expanding.clone(),
        }
    }

    fn is_expanding(&self, name: &str) -> bool {
        self.expanding.iter().any(|item| item == name)
    }
}

impl<'a> Preprocessor<'a> {
    pub fn new(input: &str) -> Self {
        Self::with_file_name(input, DEFAULT_FILE_NAME)
    }

    pub fn with_file_name(input: &str, file_name: &str) -> Self {
        let mut preprocessor = Self {
            input: input.to_owned(),
            file_name: file_name.to_owned(),
            line: 1,
            macro_map: MacroMap::new(),
            includes: vec![],
            prompts: vec![],
        };

        preprocessor.set_macro(MARKER, "1");
        preprocessor.set_counter(INCLUDE_LEVEL, 0);
        preprocessor.set_counter(IF_SCOPE, 0);
        preprocessor.set_counter(CURRENT_IF_SCOPE, 0);
        preprocessor.publish_position();
        preprocessor
    }

    /// Creates a preprocessor for another input which inherits the macros,
    /// include providers, file name and line number of `parent`.
    pub fn from_parent(input: &str, parent: &Preprocessor<'a>) -> Self {
        Self {
            input: input.to_owned(),
            file_name: parent.file_name.clone(),
            line: parent.line,
            macro_map: parent.macro_map.clone(),
            includes: parent.includes.clone(),
            prompts: vec![],
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Registers an include provider. `#include <name>` tries the providers
    /// in the order of registration.
    pub fn add_include(&mut self, include: &'a dyn Include) {
        self.includes.push(include);
    }

    pub fn includes(&self) -> &[&'a dyn Include] {
        &self.includes
    }

    pub fn set_includes(&mut self, includes: Vec<&'a dyn Include>) {
        self.includes = includes;
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, file_name: &str) {
        self.file_name = file_name.to_owned();
        self.publish_position();
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn set_line(&mut self, line: usize) {
        self.line = line;
        self.publish_position();
    }

    pub fn location(&self) -> Location {
        Location::new(self.line, &self.file_name)
    }

    /// The non-fatal diagnostics raised so far, e.g. by `#warning`.
    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    /// Defines or redefines a macro.
    ///
    /// Redefining a macro with a different body raises a warning prompt.
    pub fn define_macro(&mut self, item: Macro) -> Result<(), PreprocessError> {
        if !is_valid_identifier(&item.name) {
            return Err(PreprocessError::Message(
                format!("Invalid macro name '{}'.", item.name),
                self.location(),
            ));
        }

        if is_reserved_identifier(&item.name) {
            return Err(PreprocessError::Message(
                format!(
                    "The identifier '{}' is reserved and cannot be used as a macro name.",
                    item.name
                ),
                self.location(),
            ));
        }

        if let Some(existing) = self.macro_map.get(&item.name) {
            if existing.definition != item.definition || existing.parameters != item.parameters {
                let prompt = Prompt::new(
                    PromptLevel::Warning,
                    &format!("Macro '{}' redefined.", item.name),
                    self.location(),
                );
                prompt.log();
                self.prompts.push(prompt);
            }
        }

        log::debug!("{}: define macro '{}'", self.location(), item.name);
        self.macro_map.insert(item);
        Ok(())
    }

    /// Removes a macro. Removing a macro which does not exist is not an error.
    pub fn undefine_macro(&mut self, name: &str) -> Result<(), PreprocessError> {
        if is_reserved_identifier(name) {
            return Err(PreprocessError::Message(
                format!(
                    "The identifier '{}' is reserved and cannot be undefined.",
                    name
                ),
                self.location(),
            ));
        }

        if self.macro_map.remove(name).is_some() {
            log::debug!("{}: undefine macro '{}'", self.location(), name);
        }
        Ok(())
    }

    pub fn is_macro_defined(&self, name: &str) -> bool {
        self.macro_map.contains(name)
    }

    /// The number of macros, including the bookkeeping macros
    /// such as `__LINE__` and `__FILE__`.
    pub fn macro_count(&self) -> usize {
        self.macro_map.len()
    }

    pub fn get_macro(&self, name: &str) -> Result<&Macro, PreprocessError> {
        self.macro_map.get(name).ok_or_else(|| {
            PreprocessError::Message(format!("Macro '{}' is not defined.", name), self.location())
        })
    }

    /// Defines `__DATE__`, `__TIME__`, `__BASE_FILE__`, `__STDC__` and the
    /// other standard macros.
    pub fn define_standard_macros(&mut self) {
        let now = Local::now();
        self.set_macro("__DATE__", &format_date(&now));
        self.set_macro("__TIME__", &format_time(&now));
        let base_file = stringify(&self.file_name);
        self.set_macro("__BASE_FILE__", &base_file);

        for (name, value) in STANDARD_MACROS {
            self.set_macro(name, value);
        }
    }

    /// Defines the identification macros of the target OS, e.g. `__linux__`.
    pub fn define_os_macros(&mut self) {
        for (name, value) in os_macros(std::env::consts::OS) {
            self.set_macro(name, value);
        }
    }

    /// Defines object-like macros from name-value pairs,
    /// e.g. `{"MAX_LIGHTS": "8"}`.
    pub fn define_predefinitions(
        &mut self,
        predefinitions: &HashMap<String, String>,
    ) -> Result<(), PreprocessError> {
        for (name, value) in predefinitions {
            self.define_macro(Macro::new_object_like(name, value))?;
        }
        Ok(())
    }

    /// Preprocesses the input and returns the text.
    pub fn preprocess(&mut self) -> Result<String, PreprocessError> {
        Ok(self.preprocess_tokens()?.concat())
    }

    /// Preprocesses the input and returns the output tokens,
    /// the concatenation of which is the output text.
    pub fn preprocess_tokens(&mut self) -> Result<Vec<String>, PreprocessError> {
        let mut tokens = vec![];
        let mut state = ConditionalState {
            output_enabled: true,
            branches: vec![],
        };
        let scope = Scope::default();

        for lexeme in lex_from_str(&self.input, true) {
            match lexeme {
                Lexeme::Token(token) => {
                    if state.output_enabled {
                        let expanded = self.expand_token(&token, &scope)?;
                        if !expanded.is_empty() {
                            tokens.push(expanded);
                        }
                    }
                }
                Lexeme::Literal(literal) => {
                    if state.output_enabled {
                        tokens.push(literal);
                    }
                }
                Lexeme::Directive {
                    command,
                    parameters,
                } => {
                    let output = self.execute_directive(&command, &parameters, &mut state)?;
                    tokens.extend(output);
                }
                Lexeme::NewLine { synthetic } => {
                    if !synthetic {
                        if state.output_enabled {
                            tokens.push("\n".to_owned());
                        }
                        self.advance_line();
                    }
                }
                Lexeme::LineAdvance => self.advance_line(),
                Lexeme::UnterminatedComment => {
                    return Err(PreprocessError::UnexpectedEndOfDocument(
                        "Unterminated block comment.".to_owned(),
                        self.location(),
                    ));
                }
            }
        }

        if !state.branches.is_empty() {
            return Err(PreprocessError::UnexpectedEndOfDocument(
                "Unterminated conditional directive, expect '#endif'.".to_owned(),
                self.location(),
            ));
        }

        Ok(tokens)
    }
}

// Bookkeeping macros
impl Preprocessor<'_> {
    // Inserts a macro without checking the reserved identifiers.
    fn set_macro(&mut self, name: &str, definition: &str) {
        self.macro_map
            .insert(Macro::new_object_like(name, definition));
    }

    fn counter(&self, name: &str) -> usize {
        self.macro_map
            .get(name)
            .and_then(|item| item.definition.parse().ok())
            .unwrap_or(0)
    }

    fn set_counter(&mut self, name: &str, value: usize) {
        self.set_macro(name, &value.to_string());
    }

    // Updates `__LINE__` and `__FILE__`.
    fn publish_position(&mut self) {
        self.set_counter(LINE, self.line);
        let file_name = stringify(&self.file_name);
        self.set_macro(FILE, &file_name);
    }

    fn advance_line(&mut self) {
        self.line = self.line.saturating_add(1);
        self.set_counter(LINE, self.line);
    }
}

// Directives
impl Preprocessor<'_> {
    /// Executes a directive and returns the tokens it outputs.
    fn execute_directive(
        &mut self,
        command: &str,
        parameters: &str,
        state: &mut ConditionalState,
    ) -> Result<Vec<String>, PreprocessError> {
        match command {
            "if" => {
                let passed = state.output_enabled && self.evaluate_condition(command, parameters)?;
                self.open_conditional(passed, state);
            }
            "ifdef" | "ifndef" => {
                let passed = if state.output_enabled {
                    let name = self.expect_macro_name(command, parameters)?;
                    self.is_macro_defined(name) == (command == "ifdef")
                } else {
                    false
                };
                self.open_conditional(passed, state);
            }
            "elif" => self.execute_elif(parameters, state)?,
            "else" => self.execute_else(state)?,
            "endif" => self.execute_endif(state)?,

            // only the conditional directives are executed within a suppressed branch
            _ if !state.output_enabled => {}

            "define" => {
                let item = parse_macro_definition(parameters, &self.location())?;
                self.define_macro(item)?;
            }
            "undef" => {
                let name = self.expect_macro_name(command, parameters)?;
                self.undefine_macro(name)?;
            }
            "include" => return self.include(parameters),
            "error" => {
                return Err(PreprocessError::UserDefined(
                    parameters.to_owned(),
                    self.location(),
                ));
            }
            "warning" => {
                let prompt = Prompt::new(PromptLevel::Warning, parameters, self.location());
                prompt.log();
                self.prompts.push(prompt);
            }
            "line" => self.execute_line(parameters)?,
            "version" | "extension" | "pragma" => {
                // passed through to the shader compiler
                let line = if parameters.is_empty() {
                    format!("#{}", command)
                } else {
                    format!("#{} {}", command, parameters)
                };
                return Ok(vec![line]);
            }
            "" if parameters.is_empty() => {
                // null directive
            }
            "" => {
                return Err(PreprocessError::Message(
                    format!("Invalid directive '#{}'.", parameters),
                    self.location(),
                ));
            }
            _ => {
                return Err(PreprocessError::Message(
                    format!("Unknown directive '{}'.", command),
                    self.location(),
                ));
            }
        }

        Ok(vec![])
    }

    fn expect_macro_name<'p>(
        &self,
        command: &str,
        parameters: &'p str,
    ) -> Result<&'p str, PreprocessError> {
        let name = parameters.split_whitespace().next().unwrap_or_default();
        if is_valid_identifier(name) {
            Ok(name)
        } else {
            Err(PreprocessError::Message(
                format!("Expect a macro name after '#{}'.", command),
                self.location(),
            ))
        }
    }

    fn open_conditional(&mut self, passed: bool, state: &mut ConditionalState) {
        let depth = self.counter(IF_SCOPE) + 1;
        self.set_counter(IF_SCOPE, depth);

        if !passed && self.counter(CURRENT_IF_SCOPE) == 0 {
            state.output_enabled = false;
            self.set_counter(CURRENT_IF_SCOPE, depth);
        }

        state.branches.push(Branch {
            taken: passed,
            has_else: false,
        });
    }

    fn execute_elif(
        &mut self,
        parameters: &str,
        state: &mut ConditionalState,
    ) -> Result<(), PreprocessError> {
        let taken = match state.branches.last() {
            None => {
                return Err(PreprocessError::Message(
                    "Unexpected '#elif' without '#if'.".to_owned(),
                    self.location(),
                ));
            }
            Some(branch) if branch.has_else => {
                return Err(PreprocessError::Message(
                    "Unexpected '#elif' after '#else'.".to_owned(),
                    self.location(),
                ));
            }
            Some(branch) => branch.taken,
        };

        let depth = self.counter(IF_SCOPE);
        let current = self.counter(CURRENT_IF_SCOPE);

        if current == 0 {
            // the previous branch was emitted
            state.output_enabled = false;
            self.set_counter(CURRENT_IF_SCOPE, depth);
        } else if current == depth && !taken && self.evaluate_condition("elif", parameters)? {
            state.output_enabled = true;
            self.set_counter(CURRENT_IF_SCOPE, 0);
            if let Some(branch) = state.branches.last_mut() {
                branch.taken = true;
            }
        }

        Ok(())
    }

    fn execute_else(&mut self, state: &mut ConditionalState) -> Result<(), PreprocessError> {
        let taken = match state.branches.last_mut() {
            None => {
                return Err(PreprocessError::Message(
                    "Unexpected '#else' without '#if'.".to_owned(),
                    self.location(),
                ));
            }
            Some(branch) if branch.has_else => {
                return Err(PreprocessError::Message(
                    "Unexpected '#else' after '#else'.".to_owned(),
                    self.location(),
                ));
            }
            Some(branch) => {
                branch.has_else = true;
                let taken = branch.taken;
                branch.taken = true;
                taken
            }
        };

        let depth = self.counter(IF_SCOPE);
        let current = self.counter(CURRENT_IF_SCOPE);

        if current == 0 {
            state.output_enabled = false;
            self.set_counter(CURRENT_IF_SCOPE, depth);
        } else if current == depth && !taken {
            state.output_enabled = true;
            self.set_counter(CURRENT_IF_SCOPE, 0);
        }

        Ok(())
    }

    fn execute_endif(&mut self, state: &mut ConditionalState) -> Result<(), PreprocessError> {
        if state.branches.pop().is_none() {
            return Err(PreprocessError::Message(
                "Unexpected '#endif' without '#if'.".to_owned(),
                self.location(),
            ));
        }

        let depth = self.counter(IF_SCOPE);
        if self.counter(CURRENT_IF_SCOPE) == depth {
            state.output_enabled = true;
            self.set_counter(CURRENT_IF_SCOPE, 0);
        }
        self.set_counter(IF_SCOPE, depth.saturating_sub(1));

        Ok(())
    }

    fn evaluate_condition(&self, command: &str, parameters: &str) -> Result<bool, PreprocessError> {
        if parameters.trim().is_empty() {
            return Err(PreprocessError::Message(
                format!("Expect an expression after '#{}'.", command),
                self.location(),
            ));
        }

        let resolved = self.resolve_defined(parameters)?;
        let expanded = self.expand_text(&resolved, &Scope::default())?;
        Ok(evaluate(&expanded, &self.location())? != 0)
    }

    /// Replaces `defined NAME` and `defined(NAME)` with `1` or `0`.
    ///
    /// It runs before the macro expansion, so the name is not expanded.
    fn resolve_defined(&self, text: &str) -> Result<String, PreprocessError> {
        let chars: Vec<char> = text.chars().collect();
        let skip_whitespace = |mut index: usize| {
            while chars.get(index).is_some_and(|c| c.is_whitespace()) {
                index += 1;
            }
            index
        };
        let scan_word = |mut index: usize| {
            while chars.get(index).is_some_and(|c| is_identifier_char(*c)) {
                index += 1;
            }
            index
        };

        let mut output = String::with_capacity(text.len());
        let mut index = 0;

        while let Some(&c) = chars.get(index) {
            // numbers are scanned as words too, so `1defined` is left alone
            if !(is_identifier_start(c) || c.is_ascii_digit()) {
                output.push(c);
                index += 1;
                continue;
            }

            let end = scan_word(index);
            let word: String = chars[index..end].iter().collect();
            index = end;

            if word != "defined" {
                output.push_str(&word);
                continue;
            }

            index = skip_whitespace(index);
            let parenthesized = chars.get(index) == Some(&'(');
            if parenthesized {
                index = skip_whitespace(index + 1);
            }

            let end = scan_word(index);
            let name: String = chars[index..end].iter().collect();
            index = end;

            if parenthesized {
                index = skip_whitespace(index);
                if chars.get(index) != Some(&')') {
                    return Err(PreprocessError::Message(
                        "Expect ')' after the macro name of 'defined'.".to_owned(),
                        self.location(),
                    ));
                }
                index += 1;
            }

            if !is_valid_identifier(&name) {
                return Err(PreprocessError::Message(
                    "Expect a macro name after 'defined'.".to_owned(),
                    self.location(),
                ));
            }

            output.push(if self.is_macro_defined(&name) { '1' } else { '0' });
        }

        Ok(output)
    }

    fn execute_line(&mut self, parameters: &str) -> Result<(), PreprocessError> {
        let mut parts = parameters.trim().splitn(2, char::is_whitespace);

        let Some(line) = parts.next().and_then(|text| text.parse::<usize>().ok()) else {
            return Err(PreprocessError::Message(
                format!("Expect a line number after '#line', found '{}'.", parameters),
                self.location(),
            ));
        };

        if line > MAX_LINE_NUMBER {
            return Err(PreprocessError::Message(
                format!(
                    "The line number {} of '#line' is out of range, the maximum is {}.",
                    line, MAX_LINE_NUMBER
                ),
                self.location(),
            ));
        }

        self.line = line;

        if let Some(file_name) = parts.next().map(str::trim).filter(|text| !text.is_empty()) {
            let file_name = file_name
                .strip_prefix('"')
                .and_then(|text| text.strip_suffix('"'))
                .unwrap_or(file_name);
            self.file_name = file_name.to_owned();
        }

        self.publish_position();
        Ok(())
    }

    fn include(&mut self, parameters: &str) -> Result<Vec<String>, PreprocessError> {
        let operand = if parameters.starts_with('<') || parameters.starts_with('"') {
            parameters.to_owned()
        } else {
            // computed include, e.g. `#include SHADER_HEADER`
            self.expand_text(parameters, &Scope::default())?
                .trim()
                .to_owned()
        };

        let content = if let Some(name) = operand
            .strip_prefix('<')
            .and_then(|text| text.strip_suffix('>'))
        {
            let Some(include) = self.includes.iter().find(|include| include.has_file(name)) else {
                return Err(PreprocessError::Message(
                    format!("Cannot find the include file <{}>.", name),
                    self.location(),
                ));
            };
            self.load_include(*include, name)?
        } else if let Some(name) = operand
            .strip_prefix('"')
            .and_then(|text| text.strip_suffix('"'))
        {
            // relative to the directory of the current file
            let directory = Path::new(&self.file_name)
                .parent()
                .unwrap_or(Path::new(""));
            let include = IncludeDirectory::new(directory);
            if !include.has_file(name) {
                return Err(PreprocessError::Message(
                    format!(
                        "Cannot find the include file \"{}\" in the directory '{}'.",
                        name,
                        include.directory().display()
                    ),
                    self.location(),
                ));
            }
            self.load_include(&include, name)?
        } else {
            return Err(PreprocessError::Message(
                format!(
                    "Expect <name> or \"name\" after '#include', found '{}'.",
                    operand
                ),
                self.location(),
            ));
        };

        let level = self.counter(INCLUDE_LEVEL) + 1;
        if level > MAX_INCLUDE_LEVEL {
            return Err(PreprocessError::Message(
                format!(
                    "Include nested too deeply, the maximum level is {}.",
                    MAX_INCLUDE_LEVEL
                ),
                self.location(),
            ));
        }

        log::debug!("{}: include {} (level {})", self.location(), operand, level);

        let mut child = Preprocessor::from_parent(&content, self);
        child.set_counter(INCLUDE_LEVEL, level);
        let child_tokens = child.preprocess_tokens()?;

        // the macros defined by the included file stay visible
        self.macro_map = child.macro_map;
        self.prompts.append(&mut child.prompts);
        self.set_counter(INCLUDE_LEVEL, level - 1);
        self.publish_position();

        let mut tokens = vec!["\n".to_owned()];
        tokens.extend(child_tokens);
        Ok(tokens)
    }

    fn load_include(&self, include: &dyn Include, name: &str) -> Result<String, PreprocessError> {
        include.get_file(name).map_err(|error| {
            PreprocessError::Message(
                format!("Failed to load the include file '{}': {}", name, error),
                self.location(),
            )
        })
    }
}

// Macro expansion
impl Preprocessor<'_> {
    /// Expands the macros of a text, e.g. a macro body or an argument.
    /// Directives are not recognized.
    fn expand_text(&self, text: &str, scope: &Scope) -> Result<String, PreprocessError> {
        let mut output = String::with_capacity(text.len());

        for lexeme in lex_from_str(text, false) {
            match lexeme {
                Lexeme::Token(token) => output.push_str(&self.expand_token(&token, scope)?),
                Lexeme::Literal(literal) => output.push_str(&literal),
                Lexeme::NewLine { synthetic: false } => output.push('\n'),
                Lexeme::UnterminatedComment => {
                    return Err(PreprocessError::UnexpectedEndOfDocument(
                        "Unterminated block comment in macro expansion.".to_owned(),
                        self.location(),
                    ));
                }
                Lexeme::NewLine { synthetic: true }
                | Lexeme::LineAdvance
                | Lexeme::Directive { .. } => {}
            }
        }

        Ok(output)
    }

    fn expand_token(&self, token: &str, scope: &Scope) -> Result<String, PreprocessError> {
        let invocation = Invocation::parse(token);

        match self.expand_invocation(&invocation, scope)? {
            Some(replacement) => Ok(format!(
                "{}{}{}",
                invocation.leading, replacement, invocation.rest
            )),
            None => Ok(token.to_owned()),
        }
    }

    /// Returns the replacement of the name and the call of the invocation,
    /// or `None` if the token is kept unchanged.
    fn expand_invocation(
        &self,
        invocation: &Invocation,
        scope: &Scope,
    ) -> Result<Option<String>, PreprocessError> {
        let name = invocation.name;

        if invocation.stringify {
            // only parameters and macros are stringified, the call (if any) is dropped
            let text = match scope.bindings.get(name) {
                Some(value) => Some(value.clone()),
                None if self.macro_map.contains(name) && !scope.is_expanding(name) => {
                    Some(self.expand_text(name, scope)?)
                }
                None => None,
            };
            return Ok(text.map(|text| stringify(&text)));
        }

        if let Some(value) = scope.bindings.get(name) {
            return match &invocation.call {
                None => Ok(Some(value.clone())),
                Some(call) => {
                    // the argument names a function-like macro, e.g. `APPLY(f, x) f(x)`
                    let call_text = self.expand_call(call, scope)?;
                    self.expand_text(&format!("{}{}", value, call_text), &scope.without_bindings())
                        .map(Some)
                }
            };
        }

        let item = match self.macro_map.get(name) {
            Some(item) if !name.is_empty() && !scope.is_expanding(name) => item,
            _ => return self.expand_plain_call(invocation, scope),
        };

        if item.is_function_like() {
            let Some(call) = &invocation.call else {
                // a function-like macro name without arguments is not an invocation
                return Ok(None);
            };

            let bindings = self.bind_arguments(item, call, scope)?;
            return self
                .expand_text(&item.definition, &scope.enter(name, bindings))
                .map(Some);
        }

        // the definition is rescanned together with the call, so it can name
        // a function-like macro
        let mut replacement = item.definition.clone();
        if let Some(call) = &invocation.call {
            replacement.push_str(&self.expand_call(call, scope)?);
        }
        self.expand_text(&replacement, &scope.enter(name, HashMap::new()))
            .map(Some)
    }

    // A call of a function which is not a macro (or a parenthesis group),
    // only the arguments are expanded.
    fn expand_plain_call(
        &self,
        invocation: &Invocation,
        scope: &Scope,
    ) -> Result<Option<String>, PreprocessError> {
        match &invocation.call {
            Some(call) if !call.arguments.is_empty() => Ok(Some(format!(
                "{}{}",
                invocation.name,
                self.expand_call(call, scope)?
            ))),
            _ => Ok(None),
        }
    }

    fn expand_call(&self, call: &Call, scope: &Scope) -> Result<String, PreprocessError> {
        if call.arguments.is_empty() {
            return Ok(call.parameter_string.to_owned());
        }

        let arguments = call
            .arguments
            .iter()
            .map(|argument| self.expand_text(argument, scope))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("({})", arguments.join(",")))
    }

    fn bind_arguments(
        &self,
        item: &Macro,
        call: &Call,
        scope: &Scope,
    ) -> Result<HashMap<String, String>, PreprocessError> {
        let mut arguments = call.arguments.clone();

        // `F()` passes one empty argument to `F(x)`
        if item.parameters.len() == 1 && arguments.is_empty() {
            arguments.push("");
        }

        if arguments.len() != item.parameters.len() {
            return Err(PreprocessError::Message(
                format!(
                    "Macro '{}' expects {} argument(s), but {} were given.",
                    item.name,
                    item.parameters.len(),
                    arguments.len()
                ),
                self.location(),
            ));
        }

        let mut bindings = HashMap::with_capacity(arguments.len());
        for (parameter, argument) in item.parameters.iter().zip(arguments) {
            let value = self.expand_text(argument.trim(), scope)?;
            bindings.insert(parameter.clone(), value.trim().to_owned());
        }
        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use crate::{
        PreprocessError,
        include_string::IncludeString,
        macro_map::Macro,
        predefined::os_macros,
        processor::{MAX_INCLUDE_LEVEL, MAX_LINE_NUMBER, Preprocessor},
        prompt::PromptLevel,
    };

    fn process(text: &str) -> Result<String, PreprocessError> {
        Preprocessor::new(text).preprocess()
    }

    #[test]
    fn test_process_code_without_directive() {
        assert_eq!(
            process("void main() {\n    gl_Position = vec4(0.0);\n}").unwrap(),
            "void main() {\n    gl_Position = vec4(0.0);\n}"
        );
        assert_eq!(process("int foo = (10)").unwrap(), "int foo = (10)");
        assert_eq!(
            process("if(4\n&&5\n||(10\n||5)\n)").unwrap(),
            "if(4\n&&5\n||(10\n||5)\n)"
        );
        assert_eq!(process("").unwrap(), "");
    }

    #[test]
    fn test_process_define() {
        assert_eq!(process("#define macro 1\nmacro;").unwrap(), "\n1;");
        assert_eq!(process("#\t\tdefine macro 1\nmacro;").unwrap(), "\n1;");
        assert_eq!(
            process("#define FOO 42\nint x = FOO;").unwrap(),
            "\nint x = 42;"
        );

        // nested
        assert_eq!(
            process("#define PI 3.14\n#define TWO_PI (2.0 * PI)\nTWO_PI").unwrap(),
            "\n\n(2.0 * 3.14)"
        );

        // redefine
        let mut preprocessor = Preprocessor::new("#define A 1\n#define A 2\nA");
        assert_eq!(preprocessor.preprocess().unwrap(), "\n\n2");
        assert_eq!(preprocessor.prompts().len(), 1);
        assert_eq!(preprocessor.prompts()[0].level, PromptLevel::Warning);

        // redefine with the same body
        let mut preprocessor = Preprocessor::new("#define A 1\n#define A 1\nA");
        assert_eq!(preprocessor.preprocess().unwrap(), "\n\n1");
        assert!(preprocessor.prompts().is_empty());

        // err: reserved
        assert!(matches!(
            process("#define if 1"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            process("#define __LINE__ 1"),
            Err(PreprocessError::Message(..))
        ));

        // err: missing name
        assert!(matches!(
            process("#define"),
            Err(PreprocessError::Message(..))
        ));
    }

    #[test]
    fn test_process_undefine() {
        assert_eq!(process("#define A 1\n#undef A\nA").unwrap(), "\n\nA");
        assert_eq!(process("#undef NEVER_DEFINED\nok").unwrap(), "\nok");

        assert!(matches!(
            process("#undef __LINE__"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            process("#undef"),
            Err(PreprocessError::Message(..))
        ));
    }

    #[test]
    fn test_process_define_function() {
        assert_eq!(process("#define macro() 1\nmacro();").unwrap(), "\n1;");
        assert_eq!(process("#define macro(a) a+1\nmacro(1);").unwrap(), "\n1+1;");
        assert_eq!(
            process("#define macro(a,b) a<<(b)\nmacro(1,31);").unwrap(),
            "\n1<<(31);"
        );
        assert_eq!(
            process("#define macro(a) a+1\n#define macro2(a) macro(a)\nmacro2(1);").unwrap(),
            "\n\n1+1;"
        );

        // arguments are expanded before substitution
        assert_eq!(
            process("#define BAR 1\n#define ADD(a, b) a+b\nADD(BAR, 2)").unwrap(),
            "\n\n1+2"
        );

        // nested calls in arguments
        assert_eq!(
            process("#define SQ(x) ((x)*(x))\nSQ(SQ(2))").unwrap(),
            "\n((((2)*(2)))*(((2)*(2))))"
        );

        // parameters do not leak into other macros
        assert_eq!(
            process("#define G x\n#define F(x) x+G\nF(1)").unwrap(),
            "\n\n1+x"
        );

        // a function-like macro name without arguments is kept
        assert_eq!(
            process("#define F(x) x\nint F = 1;").unwrap(),
            "\nint F = 1;"
        );

        // an object-like macro naming a function-like macro
        assert_eq!(
            process("#define ADD(a, b) a+b\n#define PLUS ADD\nPLUS(1, 2)").unwrap(),
            "\n\n1+2"
        );

        // an argument naming a function-like macro
        assert_eq!(
            process("#define ONE(x) 1\n#define APPLY(f, v) f(v)\nAPPLY(ONE, 5)").unwrap(),
            "\n\n1"
        );

        // err: argument count
        assert!(matches!(
            process("#define ADD(a, b) a+b\nADD(1)"),
            Err(PreprocessError::Message(..))
        ));
    }

    #[test]
    fn test_process_recursive_macros() {
        assert_eq!(process("#define X X\nX").unwrap(), "\nX");
        assert_eq!(process("#define A B\n#define B A\nA B").unwrap(), "\n\nA B");
        assert_eq!(
            process("#define f(x) f(x+1)\nf(2)").unwrap(),
            "\nf(2+1)"
        );
    }

    #[test]
    fn test_process_stringizing() {
        assert_eq!(
            process("#define foo 1\n#define macro #foo\nmacro;").unwrap(),
            "\n\n\"1\";"
        );
        assert_eq!(
            process("#define STR(x) #x\nSTR(hello)").unwrap(),
            "\n\"hello\""
        );
        assert_eq!(
            process("#define STR(x) #x\nSTR( a + b )").unwrap(),
            "\n\"a + b\""
        );
        assert_eq!(
            process("#define STR(x) #x\nSTR(\"hi\")").unwrap(),
            "\n\"\\\"hi\\\"\""
        );

        // neither a parameter nor a macro
        assert_eq!(process("a #b").unwrap(), "a #b");
        assert_eq!(process("#define S #y\nS").unwrap(), "\n#y");
        assert_eq!(
            process("#define F(x) #x #z\nF(1)").unwrap(),
            "\n\"1\" #z"
        );

        // a macro being expanded is not stringified
        assert_eq!(process("#define R #R\nR").unwrap(), "\n#R");
    }

    #[test]
    fn test_process_comments_and_literals() {
        assert_eq!(
            process("Works!//this is a comment\nNext line!\n//another comment").unwrap(),
            "Works!\nNext line!\n"
        );
        assert_eq!(
            process("This/*This is a multiline comment\nWow!\n#error this doesn't work!\nNew line!\nIncredible!*/ works!").unwrap(),
            "This works!"
        );
        assert_eq!(
            process("#define macro 1\n\"This works! No macro expansion!\"").unwrap(),
            "\n\"This works! No macro expansion!\""
        );
        assert_eq!(
            process("//hi this is a second line \\\ncontinued comment\nHello!").unwrap(),
            "\nHello!"
        );

        assert!(matches!(
            process("a /* b"),
            Err(PreprocessError::UnexpectedEndOfDocument(..))
        ));
    }

    #[test]
    fn test_process_if() {
        assert_eq!(
            process("#define macro(a)\n#ifdef macro\nWorks!\n#endif\n#ifdef notAMacro\nDoesn't work!\n#endif").unwrap(),
            "\n\nWorks!\n\n"
        );
        assert_eq!(
            process("#ifndef macro\nWorks!\n#endif\n#define macro\n#ifndef macro\nDoesn't work!\n#endif").unwrap(),
            "\nWorks!\n\n\n"
        );
        assert_eq!(
            process("#ifdef macro\nDoesn't Work!\n#else\nWorks!\n#\tendif").unwrap(),
            "\nWorks!\n"
        );

        // expressions
        assert_eq!(
            process("#define LIGHTS 4\n#if LIGHTS > 2 && defined(LIGHTS)\nmany\n#endif").unwrap(),
            "\n\nmany\n"
        );
        assert_eq!(
            process("#if defined UNKNOWN || 0\nno\n#endif").unwrap(),
            ""
        );

        // elif chains
        let text = "#if V == 1\none\n#elif V == 2\ntwo\n#elif V >= 2\nmore\n#else\nother\n#endif";
        let mut preprocessor = Preprocessor::new(text);
        preprocessor
            .define_macro(Macro::new_object_like("V", "2"))
            .unwrap();
        assert_eq!(preprocessor.preprocess().unwrap(), "\ntwo\n");

        let mut preprocessor = Preprocessor::new(text);
        preprocessor
            .define_macro(Macro::new_object_like("V", "9"))
            .unwrap();
        assert_eq!(preprocessor.preprocess().unwrap(), "\nmore\n");

        let mut preprocessor = Preprocessor::new(text);
        assert_eq!(preprocessor.preprocess().unwrap(), "\nother\n");

        // nested
        assert_eq!(
            process("#define A\n#ifdef A\nyes1\n#ifdef B\nno\n#else\nyes2\n#endif\n#endif").unwrap(),
            "\n\nyes1\n\nyes2\n\n"
        );

        // suppressed branches are not evaluated
        assert_eq!(
            process("#if 0\n#if 1/0\n#endif\n#elif 1\nok\n#endif").unwrap(),
            "\nok\n"
        );

        // directives within suppressed branches are ignored
        assert_eq!(
            process("#if 0\n#error no\n#unknown\n#endif\nok").unwrap(),
            "\nok"
        );
    }

    #[test]
    fn test_process_if_errors() {
        assert!(matches!(
            process("#endif"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            process("#else\n#endif"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            process("#if 1\n#else\n#else\n#endif"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            process("#if 1\n#else\n#elif 1\n#endif"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            process("#if\n#endif"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            process("#if defined()\n#endif"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            process("#ifdef A\n"),
            Err(PreprocessError::UnexpectedEndOfDocument(..))
        ));
    }

    #[test]
    fn test_process_line() {
        let mut preprocessor = Preprocessor::new("#line 5 testing\nthis is a line of code\n");
        assert_eq!(
            preprocessor.preprocess().unwrap(),
            "\nthis is a line of code\n"
        );
        assert_eq!(preprocessor.line(), 7);
        assert_eq!(preprocessor.file_name(), "testing");

        assert_eq!(
            process("#line 10 \"shader.frag\"\n__LINE__ __FILE__").unwrap(),
            "\n11 \"shader.frag\""
        );
        assert_eq!(process("a\nb __LINE__").unwrap(), "a\nb 2");

        assert!(matches!(
            process("#line x"),
            Err(PreprocessError::Message(..))
        ));

        // out of range
        assert!(matches!(
            process("#line 18446744073709551615\nx"),
            Err(PreprocessError::Message(..))
        ));
        assert!(matches!(
            process(&format!("#line {}", MAX_LINE_NUMBER + 1)),
            Err(PreprocessError::Message(..))
        ));
        assert_eq!(
            process(&format!("#line {}\n__LINE__", MAX_LINE_NUMBER)).unwrap(),
            format!("\n{}", MAX_LINE_NUMBER + 1)
        );

        let mut preprocessor = Preprocessor::new("a\nb");
        preprocessor.set_line(usize::MAX);
        assert_eq!(preprocessor.preprocess().unwrap(), "a\nb");
        assert_eq!(preprocessor.line(), usize::MAX);
    }

    #[test]
    fn test_process_include() {
        let include = IncludeString::new("test", "test.h");
        let mut preprocessor = Preprocessor::new("#include <test.h>");
        preprocessor.add_include(&include);
        assert_eq!(preprocessor.preprocess().unwrap(), "\ntest");

        // macros defined by the included file
        let include = IncludeString::new("#define X 9", "lib");
        let mut preprocessor = Preprocessor::new("#include <lib>\nX");
        preprocessor.add_include(&include);
        assert_eq!(preprocessor.preprocess().unwrap(), "\n\n9");
        assert!(preprocessor.is_macro_defined("X"));

        // computed include
        let include = IncludeString::new("ok", "lib");
        let mut preprocessor = Preprocessor::new("#define LIB <lib>\n#include LIB");
        preprocessor.add_include(&include);
        assert_eq!(preprocessor.preprocess().unwrap(), "\n\nok");

        // err: not found
        let mut preprocessor = Preprocessor::new("#include <none>");
        preprocessor.add_include(&include);
        assert!(matches!(
            preprocessor.preprocess(),
            Err(PreprocessError::Message(..))
        ));

    }

    #[test]
    fn test_process_include_self() {
        let include = IncludeString::new("#include <loop>", "loop");
        let mut preprocessor = Preprocessor::new("#include <loop>");
        preprocessor.add_include(&include);
        let result = preprocessor.preprocess();

        assert!(matches!(result, Err(PreprocessError::Message(..))));
        assert!(
            result
                .unwrap_err()
                .message()
                .contains(&MAX_INCLUDE_LEVEL.to_string())
        );
    }

    #[test]
    fn test_process_error_and_warning() {
        let result = process("\n#error This is an error!");
        assert_eq!(
            result,
            Err(PreprocessError::UserDefined(
                "This is an error!".to_owned(),
                crate::location::Location::new(2, "Unknown file")
            ))
        );

        let mut preprocessor = Preprocessor::new("#warning careful\nok");
        assert_eq!(preprocessor.preprocess().unwrap(), "\nok");
        assert_eq!(preprocessor.prompts().len(), 1);
        assert_eq!(preprocessor.prompts()[0].message, "careful");
    }

    #[test]
    fn test_process_pass_through_directives() {
        assert_eq!(process("#version 330").unwrap(), "#version 330");
        assert_eq!(
            process("#version 450 core\n#extension GL_ARB_foo : enable\n#pragma optimize(off)")
                .unwrap(),
            "#version 450 core\n#extension GL_ARB_foo : enable\n#pragma optimize(off)"
        );
        assert_eq!(process("#\nok").unwrap(), "\nok");

        assert!(matches!(
            process("#test"),
            Err(PreprocessError::Message(..))
        ));
    }

    #[test]
    fn test_macro_api() {
        let mut preprocessor = Preprocessor::new("");
        let count = preprocessor.macro_count();

        preprocessor
            .define_macro(Macro::new_function_like("MUL", &["a", "b"], "a*b"))
            .unwrap();
        assert_eq!(preprocessor.macro_count(), count + 1);
        assert_eq!(preprocessor.get_macro("MUL").unwrap().definition, "a*b");

        preprocessor.undefine_macro("MUL").unwrap();
        assert!(!preprocessor.is_macro_defined("MUL"));
        assert!(matches!(
            preprocessor.get_macro("MUL"),
            Err(PreprocessError::Message(..))
        ));

        preprocessor
            .define_predefinitions(&HashMap::from([("MAX_LIGHTS".to_owned(), "8".to_owned())]))
            .unwrap();
        assert_eq!(preprocessor.get_macro("MAX_LIGHTS").unwrap().definition, "8");

        assert!(matches!(
            preprocessor.define_predefinitions(&HashMap::from([(
                "while".to_owned(),
                String::new()
            )])),
            Err(PreprocessError::Message(..))
        ));
    }

    #[test]
    fn test_standard_macros() {
        let mut preprocessor =
            Preprocessor::with_file_name("__STDC__ __BASE_FILE__ __SHADEPP__", "a.frag");
        preprocessor.define_standard_macros();
        assert!(preprocessor.is_macro_defined("__DATE__"));
        assert!(preprocessor.is_macro_defined("__TIME__"));
        assert_eq!(preprocessor.preprocess().unwrap(), "1 \"a.frag\" 1");

        let mut preprocessor = Preprocessor::new("");
        preprocessor.define_os_macros();
        for (name, value) in os_macros(std::env::consts::OS) {
            assert_eq!(preprocessor.get_macro(name).unwrap().definition, *value);
        }

        #[cfg(target_os = "linux")]
        assert!(preprocessor.is_macro_defined("__linux__"));

        #[cfg(target_os = "windows")]
        assert!(preprocessor.is_macro_defined("_WIN32"));
    }
}
