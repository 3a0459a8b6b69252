// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::mem::take;

use crate::token::{is_identifier_char, is_new_token};

/// The classified spans of the source text, in source order.
#[derive(Debug, PartialEq, Clone)]
pub enum Lexeme {
    /// A plain token, including its leading whitespace (e.g. `" foo"`),
    /// or a whole parenthesis group such as `"add(a, (b))"`.
    /// Subject to macro expansion.
    Token(String),

    /// A string or character literal including its quotes. Never expanded.
    Literal(String),

    /// A directive line, e.g. `#define FOO 1` yields `("define", "FOO 1")`.
    /// Comments are stripped from the parameters, which are trimmed.
    Directive { command: String, parameters: String },

    /// The end of a line. The `synthetic` one is appended at the end of the input
    /// and is neither emitted nor counted.
    NewLine { synthetic: bool },

    /// A physical newline that does not end the line: a line continuation, or a
    /// newline inside a block comment or a parenthesis group.
    LineAdvance,

    /// The input ended inside a block comment.
    UnterminatedComment,
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum State {
    Probing,
    FindingCommandStart,
    CommandName,
    Parameters,
    StringLiteral(char),
    SinglelineComment,
    MultilineComment,
    Parenthesis,
}

/// Splits the source text into lexemes.
///
/// `recognize_directives` is false for texts that are not a source file of their own,
/// e.g. the replacement text of a macro, where a leading `#` is the stringizing operator.
pub fn lex_from_str(source_text: &str, recognize_directives: bool) -> Vec<Lexeme> {
    let mut lexer = Lexer::new(pre_lex(source_text), recognize_directives);
    lexer.lex();
    lexer.output
}

// Converts "\r\n" into '\n' and NUL into space.
fn pre_lex(source_text: &str) -> Vec<char> {
    source_text
        .replace("\r\n", "\n")
        .chars()
        .map(|c| if c == '\0' { ' ' } else { c })
        .collect()
}

struct Lexer {
    chars: Vec<char>,
    index: usize,
    recognize_directives: bool,
    state: State,

    // only whitespace has been seen since the beginning of the line
    at_line_start: bool,
    in_directive: bool,
    parenthesis_depth: usize,

    // newlines swallowed by the current parenthesis group
    group_line_advances: usize,

    // line continuations of the current directive line
    directive_line_advances: usize,

    token: String,
    literal: String,
    command: String,
    parameters: String,
    output: Vec<Lexeme>,
}

impl Lexer {
    fn new(chars: Vec<char>, recognize_directives: bool) -> Self {
        Self {
            chars,
            index: 0,
            recognize_directives,
            state: State::Probing,
            at_line_start: true,
            in_directive: false,
            parenthesis_depth: 0,
            group_line_advances: 0,
            directive_line_advances: 0,
            token: String::new(),
            literal: String::new(),
            command: String::new(),
            parameters: String::new(),
            output: vec![],
        }
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.get(self.index).copied();
        if c.is_some() {
            self.index += 1;
        }
        c
    }

    fn peek_char(&self, offset: usize) -> Option<&char> {
        self.chars.get(self.index + offset)
    }

    fn peek_char_and_equals(&self, offset: usize, expected_char: char) -> bool {
        matches!(self.peek_char(offset), Some(c) if *c == expected_char)
    }

    /// The state to return to when a comment or a literal ends.
    fn resume_state(&self) -> State {
        if self.in_directive {
            State::Parameters
        } else if self.parenthesis_depth > 0 {
            State::Parenthesis
        } else {
            State::Probing
        }
    }

    /// The buffer which receives the characters of a string literal.
    fn string_buffer(&mut self) -> &mut String {
        if self.in_directive {
            &mut self.parameters
        } else if self.parenthesis_depth > 0 {
            &mut self.token
        } else {
            &mut self.literal
        }
    }

    fn push_token_char(&mut self, c: char) {
        if self
            .token
            .chars()
            .last()
            .is_some_and(|last| is_new_token(last, c))
        {
            self.flush_token();
        }
        self.token.push(c);
    }

    fn flush_token(&mut self) {
        if !self.token.is_empty() {
            self.output.push(Lexeme::Token(take(&mut self.token)));
        }
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            self.output.push(Lexeme::Literal(take(&mut self.literal)));
        }
    }

    fn flush_group(&mut self) {
        self.flush_token();
        for _ in 0..take(&mut self.group_line_advances) {
            self.output.push(Lexeme::LineAdvance);
        }
        self.parenthesis_depth = 0;
    }
}

impl Lexer {
    fn lex(&mut self) {
        while let Some(current_char) = self.next_char() {
            if current_char == '\\' && self.peek_char_and_equals(0, '\n') {
                self.next_char(); // consume '\n'
                self.continue_line();
                continue;
            }

            if current_char == '\n' {
                self.break_line(false);
                continue;
            }

            match self.state {
                State::Probing => self.lex_text_char(current_char),
                State::FindingCommandStart => {
                    if current_char.is_whitespace() {
                        // skip the spaces between '#' and the command name
                    } else if is_identifier_char(current_char) {
                        self.command.push(current_char);
                        self.state = State::CommandName;
                    } else {
                        self.state = State::Parameters;
                        self.lex_parameter_char(current_char);
                    }
                }
                State::CommandName => {
                    if is_identifier_char(current_char) {
                        self.command.push(current_char);
                    } else {
                        // e.g. `#include<lib>` and `#if(A)`
                        self.state = State::Parameters;
                        self.lex_parameter_char(current_char);
                    }
                }
                State::Parameters => self.lex_parameter_char(current_char),
                State::StringLiteral(quote) => self.lex_string_char(quote, current_char),
                State::SinglelineComment => {
                    // discard
                }
                State::MultilineComment => {
                    if current_char == '*' && self.peek_char_and_equals(0, '/') {
                        self.next_char(); // consume '/'
                        self.state = self.resume_state();
                    }
                }
                State::Parenthesis => self.lex_parenthesis_char(current_char),
            }
        }

        self.finish();
    }

    fn lex_text_char(&mut self, current_char: char) {
        match current_char {
            '#' if self.at_line_start && self.recognize_directives => {
                self.flush_token();
                self.in_directive = true;
                self.state = State::FindingCommandStart;
            }
            '"' | '\'' => {
                self.flush_token();
                self.at_line_start = false;
                self.literal.push(current_char);
                self.state = State::StringLiteral(current_char);
            }
            '/' if self.peek_char_and_equals(0, '/') => {
                self.next_char(); // consume the second '/'
                self.flush_token();
                self.state = State::SinglelineComment;
            }
            '/' if self.peek_char_and_equals(0, '*') => {
                self.next_char(); // consume '*'
                self.flush_token();
                self.state = State::MultilineComment;
            }
            '(' => {
                self.at_line_start = false;
                self.push_token_char(current_char);
                self.parenthesis_depth = 1;
                self.state = State::Parenthesis;
            }
            _ => {
                if !current_char.is_whitespace() {
                    self.at_line_start = false;
                }
                self.push_token_char(current_char);
            }
        }
    }

    fn lex_parameter_char(&mut self, current_char: char) {
        match current_char {
            '"' | '\'' => {
                self.parameters.push(current_char);
                self.state = State::StringLiteral(current_char);
            }
            '/' if self.peek_char_and_equals(0, '/') => {
                self.next_char(); // consume the second '/'
                self.state = State::SinglelineComment;
            }
            '/' if self.peek_char_and_equals(0, '*') => {
                self.next_char(); // consume '*'
                self.state = State::MultilineComment;
            }
            _ => self.parameters.push(current_char),
        }
    }

    fn lex_string_char(&mut self, quote: char, current_char: char) {
        if current_char == '\\' {
            // the escaped character can never be a newline here,
            // since "\\\n" is a line continuation.
            let escaped_char = self.next_char();
            let buffer = self.string_buffer();
            buffer.push(current_char);
            if let Some(c) = escaped_char {
                buffer.push(c);
            }
            return;
        }

        self.string_buffer().push(current_char);

        if current_char == quote {
            self.state = self.resume_state();
            if self.state == State::Probing {
                self.flush_literal();
            }
        }
    }

    fn lex_parenthesis_char(&mut self, current_char: char) {
        match current_char {
            '"' | '\'' => {
                self.token.push(current_char);
                self.state = State::StringLiteral(current_char);
            }
            '/' if self.peek_char_and_equals(0, '/') => {
                self.next_char(); // consume the second '/'
                self.state = State::SinglelineComment;
            }
            '/' if self.peek_char_and_equals(0, '*') => {
                self.next_char(); // consume '*'
                self.state = State::MultilineComment;
            }
            '(' => {
                self.parenthesis_depth += 1;
                self.token.push(current_char);
            }
            ')' => {
                self.token.push(current_char);
                self.parenthesis_depth -= 1;
                if self.parenthesis_depth == 0 {
                    self.flush_group();
                    self.state = State::Probing;
                }
            }
            _ => self.token.push(current_char),
        }
    }

    /// Handles a backslash immediately followed by a newline.
    fn continue_line(&mut self) {
        if self.in_directive {
            self.directive_line_advances += 1;
        } else if self.parenthesis_depth > 0 {
            self.group_line_advances += 1;
        } else {
            self.output.push(Lexeme::LineAdvance);
        }
    }

    fn break_line(&mut self, synthetic: bool) {
        if self.state == State::MultilineComment {
            if self.in_directive {
                self.directive_line_advances += 1;
            } else if self.parenthesis_depth > 0 {
                self.group_line_advances += 1;
            } else {
                self.output.push(Lexeme::LineAdvance);
            }
            return;
        }

        if self.parenthesis_depth > 0 {
            // an unterminated literal or a line comment ends here, the group goes on.
            self.token.push('\n');
            self.group_line_advances += 1;
            self.state = State::Parenthesis;
            return;
        }

        if matches!(self.state, State::StringLiteral(_)) && !self.in_directive {
            // unterminated literal
            self.flush_literal();
        }

        self.flush_token();

        if self.in_directive {
            let command = take(&mut self.command);
            let parameters = take(&mut self.parameters).trim().to_owned();
            self.output.push(Lexeme::Directive {
                command,
                parameters,
            });
            self.in_directive = false;
        }

        self.output.push(Lexeme::NewLine { synthetic });

        for _ in 0..take(&mut self.directive_line_advances) {
            self.output.push(Lexeme::LineAdvance);
        }

        self.state = State::Probing;
        self.at_line_start = true;
    }

    fn finish(&mut self) {
        if self.state == State::MultilineComment {
            self.flush_token();
            self.output.push(Lexeme::UnterminatedComment);
            return;
        }

        if self.parenthesis_depth > 0 {
            // an unclosed group is kept verbatim
            self.flush_group();
            return;
        }

        self.break_line(true);
    }
}
