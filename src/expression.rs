// Copyright (c) 2026 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

use crate::{
    error::PreprocessError,
    location::Location,
    token::{is_identifier_char, is_identifier_start},
};

/// Expanded expressions used in `#if` and `#elif` directives
///
/// This expression can only contain integer constants, character constants,
/// operators and grouping parentheses.
///
/// Which means all macros and the `defined` operator
/// must be expanded before constructing this expression.
#[derive(Debug, PartialEq)]
enum Expression {
    Number(i64),
    Binary(BinaryOperator, Box<Expression>, Box<Expression>),
    Unary(UnaryOperator, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum BinaryOperator {
    // Arithmetic operators
    Add,      // '+'
    Subtract, // '-'
    Multiply, // '*'
    Divide,   // '/'
    Modulo,   // '%'

    // Relational operators
    Equal,              // '=='
    NotEqual,           // '!='
    LessThan,           // '<'
    LessThanOrEqual,    // '<='
    GreaterThan,        // '>'
    GreaterThanOrEqual, // '>='

    // Logical operators
    And, // '&&'
    Or,  // '||'

    // Bitwise operators
    BitwiseAnd, // '&'
    BitwiseOr,  // '|'
    BitwiseXor, // '^'
    ShiftLeft,  // '<<'
    ShiftRight, // '>>'
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum UnaryOperator {
    Plus,       // '+'
    Minus,      // '-'
    LogicalNot, // '!'
    BitwiseNot, // '~'
}

#[derive(Debug, PartialEq, Clone)]
enum ExpressionToken {
    Number(i64),
    Punctuator(&'static str),
}

// Longer punctuators first.
const EXPRESSION_PUNCTUATORS: [&str; 24] = [
    "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "&", "|",
    "^", "!", "~", "?", ":", "(", ")",
];

impl BinaryOperator {
    fn from_punctuator(punctuator: &str) -> Option<Self> {
        let operator = match punctuator {
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            "%" => BinaryOperator::Modulo,
            "==" => BinaryOperator::Equal,
            "!=" => BinaryOperator::NotEqual,
            "<" => BinaryOperator::LessThan,
            "<=" => BinaryOperator::LessThanOrEqual,
            ">" => BinaryOperator::GreaterThan,
            ">=" => BinaryOperator::GreaterThanOrEqual,
            "&&" => BinaryOperator::And,
            "||" => BinaryOperator::Or,
            "&" => BinaryOperator::BitwiseAnd,
            "|" => BinaryOperator::BitwiseOr,
            "^" => BinaryOperator::BitwiseXor,
            "<<" => BinaryOperator::ShiftLeft,
            ">>" => BinaryOperator::ShiftRight,
            _ => return None,
        };
        Some(operator)
    }
}

impl UnaryOperator {
    fn from_punctuator(punctuator: &str) -> Option<Self> {
        let operator = match punctuator {
            "+" => UnaryOperator::Plus,
            "-" => UnaryOperator::Minus,
            "!" => UnaryOperator::LogicalNot,
            "~" => UnaryOperator::BitwiseNot,
            _ => return None,
        };
        Some(operator)
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
        };
        write!(f, "{}", symbol)
    }
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::LogicalNot => "!",
            UnaryOperator::BitwiseNot => "~",
        };
        write!(f, "{}", symbol)
    }
}

/// Prints the expression with every operation parenthesized,
/// e.g. `1 + 2 * 3` is printed as `(1 + (2 * 3))`.
impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Number(number) => write!(f, "{number}"),
            Expression::Binary(operator, left, right) => write!(f, "({left} {operator} {right})"),
            Expression::Unary(operator, operand) => write!(f, "({operator}{operand})"),
            Expression::Conditional(condition, consequent, alternative) => {
                write!(f, "({condition} ? {consequent} : {alternative})")
            }
        }
    }
}

struct ExpressionTokenizer<'a> {
    chars: Vec<char>,
    index: usize,
    location: &'a Location,
}

impl<'a> ExpressionTokenizer<'a> {
    fn new(text: &str, location: &'a Location) -> Self {
        Self {
            chars: text.chars().collect(),
            index: 0,
            location,
        }
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn error(&self, message: &str) -> PreprocessError {
        PreprocessError::Message(message.to_owned(), self.location.clone())
    }

    fn tokenize(&mut self) -> Result<Vec<ExpressionToken>, PreprocessError> {
        let mut tokens = vec![];

        while let Some(current_char) = self.peek_char(0) {
            match current_char {
                c if c.is_whitespace() => {
                    self.index += 1;
                }
                '0'..='9' => {
                    tokens.push(ExpressionToken::Number(self.tokenize_number()?));
                }
                '\'' => {
                    tokens.push(ExpressionToken::Number(self.tokenize_char()?));
                }
                '"' => {
                    return Err(self.error(
                        "String literals are not allowed in conditional expressions.",
                    ));
                }
                c if is_identifier_start(c) => {
                    let start = self.index;
                    while matches!(self.peek_char(0), Some(c) if is_identifier_char(c)) {
                        self.index += 1;
                    }
                    let identifier: String = self.chars[start..self.index].iter().collect();

                    // identifiers remaining after macro expansion evaluate to 0.
                    let value = if identifier == "true" { 1 } else { 0 };
                    tokens.push(ExpressionToken::Number(value));
                }
                _ => {
                    let punctuator = EXPRESSION_PUNCTUATORS.iter().find(|p| {
                        p.chars()
                            .enumerate()
                            .all(|(offset, c)| self.peek_char(offset) == Some(c))
                    });

                    match punctuator {
                        Some(p) => {
                            self.index += p.chars().count();
                            tokens.push(ExpressionToken::Punctuator(*p));
                        }
                        None => {
                            return Err(self.error(&format!(
                                "Unexpected character '{}' in conditional expression.",
                                current_char
                            )));
                        }
                    }
                }
            }
        }

        Ok(tokens)
    }

    fn tokenize_number(&mut self) -> Result<i64, PreprocessError> {
        let start = self.index;
        while matches!(self.peek_char(0), Some(c) if c.is_ascii_alphanumeric() || c == '.' || c == '_')
        {
            self.index += 1;
        }
        let literal: String = self.chars[start..self.index].iter().collect();

        // strip the integer suffix, e.g. `10UL`
        let digits = literal.trim_end_matches(['u', 'U', 'l', 'L']);

        let (radix, digits) = if let Some(hex) = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            (16, hex)
        } else if let Some(binary) = digits
            .strip_prefix("0b")
            .or_else(|| digits.strip_prefix("0B"))
        {
            (2, binary)
        } else if digits.len() > 1 && digits.starts_with('0') {
            (8, &digits[1..])
        } else {
            (10, digits)
        };

        if radix != 16 && (digits.contains('.') || digits.contains(['e', 'E'])) {
            return Err(self.error(&format!(
                "Floating-point number '{}' is not allowed in conditional expressions.",
                literal
            )));
        }

        u64::from_str_radix(digits, radix)
            .map(|value| value as i64)
            .map_err(|_| self.error(&format!("Invalid integer number '{}'.", literal)))
    }

    fn tokenize_char(&mut self) -> Result<i64, PreprocessError> {
        self.index += 1; // consume '\''

        let value = match self.peek_char(0) {
            Some('\\') => {
                self.index += 1; // consume '\\'
                let escaped = self
                    .peek_char(0)
                    .ok_or_else(|| self.error("Incomplete character constant."))?;
                self.index += 1;

                match escaped {
                    'n' => '\n' as i64,
                    't' => '\t' as i64,
                    'r' => '\r' as i64,
                    'v' => 0x0b,
                    'f' => 0x0c,
                    'a' => 0x07,
                    'b' => 0x08,
                    'x' => {
                        let start = self.index;
                        while matches!(self.peek_char(0), Some(c) if c.is_ascii_hexdigit()) {
                            self.index += 1;
                        }
                        let digits: String = self.chars[start..self.index].iter().collect();
                        i64::from_str_radix(&digits, 16)
                            .map_err(|_| self.error("Invalid hexadecimal escape sequence."))?
                    }
                    '0'..='7' => {
                        let start = self.index - 1;
                        while self.index - start < 3
                            && matches!(self.peek_char(0), Some('0'..='7'))
                        {
                            self.index += 1;
                        }
                        let digits: String = self.chars[start..self.index].iter().collect();
                        i64::from_str_radix(&digits, 8)
                            .map_err(|_| self.error("Invalid octal escape sequence."))?
                    }
                    c => c as i64,
                }
            }
            Some('\'') | None => {
                return Err(self.error("Empty character constant."));
            }
            Some(c) => {
                self.index += 1;
                c as i64
            }
        };

        if self.peek_char(0) != Some('\'') {
            return Err(self.error("Unterminated character constant."));
        }
        self.index += 1; // consume '\''

        Ok(value)
    }
}

// C Operator Precedence
// ---------------------
//
// Operators are listed top to bottom, in descending precedence.
//
// 1: `+ - ! ~` Unary operators
// 2: `* / %` Multiplication, division, and remainder
// 3: `+ -` Addition and subtraction
// 4: `<< >>` Bitwise left shift and right shift
// 5: `< <= > >=` Relational operators
// 6: `== !=` Equality operators
// 7: `&` Bitwise AND
// 8: `^` Bitwise XOR
// 9: `|` Bitwise OR
// 10: `&&` Logical AND
// 11: `||` Logical OR
// 12: `?:` Ternary conditional (right-to-left associative)
//
// See:
// https://en.cppreference.com/w/c/language/operator_precedence.html

struct ExpressionParser<'a> {
    tokens: Vec<ExpressionToken>,
    index: usize,
    location: &'a Location,
}

impl<'a> ExpressionParser<'a> {
    fn new(tokens: Vec<ExpressionToken>, location: &'a Location) -> Self {
        Self {
            tokens,
            index: 0,
            location,
        }
    }

    fn next_token(&mut self) -> Option<ExpressionToken> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn peek_token(&self, offset: usize) -> Option<&ExpressionToken> {
        self.tokens.get(self.index + offset)
    }

    fn peek_punctuator(&self) -> Option<&'static str> {
        match self.peek_token(0) {
            Some(ExpressionToken::Punctuator(p)) => Some(*p),
            _ => None,
        }
    }

    fn error(&self, message: &str) -> PreprocessError {
        PreprocessError::Message(message.to_owned(), self.location.clone())
    }

    fn consume_punctuator_and_expect(&mut self, expected: &str) -> Result<(), PreprocessError> {
        match self.next_token() {
            Some(ExpressionToken::Punctuator(p)) if p == expected => Ok(()),
            _ => Err(self.error(&format!(
                "Expect '{}' in conditional expression.",
                expected
            ))),
        }
    }
}

impl ExpressionParser<'_> {
    fn parse_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_conditional_expression()
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, PreprocessError> {
        let condition = self.parse_logic_or_expression()?;

        if self.peek_punctuator() != Some("?") {
            return Ok(condition);
        }

        self.next_token(); // consume '?'
        let consequent = self.parse_expression()?;
        self.consume_punctuator_and_expect(":")?;
        let alternative = self.parse_conditional_expression()?;

        Ok(Expression::Conditional(
            Box::new(condition),
            Box::new(consequent),
            Box::new(alternative),
        ))
    }

    fn parse_logic_or_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(&["||"], ExpressionParser::parse_logic_and_expression)
    }

    fn parse_logic_and_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(&["&&"], ExpressionParser::parse_bitwise_or_expression)
    }

    fn parse_bitwise_or_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(&["|"], ExpressionParser::parse_bitwise_xor_expression)
    }

    fn parse_bitwise_xor_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(&["^"], ExpressionParser::parse_bitwise_and_expression)
    }

    fn parse_bitwise_and_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(&["&"], ExpressionParser::parse_equality_expression)
    }

    fn parse_equality_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &["==", "!="],
            ExpressionParser::parse_relational_expression,
        )
    }

    fn parse_relational_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &["<", "<=", ">", ">="],
            ExpressionParser::parse_shift_expression,
        )
    }

    fn parse_shift_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(&["<<", ">>"], ExpressionParser::parse_additive_expression)
    }

    fn parse_additive_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &["+", "-"],
            ExpressionParser::parse_multiplicative_expression,
        )
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expression, PreprocessError> {
        self.parse_binary_expression(
            &["*", "/", "%"],
            ExpressionParser::parse_unary_expression,
        )
    }

    /// Parses left-to-right associative binary operators of the same precedence.
    fn parse_binary_expression(
        &mut self,
        expected_punctuators: &[&str],
        next_parse_function: fn(&mut Self) -> Result<Expression, PreprocessError>,
    ) -> Result<Expression, PreprocessError> {
        let mut left_expression = next_parse_function(self)?;

        while let Some(punctuator) = self.peek_punctuator() {
            if !expected_punctuators.contains(&punctuator) {
                break;
            }

            let Some(operator) = BinaryOperator::from_punctuator(punctuator) else {
                break;
            };

            self.next_token(); // consume the operator

            let right_expression = next_parse_function(self)?;
            left_expression = Expression::Binary(
                operator,
                Box::new(left_expression),
                Box::new(right_expression),
            );
        }

        Ok(left_expression)
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, PreprocessError> {
        if let Some(operator) = self.peek_punctuator().and_then(UnaryOperator::from_punctuator) {
            self.next_token(); // consume the operator
            let operand = self.parse_unary_expression()?;
            return Ok(Expression::Unary(operator, Box::new(operand)));
        }

        self.parse_primary_expression()
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, PreprocessError> {
        match self.next_token() {
            Some(ExpressionToken::Number(value)) => Ok(Expression::Number(value)),
            Some(ExpressionToken::Punctuator("(")) => {
                let inner_expression = self.parse_expression()?;
                self.consume_punctuator_and_expect(")")?;
                Ok(inner_expression)
            }
            Some(ExpressionToken::Punctuator(p)) => Err(self.error(&format!(
                "Unexpected '{}' in conditional expression.",
                p
            ))),
            None => Err(self.error("Incomplete conditional expression.")),
        }
    }
}

fn parse_expression(text: &str, location: &Location) -> Result<Expression, PreprocessError> {
    let tokens = ExpressionTokenizer::new(text, location).tokenize()?;
    if tokens.is_empty() {
        return Err(PreprocessError::Message(
            "Expect an expression.".to_owned(),
            location.clone(),
        ));
    }

    let mut parser = ExpressionParser::new(tokens, location);
    let expression = parser.parse_expression()?;

    if parser.peek_token(0).is_some() {
        return Err(parser.error("Unexpected tokens after the conditional expression."));
    }

    Ok(expression)
}

/// Evaluates an expanded conditional expression of `#if` and `#elif`.
///
/// The arithmetic is done on `i64` with wrapping semantics.
pub fn evaluate(text: &str, location: &Location) -> Result<i64, PreprocessError> {
    let expression = parse_expression(text, location)?;
    let value = evaluate_expression(&expression, location)?;
    log::debug!("{}: evaluated {} to {}", location, expression, value);
    Ok(value)
}

fn evaluate_expression(expression: &Expression, location: &Location) -> Result<i64, PreprocessError> {
    match expression {
        Expression::Number(value) => Ok(*value),
        Expression::Binary(operator, left, right) => {
            evaluate_binary_expression(*operator, left, right, location)
        }
        Expression::Unary(operator, operand) => {
            let value = evaluate_expression(operand, location)?;
            Ok(match operator {
                UnaryOperator::Plus => value,
                UnaryOperator::Minus => value.wrapping_neg(),
                UnaryOperator::LogicalNot => (value == 0) as i64,
                UnaryOperator::BitwiseNot => !value,
            })
        }
        Expression::Conditional(condition, consequent, alternative) => {
            if evaluate_expression(condition, location)? != 0 {
                evaluate_expression(consequent, location)
            } else {
                evaluate_expression(alternative, location)
            }
        }
    }
}

fn evaluate_binary_expression(
    operator: BinaryOperator,
    left: &Expression,
    right: &Expression,
    location: &Location,
) -> Result<i64, PreprocessError> {
    let left = evaluate_expression(left, location)?;

    // Logical short-circuiting
    if operator == BinaryOperator::And && left == 0 {
        return Ok(0);
    }

    if operator == BinaryOperator::Or && left != 0 {
        return Ok(1);
    }

    let right = evaluate_expression(right, location)?;

    let result = match operator {
        BinaryOperator::Add => left.wrapping_add(right),
        BinaryOperator::Subtract => left.wrapping_sub(right),
        BinaryOperator::Multiply => left.wrapping_mul(right),
        BinaryOperator::Divide | BinaryOperator::Modulo if right == 0 => {
            return Err(PreprocessError::Message(
                "Division by zero in conditional expression.".to_owned(),
                location.clone(),
            ));
        }
        BinaryOperator::Divide => left.wrapping_div(right),
        BinaryOperator::Modulo => left.wrapping_rem(right),
        BinaryOperator::Equal => (left == right) as i64,
        BinaryOperator::NotEqual => (left != right) as i64,
        BinaryOperator::LessThan => (left < right) as i64,
        BinaryOperator::LessThanOrEqual => (left <= right) as i64,
        BinaryOperator::GreaterThan => (left > right) as i64,
        BinaryOperator::GreaterThanOrEqual => (left >= right) as i64,
        BinaryOperator::And | BinaryOperator::Or => (right != 0) as i64,
        BinaryOperator::BitwiseAnd => left & right,
        BinaryOperator::BitwiseOr => left | right,
        BinaryOperator::BitwiseXor => left ^ right,
        BinaryOperator::ShiftLeft => left.wrapping_shl(right as u32),
        BinaryOperator::ShiftRight => left.wrapping_shr(right as u32),
    };

    Ok(result)
}
