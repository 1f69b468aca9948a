//! Aperture macro arithmetic.
//!
//! Macro parameters are plain values, `$n` variables or expressions over them using `+`, `-`, `x` (multiply), `/`
//! and parentheses.

use std::collections::HashMap;

use gerber_types::{MacroBoolean, MacroDecimal, MacroInteger};
use log::trace;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionEvaluationError {
    #[error("Unexpected character '{0}' at {1}")]
    UnexpectedCharacter(char, usize),
    #[error("Unexpected end of expression")]
    UnexpectedEnd,
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    #[error("Invalid variable number {0}")]
    InvalidVariable(u32),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Value {0} is not a valid integer")]
    NotAnInteger(f64),
}

/// Variable values of one aperture macro instantiation.
#[derive(Debug, Default, Clone)]
pub struct MacroContext {
    variables: HashMap<u32, f64>,
}

impl MacroContext {
    pub fn put(&mut self, number: u32, value: f64) -> Result<(), ExpressionEvaluationError> {
        if number == 0 {
            return Err(ExpressionEvaluationError::InvalidVariable(number));
        }
        self.variables.insert(number, value);
        Ok(())
    }

    /// Undefined variables read as zero.
    pub fn get(&self, number: &u32) -> f64 {
        self.variables
            .get(number)
            .copied()
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Variable(u32),
    Plus,
    Minus,
    Multiply,
    Divide,
    Open,
    Close,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, ExpressionEvaluationError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = vec![];
    let mut index = 0;

    while index < chars.len() {
        let c = chars[index];
        match c {
            ' ' | '\t' => {
                index += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                index += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                index += 1;
            }
            'x' | 'X' => {
                tokens.push(Token::Multiply);
                index += 1;
            }
            '/' => {
                tokens.push(Token::Divide);
                index += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                index += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                index += 1;
            }
            '$' => {
                let start = index + 1;
                let mut end = start;
                while end < chars.len() && chars[end].is_ascii_digit() {
                    end += 1;
                }
                let digits: String = chars[start..end].iter().collect();
                let number = digits
                    .parse::<u32>()
                    .map_err(|_| ExpressionEvaluationError::InvalidNumber(format!("${}", digits)))?;
                tokens.push(Token::Variable(number));
                index = end;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = index;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_digit() || chars[end] == '.') {
                    end += 1;
                }
                let text: String = chars[start..end].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ExpressionEvaluationError::InvalidNumber(text.clone()))?;
                tokens.push(Token::Number(value));
                index = end;
            }
            _ => return Err(ExpressionEvaluationError::UnexpectedCharacter(c, index)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    context: &'a MacroContext,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, ExpressionEvaluationError> {
        let mut value = self.term()?;
        while let Some(token) = self.peek().cloned() {
            match token {
                Token::Plus => {
                    self.position += 1;
                    value += self.term()?;
                }
                Token::Minus => {
                    self.position += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := factor (('x' | '/') factor)*
    fn term(&mut self) -> Result<f64, ExpressionEvaluationError> {
        let mut value = self.factor()?;
        while let Some(token) = self.peek().cloned() {
            match token {
                Token::Multiply => {
                    self.position += 1;
                    value *= self.factor()?;
                }
                Token::Divide => {
                    self.position += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(ExpressionEvaluationError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // factor := ('+' | '-') factor | number | variable | '(' expression ')'
    fn factor(&mut self) -> Result<f64, ExpressionEvaluationError> {
        let context = self.context;
        match self.next().cloned() {
            Some(Token::Plus) => self.factor(),
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Variable(number)) => Ok(context.get(&number)),
            Some(Token::Open) => {
                let value = self.expression()?;
                let closing = self.next().cloned();
                match closing {
                    Some(Token::Close) => Ok(value),
                    Some(_) => Err(ExpressionEvaluationError::UnexpectedCharacter('(', self.position - 1)),
                    None => Err(ExpressionEvaluationError::UnexpectedEnd),
                }
            }
            Some(Token::Close) => Err(ExpressionEvaluationError::UnexpectedCharacter(')', self.position - 1)),
            Some(_) => Err(ExpressionEvaluationError::UnexpectedCharacter('?', self.position - 1)),
            None => Err(ExpressionEvaluationError::UnexpectedEnd),
        }
    }
}

pub fn evaluate_expression(expression: &str, context: &MacroContext) -> Result<f64, ExpressionEvaluationError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        position: 0,
        context,
    };
    let value = parser.expression()?;
    if parser.position < tokens.len() {
        return Err(ExpressionEvaluationError::UnexpectedCharacter(')', parser.position));
    }
    trace!("evaluated '{}' = {}", expression, value);
    Ok(value)
}

pub fn macro_decimal_to_f64(value: &MacroDecimal, context: &MacroContext) -> Result<f64, ExpressionEvaluationError> {
    match value {
        MacroDecimal::Value(value) => Ok(*value),
        MacroDecimal::Variable(number) => Ok(context.get(number)),
        MacroDecimal::Expression(expression) => evaluate_expression(expression, context),
    }
}

pub fn macro_decimal_pair_to_f64(
    pair: &(MacroDecimal, MacroDecimal),
    context: &MacroContext,
) -> Result<(f64, f64), ExpressionEvaluationError> {
    Ok((
        macro_decimal_to_f64(&pair.0, context)?,
        macro_decimal_to_f64(&pair.1, context)?,
    ))
}

/// Non-zero values are `true`.
pub fn macro_boolean_to_bool(value: &MacroBoolean, context: &MacroContext) -> Result<bool, ExpressionEvaluationError> {
    match value {
        MacroBoolean::Value(value) => Ok(*value),
        MacroBoolean::Variable(number) => Ok(context.get(number) != 0.0),
        MacroBoolean::Expression(expression) => Ok(evaluate_expression(expression, context)? != 0.0),
    }
}

pub fn macro_integer_to_u32(value: &MacroInteger, context: &MacroContext) -> Result<u32, ExpressionEvaluationError> {
    let value = match value {
        MacroInteger::Value(value) => return Ok(*value),
        MacroInteger::Variable(number) => context.get(number),
        MacroInteger::Expression(expression) => evaluate_expression(expression, context)?,
    };

    let rounded = value.round();
    if rounded < 0.0 || (value - rounded).abs() > 1e-9 || rounded > u32::MAX as f64 {
        return Err(ExpressionEvaluationError::NotAnInteger(value));
    }
    Ok(rounded as u32)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn context() -> MacroContext {
        let mut context = MacroContext::default();
        context.put(1, 2.0).unwrap();
        context.put(2, 0.5).unwrap();
        context
    }

    #[rstest]
    #[case("1.5", 1.5)]
    #[case("$1x3", 6.0)]
    #[case("$1+$2", 2.5)]
    #[case("$1x0.2500", 0.5)]
    #[case("-$2", -0.5)]
    #[case("($1+1)x$2", 1.5)]
    #[case("$1+1x$2", 2.5)]
    #[case("10/$1-1", 4.0)]
    #[case("$9", 0.0)]
    #[case("$1X-3", -6.0)]
    fn test_evaluate(#[case] expression: &str, #[case] expected: f64) {
        // when
        let result = evaluate_expression(expression, &context()).unwrap();

        // then
        assert!((result - expected).abs() < 1e-12, "{} = {}", expression, result);
    }

    #[rstest]
    #[case("1/0", ExpressionEvaluationError::DivisionByZero)]
    #[case("($1", ExpressionEvaluationError::UnexpectedEnd)]
    #[case("2#", ExpressionEvaluationError::UnexpectedCharacter('#', 1))]
    fn test_evaluate_errors(#[case] expression: &str, #[case] expected: ExpressionEvaluationError) {
        assert_eq!(evaluate_expression(expression, &context()), Err(expected));
    }

    #[test]
    fn test_variable_zero_is_rejected() {
        let mut context = MacroContext::default();

        assert_eq!(context.put(0, 1.0), Err(ExpressionEvaluationError::InvalidVariable(0)));
    }

    #[test]
    fn test_macro_values() {
        // given
        let context = context();

        // expect
        assert_eq!(
            macro_decimal_to_f64(&MacroDecimal::Expression("$1x$2".to_string()), &context),
            Ok(1.0)
        );
        assert_eq!(macro_boolean_to_bool(&MacroBoolean::Variable(1), &context), Ok(true));
        assert_eq!(macro_integer_to_u32(&MacroInteger::Expression("$1x3".to_string()), &context), Ok(6));
        assert!(macro_integer_to_u32(&MacroInteger::Variable(2), &context).is_err());
    }
}
