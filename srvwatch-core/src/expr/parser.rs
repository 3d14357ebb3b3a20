//! Recursive-descent parser for the expression language.
//!
//! ```text
//! Expr       := Term (('+' | '-') Term)*
//! Term       := Factor (('*' | '/') Factor)*
//! Factor     := '(' Expr ')' | Variable | Number
//! Variable   := Identifier '.' Identifier
//! Number     := '-'? Digit+ ('.' Digit*)?
//! Identifier := Letter+
//! ```
//!
//! Whitespace between tokens is skipped. A `-` directly followed by a digit
//! in factor position is the sign of a literal, anywhere else it is the
//! subtraction operator.
//!
//! Nesting depth and operator count are bounded so that parsing and the
//! recursive evaluation of the resulting tree stay within a thread's stack.

use srvwatch_types::VariableRef;

use super::ast::{BinaryOperator, Node};
use crate::error::ParseError;

type Result<T> = std::result::Result<T, ParseError>;

/// Maximum parenthesis nesting.
pub const MAX_DEPTH: usize = 64;

/// Maximum number of binary operators in one expression.
pub const MAX_OPERATORS: usize = 256;

/// Parse a complete expression. The whole input must be consumed.
pub(crate) fn parse(text: &str) -> Result<Node> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
        depth: 0,
        operators: 0,
    };
    let node = parser.expr()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(node),
        Some(')') => Err(ParseError::UnexpectedClosingParenthesis {
            position: parser.pos,
        }),
        Some(c) => Err(parser.unexpected(c)),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Error for a character found where an operator or the end was expected.
    fn unexpected(&self, c: char) -> ParseError {
        if is_token_char(c) {
            ParseError::TrailingInput {
                found: c,
                position: self.pos,
            }
        } else {
            ParseError::UnexpectedCharacter {
                found: c,
                position: self.pos,
            }
        }
    }

    /// Consume the operator under the cursor, enforcing [`MAX_OPERATORS`].
    fn consume_operator(&mut self) -> Result<()> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(ParseError::TooManyOperators { position: self.pos });
        }
        self.pos += 1;
        Ok(())
    }

    fn expr(&mut self) -> Result<Node> {
        let mut node = self.term()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('+') => BinaryOperator::Add,
                Some('-') => BinaryOperator::Sub,
                _ => return Ok(node),
            };
            self.consume_operator()?;
            let rhs = self.term()?;
            node = Node::binary(op, node, rhs);
        }
    }

    fn term(&mut self) -> Result<Node> {
        let mut node = self.factor()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('*') => BinaryOperator::Mul,
                Some('/') => BinaryOperator::Div,
                _ => return Ok(node),
            };
            self.consume_operator()?;
            let rhs = self.factor()?;
            node = Node::binary(op, node, rhs);
        }
    }

    fn factor(&mut self) -> Result<Node> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            None | Some(')') => Err(ParseError::EmptyFactor { position: start }),
            Some('(') => {
                if self.depth >= MAX_DEPTH {
                    return Err(ParseError::TooDeep { position: start });
                }
                self.pos += 1;
                self.depth += 1;
                let inner = self.expr()?;
                self.depth -= 1;
                self.skip_whitespace();
                match self.peek() {
                    Some(')') => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    None => Err(ParseError::UnmatchedParenthesis { position: start }),
                    Some(c) => Err(self.unexpected(c)),
                }
            }
            Some('-') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number(),
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.variable(),
            Some(c) if BinaryOperator::from_char(c).is_some() => {
                Err(ParseError::UnexpectedOperator {
                    operator: c,
                    position: start,
                })
            }
            Some(c) => Err(ParseError::UnexpectedCharacter {
                found: c,
                position: start,
            }),
        }
    }

    fn number(&mut self) -> Result<Node> {
        let start = self.pos;
        let mut literal = String::new();
        if self.peek() == Some('-') {
            self.pos += 1;
            literal.push('-');
        }
        literal.push_str(&self.take_while(|c| c.is_ascii_alphanumeric() || c == '.'));

        let invalid = || ParseError::InvalidNumber {
            literal: literal.clone(),
            position: start,
        };
        let unsigned = literal.strip_prefix('-').unwrap_or(&literal);
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };
        let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if int_part.is_empty() || !digits_only(int_part) || !digits_only(frac_part) {
            return Err(invalid());
        }

        literal
            .trim_end_matches('.')
            .parse::<f64>()
            .map(Node::Number)
            .map_err(|_| invalid())
    }

    fn variable(&mut self) -> Result<Node> {
        let start = self.pos;
        let monitor = self.take_while(|c| c.is_ascii_alphabetic());
        if self.peek() != Some('.') {
            let rest = self.take_while(is_identifier_tail);
            return Err(ParseError::InvalidVariable {
                text: monitor + &rest,
                position: start,
            });
        }
        self.pos += 1;
        let variable = self.take_while(|c| c.is_ascii_alphabetic());
        let rest = self.take_while(is_identifier_tail);
        if variable.is_empty() || !rest.is_empty() {
            return Err(ParseError::InvalidVariable {
                text: format!("{}.{}{}", monitor, variable, rest),
                position: start,
            });
        }
        Ok(Node::Variable(VariableRef::new(monitor, variable)))
    }
}

fn is_identifier_tail(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Characters that can start or continue a token of the language.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '(' | ')' | '+' | '-' | '*' | '/')
}
