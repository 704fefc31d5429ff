//! Parser for the textual query syntax.
//!
//! ```text
//! query     := ε | condition ("AND" condition)*
//! condition := TAG "EXISTS"
//!            | TAG "CONTAINS" STRING
//!            | TAG ("=" | "<" | "<=" | ">" | ">=") VALUE
//! VALUE     := STRING | NUMBER
//! STRING    := "'" [^']* "'"
//! NUMBER    := "-"? DIGIT+ ("." DIGIT+)? (("e" | "E") ("+" | "-")? DIGIT+)?
//! ```
//!
//! Keywords are case-insensitive. Tags are runs of ASCII letters, digits
//! and `_ . - /` that do not start with `-`. A run starting with a digit is
//! a number when it is one in full (`1e5`) and a tag otherwise
//! (`1inch.amount`).

use crate::condition::{Operand, Operator};
use crate::query::Query;
use crate::QueryError;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Tag(String),
    Str(String),
    Number(Operand),
    Op(Operator),
    And,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

fn is_tag_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/')
}

fn syntax(pos: usize, message: impl Into<String>) -> QueryError {
    QueryError::Syntax {
        pos,
        message: message.into(),
    }
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    /// Take the longest prefix whose chars satisfy `pred`.
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    /// Next token and the byte offset it starts at.
    fn next_token(&mut self) -> Result<Option<(usize, Token)>, QueryError> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        let token = match c {
            '\'' => {
                self.pos += 1;
                let body = self.take_while(|c| c != '\'');
                if self.peek_char() != Some('\'') {
                    return Err(syntax(start, "unterminated string literal"));
                }
                self.pos += 1;
                Token::Str(body.to_string())
            }
            '=' => {
                self.pos += 1;
                Token::Op(Operator::Eq)
            }
            '<' | '>' => {
                self.pos += 1;
                let or_equal = self.peek_char() == Some('=');
                if or_equal {
                    self.pos += 1;
                }
                Token::Op(match (c, or_equal) {
                    ('<', false) => Operator::Lt,
                    ('<', true) => Operator::Lte,
                    ('>', false) => Operator::Gt,
                    _ => Operator::Gte,
                })
            }
            '-' => self.number(start)?,
            c if c.is_ascii_digit() => {
                let number = self.number(start);
                if self.peek_char().is_some_and(is_tag_char) {
                    self.pos = start;
                    self.word()
                } else {
                    number?
                }
            }
            c if is_tag_start(c) => self.word(),
            other => return Err(syntax(start, format!("unexpected character {:?}", other))),
        };
        Ok(Some((start, token)))
    }

    /// A keyword or a tag.
    fn word(&mut self) -> Token {
        let word = self.take_while(is_tag_char);
        match word.to_ascii_uppercase().as_str() {
            "AND" => Token::And,
            "EXISTS" => Token::Op(Operator::Exists),
            "CONTAINS" => Token::Op(Operator::Contains),
            _ => Token::Tag(word.to_string()),
        }
    }

    fn number(&mut self, start: usize) -> Result<Token, QueryError> {
        if self.peek_char() == Some('-') {
            self.pos += 1;
        }
        let int_part = self.take_while(|c| c.is_ascii_digit());
        if int_part.is_empty() {
            return Err(syntax(start, "expected digits"));
        }
        let mut is_float = false;
        if self.peek_char() == Some('.') {
            self.pos += 1;
            if self.take_while(|c| c.is_ascii_digit()).is_empty() {
                return Err(syntax(start, "expected digits after decimal point"));
            }
            is_float = true;
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            self.pos += 1;
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.pos += 1;
            }
            if self.take_while(|c| c.is_ascii_digit()).is_empty() {
                return Err(syntax(start, "expected digits in exponent"));
            }
            is_float = true;
        }
        let text = &self.input[start..self.pos];
        let operand = if is_float {
            text.parse::<f64>().map(Operand::Float).ok()
        } else {
            text.parse::<i64>().map(Operand::Int).ok()
        };
        operand
            .map(Token::Number)
            .ok_or_else(|| syntax(start, format!("number out of range: {}", text)))
    }

    fn tokenize(mut self) -> Result<Vec<(usize, Token)>, QueryError> {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }
}

/// Parse `input` into a [`Query`].
pub fn parse(input: &str) -> Result<Query, QueryError> {
    let tokens = Lexer::new(input).tokenize()?;
    let end = input.len();
    let mut query = Query::new();
    let mut iter = tokens.into_iter().peekable();

    if iter.peek().is_none() {
        return Ok(query);
    }

    loop {
        let (tag_pos, tag) = match iter.next() {
            Some((pos, Token::Tag(tag))) => (pos, tag),
            Some((pos, tok)) => return Err(syntax(pos, format!("expected tag, found {:?}", tok))),
            None => return Err(syntax(end, "expected tag after AND")),
        };

        let (op, operand) = match iter.next() {
            Some((_, Token::Op(Operator::Exists))) => (Operator::Exists, None),
            Some((op_pos, Token::Op(op))) => match iter.next() {
                Some((_, Token::Str(s))) => (op, Some(Operand::Str(s))),
                Some((_, Token::Number(n))) => (op, Some(n)),
                Some((pos, tok)) => {
                    return Err(syntax(pos, format!("expected value, found {:?}", tok)))
                }
                None => return Err(syntax(op_pos, format!("missing value after {}", op))),
            },
            Some((pos, tok)) => {
                return Err(syntax(pos, format!("expected operator, found {:?}", tok)))
            }
            None => return Err(syntax(end, format!("missing operator after tag {}", tag))),
        };

        query.push(tag.as_str(), op, operand).map_err(|e| match e {
            QueryError::InvalidOperand { reason, .. } => syntax(tag_pos, reason),
            other => other,
        })?;

        match iter.next() {
            None => break,
            Some((_, Token::And)) => continue,
            Some((pos, tok)) => return Err(syntax(pos, format!("expected AND, found {:?}", tok))),
        }
    }

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Tag;

    #[test]
    fn empty_input_is_empty_query() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("   \n\t").unwrap().is_empty());
    }

    #[test]
    fn parses_conjunction() {
        let q = parse("tx.height = 5 AND transfer.amount > 100 AND message.action EXISTS")
            .unwrap();
        let conds = q.conditions();
        assert_eq!(conds.len(), 3);
        assert_eq!(conds[0].tag(), &Tag::Height);
        assert_eq!(conds[0].height_eq(), Some(5));
        assert_eq!(conds[1].op(), Operator::Gt);
        assert_eq!(conds[1].operand(), Some(&Operand::Int(100)));
        assert_eq!(conds[2].op(), Operator::Exists);
        assert_eq!(conds[2].operand(), None);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let q = parse("a.b contains 'x' and c.d exists").unwrap();
        assert_eq!(q.conditions()[0].op(), Operator::Contains);
        assert_eq!(q.conditions()[1].op(), Operator::Exists);
    }

    #[test]
    fn parses_strings_and_numbers() {
        let q = parse("tx.hash = 'ABCD' AND a.b <= -2.5 AND c.d >= -3").unwrap();
        assert_eq!(q.conditions()[0].operand(), Some(&Operand::Str("ABCD".into())));
        assert_eq!(q.conditions()[1].operand(), Some(&Operand::Float(-2.5)));
        assert_eq!(q.conditions()[2].operand(), Some(&Operand::Int(-3)));
    }

    #[test]
    fn exponents_parse_as_floats() {
        let q = parse("a.b > 1e20 AND c.d < 2.5E-7").unwrap();
        assert_eq!(q.conditions()[0].operand(), Some(&Operand::Float(1e20)));
        assert_eq!(q.conditions()[1].operand(), Some(&Operand::Float(2.5e-7)));
        // Large floats render with an exponent; that form must parse back.
        assert_eq!(parse(&q.to_string()).unwrap().to_string(), q.to_string());
        assert!(parse("a.b > 1e").is_err());
    }

    #[test]
    fn digit_leading_tags() {
        let q = parse("1inch.amount > 5 AND 2fa.method EXISTS AND x.y = 1e5").unwrap();
        assert_eq!(q.conditions()[0].tag(), &Tag::Event("1inch.amount".into()));
        assert_eq!(q.conditions()[0].operand(), Some(&Operand::Int(5)));
        assert_eq!(q.conditions()[1].tag(), &Tag::Event("2fa.method".into()));
        assert_eq!(q.conditions()[2].operand(), Some(&Operand::Float(1e5)));
        assert_eq!(parse(&q.to_string()).unwrap().to_string(), q.to_string());
        // A value that runs into tag characters is a tag, not a number.
        assert!(parse("a.b = 5x").is_err());
        assert!(parse("-1x.y EXISTS").is_err());
    }

    #[test]
    fn string_may_contain_spaces_and_operators() {
        let q = parse("memo.text = 'a = b AND c'").unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(q.conditions()[0].operand(), Some(&Operand::Str("a = b AND c".into())));
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let err = parse("a.b = 'oops").unwrap_err();
        assert_eq!(
            err,
            QueryError::Syntax {
                pos: 6,
                message: "unterminated string literal".into()
            }
        );
    }

    #[test]
    fn dangling_and_is_rejected() {
        assert!(matches!(parse("a.b EXISTS AND"), Err(QueryError::Syntax { .. })));
    }

    #[test]
    fn missing_value_is_rejected() {
        assert!(parse("a.b =").is_err());
        assert!(parse("a.b").is_err());
        assert!(parse("= 5").is_err());
    }

    #[test]
    fn invalid_operand_reported_as_syntax_error() {
        let err = parse("x.y = 1 AND a.b CONTAINS 5").unwrap_err();
        assert!(matches!(err, QueryError::Syntax { pos: 12, .. }));
    }

    #[test]
    fn missing_and_is_rejected() {
        assert!(parse("a.b EXISTS c.d EXISTS").is_err());
    }

    #[test]
    fn unexpected_character_is_rejected() {
        assert!(matches!(parse("a.b ! 5"), Err(QueryError::Syntax { pos: 4, .. })));
    }

    #[test]
    fn overflowing_integer_is_rejected() {
        assert!(parse("a.b = 99999999999999999999").is_err());
    }
}
