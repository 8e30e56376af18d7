//! Tokenizer for the body of one `${..}` or `#{..}` expression

use super::ElError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    Integer(String),
    Float(String),
    Str(String),
    True,
    False,
    Null,
    Empty,
    Not,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Div,
    Mod,
    Instanceof,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Question,
    Colon,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

impl Token {
    fn keyword(word: &str) -> Option<Self> {
        let token = match word {
            "true" => Self::True,
            "false" => Self::False,
            "null" => Self::Null,
            "empty" => Self::Empty,
            "not" => Self::Not,
            "and" => Self::And,
            "or" => Self::Or,
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "lt" => Self::Lt,
            "gt" => Self::Gt,
            "le" => Self::Le,
            "ge" => Self::Ge,
            "div" => Self::Div,
            "mod" => Self::Mod,
            "instanceof" => Self::Instanceof,
            _ => return None,
        };
        Some(token)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Identifier(s) | Self::Integer(s) | Self::Float(s) => s.as_str(),
            Self::Str(_) => "string literal",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::Empty => "empty",
            Self::Not => "!",
            Self::And => "&&",
            Self::Or => "||",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Instanceof => "instanceof",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Question => "?",
            Self::Colon => ":",
            Self::Dot => ".",
            Self::Comma => ",",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Eof => "end of expression",
        };
        f.write_str(text)
    }
}

/// A token and the character offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Positioned {
    pub token: Token,
    pub offset: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Positioned>, ElError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        let start = pos;
        if ch.is_whitespace() {
            pos += 1;
            continue;
        }

        let peek = chars.get(pos + 1).copied();
        let (token, len) = match ch {
            '\'' | '"' => {
                let (text, len) = string_literal(&chars, pos, source)?;
                (Token::Str(text), len)
            }
            '0'..='9' => number(&chars, pos),
            '.' if peek.is_some_and(|c| c.is_ascii_digit()) => number(&chars, pos),
            c if is_identifier_start(c) => {
                let mut end = pos + 1;
                while end < chars.len() && is_identifier_part(chars[end]) {
                    end += 1;
                }
                let word: String = chars[pos..end].iter().collect();
                let token = Token::keyword(&word).unwrap_or(Token::Identifier(word));
                (token, end - pos)
            }
            '=' if peek == Some('=') => (Token::Eq, 2),
            '!' if peek == Some('=') => (Token::Ne, 2),
            '<' if peek == Some('=') => (Token::Le, 2),
            '>' if peek == Some('=') => (Token::Ge, 2),
            '&' if peek == Some('&') => (Token::And, 2),
            '|' if peek == Some('|') => (Token::Or, 2),
            '!' => (Token::Not, 1),
            '<' => (Token::Lt, 1),
            '>' => (Token::Gt, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '*' => (Token::Star, 1),
            '/' => (Token::Slash, 1),
            '%' => (Token::Percent, 1),
            '?' => (Token::Question, 1),
            ':' => (Token::Colon, 1),
            '.' => (Token::Dot, 1),
            ',' => (Token::Comma, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            other => {
                return Err(ElError::syntax(
                    source,
                    start,
                    format!("Encountered \"{}\"", other),
                ))
            }
        };
        tokens.push(Positioned { token, offset: start });
        pos += len;
    }

    tokens.push(Positioned {
        token: Token::Eof,
        offset: chars.len(),
    });
    Ok(tokens)
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Quoted string with `\\`, `\'` and `\"` escapes
fn string_literal(chars: &[char], start: usize, source: &str) -> Result<(String, usize), ElError> {
    let quote = chars[start];
    let mut text = String::new();
    let mut pos = start + 1;
    while pos < chars.len() {
        match chars[pos] {
            '\\' => match chars.get(pos + 1) {
                Some(c @ ('\\' | '\'' | '"')) => {
                    text.push(*c);
                    pos += 2;
                }
                _ => {
                    return Err(ElError::syntax(source, pos, "Invalid escape in string literal"))
                }
            },
            c if c == quote => return Ok((text, pos + 1 - start)),
            c => {
                text.push(c);
                pos += 1;
            }
        }
    }
    Err(ElError::syntax(source, start, "Unterminated string literal"))
}

fn number(chars: &[char], start: usize) -> (Token, usize) {
    let mut pos = start;
    let mut is_float = false;
    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos < chars.len() && chars[pos] == '.' && chars.get(pos + 1).map_or(true, |c| c.is_ascii_digit() || !is_identifier_start(*c)) {
        is_float = true;
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
        let mut exp = pos + 1;
        if exp < chars.len() && (chars[exp] == '+' || chars[exp] == '-') {
            exp += 1;
        }
        if exp < chars.len() && chars[exp].is_ascii_digit() {
            is_float = true;
            pos = exp;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    let text: String = chars[start..pos].iter().collect();
    let token = if is_float {
        Token::Float(text)
    } else {
        Token::Integer(text)
    };
    (token, pos - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|p| p.token)
            .collect()
    }

    #[test]
    fn test_keywords_and_symbols() {
        assert_eq!(
            kinds("not empty a && b.c ge 1.5"),
            vec![
                Token::Not,
                Token::Empty,
                Token::Identifier("a".to_string()),
                Token::And,
                Token::Identifier("b".to_string()),
                Token::Dot,
                Token::Identifier("c".to_string()),
                Token::Ge,
                Token::Float("1.5".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "q\"""#),
            vec![
                Token::Str("it's".to_string()),
                Token::Str("q\"".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_function_tokens() {
        assert_eq!(
            kinds("fn:length(x)"),
            vec![
                Token::Identifier("fn".to_string()),
                Token::Colon,
                Token::Identifier("length".to_string()),
                Token::LParen,
                Token::Identifier("x".to_string()),
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_character() {
        assert!(tokenize("a ~ b").is_err());
        assert!(tokenize("'open").is_err());
    }
}
