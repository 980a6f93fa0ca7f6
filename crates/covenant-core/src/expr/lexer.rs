//! Tokenizer for contract expressions.

use std::fmt;

use super::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),

    // Keywords
    And,
    Or,
    Not,
    In,
    Is,
    If,
    Else,
    True,
    False,
    None,

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Int(i) => return write!(f, "number {}", i),
            Token::Float(x) => return write!(f, "number {}", x),
            Token::Str(s) => return write!(f, "string {:?}", s),
            Token::Name(n) => return write!(f, "name '{}'", n),
            Token::And => "'and'",
            Token::Or => "'or'",
            Token::Not => "'not'",
            Token::In => "'in'",
            Token::Is => "'is'",
            Token::If => "'if'",
            Token::Else => "'else'",
            Token::True => "'True'",
            Token::False => "'False'",
            Token::None => "'None'",
            Token::Plus => "'+'",
            Token::Minus => "'-'",
            Token::Star => "'*'",
            Token::DoubleStar => "'**'",
            Token::Slash => "'/'",
            Token::DoubleSlash => "'//'",
            Token::Percent => "'%'",
            Token::Lt => "'<'",
            Token::Le => "'<='",
            Token::Gt => "'>'",
            Token::Ge => "'>='",
            Token::EqEq => "'=='",
            Token::NotEq => "'!='",
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::LBracket => "'['",
            Token::RBracket => "']'",
            Token::Comma => "','",
            Token::Dot => "'.'",
            Token::Eof => "end of expression",
        };
        write!(f, "{}", text)
    }
}

/// A token with the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn keyword(word: &str) -> Option<Token> {
    let token = match word {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "in" => Token::In,
        "is" => Token::Is,
        "if" => Token::If,
        "else" => Token::Else,
        "True" => Token::True,
        "False" => Token::False,
        "None" => Token::None,
        _ => return None,
    };
    Some(token)
}

/// Split `src` into tokens. The result always ends with [`Token::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && next_is_digit(src, pos)) {
            let end = scan_number(src, pos);
            let text = &src[pos..end];
            let digits = text.replace('_', "");
            let token = if text.contains(['.', 'e', 'E']) {
                digits
                    .parse::<f64>()
                    .map(Token::Float)
                    .map_err(|_| invalid_number(text, pos))?
            } else {
                digits
                    .parse::<i64>()
                    .map(Token::Int)
                    .map_err(|_| invalid_number(text, pos))?
            };
            tokens.push(Spanned { token, pos });
            while chars.peek().is_some_and(|&(i, _)| i < end) {
                chars.next();
            }
            continue;
        }

        if ch.is_alphabetic() || ch == '_' {
            let mut end = pos;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let word = &src[pos..end];
            let token = keyword(word).unwrap_or_else(|| Token::Name(word.to_string()));
            tokens.push(Spanned { token, pos });
            continue;
        }

        if ch == '\'' || ch == '"' {
            chars.next();
            let value = scan_string(&mut chars, ch, pos)?;
            tokens.push(Spanned {
                token: Token::Str(value),
                pos,
            });
            continue;
        }

        chars.next();
        let next = chars.peek().map(|&(_, c)| c);
        let (token, width) = match (ch, next) {
            ('*', Some('*')) => (Token::DoubleStar, 2),
            ('/', Some('/')) => (Token::DoubleSlash, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            (',', _) => (Token::Comma, 1),
            ('.', _) => (Token::Dot, 1),
            _ => return Err(ExprError::UnexpectedChar { ch, pos }),
        };
        if width == 2 {
            chars.next();
        }
        tokens.push(Spanned { token, pos });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        pos: src.len(),
    });
    Ok(tokens)
}

fn invalid_number(text: &str, pos: usize) -> ExprError {
    ExprError::InvalidNumber {
        text: text.to_string(),
        pos,
    }
}

fn next_is_digit(src: &str, pos: usize) -> bool {
    src[pos + 1..].chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Byte offset just past the number literal starting at `start`.
fn scan_number(src: &str, start: usize) -> usize {
    let bytes = src.as_bytes();
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'_') {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            end = exp;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
    }
    end
}

fn scan_string(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, ExprError> {
    let mut value = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            c if c == quote => return Ok(value),
            '\\' => {
                let (_, escaped) = chars
                    .next()
                    .ok_or(ExprError::UnterminatedString { pos: start })?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                });
            }
            c => value.push(c),
        }
    }
    Err(ExprError::UnterminatedString { pos: start })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_comparison_and_arithmetic() {
        assert_eq!(
            kinds("a1 + a2 >= 10"),
            vec![
                Token::Name("a1".into()),
                Token::Plus,
                Token::Name("a2".into()),
                Token::Ge,
                Token::Int(10),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_strings() {
        assert_eq!(
            kinds("'MyNum' in result and not None"),
            vec![
                Token::Str("MyNum".into()),
                Token::In,
                Token::Name("result".into()),
                Token::And,
                Token::Not,
                Token::None,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1.5 2e3 7 .5 1_000"),
            vec![
                Token::Float(1.5),
                Token::Float(2000.0),
                Token::Int(7),
                Token::Float(0.5),
                Token::Int(1000),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_attribute_access_is_not_a_float() {
        assert_eq!(
            kinds("result.i"),
            vec![
                Token::Name("result".into()),
                Token::Dot,
                Token::Name("i".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_errors_carry_offsets() {
        assert_eq!(
            tokenize("a $ b").unwrap_err(),
            ExprError::UnexpectedChar { ch: '$', pos: 2 }
        );
        assert_eq!(
            tokenize("x == 'abc").unwrap_err(),
            ExprError::UnterminatedString { pos: 5 }
        );
    }
}
