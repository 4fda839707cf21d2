use crate::parser::ParserError;
use crate::span::Span;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// An integer literal, digits only.
    Integer(String),
    /// A decimal literal containing a point.
    Decimal(String),
    /// A double literal with an exponent.
    Double(f64),
    /// A string literal, quote-doubling already resolved.
    StringLit(String),
    /// An NCName or prefixed QName.
    Name {
        prefix: Option<String>,
        local: String,
    },
    /// `*:local`
    LocalWildcard(String),
    /// `prefix:*`
    PrefixWildcard(String),
    /// `*`, either a wildcard or multiplication depending on context.
    Star,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    DotDot,
    At,
    Dollar,
    Pipe,
    Plus,
    Minus,
    Slash,
    DoubleSlash,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Precedes,
    Follows,
    DoubleColon,
    Assign,
    Question,
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// The XPath lexer. Keywords are not distinguished here; the parser
/// interprets names contextually, as the grammar requires.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Tokenize the whole source.
    pub fn tokenize(source: &'a str) -> Result<Vec<Token>, ParserError> {
        let mut lexer = Lexer {
            source,
            chars: source.char_indices().collect(),
            position: 0,
        };
        let mut tokens = Vec::new();
        loop {
            lexer.skip_trivia()?;
            match lexer.next_token()? {
                Some(token) => tokens.push(token),
                None => break,
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).map(|(_, c)| *c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.position + ahead).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.position)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source.len())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn skip_trivia(&mut self) -> Result<(), ParserError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('(') if self.peek_at(1) == Some(':') => {
                    self.skip_comment()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), ParserError> {
        let start = self.offset();
        self.bump();
        self.bump();
        let mut depth = 1;
        while depth > 0 {
            match (self.peek(), self.peek_at(1)) {
                (Some('('), Some(':')) => {
                    self.bump();
                    self.bump();
                    depth += 1;
                }
                (Some(':'), Some(')')) => {
                    self.bump();
                    self.bump();
                    depth -= 1;
                }
                (Some(_), _) => {
                    self.bump();
                }
                (None, _) => {
                    return Err(ParserError::UnclosedComment {
                        span: Span::new(start, self.source.len()),
                    })
                }
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParserError> {
        let start = self.offset();
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(None),
        };
        let kind = match c {
            '0'..='9' => return self.number(start).map(Some),
            '.' => {
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    return self.number(start).map(Some);
                }
                self.bump();
                if self.peek() == Some('.') {
                    self.bump();
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            '\'' | '"' => return self.string_literal(start, c).map(Some),
            '(' => {
                self.bump();
                TokenKind::LeftParen
            }
            ')' => {
                self.bump();
                TokenKind::RightParen
            }
            '[' => {
                self.bump();
                TokenKind::LeftBracket
            }
            ']' => {
                self.bump();
                TokenKind::RightBracket
            }
            ',' => {
                self.bump();
                TokenKind::Comma
            }
            '@' => {
                self.bump();
                TokenKind::At
            }
            '$' => {
                self.bump();
                TokenKind::Dollar
            }
            '|' => {
                self.bump();
                TokenKind::Pipe
            }
            '+' => {
                self.bump();
                TokenKind::Plus
            }
            '-' => {
                self.bump();
                TokenKind::Minus
            }
            '?' => {
                self.bump();
                TokenKind::Question
            }
            '/' => {
                self.bump();
                if self.peek() == Some('/') {
                    self.bump();
                    TokenKind::DoubleSlash
                } else {
                    TokenKind::Slash
                }
            }
            '=' => {
                self.bump();
                TokenKind::Equal
            }
            '!' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::NotEqual
                } else {
                    return Err(ParserError::UnexpectedCharacter {
                        character: '!',
                        span: Span::new(start, self.offset()),
                    });
                }
            }
            '<' => {
                self.bump();
                match self.peek() {
                    Some('=') => {
                        self.bump();
                        TokenKind::LessEqual
                    }
                    Some('<') => {
                        self.bump();
                        TokenKind::Precedes
                    }
                    _ => TokenKind::LessThan,
                }
            }
            '>' => {
                self.bump();
                match self.peek() {
                    Some('=') => {
                        self.bump();
                        TokenKind::GreaterEqual
                    }
                    Some('>') => {
                        self.bump();
                        TokenKind::Follows
                    }
                    _ => TokenKind::GreaterThan,
                }
            }
            ':' => {
                self.bump();
                match self.peek() {
                    Some(':') => {
                        self.bump();
                        TokenKind::DoubleColon
                    }
                    Some('=') => {
                        self.bump();
                        TokenKind::Assign
                    }
                    _ => {
                        return Err(ParserError::UnexpectedCharacter {
                            character: ':',
                            span: Span::new(start, self.offset()),
                        });
                    }
                }
            }
            '*' => {
                self.bump();
                if self.peek() == Some(':') && self.peek_at(1).is_some_and(is_name_start) {
                    self.bump();
                    let local = self.ncname();
                    TokenKind::LocalWildcard(local)
                } else {
                    TokenKind::Star
                }
            }
            c if is_name_start(c) => {
                let first = self.ncname();
                // a single colon joins prefix and local part; a double colon
                // is the axis separator and stays separate
                if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
                    match self.peek_at(1) {
                        Some('*') => {
                            self.bump();
                            self.bump();
                            TokenKind::PrefixWildcard(first)
                        }
                        Some(c) if is_name_start(c) => {
                            self.bump();
                            let local = self.ncname();
                            TokenKind::Name {
                                prefix: Some(first),
                                local,
                            }
                        }
                        _ => TokenKind::Name {
                            prefix: None,
                            local: first,
                        },
                    }
                } else {
                    TokenKind::Name {
                        prefix: None,
                        local: first,
                    }
                }
            }
            other => {
                return Err(ParserError::UnexpectedCharacter {
                    character: other,
                    span: Span::new(start, self.offset() + other.len_utf8()),
                })
            }
        };
        Ok(Some(Token {
            kind,
            span: Span::new(start, self.offset()),
        }))
    }

    fn ncname(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_name_continue(c) {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    fn number(&mut self, start: usize) -> Result<Token, ParserError> {
        let mut text = String::new();
        let mut seen_point = false;
        let mut seen_exponent = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {
                    text.push(c);
                    self.bump();
                }
                '.' if !seen_point && !seen_exponent => {
                    // a second dot belongs to a following range or path
                    if self.peek_at(1) == Some('.') {
                        break;
                    }
                    seen_point = true;
                    text.push(c);
                    self.bump();
                }
                'e' | 'E' if !seen_exponent => {
                    seen_exponent = true;
                    text.push(c);
                    self.bump();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        text.push(sign);
                        self.bump();
                    }
                }
                _ => break,
            }
        }
        let span = Span::new(start, self.offset());
        let kind = if seen_exponent {
            let value = text
                .parse::<f64>()
                .map_err(|_| ParserError::InvalidNumber {
                    text: text.clone(),
                    span,
                })?;
            TokenKind::Double(value)
        } else if seen_point {
            TokenKind::Decimal(text)
        } else {
            TokenKind::Integer(text)
        };
        Ok(Token { kind, span })
    }

    fn string_literal(&mut self, start: usize, quote: char) -> Result<Token, ParserError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    self.bump();
                    // a doubled quote is an escaped quote
                    if self.peek() == Some(quote) {
                        value.push(quote);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
                None => {
                    return Err(ParserError::UnclosedString {
                        span: Span::new(start, self.source.len()),
                    })
                }
            }
        }
        Ok(Token {
            kind: TokenKind::StringLit(value),
            span: Span::new(start, self.offset()),
        })
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 .5 3e2"),
            vec![
                TokenKind::Integer("1".to_string()),
                TokenKind::Decimal("2.5".to_string()),
                TokenKind::Decimal(".5".to_string()),
                TokenKind::Double(300.0),
            ]
        );
    }

    #[test]
    fn test_range_after_integer() {
        assert_eq!(
            kinds("1..2"),
            vec![
                TokenKind::Integer("1".to_string()),
                TokenKind::DotDot,
                TokenKind::Integer("2".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_doubling() {
        assert_eq!(
            kinds(r#""a""b" 'c''d'"#),
            vec![
                TokenKind::StringLit("a\"b".to_string()),
                TokenKind::StringLit("c'd".to_string()),
            ]
        );
    }

    #[test]
    fn test_axis_not_prefixed_name() {
        assert_eq!(
            kinds("child::foo"),
            vec![
                TokenKind::Name {
                    prefix: None,
                    local: "child".to_string()
                },
                TokenKind::DoubleColon,
                TokenKind::Name {
                    prefix: None,
                    local: "foo".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_qname_and_wildcards() {
        assert_eq!(
            kinds("a:b *:c d:*"),
            vec![
                TokenKind::Name {
                    prefix: Some("a".to_string()),
                    local: "b".to_string()
                },
                TokenKind::LocalWildcard("c".to_string()),
                TokenKind::PrefixWildcard("d".to_string()),
            ]
        );
    }

    #[test]
    fn test_nested_comment() {
        assert_eq!(kinds("1 (: outer (: inner :) still :) 2").len(), 2);
    }

    #[test]
    fn test_node_comparisons() {
        assert_eq!(
            kinds("<< >> != <="),
            vec![
                TokenKind::Precedes,
                TokenKind::Follows,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
            ]
        );
    }
}
