//! Expression-query lexer.
//!
//! Tokenizes the restricted dialect. Anything outside it still lexes
//! where possible (`*:name`, unknown axes) so the parser and evaluator
//! can reject it with a precise message.

/// Expression token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Star,        // *
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or

    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,
    DoubleColon,  // ::

    Number(f64),
    Literal(String),

    /// NCName
    Name(String),
    /// prefix:local
    QName(String, String),
    /// prefix:*
    PrefixStar(String),
    /// *:local, which lexes fine and is rejected by the evaluator
    StarName(String),
    /// node() / text()
    NodeType(String),
    /// name followed by `::`
    Axis(String),

    /// Anything unrecognized; the parser reports it
    Unknown(char),

    Eof,
}

/// Expression lexer
#[derive(Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Token::Eof,
        };

        match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '.' => {
                self.advance(1);
                if self.peek() == Some('.') {
                    self.advance(1);
                    Token::DoubleDot
                } else {
                    Token::Dot
                }
            }
            '@' => {
                self.advance(1);
                Token::At
            }
            '|' => {
                self.advance(1);
                Token::Pipe
            }
            '*' => {
                self.advance(1);
                // `*:name` is a namespace-wildcard name test; lex it so
                // evaluation can reject it as unsupported rather than
                // tripping over a stray colon.
                if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
                    self.advance(1);
                    match self.read_ncname() {
                        Some(local) => Token::StarName(local.to_string()),
                        None => Token::Unknown(':'),
                    }
                } else {
                    Token::Star
                }
            }
            '=' => {
                self.advance(1);
                Token::Eq
            }
            '!' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::NotEq
                } else {
                    Token::Unknown('!')
                }
            }
            '<' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::LtEq
                } else {
                    Token::Lt
                }
            }
            '>' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '(' => {
                self.advance(1);
                Token::LeftParen
            }
            ')' => {
                self.advance(1);
                Token::RightParen
            }
            '[' => {
                self.advance(1);
                Token::LeftBracket
            }
            ']' => {
                self.advance(1);
                Token::RightBracket
            }
            ',' => {
                self.advance(1);
                Token::Comma
            }
            ':' => {
                self.advance(1);
                if self.peek() == Some(':') {
                    self.advance(1);
                    Token::DoubleColon
                } else {
                    Token::Unknown(':')
                }
            }
            '"' | '\'' => self.read_literal(),
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(c) => self.read_name_or_keyword(),
            _ => {
                self.advance(c.len_utf8());
                Token::Unknown(c)
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance(1);
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.advance(1);
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance(1);
                } else {
                    break;
                }
            }
        }
        let value = self.input[start..self.pos].parse().unwrap_or(f64::NAN);
        Token::Number(value)
    }

    fn read_literal(&mut self) -> Token {
        // peek() matched a quote char in next_token.
        let quote = self.peek().unwrap_or('"');
        self.advance(1);
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                break;
            }
            self.advance(c.len_utf8());
        }
        let value = self.input[start..self.pos].to_string();
        self.advance(1);
        Token::Literal(value)
    }

    fn read_ncname(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_name_start_char(c) => self.advance(c.len_utf8()),
            _ => return None,
        }
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        Some(&self.input[start..self.pos])
    }

    fn read_name_or_keyword(&mut self) -> Token {
        let name = match self.read_ncname() {
            Some(name) => name,
            None => return Token::Eof,
        };

        match name {
            "and" => Token::And,
            "or" => Token::Or,
            _ => {
                if self.remaining().starts_with("::") {
                    return Token::Axis(name.to_string());
                }
                if self.peek() == Some('(') {
                    return match name {
                        "node" | "text" => Token::NodeType(name.to_string()),
                        _ => Token::Name(name.to_string()),
                    };
                }
                if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
                    self.advance(1);
                    if self.peek() == Some('*') {
                        self.advance(1);
                        return Token::PrefixStar(name.to_string());
                    }
                    return match self.read_ncname() {
                        Some(local) => Token::QName(name.to_string(), local.to_string()),
                        None => Token::Unknown(':'),
                    };
                }
                Token::Name(name.to_string())
            }
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if matches!(token, Token::Eof) {
                break;
            }
            tokens.push(token);
        }
        tokens
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        let mut lexer = Lexer::new("/root/child");
        assert_eq!(lexer.next_token(), Token::Slash);
        assert_eq!(lexer.next_token(), Token::Name("root".to_string()));
        assert_eq!(lexer.next_token(), Token::Slash);
        assert_eq!(lexer.next_token(), Token::Name("child".to_string()));
        assert_eq!(lexer.next_token(), Token::Eof);
    }

    #[test]
    fn test_descendant_and_qname() {
        let mut lexer = Lexer::new("//ex:foo");
        assert_eq!(lexer.next_token(), Token::DoubleSlash);
        assert_eq!(
            lexer.next_token(),
            Token::QName("ex".to_string(), "foo".to_string())
        );
    }

    #[test]
    fn test_star_name() {
        let mut lexer = Lexer::new("//*:foo");
        assert_eq!(lexer.next_token(), Token::DoubleSlash);
        assert_eq!(lexer.next_token(), Token::StarName("foo".to_string()));
    }

    #[test]
    fn test_predicate_with_function() {
        let tokens = Lexer::new("*[local-name(.) = \"foo\"]").tokenize();
        assert_eq!(
            tokens,
            vec![
                Token::Star,
                Token::LeftBracket,
                Token::Name("local-name".to_string()),
                Token::LeftParen,
                Token::Dot,
                Token::RightParen,
                Token::Eq,
                Token::Literal("foo".to_string()),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_axis() {
        let mut lexer = Lexer::new("child::item");
        assert_eq!(lexer.next_token(), Token::Axis("child".to_string()));
        assert_eq!(lexer.next_token(), Token::DoubleColon);
        assert_eq!(lexer.next_token(), Token::Name("item".to_string()));
    }

    #[test]
    fn test_number_and_literal() {
        let tokens = Lexer::new("[2] 'str'").tokenize();
        assert_eq!(
            tokens,
            vec![
                Token::LeftBracket,
                Token::Number(2.0),
                Token::RightBracket,
                Token::Literal("str".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_char() {
        let mut lexer = Lexer::new("$var");
        assert_eq!(lexer.next_token(), Token::Unknown('$'));
    }
}
