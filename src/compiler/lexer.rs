//! This module turns raw Jack source text into a stream of tokens.

use std::collections::VecDeque;
use std::str::Lines;

use crate::error::{Error, ErrorKind};
use crate::Result;

use super::token::{is_symbol, keyword_match, Token};

/// A `Tokenizer` produces tokens lazily, one source line at a time: an
/// internal queue is refilled from subsequent lines whenever it runs dry,
/// skipping blank and fully-commented lines transparently.
///
/// A block comment with no closing `*/` consumes the remainder of the
/// input.
#[derive(Debug)]
pub(super) struct Tokenizer<'a> {
    lines: Lines<'a>,
    /// Tokens scanned but not yet consumed.
    queue: VecDeque<Token>,
    /// 1-based number of the most recently scanned line.
    line: usize,
    in_block_comment: bool,
}

impl<'a> Tokenizer<'a> {
    pub(super) fn new(source: &'a str) -> Result<Self> {
        let mut tokenizer = Tokenizer {
            lines: source.lines(),
            queue: VecDeque::new(),
            line: 0,
            in_block_comment: false,
        };
        tokenizer.refill()?;
        Ok(tokenizer)
    }

    /// Pops the current token. Returns `None` once the input is exhausted.
    pub(super) fn next(&mut self) -> Result<Option<Token>> {
        let token = self.queue.pop_front();
        if self.queue.is_empty() {
            self.refill()?;
        }
        Ok(token)
    }

    /// Returns the current token without consuming it.
    pub(super) fn peek(&self) -> Option<&Token> {
        self.queue.front()
    }

    /// The 1-based number of the line most recently scanned, for error
    /// reporting.
    pub(super) fn line(&self) -> usize {
        self.line
    }

    /// Scans lines until at least one token is queued or the input ends.
    fn refill(&mut self) -> Result<()> {
        while self.queue.is_empty() {
            let line = match self.lines.next() {
                Some(line) => line,
                None => return Ok(()),
            };
            self.line += 1;
            self.scan_line(line)?;
        }
        Ok(())
    }

    /// Scans one line into the queue. Token boundaries are whitespace,
    /// reserved symbol characters, double-quoted regions, and maximal
    /// identifier or digit runs.
    fn scan_line(&mut self, line: &str) -> Result<()> {
        let bytes = line.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if self.in_block_comment {
                match line[i..].find("*/") {
                    Some(end) => {
                        i += end + 2;
                        self.in_block_comment = false;
                    }
                    None => return Ok(()),
                }
                continue;
            }
            let c = bytes[i] as char;
            if c.is_ascii_whitespace() {
                i += 1;
            } else if line[i..].starts_with("//") {
                return Ok(());
            } else if line[i..].starts_with("/*") {
                i += 2;
                self.in_block_comment = true;
            } else if is_symbol(c) {
                self.queue.push_back(Token::Symbol(c));
                i += 1;
            } else if c == '"' {
                let rest = &line[i + 1..];
                match rest.find('"') {
                    Some(end) => {
                        self.queue.push_back(Token::StrConst(rest[..end].to_string()));
                        i += end + 2;
                    }
                    None => return Err(self.error(ErrorKind::UnclosedString)),
                }
            } else if c.is_ascii_digit() {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let text = &line[start..i];
                let value = text
                    .parse::<u16>()
                    .ok()
                    .filter(|&value| value <= 32767)
                    .ok_or_else(|| self.error(ErrorKind::IntOutOfRange(text.to_string())))?;
                self.queue.push_back(Token::IntConst(value));
            } else if c.is_ascii_alphabetic() || c == '_' {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                let word = &line[start..i];
                let token = match keyword_match(word) {
                    Some(keyword) => Token::Keyword(keyword),
                    None => Token::Identifier(word.to_string()),
                };
                self.queue.push_back(token);
            } else {
                return Err(self.error(ErrorKind::InvalidCharacter(c)));
            }
        }
        Ok(())
    }

    fn error(&self, kind: ErrorKind) -> Error {
        Error::at_line(kind, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::super::token::Keyword;
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(source).unwrap();
        let mut tokens = Vec::new();
        while let Some(token) = tokenizer.next().unwrap() {
            tokens.push(token);
        }
        tokens
    }

    fn ident(name: &str) -> Token {
        Token::Identifier(name.to_string())
    }

    #[test]
    fn statement_tokens() {
        let expected = vec![
            Token::Keyword(Keyword::Let),
            ident("x"),
            Token::Symbol('='),
            Token::IntConst(100),
            Token::Symbol(';'),
        ];
        assert_eq!(tokens("let x = 100;"), expected);
    }

    #[test]
    fn symbols_split_identifier_runs() {
        let expected = vec![
            ident("a"),
            Token::Symbol('['),
            ident("i"),
            Token::Symbol(']'),
            Token::Symbol('+'),
            ident("b2"),
        ];
        assert_eq!(tokens("a[i]+b2"), expected);
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(tokens("Class"), vec![ident("Class")]);
        assert_eq!(tokens("class"), vec![Token::Keyword(Keyword::Class)]);
    }

    #[test]
    fn leading_underscore_identifier() {
        assert_eq!(tokens("_f"), vec![ident("_f")]);
    }

    #[test]
    fn string_constant_strips_quotes() {
        let expected = vec![
            Token::Keyword(Keyword::Return),
            Token::StrConst("hello there".to_string()),
            Token::Symbol(';'),
        ];
        assert_eq!(tokens("return \"hello there\";"), expected);
    }

    #[test]
    fn unclosed_string_is_an_error() {
        let err = Tokenizer::new("let s = \"oops;").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnclosedString));
    }

    #[test]
    fn integer_out_of_range_is_an_error() {
        let err = Tokenizer::new("let x = 32768;").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IntOutOfRange(_)));
    }

    #[test]
    fn line_comments_run_to_end_of_line() {
        let source = "let x = 1; // let y = 2;\nlet z = 3;";
        let expected = vec![
            Token::Keyword(Keyword::Let),
            ident("x"),
            Token::Symbol('='),
            Token::IntConst(1),
            Token::Symbol(';'),
            Token::Keyword(Keyword::Let),
            ident("z"),
            Token::Symbol('='),
            Token::IntConst(3),
            Token::Symbol(';'),
        ];
        assert_eq!(tokens(source), expected);
    }

    #[test]
    fn block_comment_within_a_line() {
        assert_eq!(tokens("a /* b */ c"), vec![ident("a"), ident("c")]);
    }

    #[test]
    fn block_comment_spans_lines() {
        let source = "a /* one\n two\n three */ b";
        assert_eq!(tokens(source), vec![ident("a"), ident("b")]);
    }

    #[test]
    fn blank_and_comment_only_lines_are_skipped() {
        let source = "\n// note\n\n/** doc */\nx";
        assert_eq!(tokens(source), vec![ident("x")]);
    }

    #[test]
    fn unterminated_block_comment_consumes_the_rest() {
        let source = "a /* never closed\nb\nc";
        assert_eq!(tokens(source), vec![ident("a")]);
    }

    #[test]
    fn line_numbers_track_scanned_lines() {
        let mut tokenizer = Tokenizer::new("a\n\nb").unwrap();
        assert_eq!(tokenizer.line(), 1);
        tokenizer.next().unwrap();
        assert_eq!(tokenizer.line(), 3);
    }
}
