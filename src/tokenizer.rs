use crate::error::{ErrorKind, ParseError};
use crate::token::{Token, TokenType};
use crate::util::Code;

/// Scans Clausewitz source text into a pull-based stream of [Token]s. Holds no
/// buffered lookahead of its own; `peek`/`peek_ahead` work by saving and
/// restoring `position` around an ordinary `next` call.
pub struct Tokenizer<'c> {
    code: &'c Code<'c>,
    position: usize,
}

impl<'c> Tokenizer<'c> {
    pub fn new(code: &'c Code<'c>) -> Self {
        let bytes = code.value;
        let position = if bytes.len() >= 3 && bytes[0] == 0xEF && bytes[1] == 0xBB && bytes[2] == 0xBF {
            3
        } else {
            0
        };
        Self { code, position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_done(&self) -> bool {
        self.position >= self.code.value.len()
    }

    /// Returns the source text covered by a token, excluding quotes for strings.
    pub fn segment_of(&self, token: &Token) -> &'c str {
        std::str::from_utf8(&self.code.value[token.start..token.start + token.length])
            .expect("token segment must fall on utf-8 boundaries of a validated source buffer")
    }

    pub fn next(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_whitespace_and_comments();
        if self.is_done() {
            return Ok(None);
        }

        let c = self.code.value[self.position];
        let token = match c {
            b'=' => Ok(self.single(TokenType::Equals)),
            b':' => Ok(self.single(TokenType::Colon)),
            b'{' => Ok(self.single(TokenType::OpenBracket)),
            b'}' => Ok(self.single(TokenType::CloseBracket)),
            b'>' => Ok(self.one_or_two(b'=', TokenType::GreaterThanEq, TokenType::GreaterThan)),
            b'<' => Ok(self.one_or_two(b'=', TokenType::LessThanEq, TokenType::LessThan)),
            b'?' => self.existence_check(),
            b'-' | b'0'..=b'9' => self.number(),
            b'"' => self.quoted_string(),
            b'_' | b'a'..=b'z' | b'A'..=b'Z' => Ok(self.identifier_or_boolean()),
            other => Err(self.error(
                ErrorKind::TokenizerError,
                format!("unexpected character '{}' in input", other as char),
            )),
        }?;

        Ok(Some(token))
    }

    pub fn peek(&mut self) -> Result<Option<Token>, ParseError> {
        let saved = self.position;
        let result = self.next();
        self.position = saved;
        result
    }

    /// Advances `offset` tokens ahead and reports the last one reached, restoring
    /// `position` afterwards regardless of outcome.
    pub fn peek_ahead(&mut self, offset: usize) -> Result<Option<Token>, ParseError> {
        let saved = self.position;
        let mut last = None;
        let mut err = None;
        for _ in 0..offset {
            match self.next() {
                Ok(Some(token)) => last = Some(token),
                Ok(None) => {
                    last = None;
                    break;
                }
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        self.position = saved;
        match err {
            Some(e) => Err(e),
            None => Ok(last),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        let bytes = self.code.value;
        loop {
            while self.position < bytes.len() && bytes[self.position].is_ascii_whitespace() {
                self.position += 1;
            }
            if self.position < bytes.len() && bytes[self.position] == b'#' {
                while self.position < bytes.len() && bytes[self.position] != b'\n' {
                    self.position += 1;
                }
                continue;
            }
            break;
        }
    }

    fn single(&mut self, kind: TokenType) -> Token {
        let start = self.position;
        self.position += 1;
        Token::new(kind, start, 1)
    }

    fn one_or_two(&mut self, second: u8, two_kind: TokenType, one_kind: TokenType) -> Token {
        let start = self.position;
        if self.code.value.get(self.position + 1) == Some(&second) {
            self.position += 2;
            Token::new(two_kind, start, 2)
        } else {
            self.position += 1;
            Token::new(one_kind, start, 1)
        }
    }

    fn existence_check(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        if self.code.value.get(self.position + 1) == Some(&b'=') {
            self.position += 2;
            Ok(Token::new(TokenType::ExistenceCheck, start, 2))
        } else {
            Err(self.error(ErrorKind::TokenizerError, "unexpected char '?'".to_string()))
        }
    }

    fn number(&mut self) -> Result<Token, ParseError> {
        let bytes = self.code.value;
        let start = self.position;
        let mut num_digits = if bytes[self.position] == b'-' { 0 } else { 1 };
        self.position += 1;
        let mut decimal_place: Option<usize> = None;

        while self.position < bytes.len() {
            match bytes[self.position] {
                b'.' => {
                    // 0.05.0, -.5, and .05 are all invalid
                    if decimal_place.is_some() || num_digits < 1 {
                        return Err(
                            self.error(ErrorKind::TokenizerError, "unexpected char '.'".to_string())
                        );
                    }
                    decimal_place = Some(self.position);
                }
                b'0'..=b'9' => num_digits += 1,
                _ => break,
            }
            self.position += 1;
        }

        // a bare '-' isn't a number, and neither is "15." with nothing after the point
        let trailing_digits_ok = decimal_place.map_or(true, |dot| self.position - dot >= 2);
        if num_digits < 1 || !trailing_digits_ok {
            return Err(
                self.error(ErrorKind::TokenizerError, "unexpected end of number".to_string())
            );
        }

        Ok(Token::new(TokenType::Number, start, self.position - start))
    }

    fn quoted_string(&mut self) -> Result<Token, ParseError> {
        let bytes = self.code.value;
        let quote_start = self.position;
        self.position += 1;
        while self.position < bytes.len() && bytes[self.position] != b'"' {
            self.position += 1;
        }
        if self.position >= bytes.len() {
            return Err(self.error(
                ErrorKind::TokenizerError,
                "unexpected end of file while reading string".to_string(),
            ));
        }
        let content_start = quote_start + 1;
        let length = self.position - content_start;
        self.position += 1; // consume closing quote
        Ok(Token::new(TokenType::String, content_start, length))
    }

    fn identifier_or_boolean(&mut self) -> Token {
        let bytes = self.code.value;
        let start = self.position;
        while self.position < bytes.len()
            && (bytes[self.position] == b'_' || bytes[self.position].is_ascii_alphanumeric())
        {
            self.position += 1;
        }
        let word = &bytes[start..self.position];
        let kind = if word == b"yes" || word == b"no" {
            TokenType::Boolean
        } else {
            TokenType::Identifier
        };
        Token::new(kind, start, self.position - start)
    }

    fn error(&self, kind: ErrorKind, message: String) -> ParseError {
        ParseError::new(kind, message, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(code: &Code) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(code);
        let mut out = Vec::new();
        while let Some(token) = tokenizer.next().unwrap() {
            out.push(token);
        }
        out
    }

    #[test]
    fn skips_bom_whitespace_and_comments() {
        let text = "\u{feff}  # a comment\nkey = 1\n";
        let code = Code::from(text);
        let toks = tokens(&code);
        assert_eq!(toks[0].kind, TokenType::Identifier);
        assert_eq!(code.value[toks[0].start..toks[0].end()], *b"key");
    }

    #[test]
    fn number_grammar_matches_adjacent_tokens() {
        let text = "a = -12.5 b = 7";
        let code = Code::from(text);
        let toks = tokens(&code);
        let numbers: Vec<_> = toks.iter().filter(|t| t.kind == TokenType::Number).collect();
        assert_eq!(numbers.len(), 2);
        let tokenizer = Tokenizer::new(&code);
        assert_eq!(tokenizer.segment_of(numbers[0]), "-12.5");
        assert_eq!(tokenizer.segment_of(numbers[1]), "7");
    }

    #[test]
    fn rejects_bare_decimal_point() {
        let text = "count = 15.";
        let code = Code::from(text);
        let mut tokenizer = Tokenizer::new(&code);
        tokenizer.next().unwrap(); // count
        tokenizer.next().unwrap(); // =
        let err = tokenizer.next().unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenizerError);
    }

    #[test]
    fn quoted_string_excludes_quotes() {
        let text = r#"name = "hello world""#;
        let code = Code::from(text);
        let toks = tokens(&code);
        let tokenizer = Tokenizer::new(&code);
        let string_token = toks.iter().find(|t| t.kind == TokenType::String).unwrap();
        assert_eq!(tokenizer.segment_of(string_token), "hello world");
    }

    #[test]
    fn boolean_literals_are_their_own_kind() {
        let text = "wrap_x = no other = yes";
        let code = Code::from(text);
        let toks = tokens(&code);
        let booleans: Vec<_> = toks.iter().filter(|t| t.kind == TokenType::Boolean).collect();
        assert_eq!(booleans.len(), 2);
    }

    #[test]
    fn peek_does_not_advance_position() {
        let text = "a = 1";
        let code = Code::from(text);
        let mut tokenizer = Tokenizer::new(&code);
        let peeked = tokenizer.peek().unwrap().unwrap();
        let next = tokenizer.next().unwrap().unwrap();
        assert_eq!(peeked.kind, next.kind);
        assert_eq!(peeked.start, next.start);
    }

    #[test]
    fn adjacent_identifiers_do_not_lose_a_byte() {
        let text = "a b c";
        let code = Code::from(text);
        let toks = tokens(&code);
        let tokenizer = Tokenizer::new(&code);
        let words: Vec<&str> = toks.iter().map(|t| tokenizer.segment_of(t)).collect();
        assert_eq!(words, vec!["a", "b", "c"]);
    }
}
