use std::fmt::{self, Display, Formatter};

use once_cell::unsync::OnceCell;

use crate::error::{ErrorKind, ParseError};
use crate::parse_state::{ParseState, StringId};
use crate::token::{Token, TokenType};
use crate::tokenizer::Tokenizer;
use crate::util::{Code, Log};
use crate::value_types::{real_type_of, RealType};

/// Which bracketed structure the reader is currently inside. The root document
/// itself is not represented on the stack — it is an implicit, unbracketed
/// object, so `stack.is_empty()` means "at the top level".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Object,
    Array,
}

impl Display for ReaderState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Drives a [Tokenizer] through the object/array grammar, enforcing the
/// begin/end bracket discipline via an explicit state stack.
pub struct Reader<'c> {
    tokenizer: Tokenizer<'c>,
    current: ReaderState,
    stack: Vec<ReaderState>,
    debug: OnceCell<Log<&'static str>>,
}

impl<'c> Reader<'c> {
    pub fn new(code: &'c Code<'c>) -> Self {
        Self {
            tokenizer: Tokenizer::new(code),
            current: ReaderState::Object,
            stack: Vec::new(),
            debug: OnceCell::new(),
        }
    }

    pub fn set_log(&self, log: Log<&'static str>) -> Result<(), String> {
        self.debug
            .set(log)
            .map_err(|rejected| format!("Log label {} is already assigned.", rejected))
    }

    pub fn position(&self) -> usize {
        self.tokenizer.position()
    }

    fn error(&self, kind: ErrorKind, message: String) -> ParseError {
        ParseError::new(kind, message, self.position())
    }

    fn expect_state(&self, expected: ReaderState) -> Result<(), ParseError> {
        if self.current == expected {
            Ok(())
        } else {
            Err(self.error(
                ErrorKind::StateMismatchError,
                format!("expected reader state {} but found {}", expected, self.current),
            ))
        }
    }

    fn expect_token(&mut self, expected: TokenType) -> Result<Token, ParseError> {
        match self.tokenizer.next()? {
            Some(token) if token.kind == expected => Ok(token),
            Some(token) => Err(ParseError::new(
                ErrorKind::UnexpectedTokenError,
                format!("expected token {} but found {}", expected, token.kind),
                token.start,
            )),
            None => Err(self.error(
                ErrorKind::UnexpectedTokenError,
                format!("expected token {} but found end of input", expected),
            )),
        }
    }

    /// Enters a bracketed object, consuming its opening `{`.
    pub fn begin_read_object(&mut self) -> Result<(), ParseError> {
        self.expect_token(TokenType::OpenBracket)?;
        self.stack.push(self.current);
        self.current = ReaderState::Object;
        self.trace("begin object");
        Ok(())
    }

    /// Leaves a bracketed object. Does not itself consume a `}` token: the
    /// terminating bracket of a nested object is already consumed by the
    /// `next_property` call that reported the object as finished, so this
    /// call only pops the state stack. Matching `begin_read_object`/
    /// `end_read_object` calls therefore still correspond to exactly one `{`
    /// and one `}` in the source text between them.
    pub fn end_read_object(&mut self) -> Result<(), ParseError> {
        if self.current != ReaderState::Object {
            return Err(self.error(
                ErrorKind::StateMismatchError,
                format!("tried to end an object but state was {}", self.current),
            ));
        }
        let previous = self.stack.pop().ok_or_else(|| {
            self.error(
                ErrorKind::StateMismatchError,
                "end_read_object called without a matching begin_read_object".to_string(),
            )
        })?;
        self.current = previous;
        self.trace("end object");
        Ok(())
    }

    /// Enters a bracketed array, consuming its opening `{`.
    pub fn begin_read_array(&mut self) -> Result<(), ParseError> {
        self.expect_token(TokenType::OpenBracket)?;
        self.stack.push(self.current);
        self.current = ReaderState::Array;
        self.trace("begin array");
        Ok(())
    }

    /// Leaves a bracketed array. Unlike objects, `next_array_value` only
    /// peeks the terminating `}` (see its doc comment), so this call is the
    /// one that actually consumes it.
    pub fn end_read_array(&mut self) -> Result<(), ParseError> {
        self.expect_token(TokenType::CloseBracket)?;
        if self.current != ReaderState::Array {
            return Err(self.error(
                ErrorKind::StateMismatchError,
                format!("tried to end an array but state was {}", self.current),
            ));
        }
        let previous = self.stack.pop().ok_or_else(|| {
            self.error(
                ErrorKind::StateMismatchError,
                "end_read_array called without a matching begin_read_array".to_string(),
            )
        })?;
        self.current = previous;
        self.trace("end array");
        Ok(())
    }

    /// Advances to the next `key = value` pair. Returns `Ok(None)` when the
    /// current object has no more properties: at the root this means clean
    /// end of input, and for a nested object this means a `}` was just
    /// consumed on its behalf (see `end_read_object`).
    pub fn next_property(
        &mut self,
        state: &mut ParseState<'c>,
    ) -> Result<Option<(StringId, RealType)>, ParseError> {
        self.expect_state(ReaderState::Object)?;

        let token = match self.tokenizer.next()? {
            None => {
                return if self.stack.is_empty() {
                    Ok(None)
                } else {
                    Err(self.error(
                        ErrorKind::UnexpectedTokenError,
                        "unexpected end of input, expected '}' to close object".to_string(),
                    ))
                };
            }
            Some(token) => token,
        };

        if token.kind == TokenType::CloseBracket {
            return if self.stack.is_empty() {
                Err(ParseError::new(
                    ErrorKind::UnexpectedTokenError,
                    "unexpected '}' at top level".to_string(),
                    token.start,
                ))
            } else {
                Ok(None)
            };
        }

        if token.kind != TokenType::Identifier {
            return Err(ParseError::new(
                ErrorKind::UnexpectedTokenError,
                format!("expected an identifier but found {}", token.kind),
                token.start,
            ));
        }

        let key = state.add_str(self.tokenizer.segment_of(&token));
        self.expect_token(TokenType::Equals)?;

        let peeked = self.tokenizer.peek()?.ok_or_else(|| {
            self.error(
                ErrorKind::UnexpectedTokenError,
                "expected a property value but found end of input".to_string(),
            )
        })?;
        let real_type = real_type_of(peeked.kind).ok_or_else(|| {
            ParseError::new(
                ErrorKind::UnexpectedTokenError,
                format!("token {} cannot appear as a value", peeked.kind),
                peeked.start,
            )
        })?;

        self.trace("next property");
        Ok(Some((key, real_type)))
    }

    /// Reports the real type of the next array element without consuming it,
    /// or `Ok(None)` if the array is finished. The element itself must still
    /// be consumed by a subsequent `read_*` call — mirrors the source
    /// contract exactly, since the array closing bracket is only peeked here
    /// and is actually consumed by `end_read_array`.
    pub fn next_array_value(&mut self) -> Result<Option<RealType>, ParseError> {
        self.expect_state(ReaderState::Array)?;
        let peeked = match self.tokenizer.peek()? {
            None => {
                return Err(self.error(
                    ErrorKind::UnexpectedTokenError,
                    "unexpected end of input, expected '}' to close array".to_string(),
                ))
            }
            Some(token) => token,
        };
        if peeked.kind == TokenType::CloseBracket {
            return Ok(None);
        }
        let real_type = real_type_of(peeked.kind).ok_or_else(|| {
            ParseError::new(
                ErrorKind::UnexpectedTokenError,
                format!("token {} cannot appear as an array value", peeked.kind),
                peeked.start,
            )
        })?;
        Ok(Some(real_type))
    }

    fn parse_number<N: std::str::FromStr>(&self, token: &Token) -> Result<N, ParseError> {
        let segment = self.tokenizer.segment_of(token);
        segment.parse::<N>().map_err(|_| {
            ParseError::new(
                ErrorKind::InvalidNumberError,
                format!("'{}' is not a valid number for this field", segment),
                token.start,
            )
        })
    }

    pub fn read_integer(&mut self) -> Result<i32, ParseError> {
        let token = self.expect_token(TokenType::Number)?;
        self.parse_number(&token)
    }

    pub fn read_integer64(&mut self) -> Result<i64, ParseError> {
        let token = self.expect_token(TokenType::Number)?;
        self.parse_number(&token)
    }

    pub fn read_decimal(&mut self) -> Result<f32, ParseError> {
        let token = self.expect_token(TokenType::Number)?;
        self.parse_number(&token)
    }

    pub fn read_decimal64(&mut self) -> Result<f64, ParseError> {
        let token = self.expect_token(TokenType::Number)?;
        self.parse_number(&token)
    }

    pub fn read_string(&mut self, state: &mut ParseState<'c>) -> Result<StringId, ParseError> {
        let token = self.expect_token(TokenType::String)?;
        Ok(state.add_str(self.tokenizer.segment_of(&token)))
    }

    pub fn read_identifier(&mut self, state: &mut ParseState<'c>) -> Result<StringId, ParseError> {
        let token = self.expect_token(TokenType::Identifier)?;
        Ok(state.add_str(self.tokenizer.segment_of(&token)))
    }

    pub fn read_boolean(&mut self) -> Result<bool, ParseError> {
        let token = self.expect_token(TokenType::Boolean)?;
        Ok(self.tokenizer.segment_of(&token).as_bytes()[0] == b'y')
    }

    /// Peeks the next token as an identifier, failing if it isn't one.
    pub fn peek_identifier(&mut self, state: &mut ParseState<'c>) -> Result<StringId, ParseError> {
        match self.tokenizer.peek()? {
            Some(token) if token.kind == TokenType::Identifier => {
                Ok(state.add_str(self.tokenizer.segment_of(&token)))
            }
            Some(token) => Err(ParseError::new(
                ErrorKind::UnexpectedTokenError,
                format!("expected an identifier but found {}", token.kind),
                token.start,
            )),
            None => Err(self.error(
                ErrorKind::UnexpectedTokenError,
                "expected an identifier but found end of input".to_string(),
            )),
        }
    }

    /// Like `peek_identifier`, but returns `None` instead of erroring when the
    /// next token isn't an identifier, leaving the tokenizer untouched either way.
    pub fn try_peek_identifier(
        &mut self,
        state: &mut ParseState<'c>,
    ) -> Result<Option<StringId>, ParseError> {
        match self.tokenizer.peek()? {
            Some(token) if token.kind == TokenType::Identifier => {
                Ok(Some(state.add_str(self.tokenizer.segment_of(&token))))
            }
            _ => Ok(None),
        }
    }

    fn trace(&self, message: &str) {
        #[cfg(debug_assertions)]
        if let Some(log) = self.debug.get() {
            if log.order() >= Log::Default(()).order() {
                println!("[{}; Reader] {} at byte {}", log, message, self.position());
            }
        }
        #[cfg(not(debug_assertions))]
        let _ = message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_property_ends_root_at_clean_eof() {
        let text = "a = 1";
        let code = Code::from(text);
        let mut state = ParseState::new(text);
        let mut reader = Reader::new(&code);
        reader.next_property(&mut state).unwrap().unwrap();
        reader.read_integer().unwrap();
        assert!(reader.next_property(&mut state).unwrap().is_none());
    }

    #[test]
    fn nested_object_close_brace_is_consumed_exactly_once() {
        let text = "outer = { inner_a = 1 inner_b = \"x\" }";
        let code = Code::from(text);
        let mut state = ParseState::new(text);
        let mut reader = Reader::new(&code);

        let (_, real_type) = reader.next_property(&mut state).unwrap().unwrap();
        assert_eq!(real_type, RealType::ObjectOrArray);

        reader.begin_read_object().unwrap();
        let mut seen = Vec::new();
        while let Some((key, _)) = reader.next_property(&mut state).unwrap() {
            seen.push(state.lookup(key).unwrap().to_string());
            match seen.last().unwrap().as_str() {
                "inner_a" => {
                    reader.read_integer().unwrap();
                }
                "inner_b" => {
                    reader.read_string(&mut state).unwrap();
                }
                other => panic!("unexpected key {other}"),
            }
        }
        reader.end_read_object().unwrap();

        // the root object must still be cleanly exhausted afterwards
        assert!(reader.next_property(&mut state).unwrap().is_none());
        assert_eq!(seen, vec!["inner_a", "inner_b"]);
    }

    #[test]
    fn array_close_brace_is_peeked_then_consumed_by_end_read_array() {
        let text = "xs = { 1 2 3 }";
        let code = Code::from(text);
        let mut state = ParseState::new(text);
        let mut reader = Reader::new(&code);

        reader.next_property(&mut state).unwrap().unwrap();
        reader.begin_read_array().unwrap();
        let mut values = Vec::new();
        while reader.next_array_value().unwrap().is_some() {
            values.push(reader.read_integer().unwrap());
        }
        reader.end_read_array().unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
