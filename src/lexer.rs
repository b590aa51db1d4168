//! Indentation-sensitive tokenizer and the one-token-lookahead cursor.
//!
//! Tokenization is lazy: each call to [`next_token`] classifies characters
//! pulled from the stream and produces exactly one token. Once the stream is
//! exhausted the tokenizer settles into an infinite run of `Eof`.

use crate::error::{CompileError, Result};
use crate::reserved;
use crate::stream::Stream;
use crate::token::{Token, TokenValue};

/// Number of consecutive spaces that form one indentation step.
pub const INDENTATION_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Alphanumeric,
    Comment,
    Newline,
    Operator,
    Quote,
    Tab,
    Whitespace,
}

fn char_class(c: char) -> CharClass {
    if c.is_ascii_alphanumeric() || c == '_' {
        CharClass::Alphanumeric
    } else if c == '#' {
        CharClass::Comment
    } else if c == '\n' {
        CharClass::Newline
    } else if c == '"' || c == '\'' {
        CharClass::Quote
    } else if c == '\t' {
        CharClass::Tab
    } else if c.is_whitespace() {
        CharClass::Whitespace
    } else {
        CharClass::Operator
    }
}

/// Decode the character following a backslash in a string literal.
/// Unrecognized escapes pass the character through unchanged.
fn unescape(c: char) -> char {
    match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

/// Consume a `#` comment up to, but not including, the terminating newline.
fn skip_comment(stream: &mut Stream) {
    while let Some(c) = stream.pop() {
        if c == '\n' {
            stream.push(c);
            break;
        }
    }
}

/// Accumulate a word of `[A-Za-z0-9._]` and classify it as a keyword, an
/// integer literal or an identifier.
fn lex_word(stream: &mut Stream) -> Result<Token> {
    let location = stream.location();
    let mut word = String::new();
    let mut first_is_digit = false;
    let mut is_number = true;

    while let Some(c) = stream.pop() {
        if !(char_class(c) == CharClass::Alphanumeric || c == '.' || c == '_') {
            stream.push(c);
            break;
        }
        if word.is_empty() {
            first_is_digit = c.is_ascii_digit();
        }
        if !c.is_ascii_digit() && c != '.' {
            is_number = false;
        }
        if !is_number && c == '.' {
            // A member access follows the identifier.
            stream.push(c);
            break;
        }
        word.push(c);
    }

    if first_is_digit && !is_number {
        return Err(CompileError::parsing(location, "An identifier cannot start with a number"));
    }

    if let Some(token) = reserved::keyword(&word) {
        return Ok(Token::new(TokenValue::Reserved(token), location));
    }

    if first_is_digit {
        let value: i64 = word
            .parse()
            .map_err(|_| CompileError::parsing(location, "Invalid number"))?;
        return Ok(Token::new(TokenValue::Number(value), location));
    }

    Ok(Token::new(TokenValue::Identifier(word), location))
}

/// Lex a string literal. The opening quote has already been consumed; the
/// literal ends at the matching quote character.
fn lex_string(stream: &mut Stream, quote: char, location: crate::stream::Location) -> Result<Token> {
    let mut value = String::new();
    let mut escaped = false;

    while let Some(c) = stream.pop() {
        if escaped {
            value.push(unescape(c));
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok(Token::new(TokenValue::Str(value), location));
        } else {
            value.push(c);
        }
    }

    Err(CompileError::parsing(stream.location(), "Missing closing quote"))
}

/// Produce the next token, advancing the stream.
pub fn next_token(stream: &mut Stream) -> Result<Token> {
    let mut consecutive_spaces = 0usize;

    loop {
        let location = stream.location();
        let Some(c) = stream.pop() else { break };
        match char_class(c) {
            CharClass::Alphanumeric => {
                stream.push(c);
                return lex_word(stream);
            }
            CharClass::Comment => {
                consecutive_spaces = 0;
                skip_comment(stream);
            }
            CharClass::Newline => {
                return Ok(Token::new(TokenValue::Newline, location));
            }
            CharClass::Tab => {
                return Ok(Token::new(TokenValue::Indentation, location));
            }
            CharClass::Quote => {
                return lex_string(stream, c, location);
            }
            CharClass::Whitespace => {
                consecutive_spaces += 1;
                if consecutive_spaces == INDENTATION_WIDTH {
                    return Ok(Token::new(TokenValue::Indentation, location));
                }
            }
            CharClass::Operator => {
                stream.push(c);
                match reserved::match_operator(stream) {
                    Some(op) => return Ok(Token::new(TokenValue::Reserved(op), location)),
                    None => return Err(CompileError::parsing(location, "Unknown token")),
                }
            }
        }
    }

    Ok(Token::new(TokenValue::Eof, stream.location()))
}

/// Pull-model cursor over the token sequence with one token of lookahead.
///
/// Consumers that need to look further ahead snapshot the cursor by value
/// (`Clone`) and restore it by assignment.
#[derive(Clone)]
pub struct TokenCursor<'a> {
    stream: Stream<'a>,
    current: Token,
}

impl<'a> TokenCursor<'a> {
    pub fn new(mut stream: Stream<'a>) -> Result<Self> {
        let current = next_token(&mut stream)?;
        Ok(TokenCursor { stream, current })
    }

    /// Current token, without advancing.
    pub fn peek(&self) -> &Token {
        &self.current
    }

    /// Move to the next token.
    pub fn advance(&mut self) -> Result<()> {
        self.current = next_token(&mut self.stream)?;
        Ok(())
    }
}

/// Tokenize a source text into a cursor positioned at the first token.
pub fn tokenize(source: &str) -> Result<TokenCursor> {
    TokenCursor::new(Stream::new(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reserved::ReservedToken::*;

    fn collect(source: &str) -> Vec<TokenValue> {
        let mut stream = Stream::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = next_token(&mut stream).expect("tokenizes");
            let eof = token.is_eof();
            tokens.push(token.value);
            if eof {
                break;
            }
        }
        tokens
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            collect("let balance"),
            vec![
                TokenValue::Reserved(KwLet),
                TokenValue::Identifier("balance".to_string()),
                TokenValue::Eof,
            ]
        );
    }

    #[test]
    fn numbers_parse_as_integers() {
        assert_eq!(
            collect("42"),
            vec![TokenValue::Number(42), TokenValue::Eof]
        );
    }

    #[test]
    fn identifier_starting_with_digit_is_an_error() {
        let mut stream = Stream::new("1abc");
        let error = next_token(&mut stream).unwrap_err();
        assert_eq!(error.message, "An identifier cannot start with a number");
        assert_eq!(error.location.line, 1);
        assert_eq!(error.location.column, 1);
    }

    #[test]
    fn four_spaces_emit_one_indentation() {
        assert_eq!(
            collect("    pass"),
            vec![
                TokenValue::Indentation,
                TokenValue::Reserved(KwPass),
                TokenValue::Eof,
            ]
        );
    }

    #[test]
    fn tab_emits_indentation_directly() {
        assert_eq!(
            collect("\tpass"),
            vec![
                TokenValue::Indentation,
                TokenValue::Reserved(KwPass),
                TokenValue::Eof,
            ]
        );
    }

    #[test]
    fn fewer_spaces_reset_on_other_class() {
        assert_eq!(
            collect("   x"),
            vec![TokenValue::Identifier("x".to_string()), TokenValue::Eof]
        );
    }

    #[test]
    fn comment_consumes_to_newline() {
        assert_eq!(
            collect("# a comment\nx"),
            vec![
                TokenValue::Newline,
                TokenValue::Identifier("x".to_string()),
                TokenValue::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes_decode() {
        assert_eq!(
            collect(r#""a\tb\nc\\d""#),
            vec![TokenValue::Str("a\tb\nc\\d".to_string()), TokenValue::Eof]
        );
    }

    #[test]
    fn single_quoted_string_closes_on_single_quote() {
        assert_eq!(
            collect("'foo'"),
            vec![TokenValue::Str("foo".to_string()), TokenValue::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut stream = Stream::new("\"abc");
        let error = next_token(&mut stream).unwrap_err();
        assert_eq!(error.message, "Missing closing quote");
    }

    #[test]
    fn unknown_operator_is_an_error() {
        let mut stream = Stream::new("$");
        let error = next_token(&mut stream).unwrap_err();
        assert_eq!(error.message, "Unknown token");
    }

    #[test]
    fn member_access_splits_identifier_and_dot() {
        assert_eq!(
            collect("self.sum"),
            vec![
                TokenValue::Identifier("self".to_string()),
                TokenValue::Reserved(OpDot),
                TokenValue::Identifier("sum".to_string()),
                TokenValue::Eof,
            ]
        );
    }

    #[test]
    fn eof_repeats_forever() {
        let mut stream = Stream::new("");
        assert!(next_token(&mut stream).unwrap().is_eof());
        assert!(next_token(&mut stream).unwrap().is_eof());
        assert!(next_token(&mut stream).unwrap().is_eof());
    }

    #[test]
    fn cursor_peeks_without_advancing() {
        let mut cursor = tokenize("let x").expect("tokenizes");
        assert!(cursor.peek().is_reserved(KwLet));
        assert!(cursor.peek().is_reserved(KwLet));
        cursor.advance().expect("advances");
        assert_eq!(cursor.peek().identifier(), Some("x"));
    }

    #[test]
    fn cursor_snapshot_restores_position() {
        let mut cursor = tokenize("a b c").expect("tokenizes");
        let snapshot = cursor.clone();
        cursor.advance().expect("advances");
        cursor.advance().expect("advances");
        assert_eq!(cursor.peek().identifier(), Some("c"));
        cursor = snapshot;
        assert_eq!(cursor.peek().identifier(), Some("a"));
    }
}
