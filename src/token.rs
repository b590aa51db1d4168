//! Token values produced by the tokenizer.

use crate::reserved::ReservedToken;
use crate::stream::Location;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum TokenValue {
    Identifier(String),
    Number(i64),
    Str(String),
    Reserved(ReservedToken),
    Indentation,
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: TokenValue,
    pub location: Location,
}

impl Token {
    pub fn new(value: TokenValue, location: Location) -> Self {
        Token { value, location }
    }

    pub fn is_reserved(&self, token: ReservedToken) -> bool {
        self.value == TokenValue::Reserved(token)
    }

    pub fn reserved(&self) -> Option<ReservedToken> {
        match self.value {
            TokenValue::Reserved(token) => Some(token),
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_indentation(&self) -> bool {
        self.value == TokenValue::Indentation
    }

    pub fn is_newline(&self) -> bool {
        self.value == TokenValue::Newline
    }

    pub fn is_eof(&self) -> bool {
        self.value == TokenValue::Eof
    }

    /// Source text of the token, for the round-trip property. Synthetic
    /// tokens (indentation, newline, end of stream) render as empty.
    pub fn text(&self) -> String {
        match &self.value {
            TokenValue::Identifier(name) => name.clone(),
            TokenValue::Number(value) => value.to_string(),
            TokenValue::Str(value) => format!("\"{}\"", value),
            TokenValue::Reserved(token) => token.text().to_string(),
            TokenValue::Indentation | TokenValue::Newline | TokenValue::Eof => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reserved::ReservedToken;

    #[test]
    fn reserved_predicate_matches_kind() {
        let token = Token::new(TokenValue::Reserved(ReservedToken::KwIf), Location::default());
        assert!(token.is_reserved(ReservedToken::KwIf));
        assert!(!token.is_reserved(ReservedToken::KwElse));
        assert_eq!(token.reserved(), Some(ReservedToken::KwIf));
    }

    #[test]
    fn identifier_accessor_returns_name() {
        let token = Token::new(TokenValue::Identifier("balance".to_string()), Location::default());
        assert_eq!(token.identifier(), Some("balance"));
        assert_eq!(token.reserved(), None);
    }

    #[test]
    fn synthetic_tokens_render_empty() {
        assert_eq!(Token::new(TokenValue::Newline, Location::default()).text(), "");
        assert_eq!(Token::new(TokenValue::Eof, Location::default()).text(), "");
    }
}
