//! Reserved keyword and operator tables.
//!
//! Both tables are sorted lexicographically. Keyword lookup is an exact
//! match; operator lookup runs a maximal-munch scan over the stream, keeping
//! the candidate range narrowed by binary search as each character arrives
//! and pushing any overrun characters back onto the stream.

use crate::stream::Stream;

/// Every reserved token of the language, keywords and operators alike.
/// The set is closed; each variant has exactly one canonical text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ReservedToken {
    // Keywords
    KwFalse,
    KwNone,
    KwTrue,
    KwAddress,
    KwAnd,
    KwAssert,
    KwBool,
    KwContract,
    KwDef,
    KwElif,
    KwElse,
    KwI8,
    KwI16,
    KwI32,
    KwI64,
    KwIf,
    KwImport,
    KwIn,
    KwIs,
    KwLet,
    KwNot,
    KwNum,
    KwOr,
    KwPass,
    KwReturn,
    KwStr,
    KwU8,
    KwU16,
    KwU32,
    KwU64,
    KwWhile,

    // Operators
    OpLogicalNot,
    OpNotEqual,
    OpMod,
    OpAssignMod,
    OpBitwiseAnd,
    OpLogicalAnd,
    OpAssignBitwiseAnd,
    OpParenOpen,
    OpParenClose,
    OpMul,
    OpExp,
    OpAssignExp,
    OpAssignMul,
    OpAdd,
    OpAssignAdd,
    OpComma,
    OpSub,
    OpAssignSub,
    OpArrow,
    OpDot,
    OpDiv,
    OpFloorDiv,
    OpAssignFloorDiv,
    OpAssignDiv,
    OpColon,
    OpLessThan,
    OpShiftLeft,
    OpAssignShiftLeft,
    OpLessThanEqual,
    OpAssign,
    OpEqual,
    OpGreaterThan,
    OpGreaterThanEqual,
    OpShiftRight,
    OpAssignShiftRight,
    OpSubscriptOpen,
    OpSubscriptClose,
    OpBitwiseXor,
    OpAssignBitwiseXor,
    OpBitwiseOr,
    OpAssignBitwiseOr,
    OpLogicalOr,
    OpBitwiseNot,
}

use ReservedToken::*;

/// Sorted keyword table.
pub static KEYWORDS: [(&str, ReservedToken); 31] = [
    ("False", KwFalse),
    ("None", KwNone),
    ("True", KwTrue),
    ("address", KwAddress),
    ("and", KwAnd),
    ("assert", KwAssert),
    ("bool", KwBool),
    ("contract", KwContract),
    ("def", KwDef),
    ("elif", KwElif),
    ("else", KwElse),
    ("i16", KwI16),
    ("i32", KwI32),
    ("i64", KwI64),
    ("i8", KwI8),
    ("if", KwIf),
    ("import", KwImport),
    ("in", KwIn),
    ("is", KwIs),
    ("let", KwLet),
    ("not", KwNot),
    ("num", KwNum),
    ("or", KwOr),
    ("pass", KwPass),
    ("return", KwReturn),
    ("str", KwStr),
    ("u16", KwU16),
    ("u32", KwU32),
    ("u64", KwU64),
    ("u8", KwU8),
    ("while", KwWhile),
];

/// Sorted operator table.
pub static OPERATORS: [(&str, ReservedToken); 43] = [
    ("!", OpLogicalNot),
    ("!=", OpNotEqual),
    ("%", OpMod),
    ("%=", OpAssignMod),
    ("&", OpBitwiseAnd),
    ("&&", OpLogicalAnd),
    ("&=", OpAssignBitwiseAnd),
    ("(", OpParenOpen),
    (")", OpParenClose),
    ("*", OpMul),
    ("**", OpExp),
    ("**=", OpAssignExp),
    ("*=", OpAssignMul),
    ("+", OpAdd),
    ("+=", OpAssignAdd),
    (",", OpComma),
    ("-", OpSub),
    ("-=", OpAssignSub),
    ("->", OpArrow),
    (".", OpDot),
    ("/", OpDiv),
    ("//", OpFloorDiv),
    ("//=", OpAssignFloorDiv),
    ("/=", OpAssignDiv),
    (":", OpColon),
    ("<", OpLessThan),
    ("<<", OpShiftLeft),
    ("<<=", OpAssignShiftLeft),
    ("<=", OpLessThanEqual),
    ("=", OpAssign),
    ("==", OpEqual),
    (">", OpGreaterThan),
    (">=", OpGreaterThanEqual),
    (">>", OpShiftRight),
    (">>=", OpAssignShiftRight),
    ("[", OpSubscriptOpen),
    ("]", OpSubscriptClose),
    ("^", OpBitwiseXor),
    ("^=", OpAssignBitwiseXor),
    ("|", OpBitwiseOr),
    ("|=", OpAssignBitwiseOr),
    ("||", OpLogicalOr),
    ("~", OpBitwiseNot),
];

impl ReservedToken {
    /// Canonical source text of the token, for error messages.
    pub fn text(self) -> &'static str {
        KEYWORDS
            .iter()
            .chain(OPERATORS.iter())
            .find(|(_, token)| *token == self)
            .map(|(text, _)| *text)
            .unwrap_or("")
    }

    pub fn is_type_specifier(self) -> bool {
        matches!(
            self,
            KwAddress | KwBool | KwNum | KwStr | KwI8 | KwI16 | KwI32 | KwI64 | KwU8 | KwU16 | KwU32 | KwU64
        )
    }
}

impl std::fmt::Display for ReservedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// Exact keyword lookup. `None` when the word is not reserved.
pub fn keyword(word: &str) -> Option<ReservedToken> {
    KEYWORDS
        .binary_search_by(|(text, _)| (*text).cmp(word))
        .ok()
        .map(|index| KEYWORDS[index].1)
}

/// Maximal-munch operator matcher.
///
/// Consumes characters from the stream one at a time, narrowing the sorted
/// operator table to the entries whose prefix matches what has been read so
/// far. Whenever the narrowed range starts with an entry of exactly the
/// consumed length, that entry is recorded as the longest match. Characters
/// read past the final match are pushed back.
pub fn match_operator(stream: &mut Stream) -> Option<ReservedToken> {
    let mut lo = 0usize;
    let mut hi = OPERATORS.len();
    let mut consumed: Vec<char> = Vec::new();
    let mut best = None;
    let mut best_len = 0usize;

    let mut index = 0usize;
    while lo < hi {
        let Some(c) = stream.pop() else { break };
        consumed.push(c);

        let matches_before = |entry: &(&str, ReservedToken)| {
            let bytes = entry.0.as_bytes();
            bytes.len() <= index || (bytes[index] as char) < c
        };
        let matches_through = |entry: &(&str, ReservedToken)| {
            let bytes = entry.0.as_bytes();
            bytes.len() <= index || (bytes[index] as char) <= c
        };
        let slice = &OPERATORS[lo..hi];
        let new_lo = lo + slice.partition_point(matches_before);
        let new_hi = lo + slice.partition_point(matches_through);
        lo = new_lo;
        hi = new_hi;

        if lo < hi && OPERATORS[lo].0.len() == index + 1 {
            best = Some(OPERATORS[lo].1);
            best_len = index + 1;
        }
        index += 1;
    }

    while consumed.len() > best_len {
        stream.push(consumed.pop().expect("overrun characters are recorded"));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_is_sorted() {
        for pair in KEYWORDS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn operator_table_is_sorted() {
        for pair in OPERATORS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn text_round_trips_through_tables() {
        for (text, token) in KEYWORDS.iter().chain(OPERATORS.iter()) {
            assert_eq!(token.text(), *text);
        }
    }

    #[test]
    fn keyword_lookup_hits_and_misses() {
        assert_eq!(keyword("contract"), Some(KwContract));
        assert_eq!(keyword("while"), Some(KwWhile));
        assert_eq!(keyword("True"), Some(KwTrue));
        assert_eq!(keyword("true"), None);
        assert_eq!(keyword("foo"), None);
    }

    #[test]
    fn match_operator_takes_longest_match() {
        let mut stream = Stream::new("**=");
        assert_eq!(match_operator(&mut stream), Some(OpAssignExp));
        assert_eq!(stream.pop(), None);
    }

    #[test]
    fn match_operator_pushes_back_overrun() {
        let mut stream = Stream::new("<<7");
        assert_eq!(match_operator(&mut stream), Some(OpShiftLeft));
        assert_eq!(stream.pop(), Some('7'));
    }

    #[test]
    fn match_operator_single_character() {
        let mut stream = Stream::new("+x");
        assert_eq!(match_operator(&mut stream), Some(OpAdd));
        assert_eq!(stream.pop(), Some('x'));
    }

    #[test]
    fn match_operator_unknown_restores_stream() {
        let mut stream = Stream::new("$foo");
        assert_eq!(match_operator(&mut stream), None);
        assert_eq!(stream.pop(), Some('$'));
    }

    #[test]
    fn type_specifiers_are_classified() {
        assert!(KwNum.is_type_specifier());
        assert!(KwAddress.is_type_specifier());
        assert!(KwU64.is_type_specifier());
        assert!(!KwLet.is_type_specifier());
        assert!(!OpAdd.is_type_specifier());
    }
}
