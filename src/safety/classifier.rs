//! Lexical SQL classification.
//!
//! Rules are applied in order and the first match is final:
//! empty text, forbidden keyword, leading verb, statement count.
//! sqlparser's tokenizer is only used to find the leading token; the keyword
//! scan and the statement split work on the raw text.

use sqlparser::dialect::SQLiteDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer};

use super::{RejectReason, Verdict};

/// Mutation, schema, and privilege vocabulary matched case-insensitively
/// anywhere in the text, including inside string literals and aliases.
///
/// `CREATE` and `REPLACE` are absent: the seeded `created_at` column and the
/// `replace()` function would trip them, and the leading-verb rule already
/// keeps `CREATE`/`REPLACE` statements out.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "DROP",
    "DELETE",
    "INSERT",
    "UPDATE",
    "ALTER",
    "TRUNCATE",
    "GRANT",
    "REVOKE",
    "ATTACH",
    "DETACH",
    "PRAGMA",
    "VACUUM",
    "REINDEX",
    "LOAD_EXTENSION",
];

/// Statement separator.
const SEPARATOR: char = ';';

/// SQL classifier that gates text before execution.
#[derive(Debug)]
pub struct SqlClassifier {
    dialect: SQLiteDialect,
    forbidden: &'static [&'static str],
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    /// Creates a classifier with the built-in forbidden vocabulary.
    pub fn new() -> Self {
        Self {
            dialect: SQLiteDialect {},
            forbidden: FORBIDDEN_KEYWORDS,
        }
    }

    /// Classifies a SQL string.
    pub fn classify(&self, sql: &str) -> Verdict {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return Verdict::Reject(RejectReason::Empty);
        }

        if let Some(keyword) = self.find_forbidden(trimmed) {
            return Verdict::Reject(RejectReason::ForbiddenKeyword(keyword));
        }

        let (is_select, leading) = self.leading_token(trimmed);
        if !is_select {
            return Verdict::Reject(RejectReason::LeadingToken(leading));
        }

        let segments = trimmed
            .split(SEPARATOR)
            .filter(|segment| !segment.trim().is_empty())
            .count();
        if segments > 1 {
            return Verdict::Reject(RejectReason::MultipleStatements);
        }

        Verdict::Allow
    }

    /// Returns the forbidden keyword that occurs earliest in the text.
    fn find_forbidden(&self, sql: &str) -> Option<&'static str> {
        let upper = sql.to_ascii_uppercase();
        self.forbidden
            .iter()
            .filter_map(|keyword| upper.find(keyword).map(|pos| (pos, *keyword)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, keyword)| keyword)
    }

    /// Returns whether the first significant token is `SELECT`, and that token's text.
    ///
    /// Comments count as whitespace here. If the text cannot be tokenized
    /// (an unterminated literal, say) the first whitespace-delimited word is used.
    fn leading_token(&self, sql: &str) -> (bool, String) {
        match Tokenizer::new(&self.dialect, sql).tokenize() {
            Ok(tokens) => match tokens
                .into_iter()
                .find(|token| !matches!(token, Token::Whitespace(_)))
            {
                Some(Token::Word(word)) => {
                    let is_select = word.quote_style.is_none() && word.keyword == Keyword::SELECT;
                    (is_select, word.value)
                }
                Some(other) => (false, other.to_string()),
                None => (false, String::new()),
            },
            Err(_) => {
                let first = sql.split_whitespace().next().unwrap_or_default();
                (first.eq_ignore_ascii_case("SELECT"), first.to_string())
            }
        }
    }
}

/// Convenience function to classify SQL without creating a classifier instance.
pub fn classify_sql(sql: &str) -> Verdict {
    SqlClassifier::new().classify(sql)
}
