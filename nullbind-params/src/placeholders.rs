use nullbind_result::{Error, Result};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Number of positional parameters (`$1`, `$2`, ...) a statement expects.
///
/// Returns the highest placeholder index, so `$1, $1, $3` needs three
/// columns. The statement is tokenized with the Postgres dialect, so quoted
/// literals, dollar-quoted strings and comments never contribute.
///
/// # Errors
///
/// Returns [`Error::InvalidArgumentError`] when the statement cannot be
/// tokenized (for example an unterminated string literal).
pub fn count_placeholders(sql: &str) -> Result<usize> {
    let dialect = PostgreSqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|err| Error::InvalidArgumentError(format!("cannot tokenize statement: {err}")))?;

    Ok(tokens
        .iter()
        .filter_map(|token| match token {
            Token::Placeholder(raw) => positional_index(raw),
            _ => None,
        })
        .max()
        .unwrap_or(0))
}

/// `$n` to `n`. Named or malformed placeholders are not positional.
fn positional_index(raw: &str) -> Option<usize> {
    let digits = raw.strip_prefix('$')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
