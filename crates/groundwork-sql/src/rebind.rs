//! Rewriting of `@name` parameters into dialect placeholders.
//!
//! A parameter starts at `@` and continues while the following characters are
//! ASCII letters, digits, `-` or `_`. An `@` without a name is written through
//! as a literal `@`; if the next character is another `@` it is swallowed, so
//! `@@` yields a single `@`. Parameters resolving to a sequence expand into
//! one placeholder per element, separated by `, `.
//!
//! The rebinder knows nothing about SQL. Parameters inside string literals and
//! comments are rewritten like any other and must be escaped as `@@`.

use tracing::trace;

use crate::args::ArgumentSource;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::field_index::is_name_char;
use crate::value::SqlValue;

const AT: char = '@';

/// A query ready for execution: placeholder syntax of one dialect and the
/// parameter values aligned with its placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rebound {
    /// The rewritten query text.
    pub query: String,
    /// One value per placeholder, in order.
    pub params: Vec<SqlValue>,
}

impl Rebound {
    /// Creates a rebound query from its parts.
    #[must_use]
    pub fn new(query: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }
}

/// Rewrites the parameters of `query` into placeholders of `dialect`,
/// resolving their values through `args`.
///
/// The first parameter that cannot be resolved aborts the rewrite.
pub fn rebind(query: &str, dialect: &dyn Dialect, args: &dyn ArgumentSource) -> Result<Rebound> {
    let mut rebound = Rebound {
        query: String::with_capacity(query.len()),
        params: Vec::new(),
    };

    let mut chars = query.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c != AT {
            rebound.query.push(c);
            continue;
        }

        let start = offset + AT.len_utf8();
        let mut end = start;

        while let Some((offset, c)) = chars.next_if(|&(_, c)| is_name_char(c)) {
            end = offset + c.len_utf8();
        }

        let name = &query[start..end];

        if name.is_empty() {
            rebound.query.push(AT);
            chars.next_if(|&(_, c)| c == AT);
            continue;
        }

        let values = args.lookup(name)?.into_values();
        push_placeholders(&mut rebound.query, dialect, rebound.params.len(), values.len());
        rebound.params.extend(values);
    }

    trace!(
        query = %rebound.query,
        params = rebound.params.len(),
        "Rebound query"
    );

    Ok(rebound)
}

fn push_placeholders(query: &mut String, dialect: &dyn Dialect, position: usize, n: usize) {
    for i in 0..n {
        if i > 0 {
            query.push_str(", ");
        }

        query.push_str(&dialect.placeholder(position + i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{NoArgs, Positional};
    use crate::dialect::{GenericDialect, PostgresDialect};
    use crate::error::SqlError;

    fn ints(values: &[i64]) -> Vec<SqlValue> {
        values.iter().copied().map(SqlValue::Int).collect()
    }

    #[test]
    fn test_rebind_positional_sequence() {
        let args = Positional::new().arg(1_i64).arg(vec![1_i64, 2, 3]);
        let rebound = rebind(
            "select * from t where a = @0 and b in (@1) ;",
            &GenericDialect,
            &args,
        )
        .unwrap();

        assert_eq!(rebound.query, "select * from t where a = ? and b in (?, ?, ?) ;");
        assert_eq!(rebound.params, ints(&[1, 1, 2, 3]));
    }

    #[test]
    fn test_rebind_token_at_end() {
        let args = Positional::new().arg(1_i64).arg(2_i64);
        let rebound = rebind(
            "select * from t where a = @0 and b like @1",
            &GenericDialect,
            &args,
        )
        .unwrap();

        assert_eq!(rebound.query, "select * from t where a = ? and b like ?");
        assert_eq!(rebound.params, ints(&[1, 2]));
    }

    #[test]
    fn test_rebind_reordered() {
        let args: Positional = [1_i64, 2, 3, 4].into_iter().collect();
        let rebound = rebind("select * from t where a = @2 and b = @0", &GenericDialect, &args)
            .unwrap();

        assert_eq!(rebound.query, "select * from t where a = ? and b = ?");
        assert_eq!(rebound.params, ints(&[3, 1]));
    }

    #[test]
    fn test_rebind_escape() {
        let args: Positional = [1_i64, 2, 3, 4].into_iter().collect();
        let rebound = rebind(
            "select * from t where a = '@@' and b = '@ hello' ;",
            &GenericDialect,
            &args,
        )
        .unwrap();

        assert_eq!(rebound.query, "select * from t where a = '@' and b = '@ hello' ;");
        assert!(rebound.params.is_empty());
    }

    #[test]
    fn test_rebind_escape_edges() {
        let rebound = rebind("@", &GenericDialect, &NoArgs).unwrap();
        assert_eq!(rebound.query, "@");

        let rebound = rebind("a@@b @@@@ c@", &GenericDialect, &NoArgs).unwrap();
        assert_eq!(rebound.query, "a@b @@ c@");
        assert!(rebound.params.is_empty());
    }

    #[test]
    fn test_rebind_identity_without_tokens() {
        let query = "select 'ünïcödé', \"x\" from t where a = ? -- done";
        let rebound = rebind(query, &PostgresDialect, &NoArgs).unwrap();
        assert_eq!(rebound.query, query);
        assert!(rebound.params.is_empty());
    }

    #[test]
    fn test_rebind_numbered_placeholders_advance() {
        let args = Positional::new()
            .arg(vec![1_i64, 2])
            .arg("x")
            .arg([3_i64, 4, 5]);
        let rebound = rebind("in (@0) and b = @1 and c in (@2)", &PostgresDialect, &args)
            .unwrap();

        assert_eq!(
            rebound.query,
            "in ($1, $2) and b = $3 and c in ($4, $5, $6)"
        );
        assert_eq!(rebound.params.len(), 6);
        assert_eq!(rebound.params[2], SqlValue::Text("x".into()));
    }

    #[test]
    fn test_rebind_empty_sequence() {
        let args = Positional::new().arg(Vec::<i64>::new()).arg(1_i64);
        let rebound = rebind("in (@0) and b = @1", &PostgresDialect, &args).unwrap();
        assert_eq!(rebound.query, "in () and b = $1");
        assert_eq!(rebound.params, ints(&[1]));
    }

    #[test]
    fn test_rebind_null() {
        let args = Positional::new().arg(None::<String>);
        let rebound = rebind("a = @0", &GenericDialect, &args).unwrap();
        assert_eq!(rebound.params, vec![SqlValue::Null]);
    }

    #[test]
    fn test_rebind_name_stops_at_punctuation() {
        let args = Positional::new().arg(1_i64);
        let rebound = rebind("(@0),@0;@0.x", &GenericDialect, &args).unwrap();
        assert_eq!(rebound.query, "(?),?;?.x");
        assert_eq!(rebound.params, ints(&[1, 1, 1]));
    }

    #[test]
    fn test_rebind_lookup_errors() {
        let args = Positional::new().arg(1_i64);

        for query in ["a = @1", "a = @name", "a = @0 and b = @-1"] {
            assert!(
                matches!(
                    rebind(query, &GenericDialect, &args),
                    Err(SqlError::InvalidArg { .. })
                ),
                "{query:?} should fail"
            );
        }

        assert!(rebind("a = @x", &GenericDialect, &NoArgs).is_err());
    }
}
