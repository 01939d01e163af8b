//! Per-database quoting and placeholder conventions.

use serde::{Deserialize, Serialize};

/// Quoting characters and clause conventions for one database engine.
///
/// A `Dialect` is a small `Copy` value; every [`Query`](crate::Query) carries
/// its own copy, so one preset can be shared by any number of queries.
///
/// ```ignore
/// let d = sqlmold::Dialect::postgres();
/// assert_eq!(d.placeholder(3), "$3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    /// Opening identifier quote (`"` for Postgres, `` ` `` for MySQL, `[` for MSSQL).
    pub lq: char,
    /// Closing identifier quote.
    pub rq: char,
    /// `$1, $2, ...` when true, bare `?` when false.
    #[serde(default)]
    pub use_index_placeholders: bool,
    /// `SELECT TOP (n)` plus `OFFSET .. ROWS FETCH NEXT ..` instead of `LIMIT/OFFSET`.
    #[serde(default)]
    pub use_top_clause: bool,
}

impl Dialect {
    pub const fn postgres() -> Self {
        Self {
            lq: '"',
            rq: '"',
            use_index_placeholders: true,
            use_top_clause: false,
        }
    }

    pub const fn mysql() -> Self {
        Self {
            lq: '`',
            rq: '`',
            use_index_placeholders: false,
            use_top_clause: false,
        }
    }

    pub const fn sqlite() -> Self {
        Self {
            lq: '"',
            rq: '"',
            use_index_placeholders: false,
            use_top_clause: false,
        }
    }

    pub const fn mssql() -> Self {
        Self {
            lq: '[',
            rq: ']',
            use_index_placeholders: true,
            use_top_clause: true,
        }
    }

    /// Render the placeholder for the 1-based argument position `n`.
    pub fn placeholder(&self, n: usize) -> String {
        if self.use_index_placeholders {
            format!("${n}")
        } else {
            "?".to_string()
        }
    }

    /// Quote an identifier-like expression; anything else is returned verbatim.
    ///
    /// See [`crate::ident::quote`] for the exact rules.
    pub fn quote(&self, ident: &str) -> String {
        crate::ident::quote(self.lq, self.rq, ident)
    }

    /// Quote every entry of `idents`.
    pub fn quote_all<S: AsRef<str>>(&self, idents: &[S]) -> Vec<String> {
        idents.iter().map(|s| self.quote(s.as_ref())).collect()
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::postgres()
    }
}
