//! Query modifiers.
//!
//! Each function returns a [`Mod`]: a deferred, append-only mutation of a
//! [`Query`]. Mods compose as plain lists, so generated code and callers can
//! assemble queries piecewise:
//!
//! ```ignore
//! use sqlmold::{Dialect, Query, args, qm};
//!
//! let mut q = Query::new(Dialect::postgres());
//! q.apply([
//!     qm::select(["id", "name"]),
//!     qm::from("users"),
//!     qm::where_("age > ?", args![18]),
//!     qm::expr([
//!         qm::where_("role = ?", args!["admin"]),
//!         qm::or("role = ?", args!["owner"]),
//!     ]),
//!     qm::order_by("name", args![]),
//!     qm::limit(10),
//! ]);
//! ```

use crate::query::{JoinKind, Query};
use crate::value::Value;

/// Anything that can modify a [`Query`].
///
/// Implemented for [`Mod`] and for any `FnOnce(&mut Query)` closure.
pub trait QueryMod {
    fn apply(self, q: &mut Query);
}

impl<F: FnOnce(&mut Query)> QueryMod for F {
    fn apply(self, q: &mut Query) {
        self(q)
    }
}

/// A boxed query modifier, so mods of different kinds fit in one list.
pub struct Mod(Box<dyn FnOnce(&mut Query) + Send>);

impl Mod {
    pub fn new(f: impl FnOnce(&mut Query) + Send + 'static) -> Self {
        Self(Box::new(f))
    }
}

impl std::fmt::Debug for Mod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Mod")
    }
}

impl QueryMod for Mod {
    fn apply(self, q: &mut Query) {
        (self.0)(q)
    }
}

// ==================== projection & sources ====================

/// Append columns to the select list.
pub fn select<S: Into<String>>(cols: impl IntoIterator<Item = S>) -> Mod {
    let cols: Vec<String> = cols.into_iter().map(Into::into).collect();
    Mod::new(move |q| {
        q.append_select(cols);
    })
}

/// Append a FROM entry (`"videos"`, `"videos as v"`, ...).
pub fn from(table: impl Into<String>) -> Mod {
    let table = table.into();
    Mod::new(move |q| {
        q.append_from(table);
    })
}

fn join(kind: JoinKind, clause: String, args: Vec<Value>) -> Mod {
    Mod::new(move |q| {
        q.append_join(kind, clause, args);
    })
}

pub fn inner_join(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    join(JoinKind::Inner, clause.into(), args)
}

pub fn left_outer_join(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    join(JoinKind::LeftOuter, clause.into(), args)
}

pub fn right_outer_join(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    join(JoinKind::RightOuter, clause.into(), args)
}

pub fn full_outer_join(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    join(JoinKind::FullOuter, clause.into(), args)
}

/// `SELECT DISTINCT <expr>`.
pub fn distinct(expr: impl Into<String>) -> Mod {
    let expr = expr.into();
    Mod::new(move |q| {
        q.set_distinct(expr);
    })
}

/// Append a common table expression (`"cte AS (SELECT ...)"`).
pub fn with(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    let clause = clause.into();
    Mod::new(move |q| {
        q.append_with(clause, args);
    })
}

// ==================== WHERE ====================

/// Append a predicate joined with `AND`.
pub fn where_(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    let clause = clause.into();
    Mod::new(move |q| {
        q.append_where(clause, args);
    })
}

/// Same as [`where_`]; reads better after the first predicate.
pub fn and(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    where_(clause, args)
}

/// Append a predicate joined with `OR`.
pub fn or(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    let clause = clause.into();
    Mod::new(move |q| {
        q.append_where(clause, args);
        q.set_last_where_as_or();
    })
}

/// Apply `m` and join whatever predicate (or parenthesized group) it
/// appended with `OR`.
pub fn or2(m: impl QueryMod + Send + 'static) -> Mod {
    Mod::new(move |q| {
        m.apply(q);
        q.set_last_where_as_or();
    })
}

/// `col IN ?` / `(a, b) IN ?`; the `?` expands to one placeholder per argument.
pub fn where_in(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    let clause = clause.into();
    Mod::new(move |q| {
        q.append_in(clause, args);
    })
}

pub fn and_in(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    where_in(clause, args)
}

pub fn or_in(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    let clause = clause.into();
    Mod::new(move |q| {
        q.append_in(clause, args);
        q.set_last_where_as_or();
    })
}

pub fn where_not_in(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    let clause = clause.into();
    Mod::new(move |q| {
        q.append_not_in(clause, args);
    })
}

pub fn and_not_in(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    where_not_in(clause, args)
}

pub fn or_not_in(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    let clause = clause.into();
    Mod::new(move |q| {
        q.append_not_in(clause, args);
        q.set_last_where_as_or();
    })
}

/// Group the predicates appended by `mods` in explicit parentheses.
///
/// Once a query contains a group, automatic per-predicate parentheses are
/// turned off for the whole WHERE clause.
pub fn expr(mods: impl IntoIterator<Item = Mod>) -> Mod {
    let mods: Vec<Mod> = mods.into_iter().collect();
    Mod::new(move |q| {
        q.append_where_left_paren();
        for m in mods {
            m.apply(q);
        }
        q.append_where_right_paren();
    })
}

// ==================== modifiers ====================

pub fn group_by(clause: impl Into<String>) -> Mod {
    let clause = clause.into();
    Mod::new(move |q| {
        q.append_group_by(clause);
    })
}

pub fn order_by(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    let clause = clause.into();
    Mod::new(move |q| {
        q.append_order_by(clause, args);
    })
}

pub fn having(clause: impl Into<String>, args: Vec<Value>) -> Mod {
    let clause = clause.into();
    Mod::new(move |q| {
        q.append_having(clause, args);
    })
}

pub fn limit(limit: u64) -> Mod {
    Mod::new(move |q| {
        q.set_limit(limit);
    })
}

pub fn offset(offset: u64) -> Mod {
    Mod::new(move |q| {
        q.set_offset(offset);
    })
}

/// Row lock clause, e.g. `for_("UPDATE")`.
pub fn for_(lock: impl Into<String>) -> Mod {
    let lock = lock.into();
    Mod::new(move |q| {
        q.set_for(lock);
    })
}

pub fn comment(comment: impl Into<String>) -> Mod {
    let comment = comment.into();
    Mod::new(move |q| {
        q.set_comment(comment);
    })
}

/// Replace the whole statement with raw SQL.
pub fn sql(sql: impl Into<String>, args: Vec<Value>) -> Mod {
    let sql = sql.into();
    Mod::new(move |q| {
        q.set_sql(sql, args);
    })
}

/// Eager load a relationship path (`"Author"`, `"Comments.Author"`).
pub fn load(path: impl Into<String>) -> Mod {
    let path = path.into();
    Mod::new(move |q| {
        q.append_load(path);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dialect, args};

    fn build(mods: Vec<Mod>) -> (String, Vec<Value>) {
        let mut q = Query::new(Dialect::postgres());
        q.apply(mods);
        q.build()
    }

    #[test]
    fn test_or_joins_with_or() {
        let (sql, args) = build(vec![
            from("users"),
            where_("a = ?", args![1]),
            or("b = ?", args![2]),
            and("c = ?", args![3]),
        ]);
        assert_eq!(
            sql,
            r#"SELECT * FROM "users" WHERE (a = $1) OR (b = $2) AND (c = $3);"#
        );
        assert_eq!(args, args![1, 2, 3]);
    }

    #[test]
    fn test_expr_groups_predicates() {
        let (sql, _) = build(vec![
            from("users"),
            where_("a = ?", args![1]),
            expr([where_("b = ?", args![2]), or("c = ?", args![3])]),
        ]);
        assert_eq!(
            sql,
            r#"SELECT * FROM "users" WHERE a = $1 AND (b = $2 OR c = $3);"#
        );
    }

    #[test]
    fn test_or2_marks_whole_group() {
        let (sql, _) = build(vec![
            from("users"),
            where_("a = ?", args![1]),
            or2(expr([where_("b = ?", args![2]), and("c = ?", args![3])])),
        ]);
        assert_eq!(
            sql,
            r#"SELECT * FROM "users" WHERE a = $1 OR (b = $2 AND c = $3);"#
        );
    }

    #[test]
    fn test_closure_is_a_mod() {
        let mut q = Query::new(Dialect::postgres());
        q.apply([|q: &mut Query| {
            q.append_from("t");
        }]);
        assert_eq!(q.build().0, r#"SELECT * FROM "t";"#);
    }

    #[test]
    fn test_load_paths_accumulate() {
        let mut q = Query::new(Dialect::postgres());
        q.apply([load("Author"), load("Comments.Author")]);
        assert_eq!(q.load_paths(), ["Author", "Comments.Author"]);
    }
}
