//! Mutable query model.
//!
//! A [`Query`] is an in-memory description of one SELECT, UPDATE or DELETE
//! statement (or a raw SQL string) built up by append-only mutators, usually
//! through [`qm`](crate::qm) modifiers. [`Query::build`] renders it for the
//! query's [`Dialect`] into SQL text plus an ordered argument list.
//!
//! ```ignore
//! use sqlmold::{Dialect, Query, args};
//!
//! let mut q = Query::new(Dialect::postgres());
//! q.append_from("videos");
//! q.append_in("id IN ?", args![1, 2, 3]);
//!
//! let (sql, args) = q.build();
//! assert_eq!(sql, r#"SELECT * FROM "videos" WHERE (id IN ($1,$2,$3));"#);
//! ```

mod build;
mod exec;
mod placeholders;

#[cfg(test)]
mod tests;

pub use build::build_query;
pub use exec::BindMode;
pub use placeholders::{convert_in_question_marks, convert_question_marks, placeholders};

use crate::dialect::Dialect;
use crate::qm::QueryMod;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// How a WHERE predicate is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereKind {
    /// Plain clause with `?` placeholders.
    Normal,
    /// `col IN ?` / `(a, b) IN ?`, expanded from the argument list.
    In,
    /// `col NOT IN ?`, expanded from the argument list.
    NotIn,
    /// Manual `(`; disables automatic wrapping for the whole WHERE list.
    LeftParen,
    /// Manual `)`.
    RightParen,
}

/// One WHERE predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct WherePredicate {
    pub kind: WhereKind,
    pub clause: String,
    pub args: Vec<Value>,
    /// Join to the previous predicate with `OR` instead of `AND`.
    pub or_separator: bool,
}

impl WherePredicate {
    fn new(kind: WhereKind, clause: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            kind,
            clause: clause.into(),
            args,
            or_separator: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl JoinKind {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::LeftOuter => "LEFT JOIN",
            JoinKind::RightOuter => "RIGHT JOIN",
            JoinKind::FullOuter => "FULL JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub clause: String,
    pub args: Vec<Value>,
}

/// A clause that carries its own placeholders (ORDER BY, HAVING, WITH bodies).
#[derive(Debug, Clone, PartialEq)]
pub struct ArgClause {
    pub clause: String,
    pub args: Vec<Value>,
}

impl ArgClause {
    pub fn new(clause: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            clause: clause.into(),
            args,
        }
    }
}

/// The statement a [`Query`] renders to.
///
/// Precedence is raw > delete > update > select: setters never demote a
/// higher-precedence kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Statement {
    #[default]
    Select,
    /// Column -> value; the map keeps columns sorted for deterministic output.
    Update(BTreeMap<String, Value>),
    Delete,
    /// Caller-supplied SQL; bypasses the builder entirely.
    Raw { sql: String, args: Vec<Value> },
}

/// In-memory description of one SQL statement.
#[derive(Debug, Default)]
pub struct Query {
    pub(crate) dialect: Dialect,
    pub(crate) statement: Statement,

    pub(crate) select_cols: Vec<String>,
    pub(crate) count: bool,
    pub(crate) from: Vec<String>,
    pub(crate) joins: Vec<Join>,
    pub(crate) where_: Vec<WherePredicate>,
    pub(crate) group_by: Vec<String>,
    pub(crate) order_by: Vec<ArgClause>,
    pub(crate) having: Vec<ArgClause>,
    pub(crate) withs: Vec<ArgClause>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: u64,
    pub(crate) for_lock: Option<String>,
    pub(crate) distinct: Option<String>,
    pub(crate) comment: Option<String>,

    pub(crate) load: Vec<String>,
    pub(crate) bind_mode: BindMode,

    built: OnceLock<(String, Vec<Value>)>,
}

impl Clone for Query {
    fn clone(&self) -> Self {
        Self {
            dialect: self.dialect,
            statement: self.statement.clone(),
            select_cols: self.select_cols.clone(),
            count: self.count,
            from: self.from.clone(),
            joins: self.joins.clone(),
            where_: self.where_.clone(),
            group_by: self.group_by.clone(),
            order_by: self.order_by.clone(),
            having: self.having.clone(),
            withs: self.withs.clone(),
            limit: self.limit,
            offset: self.offset,
            for_lock: self.for_lock.clone(),
            distinct: self.distinct.clone(),
            comment: self.comment.clone(),
            load: self.load.clone(),
            bind_mode: self.bind_mode,
            built: OnceLock::new(),
        }
    }
}

impl Query {
    /// Create an empty SELECT for `dialect`.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Create a query that executes `sql` verbatim.
    pub fn raw(dialect: Dialect, sql: impl Into<String>, args: Vec<Value>) -> Self {
        let mut q = Self::new(dialect);
        q.set_sql(sql, args);
        q
    }

    /// Apply a sequence of modifiers in order.
    pub fn apply<I>(&mut self, mods: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: QueryMod,
    {
        for m in mods {
            m.apply(self);
        }
        self
    }

    /// Render SQL and arguments. The result is cached until the next mutation.
    pub fn build(&self) -> (String, Vec<Value>) {
        self.built.get_or_init(|| build_query(self)).clone()
    }

    fn touch(&mut self) -> &mut Self {
        self.built = OnceLock::new();
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn where_predicates(&self) -> &[WherePredicate] {
        &self.where_
    }

    pub fn load_paths(&self) -> &[String] {
        &self.load
    }

    pub fn set_dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.dialect = dialect;
        self.touch()
    }

    // ==================== statement kind ====================

    /// Replace the whole statement with raw SQL.
    pub fn set_sql(&mut self, sql: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.statement = Statement::Raw {
            sql: sql.into(),
            args,
        };
        self.touch()
    }

    /// Replace the arguments of a raw statement. No-op for built statements.
    pub fn set_args(&mut self, new_args: Vec<Value>) -> &mut Self {
        if let Statement::Raw { args, .. } = &mut self.statement {
            *args = new_args;
        }
        self.touch()
    }

    /// Turn the query into a DELETE unless it is raw SQL.
    pub fn set_delete(&mut self) -> &mut Self {
        if !matches!(self.statement, Statement::Raw { .. }) {
            self.statement = Statement::Delete;
        }
        self.touch()
    }

    /// Turn the query into an UPDATE of `cols`, merging with earlier columns.
    ///
    /// Ignored when the query is already a DELETE or raw SQL.
    pub fn set_update<K, V>(&mut self, cols: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        match &mut self.statement {
            Statement::Select => {
                self.statement = Statement::Update(
                    cols.into_iter()
                        .map(|(k, v)| (k.into(), v.into()))
                        .collect(),
                );
            }
            Statement::Update(existing) => {
                existing.extend(cols.into_iter().map(|(k, v)| (k.into(), v.into())));
            }
            Statement::Delete | Statement::Raw { .. } => {}
        }
        self.touch()
    }

    /// Render `SELECT COUNT(...)` instead of the column list.
    pub fn set_count(&mut self) -> &mut Self {
        self.count = true;
        self.touch()
    }

    // ==================== projection & sources ====================

    pub fn set_select(&mut self, cols: Vec<String>) -> &mut Self {
        self.select_cols = cols;
        self.touch()
    }

    pub fn append_select<S: Into<String>>(
        &mut self,
        cols: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        self.select_cols.extend(cols.into_iter().map(Into::into));
        self.touch()
    }

    pub fn select_columns(&self) -> &[String] {
        &self.select_cols
    }

    pub fn set_from(&mut self, from: Vec<String>) -> &mut Self {
        self.from = from;
        self.touch()
    }

    pub fn append_from(&mut self, from: impl Into<String>) -> &mut Self {
        self.from.push(from.into());
        self.touch()
    }

    pub fn set_distinct(&mut self, expr: impl Into<String>) -> &mut Self {
        self.distinct = Some(expr.into());
        self.touch()
    }

    pub fn append_join(
        &mut self,
        kind: JoinKind,
        clause: impl Into<String>,
        args: Vec<Value>,
    ) -> &mut Self {
        self.joins.push(Join {
            kind,
            clause: clause.into(),
            args,
        });
        self.touch()
    }

    pub fn append_with(&mut self, clause: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.withs.push(ArgClause::new(clause, args));
        self.touch()
    }

    // ==================== WHERE ====================

    pub fn append_where(&mut self, clause: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.where_.push(WherePredicate::new(WhereKind::Normal, clause, args));
        self.touch()
    }

    pub fn append_in(&mut self, clause: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.where_.push(WherePredicate::new(WhereKind::In, clause, args));
        self.touch()
    }

    pub fn append_not_in(&mut self, clause: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.where_.push(WherePredicate::new(WhereKind::NotIn, clause, args));
        self.touch()
    }

    pub fn append_where_left_paren(&mut self) -> &mut Self {
        self.where_
            .push(WherePredicate::new(WhereKind::LeftParen, "", Vec::new()));
        self.touch()
    }

    pub fn append_where_right_paren(&mut self) -> &mut Self {
        self.where_
            .push(WherePredicate::new(WhereKind::RightParen, "", Vec::new()));
        self.touch()
    }

    /// Join the most recent predicate to its predecessor with `OR`.
    ///
    /// When the last predicate closes a parenthesized group, the group's
    /// opening parenthesis is marked instead.
    pub fn set_last_where_as_or(&mut self) -> &mut Self {
        let Some(last) = self.where_.len().checked_sub(1) else {
            return self;
        };
        if self.where_[last].kind != WhereKind::RightParen {
            self.where_[last].or_separator = true;
            return self.touch();
        }

        let mut depth = 0usize;
        for w in self.where_[..=last].iter_mut().rev() {
            match w.kind {
                WhereKind::RightParen => depth += 1,
                WhereKind::LeftParen => {
                    depth -= 1;
                    if depth == 0 {
                        w.or_separator = true;
                        break;
                    }
                }
                _ => {}
            }
        }
        self.touch()
    }

    /// Drop soft-delete filters (`deleted_at is null`, optionally table-qualified).
    pub fn remove_soft_delete_where(&mut self) -> &mut Self {
        let (lq, rq) = (self.dialect.lq, self.dialect.rq);
        self.where_.retain(|w| {
            if w.kind != WhereKind::Normal {
                return true;
            }
            let clause = w.clause.trim().to_ascii_lowercase();
            let Some(col) = clause.strip_suffix("is null").map(str::trim_end) else {
                return true;
            };
            let col = crate::ident::unquote(lq, rq, col);
            !(col == "deleted_at" || col.ends_with(".deleted_at"))
        });
        self.touch()
    }

    // ==================== modifiers ====================

    pub fn append_group_by(&mut self, clause: impl Into<String>) -> &mut Self {
        self.group_by.push(clause.into());
        self.touch()
    }

    pub fn append_order_by(&mut self, clause: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.order_by.push(ArgClause::new(clause, args));
        self.touch()
    }

    pub fn append_having(&mut self, clause: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.having.push(ArgClause::new(clause, args));
        self.touch()
    }

    pub fn set_limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self.touch()
    }

    pub fn set_offset(&mut self, offset: u64) -> &mut Self {
        self.offset = offset;
        self.touch()
    }

    /// Row lock clause rendered as `FOR <lock>` (`UPDATE`, `SHARE`, ...).
    pub fn set_for(&mut self, lock: impl Into<String>) -> &mut Self {
        self.for_lock = Some(lock.into());
        self.touch()
    }

    /// Comment lines rendered as `-- ...` before the statement.
    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comment = Some(comment.into());
        self.touch()
    }

    // ==================== eager loading & binding ====================

    /// Replace the eager-load paths (`"Author"`, `"Comments.Author"`, ...).
    pub fn set_load<S: Into<String>>(&mut self, paths: impl IntoIterator<Item = S>) -> &mut Self {
        self.load = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn append_load(&mut self, path: impl Into<String>) -> &mut Self {
        self.load.push(path.into());
        self
    }

    /// Policy for singular binds against multi-row results.
    pub fn set_bind_mode(&mut self, mode: BindMode) -> &mut Self {
        self.bind_mode = mode;
        self
    }
}
