//! Rendering a [`Query`] into SQL text and arguments.

use super::placeholders::{convert_in_question_marks, convert_question_marks};
use super::{ArgClause, Query, Statement, WhereKind};
use crate::ident;
use crate::value::Value;
use regex::Regex;
use std::sync::LazyLock;

/// Splits an IN clause into `(left side, IN | NOT IN, right side)`.
static IN_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(.*?[\s)?])(NOT\s+IN|IN)([\s(?].*)$").expect("valid IN clause regex")
});

/// Render `q` into SQL plus its positional arguments.
///
/// The output is a pure function of the query: calling it twice without
/// mutating `q` yields identical results. [`Query::build`] memoizes it.
pub fn build_query(q: &Query) -> (String, Vec<Value>) {
    match &q.statement {
        Statement::Raw { sql, args } => (sql.clone(), args.clone()),
        Statement::Delete => Writer::new(q).delete(),
        Statement::Update(cols) if !cols.is_empty() => Writer::new(q).update(cols),
        Statement::Update(_) | Statement::Select => Writer::new(q).select(),
    }
}

/// Accumulates SQL text and arguments; `args.len() + 1` is always the next
/// placeholder number.
struct Writer<'q> {
    q: &'q Query,
    indexed: bool,
    sql: String,
    args: Vec<Value>,
}

impl<'q> Writer<'q> {
    fn new(q: &'q Query) -> Self {
        Self {
            q,
            indexed: q.dialect.use_index_placeholders,
            sql: String::with_capacity(128),
            args: Vec::new(),
        }
    }

    fn next_index(&self) -> usize {
        self.args.len() + 1
    }

    fn quote(&self, s: &str) -> String {
        self.q.dialect.quote(s)
    }

    fn from_list(&self) -> String {
        self.q.dialect.quote_all(&self.q.from).join(", ")
    }

    fn finish(mut self) -> (String, Vec<Value>) {
        self.sql.push(';');
        (self.sql, self.args)
    }

    // ==================== statements ====================

    fn select(mut self) -> (String, Vec<Value>) {
        let q = self.q;
        self.write_comment();
        self.write_ctes();

        self.sql.push_str("SELECT ");
        if q.dialect.use_top_clause
            && let Some(limit) = q.limit
            && q.offset == 0
        {
            self.sql.push_str(&format!("TOP ({limit}) "));
        }
        if q.count {
            self.sql.push_str("COUNT(");
        }

        let has_select_cols = !q.select_cols.is_empty();
        let has_joins = !q.joins.is_empty();
        let projection = if let Some(distinct) = &q.distinct {
            let expr = if q.count {
                self.quote(distinct)
            } else {
                distinct.clone()
            };
            format!("DISTINCT {expr}")
        } else if has_joins && has_select_cols && !q.count {
            self.as_statements().join(", ")
        } else if has_select_cols {
            q.dialect.quote_all(&q.select_cols).join(", ")
        } else if has_joins && !q.count {
            self.stars()
                .map(|stars| stars.join(", "))
                .unwrap_or_else(|| "*".to_string())
        } else {
            "*".to_string()
        };
        self.sql.push_str(&projection);
        if q.count {
            self.sql.push(')');
        }

        let from = self.from_list();
        self.sql.push_str(" FROM ");
        self.sql.push_str(&from);

        self.write_joins();
        self.write_where();
        self.write_modifiers();
        self.finish()
    }

    fn update(mut self, cols: &std::collections::BTreeMap<String, Value>) -> (String, Vec<Value>) {
        self.write_comment();
        self.write_ctes();

        let from = self.from_list();
        self.sql.push_str("UPDATE ");
        self.sql.push_str(&from);
        self.sql.push_str(" SET ");

        // BTreeMap iteration is sorted by column name.
        for (i, (col, value)) in cols.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            let quoted = self.quote(col);
            let ph = self.q.dialect.placeholder(self.next_index());
            self.sql.push_str(&format!("{quoted} = {ph}"));
            self.args.push(value.clone());
        }

        self.write_where();
        self.write_modifiers();
        self.finish()
    }

    fn delete(mut self) -> (String, Vec<Value>) {
        self.write_comment();
        self.write_ctes();

        let from = self.from_list();
        self.sql.push_str("DELETE FROM ");
        self.sql.push_str(&from);

        self.write_where();
        self.write_modifiers();
        self.finish()
    }

    // ==================== clauses ====================

    fn write_comment(&mut self) {
        let q = self.q;
        let Some(comment) = &q.comment else {
            return;
        };
        for line in comment.lines() {
            self.sql.push_str("-- ");
            self.sql.push_str(line);
            self.sql.push('\n');
        }
    }

    fn write_ctes(&mut self) {
        if self.q.withs.is_empty() {
            return;
        }
        let q = self.q;
        let body = self.arg_clauses(&q.withs, ", ");
        self.sql.push_str("WITH ");
        self.sql.push_str(&body);
        self.sql.push(' ');
    }

    fn write_joins(&mut self) {
        let q = self.q;
        if q.joins.is_empty() {
            return;
        }
        let start = self.next_index();
        let mut raw = String::new();
        for join in &q.joins {
            raw.push(' ');
            raw.push_str(join.kind.keyword());
            raw.push(' ');
            raw.push_str(&join.clause);
            self.args.extend(join.args.iter().cloned());
        }
        let (sql, _) = convert_question_marks(self.indexed, &raw, start);
        self.sql.push_str(&sql);
    }

    fn write_where(&mut self) {
        let q = self.q;
        let preds = &q.where_;
        if preds.is_empty() {
            return;
        }
        let manual_parens = preds
            .iter()
            .any(|w| matches!(w.kind, WhereKind::LeftParen | WhereKind::RightParen));
        let (open, close) = if manual_parens { ("", "") } else { ("(", ")") };

        self.sql.push_str(" WHERE ");
        let mut not_first = false;
        for w in preds {
            if not_first && w.kind != WhereKind::RightParen {
                self.sql
                    .push_str(if w.or_separator { " OR " } else { " AND " });
            } else {
                not_first = true;
            }

            match w.kind {
                WhereKind::LeftParen => {
                    self.sql.push('(');
                    not_first = false;
                }
                WhereKind::RightParen => self.sql.push(')'),
                WhereKind::Normal => {
                    let (clause, _) =
                        convert_question_marks(self.indexed, &w.clause, self.next_index());
                    self.sql.push_str(open);
                    self.sql.push_str(&clause);
                    self.sql.push_str(close);
                    self.args.extend(w.args.iter().cloned());
                }
                WhereKind::In | WhereKind::NotIn => {
                    if w.args.is_empty() {
                        self.sql.push_str(if w.kind == WhereKind::In {
                            "(1=0)"
                        } else {
                            "(1=1)"
                        });
                        continue;
                    }
                    let clause = self.in_clause(&w.clause, w.args.len());
                    self.sql.push_str(open);
                    self.sql.push_str(&clause);
                    self.sql.push_str(close);
                    self.args.extend(w.args.iter().cloned());
                }
            }
        }
    }

    /// Expand `lhs IN ?` for `n` arguments starting at the next placeholder.
    fn in_clause(&self, clause: &str, n: usize) -> String {
        let start = self.next_index();
        let Some(caps) = IN_CLAUSE.captures(clause) else {
            // Unparseable left side: expand the first `?` as one flat group.
            return convert_in_question_marks(self.indexed, clause, start, 1, n).0;
        };

        let left = caps[1].trim();
        let keyword = if caps[2].len() > 2 { "NOT IN" } else { "IN" };
        let right = caps[3].trim();

        // `(a, b) IN ?` binds arguments in groups of two.
        let group = match left.strip_prefix('(').and_then(|l| l.strip_suffix(')')) {
            Some(inner) => inner.split(',').count(),
            None => 1,
        };

        let (left, left_count) = convert_question_marks(self.indexed, left, start);
        let (right, _) = convert_in_question_marks(
            self.indexed,
            right,
            start + left_count,
            group,
            n.saturating_sub(left_count),
        );
        format!("{left} {keyword} {right}")
    }

    fn write_modifiers(&mut self) {
        let q = self.q;
        if !q.group_by.is_empty() {
            self.sql.push_str(" GROUP BY ");
            self.sql.push_str(&q.group_by.join(", "));
        }
        if !q.having.is_empty() {
            let having = self.arg_clauses(&q.having, " AND ");
            self.sql.push_str(" HAVING ");
            self.sql.push_str(&having);
        }
        if !q.order_by.is_empty() {
            let order = self.arg_clauses(&q.order_by, ", ");
            self.sql.push_str(" ORDER BY ");
            self.sql.push_str(&order);
        }

        if !q.dialect.use_top_clause {
            if let Some(limit) = q.limit {
                self.sql.push_str(&format!(" LIMIT {limit}"));
            }
            if q.offset != 0 {
                self.sql.push_str(&format!(" OFFSET {}", q.offset));
            }
        } else if q.offset != 0 {
            // OFFSET requires an ORDER BY on TOP dialects.
            if q.order_by.is_empty() {
                self.sql.push_str(" ORDER BY (SELECT NULL)");
            }
            self.sql.push_str(&format!(" OFFSET {} ROWS", q.offset));
            if let Some(limit) = q.limit {
                self.sql.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
            }
        }

        if let Some(lock) = &q.for_lock {
            self.sql.push_str(" FOR ");
            self.sql.push_str(lock);
        }
    }

    /// Join clauses with `sep`, number their placeholders and collect their args.
    fn arg_clauses(&mut self, clauses: &[ArgClause], sep: &str) -> String {
        let start = self.next_index();
        let joined = clauses
            .iter()
            .map(|c| c.clause.as_str())
            .collect::<Vec<_>>()
            .join(sep);
        for c in clauses {
            self.args.extend(c.args.iter().cloned());
        }
        convert_question_marks(self.indexed, &joined, start).0
    }

    // ==================== projections ====================

    /// `"t"."col" AS "t.col"` for every dotted select column.
    fn as_statements(&self) -> Vec<String> {
        let (lq, rq) = (self.q.dialect.lq, self.q.dialect.rq);
        self.q
            .select_cols
            .iter()
            .map(|col| {
                if !ident::is_identifier(lq, rq, col) || !col.contains('.') || col.ends_with('*') {
                    return self.quote(col);
                }
                let alias = ident::unquote(lq, rq, col);
                format!("{} AS {lq}{alias}{rq}", self.quote(col))
            })
            .collect()
    }

    /// `"t".*` per FROM entry, using the alias when one is given.
    fn stars(&self) -> Option<Vec<String>> {
        let (lq, rq) = (self.q.dialect.lq, self.q.dialect.rq);
        self.q
            .from
            .iter()
            .map(|entry| {
                let (name, alias) = ident::parse_from_entry(lq, rq, entry)?;
                let table = alias.unwrap_or(name);
                Some(format!("{}.*", self.quote(&table)))
            })
            .collect()
    }
}
