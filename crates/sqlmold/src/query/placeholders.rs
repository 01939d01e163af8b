//! `?` to placeholder conversion.
//!
//! Clause text is written with bare `?` markers. Indexed dialects get `$N`
//! numbered left to right; other dialects keep `?`. A backslash-escaped `\?`
//! is emitted as a literal `?` and never consumes a number.

fn push_placeholder(out: &mut String, indexed: bool, n: usize) {
    if indexed {
        out.push('$');
        out.push_str(&n.to_string());
    } else {
        out.push('?');
    }
}

/// Replace every unescaped `?` in `clause`, numbering from `start`.
///
/// Returns the rewritten clause and the number of placeholders written.
pub fn convert_question_marks(indexed: bool, clause: &str, start: usize) -> (String, usize) {
    let mut out = String::with_capacity(clause.len() + 8);
    let mut count = 0;
    let mut chars = clause.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'?') => {
                chars.next();
                out.push('?');
            }
            '?' => {
                push_placeholder(&mut out, indexed, start + count);
                count += 1;
            }
            _ => out.push(c),
        }
    }
    (out, count)
}

/// Expand the first unescaped `?` in `clause` into `(p1,p2,...)`.
///
/// `total` placeholders are written, numbered from `start` and grouped by
/// `group` (`group > 1` yields `((p1,p2),(p3,p4))`). Text after the expanded
/// marker is copied untouched. Returns the clause and the number of
/// placeholders written (0 when the clause has no marker).
pub fn convert_in_question_marks(
    indexed: bool,
    clause: &str,
    start: usize,
    group: usize,
    total: usize,
) -> (String, usize) {
    let mut out = String::with_capacity(clause.len() + total * 4);
    let mut chars = clause.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some((_, '?'))) => {
                chars.next();
                out.push('?');
            }
            '?' => {
                out.push('(');
                out.push_str(&placeholders(indexed, total, start, group));
                out.push(')');
                out.push_str(&clause[i + 1..]);
                return (out, total);
            }
            _ => out.push(c),
        }
    }
    (out, 0)
}

/// Comma-separated list of `count` placeholders numbered from `start`.
///
/// ```ignore
/// assert_eq!(placeholders(true, 4, 1, 2), "($1,$2),($3,$4)");
/// assert_eq!(placeholders(false, 3, 1, 1), "?,?,?");
/// ```
pub fn placeholders(indexed: bool, count: usize, start: usize, group: usize) -> String {
    let mut out = String::with_capacity(count * 4);
    for i in 0..count {
        if i != 0 {
            out.push(',');
        }
        if group > 1 && i % group == 0 {
            out.push('(');
        }
        push_placeholder(&mut out, indexed, start + i);
        if group > 1 && (i + 1) % group == 0 {
            out.push(')');
        }
    }
    out
}
