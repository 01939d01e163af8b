//! Identifier quoting.
//!
//! Quoting is "smart": only expressions that look like a (possibly dotted)
//! identifier are quoted. Anything else (function calls, aliased FROM
//! entries, subqueries, `*`) passes through untouched so callers can mix raw
//! SQL into table and column lists.
//!
//! - Unquoted parts must match `[A-Za-z_][A-Za-z0-9_$-]*`
//! - Parts already wrapped in the dialect's quote pair are kept as-is
//! - A trailing `.*` is allowed (`users.*` -> `"users".*`)
//!
//! # Example
//! ```ignore
//! use sqlmold::ident;
//!
//! assert_eq!(ident::quote('"', '"', "public.users"), r#""public"."users""#);
//! assert_eq!(ident::quote('"', '"', "COUNT(*)"), "COUNT(*)");
//! ```

/// How one dotted segment of an identifier looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    /// Bare identifier that needs quoting.
    Bare(&'a str),
    /// Already wrapped in the quote pair.
    Quoted(&'a str),
    /// The `*` wildcard (last segment only).
    Star,
}

fn is_bare(seg: &str) -> bool {
    let mut chars = seg.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c == '$' || c == '-' || c.is_ascii_alphanumeric())
}

fn is_quoted(lq: char, rq: char, seg: &str) -> bool {
    seg.len() >= 2 && seg.starts_with(lq) && seg.ends_with(rq) && is_bare(trim_one(lq, rq, seg))
}

fn trim_one(lq: char, rq: char, seg: &str) -> &str {
    seg.strip_prefix(lq)
        .and_then(|s| s.strip_suffix(rq))
        .unwrap_or(seg)
}

/// Split `s` into identifier segments, or `None` if it is not identifier-like.
fn segments(lq: char, rq: char, s: &str) -> Option<Vec<Segment<'_>>> {
    if s.is_empty() {
        return None;
    }
    let raw: Vec<&str> = s.split('.').collect();
    let last = raw.len() - 1;
    let mut out = Vec::with_capacity(raw.len());
    for (i, seg) in raw.into_iter().enumerate() {
        if seg == "*" {
            // `*` alone is not an identifier; `t.*` is.
            if i != last || i == 0 {
                return None;
            }
            out.push(Segment::Star);
        } else if is_quoted(lq, rq, seg) {
            out.push(Segment::Quoted(seg));
        } else if is_bare(seg) {
            out.push(Segment::Bare(seg));
        } else {
            return None;
        }
    }
    Some(out)
}

/// Returns `true` if `s` is a (possibly dotted, possibly quoted) identifier.
pub fn is_identifier(lq: char, rq: char, s: &str) -> bool {
    segments(lq, rq, s).is_some()
}

/// Quote `s` with `lq`/`rq` if it is identifier-like; otherwise return it verbatim.
///
/// `NULL` and `?` are never quoted.
pub fn quote(lq: char, rq: char, s: &str) -> String {
    if s == "?" || s.eq_ignore_ascii_case("null") {
        return s.to_string();
    }
    let Some(segs) = segments(lq, rq, s) else {
        return s.to_string();
    };

    let mut out = String::with_capacity(s.len() + segs.len() * 2);
    for (i, seg) in segs.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        match seg {
            Segment::Bare(name) => {
                out.push(lq);
                out.push_str(name);
                out.push(rq);
            }
            Segment::Quoted(name) => out.push_str(name),
            Segment::Star => out.push('*'),
        }
    }
    out
}

/// Strip the quote pair from every segment (`"a"."b"` -> `a.b`).
pub fn unquote(lq: char, rq: char, s: &str) -> String {
    s.split('.')
        .map(|seg| trim_one(lq, rq, seg))
        .collect::<Vec<_>>()
        .join(".")
}

/// Parse a FROM entry of the form `name`, `name alias` or `name AS alias`.
///
/// Returns `(name, alias)` with quotes stripped, or `None` when the entry is
/// not in one of those shapes (subqueries, joins written into FROM, ...).
pub fn parse_from_entry(lq: char, rq: char, entry: &str) -> Option<(String, Option<String>)> {
    let toks: Vec<&str> = entry.split_whitespace().collect();
    let (name, rest) = toks.split_first()?;
    if !is_identifier(lq, rq, name) {
        return None;
    }
    let name = unquote(lq, rq, name);

    let alias = match rest {
        [] => None,
        [alias, ..] if !alias.eq_ignore_ascii_case("as") && !alias.eq_ignore_ascii_case("on") => {
            Some(*alias)
        }
        [as_kw, alias, ..] if as_kw.eq_ignore_ascii_case("as") => Some(*alias),
        _ => None,
    };

    match alias {
        Some(alias) if is_identifier(lq, rq, alias) => Some((name, Some(unquote(lq, rq, alias)))),
        Some(_) => None,
        None => Some((name, None)),
    }
}
