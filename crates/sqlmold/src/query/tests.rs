use super::*;
use crate::qm;
use crate::{Value, args};

fn pg() -> Query {
    Query::new(Dialect::postgres())
}

fn built(q: &Query) -> String {
    q.build().0
}

// ==================== SELECT ====================

#[test]
fn test_select_star() {
    let mut q = pg();
    q.append_from("videos");
    assert_eq!(built(&q), r#"SELECT * FROM "videos";"#);
}

#[test]
fn test_where_in_expands_args() {
    let mut q = pg();
    q.append_from("videos");
    q.append_in("id IN ?", args![1, 2, 3]);

    let (sql, args) = q.build();
    assert_eq!(sql, r#"SELECT * FROM "videos" WHERE (id IN ($1,$2,$3));"#);
    assert_eq!(args, args![1, 2, 3]);
}

#[test]
fn test_where_in_non_indexed() {
    let mut q = Query::new(Dialect::mysql());
    q.append_from("videos");
    q.append_in("id IN ?", args![1, 2, 3]);
    assert_eq!(built(&q), "SELECT * FROM `videos` WHERE (id IN (?,?,?));");
}

#[test]
fn test_where_in_composite_groups() {
    let mut q = pg();
    q.append_from("t");
    q.append_where("x = ?", args![0]);
    q.append_in("(a, b) IN ?", args![1, 2, 3, 4, 5, 6]);

    let (sql, args) = q.build();
    assert_eq!(
        sql,
        r#"SELECT * FROM "t" WHERE (x = $1) AND ((a, b) IN (($2,$3),($4,$5),($6,$7)));"#
    );
    assert_eq!(args.len(), 7);
}

#[test]
fn test_where_not_in() {
    let mut q = pg();
    q.append_from("t");
    q.append_not_in("id not in ?", args![4, 5]);
    assert_eq!(built(&q), r#"SELECT * FROM "t" WHERE (id NOT IN ($1,$2));"#);
}

#[test]
fn test_empty_in_and_not_in() {
    let mut q = pg();
    q.append_from("t");
    q.append_in("id IN ?", args![]);
    q.append_not_in("id NOT IN ?", args![]);
    q.append_where("x = ?", args![1]);

    let (sql, args) = q.build();
    assert_eq!(sql, r#"SELECT * FROM "t" WHERE (1=0) AND (1=1) AND (x = $1);"#);
    assert_eq!(args, args![1]);
}

#[test]
fn test_in_with_placeholder_on_left() {
    let mut q = pg();
    q.append_from("t");
    q.append_in("? IN ?", args![9, 1, 2]);
    assert_eq!(built(&q), r#"SELECT * FROM "t" WHERE ($1 IN ($2,$3));"#);
}

#[test]
fn test_in_fallback_without_keyword() {
    let mut q = pg();
    q.append_from("t");
    q.append_in("id = ANY ?", args![1, 2]);
    assert_eq!(built(&q), r#"SELECT * FROM "t" WHERE (id = ANY ($1,$2));"#);
}

#[test]
fn test_escaped_question_mark() {
    let mut q = pg();
    q.append_from("docs");
    q.append_where(r"data \? 'tag' AND id = ?", args![7]);
    assert_eq!(
        built(&q),
        r#"SELECT * FROM "docs" WHERE (data ? 'tag' AND id = $1);"#
    );
}

#[test]
fn test_manual_parens_disable_auto_wrapping() {
    let mut q = pg();
    q.append_from("t");
    q.append_where("a = ?", args![1]);
    q.append_where_left_paren();
    q.append_where("b = ?", args![2]);
    q.append_where("c = ?", args![3]);
    q.set_last_where_as_or();
    q.append_where_right_paren();
    q.append_in("d IN ?", args![4, 5]);

    assert_eq!(
        built(&q),
        r#"SELECT * FROM "t" WHERE a = $1 AND (b = $2 OR c = $3) AND d IN ($4,$5);"#
    );
}

#[test]
fn test_select_columns_are_quoted() {
    let mut q = pg();
    q.append_select(["id", "public.videos.title", "COUNT(*)"]);
    q.append_from("public.videos");
    assert_eq!(
        built(&q),
        r#"SELECT "id", "public"."videos"."title", COUNT(*) FROM "public"."videos";"#
    );
}

#[test]
fn test_join_aliases_dotted_columns() {
    let mut q = pg();
    q.apply([
        qm::select(["videos.id", "users.name", "score"]),
        qm::from("videos"),
        qm::inner_join("users on users.id = videos.user_id", args![]),
    ]);
    assert_eq!(
        built(&q),
        r#"SELECT "videos"."id" AS "videos.id", "users"."name" AS "users.name", "score" FROM "videos" INNER JOIN users on users.id = videos.user_id;"#
    );
}

#[test]
fn test_join_without_columns_selects_stars() {
    let mut q = pg();
    q.apply([
        qm::from("videos v"),
        qm::left_outer_join("users u on u.id = v.user_id", args![]),
    ]);
    assert_eq!(
        built(&q),
        r#"SELECT "v".* FROM videos v LEFT JOIN users u on u.id = v.user_id;"#
    );
}

#[test]
fn test_join_kinds() {
    let mut q = pg();
    q.apply([
        qm::from("a"),
        qm::inner_join("b on true", args![]),
        qm::left_outer_join("c on true", args![]),
        qm::right_outer_join("d on true", args![]),
        qm::full_outer_join("e on true", args![]),
    ]);
    let sql = built(&q);
    assert!(sql.contains(
        " INNER JOIN b on true LEFT JOIN c on true RIGHT JOIN d on true FULL JOIN e on true"
    ));
}

#[test]
fn test_numbering_spans_ctes_joins_and_where() {
    let mut q = pg();
    q.apply([
        qm::with("recent AS (SELECT * FROM videos WHERE age < ?)", args![7]),
        qm::from("recent"),
        qm::inner_join("users on users.id = recent.user_id AND users.level > ?", args![2]),
        qm::where_("recent.likes > ?", args![100]),
    ]);

    let (sql, args) = q.build();
    assert_eq!(
        sql,
        r#"WITH recent AS (SELECT * FROM videos WHERE age < $1) SELECT "recent".* FROM "recent" INNER JOIN users on users.id = recent.user_id AND users.level > $2 WHERE (recent.likes > $3);"#
    );
    assert_eq!(args, args![7, 2, 100]);
}

#[test]
fn test_distinct_and_count() {
    let mut q = pg();
    q.append_from("videos");
    q.set_count();
    assert_eq!(built(&q), r#"SELECT COUNT(*) FROM "videos";"#);

    q.set_distinct("user_id");
    assert_eq!(built(&q), r#"SELECT COUNT(DISTINCT "user_id") FROM "videos";"#);

    let mut q = pg();
    q.append_from("videos");
    q.set_distinct("user_id, title");
    assert_eq!(built(&q), r#"SELECT DISTINCT user_id, title FROM "videos";"#);
}

#[test]
fn test_modifiers() {
    let mut q = pg();
    q.apply([
        qm::from("t"),
        qm::where_("a = ?", args![1]),
        qm::group_by("a"),
        qm::group_by("b"),
        qm::having("count(*) > ?", args![2]),
        qm::order_by("a DESC", args![]),
        qm::order_by("b = ?", args![3]),
        qm::limit(5),
        qm::offset(10),
        qm::for_("UPDATE"),
    ]);

    let (sql, args) = q.build();
    assert_eq!(
        sql,
        r#"SELECT * FROM "t" WHERE (a = $1) GROUP BY a, b HAVING count(*) > $2 ORDER BY a DESC, b = $3 LIMIT 5 OFFSET 10 FOR UPDATE;"#
    );
    assert_eq!(args, args![1, 2, 3]);
}

#[test]
fn test_having_clauses_joined_with_and() {
    let mut q = pg();
    q.apply([
        qm::from("t"),
        qm::group_by("a"),
        qm::having("count(*) > ?", args![1]),
        qm::having("sum(b) < ?", args![9]),
    ]);

    let (sql, args) = q.build();
    assert_eq!(
        sql,
        r#"SELECT * FROM "t" GROUP BY a HAVING count(*) > $1 AND sum(b) < $2;"#
    );
    assert_eq!(args, args![1, 9]);
}

#[test]
fn test_top_dialect_limit_only() {
    let mut q = Query::new(Dialect::mssql());
    q.append_from("videos");
    q.set_limit(5);
    assert_eq!(built(&q), "SELECT TOP (5) * FROM [videos];");
}

#[test]
fn test_top_dialect_offset_fetch() {
    let mut q = Query::new(Dialect::mssql());
    q.append_from("videos");
    q.set_limit(5);
    q.set_offset(10);
    assert_eq!(
        built(&q),
        "SELECT * FROM [videos] ORDER BY (SELECT NULL) OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY;"
    );

    q.append_order_by("id", args![]);
    assert_eq!(
        built(&q),
        "SELECT * FROM [videos] ORDER BY id OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY;"
    );
}

#[test]
fn test_comment_lines() {
    let mut q = pg();
    q.append_from("t");
    q.set_comment("hello\nworld");
    assert_eq!(built(&q), "-- hello\n-- world\nSELECT * FROM \"t\";");
}

// ==================== UPDATE / DELETE / raw ====================

#[test]
fn test_update_sorted_columns() {
    let mut q = pg();
    q.append_from("t");
    q.set_update([("name", Value::from("Bob")), ("age", Value::from(30))]);
    q.append_where("id = ?", args![5]);

    let (sql, args) = q.build();
    assert_eq!(sql, r#"UPDATE "t" SET "age" = $1, "name" = $2 WHERE (id = $3);"#);
    assert_eq!(args, args![30, "Bob", 5]);
}

#[test]
fn test_update_merges_columns() {
    let mut q = pg();
    q.append_from("t");
    q.set_update([("a", 1)]);
    q.set_update([("b", 2), ("a", 3)]);
    let (sql, args) = q.build();
    assert_eq!(sql, r#"UPDATE "t" SET "a" = $1, "b" = $2;"#);
    assert_eq!(args, args![3, 2]);
}

#[test]
fn test_delete() {
    let mut q = pg();
    q.append_from("videos");
    q.set_delete();
    q.append_where("id = ?", args![1]);
    assert_eq!(built(&q), r#"DELETE FROM "videos" WHERE (id = $1);"#);
}

#[test]
fn test_statement_precedence() {
    let mut q = pg();
    q.append_from("t");
    q.set_delete();
    q.set_update([("a", 1)]);
    assert_eq!(q.statement(), &Statement::Delete);

    q.set_sql("SELECT 1", args![]);
    q.set_delete();
    assert!(matches!(q.statement(), Statement::Raw { .. }));
}

#[test]
fn test_raw_sql_is_verbatim() {
    let mut q = Query::raw(Dialect::postgres(), "select * from t where a = ?", args![1]);
    q.append_where("ignored = ?", args![2]);
    assert_eq!(q.build(), ("select * from t where a = ?".to_string(), args![1]));

    q.set_args(args![3]);
    assert_eq!(q.build().1, args![3]);
}

// ==================== query state ====================

#[test]
fn test_build_is_memoized_and_invalidated() {
    let mut q = pg();
    q.append_from("t");
    let first = q.build();
    assert_eq!(q.build(), first);

    q.set_limit(1);
    assert_eq!(built(&q), r#"SELECT * FROM "t" LIMIT 1;"#);

    let cloned = q.clone();
    assert_eq!(cloned.build(), q.build());
}

#[test]
fn test_remove_soft_delete_where() {
    let mut q = pg();
    q.append_from("videos");
    q.append_where(r#""videos"."deleted_at" is null"#, args![]);
    q.append_where("deleted_at IS NULL", args![]);
    q.append_where("archived_at is null", args![]);
    q.append_where("id = ?", args![1]);
    q.remove_soft_delete_where();

    assert_eq!(
        built(&q),
        r#"SELECT * FROM "videos" WHERE (archived_at is null) AND (id = $1);"#
    );
}
