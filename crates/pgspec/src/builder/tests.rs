use super::*;
use crate::condition::{and, or};
use crate::criteria::QueryCriteria;

fn users() -> QueryBuilder {
    let mut qb = create_builder();
    qb.from("users", "u");
    qb
}

#[test]
fn test_simple_select() {
    let compiled = users().build().unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM users u");
    assert!(compiled.params.is_empty());
}

#[test]
fn test_columns_and_aliases() {
    let mut qb = users();
    qb.column("u.id")
        .column_as("u.email", "contact")
        .column_as(coalesce_name(), "name");
    let compiled = qb.build().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT u.id, u.email AS contact, COALESCE(u.nickname, $1) AS name FROM users u"
    );
    assert_eq!(compiled.params.debug_values(), vec!["\"anonymous\""]);
}

fn coalesce_name() -> Expr {
    crate::condition::coalesce([Expr::field("u.nickname"), Expr::value("anonymous")])
}

#[test]
fn test_distinct_and_columns() {
    let mut qb = users();
    qb.distinct().columns(["u.country", "u.city"]);
    assert_eq!(
        qb.build().unwrap().sql,
        "SELECT DISTINCT u.country, u.city FROM users u"
    );
}

#[test]
fn test_joins() {
    let mut qb = users();
    qb.left_join("profiles", "p", Condition::eq_field("p.user_id", "u.id"))
        .inner_join("roles", "r", Condition::eq_field("r.id", "u.role_id"))
        .right_join("teams", "t", Condition::eq_field("t.id", "u.team_id"))
        .full_join("badges", "b", Condition::eq_field("b.user_id", "u.id"))
        .column("u.*")
        .column_as("r.name", "role_name");
    assert_eq!(
        qb.build().unwrap().sql,
        "SELECT u.*, r.name AS role_name FROM users u \
         LEFT JOIN profiles p ON p.user_id = u.id \
         INNER JOIN roles r ON r.id = u.role_id \
         RIGHT JOIN teams t ON t.id = u.team_id \
         FULL OUTER JOIN badges b ON b.user_id = u.id"
    );
}

#[test]
fn test_join_condition_params_come_first() {
    let mut qb = users();
    qb.left_join(
        "orders",
        "o",
        Condition::eq_field("o.user_id", "u.id").and_with(Condition::eq("o.state", "paid")),
    )
    .where_(Condition::eq("u.status", "active"));
    let compiled = qb.build().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users u LEFT JOIN orders o ON (o.user_id = u.id AND o.state = $1) WHERE u.status = $2"
    );
    assert_eq!(compiled.params.debug_values(), vec!["\"paid\"", "\"active\""]);
}

#[test]
fn test_second_from_is_comma_separated() {
    let mut qb = users();
    qb.from("accounts", "a")
        .where_(Condition::eq_field("a.owner_id", "u.id"));
    assert_eq!(
        qb.build().unwrap().sql,
        "SELECT * FROM users u, accounts a WHERE a.owner_id = u.id"
    );
}

#[test]
fn test_schema_qualified_table() {
    let mut qb = create_builder();
    qb.from_table("public.users");
    assert_eq!(qb.build().unwrap().sql, "SELECT * FROM public.users");
}

#[test]
fn test_where_accumulates_with_and() {
    let mut qb = users();
    qb.where_eq("u.status", "active")
        .where_(or([
            Condition::eq("u.role", "admin"),
            Condition::eq("u.role", "owner"),
        ]))
        .where_(Condition::gte("u.age", 18_i32));
    assert_eq!(qb.condition_count(), 3);

    let compiled = qb.build().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users u WHERE u.status = $1 AND (u.role = $2 OR u.role = $3) AND u.age >= $4"
    );
    assert_eq!(
        compiled.params.debug_values(),
        vec!["\"active\"", "\"admin\"", "\"owner\"", "18"]
    );
}

#[test]
fn test_unescape_in_where() {
    let mut qb = users();
    qb.where_(QueryBuilder::unescape("u.created_at > now() - interval '7 days'"))
        .where_eq("u.status", "active");
    let compiled = qb.build().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users u WHERE (u.created_at > now() - interval '7 days') AND u.status = $1"
    );
    assert_eq!(compiled.params.len(), 1);
}

#[test]
fn test_unescaped_or_stays_inside_its_group() {
    let mut qb = users();
    qb.where_(QueryBuilder::unescape("u.role = 'admin' OR u.role = 'owner'"))
        .where_(Condition::eq("u.tenant_id", 7_i32));
    let compiled = qb.build().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users u WHERE (u.role = 'admin' OR u.role = 'owner') AND u.tenant_id = $1"
    );
    assert_eq!(compiled.params.debug_values(), vec!["7"]);
}

#[test]
fn test_single_unescaped_where_is_verbatim() {
    let mut qb = users();
    qb.where_(QueryBuilder::unescape("u.deleted_at IS NULL"));
    assert_eq!(
        qb.build().unwrap().sql,
        "SELECT * FROM users u WHERE u.deleted_at IS NULL"
    );
}

#[test]
fn test_group_by_and_order() {
    let mut qb = create_builder();
    qb.from("orders", "o")
        .column("o.user_id")
        .column_as(Expr::func("count", [Expr::field("*")]), "n")
        .group_by("o.user_id")
        .order_by("o.user_id", SortDir::Asc);
    assert_eq!(
        qb.build().unwrap().sql,
        "SELECT o.user_id, count(*) AS n FROM orders o GROUP BY o.user_id ORDER BY o.user_id ASC"
    );
}

#[test]
fn test_criteria_sort_appends_after_static_order() {
    let mut qb = users();
    qb.order_by("u.pinned", SortDir::Desc);
    let criteria = QueryCriteria::new()
        .sort_by("u.created_at", SortDir::Desc)
        .sort_by("u.id", SortDir::Asc);
    assert_eq!(
        qb.compile(&criteria).unwrap().sql,
        "SELECT * FROM users u ORDER BY u.pinned DESC, u.created_at DESC, u.id ASC"
    );
}

#[test]
fn test_criteria_sort_field_is_validated() {
    let criteria = QueryCriteria::new().sort_by("u.id; DROP TABLE users", SortDir::Asc);
    let err = users().compile(&criteria).unwrap_err();
    assert!(err.is_compile());
}

#[test]
fn test_criteria_sort_rejects_wildcards() {
    for field in ["*", "u.*"] {
        let criteria = QueryCriteria::new().sort_by(field, SortDir::Desc);
        let err = users().compile(&criteria).unwrap_err();
        assert!(err.is_compile(), "{field}: {err}");
    }

    let mut qb = users();
    qb.column("u.*");
    let criteria = QueryCriteria::new().sort_by("u.id", SortDir::Desc);
    assert_eq!(
        qb.compile(&criteria).unwrap().sql,
        "SELECT u.* FROM users u ORDER BY u.id DESC"
    );
}

#[test]
fn test_take_skip_become_limit_offset() {
    let criteria = QueryCriteria::new().take(21).skip(40);
    assert_eq!(
        users().compile(&criteria).unwrap().sql,
        "SELECT * FROM users u LIMIT 21 OFFSET 40"
    );
}

#[test]
fn test_no_take_means_unlimited() {
    let sql = users().compile(&QueryCriteria::new()).unwrap().sql;
    assert!(!sql.contains("LIMIT"));
    assert!(!sql.contains("OFFSET"));
}

#[test]
fn test_criteria_overrides_static_limit() {
    let mut qb = users();
    qb.limit(5).offset(10);
    assert_eq!(
        qb.clone().build().unwrap().sql,
        "SELECT * FROM users u LIMIT 5 OFFSET 10"
    );
    assert_eq!(
        qb.compile(&QueryCriteria::new().take(3)).unwrap().sql,
        "SELECT * FROM users u LIMIT 3 OFFSET 10"
    );
}

#[test]
fn test_negative_limit_is_compile_error() {
    let err = users().compile(&QueryCriteria::new().take(-1)).unwrap_err();
    assert!(err.is_compile());
    let err = users().compile(&QueryCriteria::new().skip(-5)).unwrap_err();
    assert!(err.is_compile());
}

#[test]
fn test_missing_source_is_error() {
    let mut qb = create_builder();
    qb.where_eq("id", 1_i32);
    assert!(!qb.has_source());
    let err = qb.build().unwrap_err();
    assert!(err.is_compile());
}

#[test]
fn test_join_before_from_is_error() {
    let mut qb = create_builder();
    qb.left_join("profiles", "p", Condition::eq_field("p.user_id", "u.id"));
    assert!(!qb.has_source());
    assert!(qb.build().unwrap_err().is_compile());
}

#[test]
fn test_invalid_identifiers_are_rejected() {
    let mut qb = create_builder();
    qb.from("users; DROP TABLE x", "u");
    assert!(qb.build().is_err());

    let mut qb = users();
    qb.column_as("u.id", "bad alias");
    assert!(qb.build().is_err());
}

#[test]
fn test_empty_where_group_fails_compilation() {
    let mut qb = users();
    qb.where_(and([]));
    assert!(qb.build().unwrap_err().is_compile());
}

#[test]
fn test_scalar_subquery_column() {
    let mut count = create_builder();
    count
        .from("orders", "o")
        .column(Expr::func("count", [Expr::field("*")]))
        .where_(Condition::eq_field("o.user_id", "u.id"))
        .where_eq("o.state", "paid");

    let mut qb = users();
    qb.column("u.id")
        .column_as(count, "paid_orders")
        .where_eq("u.status", "active");
    let compiled = qb.build().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT u.id, (SELECT count(*) FROM orders o WHERE o.user_id = u.id AND o.state = $1) AS paid_orders \
         FROM users u WHERE u.status = $2"
    );
    assert_eq!(compiled.params.debug_values(), vec!["\"paid\"", "\"active\""]);
}

#[test]
fn test_placeholder_count_matches_params() {
    let mut qb = users();
    qb.where_(and([
        Condition::in_list("u.id", vec![1_i64, 2, 3]),
        Condition::between("u.age", 18_i32, 30_i32),
        Condition::in_list("u.team", Vec::<i64>::new()),
    ]))
    .where_(Condition::ilike("u.name", "%al%"));
    let compiled = qb.compile(&QueryCriteria::new().take(10)).unwrap();
    let placeholders = compiled.sql.matches('$').count();
    assert_eq!(placeholders, compiled.params.len());
    assert_eq!(compiled.params_ref().len(), 6);
    assert!(compiled.sql.ends_with("u.name ILIKE $6 LIMIT 10"));
}
