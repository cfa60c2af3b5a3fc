//! OakBase Rust SDK - Query Builder Tests

use oakbase::{Error, Operator, QueryBuilder, SortDir, Value};

#[test]
fn test_empty_builder_renders_empty_string() {
  assert_eq!(QueryBuilder::new().build(), "");
}

#[test]
fn test_build_is_deterministic() {
  let query = QueryBuilder::new()
    .set_equal("status", "active")
    .or_equal("role", "admin")
    .or_group("age", "age__gte", 18)
    .populate("author")
    .select("name")
    .order_by_desc("created_at")
    .limit(10)
    .offset(5);

  assert_eq!(query.build(), query.build());
}

#[test]
fn test_equality() {
  let qs = QueryBuilder::new().set_equal("status", "active").build();
  assert_eq!(qs, "status=active");
}

#[test]
fn test_comparison_operators() {
  assert_eq!(
    QueryBuilder::new().where_greater_than_or_equal("age", 18).build(),
    "age__gte=18"
  );
  assert_eq!(QueryBuilder::new().where_greater_than("age", 18).build(), "age__gt=18");
  assert_eq!(QueryBuilder::new().where_less_than("age", 65).build(), "age__lt=65");
  assert_eq!(
    QueryBuilder::new().where_less_than_or_equal("age", 65).build(),
    "age__lte=65"
  );
  assert_eq!(
    QueryBuilder::new().where_not_equal("status", "banned").build(),
    "status__ne=banned"
  );
}

#[test]
fn test_string_operators() {
  assert_eq!(
    QueryBuilder::new().where_contains("name", "oak").build(),
    "name__contains=oak"
  );
  assert_eq!(
    QueryBuilder::new().where_starts_with("email", "admin").build(),
    "email__startswith=admin"
  );
  assert_eq!(
    QueryBuilder::new().where_ends_with("email", ".com").build(),
    "email__endswith=.com"
  );
}

#[test]
fn test_null_operator() {
  assert_eq!(
    QueryBuilder::new().where_null("deleted_at", true).build(),
    "deleted_at__isnull=true"
  );
  assert_eq!(
    QueryBuilder::new().where_null("deleted_at", false).build(),
    "deleted_at__isnull=false"
  );
}

#[test]
fn test_list_operators_join_with_comma() {
  assert_eq!(
    QueryBuilder::new().where_in("role", vec!["admin", "mod"]).build(),
    "role__in=admin,mod"
  );
  assert_eq!(
    QueryBuilder::new().where_not_in("status", vec!["banned", "deleted"]).build(),
    "status__notin=banned,deleted"
  );
  assert_eq!(
    QueryBuilder::new().where_in("level", vec![1, 2, 3]).build(),
    "level__in=1,2,3"
  );
}

#[test]
fn test_set_all_merges_with_overwrite() {
  let qs = QueryBuilder::new()
    .set_equal("a", 1)
    .set_all(vec![("b", 2), ("a", 9)])
    .build();
  assert_eq!(qs, "a=9&b=2");
}

#[test]
fn test_overwrite_keeps_first_insertion_position() {
  let qs = QueryBuilder::new()
    .set_equal("a", 1)
    .set_equal("b", 2)
    .set_equal("a", 3)
    .build();
  assert_eq!(qs, "a=3&b=2");
}

#[test]
fn test_or_conditions_accumulate_in_order() {
  let qs = QueryBuilder::new()
    .or_equal("age__gte", 18)
    .or_equal("role", "admin")
    .build();
  assert_eq!(qs, "[or]age__gte=18&[or]role=admin");
}

#[test]
fn test_typed_or_variant_matches_manual_key() {
  assert_eq!(
    QueryBuilder::new().or_greater_than_or_equal("age", 18).build(),
    QueryBuilder::new().or_equal("age__gte", 18).build()
  );
  assert_eq!(
    QueryBuilder::new().or_contains("name", "oak").build(),
    QueryBuilder::new().or_equal("name__contains", "oak").build()
  );
}

#[test]
fn test_named_or_groups() {
  let qs = QueryBuilder::new()
    .or_group("age", "age__gte", 18)
    .or_group("age", "role", "admin")
    .or_group("country", "country", "USA")
    .build();
  assert_eq!(
    qs,
    "[or:age]age__gte=18&[or:age]role=admin&[or:country]country=USA"
  );
}

#[test]
fn test_or_groups_keep_creation_order() {
  let qs = QueryBuilder::new()
    .or_group("b", "x", 1)
    .or_group("a", "y", 2)
    .or_group("b", "z", 3)
    .build();
  assert_eq!(qs, "[or:b]x=1&[or:b]z=3&[or:a]y=2");
}

#[test]
fn test_multi_field_or() {
  let qs = QueryBuilder::new()
    .multi_field_or(&["name", "email"], "john", None)
    .build();
  assert_eq!(qs, "name__or__email=john");
}

#[test]
fn test_multi_field_or_with_operator() {
  let qs = QueryBuilder::new()
    .multi_field_or(&["title", "body"], "rust", Some(Operator::StartsWith))
    .build();
  assert_eq!(qs, "title__or__body__startswith=rust");
}

#[test]
fn test_search_in_fields() {
  let qs = QueryBuilder::new()
    .search_in_fields(&["name", "email"], "john")
    .build();
  assert_eq!(qs, "name__or__email__contains=john");
}

#[test]
fn test_populate_and_select() {
  let qs = QueryBuilder::new()
    .populate("author")
    .populate_all(vec!["author.avatar", "comments"])
    .select("title")
    .select_all(vec!["author.name"])
    .build();
  assert_eq!(
    qs,
    "populate=author&populate=author.avatar&populate=comments&select=title&select=author.name"
  );
}

#[test]
fn test_sort_last_call_wins() {
  let qs = QueryBuilder::new()
    .sort_by("name", SortDir::Asc)
    .order_by_desc("created_at")
    .build();
  assert_eq!(qs, "sort_by=created_at&order=desc");
}

#[test]
fn test_pagination_emits_limit_before_offset() {
  let qs = QueryBuilder::new().offset(10).limit(5).build();
  assert_eq!(qs, "limit=5&offset=10");
}

#[test]
fn test_pagination_aliases() {
  assert_eq!(
    QueryBuilder::new().take(5).skip(10).build(),
    QueryBuilder::new().limit(5).offset(10).build()
  );
}

#[test]
fn test_emission_order_is_fixed() {
  let qs = QueryBuilder::new()
    .offset(40)
    .limit(20)
    .order_by_asc("name")
    .select("name")
    .populate("author")
    .or_group("tier", "tier", "gold")
    .or_equal("role", "admin")
    .set_equal("status", "active")
    .build();
  assert_eq!(
    qs,
    "status=active&[or]role=admin&[or:tier]tier=gold&populate=author&select=name&sort_by=name&order=asc&limit=20&offset=40"
  );
}

#[test]
fn test_value_rendering() {
  assert_eq!(QueryBuilder::new().set_equal("flag", true).build(), "flag=true");
  assert_eq!(QueryBuilder::new().set_equal("flag", false).build(), "flag=false");
  assert_eq!(QueryBuilder::new().set_equal("score", 2.5).build(), "score=2.5");
  assert_eq!(QueryBuilder::new().set_equal("count", 42).build(), "count=42");
  assert_eq!(
    QueryBuilder::new().set_equal("parent", Value::Null).build(),
    "parent=null"
  );
}

#[test]
fn test_values_are_percent_encoded() {
  let original = "a&b c=d?e#f[g]h%i+j";
  let qs = QueryBuilder::new().set_equal("note", original).build();

  // The only separators left are the pair's own '=': reserved characters in
  // the value must all be escaped.
  let (key, encoded) = qs.split_once('=').unwrap();
  assert_eq!(key, "note");
  for forbidden in ['&', '=', '#', '?', '[', ']', '+', ' '] {
    assert!(!encoded.contains(forbidden), "unescaped {:?} in {}", forbidden, encoded);
  }

  // Standard URL-decoding recovers the original value exactly.
  assert_eq!(urlencoding::decode(encoded).unwrap(), original);
}

#[test]
fn test_non_ascii_values_are_percent_encoded() {
  let qs = QueryBuilder::new().set_equal("city", "Zürich").build();
  let (_, encoded) = qs.split_once('=').unwrap();
  assert!(encoded.is_ascii());
  assert_eq!(urlencoding::decode(encoded).unwrap(), "Zürich");
}

#[test]
fn test_structural_syntax_is_not_encoded() {
  let qs = QueryBuilder::new()
    .or_equal("age__gte", 18)
    .or_group("tier", "tier", "gold")
    .build();
  assert!(qs.starts_with("[or]age__gte=18"));
  assert!(qs.ends_with("[or:tier]tier=gold"));
}

#[test]
fn test_list_elements_encoded_individually() {
  let qs = QueryBuilder::new()
    .where_in("tag", vec!["a&b", "c d"])
    .build();
  assert_eq!(qs, "tag__in=a%26b,c%20d");
}

#[test]
fn test_clone_is_independent() {
  let source = QueryBuilder::new().set_equal("status", "active");
  let before = source.build();

  let clone = source.clone().set_equal("status", "banned").or_equal("role", "admin");

  assert_eq!(source.build(), before);
  assert_ne!(clone.build(), before);
}

#[test]
fn test_clear_resets_to_fresh_state() {
  let query = QueryBuilder::new()
    .set_equal("status", "active")
    .or_equal("role", "admin")
    .or_group("age", "age__gte", 18)
    .populate("author")
    .select("name")
    .order_by_asc("name")
    .limit(10)
    .offset(5)
    .clear();

  assert!(query.is_empty());
  assert_eq!(query.build(), "");
}

#[test]
fn test_try_filter_accepts_known_tags() {
  let qs = QueryBuilder::new()
    .try_filter("age", "gte", 18)
    .unwrap()
    .build();
  assert_eq!(qs, "age__gte=18");
}

#[test]
fn test_try_filter_rejects_unknown_tags() {
  let err = QueryBuilder::new().try_filter("age", "between", 18).unwrap_err();
  assert!(matches!(err, Error::UnsupportedOperator(_)));
  assert!(format!("{}", err).contains("between"));
}

#[test]
fn test_json_boundary_rejects_objects() {
  let err = Value::try_from(serde_json::json!({"nested": true})).unwrap_err();
  assert!(matches!(err, Error::InvalidFilterValue(_)));
}

#[test]
fn test_json_boundary_accepts_primitive_arrays() {
  let value = Value::try_from(serde_json::json!(["admin", "mod"])).unwrap();
  let qs = QueryBuilder::new().filter("role", Operator::In, value).build();
  assert_eq!(qs, "role__in=admin,mod");
}

#[test]
fn test_display_matches_build() {
  let query = QueryBuilder::new().set_equal("status", "active").limit(1);
  assert_eq!(format!("{}", query), query.build());
}
