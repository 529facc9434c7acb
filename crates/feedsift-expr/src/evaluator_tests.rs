//! Tests for program evaluation.

use super::*;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

// ==================== Test Helpers ====================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn eval(source: &str, item: &Item) -> Result<bool, EvaluationError> {
    let env = Environment::new().unwrap();
    let program = env.compile(source).unwrap();
    evaluate(&program, item, now())
}

fn titled(title: &str) -> Item {
    Item::builder(format!("https://example.com/{}", title.len()))
        .title(title)
        .build()
}

fn tagged(tags: &[&str]) -> Item {
    Item::builder("https://example.com/tagged")
        .title("Tagged")
        .tags(tags.iter().copied())
        .build()
}

// ==================== String Functions ====================

#[test]
fn test_contains_matches() {
    assert!(eval(r#"item.Title.contains("Go")"#, &titled("Learning Go")).unwrap());
}

#[test]
fn test_contains_no_match() {
    assert!(!eval(r#"item.Title.contains("Go")"#, &titled("Hello")).unwrap());
}

#[test]
fn test_tags_split_exists() {
    let item = tagged(&["rust", " go", " python"]);
    assert!(eval(r#"item.Tags.split(",").exists(t, t.trim() == "go")"#, &item).unwrap());
}

#[test]
fn test_tag_list_membership() {
    let item = tagged(&["rust", "go"]);
    assert!(eval(r#""go" in item.TagList"#, &item).unwrap());
    assert!(!eval(r#""java" in item.TagList"#, &item).unwrap());
}

#[test]
fn test_regex_matches() {
    let item = titled("Rust 1.80 released");
    assert!(eval(r#"item.Title.matches("^Rust [0-9.]+")"#, &item).unwrap());
    assert!(eval(r#"matches(item.Title, "(?i)released$")"#, &item).unwrap());
}

#[test]
fn test_dynamic_regex_pattern() {
    let item = Item::builder("").title("abc").content("b").build();
    assert!(eval("item.Title.matches(item.Content)", &item).unwrap());

    let bad = Item::builder("").title("abc").content("(").build();
    let err = eval("item.Title.matches(item.Content)", &bad).unwrap_err();
    assert!(matches!(err.fault, EvalFault::InvalidArgument { .. }));
}

// ==================== Time ====================

#[test]
fn test_recent_within_two_hours() {
    let item = Item::builder("https://example.com/recent")
        .published(now() - TimeDelta::hours(1))
        .build();
    assert!(eval(r#"now - item.Published < duration("2h")"#, &item).unwrap());
}

#[test]
fn test_recent_not_within_thirty_minutes() {
    let item = Item::builder("https://example.com/recent")
        .published(now() - TimeDelta::hours(1))
        .build();
    assert!(!eval(r#"now - item.Published < duration("30m")"#, &item).unwrap());
}

#[test]
fn test_timestamp_comparison() {
    let item = Item::builder("")
        .published(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        .build();
    assert!(eval(r#"item.Published > timestamp("2024-01-01T00:00:00Z")"#, &item).unwrap());
    assert!(eval("item.Published.getMonth() == 4", &item).unwrap());
}

// ==================== Absent Fields ====================

#[test]
fn test_absent_field_is_an_error() {
    let item = Item::builder("https://example.com/untitled").build();
    let err = eval(r#"item.Title.contains("Go")"#, &item).unwrap_err();
    assert_eq!(err.item, "https://example.com/untitled");
    assert_eq!(
        err.fault,
        EvalFault::AbsentField {
            field: "Title".to_string()
        }
    );
}

#[test]
fn test_absent_timestamp_is_an_error() {
    let item = Item::builder("https://example.com/undated").build();
    assert!(eval(r#"now - item.Published < duration("2h")"#, &item).is_err());
}

#[test]
fn test_empty_title_is_not_absent() {
    let item = Item::builder("").title("").build();
    assert!(eval(r#"item.Title == """#, &item).unwrap());
}

#[test]
fn test_has_never_fails() {
    let item = Item::builder("").build();
    assert!(!eval("has(item.Title)", &item).unwrap());
    assert!(eval("has(item.Title)", &titled("x")).unwrap());
}

#[test]
fn test_content_length_absent_with_content() {
    let item = Item::builder("").build();
    assert!(!eval("has(item.ContentLength)", &item).unwrap());

    let with_content = Item::builder("").content("héllo").build();
    assert!(eval("item.ContentLength == 5", &with_content).unwrap());
}

#[test]
fn test_guarded_access() {
    let source = r#"has(item.Title) && item.Title.contains("Go")"#;
    assert!(!eval(source, &Item::builder("").build()).unwrap());
    assert!(eval(source, &titled("Go time")).unwrap());
}

// ==================== Logical Operators ====================

#[test]
fn test_and_false_absorbs_error_either_side() {
    let item = Item::builder("").build();
    assert!(!eval(r#"false && item.Title == "x""#, &item).unwrap());
    assert!(!eval(r#"item.Title == "x" && false"#, &item).unwrap());
}

#[test]
fn test_or_true_absorbs_error_either_side() {
    let item = Item::builder("").build();
    assert!(eval(r#"true || item.Title == "x""#, &item).unwrap());
    assert!(eval(r#"item.Title == "x" || true"#, &item).unwrap());
}

#[test]
fn test_and_true_propagates_error() {
    let item = Item::builder("").build();
    assert!(eval(r#"true && item.Title == "x""#, &item).is_err());
    assert!(eval(r#"item.Title == "x" || false"#, &item).is_err());
}

#[test]
fn test_conditional() {
    assert!(eval(r#"item.Title.size() > 3 ? true : false"#, &titled("long title")).unwrap());
    assert!(!eval(r#"item.Title.size() > 3 ? true : false"#, &titled("ab")).unwrap());
}

// ==================== Comprehensions ====================

#[test]
fn test_all_and_exists() {
    let item = tagged(&["go", "rust"]);
    assert!(eval("item.TagList.all(t, t.size() >= 2)", &item).unwrap());
    assert!(!eval(r#"item.TagList.all(t, t == "go")"#, &item).unwrap());
    assert!(eval(r#"item.TagList.exists(t, t == "rust")"#, &item).unwrap());
    assert!(!eval(r#"item.TagList.exists(t, t == "java")"#, &item).unwrap());
}

#[test]
fn test_exists_one() {
    let item = tagged(&["go", "rust", "go"]);
    assert!(eval(r#"item.TagList.exists_one(t, t == "rust")"#, &item).unwrap());
    assert!(!eval(r#"item.TagList.exists_one(t, t == "go")"#, &item).unwrap());
}

#[test]
fn test_map_and_filter() {
    let item = tagged(&["go", "rust", "python"]);
    assert!(eval(
        r#"item.TagList.map(t, t.upperAscii()).join(",") == "GO,RUST,PYTHON""#,
        &item
    )
    .unwrap());
    assert!(eval(
        "item.TagList.filter(t, t.size() > 2).size() == 2",
        &item
    )
    .unwrap());
}

#[test]
fn test_nested_comprehensions() {
    let item = tagged(&["go", "rust"]);
    assert!(eval(
        "item.TagList.all(a, item.TagList.exists(b, a == b))",
        &item
    )
    .unwrap());
}

#[test]
fn test_exists_deciding_element_absorbs_error() {
    assert!(eval("[0, 1].exists(n, 10 / n == 10)", &Item::default()).unwrap());
    assert!(eval("[0, 1].exists(n, 10 / n == 3)", &Item::default()).is_err());
}

// ==================== Arithmetic Faults ====================

#[test]
fn test_overflow_is_an_error() {
    let item = Item::builder("").content("x").build();
    let err = eval(
        "item.ContentLength + 9223372036854775807 > 0",
        &item,
    )
    .unwrap_err();
    assert!(matches!(err.fault, EvalFault::Overflow { .. }));
}

#[test]
fn test_index_out_of_range_is_an_error() {
    let err = eval(r#"item.TagList[5] == "go""#, &tagged(&["go"])).unwrap_err();
    assert_eq!(
        err.fault,
        EvalFault::IndexOutOfRange { index: 5, size: 1 }
    );
}

// ==================== Shared Now ====================

#[test]
fn test_now_is_shared_across_items() {
    let env = Environment::new().unwrap();
    let program = env.compile(r#"now == timestamp("2024-06-01T12:00:00Z")"#).unwrap();
    let evaluator = Evaluator::new(&program, now());
    for title in ["a", "b", "c"] {
        assert!(evaluator.evaluate(&titled(title)).unwrap());
    }
}

#[test]
fn test_error_names_item_by_title_without_url() {
    let item = Item::builder("").title("Only a title").build();
    let err = eval("item.Author == \"x\"", &item).unwrap_err();
    assert_eq!(err.item, "Only a title");
    assert_eq!(
        err.to_string(),
        "evaluation failed for item 'Only a title': no such key: Author"
    );
}
