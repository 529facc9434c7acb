//! Tests for expression compilation.

use super::*;

fn env() -> Environment {
    Environment::new().unwrap()
}

fn compile_err(source: &str) -> CompileError {
    env()
        .compile(source)
        .expect_err(&format!("'{}' should not compile", source))
}

// ==================== Accepted Expressions ====================

#[test]
fn test_compile_valid_expressions() {
    let env = env();
    for source in [
        "true",
        r#"item.Title.contains("Go")"#,
        r#"item.Tags.split(",").exists(t, t.trim() == "go")"#,
        r#"now - item.Published < duration("2h")"#,
        r#"item.URL.startsWith("https://") && !item.Title.endsWith("?")"#,
        r#"item.TagList.all(t, t.size() > 0)"#,
        r#""go" in item.TagList"#,
        r#"item.Content.matches("(?i)rust")"#,
        r#"has(item.Author) ? item.Author == "Rob" : false"#,
        r#"item.ContentLength > 500 || item.Published.getDayOfWeek() == 0"#,
        r#"item.TagList.map(t, t.upperAscii()).filter(t, t != "GO").size() == 2"#,
        r#"[1, 2, 3].exists_one(n, n % 2 == 0)"#,
        r#"size(item.Title) >= 10 && int("42") == 42"#,
        r#"item.Published > timestamp("2024-01-01T00:00:00Z")"#,
        r#"item.Published.getHours("Europe/Berlin") < 12"#,
    ] {
        assert!(env.compile(source).is_ok(), "'{}' should compile", source);
    }
}

#[test]
fn test_program_keeps_source() {
    let program = env().compile("true").unwrap();
    assert_eq!(program.source(), "true");
}

// ==================== Syntax Errors ====================

#[test]
fn test_long_or_chain_is_rejected() {
    let source = vec!["true"; 10_000].join(" || ");
    let err = compile_err(&source);
    assert!(matches!(err, CompileError::Syntax { .. }), "{:?}", err);
    assert!(err.to_string().contains("nested too deeply"));
}

#[test]
fn test_long_method_chain_is_rejected() {
    let source = format!("item.Title{}.size() > 0", ".trim()".repeat(10_000));
    assert!(matches!(compile_err(&source), CompileError::Syntax { .. }));
}

#[test]
fn test_moderate_chain_compiles_and_evaluates() {
    let program = env()
        .compile(&vec!["item.Title == \"x\""; 100].join(" || "))
        .unwrap();
    let item = Item::builder("https://example.com/x").title("x").build();
    assert_eq!(evaluate(&program, &item, chrono::Utc::now()), Ok(true));
}

#[test]
fn test_unmatched_parenthesis_fails() {
    assert!(matches!(
        compile_err(r#"(item.Title.contains("Go")"#),
        CompileError::Syntax { .. }
    ));
    assert!(matches!(
        compile_err(r#"item.Title.contains("Go"))"#),
        CompileError::Syntax { .. }
    ));
}

#[test]
fn test_empty_expression_fails() {
    assert_eq!(compile_err(""), CompileError::EmptyExpression);
}

// ==================== Schema Errors ====================

#[test]
fn test_unknown_field_fails() {
    match compile_err("item.NonExistentField == \"x\"") {
        CompileError::UnknownField {
            type_name, field, ..
        } => {
            assert_eq!(type_name, "Item");
            assert_eq!(field, "NonExistentField");
        }
        other => panic!("expected UnknownField, got {:?}", other),
    }
}

#[test]
fn test_unknown_field_suggests_close_match() {
    match compile_err("item.title == \"x\"") {
        CompileError::UnknownField { suggestion, .. } => {
            assert_eq!(suggestion.as_deref(), Some("Title"))
        }
        other => panic!("expected UnknownField, got {:?}", other),
    }
}

#[test]
fn test_undeclared_variable_fails() {
    match compile_err("itme.Title == \"x\"") {
        CompileError::UndeclaredReference {
            name, suggestion, ..
        } => {
            assert_eq!(name, "itme");
            assert_eq!(suggestion.as_deref(), Some("item"));
        }
        other => panic!("expected UndeclaredReference, got {:?}", other),
    }
}

#[test]
fn test_unknown_function_fails() {
    assert!(matches!(
        compile_err(r#"item.Title.containz("Go")"#),
        CompileError::UndeclaredReference { .. }
    ));
}

#[test]
fn test_bare_item_fails() {
    assert!(matches!(
        compile_err("item == item"),
        CompileError::BareObject { .. }
    ));
}

// ==================== Type Errors ====================

#[test]
fn test_type_mismatch_fails() {
    match compile_err("item.Title == 123") {
        CompileError::NoMatchingOverload {
            function,
            signature,
            ..
        } => {
            assert_eq!(function, "_==_");
            assert_eq!(signature, "(string, int)");
        }
        other => panic!("expected NoMatchingOverload, got {:?}", other),
    }
}

#[test]
fn test_non_boolean_result_fails() {
    assert_eq!(
        compile_err(r#""just a string""#),
        CompileError::NonBooleanResult {
            found: "string".to_string()
        }
    );
    assert!(matches!(
        compile_err("item.ContentLength + 1"),
        CompileError::NonBooleanResult { .. }
    ));
}

#[test]
fn test_logical_operands_must_be_bool() {
    assert!(matches!(
        compile_err("item.Title && true"),
        CompileError::TypeMismatch { .. }
    ));
}

#[test]
fn test_comprehension_over_string_fails() {
    assert!(matches!(
        compile_err("item.Tags.exists(t, t == \"go\")"),
        CompileError::TypeMismatch { .. }
    ));
}

#[test]
fn test_comprehension_predicate_must_be_bool() {
    assert!(matches!(
        compile_err("item.TagList.all(t, t)"),
        CompileError::TypeMismatch { .. }
    ));
}

#[test]
fn test_comprehension_variable_is_scoped() {
    assert!(matches!(
        compile_err("item.TagList.exists(t, true) && t == \"go\""),
        CompileError::UndeclaredReference { .. }
    ));
}

#[test]
fn test_mixed_list_literal_fails() {
    assert!(matches!(
        compile_err(r#"[1, "two"].size() == 2"#),
        CompileError::TypeMismatch { .. }
    ));
}

#[test]
fn test_conditional_branches_must_agree() {
    assert!(matches!(
        compile_err(r#"(true ? 1 : "one") == 1"#),
        CompileError::TypeMismatch { .. }
    ));
}

// ==================== Macros ====================

#[test]
fn test_has_requires_field_selection() {
    assert!(matches!(
        compile_err("has(item)"),
        CompileError::InvalidMacro { .. }
    ));
    assert!(matches!(
        compile_err("has(item.Title, item.URL)"),
        CompileError::InvalidMacro { .. }
    ));
}

#[test]
fn test_has_rejects_unknown_field() {
    assert!(matches!(
        compile_err("has(item.Nope)"),
        CompileError::UnknownField { .. }
    ));
}

#[test]
fn test_comprehension_requires_variable() {
    assert!(matches!(
        compile_err("item.TagList.exists(\"t\", true)"),
        CompileError::InvalidMacro { .. }
    ));
}

// ==================== Constant Arguments ====================

#[test]
fn test_invalid_constant_duration_fails() {
    match compile_err(r#"now - item.Published < duration("2 hours")"#) {
        CompileError::InvalidArgument { function, .. } => assert_eq!(function, "duration"),
        other => panic!("expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn test_invalid_constant_timestamp_fails() {
    assert!(matches!(
        compile_err(r#"item.Published > timestamp("yesterday")"#),
        CompileError::InvalidArgument { .. }
    ));
}

#[test]
fn test_invalid_constant_regex_fails() {
    assert!(matches!(
        compile_err(r#"item.Title.matches("(unclosed")"#),
        CompileError::InvalidArgument { .. }
    ));
}

#[test]
fn test_error_messages_mention_position() {
    let message = compile_err("item.Title == 123").to_string();
    assert!(message.contains("position 11"), "{}", message);
}

// ==================== Custom Environments ====================

#[test]
fn test_custom_function_is_callable() {
    fn shout(args: &[Value]) -> Result<Value, EvalFault> {
        match args {
            [Value::String(s)] => Ok(Value::String(format!("{}!", s))),
            _ => Err(EvalFault::invalid_argument("shout", "expected a string")),
        }
    }

    let env = Environment::builder()
        .function(FunctionDecl::new("shout").overload(Overload::member(
            "string_shout",
            vec![Type::String],
            Type::String,
            shout,
        )))
        .build()
        .unwrap();
    let program = env.compile(r#"item.Title.shout() == "Hi!""#).unwrap();
    let item = Item::builder("").title("Hi").build();
    assert!(evaluate(&program, &item, chrono::Utc::now()).unwrap());
}

#[test]
fn test_environment_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Environment>();
    assert_send_sync::<Program>();
}
