//! The standard function library.
//!
//! Operators are registered as ordinary functions under CEL's internal
//! names (`_+_`, `_==_`, `@in`, ...) so the checker resolves them through the
//! same overload machinery as named functions.

use std::cmp::Ordering;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDateTime, SecondsFormat, TimeDelta, Timelike, Utc,
};
use chrono_tz::Tz;
use regex::Regex;

use crate::duration::{format_duration, parse_duration};
use crate::env::{FunctionDecl, Implementation, Overload};
use crate::error::EvalFault;
use crate::types::Type;
use crate::value::Value;

const OPERATORS: &[&str] = &[
    "!_", "-_", "_+_", "_-_", "_*_", "_/_", "_%_", "_==_", "_!=_", "_<_", "_<=_", "_>_", "_>=_",
    "@in", "_[_]",
];

/// Returns true for the internal names operators are registered under.
pub(crate) fn is_operator(name: &str) -> bool {
    OPERATORS.contains(&name)
}

/// All standard declarations.
pub(crate) fn standard_library() -> Vec<FunctionDecl> {
    let mut functions = operators();
    functions.extend(string_functions());
    functions.extend(list_functions());
    functions.extend(conversions());
    functions.extend(time_functions());
    functions
}

fn mismatch(function: &'static str, args: &[Value]) -> EvalFault {
    let found: Vec<String> = args.iter().map(|v| v.type_of().to_string()).collect();
    EvalFault::NoSuchOverload {
        function,
        found: found.join(", "),
    }
}

const COMPARABLE: [Type; 6] = [
    Type::Bool,
    Type::Int,
    Type::Double,
    Type::String,
    Type::Timestamp,
    Type::Duration,
];

fn comparison(name: &str, prefix: &str, implementation: Implementation) -> FunctionDecl {
    COMPARABLE.iter().fold(FunctionDecl::new(name), |decl, ty| {
        decl.overload(Overload::global(
            format!("{}_{}", prefix, ty),
            vec![ty.clone(), ty.clone()],
            Type::Bool,
            implementation,
        ))
    })
}

fn operators() -> Vec<FunctionDecl> {
    let list_t = Type::list(Type::Param);
    vec![
        FunctionDecl::new("!_").overload(Overload::global(
            "logical_not",
            vec![Type::Bool],
            Type::Bool,
            not,
        )),
        FunctionDecl::new("-_")
            .overload(Overload::global("negate_int", vec![Type::Int], Type::Int, negate))
            .overload(Overload::global("negate_double", vec![Type::Double], Type::Double, negate))
            .overload(Overload::global(
                "negate_duration",
                vec![Type::Duration],
                Type::Duration,
                negate,
            )),
        FunctionDecl::new("_==_").overload(Overload::global(
            "equals",
            vec![Type::Param, Type::Param],
            Type::Bool,
            equals,
        )),
        FunctionDecl::new("_!=_").overload(Overload::global(
            "not_equals",
            vec![Type::Param, Type::Param],
            Type::Bool,
            not_equals,
        )),
        comparison("_<_", "less", less),
        comparison("_<=_", "less_equals", less_equals),
        comparison("_>_", "greater", greater),
        comparison("_>=_", "greater_equals", greater_equals),
        FunctionDecl::new("@in").overload(Overload::global(
            "in_list",
            vec![Type::Param, list_t.clone()],
            Type::Bool,
            in_list,
        )),
        FunctionDecl::new("_[_]").overload(Overload::global(
            "index_list",
            vec![list_t.clone(), Type::Int],
            Type::Param,
            index,
        )),
        FunctionDecl::new("_+_")
            .overload(Overload::global("add_int64", vec![Type::Int, Type::Int], Type::Int, add))
            .overload(Overload::global(
                "add_double",
                vec![Type::Double, Type::Double],
                Type::Double,
                add,
            ))
            .overload(Overload::global(
                "add_string",
                vec![Type::String, Type::String],
                Type::String,
                add,
            ))
            .overload(Overload::global(
                "add_list",
                vec![list_t.clone(), list_t.clone()],
                list_t,
                add,
            ))
            .overload(Overload::global(
                "add_timestamp_duration",
                vec![Type::Timestamp, Type::Duration],
                Type::Timestamp,
                add,
            ))
            .overload(Overload::global(
                "add_duration_timestamp",
                vec![Type::Duration, Type::Timestamp],
                Type::Timestamp,
                add,
            ))
            .overload(Overload::global(
                "add_duration_duration",
                vec![Type::Duration, Type::Duration],
                Type::Duration,
                add,
            )),
        FunctionDecl::new("_-_")
            .overload(Overload::global(
                "subtract_int64",
                vec![Type::Int, Type::Int],
                Type::Int,
                subtract,
            ))
            .overload(Overload::global(
                "subtract_double",
                vec![Type::Double, Type::Double],
                Type::Double,
                subtract,
            ))
            .overload(Overload::global(
                "subtract_timestamp_timestamp",
                vec![Type::Timestamp, Type::Timestamp],
                Type::Duration,
                subtract,
            ))
            .overload(Overload::global(
                "subtract_timestamp_duration",
                vec![Type::Timestamp, Type::Duration],
                Type::Timestamp,
                subtract,
            ))
            .overload(Overload::global(
                "subtract_duration_duration",
                vec![Type::Duration, Type::Duration],
                Type::Duration,
                subtract,
            )),
        FunctionDecl::new("_*_")
            .overload(Overload::global(
                "multiply_int64",
                vec![Type::Int, Type::Int],
                Type::Int,
                multiply,
            ))
            .overload(Overload::global(
                "multiply_double",
                vec![Type::Double, Type::Double],
                Type::Double,
                multiply,
            )),
        FunctionDecl::new("_/_")
            .overload(Overload::global(
                "divide_int64",
                vec![Type::Int, Type::Int],
                Type::Int,
                divide,
            ))
            .overload(Overload::global(
                "divide_double",
                vec![Type::Double, Type::Double],
                Type::Double,
                divide,
            )),
        FunctionDecl::new("_%_").overload(Overload::global(
            "modulo_int64",
            vec![Type::Int, Type::Int],
            Type::Int,
            modulo,
        )),
    ]
}

fn not(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::Bool(b)] => Ok(Value::Bool(!b)),
        _ => Err(mismatch("!_", args)),
    }
}

fn negate(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::Int(n)] => n
            .checked_neg()
            .map(Value::Int)
            .ok_or(EvalFault::Overflow {
                operation: "negation",
            }),
        [Value::Double(n)] => Ok(Value::Double(-n)),
        [Value::Duration(d)] => TimeDelta::zero()
            .checked_sub(d)
            .map(Value::Duration)
            .ok_or(EvalFault::Overflow {
                operation: "negation",
            }),
        _ => Err(mismatch("-_", args)),
    }
}

fn equals(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [a, b] => Ok(Value::Bool(a == b)),
        _ => Err(mismatch("_==_", args)),
    }
}

fn not_equals(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [a, b] => Ok(Value::Bool(a != b)),
        _ => Err(mismatch("_!=_", args)),
    }
}

fn compare_with(
    args: &[Value],
    function: &'static str,
    accept: fn(Ordering) -> bool,
) -> Result<Value, EvalFault> {
    match args {
        [a, b] => match a.compare(b) {
            Some(ordering) => Ok(Value::Bool(accept(ordering))),
            // NaN is unordered against everything.
            None if a.type_of() == b.type_of() => Ok(Value::Bool(false)),
            None => Err(mismatch(function, args)),
        },
        _ => Err(mismatch(function, args)),
    }
}

fn less(args: &[Value]) -> Result<Value, EvalFault> {
    compare_with(args, "_<_", Ordering::is_lt)
}

fn less_equals(args: &[Value]) -> Result<Value, EvalFault> {
    compare_with(args, "_<=_", Ordering::is_le)
}

fn greater(args: &[Value]) -> Result<Value, EvalFault> {
    compare_with(args, "_>_", Ordering::is_gt)
}

fn greater_equals(args: &[Value]) -> Result<Value, EvalFault> {
    compare_with(args, "_>=_", Ordering::is_ge)
}

fn in_list(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [needle, Value::List(values)] => Ok(Value::Bool(values.contains(needle))),
        _ => Err(mismatch("@in", args)),
    }
}

fn index(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::List(values), Value::Int(i)] => usize::try_from(*i)
            .ok()
            .and_then(|idx| values.get(idx))
            .cloned()
            .ok_or(EvalFault::IndexOutOfRange {
                index: *i,
                size: values.len(),
            }),
        _ => Err(mismatch("_[_]", args)),
    }
}

fn add(args: &[Value]) -> Result<Value, EvalFault> {
    let overflow = EvalFault::Overflow {
        operation: "addition",
    };
    match args {
        [Value::Int(a), Value::Int(b)] => a.checked_add(*b).map(Value::Int).ok_or(overflow),
        [Value::Double(a), Value::Double(b)] => Ok(Value::Double(a + b)),
        [Value::String(a), Value::String(b)] => Ok(Value::String(format!("{}{}", a, b))),
        [Value::List(a), Value::List(b)] => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        [Value::Timestamp(t), Value::Duration(d)] | [Value::Duration(d), Value::Timestamp(t)] => t
            .checked_add_signed(*d)
            .map(Value::Timestamp)
            .ok_or(overflow),
        [Value::Duration(a), Value::Duration(b)] => {
            a.checked_add(b).map(Value::Duration).ok_or(overflow)
        }
        _ => Err(mismatch("_+_", args)),
    }
}

fn subtract(args: &[Value]) -> Result<Value, EvalFault> {
    let overflow = EvalFault::Overflow {
        operation: "subtraction",
    };
    match args {
        [Value::Int(a), Value::Int(b)] => a.checked_sub(*b).map(Value::Int).ok_or(overflow),
        [Value::Double(a), Value::Double(b)] => Ok(Value::Double(a - b)),
        [Value::Timestamp(a), Value::Timestamp(b)] => {
            Ok(Value::Duration(a.signed_duration_since(*b)))
        }
        [Value::Timestamp(t), Value::Duration(d)] => t
            .checked_sub_signed(*d)
            .map(Value::Timestamp)
            .ok_or(overflow),
        [Value::Duration(a), Value::Duration(b)] => {
            a.checked_sub(b).map(Value::Duration).ok_or(overflow)
        }
        _ => Err(mismatch("_-_", args)),
    }
}

fn multiply(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::Int(a), Value::Int(b)] => a
            .checked_mul(*b)
            .map(Value::Int)
            .ok_or(EvalFault::Overflow {
                operation: "multiplication",
            }),
        [Value::Double(a), Value::Double(b)] => Ok(Value::Double(a * b)),
        _ => Err(mismatch("_*_", args)),
    }
}

fn divide(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::Int(_), Value::Int(0)] => Err(EvalFault::DivisionByZero),
        [Value::Int(a), Value::Int(b)] => a
            .checked_div(*b)
            .map(Value::Int)
            .ok_or(EvalFault::Overflow {
                operation: "division",
            }),
        [Value::Double(a), Value::Double(b)] => Ok(Value::Double(a / b)),
        _ => Err(mismatch("_/_", args)),
    }
}

fn modulo(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::Int(_), Value::Int(0)] => Err(EvalFault::DivisionByZero),
        [Value::Int(a), Value::Int(b)] => a
            .checked_rem(*b)
            .map(Value::Int)
            .ok_or(EvalFault::Overflow {
                operation: "modulus",
            }),
        _ => Err(mismatch("_%_", args)),
    }
}

// ==================== Strings ====================

fn string_predicate(name: &str, implementation: Implementation) -> FunctionDecl {
    FunctionDecl::new(name).overload(Overload::member(
        format!("{}_string", name),
        vec![Type::String, Type::String],
        Type::Bool,
        implementation,
    ))
}

fn string_functions() -> Vec<FunctionDecl> {
    vec![
        string_predicate("contains", contains),
        string_predicate("startsWith", starts_with),
        string_predicate("endsWith", ends_with),
        FunctionDecl::new("matches")
            .overload(Overload::member(
                "matches_string",
                vec![Type::String, Type::String],
                Type::Bool,
                matches,
            ))
            .overload(Overload::global(
                "matches",
                vec![Type::String, Type::String],
                Type::Bool,
                matches,
            )),
        FunctionDecl::new("lowerAscii").overload(Overload::member(
            "string_lower_ascii",
            vec![Type::String],
            Type::String,
            lower_ascii,
        )),
        FunctionDecl::new("upperAscii").overload(Overload::member(
            "string_upper_ascii",
            vec![Type::String],
            Type::String,
            upper_ascii,
        )),
        FunctionDecl::new("trim").overload(Overload::member(
            "string_trim",
            vec![Type::String],
            Type::String,
            trim,
        )),
        FunctionDecl::new("split").overload(Overload::member(
            "string_split_string",
            vec![Type::String, Type::String],
            Type::list(Type::String),
            split,
        )),
        FunctionDecl::new("replace").overload(Overload::member(
            "string_replace_string_string",
            vec![Type::String, Type::String, Type::String],
            Type::String,
            replace,
        )),
        FunctionDecl::new("indexOf").overload(Overload::member(
            "string_index_of_string",
            vec![Type::String, Type::String],
            Type::Int,
            index_of,
        )),
    ]
}

fn contains(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s), Value::String(sub)] => Ok(Value::Bool(s.contains(sub.as_str()))),
        _ => Err(mismatch("contains", args)),
    }
}

fn starts_with(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s), Value::String(prefix)] => {
            Ok(Value::Bool(s.starts_with(prefix.as_str())))
        }
        _ => Err(mismatch("startsWith", args)),
    }
}

fn ends_with(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s), Value::String(suffix)] => Ok(Value::Bool(s.ends_with(suffix.as_str()))),
        _ => Err(mismatch("endsWith", args)),
    }
}

fn matches(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s), Value::String(pattern)] => {
            let regex = compile_regex(pattern).map_err(|e| EvalFault::invalid_argument("matches", e))?;
            Ok(Value::Bool(regex.is_match(s)))
        }
        _ => Err(mismatch("matches", args)),
    }
}

/// Compiles a `matches` pattern.
pub(crate) fn compile_regex(pattern: &str) -> Result<Regex, String> {
    Regex::new(pattern).map_err(|e| e.to_string())
}

fn lower_ascii(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s)] => Ok(Value::String(s.to_ascii_lowercase())),
        _ => Err(mismatch("lowerAscii", args)),
    }
}

fn upper_ascii(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s)] => Ok(Value::String(s.to_ascii_uppercase())),
        _ => Err(mismatch("upperAscii", args)),
    }
}

fn trim(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s)] => Ok(Value::String(s.trim().to_string())),
        _ => Err(mismatch("trim", args)),
    }
}

fn split(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s), Value::String(separator)] => {
            let parts: Vec<Value> = if separator.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(separator.as_str()).map(Value::from).collect()
            };
            Ok(Value::List(parts))
        }
        _ => Err(mismatch("split", args)),
    }
}

fn replace(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s), Value::String(from), Value::String(to)] => {
            Ok(Value::String(s.replace(from.as_str(), to)))
        }
        _ => Err(mismatch("replace", args)),
    }
}

fn index_of(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s), Value::String(sub)] => {
            let index = match s.find(sub.as_str()) {
                Some(byte_offset) => char_count(&s[..byte_offset]),
                None => -1,
            };
            Ok(Value::Int(index))
        }
        _ => Err(mismatch("indexOf", args)),
    }
}

fn char_count(s: &str) -> i64 {
    i64::try_from(s.chars().count()).unwrap_or(i64::MAX)
}

// ==================== Lists ====================

fn list_functions() -> Vec<FunctionDecl> {
    let list_t = Type::list(Type::Param);
    let strings = Type::list(Type::String);
    vec![
        FunctionDecl::new("size")
            .overload(Overload::global("size_string", vec![Type::String], Type::Int, size))
            .overload(Overload::global("size_list", vec![list_t.clone()], Type::Int, size))
            .overload(Overload::member("string_size", vec![Type::String], Type::Int, size))
            .overload(Overload::member("list_size", vec![list_t], Type::Int, size)),
        FunctionDecl::new("join")
            .overload(Overload::member(
                "list_join",
                vec![strings.clone()],
                Type::String,
                join,
            ))
            .overload(Overload::member(
                "list_join_string",
                vec![strings, Type::String],
                Type::String,
                join,
            )),
    ]
}

fn size(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s)] => Ok(Value::Int(char_count(s))),
        [Value::List(values)] => Ok(Value::Int(
            i64::try_from(values.len()).unwrap_or(i64::MAX),
        )),
        _ => Err(mismatch("size", args)),
    }
}

fn join(args: &[Value]) -> Result<Value, EvalFault> {
    let (values, separator) = match args {
        [Value::List(values)] => (values, ""),
        [Value::List(values), Value::String(separator)] => (values, separator.as_str()),
        _ => return Err(mismatch("join", args)),
    };
    let parts = values
        .iter()
        .map(|v| v.as_str().ok_or_else(|| mismatch("join", args)))
        .collect::<Result<Vec<&str>, EvalFault>>()?;
    Ok(Value::String(parts.join(separator)))
}

// ==================== Conversions ====================

fn conversions() -> Vec<FunctionDecl> {
    let string = [
        Type::String,
        Type::Bool,
        Type::Int,
        Type::Double,
        Type::Timestamp,
        Type::Duration,
    ]
    .into_iter()
    .fold(FunctionDecl::new("string"), |decl, ty| {
        decl.overload(Overload::global(
            format!("{}_to_string", ty),
            vec![ty],
            Type::String,
            to_string,
        ))
    });
    let int = [Type::Int, Type::Double, Type::String, Type::Timestamp]
        .into_iter()
        .fold(FunctionDecl::new("int"), |decl, ty| {
            decl.overload(Overload::global(
                format!("{}_to_int64", ty),
                vec![ty],
                Type::Int,
                to_int,
            ))
        });
    let double = [Type::Double, Type::Int, Type::String]
        .into_iter()
        .fold(FunctionDecl::new("double"), |decl, ty| {
            decl.overload(Overload::global(
                format!("{}_to_double", ty),
                vec![ty],
                Type::Double,
                to_double,
            ))
        });

    vec![
        string,
        int,
        double,
        FunctionDecl::new("duration").overload(
            Overload::global(
                "string_to_duration",
                vec![Type::String],
                Type::Duration,
                to_duration,
            )
            .foldable(),
        ),
        FunctionDecl::new("timestamp").overload(
            Overload::global(
                "string_to_timestamp",
                vec![Type::String],
                Type::Timestamp,
                to_timestamp,
            )
            .foldable(),
        ),
    ]
}

fn to_string(args: &[Value]) -> Result<Value, EvalFault> {
    let s = match args {
        [Value::String(s)] => s.clone(),
        [Value::Bool(b)] => b.to_string(),
        [Value::Int(n)] => n.to_string(),
        [Value::Double(n)] => n.to_string(),
        [Value::Timestamp(t)] => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        [Value::Duration(d)] => format_duration(*d),
        _ => return Err(mismatch("string", args)),
    };
    Ok(Value::String(s))
}

fn to_int(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::Int(n)] => Ok(Value::Int(*n)),
        [Value::Double(n)] => {
            let truncated = n.trunc();
            // i64::MAX is not exactly representable; the bound below is 2^63.
            if truncated.is_finite() && truncated >= -9.223_372_036_854_776e18 && truncated < 9.223_372_036_854_776e18 {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(EvalFault::invalid_argument("int", format!("double {} out of int range", n)))
            }
        }
        [Value::String(s)] => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| EvalFault::invalid_argument("int", format!("cannot parse '{}' as int", s))),
        [Value::Timestamp(t)] => Ok(Value::Int(t.timestamp())),
        _ => Err(mismatch("int", args)),
    }
}

fn to_double(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::Double(n)] => Ok(Value::Double(*n)),
        [Value::Int(n)] => Ok(Value::Double(*n as f64)),
        [Value::String(s)] => s.trim().parse::<f64>().map(Value::Double).map_err(|_| {
            EvalFault::invalid_argument("double", format!("cannot parse '{}' as double", s))
        }),
        _ => Err(mismatch("double", args)),
    }
}

fn to_duration(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s)] => parse_duration(s)
            .map(Value::Duration)
            .map_err(|e| EvalFault::invalid_argument("duration", e.to_string())),
        _ => Err(mismatch("duration", args)),
    }
}

fn to_timestamp(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::String(s)] => DateTime::parse_from_rfc3339(s)
            .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
            .map_err(|e| {
                EvalFault::invalid_argument("timestamp", format!("invalid RFC 3339 timestamp '{}': {}", s, e))
            }),
        _ => Err(mismatch("timestamp", args)),
    }
}

// ==================== Time ====================

fn time_functions() -> Vec<FunctionDecl> {
    let timestamp_getter = |name: &str, implementation: Implementation| {
        FunctionDecl::new(name)
            .overload(Overload::member(
                format!("timestamp_{}", name),
                vec![Type::Timestamp],
                Type::Int,
                implementation,
            ))
            .overload(Overload::member(
                format!("timestamp_{}_with_tz", name),
                vec![Type::Timestamp, Type::String],
                Type::Int,
                implementation,
            ))
    };
    let with_duration = |decl: FunctionDecl, implementation: Implementation| {
        let id = format!("duration_{}", decl.name);
        decl.overload(Overload::member(
            id,
            vec![Type::Duration],
            Type::Int,
            implementation,
        ))
    };

    vec![
        timestamp_getter("getFullYear", get_full_year),
        timestamp_getter("getMonth", get_month),
        timestamp_getter("getDayOfMonth", get_day_of_month),
        timestamp_getter("getDate", get_date),
        timestamp_getter("getDayOfWeek", get_day_of_week),
        timestamp_getter("getDayOfYear", get_day_of_year),
        with_duration(timestamp_getter("getHours", get_hours), get_hours),
        with_duration(timestamp_getter("getMinutes", get_minutes), get_minutes),
        with_duration(timestamp_getter("getSeconds", get_seconds), get_seconds),
        with_duration(
            timestamp_getter("getMilliseconds", get_milliseconds),
            get_milliseconds,
        ),
    ]
}

/// Converts a UTC timestamp to wall-clock time in the named zone. Accepts
/// IANA names (`America/New_York`) and fixed offsets (`+05:30`).
fn in_zone(
    timestamp: DateTime<Utc>,
    zone: &str,
    function: &'static str,
) -> Result<NaiveDateTime, EvalFault> {
    if let Ok(tz) = zone.parse::<Tz>() {
        return Ok(timestamp.with_timezone(&tz).naive_local());
    }
    parse_offset(zone)
        .map(|offset| timestamp.with_timezone(&offset).naive_local())
        .ok_or_else(|| EvalFault::invalid_argument(function, format!("unknown time zone '{}'", zone)))
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let (sign, rest) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn timestamp_part(
    args: &[Value],
    function: &'static str,
    part: fn(&NaiveDateTime) -> u32,
) -> Result<Value, EvalFault> {
    let local = match args {
        [Value::Timestamp(t)] => t.naive_utc(),
        [Value::Timestamp(t), Value::String(zone)] => in_zone(*t, zone, function)?,
        _ => return Err(mismatch(function, args)),
    };
    Ok(Value::Int(i64::from(part(&local))))
}

fn get_full_year(args: &[Value]) -> Result<Value, EvalFault> {
    let local = match args {
        [Value::Timestamp(t)] => t.naive_utc(),
        [Value::Timestamp(t), Value::String(zone)] => in_zone(*t, zone, "getFullYear")?,
        _ => return Err(mismatch("getFullYear", args)),
    };
    Ok(Value::Int(i64::from(local.year())))
}

fn get_month(args: &[Value]) -> Result<Value, EvalFault> {
    timestamp_part(args, "getMonth", |t| t.month0())
}

fn get_day_of_month(args: &[Value]) -> Result<Value, EvalFault> {
    timestamp_part(args, "getDayOfMonth", |t| t.day0())
}

fn get_date(args: &[Value]) -> Result<Value, EvalFault> {
    timestamp_part(args, "getDate", |t| t.day())
}

fn get_day_of_week(args: &[Value]) -> Result<Value, EvalFault> {
    timestamp_part(args, "getDayOfWeek", |t| t.weekday().num_days_from_sunday())
}

fn get_day_of_year(args: &[Value]) -> Result<Value, EvalFault> {
    timestamp_part(args, "getDayOfYear", |t| t.ordinal0())
}

fn get_hours(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::Duration(d)] => Ok(Value::Int(d.num_hours())),
        _ => timestamp_part(args, "getHours", |t| t.hour()),
    }
}

fn get_minutes(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::Duration(d)] => Ok(Value::Int(d.num_minutes())),
        _ => timestamp_part(args, "getMinutes", |t| t.minute()),
    }
}

fn get_seconds(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::Duration(d)] => Ok(Value::Int(d.num_seconds())),
        _ => timestamp_part(args, "getSeconds", |t| t.second()),
    }
}

fn get_milliseconds(args: &[Value]) -> Result<Value, EvalFault> {
    match args {
        [Value::Duration(d)] => Ok(Value::Int(d.num_milliseconds())),
        _ => timestamp_part(args, "getMilliseconds", |t| t.nanosecond() / 1_000_000),
    }
}
