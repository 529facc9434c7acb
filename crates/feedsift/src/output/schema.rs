//! Schema output formatting.

use feedsift_expr::{Environment, Overload, Presence, ITEM_TYPE};
use serde::Serialize;

use super::helpers::{dim, header};

/// JSON output structure for the schema command.
#[derive(Serialize)]
pub struct SchemaOutput<'a> {
    pub variables: Vec<SchemaVariableOutput<'a>>,
    pub fields: Vec<SchemaFieldOutput<'a>>,
    pub functions: Vec<SchemaFunctionOutput<'a>>,
}

/// JSON output structure for a declared variable.
#[derive(Serialize)]
pub struct SchemaVariableOutput<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub ty: String,
}

/// JSON output structure for an `Item` field.
#[derive(Serialize)]
pub struct SchemaFieldOutput<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub ty: String,
    pub optional: bool,
    pub description: &'a str,
}

/// JSON output structure for a function and its signatures.
#[derive(Serialize)]
pub struct SchemaFunctionOutput<'a> {
    pub name: &'a str,
    pub signatures: Vec<String>,
}

/// Renders one overload as `receiver.name(args) -> result` or
/// `name(args) -> result`.
pub fn format_signature(name: &str, overload: &Overload) -> String {
    let types: Vec<String> = overload.params.iter().map(ToString::to_string).collect();
    if overload.receiver_style {
        let (receiver, args) = types
            .split_first()
            .map_or(("", &[][..]), |(r, a)| (r.as_str(), a));
        format!(
            "{}.{}({}) -> {}",
            receiver,
            name,
            args.join(", "),
            overload.result
        )
    } else {
        format!("{}({}) -> {}", name, types.join(", "), overload.result)
    }
}

fn schema_output(env: &Environment) -> SchemaOutput<'_> {
    let variables = env
        .variables()
        .iter()
        .map(|v| SchemaVariableOutput {
            name: &v.name,
            ty: v.ty.to_string(),
        })
        .collect();

    let fields = env
        .object_type(ITEM_TYPE)
        .map(|item| {
            item.fields
                .iter()
                .map(|f| SchemaFieldOutput {
                    name: &f.name,
                    ty: f.ty.to_string(),
                    optional: f.presence == Presence::Optional,
                    description: &f.description,
                })
                .collect()
        })
        .unwrap_or_default();

    let mut functions: Vec<SchemaFunctionOutput> = env
        .functions()
        .map(|f| SchemaFunctionOutput {
            name: &f.name,
            signatures: f
                .overloads
                .iter()
                .map(|o| format_signature(&f.name, o))
                .collect(),
        })
        .collect();
    functions.sort_by(|a, b| a.name.cmp(b.name));

    SchemaOutput {
        variables,
        fields,
        functions,
    }
}

/// Formats the schema as JSON.
pub fn format_schema_json(env: &Environment) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schema_output(env))
}

/// Formats the schema as a table.
pub fn format_schema_table(env: &Environment, use_colors: bool) -> String {
    let schema = schema_output(env);
    let mut output = String::new();

    output.push_str(&header("Variables", use_colors));
    output.push('\n');
    for variable in &schema.variables {
        output.push_str(&format!("  {:<10} {}\n", variable.name, variable.ty));
    }

    output.push('\n');
    output.push_str(&header(&format!("{} fields", ITEM_TYPE), use_colors));
    output.push('\n');
    for field in &schema.fields {
        let presence = if field.optional { "optional" } else { "always" };
        let line = format!("  {:<14} {:<14} {:<9}", field.name, field.ty, presence);
        output.push_str(&line);
        if !field.description.is_empty() {
            output.push(' ');
            output.push_str(&dim(field.description, use_colors));
        }
        output.push('\n');
    }

    output.push('\n');
    output.push_str(&header("Functions", use_colors));
    output.push('\n');
    for function in &schema.functions {
        for signature in &function.signatures {
            output.push_str(&format!("  {}\n", signature));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsift_expr::{Type, Value};

    fn env() -> Environment {
        Environment::new().unwrap()
    }

    #[test]
    fn test_format_signature() {
        fn noop(_: &[Value]) -> Result<Value, feedsift_expr::EvalFault> {
            Ok(Value::Bool(true))
        }
        let member = Overload::member(
            "contains_string",
            vec![Type::String, Type::String],
            Type::Bool,
            noop,
        );
        let global = Overload::global("size_string", vec![Type::String], Type::Int, noop);

        assert_eq!(
            format_signature("contains", &member),
            "string.contains(string) -> bool"
        );
        assert_eq!(format_signature("size", &global), "size(string) -> int");
    }

    #[test]
    fn test_schema_table_lists_fields() {
        let table = format_schema_table(&env(), false);

        assert!(table.contains("Variables"));
        assert!(table.contains("item"));
        assert!(table.contains("now"));
        assert!(table.contains("URL"));
        assert!(table.contains("ContentLength"));
        assert!(table.contains("string.contains(string) -> bool"));
    }

    #[test]
    fn test_schema_json() {
        let json = format_schema_json(&env()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let fields = value["fields"].as_array().unwrap();
        let url = fields.iter().find(|f| f["name"] == "URL").unwrap();
        assert_eq!(url["type"], "string");
        assert_eq!(url["optional"], false);
        let title = fields.iter().find(|f| f["name"] == "Title").unwrap();
        assert_eq!(title["optional"], true);
    }
}
