use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;
use crate::client::ClientError;

/// `{"success": true, "message": ..}` with any object fields of `data` merged in
fn success_body(message: &str, data: Option<Value>) -> Value {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    body.insert("message".into(), Value::String(message.to_string()));
    if let Some(Value::Object(extra)) = data {
        body.extend(extra);
    }
    Value::Object(body)
}

/// Failure body for `--json` mode. API errors carry the HTTP status they came back with.
fn error_body(err: &anyhow::Error) -> Value {
    let mut body = json!({ "success": false, "error": format!("{err:#}") });
    if let Some(ClientError::Api { status, .. }) = err.downcast_ref::<ClientError>() {
        body["status"] = json!(status);
    }
    body
}

pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&success_body(message, data))?),
        OutputFormat::Text => println!("✓ {}", message),
    }
    Ok(())
}

/// Report a failed command. JSON goes to stdout so scripts can parse it; text goes to stderr.
pub fn output_error(output_format: &OutputFormat, err: &anyhow::Error) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&error_body(err))?),
        OutputFormat::Text => eprintln!("Error: {err:#}"),
    }
    Ok(())
}

/// Print a collection: pretty JSON under `collection_name`, or one text line per item
pub fn output_collection<T, F>(
    output_format: &OutputFormat,
    collection_name: &str,
    items: &[T],
    text_line: F,
) -> anyhow::Result<()>
where
    T: Serialize,
    F: Fn(&T) -> String,
{
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: items }))?);
        }
        OutputFormat::Text if items.is_empty() => println!("No {} found", collection_name),
        OutputFormat::Text => {
            for item in items {
                println!("{}", text_line(item));
            }
        }
    }
    Ok(())
}

/// `[x]` / `[ ]` marker for text listings
pub fn check_mark(enabled: bool) -> &'static str {
    if enabled {
        "[x]"
    } else {
        "[ ]"
    }
}
