//! `${VAR}` interpolation for command strings.

use crate::context::Context;
use serde_json::Value;

/// Interpolate `${VAR}` references in a string.
///
/// Variables are looked up in the context first and then in the process environment. Returns an
/// error message if a referenced variable is set in neither.
///
/// # Examples
///
/// ```
/// use suitewalk::context::Context;
/// use suitewalk::interpolate::interpolate;
///
/// let ctx = Context::new().with("name", "world").with("port", 8080);
/// assert_eq!(interpolate("hello ${name}", &ctx).unwrap(), "hello world");
/// assert_eq!(interpolate("localhost:${port}", &ctx).unwrap(), "localhost:8080");
/// ```
pub fn interpolate(s: &str, context: &Context) -> Result<String, String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_name.push(c),
                    None => {
                        return Err(format!("Unclosed variable reference: ${{{var_name}"));
                    }
                }
            }
            let value = context
                .get(&var_name)
                .map(env_value)
                .or_else(|| std::env::var(&var_name).ok())
                .ok_or_else(|| {
                    format!("Variable '{var_name}' is not set in context or environment")
                })?;
            result.push_str(&value);
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

/// Render a context value the way it is exported to child processes.
///
/// Strings are passed through; anything else is JSON-encoded.
pub fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
