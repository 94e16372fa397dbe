//! Minimal placeholder substitution for prompt templates
//!
//! `{name}` is replaced by the value bound to `name`; `{{` and `}}` produce
//! literal braces. Anything else involving a brace is an error.

use crate::types::StorageError;
use std::collections::HashMap;

pub fn render(template: &str, vars: &HashMap<&str, &str>) -> Result<String, StorageError> {
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(StorageError::Template(
                                "Unterminated placeholder".to_string(),
                            ));
                        }
                        Some(c) => name.push(c),
                    }
                }

                let value = vars.get(name.trim()).ok_or_else(|| {
                    StorageError::Template(format!("Unknown placeholder '{}'", name))
                })?;
                output.push_str(value);
            }
            '}' => {
                return Err(StorageError::Template(
                    "Single '}' encountered in template".to_string(),
                ));
            }
            c => output.push(c),
        }
    }

    Ok(output)
}
