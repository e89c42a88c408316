// ABOUTME: Option command implementation.
// ABOUTME: Prints one configuration value, looked up by dotted key.

use serde_json::Value;
use skyhook::config::Config;
use skyhook::error::{Error, Result};

pub fn option(config: &Config, key: &str) -> Result<i32> {
    let value = config
        .option(key)
        .ok_or_else(|| Error::UnknownOption(key.to_string()))?;

    match value {
        Value::String(text) => println!("{}", text),
        other => println!("{}", other),
    }
    Ok(0)
}
