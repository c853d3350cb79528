use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current unix timestamp in milliseconds
pub fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Validate a provided name value
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name string must not be empty".into());
    }
    if name.contains(['+', '/', '#']) {
        return Err(format!(
            "name string {name} cannot contain '+', '/' or '#' characters"
        ));
    }
    Ok(())
}
