//! Structured access to system properties.
//!
//! Properties are looked up in the process environment under their full key
//! name, e.g. `bluetooth.core.le.max_adv_instances=8`.

use log::warn;

/// List of properties accessible to Rust. Add new ones here as they become
/// necessary.
pub enum PropertyI32 {
    // bluetooth.core.le
    LeMaxAdvInstances,
}

impl Into<(&'static str, i32)> for PropertyI32 {
    /// Convert the property into the property key name and a default value.
    fn into(self) -> (&'static str, i32) {
        match self {
            // Instances supported by a typical multi-advertising controller.
            PropertyI32::LeMaxAdvInstances => ("bluetooth.core.le.max_adv_instances", 5),
        }
    }
}

fn resolve_i32(key: &str, value: Option<String>, default_value: i32) -> i32 {
    match value {
        Some(raw) => raw.trim().parse::<i32>().unwrap_or_else(|_| {
            warn!("Property {} has non-integer value {:?}, using {}", key, raw, default_value);
            default_value
        }),
        None => default_value,
    }
}

/// Get the i32 value for a system property.
pub fn get_i32(prop: PropertyI32) -> i32 {
    let (key, default_value): (&'static str, i32) = prop.into();
    resolve_i32(key, std::env::var(key).ok(), default_value)
}
