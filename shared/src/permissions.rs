use serde_json::{Map, Value};

use crate::text_enum::text_enum;
use crate::RuleError;

pub const ADMIN_ROLE: &str = "admin";

text_enum! {
    /// A permission-gated area of the application.
    pub enum Module {
        Dashboard => "dashboard",
        Admin => "admin",
        Finance => "finance",
        Production => "production",
        Maintenance => "maintenance",
        Inventory => "inventory",
        Quality => "quality",
        Commercial => "commercial",
        Purchase => "purchase",
        Hr => "hr",
        Chat => "chat",
        Support => "support",
        Fiscal => "fiscal",
    }
}

/// Admins pass every check. Anyone else needs the module flag set in their
/// permission map, or a role named after the module.
pub fn has_permission(role: &str, permissions: &Value, module: Module) -> bool {
    if role == ADMIN_ROLE || role == module.as_str() {
        return true;
    }
    permissions
        .get(module.as_str())
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// A permission map with every module set to `granted`.
pub fn uniform_permissions(granted: bool) -> Value {
    let map: Map<String, Value> = Module::ALL
        .iter()
        .map(|m| (m.as_str().to_string(), Value::Bool(granted)))
        .collect();
    Value::Object(map)
}

/// Validates a submitted permission map and fills the modules it leaves out
/// with `false`.
pub fn normalize_permissions(input: &Value) -> Result<Value, RuleError> {
    let submitted = input
        .as_object()
        .ok_or_else(|| RuleError::invalid("permissions must be an object"))?;

    let mut map = match uniform_permissions(false) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in submitted {
        let module: Module = key.parse()?;
        let granted = value
            .as_bool()
            .ok_or_else(|| RuleError::invalid(format!("permission '{key}' must be a boolean")))?;
        map.insert(module.as_str().to_string(), Value::Bool(granted));
    }
    Ok(Value::Object(map))
}
