//! Transformations shipped with the engine.

use eunomia_core::{
    params, CallbackRegistry, CallbackRegistryBuilder, CoreError, PortInputs, PortOutputs, Scalar,
};

/// Name of the pass-through transformation
pub const PASSTHROUGH: &str = "passthrough";
/// Name of the summing transformation
pub const SUM: &str = "sum";

/// Copy every parameter of input port `in` to output port `out`
pub fn passthrough(inputs: &PortInputs) -> Result<Option<PortOutputs>, CoreError> {
    Ok(inputs
        .get("in")
        .filter(|params| !params.is_empty())
        .map(|params| PortOutputs::from([("out".to_string(), params.clone())])))
}

/// Sum the numeric `value` parameter of every input port into `out.value`.
///
/// The result is an integer when every addend is. Inputs without a numeric
/// `value` are ignored, and nothing is published if none has one.
pub fn sum(inputs: &PortInputs) -> Result<Option<PortOutputs>, CoreError> {
    let values: Vec<&Scalar> = inputs
        .values()
        .filter_map(|params| params.get("value"))
        .filter(|value| value.as_f64().is_some())
        .collect();

    if values.is_empty() {
        return Ok(None);
    }

    let total = if values.iter().all(|v| v.as_i64().is_some()) {
        let mut total: i64 = 0;
        for value in &values {
            let addend = value.as_i64().unwrap_or_default();
            total = total.checked_add(addend).ok_or_else(|| {
                CoreError::CallbackError("Integer overflow while summing inputs".to_string())
            })?;
        }
        Scalar::Integer(total)
    } else {
        Scalar::Float(values.iter().filter_map(|v| v.as_f64()).sum())
    };

    Ok(Some(PortOutputs::from([(
        "out".to_string(),
        params([("value", total)]),
    )])))
}

/// Builder pre-loaded with the built-in transformations
pub fn builtin_builder() -> CallbackRegistryBuilder {
    CallbackRegistry::builder()
        .register_fn(PASSTHROUGH, passthrough)
        .register_fn(SUM, sum)
}

/// Registry containing only the built-in transformations
pub fn builtin_registry() -> CallbackRegistry {
    builtin_builder().build()
}
