//! Pure conversion of raw command arguments into typed values.
//!
//! Every command handler in the engine goes through these functions before a
//! transport call is made, which keeps the dispatch table declarative and the
//! failure texts uniform. No state, no I/O.

use crate::error::ValidationError;

/// Parse a register/coil start address. Valid range is `0..=65535`.
pub fn address(raw: &str) -> Result<u16, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|v| u16::try_from(v).ok())
        .ok_or(ValidationError::BadAddress)
}

/// Parse a read count. Must be a positive integer that fits a u16.
pub fn count(raw: &str) -> Result<u16, ValidationError> {
    match raw.trim().parse::<i64>() {
        Ok(v) if v > 0 => u16::try_from(v).map_err(|_| ValidationError::BadCount),
        _ => Err(ValidationError::BadCount),
    }
}

/// Parse a coil value: case-insensitive `true`/`1` and `false`/`0`.
pub fn boolean(raw: &str) -> Result<bool, ValidationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ValidationError::BadBoolean),
    }
}

/// Parse a single register word, `0..=65535`.
pub fn register_value(raw: &str) -> Result<u16, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|v| u16::try_from(v).ok())
        .ok_or(ValidationError::BadRegisterValue)
}

/// Parse a sequence of register words. Fails as a whole on the first bad
/// element; callers report one aggregate failure, not per-element ones.
pub fn register_values(raw: &[String]) -> Result<Vec<u16>, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::BadRegisterValue);
    }
    raw.iter().map(|v| register_value(v)).collect()
}

pub fn boolean_values(raw: &[String]) -> Result<Vec<bool>, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::BadBoolean);
    }
    raw.iter().map(|v| boolean(v)).collect()
}

/// Parse a finite IEEE-754 single-precision value for the float write path.
pub fn float_value(raw: &str) -> Result<f32, ValidationError> {
    match raw.trim().parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::BadFloatValue),
    }
}

pub fn float_values(raw: &[String]) -> Result<Vec<f32>, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::BadFloatValue);
    }
    raw.iter().map(|v| float_value(v)).collect()
}

/// Parse the `delay` duration: a non-negative integer of milliseconds.
pub fn delay_millis(raw: &str) -> Result<u64, ValidationError> {
    match raw.trim().parse::<i64>() {
        Ok(v) if v >= 0 => Ok(v as u64),
        _ => Err(ValidationError::BadDelay),
    }
}

// Composite validators. The address is checked first; the second argument is
// never looked at when the address is already invalid.

pub fn address_and_count(addr: &str, n: &str) -> Result<(u16, u16), ValidationError> {
    let addr = address(addr)?;
    let n = count(n)?;
    Ok((addr, n))
}

pub fn address_and_boolean(addr: &str, value: &str) -> Result<(u16, bool), ValidationError> {
    let addr = address(addr)?;
    let value = boolean(value)?;
    Ok((addr, value))
}

pub fn address_and_register_value(addr: &str, value: &str) -> Result<(u16, u16), ValidationError> {
    let addr = address(addr)?;
    let value = register_value(value)?;
    Ok((addr, value))
}

pub fn address_and_register_values(
    addr: &str,
    values: &[String],
) -> Result<(u16, Vec<u16>), ValidationError> {
    let addr = address(addr)?;
    let values = register_values(values)?;
    Ok((addr, values))
}

pub fn address_and_boolean_values(
    addr: &str,
    values: &[String],
) -> Result<(u16, Vec<bool>), ValidationError> {
    let addr = address(addr)?;
    let values = boolean_values(values)?;
    Ok((addr, values))
}

pub fn address_and_float_values(
    addr: &str,
    values: &[String],
) -> Result<(u16, Vec<f32>), ValidationError> {
    let addr = address(addr)?;
    let values = float_values(values)?;
    Ok((addr, values))
}
