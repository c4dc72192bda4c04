//! Config validation
//!
//! Rules:
//! - sink names non-empty and unique
//! - exactly one primary sink when any sink is configured
//! - timeout_ms in 1..=60000, queue_capacity > 0
//! - type-specific params present
//! - dedup window in (0, 86400] seconds
//! - replay source has a path

use std::collections::HashSet;

use contracts::{ContractError, RelayBlueprint, SourceType};

/// Longest per-delivery timeout accepted
const MAX_TIMEOUT_MS: u64 = 60_000;

/// Longest dedup window accepted, one day
const MAX_WINDOW_SECS: f64 = 86_400.0;

/// Validate a RelayBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_receiver(blueprint)?;
    validate_dedup(blueprint)?;
    validate_sink_names(blueprint)?;
    validate_primary(blueprint)?;
    validate_sink_settings(blueprint)?;
    Ok(())
}

fn validate_receiver(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let receiver = &blueprint.receiver;
    if receiver.source == SourceType::Replay && receiver.path.is_none() {
        return Err(ContractError::config_validation(
            "receiver.path",
            "replay source requires a path",
        ));
    }
    if !(receiver.speed > 0.0) {
        return Err(ContractError::config_validation(
            "receiver.speed",
            format!("speed must be > 0, got {}", receiver.speed),
        ));
    }
    Ok(())
}

fn validate_dedup(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let window = blueprint.dedup.window_secs;
    if !(window > 0.0) || !window.is_finite() {
        return Err(ContractError::config_validation(
            "dedup.window_secs",
            format!("window_secs must be a positive number, got {window}"),
        ));
    }
    if window > MAX_WINDOW_SECS {
        return Err(ContractError::config_validation(
            "dedup.window_secs",
            format!("window_secs must be at most {MAX_WINDOW_SECS}, got {window}"),
        ));
    }
    Ok(())
}

fn validate_sink_names(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

fn validate_primary(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    if blueprint.sinks.is_empty() {
        return Ok(());
    }

    let primaries: Vec<_> = blueprint
        .sinks
        .iter()
        .filter(|sink| sink.primary)
        .map(|sink| sink.name.as_str())
        .collect();

    match primaries.len() {
        1 => Ok(()),
        0 => Err(ContractError::config_validation(
            "sinks[].primary",
            "exactly one sink must be marked primary",
        )),
        _ => Err(ContractError::config_validation(
            "sinks[].primary",
            format!("multiple primary sinks: {:?}", primaries),
        )),
    }
}

fn validate_sink_settings(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    for sink in &blueprint.sinks {
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
        if sink.timeout_ms == 0 || sink.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ContractError::config_validation(
                format!("sinks[{}].timeout_ms", sink.name),
                format!(
                    "timeout_ms must be in 1..={MAX_TIMEOUT_MS}, got {}",
                    sink.timeout_ms
                ),
            ));
        }
        for key in sink.sink_type.required_params() {
            let present = sink
                .params
                .get(*key)
                .is_some_and(|value| !value.trim().is_empty());
            if !present {
                return Err(ContractError::config_validation(
                    format!("sinks[{}].params.{}", sink.name, key),
                    format!("missing required parameter for {:?} sink", sink.sink_type),
                ));
            }
        }
    }
    Ok(())
}
