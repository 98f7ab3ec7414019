//! Configuration validation.
//!
//! Checks every `[backtest]` and `[strategy]` key before any data is loaded
//! and reports the first offending key.

use crate::domain::error::SwingtestError;
use crate::domain::ranking::RankerKind;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashMap;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SwingtestError> {
    validate_dates(config)?;
    validate_symbols(config)?;
    validate_data_dir(config)?;
    validate_max_positions(config)?;
    validate_non_negative_int(config, "cooldown_days")?;
    validate_non_negative_int(config, "entry_delay_days")?;
    validate_underlying_map(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SwingtestError> {
    validate_percentage(config, "stop_loss")?;
    validate_percentage(config, "take_profit")?;
    validate_ranker(config)?;
    validate_entry_exit_rules(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SwingtestError {
    SwingtestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn non_blank(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parses an optional integer key, rejecting values that are present but
/// not integers.
pub fn optional_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<i64>, SwingtestError> {
    match non_blank(config, section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("{} must be an integer, got '{}'", key, raw))),
    }
}

pub fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, SwingtestError> {
    match non_blank(config, "backtest", key) {
        None => Err(SwingtestError::ConfigMissing {
            section: "backtest".to_string(),
            key: key.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                key,
                format!("invalid {} format, expected YYYY-MM-DD", key),
            )
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SwingtestError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;
    if start_date > end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), SwingtestError> {
    let symbols = non_blank(config, "backtest", "symbols");
    let symbol = non_blank(config, "backtest", "symbol");
    match (symbols, symbol) {
        (Some(list), _) => {
            if list.split(',').any(|s| s.trim().is_empty()) {
                return Err(invalid("backtest", "symbols", "empty entry in symbol list"));
            }
            Ok(())
        }
        (None, Some(_)) => Ok(()),
        (None, None) => Err(SwingtestError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbols".to_string(),
        }),
    }
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), SwingtestError> {
    match non_blank(config, "backtest", "data_dir") {
        Some(_) => Ok(()),
        None => Err(SwingtestError::ConfigMissing {
            section: "backtest".to_string(),
            key: "data_dir".to_string(),
        }),
    }
}

fn validate_max_positions(config: &dyn ConfigPort) -> Result<(), SwingtestError> {
    match optional_int(config, "backtest", "max_positions")? {
        Some(value) if value < 1 => Err(invalid(
            "backtest",
            "max_positions",
            "max_positions must be at least 1",
        )),
        _ => Ok(()),
    }
}

fn validate_non_negative_int(config: &dyn ConfigPort, key: &str) -> Result<(), SwingtestError> {
    match optional_int(config, "backtest", key)? {
        Some(value) if value < 0 => Err(invalid(
            "backtest",
            key,
            format!("{} must be non-negative", key),
        )),
        _ => Ok(()),
    }
}

/// Parses `TRADED:SIGNAL, ...` into an override map. Symbols are uppercased.
pub fn parse_underlying_map(input: &str) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    for entry in input.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (traded, signal) = entry
            .split_once(':')
            .ok_or_else(|| format!("expected TRADED:SIGNAL, got '{}'", entry))?;
        let traded = traded.trim().to_uppercase();
        let signal = signal.trim().to_uppercase();
        if traded.is_empty() || signal.is_empty() {
            return Err(format!("expected TRADED:SIGNAL, got '{}'", entry));
        }
        if map.insert(traded.clone(), signal).is_some() {
            return Err(format!("{} is mapped more than once", traded));
        }
    }
    Ok(map)
}

fn validate_underlying_map(config: &dyn ConfigPort) -> Result<(), SwingtestError> {
    if let Some(raw) = non_blank(config, "backtest", "underlying_map") {
        parse_underlying_map(&raw).map_err(|reason| invalid("backtest", "underlying_map", reason))?;
    }
    Ok(())
}

fn validate_percentage(config: &dyn ConfigPort, key: &str) -> Result<(), SwingtestError> {
    let Some(raw) = non_blank(config, "strategy", key) else {
        return Ok(());
    };
    let value: f64 = raw
        .parse()
        .map_err(|_| invalid("strategy", key, format!("{} must be a number, got '{}'", key, raw)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(
            "strategy",
            key,
            format!("{} must be non-negative", key),
        ));
    }
    if key == "stop_loss" && value >= 100.0 {
        return Err(invalid("strategy", key, "stop_loss must be below 100"));
    }
    Ok(())
}

fn validate_ranker(config: &dyn ConfigPort) -> Result<(), SwingtestError> {
    if let Some(name) = non_blank(config, "strategy", "ranker") {
        if RankerKind::parse(&name).is_none() {
            return Err(invalid(
                "strategy",
                "ranker",
                format!(
                    "unknown ranker '{}', expected heatmap, volatility, distance_ema10, sector_strength or composite",
                    name
                ),
            ));
        }
    }
    Ok(())
}

fn validate_entry_exit_rules(config: &dyn ConfigPort) -> Result<(), SwingtestError> {
    if non_blank(config, "strategy", "entry").is_none() {
        return Err(SwingtestError::ConfigMissing {
            section: "strategy".to_string(),
            key: "entry".to_string(),
        });
    }

    let has_stop = config.get_double("strategy", "stop_loss", 0.0) > 0.0;
    let has_target = config.get_double("strategy", "take_profit", 0.0) > 0.0;
    if non_blank(config, "strategy", "exit").is_none() && !has_stop && !has_target {
        return Err(SwingtestError::ConfigMissing {
            section: "strategy".to_string(),
            key: "exit".to_string(),
        });
    }

    Ok(())
}
