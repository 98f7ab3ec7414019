//! Core domain types and logic.

pub mod quote;
pub mod quote_index;
pub mod instrument;
pub mod calendar;
pub mod pairing;
pub mod cooldown;
pub mod signal;
pub mod scanner;
pub mod ranking;
pub mod admission;
pub mod trade;
pub mod backtest;
pub mod metrics;
pub mod rule;
pub mod rule_parser;
pub mod rule_eval;
pub mod strategy;
pub mod universe;
pub mod config_validation;
pub mod error;
