//! Core domain types and logic.

pub mod price;
pub mod position;
pub mod indicator;
pub mod tracker;
pub mod rule;
pub mod rule_parser;
pub mod rule_eval;
pub mod strategy;
pub mod state_machine;
pub mod engine;
pub mod backtest;
pub mod live;
pub mod metrics;
pub mod grid_search;
pub mod config_validation;
pub mod error;
