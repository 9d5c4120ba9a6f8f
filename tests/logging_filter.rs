// tests/logging_filter.rs

use convcache::cli::LogLevel;
use convcache::logging::build_filter;

#[test]
fn cli_level_overrides_environment() {
    assert_eq!(build_filter(Some(LogLevel::Debug)).to_string(), "debug");
    assert_eq!(build_filter(Some(LogLevel::Warn)).to_string(), "warn");
}
