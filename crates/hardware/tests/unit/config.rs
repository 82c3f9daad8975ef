//! Configuration Unit Tests.
//!
//! Verifies defaults, JSON parsing and range validation.

use ldpipe_core::Config;
use ldpipe_core::LoadUnit;
use ldpipe_core::common::LoadPipeError;
use rstest::rstest;

// ══════════════════════════════════════════════════════════
// 1. Defaults
// ══════════════════════════════════════════════════════════

#[test]
fn defaults_are_valid() {
    let cfg = Config::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.pipeline.fast_replay_delay, 1);
    assert_eq!(cfg.pipeline.chase_set_bit, 6);
    assert!(cfg.pipeline.enable_pointer_chase);
    assert_eq!(cfg.memory.line_bytes, 64);
    assert_eq!(cfg.memory.line_shift(), 6);
    assert_eq!(cfg.hazard.store_query_ports, 2);
    assert!(cfg.hazard.late_nuke_rollback);
}

#[test]
fn empty_document_yields_defaults() {
    let cfg = Config::from_json("{}").unwrap();
    assert_eq!(cfg.pipeline.fast_replay_delay, 1);
    assert_eq!(cfg.memory.line_bytes, 64);
}

// ══════════════════════════════════════════════════════════
// 2. Parsing
// ══════════════════════════════════════════════════════════

#[test]
fn partial_sections_keep_other_defaults() {
    let cfg = Config::from_json(r#"{ "memory": { "split_misaligned": false } }"#).unwrap();
    assert!(!cfg.memory.split_misaligned);
    assert!(cfg.memory.allow_unaligned_in_bank);
    assert_eq!(cfg.hazard.store_query_ports, 2);
}

#[test]
fn malformed_json_is_a_parse_error() {
    let err = Config::from_json("{ pipeline: ").unwrap_err();
    assert!(matches!(err, LoadPipeError::ConfigParse(_)));
}

// ══════════════════════════════════════════════════════════
// 3. Validation
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(r#"{ "pipeline": { "fast_replay_delay": 0 } }"#, "pipeline.fast_replay_delay")]
#[case(r#"{ "memory": { "line_bytes": 48 } }"#, "memory.line_bytes")]
#[case(r#"{ "memory": { "line_bytes": 8 } }"#, "memory.line_bytes")]
#[case(r#"{ "pipeline": { "chase_set_bit": 0 } }"#, "pipeline.chase_set_bit")]
#[case(r#"{ "pipeline": { "chase_set_bit": 12 } }"#, "pipeline.chase_set_bit")]
#[case(r#"{ "hazard": { "store_query_ports": 0 } }"#, "hazard.store_query_ports")]
fn out_of_range_values_are_rejected(#[case] json: &str, #[case] expected: &str) {
    match Config::from_json(json) {
        Err(LoadPipeError::InvalidConfig { field, .. }) => assert_eq!(field, expected),
        other => panic!("expected InvalidConfig for {expected}, got {other:?}"),
    }
}

#[test]
fn load_unit_refuses_invalid_config() {
    let mut cfg = Config::default();
    cfg.hazard.store_query_ports = 0;
    assert!(LoadUnit::new(cfg).is_err());
}

#[test]
fn error_message_names_field() {
    let mut cfg = Config::default();
    cfg.pipeline.fast_replay_delay = 0;
    let msg = cfg.validate().unwrap_err().to_string();
    assert!(msg.contains("pipeline.fast_replay_delay"), "{msg}");
}
