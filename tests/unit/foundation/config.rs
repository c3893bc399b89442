use super::*;

#[test]
fn defaults_validate() {
    let cfg = GfxConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.proxy_threshold, 1);
    assert_eq!(cfg.disposer.max_reclaimed_per_poll, 10_000);
    assert_eq!(cfg.disposer.max_deferred_per_poll, 100);
}

#[test]
fn partial_json_fills_defaults() {
    let cfg: GfxConfig =
        serde_json::from_str(r#"{"proxy_threshold":3,"pool":{"strategy":"queue"}}"#).unwrap();
    assert_eq!(cfg.proxy_threshold, 3);
    assert_eq!(cfg.pool.strategy, PoolStrategy::Queue);
    assert_eq!(cfg.pool.strength, RefStrength::Hard);
    assert_eq!(cfg.lcd_text_contrast, 140);
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(serde_json::from_str::<GfxConfig>(r#"{"bogus":1}"#).is_err());
}

#[test]
fn contrast_out_of_range_is_config_error() {
    let cfg = GfxConfig {
        lcd_text_contrast: 99,
        ..GfxConfig::default()
    };
    let err = cfg.validate().unwrap_err();
    assert!(matches!(err, GfxError::Config(_)));
}

#[test]
fn json_string_is_parsed_and_validated() {
    let cfg = GfxConfig::from_json_str(r#"{"proxy_threshold": 5}"#).unwrap();
    assert_eq!(cfg.proxy_threshold, 5);
    let err = GfxConfig::from_json_str(r#"{"lcd_text_contrast": 300}"#).unwrap_err();
    assert!(matches!(err, GfxError::Config(_)));
    let err = GfxConfig::from_json_str("{").unwrap_err();
    assert!(matches!(err, GfxError::Config(_)));
}
