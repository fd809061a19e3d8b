use ad_telemetry::logging::{self, LogFormat};

#[test]
fn repeated_init_is_harmless() {
    logging::init_logging("autodeploy-test", "ad_session=debug,warn");
    logging::init_logging("autodeploy-test", "info");

    tracing::info!(task_id = "t-1", "status poll applied");
}

#[test]
fn json_init_after_human_is_a_no_op() {
    logging::init("autodeploy-test", "info", LogFormat::Human);
    logging::init_logging_json("autodeploy-json", "info");

    tracing::warn!(error = "connection reset", "log stream failed");
}

#[test]
fn cli_flag_selects_format() {
    assert_eq!(LogFormat::from_json_flag(true), LogFormat::Json);
    assert_eq!(LogFormat::from_json_flag(false), LogFormat::Human);
    assert_eq!(LogFormat::default(), LogFormat::Human);
}
