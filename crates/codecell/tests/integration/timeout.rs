use codecell::{ExecutionRequest, LanguageId, ResourceLimits, TIMEOUT_EXIT_CODE};

use codecell::Orchestrator;

use super::test_config;

/// Orchestrator with tight limits so timeout tests stay fast.
fn quick_timeout_orchestrator() -> Orchestrator {
    let mut config = test_config();
    config.default_limits = ResourceLimits {
        time_limit: Some(0.5),
        wall_time_limit: Some(1.0),
        extra_time: Some(0.2),
        ..config.default_limits
    };
    Orchestrator::new(config)
}

#[tokio::test]
#[ignore = "requires root"]
async fn infinite_loop_reports_timeout_sentinel() {
    let service = quick_timeout_orchestrator();

    let result = service
        .submit(ExecutionRequest::new(
            LanguageId::Python,
            "while True: pass",
        ))
        .await
        .expect("A timeout is still a result");

    assert!(result.timed_out);
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert!(!result.is_success());
}

#[tokio::test]
#[ignore = "requires root"]
async fn javascript_busy_loop_times_out() {
    let service = quick_timeout_orchestrator();

    let result = service
        .submit(ExecutionRequest::new(LanguageId::Javascript, "while (true) {}"))
        .await
        .expect("A timeout is still a result");

    assert!(result.timed_out);
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
}

#[tokio::test]
#[ignore = "requires root"]
async fn partial_output_survives_a_timeout() {
    let service = quick_timeout_orchestrator();

    let source = r#"
import sys
print("before the loop", flush=True)
while True:
    pass
"#;

    let result = service
        .submit(ExecutionRequest::new(LanguageId::Python, source))
        .await
        .expect("A timeout is still a result");

    assert!(result.timed_out);
    assert!(String::from_utf8_lossy(&result.stdout).contains("before the loop"));
}

#[tokio::test]
#[ignore = "requires root"]
async fn service_is_usable_after_a_timeout() {
    let service = quick_timeout_orchestrator();

    let timed_out = service
        .submit(ExecutionRequest::new(
            LanguageId::Python,
            "while True: pass",
        ))
        .await
        .expect("A timeout is still a result");
    assert!(timed_out.timed_out);

    let ok = service
        .submit(ExecutionRequest::new(LanguageId::Python, "print('ok')"))
        .await
        .expect("Execution failed");
    assert!(ok.is_success());
    assert_eq!(String::from_utf8_lossy(&ok.stdout), "ok\n");
}

#[tokio::test]
#[ignore = "requires root"]
async fn sleep_past_wall_limit_times_out() {
    let mut config = test_config();
    config.default_limits.wall_time_limit = Some(1.0);
    config.default_limits.extra_time = Some(0.2);
    let service = Orchestrator::new(config);

    let result = service
        .submit(ExecutionRequest::new(
            LanguageId::Python,
            "import time\ntime.sleep(60)",
        ))
        .await
        .expect("A timeout is still a result");

    assert!(result.timed_out);
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
}
