use codecell::{ExecutionRequest, LanguageId};

use super::test_orchestrator;

#[tokio::test]
#[ignore = "requires root"]
async fn python_prints_to_stdout() {
    let service = test_orchestrator();

    let result = service
        .submit(ExecutionRequest::new(LanguageId::Python, "print(2 + 2)"))
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert_eq!(String::from_utf8_lossy(&result.stdout), "4\n");
    assert!(result.stderr.is_empty());
}

#[tokio::test]
#[ignore = "requires root"]
async fn python_reads_stdin() {
    let service = test_orchestrator();

    let request = ExecutionRequest::new(
        LanguageId::Python,
        "name = input()\nprint(f'hello {name}')",
    )
    .with_stdin("world\n");

    let result = service.submit(request).await.expect("Execution failed");

    assert!(result.is_success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("hello world"));
}

#[tokio::test]
#[ignore = "requires root"]
async fn javascript_runs_under_node() {
    let service = test_orchestrator();

    let result = service
        .submit(ExecutionRequest::new(
            LanguageId::Javascript,
            "console.log(6 * 7)",
        ))
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert_eq!(String::from_utf8_lossy(&result.stdout), "42\n");
}

#[tokio::test]
#[ignore = "requires root"]
async fn runtime_error_is_a_result_not_an_error() {
    let service = test_orchestrator();

    let result = service
        .submit(ExecutionRequest::new(
            LanguageId::Python,
            "import sys\nsys.exit(3)",
        ))
        .await
        .expect("Execution failed");

    assert!(!result.is_success());
    assert_eq!(result.exit_code, 3);
    assert!(!result.timed_out);
}

#[tokio::test]
#[ignore = "requires root"]
async fn uncaught_exception_lands_in_stderr() {
    let service = test_orchestrator();

    let result = service
        .submit(ExecutionRequest::new(
            LanguageId::Python,
            "raise ValueError('boom')",
        ))
        .await
        .expect("Execution failed");

    assert_eq!(result.exit_code, 1);
    assert!(String::from_utf8_lossy(&result.stderr).contains("ValueError: boom"));
}

#[tokio::test]
#[ignore = "requires root"]
async fn identical_submissions_produce_identical_results() {
    let service = test_orchestrator();

    let request = ExecutionRequest::new(
        LanguageId::Python,
        "total = sum(int(x) for x in input().split())\nprint(total)",
    )
    .with_stdin("3 4 5\n");

    let first = service
        .submit(request.clone())
        .await
        .expect("Execution failed");
    let second = service.submit(request).await.expect("Execution failed");

    assert_eq!(first.exit_code, second.exit_code);
    assert_eq!(first.stdout, second.stdout);
    assert_eq!(String::from_utf8_lossy(&first.stdout), "12\n");
}

#[tokio::test]
#[ignore = "requires root"]
async fn oversized_output_is_truncated() {
    let service = test_orchestrator();
    let cap = service.config().max_output_bytes;

    let result = service
        .submit(ExecutionRequest::new(
            LanguageId::Python,
            "print('x' * (1024 * 1024 * 4))",
        ))
        .await
        .expect("Execution failed");

    assert!(result.truncated);
    assert!(result.stdout.len() <= cap);
}
