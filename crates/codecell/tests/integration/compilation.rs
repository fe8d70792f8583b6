use codecell::{ExecutionRequest, LanguageId};

use super::test_orchestrator;

const HELLO_CPP: &str = r#"
#include <iostream>
int main() {
    std::cout << "Hello, World!" << std::endl;
    return 0;
}
"#;

const HELLO_JAVA: &str = r#"
public class Main {
    public static void main(String[] args) {
        System.out.println("Hello, World!");
    }
}
"#;

#[tokio::test]
#[ignore = "requires root"]
async fn cpp_compiles_and_runs() {
    let service = test_orchestrator();

    let result = service
        .submit(ExecutionRequest::new(LanguageId::Cpp, HELLO_CPP))
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("Hello, World!"));
}

#[tokio::test]
#[ignore = "requires root"]
async fn java_compiles_and_runs() {
    let service = test_orchestrator();

    let result = service
        .submit(ExecutionRequest::new(LanguageId::Java, HELLO_JAVA))
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("Hello, World!"));
}

#[tokio::test]
#[ignore = "requires root"]
async fn cpp_compile_error_reports_diagnostics() {
    let service = test_orchestrator();

    let result = service
        .submit(ExecutionRequest::new(
            LanguageId::Cpp,
            "int main() { return 0 }",
        ))
        .await
        .expect("A failed build is still a result");

    assert!(!result.is_success());
    assert_ne!(result.exit_code, 0);
    assert!(result.stdout.is_empty());
    assert!(String::from_utf8_lossy(&result.stderr).contains("error"));
}

#[tokio::test]
#[ignore = "requires root"]
async fn cpp_runtime_stdin_round_trip() {
    let service = test_orchestrator();

    let source = r#"
#include <iostream>
#include <string>
int main() {
    std::string line;
    std::getline(std::cin, line);
    std::cout << "got: " << line << std::endl;
    return 0;
}
"#;

    let result = service
        .submit(ExecutionRequest::new(LanguageId::Cpp, source).with_stdin("test input\n"))
        .await
        .expect("Execution failed");

    assert!(result.is_success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("got: test input"));
}

#[tokio::test]
#[ignore = "requires root"]
async fn cpp_segfault_maps_to_signal_exit() {
    let service = test_orchestrator();

    let source = r#"
int main() {
    int *p = nullptr;
    return *p;
}
"#;

    let result = service
        .submit(ExecutionRequest::new(LanguageId::Cpp, source))
        .await
        .expect("Execution failed");

    assert!(!result.is_success());
    // 128 + SIGSEGV
    assert_eq!(result.exit_code, 139);
}
