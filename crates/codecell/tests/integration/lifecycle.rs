use std::sync::Arc;
use std::time::Duration;

use codecell::{ExecutionRequest, LanguageId, Orchestrator};

use super::test_config;

#[tokio::test]
#[ignore = "requires root"]
async fn slots_are_released_after_every_outcome() {
    let service = test_orchestrator_with_capacity(2);
    let capacity = service.config().max_concurrency as usize;

    // Success
    service
        .submit(ExecutionRequest::new(LanguageId::Python, "print(1)"))
        .await
        .expect("Execution failed");
    assert_eq!(service.available_slots(), capacity);

    // Runtime failure
    service
        .submit(ExecutionRequest::new(LanguageId::Python, "import sys; sys.exit(1)"))
        .await
        .expect("Execution failed");
    assert_eq!(service.available_slots(), capacity);

    // Compile failure
    service
        .submit(ExecutionRequest::new(LanguageId::Cpp, "not c++ at all"))
        .await
        .expect("A failed build is still a result");
    assert_eq!(service.available_slots(), capacity);

    // Rejected before admission
    let err = service
        .submit(ExecutionRequest::new(LanguageId::Python, ""))
        .await
        .unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(service.available_slots(), capacity);
}

#[tokio::test]
#[ignore = "requires root"]
async fn concurrent_submissions_share_the_pool() {
    let service = Arc::new(test_orchestrator_with_capacity(2));

    let mut handles = Vec::new();
    for i in 0..6 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .submit(ExecutionRequest::new(
                    LanguageId::Python,
                    format!("print({i})"),
                ))
                .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap().expect("Execution failed");
        assert!(result.is_success());
        assert_eq!(String::from_utf8_lossy(&result.stdout), format!("{i}\n"));
    }

    assert_eq!(service.available_slots(), 2);
}

#[tokio::test]
#[ignore = "requires root"]
async fn queue_timeout_rejects_when_saturated() {
    let mut config = test_config();
    config.max_concurrency = 1;
    config.max_queue_wait = 0.5;
    let service = Arc::new(Orchestrator::new(config));

    let blocker = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .submit(ExecutionRequest::new(
                    LanguageId::Python,
                    "import time\ntime.sleep(3)",
                ))
                .await
        })
    };

    // Let the blocker take the only slot
    tokio::time::sleep(Duration::from_millis(300)).await;

    let err = service
        .submit(ExecutionRequest::new(LanguageId::Python, "print(1)"))
        .await
        .unwrap_err();
    assert!(matches!(err, codecell::SubmitError::QueueTimeout(_)));
    assert!(!err.is_client_error());

    blocker.await.unwrap().expect("Blocking execution failed");
    assert_eq!(service.available_slots(), 1);
}

fn test_orchestrator_with_capacity(capacity: u32) -> Orchestrator {
    let mut config = test_config();
    config.max_concurrency = capacity;
    Orchestrator::new(config)
}
