//! Pull phase retry and exhaustion scenarios

mod support;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use edgent::models::stack::{EdgeStackStatusCode, EngineKind};
use edgent::stack::table::{MAX_RETRIES, RETRY_INTERVAL};

use support::{manager_with, manager_with_interval, stack_config, wait_for, MockCoordinator, MockDeployer};

#[tokio::test(flavor = "multi_thread")]
async fn test_pull_retries_until_success() {
    let root = tempfile::tempdir().unwrap();
    let coordinator = Arc::new(MockCoordinator::default());
    let deployer = Arc::new(MockDeployer::failing_pulls(2));
    let manager = manager_with(coordinator.clone(), deployer.clone(), root.path());

    manager
        .set_engine_status(EngineKind::DockerStandalone)
        .await
        .unwrap();

    let mut config = stack_config("web", "services: {}\n");
    config.pre_pull_image = true;
    coordinator.set_config(7, config);

    manager.start().await.unwrap();
    manager
        .update_stacks_status(&HashMap::from([(7, 1)]))
        .await
        .unwrap();

    wait_for(
        "deploy after pull retries",
        || coordinator.statuses(7).contains(&EdgeStackStatusCode::Ok),
        Duration::from_secs(10),
    )
    .await;
    manager.stop().await.unwrap();

    // Two failed attempts, then the third pull succeeds and the deploy
    // phase runs exactly once.
    assert_eq!(deployer.pull_count(), 3);
    assert_eq!(deployer.deploy_count(), 1);
    assert_eq!(
        coordinator.statuses(7),
        vec![
            EdgeStackStatusCode::Acknowledged,
            EdgeStackStatusCode::ImagesPulled,
            EdgeStackStatusCode::Ok,
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pull_exhaustion_is_terminal() {
    let root = tempfile::tempdir().unwrap();
    let coordinator = Arc::new(MockCoordinator::default());
    let deployer = Arc::new(MockDeployer::failing_pulls(u32::MAX));
    // A zero sleep lets the worker burn through the full retry budget.
    let manager = manager_with_interval(coordinator.clone(), deployer.clone(), root.path(), "0s");

    manager
        .set_engine_status(EngineKind::DockerStandalone)
        .await
        .unwrap();

    let mut config = stack_config("web", "services: {}\n");
    config.re_pull_image = true;
    coordinator.set_config(7, config);

    manager.start().await.unwrap();
    manager
        .update_stacks_status(&HashMap::from([(7, 1)]))
        .await
        .unwrap();

    wait_for(
        "retry exhaustion",
        || coordinator.statuses(7).contains(&EdgeStackStatusCode::Error),
        Duration::from_secs(120),
    )
    .await;
    manager.stop().await.unwrap();

    // The worker attempted one real pull per sweep for the initial burst,
    // then one per RETRY_INTERVAL sweeps until the cap.
    let expected_pulls = (RETRY_INTERVAL + MAX_RETRIES / RETRY_INTERVAL - 1) as usize;
    assert_eq!(deployer.pull_count(), expected_pulls);

    // The deploy phase never ran and the pull error was reported.
    assert_eq!(deployer.deploy_count(), 0);
    assert!(coordinator.last_message(7).unwrap().contains("pull failed"));
}
