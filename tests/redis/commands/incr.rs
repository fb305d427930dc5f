use redis_replica::{
    commands::CommandError,
    key_value_store::{DataType, Value},
};

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_handle_incr_command() {
    let env = TestEnv::new_master_server();

    let test_cases = vec![
        (TestUtils::incr_command("counter"), 1),
        (TestUtils::incr_command("counter"), 2),
        (TestUtils::incr_command("counter"), 3),
        (TestUtils::incr_command("other"), 1),
    ];

    for (command, expected_value) in test_cases {
        env.exec_command_ok(
            command,
            &TestUtils::client_address(41844),
            &TestUtils::expected_integer(expected_value),
        )
        .await;
    }

    assert_eq!(
        env.get_store().await.get("counter"),
        Some(&Value::string("3"))
    );
}

#[tokio::test]
async fn test_handle_incr_command_existing_value() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::set_command("counter", "41"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_ok(
        TestUtils::incr_command("counter"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_integer(42),
    )
    .await;

    env.exec_command_ok(
        TestUtils::set_command_with_expiration("timed", "9", 10_000),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_ok(
        TestUtils::incr_command("timed"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_integer(10),
    )
    .await;

    let store_guard = env.get_store().await;
    let value = store_guard.get("timed").expect("key should be present");
    assert_eq!(value.data, DataType::String("10".to_string()));
    assert!(value.expiration.is_some());
}

#[tokio::test]
async fn test_handle_incr_command_invalid() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::set_command("fruit", "mango"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_ok(
        TestUtils::set_command("big", &i64::MAX.to_string()),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_ok(
        TestUtils::xadd_command("stream", "1-1", &["grape", "mango"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_bulk_string("1-1"),
    )
    .await;

    let test_cases = vec![
        (
            TestUtils::invalid_command(&["INCR"]),
            CommandError::InvalidIncrCommand,
        ),
        (
            TestUtils::invalid_command(&["INCR", "counter", "other"]),
            CommandError::InvalidIncrCommand,
        ),
        (TestUtils::incr_command("fruit"), CommandError::InvalidIncrValue),
        (TestUtils::incr_command("big"), CommandError::InvalidIncrValue),
        (
            TestUtils::incr_command("stream"),
            CommandError::InvalidDataTypeForKey,
        ),
    ];

    for (command, expected_error) in test_cases {
        env.exec_command_err(command, &TestUtils::client_address(41844), expected_error)
            .await;
    }

    assert_eq!(env.get_store().await.get("fruit"), Some(&Value::string("mango")));
}
