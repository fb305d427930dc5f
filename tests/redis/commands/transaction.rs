use redis_replica::{
    commands::{CommandError, CommandHandler},
    key_value_store::Value,
    state::StateError,
};

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_handle_multi_command() {
    let env = TestEnv::new_master_server();
    let client_address = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::multi_command(),
        &client_address,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    assert_eq!(
        env.get_state().await.get_transaction(&client_address),
        Some(&Vec::new())
    );

    env.exec_command_err(
        TestUtils::multi_command(),
        &client_address,
        CommandError::TransactionError(StateError::TransactionAlreadyStarted),
    )
    .await;
}

#[tokio::test]
async fn test_handle_exec_command_immediately_after_multi_command() {
    let env = TestEnv::new_master_server();
    let client_address = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::multi_command(),
        &client_address,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_ok(TestUtils::exec_command(), &client_address, "*0\r\n")
        .await;

    assert_eq!(env.get_state().await.get_transaction(&client_address), None);
}

#[tokio::test]
async fn test_handle_exec_and_discard_without_multi() {
    let env = TestEnv::new_master_server();

    let test_cases = vec![
        (TestUtils::exec_command(), CommandError::ExecWithoutMulti),
        (TestUtils::discard_command(), CommandError::DiscardWithoutMulti),
        (
            TestUtils::invalid_command(&["MULTI", "now"]),
            CommandError::InvalidMultiCommand,
        ),
    ];

    for (command, expected_error) in test_cases {
        env.exec_command_err(command, &TestUtils::client_address(41844), expected_error)
            .await;
    }
}

#[tokio::test]
async fn test_handle_should_queue_commands() {
    let env = TestEnv::new_master_server();
    let client_address = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::multi_command(),
        &client_address,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    for command in [
        TestUtils::set_command("grapes", "4"),
        TestUtils::incr_command("grapes"),
    ] {
        env.exec_command_ok(
            command,
            &client_address,
            &TestUtils::expected_simple_string("QUEUED"),
        )
        .await;
    }

    // Queued commands are not applied yet.
    assert_eq!(env.get_store().await.get("grapes"), None);

    env.exec_command_transaction_expected_commands(
        &client_address,
        &[
            CommandHandler::new(TestUtils::set_command("grapes", "4")).unwrap(),
            CommandHandler::new(TestUtils::incr_command("grapes")).unwrap(),
        ],
    )
    .await;
}

#[tokio::test]
async fn test_handle_exec_runs_queued_commands() {
    let env = TestEnv::new_master_server();
    let client_address = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::set_command("fruit", "mango"),
        &TestUtils::client_address(41845),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_ok(
        TestUtils::multi_command(),
        &client_address,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    for command in [
        TestUtils::set_command("grapes", "4"),
        TestUtils::incr_command("grapes"),
        TestUtils::incr_command("fruit"),
        TestUtils::get_command("grapes"),
    ] {
        env.exec_command_ok(
            command,
            &client_address,
            &TestUtils::expected_simple_string("QUEUED"),
        )
        .await;
    }

    // Other clients are not affected by the transaction.
    env.exec_command_ok(
        TestUtils::get_command("grapes"),
        &TestUtils::client_address(41845),
        &TestUtils::expected_null(),
    )
    .await;

    env.exec_command_transaction_ok(
        &client_address,
        "*4\r\n+OK\r\n:5\r\n-ERR value is not an integer or out of range\r\n$1\r\n5\r\n",
    )
    .await;

    assert_eq!(env.get_store().await.get("grapes"), Some(&Value::string("5")));
    assert_eq!(env.get_state().await.get_transaction(&client_address), None);
}

#[tokio::test]
async fn test_handle_queued_command_with_invalid_arguments() {
    let env = TestEnv::new_master_server();
    let client_address = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::multi_command(),
        &client_address,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_err(
        TestUtils::invalid_command(&["SET", "grapes"]),
        &client_address,
        CommandError::InvalidSetCommand,
    )
    .await;

    env.exec_command_err(
        TestUtils::invalid_command(&["FLUSHALL"]),
        &client_address,
        CommandError::UnknownCommand("FLUSHALL".to_string()),
    )
    .await;

    assert_eq!(
        env.get_state().await.get_transaction(&client_address),
        Some(&Vec::new())
    );
}

#[tokio::test]
async fn test_handle_discard_command() {
    let env = TestEnv::new_master_server();
    let client_address = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::multi_command(),
        &client_address,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_ok(
        TestUtils::set_command("grapes", "4"),
        &client_address,
        &TestUtils::expected_simple_string("QUEUED"),
    )
    .await;

    env.exec_command_ok(
        TestUtils::discard_command(),
        &client_address,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    assert_eq!(env.get_state().await.get_transaction(&client_address), None);
    assert_eq!(env.get_store().await.get("grapes"), None);

    env.exec_command_err(
        TestUtils::exec_command(),
        &client_address,
        CommandError::ExecWithoutMulti,
    )
    .await;
}
