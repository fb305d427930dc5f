use redis_replica::commands::CommandError;

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_handle_type_command() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::set_command("grape", "mango"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_ok(
        TestUtils::xadd_command("fruits", "1526919030474-0", &["mango", "apple"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_bulk_string("1526919030474-0"),
    )
    .await;

    let test_cases = vec![
        (TestUtils::type_command("grape"), "string"),
        (TestUtils::type_command("fruits"), "stream"),
        (TestUtils::type_command("missing"), "none"),
    ];

    for (command, expected_type) in test_cases {
        env.exec_command_ok(
            command,
            &TestUtils::client_address(41844),
            &TestUtils::expected_simple_string(expected_type),
        )
        .await;
    }
}

#[tokio::test]
async fn test_handle_type_command_invalid() {
    let env = TestEnv::new_master_server();

    env.exec_command_err(
        TestUtils::invalid_command(&["TYPE"]),
        &TestUtils::client_address(41844),
        CommandError::InvalidTypeCommand,
    )
    .await;
}
