use std::time::Duration;

use redis_replica::{
    commands::{CommandError, CommandResult},
    resp::RespValue,
};

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_handle_wait_command_without_writes() {
    let env = TestEnv::new_master_server();

    let test_cases = vec![
        (TestUtils::wait_command(0, 100), 0),
        (TestUtils::wait_command(3, 100), 0),
        (TestUtils::wait_command(1, 0), 0),
    ];

    for (command, expected_replicas) in test_cases {
        env.exec_command_ok(
            command,
            &TestUtils::client_address(41844),
            &TestUtils::expected_integer(expected_replicas),
        )
        .await;
    }
}

#[tokio::test]
async fn test_handle_wait_command_times_out_without_replicas() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::set_command("foo", "bar"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    let task = TestUtils::spawn_wait_task(&env, 1, 100);

    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("WAIT did not time out")
        .unwrap();

    assert_eq!(result, Ok(CommandResult::Response(RespValue::Integer(0))));
}

#[tokio::test]
async fn test_handle_wait_command_woken_by_acknowledgement() {
    let env = TestEnv::new_master_server();
    let _link = env.register_replica(&TestUtils::client_address(6380)).await;

    env.exec_command_ok(
        TestUtils::set_command("foo", "bar"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    let written_offset = env.server.replication.offset();
    let task = TestUtils::spawn_wait_task(&env, 1, 5000);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());

    // The GETACK sent by WAIT moves the offset past what must be acknowledged.
    assert!(env.server.replication.offset() > written_offset);

    let result = env
        .exec_command(
            TestUtils::replconf_command(&["ACK", &written_offset.to_string()]),
            &TestUtils::client_address(6380),
        )
        .await;
    assert_eq!(result, Ok(CommandResult::NoResponse));

    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("WAIT was not woken by the acknowledgement")
        .unwrap();

    assert_eq!(result, Ok(CommandResult::Response(RespValue::Integer(1))));
}

#[tokio::test]
async fn test_handle_wait_command_already_acknowledged() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::set_command("foo", "bar"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    let offset = env.server.replication.offset();
    let mut links = Vec::new();
    for port in [6380, 6381] {
        let client_address = TestUtils::client_address(port);
        links.push(env.register_replica(&client_address).await);
        assert!(
            env.server
                .replication
                .record_acknowledgement(&client_address, offset)
                .await
        );
    }

    env.exec_command_ok(
        TestUtils::wait_command(1, 500),
        &TestUtils::client_address(41844),
        &TestUtils::expected_integer(2),
    )
    .await;

    // No GETACK was needed.
    assert_eq!(env.server.replication.offset(), offset);
}

#[tokio::test]
async fn test_handle_wait_command_ignores_non_replica_acknowledgements() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::set_command("foo", "bar"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    let result = env
        .exec_command(
            TestUtils::replconf_command(&["ACK", "999999"]),
            &TestUtils::client_address(50000),
        )
        .await;
    assert_eq!(result, Ok(CommandResult::NoResponse));

    env.exec_command_ok(
        TestUtils::wait_command(1, 100),
        &TestUtils::client_address(41844),
        &TestUtils::expected_integer(0),
    )
    .await;
}

#[tokio::test]
async fn test_handle_wait_command_on_replica() {
    let env = TestEnv::new_replica_server(6380);

    env.exec_command_err(
        TestUtils::wait_command(1, 100),
        &TestUtils::client_address(41844),
        CommandError::InvalidWaitCommandForReplica,
    )
    .await;
}

#[tokio::test]
async fn test_handle_wait_command_invalid() {
    let env = TestEnv::new_master_server();

    let test_cases = vec![
        (
            TestUtils::invalid_command(&["WAIT", "1"]),
            CommandError::InvalidWaitCommand,
        ),
        (
            TestUtils::invalid_command(&["WAIT", "one", "100"]),
            CommandError::InvalidWaitCommandArgument,
        ),
        (
            TestUtils::invalid_command(&["WAIT", "1", "-5"]),
            CommandError::InvalidWaitCommandArgument,
        ),
    ];

    for (command, expected_error) in test_cases {
        env.exec_command_err(command, &TestUtils::client_address(41844), expected_error)
            .await;
    }
}

#[tokio::test]
async fn test_write_commands_rejected_on_replica() {
    let env = TestEnv::new_replica_server(6380);

    let test_cases = vec![
        TestUtils::set_command("foo", "bar"),
        TestUtils::incr_command("counter"),
        TestUtils::xadd_command("fruits", "1-1", &["mango", "apple"]),
    ];

    for command in test_cases {
        env.exec_command_err(
            command,
            &TestUtils::client_address(41844),
            CommandError::ReplicaReadOnlyCommands,
        )
        .await;
    }

    assert!(env.get_store().await.is_empty());
}

#[tokio::test]
async fn test_commands_from_master_are_applied_on_replica() {
    let env = TestEnv::new_replica_server(6380);

    let test_cases = vec![
        TestUtils::set_command("foo", "bar"),
        TestUtils::incr_command("counter"),
        TestUtils::xadd_command("fruits", "1-1", &["mango", "apple"]),
        TestUtils::ping_command(),
    ];

    for command in test_cases {
        let result = env.exec_command_from_master(command.clone()).await;
        assert_eq!(result, Ok(CommandResult::NoResponse), "applying {:?}", command);
    }

    env.exec_command_ok(
        TestUtils::get_command("foo"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_bulk_string("bar"),
    )
    .await;

    env.exec_command_ok(
        TestUtils::type_command("fruits"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("stream"),
    )
    .await;

    assert_eq!(
        env.exec_command_from_master(TestUtils::echo_command("hello")).await,
        Err(CommandError::UnknownCommand("ECHO".to_string()))
    );
}
