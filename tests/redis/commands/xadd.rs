use redis_replica::{
    commands::CommandError,
    key_value_store::DataType,
    stream::StreamIdError,
};

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_handle_xadd_command() {
    let env = TestEnv::new_master_server();
    let stream_id = "1526919030474-0";

    env.exec_command_ok(
        TestUtils::xadd_command(
            "fruits",
            stream_id,
            &["raspberry", "pear", "mango", "apple"],
        ),
        &TestUtils::client_address(41844),
        &TestUtils::expected_bulk_string(stream_id),
    )
    .await;

    // Fields keep their insertion order.
    env.exec_command_ok(
        TestUtils::xrange_command("fruits", "-", "+"),
        &TestUtils::client_address(41844),
        "*1\r\n*2\r\n$15\r\n1526919030474-0\r\n*4\r\n$9\r\nraspberry\r\n$4\r\npear\r\n$5\r\nmango\r\n$5\r\napple\r\n",
    )
    .await;

    let store_guard = env.get_store().await;
    let value = store_guard.get("fruits").expect("stream should exist");
    let DataType::Stream(stream) = &value.data else {
        panic!("Expected a stream, got {:?}", value.data);
    };
    assert_eq!(stream.len(), 1);
    assert_eq!(value.expiration, None);
}

#[tokio::test]
async fn test_handle_xadd_command_generated_ids() {
    let env = TestEnv::new_master_server();

    let test_cases = vec![
        ("0-*", "0-1"),
        ("0-*", "0-2"),
        ("5-*", "5-0"),
        ("5-*", "5-1"),
        ("7-3", "7-3"),
        ("7-*", "7-4"),
    ];

    for (requested_id, expected_id) in test_cases {
        env.exec_command_ok(
            TestUtils::xadd_command("fruits", requested_id, &["mango", "apple"]),
            &TestUtils::client_address(41844),
            &TestUtils::expected_bulk_string(expected_id),
        )
        .await;
    }
}

#[tokio::test]
async fn test_handle_xadd_command_auto_id() {
    let env = TestEnv::new_master_server();

    let result = env
        .exec_command(
            TestUtils::xadd_command("fruits", "*", &["mango", "apple"]),
            &TestUtils::client_address(41844),
        )
        .await;
    assert!(result.is_ok(), "{:?}", result);

    let store_guard = env.get_store().await;
    let value = store_guard.get("fruits").expect("stream should exist");
    let DataType::Stream(stream) = &value.data else {
        panic!("Expected a stream, got {:?}", value.data);
    };
    let last_id = stream.last_id().expect("entry should exist");
    assert!(last_id.milliseconds > 0);
    assert_eq!(last_id.sequence, 0);
}

#[tokio::test]
async fn test_handle_xadd_command_rejected_ids() {
    let env = TestEnv::new_master_server();

    env.exec_command_err(
        TestUtils::xadd_command("fruits", "0-0", &["mango", "apple"]),
        &TestUtils::client_address(41844),
        CommandError::InvalidStreamId(StreamIdError::ZeroId),
    )
    .await;

    assert_eq!(env.get_store().await.get("fruits"), None);

    env.exec_command_ok(
        TestUtils::xadd_command("fruits", "1-1", &["mango", "apple"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_bulk_string("1-1"),
    )
    .await;

    let test_cases = vec![
        ("1-1", StreamIdError::NotGreaterThanTopItem),
        ("0-5", StreamIdError::NotGreaterThanTopItem),
        ("0-*", StreamIdError::NotGreaterThanTopItem),
        ("0-0", StreamIdError::ZeroId),
    ];

    for (requested_id, expected_error) in test_cases {
        env.exec_command_err(
            TestUtils::xadd_command("fruits", requested_id, &["mango", "apple"]),
            &TestUtils::client_address(41844),
            CommandError::InvalidStreamId(expected_error),
        )
        .await;
    }
}

#[tokio::test]
async fn test_handle_xadd_command_invalid_data_type() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::set_command("fruits", "mango"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_err(
        TestUtils::xadd_command("fruits", "1526919030474-0", &["mango", "apple"]),
        &TestUtils::client_address(41844),
        CommandError::InvalidDataTypeForKey,
    )
    .await;
}

#[tokio::test]
async fn test_handle_xadd_command_invalid() {
    let env = TestEnv::new_master_server();

    let test_cases = vec![
        (
            TestUtils::invalid_command(&["XADD"]),
            CommandError::InvalidXAddCommand,
        ),
        (
            TestUtils::invalid_command(&["XADD", "fruits", "1526919030474-0", "mango"]),
            CommandError::InvalidXAddCommand,
        ),
        (
            TestUtils::invalid_command(&[
                "XADD",
                "fruits",
                "1526919030474-0",
                "mango",
                "apple",
                "banana",
            ]),
            CommandError::InvalidXAddCommand,
        ),
        (
            TestUtils::invalid_command(&["XADD", "fruits", "invalid_stream_id", "mango", "apple"]),
            CommandError::InvalidStreamId(StreamIdError::InvalidFormat),
        ),
    ];

    for (command, expected_error) in test_cases {
        env.exec_command_err(command, &TestUtils::client_address(41844), expected_error)
            .await;
    }
}
