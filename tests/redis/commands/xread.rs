use std::time::Duration;

use redis_replica::{
    commands::{CommandError, CommandResult},
    resp::RespValue,
    stream::StreamIdError,
};

use crate::test_utils::{TestEnv, TestUtils};

fn expected_read(streams: &[(&str, &[(&str, &[&str])])]) -> String {
    let mut expected = format!("*{}\r\n", streams.len());

    for (key, entries) in streams {
        expected.push_str("*2\r\n");
        expected.push_str(&TestUtils::expected_bulk_string(key));
        expected.push_str(&format!("*{}\r\n", entries.len()));

        for (stream_id, fields) in entries.iter() {
            expected.push_str("*2\r\n");
            expected.push_str(&TestUtils::expected_bulk_string(stream_id));
            expected.push_str(&TestUtils::expected_bulk_string_array(fields));
        }
    }

    expected
}

async fn xadd(env: &TestEnv, key: &str, stream_id: &str, fields: &[&str]) {
    env.exec_command_ok(
        TestUtils::xadd_command(key, stream_id, fields),
        &TestUtils::client_address(41844),
        &TestUtils::expected_bulk_string(stream_id),
    )
    .await;
}

fn response_wire(result: Result<CommandResult, CommandError>) -> String {
    match result {
        Ok(CommandResult::Response(response)) => {
            String::from_utf8_lossy(&response.encode()).to_string()
        }
        other => panic!("Expected response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_handle_xread_command() {
    let env = TestEnv::new_master_server();

    xadd(&env, "fruits", "1526919030474-0", &["mango", "apple"]).await;
    xadd(&env, "fruits", "1526919030474-1", &["raspberry", "pear"]).await;
    xadd(&env, "vegetables", "1526919030480-0", &["carrot", "potato"]).await;

    let test_cases = vec![
        (
            TestUtils::xread_command(&["fruits"], &["1526919030474-0"]),
            expected_read(&[(
                "fruits",
                &[("1526919030474-1", &["raspberry", "pear"])],
            )]),
        ),
        (
            TestUtils::xread_command(&["fruits"], &["0-0"]),
            expected_read(&[(
                "fruits",
                &[
                    ("1526919030474-0", &["mango", "apple"]),
                    ("1526919030474-1", &["raspberry", "pear"]),
                ],
            )]),
        ),
        (
            TestUtils::xread_command(&["fruits", "vegetables"], &["1526919030474-0", "0"]),
            expected_read(&[
                ("fruits", &[("1526919030474-1", &["raspberry", "pear"])]),
                ("vegetables", &[("1526919030480-0", &["carrot", "potato"])]),
            ]),
        ),
        (
            TestUtils::xread_command(&["fruits", "missing"], &["1526919030474-0", "0-0"]),
            expected_read(&[(
                "fruits",
                &[("1526919030474-1", &["raspberry", "pear"])],
            )]),
        ),
        (
            TestUtils::xread_command(&["fruits"], &["1526919030474-1"]),
            "*0\r\n".to_string(),
        ),
        (
            TestUtils::xread_command(&["fruits"], &["$"]),
            "*0\r\n".to_string(),
        ),
    ];

    for (command, expected_response) in test_cases {
        env.exec_command_ok(command, &TestUtils::client_address(41844), &expected_response)
            .await;
    }
}

#[tokio::test]
async fn test_handle_xread_command_blocking_with_available_entries() {
    let env = TestEnv::new_master_server();

    xadd(&env, "fruits", "1526919030474-0", &["mango", "apple"]).await;

    env.exec_command_ok(
        TestUtils::xread_blocking_command("1000", &["fruits"], &["0-0"]),
        &TestUtils::client_address(41844),
        &expected_read(&[("fruits", &[("1526919030474-0", &["mango", "apple"])])]),
    )
    .await;
}

#[tokio::test]
async fn test_handle_xread_command_blocking_woken_by_xadd() {
    let env = TestEnv::new_master_server();

    xadd(&env, "fruits", "1526919030474-0", &["mango", "apple"]).await;

    let task = TestUtils::spawn_xread_task(
        &env,
        "0",
        &["fruits"],
        &["1526919030474-0"],
        &TestUtils::client_address(41845),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());
    assert_eq!(env.get_state().await.stream_listener_count("fruits"), 1);

    xadd(&env, "fruits", "1526919030474-1", &["raspberry", "pear"]).await;

    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("blocked XREAD was not woken")
        .unwrap();

    assert_eq!(
        response_wire(result),
        expected_read(&[(
            "fruits",
            &[("1526919030474-1", &["raspberry", "pear"])],
        )])
    );
    assert_eq!(env.get_state().await.stream_listener_count("fruits"), 0);
}

#[tokio::test]
async fn test_handle_xread_command_blocking_on_missing_stream() {
    let env = TestEnv::new_master_server();

    let task = TestUtils::spawn_xread_task(
        &env,
        "1000",
        &["fruits"],
        &["$"],
        &TestUtils::client_address(41845),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    xadd(&env, "fruits", "1-1", &["mango", "apple"]).await;

    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("blocked XREAD was not woken")
        .unwrap();

    assert_eq!(
        response_wire(result),
        expected_read(&[("fruits", &[("1-1", &["mango", "apple"])])])
    );
}

#[tokio::test]
async fn test_handle_xread_command_blocking_dollar_ignores_existing_entries() {
    let env = TestEnv::new_master_server();

    xadd(&env, "fruits", "1526919030474-0", &["mango", "apple"]).await;

    let task = TestUtils::spawn_xread_task(
        &env,
        "0",
        &["fruits"],
        &["$"],
        &TestUtils::client_address(41845),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());

    xadd(&env, "vegetables", "1-1", &["carrot", "potato"]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());

    xadd(&env, "fruits", "1526919030475-0", &["raspberry", "pear"]).await;

    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("blocked XREAD was not woken")
        .unwrap();

    assert_eq!(
        response_wire(result),
        expected_read(&[(
            "fruits",
            &[("1526919030475-0", &["raspberry", "pear"])],
        )])
    );
}

#[tokio::test]
async fn test_handle_xread_command_blocking_timeout() {
    let env = TestEnv::new_master_server();

    xadd(&env, "fruits", "1526919030474-0", &["mango", "apple"]).await;

    let task = TestUtils::spawn_xread_task(
        &env,
        "100",
        &["fruits"],
        &["$"],
        &TestUtils::client_address(41845),
    );

    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("XREAD did not time out")
        .unwrap();

    assert_eq!(result, Ok(CommandResult::Response(RespValue::NullBulkString)));
    assert_eq!(env.get_state().await.stream_listener_count("fruits"), 0);
}

#[tokio::test]
async fn test_handle_xread_command_blocking_multiple_readers() {
    let env = TestEnv::new_master_server();

    let tasks: Vec<_> = (0..3)
        .map(|i| {
            TestUtils::spawn_xread_task(
                &env,
                "0",
                &["fruits"],
                &["0-0"],
                &TestUtils::client_address(41850 + i),
            )
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(50)).await;
    xadd(&env, "fruits", "1-1", &["mango", "apple"]).await;

    for task in tasks {
        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("blocked XREAD was not woken")
            .unwrap();

        assert_eq!(
            response_wire(result),
            expected_read(&[("fruits", &[("1-1", &["mango", "apple"])])])
        );
    }
}

#[tokio::test]
async fn test_handle_xread_command_invalid() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::set_command("grape", "mango"),
        &TestUtils::client_address(41844),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    let test_cases = vec![
        (
            TestUtils::invalid_command(&["XREAD"]),
            CommandError::InvalidXReadCommand,
        ),
        (
            TestUtils::invalid_command(&["XREAD", "STREAMS", "fruits"]),
            CommandError::InvalidXReadCommand,
        ),
        (
            TestUtils::invalid_command(&["XREAD", "COUNT", "1", "STREAMS", "fruits", "0-0"]),
            CommandError::InvalidXReadOption,
        ),
        (
            TestUtils::xread_blocking_command("soon", &["fruits"], &["0-0"]),
            CommandError::InvalidXReadBlockDuration,
        ),
        (
            TestUtils::xread_command(&["fruits"], &["invalid"]),
            CommandError::InvalidStreamId(StreamIdError::InvalidFormat),
        ),
        (
            TestUtils::xread_command(&["grape"], &["0-0"]),
            CommandError::InvalidDataTypeForKey,
        ),
    ];

    for (command, expected_error) in test_cases {
        env.exec_command_err(command, &TestUtils::client_address(41844), expected_error)
            .await;
    }
}
