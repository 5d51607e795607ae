mod common;

use std::time::Duration;

use common::{TestClient, spawn_master};

#[tokio::test]
async fn test_ping() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    assert_eq!(client.command(&["PING"]).await, "+PONG\r\n");
}

#[tokio::test]
async fn test_echo() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    assert_eq!(client.command(&["ECHO", "hey"]).await, "$3\r\nhey\r\n");
}

#[tokio::test]
async fn test_set_get_with_px_expiry() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    assert_eq!(
        client.command(&["SET", "k", "v", "PX", "100"]).await,
        "+OK\r\n"
    );
    assert_eq!(client.command(&["GET", "k"]).await, "$1\r\nv\r\n");

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(client.command(&["GET", "k"]).await, "$-1\r\n");
}

#[tokio::test]
async fn test_incr_and_type() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    assert_eq!(client.command(&["INCR", "counter"]).await, ":1\r\n");
    assert_eq!(client.command(&["INCR", "counter"]).await, ":2\r\n");
    assert_eq!(client.command(&["TYPE", "counter"]).await, "+string\r\n");
    assert_eq!(client.command(&["TYPE", "missing"]).await, "+none\r\n");

    client.command(&["SET", "text", "abc"]).await;
    assert_eq!(
        client.command(&["INCR", "text"]).await,
        "-ERR value is not an integer or out of range\r\n"
    );
}

#[tokio::test]
async fn test_list_commands() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    assert_eq!(client.command(&["RPUSH", "l", "a", "b"]).await, ":2\r\n");
    assert_eq!(client.command(&["LPUSH", "l", "z"]).await, ":3\r\n");
    assert_eq!(client.command(&["LLEN", "l"]).await, ":3\r\n");
    assert_eq!(
        client.command(&["LRANGE", "l", "0", "-1"]).await,
        "*3\r\n$1\r\nz\r\n$1\r\na\r\n$1\r\nb\r\n"
    );
    assert_eq!(client.command(&["LPOP", "l"]).await, "$1\r\nz\r\n");
    assert_eq!(
        client.command(&["LPOP", "l", "5"]).await,
        "*2\r\n$1\r\na\r\n$1\r\nb\r\n"
    );
}

#[tokio::test]
async fn test_stream_xadd_then_xrange() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    assert_eq!(
        client.command(&["XADD", "s", "1-1", "f1", "v1"]).await,
        "$3\r\n1-1\r\n"
    );

    let duplicate = client.command(&["XADD", "s", "1-1", "f2", "v2"]).await;
    assert!(
        duplicate.contains("equal or smaller"),
        "unexpected reply: {}",
        duplicate
    );

    let range = client.command(&["XRANGE", "s", "-", "+"]).await;
    assert!(range.starts_with("*1\r\n"), "unexpected reply: {}", range);
    assert!(range.contains("1-1"));
}

#[tokio::test]
async fn test_transaction_multi_exec() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    assert_eq!(client.command(&["MULTI"]).await, "+OK\r\n");
    assert_eq!(client.command(&["INCR", "c"]).await, "+QUEUED\r\n");
    assert_eq!(client.command(&["INCR", "c"]).await, "+QUEUED\r\n");
    assert_eq!(client.command(&["EXEC"]).await, "*2\r\n:1\r\n:2\r\n");
}

#[tokio::test]
async fn test_transaction_discard_then_fresh_pair() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    client.command(&["MULTI"]).await;
    client.command(&["INCR", "d"]).await;
    assert_eq!(client.command(&["DISCARD"]).await, "+OK\r\n");

    // A discarded transaction leaves no trace: the fresh pair behaves as if
    // it ran alone.
    client.command(&["MULTI"]).await;
    client.command(&["INCR", "d"]).await;
    assert_eq!(client.command(&["EXEC"]).await, "*1\r\n:1\r\n");
}

#[tokio::test]
async fn test_transaction_control_errors() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    assert_eq!(
        client.command(&["EXEC"]).await,
        "-ERR EXEC without MULTI\r\n"
    );
    assert_eq!(
        client.command(&["DISCARD"]).await,
        "-ERR DISCARD without MULTI\r\n"
    );

    client.command(&["MULTI"]).await;
    assert_eq!(
        client.command(&["MULTI"]).await,
        "-ERR MULTI calls can not be nested\r\n"
    );
    client.command(&["DISCARD"]).await;
}

#[tokio::test]
async fn test_keys_and_config_get() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    client.command(&["SET", "apple", "1"]).await;
    client.command(&["SET", "apricot", "2"]).await;
    client.command(&["SET", "banana", "3"]).await;

    assert_eq!(
        client.command(&["KEYS", "ap*"]).await,
        "*2\r\n$5\r\napple\r\n$7\r\napricot\r\n"
    );

    assert_eq!(
        client.command(&["CONFIG", "GET", "dbfilename"]).await,
        "*2\r\n$10\r\ndbfilename\r\n$8\r\ndump.rdb\r\n"
    );
}

#[tokio::test]
async fn test_unknown_command_and_protocol_error() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    assert_eq!(
        client.command(&["DEFINITELYNOTACOMMAND"]).await,
        "-ERR unknown command: DEFINITELYNOTACOMMAND\r\n"
    );

    // Garbage that is not RESP at all gets a protocol error, and the
    // connection survives it.
    client.send_raw(b"hello there\r\n").await;
    assert_eq!(client.read_reply().await, "-ERR invalid command format\r\n");
    assert_eq!(client.command(&["PING"]).await, "+PONG\r\n");
}

#[tokio::test]
async fn test_split_frames_across_writes() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    client.send_raw(b"*3\r\n$3\r\nSET\r\n$1\r\nk").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.send_raw(b"\r\n$5\r\nhello\r\n").await;

    assert_eq!(client.read_reply().await, "+OK\r\n");
    assert_eq!(client.command(&["GET", "k"]).await, "$5\r\nhello\r\n");
}

#[tokio::test]
async fn test_pipelined_frames_in_one_write() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    client
        .send_raw(b"*1\r\n$4\r\nPING\r\n*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n")
        .await;

    assert_eq!(client.read_reply().await, "+PONG\r\n");
    assert_eq!(client.read_reply().await, "$2\r\nhi\r\n");
}

#[tokio::test]
async fn test_sorted_set_commands() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    assert_eq!(
        client
            .command(&["ZADD", "z", "1", "one", "2", "two"])
            .await,
        ":2\r\n"
    );
    assert_eq!(client.command(&["ZRANK", "z", "two"]).await, ":1\r\n");
    assert_eq!(client.command(&["ZCARD", "z"]).await, ":2\r\n");
    assert_eq!(
        client.command(&["ZSCORE", "z", "one"]).await,
        "$1\r\n1\r\n"
    );
    assert_eq!(
        client.command(&["ZRANGE", "z", "0", "-1"]).await,
        "*2\r\n$3\r\none\r\n$3\r\ntwo\r\n"
    );
    assert_eq!(client.command(&["ZREM", "z", "one"]).await, ":1\r\n");
}

#[tokio::test]
async fn test_wrongtype_error() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    client.command(&["RPUSH", "l", "x"]).await;
    assert_eq!(
        client.command(&["GET", "l"]).await,
        "-WRONGTYPE Operation against a key holding the wrong kind of value\r\n"
    );
}

#[tokio::test]
async fn test_auth_and_acl() {
    let port = spawn_master().await;
    let mut client = TestClient::connect(port).await;

    assert_eq!(client.command(&["ACL", "WHOAMI"]).await, "$7\r\ndefault\r\n");

    assert_eq!(
        client
            .command(&["ACL", "SETUSER", "default", ">hunter2"])
            .await,
        "+OK\r\n"
    );
    assert_eq!(
        client.command(&["AUTH", "default", "hunter2"]).await,
        "+OK\r\n"
    );
    assert_eq!(
        client.command(&["AUTH", "default", "wrong"]).await,
        "-WRONGPASS invalid username-password pair or user is disabled.\r\n"
    );
    assert_eq!(
        client.command(&["AUTH", "ghost", "pass"]).await,
        "-WRONGPASS invalid username-password pair or user is disabled.\r\n"
    );
}
