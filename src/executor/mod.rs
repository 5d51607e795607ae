mod blocking;
mod transaction;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::command::{Command, DispatchQueues};
use crate::commands::{execute_data_command, is_write_command};
use crate::config::ServerConfig;
use crate::pubsub::PubSubHub;
use crate::replication::ReplicationManager;
use crate::resp::RespValue;
use crate::store::KeyValueStore;

use blocking::BlockingRegistry;

/// The single consumer of the dispatch queues. It owns the keyspace and the
/// blocking registry outright; every data-plane mutation happens on this
/// task, so handlers run with plain `&mut` access and no locks.
pub struct Executor {
    store: KeyValueStore,
    registry: BlockingRegistry,
    queues: DispatchQueues,
    expiry_rx: mpsc::UnboundedReceiver<u64>,
    config: Arc<ServerConfig>,
    replication: Arc<ReplicationManager>,
    pubsub: Arc<PubSubHub>,
}

impl Executor {
    pub fn new(
        store: KeyValueStore,
        queues: DispatchQueues,
        config: Arc<ServerConfig>,
        replication: Arc<ReplicationManager>,
        pubsub: Arc<PubSubHub>,
    ) -> Self {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();

        Self {
            store,
            registry: BlockingRegistry::new(expiry_tx),
            queues,
            expiry_rx,
            config,
            replication,
            pubsub,
        }
    }

    /// Drains the command queue, the transaction queue, and the blocking
    /// timer channel until every sender is gone.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.queues.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                transaction = self.queues.transactions.recv() => match transaction {
                    Some(transaction) => self.handle_transaction(transaction).await,
                    None => break,
                },
                Some(waiter_id) = self.expiry_rx.recv() => self.handle_expiry(waiter_id),
            }
        }

        debug!("dispatch loop stopped");
    }

    async fn handle_command(&mut self, mut command: Command) {
        let name = command.name.clone();

        let result = execute_data_command(
            &name,
            &mut command.args,
            &mut self.store,
            &self.config,
            &self.replication,
            &self.pubsub,
        )
        .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(error) => {
                debug!(command = %name, error = %error, "command failed");
                command.send_reply(error.to_resp());
                return;
            }
        };

        if let Some(timeout_ms) = outcome.block_for_ms {
            self.registry
                .register(timeout_ms, outcome.touched_keys, command);
            return;
        }

        self.wake_waiters(&outcome.touched_keys).await;

        if is_write_command(&name) {
            self.replication.propagate(&name, &command.args).await;
        }

        command.send_reply(outcome.reply);
    }

    /// Re-runs parked waiters for each mutated key, oldest first. A waiter
    /// whose handler still wants to block stays parked and ends the scan for
    /// that key; a satisfied (or failing) waiter is removed from every key it
    /// was on and answered. Keys a re-run touches are ignored: an unblocked
    /// command never chains into further wake-ups.
    async fn wake_waiters(&mut self, keys: &[String]) {
        for key in keys {
            for waiter_id in self.registry.waiter_ids_for_key(key) {
                // Possibly already satisfied through an earlier key this round.
                let Some(waiter) = self.registry.get_mut(waiter_id) else {
                    continue;
                };

                let name = waiter.command.name.clone();
                let result = execute_data_command(
                    &name,
                    &mut waiter.command.args,
                    &mut self.store,
                    &self.config,
                    &self.replication,
                    &self.pubsub,
                )
                .await;

                match result {
                    Ok(outcome) if outcome.block_for_ms.is_some() => break,
                    Ok(outcome) => {
                        if let Some(mut satisfied) = self.registry.remove(waiter_id) {
                            satisfied.command.send_reply(outcome.reply);
                        }
                    }
                    Err(error) => {
                        if let Some(mut failed) = self.registry.remove(waiter_id) {
                            failed.command.send_reply(error.to_resp());
                        }
                    }
                }
            }
        }
    }

    /// A blocking timeout elapsed. The removal is idempotent with the wake
    /// path; if the waiter was already satisfied there is nothing to do.
    fn handle_expiry(&mut self, waiter_id: u64) {
        if let Some(mut expired) = self.registry.remove(waiter_id) {
            expired.command.send_reply(RespValue::NullArray.encode());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::command::{DispatchHandle, QueuedCommand, dispatch_channels};
    use crate::config::Role;

    fn spawn_executor() -> DispatchHandle {
        let (handle, queues) = dispatch_channels();
        let executor = Executor::new(
            KeyValueStore::new(),
            queues,
            Arc::new(ServerConfig::default()),
            Arc::new(ReplicationManager::new(Role::Master)),
            Arc::new(PubSubHub::new()),
        );
        tokio::spawn(executor.run());
        handle
    }

    async fn run_command(handle: &DispatchHandle, parts: &[&str]) -> String {
        let args = parts[1..].iter().map(|s| s.to_string()).collect();
        handle
            .enqueue_command(parts[0].to_string(), args)
            .await
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_basic_command_round_trip() {
        let handle = spawn_executor();

        assert_eq!(run_command(&handle, &["PING"]).await, "+PONG\r\n");
        assert_eq!(run_command(&handle, &["SET", "k", "v"]).await, "+OK\r\n");
        assert_eq!(run_command(&handle, &["GET", "k"]).await, "$1\r\nv\r\n");
        assert_eq!(
            run_command(&handle, &["NOPE"]).await,
            "-ERR unknown command: NOPE\r\n"
        );
    }

    #[tokio::test]
    async fn test_blpop_wakes_on_rpush() {
        let handle = spawn_executor();

        let waiter_handle = handle.clone();
        let waiter = tokio::spawn(async move {
            run_command(&waiter_handle, &["BLPOP", "mylist", "0"]).await
        });

        // Give the waiter time to park before pushing.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            run_command(&handle, &["RPUSH", "mylist", "alpha"]).await,
            ":1\r\n"
        );

        assert_eq!(
            waiter.await.unwrap(),
            "*2\r\n$6\r\nmylist\r\n$5\r\nalpha\r\n"
        );

        // The woken waiter consumed the element.
        assert_eq!(run_command(&handle, &["LLEN", "mylist"]).await, ":0\r\n");
    }

    #[tokio::test]
    async fn test_blpop_fifo_between_waiters() {
        let handle = spawn_executor();

        let first_handle = handle.clone();
        let first = tokio::spawn(async move {
            run_command(&first_handle, &["BLPOP", "queue", "0"]).await
        });
        tokio::time::sleep(Duration::from_millis(30)).await;

        let second_handle = handle.clone();
        let second = tokio::spawn(async move {
            run_command(&second_handle, &["BLPOP", "queue", "0"]).await
        });
        tokio::time::sleep(Duration::from_millis(30)).await;

        run_command(&handle, &["RPUSH", "queue", "one"]).await;
        assert_eq!(
            first.await.unwrap(),
            "*2\r\n$5\r\nqueue\r\n$3\r\none\r\n"
        );

        run_command(&handle, &["RPUSH", "queue", "two"]).await;
        assert_eq!(
            second.await.unwrap(),
            "*2\r\n$5\r\nqueue\r\n$3\r\ntwo\r\n"
        );
    }

    #[tokio::test]
    async fn test_blpop_timeout_returns_null_array() {
        let handle = spawn_executor();

        let reply = run_command(&handle, &["BLPOP", "empty", "0.05"]).await;
        assert_eq!(reply, "*-1\r\n");
    }

    #[tokio::test]
    async fn test_xread_block_wakes_on_xadd() {
        let handle = spawn_executor();

        let reader_handle = handle.clone();
        let reader = tokio::spawn(async move {
            run_command(
                &reader_handle,
                &["XREAD", "BLOCK", "0", "STREAMS", "s", "$"],
            )
            .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let xadd_reply = run_command(&handle, &["XADD", "s", "1-1", "f", "v"]).await;
        assert_eq!(xadd_reply, "$3\r\n1-1\r\n");

        let reply = reader.await.unwrap();
        assert!(reply.contains("1-1"), "unexpected XREAD reply: {}", reply);
        assert!(reply.contains("$1\r\ns\r\n"));
    }

    #[tokio::test]
    async fn test_transaction_batch() {
        let handle = spawn_executor();

        let queued = |name: &str, args: &[&str]| QueuedCommand {
            name: name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        };

        let reply = handle
            .enqueue_transaction(vec![
                queued("INCR", &["c"]),
                queued("INCR", &["c"]),
            ])
            .await
            .await
            .unwrap();
        assert_eq!(reply, "*2\r\n:1\r\n:2\r\n");
    }

    #[tokio::test]
    async fn test_transaction_collects_errors_and_rejects_blocking() {
        let handle = spawn_executor();

        let queued = |name: &str, args: &[&str]| QueuedCommand {
            name: name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        };

        let reply = handle
            .enqueue_transaction(vec![
                queued("SET", &["k", "v"]),
                queued("BLPOP", &["nothing", "0"]),
                queued("INCR", &["k"]),
            ])
            .await
            .await
            .unwrap();

        assert!(reply.starts_with("*3\r\n+OK\r\n"));
        assert!(reply.contains("-ERR BLPOP is not allowed in transactions\r\n"));
        assert!(reply.contains("-ERR value is not an integer or out of range\r\n"));
    }
}
