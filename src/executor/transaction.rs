use tracing::debug;

use crate::command::Transaction;
use crate::commands::{CommandError, execute_data_command};
use crate::executor::Executor;

impl Executor {
    /// Runs an EXEC batch inline under the loop's exclusive access. Each
    /// member's reply (or error) lands in one array, so partial success is
    /// observable. A member that would block is a queueing-time mistake and
    /// turns into an error entry instead of parking the batch. Waiters are
    /// woken once, for the union of touched keys.
    pub(crate) async fn handle_transaction(&mut self, mut transaction: Transaction) {
        let mut replies: Vec<String> = Vec::with_capacity(transaction.commands.len());
        let mut touched_keys: Vec<String> = Vec::new();

        for queued in &mut transaction.commands {
            let result = execute_data_command(
                &queued.name,
                &mut queued.args,
                &mut self.store,
                &self.config,
                &self.replication,
                &self.pubsub,
            )
            .await;

            match result {
                Ok(outcome) if outcome.block_for_ms.is_some() => {
                    debug!(command = %queued.name, "blocking command inside transaction");
                    replies
                        .push(CommandError::BlockingInTransaction(queued.name.clone()).to_resp());
                }
                Ok(outcome) => {
                    for key in outcome.touched_keys {
                        if !touched_keys.contains(&key) {
                            touched_keys.push(key);
                        }
                    }
                    replies.push(outcome.reply);
                }
                Err(error) => replies.push(error.to_resp()),
            }
        }

        self.wake_waiters(&touched_keys).await;

        let mut reply = format!("*{}\r\n", replies.len());
        for member_reply in replies {
            reply.push_str(&member_reply);
        }

        transaction.send_reply(reply);
    }
}
