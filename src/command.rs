use tokio::sync::{mpsc, oneshot};

const QUEUE_CAPACITY: usize = 1024;

/// A data command in flight: the parsed request plus the one-shot reply
/// channel back to the originating session. Blocking handlers may rewrite
/// `args` before the command is parked, so re-execution sees the adjusted
/// form.
#[derive(Debug)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    reply: Option<oneshot::Sender<String>>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> (Self, oneshot::Receiver<String>) {
        let (reply_tx, reply_rx) = oneshot::channel();

        (
            Self {
                name: name.into(),
                args,
                reply: Some(reply_tx),
            },
            reply_rx,
        )
    }

    /// Sends the reply to the session. A closed channel (the connection went
    /// away while the command waited) is tolerated silently; only the first
    /// reply wins.
    pub fn send_reply(&mut self, payload: String) {
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(payload);
        }
    }
}

/// One queued member of a MULTI/EXEC batch. Members share the transaction's
/// reply channel instead of carrying their own.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCommand {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug)]
pub struct Transaction {
    pub commands: Vec<QueuedCommand>,
    reply: Option<oneshot::Sender<String>>,
}

impl Transaction {
    pub fn new(commands: Vec<QueuedCommand>) -> (Self, oneshot::Receiver<String>) {
        let (reply_tx, reply_rx) = oneshot::channel();

        (
            Self {
                commands,
                reply: Some(reply_tx),
            },
            reply_rx,
        )
    }

    pub fn send_reply(&mut self, payload: String) {
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(payload);
        }
    }
}

/// Sender side of the two dispatch queues. Sessions clone this freely.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    commands: mpsc::Sender<Command>,
    transactions: mpsc::Sender<Transaction>,
}

impl DispatchHandle {
    /// Enqueues a command and returns the receiver the session awaits for
    /// the reply bytes.
    pub async fn enqueue_command(
        &self,
        name: impl Into<String>,
        args: Vec<String>,
    ) -> oneshot::Receiver<String> {
        let (command, reply_rx) = Command::new(name, args);
        let _ = self.commands.send(command).await;
        reply_rx
    }

    pub async fn enqueue_transaction(
        &self,
        commands: Vec<QueuedCommand>,
    ) -> oneshot::Receiver<String> {
        let (transaction, reply_rx) = Transaction::new(commands);
        let _ = self.transactions.send(transaction).await;
        reply_rx
    }
}

/// Receiver side, owned by the dispatch loop.
pub struct DispatchQueues {
    pub commands: mpsc::Receiver<Command>,
    pub transactions: mpsc::Receiver<Transaction>,
}

pub fn dispatch_channels() -> (DispatchHandle, DispatchQueues) {
    let (command_tx, command_rx) = mpsc::channel(QUEUE_CAPACITY);
    let (transaction_tx, transaction_rx) = mpsc::channel(QUEUE_CAPACITY);

    (
        DispatchHandle {
            commands: command_tx,
            transactions: transaction_tx,
        },
        DispatchQueues {
            commands: command_rx,
            transactions: transaction_rx,
        },
    )
}
