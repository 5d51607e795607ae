use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::command::Command;

/// A parked blocking command: the command itself (args possibly rewritten by
/// its handler) plus every key it waits on.
#[derive(Debug)]
pub struct WaitingCommand {
    pub command: Command,
    pub waiting_keys: Vec<String>,
}

/// Waiter registry for BLPOP/XREAD BLOCK. Waiters live in an arena keyed by
/// a stable id; each key holds an ordered id list, giving per-key FIFO
/// fairness. A waiter is on all of its keys' lists or on none.
///
/// Timers never touch the registry themselves: a timer task sleeps and then
/// reports the waiter id on the expiry channel, which the dispatch loop
/// drains, so both removal paths run under the loop's exclusive access.
#[derive(Debug)]
pub struct BlockingRegistry {
    waiters: HashMap<u64, WaitingCommand>,
    by_key: HashMap<String, Vec<u64>>,
    next_id: u64,
    expiry_tx: mpsc::UnboundedSender<u64>,
}

impl BlockingRegistry {
    pub fn new(expiry_tx: mpsc::UnboundedSender<u64>) -> Self {
        Self {
            waiters: HashMap::new(),
            by_key: HashMap::new(),
            next_id: 0,
            expiry_tx,
        }
    }

    /// Parks `command` on every key in `keys`. A `timeout_ms` of zero waits
    /// indefinitely; otherwise a one-shot timer reports the waiter id back
    /// on the expiry channel when the deadline passes.
    pub fn register(&mut self, timeout_ms: u64, keys: Vec<String>, command: Command) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        for key in &keys {
            self.by_key.entry(key.clone()).or_default().push(id);
        }

        self.waiters.insert(
            id,
            WaitingCommand {
                command,
                waiting_keys: keys,
            },
        );

        if timeout_ms > 0 {
            let expiry_tx = self.expiry_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
                let _ = expiry_tx.send(id);
            });
        }

        id
    }

    /// Waiter ids currently parked on `key`, oldest first.
    pub fn waiter_ids_for_key(&self, key: &str) -> Vec<u64> {
        self.by_key.get(key).cloned().unwrap_or_default()
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut WaitingCommand> {
        self.waiters.get_mut(&id)
    }

    /// Removes the waiter from the arena and from every key list it is on.
    /// Idempotent: a second removal (timer racing a wake) finds nothing.
    pub fn remove(&mut self, id: u64) -> Option<WaitingCommand> {
        let waiter = self.waiters.remove(&id)?;

        for key in &waiter.waiting_keys {
            if let Some(ids) = self.by_key.get_mut(key) {
                ids.retain(|&candidate| candidate != id);
                if ids.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }

        Some(waiter)
    }

    #[cfg(test)]
    fn is_consistent(&self, id: u64) -> bool {
        match self.waiters.get(&id) {
            Some(waiter) => waiter.waiting_keys.iter().all(|key| {
                self.by_key
                    .get(key)
                    .is_some_and(|ids| ids.contains(&id))
            }),
            None => self.by_key.values().all(|ids| !ids.contains(&id)),
        }
    }
}
