use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::distr::{Alphanumeric, SampleString};
use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::Role;
use crate::resp::RespValue;
use crate::session::{SharedWriter, write_to_stream};

/// Per-replica state on the master: the session that owns the connection,
/// its shared socket writer, what the handshake reported, and the last
/// acknowledged offset.
pub struct ReplicaDescriptor {
    pub writer: SharedWriter,
    pub listening_port: Option<u16>,
    pub capabilities: Vec<String>,
    pub handshake_complete: bool,
    pub last_ack_offset: u64,
}

/// Replica roster plus the master replication offset: the cumulative byte
/// count of every propagated write, which is exactly what replicas count on
/// their side and report back in REPLCONF ACK.
pub struct ReplicationManager {
    role: Role,
    repl_id: String,
    master_offset: AtomicU64,
    replicas: RwLock<HashMap<u64, ReplicaDescriptor>>,
    ack_notify: Notify,
}

impl ReplicationManager {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            repl_id: Alphanumeric.sample_string(&mut rand::rng(), 40),
            master_offset: AtomicU64::new(0),
            replicas: RwLock::new(HashMap::new()),
            ack_notify: Notify::new(),
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn role_name(&self) -> &'static str {
        self.role.name()
    }

    pub fn repl_id(&self) -> &str {
        &self.repl_id
    }

    pub fn master_offset(&self) -> u64 {
        self.master_offset.load(Ordering::SeqCst)
    }

    /// Creates the descriptor for a connecting replica if this is the first
    /// REPLCONF frame from its session.
    pub async fn ensure_replica(&self, session_id: u64, writer: SharedWriter) {
        self.replicas
            .write()
            .await
            .entry(session_id)
            .or_insert_with(|| ReplicaDescriptor {
                writer,
                listening_port: None,
                capabilities: Vec::new(),
                handshake_complete: false,
                last_ack_offset: 0,
            });
    }

    pub async fn set_listening_port(&self, session_id: u64, port: u16) {
        if let Some(replica) = self.replicas.write().await.get_mut(&session_id) {
            replica.listening_port = Some(port);
        }
    }

    pub async fn add_capability(&self, session_id: u64, capability: String) {
        if let Some(replica) = self.replicas.write().await.get_mut(&session_id) {
            replica.capabilities.push(capability);
        }
    }

    /// PSYNC finished: the replica now receives propagated writes and counts
    /// toward WAIT.
    pub async fn mark_handshake_complete(&self, session_id: u64) {
        if let Some(replica) = self.replicas.write().await.get_mut(&session_id) {
            replica.handshake_complete = true;
        }
    }

    /// REPLCONF ACK from a replica's session loop.
    pub async fn record_ack(&self, session_id: u64, offset: u64) {
        if let Some(replica) = self.replicas.write().await.get_mut(&session_id) {
            replica.last_ack_offset = offset;
        }
        self.ack_notify.notify_waiters();
    }

    pub async fn remove_replica(&self, session_id: u64) {
        self.replicas.write().await.remove(&session_id);
    }

    /// Handshake-complete replicas only; these receive writes and satisfy
    /// WAIT.
    pub async fn replica_count(&self) -> usize {
        self.replicas
            .read()
            .await
            .values()
            .filter(|replica| replica.handshake_complete)
            .count()
    }

    /// Serializes the write as a RESP array, advances the master offset by
    /// its exact byte length, and sends those same bytes to every
    /// handshake-complete replica. Writes are best effort; a broken replica
    /// surfaces later through WAIT.
    pub async fn propagate(&self, name: &str, args: &[String]) {
        if self.role != Role::Master {
            return;
        }

        let mut parts = vec![name.to_string()];
        parts.extend(args.iter().cloned());
        let payload = RespValue::encode_array_from_strings(parts);

        self.master_offset
            .fetch_add(payload.len() as u64, Ordering::SeqCst);

        let replicas = self.replicas.read().await;
        for (session_id, replica) in replicas.iter() {
            if !replica.handshake_complete {
                continue;
            }

            if let Err(error) = write_to_stream(&replica.writer, payload.as_bytes()).await {
                warn!(session = session_id, error = %error, "failed to propagate to replica");
            }
        }
    }

    /// WAIT: short-circuits to the connected-replica count when there is
    /// nothing to wait for, otherwise sends GETACK to every eligible replica
    /// and waits for their sessions to record acknowledgements at or beyond
    /// the current master offset. A zero timeout waits indefinitely.
    pub async fn wait_for_acks(&self, min_replicas: usize, timeout_ms: u64) -> usize {
        let eligible = self.replica_count().await;
        if min_replicas == 0 || eligible == 0 || self.master_offset() == 0 {
            return eligible;
        }

        let target_offset = self.master_offset();
        self.send_getack_to_replicas().await;

        let deadline =
            (timeout_ms > 0).then(|| Instant::now() + Duration::from_millis(timeout_ms));

        // Acknowledgements are recounted on every notify and on a short
        // tick, so one arriving between the count and the wait is never
        // lost for good.
        let tick = Duration::from_millis(20);

        loop {
            let acked = self.count_acked(target_offset).await;
            if acked >= min_replicas {
                return acked;
            }

            let wait_for = match deadline {
                None => tick,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return acked;
                    }
                    (deadline - now).min(tick)
                }
            };

            let _ = tokio::time::timeout(wait_for, self.ack_notify.notified()).await;
        }
    }

    async fn send_getack_to_replicas(&self) {
        let getack =
            RespValue::encode_array_from_strings(vec!["REPLCONF", "GETACK", "*"]);

        let replicas = self.replicas.read().await;
        for (session_id, replica) in replicas.iter() {
            if !replica.handshake_complete {
                continue;
            }

            debug!(session = session_id, "sending REPLCONF GETACK");
            if let Err(error) = write_to_stream(&replica.writer, getack.as_bytes()).await {
                warn!(session = session_id, error = %error, "failed to send GETACK");
            }
        }
    }

    async fn count_acked(&self, target_offset: u64) -> usize {
        self.replicas
            .read()
            .await
            .values()
            .filter(|replica| replica.handshake_complete && replica.last_ack_offset >= target_offset)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_id_shape() {
        let manager = ReplicationManager::new(Role::Master);

        assert_eq!(manager.repl_id().len(), 40);
        assert!(manager.repl_id().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(manager.role_name(), "master");
        assert_eq!(manager.master_offset(), 0);
    }

    #[tokio::test]
    async fn test_propagate_noop_on_replica_role() {
        let manager =
            ReplicationManager::new(Role::Replica("localhost".to_string(), 6379));

        manager
            .propagate("SET", &["k".to_string(), "v".to_string()])
            .await;

        assert_eq!(manager.master_offset(), 0);
    }

    #[tokio::test]
    async fn test_propagate_advances_offset_by_exact_bytes() {
        let manager = ReplicationManager::new(Role::Master);

        // *3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n is 31 bytes.
        manager
            .propagate("SET", &["k".to_string(), "v".to_string()])
            .await;
        assert_eq!(manager.master_offset(), 31);

        manager
            .propagate("SET", &["k".to_string(), "v".to_string()])
            .await;
        assert_eq!(manager.master_offset(), 62);
    }

    #[tokio::test]
    async fn test_wait_short_circuits_without_replicas() {
        let manager = ReplicationManager::new(Role::Master);

        assert_eq!(manager.wait_for_acks(1, 100).await, 0);

        manager
            .propagate("SET", &["k".to_string(), "v".to_string()])
            .await;
        assert_eq!(manager.wait_for_acks(0, 100).await, 0);
    }
}
