use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::acl::AclStore;
use crate::command::{DispatchHandle, dispatch_channels};
use crate::config::{Role, ServerConfig};
use crate::executor::Executor;
use crate::pubsub::PubSubHub;
use crate::rdb;
use crate::replica::start_replica_link;
use crate::replication::ReplicationManager;
use crate::session::handle_connection;
use crate::store::KeyValueStore;

/// Everything a session task needs, wired explicitly at startup: the
/// configuration, the dispatch queue handle, and the thread-safe managers.
pub struct Shared {
    pub config: Arc<ServerConfig>,
    pub dispatch: DispatchHandle,
    pub replication: Arc<ReplicationManager>,
    pub pubsub: Arc<PubSubHub>,
    pub acl: Arc<AclStore>,
}

pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Boots the server: hydrate the keyspace from the RDB snapshot, start
    /// the dispatch loop, kick off the replica link when configured as a
    /// replica, then accept connections forever. Only a listener bind
    /// failure is fatal.
    pub async fn run(self) -> tokio::io::Result<()> {
        let config = Arc::new(self.config);

        let mut store = KeyValueStore::new();
        load_boot_snapshot(&config, &mut store).await;

        let (dispatch, queues) = dispatch_channels();
        let replication = Arc::new(ReplicationManager::new(config.role.clone()));
        let pubsub = Arc::new(PubSubHub::new());
        let acl = Arc::new(AclStore::new());

        let executor = Executor::new(
            store,
            queues,
            Arc::clone(&config),
            Arc::clone(&replication),
            Arc::clone(&pubsub),
        );
        tokio::spawn(executor.run());

        let shared = Arc::new(Shared {
            config: Arc::clone(&config),
            dispatch,
            replication,
            pubsub,
            acl,
        });

        if let Role::Replica(master_host, master_port) = &config.role {
            tokio::spawn(start_replica_link(
                Arc::clone(&shared),
                master_host.clone(),
                *master_port,
            ));
        }

        let listener = TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;
        info!(port = config.port, role = config.role.name(), "listening");

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let shared = Arc::clone(&shared);
                    tokio::spawn(async move {
                        handle_connection(stream, addr.to_string(), shared).await;
                    });
                }
                Err(accept_error) => {
                    error!(error = %accept_error, "failed to accept connection");
                }
            }
        }
    }
}

/// Best-effort boot hydration: a missing snapshot file is normal, a corrupt
/// one is logged and skipped. The server starts empty either way.
async fn load_boot_snapshot(config: &ServerConfig, store: &mut KeyValueStore) {
    let path = config.rdb_path();

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(_) => {
            debug!(path = %path.display(), "no RDB snapshot to load");
            return;
        }
    };

    match rdb::load_into_store(&bytes, store) {
        Ok(loaded) => info!(path = %path.display(), keys = loaded, "loaded RDB snapshot"),
        Err(rdb_error) => {
            warn!(path = %path.display(), error = %rdb_error, "failed to load RDB snapshot");
        }
    }
}
