use std::collections::HashMap;
use system::ConnectionId;
use tokio::sync::mpsc::error::TrySendError;

/// Encoded text frame on its way to one WebSocket.
#[derive(Debug, Clone, PartialEq)]
pub struct Egress(pub String);

pub type ConnectionTx = tokio::sync::mpsc::Sender<Egress>;

pub struct ConnectionTxStorage {
    connection_txs: HashMap<ConnectionId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.connection_txs.insert(connection_id, tx);
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(connection_id)
    }

    pub fn len(&self) -> usize {
        self.connection_txs.len()
    }

    /// Sends without waiting. A connection that is gone or not keeping up
    /// misses this frame; nobody else is affected.
    pub fn send(&mut self, to: &ConnectionId, frame: &str) {
        if let Some(tx) = self.connection_txs.get_mut(to) {
            Self::try_send(to, tx, frame);
        } else {
            log::debug!("Skipping frame for unknown connection {}", to);
        }
    }

    pub fn broadcast(&mut self, frame: &str, without: Option<&ConnectionId>) {
        for (connection_id, tx) in self.connection_txs.iter_mut() {
            if without != Some(connection_id) {
                Self::try_send(connection_id, tx, frame);
            }
        }
    }

    fn try_send(to: &ConnectionId, tx: &mut ConnectionTx, frame: &str) {
        match tx.try_send(Egress(frame.to_owned())) {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => {
                log::debug!("Connection {} is closed, frame skipped", to);
            }
            Err(TrySendError::Full(_)) => {
                log::warn!("Connection {} is not keeping up, frame dropped", to);
            }
        }
    }
}
