use serde::Serialize;
use tokio::sync::oneshot::Sender;

#[derive(Debug)]
pub enum AdminCommand {
    GetStats { tx: Sender<ServerStats> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    pub connections: usize,
    pub identified_connections: usize,
    pub identities: usize,
    pub actions: usize,
}
