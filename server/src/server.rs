use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use system::{ClientMessage, ConnectionId, SessionStore};

use crate::admin::{AdminCommand, ServerStats};
use crate::connection::ConnectionCommand;
use crate::connection_tx_storage::ConnectionTxStorage;
use crate::router::{route, Audience, Dispatch};
use crate::server_state::{GatewayOptions, ServerState};

/// Unbounded so a connection never has to drop a frame it already accepted
/// from its socket. Peers are throttled on the egress side instead.
pub type ServerTx = UnboundedSender<ServerCommand>;

#[derive(Debug)]
pub enum ServerCommand {
    Connection(ConnectionCommand),
    Admin(AdminCommand),
}

/// Owns the store and every connection handle. Commands are handled one at a
/// time, each to completion, which gives all mutations a single total order.
pub struct Server {
    server_state: ServerState,
    connections: ConnectionTxStorage,
}

impl Server {
    pub fn new(store: SessionStore, options: GatewayOptions) -> Self {
        Self {
            server_state: ServerState::new(store, options),
            connections: ConnectionTxStorage::new(),
        }
    }

    pub fn handle_command(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::Connection(command) => self.handle_connection_command(command),
            ServerCommand::Admin(command) => self.handle_admin_command(command),
        }
    }

    fn handle_connection_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Connect { from, tx } => {
                self.server_state.connect(from);
                self.connections.insert(from, tx);
                log::info!("Connection {} opened", from);
            }
            ConnectionCommand::Disconnect { from } => {
                self.connections.remove(&from);
                if self.server_state.disconnect(&from).is_some() {
                    log::info!("Connection {} closed", from);
                }
            }
            ConnectionCommand::Message { from, message } => self.handle_message(from, message),
        }
    }

    fn handle_message(&mut self, from: ConnectionId, message: ClientMessage) {
        let identity = match self.server_state.bind_identity(&from, message.user_id()) {
            Ok(identity) => identity,
            Err(err) => {
                log::warn!("Dropping {}: {}", message.kind(), err);
                return;
            }
        };

        if let Some(dispatch) = route(&mut self.server_state.store, identity.as_ref(), message) {
            self.deliver(&from, dispatch);
        }
    }

    fn deliver(&mut self, from: &ConnectionId, dispatch: Dispatch) {
        let frame = match dispatch.message.encode() {
            Ok(frame) => frame,
            Err(err) => {
                log::error!("{}", err);
                return;
            }
        };
        match dispatch.audience {
            Audience::Sender => self.connections.send(from, &frame),
            Audience::Others => self.connections.broadcast(&frame, Some(from)),
            Audience::Everyone => self.connections.broadcast(&frame, None),
        }
    }

    fn handle_admin_command(&mut self, command: AdminCommand) {
        match command {
            AdminCommand::GetStats { tx } => {
                if tx.send(self.stats()).is_err() {
                    log::debug!("Stats requester went away");
                }
            }
        }
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            connections: self.connections.len(),
            identified_connections: self.server_state.identified_count(),
            identities: self.server_state.store.identity_count(),
            actions: self.server_state.store.action_count(),
        }
    }
}

pub fn spawn_server(server: Server) -> ServerTx {
    let (srv_tx, mut srv_rx) = unbounded_channel::<ServerCommand>();

    tokio::spawn(async move {
        let mut server = server;
        log::info!("Server task started");
        while let Some(command) = srv_rx.recv().await {
            server.handle_command(command);
        }
        log::info!("Server task terminated");
    });

    srv_tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection_tx_storage::Egress;
    use system::{Action, ServerMessage};
    use tokio::sync::mpsc::{channel, Receiver};

    fn server() -> Server {
        Server::new(SessionStore::new(), GatewayOptions::default())
    }

    fn connect(server: &mut Server, from: ConnectionId) -> Receiver<Egress> {
        let (tx, rx) = channel(64);
        server.handle_command(ServerCommand::Connection(ConnectionCommand::Connect {
            from,
            tx,
        }));
        rx
    }

    fn send(server: &mut Server, from: ConnectionId, frame: &str) {
        let message = ClientMessage::decode(frame).expect("valid frame");
        server.handle_command(ServerCommand::Connection(ConnectionCommand::Message {
            from,
            message,
        }));
    }

    fn disconnect(server: &mut Server, from: ConnectionId) {
        server.handle_command(ServerCommand::Connection(ConnectionCommand::Disconnect {
            from,
        }));
    }

    /// Closes the connection and collects everything it was sent.
    async fn received(
        server: &mut Server,
        from: ConnectionId,
        mut rx: Receiver<Egress>,
    ) -> Vec<ServerMessage> {
        disconnect(server, from);
        let mut messages = Vec::new();
        while let Some(Egress(frame)) = rx.recv().await {
            messages.push(ServerMessage::decode(&frame).expect("valid frame"));
        }
        messages
    }

    const DRAW_U1: &str = r##"{"type":"draw","userId":"u1","x":10,"y":10,"color":"#000","size":5,"isErasing":false}"##;

    #[tokio::test]
    async fn it_routes_draw_to_others_only() {
        let mut server = server();
        let rx1 = connect(&mut server, 1);
        let rx2 = connect(&mut server, 2);
        let rx3 = connect(&mut server, 3);
        send(&mut server, 1, r#"{"type":"init","userId":"u1"}"#);
        send(&mut server, 1, DRAW_U1);
        send(&mut server, 1, r#"{"type":"newLine","userId":"u1"}"#);

        let to_sender = received(&mut server, 1, rx1).await;
        assert_eq!(
            to_sender,
            vec![ServerMessage::Init {
                list: vec![vec![]]
            }]
        );
        for (id, rx) in vec![(2, rx2), (3, rx3)] {
            let messages = received(&mut server, id, rx).await;
            assert_eq!(messages.len(), 2);
            assert!(matches!(messages[0], ServerMessage::Draw(ref point) if point.user_id == "u1"));
            assert_eq!(messages[1], ServerMessage::NewLine);
        }
    }

    #[tokio::test]
    async fn it_routes_undo_and_clear_to_everyone() {
        let mut server = server();
        let rx1 = connect(&mut server, 1);
        let rx2 = connect(&mut server, 2);
        send(&mut server, 1, r#"{"type":"init","userId":"u1"}"#);
        send(&mut server, 2, r#"{"type":"init","userId":"u2"}"#);
        send(&mut server, 1, DRAW_U1);
        send(&mut server, 1, r#"{"type":"undo","userId":"u1"}"#);
        send(&mut server, 2, r#"{"type":"clear","userId":"u2"}"#);

        let empty = ServerMessage::Undo {
            list: vec![vec![], vec![]],
        };
        let messages = received(&mut server, 1, rx1).await;
        assert_eq!(&messages[1..], &[empty.clone(), empty.clone()]);
        let messages = received(&mut server, 2, rx2).await;
        assert_eq!(messages.len(), 4);
        assert_eq!(&messages[2..], &[empty.clone(), empty]);
    }

    #[tokio::test]
    async fn it_uses_bound_identity_for_later_messages() {
        let mut server = server();
        let rx1 = connect(&mut server, 1);
        send(&mut server, 1, r#"{"type":"init","userId":"u1"}"#);
        send(
            &mut server,
            1,
            r##"{"type":"draw","x":1,"y":2,"color":"#000","size":"4","isErasing":true}"##,
        );
        send(&mut server, 1, r#"{"type":"newLine"}"#);

        let log = server.server_state.store.log("u1").expect("").to_vec();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].as_point().map(|p| p.user_id.as_str()), Some("u1"));
        assert_eq!(log[1], Action::LineBreak);
        received(&mut server, 1, rx1).await;
    }

    #[tokio::test]
    async fn it_resumes_history_after_reconnect() {
        let mut server = server();
        let rx1 = connect(&mut server, 1);
        send(&mut server, 1, r#"{"type":"init","userId":"u1"}"#);
        send(&mut server, 1, DRAW_U1);
        received(&mut server, 1, rx1).await;

        let rx2 = connect(&mut server, 2);
        send(&mut server, 2, r#"{"type":"init","userId":"u1"}"#);
        let messages = received(&mut server, 2, rx2).await;

        match &messages[..] {
            [ServerMessage::Init { list }] => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].len(), 1);
            }
            other => panic!("unexpected messages {:?}", other),
        }
    }

    #[test]
    fn it_ignores_messages_from_unregistered_connection() {
        let mut server = server();
        send(&mut server, 9, r#"{"type":"init","userId":"u1"}"#);
        assert_eq!(server.stats().identities, 0);
    }

    #[tokio::test]
    async fn it_reports_stats() {
        let mut server = server();
        let _rx1 = connect(&mut server, 1);
        let _rx2 = connect(&mut server, 2);
        send(&mut server, 1, r#"{"type":"init","userId":"u1"}"#);
        send(&mut server, 1, DRAW_U1);

        let (tx, rx) = tokio::sync::oneshot::channel();
        server.handle_command(ServerCommand::Admin(AdminCommand::GetStats { tx }));

        assert_eq!(
            rx.await.expect(""),
            ServerStats {
                connections: 2,
                identified_connections: 1,
                identities: 1,
                actions: 1,
            }
        );
    }

    #[tokio::test]
    async fn it_serves_commands_from_spawned_task() {
        let srv_tx = spawn_server(server());
        let (tx, mut rx) = channel(16);
        let message = ClientMessage::decode(r#"{"type":"init","userId":"u1"}"#).expect("");

        srv_tx
            .send(ServerCommand::Connection(ConnectionCommand::Connect { from: 1, tx }))
            .expect("");
        srv_tx
            .send(ServerCommand::Connection(ConnectionCommand::Message { from: 1, message }))
            .expect("");

        let Egress(frame) = rx.recv().await.expect("init answer");
        assert_eq!(
            ServerMessage::decode(&frame).expect(""),
            ServerMessage::Init {
                list: vec![vec![]]
            }
        );
    }

    #[tokio::test]
    async fn it_keeps_every_command_queued_before_the_task_runs() {
        let srv_tx = spawn_server(server());
        let (tx, _rx) = channel(1);
        srv_tx
            .send(ServerCommand::Connection(ConnectionCommand::Connect { from: 1, tx }))
            .expect("");
        let init = ClientMessage::decode(r#"{"type":"init","userId":"u1"}"#).expect("");
        srv_tx
            .send(ServerCommand::Connection(ConnectionCommand::Message { from: 1, message: init }))
            .expect("");
        // Far more than any egress buffer, all queued without yielding.
        for _ in 0..5000 {
            let message = ClientMessage::decode(DRAW_U1).expect("");
            srv_tx
                .send(ServerCommand::Connection(ConnectionCommand::Message { from: 1, message }))
                .expect("");
        }

        let (stats_tx, stats_rx) = tokio::sync::oneshot::channel();
        srv_tx
            .send(ServerCommand::Admin(AdminCommand::GetStats { tx: stats_tx }))
            .expect("");
        let stats = stats_rx.await.expect("");

        assert_eq!(stats.identities, 1);
        assert_eq!(stats.actions, 5000);
    }

    #[tokio::test]
    async fn it_forwards_draw_as_stored_point() {
        let mut server = server();
        let rx1 = connect(&mut server, 1);
        let rx2 = connect(&mut server, 2);
        send(&mut server, 1, r#"{"type":"init","userId":"u1"}"#);
        send(
            &mut server,
            1,
            r##"{"type":"draw","x":3,"y":4,"color":"#fff","size":7,"isErasing":false,"pressure":0.5}"##,
        );
        received(&mut server, 1, rx1).await;

        disconnect(&mut server, 2);
        let mut rx2 = rx2;
        let Egress(frame) = rx2.recv().await.expect("draw frame");
        let value: system::serde_json::Value = system::serde_json::from_str(&frame).expect("");
        assert_eq!(value["type"], "draw");
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["size"], 7);
        assert_eq!(value["x"].as_f64(), Some(3.0));
        assert!(value.get("pressure").is_none());
    }
}
