use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use system::{ClientMessage, ConnectionId, ProtocolError};

use crate::connection_tx_storage::{ConnectionTx, Egress};
use crate::server::{ServerCommand, ServerTx};

#[derive(Debug)]
pub enum ConnectionCommand {
    Connect { from: ConnectionId, tx: ConnectionTx },
    Message { from: ConnectionId, message: ClientMessage },
    Disconnect { from: ConnectionId },
}

/// Shared by every upgrade request. Ids are handed out here rather than by
/// the server task so a connection can forward frames before hearing back.
#[derive(Clone)]
pub struct ConnectionFactory {
    srv_tx: ServerTx,
    next_id: Arc<AtomicU32>,
    egress_buffer: usize,
}

impl ConnectionFactory {
    pub fn new(srv_tx: ServerTx, egress_buffer: usize) -> Self {
        Self {
            srv_tx,
            next_id: Arc::new(AtomicU32::new(1)),
            egress_buffer,
        }
    }

    fn create(&self) -> ConnectionActor {
        ConnectionActor {
            connection_id: self.next_id.fetch_add(1, Ordering::Relaxed),
            srv_tx: self.srv_tx.clone(),
            egress_buffer: self.egress_buffer,
        }
    }
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(Egress);

struct ConnectionActor {
    connection_id: ConnectionId,
    srv_tx: ServerTx,
    egress_buffer: usize,
}

impl ConnectionActor {
    /// Queues the command behind everything this connection sent before. It
    /// fails only once the server task has gone away.
    fn submit(&self, command: ConnectionCommand) {
        if self.srv_tx.send(ServerCommand::Connection(command)).is_err() {
            log::warn!("Connection {} could not reach the server", self.connection_id);
        }
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<Egress>(self.egress_buffer);

        self.submit(ConnectionCommand::Connect {
            from: self.connection_id,
            tx,
        });

        let addr = ctx.address().recipient();
        let connection_id = self.connection_id;

        tokio::spawn(async move {
            log::debug!("connection {} egress - started", connection_id);
            while let Some(egress) = rx.recv().await {
                if addr.do_send(ConnectionActorMessage(egress)).is_err() {
                    break;
                }
            }
            log::debug!("connection {} egress - terminated", connection_id);
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.submit(ConnectionCommand::Disconnect {
            from: self.connection_id,
        });
        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => match ClientMessage::decode(&text) {
                Ok(message) => {
                    log::debug!("Ingress {} {:?}", self.connection_id, message);
                    self.submit(ConnectionCommand::Message {
                        from: self.connection_id,
                        message,
                    });
                }
                Err(ProtocolError::UnknownType(kind)) => {
                    log::debug!(
                        "Connection {} sent unknown message type {}",
                        self.connection_id,
                        kind
                    );
                }
                Err(err) => {
                    log::warn!("Connection {} sent {}", self.connection_id, err);
                }
            },
            Ok(ws::Message::Binary(bin)) => {
                log::debug!(
                    "Connection {} sent {} binary bytes, ignored",
                    self.connection_id,
                    bin.len()
                );
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => (),
            Err(err) => {
                log::warn!("Connection {} protocol error: {}", self.connection_id, err);
                ctx.stop();
            }
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        let ConnectionActorMessage(Egress(frame)) = msg;
        log::debug!("Egress {} {}", self.connection_id, frame);
        ctx.text(frame);
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    factory: web::Data<ConnectionFactory>,
) -> Result<HttpResponse, Error> {
    ws::start(factory.create(), &req, stream)
}
