use system::{Action, ClientMessage, Identity, ServerMessage, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Audience {
    /// Only the connection the message came from.
    Sender,
    /// Every open connection except the sender's.
    Others,
    /// Every open connection, the sender's included.
    Everyone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub audience: Audience,
    pub message: ServerMessage,
}

impl Dispatch {
    fn new(audience: Audience, message: ServerMessage) -> Self {
        Self { audience, message }
    }
}

/// Applies one inbound message to the store and decides what goes out.
///
/// Incremental messages (draw, newLine) only go to the other connections since
/// the sender already has the ink. Anything that removes history answers with
/// a full snapshot so every canvas is redrawn from the store. Messages from an
/// identity that never sent `init` are dropped.
pub fn route(
    store: &mut SessionStore,
    identity: Option<&Identity>,
    message: ClientMessage,
) -> Option<Dispatch> {
    let kind = message.kind();
    match message {
        ClientMessage::Init { .. } => {
            if let Some(identity) = identity {
                if store.ensure(identity) {
                    log::info!("New identity {}", identity);
                }
            }
            Some(Dispatch::new(
                Audience::Sender,
                ServerMessage::Init {
                    list: store.snapshot(),
                },
            ))
        }
        ClientMessage::Draw(command) => {
            let identity = known(store, identity, kind)?;
            let point = command.into_point(identity.clone());
            store.append(identity, Action::Point(point.clone())).ok()?;
            Some(Dispatch::new(Audience::Others, ServerMessage::Draw(point)))
        }
        ClientMessage::NewLine { .. } => {
            let identity = known(store, identity, kind)?;
            store.append(identity, Action::LineBreak).ok()?;
            Some(Dispatch::new(Audience::Others, ServerMessage::NewLine))
        }
        ClientMessage::Undo { .. } => {
            let identity = known(store, identity, kind)?;
            let removed = store.undo(identity).ok()?;
            if removed == 0 {
                log::debug!("Nothing to undo for {}", identity);
                return None;
            }
            Some(Dispatch::new(
                Audience::Everyone,
                ServerMessage::Undo {
                    list: store.snapshot(),
                },
            ))
        }
        ClientMessage::Clear { .. } => {
            let identity = known(store, identity, kind)?;
            store.clear(identity).ok()?;
            Some(Dispatch::new(
                Audience::Everyone,
                ServerMessage::Undo {
                    list: store.snapshot(),
                },
            ))
        }
    }
}

fn known<'a>(
    store: &SessionStore,
    identity: Option<&'a Identity>,
    kind: &str,
) -> Option<&'a Identity> {
    match identity {
        Some(identity) if store.contains(identity) => Some(identity),
        Some(identity) => {
            log::debug!("Ignoring {} from {}: no init received", kind, identity);
            None
        }
        None => {
            log::debug!("Ignoring {} from unidentified connection", kind);
            None
        }
    }
}
