use std::collections::HashMap;
use system::{ConnectionId, Identity, SessionStore};

/// Identity binding of one live connection. A closed connection has no entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Unidentified,
    Identified(Identity),
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ServerError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayOptions {
    /// Keep the first identity a connection presented and ignore later ones.
    pub pin_identity: bool,
}

pub struct ServerState {
    pub store: SessionStore,
    pub connection_states: HashMap<ConnectionId, ConnectionState>,
    options: GatewayOptions,
}

impl ServerState {
    pub fn new(store: SessionStore, options: GatewayOptions) -> Self {
        Self {
            store,
            connection_states: HashMap::new(),
            options,
        }
    }

    pub fn connect(&mut self, connection_id: ConnectionId) {
        if self
            .connection_states
            .insert(connection_id, ConnectionState::Unidentified)
            .is_some()
        {
            log::warn!("Connection {} registered twice", connection_id);
        }
    }

    /// Forgets the connection. The identity's log stays in the store so the
    /// same client can pick it up again after reconnecting.
    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> Option<ConnectionState> {
        self.connection_states.remove(connection_id)
    }

    /// Resolves the identity a message acts for. A `claimed` identity rebinds
    /// the connection unless identities are pinned; without one the bound
    /// identity, if any, is used.
    pub fn bind_identity(
        &mut self,
        connection_id: &ConnectionId,
        claimed: Option<&Identity>,
    ) -> Result<Option<Identity>, ServerError> {
        let pin_identity = self.options.pin_identity;
        let state = self
            .connection_states
            .get_mut(connection_id)
            .ok_or(ServerError::UnknownConnection(*connection_id))?;

        let bound = match state {
            ConnectionState::Identified(bound) => Some(bound.clone()),
            ConnectionState::Unidentified => None,
        };

        match (bound, claimed) {
            (bound, None) => Ok(bound),
            (Some(bound), Some(claimed)) if &bound == claimed => Ok(Some(bound)),
            (Some(bound), Some(claimed)) if pin_identity => {
                log::warn!(
                    "Connection {} bound to {} tried to act as {}",
                    connection_id,
                    bound,
                    claimed
                );
                Ok(Some(bound))
            }
            (bound, Some(claimed)) => {
                match bound {
                    Some(bound) => log::info!(
                        "Connection {} switches identity {} -> {}",
                        connection_id,
                        bound,
                        claimed
                    ),
                    None => log::debug!("Connection {} identified as {}", connection_id, claimed),
                }
                *state = ConnectionState::Identified(claimed.clone());
                Ok(Some(claimed.clone()))
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connection_states.len()
    }

    pub fn identified_count(&self) -> usize {
        self.connection_states
            .values()
            .filter(|state| matches!(state, ConnectionState::Identified(_)))
            .count()
    }
}
