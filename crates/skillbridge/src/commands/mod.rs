//! Command dispatch: bridges CLI args -> core facades -> output formatting.

pub mod activities;
pub mod chat;
pub mod config_cmd;
pub mod notifications;
pub mod opportunities;
pub mod search;
pub mod util;

use skillbridge_core::{RealtimeClient, SessionConfig, StoreClient};
use tokio_util::sync::CancellationToken;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// One backend session: the shared store and realtime clients plus the
/// acting user. Handlers build their facades from this.
pub struct Session {
    pub store: StoreClient,
    pub realtime: RealtimeClient,
    pub user_id: String,
    cancel: CancellationToken,
}

impl Session {
    pub fn open(config: &SessionConfig) -> Result<Self, CliError> {
        let cancel = CancellationToken::new();
        let store = config.store_client()?;
        let realtime = config.realtime_client(cancel.clone())?;

        Ok(Self {
            store,
            realtime,
            user_id: config.user_id.clone(),
            cancel,
        })
    }

    /// Stop the realtime connection's reconnect loop.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

/// Dispatch a session-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Opportunities(args) => opportunities::handle(session, args, global).await,
        Command::Activities(args) => activities::handle(session, args, global).await,
        Command::Notifications(args) => notifications::handle(session, args, global).await,
        Command::Search(args) => search::handle(session, args, global).await,
        Command::Connect(args) => search::handle_connect(session, args, global).await,
        Command::Chat(args) => chat::handle(session, args, global).await,
        // Config is handled before dispatch
        Command::Config(_) => unreachable!(),
    }
}
