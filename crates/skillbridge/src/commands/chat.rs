//! Chat handlers.

use tabled::Tabled;

use skillbridge_core::{ChatRoom, Message};

use crate::cli::{ChatArgs, ChatCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{util, Session};

#[derive(Tabled)]
struct MessageRow {
    #[tabled(rename = "WHEN")]
    when: String,
    #[tabled(rename = "FROM")]
    from: String,
    #[tabled(rename = "MESSAGE")]
    content: String,
}

fn to_row(m: &Message) -> MessageRow {
    MessageRow {
        when: util::fmt_time(m.created_at),
        from: m.sender_id.clone(),
        content: util::ellipsize(&m.content, 72),
    }
}

pub async fn handle(session: &Session, args: ChatArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ChatCommand::History { room, limit } => {
            let chat = ChatRoom::new(
                session.store.clone(),
                session.realtime.clone(),
                room,
                session.user_id.clone(),
            );
            let seeded = chat.init().await;
            let snapshot = chat.messages().snapshot();
            chat.teardown();
            seeded?;

            // Transcript is oldest-first; show the newest `limit`.
            let start = snapshot.len().saturating_sub(limit as usize);
            let rows = &snapshot[start..];

            let rendered = output::render_list(&global.output, rows, to_row, |m| m.id.clone());
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ChatCommand::Send { room, message } => {
            let chat = ChatRoom::new(
                session.store.clone(),
                session.realtime.clone(),
                room,
                session.user_id.clone(),
            );
            let sent = chat.send(message).await;
            chat.teardown();
            let confirmed = sent?;

            if !global.quiet {
                eprintln!("Message {} sent to {}", confirmed.id, confirmed.room_id);
            }
            Ok(())
        }
    }
}
