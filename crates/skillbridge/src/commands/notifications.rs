//! Notification handlers.

use tabled::Tabled;

use skillbridge_core::{Notification, NotificationCenter};

use crate::cli::{GlobalOpts, NotificationsArgs, NotificationsCommand};
use crate::error::CliError;
use crate::output;

use super::{util, Session};

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "READ")]
    read: String,
    #[tabled(rename = "TYPE")]
    kind: String,
    #[tabled(rename = "MESSAGE")]
    message: String,
    #[tabled(rename = "WHEN")]
    when: String,
}

fn to_row(n: &Notification) -> NotificationRow {
    NotificationRow {
        id: n.id.clone(),
        read: if n.read { "yes".into() } else { "no".into() },
        kind: n.kind.clone(),
        message: util::ellipsize(&n.message, 56),
        when: util::fmt_time(n.created_at),
    }
}

pub async fn handle(
    session: &Session,
    args: NotificationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let center = NotificationCenter::new(
        session.store.clone(),
        session.realtime.clone(),
        session.user_id.clone(),
    );
    let seeded = center.init().await;
    let result = match seeded {
        Ok(()) => run(&center, args.command, global).await,
        Err(err) => Err(err.into()),
    };
    center.teardown();
    result
}

async fn run(
    center: &NotificationCenter,
    command: NotificationsCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match command {
        NotificationsCommand::List { unread } => {
            let snapshot = center.notifications().snapshot();
            let rows: Vec<Notification> = snapshot
                .iter()
                .filter(|n| !unread || !n.read)
                .cloned()
                .collect();

            let rendered = output::render_list(&global.output, &rows, to_row, |n| n.id.clone());
            output::print_output(&rendered, global.quiet);
            if !global.quiet {
                eprintln!("{} unread", center.unread_count());
            }
            Ok(())
        }

        NotificationsCommand::MarkRead { id } => {
            center.mark_read(&id).await?;
            if !global.quiet {
                eprintln!("Notification {id} marked read");
            }
            Ok(())
        }

        NotificationsCommand::MarkAllRead => {
            center.mark_all_read().await?;
            if !global.quiet {
                eprintln!("All notifications marked read");
            }
            Ok(())
        }

        NotificationsCommand::Dismiss { id } => {
            center.dismiss(&id).await?;
            if !global.quiet {
                eprintln!("Notification {id} dismissed");
            }
            Ok(())
        }
    }
}
