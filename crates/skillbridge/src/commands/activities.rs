//! Activity feed handlers.

use tabled::Tabled;

use skillbridge_core::{Activity, HomeBoard};

use crate::cli::{ActivitiesArgs, ActivitiesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{util, Session};

#[derive(Tabled)]
struct ActivityRow {
    #[tabled(rename = "WHEN")]
    when: String,
    #[tabled(rename = "WHO")]
    who: String,
    #[tabled(rename = "ACTION")]
    action: String,
    #[tabled(rename = "TARGET")]
    target: String,
}

fn to_row(a: &Activity) -> ActivityRow {
    ActivityRow {
        when: util::fmt_time(a.created_at),
        who: a.user_name.clone(),
        action: a.action.clone(),
        target: util::ellipsize(&a.target, 40),
    }
}

pub async fn handle(
    session: &Session,
    args: ActivitiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ActivitiesCommand::List => {
            let board = HomeBoard::new(session.store.clone(), session.realtime.clone());
            let seeded = board.init().await;
            let snapshot = board.activities().snapshot();
            board.teardown();
            seeded?;

            let rendered =
                output::render_list(&global.output, &snapshot, to_row, |a| a.id.clone());
            output::print_output(&rendered, global.quiet);
            Ok(())
        }
    }
}
