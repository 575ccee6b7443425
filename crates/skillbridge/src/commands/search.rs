//! People search and connection request handlers.

use tabled::Tabled;

use skillbridge_core::{PersonMatch, UserSearch};

use crate::cli::{ConnectArgs, GlobalOpts, SearchArgs};
use crate::error::CliError;
use crate::output;

use super::{util, Session};

#[derive(Tabled)]
struct PersonRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "LOCATION")]
    location: String,
    #[tabled(rename = "SKILLS")]
    skills: String,
    #[tabled(rename = "CONNECTION")]
    connection: String,
}

fn to_row(m: &PersonMatch) -> PersonRow {
    PersonRow {
        id: m.profile.id.clone(),
        name: m.profile.name.clone(),
        location: m.profile.location.clone(),
        skills: util::ellipsize(&m.profile.skills.join(", "), 40),
        connection: m
            .connection
            .map_or_else(|| "-".into(), |status| status.to_string()),
    }
}

pub async fn handle(session: &Session, args: SearchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let search = UserSearch::new(session.store.clone(), session.user_id.clone());
    let matches = search.search_now(&args.term).await?;

    if matches.is_empty() && !global.quiet {
        eprintln!("No members match '{}'", args.term);
        return Ok(());
    }

    let rendered = output::render_list(&global.output, &matches, to_row, |m| m.profile.id.clone());
    output::print_output(&rendered, global.quiet);
    Ok(())
}

pub async fn handle_connect(
    session: &Session,
    args: ConnectArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let search = UserSearch::new(session.store.clone(), session.user_id.clone());
    let connection = search.request_connection(&args.recipient_id).await?;

    if !global.quiet {
        eprintln!(
            "Connection request sent to {} ({})",
            connection.recipient_id, connection.status
        );
    }
    Ok(())
}
