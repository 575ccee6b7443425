//! Opportunity board handlers.

use owo_colors::OwoColorize;
use tabled::Tabled;
use tokio_stream::StreamExt;

use skillbridge_core::{HomeBoard, Opportunity};

use crate::cli::{GlobalOpts, OpportunitiesArgs, OpportunitiesCommand};
use crate::error::CliError;
use crate::output;

use super::{util, Session};

#[derive(Tabled)]
struct OpportunityRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "TITLE")]
    title: String,
    #[tabled(rename = "ORGANIZATION")]
    organization: String,
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "SPOTS")]
    spots: u32,
    #[tabled(rename = "POSTED")]
    posted: String,
}

fn to_row(o: &Opportunity) -> OpportunityRow {
    OpportunityRow {
        id: o.id.clone(),
        title: util::ellipsize(&o.title, 40),
        organization: util::ellipsize(&o.organization, 24),
        category: o.category.clone(),
        spots: o.spots,
        posted: util::fmt_time(o.created_at),
    }
}

pub async fn handle(
    session: &Session,
    args: OpportunitiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let board = HomeBoard::new(session.store.clone(), session.realtime.clone());

    match args.command {
        OpportunitiesCommand::List { limit, category } => {
            let seeded = board.init().await;
            let snapshot = board.opportunities().snapshot();
            board.teardown();
            seeded?;

            let rows: Vec<Opportunity> = snapshot
                .iter()
                .filter(|o| {
                    category
                        .as_deref()
                        .is_none_or(|c| o.category.eq_ignore_ascii_case(c))
                })
                .take(limit)
                .cloned()
                .collect();

            let rendered = output::render_list(&global.output, &rows, to_row, |o| o.id.clone());
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        OpportunitiesCommand::Watch => {
            board.init().await?;
            if !global.quiet {
                eprintln!("Watching the opportunity board (ctrl-c to stop)");
            }

            let color = output::should_color(&global.color);
            let mut snapshots = board.opportunities().snapshot_stream();
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    snapshot = snapshots.next() => {
                        let Some(snapshot) = snapshot else { break };
                        let header = format!("{} open opportunities", snapshot.len());
                        if color {
                            println!("{}", header.bold());
                        } else {
                            println!("{header}");
                        }
                        let rendered = output::render_list(
                            &global.output,
                            &snapshot,
                            to_row,
                            |o| o.id.clone(),
                        );
                        output::print_output(&rendered, global.quiet);
                    }
                }
            }
            board.teardown();
            Ok(())
        }
    }
}
