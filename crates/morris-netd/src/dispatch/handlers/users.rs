//! USERS - list logged-in players and their ratings.

use std::fmt::Write as _;

use super::{HandlerContext, HandlerError};
use crate::dispatch::error::HandlerResult;
use crate::net::framing::PacketOwned;
use crate::net::outbound::send_ack;
use crate::player::INITIAL_RATING;

pub(crate) async fn handle(ctx: &mut HandlerContext<'_>, _packet: &PacketOwned) -> HandlerResult {
    let mut names = ctx.sessions.logged_in_players();
    // Sorted so the listing is stable across identical states.
    names.sort();

    let mut listing = String::new();
    for name in names {
        let rating = ctx.players.rating(&name).unwrap_or(INITIAL_RATING);
        let _ = writeln!(listing, "{name}\t{rating}");
    }

    let tx = ctx.outbound().ok_or(HandlerError::SessionGone)?;
    let _ = send_ack(&tx, listing.as_bytes()).await;
    Ok(())
}
