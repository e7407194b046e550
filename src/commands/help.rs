//! `/help`: generated from the command registry, never maintained by hand.

use super::{registry, HandlerFuture, ResponsePayload};
use crate::state::AppState;

pub fn execute<'a>(state: &'a AppState, sender_id: &'a str, _args: &'a str) -> HandlerFuture<'a> {
    Box::pin(async move { Ok(ResponsePayload::Text(render(state.is_admin(sender_id)))) })
}

/// Build the help text; the admin block is only shown to admins.
fn render(for_admin: bool) -> String {
    let mut text = String::from("🎌⚡ GUIDE KAIWA ⚡🎌\n\n📋 COMMANDES :\n");
    let mut shown = 0;
    for spec in registry() {
        if spec.admin_only {
            continue;
        }
        text.push_str(&format!("/{} - {}\n", spec.name, spec.description));
        shown += 1;
    }

    if for_admin {
        text.push_str("\n🔐 COMMANDES ADMIN :\n");
        for spec in registry() {
            if spec.admin_only {
                text.push_str(&format!("/{} - {}\n", spec.name, spec.description));
                shown += 1;
            }
        }
    }

    text.push_str(&format!("\n📊 Total : {shown} commandes\n✨ Ton compagnon IA ! 💖"));
    text
}
