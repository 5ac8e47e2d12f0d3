//! Message processing: runs the TEA update loop and dispatches actions

use crate::actions::{handle_action, ActionContext};
use crate::handler;
use crate::message::Message;
use crate::state::AppState;

/// Process a message through the TEA update function.
///
/// Follow-up messages are processed in the same call, so a message and
/// everything it implies land in one state transition.
pub fn process_message(state: &mut AppState, message: Message, ctx: &ActionContext) {
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        if let Some(action) = result.action {
            handle_action(action, ctx);
        }

        msg = result.message;
    }
}
