// WhatsApp Bridge — Inbound Message Handling
// mark_seen_with_retry

use crate::atoms::constants::MARK_SEEN_RETRY_DELAY;
use crate::atoms::types::InboundMessage;
use super::session::WhatsAppSession;
use log::{debug, warn};
use std::sync::Arc;

/// Mark a message's chat as read. One retry after a fixed delay, then give up.
/// Returns whether the chat was marked.
pub(crate) async fn mark_seen_with_retry(session: Arc<dyn WhatsAppSession>, message: InboundMessage) -> bool {
    match session.mark_seen(&message).await {
        Ok(()) => {
            debug!("[whatsapp] Marked {} as read", message.chat_id);
            return true;
        }
        Err(e) => {
            warn!("[whatsapp] Mark-as-read failed for {}: {} — retrying in {:?}",
                message.chat_id, e, MARK_SEEN_RETRY_DELAY);
        }
    }

    tokio::time::sleep(MARK_SEEN_RETRY_DELAY).await;

    match session.mark_seen(&message).await {
        Ok(()) => true,
        Err(e) => {
            warn!("[whatsapp] Mark-as-read retry failed for {}: {} — dropping", message.chat_id, e);
            false
        }
    }
}
