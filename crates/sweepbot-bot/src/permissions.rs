//! Admin / allow-list gating, applied before any command runs.

use tracing::warn;

use sweepbot_config::BotConfig;
use sweepbot_telegram::types::{SendMessageParams, TgMessage};

use crate::BotContext;

/// Whether the bot may operate in this chat at all.
///
/// Private chats (positive IDs) pass here; the admin check gates them
/// separately.
pub fn is_chat_allowed(config: &BotConfig, chat_id: i64) -> bool {
    if !config.restrict_to_allowed_groups {
        return true;
    }
    if chat_id > 0 {
        return true;
    }
    config.allowed_groups.contains(&chat_id)
}

/// Pure gate decision: admin-only in private chats, allow-list in groups.
pub fn is_authorized(config: &BotConfig, chat_id: i64, user_id: i64) -> bool {
    if chat_id > 0 {
        user_id == config.admin_user_id
    } else {
        is_chat_allowed(config, chat_id)
    }
}

/// Check permissions for an incoming message, replying with a rejection
/// notice when denied.
pub async fn check(ctx: &BotContext, msg: &TgMessage) -> bool {
    let chat_id = msg.chat.id;
    let user_id = msg.from.as_ref().map(|u| u.id).unwrap_or_default();

    if is_authorized(&ctx.config, chat_id, user_id) {
        return true;
    }

    let text = if chat_id > 0 {
        "⛔ You are not authorized to use this bot.\n\
         This bot is private and only available to its owner."
            .to_string()
    } else {
        warn!(chat_id, user_id, "Unauthorized request from group");
        format!(
            "⛔ This group is not authorized to use this bot.\n\
             🆔 Group ID: `{chat_id}`"
        )
    };

    if let Err(e) = ctx
        .api
        .send_message(&SendMessageParams {
            chat_id,
            text,
            parse_mode: None,
            reply_to_message_id: Some(msg.message_id),
        })
        .await
    {
        warn!(chat_id, "Failed to send rejection notice: {e}");
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BotConfig {
        BotConfig {
            admin_user_id: 42,
            allowed_groups: vec![-100200300],
            ..BotConfig::default()
        }
    }

    #[test]
    fn test_private_chat_admin_only() {
        let config = config();
        assert!(is_authorized(&config, 42, 42));
        assert!(!is_authorized(&config, 7, 7));
    }

    #[test]
    fn test_group_allow_list() {
        let config = config();
        assert!(is_authorized(&config, -100200300, 7));
        assert!(!is_authorized(&config, -100999999, 7));
    }

    #[test]
    fn test_unrestricted_allows_any_group() {
        let config = BotConfig {
            restrict_to_allowed_groups: false,
            ..config()
        };
        assert!(is_chat_allowed(&config, -100999999));
        assert!(is_authorized(&config, -100999999, 7));
        // Private chats stay admin-only even without group restriction.
        assert!(!is_authorized(&config, 7, 7));
    }
}
