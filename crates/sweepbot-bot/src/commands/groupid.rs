//! `/groupid` — admin-only chat diagnostics.

use async_trait::async_trait;

use sweepbot_telegram::types::{SendMessageParams, TgMessage};

use crate::commands::Command;
use crate::permissions::is_chat_allowed;
use crate::BotContext;

pub struct GroupIdCommand;

#[async_trait]
impl Command for GroupIdCommand {
    fn name(&self) -> &str {
        "groupid"
    }

    fn description(&self) -> &str {
        "Show this chat's ID and allow-list status (admin only)"
    }

    async fn handle(&self, ctx: &BotContext, msg: &TgMessage) -> anyhow::Result<()> {
        let chat_id = msg.chat.id;
        let user_id = msg.from.as_ref().map(|u| u.id).unwrap_or_default();

        // Usable inside allowed groups by anyone who passed the gate, but
        // the output is for the operator only.
        if user_id != ctx.config.admin_user_id {
            ctx.api
                .send_message(&SendMessageParams {
                    chat_id,
                    text: "⛔ You are not authorized to use this command.".into(),
                    parse_mode: None,
                    reply_to_message_id: Some(msg.message_id),
                })
                .await?;
            return Ok(());
        }

        let chat_type = if chat_id < 0 { "Group" } else { "Private Chat" };
        let status = if is_chat_allowed(&ctx.config, chat_id) {
            "✅ Allowed"
        } else {
            "❌ Not Allowed"
        };

        let text = format!(
            "🆔 Chat information:\n\n\
             📍 Type: {chat_type}\n\
             🆔 ID: `{chat_id}`\n\
             🔐 Status: {status}\n\n\
             💡 To allow this group, add the above ID to allowed_groups in config.json5."
        );

        ctx.api
            .send_message(&SendMessageParams {
                chat_id,
                text,
                parse_mode: None,
                reply_to_message_id: None,
            })
            .await?;

        Ok(())
    }
}
