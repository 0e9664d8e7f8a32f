//! `/start` — greeting with the list of available commands.

use async_trait::async_trait;

use sweepbot_telegram::types::{SendMessageParams, TgMessage};

use crate::BotContext;
use crate::commands::Command;

pub struct StartCommand {
    /// (name, description) pairs of the feature commands to advertise.
    listing: Vec<(String, String)>,
}

impl StartCommand {
    pub fn new(listing: Vec<(String, String)>) -> Self {
        Self { listing }
    }
}

#[async_trait]
impl Command for StartCommand {
    fn name(&self) -> &str {
        "start"
    }

    fn description(&self) -> &str {
        "Show available commands"
    }

    async fn handle(&self, ctx: &BotContext, msg: &TgMessage) -> anyhow::Result<()> {
        let command_list = self
            .listing
            .iter()
            .map(|(name, desc)| format!("/{name} - {desc}"))
            .collect::<Vec<_>>()
            .join("\n");

        let chat_type = if msg.chat.id < 0 { "Group" } else { "Private Chat" };

        let text = format!(
            "🤖 Hello! I am a group-manager bot.\n\n\
             📍 Current environment: {chat_type}\n\
             🆔 Chat ID: `{}`\n\n\
             📋 Available commands:\n{command_list}\n\n\
             💡 To use any command, send it as a reply to the target message.",
            msg.chat.id
        );

        ctx.api
            .send_message(&SendMessageParams {
                chat_id: msg.chat.id,
                text,
                parse_mode: None,
                reply_to_message_id: None,
            })
            .await?;

        Ok(())
    }
}
