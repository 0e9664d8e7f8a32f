//! `/del` — schedule the replied-to message for deletion.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use sweepbot_expiry::delay::DelayPolicy;
use sweepbot_telegram::types::{DeleteMessageParams, TgMessage};

use crate::commands::Command;
use crate::{BotContext, send_transient_notice};

pub struct DelCommand;

/// What a `/del` message asks for: the reply target and the resolved
/// delay in hours. `None` when the command is not a reply to anything.
fn parse_request(msg: &TgMessage, delay: &DelayPolicy) -> Option<(i64, f64)> {
    let target = msg.reply_to_message.as_deref()?;
    Some((target.message_id, delay.resolve(msg.first_arg())))
}

#[async_trait]
impl Command for DelCommand {
    fn name(&self) -> &str {
        "del"
    }

    fn description(&self) -> &str {
        "Delete the replied-to message after a delay (e.g. /del 2h)"
    }

    async fn handle(&self, ctx: &BotContext, msg: &TgMessage) -> anyhow::Result<()> {
        let Some((target_id, hours)) = parse_request(msg, &ctx.delay) else {
            send_transient_notice(
                ctx.api.clone(),
                msg.chat.id,
                Some(msg.message_id),
                "❗ Please send this command in reply to a message.".into(),
            );
            return Ok(());
        };

        let delete_at = Utc::now() + chrono::Duration::milliseconds((hours * 3_600_000.0) as i64);
        let chat_id = msg.chat.id;

        // Storage failure propagates: the dispatcher tells the user that
        // scheduling failed.
        ctx.store
            .insert(chat_id, target_id, delete_at, &format!("del_after_{hours:.1}h"))
            .await?;
        info!(chat_id, message_id = target_id, hours, "Scheduled message for deletion");

        // The /del command itself should not linger in the chat.
        if let Err(e) = ctx
            .api
            .delete_message(&DeleteMessageParams {
                chat_id,
                message_id: msg.message_id,
            })
            .await
        {
            warn!(chat_id, "Failed to delete command message: {e}");
        }

        send_transient_notice(
            ctx.api.clone(),
            chat_id,
            Some(target_id),
            format!(
                "✅ Message scheduled for deletion in {}.",
                format_delay(hours)
            ),
        );

        Ok(())
    }
}

/// Human-readable rendering of an hour count.
fn format_delay(hours: f64) -> String {
    if hours >= 24.0 {
        let days = (hours / 24.0).floor() as i64;
        let remaining = hours % 24.0;
        if remaining > 0.0 {
            format!("{days} day(s) and {remaining:.1} hour(s)")
        } else {
            format!("{days} day(s)")
        }
    } else if hours >= 1.0 {
        format!("{hours:.1} hour(s)")
    } else if hours >= 1.0 / 60.0 {
        format!("{} minute(s)", (hours * 60.0) as i64)
    } else {
        format!("{} second(s)", (hours * 3600.0) as i64)
    }
}
