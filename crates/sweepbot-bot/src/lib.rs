//! Command dispatch for the sweepbot Telegram bot.
//!
//! The polling loop feeds raw messages into [`run_dispatch`], which gates
//! them through the permission check and routes bot commands to the
//! matching [`commands::Command`] implementation.

pub mod commands;
pub mod permissions;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use sweepbot_config::BotConfig;
use sweepbot_expiry::delay::DelayPolicy;
use sweepbot_expiry::store::ExpiryStore;
use sweepbot_telegram::api::TelegramApi;
use sweepbot_telegram::types::{DeleteMessageParams, SendMessageParams, TgMessage};

use commands::Command;

/// Shared state handed to every command.
///
/// Explicitly constructed and passed around instead of living in process
/// globals, so tests can swap in alternate policies.
pub struct BotContext {
    pub api: Arc<TelegramApi>,
    pub store: Arc<ExpiryStore>,
    pub config: Arc<BotConfig>,
    pub delay: DelayPolicy,
}

/// Receive messages from the polling loop and run matching commands.
///
/// Runs until `cancel` fires or the channel closes. Command failures are
/// logged and reported to the user; they never stop the loop.
pub async fn run_dispatch(
    ctx: Arc<BotContext>,
    registry: HashMap<String, Arc<dyn Command>>,
    mut rx: mpsc::Receiver<TgMessage>,
    cancel: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        let Some(name) = msg.command() else {
            continue;
        };
        let Some(command) = registry.get(name) else {
            debug!(command = name, chat_id = msg.chat.id, "Unknown command ignored");
            continue;
        };

        if !permissions::check(&ctx, &msg).await {
            continue;
        }

        if let Err(e) = command.handle(&ctx, &msg).await {
            error!(command = name, chat_id = msg.chat.id, "Command failed: {e}");
            send_transient_notice(
                ctx.api.clone(),
                msg.chat.id,
                Some(msg.message_id),
                "❗ Something went wrong, please try again.".into(),
            );
        }
    }
}

/// Send a notice that deletes itself after 10 seconds.
///
/// Fire-and-forget: the caller must not wait out the cleanup delay.
pub(crate) fn send_transient_notice(
    api: Arc<TelegramApi>,
    chat_id: i64,
    reply_to_message_id: Option<i64>,
    text: String,
) {
    tokio::spawn(async move {
        let sent = api
            .send_message(&SendMessageParams {
                chat_id,
                text,
                parse_mode: None,
                reply_to_message_id,
            })
            .await;

        match sent {
            Ok(notice) => {
                tokio::time::sleep(Duration::from_secs(10)).await;
                if let Err(e) = api
                    .delete_message(&DeleteMessageParams {
                        chat_id,
                        message_id: notice.message_id,
                    })
                    .await
                {
                    debug!(chat_id, "Failed to delete notice: {e}");
                }
            }
            Err(e) => warn!(chat_id, "Failed to send notice: {e}"),
        }
    });
}
