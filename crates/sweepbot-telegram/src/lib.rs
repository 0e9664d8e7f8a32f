//! Telegram Bot API transport for sweepbot.
//!
//! Long-polling only (no webhook required). The API client doubles as the
//! sweeper's deletion capability via [`MessageDeleter`].

pub mod api;
pub mod polling;
pub mod types;

use async_trait::async_trait;

use sweepbot_expiry::sweep::MessageDeleter;

use api::TelegramApi;
use types::DeleteMessageParams;

#[async_trait]
impl MessageDeleter for TelegramApi {
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> anyhow::Result<()> {
        TelegramApi::delete_message(
            self,
            &DeleteMessageParams {
                chat_id,
                message_id,
            },
        )
        .await
    }
}
