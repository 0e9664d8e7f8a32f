//! Telegram long-polling loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::TelegramApi;
use crate::types::{GetUpdatesParams, TgMessage};

/// Run the long-polling loop, forwarding incoming text messages.
///
/// Messages are pushed raw (entities and reply targets intact) so the
/// dispatcher can do its own command extraction. Exits when `cancel` is
/// cancelled or the `sender` is closed.
pub async fn run_polling_loop(
    api: &TelegramApi,
    sender: mpsc::Sender<TgMessage>,
    cancel: CancellationToken,
) {
    let mut offset: Option<i64> = None;
    let mut backoff = Duration::from_secs(1);
    let max_backoff = Duration::from_secs(30);

    info!("Telegram polling loop started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let params = GetUpdatesParams {
            offset,
            timeout: Some(30),
            allowed_updates: Some(vec!["message".into()]),
        };

        let updates = tokio::select! {
            _ = cancel.cancelled() => break,
            result = api.get_updates(&params) => result,
        };

        match updates {
            Ok(updates) => {
                backoff = Duration::from_secs(1);

                for update in updates {
                    offset = Some(update.update_id + 1);

                    let Some(msg) = update.message else {
                        continue;
                    };
                    if msg.text.is_none() {
                        continue;
                    }

                    debug!(
                        update_id = update.update_id,
                        chat_id = msg.chat.id,
                        "Forwarding Telegram message"
                    );

                    if sender.send(msg).await.is_err() {
                        info!("Dispatch channel closed, stopping polling");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(backoff_secs = backoff.as_secs(), "getUpdates error: {e}");

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {},
                }

                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }

    info!("Telegram polling loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_polling_loop_cancellation() {
        // Verify that the polling loop exits promptly when cancelled.
        // We use a fake API token so the request would fail, but the cancel should win.
        let api = TelegramApi::new("fake_token");
        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        cancel.cancel();

        // Should return immediately since cancel is already set
        tokio::time::timeout(
            Duration::from_secs(2),
            run_polling_loop(&api, tx, cancel),
        )
        .await
        .expect("polling loop should exit promptly on cancel");
    }
}
