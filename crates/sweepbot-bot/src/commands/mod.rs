//! Bot command implementations.
//!
//! Each command implements [`Command`] and is dispatched by name from a
//! registry map; adding a feature means adding a struct here and listing
//! it in [`create_commands`].

pub mod del;
pub mod groupid;
pub mod start;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use sweepbot_telegram::types::TgMessage;

use crate::BotContext;

/// A chat command (e.g. `/del`), dispatched by name.
#[async_trait]
pub trait Command: Send + Sync {
    /// Command name without the leading slash.
    fn name(&self) -> &str;

    /// Short description, shown in `/start` and the command menu.
    fn description(&self) -> &str;

    /// Execute the command for an incoming message. The permission gate
    /// has already passed when this runs.
    async fn handle(&self, ctx: &BotContext, msg: &TgMessage) -> anyhow::Result<()>;
}

/// Create all commands, keyed by command name.
pub fn create_commands() -> HashMap<String, Arc<dyn Command>> {
    // Feature commands get listed in the /start greeting; the built-in
    // start/groupid commands do not list themselves.
    let feature_commands: Vec<Arc<dyn Command>> = vec![Arc::new(del::DelCommand)];

    let listing: Vec<(String, String)> = feature_commands
        .iter()
        .map(|c| (c.name().to_string(), c.description().to_string()))
        .collect();

    let mut commands = feature_commands;
    commands.push(Arc::new(start::StartCommand::new(listing)));
    commands.push(Arc::new(groupid::GroupIdCommand));

    commands
        .into_iter()
        .map(|c| (c.name().to_string(), c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_keys_match_command_names() {
        let registry = create_commands();
        assert!(registry.contains_key("del"));
        assert!(registry.contains_key("start"));
        assert!(registry.contains_key("groupid"));
        for (key, command) in &registry {
            assert_eq!(key, command.name());
            assert!(!command.description().is_empty());
        }
    }
}
