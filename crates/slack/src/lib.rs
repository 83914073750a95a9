//! Slack surface for slackroll.
//!
//! - **Slash commands** (`commands`): form payload decoding, command allow-list,
//!   turning a command into either a channel post or a private reply
//! - **Block Kit** (`blocks`): message builder for roll posts
//! - **Web API** (`client`): `chat.postMessage` and `oauth.v2.access`
//! - **Request signing** (`signature`): `X-Slack-Signature` verification
//!
//! ```text
//! POST / → signature::verify → commands::normalize_roll_command
//!        → commands::plan_roll → client::SlackApi::post_message
//! ```

pub mod blocks;
pub mod client;
pub mod commands;
pub mod signature;
