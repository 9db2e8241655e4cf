//! Slack integration for birkbot
//!
//! This crate turns a Slack slash-command callback into a posted message:
//! - **Commands** (`commands`) - text parsing, token check and `grid` / `compare` dispatch
//! - **Messages** (`message`) - attachment payloads posted back to Slack
//! - **Notifier** (`notifier`) - fire-and-forget POST to the command's `response_url`
//! - **Links** (`links`) - absolute image URLs embedded in attachments
//!
//! # Flow
//!
//! ```text
//! /birkman text → parse_slash_command → CommandDispatcher → NotificationMessage
//!                                             ↓                    ↓
//!                                 ProfileRepository +        Notifier (response_url)
//!                                 AssessmentProvider
//! ```
//!
//! Slack only sees the HTTP status of the callback itself. The message is
//! delivered separately through the notifier, and only once every lookup and
//! report call has succeeded.

pub mod commands;
pub mod links;
pub mod message;
pub mod notifier;

pub use commands::{
    parse_slash_command, CommandDispatcher, CommandError, ProfileLookup, ProfileNotFound, Side,
    SlashCommand, SlashCommandError, SlashCommandHandler, SlashCommandInvocation,
};
pub use links::ImageLinks;
pub use message::{Attachment, Field, NotificationMessage};
pub use notifier::{Notifier, WebhookNotifier};
