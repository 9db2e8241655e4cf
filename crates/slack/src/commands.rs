use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{info, warn};

use birkbot_core::assessment::AssessmentProvider;
use birkbot_core::domain::profile::{BirkmanId, Profile};
use birkbot_core::errors::ProviderError;
use birkbot_db::repositories::{ProfileRepository, RepositoryError};

use crate::links::ImageLinks;
use crate::message::{Attachment, Field, NotificationMessage};
use crate::notifier::Notifier;

/// Query or form fields Slack sends to the slash command callback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlashCommandInvocation {
    pub token: Option<String>,
    pub text: String,
    pub user_name: String,
    pub response_url: String,
    pub correlation_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommand {
    pub verb: String,
    pub args: Vec<String>,
}

/// Splits slash command text into a verb and its arguments.
///
/// Whitespace runs collapse, empty tokens are dropped and `@` is trimmed from
/// both ends of every argument. Never fails; blank text yields an empty verb.
pub fn parse_slash_command(text: &str) -> SlashCommand {
    let mut tokens = text.split_whitespace();
    let verb = tokens.next().unwrap_or_default().to_owned();
    let args = tokens
        .map(|token| token.trim_matches('@'))
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect();

    SlashCommand { verb, args }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileLookup {
    SlackUsername(String),
    BirkmanId(BirkmanId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileNotFound {
    pub side: Option<Side>,
    pub lookup: ProfileLookup,
}

impl fmt::Display for ProfileNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no Birkman profile found for ")?;
        match self.side {
            Some(side) => write!(f, "user {side} ({})", self.lookup),
            None => write!(f, "{}", self.lookup),
        }
    }
}

impl fmt::Display for ProfileLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlackUsername(username) => write!(f, "@{username}"),
            Self::BirkmanId(birkman_id) => write!(f, "birkman id {birkman_id}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("`{verb}` expected {expected} arguments, got {actual}")]
    ArgumentCount { verb: String, expected: &'static str, actual: usize },
    #[error("{0}")]
    ProfileNotFound(ProfileNotFound),
    #[error("unknown command `{0}`, try `grid` or `compare`")]
    UnknownCommand(String),
    #[error("profile store failed: {0}")]
    Store(#[from] RepositoryError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Error)]
pub enum SlashCommandError {
    #[error("token does not match the configured slack command token")]
    Authentication,
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Resolves profiles and builds the Slack message for a parsed command.
///
/// Nothing is sent from here; callers notify only after `dispatch` succeeds.
#[derive(Clone)]
pub struct CommandDispatcher {
    profiles: Arc<dyn ProfileRepository>,
    provider: Arc<dyn AssessmentProvider>,
}

impl CommandDispatcher {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        provider: Arc<dyn AssessmentProvider>,
    ) -> Self {
        Self { profiles, provider }
    }

    pub async fn dispatch(
        &self,
        command: &SlashCommand,
        invoking_username: &str,
        links: &ImageLinks,
    ) -> Result<NotificationMessage, CommandError> {
        match command.verb.as_str() {
            "grid" => {
                let username = match command.args.as_slice() {
                    [] => invoking_username,
                    [user] => user.as_str(),
                    args => return Err(argument_count("grid", "0 or 1", args.len())),
                };
                self.grid_message(username, links).await
            }
            "compare" => {
                let (user_a, user_b) = match command.args.as_slice() {
                    [user_b] => (invoking_username, user_b.as_str()),
                    [user_a, user_b] => (user_a.as_str(), user_b.as_str()),
                    args => return Err(argument_count("compare", "1 or 2", args.len())),
                };
                self.compare_message(user_a, user_b, links).await
            }
            verb => Err(CommandError::UnknownCommand(verb.to_owned())),
        }
    }

    /// PNG for `/grid`, rendered from the stored payload.
    pub async fn grid_image(&self, birkman_id: &BirkmanId) -> Result<Vec<u8>, CommandError> {
        let profile = self.profile_by_id(birkman_id, None).await?;
        Ok(self.provider.render_grid(&profile.payload)?)
    }

    /// PNG for `/alastairs-comparative-graph`, as returned by the provider.
    pub async fn comparative_graph(
        &self,
        user_a: &BirkmanId,
        user_b: &BirkmanId,
    ) -> Result<Vec<u8>, CommandError> {
        let profile_a = self.profile_by_id(user_a, Some(Side::A)).await?;
        let profile_b = self.profile_by_id(user_b, Some(Side::B)).await?;
        let report =
            self.provider.comparative_report(&profile_a.payload, &profile_b.payload).await?;
        Ok(report.graph_png)
    }

    async fn grid_message(
        &self,
        username: &str,
        links: &ImageLinks,
    ) -> Result<NotificationMessage, CommandError> {
        let profile = self.profile_by_username(username, None).await?;
        // Slack fetches the image later; a payload without scores fails now instead.
        if profile.payload.grid_scores().is_none() {
            return Err(ProviderError::MissingGridData.into());
        }

        Ok(NotificationMessage::new().attachment(
            Attachment::new()
                .title(format!("Birkman Grid for {}", profile.display_name()))
                .fallback("Birkman Grid image")
                .image_url(links.grid(&profile.birkman_id)),
        ))
    }

    async fn compare_message(
        &self,
        user_a: &str,
        user_b: &str,
        links: &ImageLinks,
    ) -> Result<NotificationMessage, CommandError> {
        let profile_a = self.profile_by_username(user_a, Some(Side::A)).await?;
        let profile_b = self.profile_by_username(user_b, Some(Side::B)).await?;
        let report =
            self.provider.comparative_report(&profile_a.payload, &profile_b.payload).await?;

        let summary = Attachment::new()
            .title(format!(
                "Your Usual Their Need: Components of Interest when {} is talking to {}",
                profile_a.display_name(),
                profile_b.display_name()
            ))
            .fallback("Graph of your usual vs their needs")
            .image_url(links.comparative_graph(&profile_a.birkman_id, &profile_b.birkman_id));

        let message = report.critical_components.iter().fold(
            NotificationMessage::new().attachment(summary),
            |message, component| {
                message.attachment(
                    Attachment::new()
                        .pretext(self.provider.component_label(&component.component))
                        .field(Field::short("Difference", component.diff.to_string()))
                        .field(Field::long(
                            format!("Your Usual ({})", component.your_usual),
                            component.your_usual_explanation.clone(),
                        ))
                        .field(Field::long(
                            format!("Their Need ({})", component.their_need),
                            component.their_need_explanation.clone(),
                        )),
                )
            },
        );

        Ok(message)
    }

    async fn profile_by_username(
        &self,
        username: &str,
        side: Option<Side>,
    ) -> Result<Profile, CommandError> {
        self.profiles.find_by_slack_username(username).await?.ok_or_else(|| {
            CommandError::ProfileNotFound(ProfileNotFound {
                side,
                lookup: ProfileLookup::SlackUsername(username.to_owned()),
            })
        })
    }

    async fn profile_by_id(
        &self,
        birkman_id: &BirkmanId,
        side: Option<Side>,
    ) -> Result<Profile, CommandError> {
        self.profiles.find_by_birkman_id(birkman_id).await?.ok_or_else(|| {
            CommandError::ProfileNotFound(ProfileNotFound {
                side,
                lookup: ProfileLookup::BirkmanId(birkman_id.clone()),
            })
        })
    }
}

fn argument_count(verb: &str, expected: &'static str, actual: usize) -> CommandError {
    CommandError::ArgumentCount { verb: verb.to_owned(), expected, actual }
}

/// Full slash command flow: token check, parse, dispatch, then notify.
pub struct SlashCommandHandler {
    command_token: SecretString,
    dispatcher: CommandDispatcher,
    notifier: Arc<dyn Notifier>,
}

impl SlashCommandHandler {
    pub fn new(
        command_token: SecretString,
        dispatcher: CommandDispatcher,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { command_token, dispatcher, notifier }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub async fn handle(
        &self,
        invocation: &SlashCommandInvocation,
        links: &ImageLinks,
    ) -> Result<(), SlashCommandError> {
        if !self.token_matches(invocation.token.as_deref()) {
            warn!(
                event_name = "slack.command.unauthorized",
                correlation_id = %invocation.correlation_id,
                "slash command token rejected"
            );
            return Err(SlashCommandError::Authentication);
        }

        let command = parse_slash_command(&invocation.text);
        info!(
            event_name = "slack.command.received",
            correlation_id = %invocation.correlation_id,
            verb = %command.verb,
            args = command.args.len(),
            user_name = %invocation.user_name,
            "slash command received"
        );

        let message = self.dispatcher.dispatch(&command, &invocation.user_name, links).await?;
        self.notifier.notify(&invocation.response_url, &message).await;

        info!(
            event_name = "slack.command.completed",
            correlation_id = %invocation.correlation_id,
            verb = %command.verb,
            attachments = message.attachments.len(),
            "slash command completed"
        );
        Ok(())
    }

    fn token_matches(&self, presented: Option<&str>) -> bool {
        let expected = self.command_token.expose_secret();
        match presented {
            Some(token) => !expected.is_empty() && token == expected,
            None => false,
        }
    }
}
