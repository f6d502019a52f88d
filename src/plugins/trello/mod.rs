//! Trello plugin - read-only view of organizations, boards and lists

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::application::errors::{BotError, CommandError, PluginError};
use crate::application::messaging::CommandSurface;
use crate::domain::entities::{Command, CommandContext, HandlerResult};
use crate::infrastructure::config::Config;
use crate::plugins::discovery::PluginDescriptor;
use crate::plugins::trait_def::{Plugin, PluginCommands, PluginResult};

pub const NAME: &str = "trello";
const VERSION: &str = "0.0.1";

/// Trello API base URL
const API_BASE: &str = "https://api.trello.com/1";

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new(NAME, TrelloPlugin::construct)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
}

impl Organization {
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardList {
    pub id: String,
    pub name: String,
}

/// Read access to the board service
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Organizations the token's member belongs to
    async fn organizations(&self) -> Result<Vec<Organization>, BotError>;

    /// Open boards of an organization
    async fn boards(&self, org_id: &str) -> Result<Vec<Board>, BotError>;

    /// Open lists of a board
    async fn open_lists(&self, board_id: &str) -> Result<Vec<CardList>, BotError>;
}

/// `BoardApi` over the Trello REST API
pub struct TrelloClient {
    client: Client,
    base_url: String,
    api_key: String,
    token: String,
}

impl TrelloClient {
    pub fn new(api_key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: API_BASE.to_string(),
            api_key: api_key.into(),
            token: token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, filter: Option<&str>) -> Result<T, BotError> {
        let mut query = vec![("key", self.api_key.as_str()), ("token", self.token.as_str())];
        if let Some(filter) = filter {
            query.push(("filter", filter));
        }

        let response = self.client
            .get(self.api_url(path))
            .query(&query)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BotError::Network(format!("Trello API error: {}", response.status())));
        }

        response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))
    }
}

#[async_trait]
impl BoardApi for TrelloClient {
    async fn organizations(&self) -> Result<Vec<Organization>, BotError> {
        tracing::info!("Getting organizations");
        self.get_json("members/me/organizations", None).await
    }

    async fn boards(&self, org_id: &str) -> Result<Vec<Board>, BotError> {
        tracing::info!("Getting boards");
        self.get_json(&format!("organizations/{}/boards", org_id), Some("open")).await
    }

    async fn open_lists(&self, board_id: &str) -> Result<Vec<CardList>, BotError> {
        self.get_json(&format!("boards/{}/lists", board_id), Some("open")).await
    }
}

struct Browser {
    api: Arc<dyn BoardApi>,
    admins: Vec<String>,
    default_organization: Option<String>,
}

fn upstream(e: BotError) -> CommandError {
    CommandError::ExecutionFailed(e.to_string())
}

fn bullet_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let lines: Vec<String> = items.map(|name| format!("- {}", name)).collect();
    if lines.is_empty() {
        "Nothing to list".to_string()
    } else {
        lines.join("\n")
    }
}

impl Browser {
    /// The only organization, or the configured default when there are several
    fn current<'a>(&self, orgs: &'a [Organization]) -> Option<&'a Organization> {
        if orgs.len() == 1 {
            return orgs.first();
        }
        let wanted = self.default_organization.as_deref()?;
        orgs.iter().find(|o| o.name == wanted || o.display_name == wanted)
    }

    async fn list(&self, ctx: CommandContext) -> HandlerResult {
        let allowed = ctx.sender().map(|u| u.is_listed_in(&self.admins)).unwrap_or(false);
        if !allowed {
            return Ok(Some("You must be a Trello admin to browse boards".to_string()));
        }

        let orgs = self.api.organizations().await.map_err(upstream)?;
        let current = self.current(&orgs);

        let target = ctx.args.join(" ");
        if target.is_empty() || target == "orgs" {
            let lines: Vec<String> = orgs
                .iter()
                .map(|org| {
                    let selected = current.map(|c| c.id == org.id).unwrap_or(false);
                    if selected {
                        format!("- *{}*", org.label())
                    } else {
                        format!("- {}", org.label())
                    }
                })
                .collect();
            return Ok(Some(format!(
                "{}\n\nYou can specify either one of: `orgs`, or `boards`",
                lines.join("\n")
            )));
        }

        let Some(org) = current else {
            return Ok(Some("No default organization configured".to_string()));
        };
        let boards = self.api.boards(&org.id).await.map_err(upstream)?;

        if target == "boards" {
            return Ok(Some(bullet_list(boards.iter().map(|b| b.name.as_str()))));
        }

        match boards.iter().find(|b| b.name == target) {
            Some(board) => {
                let lists = self.api.open_lists(&board.id).await.map_err(upstream)?;
                Ok(Some(bullet_list(lists.iter().map(|l| l.name.as_str()))))
            }
            None => Ok(Some(format!("Unknown board {}", target))),
        }
    }
}

pub struct TrelloPlugin {
    commands: PluginCommands,
}

impl TrelloPlugin {
    /// Needs an API key and token; fails to initialize without them
    pub fn construct(surface: &CommandSurface, config: &Config) -> PluginResult<Box<dyn Plugin>> {
        let settings = &config.plugins.trello;
        let api_key = settings.api_key.as_deref().filter(|k| !k.is_empty())
            .ok_or_else(|| PluginError::initialization(NAME, "TRELLO_API_KEY is not set"))?;
        let token = settings.api_token.as_deref().filter(|t| !t.is_empty())
            .ok_or_else(|| PluginError::initialization(NAME, "TRELLO_API_TOKEN is not set"))?;

        let api = Arc::new(TrelloClient::new(api_key, token));
        Self::with_api(surface, api, settings.admins.clone(), settings.default_organization.clone())
    }

    pub fn with_api(
        surface: &CommandSurface,
        api: Arc<dyn BoardApi>,
        admins: Vec<String>,
        default_organization: Option<String>,
    ) -> PluginResult<Box<dyn Plugin>> {
        let browser = Arc::new(Browser { api, admins, default_organization });
        let mut commands = PluginCommands::new(NAME);

        commands.register(
            surface,
            Command::new("list")
                .with_description("List objects visible to me.")
                .with_usage("/list [orgs|boards|board name]")
                .with_handler(move |ctx| {
                    let browser = browser.clone();
                    async move { browser.list(ctx).await }
                }),
        )?;

        Ok(Box::new(Self { commands }))
    }
}

impl Plugin for TrelloPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn feature_description(&self) -> Option<&str> {
        Some("I can manage Trello boards for you")
    }

    fn commands(&self) -> &PluginCommands {
        &self.commands
    }
}
