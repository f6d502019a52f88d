//! Pomodoro plugin - one-shot alarms per chat

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::application::errors::CommandError;
use crate::application::messaging::CommandSurface;
use crate::domain::entities::{Command, CommandContext, HandlerResult};
use crate::infrastructure::config::Config;
use crate::plugins::discovery::PluginDescriptor;
use crate::plugins::trait_def::{Plugin, PluginCommands, PluginResult};

pub const NAME: &str = "pomodoro";
const VERSION: &str = "0.0.1";
const SET_USAGE: &str = "/set seconds [message...]";
const DEFAULT_ALARM: &str = "Beep!";

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new(NAME, PomodoroPlugin::construct)
}

struct Job {
    id: Uuid,
    handle: AbortHandle,
}

/// Pending alarms, at most one per chat
#[derive(Clone, Default)]
struct Timers {
    jobs: Arc<Mutex<HashMap<String, Job>>>,
}

impl Timers {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Job>>, CommandError> {
        self.jobs.lock()
            .map_err(|_| CommandError::ExecutionFailed("Lock poisoned".to_string()))
    }

    fn set(&self, ctx: CommandContext) -> HandlerResult {
        let due = match ctx.args.first().map(|s| s.parse::<i64>()) {
            Some(Ok(due)) => due,
            Some(Err(e)) => return Err(CommandError::InvalidArgs(e.to_string())),
            None => return Err(CommandError::InvalidArgs("seconds missing".to_string())),
        };
        if due < 0 {
            return Ok(Some("Sorry we can not go back to future!".to_string()));
        }

        let text = match ctx.args.get(1..) {
            Some(rest) if !rest.is_empty() => rest.join(" "),
            _ => DEFAULT_ALARM.to_string(),
        };
        let chat_id = ctx.chat_id().to_string();
        let id = Uuid::new_v4();

        // Held until the job is recorded, so a zero-second alarm cannot
        // fire and clean up before it exists.
        let mut jobs = self.lock()?;

        let bot = ctx.bot.clone();
        let own_jobs = self.jobs.clone();
        let chat = chat_id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(due as u64)).await;
            if let Err(e) = bot.send_message(&chat, &text).await {
                tracing::warn!("[{}] Failed to deliver alarm: {}", chat, e);
            }
            if let Ok(mut jobs) = own_jobs.lock() {
                if jobs.get(&chat).map(|j| j.id == id).unwrap_or(false) {
                    jobs.remove(&chat);
                }
            }
        });

        if let Some(previous) = jobs.insert(chat_id.clone(), Job { id, handle: task.abort_handle() }) {
            previous.handle.abort();
            tracing::debug!("[{}] Replaced pending alarm", chat_id);
        }

        Ok(Some("Timer successfully set!".to_string()))
    }

    fn unset(&self, ctx: CommandContext) -> HandlerResult {
        let mut jobs = self.lock()?;
        match jobs.remove(ctx.chat_id()) {
            Some(job) => {
                job.handle.abort();
                Ok(Some("Timer successfully unset!".to_string()))
            }
            None => Ok(Some("You have no active timer".to_string())),
        }
    }

    fn abort_all(&self) {
        let mut jobs = match self.jobs.lock() {
            Ok(jobs) => jobs,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (_, job) in jobs.drain() {
            job.handle.abort();
        }
    }
}

pub struct PomodoroPlugin {
    commands: PluginCommands,
    timers: Timers,
}

impl PomodoroPlugin {
    pub fn construct(surface: &CommandSurface, _config: &Config) -> PluginResult<Box<dyn Plugin>> {
        let timers = Timers::default();
        let mut commands = PluginCommands::new(NAME);

        let set_timers = timers.clone();
        commands.register(
            surface,
            Command::new("set")
                .with_description("seconds [message...] Set alarm to fire in seconds.")
                .with_usage(SET_USAGE)
                .with_handler(move |ctx| {
                    let timers = set_timers.clone();
                    async move { timers.set(ctx) }
                }),
        )?;

        let unset_timers = timers.clone();
        commands.register(
            surface,
            Command::new("unset")
                .with_description("Unset last alarm set.")
                .with_handler(move |ctx| {
                    let timers = unset_timers.clone();
                    async move { timers.unset(ctx) }
                }),
        )?;

        Ok(Box::new(Self { commands, timers }))
    }
}

impl Plugin for PomodoroPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn feature_description(&self) -> Option<&str> {
        Some("I can manage pomodoro alarms for you")
    }

    fn commands(&self) -> &PluginCommands {
        &self.commands
    }

    fn cleanup(&self) {
        self.timers.abort_all();
    }
}
