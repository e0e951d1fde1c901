use std::sync::Arc;

use bm_render::RenderError;
use bm_store::BotFile;
use bm_store::StoreError;
use bm_store::UserConfig;

use crate::START_COMMAND;
use crate::STOP_COMMAND;
use crate::button::Button;
use crate::ratio::RatioLine;
use crate::ratio::RatioPolicy;
use crate::reply::Document;
use crate::reply::Keyboard;
use crate::reply::Reply;
use crate::services::Services;
use crate::services::UpdateStatus;
use crate::services::UpdateTarget;
use crate::services::display_path;
use crate::state::Identity;
use crate::state::Pending;
use crate::state::Session;
use crate::state::SessionState;
use crate::tasks::PRIORITY_USER;
use crate::tasks::ProcessWatch;
use crate::views;

/// Interprets one event at a time against the session's current step.
///
/// Handlers perform their side effect first, render the outcome, and only then move the session.
/// Any error ends the dialogue: the user gets an error message and the session is back at the menu.
pub struct StateMachine {
    services: Services,
    watch: Arc<ProcessWatch>,
}

impl StateMachine {
    pub fn new(services: Services, watch: Arc<ProcessWatch>) -> Self {
        Self { services, watch }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Whether `text` may open a session for an unknown identity
    pub fn is_entry(&self, text: &str) -> bool {
        text.trim() == START_COMMAND || Button::parse(text, &Button::MENU, &*self.services.strings).is_some()
    }

    pub fn handle(&self, session: &mut Session, text: &str) -> Reply {
        let result = match session.state() {
            SessionState::Menu => self.on_menu(session, text),
            SessionState::EditCoinList | SessionState::EditUserConfig => self.on_edit(session, text),
            SessionState::ConfirmDeleteDatabase => self.on_confirm_delete(session, text),
            SessionState::ConfirmUpdateSelf | SessionState::ConfirmUpdateExternalBot => self.on_confirm_update(session, text),
        };
        result.unwrap_or_else(|err| self.failure(session, err))
    }

    fn on_menu(&self, session: &mut Session, text: &str) -> anyhow::Result<Reply> {
        if text.trim() == START_COMMAND {
            return Ok(self.say("menu.welcome", &[], Keyboard::Main));
        }
        let Some(button) = Button::parse(text, &Button::MENU, &*self.services.strings) else {
            return Ok(self.say("menu.prompt", &[], Keyboard::Main));
        };
        tracing::info!(identity = %session.identity(), ?button, "Menu action");

        let settings = &self.services.settings;
        match button {
            Button::CurrentValue => self.show(views::current_value(&*self.services.strings, &self.services.data.balances()?)?),
            Button::Progress => self.show(views::progress(&*self.services.strings, &self.services.data.progress(settings.history_limit)?)?),
            Button::CurrentRatios => match self.ratio_lines()? {
                Some((coin, policy, lines)) => self.show(views::ratios(&*self.services.strings, &coin, &policy, &lines)?),
                None => Ok(self.say("ratios.no_coin", &[], Keyboard::Unchanged)),
            },
            Button::NextCoin => match self.ratio_lines()? {
                Some((coin, _, lines)) => self.show(views::next_coin(&*self.services.strings, &coin, &lines)?),
                None => Ok(self.say("ratios.no_coin", &[], Keyboard::Unchanged)),
            },
            Button::TradeHistory => {
                self.show(views::trade_history(&*self.services.strings, &self.services.data.trade_history(settings.history_limit)?)?)
            }
            Button::CheckStatus => {
                let running = self.services.process.is_running();
                self.watch.observe(running);
                Ok(self.say(if running { "status.running" } else { "status.not_running" }, &[], Keyboard::Unchanged))
            }
            Button::StartBot => self.start_bot(session.identity()),
            Button::StopBot => self.stop_bot(session.identity()),
            Button::Configurations => Ok(self.say("menu.configurations", &[], Keyboard::Configurations)),
            Button::Maintenance => Ok(self.say("menu.maintenance", &[], Keyboard::Maintenance)),
            Button::Back => Ok(self.say("menu.prompt", &[], Keyboard::Main)),
            Button::EditUserConfig => self.begin_edit(session, BotFile::UserConfig),
            Button::EditCoinList => self.begin_edit(session, BotFile::CoinList),
            Button::ExportDatabase => self.export_database(),
            Button::DeleteDatabase => self.begin_delete(session),
            Button::UpdateManager => self.begin_update(session, UpdateTarget::Manager),
            Button::UpdateTradeBot => self.begin_update(session, UpdateTarget::TradeBot),
            Button::Confirm | Button::Cancel => Ok(self.say("menu.prompt", &[], Keyboard::Main)),
        }
    }

    fn on_edit(&self, session: &mut Session, text: &str) -> anyhow::Result<Reply> {
        let Some(Pending::EditFile(file)) = session.pending().cloned() else {
            session.reset();
            return Ok(self.say("menu.prompt", &[], Keyboard::Main));
        };
        let name = self.services.file_name(file);

        if text.trim() == STOP_COMMAND || Button::parse(text, &[Button::Cancel], &*self.services.strings).is_some() {
            session.reset();
            return Ok(self.say("edit.cancelled", &[("file", name)], Keyboard::Main));
        }
        if text.trim().is_empty() {
            return Ok(self.say("edit.prompt", &[("file", name), ("stop", STOP_COMMAND.to_string())], Keyboard::Cancel));
        }

        let backup = self.services.files.replace(file, text)?;
        tracing::info!(identity = %session.identity(), ?file, "File replaced");

        let mut fragments = vec![views::text(&*self.services.strings, "edit.saved", &[("file", name)])];
        if let Some(backup) = backup {
            fragments.push(views::text(&*self.services.strings, "edit.backup", &[("path", display_path(&backup))]));
        }
        if self.services.process.is_running() {
            fragments.push(views::text(&*self.services.strings, "edit.restart_hint", &[]));
        }
        let reply = Reply::from_fragments(&fragments, Keyboard::Main, None)?;
        session.reset();
        Ok(reply)
    }

    fn on_confirm_delete(&self, session: &mut Session, text: &str) -> anyhow::Result<Reply> {
        match Button::parse(text, &Button::CONFIRM, &*self.services.strings) {
            None => Ok(self.say("confirm.prompt", &[], Keyboard::Confirm)),
            Some(Button::Confirm) => {
                let Some(Pending::DeleteDatabase) = session.pending() else {
                    session.reset();
                    return Ok(self.say("menu.prompt", &[], Keyboard::Main));
                };
                if self.services.process.is_running() {
                    session.reset();
                    return Ok(self.say("database.refused_running", &[], Keyboard::Main));
                }
                let path = self.services.files.database_path();
                let backup = self.services.files.delete_database()?;
                tracing::warn!(identity = %session.identity(), path = %path.display(), "Database deleted");
                session.reset();
                Ok(self.say("database.deleted", &[("path", display_path(&path)), ("backup", display_path(&backup))], Keyboard::Main))
            }
            Some(_) => {
                session.reset();
                Ok(self.say("confirm.cancelled", &[], Keyboard::Main))
            }
        }
    }

    fn on_confirm_update(&self, session: &mut Session, text: &str) -> anyhow::Result<Reply> {
        match Button::parse(text, &Button::CONFIRM, &*self.services.strings) {
            None => Ok(self.say("confirm.prompt", &[], Keyboard::Confirm)),
            Some(Button::Confirm) => {
                let target = match session.pending() {
                    Some(Pending::Update { target, .. }) => *target,
                    _ if session.state() == SessionState::ConfirmUpdateSelf => UpdateTarget::Manager,
                    _ => UpdateTarget::TradeBot,
                };
                let reply = match target {
                    UpdateTarget::Manager => self.update_manager()?,
                    UpdateTarget::TradeBot => self.update_trade_bot(session.identity())?,
                };
                session.reset();
                Ok(reply)
            }
            Some(_) => {
                session.reset();
                Ok(self.say("confirm.cancelled", &[], Keyboard::Main))
            }
        }
    }

    fn start_bot(&self, identity: Identity) -> anyhow::Result<Reply> {
        if self.services.process.is_running() {
            return Ok(self.say("process.already_running", &[], Keyboard::Unchanged));
        }
        self.services.process.start()?;
        schedule_settle_check(&self.services, &self.watch, identity, true);
        Ok(self.say("process.starting", &[], Keyboard::Unchanged))
    }

    fn stop_bot(&self, identity: Identity) -> anyhow::Result<Reply> {
        if !self.services.process.is_running() {
            return Ok(self.say("process.already_stopped", &[], Keyboard::Unchanged));
        }
        self.services.process.stop()?;
        schedule_settle_check(&self.services, &self.watch, identity, false);
        Ok(self.say("process.stopping", &[], Keyboard::Unchanged))
    }

    fn begin_edit(&self, session: &mut Session, file: BotFile) -> anyhow::Result<Reply> {
        let contents = self.services.files.read(file)?;
        let name = self.services.file_name(file);

        let mut fragments = views::file_contents(&*self.services.strings, &name, &contents);
        fragments.push(views::text(&*self.services.strings, "edit.prompt", &[("file", name), ("stop", STOP_COMMAND.to_string())]));
        let reply = Reply::from_fragments(&fragments, Keyboard::Cancel, None)?;

        let state = match file {
            BotFile::UserConfig => SessionState::EditUserConfig,
            BotFile::CoinList => SessionState::EditCoinList,
        };
        session.transition(state, Some(Pending::EditFile(file)));
        Ok(reply)
    }

    fn export_database(&self) -> anyhow::Result<Reply> {
        let path = self.services.files.database_path();
        if !self.services.files.database_exists() {
            return Err(StoreError::Missing(path).into());
        }
        let caption = self.services.strings.lookup("database.export_caption", &[]);
        let mut reply = self.say("database.export", &[], Keyboard::Unchanged);
        reply.document = Some(Document { path, caption });
        Ok(reply)
    }

    fn begin_delete(&self, session: &mut Session) -> anyhow::Result<Reply> {
        if self.services.process.is_running() {
            return Ok(self.say("database.refused_running", &[], Keyboard::Unchanged));
        }
        let path = self.services.files.database_path();
        if !self.services.files.database_exists() {
            return Err(StoreError::Missing(path).into());
        }
        let reply = self.say("database.confirm_delete", &[("path", display_path(&path))], Keyboard::Confirm);
        session.transition(SessionState::ConfirmDeleteDatabase, Some(Pending::DeleteDatabase));
        Ok(reply)
    }

    fn begin_update(&self, session: &mut Session, target: UpdateTarget) -> anyhow::Result<Reply> {
        let name = self.services.target_name(target);
        match self.services.updater.check(target)? {
            UpdateStatus::UpToDate => Ok(self.say("update.up_to_date", &[("target", name)], Keyboard::Unchanged)),
            UpdateStatus::Available { commits } => {
                let reply = self.say("update.available", &[("target", name), ("commits", commits.to_string())], Keyboard::Confirm);
                let state = match target {
                    UpdateTarget::Manager => SessionState::ConfirmUpdateSelf,
                    UpdateTarget::TradeBot => SessionState::ConfirmUpdateExternalBot,
                };
                session.transition(state, Some(Pending::Update { target, commits }));
                Ok(reply)
            }
        }
    }

    fn update_manager(&self) -> anyhow::Result<Reply> {
        self.services.updater.apply(UpdateTarget::Manager)?;
        tracing::info!("Manager updated");
        Ok(self.say("update.manager_applied", &[], Keyboard::Main))
    }

    /// Stop the trading bot if it runs, apply the update, and bring the bot back after the settle delay
    fn update_trade_bot(&self, identity: Identity) -> anyhow::Result<Reply> {
        let was_running = self.services.process.is_running();
        if was_running {
            self.services.process.stop()?;
        }
        let applied = self.services.updater.apply(UpdateTarget::TradeBot);
        if was_running {
            self.schedule_restart(identity);
        }
        applied?;
        tracing::info!(was_running, "Trade bot updated");

        let key = if was_running { "update.trade_bot_restarting" } else { "update.trade_bot_applied" };
        Ok(self.say(key, &[], Keyboard::Main))
    }

    fn schedule_restart(&self, identity: Identity) {
        let services = self.services.clone();
        let watch = Arc::clone(&self.watch);
        self.services.scheduler.schedule("restart_trade_bot", self.services.settings.settle_delay, PRIORITY_USER, move || {
            if !services.process.is_running() {
                services.process.start()?;
            }
            schedule_settle_check(&services, &watch, identity, true);
            Ok(())
        });
    }

    /// Current coin, the policy from `user.cfg`, and every pair from the coin; `None` without a current coin
    fn ratio_lines(&self) -> anyhow::Result<Option<(String, RatioPolicy, Vec<RatioLine>)>> {
        let Some(coin) = self.services.data.current_coin()? else {
            return Ok(None);
        };
        let config = match self.services.files.read(BotFile::UserConfig) {
            Ok(contents) => UserConfig::parse(&contents)?,
            Err(err) if err.is_missing() => {
                tracing::debug!("No user.cfg, plain ratio differences");
                UserConfig::default()
            }
            Err(err) => return Err(err.into()),
        };
        let policy = RatioPolicy::select(&config, self.services.settings.trading_fee);
        let lines = policy.evaluate(&self.services.data.ratios(&coin)?);
        Ok(Some((coin, policy, lines)))
    }

    fn show(&self, fragments: Vec<String>) -> anyhow::Result<Reply> {
        Ok(Reply::from_fragments(&fragments, Keyboard::Unchanged, None)?)
    }

    fn say(&self, key: &str, params: &[(&str, String)], keyboard: Keyboard) -> Reply {
        Reply::text(views::text(&*self.services.strings, key, params), keyboard)
    }

    fn failure(&self, session: &mut Session, err: anyhow::Error) -> Reply {
        session.reset();
        if let Some(StoreError::Missing(path)) = err.downcast_ref::<StoreError>() {
            tracing::info!(identity = %session.identity(), path = %path.display(), "Requested resource missing");
            return self.say("error.not_found", &[("path", display_path(path))], Keyboard::Main);
        }
        if err.downcast_ref::<RenderError>().is_some() {
            tracing::error!(identity = %session.identity(), "Reply could not be rendered: {err:#}");
            return self.say("error.render", &[], Keyboard::Main);
        }
        tracing::error!(identity = %session.identity(), "Action failed: {err:#}");
        self.say("error.action_failed", &[("error", format!("{err:#}"))], Keyboard::Main)
    }
}

/// Re-check the process after the settle delay and tell `identity` how start/stop went
fn schedule_settle_check(services: &Services, watch: &Arc<ProcessWatch>, identity: Identity, expect_running: bool) {
    let task_services = services.clone();
    let watch = Arc::clone(watch);
    services.scheduler.schedule("settle_check", services.settings.settle_delay, PRIORITY_USER, move || {
        let running = task_services.process.is_running();
        watch.observe(running);
        let key = match (expect_running, running) {
            (true, true) => "process.started",
            (true, false) => "process.start_failed",
            (false, false) => "process.stopped",
            (false, true) => "process.stop_failed",
        };
        task_services.sender.send_message(identity, views::text(&*task_services.strings, key, &[]), Keyboard::Unchanged);
        Ok(())
    });
}
