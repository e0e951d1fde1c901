use std::sync::Arc;

use anyhow::Context;
use bm_app::cli;
use bm_app::config_loader;
use bm_app::shutdown_handler::Shutdown;
use bm_app::tracing_setup;
use bm_scheduler::Scheduler;
use bm_session::InboundEvent;
use bm_session::ProcessWatch;
use bm_session::Services;
use bm_session::Settings;
use bm_session::StateMachine;
use bm_session::StringTable;
use bm_session::Strings;
use bm_session::TaskIntervals;
use bm_session::register_tasks;
use bm_session::run_router;
use bm_store::BotFiles;
use bm_tg::AuthorizedUser;
use bm_tg::Command;
use bm_tg::GitUpdater;
use bm_tg::OutboundSender;
use bm_tg::RateLimiter;
use bm_tg::ShellProcessController;
use bm_tg::handlers;
use bm_tg::run_sender;
use crossbeam_channel::unbounded;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio::sync::mpsc;
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config_path = cli::config_path(cli::DEFAULT_CONFIG_PATH);
    let loaded = config_loader::load_manager_config(&config_path);
    let config = loaded.as_ref().cloned().unwrap_or_default();

    let _guard = tracing_setup::init_with_stdout("bot_manager", &config.log_dir, Level::INFO);
    match &loaded {
        Ok(_) if config_path.is_file() => tracing::info!("Loaded manager config from {}", config_path.display()),
        Ok(_) => tracing::warn!("No manager config at {}, using defaults and environment", config_path.display()),
        Err(err) => tracing::warn!("Failed to load manager config from {}: {}. Using defaults.", config_path.display(), err),
    }

    let token = std::env::var("TELOXIDE_TOKEN").context("TELOXIDE_TOKEN is not set")?;
    let authorized = AuthorizedUser::from_env()?;
    tracing::info!("Authorized user {}", authorized.user);

    let strings: Arc<StringTable> = Arc::new(StringTable::load(config.language_file.as_deref())?);
    let bot = Bot::new(token);

    // Session/scheduler threads → bot: tokio channel drained by the sender task
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let rate_limiter = Arc::new(RateLimiter::new());
    rate_limiter.clone().start_refill_task();
    tokio::spawn(run_sender(bot.clone(), outbound_rx, rate_limiter, strings.clone()));

    let mut scheduler = Scheduler::new(config.scheduler_poll());
    let shutdown = Shutdown::new(scheduler.handle());

    let files = BotFiles::with_names(&config.bot_path, &config.user_config_file, &config.coin_list_file, &config.database_file);
    let (data, file_store) = Services::store_backed(files);
    let strings: Arc<dyn Strings> = strings;
    let services = Services {
        data,
        files: file_store,
        process: Arc::new(ShellProcessController::new(&config.bot_path, config.python_path.as_str(), config.process_pattern.as_str())),
        updater: Arc::new(GitUpdater::new(&config.manager_path, &config.bot_path)),
        strings,
        sender: Arc::new(OutboundSender::new(outbound_tx)),
        scheduler: scheduler.handle(),
        settings: Settings { settle_delay: config.settle_delay(), history_limit: config.history_limit, trading_fee: config.trading_fee },
    };

    let watch = Arc::new(ProcessWatch::new());
    let intervals =
        TaskIntervals { status_poll: config.status_poll(), snapshot: config.snapshot_interval(), update_check: config.update_check_interval() };
    register_tasks(&services, &watch, authorized.identity(), intervals);
    scheduler.start().context("starting scheduler thread")?;

    // Bot → session thread: crossbeam (sync receiver in the session thread)
    let (event_tx, event_rx) = unbounded::<InboundEvent>();
    let machine = StateMachine::new(services, watch);
    let running = shutdown.flag();
    let router =
        std::thread::Builder::new().name("sessions".to_string()).spawn(move || run_router(event_rx, machine, running)).context("starting session thread")?;

    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!("Failed to register bot commands: {err}");
    }

    tracing::info!("Starting Telegram bot dispatcher...");
    Dispatcher::builder(bot, handlers::schema(authorized, event_tx)).enable_ctrlc_handler().build().dispatch().await;

    shutdown.trigger();
    tokio::task::spawn_blocking(move || {
        match router.join() {
            Ok(sessions) => tracing::info!(sessions = sessions.len(), "Session thread stopped"),
            Err(_) => tracing::error!("Session thread panicked"),
        }
        scheduler.join();
    })
    .await?;

    tracing::info!("Bot manager stopped");
    Ok(())
}
