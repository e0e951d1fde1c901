//! Dialogue scenarios through the session map, with fake collaborators and real bot files

mod common;

use std::sync::atomic::Ordering;

use bm_session::Button;
use bm_session::Identity;
use bm_session::Keyboard;
use bm_session::Pending;
use bm_session::SessionState;
use bm_session::Sessions;
use bm_session::UpdateTarget;
use bm_store::BotFile;
use bm_store::RatioRow;
use common::Harness;
use common::Sent;
use common::USER;

fn open_session(harness: &Harness, sessions: &mut Sessions) {
    let reply = sessions.dispatch(&harness.machine(), USER, "/start").unwrap();
    assert_eq!(reply.keyboard, Keyboard::Main);
}

#[test]
fn test_unknown_identity_needs_entry_event() {
    let harness = Harness::new();
    let machine = harness.machine();
    let mut sessions = Sessions::new();

    assert!(sessions.dispatch(&machine, USER, "hello").is_none());
    assert!(sessions.is_empty());

    let reply = sessions.dispatch(&machine, USER, "/start").unwrap();
    assert_eq!(reply.messages, vec![harness.say("menu.welcome", &[])]);
    assert_eq!(sessions.len(), 1);

    let other = Identity(7);
    let reply = sessions.dispatch(&machine, other, &harness.label(Button::CheckStatus)).unwrap();
    assert_eq!(reply.messages, vec![harness.say("status.not_running", &[])]);
    assert_eq!(sessions.len(), 2);
}

#[test]
fn test_unrecognized_menu_input_reprompts() {
    let harness = Harness::new();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&harness.machine(), USER, "what?").unwrap();
    assert_eq!(reply.messages, vec![harness.say("menu.prompt", &[])]);
    assert_eq!(reply.keyboard, Keyboard::Main);
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
}

#[test]
fn test_menu_pages_switch_keyboard_only() {
    let harness = Harness::new();
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::Configurations)).unwrap();
    assert_eq!(reply.keyboard, Keyboard::Configurations);
    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::Back)).unwrap();
    assert_eq!(reply.keyboard, Keyboard::Main);
    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::Maintenance)).unwrap();
    assert_eq!(reply.keyboard, Keyboard::Maintenance);
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
}

#[test]
fn test_delete_database_cancel_keeps_file() {
    let harness = Harness::new();
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::DeleteDatabase)).unwrap();
    assert_eq!(reply.keyboard, Keyboard::Confirm);
    let session = sessions.get(USER).unwrap();
    assert_eq!(session.state(), SessionState::ConfirmDeleteDatabase);
    assert_eq!(session.pending(), Some(&Pending::DeleteDatabase));

    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::Cancel)).unwrap();
    assert_eq!(reply.messages, vec![harness.say("confirm.cancelled", &[])]);
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
    assert!(harness.files.database_exists());
}

#[test]
fn test_delete_database_confirm_keeps_backup() {
    let harness = Harness::new();
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    sessions.dispatch(&machine, USER, &harness.label(Button::DeleteDatabase)).unwrap();
    let reply = sessions.dispatch(&machine, USER, "yes please").unwrap();
    assert_eq!(reply.messages, vec![harness.say("confirm.prompt", &[])]);
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::ConfirmDeleteDatabase);

    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::Confirm)).unwrap();
    let path = harness.files.database_path();
    let backup = harness.dir.path().join("data/crypto_trading.db.backup");
    let params = [("path", path.display().to_string()), ("backup", backup.display().to_string())];
    assert_eq!(reply.messages, vec![harness.say("database.deleted", &params)]);
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
    assert!(!harness.files.database_exists());
    assert!(harness.dir.path().join("data/crypto_trading.db.backup").is_file());
}

#[test]
fn test_delete_database_refused_while_running() {
    let harness = Harness::new();
    harness.process.running.store(true, Ordering::SeqCst);
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&harness.machine(), USER, &harness.label(Button::DeleteDatabase)).unwrap();
    assert_eq!(reply.messages, vec![harness.say("database.refused_running", &[])]);
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
    assert!(harness.files.database_exists());
}

#[test]
fn test_export_missing_database_is_not_found() {
    let harness = Harness::new();
    std::fs::remove_file(harness.files.database_path()).unwrap();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&harness.machine(), USER, &harness.label(Button::ExportDatabase)).unwrap();
    let path = harness.files.database_path().display().to_string();
    assert_eq!(reply.messages, vec![harness.say("error.not_found", &[("path", path)])]);
    assert!(reply.document.is_none());
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
}

#[test]
fn test_export_attaches_database() {
    let harness = Harness::new();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&harness.machine(), USER, &harness.label(Button::ExportDatabase)).unwrap();
    assert_eq!(reply.document.unwrap().path, harness.files.database_path());
}

#[test]
fn test_edit_stop_leaves_file_untouched() {
    let harness = Harness::new();
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::EditCoinList)).unwrap();
    assert_eq!(reply.keyboard, Keyboard::Cancel);
    assert!(reply.messages.concat().contains("ADA\nETH"));
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::EditCoinList);
    assert_eq!(sessions.get(USER).unwrap().pending(), Some(&Pending::EditFile(BotFile::CoinList)));

    sessions.dispatch(&machine, USER, "/stop").unwrap();
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
    assert_eq!(harness.files.read(BotFile::CoinList).unwrap(), "ADA\nETH\n");
}

#[test]
fn test_edit_saves_with_backup() {
    let harness = Harness::new();
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    sessions.dispatch(&machine, USER, &harness.label(Button::EditCoinList)).unwrap();
    let reply = sessions.dispatch(&machine, USER, "BTC\nXRP").unwrap();

    assert_eq!(reply.keyboard, Keyboard::Main);
    assert_eq!(reply.messages.len(), 1);
    assert!(reply.messages[0].starts_with(&harness.say("edit.saved", &[("file", harness.lookup("file.coin_list"))])));
    assert_eq!(harness.files.read(BotFile::CoinList).unwrap(), "BTC\nXRP\n");
    assert_eq!(std::fs::read_to_string(harness.dir.path().join("supported_coin_list.backup")).unwrap(), "ADA\nETH\n");
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
}

#[test]
fn test_edit_user_config_saves_with_backup() {
    let harness = Harness::new();
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    sessions.dispatch(&machine, USER, &harness.label(Button::EditUserConfig)).unwrap();
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::EditUserConfig);
    assert_eq!(sessions.get(USER).unwrap().pending(), Some(&Pending::EditFile(BotFile::UserConfig)));

    let reply = sessions.dispatch(&machine, USER, "[binance_user_config]\nbridge=BUSD\n").unwrap();
    assert!(reply.messages[0].starts_with(&harness.say("edit.saved", &[("file", harness.lookup("file.user_config"))])));
    assert_eq!(harness.files.read(BotFile::UserConfig).unwrap(), "[binance_user_config]\nbridge=BUSD\n");
    assert_eq!(
        std::fs::read_to_string(harness.dir.path().join("user.cfg.backup")).unwrap(),
        "[binance_user_config]\nbridge=USDT\nscout_multiplier=5\n"
    );
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
}

#[test]
fn test_edit_missing_file_stays_at_menu() {
    let harness = Harness::new();
    std::fs::remove_file(harness.files.path(BotFile::UserConfig)).unwrap();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&harness.machine(), USER, &harness.label(Button::EditUserConfig)).unwrap();
    let path = harness.files.path(BotFile::UserConfig).display().to_string();
    assert_eq!(reply.messages, vec![harness.say("error.not_found", &[("path", path)])]);
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
}

#[test]
fn test_handler_error_reports_and_returns_to_menu() {
    let harness = Harness::new();
    harness.data.broken.store(true, Ordering::SeqCst);
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&harness.machine(), USER, &harness.label(Button::CurrentValue)).unwrap();
    assert_eq!(reply.keyboard, Keyboard::Main);
    assert!(reply.messages[0].contains("unexpected schema"));
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
}

#[test]
fn test_failed_update_returns_to_menu() {
    let harness = Harness::new();
    harness.updater.available.lock().insert(UpdateTarget::TradeBot, 3);
    harness.updater.fail_apply.store(true, Ordering::SeqCst);
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    sessions.dispatch(&machine, USER, &harness.label(Button::UpdateTradeBot)).unwrap();
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::ConfirmUpdateExternalBot);

    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::Confirm)).unwrap();
    assert!(reply.messages[0].contains("merge conflict"));
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
}

#[test]
fn test_update_up_to_date_stays_at_menu() {
    let harness = Harness::new();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&harness.machine(), USER, &harness.label(Button::UpdateManager)).unwrap();
    assert_eq!(reply.messages, vec![harness.say("update.up_to_date", &[("target", harness.lookup("target.manager"))])]);
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
}

#[test]
fn test_update_manager_confirm_applies() {
    let harness = Harness::new();
    harness.updater.available.lock().insert(UpdateTarget::Manager, 2);
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::UpdateManager)).unwrap();
    assert_eq!(reply.keyboard, Keyboard::Confirm);
    assert_eq!(sessions.get(USER).unwrap().pending(), Some(&Pending::Update { target: UpdateTarget::Manager, commits: 2 }));

    sessions.dispatch(&machine, USER, &harness.label(Button::Confirm)).unwrap();
    assert_eq!(*harness.updater.applied.lock(), vec![UpdateTarget::Manager]);
    assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
}

#[test]
fn test_update_cancel_applies_nothing() {
    let harness = Harness::new();
    harness.updater.available.lock().insert(UpdateTarget::Manager, 2);
    harness.updater.available.lock().insert(UpdateTarget::TradeBot, 4);
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    for (button, state) in [(Button::UpdateManager, SessionState::ConfirmUpdateSelf), (Button::UpdateTradeBot, SessionState::ConfirmUpdateExternalBot)] {
        sessions.dispatch(&machine, USER, &harness.label(button)).unwrap();
        assert_eq!(sessions.get(USER).unwrap().state(), state);

        let reply = sessions.dispatch(&machine, USER, &harness.label(Button::Cancel)).unwrap();
        assert_eq!(reply.messages, vec![harness.say("confirm.cancelled", &[])]);
        assert_eq!(reply.keyboard, Keyboard::Main);
        assert_eq!(sessions.get(USER).unwrap().state(), SessionState::Menu);
    }

    assert!(harness.updater.applied.lock().is_empty());
    assert_eq!(harness.process.stops.load(Ordering::SeqCst), 0);
}

#[test]
fn test_update_trade_bot_restarts_it() {
    let harness = Harness::new();
    harness.process.running.store(true, Ordering::SeqCst);
    harness.updater.available.lock().insert(UpdateTarget::TradeBot, 1);
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    sessions.dispatch(&machine, USER, &harness.label(Button::UpdateTradeBot)).unwrap();
    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::Confirm)).unwrap();
    assert_eq!(reply.messages, vec![harness.say("update.trade_bot_restarting", &[])]);
    assert_eq!(harness.process.stops.load(Ordering::SeqCst), 1);
    assert_eq!(*harness.updater.applied.lock(), vec![UpdateTarget::TradeBot]);

    let sent = harness.next_sent().unwrap();
    assert_eq!(sent.text(), harness.say("process.started", &[]));
    assert_eq!(harness.process.starts.load(Ordering::SeqCst), 1);
    assert!(harness.process.running.load(Ordering::SeqCst));
}

#[test]
fn test_start_reports_after_settle_delay() {
    let harness = Harness::new();
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::StartBot)).unwrap();
    assert_eq!(reply.messages, vec![harness.say("process.starting", &[])]);
    assert_eq!(harness.next_sent(), Some(Sent::Message { identity: USER, text: harness.say("process.started", &[]), keyboard: Keyboard::Unchanged }));

    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::StartBot)).unwrap();
    assert_eq!(reply.messages, vec![harness.say("process.already_running", &[])]);
    assert_eq!(harness.process.starts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_start_that_does_not_stick_is_reported() {
    let harness = Harness::new();
    harness.process.ignore_start.store(true, Ordering::SeqCst);
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    sessions.dispatch(&harness.machine(), USER, &harness.label(Button::StartBot)).unwrap();
    assert_eq!(harness.next_sent().unwrap().text(), harness.say("process.start_failed", &[]));
}

#[test]
fn test_stop_reports_after_settle_delay() {
    let harness = Harness::new();
    harness.process.running.store(true, Ordering::SeqCst);
    let machine = harness.machine();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::StopBot)).unwrap();
    assert_eq!(reply.messages, vec![harness.say("process.stopping", &[])]);
    assert_eq!(harness.next_sent(), Some(Sent::Message { identity: USER, text: harness.say("process.stopped", &[]), keyboard: Keyboard::Unchanged }));
    assert_eq!(harness.watch.last(), Some(false));

    let reply = sessions.dispatch(&machine, USER, &harness.label(Button::StopBot)).unwrap();
    assert_eq!(reply.messages, vec![harness.say("process.already_stopped", &[])]);
    assert_eq!(harness.process.stops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stop_that_does_not_stick_is_reported() {
    let harness = Harness::new();
    harness.process.running.store(true, Ordering::SeqCst);
    harness.process.ignore_stop.store(true, Ordering::SeqCst);
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    sessions.dispatch(&harness.machine(), USER, &harness.label(Button::StopBot)).unwrap();
    assert_eq!(harness.next_sent().unwrap().text(), harness.say("process.stop_failed", &[]));
    assert_eq!(harness.watch.last(), Some(true));
}

#[test]
fn test_ratios_use_policy_from_user_config() {
    let harness = Harness::new();
    *harness.data.coin.lock() = Some("ADA".to_string());
    *harness.data.ratios.lock() = vec![RatioRow {
        coin: "ETH".to_string(),
        target_ratio: Some(0.0002),
        current_coin_price: Some(0.5),
        other_coin_price: Some(2000.0),
        datetime: "2024-01-02 00:01:00".to_string(),
    }];
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&harness.machine(), USER, &harness.label(Button::CurrentRatios)).unwrap();
    let header = harness.say("ratios.header", &[("coin", "ADA".to_string()), ("policy", "scout_multiplier".to_string())]);
    assert!(reply.messages[0].starts_with(&header));
    assert!(reply.messages[0].contains("ETH"));
}

#[test]
fn test_ratios_without_current_coin() {
    let harness = Harness::new();
    let mut sessions = Sessions::new();
    open_session(&harness, &mut sessions);

    let reply = sessions.dispatch(&harness.machine(), USER, &harness.label(Button::NextCoin)).unwrap();
    assert_eq!(reply.messages, vec![harness.say("ratios.no_coin", &[])]);
}

#[test]
fn test_same_events_same_replies() {
    let events = ["/start", "nonsense", "⚙ Configurations", "👛 Edit coin list", "ADA", "🗑 Delete database", "❌ Cancel"];
    let run = || {
        let harness = Harness::new();
        let machine = harness.machine();
        let mut sessions = Sessions::new();
        let dir = harness.dir.path().display().to_string();
        let replies: Vec<_> = events
            .iter()
            .map(|text| sessions.dispatch(&machine, USER, text).map(|reply| (reply.messages.concat().replace(&dir, "<dir>"), reply.keyboard)))
            .collect();
        (replies, sessions.get(USER).map(|session| session.state()))
    };

    let (first, first_state) = run();
    let (second, second_state) = run();
    assert_eq!(first, second);
    assert_eq!(first_state, second_state);
    assert_eq!(first_state, Some(SessionState::Menu));
}
