use std::sync::Arc;
use tap_counter::{
    sync::{
        probe_loop, ClientState, CounterController, FilePendingStore, HttpRemote, LoadState,
        PendingLedger, Reconciler, SyncError, TriggerPolicy,
    },
    ui::{render_counters, Command, HELP},
    ClientConfig,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;
    let remote = Arc::new(HttpRemote::new(config.server_url.clone(), config.request_timeout)?);
    let store = FilePendingStore::open(&config.pending_path);
    info!(path = %store.path().display(), "pending store opened");
    let state = Arc::new(ClientState::new(PendingLedger::new(store)));
    let controller = CounterController::new(Arc::clone(&remote), Arc::clone(&state));
    let reconciler = Arc::new(Reconciler::new(Arc::clone(&remote), Arc::clone(&state)));

    let policy = config
        .debounce
        .map_or(TriggerPolicy::Interval, TriggerPolicy::Debounced);
    let (stop, shutdown) = watch::channel(false);
    let scheduler = tokio::spawn(Arc::clone(&reconciler).run(
        policy,
        config.sync_interval,
        shutdown.clone(),
    ));
    let prober = tokio::spawn(probe_loop(
        Arc::clone(&remote),
        Arc::clone(state.connectivity()),
        config.probe_interval,
        shutdown,
    ));

    if let Some(session) = config.session.clone() {
        show_load(controller.sign_in(session).await);
    } else {
        println!("not signed in; use `login` or `register`. {} taps pending.", state.pending());
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            Command::Tap => match controller.on_tap() {
                Ok(Some(display)) => {
                    println!("{}", render_counters(&display, state.connectivity().is_online()))
                }
                Ok(None) => println!("recorded ({} pending, sign in to sync)", state.pending()),
                Err(err) => println!("tap not saved: {err}"),
            },
            Command::Register { username, password } => {
                match remote.register(&username, &password).await {
                    Ok(session) => show_load(controller.sign_in(session).await),
                    Err(err) => println!("register failed: {err}"),
                }
            }
            Command::Login { username, password } => {
                match remote.login(&username, &password).await {
                    Ok(session) => show_load(controller.sign_in(session).await),
                    Err(SyncError::Unauthenticated) => println!("invalid credentials"),
                    Err(err) => println!("login failed: {err}"),
                }
            }
            Command::Logout => {
                if let Some(session) = controller.sign_out() {
                    if let Err(err) = remote.logout(&session).await {
                        warn!("logout request failed: {err}");
                    }
                }
                println!("signed out; {} taps kept locally", state.pending());
            }
            Command::Targets {
                daily,
                final_target,
            } => match controller.on_settings_save(daily, final_target).await {
                Ok(display) => {
                    println!("targets updated");
                    println!("{}", render_counters(&display, state.connectivity().is_online()));
                }
                Err(SyncError::Unauthenticated) => println!("sign in first"),
                Err(err) => println!("targets not saved: {err}"),
            },
            Command::Status => match state.display() {
                Some(display) => {
                    println!("{}", render_counters(&display, state.connectivity().is_online()))
                }
                None => println!("not signed in; {} taps pending", state.pending()),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    let _ = stop.send(true);
    let _ = scheduler.await;
    let _ = prober.await;

    let outcome = reconciler.attempt().await;
    info!(?outcome, pending = state.pending(), "final flush");
    Ok(())
}

fn show_load(load: LoadState) {
    match load {
        LoadState::Ready(display) => println!("{}", render_counters(&display, true)),
        LoadState::Unauthenticated => println!("session not accepted; please log in"),
        LoadState::Offline { last_known, error } => {
            println!("server unavailable ({error}); taps will be kept until it is back");
            if let Some(display) = last_known {
                println!("{}", render_counters(&display, false));
            }
        }
    }
}
