//! webhunt - a terminal client for web-hunt game servers
//!
//! Connects to a hunt front end over HTTP, long-polls the binary
//! draw-command stream into a 24×80 playfield, and forwards keystrokes as
//! game commands.
//!
//! # Quick Start
//!
//! ```text
//! webhunt                              # connect to the configured server
//! webhunt -s hunt.example.com:8080     # pick a server
//! webhunt -i 0 -n tad -j               # join instance 0 as "tad" at once
//! ```
//!
//! # Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | h j k l | Move |
//! | H J K L | Face |
//! | f g F G 1-9 0 @ | Fire and throw |
//! | o O p P | Throw slime |
//! | s / c | Scan / cloak |
//! | ctrl-j | Join form |
//! | ctrl-m | Message other players |
//! | $ | Instance statistics |
//! | ? | Help pages |
//! | - / + | Sound off / on |
//! | q | Quit game (exit when not joined) |
//!
//! Configuration: `~/.webhunt/config.toml`; log file: `~/.webhunt/webhunt.log`

mod config;
mod core;
mod fragment;
mod net;
mod ui;

use std::cell::RefCell;
use std::env;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config;
use crate::core::decoder::{Decoder, SessionEnd};
use crate::core::screen::{Screen, GRID_COLS, GRID_ROWS};
use crate::core::session::{normalize_team, ConnectKind, EnterMode, GameSession};
use crate::net::{GameClient, InstanceStats, NetError, PollLoop};
use crate::ui::{
    Form, FormKind, FormOutcome, GameCommand, HelpPager, KeyRouter, RoutedKey, TerminalUi,
    UiPresenter,
};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Batches buffered between the poll task and the decoder.
const BATCH_QUEUE: usize = 32;
/// Grace budget for the farewell quit when the client exits mid-game.
const EXIT_QUIT_TIMEOUT: Duration = Duration::from_secs(2);
/// Help page height, leaving room for headers and the status line.
const HELP_PAGE_LINES: usize = (GRID_ROWS - 5) as usize;

/// Command-line overrides for config and saved session parameters.
#[derive(Debug, Default)]
struct CliArgs {
    server: Option<String>,
    instance: Option<String>,
    name: Option<String>,
    team: Option<String>,
    enter: Option<String>,
    join: bool,
}

fn print_version() {
    eprintln!("webhunt {}", VERSION);
}

fn print_help() {
    eprintln!("webhunt {} - a terminal client for web-hunt game servers", VERSION);
    eprintln!();
    eprintln!("Usage: webhunt [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --server <URL>    Game front end (default from config.toml)");
    eprintln!("  -i, --instance <ID>   Game instance to join");
    eprintln!("  -n, --name <NAME>     Player name");
    eprintln!("  -t, --team <TEAM>     Team: none or 0-9");
    eprintln!("  -e, --enter <MODE>    Entry mode: cloak, fly, or scan");
    eprintln!("  -j, --join            Join immediately on startup");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("In-game keys:");
    eprintln!("  h j k l               Move     (H J K L to face without moving)");
    eprintln!("  f g F G, 1-9 0 @      Fire bullets, grenades, and bombs");
    eprintln!("  o O p P               Throw slime");
    eprintln!("  s / c                 Scan / cloak");
    eprintln!("  ctrl-j                Open the join form");
    eprintln!("  ctrl-m                Message other players");
    eprintln!("  $                     Show instance statistics");
    eprintln!("  ?                     Next page of help");
    eprintln!("  - / +                 Sound off / on");
    eprintln!("  q                     Quit the game; exit when not joined");
    eprintln!();
    eprintln!("Configuration: ~/.webhunt/config.toml");
    eprintln!("Session parameters persist in ~/.webhunt/session");
}

fn parse_args() -> Result<CliArgs, String> {
    let args: Vec<String> = env::args().collect();
    let mut cli = CliArgs::default();
    let mut i = 1;

    fn value(args: &[String], i: &mut usize, flag: &str) -> Result<String, String> {
        *i += 1;
        args.get(*i)
            .cloned()
            .ok_or_else(|| format!("Missing value for {}", flag))
    }

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-s" | "--server" => cli.server = Some(value(&args, &mut i, "--server")?),
            "-i" | "--instance" => cli.instance = Some(value(&args, &mut i, "--instance")?),
            "-n" | "--name" => cli.name = Some(value(&args, &mut i, "--name")?),
            "-t" | "--team" => cli.team = Some(value(&args, &mut i, "--team")?),
            "-e" | "--enter" => cli.enter = Some(value(&args, &mut i, "--enter")?),
            "-j" | "--join" => cli.join = true,
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(cli)
}

/// Log to a file; stdout belongs to the game screen.
fn init_logging() {
    let log_path = config::log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("webhunt {} starting", VERSION);

    let config = Config::load();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_client(config, cli))
}

async fn run_client(config: Config, cli: CliArgs) -> anyhow::Result<()> {
    let server = cli.server.clone().unwrap_or_else(|| config.server.clone());
    let client = GameClient::new(&server)?;
    info!("server: {}", server);

    // session parameters: CLI overrides beat the persisted ones
    let saved = config::load_session();
    let pick = |cli_val: Option<String>, key: &str, fallback: &str| {
        cli_val
            .or_else(|| saved.get(key).map(str::to_string))
            .unwrap_or_else(|| fallback.to_string())
    };
    let session = GameSession::new(
        pick(cli.instance, "instance", "0"),
        pick(cli.name, "name", ""),
        pick(cli.team, "team", "none"),
        EnterMode::parse(&pick(cli.enter, "enter", "fly")),
    );

    let ui = Rc::new(RefCell::new(TerminalUi::new(
        GRID_ROWS,
        GRID_COLS,
        config.muted,
    )));
    ui.borrow_mut().init()?;

    let result = App::new(config, client, session, ui.clone()).run(cli.join).await;

    ui.borrow_mut().cleanup();
    // belt and braces, in case cleanup was skipped on a panic path
    let _ = crossterm::terminal::disable_raw_mode();

    result
}

/// Completions of spawned requests, reported back to the control loop.
enum AppEvent {
    Joined(Result<String, NetError>),
    QuitDone(Result<(), NetError>),
    Stats(Result<String, NetError>),
    Instances(Result<Vec<InstanceStats>, NetError>),
    MessageSent(Result<(), NetError>),
}

/// A running poll loop: its stop flag and the batch stream it feeds.
struct ActivePoll {
    stop: Arc<AtomicBool>,
    batches: mpsc::Receiver<Vec<u8>>,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// The whole client state, owned by the single control task.
struct App {
    client: GameClient,
    session: GameSession,
    ui: Rc<RefCell<TerminalUi>>,
    screen: Screen,
    decoder: Decoder,
    router: KeyRouter,
    help: HelpPager,
    form: Option<Form>,
    poll: Option<ActivePoll>,
    joining: bool,
    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,
}

impl App {
    fn new(
        config: Config,
        client: GameClient,
        session: GameSession,
        ui: Rc<RefCell<TerminalUi>>,
    ) -> Self {
        let screen = Screen::new(GRID_ROWS, GRID_COLS, Box::new(UiPresenter(ui.clone())));
        let (events_tx, events_rx) = mpsc::channel(8);
        Self {
            client,
            session,
            ui,
            screen,
            decoder: Decoder::new(config.unknown_end_policy()),
            router: KeyRouter::with_default_bindings(),
            help: HelpPager::new(),
            form: None,
            poll: None,
            joining: false,
            events_tx,
            events_rx,
        }
    }

    async fn run(mut self, auto_join: bool) -> anyhow::Result<()> {
        self.screen.refresh();
        self.set_idle_status();
        self.spawn_instances();

        if auto_join {
            self.start_join();
        }

        let mut keys = EventStream::new();

        loop {
            tokio::select! {
                maybe_event = keys.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) => {
                            if self.on_key(key) == Flow::Exit {
                                break;
                            }
                        }
                        Some(Ok(_)) => {} // resize and mouse events are ignored
                        Some(Err(err)) => warn!("event stream error: {}", err),
                        None => break,
                    }
                }
                batch = next_batch(&mut self.poll), if self.poll.is_some() => {
                    match batch {
                        Some(data) => {
                            if let Some(end) = self.decoder.apply_batch(&mut self.screen, &data) {
                                self.on_session_end(end);
                            }
                        }
                        None => self.poll = None,
                    }
                }
                Some(event) = self.events_rx.recv() => self.on_app_event(event),
            }
        }

        // leave the game if we are still in it
        if let Some(player_id) = self.session.player_id.take() {
            let _ = tokio::time::timeout(
                EXIT_QUIT_TIMEOUT,
                self.client.quit(&self.session.instance, &player_id),
            )
            .await;
        }

        Ok(())
    }

    fn on_key(&mut self, key: KeyEvent) -> Flow {
        // ctrl-c always exits the client, form or not
        if key.code == KeyCode::Char('c')
            && key.modifiers.contains(KeyModifiers::CONTROL)
            && key.kind != KeyEventKind::Release
        {
            return Flow::Exit;
        }

        if let Some(form) = self.form.as_mut() {
            match form.handle_key(&key) {
                FormOutcome::Pending => {
                    let line = form.status_line();
                    self.ui.borrow_mut().set_status(line);
                }
                FormOutcome::Cancelled => self.close_form(),
                FormOutcome::Submitted => self.submit_form(),
            }
            return Flow::Continue;
        }

        match self.router.route(&key) {
            Some(RoutedKey::Player(keys)) => self.send_player_key(keys),
            Some(RoutedKey::Game(cmd)) => return self.on_game_command(cmd),
            None => {}
        }
        Flow::Continue
    }

    fn on_game_command(&mut self, cmd: GameCommand) -> Flow {
        match cmd {
            GameCommand::Mute => {
                self.ui.borrow_mut().set_muted(true);
                self.status("sound off");
            }
            GameCommand::Unmute => {
                self.ui.borrow_mut().set_muted(false);
                self.status("sound on");
            }
            GameCommand::HelpPage => {
                let page = self.help.next_page(HELP_PAGE_LINES);
                self.ui.borrow_mut().show_page("Help (? for more)", &page);
            }
            GameCommand::Redraw => self.screen.redraw(),
            GameCommand::Stats => self.spawn_stats(),
            GameCommand::FocusJoin => self.open_join_form(),
            GameCommand::FocusChat => self.open_chat_form(),
            GameCommand::Quit => {
                if self.session.joined() {
                    self.start_quit();
                } else {
                    return Flow::Exit;
                }
            }
        }
        Flow::Continue
    }

    fn open_join_form(&mut self) {
        if self.session.joined() {
            self.status("already joined - q to quit first");
            return;
        }
        if self.joining {
            debug!("join already in progress");
            return;
        }
        let form = Form::join(
            &self.session.instance,
            &self.session.name,
            &self.session.team,
            self.session.enter_mode.as_str(),
        );
        self.ui.borrow_mut().set_status(form.status_line());
        self.form = Some(form);
        self.router.enter_form_mode();
    }

    fn open_chat_form(&mut self) {
        let form = Form::chat();
        self.ui.borrow_mut().set_status(form.status_line());
        self.form = Some(form);
        self.router.enter_form_mode();
    }

    fn close_form(&mut self) {
        self.form = None;
        self.router.leave_form_mode();
        self.set_idle_status();
    }

    fn submit_form(&mut self) {
        let Some(form) = self.form.take() else { return };
        self.router.leave_form_mode();

        match form.kind() {
            FormKind::Join => {
                let instance = form.field_value(0).trim().to_string();
                let name = form.field_value(1).trim().to_string();
                if instance.is_empty() {
                    self.status("instance required - ctrl-j to try again");
                    return;
                }
                if name.is_empty() {
                    self.status("name required - ctrl-j to try again");
                    return;
                }
                self.session.instance = instance;
                self.session.name = name;
                self.session.team = normalize_team(form.field_value(2).trim());
                self.session.enter_mode = EnterMode::parse(form.field_value(3).trim());
                self.persist_session();
                self.start_join();
            }
            FormKind::Chat => {
                let text = form.field_value(0).trim().to_string();
                if text.is_empty() {
                    self.set_idle_status();
                    return;
                }
                self.spawn_message(text);
            }
        }
    }

    /// Remember the current session parameters for the next run.
    fn persist_session(&self) {
        let mut frag = config::load_session();
        frag.set("instance", &self.session.instance);
        frag.set("name", &self.session.name);
        frag.set("team", &self.session.team);
        frag.set("enter", self.session.enter_mode.as_str());
        if let Err(err) = config::save_session(&frag) {
            warn!("could not save session parameters: {}", err);
        }
    }

    /// Forward a composed player key. Each send is an independent request;
    /// ordering between sends is not guaranteed and failures are only
    /// logged.
    fn send_player_key(&mut self, keys: String) {
        let Some(player_id) = self.session.player_id.clone() else {
            debug!("not joined, dropping key '{}'", keys);
            return;
        };
        let client = self.client.clone();
        let instance = self.session.instance.clone();
        tokio::spawn(async move {
            if let Err(err) = client.send_key(&instance, &player_id, &keys).await {
                warn!("send key '{}' failed: {}", keys, err);
            }
        });
    }

    fn start_join(&mut self) {
        if self.joining || self.session.joined() {
            debug!("join ignored: already joined or in progress");
            return;
        }
        if self.session.name.is_empty() {
            self.status("name required - ctrl-j to open the join form");
            return;
        }

        self.joining = true;
        self.status(format!("joining instance {}...", self.session.instance));

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let instance = self.session.instance.clone();
        let name = self.session.name.clone();
        let team = self.session.team.clone();
        let enter = self.session.enter_mode;
        tokio::spawn(async move {
            let result = client
                .join(&instance, &name, &team, enter, ConnectKind::Player)
                .await;
            let _ = tx.send(AppEvent::Joined(result)).await;
        });
    }

    fn start_quit(&mut self) {
        let Some(player_id) = self.session.player_id.clone() else {
            return;
        };
        self.stop_poll();
        self.status("leaving game...");

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let instance = self.session.instance.clone();
        tokio::spawn(async move {
            let result = client.quit(&instance, &player_id).await;
            let _ = tx.send(AppEvent::QuitDone(result)).await;
        });
    }

    fn spawn_stats(&mut self) {
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let instance = self.session.instance.clone();
        tokio::spawn(async move {
            let result = client.stats(&instance).await;
            let _ = tx.send(AppEvent::Stats(result)).await;
        });
    }

    fn spawn_instances(&mut self) {
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = client.list_instances().await;
            let _ = tx.send(AppEvent::Instances(result)).await;
        });
    }

    fn spawn_message(&mut self, text: String) {
        self.status("sending message...");
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let instance = self.session.instance.clone();
        let name = self.session.name.clone();
        let team = self.session.team.clone();
        tokio::spawn(async move {
            let result = client.message(&instance, &name, &team, &text).await;
            let _ = tx.send(AppEvent::MessageSent(result)).await;
        });
    }

    fn on_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Joined(Ok(player_id)) => {
                self.joining = false;
                info!(
                    "joined instance {} as '{}' ({})",
                    self.session.instance, self.session.name, player_id
                );
                self.session.player_id = Some(player_id.clone());
                self.start_poll(player_id);
                self.status(format!("playing as {} - q to quit", self.session.name));
            }
            AppEvent::Joined(Err(err)) => {
                // player id stays empty so the user can just try again
                self.joining = false;
                warn!("join failed: {}", err);
                self.status(format!("join failed: {}", err));
            }
            AppEvent::QuitDone(Ok(())) => {
                self.session.clear_player();
                self.status("left the game - ctrl-j to rejoin, q to exit");
            }
            AppEvent::QuitDone(Err(err)) => {
                warn!("quit failed: {}", err);
                self.status(format!("quit failed: {}", err));
            }
            AppEvent::Stats(Ok(text)) => {
                let title = format!("Statistics for instance {}", self.session.instance);
                self.ui.borrow_mut().show_page(&title, &text);
            }
            AppEvent::Stats(Err(err)) => {
                warn!("stats failed: {}", err);
                self.status(format!("stats failed: {}", err));
            }
            AppEvent::Instances(Ok(list)) => {
                if list.is_empty() {
                    self.status("no instances available - ctrl-j to join one anyway");
                } else {
                    for inst in &list {
                        debug!("instance {}: {}", inst.instance_id, inst.stats);
                    }
                    let ids: Vec<&str> = list.iter().map(|i| i.instance_id.as_str()).collect();
                    self.status(format!(
                        "instances: {} - ctrl-j to join, ? for help",
                        ids.join(" ")
                    ));
                }
            }
            AppEvent::Instances(Err(err)) => {
                warn!("instance list failed: {}", err);
                self.status(format!("server unreachable: {}", err));
            }
            AppEvent::MessageSent(Ok(())) => self.status("message sent"),
            AppEvent::MessageSent(Err(err)) => {
                warn!("message failed: {}", err);
                self.status(format!("message failed: {}", err));
            }
        }
    }

    fn start_poll(&mut self, player_id: String) {
        let (tx, rx) = mpsc::channel(BATCH_QUEUE);
        let poll = PollLoop::new(self.client.clone(), self.session.instance.clone(), player_id);
        self.poll = Some(ActivePoll {
            stop: poll.stop_handle(),
            batches: rx,
        });
        tokio::spawn(poll.run(tx));
    }

    /// Stop polling after the in-flight request resolves; dropping the
    /// receiver also unblocks the poll task if it is mid-send.
    fn stop_poll(&mut self) {
        if let Some(poll) = self.poll.take() {
            poll.stop.store(false, Ordering::SeqCst);
        }
    }

    fn on_session_end(&mut self, end: SessionEnd) {
        self.stop_poll();
        self.session.clear_player();
        self.joining = false;

        match end {
            SessionEnd::ServerClosed => {
                info!("session ended: server closed the game");
                self.status("game over: server exited - ctrl-j to join another, q to exit");
            }
            SessionEnd::PlayerDied => {
                info!("session ended: player died");
                self.status("you died - ctrl-j to rejoin, q to exit");
            }
        }
    }

    fn status(&self, text: impl Into<String>) {
        self.ui.borrow_mut().set_status(text);
    }

    fn set_idle_status(&self) {
        if self.session.joined() {
            self.status("playing - q to quit, ? for help");
        } else {
            self.status("not joined - ctrl-j to join, ? for help, $ for stats, q to exit");
        }
    }
}

/// Await the next decoded batch. Only polled while a poll loop is active.
async fn next_batch(poll: &mut Option<ActivePoll>) -> Option<Vec<u8>> {
    match poll.as_mut() {
        Some(active) => active.batches.recv().await,
        None => std::future::pending().await,
    }
}
