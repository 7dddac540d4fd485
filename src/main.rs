use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{
    DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem,
};

use pokefight::action::Action;
use pokefight::api;
use pokefight::battle::{BattleCue, BattleTiming};
use pokefight::effect::Effect;
use pokefight::reducer::reducer;
use pokefight::state::AppState;
use pokefight::ui;

#[derive(Parser, Debug)]
#[command(name = "pokefight")]
#[command(about = "Pick two Pokemon and watch them battle")]
struct Args {
    /// Fighters per page
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u16).range(1..=100))]
    page_size: u16,

    /// Battle speed in percent (200 runs twice as fast)
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u16).range(25..=400))]
    pace: u16,

    /// Seed for move selection; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Write tracing output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(flatten)]
    debug: DebugCliArgs,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let Args {
        page_size,
        pace,
        seed,
        log_file,
        debug: debug_args,
    } = Args::parse();

    if let Some(path) = log_file.as_deref() {
        init_tracing(path)?;
    }

    let debug = DebugSession::new(debug_args);
    let seed = seed.unwrap_or_else(rand::random);
    info!(page_size, pace, seed, "starting pokefight");

    let state = debug
        .load_state_or_else_async(move || async move {
            Ok::<AppState, io::Error>(AppState::new(
                usize::from(page_size),
                BattleTiming::with_pace(pace),
                seed,
            ))
        })
        .await
        .map_err(debug_error)?;
    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

/// Stdout belongs to the terminal UI, so logs only go to a file.
fn init_tracing(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .try_init()
        .map_err(|e| io::Error::other(format!("tracing init failed: {e}")))
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
) -> io::Result<DebugRunOutput<AppState>> {
    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime
                    .subscriptions()
                    .interval("tick", Duration::from_millis(120), || Action::Tick);
            },
            |frame, area, state, _render_ctx: RenderContext| {
                ui::render(frame, area, state);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            handle_effect,
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>) {
    match effect {
        Effect::LoadPage { limit, offset } => {
            ctx.tasks().spawn(TaskKey::new("page"), async move {
                let fighters = api::list_fighters(limit, offset).await;
                Action::PageDidLoad { offset, fighters }
            });
        }
        Effect::LoadProfile { id } => {
            ctx.tasks().spawn(TaskKey::new("profile"), async move {
                let profile = api::get_profile(&id.to_string()).await;
                Action::DetailDidLoad { id, profile }
            });
        }
        Effect::ScheduleCue {
            run,
            cue,
            delay_ms,
        } => {
            ctx.tasks()
                .spawn(TaskKey::new(cue.task_key()), async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Action::BattleTimerFired { run, cue }
                });
        }
        Effect::CancelBattle => {
            for cue in BattleCue::ALL {
                ctx.tasks().cancel(&TaskKey::new(cue.task_key()));
            }
        }
    }
}
