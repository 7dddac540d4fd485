use tui_dispatch::DispatchResult;

use crate::action::Action;
use crate::battle::{BattleState, CueTimer};
use crate::effect::Effect;
use crate::state::{AppState, Fighter, Screen};

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => {
            state.list_loading = true;
            state.message = None;
            DispatchResult::changed_with(load_page(state))
        }

        Action::PageNext => {
            if state.list_loading || state.roster.len() < state.page_size {
                return DispatchResult::unchanged();
            }
            state.offset += state.page_size;
            state.list_loading = true;
            DispatchResult::changed_with(load_page(state))
        }

        Action::PagePrev => {
            if state.list_loading || state.offset == 0 {
                return DispatchResult::unchanged();
            }
            state.offset = state.offset.saturating_sub(state.page_size);
            state.list_loading = true;
            DispatchResult::changed_with(load_page(state))
        }

        Action::PageDidLoad { offset, fighters } => {
            if offset != state.offset {
                return DispatchResult::unchanged();
            }
            state.list_loading = false;
            state.message = if fighters.is_empty() {
                Some("No fighters on this page. Press r to retry.".to_string())
            } else {
                None
            };
            state.roster = fighters;
            state.cursor = 0;
            DispatchResult::changed()
        }

        Action::CursorMove(delta) => {
            let next = (state.cursor as i64 + i64::from(delta)).max(0) as usize;
            changed_if(state.set_cursor(next))
        }

        Action::CursorSet(index) => changed_if(state.set_cursor(index)),

        Action::SelectionToggle => {
            let Some(fighter) = focused_fighter(state) else {
                return DispatchResult::unchanged();
            };
            if state.selection.toggle(&fighter) {
                state.message = None;
            } else {
                state.message = Some("Two fighters already picked.".to_string());
            }
            DispatchResult::changed()
        }

        Action::SelectionClear => {
            if state.selection.is_empty() {
                return DispatchResult::unchanged();
            }
            state.selection.clear();
            DispatchResult::changed()
        }

        Action::DetailOpen => {
            let Some(id) = state.cursor_fighter().map(|f| f.id) else {
                return DispatchResult::unchanged();
            };
            state.screen = Screen::Detail;
            state.detail_id = Some(id);
            state.profile = None;
            state.detail_loading = true;
            DispatchResult::changed_with(Effect::LoadProfile { id })
        }

        Action::DetailDidLoad { id, profile } => {
            if state.detail_id != Some(id) {
                return DispatchResult::unchanged();
            }
            state.detail_loading = false;
            state.profile = profile;
            DispatchResult::changed()
        }

        Action::BattleOpen(fighters) => open_battle(state, fighters),

        Action::BattleTimerFired { run, cue } => {
            let Some(battle) = state.battle.as_mut() else {
                return DispatchResult::unchanged();
            };
            if battle.run != run {
                return DispatchResult::unchanged();
            }
            let timers = battle.on_cue(run, cue, &mut state.rng);
            DispatchResult::changed_with_many(schedule(timers))
        }

        Action::BattleRestart => {
            if !state.battle.as_ref().is_some_and(|b| b.is_finished()) {
                return DispatchResult::unchanged();
            }
            let run = state.take_run_id();
            let Some(timer) = state.battle.as_mut().and_then(|b| b.restart(run)) else {
                return DispatchResult::unchanged();
            };
            let mut effects = vec![Effect::CancelBattle];
            effects.extend(schedule(vec![timer]));
            DispatchResult::changed_with_many(effects)
        }

        Action::ScreenShow(screen) => match screen {
            Screen::List => {
                if state.screen == Screen::List && state.battle.is_none() {
                    return DispatchResult::unchanged();
                }
                let effects = leave_battle(state);
                state.screen = Screen::List;
                DispatchResult::changed_with_many(effects)
            }
            Screen::Detail => {
                if state.detail_id.is_none() || state.screen == Screen::Detail {
                    return DispatchResult::unchanged();
                }
                let effects = leave_battle(state);
                state.screen = Screen::Detail;
                DispatchResult::changed_with_many(effects)
            }
            Screen::Battle => {
                if state.screen == Screen::Battle {
                    return DispatchResult::unchanged();
                }
                let fighters = state.selection.fighters().to_vec();
                open_battle(state, fighters)
            }
        },

        Action::ScreenBack => match state.screen {
            Screen::List => DispatchResult::unchanged(),
            Screen::Detail | Screen::Battle => {
                let effects = leave_battle(state);
                state.screen = Screen::List;
                DispatchResult::changed_with_many(effects)
            }
        },

        Action::UiTerminalResize(width, height) => {
            state.terminal_size = (width, height);
            DispatchResult::changed()
        }

        Action::Tick => {
            state.tick = state.tick.wrapping_add(1);
            changed_if(state.is_loading())
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

fn load_page(state: &AppState) -> Effect {
    Effect::LoadPage {
        limit: state.page_size,
        offset: state.offset,
    }
}

/// The fighter a selection toggle applies to on the current screen.
fn focused_fighter(state: &AppState) -> Option<Fighter> {
    match state.screen {
        Screen::List => state.cursor_fighter().cloned(),
        Screen::Detail => state.profile.as_ref().map(|p| p.fighter.clone()),
        Screen::Battle => None,
    }
}

fn open_battle(state: &mut AppState, fighters: Vec<Fighter>) -> DispatchResult<Effect> {
    let mut effects = leave_battle(state);
    let run = state.take_run_id();
    let battle = BattleState::new(run, fighters, state.timing);
    effects.extend(schedule(battle.start().into_iter().collect()));
    state.battle = Some(battle);
    state.screen = Screen::Battle;
    DispatchResult::changed_with_many(effects)
}

fn leave_battle(state: &mut AppState) -> Vec<Effect> {
    match state.battle.take() {
        Some(_) => vec![Effect::CancelBattle],
        None => Vec::new(),
    }
}

fn schedule(timers: Vec<CueTimer>) -> Vec<Effect> {
    timers
        .into_iter()
        .map(|timer| Effect::ScheduleCue {
            run: timer.run,
            cue: timer.cue,
            delay_ms: timer.delay_ms,
        })
        .collect()
}

fn changed_if(changed: bool) -> DispatchResult<Effect> {
    if changed {
        DispatchResult::changed()
    } else {
        DispatchResult::unchanged()
    }
}
