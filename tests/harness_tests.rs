//! Store-level flows driven through the reducer, with async work simulated.

use pokefight::{
    action::Action,
    battle::{BattleCue, BattlePhase, NEED_FIGHTERS},
    effect::Effect,
    reducer::reducer,
    state::{AppState, Fighter, Screen},
};
use pretty_assertions::assert_eq;
use tui_dispatch::testing::*;
use tui_dispatch::{EffectStore, NumericComponentId};

fn fighter(id: u32, name: &str, attack: u16, kind: &str) -> Fighter {
    Fighter {
        id,
        name: name.to_string(),
        attack,
        kind: kind.to_string(),
        image: None,
    }
}

fn pikachu() -> Fighter {
    fighter(25, "pikachu", 55, "electric")
}

fn charizard() -> Fighter {
    fighter(6, "charizard", 84, "fire")
}

fn page(offset: u32, count: u32) -> Vec<Fighter> {
    (offset + 1..=offset + count)
        .map(|id| fighter(id, &format!("mon-{id}"), 40, "normal"))
        .collect()
}

/// Plays every scheduled cue in firing order, like the timer runtime would.
/// Returns the virtual time at which the last cue fired.
fn play_out(store: &mut EffectStore<AppState, Action, Effect>, effects: Vec<Effect>) -> u64 {
    let mut pending: Vec<(u64, u64, BattleCue)> = Vec::new();
    let mut now = 0;
    queue(&mut pending, now, effects);
    while !pending.is_empty() {
        pending.sort_by_key(|(at, _, _)| *at);
        let (at, run, cue) = pending.remove(0);
        now = at;
        let result = store.dispatch(Action::BattleTimerFired { run, cue });
        queue(&mut pending, now, result.effects);
    }
    now
}

fn queue(pending: &mut Vec<(u64, u64, BattleCue)>, now: u64, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::ScheduleCue { run, cue, delay_ms } => pending.push((now + delay_ms, run, cue)),
            Effect::CancelBattle => pending.clear(),
            _ => {}
        }
    }
}

#[test]
fn init_loads_page_and_fills_roster() {
    let mut harness = EffectStoreTestHarness::new(AppState::default(), reducer);

    harness.dispatch_collect(Action::Init);
    harness.assert_state(|s| s.list_loading);

    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_first_matches(|e| matches!(e, Effect::LoadPage { limit: 20, offset: 0 }));

    harness.complete_action(Action::PageDidLoad {
        offset: 0,
        fighters: page(0, 20),
    });
    let (changed, total) = harness.process_emitted();
    assert_eq!((changed, total), (1, 1));

    harness.assert_state(|s| !s.list_loading && s.roster.len() == 20);
    harness.assert_state(|s| s.roster[0].id == 1 && s.roster[19].id == 20);
}

#[test]
fn paging_moves_by_page_size_and_stops_at_zero() {
    let mut harness = EffectStoreTestHarness::new(AppState::default(), reducer);
    harness.complete_action(Action::PageDidLoad {
        offset: 0,
        fighters: page(0, 20),
    });
    harness.process_emitted();

    harness.dispatch_collect(Action::PagePrev);
    harness.drain_effects().effects_empty();

    harness.dispatch_collect(Action::PageNext);
    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_first_matches(|e| matches!(e, Effect::LoadPage { limit: 20, offset: 20 }));

    harness.complete_action(Action::PageDidLoad {
        offset: 20,
        fighters: page(20, 20),
    });
    harness.process_emitted();
    harness.assert_state(|s| s.page_number() == 2 && s.roster[0].id == 21);

    harness.dispatch_collect(Action::PagePrev);
    let effects = harness.drain_effects();
    effects.effects_first_matches(|e| matches!(e, Effect::LoadPage { offset: 0, .. }));
}

#[test]
fn selection_caps_at_two() {
    let mut harness = EffectStoreTestHarness::new(AppState::default(), reducer);
    harness.complete_action(Action::PageDidLoad {
        offset: 0,
        fighters: page(0, 5),
    });
    harness.process_emitted();

    for index in [0, 1, 2] {
        harness.dispatch_collect(Action::CursorSet(index));
        harness.dispatch_collect(Action::SelectionToggle);
    }
    harness.assert_state(|s| s.selection.len() == 2 && !s.selection.contains(3));

    // toggling a selected fighter removes it
    harness.dispatch_collect(Action::CursorSet(0));
    harness.dispatch_collect(Action::SelectionToggle);
    harness.assert_state(|s| s.selection.len() == 1 && !s.selection.contains(1));
}

#[test]
fn detail_flow_loads_profile() {
    let mut harness = EffectStoreTestHarness::new(AppState::default(), reducer);
    harness.complete_action(Action::PageDidLoad {
        offset: 0,
        fighters: page(0, 3),
    });
    harness.process_emitted();

    harness.dispatch_collect(Action::CursorSet(2));
    harness.dispatch_collect(Action::DetailOpen);
    harness.assert_state(|s| s.screen == Screen::Detail && s.detail_loading);
    harness
        .drain_effects()
        .effects_first_matches(|e| matches!(e, Effect::LoadProfile { id: 3 }));

    // a late profile for another fighter is ignored
    harness.complete_action(Action::DetailDidLoad { id: 1, profile: None });
    let (changed, _) = harness.process_emitted();
    assert_eq!(changed, 0);

    harness.complete_action(Action::DetailDidLoad { id: 3, profile: None });
    harness.process_emitted();
    harness.assert_state(|s| !s.detail_loading && s.profile.is_none());

    harness.dispatch_collect(Action::ScreenBack);
    harness.assert_state(|s| s.screen == Screen::List);
}

#[test]
fn battle_runs_five_rounds_then_declares_stronger_fighter() {
    let mut store = EffectStore::new(AppState::new(20, Default::default(), 42), reducer);

    let result = store.dispatch(Action::BattleOpen(vec![pikachu(), charizard()]));
    let finished_at = play_out(&mut store, result.effects);

    let battle = store.state().battle.as_ref().unwrap();
    assert_eq!(battle.phase, BattlePhase::Finished);
    assert_eq!(battle.log.len(), 6);
    assert!(battle.log[0].starts_with("Pikachu uses "));
    assert!(battle.log[1].starts_with("Charizard uses "));
    assert_eq!(battle.log[5], "Charizard wins the battle!");
    assert_eq!(battle.winner, Some(1));
    assert!(battle.flags[1].winner);
    // arm, five rounds (the first fires one period after arming), resolve
    assert_eq!(finished_at, 1000 + 5 * 2500 + 1500);
}

#[test]
fn fire_fighter_only_uses_fire_moves() {
    let fire = ["Flamethrower", "Fire Blast", "Ember", "Fire Punch"];
    for seed in 0..8 {
        let mut store = EffectStore::new(AppState::new(20, Default::default(), seed), reducer);
        let result = store.dispatch(Action::BattleOpen(vec![charizard(), pikachu()]));
        play_out(&mut store, result.effects);

        let battle = store.state().battle.as_ref().unwrap();
        for line in battle.log.iter().step_by(2).take(3) {
            let used = line.trim_start_matches("Charizard uses ").trim_end_matches('!');
            assert!(fire.contains(&used), "{line}");
        }
    }
}

#[test]
fn restart_clears_log_and_replays() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    let result = store.dispatch(Action::BattleOpen(vec![pikachu(), charizard()]));
    play_out(&mut store, result.effects);
    let first_run = store.state().battle.as_ref().unwrap().run;

    let result = store.dispatch(Action::BattleRestart);
    assert_eq!(result.effects[0], Effect::CancelBattle);
    {
        let battle = store.state().battle.as_ref().unwrap();
        assert!(battle.log.is_empty());
        assert_eq!(battle.round, 0);
        assert_eq!(battle.winner, None);
        assert_ne!(battle.run, first_run);
    }

    // a cue still in flight from the first run must not touch the new one
    let stale = store.dispatch(Action::BattleTimerFired {
        run: first_run,
        cue: BattleCue::Round,
    });
    assert!(!stale.changed);

    let finished_at = play_out(&mut store, result.effects);
    assert_eq!(finished_at, 500 + 1000 + 5 * 2500 + 1500);
    assert_eq!(store.state().battle.as_ref().unwrap().log.len(), 6);
}

#[test]
fn restart_while_running_is_ignored() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    store.dispatch(Action::BattleOpen(vec![pikachu(), charizard()]));

    let result = store.dispatch(Action::BattleRestart);
    assert!(!result.changed);
    assert!(result.effects.is_empty());
}

#[test]
fn wrong_fighter_count_shows_advisory() {
    let three = vec![pikachu(), charizard(), fighter(7, "squirtle", 48, "water")];
    for fighters in [Vec::new(), vec![pikachu()], three] {
        let mut store = EffectStore::new(AppState::default(), reducer);
        let result = store.dispatch(Action::BattleOpen(fighters));

        assert!(result.effects.is_empty());
        let battle = store.state().battle.as_ref().unwrap();
        assert_eq!(battle.advisory(), Some(NEED_FIGHTERS));
        assert!(battle.log.is_empty());
    }
}

#[test]
fn leaving_battle_cancels_pending_cues() {
    let mut harness = EffectStoreTestHarness::new(AppState::default(), reducer);
    harness.dispatch_collect(Action::BattleOpen(vec![pikachu(), charizard()]));
    harness.drain_effects();

    harness.dispatch_collect(Action::ScreenBack);
    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_first_matches(|e| matches!(e, Effect::CancelBattle));
    harness.assert_state(|s| s.battle.is_none() && s.screen == Screen::List);
}

#[test]
fn begin_key_dispatches_selected_pair() {
    let mut state = AppState::default();
    state.roster = vec![pikachu(), charizard()];
    state.selection.toggle(&pikachu());
    state.selection.toggle(&charizard());
    let mut harness = EffectStoreTestHarness::new(state, reducer);

    let actions = harness.send_keys::<NumericComponentId, _, _>("b", |state, event| {
        match &event.kind {
            tui_dispatch::EventKind::Key(key) => {
                pokefight::ui::key_action(*key, state).into_iter().collect()
            }
            _ => Vec::new(),
        }
    });

    actions.assert_count(1);
    actions.assert_first(Action::BattleOpen(vec![pikachu(), charizard()]));
}

#[test]
fn direct_battle_key_opens_advisory_without_pair() {
    let mut harness = EffectStoreTestHarness::new(AppState::default(), reducer);

    let actions = harness.send_keys::<NumericComponentId, _, _>("3", |state, event| {
        match &event.kind {
            tui_dispatch::EventKind::Key(key) => {
                pokefight::ui::key_action(*key, state).into_iter().collect()
            }
            _ => Vec::new(),
        }
    });
    for action in actions {
        harness.dispatch_collect(action);
    }

    harness.assert_state(|s| s.screen == Screen::Battle);
    harness.assert_state(|s| {
        s.battle
            .as_ref()
            .is_some_and(|b| b.phase == BattlePhase::NeedFighters)
    });
    harness.drain_effects().effects_empty();
}
