use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::battle::{BattleState, BattleTiming};

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Normalized fighter data used for display and combat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fighter {
    pub id: u32,
    pub name: String,
    pub attack: u16,
    /// First elemental type, e.g. `fire`.
    pub kind: String,
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FighterStat {
    pub name: String,
    pub value: u16,
}

/// Everything the detail screen shows for one fighter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FighterProfile {
    pub fighter: Fighter,
    pub types: Vec<String>,
    pub stats: Vec<FighterStat>,
    pub abilities: Vec<String>,
    pub height: u16,
    pub weight: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Screen {
    List,
    Detail,
    Battle,
}

/// Up to two fighters picked from the roster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    fighters: Vec<Fighter>,
}

impl Selection {
    pub const LIMIT: usize = 2;

    /// Removes the fighter when already picked, adds it when there is room.
    /// Returns whether the selection changed.
    pub fn toggle(&mut self, fighter: &Fighter) -> bool {
        if let Some(index) = self.fighters.iter().position(|f| f.id == fighter.id) {
            self.fighters.remove(index);
            return true;
        }
        if self.fighters.len() >= Self::LIMIT {
            return false;
        }
        self.fighters.push(fighter.clone());
        true
    }

    pub fn contains(&self, id: u32) -> bool {
        self.fighters.iter().any(|f| f.id == id)
    }

    pub fn fighters(&self) -> &[Fighter] {
        &self.fighters
    }

    pub fn len(&self) -> usize {
        self.fighters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fighters.is_empty()
    }

    pub fn can_begin(&self) -> bool {
        self.fighters.len() == Self::LIMIT
    }

    pub fn clear(&mut self) {
        self.fighters.clear();
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppState {
    pub terminal_size: (u16, u16),
    pub screen: Screen,

    pub page_size: usize,
    pub offset: usize,
    pub roster: Vec<Fighter>,
    pub cursor: usize,
    pub list_loading: bool,
    pub selection: Selection,

    pub detail_id: Option<u32>,
    pub profile: Option<FighterProfile>,
    pub detail_loading: bool,

    pub battle: Option<BattleState>,
    pub timing: BattleTiming,
    pub next_run: u64,
    pub rng: ChaCha8Rng,

    pub message: Option<String>,
    pub tick: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, BattleTiming::default(), 0)
    }
}

impl AppState {
    pub fn new(page_size: usize, timing: BattleTiming, seed: u64) -> Self {
        Self {
            terminal_size: (80, 24),
            screen: Screen::List,
            page_size: page_size.max(1),
            offset: 0,
            roster: Vec::new(),
            cursor: 0,
            list_loading: false,
            selection: Selection::default(),
            detail_id: None,
            profile: None,
            detail_loading: false,
            battle: None,
            timing,
            next_run: 1,
            rng: ChaCha8Rng::seed_from_u64(seed),
            message: None,
            tick: 0,
        }
    }

    pub fn cursor_fighter(&self) -> Option<&Fighter> {
        self.roster.get(self.cursor)
    }

    pub fn page_number(&self) -> usize {
        self.offset / self.page_size.max(1) + 1
    }

    pub fn set_cursor(&mut self, index: usize) -> bool {
        if self.roster.is_empty() {
            self.cursor = 0;
            return false;
        }
        let bounded = index.min(self.roster.len() - 1);
        if bounded != self.cursor {
            self.cursor = bounded;
            return true;
        }
        false
    }

    /// Hands out a fresh run id for a combat run.
    pub fn take_run_id(&mut self) -> u64 {
        let run = self.next_run;
        self.next_run = self.next_run.wrapping_add(1);
        run
    }

    pub fn is_loading(&self) -> bool {
        self.list_loading || self.detail_loading
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        let selected: Vec<String> = self
            .selection
            .fighters()
            .iter()
            .map(|f| f.name.clone())
            .collect();
        vec![
            DebugSection::new("Fighters")
                .entry("screen", ron_string(&self.screen))
                .entry("offset", ron_string(&self.offset))
                .entry("page_size", ron_string(&self.page_size))
                .entry("roster", ron_string(&self.roster.len()))
                .entry("cursor", ron_string(&self.cursor))
                .entry("selected", ron_string(&selected))
                .entry("detail", ron_string(&self.detail_id)),
            DebugSection::new("Battle")
                .entry("run", ron_string(&self.battle.as_ref().map(|b| b.run)))
                .entry("phase", ron_string(&self.battle.as_ref().map(|b| b.phase)))
                .entry("round", ron_string(&self.battle.as_ref().map(|b| b.round)))
                .entry("winner", ron_string(&self.battle.as_ref().and_then(|b| b.winner)))
                .entry("timing", ron_string(&self.timing)),
            DebugSection::new("Status")
                .entry("list_loading", ron_string(&self.list_loading))
                .entry("detail_loading", ron_string(&self.detail_loading))
                .entry("message", ron_string(&self.message)),
        ]
    }
}

/// Uppercases the first character, leaving the rest untouched.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

/// `mr-mime` -> `Mr Mime`
pub fn format_name(name: &str) -> String {
    name.split('-')
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter(id: u32, name: &str) -> Fighter {
        Fighter {
            id,
            name: name.to_string(),
            attack: 50,
            kind: "normal".to_string(),
            image: None,
        }
    }

    #[test]
    fn selection_toggles_membership() {
        let mut selection = Selection::default();
        let pikachu = fighter(25, "pikachu");

        assert!(selection.toggle(&pikachu));
        assert!(selection.contains(25));
        assert!(selection.toggle(&pikachu));
        assert!(selection.is_empty());
    }

    #[test]
    fn selection_ignores_third_fighter() {
        let mut selection = Selection::default();
        selection.toggle(&fighter(1, "bulbasaur"));
        selection.toggle(&fighter(4, "charmander"));

        assert!(!selection.toggle(&fighter(7, "squirtle")));
        assert_eq!(selection.len(), 2);
        assert!(!selection.contains(7));
        assert!(selection.can_begin());
    }

    #[test]
    fn selection_needs_exactly_two() {
        let mut selection = Selection::default();
        assert!(!selection.can_begin());
        selection.toggle(&fighter(1, "bulbasaur"));
        assert!(!selection.can_begin());
    }

    #[test]
    fn set_cursor_clamps_to_roster() {
        let mut state = AppState::default();
        assert!(!state.set_cursor(3));

        state.roster = vec![fighter(1, "bulbasaur"), fighter(2, "ivysaur")];
        assert!(state.set_cursor(9));
        assert_eq!(state.cursor, 1);
        assert!(!state.set_cursor(1));
    }

    #[test]
    fn run_ids_are_unique() {
        let mut state = AppState::default();
        let first = state.take_run_id();
        let second = state.take_run_id();
        assert_ne!(first, second);
    }

    #[test]
    fn name_helpers() {
        assert_eq!(capitalize("charizard"), "Charizard");
        assert_eq!(capitalize(""), "");
        assert_eq!(format_name("mr-mime"), "Mr Mime");
    }
}
