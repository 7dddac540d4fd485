use serde::{Deserialize, Serialize};

use crate::battle::BattleCue;
use crate::state::{Fighter, FighterProfile, Screen};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[action(infer_categories)]
pub enum Action {
    Init,

    // Roster paging
    PageNext,
    PagePrev,
    PageDidLoad { offset: usize, fighters: Vec<Fighter> },

    // Cursor and selection
    CursorMove(i16),
    CursorSet(usize),
    SelectionToggle,
    SelectionClear,

    // Detail screen
    DetailOpen,
    DetailDidLoad { id: u32, profile: Option<FighterProfile> },

    // Battle screen
    BattleOpen(Vec<Fighter>),
    BattleTimerFired { run: u64, cue: BattleCue },
    BattleRestart,

    ScreenShow(Screen),
    ScreenBack,

    UiTerminalResize(u16, u16),
    Tick,
    Quit,
}
