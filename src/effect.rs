use crate::battle::BattleCue;

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    LoadPage { limit: usize, offset: usize },
    LoadProfile { id: u32 },
    /// Deliver `Action::BattleTimerFired` for `run` after `delay_ms`.
    ScheduleCue { run: u64, cue: BattleCue, delay_ms: u64 },
    /// Drop every pending battle timer.
    CancelBattle,
}
