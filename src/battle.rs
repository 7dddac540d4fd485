//! Combat sequencer.
//!
//! A battle is a fixed number of timed rounds between two fighters. The
//! sequencer never sleeps itself: every transition returns the [`CueTimer`]s
//! it wants fired later, and the runtime delivers each one back through
//! [`BattleState::on_cue`]. Cues carry the run id they were scheduled for, so
//! a cue from a torn-down or restarted run is ignored.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::state::{capitalize, Fighter};

pub const MAX_ROUNDS: u8 = 5;
pub const NEED_FIGHTERS: &str = "Pick exactly two fighters to start a battle.";

static DEFAULT_MOVES: [&str; 4] = ["Tackle", "Body Slam", "Headbutt", "Quick Attack"];

static MOVE_TABLE: [(&str, [&str; 4]); 18] = [
    ("normal", ["Hyper Beam", "Slam", "Double-Edge", "Mega Punch"]),
    ("fire", ["Flamethrower", "Fire Blast", "Ember", "Fire Punch"]),
    ("water", ["Hydro Pump", "Surf", "Water Gun", "Bubble Beam"]),
    ("grass", ["Solar Beam", "Razor Leaf", "Vine Whip", "Leaf Blade"]),
    ("electric", ["Thunderbolt", "Thunder", "Thunder Shock", "Thunder Punch"]),
    ("ice", ["Ice Beam", "Blizzard", "Ice Punch", "Aurora Beam"]),
    ("fighting", ["Close Combat", "Karate Chop", "Low Kick", "Brick Break"]),
    ("poison", ["Sludge Bomb", "Poison Jab", "Acid", "Poison Sting"]),
    ("ground", ["Earthquake", "Dig", "Mud-Slap", "Bone Club"]),
    ("flying", ["Wing Attack", "Aerial Ace", "Peck", "Drill Peck"]),
    ("psychic", ["Psychic", "Psybeam", "Confusion", "Zen Headbutt"]),
    ("bug", ["X-Scissor", "Bug Bite", "Signal Beam", "Twineedle"]),
    ("rock", ["Rock Slide", "Stone Edge", "Rock Throw", "Rock Tomb"]),
    ("ghost", ["Shadow Ball", "Lick", "Shadow Claw", "Night Shade"]),
    ("dragon", ["Dragon Claw", "Outrage", "Dragon Rage", "Dragon Pulse"]),
    ("dark", ["Crunch", "Bite", "Dark Pulse", "Night Slash"]),
    ("steel", ["Iron Tail", "Flash Cannon", "Metal Claw", "Iron Head"]),
    ("fairy", ["Moonblast", "Dazzling Gleam", "Play Rough", "Fairy Wind"]),
];

/// Move names a fighter of the given type can call out. Unknown types get
/// the generic table.
pub fn moves_for(kind: &str) -> &'static [&'static str] {
    MOVE_TABLE
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, moves)| &moves[..])
        .unwrap_or(&DEFAULT_MOVES[..])
}

pub fn pick_move<R: Rng + ?Sized>(kind: &str, rng: &mut R) -> &'static str {
    let moves = moves_for(kind);
    moves[rng.gen_range(0..moves.len())]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattlePhase {
    /// Terminal: the battle was opened without exactly two fighters.
    NeedFighters,
    Idle,
    Running,
    Resolving,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleCue {
    /// Re-enter the arming delay after a restart.
    Begin,
    Arm,
    Round,
    ClearFlags,
    Resolve,
}

impl BattleCue {
    pub const ALL: [BattleCue; 5] = [
        BattleCue::Begin,
        BattleCue::Arm,
        BattleCue::Round,
        BattleCue::ClearFlags,
        BattleCue::Resolve,
    ];

    /// Timer task key. Flag clearing gets its own key so it can overlap the
    /// next round timer.
    pub fn task_key(self) -> &'static str {
        match self {
            BattleCue::Begin | BattleCue::Arm => "battle_arm",
            BattleCue::Round | BattleCue::Resolve => "battle_round",
            BattleCue::ClearFlags => "battle_flags",
        }
    }
}

/// Base delays in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleTiming {
    pub restart_ms: u64,
    pub arm_ms: u64,
    pub round_ms: u64,
    pub flag_clear_ms: u64,
    pub resolve_ms: u64,
}

impl Default for BattleTiming {
    fn default() -> Self {
        Self {
            restart_ms: 500,
            arm_ms: 1000,
            round_ms: 2500,
            flag_clear_ms: 1000,
            resolve_ms: 1500,
        }
    }
}

impl BattleTiming {
    /// Scales every delay; 200 runs twice as fast, 50 half as fast.
    pub fn with_pace(pace_pct: u16) -> Self {
        let pace = u64::from(pace_pct.max(1));
        let scale = |ms: u64| ms * 100 / pace;
        let base = Self::default();
        Self {
            restart_ms: scale(base.restart_ms),
            arm_ms: scale(base.arm_ms),
            round_ms: scale(base.round_ms),
            flag_clear_ms: scale(base.flag_clear_ms),
            resolve_ms: scale(base.resolve_ms),
        }
    }

    pub fn delay_for(&self, cue: BattleCue) -> u64 {
        match cue {
            BattleCue::Begin => self.restart_ms,
            BattleCue::Arm => self.arm_ms,
            BattleCue::Round => self.round_ms,
            BattleCue::ClearFlags => self.flag_clear_ms,
            BattleCue::Resolve => self.resolve_ms,
        }
    }
}

/// A cue the runtime should deliver after `delay_ms`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CueTimer {
    pub run: u64,
    pub cue: BattleCue,
    pub delay_ms: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FighterFlags {
    pub attacking: bool,
    pub hit: bool,
    pub winner: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    pub run: u64,
    pub phase: BattlePhase,
    pub fighters: Vec<Fighter>,
    pub flags: Vec<FighterFlags>,
    pub log: Vec<String>,
    /// Rounds completed in this run.
    pub round: u8,
    pub winner: Option<usize>,
    pub timing: BattleTiming,
}

impl BattleState {
    pub fn new(run: u64, fighters: Vec<Fighter>, timing: BattleTiming) -> Self {
        let phase = if fighters.len() == 2 {
            BattlePhase::Idle
        } else {
            BattlePhase::NeedFighters
        };
        let flags = match phase {
            BattlePhase::NeedFighters => Vec::new(),
            _ => vec![FighterFlags::default(); 2],
        };
        Self {
            run,
            phase,
            fighters,
            flags,
            log: Vec::new(),
            round: 0,
            winner: None,
            timing,
        }
    }

    /// Schedules arming for a freshly created run.
    pub fn start(&self) -> Option<CueTimer> {
        if self.phase != BattlePhase::Idle || !self.log.is_empty() {
            return None;
        }
        Some(self.timer(BattleCue::Arm))
    }

    /// Wipes a finished run and schedules the next one under `run`.
    pub fn restart(&mut self, run: u64) -> Option<CueTimer> {
        if self.phase != BattlePhase::Finished {
            return None;
        }
        self.run = run;
        self.phase = BattlePhase::Idle;
        self.log.clear();
        self.flags = vec![FighterFlags::default(); 2];
        self.round = 0;
        self.winner = None;
        debug!(run, "battle restarted");
        Some(self.timer(BattleCue::Begin))
    }

    pub fn on_cue<R: Rng + ?Sized>(
        &mut self,
        run: u64,
        cue: BattleCue,
        rng: &mut R,
    ) -> Vec<CueTimer> {
        if run != self.run {
            debug!(run, current = self.run, ?cue, "stale battle cue");
            return Vec::new();
        }
        match (cue, self.phase) {
            (BattleCue::Begin, BattlePhase::Idle) => vec![self.timer(BattleCue::Arm)],
            (BattleCue::Arm, BattlePhase::Idle) => {
                self.phase = BattlePhase::Running;
                vec![self.timer(BattleCue::Round)]
            }
            (BattleCue::Round, BattlePhase::Running) => self.play_round(rng),
            (BattleCue::ClearFlags, phase) if phase != BattlePhase::NeedFighters => {
                for flags in &mut self.flags {
                    flags.attacking = false;
                    flags.hit = false;
                }
                Vec::new()
            }
            (BattleCue::Resolve, BattlePhase::Resolving) => {
                self.resolve();
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    pub fn attacker(&self) -> usize {
        usize::from(self.round % 2)
    }

    pub fn advisory(&self) -> Option<&'static str> {
        match self.phase {
            BattlePhase::NeedFighters => Some(NEED_FIGHTERS),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == BattlePhase::Finished
    }

    pub fn winner_fighter(&self) -> Option<&Fighter> {
        self.winner.and_then(|index| self.fighters.get(index))
    }

    fn play_round<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<CueTimer> {
        let attacker = self.attacker();
        let defender = 1 - attacker;
        let Some(fighter) = self.fighters.get(attacker) else {
            return Vec::new();
        };
        let move_name = pick_move(&fighter.kind, rng);
        let line = format!("{} uses {}!", capitalize(&fighter.name), move_name);

        for (index, flags) in self.flags.iter_mut().enumerate() {
            flags.attacking = index == attacker;
            flags.hit = index == defender;
        }
        debug!(run = self.run, round = self.round + 1, %line, "battle round");
        self.log.push(line);
        self.round += 1;

        let mut timers = vec![self.timer(BattleCue::ClearFlags)];
        if self.round >= MAX_ROUNDS {
            self.phase = BattlePhase::Resolving;
            timers.push(self.timer(BattleCue::Resolve));
        } else {
            timers.push(self.timer(BattleCue::Round));
        }
        timers
    }

    fn resolve(&mut self) {
        let winner = match (self.fighters.first(), self.fighters.get(1)) {
            (Some(first), Some(second)) if second.attack > first.attack => 1,
            _ => 0,
        };
        if let Some(flags) = self.flags.get_mut(winner) {
            flags.winner = true;
        }
        self.winner = Some(winner);
        self.phase = BattlePhase::Finished;
        if let Some(fighter) = self.fighters.get(winner) {
            info!(run = self.run, winner = %fighter.name, "battle finished");
            self.log
                .push(format!("{} wins the battle!", capitalize(&fighter.name)));
        }
    }

    fn timer(&self, cue: BattleCue) -> CueTimer {
        CueTimer {
            run: self.run,
            cue,
            delay_ms: self.timing.delay_for(cue),
        }
    }
}
