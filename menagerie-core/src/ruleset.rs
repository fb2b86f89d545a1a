//! RuleSet - board dimensions, roster and rule toggles

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::board::{Color, Team};
use crate::dice::{default_faces, DiceValue};
use crate::error::RulesError;

/// Preference key for the color-protection toggle
pub const COLOR_PROTECTION_KEY: &str = "colorProtection";
/// Preference key for the dice toggle
pub const WITH_DICE_KEY: &str = "withDice";

/// Static shape of a match: who plays, board size, roster
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Turn order; the first team hosts networked games
    pub teams: Vec<Team>,
    pub rows: usize,
    pub columns: usize,
    /// How many cells of each color the board holds
    pub items: usize,
    /// Rendering tag per rank, weakest first
    pub species: Vec<String>,
    /// Color affinity per rank
    pub color_affinities: Vec<Color>,
    /// Faces used when dice are enabled
    pub dice_faces: Vec<DiceValue>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            teams: vec![Team::from("red"), Team::from("blue")],
            rows: 5,
            columns: 5,
            items: 5,
            species: ["mouse", "cat", "dog", "lion", "elephant"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            color_affinities: vec![0, 1, 2, 3, 4],
            dice_faces: default_faces(),
        }
    }
}

impl EngineConfig {
    /// Number of ranks per team
    pub fn ranks(&self) -> usize {
        self.species.len()
    }

    /// Number of distinct cell colors (one per column index)
    pub fn colors(&self) -> usize {
        self.columns
    }

    pub fn team_index(&self, team: &Team) -> Option<usize> {
        self.teams.iter().position(|t| t == team)
    }

    /// Check the config describes a playable board
    pub fn validate(&self) -> Result<(), RulesError> {
        let invalid = |msg: String| Err(RulesError::InvalidConfig(msg));

        if self.teams.len() < 2 {
            return invalid(format!("need at least two teams, got {}", self.teams.len()));
        }
        for (i, team) in self.teams.iter().enumerate() {
            if self.teams[..i].contains(team) {
                return invalid(format!("team {} listed twice", team));
            }
        }
        if self.rows == 0 || self.columns == 0 {
            return invalid("board must have at least one row and column".to_string());
        }
        if self.colors() > Color::MAX as usize + 1 {
            return invalid(format!("too many colors: {}", self.colors()));
        }
        if self.colors() * self.items != self.rows * self.columns {
            return invalid(format!(
                "{} colors x {} items does not fill a {}x{} board",
                self.colors(),
                self.items,
                self.rows,
                self.columns
            ));
        }
        if self.species.is_empty() {
            return invalid("roster is empty".to_string());
        }
        if self.color_affinities.len() != self.species.len() {
            return invalid(format!(
                "{} color affinities for {} ranks",
                self.color_affinities.len(),
                self.species.len()
            ));
        }
        if let Some(c) = self.color_affinities.iter().find(|&&c| c as usize >= self.colors()) {
            return invalid(format!("color affinity {} is not a board color", c));
        }
        if self.dice_faces.is_empty() {
            return invalid("dice has no faces".to_string());
        }
        Ok(())
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

/// The two rule toggles picked on the setup screen
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFlags {
    /// A pawn standing on a cell of its own color cannot be captured
    pub color_protection: bool,
    /// Roll dice each turn instead of deriving the value from the last move
    pub with_dice: bool,
}

impl Default for RuleFlags {
    fn default() -> Self {
        Self {
            color_protection: false,
            with_dice: true,
        }
    }
}

impl RuleFlags {
    pub fn new(color_protection: bool, with_dice: bool) -> Self {
        Self {
            color_protection,
            with_dice,
        }
    }

    /// Read toggles from preference storage. Missing or unparsable values
    /// fall back to the defaults.
    pub fn from_store<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            store
                .get(key)
                .and_then(|v| v.trim().parse::<bool>().ok())
                .unwrap_or(default)
        };
        Self {
            color_protection: flag(COLOR_PROTECTION_KEY, defaults.color_protection),
            with_dice: flag(WITH_DICE_KEY, defaults.with_dice),
        }
    }

    /// Write toggles back to preference storage
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) {
        store.set(COLOR_PROTECTION_KEY, self.color_protection.to_string());
        store.set(WITH_DICE_KEY, self.with_dice.to_string());
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// String key/value preference storage owned by the presentation layer
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

/// In-memory store, for tests and headless play
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: FxHashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}
