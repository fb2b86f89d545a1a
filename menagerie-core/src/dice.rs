//! Dice: random faces, or a value derived from the board when dice are off

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::Color;
use crate::error::RulesError;

/// Wire encoding of the wild face
pub const WILD: i16 = -1;

/// A rolled value. Serialized as an integer: `-1` for wild, otherwise the color id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum DiceValue {
    /// Any color accepted
    Wild,
    Color(Color),
}

impl DiceValue {
    /// Whether a cell or pawn color satisfies this value
    pub fn accepts(&self, color: Color) -> bool {
        match self {
            DiceValue::Wild => true,
            DiceValue::Color(c) => *c == color,
        }
    }
}

impl TryFrom<i16> for DiceValue {
    type Error = RulesError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            WILD => Ok(DiceValue::Wild),
            v if (0..=Color::MAX as i16).contains(&v) => Ok(DiceValue::Color(v as Color)),
            v => Err(RulesError::InvalidDiceValue(v)),
        }
    }
}

impl From<DiceValue> for i16 {
    fn from(value: DiceValue) -> Self {
        match value {
            DiceValue::Wild => WILD,
            DiceValue::Color(c) => c as i16,
        }
    }
}

/// Classic face set: two wild faces and four colors
pub fn default_faces() -> Vec<DiceValue> {
    vec![
        DiceValue::Wild,
        DiceValue::Wild,
        DiceValue::Color(0),
        DiceValue::Color(1),
        DiceValue::Color(2),
        DiceValue::Color(3),
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiceMode {
    /// Roll a random face each turn
    Random,
    /// No randomness: the value is set from the board at the end of each turn
    Derived,
}

#[derive(Clone, Debug)]
pub struct Dice {
    mode: DiceMode,
    faces: Vec<DiceValue>,
    value: Option<DiceValue>,
}

impl Dice {
    pub fn new(mode: DiceMode, faces: Vec<DiceValue>) -> Self {
        let value = match mode {
            DiceMode::Random => None,
            DiceMode::Derived => Some(DiceValue::Wild),
        };
        Self { mode, faces, value }
    }

    pub fn mode(&self) -> DiceMode {
        self.mode
    }

    pub fn faces(&self) -> &[DiceValue] {
        &self.faces
    }

    pub fn value(&self) -> Option<DiceValue> {
        self.value
    }

    pub fn set_value(&mut self, value: Option<DiceValue>) {
        self.value = value;
    }

    /// Roll. In derived mode the value is fixed by the board, so this only
    /// fills in wild if nothing has been derived yet.
    pub fn roll<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<DiceValue> {
        match self.mode {
            DiceMode::Random => {
                self.value = self.faces.choose(rng).copied();
            }
            DiceMode::Derived => {
                self.value.get_or_insert(DiceValue::Wild);
            }
        }
        self.value
    }

    /// Value for the next team once a turn ends. `last_cell` is the color
    /// under the previous move's destination.
    pub fn next_turn(&mut self, last_cell: Option<Color>) {
        self.value = match self.mode {
            DiceMode::Random => None,
            DiceMode::Derived => Some(last_cell.map_or(DiceValue::Wild, DiceValue::Color)),
        };
    }

    /// Distinct faces, in face-set order
    pub fn distinct_faces(&self) -> Vec<DiceValue> {
        let mut seen = Vec::with_capacity(self.faces.len());
        for face in &self.faces {
            if !seen.contains(face) {
                seen.push(*face);
            }
        }
        seen
    }
}
