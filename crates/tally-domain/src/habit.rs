//! Domain types for habits and their daily completions.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring activity the user marks as done once per calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Habit {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: HabitColor,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    pub fn new(name: impl Into<String>, description: impl Into<String>, color: HabitColor) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            color,
            created_at: Utc::now(),
        }
    }
}

/// Records that a habit was done on one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitCompletion {
    pub id: Uuid,
    pub habit_id: Uuid,
    pub completed_on: NaiveDate,
}

impl HabitCompletion {
    pub fn new(habit_id: Uuid, completed_on: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            habit_id,
            completed_on,
        }
    }
}

/// Display colour attached to a habit, stored as packed ARGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HabitColor(u32);

impl HabitColor {
    /// Preset colours offered when creating a habit.
    pub const PALETTE: [HabitColor; 5] = [
        HabitColor(0xFF62_00EE),
        HabitColor(0xFF03_DAC5),
        HabitColor(0xFFBB_86FC),
        HabitColor(0xFF01_8786),
        HabitColor(0xFFCF_6679),
    ];

    pub const fn from_argb(argb: u32) -> Self {
        Self(argb)
    }

    pub fn argb(self) -> u32 {
        self.0
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Accepts `#RRGGBB` (opaque) or `#AARRGGBB`, case insensitive.
    pub fn parse(value: &str) -> Result<Self, ColorParseError> {
        let invalid = || ColorParseError(value.to_string());
        let hex = value.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let raw = u32::from_str_radix(hex, 16).map_err(|_| invalid())?;
        match hex.len() {
            6 => Ok(Self(0xFF00_0000 | raw)),
            8 => Ok(Self(raw)),
            _ => Err(invalid()),
        }
    }
}

impl Default for HabitColor {
    fn default() -> Self {
        Self::PALETTE[0]
    }
}

impl fmt::Display for HabitColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

impl FromStr for HabitColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HabitColor {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HabitColor> for String {
    fn from(color: HabitColor) -> Self {
        color.to_string()
    }
}

/// Raised when a colour string is not `#RRGGBB` or `#AARRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid habit colour `{}`", self.0)
    }
}

impl std::error::Error for ColorParseError {}
