//! Roast-level categories for the two classification schemes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Specialty-leaning bins
    #[default]
    Gourmet,
    /// Bins shifted darker for commercial blends
    Commercial,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Gourmet => "gourmet",
            Scheme::Commercial => "commercial",
        }
    }

    /// Bins ordered from highest minimum down to the floor.
    pub fn table(&self) -> &'static [Category; 7] {
        match self {
            Scheme::Gourmet => &GOURMET,
            Scheme::Commercial => &COMMERCIAL,
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scheme {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gourmet" => Ok(Scheme::Gourmet),
            "commercial" => Ok(Scheme::Commercial),
            other => Err(format!("unknown scheme '{other}' (gourmet|commercial)")),
        }
    }
}

/// One bin of a scheme table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Category {
    pub name: &'static str,
    /// Inclusive lower bound; `None` marks the floor bin
    pub min: Option<f64>,
    /// Display color, `#rrggbb`
    pub color: &'static str,
    pub description: &'static str,
}

const fn bin(
    name: &'static str,
    min: Option<f64>,
    color: &'static str,
    description: &'static str,
) -> Category {
    Category {
        name,
        min,
        color,
        description,
    }
}

const NAMES: [&str; 7] = [
    "Very Light",
    "Light",
    "Medium-Light",
    "Medium",
    "Medium-Dark",
    "Dark",
    "Very Dark",
];
const COLORS: [&str; 7] = [
    "#f59e0b", "#fb923c", "#f97316", "#ea580c", "#b45309", "#92400e", "#7c2d12",
];
const NOTES: [&str; 7] = [
    "bright acidity, tea-like body, pronounced origin character",
    "crisp acidity with fruit and floral notes",
    "balanced sweetness, acidity still present",
    "caramel sweetness, rounder body",
    "bittersweet chocolate, heavier body, oils starting",
    "roast-forward, smoky, low acidity",
    "charred and bitter, origin character gone",
];

static GOURMET: [Category; 7] = [
    bin(NAMES[0], Some(75.0), COLORS[0], NOTES[0]),
    bin(NAMES[1], Some(65.0), COLORS[1], NOTES[1]),
    bin(NAMES[2], Some(55.0), COLORS[2], NOTES[2]),
    bin(NAMES[3], Some(45.0), COLORS[3], NOTES[3]),
    bin(NAMES[4], Some(35.0), COLORS[4], NOTES[4]),
    bin(NAMES[5], Some(25.0), COLORS[5], NOTES[5]),
    bin(NAMES[6], None, COLORS[6], NOTES[6]),
];

static COMMERCIAL: [Category; 7] = [
    bin(NAMES[0], Some(65.0), COLORS[0], NOTES[0]),
    bin(NAMES[1], Some(55.0), COLORS[1], NOTES[1]),
    bin(NAMES[2], Some(47.0), COLORS[2], NOTES[2]),
    bin(NAMES[3], Some(40.0), COLORS[3], NOTES[3]),
    bin(NAMES[4], Some(32.0), COLORS[4], NOTES[4]),
    bin(NAMES[5], Some(25.0), COLORS[5], NOTES[5]),
    bin(NAMES[6], None, COLORS[6], NOTES[6]),
];

/// First bin whose minimum the score reaches; the floor catches the rest
/// (NaN included).
pub fn classify(score: f64, scheme: Scheme) -> &'static Category {
    let table = scheme.table();
    table
        .iter()
        .find(|c| c.min.is_some_and(|m| score >= m))
        .unwrap_or(&table[table.len() - 1])
}
