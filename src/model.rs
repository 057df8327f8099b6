// Model of the data shown by the terminal

use heapless::String;

/// Longest line accepted from the data source, in bytes.
pub const LINE_CAPACITY: usize = 48;
/// Lines in one fetched dataset (indoor block then outdoor block).
pub const DATASET_LINES: usize = 8;
/// Lines in one location block.
pub const READING_LINES: usize = 4;

pub type Line = String<LINE_CAPACITY>;

/// WBGT risk level, 0 (safe) to 5 (danger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RiskLevel(u8);

impl RiskLevel {
    pub const MIN: RiskLevel = RiskLevel(0);
    pub const MAX: RiskLevel = RiskLevel(5);

    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn is_max(self) -> bool {
        self.0 == Self::MAX.0
    }
}

impl core::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX.0)
    }
}

/// Which half of the dataset is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Indoor,
    Outdoor,
}

impl View {
    pub const fn from_outdoor_flag(outdoor: bool) -> Self {
        if outdoor { View::Outdoor } else { View::Indoor }
    }

    /// Index of the first dataset line belonging to this view.
    pub const fn first_line(self) -> usize {
        match self {
            View::Indoor => 0,
            View::Outdoor => READING_LINES,
        }
    }
}

/// One location's snapshot: location tag + time, temperature/humidity,
/// heat index, and the risk line the level was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    lines: [Line; READING_LINES],
    level: RiskLevel,
}

impl Reading {
    pub fn new(lines: [Line; READING_LINES], level: RiskLevel) -> Self {
        Self { lines, level }
    }

    pub fn level(&self) -> RiskLevel {
        self.level
    }

    pub fn raw_lines(&self) -> &[Line; READING_LINES] {
        &self.lines
    }

    pub fn lines(&self) -> [&str; READING_LINES] {
        [
            self.lines[0].as_str(),
            self.lines[1].as_str(),
            self.lines[2].as_str(),
            self.lines[3].as_str(),
        ]
    }

    pub fn label_and_time(&self) -> &str {
        &self.lines[0]
    }

    pub fn temperature_humidity(&self) -> &str {
        &self.lines[1]
    }

    pub fn heat_index(&self) -> &str {
        &self.lines[2]
    }
}

/// Result of one fetch cycle. Immutable until the next fetch replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    indoor: Reading,
    outdoor: Reading,
    hour: u8,
}

impl Dataset {
    pub fn new(indoor: Reading, outdoor: Reading, hour: u8) -> Self {
        Self {
            indoor,
            outdoor,
            hour,
        }
    }

    pub fn indoor(&self) -> &Reading {
        &self.indoor
    }

    pub fn outdoor(&self) -> &Reading {
        &self.outdoor
    }

    /// Hour of day taken from the indoor time stamp.
    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn reading(&self, view: View) -> &Reading {
        match view {
            View::Indoor => &self.indoor,
            View::Outdoor => &self.outdoor,
        }
    }
}
