//! Fetches and validates the dataset.
//!
//! The source serves eight lines, four per location:
//!
//! ```text
//! ROOM 07:15        <- location tag, HH:MM from char offset 5
//! 28.1C 65%         <- temperature and humidity
//! WBGT 25.3         <- heat index
//! level: 3          <- risk level digit at char offset 7
//! ```
//!
//! Lines 0..4 are indoor, 4..8 outdoor. These fixed offsets are a contract
//! with the data source and this module is the only place that knows them.

use heapless::String;

use crate::fault::{Fault, ParseFault};
use crate::model::{DATASET_LINES, Dataset, LINE_CAPACITY, Line, READING_LINES, Reading, RiskLevel, View};
use crate::traits::DatasetSource;

const LEVEL_OFFSET: usize = 7;
const HOUR_OFFSET: usize = 5;
const HOUR_LEN: usize = 2;
const LAST_HOUR: u8 = 23;

/// Performs one fetch and validates every numeric field.
pub async fn fetch_dataset<S: DatasetSource>(source: &mut S, buf: &mut [u8]) -> Result<Dataset, Fault> {
    log::info!("[FETCH] request data...");
    let len = source.fetch(buf).await?;
    let body = core::str::from_utf8(&buf[..len]).map_err(|_| ParseFault::NotUtf8)?;
    let dataset = parse_dataset(body)?;
    log::info!(
        "[FETCH] done: indoor {}, outdoor {}, hour {}",
        dataset.indoor().level(),
        dataset.outdoor().level(),
        dataset.hour()
    );
    Ok(dataset)
}

pub fn parse_dataset(body: &str) -> Result<Dataset, ParseFault> {
    let mut lines = [""; DATASET_LINES];
    let mut count = 0;
    for line in body.lines() {
        if count < DATASET_LINES {
            lines[count] = line;
        }
        count += 1;
    }
    if count != DATASET_LINES {
        return Err(ParseFault::LineCount(count));
    }

    let indoor = parse_reading(&lines, View::Indoor.first_line())?;
    let outdoor = parse_reading(&lines, View::Outdoor.first_line())?;
    let hour = parse_hour(lines[0])?;

    Ok(Dataset::new(indoor, outdoor, hour))
}

fn parse_reading(lines: &[&str; DATASET_LINES], first: usize) -> Result<Reading, ParseFault> {
    let level_line = first + READING_LINES - 1;
    let level = parse_level(lines[level_line], level_line)?;

    let mut block: [Line; READING_LINES] = Default::default();
    for (i, slot) in block.iter_mut().enumerate() {
        *slot = bounded(lines[first + i], first + i)?;
    }
    Ok(Reading::new(block, level))
}

fn bounded(text: &str, line: usize) -> Result<Line, ParseFault> {
    let mut out = String::<LINE_CAPACITY>::new();
    out.push_str(text).map_err(|_| ParseFault::LineTooLong { line })?;
    Ok(out)
}

/// Risk level from the digit at char offset 7.
pub fn parse_level(text: &str, line: usize) -> Result<RiskLevel, ParseFault> {
    let digit = text
        .chars()
        .nth(LEVEL_OFFSET)
        .and_then(|c| c.to_digit(10))
        .ok_or(ParseFault::NotANumber { line })? as u8;
    RiskLevel::new(digit).ok_or(ParseFault::LevelOutOfRange(digit))
}

/// Hour from the `HH` of the `HH:MM` that starts at char offset 5.
pub fn parse_hour(text: &str) -> Result<u8, ParseFault> {
    let not_a_number = ParseFault::NotANumber { line: 0 };

    let mut indices = text.char_indices().map(|(i, _)| i).skip(HOUR_OFFSET);
    let start = indices.next().ok_or(not_a_number)?;
    let end = indices.nth(HOUR_LEN - 1).unwrap_or(text.len());

    let hour = text[start..end]
        .trim()
        .parse::<u8>()
        .map_err(|_| not_a_number)?;
    if hour > LAST_HOUR {
        return Err(ParseFault::HourOutOfRange(hour));
    }
    Ok(hour)
}
