//! Text calendar export consumed by the weekly plotter.
use std::collections::BTreeMap;
use std::io::Write;

use lazy_static::lazy_static;

use crate::config::{Timeslot, TimetableConfig};
use crate::data::{CourseId, DataProvider, RoomId};
use crate::error::{Result, TimetableError};
use crate::schedule::FilteredEntry;

lazy_static! {
    pub static ref DAY_NAMES: Vec<&'static str> =
        vec!["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

    /// Colours handed out to courses in order of first appearance.
    pub static ref PALETTE: Vec<&'static str> = vec![
        "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
        "#bcbd22", "#17becf", "#aec7e8", "#ffbb78", "#98df8a", "#ff9896", "#c5b0d5", "#c49c94",
    ];
}

/// Display name of a day index; days past Sunday are numbered.
pub fn day_name(day: u32) -> String {
    DAY_NAMES
        .get(day as usize)
        .map(|d| d.to_string())
        .unwrap_or_else(|| format!("Day {}", day + 1))
}

/// One contiguous run of a course in a room on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarBlock {
    pub course: CourseId,
    pub room: RoomId,
    pub name: String,
    pub day: u32,
    /// First and one-past-last slot within the day.
    pub start: u32,
    pub end: u32,
    pub color: String,
}

impl CalendarBlock {
    pub fn time_range(&self, config: &TimetableConfig) -> String {
        format!(
            "{}:00 - {}:00",
            config.start_hour + self.start,
            config.start_hour + self.end
        )
    }
}

/// Groups contiguous same-course/same-room timeslots of one day into blocks,
/// ordered by day, then start, then course.
pub fn calendar_blocks(
    entries: &[FilteredEntry],
    provider: &impl DataProvider,
    config: &TimetableConfig,
) -> Result<Vec<CalendarBlock>> {
    let mut runs: BTreeMap<(CourseId, RoomId), Vec<Timeslot>> = BTreeMap::new();
    for e in entries {
        runs.entry((e.course, e.room)).or_default().push(e.timeslot);
    }

    let mut colors: BTreeMap<CourseId, String> = BTreeMap::new();
    for e in entries {
        let next = colors.len() % PALETTE.len();
        colors.entry(e.course).or_insert_with(|| PALETTE[next].to_string());
    }

    let mut blocks = Vec::new();
    for ((course, room), mut slots) in runs {
        slots.sort_unstable();
        slots.dedup();
        let name = format!("{} ({})", provider.course_name(course)?, provider.room_name(room)?);
        let color = colors.get(&course).cloned().unwrap_or_default();

        let mut iter = slots.into_iter();
        let Some(first) = iter.next() else { continue };
        let (mut start, mut last) = (first, first);
        let close = |start: Timeslot, last: Timeslot| CalendarBlock {
            course,
            room,
            name: name.clone(),
            day: config.day_of(start),
            start: config.slot_in_day(start),
            end: config.slot_in_day(last) + 1,
            color: color.clone(),
        };
        for t in iter {
            if t == last + 1 && config.day_of(t) == config.day_of(start) {
                last = t;
            } else {
                blocks.push(close(start, last));
                start = t;
                last = t;
            }
        }
        blocks.push(close(start, last));
    }
    blocks.sort_by_key(|b| (b.day, b.start, b.course, b.room));
    Ok(blocks)
}

/// Writes blocks as name / day / `H:MM - H:MM` / colour lines, blocks
/// separated by an empty line.
pub fn write_calendar_text(
    blocks: &[CalendarBlock],
    config: &TimetableConfig,
    out: &mut impl Write,
) -> Result<()> {
    let io = |e: std::io::Error| TimetableError::Storage(format!("calendar export failed: {e}"));
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            writeln!(out).map_err(io)?;
        }
        writeln!(out, "{}", block.name).map_err(io)?;
        writeln!(out, "{}", day_name(block.day)).map_err(io)?;
        writeln!(out, "{}", block.time_range(config)).map_err(io)?;
        writeln!(out, "{}", block.color).map_err(io)?;
    }
    Ok(())
}
