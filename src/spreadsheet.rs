//! Workbook import/export: the dataset as six sheets, and the solved
//! timetable as day x hour grids.
use std::collections::BTreeMap;
use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet, XlsxError};
use umya_spreadsheet::Worksheet as InputSheet;

use crate::calendar::{PALETTE, calendar_blocks, day_name};
use crate::config::TimetableConfig;
use crate::data::{
    Course, CourseProgramme, DataProvider, Dataset, Professor, Programme, Room, Session,
};
use crate::error::{Result, TimetableError};
use crate::schedule::{FilteredEntry, Schedule, ScheduleFilter};

const PROFESSORS: (&str, &[&str]) = ("Professors", &["id", "name"]);
const COURSES: (&str, &[&str]) = ("Courses", &["id", "professor", "name"]);
const SESSIONS: (&str, &[&str]) = ("Sessions", &["id", "hours", "course"]);
const PROGRAMMES: (&str, &[&str]) = ("Programmes", &["id", "name", "students"]);
const MEMBERSHIPS: (&str, &[&str]) = ("CourseProgrammes", &["course", "programme"]);
const ROOMS: (&str, &[&str]) = ("Rooms", &["id", "capacity", "name"]);

fn xlsx_err(e: XlsxError) -> TimetableError {
    TimetableError::Storage(format!("xlsx export failed: {e}"))
}

/// Rows of one input sheet below its header row.
struct SheetRows<'a> {
    name: &'static str,
    sheet: &'a InputSheet,
}

impl<'a> SheetRows<'a> {
    fn open(book: &'a umya_spreadsheet::Spreadsheet, name: &'static str) -> Result<Self> {
        let sheet = book
            .get_sheet_by_name(name)
            .ok_or_else(|| TimetableError::DataAccess(format!("workbook has no '{name}' sheet")))?;
        Ok(Self { name, sheet })
    }

    /// Row numbers (1-based) of non-empty data rows.
    fn rows(&self) -> impl Iterator<Item = u32> + '_ {
        (2..=self.sheet.get_highest_row()).filter(|&row| !self.sheet.get_value((1, row)).trim().is_empty())
    }

    fn text(&self, col: u32, row: u32) -> String {
        self.sheet.get_value((col, row)).trim().to_string()
    }

    fn number(&self, col: u32, row: u32) -> Result<u32> {
        let raw = self.text(col, row);
        raw.parse::<f64>()
            .ok()
            .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as u32)
            .ok_or_else(|| {
                TimetableError::DataAccess(format!(
                    "sheet '{}' row {row} column {col}: expected a non-negative integer, found '{raw}'",
                    self.name
                ))
            })
    }
}

impl Dataset {
    /// Reads the six dataset sheets; the first row of each sheet is a header.
    pub fn from_xlsx(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let book = umya_spreadsheet::reader::xlsx::read(path)
            .map_err(|e| TimetableError::DataAccess(format!("cannot open {}: {e:?}", path.display())))?;

        let mut dataset = Dataset::default();

        let sheet = SheetRows::open(&book, PROFESSORS.0)?;
        for row in sheet.rows() {
            dataset.professors.push(Professor { id: sheet.number(1, row)?, name: sheet.text(2, row) });
        }
        let sheet = SheetRows::open(&book, COURSES.0)?;
        for row in sheet.rows() {
            dataset.courses.push(Course {
                id: sheet.number(1, row)?,
                professor: sheet.number(2, row)?,
                name: sheet.text(3, row),
            });
        }
        let sheet = SheetRows::open(&book, SESSIONS.0)?;
        for row in sheet.rows() {
            dataset.sessions.push(Session {
                id: sheet.number(1, row)?,
                hours: sheet.number(2, row)?,
                course: sheet.number(3, row)?,
            });
        }
        let sheet = SheetRows::open(&book, PROGRAMMES.0)?;
        for row in sheet.rows() {
            dataset.programmes.push(Programme {
                id: sheet.number(1, row)?,
                name: sheet.text(2, row),
                students: sheet.number(3, row)?,
            });
        }
        let sheet = SheetRows::open(&book, MEMBERSHIPS.0)?;
        for row in sheet.rows() {
            dataset.memberships.push(CourseProgramme {
                course: sheet.number(1, row)?,
                programme: sheet.number(2, row)?,
            });
        }
        let sheet = SheetRows::open(&book, ROOMS.0)?;
        for row in sheet.rows() {
            dataset.rooms.push(Room {
                id: sheet.number(1, row)?,
                capacity: sheet.number(2, row)?,
                name: sheet.text(3, row),
            });
        }
        Ok(dataset)
    }

    /// Writes the dataset in the layout `from_xlsx` reads. An empty dataset
    /// gives a template with headers only.
    pub fn write_xlsx(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();

        write_rows(&mut workbook, PROFESSORS, &header, &self.professors, |p| {
            vec![Cell::Num(p.id), Cell::Text(&p.name)]
        })?;
        write_rows(&mut workbook, COURSES, &header, &self.courses, |c| {
            vec![Cell::Num(c.id), Cell::Num(c.professor), Cell::Text(&c.name)]
        })?;
        write_rows(&mut workbook, SESSIONS, &header, &self.sessions, |s| {
            vec![Cell::Num(s.id), Cell::Num(s.hours), Cell::Num(s.course)]
        })?;
        write_rows(&mut workbook, PROGRAMMES, &header, &self.programmes, |p| {
            vec![Cell::Num(p.id), Cell::Text(&p.name), Cell::Num(p.students)]
        })?;
        write_rows(&mut workbook, MEMBERSHIPS, &header, &self.memberships, |m| {
            vec![Cell::Num(m.course), Cell::Num(m.programme)]
        })?;
        write_rows(&mut workbook, ROOMS, &header, &self.rooms, |r| {
            vec![Cell::Num(r.id), Cell::Num(r.capacity), Cell::Text(&r.name)]
        })?;

        workbook.save(path.as_ref()).map_err(xlsx_err)
    }
}

enum Cell<'a> {
    Num(u32),
    Text(&'a str),
}

fn write_rows<T>(
    workbook: &mut Workbook,
    (name, columns): (&str, &[&str]),
    header: &Format,
    rows: &[T],
    cells: impl Fn(&T) -> Vec<Cell<'_>>,
) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name).map_err(xlsx_err)?;
    for (col, title) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, header).map_err(xlsx_err)?;
    }
    for (i, row) in rows.iter().enumerate() {
        for (col, cell) in cells(row).into_iter().enumerate() {
            let (r, c) = (i as u32 + 1, col as u16);
            let written = match cell {
                Cell::Num(v) => sheet.write_number(r, c, v as f64),
                Cell::Text(v) => sheet.write_string(r, c, v),
            };
            written.map_err(xlsx_err)?;
        }
    }
    Ok(())
}

fn hex_color(hex: &str) -> Color {
    u32::from_str_radix(hex.trim_start_matches('#'), 16)
        .map(Color::RGB)
        .unwrap_or(Color::White)
}

/// Excel sheet names: at most 31 characters, none of `[]:*?/\`.
fn sheet_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(31)
        .collect()
}

fn write_grid(
    sheet: &mut Worksheet,
    schedule: &Schedule,
    filter: Option<ScheduleFilter>,
    provider: &impl DataProvider,
    config: &TimetableConfig,
) -> Result<()> {
    let entries = match filter {
        Some(filter) => schedule.filtered(provider, filter)?,
        None => schedule
            .entries()
            .iter()
            .map(|e| {
                Ok(FilteredEntry {
                    timeslot: e.timeslot,
                    course: provider.course_of(e.session)?,
                    room: e.room,
                })
            })
            .collect::<Result<Vec<_>>>()?,
    };
    let blocks = calendar_blocks(&entries, provider, config)?;

    let header = Format::new().set_bold().set_align(FormatAlign::Center);
    sheet.set_column_width(0, 8).map_err(xlsx_err)?;
    for day in 0..config.days {
        let col = day as u16 + 1;
        sheet.set_column_width(col, 28).map_err(xlsx_err)?;
        sheet
            .write_string_with_format(0, col, day_name(day), &header)
            .map_err(xlsx_err)?;
    }
    for slot in 0..config.slots_per_day {
        sheet
            .write_string_with_format(slot + 1, 0, format!("{}:00", config.start_hour + slot), &header)
            .map_err(xlsx_err)?;
    }

    // Several blocks may share a cell when the view spans many rooms.
    let mut cells: BTreeMap<(u32, u32), (Vec<String>, String)> = BTreeMap::new();
    for block in &blocks {
        for slot in block.start..block.end {
            let cell = cells.entry((slot, block.day)).or_insert_with(|| (Vec::new(), block.color.clone()));
            cell.0.push(block.name.clone());
        }
    }
    for ((slot, day), (names, color)) in cells {
        let format = Format::new()
            .set_text_wrap()
            .set_background_color(hex_color(if names.len() > 1 { PALETTE[PALETTE.len() - 1] } else { color.as_str() }));
        sheet
            .write_string_with_format(slot + 1, day as u16 + 1, names.join("\n"), &format)
            .map_err(xlsx_err)?;
    }
    Ok(())
}

/// One "Timetable" sheet with every entry, then one sheet per programme.
pub fn write_schedule_xlsx(
    path: impl AsRef<Path>,
    schedule: &Schedule,
    provider: &impl DataProvider,
    config: &TimetableConfig,
) -> Result<()> {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Timetable").map_err(xlsx_err)?;
    write_grid(sheet, schedule, None, provider, config)?;

    for programme in provider.list_ids().programmes {
        let name = sheet_name(&format!("{} {}", programme, provider.programme_name(programme)?));
        let sheet = workbook.add_worksheet();
        sheet.set_name(&name).map_err(xlsx_err)?;
        write_grid(sheet, schedule, Some(ScheduleFilter::Programme(programme)), provider, config)?;
    }

    workbook.save(path.as_ref()).map_err(xlsx_err)
}
