use crate::error::{FormError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref BOUND_REGEX: Regex = Regex::new(r"^([A-Za-z]*)([0-9]*)$").unwrap();
    static ref PLAIN_SHEET_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
}

/// One corner of an A1 range. `A2` has both parts, `J` only a column,
/// `5` only a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bound {
    pub col: Option<u32>,
    pub row: Option<u32>,
}

impl Bound {
    pub fn cell(col: u32, row: u32) -> Self {
        Bound {
            col: Some(col),
            row: Some(row),
        }
    }

    pub fn column(col: u32) -> Self {
        Bound {
            col: Some(col),
            row: None,
        }
    }

    fn parse(text: &str) -> Option<Self> {
        let caps = BOUND_REGEX.captures(text)?;
        let letters = caps.get(1).map_or("", |m| m.as_str());
        let digits = caps.get(2).map_or("", |m| m.as_str());

        if letters.is_empty() && digits.is_empty() {
            return None;
        }

        let col = if letters.is_empty() {
            None
        } else {
            Some(letter_to_col(&letters.to_ascii_uppercase())?)
        };
        let row = if digits.is_empty() {
            None
        } else {
            match digits.parse::<u32>().ok()? {
                0 => return None,
                n => Some(n),
            }
        };

        Some(Bound { col, row })
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = self.col {
            write!(f, "{}", col_to_letter(col))?;
        }
        if let Some(row) = self.row {
            write!(f, "{}", row)?;
        }
        Ok(())
    }
}

/// A rectangular block of a named sheet, e.g. `Data!A2:J`.
///
/// A missing row on the end bound means "to the last row with data", which is
/// how the open-ended data and id ranges are addressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Range {
    pub sheet: String,
    pub start: Bound,
    pub end: Option<Bound>,
}

impl Range {
    pub fn new(sheet: impl Into<String>, start: Bound, end: Option<Bound>) -> Self {
        Range {
            sheet: sheet.into(),
            start,
            end,
        }
    }

    /// Columns `first_col..=last_col` from `first_row` down to `last_row`,
    /// or to the end of the data when `last_row` is `None`.
    pub fn rows(
        sheet: impl Into<String>,
        first_col: u32,
        first_row: u32,
        last_col: u32,
        last_row: Option<u32>,
    ) -> Self {
        Range::new(
            sheet,
            Bound::cell(first_col, first_row),
            Some(Bound {
                col: Some(last_col),
                row: last_row,
            }),
        )
    }

    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || FormError::InvalidRange(text.to_string());

        let split = text.rfind('!').ok_or_else(invalid)?;
        let sheet = unquote_sheet(&text[..split]).ok_or_else(invalid)?;
        let cells = &text[split + 1..];

        let (start, end) = match cells.split_once(':') {
            Some((a, b)) => (
                Bound::parse(a).ok_or_else(invalid)?,
                Some(Bound::parse(b).ok_or_else(invalid)?),
            ),
            None => (Bound::parse(cells).ok_or_else(invalid)?, None),
        };

        Ok(Range { sheet, start, end })
    }

    pub fn first_row(&self) -> u32 {
        self.start.row.unwrap_or(1)
    }

    /// Last row of the block, `None` when the range is open-ended.
    pub fn last_row(&self) -> Option<u32> {
        match self.end {
            Some(end) => end.row,
            None => self.start.row,
        }
    }

    pub fn first_col(&self) -> u32 {
        self.start.col.unwrap_or(1)
    }

    /// Last column of the block, `None` when every column is included.
    pub fn last_col(&self) -> Option<u32> {
        match self.end {
            Some(end) => end.col,
            None => self.start.col,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", quote_sheet(&self.sheet), self.start)?;
        if let Some(end) = &self.end {
            write!(f, ":{}", end)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Range {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self> {
        Range::parse(s)
    }
}

/// Convert a 1-based column number to its letters (1 => A, 27 => AA).
pub fn col_to_letter(col: u32) -> String {
    let mut col = col;
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.push(((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result.chars().rev().collect()
}

/// Convert uppercase column letters to a 1-based column number.
///
/// `None` when the letters are not `A-Z` or the column does not fit a `u32`.
pub fn letter_to_col(letters: &str) -> Option<u32> {
    letters.chars().try_fold(0u32, |acc, c| {
        if !c.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)
    })
}

fn quote_sheet(name: &str) -> String {
    if PLAIN_SHEET_REGEX.is_match(name) {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

fn unquote_sheet(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    if let Some(inner) = raw.strip_prefix('\'') {
        let inner = inner.strip_suffix('\'')?;
        return Some(inner.replace("''", "'"));
    }
    Some(raw.to_string())
}
