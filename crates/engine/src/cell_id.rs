//! Cell identity for code generation.
//!
//! A `CellId` uniquely identifies a cell across all sheets in a workbook.
//! Its variable name is a pure function of the id, which is what lets the
//! code generator memoize on either.

use std::fmt;

/// Largest row count a worksheet can address (Excel 2007+).
pub const MAX_ROWS: usize = 1_048_576;
/// Largest column count a worksheet can address (Excel 2007+).
pub const MAX_COLS: usize = 16_384;

/// Unique identifier for a cell in a workbook.
///
/// Combines the sheet name with 0-based row/column coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    /// Title of the sheet this cell belongs to
    pub sheet: String,
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
}

impl CellId {
    /// Create a new CellId.
    #[inline]
    pub fn new(sheet: impl Into<String>, row: usize, col: usize) -> Self {
        Self { sheet: sheet.into(), row, col }
    }

    /// Parse an unqualified A1 coordinate (absolute markers allowed) on `sheet`.
    pub fn from_a1(sheet: impl Into<String>, coord: &str) -> Option<Self> {
        let (row, col) = parse_a1(coord)?;
        Some(Self::new(sheet, row, col))
    }

    /// The coordinate part, e.g. "C4".
    pub fn coordinate(&self) -> String {
        format!("{}{}", col_to_letters(self.col), self.row + 1)
    }

    /// Same sheet, shifted by `rows` rows.
    pub fn offset_rows(&self, rows: usize) -> Self {
        Self::new(self.sheet.clone(), self.row + rows, self.col)
    }

    /// Variable name bound to this cell in the generated program.
    ///
    /// `report!$C$4` and `report!C4` both map to `report_C4`. Characters that
    /// cannot appear in an identifier (spaces, dashes, ...) become `_`.
    pub fn var_name(&self) -> String {
        let mut name = String::with_capacity(self.sheet.len() + 8);
        for ch in self.sheet.chars() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                name.push(ch);
            } else {
                name.push('_');
            }
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            name.insert(0, '_');
        }
        name.push('_');
        name.push_str(&self.coordinate());
        name
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.coordinate())
    }
}

/// Convert 0-based column index to Excel-style letter(s).
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Convert Excel-style column letters to a 0-based index ("A" = 0, "AA" = 26).
pub fn letters_to_col(letters: &str) -> Option<usize> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    let col = col - 1;
    if col >= MAX_COLS {
        return None;
    }
    Some(col)
}

/// Parse an A1 coordinate like "B5" or "$B$5" into 0-based (row, col).
///
/// Returns None for anything that is not exactly letters followed by digits,
/// or that lies outside the sheet limits.
pub fn parse_a1(coord: &str) -> Option<(usize, usize)> {
    let stripped: String = coord.trim().chars().filter(|c| *c != '$').collect();
    let split = stripped.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = stripped.split_at(split);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let col = letters_to_col(letters)?;
    let row: usize = digits.parse().ok()?;
    if row == 0 || row > MAX_ROWS {
        return None;
    }
    Some((row - 1, col))
}

/// Inclusive column range by letters, e.g. ("Y", "AC") -> [Y, Z, AA, AB, AC].
pub fn col_range(first: &str, last: &str) -> Option<Vec<String>> {
    let begin = letters_to_col(first)?;
    let end = letters_to_col(last)?;
    Some((begin..=end).map(col_to_letters).collect())
}
