//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Description                                          |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad args, bad layout file)              |
//! | 3    | I/O error (unreadable workbook, unwritable output)   |
//! | 4    | Reference could not be resolved                      |
//! | 5    | Formula outside the supported grammar                |
//! | 6    | Circular reference                                   |
//! | 7    | Internal invariant violated                          |
//! | 8    | Generated program failed (or its inputs are wrong)   |

use sheetc_engine::error::TranspileError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid layout configuration.
pub const EXIT_USAGE: u8 = 2;

/// Workbook, layout or program file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Unknown defined name, missing sheet, malformed reference.
pub const EXIT_RESOLUTION: u8 = 4;

/// Unsupported construct, or a formula that does not parse.
pub const EXIT_UNSUPPORTED: u8 = 5;

/// Circular reference between cells.
pub const EXIT_CYCLE: u8 = 6;

/// Internal invariant violated (e.g. two cells sharing a variable name).
pub const EXIT_STRUCTURAL: u8 = 7;

/// The generated program exited non-zero, printed something that is not a
/// result document, or its report directory has the wrong file count.
pub const EXIT_RUN_FAILED: u8 = 8;

/// Map a TranspileError to its exit code.
pub fn transpile_exit_code(err: &TranspileError) -> u8 {
    match err {
        TranspileError::Resolution { .. } => EXIT_RESOLUTION,
        TranspileError::Unsupported { .. } | TranspileError::Parse { .. } | TranspileError::Tokenize { .. } => {
            EXIT_UNSUPPORTED
        }
        TranspileError::Cycle { .. } => EXIT_CYCLE,
        TranspileError::Structural(_) => EXIT_STRUCTURAL,
        TranspileError::Config(_) => EXIT_USAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_RESOLUTION,
            EXIT_UNSUPPORTED,
            EXIT_CYCLE,
            EXIT_STRUCTURAL,
            EXIT_RUN_FAILED,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn test_transpile_exit_code() {
        assert_eq!(transpile_exit_code(&TranspileError::unsupported("array")), EXIT_UNSUPPORTED);
        assert_eq!(transpile_exit_code(&TranspileError::parse("missing )")), EXIT_UNSUPPORTED);
        assert_eq!(transpile_exit_code(&TranspileError::resolution("Foo", "unknown name")), EXIT_RESOLUTION);
        assert_eq!(transpile_exit_code(&TranspileError::Cycle { chain: vec![] }), EXIT_CYCLE);
        assert_eq!(transpile_exit_code(&TranspileError::Config("bad".into())), EXIT_USAGE);
    }
}
