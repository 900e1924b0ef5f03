//! CSV rendering for `GET /api/export`.
//!
//! The document starts with a UTF-8 byte-order mark so spreadsheet tools
//! detect the encoding, followed by a `Name,Timestamp` header and one row
//! per submission.

use std::fmt::Write as _;

use charge_types::Submission;
use chrono::SecondsFormat;

/// Byte-order mark prefix.
pub const UTF8_BOM: char = '\u{FEFF}';

/// Suggested download file name.
pub const EXPORT_FILE_NAME: &str = "submissions.csv";

/// Render submissions as a CSV document.
pub fn render_csv(submissions: &[Submission]) -> String {
    let mut out = String::new();
    out.push(UTF8_BOM);
    out.push_str("Name,Timestamp\r\n");
    for submission in submissions {
        let _ = write!(
            out,
            "{},{}\r\n",
            escape_field(&submission.name),
            submission
                .submitted_at
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        );
    }
    out
}

/// Quote a field if it contains a delimiter, quote, or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
