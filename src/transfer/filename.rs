//! Output file naming.
//!
//! The printer stores whatever it receives under the multipart file name, so
//! the name always carries the `.gcode` extension and never a directory.

use std::path::Path;

/// Extension of every uploaded file.
pub const OUTPUT_EXTENSION: &str = "gcode";

/// Base name used when neither a suggestion nor a job name is available.
const FALLBACK_BASE_NAME: &str = "untitled";

/// Compute the output file name for a transfer.
///
/// A suggested name has its directory stripped and its extension replaced;
/// without one the job name is used as the base.
///
/// ```
/// use wireless_print::transfer::output_file_name;
///
/// assert_eq!(output_file_name(Some("model.3mf"), "ignored"), "model.gcode");
/// assert_eq!(output_file_name(None, "MyPart"), "MyPart.gcode");
/// ```
pub fn output_file_name(suggested: Option<&str>, job_name: &str) -> String {
    let suggested = suggested
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| Path::new(s).file_name());

    match suggested {
        Some(file_name) => Path::new(file_name)
            .with_extension(OUTPUT_EXTENSION)
            .to_string_lossy()
            .into_owned(),
        None => {
            let base = job_name.trim().replace(['/', '\\'], "_");
            let base = if base.is_empty() {
                FALLBACK_BASE_NAME
            } else {
                base.as_str()
            };
            format!("{}.{}", base, OUTPUT_EXTENSION)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_extension_replaced() {
        assert_eq!(output_file_name(Some("model.3mf"), "MyPart"), "model.gcode");
        assert_eq!(output_file_name(Some("a.tar.gz"), "x"), "a.tar.gcode");
    }

    #[test]
    fn test_suggestion_without_extension() {
        assert_eq!(output_file_name(Some("model"), "x"), "model.gcode");
        assert_eq!(output_file_name(Some("model.gcode"), "x"), "model.gcode");
    }

    #[test]
    fn test_suggestion_directory_stripped() {
        assert_eq!(
            output_file_name(Some("/home/me/prints/bracket.stl"), "x"),
            "bracket.gcode"
        );
    }

    #[test]
    fn test_job_name_fallback() {
        assert_eq!(output_file_name(None, "MyPart"), "MyPart.gcode");
        assert_eq!(output_file_name(Some("   "), "MyPart"), "MyPart.gcode");
        assert_eq!(output_file_name(Some(".."), "MyPart"), "MyPart.gcode");
    }

    #[test]
    fn test_job_name_sanitized() {
        assert_eq!(output_file_name(None, "a/b"), "a_b.gcode");
        assert_eq!(output_file_name(None, ""), "untitled.gcode");
    }
}
