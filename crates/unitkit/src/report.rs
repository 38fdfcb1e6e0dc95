//! Result formatting
//!
//! The result contract is one line, `[<unit>|<action>] <message>`, plus a
//! process exit status. Engine failures never produce that line; they get
//! a diagnostic and [`ENGINE_FAILURE_EXIT_CODE`].

use crate::error::{ENGINE_FAILURE_EXIT_CODE, Error};
use crate::outcome::ExecutionOutcome;

/// Rendered result of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub line: String,
    pub exit_code: u8,
}

/// Build the report for an outcome
pub fn report(unit: &str, action: &str, outcome: &ExecutionOutcome) -> Report {
    Report {
        line: render(unit, action, outcome.message()),
        exit_code: exit_code(outcome),
    }
}

/// Render the result line
pub fn render(unit: &str, action: &str, message: &str) -> String {
    if message.is_empty() {
        prefix(unit, action)
    } else {
        format!("{} {}", prefix(unit, action), message)
    }
}

fn prefix(unit: &str, action: &str) -> String {
    format!("[{}|{}]", unit, action)
}

/// Recover the message from a rendered line for this unit and action
pub fn parse_line<'a>(unit: &str, action: &str, line: &'a str) -> Option<&'a str> {
    let rest = line.trim_end().strip_prefix(&prefix(unit, action))?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix(' ')
    }
}

/// Strip the result prefix from the first line of a remote sysunit's stdout.
/// Output without the prefix is returned unchanged.
pub fn strip_result_line(unit: &str, action: &str, stdout: &str) -> String {
    let (first, rest) = match stdout.split_once('\n') {
        Some((first, rest)) => (first, Some(rest)),
        None => (stdout, None),
    };

    match (parse_line(unit, action, first), rest) {
        (Some(message), Some(rest)) => format!("{}\n{}", message, rest),
        (Some(message), None) => message.to_string(),
        (None, _) => stdout.to_string(),
    }
}

/// Map an outcome to a process exit status.
///
/// Statuses are folded into a byte. A non-zero status that would read as
/// success, or collide with the reserved engine code, becomes 1.
pub fn exit_code(outcome: &ExecutionOutcome) -> u8 {
    if outcome.exit_code == 0 {
        return 0;
    }

    match (outcome.exit_code & 0xff) as u8 {
        0 => 1,
        code if code == ENGINE_FAILURE_EXIT_CODE => 1,
        code => code,
    }
}

/// Diagnostic text for an engine failure
pub fn diagnostic(err: &Error) -> String {
    format!("{}: {}", err.category().description(), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_hi() {
        let outcome = ExecutionOutcome::success("hiiii!\n");
        let report = report("hi", "apply", &outcome);
        assert_eq!(report.line, "[hi|apply] hiiii!");
        assert_eq!(report.exit_code, 0);
    }

    #[test]
    fn test_render_empty_message() {
        assert_eq!(render("hi", "apply", ""), "[hi|apply]");
    }

    #[test]
    fn test_action_failure_keeps_its_code() {
        let outcome = ExecutionOutcome::failure(3, "failed to install nope");
        let report = report("apk_install", "apply", &outcome);
        assert_eq!(report.line, "[apk_install|apply] failed to install nope");
        assert_eq!(report.exit_code, 3);
    }

    #[test]
    fn test_exit_code_never_collides_with_engine_code() {
        assert_eq!(exit_code(&ExecutionOutcome::failure(125, "x")), 1);
        assert_eq!(exit_code(&ExecutionOutcome::failure(256, "x")), 1);
        assert_eq!(exit_code(&ExecutionOutcome::failure(-1, "x")), 255);
        assert_eq!(exit_code(&ExecutionOutcome::failure(1, "x")), 1);
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("args", "apply", "[args|apply] hi bob"), Some("hi bob"));
        assert_eq!(parse_line("args", "apply", "[args|apply]\r"), Some(""));
        assert_eq!(parse_line("args", "apply", "[hi|apply] hiiii!"), None);
        assert_eq!(parse_line("args", "apply", "[args|apply]x"), None);
    }

    #[test]
    fn test_strip_result_line() {
        assert_eq!(strip_result_line("args", "apply", "[args|apply] hi bob\n"), "hi bob\n");
        assert_eq!(strip_result_line("args", "apply", "[args|apply] hi bob"), "hi bob");
        assert_eq!(strip_result_line("args", "apply", "plain output\n"), "plain output\n");
    }

    #[test]
    fn test_diagnostic_names_category() {
        let err = Error::UnitNotFound { name: "nope".into() };
        assert_eq!(diagnostic(&err), "Unit resolution failed: unit not found: nope");
    }
}
