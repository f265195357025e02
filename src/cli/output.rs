//! Handles all user-facing output for the CLI.
//!
//! Status lines are colorized through termcolor; errors go through miette
//! (see [`crate::errors::print_error`]).

use std::io::Write;

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

// ============================================================================
// STATUS LINES
// ============================================================================

pub fn print_success(message: &str) {
    print_colored(message, Color::Green);
}

pub fn print_warning(message: &str) {
    print_colored(message, Color::Yellow);
}

fn print_colored(message: &str, color: Color) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = writeln!(stderr, "{message}");
    let _ = stderr.reset();
}

// ============================================================================
// DIFFS
// ============================================================================

/// Prints a line diff of `expected` against `actual` to stderr.
pub fn print_diff(expected: &str, actual: &str, choice: ColorChoice) {
    let mut stderr = StandardStream::stderr(choice);
    let changeset = Changeset::new(expected, actual, "\n");
    write_diff(&mut stderr, &changeset.diffs);
    let _ = stderr.reset();
}

fn write_diff(out: &mut impl WriteColor, diffs: &[Difference]) {
    for diff in diffs {
        let (prefix, color, text) = match diff {
            Difference::Same(text) => (' ', None, text),
            Difference::Add(text) => ('+', Some(Color::Green), text),
            Difference::Rem(text) => ('-', Some(Color::Red), text),
        };
        let _ = out.set_color(ColorSpec::new().set_fg(color));
        for line in text.lines() {
            let _ = writeln!(out, "    {prefix}{line}");
        }
    }
}
