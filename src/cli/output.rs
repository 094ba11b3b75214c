//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print failure status (red X, indented)
pub fn failure(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print a changed value (label, old → new)
pub fn change(label: &str, before: &str, after: &str) {
    if before == after {
        println!("  {} {}", label, after);
    } else {
        println!("  {} {} → {}", label, before.dimmed(), after.green());
    }
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Format an optional result with fixed precision; `-` when absent.
pub fn format_result(result: Option<f64>, precision: usize) -> String {
    match result {
        Some(value) => format_value(value, precision),
        None => "-".to_string(),
    }
}

/// Fixed precision with trailing zeros trimmed: `6.0000` → `6`, `0.5000` → `0.5`.
pub fn format_value(value: f64, precision: usize) -> String {
    let text = format!("{:.*}", precision, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.');
        if trimmed == "-0" {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(6.0, 4, "6")]
    #[case(0.5, 4, "0.5")]
    #[case(1.0 / 3.0, 2, "0.33")]
    #[case(-0.00001, 2, "0")]
    #[case(25.0, 0, "25")]
    fn test_format_value(#[case] value: f64, #[case] precision: usize, #[case] expected: &str) {
        assert_eq!(format_value(value, precision), expected);
    }

    #[test]
    fn test_format_missing_result() {
        assert_eq!(format_result(None, 3), "-");
    }
}
