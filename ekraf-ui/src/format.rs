//! Number and cell formatting for rendered tables (Indonesian style:
//! `.` groups thousands, `,` marks decimals).

use ekraf_core::query::{display_value, numeric_value};
use serde_json::Value;

/// Group the integer part in threes and keep at most two decimals.
pub fn format_number(value: f64) -> String {
    let negative = value < 0.0;
    let rounded = (value.abs() * 100.0).round() / 100.0;
    let whole = rounded.trunc() as u64;
    let cents = ((rounded - rounded.trunc()) * 100.0).round() as u64;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if cents > 0 {
        let decimals = format!("{:02}", cents);
        grouped.push(',');
        grouped.push_str(decimals.trim_end_matches('0'));
    }
    if negative && (whole > 0 || cents > 0) {
        grouped.insert(0, '-');
    }
    grouped
}

pub fn format_percent(value: f64) -> String {
    format!("{}%", format_number(value))
}

/// A cell as shown in a table: numeric columns grouped, nulls blank.
pub fn format_cell(value: Option<&Value>, numeric: bool) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) if numeric => numeric_value(v)
            .map(format_number)
            .unwrap_or_else(|| display_value(v)),
        Some(v) => display_value(v),
    }
}
