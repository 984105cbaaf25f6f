//! Text rendering of sizes, permissions and dates for listings and labels.

use time::format_description::{self, FormatItem};
use time::OffsetDateTime;

use crate::core::config::types::{PermissionDisplayMode, SizeDisplayMode};

pub const DEFAULT_DATE_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]";

fn group_digits(size: u64, separator: char) -> String {
    let digits = size.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

pub fn size_to_string(size: u64, mode: SizeDisplayMode) -> String {
    match mode {
        SizeDisplayMode::Plain => size.to_string(),
        SizeDisplayMode::Locale => group_digits(size, ','),
        SizeDisplayMode::Grouped => group_digits(size, ' '),
        SizeDisplayMode::Powered => {
            const UNITS: [&str; 5] = ["kB", "MB", "GB", "TB", "PB"];
            if size < 1024 {
                return format!("{size} B");
            }
            let mut value = size as f64 / 1024.0;
            let mut unit = 0;
            while value >= 1024.0 && unit + 1 < UNITS.len() {
                value /= 1024.0;
                unit += 1;
            }
            format!("{:.1} {}", value, UNITS[unit])
        }
    }
}

pub fn permissions_to_string(permissions: u32, mode: PermissionDisplayMode) -> String {
    match mode {
        PermissionDisplayMode::Number => format!("{:03o}", permissions & 0o7777),
        PermissionDisplayMode::Text => {
            let bit = |mask: u32, c: char| if permissions & mask != 0 { c } else { '-' };
            let exec = |x: u32, special: u32, set: char, unset: char| {
                match (permissions & x != 0, permissions & special != 0) {
                    (true, true) => set,
                    (false, true) => unset,
                    (true, false) => 'x',
                    (false, false) => '-',
                }
            };
            [
                bit(0o400, 'r'),
                bit(0o200, 'w'),
                exec(0o100, 0o4000, 's', 'S'),
                bit(0o040, 'r'),
                bit(0o020, 'w'),
                exec(0o010, 0o2000, 's', 'S'),
                bit(0o004, 'r'),
                bit(0o002, 'w'),
                exec(0o001, 0o1000, 't', 'T'),
            ]
            .iter()
            .collect()
        }
    }
}

/// Parses a `time` format description, e.g. `[year]-[month]-[day]`.
pub fn parse_date_format(format: &str) -> Option<Vec<FormatItem<'_>>> {
    format_description::parse(format).ok()
}

/// Formats a Unix timestamp (UTC). Invalid formats fall back to the default one.
pub fn time_to_string(timestamp: i64, format: &str) -> String {
    let Ok(datetime) = OffsetDateTime::from_unix_timestamp(timestamp) else {
        return "-".to_string();
    };
    let items = parse_date_format(format)
        .or_else(|| parse_date_format(DEFAULT_DATE_FORMAT))
        .unwrap_or_default();
    datetime.format(&items).unwrap_or_else(|_| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_display_mode() {
        assert_eq!(size_to_string(1234567, SizeDisplayMode::Plain), "1234567");
        assert_eq!(size_to_string(1234567, SizeDisplayMode::Locale), "1,234,567");
        assert_eq!(size_to_string(1234567, SizeDisplayMode::Grouped), "1 234 567");
        assert_eq!(size_to_string(999, SizeDisplayMode::Grouped), "999");
        assert_eq!(size_to_string(512, SizeDisplayMode::Powered), "512 B");
        assert_eq!(size_to_string(1536, SizeDisplayMode::Powered), "1.5 kB");
        assert_eq!(size_to_string(3 * 1024 * 1024, SizeDisplayMode::Powered), "3.0 MB");
    }

    #[test]
    fn permissions_render_as_text_or_octal() {
        assert_eq!(permissions_to_string(0o755, PermissionDisplayMode::Text), "rwxr-xr-x");
        assert_eq!(permissions_to_string(0o4755, PermissionDisplayMode::Text), "rwsr-xr-x");
        assert_eq!(permissions_to_string(0o1777, PermissionDisplayMode::Text), "rwxrwxrwt");
        assert_eq!(permissions_to_string(0o644, PermissionDisplayMode::Number), "644");
    }

    #[test]
    fn dates_use_configured_format() {
        assert_eq!(time_to_string(0, DEFAULT_DATE_FORMAT), "1970-01-01 00:00");
        assert_eq!(time_to_string(86_400, "[day].[month].[year]"), "02.01.1970");
        assert_eq!(time_to_string(0, "[bogus"), "1970-01-01 00:00");
    }
}
