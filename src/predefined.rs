// Copyright (c) 2026 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use chrono::{DateTime, TimeZone};

/// The standard and feature macros defined by `Preprocessor::define_standard_macros`,
/// in addition to `__FILE__`, `__BASE_FILE__`, `__DATE__` and `__TIME__`.
///
/// see:
/// - https://gcc.gnu.org/onlinedocs/cpp/Standard-Predefined-Macros.html
/// - https://gcc.gnu.org/onlinedocs/cpp/Common-Predefined-Macros.html
pub const STANDARD_MACROS: [(&str, &str); 16] = [
    ("__STDC__", "1"),
    ("__STDC_VERSION__", "201710L"),
    ("__STDC_HOSTED__", "1"),
    ("__STDC_IEC_559__", "1"),
    ("__STDC_UTF_16__", "1"),
    ("__STDC_UTF_32__", "1"),
    ("__CHAR_BIT__", "8"),
    ("__SIZEOF_SHORT__", "2"),
    ("__SIZEOF_INT__", "4"),
    ("__SIZEOF_LONG_LONG__", "8"),
    ("__SIZEOF_FLOAT__", "4"),
    ("__SIZEOF_DOUBLE__", "8"),
    ("__INT_MAX__", "0x7fffffff"),
    ("__LONG_LONG_MAX__", "0x7fffffffffffffffLL"),
    ("__ORDER_LITTLE_ENDIAN__", "1234"),
    ("__ORDER_BIG_ENDIAN__", "4321"),
];

/// OS identification macros, keyed by `std::env::consts::OS`.
pub const OS_MACROS: [(&str, &[(&str, &str)]); 9] = [
    ("windows", &[("_WIN32", "1"), ("_WIN64", "1"), ("__WINDOWS__", "1")]),
    (
        "linux",
        &[
            ("__linux__", "1"),
            ("__linux", "1"),
            ("__unix__", "1"),
            ("__unix", "1"),
            ("__gnu_linux__", "1"),
        ],
    ),
    (
        "macos",
        &[
            ("__APPLE__", "1"),
            ("__MACH__", "1"),
            ("__OSX__", "1"),
            ("TARGET_OS_MAC", "1"),
        ],
    ),
    (
        "ios",
        &[("__APPLE__", "1"), ("__MACH__", "1"), ("TARGET_OS_IPHONE", "1")],
    ),
    (
        "android",
        &[
            ("__ANDROID__", "1"),
            ("__linux__", "1"),
            ("__unix__", "1"),
        ],
    ),
    (
        "freebsd",
        &[("__FreeBSD__", "1"), ("__unix__", "1"), ("__unix", "1")],
    ),
    (
        "netbsd",
        &[("__NetBSD__", "1"), ("__unix__", "1"), ("__unix", "1")],
    ),
    (
        "openbsd",
        &[("__OpenBSD__", "1"), ("__unix__", "1"), ("__unix", "1")],
    ),
    ("dragonfly", &[("__DragonFly__", "1"), ("__unix__", "1")]),
];

/// Returns the OS identification macros of the given OS name,
/// the name is one of the values of `std::env::consts::OS`.
pub fn os_macros(os: &str) -> &'static [(&'static str, &'static str)] {
    OS_MACROS
        .iter()
        .find(|(name, _)| *name == os)
        .map(|(_, macros)| *macros)
        .unwrap_or(&[])
}

/// Formats the value of `__DATE__`, a string literal of the form "Mmm dd yyyy".
///
/// The first character of dd is a space if the day of the month is less than 10.
pub fn format_date<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    // see:
    // https://docs.rs/chrono/latest/chrono/format/strftime/index.html
    format!("\"{}\"", now.format("%b %e %Y"))
}

/// Formats the value of `__TIME__`, a string literal of the form "hh:mm:ss".
pub fn format_time<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("\"{}\"", now.format("%H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use crate::predefined::{format_date, format_time, os_macros};

    #[test]
    fn test_format_date_time() {
        let now = Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 30).unwrap();
        assert_eq!(format_date(&now), "\"Mar  7 2025\"");
        assert_eq!(format_time(&now), "\"09:05:30\"");

        let now = Utc.with_ymd_and_hms(2025, 11, 21, 23, 59, 0).unwrap();
        assert_eq!(format_date(&now), "\"Nov 21 2025\"");
    }

    #[test]
    fn test_os_macros() {
        assert!(os_macros("linux").contains(&("__linux__", "1")));
        assert!(os_macros("windows").contains(&("_WIN32", "1")));
        assert!(os_macros("macos").contains(&("__APPLE__", "1")));
        assert!(os_macros("plan9").is_empty());
    }
}
