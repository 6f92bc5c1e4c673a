//! Date helper functions

use chrono::{DateTime, Locale, TimeZone, Timelike};

/// Format a date using a date-fns style pattern.
///
/// Supported tokens: `yyyy`, `yy`, `MMMM`, `MMM`, `MM`, `M`, `dd`, `d`,
/// `HH`, `H`, `k` (hour 1-24), `mm`, `m`, `ss`, `s`, `EEEE`, `EEE`. Text in
/// single quotes is copied verbatim (`''` is a literal quote); any other
/// character is copied as is.
///
/// # Examples
/// ```ignore
/// format_date(&date, "dd MMM yyyy", Locale::pt_BR) // -> "25 mar 2021"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, pattern: &str, locale: Locale) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::with_capacity(pattern.len() + 8);
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' outside a quoted run is an escaped quote
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        out.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                out.push(chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            out.push(c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        out.push_str(&format_token(date, c, run, locale));
        i += run;
    }

    out
}

fn format_token<Tz: TimeZone>(date: &DateTime<Tz>, token: char, len: usize, locale: Locale) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let fmt = match (token, len) {
        ('y', 2) => "%y",
        ('y', _) => "%Y",
        ('M', 1) => "%-m",
        ('M', 2) => "%m",
        ('M', 3) => "%b",
        ('M', _) => "%B",
        ('d', 1) => "%-d",
        ('d', _) => "%d",
        ('H', 1) => "%-H",
        ('H', _) => "%H",
        ('m', 1) => "%-M",
        ('m', _) => "%M",
        ('s', 1) => "%-S",
        ('s', _) => "%S",
        ('E', 4) => "%A",
        ('E', _) => "%a",
        ('k', _) => {
            let hour = match date.hour() {
                0 => 24,
                h => h,
            };
            return if len >= 2 {
                format!("{:02}", hour)
            } else {
                hour.to_string()
            };
        }
        _ => return std::iter::repeat(token).take(len).collect(),
    };
    date.format_localized(fmt, locale).to_string()
}

/// Format a date in ISO 8601 form for `<time datetime>`
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_listing_format() {
        let date = Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap();
        assert_eq!(format_date(&date, "dd MMM yyyy", Locale::pt_BR), "25 mar 2021");
        assert_eq!(format_date(&date, "dd MMM yyyy", Locale::en_US), "25 Mar 2021");
        assert_eq!(format_date(&date, "yyyy-MM-dd", Locale::en_US), "2021-03-25");
    }

    #[test]
    fn test_quoted_literal_and_k_hour() {
        let date = Utc.with_ymd_and_hms(2021, 3, 5, 9, 5, 0).unwrap();
        assert_eq!(
            format_date(&date, "d MMM yyyy, 'às' k:m", Locale::pt_BR),
            "5 mar 2021, às 9:5"
        );
        let midnight = Utc.with_ymd_and_hms(2021, 3, 5, 0, 30, 0).unwrap();
        assert_eq!(format_date(&midnight, "k:mm", Locale::pt_BR), "24:30");
        assert_eq!(format_date(&midnight, "'it''s' HH:mm", Locale::en_US), "it's 00:30");
    }

    #[test]
    fn test_uses_date_offset() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let date = Utc
            .with_ymd_and_hms(2021, 1, 1, 1, 0, 0)
            .unwrap()
            .with_timezone(&offset);
        assert_eq!(format_date(&date, "dd/MM/yyyy HH'h'", Locale::pt_BR), "31/12/2020 22h");
    }

    #[test]
    fn test_date_xml() {
        let date = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(date_xml(&date), "2020-01-01T00:00:00+00:00");
    }
}
