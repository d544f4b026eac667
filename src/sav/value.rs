use chrono::NaiveDate;

/// Seconds between the SPSS epoch (1582-10-14 00:00:00 UTC) and the
/// Unix epoch.
pub(crate) const SAV_EPOCH_OFFSET_SECONDS: i64 = 12_219_379_200;

const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// NaN and infinities count as parse failures; a cell that yields `None`
/// is written as system-missing.
pub(crate) fn parse_numeric(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `DD-Mon-YYYY` with a case-sensitive English month abbreviation.
pub(crate) fn parse_date(text: &str) -> Option<f64> {
    let date = parse_date_part(text)?;
    let seconds = date.and_hms_opt(0, 0, 0)?.and_utc().timestamp();
    Some((seconds + SAV_EPOCH_OFFSET_SECONDS) as f64)
}

/// `DD-Mon-YYYY HH:MM:SS`, 24-hour clock.
pub(crate) fn parse_datetime(text: &str) -> Option<f64> {
    let (date_part, time_part) = text.split_once(' ')?;
    let date = parse_date_part(date_part)?;
    let mut parts = time_part.splitn(3, ':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next()?.parse().ok()?;
    let second: u32 = parts.next()?.parse().ok()?;
    let seconds = date.and_hms_opt(hour, minute, second)?.and_utc().timestamp();
    Some((seconds + SAV_EPOCH_OFFSET_SECONDS) as f64)
}

fn parse_date_part(text: &str) -> Option<NaiveDate> {
    let mut parts = text.splitn(3, '-');
    let day: u32 = parts.next()?.parse().ok()?;
    let month_name = parts.next()?;
    let year: i32 = parts.next()?.parse().ok()?;
    let month = MONTH_ABBREVS.iter().position(|m| *m == month_name)? as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, day)
}
