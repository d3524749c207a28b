use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};

use crate::models::MarketStatus;

/// Second Sunday in March, 2am local: US DST begins.
/// First Sunday in November, 2am local: US DST ends.
fn is_us_dst(utc: DateTime<Utc>) -> bool {
    let year = utc.year();
    let dst_start = nth_sunday_of_month(year, 3, 2) + Duration::hours(2 + 5); // 2am EST = 7am UTC
    let dst_end = nth_sunday_of_month(year, 11, 1) + Duration::hours(2 + 4); // 2am EDT = 6am UTC
    utc >= dst_start && utc < dst_end
}

fn nth_sunday_of_month(year: i32, month: u32, n: u32) -> DateTime<Utc> {
    let first_of_month = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap();
    let first_weekday = first_of_month.weekday();
    let offset_to_sunday = (7 - first_weekday.num_days_from_sunday()) % 7;
    let first_sunday_day = 1 + offset_to_sunday;
    let target_day = first_sunday_day + 7 * (n - 1);
    Utc.with_ymd_and_hms(year, month, target_day, 0, 0, 0).unwrap()
}

/// Converts a UTC instant into US/Eastern wall-clock hour and minute,
/// applying the simple US DST rule (EST = UTC-5, EDT = UTC-4).
pub fn eastern_wall_clock(utc: DateTime<Utc>) -> (Weekday, u32, u32) {
    let offset_hours = if is_us_dst(utc) { 4 } else { 5 };
    let eastern = utc - Duration::hours(offset_hours);
    (eastern.weekday(), eastern.hour(), eastern.minute())
}

pub fn market_status(utc: DateTime<Utc>) -> MarketStatus {
    let (weekday, hour, minute) = eastern_wall_clock(utc);
    if matches!(weekday, Weekday::Sat | Weekday::Sun) {
        return MarketStatus::Weekend;
    }
    let minutes_since_midnight = hour * 60 + minute;
    if minutes_since_midnight < 4 * 60 {
        MarketStatus::Closed
    } else if minutes_since_midnight < 9 * 60 + 30 {
        MarketStatus::PreMarket
    } else if minutes_since_midnight < 16 * 60 {
        MarketStatus::Open
    } else {
        MarketStatus::AfterHours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn weekday_midday_is_open() {
        // 2025-06-11 is a Wednesday; 15:00 UTC = 11:00 EDT.
        let utc = Utc.with_ymd_and_hms(2025, 6, 11, 15, 0, 0).unwrap();
        assert_eq!(market_status(utc), MarketStatus::Open);
    }

    #[test]
    fn saturday_is_weekend() {
        let utc = Utc.with_ymd_and_hms(2025, 6, 14, 15, 0, 0).unwrap();
        assert_eq!(market_status(utc), MarketStatus::Weekend);
    }
}
