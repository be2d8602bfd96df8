//! Calendar-aware date arithmetic shared by the lease entity and the
//! payment schedule generator. Month addition clamps to the last valid
//! day of the target month rather than rolling over: a 31st-of-January
//! start plus one month lands on the 28th/29th of February, never the
//! 1st/2nd/3rd of March.

use chrono::{Datelike, NaiveDate};

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("valid date");
    let first_of_this = NaiveDate::from_ymd_opt(year, month, 1).expect("valid date");
    (first_of_next - first_of_this).num_days() as u32
}

/// First day of the month `months` after `date`'s month.
pub fn first_of_month_offset(date: NaiveDate, months: u32) -> NaiveDate {
    let total_months = (date.year() as i64) * 12 + (date.month0() as i64) + months as i64;
    let year = (total_months.div_euclid(12)) as i32;
    let month0 = total_months.rem_euclid(12) as u32;
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).expect("valid date")
}

/// Clamps `day` to the last valid day of `year`-`month`.
pub fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    day.min(days_in_month(year, month))
}

/// `date + months` calendar months, clamping the day-of-month to the
/// target month's length (no synthetic Feb 30/31).
pub fn add_months_clamped(date: NaiveDate, months: u32) -> NaiveDate {
    let first = first_of_month_offset(date, months);
    let day = clamp_day(first.year(), first.month(), date.day());
    NaiveDate::from_ymd_opt(first.year(), first.month(), day).expect("valid date")
}

/// The due date for a reference month, clamping `due_day` to that
/// month's length.
pub fn due_date_for(reference_month: NaiveDate, due_day: u32) -> NaiveDate {
    let day = clamp_day(reference_month.year(), reference_month.month(), due_day);
    NaiveDate::from_ymd_opt(reference_month.year(), reference_month.month(), day).expect("valid date")
}
