use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Whole seconds between two timestamps; `None` until both ends are known.
pub(crate) fn elapsed_seconds(
    started_at: Option<PrimitiveDateTime>,
    finished_at: Option<PrimitiveDateTime>,
) -> Option<i64> {
    let (start, end) = (started_at?, finished_at?);
    Some((end - start).whole_seconds().max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Duration, Time};

    fn at(hour: u8, minute: u8, second: u8) -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2026, time::Month::March, 14).unwrap();
        PrimitiveDateTime::new(date, Time::from_hms(hour, minute, second).unwrap())
    }

    #[test]
    fn format_primitive_outputs_utc_z() {
        assert_eq!(format_primitive(at(9, 5, 7)), "2026-03-14T09:05:07Z");
    }

    #[test]
    fn elapsed_seconds_needs_both_ends() {
        assert_eq!(elapsed_seconds(Some(at(9, 0, 0)), None), None);
        assert_eq!(elapsed_seconds(None, Some(at(9, 0, 0))), None);
        assert_eq!(elapsed_seconds(Some(at(9, 0, 0)), Some(at(9, 12, 30))), Some(750));
    }

    #[test]
    fn elapsed_seconds_never_negative() {
        let start = at(10, 0, 0);
        assert_eq!(elapsed_seconds(Some(start), Some(start - Duration::seconds(5))), Some(0));
    }
}
