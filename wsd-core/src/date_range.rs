use chrono::NaiveDate;
use serde::Serialize;

/// An inclusive calendar date range whose start never exceeds its end.
#[derive(Clone, Eq, PartialEq, Copy, Debug, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> anyhow::Result<Self> {
        if start > end {
            anyhow::bail!("date range start {} is after end {}", start, end);
        }
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        *date >= self.start && *date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::DateRange;
    use chrono::NaiveDate;

    #[test]
    fn test_date_range_contains_bounds() {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 1, 5).unwrap();
        let range = DateRange::new(start, end).unwrap();
        assert!(range.contains(&start));
        assert!(range.contains(&end));
        assert!(!range.contains(&NaiveDate::from_ymd_opt(2022, 1, 6).unwrap()));
    }

    #[test]
    fn test_date_range_single_day() {
        let day = NaiveDate::from_ymd_opt(2022, 3, 15).unwrap();
        let range = DateRange::new(day, day).unwrap();
        assert!(range.contains(&day));
    }

    #[test]
    fn test_date_range_inverted_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2022, 3, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 3, 14).unwrap();
        assert!(DateRange::new(start, end).is_err());
    }
}
