use chrono::{NaiveDate, TimeDelta};

use super::types::{FinancialPoint, Point};

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("lines are parallel (slope {slope}); no single intersection exists")]
    ParallelLines { slope: f64 },
    #[error("bracketing points share the same date {0}")]
    ZeroSpan(NaiveDate),
    #[error("intersection is not finite (x = {x}, y = {y})")]
    NonFinite { x: f64, y: f64 },
    #[error("intersection lies {days} days from {origin}, outside the representable calendar")]
    DateOutOfRange { origin: NaiveDate, days: i64 },
}

/// A line in point-slope form: `y - self.y = self.slope * (x - self.x)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub x: f64,
    pub y: f64,
    pub slope: f64,
}

impl Line {
    pub fn new(x: f64, y: f64, slope: f64) -> Self {
        Self { x, y, slope }
    }

    pub fn intersection(&self, other: &Line) -> Result<Point<f64>, GeometryError> {
        let denominator = self.slope - other.slope;
        if denominator == 0.0 {
            return Err(GeometryError::ParallelLines { slope: self.slope });
        }

        let x = (self.slope * self.x - other.slope * other.x + other.y - self.y) / denominator;
        let y = (self.slope * other.slope * (other.x - self.x) + self.y * other.slope
            - other.y * self.slope)
            / -denominator;

        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::NonFinite { x, y });
        }
        Ok(Point { x, y })
    }
}

/// Finds the day on which passive income catches up with spend between two
/// adjacent months, treating both series as straight lines over whole days.
///
/// `before` is expected to fail the retirement test and `after` to pass it;
/// the result then lands between the two dates.
pub fn intersect(
    before: &FinancialPoint,
    after: &FinancialPoint,
) -> Result<Point<NaiveDate>, GeometryError> {
    let days_between = (after.date - before.date).num_days();
    if days_between == 0 {
        return Err(GeometryError::ZeroSpan(before.date));
    }
    let span = days_between as f64;

    let expense_slope = (after.spend - before.spend) / span;
    let income_slope = (after.passive_income - before.passive_income) / span;

    let expense_line = Line::new(span, after.spend, expense_slope);
    let income_line = Line::new(span, after.passive_income, income_slope);
    let crossing = expense_line.intersection(&income_line)?;

    let days = crossing.x.round() as i64;
    let date = TimeDelta::try_days(days)
        .and_then(|delta| before.date.checked_add_signed(delta))
        .ok_or(GeometryError::DateOutOfRange {
            origin: before.date,
            days,
        })?;

    Ok(Point {
        x: date,
        y: crossing.y,
    })
}
