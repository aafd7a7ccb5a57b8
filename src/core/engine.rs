use chrono::{Local, Months, NaiveDate};
use tracing::{debug, warn};

use super::geometry::intersect;
use super::types::{FinancialPoint, GraphData, RateConfig};

pub const MAX_YEARS: u32 = 100;
pub const MAX_MONTHS: u32 = MAX_YEARS * 12;
pub const RETIRED_PADDING_MONTHS: u32 = 24;
pub const PADDING_DIVISOR: usize = 6;

/// Converts an annual rate into the monthly rate that compounds back to it.
pub fn monthly_rate(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

fn is_new_year(month: u32) -> bool {
    month > 0 && month % 12 == 0
}

fn add_interest(principal: f64, rate: f64) -> f64 {
    principal * (1.0 + rate)
}

#[derive(Debug, Clone, Copy)]
struct Projection {
    start: NaiveDate,
    withdrawal_rate: f64,
    income_rate: f64,
    monthly_growth_rate: f64,
    monthly_inflation_rate: f64,
}

impl Projection {
    fn new(start: NaiveDate, rates: &RateConfig) -> Self {
        Self {
            start,
            withdrawal_rate: rates.withdrawal,
            income_rate: rates.income,
            monthly_growth_rate: monthly_rate(rates.growth),
            monthly_inflation_rate: monthly_rate(rates.inflation),
        }
    }

    fn date_for_month(&self, month: u32) -> NaiveDate {
        self.start
            .checked_add_months(Months::new(month))
            .unwrap_or(NaiveDate::MAX)
    }

    fn initial_point(&self, spend: f64, active_income: f64, total_assets: f64) -> FinancialPoint {
        FinancialPoint {
            date: self.start,
            spend,
            active_income,
            total_assets,
            passive_income: self.withdrawal_rate * total_assets,
        }
    }

    fn next_point(&self, prev: &FinancialPoint, month: u32) -> FinancialPoint {
        let active_income = if is_new_year(month) {
            add_interest(prev.active_income, self.income_rate)
        } else {
            prev.active_income
        };
        let total_assets = add_interest(prev.total_assets, self.monthly_growth_rate)
            + prev.active_income
            - prev.spend;

        FinancialPoint {
            date: self.date_for_month(month),
            spend: add_interest(prev.spend, self.monthly_inflation_rate),
            active_income,
            total_assets,
            passive_income: self.withdrawal_rate * total_assets,
        }
    }

    /// Appends `count` further months. Point `i` always belongs to month `i`.
    fn extend(&self, points: &mut Vec<FinancialPoint>, count: usize) {
        points.reserve(count);
        for _ in 0..count {
            let prev = points[points.len() - 1];
            let month = points.len() as u32;
            points.push(self.next_point(&prev, month));
        }
    }
}

/// Projects a household's monthly finances forward from `start` until passive
/// income covers spend, or until [`MAX_MONTHS`] have elapsed.
///
/// Amounts are monthly and taken as-is; the function never fails, even for
/// negative or zero inputs.
pub fn project(
    spend: f64,
    active_income: f64,
    total_assets: f64,
    rates: &RateConfig,
    start: NaiveDate,
) -> GraphData {
    let projection = Projection::new(start, rates);
    let origin = projection.initial_point(spend, active_income, total_assets);
    let mut points = vec![origin];

    if origin.can_retire() {
        projection.extend(&mut points, RETIRED_PADDING_MONTHS as usize);
        debug!(points = points.len(), "already retired at start");
        return GraphData {
            graph_points: points,
            on_course_to_retire: true,
            can_retire_now: true,
            intersection_point: None,
        };
    }

    let mut month = 0;
    while month < MAX_MONTHS && !points[points.len() - 1].can_retire() {
        month += 1;
        projection.extend(&mut points, 1);
    }

    let crossing = &points[points.len() - 2..];
    let on_course_to_retire = crossing[1].can_retire();
    if !on_course_to_retire {
        debug!(months = MAX_MONTHS, "no crossover within horizon");
        return GraphData {
            graph_points: points,
            on_course_to_retire,
            can_retire_now: false,
            intersection_point: None,
        };
    }

    let intersection_point = match intersect(&crossing[0], &crossing[1]) {
        Ok(point) => Some(point),
        Err(e) => {
            warn!(error = %e, month, "could not locate crossover date");
            None
        }
    };

    let padding = points.len() / PADDING_DIVISOR;
    projection.extend(&mut points, padding);
    debug!(month, padding, "crossover found");

    GraphData {
        graph_points: points,
        on_course_to_retire,
        can_retire_now: false,
        intersection_point,
    }
}

/// [`project`] starting from the current local month.
pub fn project_from_today(
    spend: f64,
    active_income: f64,
    total_assets: f64,
    rates: &RateConfig,
) -> GraphData {
    project(
        spend,
        active_income,
        total_assets,
        rates,
        Local::now().date_naive(),
    )
}
