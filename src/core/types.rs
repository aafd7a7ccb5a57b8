use chrono::NaiveDate;
use serde::Serialize;

/// Annual rates as fractions (0.04 for 4%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateConfig {
    pub withdrawal: f64,
    pub inflation: f64,
    pub growth: f64,
    pub income: f64,
}

impl RateConfig {
    pub const STANDARD_WITHDRAWAL: f64 = 0.04;
    pub const STANDARD_INFLATION: f64 = 0.035;
    pub const STANDARD_GROWTH: f64 = 0.075;
    pub const STANDARD_INCOME: f64 = 0.05;

    /// The stock assumptions offered to users before they override anything.
    pub fn standard() -> Self {
        Self {
            withdrawal: Self::STANDARD_WITHDRAWAL,
            inflation: Self::STANDARD_INFLATION,
            growth: Self::STANDARD_GROWTH,
            income: Self::STANDARD_INCOME,
        }
    }
}

/// One simulated month of a household's finances. All amounts are monthly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialPoint {
    pub date: NaiveDate,
    pub spend: f64,
    pub active_income: f64,
    pub total_assets: f64,
    pub passive_income: f64,
}

impl FinancialPoint {
    pub fn can_retire(&self) -> bool {
        self.passive_income >= self.spend
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point<X> {
    pub x: X,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    pub graph_points: Vec<FinancialPoint>,
    pub on_course_to_retire: bool,
    pub can_retire_now: bool,
    pub intersection_point: Option<Point<NaiveDate>>,
}

impl GraphData {
    pub fn start_date(&self) -> NaiveDate {
        self.graph_points[0].date
    }

    /// Day on which passive income first covers spend, if that happens at all.
    pub fn retirement_date(&self) -> Option<NaiveDate> {
        if self.can_retire_now {
            return Some(self.start_date());
        }
        self.intersection_point.map(|point| point.x)
    }

    /// Whole months from the start until the first month that satisfies the
    /// retirement condition. Padding months never count.
    pub fn months_to_retirement(&self) -> Option<u32> {
        if self.can_retire_now {
            return Some(0);
        }
        if !self.on_course_to_retire {
            return None;
        }
        self.graph_points
            .iter()
            .position(FinancialPoint::can_retire)
            .map(|idx| idx as u32)
    }
}
