mod engine;
mod geometry;
mod types;

pub use engine::{MAX_MONTHS, monthly_rate, project, project_from_today};
pub use geometry::{GeometryError, Line, intersect};
pub use types::{FinancialPoint, GraphData, Point, RateConfig};
