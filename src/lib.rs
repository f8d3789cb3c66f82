pub mod api;
pub mod error;
pub mod format;
pub mod metrics;
pub mod model;
pub mod planner;
pub mod query;
pub mod url;

pub use api::{ApiEndpoint, ApiOptions, FetchJson};
pub use error::{Error, Result};
pub use metrics::{
    Cell, LinkContext, MetricBag, MetricValue, Registry, ReportRow, Transformer, TransformerKind,
};
pub use model::{Iteration, WorkItem, WorkItemType};
pub use planner::{Planner, PlannerOptions};
pub use query::{build_query, normalize, parse_expression, Expression, NameLookup};

/// Connect to the service and build a planner with the standard metrics.
pub fn connect(api: ApiOptions, options: PlannerOptions) -> Result<Planner<ApiEndpoint>> {
    Planner::new(ApiEndpoint::new(api)?, options)
}
