pub mod transformers;
pub mod types;

pub use transformers::*;
pub use types::*;

use crate::error::{Error, Result};
use crate::model::{Iteration, WorkItem};

/// Identifiers of the built-in metrics.
pub mod ids {
    pub const ID: &str = "id";
    pub const PARENT_ID: &str = "pid";
    pub const NAME: &str = "name";
    pub const TOTAL: &str = "total";
    pub const WORK_ITEMS: &str = "wis";
    pub const WITH_STORY_POINTS: &str = "withSPs";
    pub const WITHOUT_STORY_POINTS: &str = "woSPs";
    pub const WITH_ACCEPTANCE_CRITERIA: &str = "withACs";
    pub const WITHOUT_ACCEPTANCE_CRITERIA: &str = "woACs";
    pub const COMPLETED_STORY_POINTS: &str = "spCom";
    pub const TOTAL_STORY_POINTS: &str = "spTot";
}

/// What data a transformer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformerKind {
    /// Computable from the iteration record alone.
    Simple,
    /// Needs the iteration's work items.
    Detailed,
}

/// Inputs for building drill-down links.
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    pub web_url: &'a str,
    pub space: &'a str,
    pub item_types: &'a [String],
}

/// A metric computed over an iteration and its work items.
///
/// `reduce` writes the transformer's own key into the accumulator. `aggregate`
/// is only called once every transformer of the registry has reduced, so it
/// may read sibling metrics.
pub trait Transformer: Send + Sync {
    fn id(&self) -> &str;

    fn title(&self) -> &str;

    fn description(&self) -> &str;

    fn kind(&self) -> TransformerKind;

    fn reduce(&self, acc: &mut MetricBag, iteration: &Iteration, work_items: &[WorkItem])
        -> Result<()>;

    fn aggregate(&self, _acc: &MetricBag) -> Option<String> {
        None
    }

    fn link(&self, _ctx: &LinkContext<'_>, _iteration: &Iteration) -> Option<String> {
        None
    }

    fn is_simple(&self) -> bool {
        self.kind() == TransformerKind::Simple
    }
}

/// Format `numerator / denominator` as a rounded integer percentage.
///
/// A zero denominator yields `"0%"`.
pub fn percentage(numerator: f64, denominator: f64) -> String {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return "0%".to_string();
    }
    format!("{:.0}%", (numerator / denominator * 100.0).round())
}

/// Ordered catalog of transformers.
pub struct Registry {
    transformers: Vec<Box<dyn Transformer>>,
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            transformers: Vec::new(),
        }
    }

    /// The built-in metrics in display order.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.push(IterationId);
        registry.push(IterationParentId);
        registry.push(IterationName);
        registry.push(IterationTotal);
        registry.push(WorkItemCount);
        registry.push(WithStoryPoints);
        registry.push(WithoutStoryPoints);
        registry.push(WithAcceptanceCriteria);
        registry.push(WithoutAcceptanceCriteria);
        registry.push(CompletedStoryPoints);
        registry.push(TotalStoryPoints);
        registry
    }

    /// Append a transformer. A transformer with an already registered id
    /// replaces the earlier one in place.
    pub fn push(&mut self, transformer: impl Transformer + 'static) {
        let boxed: Box<dyn Transformer> = Box::new(transformer);
        let existing = self.transformers.iter().position(|t| t.id() == boxed.id());
        match existing {
            Some(idx) => self.transformers[idx] = boxed,
            None => self.transformers.push(boxed),
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &dyn Transformer> {
        self.transformers.iter().map(|t| t.as_ref())
    }

    pub fn simple(&self) -> impl Iterator<Item = &dyn Transformer> {
        self.all().filter(|t| t.is_simple())
    }

    pub fn get(&self, id: &str) -> Option<&dyn Transformer> {
        self.all().find(|t| t.id() == id)
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Fold the simple transformers over a raw iteration, filling its metric bag.
    pub fn summarize(&self, mut iteration: Iteration) -> Result<Iteration> {
        let mut acc = MetricBag::default();
        for t in self.simple() {
            run_reduce(t, &mut acc, &iteration, &[])?;
        }
        iteration.metrics = acc;
        Ok(iteration)
    }

    /// Fold every transformer over an iteration and its work items, then
    /// evaluate aggregates and links against the finished accumulator.
    pub fn build_row(
        &self,
        iteration: &Iteration,
        work_items: &[WorkItem],
        link_ctx: Option<&LinkContext<'_>>,
    ) -> Result<ReportRow> {
        let mut acc = MetricBag::default();
        for t in self.all() {
            run_reduce(t, &mut acc, iteration, work_items)?;
        }

        let cells = self
            .all()
            .map(|t| Cell {
                id: t.id().to_string(),
                title: t.title().to_string(),
                value: acc.get(t.id()).cloned().unwrap_or(MetricValue::Null),
                aggregate: t.aggregate(&acc),
                link: link_ctx.and_then(|ctx| t.link(ctx, iteration)),
            })
            .collect();

        Ok(ReportRow {
            metrics: acc,
            cells,
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

fn run_reduce(
    t: &dyn Transformer,
    acc: &mut MetricBag,
    iteration: &Iteration,
    work_items: &[WorkItem],
) -> Result<()> {
    t.reduce(acc, iteration, work_items).map_err(|e| match e {
        Error::Aggregation { .. } => e,
        other => Error::Aggregation {
            metric: t.id().to_string(),
            message: other.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sp: Option<f64>, state: &str, description: Option<&str>) -> WorkItem {
        WorkItem {
            id: "wi".into(),
            story_points: sp,
            state: Some(state.into()),
            description: description.map(|d| d.to_string()),
            item_type: None,
        }
    }

    #[test]
    fn test_standard_order() {
        let registry = Registry::standard();
        let ids: Vec<&str> = registry.all().map(|t| t.id()).collect();
        assert_eq!(
            ids,
            vec![
                "id", "pid", "name", "total", "wis", "withSPs", "woSPs", "withACs", "woACs",
                "spCom", "spTot"
            ]
        );
    }

    #[test]
    fn test_simple_subset() {
        let registry = Registry::standard();
        let ids: Vec<&str> = registry.simple().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["id", "pid", "name", "total"]);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1.0, 3.0), "33%");
        assert_eq!(percentage(2.0, 3.0), "67%");
        assert_eq!(percentage(1.0, 2.0), "50%");
        assert_eq!(percentage(3.0, 3.0), "100%");
        assert_eq!(percentage(0.0, 0.0), "0%");
        assert_eq!(percentage(5.0, 0.0), "0%");
    }

    #[test]
    fn test_summarize_fills_simple_metrics_only() {
        let registry = Registry::standard();
        let it = Iteration::new("i1", "Sprint 1").with_total(7);
        let it = registry.summarize(it).unwrap();
        assert_eq!(it.metrics.text("id"), Some("i1"));
        assert_eq!(it.metrics.get("pid"), Some(&MetricValue::Null));
        assert_eq!(it.metrics.text("name"), Some("Sprint 1"));
        assert_eq!(it.metrics.get("total"), Some(&MetricValue::Count(7)));
        assert!(it.metrics.get("wis").is_none());
    }

    #[test]
    fn test_partitions_sum_to_item_count() {
        let registry = Registry::standard();
        let items = vec![
            item(Some(2.0), "Closed", Some("Acceptance criteria: done")),
            item(Some(3.0), "Open", None),
            item(None, "Open", Some("nothing here")),
            item(Some(0.0), "Closed", Some("ACCEPTANCE CRITERIA")),
        ];
        let row = registry
            .build_row(&Iteration::new("i1", "Sprint 1"), &items, None)
            .unwrap();
        let wis = row.metrics.number("wis");
        assert_eq!(wis, 4.0);
        assert_eq!(
            row.metrics.number("withSPs") + row.metrics.number("woSPs"),
            wis
        );
        assert_eq!(
            row.metrics.number("withACs") + row.metrics.number("woACs"),
            wis
        );
        assert_eq!(row.metrics.number("withACs"), 2.0);
        assert_eq!(row.metrics.number("withSPs"), 2.0);
    }

    #[test]
    fn test_story_point_sums() {
        let registry = Registry::standard();
        let items = vec![
            item(Some(2.0), "Closed", None),
            item(Some(3.0), "Resolved", None),
            item(Some(5.0), "closed", None),
        ];
        let row = registry
            .build_row(&Iteration::new("i1", "Sprint 1"), &items, None)
            .unwrap();
        assert_eq!(row.metrics.number("spTot"), 10.0);
        assert_eq!(row.metrics.number("spCom"), 2.0);
        assert!(row.metrics.number("spCom") <= row.metrics.number("spTot"));
        assert_eq!(row.aggregate("spCom"), Some("20%"));
    }

    #[test]
    fn test_empty_iteration_aggregates_are_zero() {
        let registry = Registry::standard();
        let row = registry
            .build_row(&Iteration::new("i2", "Sprint 2"), &[], None)
            .unwrap();
        assert_eq!(row.value("wis"), Some(&MetricValue::Count(0)));
        for id in ["withSPs", "withACs", "spCom"] {
            assert_eq!(row.aggregate(id), Some("0%"), "{id}");
        }
    }

    #[test]
    fn test_aggregate_independent_of_registration_order() {
        // withSPs is registered before the count it divides by.
        let mut registry = Registry::empty();
        registry.push(WithStoryPoints);
        registry.push(WorkItemCount);
        let items = vec![item(Some(1.0), "Open", None), item(None, "Open", None)];
        let row = registry
            .build_row(&Iteration::new("i1", "S"), &items, None)
            .unwrap();
        assert_eq!(row.aggregate("withSPs"), Some("50%"));
    }

    struct Failing;

    impl Transformer for Failing {
        fn id(&self) -> &str {
            "failing"
        }
        fn title(&self) -> &str {
            "Failing"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn kind(&self) -> TransformerKind {
            TransformerKind::Detailed
        }
        fn reduce(&self, _: &mut MetricBag, _: &Iteration, _: &[WorkItem]) -> Result<()> {
            Err(Error::Config("unexpected input".into()))
        }
    }

    #[test]
    fn test_reduce_error_is_aggregation_error() {
        let mut registry = Registry::standard();
        registry.push(Failing);
        let err = registry
            .build_row(&Iteration::new("i1", "S"), &[], None)
            .unwrap_err();
        match err {
            Error::Aggregation { metric, .. } => assert_eq!(metric, "failing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_push_replaces_same_id() {
        let mut registry = Registry::standard();
        let before = registry.len();
        registry.push(WorkItemCount);
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn test_links_only_with_context() {
        let registry = Registry::standard();
        let it = Iteration::new("i1", "S");
        let row = registry.build_row(&it, &[], None).unwrap();
        assert!(row.cells.iter().all(|c| c.link.is_none()));

        let types = vec!["t1".to_string()];
        let ctx = LinkContext {
            web_url: "https://openshift.io",
            space: "space-1",
            item_types: &types,
        };
        let row = registry.build_row(&it, &[], Some(&ctx)).unwrap();
        assert!(row.cell("wis").unwrap().link.is_some());
        assert!(row.cell("name").unwrap().link.is_none());
    }
}
