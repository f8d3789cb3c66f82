use std::sync::LazyLock;

use regex::Regex;

use super::ids;
use super::{percentage, LinkContext, MetricBag, MetricValue, Transformer, TransformerKind};
use crate::error::Result;
use crate::model::{Iteration, WorkItem};

static RE_ACCEPTANCE_CRITERIA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)acceptance criteria").unwrap());

fn has_acceptance_criteria(wi: &WorkItem) -> bool {
    wi.description
        .as_deref()
        .is_some_and(|d| RE_ACCEPTANCE_CRITERIA.is_match(d))
}

fn count_where(work_items: &[WorkItem], pred: impl Fn(&WorkItem) -> bool) -> MetricValue {
    MetricValue::Count(work_items.iter().filter(|&wi| pred(wi)).count() as u64)
}

// ── Iteration level ────────────────────────────────────────────────

pub struct IterationId;

impl Transformer for IterationId {
    fn id(&self) -> &str {
        ids::ID
    }

    fn title(&self) -> &str {
        "ID"
    }

    fn description(&self) -> &str {
        "ID of iteration"
    }

    fn kind(&self) -> TransformerKind {
        TransformerKind::Simple
    }

    fn reduce(&self, acc: &mut MetricBag, iteration: &Iteration, _: &[WorkItem]) -> Result<()> {
        acc.set(self.id(), MetricValue::from(iteration.id.as_str()));
        Ok(())
    }
}

pub struct IterationParentId;

impl Transformer for IterationParentId {
    fn id(&self) -> &str {
        ids::PARENT_ID
    }

    fn title(&self) -> &str {
        "Parent ID"
    }

    fn description(&self) -> &str {
        "ID of iteration parent, if it exists"
    }

    fn kind(&self) -> TransformerKind {
        TransformerKind::Simple
    }

    fn reduce(&self, acc: &mut MetricBag, iteration: &Iteration, _: &[WorkItem]) -> Result<()> {
        acc.set(self.id(), MetricValue::from(iteration.parent_id.as_deref()));
        Ok(())
    }
}

pub struct IterationName;

impl Transformer for IterationName {
    fn id(&self) -> &str {
        ids::NAME
    }

    fn title(&self) -> &str {
        "Name"
    }

    fn description(&self) -> &str {
        "Name of iteration"
    }

    fn kind(&self) -> TransformerKind {
        TransformerKind::Simple
    }

    fn reduce(&self, acc: &mut MetricBag, iteration: &Iteration, _: &[WorkItem]) -> Result<()> {
        acc.set(self.id(), MetricValue::from(iteration.name.as_str()));
        Ok(())
    }
}

pub struct IterationTotal;

impl Transformer for IterationTotal {
    fn id(&self) -> &str {
        ids::TOTAL
    }

    fn title(&self) -> &str {
        "# Total WIs (including child iterations)"
    }

    fn description(&self) -> &str {
        "Number of total workitems in iteration (including children and all workitem types)"
    }

    fn kind(&self) -> TransformerKind {
        TransformerKind::Simple
    }

    fn reduce(&self, acc: &mut MetricBag, iteration: &Iteration, _: &[WorkItem]) -> Result<()> {
        acc.set(self.id(), MetricValue::Count(iteration.total));
        Ok(())
    }
}

// ── Work item level ────────────────────────────────────────────────

pub struct WorkItemCount;

impl Transformer for WorkItemCount {
    fn id(&self) -> &str {
        ids::WORK_ITEMS
    }

    fn title(&self) -> &str {
        "# WIs in iteration of given type(s)"
    }

    fn description(&self) -> &str {
        "Number of workitems in iteration (direct items only and filtered by work item type)"
    }

    fn kind(&self) -> TransformerKind {
        TransformerKind::Detailed
    }

    fn reduce(
        &self,
        acc: &mut MetricBag,
        _: &Iteration,
        work_items: &[WorkItem],
    ) -> Result<()> {
        acc.set(self.id(), MetricValue::Count(work_items.len() as u64));
        Ok(())
    }

    fn link(&self, ctx: &LinkContext<'_>, iteration: &Iteration) -> Option<String> {
        crate::url::plan_link(ctx.web_url, ctx.space, &iteration.id, ctx.item_types)
    }
}

pub struct WithStoryPoints;

impl Transformer for WithStoryPoints {
    fn id(&self) -> &str {
        ids::WITH_STORY_POINTS
    }

    fn title(&self) -> &str {
        "# WIs with Story points"
    }

    fn description(&self) -> &str {
        "Number of workitems of given type(s) in iteration with story points"
    }

    fn kind(&self) -> TransformerKind {
        TransformerKind::Detailed
    }

    fn reduce(
        &self,
        acc: &mut MetricBag,
        _: &Iteration,
        work_items: &[WorkItem],
    ) -> Result<()> {
        acc.set(
            self.id(),
            count_where(work_items, |wi| wi.estimated_points().is_some()),
        );
        Ok(())
    }

    fn aggregate(&self, acc: &MetricBag) -> Option<String> {
        Some(percentage(
            acc.number(self.id()),
            acc.number(ids::WORK_ITEMS),
        ))
    }
}

pub struct WithoutStoryPoints;

impl Transformer for WithoutStoryPoints {
    fn id(&self) -> &str {
        ids::WITHOUT_STORY_POINTS
    }

    fn title(&self) -> &str {
        "# WIs without Story points"
    }

    fn description(&self) -> &str {
        "Number of workitems of given type(s) in iteration without story points"
    }

    fn kind(&self) -> TransformerKind {
        TransformerKind::Detailed
    }

    fn reduce(
        &self,
        acc: &mut MetricBag,
        _: &Iteration,
        work_items: &[WorkItem],
    ) -> Result<()> {
        acc.set(
            self.id(),
            count_where(work_items, |wi| wi.estimated_points().is_none()),
        );
        Ok(())
    }
}

pub struct WithAcceptanceCriteria;

impl Transformer for WithAcceptanceCriteria {
    fn id(&self) -> &str {
        ids::WITH_ACCEPTANCE_CRITERIA
    }

    fn title(&self) -> &str {
        "# WIs with Acceptance Criteria"
    }

    fn description(&self) -> &str {
        "Number of workitems of given type(s) in iteration with acceptance criteria"
    }

    fn kind(&self) -> TransformerKind {
        TransformerKind::Detailed
    }

    fn reduce(
        &self,
        acc: &mut MetricBag,
        _: &Iteration,
        work_items: &[WorkItem],
    ) -> Result<()> {
        acc.set(self.id(), count_where(work_items, has_acceptance_criteria));
        Ok(())
    }

    fn aggregate(&self, acc: &MetricBag) -> Option<String> {
        Some(percentage(
            acc.number(self.id()),
            acc.number(ids::WORK_ITEMS),
        ))
    }
}

pub struct WithoutAcceptanceCriteria;

impl Transformer for WithoutAcceptanceCriteria {
    fn id(&self) -> &str {
        ids::WITHOUT_ACCEPTANCE_CRITERIA
    }

    fn title(&self) -> &str {
        "# WIs without Acceptance Criteria"
    }

    fn description(&self) -> &str {
        "Number of workitems of given type(s) in iteration without acceptance criteria"
    }

    fn kind(&self) -> TransformerKind {
        TransformerKind::Detailed
    }

    fn reduce(
        &self,
        acc: &mut MetricBag,
        _: &Iteration,
        work_items: &[WorkItem],
    ) -> Result<()> {
        acc.set(
            self.id(),
            count_where(work_items, |wi| !has_acceptance_criteria(wi)),
        );
        Ok(())
    }
}

pub struct CompletedStoryPoints;

impl Transformer for CompletedStoryPoints {
    fn id(&self) -> &str {
        ids::COMPLETED_STORY_POINTS
    }

    fn title(&self) -> &str {
        "Story Points completed"
    }

    fn description(&self) -> &str {
        "Total story points completed (marked as Closed) in the iteration"
    }

    fn kind(&self) -> TransformerKind {
        TransformerKind::Detailed
    }

    fn reduce(
        &self,
        acc: &mut MetricBag,
        _: &Iteration,
        work_items: &[WorkItem],
    ) -> Result<()> {
        acc.set(self.id(), MetricValue::Points(0.0));
        for wi in work_items.iter().filter(|wi| wi.is_closed()) {
            if let Some(sp) = wi.estimated_points() {
                acc.add_points(self.id(), sp);
            }
        }
        Ok(())
    }

    fn aggregate(&self, acc: &MetricBag) -> Option<String> {
        Some(percentage(
            acc.number(self.id()),
            acc.number(ids::TOTAL_STORY_POINTS),
        ))
    }
}

pub struct TotalStoryPoints;

impl Transformer for TotalStoryPoints {
    fn id(&self) -> &str {
        ids::TOTAL_STORY_POINTS
    }

    fn title(&self) -> &str {
        "Story Points Total"
    }

    fn description(&self) -> &str {
        "Total story points estimated in the iteration"
    }

    fn kind(&self) -> TransformerKind {
        TransformerKind::Detailed
    }

    fn reduce(
        &self,
        acc: &mut MetricBag,
        _: &Iteration,
        work_items: &[WorkItem],
    ) -> Result<()> {
        let total: f64 = work_items.iter().filter_map(|wi| wi.estimated_points()).sum();
        acc.set(self.id(), MetricValue::Points(total));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn described(text: Option<&str>) -> WorkItem {
        WorkItem {
            description: text.map(|t| t.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_acceptance_criteria_case_insensitive() {
        assert!(has_acceptance_criteria(&described(Some("## Acceptance Criteria"))));
        assert!(has_acceptance_criteria(&described(Some("acceptance criteria: x"))));
        assert!(!has_acceptance_criteria(&described(Some("acceptance-criteria"))));
        assert!(!has_acceptance_criteria(&described(None)));
    }

    #[test]
    fn test_parent_id_absent_is_null() {
        let mut acc = MetricBag::default();
        IterationParentId
            .reduce(&mut acc, &Iteration::new("i", "n"), &[])
            .unwrap();
        assert_eq!(acc.get("pid"), Some(&MetricValue::Null));

        let it = Iteration::new("i", "n").with_parent("root");
        IterationParentId.reduce(&mut acc, &it, &[]).unwrap();
        assert_eq!(acc.text("pid"), Some("root"));
    }

    #[test]
    fn test_work_item_count_ignores_reported_total() {
        let mut acc = MetricBag::default();
        let it = Iteration::new("i", "n").with_total(40);
        WorkItemCount
            .reduce(&mut acc, &it, &[WorkItem::default(), WorkItem::default()])
            .unwrap();
        assert_eq!(acc.get("wis"), Some(&MetricValue::Count(2)));
    }

    #[test]
    fn test_with_story_points_aggregate() {
        let items = vec![
            WorkItem {
                story_points: Some(1.0),
                ..Default::default()
            },
            WorkItem::default(),
            WorkItem::default(),
        ];
        let it = Iteration::new("i", "n");
        let mut acc = MetricBag::default();
        WorkItemCount.reduce(&mut acc, &it, &items).unwrap();
        WithStoryPoints.reduce(&mut acc, &it, &items).unwrap();
        assert_eq!(WithStoryPoints.aggregate(&acc).as_deref(), Some("33%"));
    }

    #[test]
    fn test_completed_points_without_total_is_zero_percent() {
        let acc = MetricBag::default();
        assert_eq!(CompletedStoryPoints.aggregate(&acc).as_deref(), Some("0%"));
    }
}
