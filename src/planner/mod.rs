use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::api::{decode, FetchJson};
use crate::error::{Error, Result};
use crate::metrics::{LinkContext, Registry, ReportRow};
use crate::model::{
    Document, Iteration, IterationRecord, SpaceRecord, WorkItem, WorkItemRecord, WorkItemType,
    WorkItemTypeRecord,
};
use crate::query::{build_query, normalize, Field, NameLookup};

pub const DEFAULT_PAGE_LIMIT: u32 = 10_000;
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_WEB_URL: &str = "https://openshift.io";

/// Options controlling report generation.
#[derive(Debug, Clone)]
pub struct PlannerOptions {
    /// Maximum number of work items fetched per search.
    pub page_limit: u32,
    /// Maximum number of iterations fetched and folded at once.
    pub concurrency: usize,
    /// Base of the planner web UI used for drill-down links. `None` disables links.
    pub web_url: Option<String>,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            concurrency: DEFAULT_CONCURRENCY,
            web_url: Some(DEFAULT_WEB_URL.to_string()),
        }
    }
}

/// Computes iteration statistics for a space.
pub struct Planner<F> {
    api: F,
    registry: Registry,
    options: PlannerOptions,
}

impl<F: FetchJson> Planner<F> {
    pub fn new(api: F, options: PlannerOptions) -> Result<Self> {
        Self::with_registry(api, Registry::standard(), options)
    }

    pub fn with_registry(api: F, registry: Registry, options: PlannerOptions) -> Result<Self> {
        if options.page_limit == 0 {
            return Err(Error::Config("page limit must be at least 1".into()));
        }
        if options.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".into()));
        }
        if let Some(web_url) = &options.web_url {
            if !crate::url::is_web_url(web_url) {
                return Err(Error::Config(format!("invalid web URL: {web_url}")));
            }
        }
        Ok(Self {
            api,
            registry,
            options,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Work item types defined for a space.
    ///
    /// The type list lives behind a link in the space document.
    pub async fn work_item_types(&self, space: &str) -> Result<Vec<WorkItemType>> {
        let space_url = format!("/spaces/{space}");
        let doc: Document<SpaceRecord> =
            decode(&space_url, self.api.fetch_json(&space_url, &[]).await?)?;
        let types_url = doc
            .data
            .and_then(|s| s.links.workitemtypes)
            .ok_or_else(|| Error::NotFound(format!("work item types of space {space}")))?;

        let doc: Document<Vec<WorkItemTypeRecord>> =
            decode(&types_url, self.api.fetch_json(&types_url, &[]).await?)?;
        Ok(doc
            .data
            .unwrap_or_default()
            .into_iter()
            .map(WorkItemType::from)
            .collect())
    }

    /// Raw iterations of a space, without computed metrics.
    pub async fn fetch_iterations(&self, space: &str) -> Result<Vec<Iteration>> {
        let url = format!("/spaces/{space}/iterations");
        let doc: Document<Vec<IterationRecord>> =
            decode(&url, self.api.fetch_json(&url, &[]).await?)?;
        Ok(doc
            .data
            .unwrap_or_default()
            .into_iter()
            .map(Iteration::from)
            .collect())
    }

    /// Iterations of a space with the simple metrics filled in. Unordered.
    pub async fn list_iterations(&self, space: &str) -> Result<Vec<Iteration>> {
        self.fetch_iterations(space)
            .await?
            .into_iter()
            .map(|it| self.registry.summarize(it))
            .collect()
    }

    /// Name lookup tables for normalizing queries against a space.
    pub async fn name_lookup(&self, space: &str) -> Result<NameLookup> {
        let item_types = self.work_item_types(space).await?;
        let iterations = self.fetch_iterations(space).await?;
        Ok(NameLookup::new(&iterations, &item_types))
    }

    /// Replace human readable iteration and type names in `query` with identifiers.
    pub async fn normalize_query(&self, query: &Value, space: &str) -> Result<Value> {
        let lookup = self.name_lookup(space).await?;
        Ok(normalize(query, &lookup))
    }

    /// Search work items of a space. Names in `query` are normalized first.
    pub async fn search(&self, query: &Value, space: &str) -> Result<Vec<WorkItem>> {
        let lookup = self.name_lookup(space).await?;
        self.search_normalized(query, &lookup).await
    }

    async fn search_normalized(&self, query: &Value, lookup: &NameLookup) -> Result<Vec<WorkItem>> {
        let expression = normalize(query, lookup).to_string();
        let params = [
            ("page[limit]", self.options.page_limit.to_string()),
            ("filter[expression]", expression),
        ];
        let doc: Document<Vec<WorkItemRecord>> =
            decode("/search", self.api.fetch_json("/search", &params).await?)?;
        Ok(doc
            .data
            .unwrap_or_default()
            .into_iter()
            .map(WorkItem::from)
            .collect())
    }

    /// Compute every registered metric for every iteration of a space.
    ///
    /// Work items are searched per iteration, at most `concurrency` at a time.
    /// The first failure aborts the whole report. Rows are returned in no
    /// particular order.
    pub async fn build_detailed_report(
        &self,
        space: &str,
        item_types: &[String],
    ) -> Result<Vec<ReportRow>> {
        let types = self.work_item_types(space).await?;
        let iterations = self.list_iterations(space).await?;
        let lookup = NameLookup::new(&iterations, &types);
        log::info!(
            "Building report for space {space}: {} iterations, item types {item_types:?}",
            iterations.len()
        );

        // Links carry the same type identifiers the searches are made with.
        let link_types: Vec<String> = item_types
            .iter()
            .map(|t| {
                lookup
                    .resolve(Field::WorkItemType, t)
                    .unwrap_or(t)
                    .to_string()
            })
            .collect();

        let web_url = self.options.web_url.as_deref();
        let lookup = &lookup;
        let link_types = link_types.as_slice();
        let rows: Vec<ReportRow> = stream::iter(iterations.iter())
            .map(|iteration| async move {
                let query = build_query(&iteration.id, item_types).to_value();
                let work_items = self.search_normalized(&query, lookup).await?;
                log::debug!(
                    "Iteration {} ({}): {} work items",
                    iteration.name,
                    iteration.id,
                    work_items.len()
                );
                let link_ctx = web_url.map(|web_url| LinkContext {
                    web_url,
                    space,
                    item_types: link_types,
                });
                self.registry
                    .build_row(iteration, &work_items, link_ctx.as_ref())
            })
            .buffer_unordered(self.options.concurrency)
            .try_collect()
            .await?;

        log::info!("Report for space {space} complete: {} rows", rows.len());
        Ok(rows)
    }
}
