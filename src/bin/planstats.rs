use std::time::Duration;

use clap::{Parser, Subcommand};

use planstats::format::{self, Format};
use planstats::{ApiEndpoint, ApiOptions, Planner, PlannerOptions};

#[derive(Parser)]
#[command(name = "planstats", about = "Iteration statistics for planner spaces")]
struct Cli {
    /// Base URL of the planner API
    #[arg(long, default_value = planstats::api::DEFAULT_BASE_URL)]
    base_url: String,

    /// Base URL of the planner web UI, used for drill-down links
    #[arg(long, default_value = planstats::planner::DEFAULT_WEB_URL)]
    web_url: String,

    /// Disable drill-down links
    #[arg(long)]
    no_links: bool,

    /// Maximum number of work items fetched per iteration
    #[arg(long, default_value_t = planstats::planner::DEFAULT_PAGE_LIMIT)]
    page_limit: u32,

    /// Number of iterations fetched concurrently
    #[arg(long, default_value_t = planstats::planner::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = planstats::api::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the iterations of a space
    Iterations {
        /// Space ID
        space: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compute statistics for every iteration of a space
    Report {
        /// Space ID
        space: String,
        /// Only count work items of this type (name or ID). Only a single type is
        /// applied; with several, all types are counted.
        #[arg(long = "include-type", value_name = "TYPE")]
        include_types: Vec<String>,
        /// Comma separated metric IDs to show (default: all)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Output format: table, json, tsv, html
        #[arg(long = "format", default_value = "table")]
        output: String,
        /// Page title for HTML output
        #[arg(long, default_value = "Iterations Statistics")]
        title: String,
    },
    /// List the work item types of a space
    Types {
        /// Space ID
        space: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search work items with a filter expression
    Search {
        /// Space ID
        space: String,
        /// Filter expression, e.g. '{"iteration": {"$EQ": "Sprint 1"}}'
        expression: String,
        /// Print the normalized expression instead of searching
        #[arg(long)]
        normalize_only: bool,
    },
    /// Describe the available metrics
    Metrics,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let api = ApiEndpoint::new(ApiOptions {
        base_url: cli.base_url.clone(),
        timeout: Duration::from_secs(cli.timeout),
    })?;
    let options = PlannerOptions {
        page_limit: cli.page_limit,
        concurrency: cli.concurrency,
        web_url: if cli.no_links {
            None
        } else {
            Some(cli.web_url.clone())
        },
    };
    let planner = Planner::new(api, options)?;

    match cli.command {
        Commands::Iterations { space, json } => {
            handle_iterations(&planner, &space, json).await?;
        }
        Commands::Report {
            space,
            include_types,
            columns,
            output,
            title,
        } => {
            handle_report(&planner, &space, &include_types, &columns, &output, &title).await?;
        }
        Commands::Types { space, json } => {
            let types = planner.work_item_types(&space).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&types)?);
            } else {
                for t in &types {
                    println!("{}  {}", t.id, t.name);
                }
            }
        }
        Commands::Search {
            space,
            expression,
            normalize_only,
        } => {
            let query = planstats::parse_expression(&expression)?;
            if normalize_only {
                let normalized = planner.normalize_query(&query, &space).await?;
                println!("{}", serde_json::to_string_pretty(&normalized)?);
            } else {
                let items = planner.search(&query, &space).await?;
                println!("{} work items", items.len());
                for wi in &items {
                    println!(
                        "  {}  {:<12} {}",
                        wi.id,
                        wi.state.as_deref().unwrap_or("-"),
                        wi.story_points.map_or(String::new(), |sp| format!("{sp} SP"))
                    );
                }
            }
        }
        Commands::Metrics => {
            for t in planner.registry().all() {
                let kind = if t.is_simple() { "simple" } else { "detailed" };
                println!("{:<8} {:<9} {}", t.id(), kind, t.title());
                println!("         {}", t.description());
            }
        }
    }
    Ok(())
}

async fn handle_iterations(
    planner: &Planner<ApiEndpoint>,
    space: &str,
    json: bool,
) -> anyhow::Result<()> {
    let mut iterations = planner.list_iterations(space).await?;
    iterations.sort_by(|a, b| a.name.cmp(&b.name));

    if json {
        let bags: Vec<_> = iterations.iter().map(|i| &i.metrics).collect();
        println!("{}", serde_json::to_string_pretty(&bags)?);
        return Ok(());
    }

    println!("{} iterations", iterations.len());
    for it in &iterations {
        println!("  {}  {:<30} {:>5} WIs", it.id, it.name, it.total);
    }
    Ok(())
}

async fn handle_report(
    planner: &Planner<ApiEndpoint>,
    space: &str,
    include_types: &[String],
    columns: &[String],
    output: &str,
    title: &str,
) -> anyhow::Result<()> {
    let output = Format::parse(output)?;
    let columns = format::select_columns(planner.registry(), columns)?;
    if include_types.len() > 1 {
        log::warn!("Filtering by more than one work item type is not supported; counting all types");
    }

    let mut rows = planner.build_detailed_report(space, include_types).await?;
    format::sort_by_name(&mut rows);

    let rendered = match output {
        Format::Table => format::to_table(&rows, &columns),
        Format::Json => format::to_json(&rows)? + "\n",
        Format::Tsv => format::to_tsv(&rows, &columns),
        Format::Html => format::to_html(&rows, planner.registry(), &columns, title),
    };
    print!("{rendered}");
    Ok(())
}
