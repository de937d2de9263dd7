use board::{
    failing_since_number, needs_lookup,
    render::{render_page, FailingSinceMap, PageOptions},
    Board, FailingSince, LabelStyle,
};
use tracing::{debug, info};

use crate::{error::ClientError, CiApi};

#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardOptions {
    pub label_style: LabelStyle,
    /// Ask the CI server for the revision at which each failure started.
    pub lookup_failing_since: bool,
}

/// One snapshot of the CI view, ready to render.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub board: Board,
    pub failing: FailingSinceMap,
}

impl Dashboard {
    pub fn render(&self, options: &PageOptions) -> String {
        render_page(&self.board, &self.failing, options)
    }
}

/// Fetches the job list and, when enabled, the start of every failure.
///
/// A failed lookup aborts the whole build; there is no partial dashboard.
pub async fn build_dashboard<A>(
    api: &A,
    options: &DashboardOptions,
) -> Result<Dashboard, ClientError>
where
    A: CiApi + ?Sized,
{
    let jobs = api.fetch_jobs().await?;
    info!(jobs = jobs.len(), "fetched job list");

    let board = Board::from_jobs(jobs, options.label_style);
    let mut failing = FailingSinceMap::new();

    if options.lookup_failing_since {
        for job in board.jobs().filter(|job| needs_lookup(job)) {
            let Some(number) = failing_since_number(job) else {
                debug!(name = %job.name, "no build history to locate failure start");
                continue;
            };
            let revision = api.fetch_build_description(&job.name, number).await?;
            debug!(name = %job.name, number, ?revision, "resolved failure start");
            failing.insert(
                job.name.clone(),
                FailingSince::FirstFailing {
                    number,
                    revision,
                    url: api.build_url(&job.name, number),
                },
            );
        }
    }

    Ok(Dashboard { board, failing })
}
