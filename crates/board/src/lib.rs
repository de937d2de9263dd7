use std::collections::{BTreeMap, BTreeSet};

use shared::domain::{BuildKind, Job};
use tracing::debug;

pub mod classify;
pub mod failing;
pub mod render;

pub use classify::{
    classify, classify_name, compare_by_priority, label_order, order_of, Classified, LabelStyle,
};
pub use failing::{failing_since_number, needs_lookup, FailingSince};

/// Architecture → column label → job.
pub type Grouping = BTreeMap<String, BTreeMap<String, Job>>;

/// What a (row, column) position of the table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell<'a> {
    /// No job for this architecture and label.
    Absent,
    /// The job exists but has never completed a build.
    Pending(&'a Job),
    Completed(&'a Job),
}

pub fn insert(grouping: &mut Grouping, arch: &str, label: &str, job: Job) {
    grouping
        .entry(arch.to_string())
        .or_default()
        .insert(label.to_string(), job);
}

/// Union of every architecture's labels, oldest version first.
pub fn column_labels(grouping: &Grouping) -> Vec<String> {
    let unique: BTreeSet<&String> = grouping.values().flat_map(|row| row.keys()).collect();
    let mut labels: Vec<String> = unique.into_iter().cloned().collect();
    labels.sort_by(|a, b| {
        label_order(a)
            .cmp(&label_order(b))
            .then_with(|| compare_by_priority(a, b))
    });
    labels
}

pub fn cell_for<'a>(grouping: &'a Grouping, arch: &str, label: &str) -> Cell<'a> {
    match grouping.get(arch).and_then(|row| row.get(label)) {
        None => Cell::Absent,
        Some(job) if job.last_completed_build.is_none() => Cell::Pending(job),
        Some(job) => Cell::Completed(job),
    }
}

/// Jobs of one CI view, grouped for display.
#[derive(Debug, Clone, Default)]
pub struct Board {
    style: LabelStyle,
    cells: Grouping,
    test_suites: Grouping,
}

impl Board {
    pub fn new(style: LabelStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn from_jobs(jobs: impl IntoIterator<Item = Job>, style: LabelStyle) -> Self {
        let mut board = Self::new(style);
        for job in jobs {
            board.add(job);
        }
        board
    }

    /// Classifies and files one job; unrecognised names are dropped.
    pub fn add(&mut self, job: Job) {
        let Some(classified) = classify(&job) else {
            debug!(name = %job.name, "skipping job with unrecognised name");
            return;
        };
        let label = classified.label(self.style);
        let target = match (self.style, classified.kind) {
            (LabelStyle::Version, BuildKind::Test) => &mut self.test_suites,
            _ => &mut self.cells,
        };
        insert(target, &classified.arch, &label, job);
    }

    pub fn style(&self) -> LabelStyle {
        self.style
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row keys, in display order.
    pub fn architectures(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn column_labels(&self) -> Vec<String> {
        column_labels(&self.cells)
    }

    pub fn cell(&self, arch: &str, label: &str) -> Cell<'_> {
        cell_for(&self.cells, arch, label)
    }

    /// Test job paired with the build cell at the same position.
    ///
    /// Only populated with [`LabelStyle::Version`]; a test job without a
    /// matching build job is never shown.
    pub fn test_suite(&self, arch: &str, label: &str) -> Option<&Job> {
        self.cells.get(arch)?.get(label)?;
        self.test_suites.get(arch)?.get(label)
    }

    /// Every job shown in the table.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.cells.values().flat_map(|row| row.values())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
