use shared::domain::{BuildResult, Job};

/// Annotation shown under a build that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailingSince {
    /// Points at the last good build; used when no lookup was made.
    LastSuccessful {
        revision: Option<String>,
        url: Option<String>,
    },
    /// First build of the failing streak, resolved through the CI API.
    FirstFailing {
        number: u64,
        revision: Option<String>,
        url: String,
    },
}

impl FailingSince {
    pub fn from_last_successful(job: &Job) -> Self {
        let last = job.last_successful_build.as_ref();
        Self::LastSuccessful {
            revision: last.and_then(|build| build.description.clone()),
            url: last.and_then(|build| build.url.clone()),
        }
    }

    pub fn revision(&self) -> Option<&str> {
        match self {
            Self::LastSuccessful { revision, .. } | Self::FirstFailing { revision, .. } => {
                revision.as_deref()
            }
        }
    }

    pub fn href(&self) -> &str {
        match self {
            Self::LastSuccessful { url, .. } => url.as_deref().unwrap_or("#"),
            Self::FirstFailing { url, .. } => url,
        }
    }

    pub fn link_text(&self) -> String {
        match self {
            Self::LastSuccessful { .. } => "last successful build".to_string(),
            Self::FirstFailing { number, .. } => format!("first failing build #{number}"),
        }
    }
}

/// Whether the last completed build is one whose streak start can be looked up.
pub fn needs_lookup(job: &Job) -> bool {
    matches!(
        job.last_completed_build
            .as_ref()
            .and_then(|build| build.result.as_ref()),
        Some(BuildResult::Failure | BuildResult::Unstable)
    )
}

/// Build number at which the current failing streak began.
///
/// FAILURE counts from the last successful build, UNSTABLE from the later of
/// the last stable and last failed builds. `None` when the result is anything
/// else or the builds needed are missing.
pub fn failing_since_number(job: &Job) -> Option<u64> {
    let result = job.last_completed_build.as_ref()?.result.as_ref()?;
    let number = match result {
        BuildResult::Failure => job.last_successful_build.as_ref()?.number?,
        BuildResult::Unstable => {
            let stable = job.last_stable_build.as_ref().and_then(|build| build.number);
            let failed = job.last_failed_build.as_ref().and_then(|build| build.number);
            stable.max(failed)?
        }
        _ => return None,
    };
    number.checked_add(1)
}

#[cfg(test)]
mod tests {
    use shared::domain::Build;

    use super::*;

    fn numbered(number: u64) -> Option<Build> {
        Some(Build {
            number: Some(number),
            ..Build::default()
        })
    }

    fn job_with_result(result: BuildResult) -> Job {
        let mut job = Job::named("FreeBSD-head-amd64-build");
        job.last_completed_build = Some(Build {
            number: Some(40),
            result: Some(result),
            ..Build::default()
        });
        job
    }

    #[test]
    fn failure_counts_from_last_success() {
        let mut job = job_with_result(BuildResult::Failure);
        job.last_successful_build = numbered(31);
        job.last_stable_build = numbered(35);
        assert_eq!(failing_since_number(&job), Some(32));
        assert!(needs_lookup(&job));
    }

    #[test]
    fn failure_without_success_is_unknown() {
        let mut job = job_with_result(BuildResult::Failure);
        job.last_failed_build = numbered(39);
        assert_eq!(failing_since_number(&job), None);
    }

    #[test]
    fn unstable_counts_from_later_of_stable_and_failed() {
        let mut job = job_with_result(BuildResult::Unstable);
        job.last_stable_build = numbered(20);
        job.last_failed_build = numbered(25);
        job.last_successful_build = numbered(38);
        assert_eq!(failing_since_number(&job), Some(26));

        job.last_failed_build = None;
        assert_eq!(failing_since_number(&job), Some(21));

        job.last_stable_build = None;
        assert_eq!(failing_since_number(&job), None);
    }

    #[test]
    fn other_results_have_no_lookup() {
        for result in [
            BuildResult::Success,
            BuildResult::Aborted,
            BuildResult::NotBuilt,
            BuildResult::Other("IN_PROGRESS".into()),
        ] {
            let mut job = job_with_result(result);
            job.last_successful_build = numbered(3);
            assert!(!needs_lookup(&job));
            assert_eq!(failing_since_number(&job), None);
        }
    }

    #[test]
    fn last_successful_annotation_falls_back_to_placeholders() {
        let job = job_with_result(BuildResult::Failure);
        let annotation = FailingSince::from_last_successful(&job);
        assert_eq!(annotation.revision(), None);
        assert_eq!(annotation.href(), "#");
        assert_eq!(annotation.link_text(), "last successful build");
    }
}
