use std::{cmp::Ordering, str::FromStr};

use shared::domain::{BuildKind, Job};

const NAME_PREFIX: &str = "FreeBSD";
const PRIORITY: &str = "abcdefghijklmnopqrstuvwxyz9876543210";

/// How column labels are derived from a classified job name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelStyle {
    /// `stable/13`; test jobs are folded into the matching build cell.
    #[default]
    Version,
    /// `stable/13-build`, `stable/13-test`; every kind gets its own column.
    VersionKind,
}

impl FromStr for LabelStyle {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "version" => Ok(Self::Version),
            "version-kind" => Ok(Self::VersionKind),
            other => Err(format!(
                "unknown label style '{other}', expected version or version-kind"
            )),
        }
    }
}

/// A job name split into its `FreeBSD-<version>-<arch>-<kind>` parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub arch: String,
    /// Version tokens joined by `/`, e.g. `head` or `stable/13`.
    pub version: String,
    pub kind: BuildKind,
    pub order: u64,
}

impl Classified {
    pub fn label(&self, style: LabelStyle) -> String {
        match style {
            LabelStyle::Version => self.version.clone(),
            LabelStyle::VersionKind => format!("{}-{}", self.version, self.kind),
        }
    }
}

pub fn classify(job: &Job) -> Option<Classified> {
    classify_name(&job.name)
}

/// Splits `FreeBSD-stable-13-amd64-build` into `amd64`, `stable/13`, `build`.
///
/// Names with another prefix, another trailing kind, or missing tokens yield
/// `None`.
pub fn classify_name(name: &str) -> Option<Classified> {
    let tokens: Vec<&str> = name.split('-').collect();
    let (first, rest) = tokens.split_first()?;
    if *first != NAME_PREFIX {
        return None;
    }
    let (kind, rest) = rest.split_last()?;
    let kind = BuildKind::from_token(kind)?;
    let (arch, version) = rest.split_last()?;
    if arch.is_empty() || version.is_empty() || version.iter().any(|token| token.is_empty()) {
        return None;
    }

    Some(Classified {
        arch: (*arch).to_string(),
        version: version.join("/"),
        kind,
        order: order_of(version),
    })
}

/// Order value of a version: a bare branch name (`head`) is newest and sorts
/// last, numbered branches sort by their number.
pub fn order_of<S: AsRef<str>>(version_tokens: &[S]) -> u64 {
    if version_tokens.len() == 1 {
        return u64::MAX;
    }
    version_tokens
        .get(1)
        .map(|token| leading_number(token.as_ref()))
        .unwrap_or(0)
}

/// Order value of a column label in either [`LabelStyle`].
pub fn label_order(label: &str) -> u64 {
    let version = match label.rsplit_once('-') {
        Some((version, kind)) if BuildKind::from_token(kind).is_some() => version,
        _ => label,
    };
    let tokens: Vec<&str> = version.split('/').collect();
    order_of(&tokens)
}

/// Character-wise comparison by rank in `a..z` followed by `9..0`.
///
/// Characters outside that set rank after it, by code point. A prefix sorts
/// before the longer string.
pub fn compare_by_priority(a: &str, b: &str) -> Ordering {
    a.chars().map(priority_rank).cmp(b.chars().map(priority_rank))
}

fn priority_rank(c: char) -> (usize, u32) {
    match PRIORITY.find(c) {
        Some(rank) => (rank, 0),
        None => (PRIORITY.len(), u32::from(c)),
    }
}

fn leading_number(token: &str) -> u64 {
    let digits_end = token
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(idx, _)| idx)
        .unwrap_or(token.len());
    let digits = &token[..digits_end];
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}
