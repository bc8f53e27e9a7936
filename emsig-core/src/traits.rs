//! Traits shared by gene sets, rankings, test results and descriptors.

/// Carries the number a result is judged by: a p-value, an overlap count
/// or a percentage.
pub trait Scored {
    fn score(&self) -> f64;
}

/// Named items: gene sets, datasets, rankings.
pub trait Annotated {
    /// Identifier, unique within its container.
    fn name(&self) -> &str;

    /// Free-text description, e.g. the second column of a GMT line.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// One-line human-readable rendering for logs and reports.
pub trait Summarizable {
    fn summary(&self) -> String;
}
