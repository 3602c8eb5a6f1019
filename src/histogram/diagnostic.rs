use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved diagnostic names.
pub mod names {
    pub const BENCHMARKS: &str = "benchmarks";
    pub const BENCHMARK_START: &str = "benchmarkStart";
    pub const BENCHMARK_DESCRIPTIONS: &str = "benchmarkDescriptions";
    pub const LABELS: &str = "labels";
    pub const STORIES: &str = "stories";
    pub const STORY_TAGS: &str = "storyTags";
    pub const GROUPING_LABEL: &str = "groupingLabel";
    pub const OS_NAMES: &str = "osNames";
    pub const OS_VERSIONS: &str = "osVersions";
}

/// Namespace for content-derived diagnostic GUIDs.
const GUID_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_0a5e_93d2_4b7a_9e0f_5d8b_2a4c_71e3);

/// Typed metadata attached to histograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Diagnostic {
    GenericSet { values: Vec<serde_json::Value> },
    /// Milliseconds since the epoch.
    DateRange { min: f64, max: f64 },
}

impl Diagnostic {
    pub fn generic_set<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<serde_json::Value>,
    {
        Self::GenericSet {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// A zero-width range anchored at `at`.
    pub fn date(at: DateTime<Utc>) -> Self {
        let ms = at.timestamp_millis() as f64;
        Self::DateRange { min: ms, max: ms }
    }

    /// Identity derived from content: equal diagnostics share a GUID.
    pub fn guid(&self) -> String {
        let canonical =
            serde_json::to_vec(self).expect("diagnostic serialization");
        Uuid::new_v5(&GUID_NAMESPACE, &canonical).to_string()
    }

    pub fn values(&self) -> Option<&[serde_json::Value]> {
        match self {
            Self::GenericSet { values } => Some(values),
            Self::DateRange { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_follows_content() {
        let a = Diagnostic::generic_set(["baz"]);
        let b = Diagnostic::generic_set(["baz"]);
        let c = Diagnostic::generic_set(["qux"]);
        assert_eq!(a.guid(), b.guid());
        assert_ne!(a.guid(), c.guid());
    }

    #[test]
    fn wire_shape_is_tagged() {
        let json = serde_json::to_value(Diagnostic::generic_set(["x"])).unwrap();
        assert_eq!(json, serde_json::json!({"type": "GenericSet", "values": ["x"]}));

        let at = DateTime::from_timestamp(1_500_000_000, 0).unwrap();
        let json = serde_json::to_value(Diagnostic::date(at)).unwrap();
        assert_eq!(json["type"], "DateRange");
        assert_eq!(json["min"], 1_500_000_000_000.0);
    }
}
