use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::story::Story;

/// Which way a measurement should move to count as an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImprovementDirection {
    Up,
    Down,
}

/// Numeric content of a [`Value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Scalar(f64),
    List(Vec<f64>),
}

impl Payload {
    pub fn samples(&self) -> &[f64] {
        match self {
            Self::Scalar(v) => std::slice::from_ref(v),
            Self::List(vs) => vs,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::List(_) => "list_of_scalar_values",
        }
    }
}

/// One measurement. A value without a story is a summary value.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub story: Option<Arc<Story>>,
    pub name: String,
    pub units: String,
    pub payload: Payload,
    pub improvement_direction: ImprovementDirection,
    pub grouping_label: Option<String>,
    pub description: Option<String>,
}

impl Value {
    /// Builds a value; the grouping label is taken from the story's
    /// grouping keys.
    pub fn new(
        story: Option<Arc<Story>>,
        name: impl Into<String>,
        units: impl Into<String>,
        payload: Payload,
        improvement_direction: ImprovementDirection,
    ) -> Self {
        let grouping_label = story.as_deref().and_then(Story::grouping_label);
        Self {
            story,
            name: name.into(),
            units: units.into(),
            payload,
            improvement_direction,
            grouping_label,
            description: None,
        }
    }

    pub fn scalar(
        story: Option<Arc<Story>>,
        name: impl Into<String>,
        units: impl Into<String>,
        value: f64,
        improvement_direction: ImprovementDirection,
    ) -> Self {
        Self::new(story, name, units, Payload::Scalar(value), improvement_direction)
    }

    pub fn list(
        story: Option<Arc<Story>>,
        name: impl Into<String>,
        units: impl Into<String>,
        values: Vec<f64>,
        improvement_direction: ImprovementDirection,
    ) -> Self {
        Self::new(story, name, units, Payload::List(values), improvement_direction)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_grouping_label(mut self, label: impl Into<String>) -> Self {
        self.grouping_label = Some(label.into());
        self
    }

    pub fn story_name(&self) -> Option<&str> {
        self.story.as_deref().map(|s| s.name.as_str())
    }

    pub fn as_dict(&self) -> ValueDict {
        let (value, values) = match &self.payload {
            Payload::Scalar(v) => (Some(*v), None),
            Payload::List(vs) => (None, Some(vs.clone())),
        };
        ValueDict {
            name: self.name.clone(),
            kind: self.payload.type_name(),
            units: self.units.clone(),
            value,
            values,
            improvement_direction: self.improvement_direction,
            description: self.description.clone(),
            grouping_label: self.grouping_label.clone(),
            story_tags: None,
        }
    }
}

/// Wire shape of a value inside chart-JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueDict {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub units: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    pub improvement_direction: ImprovementDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_label_comes_from_story() {
        let story = Arc::new(
            Story::new("s")
                .with_grouping_key("foo", "bar")
                .with_grouping_key("answer", "42"),
        );
        let v = Value::scalar(Some(story), "a", "seconds", 3.0, ImprovementDirection::Up);
        assert_eq!(v.grouping_label.as_deref(), Some("42_bar"));
    }

    #[test]
    fn dict_carries_payload_shape() {
        let v = Value::list(None, "a", "ms", vec![1.0, 2.0], ImprovementDirection::Down);
        let json = serde_json::to_value(v.as_dict()).unwrap();
        assert_eq!(json["type"], "list_of_scalar_values");
        assert_eq!(json["values"], serde_json::json!([1.0, 2.0]));
        assert_eq!(json["improvement_direction"], "down");
        assert!(json.get("value").is_none());
        assert!(json.get("grouping_label").is_none());
    }
}
