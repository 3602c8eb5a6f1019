use std::collections::HashMap;
use std::fmt;

use crate::error::UsageError;
use crate::story::Story;
use crate::value::Value;

/// Acceptance predicate: `(value name, is first result for this story)`.
pub type ValueFilter = Box<dyn Fn(&str, bool) -> bool + Send + Sync>;

const RESERVED_NAME: &str = "url";

/// Ordered measurements plus the unit recorded for every value name.
#[derive(Default)]
pub struct ValueStore {
    page_values: Vec<Value>,
    summary_values: Vec<Value>,
    units: HashMap<String, String>,
    filter: Option<ValueFilter>,
}

impl fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStore")
            .field("page_values", &self.page_values.len())
            .field("summary_values", &self.summary_values.len())
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: ValueFilter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn accepts(&self, name: &str, is_first_result: bool) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |accept| accept(name, is_first_result))
    }

    pub(crate) fn check_name(value: &Value) -> Result<(), UsageError> {
        if value.name == RESERVED_NAME {
            return Err(UsageError::ReservedValueName);
        }
        Ok(())
    }

    fn check_units(&self, value: &Value) -> Result<(), UsageError> {
        match self.units.get(&value.name) {
            Some(units) if *units != value.units => Err(UsageError::UnitMismatch {
                name: value.name.clone(),
                expected: units.clone(),
                actual: value.units.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn remember_units(&mut self, value: &Value) {
        self.units
            .entry(value.name.clone())
            .or_insert_with(|| value.units.clone());
    }

    /// Validates and stores a per-story value. Returns `false` when the
    /// acceptance predicate rejected it.
    pub(crate) fn add_page_value(
        &mut self,
        value: Value,
        is_first_result: bool,
    ) -> Result<bool, UsageError> {
        Self::check_name(&value)?;
        self.check_units(&value)?;
        if !self.accepts(&value.name, is_first_result) {
            return Ok(false);
        }
        self.remember_units(&value);
        self.page_values.push(value);
        Ok(true)
    }

    /// Summary values bypass the acceptance predicate.
    pub(crate) fn add_summary_value(&mut self, value: Value) -> Result<(), UsageError> {
        Self::check_name(&value)?;
        self.check_units(&value)?;
        self.remember_units(&value);
        self.summary_values.push(value);
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn find_page_specific_values_for_page(
        &self,
        story: &Story,
        name: &str,
    ) -> Vec<&Value> {
        self.page_values
            .iter()
            .filter(|v| v.name == name && v.story.as_deref() == Some(story))
            .collect()
    }

    pub fn find_all_page_specific_values_named(&self, name: &str) -> Vec<&Value> {
        self.page_values.iter().filter(|v| v.name == name).collect()
    }

    /// Searches per-story values first, then summary values.
    pub fn find_values(&self, predicate: impl Fn(&Value) -> bool) -> Vec<&Value> {
        self.page_values
            .iter()
            .chain(&self.summary_values)
            .filter(|v| predicate(v))
            .collect()
    }

    pub fn all_page_specific_values(&self) -> &[Value] {
        &self.page_values
    }

    pub fn all_summary_values(&self) -> &[Value] {
        &self.summary_values
    }

    pub fn len(&self) -> usize {
        self.page_values.len() + self.summary_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
