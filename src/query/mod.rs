//! Compilation of built filters into a remote query string.
//!
//! Precedence, highest first: an exact ticket key, the raw query, the
//! AND-combined filter clauses, and finally the project default query.
//! The same filters always compile to the same bytes, which the pager
//! relies on to tell whether a search repeats the previous query.

pub mod clause;

pub use clause::{Clause, quote};

use jiff::civil::Date;

use crate::config::{Config, QueryConfig};
use crate::error::{DeckError, Result};
use crate::types::{BuiltFilters, CompiledQuery, DateAxis, FilterField, FilterKind};

const PROJECT_FIELD: &str = "project";
const STATUS_FIELD: &str = "status";

#[derive(Debug, Clone)]
pub struct QueryCompiler {
    fields: QueryConfig,
    project: String,
}

impl QueryCompiler {
    pub fn new(fields: QueryConfig, project: impl Into<String>) -> Self {
        Self {
            fields,
            project: project.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.query.clone(), config.remote.project.clone())
    }

    pub fn compile(&self, filters: &BuiltFilters) -> Result<CompiledQuery> {
        match filters {
            BuiltFilters::ExactKey(key) => Ok(CompiledQuery::new(
                Clause::Equals {
                    field: self.fields.key_field.clone(),
                    value: key.clone(),
                }
                .to_string(),
            )),
            BuiltFilters::Raw(raw) => {
                if raw.trim().is_empty() {
                    return Err(DeckError::BlankRawQuery);
                }
                Ok(CompiledQuery::new(raw.clone()))
            }
            BuiltFilters::Filters(snapshot) if !snapshot.is_empty() => {
                let clauses: Vec<String> = snapshot
                    .fields()
                    .map(|field| self.clause_for(field).to_string())
                    .collect();
                Ok(self.ordered(clauses.join(" AND ")))
            }
            BuiltFilters::Filters(_) | BuiltFilters::NoFilters => Ok(self.default_query()),
        }
    }

    /// Open issues of the working project, newest first
    pub fn default_query(&self) -> CompiledQuery {
        let mut clauses = vec![Clause::Equals {
            field: PROJECT_FIELD.to_string(),
            value: self.project.clone(),
        }];
        if !self.fields.terminal_statuses.is_empty() {
            clauses.push(Clause::NotIn {
                field: STATUS_FIELD.to_string(),
                values: self.fields.terminal_statuses.clone(),
            });
        }
        let body: Vec<String> = clauses.iter().map(ToString::to_string).collect();
        self.ordered(body.join(" AND "))
    }

    fn ordered(&self, body: String) -> CompiledQuery {
        CompiledQuery::new(format!("{body} ORDER BY {}", self.fields.order_by))
    }

    fn clause_for(&self, field: &FilterField) -> Clause {
        let value = field.canonical_value.clone();
        match field.kind {
            FilterKind::Categorical => Clause::Equals {
                field: self.categorical_field(&field.name),
                value,
            },
            FilterKind::FreeText => Clause::Contains {
                field: self.fields.text_field.clone(),
                value,
            },
            FilterKind::DateFrom(axis) => Clause::OnOrAfter {
                field: self.date_field(axis),
                date: value,
            },
            FilterKind::DateTo(axis) => end_of_day(self.date_field(axis), value),
        }
    }

    fn categorical_field(&self, name: &str) -> String {
        self.fields
            .fields
            .get(name)
            .cloned()
            .unwrap_or_else(|| quote(name))
    }

    fn date_field(&self, axis: DateAxis) -> String {
        match axis {
            DateAxis::Created => self.fields.created_field.clone(),
            DateAxis::Completed => self.fields.completed_field.clone(),
        }
    }
}

/// Inclusive upper date bound. Date fields are timestamps, so `<= day`
/// would stop at the day's first instant; compare against the next day
/// instead. Values that are not calendar dates pass through quoted.
fn end_of_day(field: String, value: String) -> Clause {
    match value.parse::<Date>().and_then(|day| day.tomorrow()) {
        Ok(next) => Clause::Before {
            field,
            date: next.to_string(),
        },
        Err(e) => {
            tracing::debug!(date = %value, error = %e, "date bound is not a calendar date");
            Clause::OnOrBefore { field, date: value }
        }
    }
}
