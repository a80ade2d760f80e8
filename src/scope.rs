//! Role-scoped query construction for the property registry.
//!
//! A [`PropertyQuery`] is rendered two ways from the same description: as SQL through
//! `sqlx::QueryBuilder` (values are always bound, never interpolated), and as an
//! in-memory predicate over [`PropertyRecord`] rows.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::{PropertyRecord, Role};

/// Offence values equal to this sentinel select the catch-all bucket by prefix.
pub const OTHER_SENTINEL: &str = "other";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search value must not be empty")]
    EmptyValue,
    #[error("invalid date, expected YYYY-MM-DD: {0}")]
    InvalidDate(String),
}

/// Scope
///
/// Station visibility of a caller. `None` means every station is visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    station: Option<String>,
}

impl Scope {
    pub fn for_caller(role: Role, station: &str) -> Self {
        if role.is_administrative() {
            Self::unrestricted()
        } else {
            Self {
                station: Some(station.to_string()),
            }
        }
    }

    pub fn unrestricted() -> Self {
        Self { station: None }
    }

    pub fn station(&self) -> Option<&str> {
        self.station.as_deref()
    }

    /// Exact station match; unrestricted scopes allow everything.
    pub fn allows(&self, station: &str) -> bool {
        match &self.station {
            Some(own) => own == station,
            None => true,
        }
    }

    /// Appends ` AND <column> = $n` when the scope is station-bound.
    /// The builder must already be positioned after a `WHERE` clause.
    pub fn push_constraint(&self, builder: &mut QueryBuilder<'_, Postgres>, column: &str) {
        if let Some(station) = &self.station {
            builder.push(format!(" AND {column} = "));
            builder.push_bind(station.clone());
        }
    }
}

/// SearchCategory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SearchCategory {
    FirNumber,
    Offence,
    InvestigatingOfficer,
    Description,
    SeizedOn,
    SubmittedOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextColumn {
    FirNumber,
    OffenceCategory,
    InvestigatingOfficer,
    Description,
}

impl TextColumn {
    fn name(&self) -> &'static str {
        match self {
            TextColumn::FirNumber => "fir_number",
            TextColumn::OffenceCategory => "offence_category",
            TextColumn::InvestigatingOfficer => "investigating_officer",
            TextColumn::Description => "description",
        }
    }

    fn value<'a>(&self, record: &'a PropertyRecord) -> Option<&'a str> {
        match self {
            TextColumn::FirNumber => record.fir_number.as_deref(),
            TextColumn::OffenceCategory => record.offence_category.as_deref(),
            TextColumn::InvestigatingOfficer => record.investigating_officer.as_deref(),
            TextColumn::Description => record.description.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateColumn {
    SeizedAt,
    SubmittedAt,
}

impl DateColumn {
    fn name(&self) -> &'static str {
        match self {
            DateColumn::SeizedAt => "seized_at",
            DateColumn::SubmittedAt => "submitted_at",
        }
    }

    fn value(&self, record: &PropertyRecord) -> Option<DateTime<Utc>> {
        match self {
            DateColumn::SeizedAt => record.seized_at,
            DateColumn::SubmittedAt => record.submitted_at,
        }
    }
}

/// SearchPredicate
///
/// The matching rule a search category compiles to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPredicate {
    /// Case-insensitive substring.
    Contains { column: TextColumn, needle: String },
    /// Case-insensitive prefix.
    StartsWith { column: TextColumn, prefix: String },
    /// Half-open interval `[start, end)`.
    Within {
        column: DateColumn,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl SearchPredicate {
    pub fn build(category: SearchCategory, value: &str) -> Result<Self, SearchError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SearchError::EmptyValue);
        }

        let text = |column: TextColumn| SearchPredicate::Contains {
            column,
            needle: value.to_string(),
        };

        Ok(match category {
            SearchCategory::FirNumber => text(TextColumn::FirNumber),
            SearchCategory::InvestigatingOfficer => text(TextColumn::InvestigatingOfficer),
            SearchCategory::Description => text(TextColumn::Description),
            SearchCategory::Offence if value.eq_ignore_ascii_case(OTHER_SENTINEL) => {
                SearchPredicate::StartsWith {
                    column: TextColumn::OffenceCategory,
                    prefix: OTHER_SENTINEL.to_string(),
                }
            }
            SearchCategory::Offence => text(TextColumn::OffenceCategory),
            SearchCategory::SeizedOn => day_range(DateColumn::SeizedAt, value)?,
            SearchCategory::SubmittedOn => day_range(DateColumn::SubmittedAt, value)?,
        })
    }

    pub fn push_sql(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            SearchPredicate::Contains { column, needle } => {
                builder.push(format!(" AND {} ILIKE ", column.name()));
                builder.push_bind(format!("%{}%", escape_like(needle)));
            }
            SearchPredicate::StartsWith { column, prefix } => {
                builder.push(format!(" AND {} ILIKE ", column.name()));
                builder.push_bind(format!("{}%", escape_like(prefix)));
            }
            SearchPredicate::Within { column, start, end } => {
                builder.push(format!(" AND {} >= ", column.name()));
                builder.push_bind(*start);
                builder.push(format!(" AND {} < ", column.name()));
                builder.push_bind(*end);
            }
        }
    }

    pub fn matches(&self, record: &PropertyRecord) -> bool {
        match self {
            SearchPredicate::Contains { column, needle } => column
                .value(record)
                .is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase())),
            SearchPredicate::StartsWith { column, prefix } => column
                .value(record)
                .is_some_and(|v| v.to_lowercase().starts_with(&prefix.to_lowercase())),
            SearchPredicate::Within { column, start, end } => column
                .value(record)
                .is_some_and(|ts| ts >= *start && ts < *end),
        }
    }
}

fn day_range(column: DateColumn, value: &str) -> Result<SearchPredicate, SearchError> {
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| SearchError::InvalidDate(value.to_string()))?;
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = start
        .checked_add_days(Days::new(1))
        .ok_or_else(|| SearchError::InvalidDate(value.to_string()))?;
    Ok(SearchPredicate::Within { column, start, end })
}

/// Escapes `ILIKE` metacharacters so user input only ever matches literally.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// PropertyQuery
///
/// A retrieval over complete property records, narrowed by caller scope and an
/// optional search predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyQuery {
    pub scope: Scope,
    pub predicate: Option<SearchPredicate>,
}

impl PropertyQuery {
    pub fn list(scope: Scope) -> Self {
        Self {
            scope,
            predicate: None,
        }
    }

    pub fn search(scope: Scope, category: SearchCategory, value: &str) -> Result<Self, SearchError> {
        Ok(Self {
            scope,
            predicate: Some(SearchPredicate::build(category, value)?),
        })
    }

    /// Appends the scope and predicate clauses to a builder already positioned after `WHERE`.
    pub fn push_filters(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        self.scope.push_constraint(builder, "station");
        if let Some(predicate) = &self.predicate {
            predicate.push_sql(builder);
        }
    }

    pub fn matches(&self, record: &PropertyRecord) -> bool {
        record.completed_id().is_some()
            && self.scope.allows(&record.station)
            && self
                .predicate
                .as_ref()
                .is_none_or(|predicate| predicate.matches(record))
    }
}
