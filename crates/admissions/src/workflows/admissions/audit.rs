use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{LogId, UserId};
use super::repository::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Student,
    Teacher,
    Application,
    Qualification,
    Draw,
    Phase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

/// One committed mutation, with before/after snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationLog {
    pub id: LogId,
    pub record: RecordKind,
    pub operation: OperationKind,
    pub record_id: u64,
    pub operator_id: Option<UserId>,
    pub old_data: Option<Value>,
    pub new_data: Option<Value>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOperationLog {
    pub record: RecordKind,
    pub operation: OperationKind,
    pub record_id: u64,
    pub operator_id: Option<UserId>,
    pub old_data: Option<Value>,
    pub new_data: Option<Value>,
    pub recorded_at: DateTime<Utc>,
}

impl NewOperationLog {
    fn entry(
        record: RecordKind,
        operation: OperationKind,
        record_id: u64,
        operator_id: Option<UserId>,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            record,
            operation,
            record_id,
            operator_id,
            old_data: None,
            new_data: None,
            recorded_at,
        })
    }

    pub fn insert<T: Serialize>(
        record: RecordKind,
        record_id: u64,
        operator_id: Option<UserId>,
        created: &T,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            new_data: Some(snapshot(created)?),
            ..Self::entry(record, OperationKind::Insert, record_id, operator_id, recorded_at)?
        })
    }

    pub fn update<T: Serialize>(
        record: RecordKind,
        record_id: u64,
        operator_id: Option<UserId>,
        before: &T,
        after: &T,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            old_data: Some(snapshot(before)?),
            new_data: Some(snapshot(after)?),
            ..Self::entry(record, OperationKind::Update, record_id, operator_id, recorded_at)?
        })
    }

    pub fn delete<T: Serialize>(
        record: RecordKind,
        record_id: u64,
        operator_id: Option<UserId>,
        removed: &T,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            old_data: Some(snapshot(removed)?),
            ..Self::entry(record, OperationKind::Delete, record_id, operator_id, recorded_at)?
        })
    }

    pub fn into_log(self, id: LogId) -> OperationLog {
        OperationLog {
            id,
            record: self.record,
            operation: self.operation,
            record_id: self.record_id,
            operator_id: self.operator_id,
            old_data: self.old_data,
            new_data: self.new_data,
            recorded_at: self.recorded_at,
        }
    }
}

fn snapshot<T: Serialize>(value: &T) -> Result<Value, RepositoryError> {
    Ok(serde_json::to_value(value)?)
}

/// Query filter for the operation log. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub record: Option<RecordKind>,
    #[serde(default)]
    pub operation: Option<OperationKind>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl LogFilter {
    pub fn matches(&self, log: &OperationLog) -> bool {
        let day = log.recorded_at.date_naive();
        self.record.map_or(true, |record| record == log.record)
            && self.operation.map_or(true, |op| op == log.operation)
            && self.start_date.map_or(true, |start| day >= start)
            && self.end_date.map_or(true, |end| day <= end)
    }

    /// Matching entries, newest first.
    pub fn apply(&self, logs: &[OperationLog]) -> Vec<OperationLog> {
        let mut matched: Vec<OperationLog> =
            logs.iter().filter(|log| self.matches(log)).cloned().collect();
        matched.sort_by(|a, b| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        matched
    }
}
