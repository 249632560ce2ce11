//! Shared database mapping utilities to reduce code duplication
//!
//! This module provides helper functions for parsing complex JSON fields
//! from database rows, handling the differences between PostgreSQL and SQLite.

use recur_core::{EngineError, EngineResult};
use recur_domain::entities::RecurrenceRule;

/// Helper functions for parsing database fields across different database types
pub struct MappingHelpers;

impl MappingHelpers {
    /// Parse tags field from either Vec<String> (PostgreSQL) or JSON string (SQLite)
    pub fn parse_tags_postgres(row: &sqlx::postgres::PgRow, field_name: &str) -> Vec<String> {
        use sqlx::Row;
        row.try_get::<Vec<String>, _>(field_name).unwrap_or_default()
    }

    pub fn parse_tags_sqlite(row: &sqlx::sqlite::SqliteRow, field_name: &str) -> Vec<String> {
        use sqlx::Row;
        if let Ok(Some(json_str)) = row.try_get::<Option<String>, _>(field_name) {
            serde_json::from_str(&json_str).unwrap_or_default()
        } else {
            Vec::new()
        }
    }

    /// Parse recurrence field from either serde_json::Value (PostgreSQL) or JSON string (SQLite)
    pub fn parse_recurrence_postgres(
        row: &sqlx::postgres::PgRow,
        field_name: &str,
    ) -> EngineResult<Option<RecurrenceRule>> {
        use sqlx::Row;
        let rule_value = row
            .try_get::<Option<serde_json::Value>, _>(field_name)
            .ok()
            .flatten();

        match rule_value {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| EngineError::Serialization(format!("解析循环规则失败: {e}")))
                .map(Some),
            None => Ok(None),
        }
    }

    pub fn parse_recurrence_sqlite(
        row: &sqlx::sqlite::SqliteRow,
        field_name: &str,
    ) -> EngineResult<Option<RecurrenceRule>> {
        use sqlx::Row;
        if let Ok(Some(json_str)) = row.try_get::<Option<String>, _>(field_name) {
            serde_json::from_str(&json_str)
                .map_err(|e| EngineError::Serialization(format!("解析循环规则失败: {e}")))
                .map(Some)
        } else {
            Ok(None)
        }
    }

    /// Serialize tags to a JSON string for TEXT-column storage
    pub fn tags_to_json(tags: &[String]) -> EngineResult<String> {
        serde_json::to_string(tags)
            .map_err(|e| EngineError::Serialization(format!("序列化标签失败: {e}")))
    }

    /// Serialize an optional recurrence rule to a JSON string for TEXT-column storage
    pub fn recurrence_to_json(rule: Option<&RecurrenceRule>) -> EngineResult<Option<String>> {
        match rule {
            Some(rule) => serde_json::to_string(rule)
                .map_err(|e| EngineError::Serialization(format!("序列化循环规则失败: {e}")))
                .map(Some),
            None => Ok(None),
        }
    }

    /// Serialize an optional recurrence rule to a JSON value for JSONB-column storage
    pub fn recurrence_to_value(
        rule: Option<&RecurrenceRule>,
    ) -> EngineResult<Option<serde_json::Value>> {
        match rule {
            Some(rule) => serde_json::to_value(rule)
                .map_err(|e| EngineError::Serialization(format!("序列化循环规则失败: {e}")))
                .map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recur_domain::entities::RecurrenceType;

    #[test]
    fn test_recurrence_json_round_trip() {
        let rule = RecurrenceRule {
            rule_type: RecurrenceType::Weekly,
            interval: 2,
            weekdays: vec![1, 3],
            week_of_month: None,
            month_day: None,
            end_date: None,
            completion_based: false,
            series_start: None,
        };

        let json = MappingHelpers::recurrence_to_json(Some(&rule))
            .unwrap()
            .unwrap();
        let parsed: RecurrenceRule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.rule_type, RecurrenceType::Weekly);
        assert_eq!(parsed.interval, 2);
        assert_eq!(parsed.weekdays, vec![1, 3]);
    }

    #[test]
    fn test_none_rule_maps_to_none() {
        assert!(MappingHelpers::recurrence_to_json(None).unwrap().is_none());
        assert!(MappingHelpers::recurrence_to_value(None).unwrap().is_none());
    }
}
