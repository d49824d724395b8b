use crate::sqlite_column;
use crate::sqlite_persistence::{Column, Index, SqlType, Table, VersionedSchema};

const RECOMMENDATIONS_TABLE: Table = Table {
    name: "recommendations",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("user_id", SqlType::Integer, non_null = true),
        sqlite_column!("track_id", SqlType::Text, non_null = true),
        sqlite_column!("recommendation_type", SqlType::Text, non_null = true),
        sqlite_column!("score", SqlType::Real, non_null = true),
        sqlite_column!("reason", SqlType::Text, non_null = true),
        sqlite_column!("metadata", SqlType::Text),
        sqlite_column!("is_consumed", SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("consumed_at", SqlType::Integer),
        sqlite_column!("created_at", SqlType::Integer, non_null = true),
        sqlite_column!("expires_at", SqlType::Integer, non_null = true),
    ],
    indices: &[
        // One row per (user, track, type); regeneration supersedes in place.
        Index {
            name: "idx_recommendations_user_track_type",
            columns: &["user_id", "track_id", "recommendation_type"],
            unique: true,
        },
        Index {
            name: "idx_recommendations_user_expires",
            columns: &["user_id", "expires_at"],
            unique: false,
        },
    ],
};

pub const RECOMMENDATION_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[RECOMMENDATIONS_TABLE],
    migration: None,
}];
