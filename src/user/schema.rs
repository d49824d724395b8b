use crate::sqlite_column;
use crate::sqlite_persistence::{Column, Index, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

const USER_TABLE: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("handle", SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[Index {
        name: "idx_user_handle",
        columns: &["handle"],
        unique: true,
    }],
};

const LISTENING_EVENTS_TABLE: Table = Table {
    name: "listening_events",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            SqlType::Integer,
            non_null = true,
            references = Some("user(id)")
        ),
        sqlite_column!("track_id", SqlType::Text, non_null = true),
        sqlite_column!("session_id", SqlType::Text),
        sqlite_column!("played_at", SqlType::Integer, non_null = true),
        sqlite_column!("play_duration_seconds", SqlType::Integer, non_null = true),
        sqlite_column!("completion", SqlType::Real, non_null = true),
        sqlite_column!("source", SqlType::Text),
        sqlite_column!("date", SqlType::Integer, non_null = true),
    ],
    indices: &[
        Index {
            name: "idx_listening_events_session_id",
            columns: &["session_id"],
            unique: true,
        },
        Index {
            name: "idx_listening_events_user_date",
            columns: &["user_id", "date"],
            unique: false,
        },
        Index {
            name: "idx_listening_events_date",
            columns: &["date"],
            unique: false,
        },
        Index {
            name: "idx_listening_events_track_id",
            columns: &["track_id"],
            unique: false,
        },
    ],
};

const RATINGS_TABLE: Table = Table {
    name: "ratings",
    columns: &[
        sqlite_column!(
            "user_id",
            SqlType::Integer,
            non_null = true,
            references = Some("user(id)")
        ),
        sqlite_column!("track_id", SqlType::Text, non_null = true),
        sqlite_column!("rating", SqlType::Integer),
        sqlite_column!("is_loved", SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("is_banned", SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!(
            "updated",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        Index {
            name: "idx_ratings_user_track",
            columns: &["user_id", "track_id"],
            unique: true,
        },
        Index {
            name: "idx_ratings_track_id",
            columns: &["track_id"],
            unique: false,
        },
    ],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[USER_TABLE, LISTENING_EVENTS_TABLE, RATINGS_TABLE],
    migration: None,
}];
