use crate::sqlite_column;
use crate::sqlite_persistence::{Column, Index, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

const JOB_RUN_TABLE: Table = Table {
    name: "job_run",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("job_id", SqlType::Text, non_null = true),
        sqlite_column!(
            "started_at",
            SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("finished_at", SqlType::Integer),
        sqlite_column!("status", SqlType::Text, non_null = true),
        sqlite_column!("error_message", SqlType::Text),
        sqlite_column!("triggered_by", SqlType::Text, non_null = true),
    ],
    indices: &[Index {
        name: "idx_job_run_job_id",
        columns: &["job_id"],
        unique: false,
    }],
};

const SERVER_STATE_TABLE: Table = Table {
    name: "server_state",
    columns: &[
        sqlite_column!("key", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("value", SqlType::Text, non_null = true),
        sqlite_column!(
            "updated",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

pub const SERVER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[JOB_RUN_TABLE, SERVER_STATE_TABLE],
    migration: None,
}];
