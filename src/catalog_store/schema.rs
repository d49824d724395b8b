use crate::sqlite_column;
use crate::sqlite_persistence::{Column, Index, SqlType, Table, VersionedSchema};

const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("title", SqlType::Text, non_null = true),
        sqlite_column!("artist_id", SqlType::Text, non_null = true),
        sqlite_column!("album_id", SqlType::Text),
        sqlite_column!("duration_seconds", SqlType::Integer, non_null = true),
        sqlite_column!("play_count", SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("love_count", SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("last_played_at", SqlType::Integer),
    ],
    indices: &[
        Index {
            name: "idx_tracks_artist_id",
            columns: &["artist_id"],
            unique: false,
        },
        Index {
            name: "idx_tracks_play_count",
            columns: &["play_count"],
            unique: false,
        },
    ],
};

const TRACK_GENRES_TABLE: Table = Table {
    name: "track_genres",
    columns: &[
        sqlite_column!(
            "track_id",
            SqlType::Text,
            non_null = true,
            references = Some("tracks(id)")
        ),
        sqlite_column!("genre", SqlType::Text, non_null = true),
        sqlite_column!("weight", SqlType::Real, non_null = true),
    ],
    indices: &[
        Index {
            name: "idx_track_genres_track_genre",
            columns: &["track_id", "genre"],
            unique: true,
        },
        Index {
            name: "idx_track_genres_genre",
            columns: &["genre"],
            unique: false,
        },
    ],
};

const ARTIST_RELATIONSHIPS_TABLE: Table = Table {
    name: "artist_relationships",
    columns: &[
        sqlite_column!("artist_id", SqlType::Text, non_null = true),
        sqlite_column!("related_artist_id", SqlType::Text, non_null = true),
        sqlite_column!("relationship_type", SqlType::Text, non_null = true),
        sqlite_column!("strength", SqlType::Real, non_null = true),
    ],
    indices: &[Index {
        name: "idx_artist_relationships_edge",
        columns: &["artist_id", "related_artist_id", "relationship_type"],
        unique: true,
    }],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[TRACKS_TABLE, TRACK_GENRES_TABLE, ARTIST_RELATIONSHIPS_TABLE],
    migration: None,
}];
