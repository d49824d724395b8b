mod versioned_schema;

pub use versioned_schema::{
    open_versioned, Column, Index, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};
