pub(super) const REGISTER_COLLECTION: &str = r#"
    INSERT OR IGNORE INTO collections (name, opened_at)
    VALUES (?1, ?2)
"#;

pub(super) const SELECT_RECORDS: &str = r#"
    SELECT record_id,
           server_id,
           sync_state,
           payload,
           updated_at
    FROM records
    WHERE collection = ?1
"#;

pub(super) const SELECT_RECORD_BY_ID: &str = r#"
    SELECT record_id,
           server_id,
           sync_state,
           payload,
           updated_at
    FROM records
    WHERE collection = ?1 AND record_id = ?2
"#;

pub(super) const UPSERT_RECORD: &str = r#"
    INSERT INTO records (
        collection,
        record_id,
        server_id,
        sync_state,
        payload,
        updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(collection, record_id) DO UPDATE SET
        server_id = COALESCE(excluded.server_id, records.server_id),
        sync_state = excluded.sync_state,
        payload = excluded.payload,
        updated_at = excluded.updated_at
"#;

pub(super) const CONFIRM_UNCHANGED_RECORD: &str = r#"
    UPDATE records
    SET server_id = COALESCE(?3, server_id),
        sync_state = ?4,
        payload = ?5,
        updated_at = ?6
    WHERE collection = ?1 AND record_id = ?2 AND updated_at = ?7
"#;

pub(super) const SET_SERVER_ID: &str = r#"
    UPDATE records
    SET server_id = ?3
    WHERE collection = ?1 AND record_id = ?2
"#;

pub(super) const LOCK_COLLECTION: &str = r#"
    UPDATE collections
    SET opened_at = opened_at
    WHERE name = ?1
"#;

pub(super) const COUNT_RECORDS: &str = r#"
    SELECT COUNT(*)
    FROM records
    WHERE collection = ?1
"#;

pub(super) const DELETE_RECORD: &str = r#"
    DELETE FROM records
    WHERE collection = ?1 AND record_id = ?2
"#;

pub(super) const DELETE_COLLECTION_RECORDS: &str = r#"
    DELETE FROM records
    WHERE collection = ?1
"#;

pub(super) const COUNT_DIRTY_RECORDS: &str = r#"
    SELECT COUNT(*)
    FROM records
    WHERE collection = ?1 AND sync_state != 'synced'
"#;

pub(super) const SELECT_KV: &str = r#"
    SELECT value FROM kv_store WHERE key = ?1
"#;

pub(super) const UPSERT_KV: &str = r#"
    INSERT INTO kv_store (key, value, updated_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

pub(super) const DELETE_KV: &str = r#"
    DELETE FROM kv_store WHERE key = ?1
"#;

pub(super) const INSERT_PENDING_MUTATION: &str = r#"
    INSERT INTO pending_mutations (
        mutation_id,
        queue,
        collection,
        record_id,
        action,
        payload,
        created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

pub(super) const SELECT_PENDING_MUTATIONS: &str = r#"
    SELECT mutation_id,
           queue,
           collection,
           record_id,
           action,
           payload,
           created_at
    FROM pending_mutations
    WHERE queue = ?1
    ORDER BY created_at ASC, seq ASC
"#;

pub(super) const DELETE_PENDING_MUTATION: &str = r#"
    DELETE FROM pending_mutations
    WHERE mutation_id = ?1
"#;

pub(super) const COUNT_PENDING_MUTATIONS: &str = r#"
    SELECT COUNT(*)
    FROM pending_mutations
    WHERE queue = ?1
"#;

pub(super) const SELECT_PENDING_RECORD_IDS: &str = r#"
    SELECT DISTINCT record_id
    FROM pending_mutations
    WHERE queue = ?1 AND collection = ?2
"#;
