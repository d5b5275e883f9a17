use super::error::SearchError;
use super::schema::{ImageDocument, NewImage, SearchParams};
use super::ImageSearch;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

const SELECT_COLUMNS: &str =
    "SELECT id, name, link, folder, filename, metadata, created_at, updated_at FROM images";

const HUMAN_TIME_FORMAT: &str = "%B %-d, %Y %H:%M UTC";

/// SQLite-backed image catalogue.
#[derive(Clone)]
pub struct ImageIndex {
    conn: Arc<Mutex<Connection>>,
}

impl ImageIndex {
    /// Open (or create) the catalogue database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             PRAGMA cache_size   = -2000;
             PRAGMA temp_store   = MEMORY;",
        )?;

        Self::from_connection(conn)
    }

    /// Catalogue backed by a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS images (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                link        TEXT NOT NULL,
                folder      TEXT,
                filename    TEXT NOT NULL,
                metadata    TEXT NOT NULL DEFAULT '{}',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_images_folder ON images(folder);
            CREATE INDEX IF NOT EXISTS idx_images_created ON images(created_at);",
        )
        .context("Failed to init catalogue schema")?;
        Ok(())
    }

    /// Insert a new image, assigning an id when the payload has none.
    pub fn insert(&self, image: &NewImage) -> Result<ImageDocument> {
        let conn = self.conn.lock();
        Self::insert_row(&conn, image)
    }

    /// Insert every image of a JSON array payload.
    ///
    /// All-or-nothing: a failing record rolls the whole batch back.
    pub fn import_json(&self, raw: &str) -> Result<Vec<ImageDocument>> {
        let images: Vec<NewImage> =
            serde_json::from_str(raw).context("Import payload must be a JSON array of images")?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("Failed to start import transaction")?;
        let docs = images
            .iter()
            .map(|image| Self::insert_row(&tx, image))
            .collect::<Result<Vec<_>>>()?;
        tx.commit().context("Failed to commit import")?;
        Ok(docs)
    }

    /// Get an image by id.
    pub fn get(&self, id: &str) -> Result<Option<ImageDocument>> {
        let conn = self.conn.lock();
        Self::fetch(&conn, id)
    }

    fn insert_row(conn: &Connection, image: &NewImage) -> Result<ImageDocument> {
        let id = image
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let now = Utc::now().to_rfc3339();
        let metadata = serde_json::to_string(&image.metadata)?;

        conn.execute(
            "INSERT INTO images (id, name, link, folder, filename, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![id, image.name, image.link, image.folder, image.filename, metadata, now],
        )
        .with_context(|| format!("Failed to insert image {id}"))?;

        Self::fetch(conn, &id)?.with_context(|| format!("Image {id} vanished after insert"))
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<ImageDocument>> {
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
        let doc = stmt.query_row(params![id], Self::row_to_document).optional()?;
        Ok(doc)
    }

    /// Number of catalogued images.
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Substring search over name and filename, narrowed by id and field tags.
    pub fn query(&self, search: &SearchParams) -> Result<Vec<ImageDocument>, SearchError> {
        let (where_sql, mut values) = Self::build_filter(search)?;
        values.push(Value::Integer(i64::from(search.limit)));
        values.push(Value::Integer(
            i64::try_from(search.offset()).unwrap_or(i64::MAX),
        ));

        let sql = format!(
            "{SELECT_COLUMNS} {where_sql} ORDER BY created_at DESC, id LIMIT ? OFFSET ?"
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values), Self::row_to_document)?;
        let docs = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(docs)
    }

    // Helper: build WHERE clause and its bound values for query()
    fn build_filter(search: &SearchParams) -> Result<(String, Vec<Value>), SearchError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        let pattern = format!("%{}%", escape_like(search.query.trim()));
        clauses.push(r"(name LIKE ? ESCAPE '\' OR filename LIKE ? ESCAPE '\')".to_string());
        values.push(Value::Text(pattern.clone()));
        values.push(Value::Text(pattern));

        if let Some(id) = &search.id {
            clauses.push("id = ?".to_string());
            values.push(Value::Text(id.clone()));
        }

        for (key, value) in &search.field_tags {
            if !is_valid_tag_key(key) {
                return Err(SearchError::InvalidFieldTag(key.clone()));
            }
            if key == "folder" {
                clauses.push("folder = ?".to_string());
                values.push(Value::Text(value.clone()));
            } else {
                // json_extract yields 1/0 for JSON booleans; compare them as "true"/"false".
                clauses.push(
                    "(CASE json_type(metadata, ?)
                        WHEN 'true' THEN 'true'
                        WHEN 'false' THEN 'false'
                        ELSE CAST(json_extract(metadata, ?) AS TEXT)
                      END) = ?"
                        .to_string(),
                );
                let path = format!("$.\"{key}\"");
                values.push(Value::Text(path.clone()));
                values.push(Value::Text(path));
                values.push(Value::Text(value.clone()));
            }
        }

        Ok((format!("WHERE {}", clauses.join(" AND ")), values))
    }

    fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<ImageDocument> {
        let metadata: String = row.get(5)?;
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;
        Ok(ImageDocument {
            id: row.get(0)?,
            name: row.get(1)?,
            link: row.get(2)?,
            folder: row.get(3)?,
            filename: row.get(4)?,
            metadata: serde_json::from_str(&metadata).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
            })?,
            created_at_human: humanize(&created_at),
            updated_at_human: humanize(&updated_at),
        })
    }
}

#[async_trait]
impl ImageSearch for ImageIndex {
    async fn search(&self, params: &SearchParams) -> Result<Vec<ImageDocument>, SearchError> {
        let index = self.clone();
        let params = params.clone();
        tokio::task::spawn_blocking(move || index.query(&params))
            .await
            .map_err(|e| SearchError::Backend(format!("search task failed: {e}")))?
    }
}

// Tag keys are spliced into a JSON path.
fn is_valid_tag_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn humanize(rfc3339: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(rfc3339)
        .ok()
        .map(|t| t.with_timezone(&Utc).format(HUMAN_TIME_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn image(name: &str, folder: Option<&str>, metadata: serde_json::Value) -> NewImage {
        NewImage {
            id: None,
            name: name.to_string(),
            link: format!("https://cdn.example/{name}.png"),
            folder: folder.map(str::to_string),
            filename: format!("{name}.png"),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        }
    }

    fn params(query: &str, tags: &[(&str, &str)]) -> SearchParams {
        SearchParams {
            query: query.to_string(),
            page: 0,
            limit: 5,
            id: None,
            field_tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn seeded() -> ImageIndex {
        let index = ImageIndex::in_memory().unwrap();
        index
            .insert(&image("rowi_beach", Some("cmx_20"), serde_json::json!({"hobby": "mangap"})))
            .unwrap();
        index
            .insert(&image("Rowi_night", None, serde_json::json!({"hobby": "hiking", "year": 2020})))
            .unwrap();
        index
            .insert(&image("sunset", Some("cmx_20"), serde_json::json!({})))
            .unwrap();
        index
    }

    #[test]
    fn insert_assigns_id_and_timestamps() {
        let index = ImageIndex::in_memory().unwrap();
        let doc = index.insert(&image("cat", None, serde_json::json!({}))).unwrap();
        assert!(!doc.id.is_empty());
        assert!(doc.created_at_human.as_deref().unwrap().ends_with("UTC"));
        assert_eq!(index.count().unwrap(), 1);
        assert_eq!(index.get(&doc.id).unwrap(), Some(doc));
    }

    #[test]
    fn insert_keeps_explicit_id() {
        let index = ImageIndex::in_memory().unwrap();
        let mut new = image("cat", None, serde_json::json!({}));
        new.id = Some("abc123".into());
        assert_eq!(index.insert(&new).unwrap().id, "abc123");
        assert!(index.get("missing").unwrap().is_none());
    }

    #[test]
    fn query_matches_name_substring_case_insensitively() {
        let index = seeded();
        let found = index.query(&params("rowi", &[])).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|d| d.name.to_lowercase().contains("rowi")));
    }

    #[test]
    fn query_treats_like_wildcards_literally() {
        let index = seeded();
        assert!(index.query(&params("%", &[])).unwrap().is_empty());
        assert_eq!(index.query(&params("_", &[])).unwrap().len(), 2);
    }

    #[test]
    fn folder_and_metadata_tags_narrow_results() {
        let index = seeded();
        let found = index
            .query(&params("rowi", &[("folder", "cmx_20"), ("hobby", "mangap")]))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "rowi_beach");

        let by_year = index.query(&params("", &[("year", "2020")])).unwrap();
        assert_eq!(by_year.len(), 1);
        assert_eq!(by_year[0].name, "Rowi_night");
    }

    #[test]
    fn id_filter_is_exact() {
        let index = ImageIndex::in_memory().unwrap();
        let mut new = image("cat", None, serde_json::json!({}));
        new.id = Some("42".into());
        index.insert(&new).unwrap();
        index.insert(&image("cat_two", None, serde_json::json!({}))).unwrap();

        let mut search = params("cat", &[]);
        search.id = Some("42".into());
        let found = index.query(&search).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "42");
    }

    #[test]
    fn pages_through_results() {
        let index = ImageIndex::in_memory().unwrap();
        for i in 0..7 {
            index
                .insert(&image(&format!("img{i}"), None, serde_json::json!({})))
                .unwrap();
        }
        let mut search = params("img", &[]);
        assert_eq!(index.query(&search).unwrap().len(), 5);
        search.page = 1;
        assert_eq!(index.query(&search).unwrap().len(), 2);
        search.page = 2;
        assert!(index.query(&search).unwrap().is_empty());
    }

    #[test]
    fn rejects_unsafe_tag_keys() {
        let index = seeded();
        let err = index
            .query(&params("rowi", &[("bad\"key", "x")]))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidFieldTag(key) if key == "bad\"key"));
    }

    #[tokio::test]
    async fn async_search_delegates_to_query() {
        let index = seeded();
        let found = index.search(&params("sunset", &[])).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].folder.as_deref(), Some("cmx_20"));
    }

    #[test]
    fn imports_json_array() {
        let index = ImageIndex::in_memory().unwrap();
        let docs = index
            .import_json(
                r#"[
                    {"name": "rowi", "link": "https://cdn/rowi.png", "filename": "rowi.png",
                     "folder": "cmx_20", "metadata": {"hobby": "mangap"}},
                    {"id": "fixed", "name": "moon", "link": "https://cdn/moon.png", "filename": "moon.png"}
                ]"#,
            )
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].id, "fixed");
        assert!(docs[1].metadata.is_empty());
        assert_eq!(index.count().unwrap(), 2);

        assert!(index.import_json(r#"{"name": "not an array"}"#).is_err());
    }

    #[test]
    fn boolean_metadata_matches_bare_and_explicit_flags() {
        let index = ImageIndex::in_memory().unwrap();
        index
            .insert(&image("rowi_safe", None, serde_json::json!({"nsfw": false})))
            .unwrap();
        index
            .insert(&image("rowi_late", None, serde_json::json!({"nsfw": true})))
            .unwrap();

        let args = crate::commands::args::ParsedArgs::parse("rowi --nsfw");
        let bare = crate::commands::search::build_params(&args, 5).unwrap();
        assert_eq!(bare.field_tags["nsfw"], "true");
        let found = index.query(&bare).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "rowi_late");

        let found = index.query(&params("rowi", &[("nsfw", "false")])).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "rowi_safe");
    }

    #[test]
    fn missing_metadata_key_never_matches() {
        let index = seeded();
        assert!(index.query(&params("", &[("colour", "null")])).unwrap().is_empty());
    }

    #[test]
    fn failed_import_leaves_catalogue_untouched() {
        let index = ImageIndex::in_memory().unwrap();
        index.insert(&image("existing", None, serde_json::json!({}))).unwrap();

        let err = index.import_json(
            r#"[
                {"id": "a", "name": "one", "link": "https://cdn/1.png", "filename": "1.png"},
                {"id": "b", "name": "two", "link": "https://cdn/2.png", "filename": "2.png"},
                {"id": "a", "name": "dup", "link": "https://cdn/3.png", "filename": "3.png"}
            ]"#,
        );
        assert!(err.is_err());
        assert_eq!(index.count().unwrap(), 1);
        assert!(index.get("a").unwrap().is_none());
    }

    #[test]
    fn metadata_keeps_document_order() {
        let index = ImageIndex::in_memory().unwrap();
        let doc = index
            .insert(&image("ordered", None, serde_json::json!({"zeta": 1, "alpha": 2, "mid": 3})))
            .unwrap();
        let keys: Vec<&str> = doc.metadata.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn open_creates_database_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("memoria.db");
        let index = ImageIndex::open(&path).unwrap();
        index.insert(&image("cat", None, serde_json::json!({}))).unwrap();
        drop(index);

        let reopened = ImageIndex::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
