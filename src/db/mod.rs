mod schema;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;

/// Handle to the quote store.
///
/// Cloning is cheap and every clone shares the same connection. Each public
/// method is one unit of work: reads take the connection for the duration of
/// the call, writes additionally run inside a transaction.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_default() -> anyhow::Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// `<data dir>/quoter.db`, e.g. `~/.local/share/quoter/quoter.db` on Linux.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "quoter")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("quoter.db"))
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        // Cascades and RESTRICT on quote_items depend on this.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.lock();
        schema::run_migrations(&conn)
    }

    /// A panic while the lock was held leaves any open transaction to be
    /// rolled back on drop, so the connection is still usable.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================================
    // Project type operations
    // ============================================================

    /// Every project type with its resources and current unit cost, ordered by name.
    pub fn list_project_types_with_resources(&self) -> Result<Vec<ProjectTypeWithResources>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT id, name FROM project_types ORDER BY name")?;
        let project_types = stmt
            .query_map([], project_type_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut resources = resources_by_project_type(
            &conn,
            "SELECT id, project_type_id, name, hours_per_unit, rate_per_hour
             FROM resources ORDER BY name",
            [],
        )?;

        Ok(project_types
            .into_iter()
            .map(|pt| {
                let owned = resources.remove(&pt.id).unwrap_or_default();
                ProjectTypeWithResources::new(pt, owned)
            })
            .collect())
    }

    pub fn get_project_type(&self, id: Uuid) -> Result<Option<ProjectType>> {
        let conn = self.lock();
        find_project_type(&conn, id)
    }

    pub fn get_project_type_with_resources(
        &self,
        id: Uuid,
    ) -> Result<Option<ProjectTypeWithResources>> {
        let conn = self.lock();
        let Some(project_type) = find_project_type(&conn, id)? else {
            return Ok(None);
        };
        let resources = resources_of(&conn, id)?;
        Ok(Some(ProjectTypeWithResources::new(project_type, resources)))
    }

    /// Current unit cost of a project type, or `None` if it does not exist.
    pub fn unit_cost(&self, project_type_id: Uuid) -> Result<Option<f64>> {
        Ok(self
            .get_project_type_with_resources(project_type_id)?
            .map(|pt| pt.unit_cost))
    }

    pub fn create_project_type(&self, input: CreateProjectTypeInput) -> Result<ProjectType> {
        let name = input.validate()?;

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        ensure_name_available(&tx, &name, None)?;

        let project_type = ProjectType {
            id: Uuid::new_v4(),
            name,
        };
        tx.execute(
            "INSERT INTO project_types (id, name) VALUES (?, ?)",
            (project_type.id.to_string(), &project_type.name),
        )?;
        tx.commit()?;

        tracing::info!("Created project type {} ({})", project_type.name, project_type.id);
        Ok(project_type)
    }

    pub fn update_project_type(
        &self,
        id: Uuid,
        input: UpdateProjectTypeInput,
    ) -> Result<Option<ProjectType>> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let Some(existing) = find_project_type(&tx, id)? else {
            return Ok(None);
        };

        let name = match input.name {
            Some(name) => CreateProjectTypeInput { name }.validate()?,
            None => return Ok(Some(existing)),
        };
        ensure_name_available(&tx, &name, Some(id))?;

        tx.execute(
            "UPDATE project_types SET name = ? WHERE id = ?",
            (&name, id.to_string()),
        )?;
        tx.commit()?;

        Ok(Some(ProjectType { id, name }))
    }

    /// Delete a project type and its resources.
    ///
    /// Returns `Ok(false)` if it does not exist and [`Error::Conflict`] while
    /// any quote item still references it.
    pub fn delete_project_type(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let Some(project_type) = find_project_type(&tx, id)? else {
            return Ok(false);
        };

        let references: i64 = tx.query_row(
            "SELECT COUNT(*) FROM quote_items WHERE project_type_id = ?",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if references > 0 {
            return Err(Error::Conflict(format!(
                "Project type \"{}\" is used by {} quote item(s) and cannot be deleted.",
                project_type.name, references
            )));
        }

        tx.execute("DELETE FROM project_types WHERE id = ?", [id.to_string()])?;
        tx.commit()?;

        tracing::info!("Deleted project type {} ({})", project_type.name, id);
        Ok(true)
    }

    // ============================================================
    // Resource operations
    // ============================================================

    pub fn get_resources(&self, project_type_id: Uuid) -> Result<Vec<Resource>> {
        let conn = self.lock();
        resources_of(&conn, project_type_id)
    }

    pub fn get_resource(&self, id: Uuid) -> Result<Option<Resource>> {
        let conn = self.lock();
        find_resource(&conn, id)
    }

    pub fn add_resource(&self, project_type_id: Uuid, input: CreateResourceInput) -> Result<Resource> {
        let input = input.validate()?;

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        find_project_type(&tx, project_type_id)?.ok_or(Error::NotFound("Project type"))?;

        let resource = Resource {
            id: Uuid::new_v4(),
            project_type_id,
            name: input.name,
            hours_per_unit: input.hours_per_unit,
            rate_per_hour: input.rate_per_hour,
        };
        tx.execute(
            "INSERT INTO resources (id, project_type_id, name, hours_per_unit, rate_per_hour)
             VALUES (?, ?, ?, ?, ?)",
            (
                resource.id.to_string(),
                project_type_id.to_string(),
                &resource.name,
                resource.hours_per_unit,
                resource.rate_per_hour,
            ),
        )?;
        tx.commit()?;

        Ok(resource)
    }

    pub fn update_resource(&self, id: Uuid, input: UpdateResourceInput) -> Result<Option<Resource>> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let Some(existing) = find_resource(&tx, id)? else {
            return Ok(None);
        };
        let updated = input.apply(&existing)?;

        tx.execute(
            "UPDATE resources SET name = ?, hours_per_unit = ?, rate_per_hour = ? WHERE id = ?",
            (
                &updated.name,
                updated.hours_per_unit,
                updated.rate_per_hour,
                id.to_string(),
            ),
        )?;
        tx.commit()?;

        Ok(Some(updated))
    }

    pub fn delete_resource(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute("DELETE FROM resources WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Quote operations
    // ============================================================

    pub fn create_quote(&self, input: CreateQuoteInput) -> Result<Quote> {
        let new = input.validate()?;

        // Stored with fixed precision so created_at sorts correctly as text.
        let quote = Quote {
            id: Uuid::new_v4(),
            client_name: new.client_name,
            project_name: new.project_name,
            project_date: new.project_date,
            created_at: Utc::now().trunc_subsecs(6),
        };

        let conn = self.lock();
        conn.execute(
            "INSERT INTO quotes (id, client_name, project_name, project_date, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                quote.id.to_string(),
                &quote.client_name,
                &quote.project_name,
                quote.project_date.format(DATE_FORMAT).to_string(),
                quote.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ),
        )?;

        tracing::info!("Created quote {} for {}", quote.id, quote.client_name);
        Ok(quote)
    }

    pub fn get_quote(&self, id: Uuid) -> Result<Option<Quote>> {
        let conn = self.lock();
        find_quote(&conn, id)
    }

    /// All quotes, newest first, with their item counts and grand totals.
    pub fn list_quotes(&self) -> Result<Vec<QuoteSummary>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, client_name, project_name, project_date, created_at
             FROM quotes ORDER BY created_at DESC",
        )?;
        let quotes = stmt
            .query_map([], quote_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        quotes
            .into_iter()
            .map(|quote| load_detail(&conn, quote).map(QuoteSummary::from))
            .collect()
    }

    /// The quote with its items in order, each priced from current resource data.
    pub fn get_quote_detail(&self, id: Uuid) -> Result<Option<QuoteDetail>> {
        let conn = self.lock();
        match find_quote(&conn, id)? {
            Some(quote) => load_detail(&conn, quote).map(Some),
            None => Ok(None),
        }
    }

    /// Delete a quote. Its items go with it.
    pub fn delete_quote(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute("DELETE FROM quotes WHERE id = ?", [id.to_string()])?;
        if rows > 0 {
            tracing::info!("Deleted quote {}", id);
        }
        Ok(rows > 0)
    }

    /// Append an item to the end of a quote.
    pub fn add_item(&self, quote_id: Uuid, input: AddItemInput) -> Result<QuoteItem> {
        let new = input.validate()?;

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        find_quote(&tx, quote_id)?.ok_or(Error::NotFound("Quote"))?;
        if find_project_type(&tx, new.project_type_id)?.is_none() {
            return Err(Error::validation("Please select a valid project type."));
        }

        let position: u32 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM quote_items WHERE quote_id = ?",
            [quote_id.to_string()],
            |row| row.get(0),
        )?;

        let item = QuoteItem {
            id: Uuid::new_v4(),
            quote_id,
            project_type_id: new.project_type_id,
            custom_label: new.custom_label,
            quantity: new.quantity,
            position,
        };
        tx.execute(
            "INSERT INTO quote_items (id, quote_id, project_type_id, custom_label, quantity, position)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                item.id.to_string(),
                quote_id.to_string(),
                item.project_type_id.to_string(),
                &item.custom_label,
                item.quantity,
                item.position,
            ),
        )?;
        tx.commit()?;

        tracing::debug!("Added item {} to quote {}", item.id, quote_id);
        Ok(item)
    }

    pub fn get_items(&self, quote_id: Uuid) -> Result<Vec<QuoteItem>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, quote_id, project_type_id, custom_label, quantity, position
             FROM quote_items WHERE quote_id = ? ORDER BY position",
        )?;
        let items = stmt
            .query_map([quote_id.to_string()], quote_item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn remove_item(&self, quote_id: Uuid, item_id: Uuid) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute(
            "DELETE FROM quote_items WHERE id = ? AND quote_id = ?",
            (item_id.to_string(), quote_id.to_string()),
        )?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

// ============================================================
// Queries shared by the operations above
// ============================================================

fn find_project_type(conn: &Connection, id: Uuid) -> Result<Option<ProjectType>> {
    let project_type = conn
        .query_row(
            "SELECT id, name FROM project_types WHERE id = ?",
            [id.to_string()],
            project_type_from_row,
        )
        .optional()?;
    Ok(project_type)
}

fn ensure_name_available(conn: &Connection, name: &str, except: Option<Uuid>) -> Result<()> {
    let taken: Option<String> = conn
        .query_row(
            "SELECT id FROM project_types WHERE name = ?",
            [name],
            |row| row.get(0),
        )
        .optional()?;

    match taken {
        Some(id) if except.map_or(true, |e| e.to_string() != id) => Err(Error::Conflict(
            format!("A project type named \"{}\" already exists.", name),
        )),
        _ => Ok(()),
    }
}

fn find_resource(conn: &Connection, id: Uuid) -> Result<Option<Resource>> {
    let resource = conn
        .query_row(
            "SELECT id, project_type_id, name, hours_per_unit, rate_per_hour
             FROM resources WHERE id = ?",
            [id.to_string()],
            resource_from_row,
        )
        .optional()?;
    Ok(resource)
}

fn resources_of(conn: &Connection, project_type_id: Uuid) -> Result<Vec<Resource>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_type_id, name, hours_per_unit, rate_per_hour
         FROM resources WHERE project_type_id = ? ORDER BY name",
    )?;
    let resources = stmt
        .query_map([project_type_id.to_string()], resource_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(resources)
}

fn resources_by_project_type<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<HashMap<Uuid, Vec<Resource>>> {
    let mut stmt = conn.prepare(sql)?;
    let mut grouped: HashMap<Uuid, Vec<Resource>> = HashMap::new();
    for resource in stmt.query_map(params, resource_from_row)? {
        let resource = resource?;
        grouped
            .entry(resource.project_type_id)
            .or_default()
            .push(resource);
    }
    Ok(grouped)
}

fn find_quote(conn: &Connection, id: Uuid) -> Result<Option<Quote>> {
    let quote = conn
        .query_row(
            "SELECT id, client_name, project_name, project_date, created_at
             FROM quotes WHERE id = ?",
            [id.to_string()],
            quote_from_row,
        )
        .optional()?;
    Ok(quote)
}

/// Materialize a quote: its ordered items, their project types, and the
/// resources needed to price them.
fn load_detail(conn: &Connection, quote: Quote) -> Result<QuoteDetail> {
    let mut stmt = conn.prepare(
        "SELECT qi.id, qi.quote_id, qi.project_type_id, qi.custom_label, qi.quantity, qi.position,
                pt.name
         FROM quote_items qi
         JOIN project_types pt ON pt.id = qi.project_type_id
         WHERE qi.quote_id = ?
         ORDER BY qi.position",
    )?;
    let rows = stmt
        .query_map([quote.id.to_string()], |row| {
            let item = quote_item_from_row(row)?;
            let project_type = ProjectType {
                id: item.project_type_id,
                name: row.get(6)?,
            };
            Ok((item, project_type))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let resources = resources_by_project_type(
        conn,
        "SELECT id, project_type_id, name, hours_per_unit, rate_per_hour
         FROM resources
         WHERE project_type_id IN (SELECT project_type_id FROM quote_items WHERE quote_id = ?)",
        [quote.id.to_string()],
    )?;

    let items = rows
        .into_iter()
        .map(|(item, project_type)| {
            let owned = resources
                .get(&project_type.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            PricedItem::new(item, &project_type, owned)
        })
        .collect();

    Ok(QuoteDetail::new(quote, items))
}

// ============================================================
// Row mapping
// ============================================================

fn project_type_from_row(row: &Row) -> rusqlite::Result<ProjectType> {
    Ok(ProjectType {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
    })
}

fn resource_from_row(row: &Row) -> rusqlite::Result<Resource> {
    Ok(Resource {
        id: uuid_column(row, 0)?,
        project_type_id: uuid_column(row, 1)?,
        name: row.get(2)?,
        hours_per_unit: row.get(3)?,
        rate_per_hour: row.get(4)?,
    })
}

fn quote_from_row(row: &Row) -> rusqlite::Result<Quote> {
    Ok(Quote {
        id: uuid_column(row, 0)?,
        client_name: row.get(1)?,
        project_name: row.get(2)?,
        project_date: date_column(row, 3)?,
        created_at: datetime_column(row, 4)?,
    })
}

fn quote_item_from_row(row: &Row) -> rusqlite::Result<QuoteItem> {
    Ok(QuoteItem {
        id: uuid_column(row, 0)?,
        quote_id: uuid_column(row, 1)?,
        project_type_id: uuid_column(row, 2)?,
        custom_label: row.get(3)?,
        quantity: row.get(4)?,
        position: row.get(5)?,
    })
}

fn uuid_column(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))
}

fn date_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}
