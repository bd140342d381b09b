use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::schemas::Message;

use super::{ChatMessageHistory, MemoryError};

pub const DEFAULT_TABLE_NAME: &str = "langchain_messages";
pub const DEFAULT_LIMIT: usize = 1000;
pub const DEFAULT_SESSION: &str = "default";

fn schema(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY,
            name TEXT,
            session TEXT NOT NULL,
            content TEXT NOT NULL,
            type TEXT NOT NULL,
            created TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_{table}_session ON {table} (session);"
    )
}

pub struct SqliteHistoryBuilder {
    connection: Option<Connection>,
    table_name: String,
    session: String,
    limit: usize,
    overwrite: bool,
}

impl Default for SqliteHistoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteHistoryBuilder {
    pub fn new() -> Self {
        Self {
            connection: None,
            table_name: DEFAULT_TABLE_NAME.into(),
            session: DEFAULT_SESSION.into(),
            limit: DEFAULT_LIMIT,
            overwrite: false,
        }
    }

    pub fn connection(mut self, connection: Connection) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Result<Self, MemoryError> {
        self.connection = Some(Connection::open(path)?);
        Ok(self)
    }

    pub fn table_name<S: Into<String>>(mut self, table_name: S) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn session<S: Into<String>>(mut self, session: S) -> Self {
        self.session = session.into();
        self
    }

    /// A limit of zero falls back to the default.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Allows `clear` and `set_messages` to delete rows.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn build(self) -> Result<SqliteChatMessageHistory, MemoryError> {
        if self.table_name.is_empty()
            || !self
                .table_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(MemoryError::InvalidConfiguration(format!(
                "invalid table name {:?}",
                self.table_name
            )));
        }
        let connection = match self.connection {
            Some(connection) => connection,
            None => Connection::open_in_memory()?,
        };
        connection.execute_batch(&schema(&self.table_name))?;

        Ok(SqliteChatMessageHistory {
            connection: Arc::new(Mutex::new(connection)),
            table_name: self.table_name,
            session: self.session,
            limit: if self.limit == 0 { DEFAULT_LIMIT } else { self.limit },
            overwrite: self.overwrite,
        })
    }
}

/// Chat history stored in a SQLite table, one row per message.
pub struct SqliteChatMessageHistory {
    connection: Arc<Mutex<Connection>>,
    table_name: String,
    session: String,
    limit: usize,
    overwrite: bool,
}

impl SqliteChatMessageHistory {
    pub fn builder() -> SqliteHistoryBuilder {
        SqliteHistoryBuilder::new()
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    async fn with_connection<F, T>(&self, f: F) -> Result<T, MemoryError>
    where
        F: FnOnce(&mut Connection) -> Result<T, MemoryError> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = connection
                .lock()
                .map_err(|e| MemoryError::OtherError(e.to_string()))?;
            f(&mut connection)
        })
        .await
        .map_err(|e| MemoryError::OtherError(e.to_string()))?
    }
}

#[async_trait]
impl ChatMessageHistory for SqliteChatMessageHistory {
    async fn messages(&self) -> Result<Vec<Message>, MemoryError> {
        let query = format!(
            "SELECT content, type FROM {} WHERE session = ?1 ORDER BY created ASC, id ASC LIMIT ?2",
            self.table_name
        );
        let session = self.session.clone();
        let limit = self.limit as i64;
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&query)?;
            let rows = stmt.query_map(params![session, limit], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut messages = Vec::new();
            for row in rows {
                let (content, message_type) = row?;
                match message_type.as_str() {
                    "human" => messages.push(Message::new_human_message(content)),
                    "ai" => messages.push(Message::new_ai_message(content)),
                    "system" => messages.push(Message::new_system_message(content)),
                    other => log::debug!("skipping sqlite message of type {}", other),
                }
            }
            Ok(messages)
        })
        .await
    }

    async fn add_message(&self, message: Message) -> Result<(), MemoryError> {
        let query = format!(
            "INSERT INTO {} (session, content, type) VALUES (?1, ?2, ?3)",
            self.table_name
        );
        let session = self.session.clone();
        self.with_connection(move |conn| {
            conn.execute(
                &query,
                params![session, message.content, message.message_type.as_str()],
            )?;
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        if !self.overwrite {
            return Ok(());
        }
        let query = format!("DELETE FROM {} WHERE session = ?1", self.table_name);
        let session = self.session.clone();
        self.with_connection(move |conn| {
            conn.execute(&query, params![session])?;
            Ok(())
        })
        .await
    }

    async fn set_messages(&self, messages: Vec<Message>) -> Result<(), MemoryError> {
        if !self.overwrite {
            log::debug!("sqlite history is not in overwrite mode, ignoring set_messages");
            return Ok(());
        }
        let table = self.table_name.clone();
        let session = self.session.clone();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!("DELETE FROM {} WHERE session = ?1", table),
                params![session],
            )?;
            {
                let mut insert = tx.prepare(&format!(
                    "INSERT INTO {} (session, content, type) VALUES (?1, ?2, ?3)",
                    table
                ))?;
                for message in &messages {
                    insert.execute(params![
                        session,
                        message.content,
                        message.message_type.as_str()
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
