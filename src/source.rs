//! Upstream tables and live insert feeds.
//!
//! [`DataSource`] is the seam to whatever store holds the rows. Two
//! implementations ship with the crate:
//!
//! - [`MemorySource`]: tables held in memory; `insert` broadcasts to live
//!   subscribers immediately. Used for embedding and tests.
//! - [`DirectorySource`]: each table is a CSV/TSV/NDJSON file in a
//!   directory; subscriptions poll the file and emit appended rows.
//!
//! A [`Subscription`] is a channel of [`SourceEvent`]s. Connection state
//! always starts at `Connecting` and moves to `Connected` or
//! `Disconnected`; dropping the subscription stops its producer.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
    },
    thread,
    time::Duration,
};

use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};
use serde::Serialize;

use crate::{
    error::SourceError,
    io_utils::{self, TableFile},
    value::Row,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    State(ConnectionState),
    Insert(Row),
}

pub trait DataSource: Send + Sync {
    fn table_exists(&self, table: &str) -> Result<bool, SourceError>;

    /// Up to `limit` of the most recent rows, oldest first.
    fn select_all(&self, table: &str, limit: usize) -> Result<Vec<Row>, SourceError>;

    fn subscribe(&self, table: &str) -> Result<Subscription, SourceError>;
}

impl<S: DataSource + ?Sized> DataSource for Arc<S> {
    fn table_exists(&self, table: &str) -> Result<bool, SourceError> {
        (**self).table_exists(table)
    }

    fn select_all(&self, table: &str, limit: usize) -> Result<Vec<Row>, SourceError> {
        (**self).select_all(table, limit)
    }

    fn subscribe(&self, table: &str) -> Result<Subscription, SourceError> {
        (**self).subscribe(table)
    }
}

/// Producer half of a subscription.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: Sender<SourceEvent>,
    stopped: Arc<AtomicBool>,
}

impl EventSender {
    /// `false` once the consumer has gone away.
    pub fn send(&self, event: SourceEvent) -> bool {
        !self.is_stopped() && self.sender.send(event).is_ok()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct Subscription {
    table: String,
    receiver: Receiver<SourceEvent>,
    stopped: Arc<AtomicBool>,
    closed: bool,
}

impl Subscription {
    pub fn channel(table: &str) -> (EventSender, Subscription) {
        let (sender, receiver) = mpsc::channel();
        let stopped = Arc::new(AtomicBool::new(false));
        (
            EventSender {
                sender,
                stopped: Arc::clone(&stopped),
            },
            Subscription {
                table: table.to_string(),
                receiver,
                stopped,
                closed: false,
            },
        )
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Next pending event without blocking. A producer that went away
    /// without saying so is reported once as `Disconnected`.
    pub fn try_next(&mut self) -> Option<SourceEvent> {
        if self.closed {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(event) => Some(self.observe(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.close(),
        }
    }

    pub fn next_timeout(&mut self, timeout: Duration) -> Option<SourceEvent> {
        if self.closed {
            return None;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(self.observe(event)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => self.close(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn observe(&mut self, event: SourceEvent) -> SourceEvent {
        if event == SourceEvent::State(ConnectionState::Disconnected) {
            self.closed = true;
        }
        event
    }

    fn close(&mut self) -> Option<SourceEvent> {
        self.closed = true;
        Some(SourceEvent::State(ConnectionState::Disconnected))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::Release);
    }
}

#[derive(Debug, Default)]
struct MemoryTables {
    tables: HashMap<String, Vec<Row>>,
    subscribers: HashMap<String, Vec<EventSender>>,
    fetch_failure: Option<String>,
}

/// In-memory tables with push-based live inserts.
#[derive(Debug, Default)]
pub struct MemorySource {
    inner: Mutex<MemoryTables>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table<I: IntoIterator<Item = Row>>(self, table: &str, rows: I) -> Self {
        self.lock()
            .tables
            .insert(table.to_string(), rows.into_iter().collect());
        self
    }

    /// Appends `row` and pushes it to every live subscriber of `table`.
    /// Creates the table when it does not exist yet.
    pub fn insert(&self, table: &str, row: Row) {
        let mut inner = self.lock();
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        if let Some(subscribers) = inner.subscribers.get_mut(table) {
            subscribers.retain(|sender| sender.send(SourceEvent::Insert(row.clone())));
        }
    }

    /// Removes `table`, disconnecting its subscribers.
    pub fn drop_table(&self, table: &str) {
        let mut inner = self.lock();
        inner.tables.remove(table);
        if let Some(subscribers) = inner.subscribers.remove(table) {
            for sender in subscribers {
                sender.send(SourceEvent::State(ConnectionState::Disconnected));
            }
        }
    }

    /// Makes every subsequent `select_all` fail with `message` until cleared.
    pub fn fail_fetches(&self, message: Option<&str>) {
        self.lock().fetch_failure = message.map(str::to_string);
    }

    fn lock(&self) -> MutexGuard<'_, MemoryTables> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DataSource for MemorySource {
    fn table_exists(&self, table: &str) -> Result<bool, SourceError> {
        Ok(self.lock().tables.contains_key(table))
    }

    fn select_all(&self, table: &str, limit: usize) -> Result<Vec<Row>, SourceError> {
        let inner = self.lock();
        if let Some(message) = &inner.fetch_failure {
            return Err(SourceError::backend(table, message));
        }
        let rows = inner
            .tables
            .get(table)
            .ok_or_else(|| SourceError::backend(table, "no such table"))?;
        let skip = rows.len().saturating_sub(limit);
        Ok(rows[skip..].to_vec())
    }

    fn subscribe(&self, table: &str) -> Result<Subscription, SourceError> {
        let (sender, subscription) = Subscription::channel(table);
        sender.send(SourceEvent::State(ConnectionState::Connecting));
        let mut inner = self.lock();
        if inner.tables.contains_key(table) {
            sender.send(SourceEvent::State(ConnectionState::Connected));
            inner
                .subscribers
                .entry(table.to_string())
                .or_default()
                .push(sender);
        } else {
            sender.send(SourceEvent::State(ConnectionState::Disconnected));
        }
        Ok(subscription)
    }
}

/// Tables stored as files in one directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
    poll_interval: Duration,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            delimiter: None,
            encoding: UTF_8,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_delimiter(mut self, delimiter: Option<u8>) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(10));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, table: &str) -> Result<Option<TableFile>, SourceError> {
        if !io_utils::is_valid_table_name(table) {
            return Err(SourceError::InvalidTableName(table.to_string()));
        }
        Ok(io_utils::locate_table(&self.root, table, self.delimiter))
    }

    fn read_all(&self, table: &str, file: &TableFile) -> Result<Vec<Row>, SourceError> {
        io_utils::read_table(file, self.encoding)
            .map_err(|err| SourceError::backend(table, format!("{err:#}")))
    }
}

impl DataSource for DirectorySource {
    fn table_exists(&self, table: &str) -> Result<bool, SourceError> {
        match self.locate(table) {
            Ok(found) => Ok(found.is_some()),
            Err(SourceError::InvalidTableName(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn select_all(&self, table: &str, limit: usize) -> Result<Vec<Row>, SourceError> {
        let file = self
            .locate(table)?
            .ok_or_else(|| SourceError::backend(table, "table file not found"))?;
        let mut rows = self.read_all(table, &file)?;
        let skip = rows.len().saturating_sub(limit);
        rows.drain(..skip);
        Ok(rows)
    }

    fn subscribe(&self, table: &str) -> Result<Subscription, SourceError> {
        let (sender, subscription) = Subscription::channel(table);
        sender.send(SourceEvent::State(ConnectionState::Connecting));
        let Some(file) = self.locate(table)? else {
            sender.send(SourceEvent::State(ConnectionState::Disconnected));
            return Ok(subscription);
        };
        let baseline = self.read_all(table, &file)?.len();
        let tailer = Tailer {
            source: self.clone(),
            table: table.to_string(),
            seen: baseline,
            sender,
        };
        thread::Builder::new()
            .name(format!("tail-{table}"))
            .spawn(move || tailer.run())
            .map_err(|err| SourceError::backend(table, err))?;
        Ok(subscription)
    }
}

/// Polls one table file and forwards rows appended since the last look.
struct Tailer {
    source: DirectorySource,
    table: String,
    seen: usize,
    sender: EventSender,
}

impl Tailer {
    fn run(mut self) {
        if !self
            .sender
            .send(SourceEvent::State(ConnectionState::Connected))
        {
            return;
        }
        debug!("Tailing table '{}' from row {}", self.table, self.seen);
        loop {
            if !self.sleep() {
                return;
            }
            let file = match self.source.locate(&self.table) {
                Ok(Some(file)) => file,
                _ => {
                    warn!("Table '{}' disappeared; live updates stopped", self.table);
                    self.sender
                        .send(SourceEvent::State(ConnectionState::Disconnected));
                    return;
                }
            };
            let rows = match self.source.read_all(&self.table, &file) {
                Ok(rows) => rows,
                Err(err) => {
                    // Usually a half-written trailing line; try again next tick.
                    debug!("Skipping poll of '{}': {err}", self.table);
                    continue;
                }
            };
            if rows.len() < self.seen {
                debug!("Table '{}' shrank; resetting tail position", self.table);
                self.seen = rows.len();
                continue;
            }
            for row in rows.into_iter().skip(self.seen) {
                self.seen += 1;
                if !self.sender.send(SourceEvent::Insert(row)) {
                    return;
                }
            }
        }
    }

    /// Sleeps one poll interval in short steps; `false` if stopped meanwhile.
    fn sleep(&self) -> bool {
        let step = Duration::from_millis(10);
        let mut waited = Duration::ZERO;
        while waited < self.source.poll_interval {
            if self.sender.is_stopped() {
                return false;
            }
            thread::sleep(step);
            waited += step;
        }
        !self.sender.is_stopped()
    }
}
