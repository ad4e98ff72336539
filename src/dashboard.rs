//! Event-driven controller around the aggregation pipeline.
//!
//! A [`Dashboard`] owns everything that changes at runtime: the active
//! table name, the bounded row buffer, the latest [`Snapshot`], the live
//! subscription and the insight lifecycle. It is driven from a single
//! thread; background work (file tailing, insight requests) only talks to
//! it through channels that [`Dashboard::pump_live`] and
//! [`Dashboard::poll_insights`] drain.
//!
//! Every trigger rebuilds the snapshot from scratch. Table- and
//! fetch-level failures clear it, so a partial aggregate is never shown.
//! Fetching is synchronous and every trigger takes `&mut self`, so a
//! refetch and a live row can never overlap; there is no in-progress flag.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::{
    buffer::RowBuffer,
    config::DashboardConfig,
    error::{DashboardError, InsightError, SourceError},
    insights::{InsightData, InsightGenerator, InsightState, InsightTask, MAX_CONTEXT_ROWS},
    roles::RoleOverrides,
    snapshot::Snapshot,
    source::{ConnectionState, DataSource, SourceEvent, Subscription},
    value::Row,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardStatus {
    Idle,
    Ready,
    /// The table exists but holds no rows.
    NoData,
    Failed(DashboardError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveOutcome {
    Applied { evicted: usize },
    /// Dropped because the dashboard has failed; the next refetch picks
    /// the row up from the source.
    Ignored,
}

pub struct Dashboard<S: DataSource> {
    source: S,
    table: String,
    overrides: RoleOverrides,
    buffer: RowBuffer,
    snapshot: Option<Snapshot>,
    status: DashboardStatus,
    subscription: Option<Subscription>,
    connection: Option<ConnectionState>,
    generator: Option<Arc<dyn InsightGenerator>>,
    context_rows: usize,
    insights: InsightState,
    insight_task: Option<InsightTask>,
}

impl<S: DataSource> Dashboard<S> {
    pub fn new(source: S, table: impl Into<String>) -> Self {
        Self {
            source,
            table: table.into(),
            overrides: RoleOverrides::default(),
            buffer: RowBuffer::default(),
            snapshot: None,
            status: DashboardStatus::Idle,
            subscription: None,
            connection: None,
            generator: None,
            context_rows: MAX_CONTEXT_ROWS,
            insights: InsightState::NotRequested,
            insight_task: None,
        }
    }

    pub fn from_config(source: S, table: impl Into<String>, config: &DashboardConfig) -> Self {
        Self::new(source, table)
            .with_row_limit(config.row_limit)
            .with_overrides(config.roles.clone())
            .with_context_rows(config.insights.context_rows)
    }

    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.buffer = RowBuffer::with_capacity(limit);
        self
    }

    pub fn with_overrides(mut self, overrides: RoleOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn InsightGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_context_rows(mut self, rows: usize) -> Self {
        self.context_rows = rows.clamp(1, MAX_CONTEXT_ROWS);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn status(&self) -> &DashboardStatus {
        &self.status
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.buffer.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.buffer.iter()
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.connection
    }

    pub fn insights(&self) -> &InsightState {
        &self.insights
    }

    pub fn insights_in_flight(&self) -> bool {
        self.insight_task.is_some()
    }

    /// Switches to `table`, discarding rows, snapshot, subscription and
    /// insights, then refetches. Returns the number of rows loaded.
    pub fn set_table(&mut self, table: impl Into<String>) -> Result<usize, DashboardError> {
        let table = table.into();
        info!("Switching dashboard from '{}' to '{table}'", self.table);
        let was_connected = self.subscription.is_some();
        self.reset();
        self.table = table;
        let loaded = self.refresh()?;
        if was_connected {
            self.connect()?;
        }
        Ok(loaded)
    }

    /// Refetches the active table and rebuilds the snapshot. Returns the
    /// number of rows now buffered.
    pub fn refresh(&mut self) -> Result<usize, DashboardError> {
        match self.fetch() {
            Ok(rows) => {
                let was_empty = self.buffer.is_empty();
                let evicted = self.buffer.replace(rows);
                if evicted > 0 {
                    debug!("Fetched more rows than the buffer holds; dropped {evicted}");
                }
                self.rebuild();
                info!(
                    "Loaded {} row(s) from '{}'",
                    self.buffer.len(),
                    self.table
                );
                self.trigger_insights_on_first_data(was_empty);
                Ok(self.buffer.len())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Appends one pushed row and rebuilds.
    pub fn apply_live_row(&mut self, row: Row) -> LiveOutcome {
        if matches!(self.status, DashboardStatus::Failed(_)) {
            debug!("Live row for '{}' ignored", self.table);
            return LiveOutcome::Ignored;
        }
        let was_empty = self.buffer.is_empty();
        let evicted = self.buffer.push(row);
        self.rebuild();
        self.trigger_insights_on_first_data(was_empty);
        LiveOutcome::Applied { evicted }
    }

    /// Subscribes to inserts on the active table, replacing any previous
    /// subscription. A failed subscribe fails the dashboard like a failed
    /// refetch.
    pub fn connect(&mut self) -> Result<(), DashboardError> {
        self.drop_subscription();
        match self.source.subscribe(&self.table) {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.connection = Some(ConnectionState::Connecting);
                Ok(())
            }
            Err(err) => {
                let err = self.fetch_failure(err);
                Err(self.fail(err))
            }
        }
    }

    /// Applies every pending live event; returns how many rows were applied.
    pub fn pump_live(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.subscription.as_mut().and_then(Subscription::try_next) {
            match event {
                SourceEvent::State(state) => self.observe_connection(state),
                SourceEvent::Insert(row) => {
                    if let LiveOutcome::Applied { .. } = self.apply_live_row(row) {
                        applied += 1;
                    }
                }
            }
        }
        applied
    }

    /// Manual "refresh insights". Returns `false` when nothing was started
    /// because a request is already in flight, there is no data, or no
    /// generator is configured.
    pub fn request_insights(&mut self) -> bool {
        if self.insight_task.is_some() {
            debug!("Insight request ignored: one is already in flight");
            return false;
        }
        let Some(generator) = self.generator.clone() else {
            return false;
        };
        if self.buffer.is_empty() {
            return false;
        }
        let rows = self.buffer.latest(self.context_rows);
        match InsightTask::spawn(generator, self.table.clone(), rows) {
            Ok(task) => {
                self.insight_task = Some(task);
                self.insights = InsightState::Pending;
                true
            }
            Err(err) => {
                self.absorb_insight_failure(err);
                false
            }
        }
    }

    /// Collects a finished insight request; `true` if the state changed.
    pub fn poll_insights(&mut self) -> bool {
        let Some(outcome) = self.insight_task.as_ref().and_then(InsightTask::try_result) else {
            return false;
        };
        self.insight_task = None;
        match outcome {
            Ok(data) => {
                info!("Insights ready for '{}'", self.table);
                self.insights = InsightState::Ready(data);
            }
            Err(err) => self.absorb_insight_failure(err),
        }
        true
    }

    /// Abandons an in-flight request; its result, if any, is discarded.
    pub fn cancel_insights(&mut self) {
        if let Some(task) = self.insight_task.take() {
            task.cancel();
            if self.insights == InsightState::Pending {
                self.insights = InsightState::NotRequested;
            }
        }
    }

    fn fetch(&self) -> Result<Vec<Row>, DashboardError> {
        let exists = self
            .source
            .table_exists(&self.table)
            .map_err(|err| self.fetch_failure(err))?;
        if !exists {
            return Err(DashboardError::TableUnavailable {
                table: self.table.clone(),
            });
        }
        self.source
            .select_all(&self.table, self.buffer.capacity())
            .map_err(|err| self.fetch_failure(err))
    }

    fn fail(&mut self, err: DashboardError) -> DashboardError {
        warn!("{err}");
        self.buffer.clear();
        self.snapshot = None;
        self.drop_subscription();
        self.status = DashboardStatus::Failed(err.clone());
        err
    }

    fn fetch_failure(&self, err: SourceError) -> DashboardError {
        match err {
            SourceError::InvalidTableName(_) => DashboardError::TableUnavailable {
                table: self.table.clone(),
            },
            SourceError::Backend { message, .. } => DashboardError::FetchFailure {
                table: self.table.clone(),
                message,
            },
        }
    }

    fn rebuild(&mut self) {
        self.snapshot = Snapshot::build_with(self.buffer.rows(), &self.overrides);
        self.status = if self.snapshot.is_some() {
            DashboardStatus::Ready
        } else {
            DashboardStatus::NoData
        };
    }

    fn trigger_insights_on_first_data(&mut self, was_empty: bool) {
        if was_empty && !self.buffer.is_empty() && self.request_insights() {
            debug!("Requested insights for newly populated '{}'", self.table);
        }
    }

    fn absorb_insight_failure(&mut self, err: InsightError) {
        warn!("Insights unavailable for '{}': {err}", self.table);
        self.insights = InsightState::Ready(InsightData::unavailable());
    }

    fn observe_connection(&mut self, state: ConnectionState) {
        if self.connection != Some(state) {
            match state {
                ConnectionState::Disconnected => {
                    warn!("Live updates for '{}' disconnected", self.table)
                }
                _ => debug!("Live updates for '{}': {state:?}", self.table),
            }
        }
        self.connection = Some(state);
    }

    fn drop_subscription(&mut self) {
        self.subscription = None;
        self.connection = None;
    }

    fn reset(&mut self) {
        self.cancel_insights();
        self.drop_subscription();
        self.buffer.clear();
        self.snapshot = None;
        self.insights = InsightState::NotRequested;
        self.status = DashboardStatus::Idle;
    }
}
