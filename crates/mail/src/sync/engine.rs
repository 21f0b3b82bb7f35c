//! Sync engine: full and incremental synchronization
//!
//! Coordinates the remote client for fetching and the Maildir store for
//! writing, committing the per-account cursor once at the end of a run.
//! Message-level failures are aggregated into the report and never abort
//! a run; only setup problems propagate to the caller.

use std::collections::HashSet;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Datelike, Days, NaiveDate, Utc};
use log::{info, warn};

use crate::models::MessageId;
use crate::remote::{RemoteError, RemoteMailClient};
use crate::storage::{CursorStore, MaildirStore};

/// Progress token reported while processing an incremental change set,
/// which spans labels and so has no single real label to report
pub const INCREMENTAL_PROGRESS_LABEL: &str = "incremental";

/// Callback reporting `(label, current, total)` once per processed message
pub type ProgressFn<'a> = dyn FnMut(&str, usize, usize) + 'a;

/// Outcome of one sync run
///
/// `downloaded > 0` together with `errors > 0` is a degraded but
/// progressed run: the cursor advanced and files were written.
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    /// Messages fetched and written this run
    pub downloaded: usize,
    /// Messages skipped because they were already stored
    pub skipped: usize,
    /// Message-level failures (fetch or write)
    pub errors: usize,
    /// One `"<id>: <error>"` line per failure
    pub error_details: Vec<String>,
    /// Wall-clock duration of the run
    pub duration_ms: u64,
}

impl SyncReport {
    /// Record a failure for one message and keep going
    pub fn add_error(&mut self, id: &str, error: impl std::fmt::Display) {
        self.errors += 1;
        self.error_details.push(format!("{id}: {error}"));
    }
}

/// Caller-tunable knobs for a sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum messages to list per label in full sync
    pub max_messages: usize,
    /// Skip mode selection and run a full sync
    pub force_full: bool,
    /// Only sync messages after this date (forces full sync)
    pub since: Option<NaiveDate>,
    /// Only sync messages from the last N days (forces full sync)
    pub days: Option<u32>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_messages: 100,
            force_full: false,
            since: None,
            days: None,
        }
    }
}

/// Build the provider search query for the configured date filter
///
/// Gmail's query format is `after:YYYY/MM/DD`. `since` wins over `days`.
fn build_query(opts: &SyncOptions) -> Option<String> {
    let date = match (opts.since, opts.days) {
        (Some(since), _) => since,
        (None, Some(days)) => Utc::now().date_naive() - Days::new(u64::from(days)),
        (None, None) => return None,
    };

    Some(format!(
        "after:{}/{:02}/{:02}",
        date.year(),
        date.month(),
        date.day()
    ))
}

/// Numeric maximum over opaque sequence strings
///
/// Sequences compare by their numeric value but are committed verbatim, so
/// a provider's formatting (leading zeros included) survives the round
/// trip. Non-numeric sequences are ignored and can never win.
#[derive(Debug, Default)]
struct MaxSequence(Option<(u64, String)>);

impl MaxSequence {
    fn observe(&mut self, sequence: &str) {
        let Ok(value) = sequence.parse::<u64>() else {
            warn!("ignoring non-numeric sequence {sequence:?}");
            return;
        };
        match &self.0 {
            Some((current, _)) if *current >= value => {}
            _ => self.0 = Some((value, sequence.to_string())),
        }
    }

    fn into_sequence(self) -> Option<String> {
        self.0.map(|(_, raw)| raw)
    }
}

/// Main sync entry point: picks full or incremental mode
///
/// Mode selection, in order: a forced full sync, a date filter (the change
/// protocol carries no date filter), a missing cursor — each selects full
/// sync; otherwise the run is incremental from the stored cursor.
pub fn sync(
    client: &dyn RemoteMailClient,
    store: &MaildirStore,
    cursors: &CursorStore,
    account: &str,
    labels: &[String],
    opts: &SyncOptions,
    progress: Option<&mut ProgressFn<'_>>,
) -> Result<SyncReport> {
    let query = build_query(opts);

    if opts.force_full || query.is_some() || cursors.load(account).is_none() {
        return full_sync(
            client,
            store,
            cursors,
            account,
            labels,
            opts.max_messages,
            query.as_deref(),
            progress,
        );
    }

    incremental_sync(
        client,
        store,
        cursors,
        account,
        labels,
        opts.max_messages,
        progress,
    )
}

/// Full sync of the requested labels, in caller order
///
/// Lists up to `max_messages` IDs per label and downloads whatever is not
/// already stored. The cursor is committed with the highest sequence seen
/// across all successful fetches; a run that fetches nothing leaves the
/// committed cursor untouched.
#[allow(clippy::too_many_arguments)]
pub fn full_sync(
    client: &dyn RemoteMailClient,
    store: &MaildirStore,
    cursors: &CursorStore,
    account: &str,
    labels: &[String],
    max_messages: usize,
    query: Option<&str>,
    mut progress: Option<&mut ProgressFn<'_>>,
) -> Result<SyncReport> {
    let started = Instant::now();
    let mut report = SyncReport::default();
    let mut highest = MaxSequence::default();

    info!(
        "full sync for account {} covering {} labels",
        account,
        labels.len()
    );

    for label in labels {
        let ids = client
            .list_message_ids(label, query, max_messages)
            .with_context(|| format!("failed to list messages for label {label}"))?;
        let total = ids.len();

        for (idx, id) in ids.iter().enumerate() {
            if let Some(cb) = progress.as_mut() {
                cb(label, idx + 1, total);
            }

            if store.message_exists(id)? {
                report.skipped += 1;
                continue;
            }

            let message = match client.fetch_message(id) {
                Ok(message) => message,
                Err(e) => {
                    report.add_error(id.as_str(), e);
                    continue;
                }
            };

            // The sequence counts as observed even if the write below
            // fails; it came from a successful fetch
            highest.observe(&message.sequence);

            let folder = store.primary_folder(&message.labels);
            match store.write_message(&folder, &message.raw, &message.labels, id) {
                Ok(_) => report.downloaded += 1,
                Err(e) => report.add_error(id.as_str(), e),
            }
        }
    }

    if let Some(sequence) = highest.into_sequence() {
        cursors.save(account, &sequence, labels)?;
    }

    report.duration_ms = started.elapsed().as_millis() as u64;
    info!(
        "full sync done: {} downloaded, {} skipped, {} errors",
        report.downloaded, report.skipped, report.errors
    );
    Ok(report)
}

/// Incremental sync from the stored cursor
///
/// Changes are listed per label sequentially; the added IDs are unioned
/// into one first-seen-order set so a message changed in several labels is
/// fetched once. If any label reports the cursor as expired the whole run
/// is redone as a full sync over all requested labels. The cursor is
/// committed whenever the provider returned a sequence, even when nothing
/// new was downloaded, so a caught-up account stops re-scanning the same
/// change window.
pub fn incremental_sync(
    client: &dyn RemoteMailClient,
    store: &MaildirStore,
    cursors: &CursorStore,
    account: &str,
    labels: &[String],
    max_messages: usize,
    mut progress: Option<&mut ProgressFn<'_>>,
) -> Result<SyncReport> {
    let Some(cursor) = cursors.load(account) else {
        // No committed position to resume from
        return full_sync(
            client, store, cursors, account, labels, max_messages, None, progress,
        );
    };

    let started = Instant::now();
    let mut added: Vec<MessageId> = Vec::new();
    let mut seen: HashSet<MessageId> = HashSet::new();
    let mut highest = MaxSequence::default();

    info!(
        "incremental sync for account {} since sequence {}",
        account, cursor.sequence
    );

    for label in labels {
        match client.list_changes(&cursor.sequence, label) {
            Ok(changes) => {
                highest.observe(&changes.sequence);
                for id in changes.added {
                    if seen.insert(id.clone()) {
                        added.push(id);
                    }
                }
            }
            Err(RemoteError::CursorExpired) => {
                info!(
                    "change cursor expired for account {}, falling back to full sync",
                    account
                );
                return full_sync(
                    client, store, cursors, account, labels, max_messages, None, progress,
                );
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to list changes for label {label}"));
            }
        }
    }

    let mut report = SyncReport::default();
    let total = added.len();

    for (idx, id) in added.iter().enumerate() {
        if let Some(cb) = progress.as_mut() {
            cb(INCREMENTAL_PROGRESS_LABEL, idx + 1, total);
        }

        if store.message_exists(id)? {
            report.skipped += 1;
            continue;
        }

        match client.fetch_message(id) {
            Ok(message) => {
                let folder = store.primary_folder(&message.labels);
                match store.write_message(&folder, &message.raw, &message.labels, id) {
                    Ok(_) => report.downloaded += 1,
                    Err(e) => report.add_error(id.as_str(), e),
                }
            }
            Err(e) => report.add_error(id.as_str(), e),
        }
    }

    if let Some(sequence) = highest.into_sequence() {
        cursors.save(account, &sequence, labels)?;
    }

    report.duration_ms = started.elapsed().as_millis() as u64;
    info!(
        "incremental sync done: {} downloaded, {} skipped, {} errors",
        report.downloaded, report.skipped, report.errors
    );
    Ok(report)
}
