use std::sync::Arc;

use client::{Anonymous, AuthProvider, Coordinator, Snapshot, StaticToken, UploadOptions};
use comfy_table::{presets::UTF8_HORIZONTAL_ONLY, Attribute, Cell, Color, ContentArrangement, Table};
use kernel::{UploadFile, UploadStatus};
use tokio::signal;

pub struct UploadParams {
    pub uri: String,
    pub bucket: Option<String>,
    pub token: Option<String>,
    pub concurrency: Option<usize>,
    pub files: Vec<String>,
}

/// Uploads all files and prints a summary. Returns `true` when every file
/// reached its bucket.
pub async fn run(params: UploadParams) -> bool {
    let auth: Arc<dyn AuthProvider> = match params.token {
        Some(token) => Arc::new(StaticToken::new(token)),
        None => Arc::new(Anonymous),
    };
    let mut options = UploadOptions::from_env();
    if let Some(concurrency) = params.concurrency {
        options = options.with_max_concurrency(concurrency);
    }

    let coordinator = match Coordinator::with_options(&params.uri, auth, options) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e}");
            return false;
        }
    };

    let mut files = Vec::with_capacity(params.files.len());
    for path in &params.files {
        match UploadFile::from_path(path).await {
            Ok(f) => files.push(f),
            Err(e) => tracing::error!("skipping {path}: {e}"),
        }
    }
    if files.is_empty() {
        tracing::error!("nothing to upload");
        return false;
    }

    coordinator.add(files);
    if let Err(e) = coordinator.upload(params.bucket.as_deref()) {
        tracing::error!("{e}");
        return false;
    }

    let snapshot = tokio::select! {
        snapshot = follow(&coordinator) => snapshot,
        _ = signal::ctrl_c() => {
            tracing::warn!("interrupted, aborting transfers still running");
            let snapshot = coordinator.snapshot();
            coordinator.clear();
            snapshot
        }
    };

    print_summary(&snapshot);
    snapshot.is_uploaded()
}

/// Logs overall progress in steps of ten percent until nothing is uploading.
async fn follow(coordinator: &Coordinator) -> Snapshot {
    let mut changes = coordinator.subscribe();
    let mut reported = 0;
    loop {
        let snapshot = changes.borrow_and_update().clone();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let step = (snapshot.progress() * 10.0).floor() as u32;
        if step > reported {
            reported = step;
            let tally = snapshot.tally();
            tracing::info!(
                "{}% done, {} of {} file(s) finished",
                step * 10,
                tally.uploaded + tally.error + tally.canceled,
                tally.total()
            );
        }
        if !snapshot.is_uploading() {
            return snapshot;
        }
        if changes.changed().await.is_err() {
            return coordinator.snapshot();
        }
    }
}

fn print_summary(snapshot: &Snapshot) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(vec![
            Cell::new("File").add_attribute(Attribute::Bold),
            Cell::new("Bucket").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Progress").add_attribute(Attribute::Bold),
            Cell::new("Detail").add_attribute(Attribute::Bold),
        ]);

    for item in snapshot.items() {
        let color = match item.status() {
            UploadStatus::Uploaded => Color::Green,
            UploadStatus::Error => Color::Red,
            UploadStatus::Idle | UploadStatus::Uploading | UploadStatus::Canceled => Color::Yellow,
        };
        let detail = match (item.error(), item.completion()) {
            (Some(e), _) => e.to_string(),
            (None, Some(c)) => c
                .file_id
                .map(|id| format!("id {id}"))
                .unwrap_or_default(),
            (None, None) => String::new(),
        };
        table.add_row(vec![
            Cell::new(&item.file().name),
            Cell::new(item.bucket().unwrap_or_default()),
            Cell::new(item.status()).fg(color),
            Cell::new(format!("{:.0}%", item.progress() * 100.0)),
            Cell::new(detail),
        ]);
    }
    println!("{table}");

    let tally = snapshot.tally();
    println!(
        "{}: {} uploaded, {} failed, {} canceled of {}",
        snapshot.status(),
        tally.uploaded,
        tally.error,
        tally.canceled,
        tally.total()
    );
}
