use std::{path::Path, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Local};
use log::{error, info};
use owo_colors::OwoColorize;

use crate::api::PostOutcome;
use crate::api::reqres::{RemoteApi, ReqresClient};
use crate::cli::Args;
use crate::error::SyncError;
use crate::models::{PostRecord, UserRecord, load_seed};
use crate::retry::{RetryPolicy, with_retry};
use crate::store::{Bson, RecordStore, StoreConnection};

/// Where the records go and how hard to try.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub database: String,
    pub user_collection: String,
    pub post_collection: String,
    pub fetch_id: Option<String>,
    pub retry: RetryPolicy,
}

impl SyncPlan {
    pub fn from_args(args: &Args) -> Self {
        Self {
            database: args.database.clone(),
            user_collection: args.user_collection.clone(),
            post_collection: args.post_collection.clone(),
            fetch_id: args.fetch_id.clone(),
            retry: RetryPolicy::with_retries(args.retries),
        }
    }
}

/// What one run did. The store ids and the remote outcomes sit side by side
/// but nothing ties a stored document to its remote copy.
#[derive(Debug, Default)]
pub struct RunReport {
    pub user_id: Option<Bson>,
    pub post_id: Option<Bson>,
    pub user_sync: Option<PostOutcome>,
    pub post_sync: Option<PostOutcome>,
    pub fetched_user: Option<Vec<u8>>,
    pub fetched_post: Option<Vec<u8>>,
}

pub async fn store_records<S: RecordStore>(
    store: &S,
    plan: &SyncPlan,
    user: &UserRecord,
    post: &PostRecord,
    report: &mut RunReport,
) -> Result<(), SyncError> {
    let database = plan.database.as_str();

    let user_collection = plan.user_collection.as_str();
    let inserted = with_retry(&plan.retry, "insert user", || {
        store.insert_one(database, user_collection, user)
    })
    .await?;
    info!("stored user {} as {}", user.id, inserted.inserted_id);
    report.user_id = Some(inserted.inserted_id);

    let post_collection = plan.post_collection.as_str();
    let inserted = with_retry(&plan.retry, "insert post", || {
        store.insert_one(database, post_collection, post)
    })
    .await?;
    info!("stored post {} as {}", post.id, inserted.inserted_id);
    report.post_id = Some(inserted.inserted_id);

    Ok(())
}

/// POST both records, then fetch each resource back by id.
///
/// A rejected POST is printed and the run goes on; transport and body
/// failures abort.
pub async fn sync_records<A: RemoteApi>(
    api: &A,
    plan: &SyncPlan,
    user: &UserRecord,
    post: &PostRecord,
    report: &mut RunReport,
) -> Result<(), SyncError> {
    let outcome = with_retry(&plan.retry, "post user", || api.create_user(user)).await?;
    println!("{}", outcome.describe());
    report.user_sync = Some(outcome);

    let outcome = with_retry(&plan.retry, "post post", || api.create_post(post)).await?;
    println!("{}", outcome.describe());
    report.post_sync = Some(outcome);

    let user_id = plan.fetch_id.as_deref().unwrap_or(&user.id);
    let bytes = with_retry(&plan.retry, "get user", || api.get_source(user_id)).await?;
    info!("fetched user {user_id}: {} bytes", bytes.len());
    report.fetched_user = Some(bytes);

    let post_id = plan.fetch_id.as_deref().unwrap_or(&post.id);
    let bytes = with_retry(&plan.retry, "get post", || api.get_post(post_id)).await?;
    info!("fetched post {post_id}: {} bytes", bytes.len());
    report.fetched_post = Some(bytes);

    Ok(())
}

/// The whole sequence minus connection setup and teardown.
pub async fn execute<S: RecordStore, A: RemoteApi>(
    store: Option<&S>,
    api: Option<&A>,
    plan: &SyncPlan,
    user: &UserRecord,
    post: &PostRecord,
) -> Result<RunReport, SyncError> {
    let mut report = RunReport::default();

    if let Some(store) = store {
        store_records(store, plan, user, post, &mut report).await?;
    }

    if let Some(api) = api {
        sync_records(api, plan, user, post, &mut report).await?;
    }

    Ok(report)
}

/// Records to sync: the seed file's when given, the demo records otherwise.
pub fn load_records(seed: Option<&Path>) -> Result<(UserRecord, PostRecord)> {
    match seed {
        Some(path) => load_seed(path),
        None => Ok((UserRecord::demo(), PostRecord::demo())),
    }
}

pub fn timestamp_line(now: DateTime<Local>) -> String {
    format!("Location : {} Time : {}", now.offset(), now)
}

/// Run the sequence, print the results, then tear the connection down.
///
/// Teardown happens on every path. A failed close wins over the run's own
/// error, which is logged.
pub async fn run_sequence<A: RemoteApi>(
    connection: Option<&mut StoreConnection>,
    api: Option<&A>,
    plan: &SyncPlan,
    user: &UserRecord,
    post: &PostRecord,
) -> Result<RunReport, SyncError> {
    let result = execute(connection.as_deref(), api, plan, user, post).await;

    if let Ok(report) = &result {
        print_summary(report, user, post);
        println!("{}", timestamp_line(Local::now()));
    }

    let closed = match connection {
        Some(connection) => connection.close().await,
        None => Ok(()),
    };

    settle(result, closed)
}

fn settle(
    result: Result<RunReport, SyncError>,
    closed: Result<(), SyncError>,
) -> Result<RunReport, SyncError> {
    match (result, closed) {
        (result, Ok(())) => result,
        (Err(run_error), Err(close_error)) => {
            error!("run failed before teardown: {run_error}");
            Err(close_error)
        }
        (Ok(_), Err(close_error)) => Err(close_error),
    }
}

pub async fn run(args: Args) -> Result<()> {
    let (user, post) = load_records(args.seed.as_deref())?;

    let plan = SyncPlan::from_args(&args);
    let op_timeout = Duration::from_secs(args.timeout_secs);
    let connect_timeout = Duration::from_secs(args.connect_timeout_secs);

    let api = if args.skip_sync {
        None
    } else {
        Some(ReqresClient::new(&args.api_url, op_timeout)?)
    };

    let mut connection = if args.skip_store {
        None
    } else {
        let uri = args.mongodb_uri.as_str();
        Some(
            with_retry(&plan.retry, "connect", || {
                StoreConnection::connect(uri, connect_timeout, op_timeout)
            })
            .await?,
        )
    };

    run_sequence(connection.as_mut(), api.as_ref(), &plan, &user, &post).await?;
    Ok(())
}

fn print_summary(report: &RunReport, user: &UserRecord, post: &PostRecord) {
    let lines = [
        ("user", &user.id, &report.user_id, &report.user_sync),
        ("post", &post.id, &report.post_id, &report.post_sync),
    ];

    for (kind, id, stored, synced) in lines {
        let stored = match stored {
            Some(inserted_id) => format!("stored as {inserted_id}"),
            None => "not stored".to_string(),
        };
        let (mark, synced) = match synced {
            Some(outcome) if outcome.is_created() => ("✓".bright_green().to_string(), "synced"),
            Some(_) => ("✗".bright_red().to_string(), "rejected"),
            None => ("-".dimmed().to_string(), "not synced"),
        };
        println!("{mark} {kind} {}: {stored}, {synced}", id.bright_cyan());
    }
}
