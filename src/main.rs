use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, ValueEnum};

use post_ledger_mirror::config::SyncConfig;
use post_ledger_mirror::domain::Pubkey;
use post_ledger_mirror::session::{LogNotifier, MutationOutcome, SyncSnapshot, Synchronizer};
use post_ledger_mirror::setup_memory_session;

#[derive(ValueEnum, Clone, Debug)]
enum Mode {
    /// Scripted session, mirror printed as a table.
    Demo,
    /// Same session, snapshot printed as JSON.
    Json,
}

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON config file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    endpoint: Option<String>,

    /// Hex public key of the local identity. A fresh one is made if omitted.
    #[arg(long)]
    identity: Option<Pubkey>,

    /// How many posts the local identity publishes.
    #[arg(long, default_value_t = 3)]
    posts: u64,

    #[arg(long)]
    serialize_post_creation: bool,

    #[arg(long)]
    confirm_all_mutations: bool,

    #[arg(long, value_enum, default_value_t = Mode::Demo)]
    mode: Mode,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    config.serialize_post_creation |= args.serialize_post_creation;
    config.confirm_all_mutations |= args.confirm_all_mutations;

    let identity = args.identity.unwrap_or_else(Pubkey::new_unique);
    log::info!("[MAIN] identity {}", identity);

    let t0 = Instant::now();
    let (ledger, mut sync) = setup_memory_session(config.clone(), Arc::new(LogNotifier));
    sync.set_connection(Some(config.connection())).await;
    sync.set_identity(Some(identity)).await;

    expect_ok("create_user", sync.create_user().await);
    for n in 1..=args.posts {
        let title = format!("post number {n}");
        let image = format!("https://img.example/{n}.png");
        expect_ok("create_post", sync.create_post(&title, &image).await);
    }

    // A second wallet on the same ledger, so the mirror shows more than one owner.
    let friend = Pubkey::new_unique();
    let mut friend_sync = Synchronizer::new(
        config.clone(),
        Arc::new(ledger.clone()),
        Arc::new(ledger.deriver()),
        Arc::new(LogNotifier),
    );
    friend_sync.set_connection(Some(config.connection())).await;
    friend_sync.set_identity(Some(friend)).await;
    expect_ok("create_user", friend_sync.create_user().await);
    expect_ok("create_post", friend_sync.create_post("hello from a friend", "").await);

    if args.posts >= 1 {
        expect_ok("like_post", friend_sync.like_post(identity, 1, friend).await);
        expect_ok("update_post", sync.update_post(identity, 1, "first post, edited").await);
    }
    expect_ok("like_post", sync.like_post(friend, 1, identity).await);
    if args.posts >= 2 {
        expect_ok("delete_post", sync.delete_post(identity, args.posts).await);
    }

    // Let the listeners drain their queues.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let elapsed = t0.elapsed();

    let snapshot = sync.snapshot();
    friend_sync.shutdown();
    sync.shutdown();

    match args.mode {
        Mode::Demo => print_snapshot(&snapshot, elapsed),
        Mode::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
    }

    Ok(())
}

fn expect_ok(what: &str, outcome: MutationOutcome) {
    match outcome {
        MutationOutcome::Succeeded(sig) => log::debug!("[MAIN] {} -> {}", what, sig),
        MutationOutcome::Skipped => log::warn!("[MAIN] {} skipped", what),
        MutationOutcome::Failed(msg) => log::warn!("[MAIN] {} failed: {}", what, msg),
    }
}

fn print_snapshot(snapshot: &SyncSnapshot, elapsed: Duration) {
    println!();
    println!("==================================================================");
    println!("                         MIRRORED POSTS                           ");
    println!("==================================================================");
    println!("Connected:      {}", snapshot.connected);
    println!(
        "User account:   {}",
        snapshot
            .user_account
            .as_ref()
            .map(|a| format!("{} (last post #{})", a.owner.short(), a.last_post_id))
            .unwrap_or_else(|| "-".into())
    );
    println!("------------------------------------------------------------------");

    match &snapshot.posts {
        None => println!("(collection not loaded)"),
        Some(posts) if posts.is_empty() => println!("(no posts)"),
        Some(posts) => {
            println!("{:<10} | {:<4} | {:<30} | {:<5}", "Owner", "Id", "Title", "Likes");
            println!("------------------------------------------------------------------");
            for post in posts {
                println!(
                    "{:<10} | {:<4} | {:<30} | {:<5}",
                    post.owner.short(),
                    post.id,
                    post.title,
                    post.likes
                );
            }
        }
    }

    println!("------------------------------------------------------------------");
    println!("Session time:   {:?}", elapsed);
    println!("==================================================================");
}
