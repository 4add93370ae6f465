#[tokio::main]
async fn main() {
  // Minimal CLI: support --version/-V
  let mut args = std::env::args().skip(1);
  if let Some(arg) = args.next() {
    if arg == "--version" || arg == "-V" {
      println!("tarl-sync {}", env!("CARGO_PKG_VERSION"));
      return;
    }
    if arg == "--help" || arg == "-h" {
      eprintln!("Usage: tarl-sync [--version]");
      eprintln!();
      eprintln!("Configured through TARL_* environment variables:");
      eprintln!("  TARL_SECONDARY_URL (required), TARL_PRIMARY_URL, TARL_ADDR,");
      eprintln!("  TARL_MAX_CONNECTIONS, TARL_CONNECT_TIMEOUT_SECS,");
      eprintln!("  TARL_SYNC_BATCH_SIZE, TARL_SYNC_INTERVAL_SECS, TARL_RUN_MIGRATIONS");
      return;
    }
  }

  if let Err(e) = tarl_sync::app::run().await {
    eprintln!("error: {e}");
    std::process::exit(1);
  }
}
