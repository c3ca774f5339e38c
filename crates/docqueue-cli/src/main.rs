use docqueue_cli::run_cli;

#[tokio::main]
async fn main() {
    if let Err(e) = run_cli().await {
        // The subscriber may not be installed yet when settings fail to load
        eprintln!("docqueue: {e}");
        std::process::exit(e.exit_code());
    }
}
