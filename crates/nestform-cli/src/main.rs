use clap::Parser;
use is_terminal::IsTerminal;
use nestform::{Cli, run};
use owo_colors::OwoColorize;

fn main() {
    // Reset SIGPIPE to default behavior to prevent panic on broken pipe
    // (e.g., when piping to `head` or `less` that exits early)
    #[cfg(unix)]
    reset_sigpipe();

    let cli = Cli::parse();
    init_tracing(cli.log_level.as_level());

    if let Err(e) = run(cli) {
        if std::io::stderr().is_terminal() {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn init_tracing(level: tracing::Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}
