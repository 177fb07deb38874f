//! Entry point. All real work happens in `cli::app::run`.

mod actions;
mod cli;
mod errors;
mod model;
mod wiring;

#[tokio::main]
async fn main() {
    let code = cli::app::run().await;
    std::process::exit(code);
}
