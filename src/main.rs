mod args;
mod command;
mod config;
mod init;

use args::Args;
use clap::Parser;
use directories::ProjectDirs;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    args.command.run().await
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "fibench", "fibench")
}
