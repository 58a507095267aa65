mod board;
mod capture;
mod config;
mod engine;
mod mode;
mod recognizer;
mod robot;
mod rules;
mod session;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use dialoguer::Select;

use crate::config::Config;
use crate::mode::GameMode;
use crate::session::Session;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let env = env_logger::Env::default().filter_or("TURKBOARD_LOG", "info");
    env_logger::Builder::from_env(env).init();

    let matches = Command::new("turkboard")
        .version("0.1.0")
        .about("Terminal front-end for camera-based chess board digitization")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON config file with endpoints and capture bounds"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("MODE")
                .help("Starting game mode (interactive prompt when omitted)")
                .value_parser(["player", "engine", "player-vs-engine"]),
        )
        .arg(
            Arg::new("recognizer-url")
                .long("recognizer-url")
                .value_name("URL")
                .help("Image recognition service endpoint"),
        )
        .arg(
            Arg::new("engine-url")
                .long("engine-url")
                .value_name("URL")
                .help("Engine evaluation service endpoint"),
        )
        .arg(
            Arg::new("robot-url")
                .long("robot-url")
                .value_name("URL")
                .help("Robot control endpoint"),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_name("SECONDS")
                .help("Auto-capture period in seconds")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .get_matches();

    let mut config = Config::load(matches.get_one::<String>("config").map(|p| Path::new(p)))?;
    if let Some(url) = matches.get_one::<String>("recognizer-url") {
        config.recognizer_url = url.clone();
    }
    if let Some(url) = matches.get_one::<String>("engine-url") {
        config.engine_url = url.clone();
    }
    if let Some(url) = matches.get_one::<String>("robot-url") {
        config.robot_url = url.clone();
    }
    if let Some(secs) = matches.get_one::<u64>("interval") {
        config.capture_interval_secs = *secs;
    }

    let mode = match matches.get_one::<String>("mode") {
        Some(flag) => GameMode::from_flag(flag)?,
        None => prompt_mode()?,
    };

    println!("turkboard starting...");
    println!("Press Ctrl+C to stop.");

    let session = Session::new(config, mode)?;
    session.run().await
}

fn prompt_mode() -> Result<GameMode> {
    let modes = [GameMode::Player, GameMode::EngineAuto, GameMode::PlayerVsEngine];
    let index = Select::new()
        .with_prompt("Game mode")
        .items(&modes)
        .default(0)
        .interact()
        .context("Failed to read the mode selection (pass --mode when not on a terminal)")?;
    Ok(modes[index])
}
