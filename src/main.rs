use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use reflowpanel::console::{self, Input};
use reflowpanel::{Action, DeviceClient, Panel, PanelConfig, PidGains};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Config file (default: <config dir>/reflowpanel/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Device base URL, overrides the config file
    #[arg(long, global = true)]
    device: Option<String>,
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session with live status polling (default)
    Console,
    /// Print the current device status once
    Status,
    /// List stored profiles
    Profiles,
    /// Make a stored profile the active one
    Load { name: String },
    /// Store the device's active values under a new name
    Save { name: String },
    /// Delete a stored profile
    Delete {
        name: String,
        /// Confirm the deletion
        #[arg(long, short)]
        yes: bool,
    },
    /// Overwrite the live PID gains
    SetPid {
        #[arg(allow_negative_numbers = true)]
        kp: f64,
        #[arg(allow_negative_numbers = true)]
        ki: f64,
        #[arg(allow_negative_numbers = true)]
        kd: f64,
        /// Confirm; the old gains are not kept
        #[arg(long, short)]
        yes: bool,
    },
    /// Start the reflow cycle
    Start,
    /// Stop the reflow cycle
    Stop,
}

#[tokio::main]
async fn main() -> Result<()> {
    reflowpanel::init_tracing();
    let args = Args::parse();

    let mut config = PanelConfig::load_or_default(args.config.as_deref())?;
    if let Some(device) = args.device {
        config.device_url = device;
    }
    let client = DeviceClient::new(&config)?;
    let mut panel = Panel::new(client, config.poll_interval());

    match args.cmd.unwrap_or(Command::Console) {
        Command::Console => run_console(panel).await,
        Command::Status => {
            panel.refresh_status().await?;
            println!("{}", console::render_view(&panel.view()));
            Ok(())
        }
        Command::Profiles => {
            let profiles = panel.refresh_profiles().await?.to_vec();
            println!(
                "{}",
                console::render_notice(&reflowpanel::Notice::Profiles(profiles))
            );
            Ok(())
        }
        Command::Load { name } => one_shot(&mut panel, Action::Load { name }).await,
        Command::Save { name } => one_shot(&mut panel, Action::Save { name }).await,
        Command::Delete { name, yes } => {
            one_shot(&mut panel, Action::Delete { name, confirmed: yes }).await
        }
        Command::SetPid { kp, ki, kd, yes } => {
            let gains = PidGains { kp, ki, kd };
            one_shot(
                &mut panel,
                Action::ApplyPid {
                    gains: Some(gains),
                    confirmed: yes,
                },
            )
            .await
        }
        Command::Start => one_shot(&mut panel, Action::Start).await,
        Command::Stop => one_shot(&mut panel, Action::Stop).await,
    }
}

async fn one_shot(panel: &mut Panel<DeviceClient>, action: Action) -> Result<()> {
    // Start/stop guards and the save push decision need a current snapshot.
    if let Err(e) = panel.refresh_status().await {
        warn!("Could not read status before acting: {}", e);
    }
    panel.execute(action).await?;
    println!("{}", console::render_view(&panel.view()));
    Ok(())
}

async fn run_console(panel: Panel<DeviceClient>) -> Result<()> {
    let cancel = CancellationToken::new();
    let (command_tx, command_rx) = mpsc::channel(16);
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();

    println!("{}", console::HELP);

    let printer = tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            println!("{}", console::render_notice(&notice));
        }
    });

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    // Plain thread: a blocking stdin read must not hold up runtime shutdown.
    let input_cancel = cancel.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match console::parse_line(&line) {
                Ok(Input::Command(command)) => {
                    if command_tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                Ok(Input::Help) => println!("{}", console::HELP),
                Ok(Input::Quit) => break,
                Ok(Input::Empty) => {}
                Err(e) => println!("{}", e),
            }
        }
        input_cancel.cancel();
    });

    let panel = panel.run(command_rx, notice_tx, cancel).await;
    let _ = printer.await;

    if panel.reconciler().is_dirty() {
        info!("Exiting with unsaved draft edits");
    }
    Ok(())
}
