use std::time::Duration;

use clap::Parser;
use futures::future::join_all;
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::select;

use worldclock::config::Args;
use worldclock::console::{ConsoleFace, ConsolePage};
use worldclock::{Activation, ClockError, ClockWidget, Registry, TimeZoneSource};

// Handles one line of input of the form `<clock number> <offset>`, e.g.
// `2 -5` switches the second clock to UTC-5.
fn handle_command(widgets: &mut [ClockWidget<ConsoleFace>], line: &str) {
    let mut parts = line.split_whitespace();
    let (Some(number), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        if !line.trim().is_empty() {
            warn!("expected `<clock number> <offset>`, got {line:?}");
        }
        return;
    };
    let Some(widget) = number
        .parse::<usize>()
        .ok()
        .and_then(|number| widgets.iter_mut().find(|w| w.id() + 1 == number))
        .filter(|w| w.is_running())
    else {
        warn!("no running clock number {number}");
        return;
    };
    if let Err(err) = widget.on_selector_changed(value) {
        warn!("{err}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClockError> {
    env_logger::init();

    let args = Args::parse();
    let config = args.resolve_config().await?;
    let registry = Registry::from_config(&config);
    let page = ConsolePage::new();
    let source = TimeZoneSource::parse(&config.timezones_source);

    let mut widgets = Vec::new();
    for _ in 0..config.clocks {
        match registry.create(&page) {
            Ok(widget) => widgets.push(widget),
            Err(err) => {
                error!("{err}");
                break;
            }
        }
    }

    // Each activation waits on its own fetch; none of them blocks the others.
    let activations = join_all(
        widgets
            .iter_mut()
            .map(|widget| widget.activate(&page, &source)),
    )
    .await;
    let running = activations
        .iter()
        .filter(|activation| **activation == Activation::Running)
        .count();
    if running == 0 {
        info!("no clock could be activated, exiting");
        return Ok(());
    }
    info!("{running} clock(s) running, type `<clock number> <offset>` to switch time zones");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let refresh_interval = Duration::from_millis(config.refresh_interval_ms.max(1));
    let mut repaint = tokio::time::interval(refresh_interval);
    let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());
    loop {
        select! {
            res = &mut ctrl_c => {
                if let Err(err) = res {
                    error!("Unable to listen for shutdown signal: {err}");
                }
                break;
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_command(&mut widgets, &line),
                Ok(None) => stdin_open = false,
                Err(err) => {
                    error!("error reading stdin: {err}");
                    stdin_open = false;
                }
            },
            _ = repaint.tick() => {
                println!("{}", page.paint());
            }
        }
    }

    registry.shutdown().await;
    Ok(())
}
