use anyhow::{Context, Result, anyhow};
use log::info;
use serde::Serialize;

use super::commands::Commands;
use crate::services::Runtime;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to render output")?
    );
    Ok(())
}

pub struct CommandHandler {
    runtime: Runtime,
}

impl CommandHandler {
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }

    pub async fn handle(&self, command: Commands) -> Result<()> {
        let result = self.dispatch(command).await;
        self.runtime.shutdown().await;
        result
    }

    async fn dispatch(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Info { device: None } => {
                print_json(&self.runtime.device_info().all_device_info().await)
            }
            Commands::Info {
                device: Some(device),
            } => print_json(&self.runtime.device_info().device_info(&device).await?),
            Commands::Interfaces { device } => {
                print_json(&self.runtime.device_info().interfaces(&device).await?)
            }
            Commands::Neighbors { device } => {
                print_json(&self.runtime.device_info().neighbors(&device).await?)
            }
            Commands::Topology { refresh } => self.topology(refresh).await,
            Commands::Monitor {
                device,
                interface,
                interval,
                duration,
            } => self.monitor(&device, &interface, interval, duration).await,
            Commands::Samples { device, interface } => {
                print_json(&self.runtime.monitor().read(&device, &interface)?)
            }
            Commands::Listen { device, interfaces } => self.listen(&device, &interfaces).await,
            Commands::Traps { device, interface } => {
                let traps = self.runtime.traps();
                print_json(&traps.status(&device, &interface)?)?;
                print_json(&traps.events(&device, &interface)?)
            }
        }
    }

    async fn topology(&self, refresh: bool) -> Result<()> {
        let topology = self
            .runtime
            .topology()
            .ok_or_else(|| anyhow!("No devices configured; cannot pick a discovery seed"))?;
        let snapshot = if refresh {
            topology.refresh().await?
        } else {
            topology.current().await?
        };
        print_json(&snapshot)
    }

    async fn monitor(
        &self,
        device: &str,
        interface: &str,
        interval: u64,
        duration: u64,
    ) -> Result<()> {
        let scheduler = self.runtime.monitor();
        let session = scheduler.start(device, interface, interval, duration).await?;
        println!(
            "Monitoring {} - {} every {}s for {}s (Ctrl-C to stop)",
            session.device, session.interface, interval, duration
        );

        tokio::select! {
            finished = scheduler.wait(&session.device, &session.interface) => finished?,
            _ = tokio::signal::ctrl_c() => {
                // Already finished sessions are fine here
                let _ = scheduler.stop(&session.device, &session.interface);
                info!("Monitoring interrupted");
            }
        }

        match scheduler.read(&session.device, &session.interface) {
            Ok(samples) => print_json(&samples),
            Err(e) => {
                println!("{e}");
                Ok(())
            }
        }
    }

    async fn listen(&self, device: &str, interfaces: &[String]) -> Result<()> {
        let addr = self.runtime.start_listener().await?;
        let traps = self.runtime.traps();
        for interface in interfaces {
            traps.start_capture(device, interface)?;
        }
        println!("Listening for traps on {addr} (Ctrl-C to stop)");

        tokio::signal::ctrl_c()
            .await
            .context("Failed to wait for Ctrl-C")?;

        let mut statuses = Vec::with_capacity(interfaces.len());
        for interface in interfaces {
            traps.stop_capture(device, interface)?;
            statuses.push(traps.status(device, interface)?);
        }
        print_json(&statuses)
    }
}
