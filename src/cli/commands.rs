use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for the routewatch host
#[derive(Parser)]
#[command(version)]
#[command(about = "SNMP fleet watcher - device info, interface polling, trap capture and CDP topology")]
#[command(long_about = "Routewatch queries the devices listed in its configuration over SNMP v1/v2c. \
It reports device and interface details, polls interface counters for a bounded time, \
captures link traps and rebuilds the physical topology from CDP neighbor tables.\n\n\
Configuration is read from routewatch.toml (or --config) and ROUTEWATCH__* environment variables.")]
pub struct Cli {
    /// Configuration file; defaults to ./routewatch.toml when present
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// General info (name, OS, active interfaces) of one or every device
    #[command(long_about = "Queries sysName, sysDescr and the interface status table.\n\n\
Examples:\n  \
rw info                       # Every device in the inventory\n  \
rw info R1.lab                # One device, by address, hostname or name")]
    Info {
        /// Device address, hostname or display name
        device: Option<String>,
    },

    /// Interface table of a device
    Interfaces {
        /// Device address, hostname or display name
        device: String,
    },

    /// CDP neighbors of a device
    Neighbors {
        /// Device address, hostname or display name
        device: String,
    },

    /// Physical topology discovered from CDP neighbor tables
    #[command(long_about = "Prints the persisted topology snapshot, discovering it first when none exists.\n\n\
Examples:\n  \
rw topology                   # Stored snapshot, or discover now\n  \
rw topology --refresh         # Always discover now")]
    Topology {
        /// Run discovery even if a snapshot is stored
        #[arg(short, long)]
        refresh: bool,
    },

    /// Poll an interface's ifInOctets counter for a bounded time
    #[command(long_about = "Polls ifInOctets of one interface every INTERVAL seconds for DURATION seconds, \
persisting each sample, then prints the recorded series. Ctrl-C stops early.\n\n\
Examples:\n  \
rw monitor 10.0.0.1 Gi0/1 --interval 5 --duration 60")]
    Monitor {
        device: String,
        interface: String,

        /// Seconds between polls
        #[arg(short, long, default_value = "5")]
        interval: u64,

        /// Total session length in seconds
        #[arg(short, long, default_value = "60")]
        duration: u64,
    },

    /// Print the recorded samples of an interface
    Samples { device: String, interface: String },

    /// Capture link traps for device interfaces until Ctrl-C
    #[command(long_about = "Binds the trap listener and subscribes the given interfaces of DEVICE. \
Notifications whose source address is the device's address are classified and stored.\n\n\
Examples:\n  \
rw listen 10.0.0.1 -i Gi0/1 -i Gi0/2")]
    Listen {
        device: String,

        /// Interface to capture; repeatable
        #[arg(short, long = "interface", required = true)]
        interfaces: Vec<String>,
    },

    /// Print the captured traps and capture status of an interface
    Traps { device: String, interface: String },
}
