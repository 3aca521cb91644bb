//! CLI module for PMP Split
//!
//! Runs one participation API call per invocation against the configured
//! storage backend, which must be Redis or PostgreSQL:
//! - `participate`: enter the visitor into an experiment
//! - `complete`: record a conversion
//! - `winner`: show, set or clear the forced winner
//! - `stats`: print per-alternative statistics as JSON
//! - `reset`: drop all counters and the winner

mod commands;

use clap::{Args, Parser, Subcommand};

pub use commands::run;

/// PMP Split - deterministic split and multivariate testing
#[derive(Parser)]
#[command(name = "pmp-split")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub visitor: VisitorArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Caller context used for bucketing and exclusion
#[derive(Args, Debug, Clone, Default)]
pub struct VisitorArgs {
    /// Stable client identifier; a random one is generated when omitted
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// Visitor IP address, matched against the ignore list
    #[arg(long = "ip", global = true)]
    pub ip_address: Option<String>,

    /// Visitor user agent, matched against the robot pattern
    #[arg(long, global = true)]
    pub user_agent: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Enter the visitor into an experiment and print the chosen alternative
    Participate {
        experiment: String,

        /// Alternatives as `name` or `name=weight`; the first is the control
        #[arg(required = true, num_args = 1..)]
        alternatives: Vec<String>,

        /// Hash with this salt instead of the experiment name; only applies
        /// when this call creates the experiment
        #[arg(long)]
        salt: Option<String>,
    },

    /// Record a conversion for the visitor
    Complete { experiment: String },

    /// Show the forced winner, or change it
    Winner {
        experiment: String,

        /// Force every visitor onto this alternative
        #[arg(long, conflicts_with = "clear")]
        set: Option<String>,

        /// Remove the forced winner
        #[arg(long)]
        clear: bool,
    },

    /// Print per-alternative statistics as JSON
    Stats { experiment: String },

    /// Drop all counters and the winner
    Reset { experiment: String },
}
