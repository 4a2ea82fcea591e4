use core::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};
use flakeid::{NodeConfig, SystemClock, TimeSource};

use crate::app::clock::ClockKind;

/// Milliseconds since the Unix epoch of the Twitter epoch, the default.
pub const DEFAULT_EPOCH_MS: u64 = 1_288_834_974_657;

/// Command line arguments for the `flakeid` binary.
///
/// Node settings are global so they can be given before or after the
/// subcommand, and each of them can also come from the environment or a
/// `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "flakeid",
    version,
    about = "Generate and decode 64-bit Snowflake IDs"
)]
pub struct CliArgs {
    /// Datacenter ID of this node, `0..=31`.
    ///
    /// Environment variable: `FLAKEID_DATACENTER_ID`
    #[arg(long, global = true, env = "FLAKEID_DATACENTER_ID", default_value_t = 0)]
    pub datacenter_id: u64,

    /// Worker ID of this node, `0..=31`.
    ///
    /// Environment variable: `FLAKEID_WORKER_ID`
    #[arg(long, global = true, env = "FLAKEID_WORKER_ID", default_value_t = 0)]
    pub worker_id: u64,

    /// Epoch the timestamp field counts from, in milliseconds since the Unix
    /// epoch. IDs must be decoded with the epoch they were generated with.
    ///
    /// Environment variable: `FLAKEID_EPOCH_MS`
    #[arg(long, global = true, env = "FLAKEID_EPOCH_MS", default_value_t = DEFAULT_EPOCH_MS)]
    pub epoch_ms: u64,

    /// Time source used when generating.
    ///
    /// Environment variable: `FLAKEID_CLOCK`
    #[arg(long, global = true, env = "FLAKEID_CLOCK", value_enum, default_value_t = ClockKind::System)]
    pub clock: ClockKind,

    /// Give up on an ID if the clock stalls for longer than this. Waits
    /// indefinitely when unset.
    ///
    /// Environment variable: `FLAKEID_MAX_WAIT_MS`
    #[arg(long, global = true, env = "FLAKEID_MAX_WAIT_MS")]
    pub max_wait_ms: Option<u64>,

    /// How IDs are printed.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Decimal)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate IDs and print them one per line.
    Generate {
        /// Number of IDs to generate.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Number of concurrent tasks requesting IDs. Above one, requests go
        /// through a shared generator service.
        #[arg(long, default_value_t = 1)]
        tasks: usize,
    },
    /// Decode IDs into their fields.
    Decode {
        /// IDs in decimal, or hexadecimal with a `0x` prefix.
        #[arg(required = true)]
        ids: Vec<String>,

        /// Print one JSON object per ID.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Textual form of a printed ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain decimal.
    Decimal,
    /// Decimal zero-padded to 20 digits, so IDs sort lexicographically.
    Padded,
    /// `0x`-prefixed, 16 hexadecimal digits.
    Hex,
}

/// Validated settings the commands run with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub node: NodeConfig,
    pub clock: ClockKind,
    pub max_wait: Option<Duration>,
    pub format: OutputFormat,
    pub command: Command,
}

impl TryFrom<CliArgs> for Settings {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.datacenter_id > NodeConfig::MAX_DATACENTER_ID {
            bail!(
                "FLAKEID_DATACENTER_ID ({}) exceeds the maximum of {}",
                args.datacenter_id,
                NodeConfig::MAX_DATACENTER_ID
            );
        }

        if args.worker_id > NodeConfig::MAX_WORKER_ID {
            bail!(
                "FLAKEID_WORKER_ID ({}) exceeds the maximum of {}",
                args.worker_id,
                NodeConfig::MAX_WORKER_ID
            );
        }

        if let Command::Generate { tasks, .. } = args.command {
            if tasks == 0 {
                bail!("--tasks must be greater than 0");
            }

            // Decoding is pure and accepts any epoch.
            let now = SystemClock.current_millis();
            if args.epoch_ms > now {
                bail!(
                    "FLAKEID_EPOCH_MS ({}) is in the future (now = {now})",
                    args.epoch_ms
                );
            }
        }

        let node = NodeConfig::with_epoch(
            args.datacenter_id,
            args.worker_id,
            Duration::from_millis(args.epoch_ms),
        )?;

        Ok(Self {
            node,
            clock: args.clock,
            max_wait: args.max_wait_ms.map(Duration::from_millis),
            format: args.format,
            command: args.command,
        })
    }
}
