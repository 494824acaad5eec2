//! RowStore CLI
//!
//! Command-line tool for inspecting and exercising a store file.

use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use rowstore::format::row_rid;
use rowstore::{DataFile, Result};

/// Demo record layout: 4-byte record id prefix + 4-byte sequence + payload.
const DEMO_ROW_SIZE: u32 = 40;

/// RowStore CLI
#[derive(Parser, Debug)]
#[command(name = "rowstore-cli")]
#[command(about = "Inspect and exercise a RowStore data file")]
#[command(version)]
struct Args {
    /// Path to the store file
    #[arg(short, long, default_value = "./rowstore.db")]
    file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new store file
    Create {
        /// Maximum number of tables
        #[arg(short, long, default_value = "10")]
        tables: u32,
    },

    /// Insert, read back, and delete demo records, reporting timings
    Stress {
        /// Rounds of insert/fetch/delete
        #[arg(short, long, default_value = "10")]
        rounds: u32,

        /// Records per round
        #[arg(short, long, default_value = "100")]
        batch: u32,
    },

    /// Print every record id in a table
    Scan {
        /// Table name
        table: String,
    },

    /// Rewrite the file with all regions packed
    Compact,

    /// Print header fields and the table list
    Info,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rowstore=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("command failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let store = DataFile::new(&args.file);

    match args.command {
        Commands::Create { tables } => {
            store.create(tables)?;
            store.close()?;
            println!("created {} ({} table slots)", args.file, tables);
        }

        Commands::Stress { rounds, batch } => {
            store.open()?;
            let mut table = match store.table("stress") {
                Ok(table) => table,
                Err(_) => store.create_table_with_defaults("stress", DEMO_ROW_SIZE)?,
            };

            let row_size = DEMO_ROW_SIZE as usize;
            let mut rows = vec![0u8; row_size * batch as usize];
            let start = Instant::now();

            for round in 0..rounds {
                for (seq, chunk) in rows.chunks_exact_mut(row_size).enumerate() {
                    chunk[4..8].copy_from_slice(&(seq as u32).to_le_bytes());
                    chunk[8..].fill(round as u8);
                }
                table.insert(&mut rows)?;
                let victim = rows[..row_size].to_vec();

                table.move_first();
                let mut total = 0;
                loop {
                    let read = table.fetch(&mut rows)?;
                    if read == 0 {
                        break;
                    }
                    total += read;
                }

                table.delete(&victim)?;
                println!(
                    "round {}: {} records live, {} read back",
                    round + 1,
                    table.record_count()?,
                    total
                );
            }

            println!(
                "{} rounds of {} records in {:.2?}",
                rounds,
                batch,
                start.elapsed()
            );
            store.close()?;
        }

        Commands::Scan { table } => {
            store.open()?;
            let mut table = store.table(&table)?;
            let row_size = table.row_size()? as usize;
            let mut rows = vec![0u8; row_size * 64];

            table.move_first();
            loop {
                let read = table.fetch(&mut rows)?;
                if read == 0 {
                    break;
                }
                for chunk in rows[..read * row_size].chunks_exact(row_size) {
                    println!("{}", row_rid(chunk));
                }
            }
            store.close()?;
        }

        Commands::Compact => {
            let before = store.file_size()?;
            let start = Instant::now();
            store.compact()?;
            let after = store.file_size()?;
            println!(
                "compacted {} -> {} bytes in {:.2?}",
                before,
                after,
                start.elapsed()
            );
        }

        Commands::Info => {
            store.open()?;
            let header = store.header()?;
            println!("version    {}.{}", header.major_version, header.minor_version);
            println!("data start {}", header.data_start);
            println!("data end   {}", header.data_end);
            println!(
                "tables     {} of {} slots",
                header.tables.entries, header.tables.slots
            );
            for name in store.table_names()? {
                let table = store.table(&name)?;
                println!(
                    "  {:<32} id={} rows={} ({} slots, {} bytes each)",
                    name,
                    table.id(),
                    table.record_count()?,
                    table.slot_count()?,
                    table.row_size()?
                );
            }
            store.close()?;
        }
    }

    Ok(())
}
