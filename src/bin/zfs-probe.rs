use clap::Parser;
use log::{debug, info};
use serde::Serialize;

use zfs_mos_reader::{open_path, BlockPointer, Compression, DnodePhys};

#[derive(Parser, Debug)]
#[command(version, about = "Print the label, uberblock, and root dnode summary of a ZFS vdev image", long_about = None)]
struct Args {
    /// Path to the pool image or raw device
    path: String,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the summary as JSON instead of plain text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    ashift: u64,
    uberblock_slots: usize,
    active_txg: u64,
    spa_version: u64,
    root_bp: BlockPointer,
    root_dnode: DnodePhys,
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> zfs_mos_reader::Result<()> {
    info!("opening {}", args.path);
    let mut fs = open_path(&args.path)?;

    let ashift = fs.ashift();
    let uberblock_slots = fs.uberblocks().len();

    let active = fs.active_uberblock();
    let active_txg = active.transaction_group;
    let spa_version = active.spa_version;
    let root_bp = active.root_bp;

    let dva = root_bp.root_dva()?;
    if dva.vdev_id != 0 {
        debug!("root dva names vdev {}, only vdev 0 is resolved", dva.vdev_id);
    }
    if root_bp.props.compression() != Compression::Off {
        debug!("root bp is compressed, decompressing before dnode decode");
    }

    let root_dnode = fs.read_dnode(&root_bp)?;

    if args.json {
        let summary = Summary {
            ashift,
            uberblock_slots,
            active_txg,
            spa_version,
            root_bp,
            root_dnode,
        };
        println!("{}", serde_json::to_string_pretty(&summary).expect("Summary is always serializable"));
        return Ok(());
    }

    println!("ashift: {ashift}");
    println!("uberblock slots: {uberblock_slots}");
    println!("active txg: {active_txg}");
    println!("spa version: {spa_version}");
    println!(
        "root bp: compression={} lsize={} psize={}",
        root_bp.props.compression().name(),
        root_bp.props.lsize_bytes(),
        root_bp.props.psize_bytes(),
    );
    println!("root dnode object_type: {}", root_dnode.object_type);

    Ok(())
}
