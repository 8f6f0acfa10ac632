#[macro_use]
extern crate clap;

use clap::{Arg, ArgMatches};
use log::{debug, warn, LevelFilter};
use std::process::exit;
use xcheck::initializer::initialize;
use xcheck::subcommand::{show_block, show_indirect_block, show_inode};
use xcheck::{Checker, FsView, Layout, XcheckError};

fn layout_from(matches: &ArgMatches) -> Layout {
    let mut layout = Layout::default();
    if matches.is_present("blocks") {
        layout.total_blocks = value_t_or_exit!(matches, "blocks", u32);
    }
    if matches.is_present("inodes") {
        layout.inode_count = value_t_or_exit!(matches, "inodes", u32);
    }
    if matches.is_present("block_size") {
        layout.block_size = value_t_or_exit!(matches, "block_size", usize);
    }
    layout
}

fn init_logger(verbosity: u64) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    match verbosity {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn run(matches: &ArgMatches) -> Result<(), XcheckError> {
    let path = matches.value_of("img_file").unwrap_or_default();
    let img = initialize(path)?;
    let fs = FsView::open(&img, layout_from(matches))?;

    if matches.is_present("show_inode") {
        let inum = value_t_or_exit!(matches, "show_inode", u32);
        print!("{}", show_inode(&fs, inum)?);
    }
    if matches.is_present("show_block") {
        let block = value_t_or_exit!(matches, "show_block", u32);
        print!("{}", show_block(&fs, block)?);
    }
    if matches.is_present("show_indirect") {
        let block = value_t_or_exit!(matches, "show_indirect", u32);
        print!("{}", show_indirect_block(&fs, block)?);
    }

    Checker::new(fs)?.run()?;
    Ok(())
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("img_file")
                .help("path to file system image to check")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("blocks")
                .long("blocks")
                .takes_value(true)
                .help("total number of blocks in the image [default: 1000]"),
        )
        .arg(
            Arg::with_name("inodes")
                .long("inodes")
                .takes_value(true)
                .help("number of inode slots [default: 200]"),
        )
        .arg(
            Arg::with_name("block_size")
                .long("block-size")
                .takes_value(true)
                .help("block size in bytes [default: 512]"),
        )
        .arg(
            Arg::with_name("show_inode")
                .long("show-inode")
                .takes_value(true)
                .value_name("INUM")
                .help("print a decoded inode before checking"),
        )
        .arg(
            Arg::with_name("show_block")
                .long("show-block")
                .takes_value(true)
                .value_name("BLOCK")
                .help("print a raw block in binary before checking"),
        )
        .arg(
            Arg::with_name("show_indirect")
                .long("show-indirect")
                .takes_value(true)
                .value_name("BLOCK")
                .help("print a block as a list of block addresses before checking"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("log each rule (-v) and each directory entry (-vv)"),
        )
        .get_matches();
    init_logger(matches.occurrences_of("verbose"));

    match run(&matches) {
        Ok(()) => println!("done"),
        Err(XcheckError::Check(e)) => {
            if let Some(v) = e.violation() {
                debug!("rule {} failed at inode {:?}, block {:?}", v.rule(), v.inum(), v.block());
            }
            println!("{}", e);
            exit(1);
        }
        Err(e @ XcheckError::Io(_)) => {
            if let XcheckError::Io(source) = &e {
                warn!("{}", source);
            }
            println!("{}", e);
            exit(1);
        }
    }
}
