//! Cooperative stop.
//!
//! Drops the stop marker into the data directory of a running instance. The
//! acquisition stage notices it at the end of the current segment and the
//! pipeline winds down.
//!
//! Usage: `stop [DATA_DIR]`
#[path = "../module/define.rs"]
#[allow(dead_code)]
mod define;

use std::path::{Path, PathBuf};

fn data_dir() -> PathBuf {
    match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => match Path::new(define::path::PERSISTENT_DIR).is_dir() {
            true => Path::new(define::path::PERSISTENT_DIR).join(define::system::NAME),
            false => Path::new(define::path::EPHEMERAL_DIR).join(define::system::NAME),
        },
    }
}

fn main() {
    let marker = data_dir().join(define::path::STOP_FILE);
    match std::fs::write(&marker, b"") {
        Ok(()) => println!("Stop requested via {}", marker.display()),
        Err(e) => {
            eprintln!("Can't write {}: {}", marker.display(), e);
            std::process::exit(1);
        }
    }
}
