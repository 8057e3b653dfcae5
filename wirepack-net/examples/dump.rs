//! Replay a dump file and print the decoded chains.

use std::env;
use std::process;

use wirepack_capture::file::Handle;
use wirepack_capture::Source;

fn main() {
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: dump <file.pcap>");
        process::exit(1);
    };

    let mut source = match Handle::open(&path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("could not open {path}: {e}");
            process::exit(1);
        }
    };

    loop {
        match wirepack_net::recv(&mut source) {
            Ok(Some(pkt)) => println!("{pkt}"),
            Ok(None) => break,
            Err(e) => {
                eprintln!("could not decode: {e}");
                break;
            }
        }
    }

    source.close();
}
