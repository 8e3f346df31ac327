use std::env;
use std::fs::File;
use std::io::prelude::*;
use std::path::PathBuf;
use std::process::exit;
use synacor::driver::Driver;
use synacor::vm::VM;

const DEFAULT_BINARY: &str = "challenge.bin";

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let path = PathBuf::from(args.get(1).map(String::as_str).unwrap_or(DEFAULT_BINARY));
    if !path.exists() {
        eprintln!("challenge binary not found: {path:?}");
        exit(1);
    }

    let mut bytes = Vec::new();
    match File::open(&path).and_then(|mut f| f.read_to_end(&mut bytes)) {
        Ok(_) => {}
        Err(e) => {
            eprintln!("failed to read {path:?}: {e}");
            exit(1);
        }
    }

    let vm = match VM::from_binary(&bytes) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("failed to load {path:?}: {e}");
            exit(1);
        }
    };

    println!("Synacor architecture host");
    println!("loaded {path:?} ({} words)", bytes.len() / 2);
    println!("type 'help' for the meta-commands\n");

    let mut driver = Driver::new(vm);
    if let Err(e) = driver.run() {
        eprintln!("fatal: {e}");
        exit(1);
    }
}
