//! Dump a reachability disassembly of a challenge binary to stdout.
//!
//! Usage: disasm <binary> [start-address]

use std::env;
use std::fs::File;
use std::io::prelude::*;
use std::process::exit;
use synacor::disassembler::Disassembler;
use synacor::vm::VM;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let Some(path) = args.get(1) else {
        eprintln!("usage: disasm <binary> [start-address]");
        exit(1);
    };
    let start: u16 = match args.get(2) {
        Some(token) => match token.parse() {
            Ok(addr) => addr,
            Err(_) => {
                eprintln!("'{token}' is not an address");
                exit(1);
            }
        },
        None => 0,
    };

    let mut bytes = Vec::new();
    if let Err(e) = File::open(path).and_then(|mut f| f.read_to_end(&mut bytes)) {
        eprintln!("failed to read {path}: {e}");
        exit(1);
    }
    let vm = match VM::from_binary(&bytes) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("failed to load {path}: {e}");
            exit(1);
        }
    };

    print!("{}", Disassembler::new(&vm.memory).disassemble_reachable(start));
}
