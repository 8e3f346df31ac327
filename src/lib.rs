#![crate_name = "synacor"]

#[macro_use]
extern crate lazy_static;

pub mod debugger;
pub mod disassembler;
pub mod driver;
pub mod instruction;
pub mod interpreter;
pub mod snapshot;
pub mod teleporter;
pub mod tracer;
pub mod vault;
pub mod vm;
