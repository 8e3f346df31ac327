use crate::debugger::{Debugger, PauseReason};
use crate::interpreter::Interpreter;
use crate::snapshot::{RestoreState, SaveState};
use crate::teleporter;
use crate::vault;
use crate::vm::VM;
use log::{debug, info};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Snapshot name used when `save`/`restore` are given no argument
const DEFAULT_SNAPSHOT_NAME: &str = "game";

lazy_static! {
    static ref HELP_TOPICS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert(
            "save",
            "save [name]\n  Write the complete machine state (memory, registers, stack,\n  ip, pending input) to <name>.sav. Default name: game.",
        );
        m.insert(
            "restore",
            "restore [name]\n  Replace the machine state with the snapshot in <name>.sav.\n  Default name: game.",
        );
        m.insert(
            "restart",
            "restart\n  Throw the current state away and reload the challenge binary.",
        );
        m.insert(
            "debug",
            "debug\n  Enter debug mode. Commands there: b/B (breakpoints), ip, rN,\n  <addr> (inspect or set), trace, stack, disassemble, go.",
        );
        m.insert(
            "solve",
            "solve teleporter|vault\n  teleporter: search for the confirmation value, set r7 and\n  patch the confirmation call so the teleporter works.\n  vault: print the walk through the vault antechamber grid.",
        );
        m.insert(
            "die",
            "die\n  Halt the machine and exit.",
        );
        m
    };
}

/// Line-oriented front end: pumps the machine, prints its output, and
/// routes each user line either to a meta-command or into the input
/// buffer.
pub struct Driver {
    pub debugger: Debugger,
}

impl Driver {
    pub fn new(vm: VM) -> Self {
        Driver {
            debugger: Debugger::new(Interpreter::new(vm)),
        }
    }

    /// Main loop; returns when the machine halts (including `die`)
    pub fn run(&mut self) -> Result<(), String> {
        let stdin = io::stdin();
        let mut console = stdin.lock();

        loop {
            match self.debugger.run_until_pause() {
                Ok((output, reason)) => {
                    print_output(&output);
                    match reason {
                        PauseReason::Halted => {
                            info!("machine halted");
                            return Ok(());
                        }
                        PauseReason::Breakpoint(addr) => {
                            println!("\nbreakpoint hit at {addr:04}");
                            self.debugger.debug_session(&mut console)?;
                        }
                        PauseReason::TraceLimit => {
                            println!("\nstack trace buffer is full; entering debug mode");
                            self.debugger.debug_session(&mut console)?;
                        }
                        PauseReason::NeedsInput => {
                            if !self.read_and_dispatch(&mut console)? {
                                return Ok(());
                            }
                        }
                    }
                }
                Err(e) => {
                    // the machine is left as it was; let the user poke at it
                    eprintln!("execution error: {e}");
                    if !self.read_and_dispatch(&mut console)? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Read one user line and act on it. Returns false on end of input.
    fn read_and_dispatch(&mut self, console: &mut dyn BufRead) -> Result<bool, String> {
        let mut line = String::new();
        let read = console
            .read_line(&mut line)
            .map_err(|e| format!("failed to read input: {e}"))?;
        if read == 0 {
            info!("end of input, leaving");
            return Ok(false);
        }
        self.dispatch(line.trim_end_matches(['\r', '\n']), console)?;
        Ok(true)
    }

    /// Route a line: a leading meta-command token is handled here, any
    /// other line goes to the machine with a trailing newline.
    pub fn dispatch(&mut self, line: &str, console: &mut dyn BufRead) -> Result<(), String> {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("help") => self.cmd_help(tokens.next()),
            Some("save") => self.cmd_save(tokens.next()),
            Some("restore") => self.cmd_restore(tokens.next()),
            Some("restart") => {
                self.debugger.interpreter.vm.reset();
                println!("machine restarted");
            }
            Some("debug") => self.debugger.debug_session(console)?,
            Some("solve") => match tokens.next() {
                Some("teleporter") => self.cmd_solve_teleporter(),
                Some("vault") => self.cmd_solve_vault(),
                _ => println!("usage: solve teleporter|vault"),
            },
            Some("die") => {
                debug!("halting on user request");
                self.debugger.interpreter.vm.halted = true;
            }
            _ => self.debugger.interpreter.vm.queue_line(line),
        }
        Ok(())
    }

    fn cmd_help(&self, topic: Option<&str>) {
        match topic {
            Some(topic) => match HELP_TOPICS.get(topic) {
                Some(text) => println!("{text}"),
                None => println!("no help for '{topic}'"),
            },
            None => {
                println!("meta-commands:");
                println!("  help [topic]    this text, or details on one command");
                println!("  save [name]     snapshot the machine to <name>.sav");
                println!("  restore [name]  load a snapshot");
                println!("  restart         reload the challenge binary");
                println!("  debug           enter the debugger");
                println!("  solve teleporter|vault");
                println!("  die             halt and exit");
                println!("anything else is sent to the running program");
            }
        }
    }

    fn cmd_save(&self, name: Option<&str>) {
        let filename = snapshot_filename(name);
        match SaveState::from_vm(&self.debugger.interpreter.vm).write_to_file(Path::new(&filename))
        {
            Ok(()) => println!("saved to {filename}"),
            Err(e) => println!("save failed: {e}"),
        }
    }

    fn cmd_restore(&mut self, name: Option<&str>) {
        let filename = snapshot_filename(name);
        let result = RestoreState::from_file(Path::new(&filename))
            .and_then(|snapshot| snapshot.restore_to_vm(&mut self.debugger.interpreter.vm));
        match result {
            Ok(()) => println!("restored from {filename}"),
            Err(e) => println!("restore failed: {e}"),
        }
    }

    fn cmd_solve_teleporter(&mut self) {
        println!("searching for the confirmation value, this takes a moment...");
        match teleporter::solve(&mut self.debugger.interpreter.vm) {
            Ok(k) => {
                println!("confirmation value is {k}; r7 set and the check bypassed");
                println!("use the teleporter again");
            }
            Err(e) => println!("teleporter solver failed: {e}"),
        }
    }

    fn cmd_solve_vault(&self) {
        match vault::find_shortest_path() {
            Ok(path) => {
                println!("vault walk, {} moves:", path.len());
                for direction in path {
                    println!("  {direction}");
                }
            }
            Err(e) => println!("vault solver failed: {e}"),
        }
    }
}

fn snapshot_filename(name: Option<&str>) -> String {
    format!("{}.sav", name.unwrap_or(DEFAULT_SNAPSHOT_NAME))
}

/// Print machine output as ASCII. Values outside printable/whitespace
/// ASCII render as replacement characters rather than aborting anything.
fn print_output(values: &[u16]) {
    if values.is_empty() {
        return;
    }
    let text = render_output(values);
    print!("{text}");
    io::stdout().flush().ok();
}

fn render_output(values: &[u16]) -> String {
    values
        .iter()
        .map(|&v| match v {
            9 | 10 | 13 | 32..=126 => v as u8 as char,
            _ => '\u{FFFD}',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn create_test_driver(words: &[u16]) -> Driver {
        Driver::new(VM::from_words(words).unwrap())
    }

    #[test]
    fn test_unknown_lines_are_forwarded_with_newline() {
        let mut driver = create_test_driver(&[0]);
        let mut console = Cursor::new(Vec::new());
        driver.dispatch("take tablet", &mut console).unwrap();
        let queued: Vec<u8> = driver.debugger.interpreter.vm.input.iter().copied().collect();
        assert_eq!(queued, b"take tablet\n");
    }

    #[test]
    fn test_die_halts_the_machine() {
        let mut driver = create_test_driver(&[21, 21, 0]);
        let mut console = Cursor::new(Vec::new());
        driver.dispatch("die", &mut console).unwrap();
        assert!(driver.debugger.interpreter.vm.halted);
    }

    #[test]
    fn test_restart_reloads_the_image() {
        let mut driver = create_test_driver(&[21, 0]);
        driver.debugger.interpreter.vm.write_memory(0, 9);
        driver.debugger.interpreter.vm.ip = 55;
        let mut console = Cursor::new(Vec::new());
        driver.dispatch("restart", &mut console).unwrap();
        assert_eq!(driver.debugger.interpreter.vm.memory[0], 21);
        assert_eq!(driver.debugger.interpreter.vm.ip, 0);
    }

    #[test]
    fn test_output_rendering_tolerates_non_ascii() {
        assert_eq!(render_output(&[72, 105, 10]), "Hi\n");
        assert_eq!(render_output(&[7]), "\u{FFFD}");
        assert_eq!(render_output(&[300]), "\u{FFFD}");
    }

    #[test]
    fn test_snapshot_filenames() {
        assert_eq!(snapshot_filename(None), "game.sav");
        assert_eq!(snapshot_filename(Some("before-vault")), "before-vault.sav");
    }
}
