use std::io::{self, BufRead, Write};

/// Abstracts the handful of builtins that talk to the outside world
/// (`SYSTEM`, `CLEAR`, `INPUT_STR`, `INPUT_NUM`) so the interpreter
/// core stays testable without a real terminal. The CLI binds
/// [`TerminalHost`]; tests bind [`NullHost`].
pub trait Host {
    fn print(&mut self, text: &str);
    fn read_line(&mut self) -> io::Result<String>;
    fn clear_screen(&mut self);
    fn run_system_command(&mut self, command: &str) -> i32;
}

/// Talks to the process's real stdin/stdout and shells out via `sh -c`.
#[derive(Default)]
pub struct TerminalHost;

impl Host for TerminalHost {
    fn print(&mut self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }

    fn clear_screen(&mut self) {
        print!("\x1B[2J\x1B[H");
        let _ = io::stdout().flush();
    }

    fn run_system_command(&mut self, command: &str) -> i32 {
        std::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .map(|status| status.code().unwrap_or(-1))
            .unwrap_or(-1)
    }
}

/// A host that discards output and reads nothing, for interpreter tests.
#[derive(Default)]
pub struct NullHost {
    pub printed: Vec<String>,
}

impl Host for NullHost {
    fn print(&mut self, text: &str) {
        self.printed.push(text.to_string());
    }

    fn read_line(&mut self) -> io::Result<String> {
        Ok(String::new())
    }

    fn clear_screen(&mut self) {}

    fn run_system_command(&mut self, _command: &str) -> i32 {
        0
    }
}
