//! Terminal front panel: screen rendering and operator commands from stdin.

use doorlock_core::Screen;
use std::io::BufRead;
use std::sync::mpsc::Sender;

/// Operator input, the equivalent of the panel's buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Start,
    Quit,
}

impl OperatorCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "s" | "start" => Some(Self::Start),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Where screens are rendered.
pub trait Panel {
    fn show(&mut self, screen: &Screen);
}

/// Prints each screen change to stdout.
pub struct ConsolePanel;

impl Panel for ConsolePanel {
    fn show(&mut self, screen: &Screen) {
        tracing::debug!(?screen, "screen change");
        println!("==> {screen}");
        if matches!(screen, Screen::Start { .. }) {
            println!("    [Enter] start   [q] quit");
        }
    }
}

/// Forward stdin commands to the control loop from a helper thread.
///
/// The thread ends on EOF; the control loop keeps running without an operator.
pub fn spawn_operator_input(tx: Sender<OperatorCommand>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("doorlock-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match OperatorCommand::parse(&line) {
                    Some(cmd) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    None => eprintln!("unknown command: {}", line.trim()),
                }
            }
            tracing::debug!("operator input closed");
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operator_commands() {
        assert_eq!(OperatorCommand::parse(""), Some(OperatorCommand::Start));
        assert_eq!(OperatorCommand::parse(" Start\n"), Some(OperatorCommand::Start));
        assert_eq!(OperatorCommand::parse("q"), Some(OperatorCommand::Quit));
        assert_eq!(OperatorCommand::parse("EXIT"), Some(OperatorCommand::Quit));
        assert_eq!(OperatorCommand::parse("open sesame"), None);
    }
}
