//! Turns typed lines into protocol requests.

use parques_shared::Request;
use std::io::{self, BufRead, Write};

/// One line typed at the client prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(Request),
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  join <name>          join the game
  start                start the game (2+ players)
  roll                 roll the dice
  move <piece> <steps> move a piece (pieces are 0-3)
  state                show the game state and pending updates
  chat <message>       send a chat message
  help                 show this help
  quit                 leave";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let request = match word.to_ascii_lowercase().as_str() {
        "" => return Err("type a command, or `help`".to_string()),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        "join" => Request::Join {
            name: rest.to_string(),
        },
        "start" => Request::StartGame,
        "roll" => Request::RollDice,
        "state" => Request::GetState,
        "chat" => Request::Chat {
            message: rest.to_string(),
        },
        "move" => {
            let mut args = rest.split_whitespace();
            let piece_id = args
                .next()
                .and_then(|arg| arg.parse::<u8>().ok())
                .ok_or("usage: move <piece> <steps>")?;
            let steps = args
                .next()
                .and_then(|arg| arg.parse::<u32>().ok())
                .ok_or("usage: move <piece> <steps>")?;
            Request::MovePiece { piece_id, steps }
        }
        other => return Err(format!("unknown command `{}`, try `help`", other)),
    };

    Ok(Command::Send(request))
}

/// Asks for a value, falling back to `default` on an empty answer.
pub fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: &str,
) -> io::Result<String> {
    write!(output, "{} [{}]: ", question, default)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim();
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer.to_string())
    }
}
