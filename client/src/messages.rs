use std::str::FromStr;

/// User intents fed into the runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    /// Re-send `createRoom` / `joinRoom`.
    Join,
    /// Start the first hand, or the next one after settlement.
    StartGame,
    JoinTable,
    BuyHand,
    BuyHandStats,
    Act { kind: String, amount: Option<String> },
    HalfPot,
    FullPot,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    /// Parses one line of terminal input.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(head) = parts.first() else {
            return Err(String::new());
        };
        let cmd = match head.to_lowercase().as_str() {
            "connect" | "reconnect" => Command::Connect,
            "disconnect" => Command::Disconnect,
            "join" => Command::Join,
            "start" | "next" => Command::StartGame,
            "sit" => Command::JoinTable,
            "buy" => Command::BuyHand,
            "stats" => Command::BuyHandStats,
            "half" => Command::HalfPot,
            "pot" => Command::FullPot,
            "quit" | "exit" => Command::Quit,
            kind @ ("fold" | "check" | "call" | "raise") => Command::Act {
                kind: kind.to_string(),
                amount: parts.get(1).map(|a| a.to_string()),
            },
            _ => return Err(line.trim().to_string()),
        };
        Ok(cmd)
    }
}
