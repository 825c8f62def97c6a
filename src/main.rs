use anyhow::Context;
use clap::{Parser, Subcommand};
use holdem_sync::{
    Client, ClientConfig, ClientSyncEngine, Command, HandDisplay, Notice, NoticeLevel, Observer,
    Panel, TurnTimerState, Urgency,
};
use holdem_sync_protocol::Card;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "holdem-sync")]
#[command(about = "Terminal client for a Texas Hold'em table server")]
struct Cli {
    /// WebSocket endpoint of the table server
    #[arg(long, env = "HOLDEM_URL", default_value = holdem_sync::config::DEFAULT_URL)]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new room and sit at it
    Create {
        /// Display name at the table
        #[arg(short, long, env = "HOLDEM_NAME")]
        name: String,
    },
    /// Join an existing room
    Join {
        /// Room id to join
        #[arg(short, long, env = "HOLDEM_ROOM")]
        room: String,
        /// Display name at the table
        #[arg(short, long, env = "HOLDEM_NAME")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("holdem_sync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match cli.command {
        Commands::Create { name } => ClientConfig::new(cli.url, name),
        Commands::Join { room, name } => ClientConfig::new(cli.url, name).with_room(room),
    };
    tracing::info!(url = %config.url, room = ?config.room_id, "starting client");
    let client = Client::new(config).context("invalid client configuration")?;

    println!("🎮 Hold'em Sync Client");
    println!("=====================");
    print_help();

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(read_commands(tx));

    let mut view = TerminalView::default();
    client.run(rx, &mut view).await;

    println!("👋 Goodbye!");
    Ok(())
}

async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(cmd) => {
                let quit = cmd == Command::Quit;
                if tx.send(cmd).await.is_err() || quit {
                    return;
                }
            }
            Err(unknown) => println!("❓ Unknown command: {}", unknown),
        }
    }
    let _ = tx.send(Command::Quit).await;
}

fn print_help() {
    println!("\n📋 Commands available:");
    println!("  start        - Start a hand (or the next one after showdown)");
    println!("  sit          - Take a seat at the table");
    println!("  fold | check | call");
    println!("  raise <n>    - Raise by n chips (minimum 5)");
    println!("  half | pot   - Raise half the pot / the full pot");
    println!("  buy          - Buy a hand");
    println!("  stats        - Show buy-hand statistics");
    println!("  join         - Re-send the join request");
    println!("  connect      - Reconnect after a lost connection");
    println!("  disconnect   - Close the connection");
    println!("  quit         - Exit");
    println!("\nType commands and press Enter:");
}

#[derive(Default)]
struct TerminalView {
    last_panel: Option<Panel>,
}

impl Observer for TerminalView {
    fn on_state(&mut self, engine: &ClientSyncEngine) {
        print_game_state(engine);
        let panel = engine.panel();
        if self.last_panel != Some(panel) || panel == Panel::Actions {
            print_panel(engine, panel);
            self.last_panel = Some(panel);
        }
    }

    fn on_notice(&mut self, notice: &Notice) {
        let icon = match notice.level {
            NoticeLevel::Info => "ℹ️ ",
            NoticeLevel::Warning => "⚠️ ",
            NoticeLevel::Error => "❌",
        };
        println!("{} {}", icon, notice.text);
    }

    fn on_tick(&mut self, state: TurnTimerState, urgency: Urgency) {
        match urgency {
            Urgency::Warning => println!("⏰ {}s left!", state.remaining),
            Urgency::Urgent if state.remaining % 5 == 0 => println!("⏳ {}s left", state.remaining),
            _ => {}
        }
    }
}

fn cards(cards: &[Card]) -> String {
    if cards.is_empty() {
        return "-".to_string();
    }
    cards.iter().map(Card::to_string).collect::<Vec<_>>().join(" ")
}

fn print_game_state(engine: &ClientSyncEngine) {
    let Some(room) = engine.store().room() else {
        return;
    };
    println!("\n🎲 === GAME STATE ===");
    println!("🏠 Room: {}", room.id);
    println!("🕹️  Phase: {}", room.phase);
    println!("🃏 Board: {}", cards(engine.store().community_cards()));
    println!("💰 Pot: {} chips", room.pot);
    if room.current_bet > 0 {
        println!("💵 Current bet: {} chips", room.current_bet);
    }

    let seats = engine.seats();
    println!("👥 Players ({}):", seats.len());
    for (i, seat) in seats.iter().enumerate() {
        let p = &seat.participant;
        let status = if p.folded {
            " [FOLDED]"
        } else if p.all_in {
            " [ALL IN]"
        } else {
            ""
        };
        let to_act = if seat.is_turn { " 👈 TO ACT" } else { "" };
        let dealer = if seat.is_dealer_seat { " 🎩 DEALER" } else { "" };
        let winner = if seat.is_winner { " 🏆" } else { "" };
        let you = if engine.session().is_self(p) { " (you)" } else { "" };
        let hand = match &seat.hand {
            HandDisplay::Hidden => String::new(),
            HandDisplay::FaceDown => " 🂠🂠".to_string(),
            HandDisplay::Revealed(c) => format!(" {}", cards(c)),
        };
        println!(
            "  {}: {}{} ({} chips, bet {}){}{}{}{}{}",
            i, p.name, you, p.chips, p.bet, hand, status, to_act, dealer, winner
        );
    }
    if !room.waiting_players.is_empty() {
        let names: Vec<_> = room.waiting_players.iter().map(|p| p.name.as_str()).collect();
        println!("⏳ Waiting: {}", names.join(", "));
    }
    if !room.spectators.is_empty() {
        let names: Vec<_> = room.spectators.iter().map(|p| p.name.as_str()).collect();
        println!("👁️  Watching: {}", names.join(", "));
    }
    if let Some(stats) = engine.store().buy_hand_stats() {
        println!("📈 Buy-hand stats:");
        for (name, count) in stats {
            println!("    {name}: {count}");
        }
    }
    println!("==================\n");
}

fn print_panel(engine: &ClientSyncEngine, panel: Panel) {
    match panel {
        Panel::Lobby => println!("🔗 Waiting for the room..."),
        Panel::Settlement => {
            if let Some(record) = engine.store().settlement() {
                let names: Vec<String> = if record.winners.is_empty() {
                    record.winner.iter().map(|w| w.display_name()).collect()
                } else {
                    record.winners.iter().map(|w| w.display_name()).collect()
                };
                let label = if record.is_tie { "Split pot" } else { "Winner" };
                println!("🎭 SHOWDOWN! {}: {}", label, names.join(", "));
                if let Some(hand) = &record.winning_hand {
                    println!("   with {hand}");
                }
            }
            println!("   type `start` for the next hand");
        }
        Panel::Spectating => println!("👁️  You are spectating. Type `sit` to take a seat."),
        Panel::Waiting => println!("⏳ A hand is in progress, you will be dealt in next hand."),
        Panel::Actions => {
            let raises = engine.raise_suggestions();
            let chips = engine.displayed_chips().unwrap_or_default();
            println!(
                "🎯 Your turn! To call: {} | raise min {} / half {} / pot {} | chips {}",
                engine.call_amount(),
                raises.min,
                raises.half_pot,
                raises.full_pot,
                chips
            );
        }
        Panel::AwaitingTurn => println!("🕐 Waiting for other players..."),
        Panel::Unseated => println!("❔ You are not listed at this table."),
    }
}
