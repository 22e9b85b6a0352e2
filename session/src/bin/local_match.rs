//! Run a complete match between two computer opponents over the loopback
//! switchboard, printing the result. Useful for eyeballing engine strength
//! and for exercising the whole session stack without a second client.

use std::sync::Arc;

use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use session::{ConnectionManager, HostRoom, PlayerProfile, RoomEvent, SessionHandlers, Switchboard};
use shared::game::{Difficulty, Outcome};
use shared::room::{RoomConfig, RoomStatus};

#[derive(Parser, Debug)]
#[command(author, version, about = "Local AI-vs-AI match")]
struct Args {
    /// Game to play: tictactoe, connect-four, gomoku or rps
    #[arg(long, default_value = "tictactoe")]
    game: String,

    /// Engine playing the host seat
    #[arg(long, default_value = "hard")]
    host_difficulty: Difficulty,

    /// Engine playing the guest seat
    #[arg(long, default_value = "medium")]
    guest_difficulty: Difficulty,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let switchboard = Switchboard::new();
    let manager = ConnectionManager::new(switchboard);
    manager.initialize(SessionHandlers::default()).await?;

    let profile = PlayerProfile {
        od_id: "local-host".into(),
        nickname: "Host".into(),
        avatar: "cat".into(),
    };
    let config = RoomConfig {
        max_players: 2,
        min_players: 2,
        is_private: false,
        game_slug: args.game.clone(),
    };
    let (host, mut events) = HostRoom::create(Arc::clone(&manager), profile, config)?;
    host.add_ai_seat(args.guest_difficulty)
        .map_err(|e| format!("cannot seat opponent: {e}"))?;
    host.start_game().map_err(|e| format!("cannot start: {e}"))?;

    // The host seat is not AI-driven by the coordinator, so feed it from
    // the chosen engine until the game ends.
    let mut rng = StdRng::from_entropy();
    let mut moves = 0u32;
    loop {
        if host.room().status == RoomStatus::Finished {
            break;
        }
        let Some(state) = host.game_state() else {
            break;
        };
        let Some(mv) =
            ai::engine::select_for_slug(&args.game, &state, 0, args.host_difficulty, &mut rng)
        else {
            break;
        };
        host.submit_action(mv);
        moves += 1;
        if moves > 500 {
            return Err("match did not terminate".into());
        }
    }

    let mut outcome = None;
    while let Ok(event) = events.try_recv() {
        match event {
            RoomEvent::StateChanged { .. } => info!("state advanced"),
            RoomEvent::GameFinished { outcome: result } => outcome = Some(result),
            _ => {}
        }
    }

    let room = host.room();
    match outcome {
        Some(Outcome::Win { seat }) => {
            let name = room
                .players
                .get(seat)
                .map(|p| p.nickname.as_str())
                .unwrap_or("unknown");
            println!("{} wins {} as seat {seat}", name, args.game);
        }
        Some(Outcome::Draw) => println!("{} ends in a draw", args.game),
        None => println!("{} did not finish", args.game),
    }
    Ok(())
}
