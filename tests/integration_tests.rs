//! End-to-end tests over the loopback switchboard: several connection
//! managers, a hosted room and real message traffic.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tokio::sync::mpsc;

use session::{
    ConnectionManager, GuestRoom, HostRoom, PlayerProfile, RoomEvent, SessionError,
    SessionHandlers, Switchboard,
};
use shared::envelope::{Message, MessageType};
use shared::game::Outcome;
use shared::room::{RoomConfig, RoomStatus};

fn manager(board: &Switchboard) -> Arc<ConnectionManager> {
    ConnectionManager::with_timings(
        board.clone(),
        Duration::from_millis(100),
        Duration::from_millis(5),
    )
}

fn profile(od_id: &str, nickname: &str) -> PlayerProfile {
    PlayerProfile {
        od_id: od_id.into(),
        nickname: nickname.into(),
        avatar: "cat".into(),
    }
}

fn config(game_slug: &str, max_players: usize) -> RoomConfig {
    RoomConfig {
        max_players,
        min_players: 2,
        is_private: false,
        game_slug: game_slug.into(),
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<RoomEvent>) -> RoomEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for a room event")
        .expect("event channel closed")
}

/// Skip events until the predicate matches one.
async fn wait_for<F, T>(rx: &mut mpsc::UnboundedReceiver<RoomEvent>, mut pick: F) -> T
where
    F: FnMut(RoomEvent) -> Option<T>,
{
    loop {
        if let Some(found) = pick(next_event(rx).await) {
            return found;
        }
    }
}

async fn host_with_room(
    board: &Switchboard,
    room_config: RoomConfig,
) -> (
    Arc<ConnectionManager>,
    HostRoom,
    mpsc::UnboundedReceiver<RoomEvent>,
) {
    let host_manager = manager(board);
    host_manager
        .initialize(SessionHandlers::default())
        .await
        .unwrap();
    let (host, events) =
        HostRoom::create(Arc::clone(&host_manager), profile("od-host", "Host"), room_config)
            .unwrap();
    (host_manager, host, events)
}

async fn join_guest(
    board: &Switchboard,
    host_peer_id: &str,
    guest_profile: PlayerProfile,
) -> (
    Arc<ConnectionManager>,
    GuestRoom,
    mpsc::UnboundedReceiver<RoomEvent>,
) {
    let guest_manager = manager(board);
    guest_manager
        .initialize(SessionHandlers::default())
        .await
        .unwrap();
    let (guest, events) = GuestRoom::join(Arc::clone(&guest_manager), guest_profile, host_peer_id)
        .await
        .unwrap();
    (guest_manager, guest, events)
}

#[tokio::test]
async fn broadcast_reaches_everyone_except_the_excluded_peer() {
    let board = Switchboard::new();
    let hub = manager(&board);
    hub.initialize(SessionHandlers::default()).await.unwrap();

    let mut spokes = Vec::new();
    for _ in 0..4 {
        let spoke = manager(&board);
        let id = spoke.initialize(SessionHandlers::default()).await.unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        spoke.on_message(MessageType::Chat, move |env| {
            let _ = tx.send(env.sender_id.clone());
        });
        hub.connect_to_peer(&id).await.unwrap();
        spokes.push((id, rx));
    }

    let excluded = spokes[1].0.clone();
    hub.broadcast(
        Message::Chat {
            nickname: "hub".into(),
            text: "hello all".into(),
        },
        Some(&excluded),
    );

    for (i, (id, rx)) in spokes.iter_mut().enumerate() {
        if *id == excluded {
            continue;
        }
        let sender = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap_or_else(|_| panic!("spoke {i} missed the broadcast"))
            .unwrap();
        assert_eq!(sender, hub.session_id().unwrap());
    }
    // The excluded spoke hears nothing.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(spokes[1].1.try_recv().is_err());
}

#[tokio::test]
async fn join_seats_guests_until_the_room_is_full() {
    let board = Switchboard::new();
    let (host_manager, host, _host_events) = host_with_room(&board, config("tictactoe", 2)).await;
    let host_id = host_manager.session_id().unwrap();

    let (_m1, _guest_a, mut events_a) = join_guest(&board, &host_id, profile("od-a", "Ann")).await;
    let room = wait_for(&mut events_a, |e| match e {
        RoomEvent::Joined { room } => Some(room),
        _ => None,
    })
    .await;
    assert_eq!(room.players.len(), 2);

    let (_m2, _guest_b, mut events_b) = join_guest(&board, &host_id, profile("od-b", "Ben")).await;
    let reason = wait_for(&mut events_b, |e| match e {
        RoomEvent::Rejected { reason } => Some(reason),
        _ => None,
    })
    .await;
    assert_eq!(reason, "room is full");

    let canonical = host.room();
    assert_eq!(canonical.players.len(), 2);
    assert!(canonical.check_invariants().is_ok());
}

#[tokio::test]
async fn ready_start_and_play_to_a_win() {
    let board = Switchboard::new();
    let (host_manager, host, mut host_events) =
        host_with_room(&board, config("tictactoe", 2)).await;
    let host_id = host_manager.session_id().unwrap();

    let (_m, guest, mut guest_events) = join_guest(&board, &host_id, profile("od-a", "Ann")).await;
    wait_for(&mut guest_events, |e| match e {
        RoomEvent::Joined { .. } => Some(()),
        _ => None,
    })
    .await;

    assert!(host.start_game().is_err(), "guest is not ready yet");
    assert!(guest.set_ready(true));
    wait_for(&mut host_events, |e| match e {
        RoomEvent::RoomUpdated { room } if room.can_start() => Some(()),
        _ => None,
    })
    .await;

    host.start_game().unwrap();
    wait_for(&mut guest_events, |e| match e {
        RoomEvent::GameStarted { .. } => Some(()),
        _ => None,
    })
    .await;

    // X (host, seat 0) takes the top row while O answers below.
    for (actor, cell) in [(0usize, 0usize), (1, 3), (0, 1), (1, 4), (0, 2)] {
        if actor == 0 {
            host.submit_action(json!(cell));
        } else {
            assert!(guest.submit_action(json!(cell)));
        }
        wait_for(&mut guest_events, |e| match e {
            RoomEvent::StateChanged { .. } => Some(()),
            _ => None,
        })
        .await;
    }

    let outcome = wait_for(&mut guest_events, |e| match e {
        RoomEvent::GameFinished { outcome } => Some(outcome),
        _ => None,
    })
    .await;
    assert_eq!(outcome, Outcome::Win { seat: 0 });
    assert_eq!(host.room().status, RoomStatus::Finished);
}

#[tokio::test]
async fn out_of_turn_and_illegal_actions_are_dropped() {
    let board = Switchboard::new();
    let (host_manager, host, mut host_events) =
        host_with_room(&board, config("tictactoe", 2)).await;
    let host_id = host_manager.session_id().unwrap();

    let (_m, guest, mut guest_events) = join_guest(&board, &host_id, profile("od-a", "Ann")).await;
    guest.set_ready(true);
    wait_for(&mut host_events, |e| match e {
        RoomEvent::RoomUpdated { room } if room.can_start() => Some(()),
        _ => None,
    })
    .await;
    host.start_game().unwrap();
    wait_for(&mut guest_events, |e| match e {
        RoomEvent::GameStarted { .. } => Some(()),
        _ => None,
    })
    .await;

    // Seat 1 tries to move on seat 0's turn; the host must ignore it.
    guest.submit_action(json!(4));
    tokio::time::sleep(Duration::from_millis(50)).await;
    let state = host.game_state().unwrap();
    assert_eq!(state["moveCount"], 0);

    // An out-of-range cell from the host is equally ignored.
    host.submit_action(json!(99));
    assert_eq!(host.game_state().unwrap()["moveCount"], 0);

    host.submit_action(json!(4));
    assert_eq!(host.game_state().unwrap()["moveCount"], 1);
}

#[tokio::test]
async fn rejoin_with_the_same_od_id_keeps_exactly_one_seat() {
    let board = Switchboard::new();
    let (host_manager, host, mut host_events) =
        host_with_room(&board, config("tictactoe", 4)).await;
    let host_id = host_manager.session_id().unwrap();

    let (guest_manager, _guest, mut guest_events) =
        join_guest(&board, &host_id, profile("od-a", "Ann")).await;
    wait_for(&mut guest_events, |e| match e {
        RoomEvent::Joined { .. } => Some(()),
        _ => None,
    })
    .await;
    let first_peer = guest_manager.session_id().unwrap();

    // Drop the channel without giving up the seat.
    guest_manager.disconnect_peer(&host_id);
    wait_for(&mut host_events, |e| match e {
        RoomEvent::RoomUpdated { room }
            if room.player("od-a").is_some_and(|p| !p.is_connected) =>
        {
            Some(())
        }
        _ => None,
    })
    .await;

    // Same durable identity, fresh session.
    let (rejoin_manager, _guest2, mut rejoin_events) =
        join_guest(&board, &host_id, profile("od-a", "Ann")).await;
    wait_for(&mut rejoin_events, |e| match e {
        RoomEvent::Joined { .. } => Some(()),
        _ => None,
    })
    .await;

    let room = host.room();
    let seats: Vec<_> = room.players.iter().filter(|p| p.od_id == "od-a").collect();
    assert_eq!(seats.len(), 1);
    assert!(seats[0].is_connected);
    assert_eq!(seats[0].peer_id, rejoin_manager.session_id().unwrap());
    assert_ne!(seats[0].peer_id, first_peer);
    assert!(room.check_invariants().is_ok());
}

#[tokio::test]
async fn kicked_guests_are_told_and_lose_their_seat() {
    let board = Switchboard::new();
    let (host_manager, host, _host_events) = host_with_room(&board, config("tictactoe", 4)).await;
    let host_id = host_manager.session_id().unwrap();

    let (_m, _guest, mut guest_events) = join_guest(&board, &host_id, profile("od-a", "Ann")).await;
    wait_for(&mut guest_events, |e| match e {
        RoomEvent::Joined { .. } => Some(()),
        _ => None,
    })
    .await;

    assert!(host.kick("od-a", "inactivity"));
    let reason = wait_for(&mut guest_events, |e| match e {
        RoomEvent::Kicked { reason } => Some(reason),
        _ => None,
    })
    .await;
    assert_eq!(reason, "inactivity");
    assert_eq!(host.room().players.len(), 1);

    // Kicking the host itself is refused.
    assert!(!host.kick("od-host", "no"));
}

#[tokio::test]
async fn forged_player_left_messages_do_not_evict_seats() {
    let board = Switchboard::new();
    let (host_manager, host, mut host_events) =
        host_with_room(&board, config("tictactoe", 4)).await;
    let host_id = host_manager.session_id().unwrap();

    let (_m, _ann, mut ann_events) = join_guest(&board, &host_id, profile("od-a", "Ann")).await;
    wait_for(&mut ann_events, |e| match e {
        RoomEvent::Joined { .. } => Some(()),
        _ => None,
    })
    .await;
    let (mallory_manager, _mallory, mut mallory_events) =
        join_guest(&board, &host_id, profile("od-m", "Mallory")).await;
    wait_for(&mut mallory_events, |e| match e {
        RoomEvent::Joined { .. } => Some(()),
        _ => None,
    })
    .await;

    // One guest names another guest's seat, then the host's own seat.
    // Neither message comes from the seat's session, so both are ignored.
    assert!(mallory_manager.send(
        &host_id,
        Message::PlayerLeft {
            od_id: "od-a".into(),
        },
    ));
    assert!(mallory_manager.send(
        &host_id,
        Message::PlayerLeft {
            od_id: "od-host".into(),
        },
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let room = host.room();
    assert_eq!(room.players.len(), 3);
    assert!(room.player("od-a").is_some());
    assert!(room.player("od-host").is_some_and(|p| p.is_host));
    assert!(room.check_invariants().is_ok());

    // A leave announced by the seat's own session still goes through.
    mallory_manager.send(
        &host_id,
        Message::PlayerLeft {
            od_id: "od-m".into(),
        },
    );
    wait_for(&mut host_events, |e| match e {
        RoomEvent::PlayerLeft { od_id } if od_id == "od-m" => Some(()),
        _ => None,
    })
    .await;
    assert_eq!(host.room().players.len(), 2);
}

#[tokio::test]
async fn ai_seat_plays_a_whole_game_against_the_host() {
    let board = Switchboard::new();
    let (_host_manager, host, mut host_events) =
        host_with_room(&board, config("tictactoe", 2)).await;

    host.add_ai_seat(shared::game::Difficulty::Hard).unwrap();
    host.start_game().unwrap();

    // Hard-vs-hard tic-tac-toe must end in a draw.
    let mut rng = StdRng::seed_from_u64(7);
    loop {
        if host.room().status == RoomStatus::Finished {
            break;
        }
        let state = host.game_state().unwrap();
        let Some(mv) = ai::engine::select_for_slug(
            "tictactoe",
            &state,
            0,
            shared::game::Difficulty::Hard,
            &mut rng,
        ) else {
            break;
        };
        host.submit_action(mv);
    }

    let outcome = wait_for(&mut host_events, |e| match e {
        RoomEvent::GameFinished { outcome } => Some(outcome),
        _ => None,
    })
    .await;
    assert_eq!(outcome, Outcome::Draw);
}

#[tokio::test]
async fn connecting_to_a_silent_peer_times_out() {
    let board = Switchboard::new();
    let caller = manager(&board);
    caller.initialize(SessionHandlers::default()).await.unwrap();
    let silent = manager(&board);
    let silent_id = silent.initialize(SessionHandlers::default()).await.unwrap();
    board.black_hole(&silent_id);

    let err = caller.connect_to_peer(&silent_id).await.unwrap_err();
    assert!(matches!(err, SessionError::ConnectionTimeout(_)));
    assert!(!caller.send(&silent_id, Message::Ping {}));
}
