//! Session engine: owns every room and connection and runs the global tick.
//!
//! All room mutation happens on the single engine task. Connection handlers
//! only talk to it through [`EngineHandle`], so commands and ticks are applied
//! one at a time, in arrival order, with no locking around room data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::util::time::{tick_duration, Timer, TICK_MILLIS};
use crate::ws::protocol::{ClientMsg, JoinRequest, ServerMsg};

use super::entity::PlayerId;
use super::registry::RoomRegistry;
use super::room::{ConnectionId, Room, RoomId};
use super::snapshot::SnapshotBuilder;

/// Queue depth between connection handlers and the engine
const COMMAND_QUEUE: usize = 1024;

/// Outbound frame queue for one connection
pub type Outbound = mpsc::Sender<String>;

/// Work items for the engine task
#[derive(Debug)]
pub enum EngineCommand {
    Connect { conn_id: ConnectionId, outbound: Outbound },
    Message { conn_id: ConnectionId, msg: ClientMsg },
    Disconnect { conn_id: ConnectionId },
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Session engine is not running")]
    Closed,
}

/// Counters published for the health endpoint
#[derive(Debug, Default)]
pub struct EngineStats {
    active_rooms: AtomicUsize,
    active_players: AtomicUsize,
}

/// Cheap, cloneable way in to the engine
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
    next_conn_id: Arc<AtomicU64>,
    stats: Arc<EngineStats>,
}

impl EngineHandle {
    /// Register a connection and return its id
    pub async fn connect(&self, outbound: Outbound) -> Result<ConnectionId, EngineError> {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.dispatch(EngineCommand::Connect { conn_id, outbound }).await?;
        Ok(conn_id)
    }

    pub async fn send(&self, conn_id: ConnectionId, msg: ClientMsg) -> Result<(), EngineError> {
        self.dispatch(EngineCommand::Message { conn_id, msg }).await
    }

    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), EngineError> {
        self.dispatch(EngineCommand::Disconnect { conn_id }).await
    }

    async fn dispatch(&self, cmd: EngineCommand) -> Result<(), EngineError> {
        self.tx.send(cmd).await.map_err(|_| EngineError::Closed)
    }

    pub fn active_rooms(&self) -> usize {
        self.stats.active_rooms.load(Ordering::Relaxed)
    }

    pub fn active_players(&self) -> usize {
        self.stats.active_players.load(Ordering::Relaxed)
    }
}

/// Per-connection lifecycle. There is no way back to `Unjoined`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionState {
    Unjoined,
    Joined { room_id: RoomId, player_id: PlayerId },
}

struct Connection {
    outbound: Outbound,
    state: ConnectionState,
}

pub struct SessionEngine {
    registry: RoomRegistry,
    connections: HashMap<ConnectionId, Connection>,
    commands: mpsc::Receiver<EngineCommand>,
    stats: Arc<EngineStats>,
}

impl SessionEngine {
    pub fn new() -> (Self, EngineHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let stats = Arc::new(EngineStats::default());

        let handle = EngineHandle {
            tx,
            next_conn_id: Arc::new(AtomicU64::new(1)),
            stats: stats.clone(),
        };

        let engine = Self {
            registry: RoomRegistry::new(),
            connections: HashMap::new(),
            commands,
            stats,
        };

        (engine, handle)
    }

    /// Run until every handle is dropped
    pub async fn run(mut self) {
        info!(tick_ms = TICK_MILLIS, "Session engine started");

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => self.tick_all(),
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
            }
        }

        info!("Session engine stopped");
    }

    pub fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Connect { conn_id, outbound } => {
                debug!(conn_id, "Connection registered");
                self.connections.insert(
                    conn_id,
                    Connection {
                        outbound,
                        state: ConnectionState::Unjoined,
                    },
                );
            }
            EngineCommand::Message { conn_id, msg } => self.handle_message(conn_id, msg),
            EngineCommand::Disconnect { conn_id } => self.handle_disconnect(conn_id),
        }
        self.publish_stats();
    }

    fn handle_message(&mut self, conn_id: ConnectionId, msg: ClientMsg) {
        let Some(conn) = self.connections.get_mut(&conn_id) else {
            debug!(conn_id, "Message for unknown connection dropped");
            return;
        };

        let (room_id, player_id) = match (conn.state.clone(), msg) {
            (
                ConnectionState::Unjoined,
                ClientMsg::Join {
                    room,
                    name,
                    class,
                    color,
                },
            ) => {
                let req = JoinRequest::resolve(room, name, class, color);
                let room = self.registry.get_or_create(&req.room);
                let player_id = room.join(conn_id, req.name, req.class, req.color);

                info!(
                    conn_id,
                    room_id = %req.room,
                    player_id = %player_id,
                    class = ?req.class,
                    player_count = room.players.len(),
                    "Player joined room"
                );

                send_now(
                    conn_id,
                    &conn.outbound,
                    &ServerMsg::You {
                        id: player_id,
                        room: req.room.clone(),
                    },
                );
                conn.state = ConnectionState::Joined {
                    room_id: req.room,
                    player_id,
                };
                return;
            }
            (ConnectionState::Joined { player_id, .. }, ClientMsg::Join { .. }) => {
                warn!(conn_id, player_id = %player_id, "Duplicate join ignored");
                return;
            }
            (ConnectionState::Unjoined, _) => {
                debug!(conn_id, "Message before join dropped");
                return;
            }
            (ConnectionState::Joined { room_id, player_id }, msg) => {
                let Some(room) = self.registry.get_mut(&room_id) else {
                    return;
                };
                apply_to_room(room, &player_id, msg);
                (room_id, player_id)
            }
        };

        debug!(conn_id, room_id = %room_id, player_id = %player_id, "Message applied");
    }

    fn handle_disconnect(&mut self, conn_id: ConnectionId) {
        let Some(conn) = self.connections.remove(&conn_id) else {
            return;
        };

        let ConnectionState::Joined { room_id, player_id } = conn.state else {
            debug!(conn_id, "Unjoined connection closed");
            return;
        };

        if let Some(room) = self.registry.get_mut(&room_id) {
            room.leave(conn_id, &player_id);
            info!(
                conn_id,
                room_id = %room_id,
                player_id = %player_id,
                player_count = room.players.len(),
                "Player left room"
            );
            if room.is_empty() {
                self.registry.remove(&room_id);
            }
        }
    }

    /// Advance every occupied room one step and broadcast its snapshot
    pub fn tick_all(&mut self) {
        let timer = Timer::new();

        for room in self.registry.rooms_mut() {
            if !room.tick() {
                continue;
            }
            broadcast(&self.connections, room);
        }

        let elapsed = timer.elapsed_ms();
        if elapsed > TICK_MILLIS {
            warn!(elapsed_ms = elapsed, rooms = self.registry.active_rooms(), "Tick overran its period");
        }
    }

    fn publish_stats(&self) {
        self.stats
            .active_rooms
            .store(self.registry.active_rooms(), Ordering::Relaxed);
        self.stats
            .active_players
            .store(self.registry.total_players(), Ordering::Relaxed);
    }
}

/// Input, shoot and reset for a joined connection
fn apply_to_room(room: &mut Room, player_id: &PlayerId, msg: ClientMsg) {
    match msg {
        ClientMsg::Input { ix, iy, aim_x, aim_y } => {
            let aim = aim_x.zip(aim_y);
            room.apply_input(player_id, ix, iy, aim);
        }
        ClientMsg::Shoot => {
            room.shoot(player_id);
        }
        ClientMsg::Reset => {
            room.reset();
            info!(room_id = %room.id, player_id = %player_id, "Room reset");
        }
        ClientMsg::Join { .. } => {}
    }
}

/// Push the room's snapshot to every bound connection. A connection whose
/// queue is full misses this frame; the next tick carries the full state.
fn broadcast(connections: &HashMap<ConnectionId, Connection>, room: &Room) {
    let frame = match SnapshotBuilder::encode(room) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(room_id = %room.id, error = %e, "Failed to encode snapshot");
            return;
        }
    };

    for conn_id in room.connections() {
        let Some(conn) = connections.get(conn_id) else {
            continue;
        };
        match conn.outbound.try_send(frame.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!(conn_id, room_id = %room.id, "Connection busy, snapshot skipped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn_id, room_id = %room.id, "Connection closed, snapshot dropped");
            }
        }
    }
}

/// Best-effort single message to one connection
fn send_now(conn_id: ConnectionId, outbound: &Outbound, msg: &ServerMsg) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            if outbound.try_send(json).is_err() {
                warn!(conn_id, "Failed to queue message for connection");
            }
        }
        Err(e) => warn!(conn_id, error = %e, "Failed to encode message"),
    }
}
