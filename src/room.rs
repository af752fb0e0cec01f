use rand::Rng;
use serde::Serialize;
use thiserror::Error;

pub type PlayerId = u8;

/// The room creator, always player 1.
pub const HOST_ID: PlayerId = 1;
/// Whoever joins an existing room, always player 2.
pub const GUEST_ID: PlayerId = 2;

/// Uppercase letters and digits without the look-alikes I, O, 0 and 1.
pub const ROOM_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const ROOM_CODE_LEN: usize = 6;

/// Query parameter carrying the room code in a shareable link.
pub const ROOM_QUERY_KEY: &str = "room";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("please enter your name")]
    EmptyName,
    #[error("please enter a room code")]
    EmptyRoomCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub is_host: bool,
    pub online: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, is_host: bool) -> Self {
        Self {
            id,
            name: name.into(),
            score: 0,
            is_host,
            online: true,
        }
    }
}

/// A room and its roster, as seen by this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    pub code: String,
    pub roster: Vec<Player>,
}

impl Room {
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.roster.iter().find(|p| p.id == id)
    }

    pub fn is_full(&self) -> bool {
        self.roster.len() >= 2
    }

    /// Add player 2. Returns false if the seat is already taken.
    pub fn add_guest(&mut self, name: impl Into<String>) -> bool {
        if self.player(GUEST_ID).is_some() {
            return false;
        }
        self.roster.push(Player::new(GUEST_ID, name, false));
        true
    }
}

/// Mock room directory.
///
/// There is no server behind this: creating a room only mints a code, and
/// joining fabricates a plausible host record instead of looking one up. No
/// existence check, capacity limit or expiry is applied.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    host_placeholder: String,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new("Host")
    }
}

impl RoomRegistry {
    pub fn new(host_placeholder: impl Into<String>) -> Self {
        Self {
            host_placeholder: host_placeholder.into(),
        }
    }

    pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
        (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect()
    }

    pub fn create<R: Rng + ?Sized>(
        &self,
        host_name: &str,
        rng: &mut R,
    ) -> Result<Room, RoomError> {
        let name = validate_name(host_name)?;
        let code = Self::generate_code(rng);
        log::debug!("created room {code} for {name}");

        Ok(Room {
            code,
            roster: vec![Player::new(HOST_ID, name, true)],
        })
    }

    pub fn join(&self, room_code: &str, joiner_name: &str) -> Result<Room, RoomError> {
        let name = validate_name(joiner_name)?;
        let code = normalize_code(room_code).ok_or(RoomError::EmptyRoomCode)?;
        log::debug!("{name} joining room {code}");

        Ok(Room {
            code,
            roster: vec![
                Player::new(HOST_ID, self.host_placeholder.clone(), true),
                Player::new(GUEST_ID, name, false),
            ],
        })
    }
}

fn validate_name(name: &str) -> Result<String, RoomError> {
    let name = name.trim();
    if name.is_empty() {
        Err(RoomError::EmptyName)
    } else {
        Ok(name.to_string())
    }
}

fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

/// `<base>?room=<CODE>`, appending to an existing query if there is one.
pub fn share_link(base_url: &str, room_code: &str) -> String {
    let sep = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{sep}{ROOM_QUERY_KEY}={room_code}")
}

/// Pull the room code out of a shared link. A bare code is accepted as is.
pub fn room_code_from_link(link: &str) -> Option<String> {
    let link = link.trim();
    let Some((_, query)) = link.split_once('?') else {
        if link.contains('/') || link.contains(':') {
            return None;
        }
        return normalize_code(link);
    };

    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == ROOM_QUERY_KEY)
        .and_then(|(_, value)| normalize_code(value))
}
