use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::config::ServerConfig;
use crate::game_session::ServerGameRegistry;
use crate::rate_limit::IpRateLimiter;
use crate::room_manager::RoomManager;

pub type SharedRoomManager = Arc<RwLock<RoomManager>>;

#[derive(Clone)]
pub struct AppState {
    pub rooms: SharedRoomManager,
    pub game_registry: Arc<ServerGameRegistry>,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
    pub ws_per_ip: Arc<Mutex<HashMap<IpAddr, usize>>>,
    pub api_limiter: Arc<IpRateLimiter>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let game_registry = Arc::new(ServerGameRegistry::new());
        let rooms = RoomManager::new(
            Arc::clone(&game_registry),
            Duration::from_secs(config.rooms.session_ttl_secs),
        );
        let api_limiter = IpRateLimiter::new(
            config.limits.api_rate_limit_burst as f64,
            config.limits.api_rate_limit_per_sec,
        );
        Self {
            rooms: Arc::new(RwLock::new(rooms)),
            game_registry,
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            ws_per_ip: Arc::new(Mutex::new(HashMap::new())),
            api_limiter: Arc::new(api_limiter),
        }
    }
}

/// Counts one open WebSocket for as long as it lives.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Holds one of an IP's WebSocket slots. Released on drop.
pub struct IpConnectionGuard {
    ip: IpAddr,
    per_ip: Arc<Mutex<HashMap<IpAddr, usize>>>,
}

impl IpConnectionGuard {
    /// Take a slot for `ip`, or `None` if it already has `max` connections.
    pub async fn try_acquire(
        ip: IpAddr,
        per_ip: Arc<Mutex<HashMap<IpAddr, usize>>>,
        max: usize,
    ) -> Option<Self> {
        {
            let mut map = per_ip.lock().await;
            let count = map.entry(ip).or_insert(0);
            if *count >= max {
                return None;
            }
            *count += 1;
        }
        Some(Self { ip, per_ip })
    }
}

impl Drop for IpConnectionGuard {
    fn drop(&mut self) {
        let ip = self.ip;
        let per_ip = Arc::clone(&self.per_ip);
        // Drop can't await; release synchronously when uncontended.
        if let Ok(mut map) = per_ip.try_lock() {
            release(&mut map, ip);
        } else if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                release(&mut *per_ip.lock().await, ip);
            });
        }
    }
}

fn release(map: &mut HashMap<IpAddr, usize>, ip: IpAddr) {
    if let Some(count) = map.get_mut(&ip) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            map.remove(&ip);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_guard_counts() {
        let count = Arc::new(AtomicUsize::new(0));
        let a = ConnectionGuard::new(Arc::clone(&count));
        let b = ConnectionGuard::new(Arc::clone(&count));
        assert_eq!(count.load(Ordering::Relaxed), 2);
        drop(a);
        drop(b);
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn ip_guard_enforces_limit_and_releases() {
        let per_ip = Arc::new(Mutex::new(HashMap::new()));
        let ip: IpAddr = "10.0.0.7".parse().unwrap();
        let first = IpConnectionGuard::try_acquire(ip, Arc::clone(&per_ip), 2).await;
        let second = IpConnectionGuard::try_acquire(ip, Arc::clone(&per_ip), 2).await;
        assert!(first.is_some() && second.is_some());
        assert!(
            IpConnectionGuard::try_acquire(ip, Arc::clone(&per_ip), 2)
                .await
                .is_none()
        );

        let other: IpAddr = "10.0.0.8".parse().unwrap();
        assert!(
            IpConnectionGuard::try_acquire(other, Arc::clone(&per_ip), 2)
                .await
                .is_some()
        );

        drop(first);
        drop(second);
        assert!(!per_ip.lock().await.contains_key(&ip));
    }

    #[test]
    fn new_state_registers_games() {
        let mut config = ServerConfig::default();
        config.rooms.session_ttl_secs = 5;
        let state = AppState::new(config);
        assert_eq!(state.game_registry.available_games(), 1);
        assert_eq!(state.ws_connection_count.load(Ordering::Relaxed), 0);
    }
}
