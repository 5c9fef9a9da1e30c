//! Zero-effect checks for a live process or a listening endpoint.

use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use lotto_config::ListenEndpoint;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

const CONNECT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Sends the null signal to `pid`. `EPERM` means the process exists but
/// belongs to someone else, so it counts as alive.
pub(super) fn process_alive(pid: u32) -> Result<bool, Errno> {
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    if raw <= 0 {
        return Ok(false);
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(errno) => Err(errno),
    }
}

/// Returns the resolved address when something already accepts connections
/// on `endpoint`. Ephemeral-port endpoints never collide.
pub(super) fn endpoint_in_use(endpoint: &ListenEndpoint) -> Option<SocketAddr> {
    if endpoint.port == 0 {
        return None;
    }
    let addr = endpoint.resolve().ok()?;
    TcpStream::connect_timeout(&addr, CONNECT_PROBE_TIMEOUT)
        .ok()
        .map(|_| addr)
}
