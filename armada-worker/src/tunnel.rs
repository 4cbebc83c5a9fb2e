use monoio::io::{AsyncReadRent, AsyncWriteRent, AsyncWriteRentExt, Splitable};
use monoio::net::TcpStream;
use std::net::SocketAddr;
use std::time::Duration;

/// Resolve an `addr` string (e.g. `"gw.example.net:6502"`) to a list of
/// `SocketAddr`s.
///
/// We resolve explicitly via std's blocking `ToSocketAddrs` before passing
/// to monoio's `TcpStream::connect`.  Monoio's internal hostname-resolution
/// path can behave differently on macOS (e.g. under FusionDriver) when the
/// kernel AIO interface does not support `getaddrinfo`.  The blocking call
/// only runs once per dialed upstream/destination, before the tunnel's
/// steady state.
///
/// Returns candidates sorted IPv4-first, because `localhost`-style names
/// resolve to both `::1` and `127.0.0.1` and `.next()` often returns the
/// IPv6 one first, while most upstreams listen on IPv4-only.
fn resolve_addrs(addr: &str) -> Vec<SocketAddr> {
    // Fast path: already an IP:port literal
    if let Ok(sa) = addr.parse::<SocketAddr>() {
        return vec![sa];
    }
    // Slow path: DNS/hosts lookup (blocking — intentional, see above)
    use std::net::ToSocketAddrs;
    let all: Vec<SocketAddr> = match addr.to_socket_addrs() {
        Ok(iter) => iter.collect(),
        Err(_) => return vec![],
    };
    // Sort: IPv4 addresses before IPv6
    let mut v4: Vec<SocketAddr> = all.iter().copied().filter(|a| a.is_ipv4()).collect();
    let v6: Vec<SocketAddr> = all.iter().copied().filter(|a| a.is_ipv6()).collect();
    v4.extend(v6);
    v4
}

/// Open a TCP connection to `addr` under a deadline, trying all resolved
/// addresses (IPv4-first) and returning the first that succeeds.
pub async fn dial(addr: &str, deadline: Duration) -> Option<TcpStream> {
    let candidates = resolve_addrs(addr);
    if candidates.is_empty() {
        tracing::warn!(addr = %addr, "Address resolve failed");
        return None;
    }
    match monoio::time::timeout(deadline, async {
        for sa in &candidates {
            match TcpStream::connect(*sa).await {
                Ok(s) => {
                    let _ = s.set_nodelay(true);
                    tracing::debug!(addr = %addr, resolved = %sa, "Connected");
                    return Some(s);
                }
                Err(e) => {
                    tracing::debug!(addr = %addr, resolved = %sa, error = %e, "Candidate failed, trying next");
                }
            }
        }
        None
    })
    .await
    {
        Ok(Some(stream)) => Some(stream),
        Ok(None) => {
            tracing::warn!(addr = %addr, tried = candidates.len(), "Connect failed on all candidates");
            None
        }
        Err(_) => {
            tracing::warn!(addr = %addr, "Connect deadline exceeded");
            None
        }
    }
}

/// Copy bytes in both directions until either side closes, then return
/// the (a→b, b→a) byte counts.
///
/// Each direction runs as its own task; when one side reaches EOF its
/// pump shuts down the peer's write half, so the opposite pump sees EOF
/// and the pair winds down without a cancellation race.
pub async fn splice(a: TcpStream, b: TcpStream) -> (u64, u64) {
    let (a_read, a_write) = a.into_split();
    let (b_read, b_write) = b.into_split();

    let forward = monoio::spawn(pump(a_read, b_write));
    let backward = pump(b_read, a_write).await;
    let forward = forward.await;
    (forward, backward)
}

/// One direction of a tunnel. Returns the bytes moved.
pub async fn pump<R, W>(mut from: R, mut to: W) -> u64
where
    R: AsyncReadRent,
    W: AsyncWriteRent,
{
    let mut buf = vec![0u8; 16 * 1024];
    let mut total = 0u64;
    loop {
        let (res, returned_buf) = from.read(buf).await;
        buf = returned_buf;
        let n = match res {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        total += n as u64;
        let (res, _) = to.write_all(buf[..n].to_vec()).await;
        if res.is_err() {
            break;
        }
    }
    let _ = to.shutdown().await;
    total
}
