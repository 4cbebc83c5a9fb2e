use crate::control::{AuthFailure, ControlHandle};
use crate::tunnel;
use armada_core::WorkerConfig;
use monoio::io::{AsyncReadRentExt, AsyncWriteRentExt};
use monoio::net::TcpStream;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SOCKS_VERSION: u8 = 0x05;
const METHOD_USERPASS: u8 = 0x02;
const METHOD_NONE_ACCEPTABLE: u8 = 0xFF;
const CMD_CONNECT: u8 = 0x01;

const REP_SUCCESS: u8 = 0x00;
const REP_HOST_UNREACHABLE: u8 = 0x04;

/// Handle one SOCKS5 connection: RFC 1928 method negotiation with the
/// RFC 1929 username/password sub-negotiation (the only accepted
/// method), a CONNECT to the requested destination, then a raw splice.
///
/// The destination is dialed directly; pool routing stays an HTTP-side
/// concern.
pub async fn handle_connection(
    mut client: TcpStream,
    ctl: ControlHandle,
    config: Arc<WorkerConfig>,
) -> anyhow::Result<()> {
    // ── Method selection ──
    let (res, header) = client.read_exact(vec![0u8; 2]).await;
    res?;
    if header[0] != SOCKS_VERSION {
        anyhow::bail!("unsupported SOCKS version: {}", header[0]);
    }
    let nmethods = header[1] as usize;
    let (res, methods) = client.read_exact(vec![0u8; nmethods]).await;
    res?;

    if !methods.contains(&METHOD_USERPASS) {
        // No acceptable method: answer per the RFC and close.
        let (res, _) = client
            .write_all(vec![SOCKS_VERSION, METHOD_NONE_ACCEPTABLE])
            .await;
        res?;
        anyhow::bail!("client does not offer username/password auth");
    }
    let (res, _) = client.write_all(vec![SOCKS_VERSION, METHOD_USERPASS]).await;
    res?;

    // ── Username/password sub-negotiation ──
    let (res, auth_header) = client.read_exact(vec![0u8; 2]).await;
    res?;
    let ulen = auth_header[1] as usize;
    let (res, uname) = client.read_exact(vec![0u8; ulen]).await;
    res?;
    let (res, plen_buf) = client.read_exact(vec![0u8; 1]).await;
    res?;
    let (res, passwd) = client.read_exact(vec![0u8; plen_buf[0] as usize]).await;
    res?;

    let username = String::from_utf8_lossy(&uname).into_owned();
    let password = String::from_utf8_lossy(&passwd).into_owned();

    let auth = match ctl.authenticate(&username, &password).await {
        Ok(auth) if !auth.over_quota() => auth,
        Ok(_) => {
            debug!(username = %username, "Quota exhausted; refusing SOCKS session");
            let (res, _) = client.write_all(vec![SOCKS_VERSION, 0x01]).await;
            res?;
            return Ok(());
        }
        Err(failure) => {
            match &failure {
                AuthFailure::Transport(e) => {
                    warn!(error = %e, "Auth check did not reach the captain");
                }
                AuthFailure::InvalidCredentials(message) => {
                    debug!(username = %username, message = %message, "Client rejected");
                }
            }
            let (res, _) = client.write_all(vec![SOCKS_VERSION, 0x01]).await;
            res?;
            return Ok(());
        }
    };
    let (res, _) = client.write_all(vec![SOCKS_VERSION, 0x00]).await;
    res?;

    // ── Request ──
    let dest = match read_request(&mut client).await {
        Ok(dest) => dest,
        Err(e) => {
            debug!(error = %e, "SOCKS request handshake failed");
            return Err(e);
        }
    };

    // ── Dial + tunnel ──
    let deadline = Duration::from_millis(config.dial_timeout_ms);
    let Some(dest_stream) = tunnel::dial(&dest, deadline).await else {
        send_reply(&mut client, REP_HOST_UNREACHABLE).await?;
        return Ok(());
    };
    send_reply(&mut client, REP_SUCCESS).await?;

    debug!(dest = %dest, username = %username, "SOCKS tunnel established");
    let (up, down) = tunnel::splice(client, dest_stream).await;
    ctl.report_usage(&auth.user_id, up + down);
    Ok(())
}

/// Read `[VER, CMD, RSV, ATYP, DST.ADDR, DST.PORT]` and render the
/// destination as a dialable `host:port` string.
async fn read_request(client: &mut TcpStream) -> anyhow::Result<String> {
    let (res, header) = client.read_exact(vec![0u8; 4]).await;
    res?;

    if header[0] != SOCKS_VERSION {
        anyhow::bail!("unsupported SOCKS version: {}", header[0]);
    }
    if header[1] != CMD_CONNECT {
        anyhow::bail!("unsupported command: {}", header[1]);
    }

    let host = match header[3] {
        0x01 => {
            let (res, ip) = client.read_exact(vec![0u8; 4]).await;
            res?;
            Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3]).to_string()
        }
        0x03 => {
            let (res, len_buf) = client.read_exact(vec![0u8; 1]).await;
            res?;
            let (res, domain) = client.read_exact(vec![0u8; len_buf[0] as usize]).await;
            res?;
            String::from_utf8_lossy(&domain).into_owned()
        }
        0x04 => {
            let (res, ip) = client.read_exact(vec![0u8; 16]).await;
            res?;
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&ip);
            format!("[{}]", Ipv6Addr::from(octets))
        }
        other => anyhow::bail!("unknown address type: {other}"),
    };

    let (res, port_buf) = client.read_exact(vec![0u8; 2]).await;
    res?;
    let port = u16::from_be_bytes([port_buf[0], port_buf[1]]);

    Ok(format!("{host}:{port}"))
}

/// `[VER, REP, RSV, ATYP, BND.ADDR, BND.PORT]` with an all-zero IPv4
/// bind address — clients that care about BND ignore zeros.
async fn send_reply(client: &mut TcpStream, rep: u8) -> anyhow::Result<()> {
    let reply = vec![
        SOCKS_VERSION,
        rep,
        0x00,
        0x01,
        0x00,
        0x00,
        0x00,
        0x00,
        0x00,
        0x00,
    ];
    let (res, _) = client.write_all(reply).await;
    res?;
    Ok(())
}
