use crate::control::{AuthFailure, ControlHandle};
use crate::select::select_out;
use crate::tunnel;
use armada_core::user::AuthResponse;
use armada_core::{Out, Pool, WorkerConfig};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use monoio::io::{AsyncReadRent, AsyncWriteRentExt};
use monoio::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_HEAD_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

// ── Pre-built static responses (zero heap alloc) ──────────────

pub const RESP_400: &[u8] =
    b"HTTP/1.1 400 Bad Request\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";

pub const RESP_407: &[u8] =
    b"HTTP/1.1 407 Proxy Authentication Required\r\nproxy-authenticate: Basic realm=\"Proxy\"\r\ncontent-type: application/json\r\ncontent-length: 54\r\nconnection: close\r\n\r\n{\"error\":\"proxy authentication required\",\"status\":407}";

pub const RESP_429: &[u8] =
    b"HTTP/1.1 429 Too Many Requests\r\ncontent-type: application/json\r\ncontent-length: 44\r\nconnection: close\r\n\r\n{\"error\":\"data quota exceeded\",\"status\":429}";

pub const RESP_500: &[u8] =
    b"HTTP/1.1 500 Internal Server Error\r\ncontent-type: application/json\r\ncontent-length: 46\r\nconnection: close\r\n\r\n{\"error\":\"no upstream available\",\"status\":500}";

pub const RESP_502: &[u8] =
    b"HTTP/1.1 502 Bad Gateway\r\ncontent-type: application/json\r\ncontent-length: 39\r\nconnection: close\r\n\r\n{\"error\":\"upstream error\",\"status\":502}";

pub const RESP_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";

// ── Request head ──────────────────────────────────────────────

/// Owned snapshot of a parsed request head, detached from the read
/// buffer so the buffer can keep accumulating body/pipelined bytes.
#[derive(Debug)]
pub struct RequestHead {
    pub method: String,
    /// Authority form for CONNECT (`host:port`), absolute form otherwise.
    pub target: String,
    pub head_len: usize,
    pub content_length: usize,
    pub keep_alive: bool,
    /// Inbound chunked bodies cannot be framed for forwarding.
    pub chunked: bool,
    pub proxy_authorization: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// Try to parse a complete request head out of `buf`.
///
/// `Ok(None)` means more bytes are needed; `Err(())` means the bytes can
/// never become a valid request.
pub fn parse_head(buf: &[u8]) -> Result<Option<RequestHead>, ()> {
    let mut headers_raw = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut headers_raw);

    match req.parse(buf) {
        Ok(httparse::Status::Complete(head_len)) => {
            let method = req.method.unwrap_or("GET").to_string();
            let target = req.path.unwrap_or("/").to_string();

            let mut content_length = 0usize;
            let mut keep_alive = true;
            let mut chunked = false;
            let mut proxy_authorization = None;
            let mut headers = Vec::with_capacity(16);

            for h in req.headers.iter() {
                if h.name.is_empty() {
                    break;
                }
                let value = std::str::from_utf8(h.value).unwrap_or("").to_string();
                if h.name.eq_ignore_ascii_case("proxy-authorization") {
                    proxy_authorization = Some(value.clone());
                } else if h.name.eq_ignore_ascii_case("connection") {
                    keep_alive = !value.eq_ignore_ascii_case("close");
                } else if h.name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().map_err(|_| ())?;
                } else if h.name.eq_ignore_ascii_case("transfer-encoding") {
                    chunked = true;
                }
                headers.push((h.name.to_string(), value));
            }

            Ok(Some(RequestHead {
                method,
                target,
                head_len,
                content_length,
                keep_alive,
                chunked,
                proxy_authorization,
                headers,
            }))
        }
        Ok(httparse::Status::Partial) => Ok(None),
        Err(_) => Err(()),
    }
}

/// Split a `Proxy-Authorization` header into (username, password, filter).
///
/// Only the `Basic` scheme is accepted. The decoded payload has the shape
/// `username:password-<filter>`: the first `:` ends the username, the
/// first `-` of the remainder ends the password, and the filter keeps its
/// leading `-` so it can be appended to upstream credentials verbatim.
pub fn split_proxy_credentials(header: &str) -> Option<(String, String, String)> {
    let (scheme, encoded) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, rest) = text.split_once(':')?;
    let sep = rest.find('-')?;
    let (password, filter) = rest.split_at(sep);
    Some((username.to_string(), password.to_string(), filter.to_string()))
}

/// Build the absolute-form request presented to the upstream proxy.
/// Hop-by-hop headers and the client's own proxy credentials are
/// dropped; the rendered upstream credentials are attached instead.
pub fn build_forward_request(
    buf: &mut Vec<u8>,
    method: &str,
    target: &str,
    headers: &[(String, String)],
    credentials: &str,
    body: &[u8],
) {
    buf.clear();
    buf.extend_from_slice(method.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(target.as_bytes());
    buf.extend_from_slice(b" HTTP/1.1\r\n");
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("proxy-authorization")
            || name.eq_ignore_ascii_case("proxy-connection")
            || name.eq_ignore_ascii_case("connection")
            || name.eq_ignore_ascii_case("keep-alive")
            || name.eq_ignore_ascii_case("transfer-encoding")
            || name.eq_ignore_ascii_case("upgrade")
            || name.eq_ignore_ascii_case("content-length")
        {
            continue;
        }
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"proxy-authorization: Basic ");
    buf.extend_from_slice(BASE64.encode(credentials).as_bytes());
    buf.extend_from_slice(b"\r\nconnection: close\r\n");
    if !body.is_empty() {
        buf.extend_from_slice(b"content-length: ");
        let mut itoa_buf = itoa::Buffer::new();
        buf.extend_from_slice(itoa_buf.format(body.len()).as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"\r\n");
    if !body.is_empty() {
        buf.extend_from_slice(body);
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn resolve_pool(ctl: &ControlHandle, allowed: &[String]) -> Option<Pool> {
    for name in allowed {
        let name = name.trim().to_lowercase();
        if let Some(pool) = ctl.pool(&name) {
            return Some(pool);
        }
    }
    None
}

// ── Connection handling ───────────────────────────────────────

/// Handle one inbound HTTP-proxy connection (keep-alive aware).
///
/// Per request: parse → split credentials → auth against the captain →
/// quota gate → pool from the snapshot → sticky/weighted upstream →
/// render upstream credentials → CONNECT tunnel or plain forward →
/// report spliced bytes.
pub async fn handle_connection(
    mut client: TcpStream,
    ctl: ControlHandle,
    config: Arc<WorkerConfig>,
) -> anyhow::Result<()> {
    let idle = Duration::from_millis(config.idle_timeout_ms);
    let mut pending: Vec<u8> = Vec::with_capacity(8192);
    let mut scratch = vec![0u8; 8192];

    loop {
        // ── Accumulate until the request head is complete ──
        let head = loop {
            match parse_head(&pending) {
                Ok(Some(head)) => break head,
                Ok(None) => {
                    if pending.len() >= MAX_HEAD_BYTES {
                        let (res, _) = client.write_all(RESP_400.to_vec()).await;
                        res?;
                        return Ok(());
                    }
                }
                Err(_) => {
                    let (res, _) = client.write_all(RESP_400.to_vec()).await;
                    res?;
                    return Ok(());
                }
            }

            let (res, returned_buf) = match monoio::time::timeout(idle, client.read(scratch)).await
            {
                Ok(pair) => pair,
                Err(_) => return Ok(()), // idle client
            };
            scratch = returned_buf;
            let n = match res {
                Ok(0) => return Ok(()), // closed between requests
                Ok(n) => n,
                Err(e) => return Err(e.into()),
            };
            pending.extend_from_slice(&scratch[..n]);
        };

        // ── Credentials ──
        let Some((username, password, filter)) = head
            .proxy_authorization
            .as_deref()
            .and_then(split_proxy_credentials)
        else {
            let (res, _) = client.write_all(RESP_407.to_vec()).await;
            res?;
            return Ok(());
        };

        let auth = match ctl.authenticate(&username, &password).await {
            Ok(auth) => auth,
            Err(failure) => {
                match &failure {
                    AuthFailure::Transport(e) => {
                        warn!(error = %e, "Auth check did not reach the captain");
                    }
                    AuthFailure::InvalidCredentials(message) => {
                        debug!(username = %username, message = %message, "Client rejected");
                    }
                }
                let (res, _) = client.write_all(RESP_407.to_vec()).await;
                res?;
                return Ok(());
            }
        };

        if auth.over_quota() {
            let (res, _) = client.write_all(RESP_429.to_vec()).await;
            res?;
            return Ok(());
        }

        // ── Pool + upstream ──
        let Some(pool) = resolve_pool(&ctl, &auth.allowed_pools) else {
            warn!(user_id = %auth.user_id, "No allowed pool present in the local snapshot");
            let (res, _) = client.write_all(RESP_500.to_vec()).await;
            res?;
            return Ok(());
        };

        let selected =
            select_out(&pool, &filter, ctl.sessions(), &mut rand::thread_rng()).cloned();
        let Some(out) = selected else {
            warn!(pool = %pool.name, "Pool has no upstreams");
            let (res, _) = client.write_all(RESP_500.to_vec()).await;
            res?;
            return Ok(());
        };

        let credentials = out.credentials(&filter);

        if head.method.eq_ignore_ascii_case("CONNECT") {
            // Bytes the client sent ahead of our 200 belong to the tunnel.
            pending.drain(..head.head_len);
            let early = std::mem::take(&mut pending);
            return connect_tunnel(client, &ctl, &config, &auth, &head, &out, &credentials, early)
                .await;
        }

        // ── Plain HTTP: pull in the full body, then forward ──
        if head.chunked || head.content_length > MAX_BODY_BYTES {
            let (res, _) = client.write_all(RESP_400.to_vec()).await;
            res?;
            return Ok(());
        }
        let request_end = head.head_len + head.content_length;
        while pending.len() < request_end {
            let (res, returned_buf) = match monoio::time::timeout(idle, client.read(scratch)).await
            {
                Ok(pair) => pair,
                Err(_) => return Ok(()),
            };
            scratch = returned_buf;
            let n = match res {
                Ok(0) => return Ok(()), // truncated body
                Ok(n) => n,
                Err(e) => return Err(e.into()),
            };
            pending.extend_from_slice(&scratch[..n]);
        }

        let body = &pending[head.head_len..request_end];
        let keep_alive =
            forward_request(&mut client, &ctl, &config, &auth, &head, body, &credentials, &out)
                .await?;
        pending.drain(..request_end);

        if !keep_alive || !head.keep_alive {
            return Ok(());
        }
    }
}

/// CONNECT path: dial the chosen Out, issue a nested CONNECT with the
/// rendered credentials, sniff the upstream's status line, then splice.
/// A non-2xx upstream answer is relayed to the client instead of a
/// fabricated 200.
#[allow(clippy::too_many_arguments)]
async fn connect_tunnel(
    mut client: TcpStream,
    ctl: &ControlHandle,
    config: &WorkerConfig,
    auth: &AuthResponse,
    head: &RequestHead,
    out: &Out,
    credentials: &str,
    early: Vec<u8>,
) -> anyhow::Result<()> {
    let target = head.target.as_str();
    let deadline = Duration::from_millis(config.dial_timeout_ms);
    let Some(mut upstream) = tunnel::dial(&out.addr(), deadline).await else {
        let (res, _) = client.write_all(RESP_502.to_vec()).await;
        res?;
        return Ok(());
    };

    let mut connect_req = Vec::with_capacity(256);
    connect_req.extend_from_slice(b"CONNECT ");
    connect_req.extend_from_slice(target.as_bytes());
    connect_req.extend_from_slice(b" HTTP/1.1\r\nhost: ");
    connect_req.extend_from_slice(target.as_bytes());
    connect_req.extend_from_slice(b"\r\nproxy-authorization: Basic ");
    connect_req.extend_from_slice(BASE64.encode(credentials).as_bytes());
    connect_req.extend_from_slice(b"\r\n\r\n");

    let (res, _) = upstream.write_all(connect_req).await;
    if res.is_err() {
        let (res, _) = client.write_all(RESP_502.to_vec()).await;
        res?;
        return Ok(());
    }

    // ── Upstream's answer to the nested CONNECT ──
    let mut reply: Vec<u8> = Vec::with_capacity(1024);
    let mut buf = vec![0u8; 4096];
    let header_end = loop {
        let (res, returned_buf) = upstream.read(buf).await;
        buf = returned_buf;
        let n = match res {
            Ok(0) | Err(_) => {
                warn!(upstream = %out.domain, "Upstream closed during CONNECT handshake");
                let (res, _) = client.write_all(RESP_502.to_vec()).await;
                res?;
                return Ok(());
            }
            Ok(n) => n,
        };
        reply.extend_from_slice(&buf[..n]);
        if let Some(end) = find_header_end(&reply) {
            break end;
        }
        if reply.len() > MAX_HEAD_BYTES {
            let (res, _) = client.write_all(RESP_502.to_vec()).await;
            res?;
            return Ok(());
        }
    };

    let code = {
        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut resp = httparse::Response::new(&mut headers);
        match resp.parse(&reply[..header_end]) {
            Ok(httparse::Status::Complete(_)) => resp.code.unwrap_or(0),
            _ => 0,
        }
    };

    if !(200..300).contains(&code) {
        debug!(code, target = %target, upstream = %out.domain, "Upstream refused CONNECT; relaying its answer");
        let (res, _) = client.write_all(reply).await;
        res?;
        return Ok(());
    }

    // The upstream's header block is consumed here; anything past it is
    // already tunnel payload.
    let residual = reply.split_off(header_end);

    let (res, _) = client.write_all(RESP_ESTABLISHED.to_vec()).await;
    res?;

    let mut handshake_extra = 0u64;
    if !residual.is_empty() {
        handshake_extra += residual.len() as u64;
        let (res, _) = client.write_all(residual).await;
        res?;
    }
    if !early.is_empty() {
        handshake_extra += early.len() as u64;
        let (res, _) = upstream.write_all(early).await;
        if res.is_err() {
            return Ok(());
        }
    }

    debug!(target = %target, upstream = %out.domain, "Tunnel established");
    let (up, down) = tunnel::splice(client, upstream).await;
    ctl.report_usage(&auth.user_id, up + down + handshake_extra);
    Ok(())
}

/// Plain-HTTP path: treat the chosen Out as the next proxy hop, relay
/// the rebuilt request, and stream the answer back by Content-Length
/// (or to EOF when the length is unknown, closing afterwards).
///
/// Returns whether the client connection may serve another request.
#[allow(clippy::too_many_arguments)]
async fn forward_request(
    client: &mut TcpStream,
    ctl: &ControlHandle,
    config: &WorkerConfig,
    auth: &AuthResponse,
    head: &RequestHead,
    body: &[u8],
    credentials: &str,
    out: &Out,
) -> anyhow::Result<bool> {
    let deadline = Duration::from_millis(config.dial_timeout_ms);
    let Some(mut upstream) = tunnel::dial(&out.addr(), deadline).await else {
        let (res, _) = client.write_all(RESP_502.to_vec()).await;
        res?;
        return Ok(false);
    };

    let mut request_buf = Vec::with_capacity(2048);
    build_forward_request(
        &mut request_buf,
        &head.method,
        &head.target,
        &head.headers,
        credentials,
        body,
    );
    let sent = request_buf.len() as u64;

    let (res, _) = upstream.write_all(request_buf).await;
    if res.is_err() {
        let (res, _) = client.write_all(RESP_502.to_vec()).await;
        res?;
        return Ok(false);
    }

    // ── Relay the response ──
    let mut received = 0u64;
    let mut resp_buf = vec![0u8; 65536];
    let (res, returned_buf) = upstream.read(resp_buf).await;
    resp_buf = returned_buf;
    let first_n = match res {
        Ok(0) | Err(_) => {
            warn!(upstream = %out.domain, "Upstream closed without a response");
            let (res, _) = client.write_all(RESP_502.to_vec()).await;
            res?;
            return Ok(false);
        }
        Ok(n) => n,
    };

    let mut content_length: Option<usize> = None;
    let mut header_len = 0usize;
    let mut parsed = false;
    {
        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut resp = httparse::Response::new(&mut headers);
        if let Ok(httparse::Status::Complete(hdr_len)) = resp.parse(&resp_buf[..first_n]) {
            parsed = true;
            header_len = hdr_len;
            for h in resp.headers.iter() {
                if h.name.eq_ignore_ascii_case("content-length") {
                    content_length = std::str::from_utf8(h.value)
                        .ok()
                        .and_then(|s| s.trim().parse().ok());
                }
            }
        }
    }

    let (res, _) = client.write_all(resp_buf[..first_n].to_vec()).await;
    res?;
    received += first_n as u64;

    let keep_alive = if parsed && let Some(cl) = content_length {
        let body_in_first = first_n - header_len;
        let mut remaining = cl.saturating_sub(body_in_first);
        while remaining > 0 {
            let (res, returned_buf) = upstream.read(resp_buf).await;
            resp_buf = returned_buf;
            let n = match res {
                Ok(0) => break,
                Ok(n) => n,
                Err(_) => break,
            };
            remaining = remaining.saturating_sub(n);
            received += n as u64;
            let (res, _) = client.write_all(resp_buf[..n].to_vec()).await;
            if res.is_err() {
                break;
            }
        }
        remaining == 0
    } else {
        // No usable length — relay until the upstream closes, then close.
        loop {
            let (res, returned_buf) = upstream.read(resp_buf).await;
            resp_buf = returned_buf;
            let n = match res {
                Ok(0) => break,
                Ok(n) => n,
                Err(_) => break,
            };
            received += n as u64;
            let (res, _) = client.write_all(resp_buf[..n].to_vec()).await;
            if res.is_err() {
                break;
            }
        }
        false
    };

    ctl.report_usage(&auth.user_id, sent + received);
    Ok(keep_alive)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_header(payload: &str) -> String {
        format!("Basic {}", BASE64.encode(payload))
    }

    // ── split_proxy_credentials ─────────────────────────────────

    #[test]
    fn splits_username_password_filter() {
        let header = basic_header("alice:wonderland-res-de-sid-12345678");
        let (user, pass, filter) = split_proxy_credentials(&header).unwrap();
        assert_eq!(user, "alice");
        assert_eq!(pass, "wonderland");
        assert_eq!(filter, "-res-de-sid-12345678");
    }

    #[test]
    fn filter_keeps_leading_dash_and_later_dashes() {
        let header = basic_header("u:p-country-dk_session-sgn34f3e_lifetime-1h");
        let (_, pass, filter) = split_proxy_credentials(&header).unwrap();
        assert_eq!(pass, "p");
        assert_eq!(filter, "-country-dk_session-sgn34f3e_lifetime-1h");
    }

    #[test]
    fn missing_colon_is_rejected() {
        let header = basic_header("no-colon-here");
        assert!(split_proxy_credentials(&header).is_none());
    }

    #[test]
    fn missing_dash_is_rejected() {
        let header = basic_header("alice:plainpassword");
        assert!(split_proxy_credentials(&header).is_none());
    }

    #[test]
    fn non_basic_scheme_is_rejected() {
        assert!(split_proxy_credentials("Bearer abc123").is_none());
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(split_proxy_credentials("Basic !!!not-base64!!!").is_none());
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let encoded = BASE64.encode("u:p-res-us");
        assert!(split_proxy_credentials(&format!("basic {encoded}")).is_some());
    }

    // ── parse_head ──────────────────────────────────────────────

    #[test]
    fn parse_complete_connect_request() {
        let raw = b"CONNECT example.com:443 HTTP/1.1\r\nhost: example.com:443\r\nproxy-authorization: Basic abc\r\n\r\n";
        let head = parse_head(raw).unwrap().unwrap();
        assert_eq!(head.method, "CONNECT");
        assert_eq!(head.target, "example.com:443");
        assert_eq!(head.head_len, raw.len());
        assert_eq!(head.proxy_authorization.as_deref(), Some("Basic abc"));
        assert_eq!(head.content_length, 0);
        assert!(head.keep_alive);
    }

    #[test]
    fn parse_partial_returns_none() {
        assert!(parse_head(b"GET http://a/ HTT").unwrap().is_none());
        assert!(parse_head(b"").unwrap().is_none());
    }

    #[test]
    fn parse_garbage_is_an_error() {
        assert!(parse_head(b"\0\0garbage\r\n\r\n").is_err());
    }

    #[test]
    fn parse_reads_content_length_and_connection_close() {
        let raw =
            b"POST http://a.ex/u HTTP/1.1\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello";
        let head = parse_head(raw).unwrap().unwrap();
        assert_eq!(head.content_length, 5);
        assert!(!head.keep_alive);
        assert_eq!(head.head_len, raw.len() - 5);
    }

    #[test]
    fn parse_rejects_bad_content_length() {
        let raw = b"POST http://a.ex/ HTTP/1.1\r\ncontent-length: banana\r\n\r\n";
        assert!(parse_head(raw).is_err());
    }

    // ── build_forward_request ───────────────────────────────────

    #[test]
    fn forward_request_is_absolute_form_with_upstream_credentials() {
        let headers = vec![
            ("host".to_string(), "a.ex".to_string()),
            ("proxy-authorization".to_string(), "Basic client-secret".to_string()),
            ("accept".to_string(), "*/*".to_string()),
        ];
        let mut buf = Vec::new();
        build_forward_request(
            &mut buf,
            "GET",
            "http://a.ex/path",
            &headers,
            "acct:pw-res-us",
            b"",
        );
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("GET http://a.ex/path HTTP/1.1\r\n"));
        assert!(!text.contains("client-secret"), "inbound credentials must be stripped");
        assert!(text.contains("accept: */*\r\n"));
        let expected = BASE64.encode("acct:pw-res-us");
        assert!(text.contains(&format!("proxy-authorization: Basic {expected}\r\n")));
        assert!(text.contains("connection: close\r\n"));
        assert!(!text.contains("content-length:"));
    }

    #[test]
    fn forward_request_carries_body_with_length() {
        let mut buf = Vec::new();
        build_forward_request(&mut buf, "POST", "http://a.ex/u", &[], "a:b-x", b"hello");
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("content-length: 5\r\n"));
        assert!(text.ends_with("hello"));
    }

    #[test]
    fn forward_request_filters_hop_by_hop_headers() {
        let headers = vec![
            ("connection".to_string(), "keep-alive".to_string()),
            ("keep-alive".to_string(), "timeout=5".to_string()),
            ("transfer-encoding".to_string(), "chunked".to_string()),
            ("upgrade".to_string(), "websocket".to_string()),
            ("x-forwarded-for".to_string(), "1.2.3.4".to_string()),
        ];
        let mut buf = Vec::new();
        build_forward_request(&mut buf, "GET", "http://a.ex/", &headers, "a:b-x", b"");
        let text = String::from_utf8(buf).unwrap();
        assert!(!text.contains("transfer-encoding"));
        assert!(!text.contains("upgrade"));
        assert!(!text.contains("timeout=5"));
        assert!(text.contains("x-forwarded-for: 1.2.3.4\r\n"));
    }

    // ── static responses ────────────────────────────────────────

    #[test]
    fn static_responses_have_consistent_content_length() {
        for raw in [RESP_407, RESP_429, RESP_500, RESP_502, RESP_400] {
            let mut headers = [httparse::EMPTY_HEADER; 16];
            let mut resp = httparse::Response::new(&mut headers);
            let status = resp.parse(raw).unwrap();
            let httparse::Status::Complete(hdr_len) = status else {
                panic!("static response must be complete");
            };
            let declared: usize = resp
                .headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case("content-length"))
                .map(|h| std::str::from_utf8(h.value).unwrap().parse().unwrap())
                .unwrap_or(0);
            assert_eq!(raw.len() - hdr_len, declared, "body length mismatch in {:?}",
                std::str::from_utf8(&raw[..raw.iter().position(|&b| b == b'\r').unwrap()]).unwrap());
        }
    }

    #[test]
    fn resp_407_advertises_basic_realm() {
        let text = std::str::from_utf8(RESP_407).unwrap();
        assert!(text.starts_with("HTTP/1.1 407 "));
        assert!(text.contains("proxy-authenticate: Basic realm=\"Proxy\"\r\n"));
    }

    #[test]
    fn find_header_end_locates_crlfcrlf() {
        assert_eq!(find_header_end(b"HTTP/1.1 200 OK\r\n\r\nrest"), Some(19));
        assert_eq!(find_header_end(b"HTTP/1.1 200 OK\r\n"), None);
    }
}
