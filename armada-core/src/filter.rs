//! Vendor credential-filter rendering and sticky-session extraction.
//!
//! The filter is the hyphen-prefixed suffix embedded in a user's password
//! field, forwarded verbatim to the chosen upstream. Each vendor encodes
//! country and session pinning differently:
//!
//!   netnut:  `-res-nl-sid-94704546`
//!   iproyal: `-country-dk_session-sgn34f3e_lifetime-1h`

use rand::Rng;
use rand::seq::SliceRandom;

/// Render the vendor-specific filter suffix for (vendor, country, sticky).
/// Unknown vendors yield an empty filter.
pub fn render_filter(vendor: &str, country: &str, sticky: bool, rng: &mut impl Rng) -> String {
    if vendor.contains("netnut") {
        let mut filter = format!("-res-{country}");
        if sticky {
            let sid: u32 = rng.gen_range(10_000_000..=99_999_999);
            filter.push_str("-sid-");
            filter.push_str(itoa::Buffer::new().format(sid));
        }
        filter
    } else if vendor.contains("iproyal") {
        let mut filter = format!("-country-{country}");
        if sticky {
            filter.push_str("_session-");
            filter.push_str(&session_token(rng));
            filter.push_str("_lifetime-1h");
        }
        filter
    } else {
        String::new()
    }
}

/// 8-character session token: k lowercase letters and 8-k digits,
/// k uniform in 1..=8, shuffled.
fn session_token(rng: &mut impl Rng) -> String {
    let letters = rng.gen_range(1..=8usize);
    let mut chars: Vec<char> = Vec::with_capacity(8);
    for _ in 0..letters {
        chars.push(rng.gen_range(b'a'..=b'z') as char);
    }
    for _ in letters..8 {
        chars.push(rng.gen_range(b'0'..=b'9') as char);
    }
    chars.shuffle(rng);
    chars.into_iter().collect()
}

/// Pull the sticky-session id out of a filter string.
///
/// `session` marks an iproyal-style token (7 chars after `session-`),
/// `sid` a netnut-style one (8 digits after `sid-`). A filter too short
/// to hold the full id carries none.
pub fn extract_session_id(filter: &str) -> &str {
    if let Some(i) = filter.find("session") {
        filter.get(i + 8..i + 15).unwrap_or("")
    } else if let Some(i) = filter.find("sid") {
        filter.get(i + 4..i + 12).unwrap_or("")
    } else {
        ""
    }
}
