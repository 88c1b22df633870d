//! Discovery of a node's libp2p identity from its log.
//!
//! On startup a Substrate node prints `Local node identity is: <peer id>`. Launch tooling reads
//! that line to build the bootnode address other nodes dial.

use std::net::IpAddr;
use std::path::Path;

use lazy_static::lazy_static;
use log::info;
use regex::Regex;
use snafu::{OptionExt, ResultExt};

use crate::error::{IdentityNotFoundSnafu, PeerIdError, ReadLogSnafu};

lazy_static! {
    /// Regular expression to capture the peer id from the node's startup line.
    /// The format expected is `Local node identity is: <id>` where `<id>` is base58.
    static ref IDENTITY_REGEX: Regex =
        Regex::new(r"Local node identity is: ([1-9A-HJ-NP-Za-km-z]+)").unwrap();
}

/// Returns the peer id from the last identity line in `log`.
///
/// The last line wins so a log spanning several restarts yields the current identity.
pub fn discover_peer_id(log: &str) -> Option<String> {
    IDENTITY_REGEX
        .captures_iter(log)
        .last()
        .and_then(|captures| captures.get(1))
        .map(|peer_id| peer_id.as_str().to_string())
}

/// Reads a node log and extracts its peer id.
pub async fn read_peer_id(path: impl AsRef<Path>) -> Result<String, PeerIdError> {
    let path = path.as_ref();
    let log = tokio::fs::read_to_string(path).await.context(ReadLogSnafu {
        path: path.display().to_string(),
    })?;

    let peer_id = discover_peer_id(&log).context(IdentityNotFoundSnafu {
        path: path.display().to_string(),
    })?;

    info!("🏷️ Discovered local node identity {}", peer_id);
    Ok(peer_id)
}

/// Formats the multiaddr other nodes pass to `--bootnodes`.
pub fn bootnode_address(ip: IpAddr, port: u16, peer_id: &str) -> String {
    let protocol = match ip {
        IpAddr::V4(_) => "ip4",
        IpAddr::V6(_) => "ip6",
    };
    format!("/{protocol}/{ip}/tcp/{port}/p2p/{peer_id}")
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    const LOG: &str = "\
2024-05-01 10:00:00 Substrate Node
2024-05-01 10:00:00 🏷  Local node identity is: 12D3KooWEyoppNCUx8Yx66oV9fJnriXwCcXwDDUA2kj6vnc6iDEp
2024-05-01 10:00:01 💻 Operating system: linux
";

    #[test]
    fn we_can_discover_the_peer_id() {
        assert_eq!(
            discover_peer_id(LOG).as_deref(),
            Some("12D3KooWEyoppNCUx8Yx66oV9fJnriXwCcXwDDUA2kj6vnc6iDEp")
        );
    }

    #[test]
    fn the_latest_identity_wins_after_a_restart() {
        let restarted = format!(
            "{LOG}2024-05-01 11:00:00 🏷  Local node identity is: 12D3KooWHdiAxVd8uMQR1hGWXccidmfCwLqcMpGwR6QcTP6QRMuD\n"
        );

        assert_eq!(
            discover_peer_id(&restarted).as_deref(),
            Some("12D3KooWHdiAxVd8uMQR1hGWXccidmfCwLqcMpGwR6QcTP6QRMuD")
        );
    }

    #[test]
    fn the_identity_pattern_captures_one_group() {
        assert_eq!(IDENTITY_REGEX.captures_len(), 2);
    }

    #[test]
    fn logs_without_an_identity_yield_nothing() {
        assert_eq!(discover_peer_id("2024-05-01 booting\n"), None);
    }

    #[test]
    fn we_can_format_bootnode_addresses() {
        assert_eq!(
            bootnode_address(IpAddr::V4(Ipv4Addr::LOCALHOST), 30333, "12D3KooWabc"),
            "/ip4/127.0.0.1/tcp/30333/p2p/12D3KooWabc"
        );
        assert_eq!(
            bootnode_address(IpAddr::V6(Ipv6Addr::LOCALHOST), 30334, "12D3KooWabc"),
            "/ip6/::1/tcp/30334/p2p/12D3KooWabc"
        );
    }

    #[tokio::test]
    async fn missing_logs_fail_with_a_read_error() {
        let result = read_peer_id("test_directory/does-not-exist.log").await;

        assert!(matches!(result, Err(PeerIdError::ReadLog { .. })));
    }
}
