// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Host fields accept either a dotted-quad IPv4 address or an FQDN; the FQDN
//! rules follow RFC 1035 label syntax (alphanumeric labels, hyphens allowed
//! inside, alphabetic TLD, 253 characters total).

use crate::{ConfigError, ConfigResult, RelayConfig};

/// Validate an IPv4 address in dotted-quad notation.
pub fn is_valid_ipv4(host: &str) -> bool {
    host.parse::<std::net::Ipv4Addr>().is_ok()
}

/// Validate a fully qualified domain name.
///
/// Accepts `a.bc` but rejects `a.b` (TLD must be at least two alphabetic
/// characters), empty labels, labels starting or ending with a hyphen, labels
/// over 63 characters, trailing dots, and names outside 4..=253 characters.
pub fn is_valid_fqdn(fqdn: &str) -> bool {
    if !(4..=253).contains(&fqdn.len()) || fqdn.ends_with('.') {
        return false;
    }
    let labels: Vec<&str> = fqdn.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let (tld, rest) = labels.split_last().expect("at least two labels");
    if !(2..=63).contains(&tld.len()) || !tld.bytes().all(|b| b.is_ascii_alphabetic()) {
        return false;
    }
    rest.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && label.ends_with(|c: char| c.is_ascii_alphanumeric())
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

fn is_valid_host(host: &str) -> bool {
    is_valid_ipv4(host) || is_valid_fqdn(host)
}

/// Validate a loaded configuration before the server starts.
pub fn validate_config(config: &RelayConfig) -> ConfigResult<()> {
    if !is_valid_host(&config.api.host) {
        return Err(ConfigError::InvalidValue(format!(
            "api.host is neither an IPv4 address nor an FQDN: '{}'",
            config.api.host
        )));
    }
    if !is_valid_host(&config.inference.host) {
        return Err(ConfigError::InvalidValue(format!(
            "inference.host is neither an IPv4 address nor an FQDN: '{}'",
            config.inference.host
        )));
    }
    if config.inference.protocol != "http" && config.inference.protocol != "https" {
        return Err(ConfigError::InvalidValue(format!(
            "inference.protocol must be 'http' or 'https', got '{}'",
            config.inference.protocol
        )));
    }
    if config.security.shared_key.is_empty() {
        return Err(ConfigError::MissingRequired(
            "security.shared_key".to_string(),
        ));
    }
    Ok(())
}
