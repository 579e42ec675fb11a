//! Structural address checks run before any network traffic.

mod domain;
mod local;

pub(crate) use domain::is_valid_hostname;

use crate::address::{AddressFormatError, EmailAddress};
use local::is_valid_user;

/// Checks the user part (dot-atom or quoted string) and the domain (IP
/// literal or ACE host name) of an already parsed address.
pub fn check_syntax(address: &EmailAddress) -> Result<(), AddressFormatError> {
    if !is_valid_user(address.user()) {
        return Err(AddressFormatError::InvalidUser {
            user: address.user().to_string(),
        });
    }

    // literals were validated as IP addresses while parsing
    if address.is_domain_literal_ip() {
        return Ok(());
    }

    if !is_valid_hostname(address.ace_domain()) {
        return Err(AddressFormatError::InvalidDomain {
            domain: address.domain().to_string(),
        });
    }
    Ok(())
}
