//! MX resolution: from an address or domain to the ordered list of mail
//! hosts worth probing.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{LookupMx, SystemResolver, resolve, resolve_domain, resolve_with};
pub use types::{AddressFamilies, MxCandidates, MxRecord};

pub(crate) use resolver::resolve_address_with;
