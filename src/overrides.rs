//! Static override table short-circuiting upstream resolution.
//!
//! The table is built once at startup from the configuration and injected
//! into the request path behind an [`Arc`][std::sync::Arc]; it is never
//! mutated afterwards, so concurrent readers need no locking.
//!
//! Lookups are exact-string matches on the queried name: no wildcarding,
//! no case folding.

use crate::error::Error;
use crate::wire::RecordType;
use std::collections::HashMap;
use std::net::IpAddr;

/// Immutable mapping `domain -> record type -> ordered address list`.
#[derive(Debug, Default, Clone)]
pub struct OverrideTable {
    entries: HashMap<String, HashMap<RecordType, Vec<IpAddr>>>,
}

impl OverrideTable {
    /// Build a validated table from the raw configuration map.
    ///
    /// Address literals have already been parsed by their own family's
    /// parser during deserialization; this step checks that each family
    /// matches its record type key, so an `A` list can only hold IPv4
    /// addresses and an `AAAA` list only IPv6.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRecordType`] for a record type key other
    /// than `A`/`AAAA`, and [`Error::OverrideFamilyMismatch`] when an
    /// address is listed under the wrong family.
    pub fn from_entries(
        raw: &HashMap<String, HashMap<String, Vec<IpAddr>>>,
    ) -> Result<Self, Error> {
        let mut entries: HashMap<String, HashMap<RecordType, Vec<IpAddr>>> = HashMap::new();
        for (domain, records) in raw {
            let mut by_type: HashMap<RecordType, Vec<IpAddr>> = HashMap::new();
            for (type_key, addrs) in records {
                let rtype: RecordType = type_key.parse()?;
                for addr in addrs {
                    let family_matches = match rtype {
                        RecordType::A => addr.is_ipv4(),
                        RecordType::AAAA => addr.is_ipv6(),
                        RecordType::Unsupported(_) => false,
                    };
                    if !family_matches {
                        return Err(Error::OverrideFamilyMismatch {
                            domain: domain.clone(),
                            rtype,
                            addr: *addr,
                        });
                    }
                }
                by_type.insert(rtype, addrs.clone());
            }
            entries.insert(domain.clone(), by_type);
        }
        Ok(OverrideTable { entries })
    }

    /// Look up the configured addresses for a domain and record type.
    ///
    /// Returns `None` for domains or record types that have no override;
    /// [`RecordType::Unsupported`] never matches.
    #[must_use]
    pub fn lookup(&self, domain: &str, rtype: RecordType) -> Option<&[IpAddr]> {
        self.entries
            .get(domain)?
            .get(&rtype)
            .map(Vec::as_slice)
    }

    /// Number of domains with at least one override.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
