//! The local-or-delegate resolution decision.
//!
//! Given a parsed query and the override table, [`resolve`] either
//! synthesizes one answer record per configured address or signals that the
//! original query must be forwarded to the upstream resolver untouched.

use crate::overrides::OverrideTable;
use crate::wire::{DnsQuery, Question, RecordType, ResourceRecord};
use std::net::IpAddr;

/// TTL (seconds) applied to every locally synthesized record.
pub const OVERRIDE_TTL: u32 = 300;

/// Outcome of the resolution decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Answer locally with these records.
    Local(Vec<ResourceRecord>),
    /// Forward the original query to the upstream resolver, verbatim.
    Delegate,
}

/// Decide between local synthesis and upstream delegation.
///
/// Only the first question is acted on; messages carrying more questions
/// are decoded in full but delegated on the strength of the first one
/// alone. Record types outside A/AAAA always delegate.
#[must_use]
pub fn resolve(query: &DnsQuery, overrides: &OverrideTable) -> Resolution {
    let Some(question) = query.questions.first() else {
        return Resolution::Delegate;
    };
    let rtype = RecordType::from_qtype(question.qtype);
    if matches!(rtype, RecordType::Unsupported(_)) {
        return Resolution::Delegate;
    }
    match overrides.lookup(&question.qname, rtype) {
        Some(addrs) if !addrs.is_empty() => Resolution::Local(
            addrs
                .iter()
                .map(|addr| address_record(question, *addr))
                .collect(),
        ),
        _ => Resolution::Delegate,
    }
}

/// One answer record mirroring the question, with rdata taken from the
/// address's own family: four octets for IPv4, sixteen for IPv6.
fn address_record(question: &Question, addr: IpAddr) -> ResourceRecord {
    let (rtype, rdata) = match addr {
        IpAddr::V4(v4) => (RecordType::A, v4.octets().to_vec()),
        IpAddr::V6(v6) => (RecordType::AAAA, v6.octets().to_vec()),
    };
    ResourceRecord {
        name: question.qname.clone(),
        rtype,
        class: question.qclass,
        ttl: OVERRIDE_TTL,
        rdata,
    }
}
