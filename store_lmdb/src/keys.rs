//! Composite key layouts.
//!
//! String components are written as a 4-byte big-endian length followed by
//! the bytes, so no identifier content can shift a component boundary.
//! Hours are appended as 8 big-endian bytes so that per-zone scans come
//! out in time order.

use zonemap_types::Timestamp;

fn push_component(key: &mut Vec<u8>, component: &str) {
    // identifiers are far below 4 GiB
    key.extend_from_slice(&(component.len() as u32).to_be_bytes());
    key.extend_from_slice(component.as_bytes());
}

/// `origin id`, for identifiers scoped by the zone that issued them.
pub(crate) fn scoped(origin: &str, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + origin.len() + id.len());
    push_component(&mut key, origin);
    push_component(&mut key, id);
    key
}

/// `chain hour_be`.
pub(crate) fn hourly(chain: &str, hour: Timestamp) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + chain.len() + 8);
    push_component(&mut key, chain);
    key.extend_from_slice(&hour.to_be_bytes());
    key
}

/// `chain hour_be address`. The first part is [`hourly`], usable as a scan prefix.
pub(crate) fn address(chain: &str, hour: Timestamp, address: &str) -> Vec<u8> {
    let mut key = hourly(chain, hour);
    push_component(&mut key, address);
    key
}

/// `source destination hour_be`.
pub(crate) fn ibc(source: &str, destination: &str, hour: Timestamp) -> Vec<u8> {
    let mut key = scoped(source, destination);
    key.extend_from_slice(&hour.to_be_bytes());
    key
}
