//! Holder tables: one hash per resource, `holder -> expiration timestamp`.
//!
//! Shared by the lock manager and the presence registry. Expired holders
//! are reaped lazily when a table is read for counting.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::store::{Store, StoreError};

/// Parse a stored expiration timestamp (seconds since the epoch).
pub(crate) fn parse_expiration(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn format_expiration(at: f64) -> String {
    at.to_string()
}

/// Parse a raw table, skipping values that are not timestamps.
pub(crate) fn parse_table(key: &str, raw: HashMap<String, String>) -> HashMap<String, f64> {
    raw.into_iter()
        .filter_map(|(holder, value)| match parse_expiration(&value) {
            Some(at) => Some((holder, at)),
            None => {
                warn!(key, %holder, %value, "ignoring unparsable holder expiration");
                None
            }
        })
        .collect()
}

/// Read the table at `key`, delete every holder whose expiration is
/// `<= now` (or unreadable), and return the live holders.
///
/// Read and delete are separate store calls; a holder written between them
/// survives because only the fields seen as expired are deleted.
pub(crate) async fn reap<S: Store + ?Sized>(
    store: &S,
    key: &str,
    now: f64,
) -> Result<HashMap<String, f64>, StoreError> {
    let raw = store.hgetall(key).await?;
    let mut live = HashMap::with_capacity(raw.len());
    let mut expired = Vec::new();

    for (holder, value) in raw {
        match parse_expiration(&value) {
            Some(at) if at > now => {
                live.insert(holder, at);
            }
            Some(_) => expired.push(holder),
            None => {
                warn!(key, %holder, %value, "reaping holder with unparsable expiration");
                expired.push(holder);
            }
        }
    }

    if !expired.is_empty() {
        let removed = store.hdel(key, &expired).await?;
        debug!(key, removed, "reaped expired holders");
    }

    Ok(live)
}
