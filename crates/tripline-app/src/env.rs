//! Production environment.

use std::time::{SystemTime, UNIX_EPOCH};

use tripline_core::Environment;
use tripline_proto::Timestamp;

/// Wall-clock environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        Timestamp::from_millis(millis)
    }
}
