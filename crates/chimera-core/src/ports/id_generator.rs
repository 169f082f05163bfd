//! IdGenerator port.
//!
//! Ids are ULIDs whose timestamp part comes from a `Clock`, so a pinned clock
//! yields ids with a pinned timestamp.

use ulid::Ulid;

use crate::domain::{TaskId, TrendId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn task_id(&self) -> TaskId;

    fn trend_id(&self) -> TrendId;
}

pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn task_id(&self) -> TaskId {
        TaskId::from(self.next())
    }

    fn trend_id(&self) -> TrendId {
        TrendId::from(self.next())
    }
}
