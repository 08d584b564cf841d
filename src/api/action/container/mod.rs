pub(crate) mod lifecycle;
pub(crate) mod list;
pub(crate) mod logs;
pub(crate) mod stats;
pub(crate) mod status;

pub(crate) use lifecycle::{delete, restart, start, stop};
pub(crate) use list::list;
pub(crate) use logs::{logs, stream_logs};
pub(crate) use stats::stats;
pub(crate) use status::{detailed_status, status};
