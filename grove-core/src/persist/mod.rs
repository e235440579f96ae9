//! On-disk snapshots and portable exports.

pub(crate) mod export;
pub(crate) mod snapshot;

pub(crate) use self::export::ExportDocument;
pub(crate) use self::snapshot::Snapshot;
