//! Record classification: decide whether a record is exported, and as what.

use crate::backup::RawRecord;
use ghostport_types::{PublishStatus, RecordKind};

/// Classification outcome for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Export {
        kind: RecordKind,
        status: PublishStatus,
    },
    Skip(String),
}

/// Classify a record; `skip_drafts` additionally excludes drafts
pub fn classify(record: &RawRecord, skip_drafts: bool) -> Classification {
    let status_name = record.status.as_deref().unwrap_or("published");
    let Some(status) = PublishStatus::from_str(status_name) else {
        return Classification::Skip(format!("status '{}' is not exported", status_name));
    };

    if skip_drafts && status.is_draft() {
        return Classification::Skip("drafts are excluded".to_string());
    }

    match RecordKind::from_str(record.type_name()) {
        Some(kind) => Classification::Export { kind, status },
        None => Classification::Skip(format!("unknown post type '{}'", record.type_name())),
    }
}
