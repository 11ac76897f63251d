//! Duplicate detection over ingested records.
//!
//! A record is a duplicate when an earlier record has the same catalog id,
//! or the same full title and artists. Only the first record of each group
//! stays eligible for download.

use std::collections::HashSet;

use crate::track::{Status, TrackRecord};

/// Marks every record that repeats an earlier one as [`Status::Duplicate`].
///
/// Records that are already duplicates are skipped and do not claim their
/// keys, so running this again over the same records, even after they were
/// reordered, changes nothing.
///
/// Returns the number of records that were newly marked.
pub fn find_duplicates(records: &mut [TrackRecord]) -> usize {
    let mut seen_ids = HashSet::with_capacity(records.len());
    let mut seen_names = HashSet::with_capacity(records.len());
    let mut marked = 0;

    for record in records.iter_mut() {
        if record.status == Status::Duplicate {
            continue;
        }

        let id = record.track.id.clone();
        let name = name_key(record);

        if seen_ids.contains(&id) || seen_names.contains(&name) {
            trace!("marking {} as duplicate", record.track);
            record.status = Status::Duplicate;
            marked += 1;
            continue;
        }

        seen_ids.insert(id);
        seen_names.insert(name);
    }

    marked
}

fn name_key(record: &TrackRecord) -> String {
    format!(
        "{} - {}",
        record.track.full_title(),
        record.track.artists_string()
    )
}
