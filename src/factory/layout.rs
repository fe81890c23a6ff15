//! Known partition layouts.
//!
//! Offsets here must match the partition CSVs shipped with the firmware. A
//! filesystem image written at the wrong offset overwrites other partitions,
//! so an unknown table is an error rather than a default.

use anyhow::Result;

use crate::error::BuildError;

/// Application offset when no recovery image is flashed.
pub const BASE_APP_OFFSET: u32 = 0x10000;

/// Application offset when the recovery image takes the base slot.
pub const SHIFTED_APP_OFFSET: u32 = 0xB0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLayout {
    /// Partition table file name the board declares, matched as a suffix.
    pub table: &'static str,
    pub flash_size: &'static str,
    pub recovery_offset: u32,
    pub app_offset: u32,
    pub app_offset_with_recovery: u32,
    pub fs_offset: u32,
}

pub const KNOWN_LAYOUTS: &[PartitionLayout] = &[
    PartitionLayout {
        table: "partitions-4MB.csv",
        flash_size: "4MB",
        recovery_offset: BASE_APP_OFFSET,
        app_offset: BASE_APP_OFFSET,
        app_offset_with_recovery: SHIFTED_APP_OFFSET,
        fs_offset: 0x3F0000,
    },
    PartitionLayout {
        table: "partitions-8MB.csv",
        flash_size: "8MB",
        recovery_offset: BASE_APP_OFFSET,
        app_offset: BASE_APP_OFFSET,
        app_offset_with_recovery: SHIFTED_APP_OFFSET,
        fs_offset: 0x7E0000,
    },
];

/// Find the layout for a partition table identifier (a path or file name).
pub fn lookup(table: &str) -> Result<&'static PartitionLayout> {
    let table = table.trim();
    KNOWN_LAYOUTS
        .iter()
        .find(|layout| !table.is_empty() && table.ends_with(layout.table))
        .ok_or_else(|| BuildError::UnknownPartitionTable(table.to_string()).into())
}

/// Resolved flash offsets for one factory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetPlan {
    pub recovery: Option<u32>,
    pub app: u32,
    pub fs: u32,
}

impl PartitionLayout {
    /// Offsets for this layout. Overrides replace the layout values.
    pub fn plan(
        &self,
        has_recovery: bool,
        recovery_override: Option<u32>,
        app_override: Option<u32>,
    ) -> OffsetPlan {
        let recovery = has_recovery.then(|| recovery_override.unwrap_or(self.recovery_offset));
        let default_app = if has_recovery {
            self.app_offset_with_recovery
        } else {
            self.app_offset
        };
        OffsetPlan {
            recovery,
            app: app_override.unwrap_or(default_app),
            fs: self.fs_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_suffix() {
        assert_eq!(lookup("partitions-4MB.csv").unwrap().fs_offset, 0x3F0000);
        assert_eq!(
            lookup("/home/me/project/partitions-8MB.csv").unwrap().fs_offset,
            0x7E0000
        );
    }

    #[test]
    fn test_unknown_table_is_a_configuration_error() {
        for table in ["partitions-16MB.csv", "default.csv", "", "partitions-4MB.csv.bak"] {
            let err = lookup(table).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<BuildError>(),
                    Some(BuildError::UnknownPartitionTable(_))
                ),
                "{} should be rejected",
                table
            );
        }
    }

    #[test]
    fn test_app_shifts_when_recovery_present() {
        let layout = lookup("partitions-4MB.csv").unwrap();

        let plain = layout.plan(false, None, None);
        assert_eq!(plain.recovery, None);
        assert_eq!(plain.app, BASE_APP_OFFSET);

        let with_recovery = layout.plan(true, None, None);
        assert_eq!(with_recovery.recovery, Some(BASE_APP_OFFSET));
        assert_eq!(with_recovery.app, SHIFTED_APP_OFFSET);
        assert_eq!(with_recovery.fs, 0x3F0000);
    }

    #[test]
    fn test_overrides_win() {
        let layout = lookup("partitions-8MB.csv").unwrap();
        let plan = layout.plan(true, Some(0x10000), Some(0x110000));
        assert_eq!(plan.recovery, Some(0x10000));
        assert_eq!(plan.app, 0x110000);

        // Recovery override is ignored without a recovery image.
        let plan = layout.plan(false, Some(0x20000), None);
        assert_eq!(plan.recovery, None);
    }
}
