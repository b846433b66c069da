//! Which position-block fields the server may change, per operation.

use core::fmt;

use crate::protocol::{Operation, Stat, is_valid_position_mid};

/// How a call's returned position block is checked against its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionPolicy {
    /// The block is only sent; nothing comes back to check.
    InputOnly,
    /// The server returns an updated block that must respect the invariants.
    Reconciled {
        /// Whether the server may move the block to another container.
        container_mutable: bool,
    },
}

impl PositionPolicy {
    /// Policy for one operation.
    ///
    /// Get-matches is the one operation that may switch containers.
    #[must_use]
    pub const fn for_operation(operation: Operation) -> Self {
        match operation {
            Operation::UpdateStat
            | Operation::QueryRows
            | Operation::SeekEntries
            | Operation::ResortRestriction => Self::Reconciled {
                container_mutable: false,
            },
            Operation::GetMatches => Self::Reconciled {
                container_mutable: true,
            },
            _ => Self::InputOnly,
        }
    }
}

/// A position block field named in a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionField {
    /// `SortType`
    SortType,
    /// `ContainerID`
    ContainerId,
    /// `CurrentRec`
    CurrentRec,
    /// `CodePage`
    CodePage,
    /// `TemplateLocale`
    TemplateLocale,
    /// `SortLocale`
    SortLocale,
}

impl fmt::Display for PositionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SortType => "SortType",
            Self::ContainerId => "ContainerID",
            Self::CurrentRec => "CurrentRec",
            Self::CodePage => "CodePage",
            Self::TemplateLocale => "TemplateLocale",
            Self::SortLocale => "SortLocale",
        };
        f.write_str(name)
    }
}

/// A position block invariant the server broke.
///
/// Violations are reported next to the decoded payload; they never fail
/// the call and are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionViolation {
    /// A field the server must leave alone was changed.
    Changed {
        /// Field that changed
        field: PositionField,
        /// Value sent
        before: u32,
        /// Value returned
        after: u32,
    },
    /// A minimal ID field holds a value that is neither a sentinel nor an
    /// object identifier.
    InvalidMid {
        /// Field checked
        field: PositionField,
        /// Value returned
        value: u32,
    },
}

impl fmt::Display for PositionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changed {
                field,
                before,
                after,
            } => write!(f, "{field} changed from {before:#x} to {after:#x}"),
            Self::InvalidMid { field, value } => {
                write!(f, "{field} holds invalid minimal id {value:#x}")
            }
        }
    }
}

/// Compare the returned block with the one sent.
///
/// `succeeded` enables the minimal ID checks, which only hold for a
/// block the server actually positioned.
#[must_use]
pub fn reconcile(
    policy: PositionPolicy,
    before: &Stat,
    after: &Stat,
    succeeded: bool,
) -> Vec<PositionViolation> {
    let PositionPolicy::Reconciled { container_mutable } = policy else {
        return Vec::new();
    };

    let mut checks = vec![
        (PositionField::SortType, before.sort_type, after.sort_type),
        (PositionField::CodePage, before.code_page, after.code_page),
        (
            PositionField::TemplateLocale,
            before.template_locale,
            after.template_locale,
        ),
        (PositionField::SortLocale, before.sort_locale, after.sort_locale),
    ];
    if !container_mutable {
        checks.push((
            PositionField::ContainerId,
            before.container_id,
            after.container_id,
        ));
    }

    let mut violations: Vec<PositionViolation> = checks
        .into_iter()
        .filter(|(_, before, after)| before != after)
        .map(|(field, before, after)| PositionViolation::Changed {
            field,
            before,
            after,
        })
        .collect();

    if succeeded {
        for (field, value) in [
            (PositionField::CurrentRec, after.current_rec),
            (PositionField::ContainerId, after.container_id),
        ] {
            if !is_valid_position_mid(value) {
                violations.push(PositionViolation::InvalidMid { field, value });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CP_WINUNICODE, SORT_TYPE_PHONETIC_DISPLAY_NAME};

    #[test]
    fn test_policy_table() {
        for op in Operation::ALL {
            let policy = PositionPolicy::for_operation(op);
            match op {
                Operation::GetMatches => assert_eq!(
                    policy,
                    PositionPolicy::Reconciled {
                        container_mutable: true
                    }
                ),
                Operation::UpdateStat
                | Operation::QueryRows
                | Operation::SeekEntries
                | Operation::ResortRestriction => assert_eq!(
                    policy,
                    PositionPolicy::Reconciled {
                        container_mutable: false
                    }
                ),
                _ => assert_eq!(policy, PositionPolicy::InputOnly),
            }
        }
    }

    #[test]
    fn test_unchanged_block_is_clean() {
        let before = Stat::new();
        let mut after = before;
        after.current_rec = 0x44;
        after.num_pos = 3;
        after.total_recs = 10;
        let policy = PositionPolicy::for_operation(Operation::QueryRows);
        assert!(reconcile(policy, &before, &after, true).is_empty());
    }

    #[test]
    fn test_immutable_fields_reported() {
        let before = Stat::new();
        let mut after = before;
        after.code_page = CP_WINUNICODE;
        after.sort_type = SORT_TYPE_PHONETIC_DISPLAY_NAME;
        after.container_id = 0x20;

        let violations = reconcile(
            PositionPolicy::for_operation(Operation::SeekEntries),
            &before,
            &after,
            true,
        );
        assert_eq!(violations.len(), 3);
        assert!(violations.contains(&PositionViolation::Changed {
            field: PositionField::CodePage,
            before: before.code_page,
            after: CP_WINUNICODE,
        }));
        assert!(violations.contains(&PositionViolation::Changed {
            field: PositionField::ContainerId,
            before: 0,
            after: 0x20,
        }));
    }

    #[test]
    fn test_get_matches_may_switch_container() {
        let before = Stat::new();
        let mut after = before;
        after.container_id = 0x20;
        let policy = PositionPolicy::for_operation(Operation::GetMatches);
        assert!(reconcile(policy, &before, &after, true).is_empty());
    }

    #[test]
    fn test_invalid_mid_only_checked_on_success() {
        let before = Stat::new();
        let mut after = before;
        after.current_rec = 0x05;
        let policy = PositionPolicy::for_operation(Operation::UpdateStat);

        assert_eq!(
            reconcile(policy, &before, &after, true),
            vec![PositionViolation::InvalidMid {
                field: PositionField::CurrentRec,
                value: 0x05
            }]
        );
        assert!(reconcile(policy, &before, &after, false).is_empty());
    }

    #[test]
    fn test_input_only_never_reports() {
        let before = Stat::new();
        let mut after = before;
        after.sort_locale = 1;
        assert!(reconcile(PositionPolicy::InputOnly, &before, &after, true).is_empty());
    }
}
