//! Capability bitmask and the containment check behind every authorization decision.
//!
//! | Permission          | Bit    |
//! |---------------------|--------|
//! | `FOLLOW`            | `0x01` |
//! | `COMMENT`           | `0x02` |
//! | `WRITE_ARTICLES`    | `0x04` |
//! | `MODERATE_COMMENTS` | `0x08` |
//! | `ADMINISTER`        | `0x80` |
//!
//! Roles compose these with `|`. A holder of mask `M` can perform `P` iff
//! `M & P == P`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// A set of capabilities encoded as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u32);

impl Permission {
    pub const FOLLOW: Permission = Permission(0x01);
    pub const COMMENT: Permission = Permission(0x02);
    pub const WRITE_ARTICLES: Permission = Permission(0x04);
    pub const MODERATE_COMMENTS: Permission = Permission(0x08);
    pub const ADMINISTER: Permission = Permission(0x80);

    /// Permissions every freshly registered account receives.
    pub const BASE_USER: Permission =
        Permission(Self::FOLLOW.0 | Self::COMMENT.0 | Self::WRITE_ARTICLES.0);

    /// Base user permissions plus comment moderation.
    pub const MODERATOR: Permission = Permission(Self::BASE_USER.0 | Self::MODERATE_COMMENTS.0);

    /// Every bit of the low byte, including the unassigned ones.
    pub const ALL: Permission = Permission(0xff);

    const NAMED: [(Permission, &'static str); 5] = [
        (Self::FOLLOW, "FOLLOW"),
        (Self::COMMENT, "COMMENT"),
        (Self::WRITE_ARTICLES, "WRITE_ARTICLES"),
        (Self::MODERATE_COMMENTS, "MODERATE_COMMENTS"),
        (Self::ADMINISTER, "ADMINISTER"),
    ];

    /// The empty set held by anonymous callers.
    pub const fn empty() -> Self {
        Permission(0)
    }

    /// Build from raw bits, keeping bits that have no name.
    pub const fn from_bits(bits: u32) -> Self {
        Permission(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `required` is set in `self`.
    pub const fn contains(self, required: Permission) -> bool {
        self.0 & required.0 == required.0
    }

    /// Names of the assigned bits present in this set.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED.iter().filter(|(p, _)| self.contains(*p)).map(|(_, name)| *name).collect()
    }
}

impl BitOr for Permission {
    type Output = Permission;

    fn bitor(self, rhs: Permission) -> Permission {
        Permission(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permission {
    fn bitor_assign(&mut self, rhs: Permission) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Permission {
    type Output = Permission;

    fn bitand(self, rhs: Permission) -> Permission {
        Permission(self.0 & rhs.0)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn named_bits_match_table() {
        assert_eq!(Permission::FOLLOW.bits(), 0x01);
        assert_eq!(Permission::COMMENT.bits(), 0x02);
        assert_eq!(Permission::WRITE_ARTICLES.bits(), 0x04);
        assert_eq!(Permission::MODERATE_COMMENTS.bits(), 0x08);
        assert_eq!(Permission::ADMINISTER.bits(), 0x80);
        assert_eq!(Permission::BASE_USER.bits(), 0x07);
        assert_eq!(Permission::MODERATOR.bits(), 0x0f);
    }

    #[test]
    fn composition_with_or() {
        let mut mask = Permission::FOLLOW | Permission::COMMENT;
        assert!(mask.contains(Permission::COMMENT));
        assert!(!mask.contains(Permission::WRITE_ARTICLES));
        mask |= Permission::WRITE_ARTICLES;
        assert_eq!(mask, Permission::BASE_USER);
    }

    #[test]
    fn names_and_display() {
        assert_eq!(Permission::MODERATOR.names(), vec![
            "FOLLOW",
            "COMMENT",
            "WRITE_ARTICLES",
            "MODERATE_COMMENTS"
        ]);
        assert_eq!(Permission::ADMINISTER.to_string(), "0x80");
        assert!(Permission::empty().names().is_empty());
    }

    proptest! {
        #[test]
        fn contains_iff_all_bits_set(mask in 0u32..=0xff, required in 0u32..=0xff) {
            let holder = Permission::from_bits(mask);
            let wanted = Permission::from_bits(required);
            prop_assert_eq!(holder.contains(wanted), mask & required == required);
        }

        #[test]
        fn subset_of_mask_is_always_contained(mask in 0u32..=0xff, pick in 0u32..=0xff) {
            let holder = Permission::from_bits(mask);
            prop_assert!(holder.contains(Permission::from_bits(mask & pick)));
        }

        #[test]
        fn empty_contains_no_nonzero_permission(required in 1u32..=0xff) {
            prop_assert!(!Permission::empty().contains(Permission::from_bits(required)));
        }
    }
}
