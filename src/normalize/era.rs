use std::fmt;

use crate::partition::PartitionKey;

/// First partition published in the revised comparative-revenue layout.
pub const ERA_CUTOFF: u32 = 2505;

/// Layout generation of a comparative-revenue file.
///
/// Chosen by comparing the partition key as an integer with [`ERA_CUTOFF`],
/// never by date arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatEra {
    Pre2505,
    Post2505,
}

impl FormatEra {
    pub fn for_key(key: &PartitionKey) -> Self {
        if key.as_number() < ERA_CUTOFF {
            FormatEra::Pre2505
        } else {
            FormatEra::Post2505
        }
    }
}

impl fmt::Display for FormatEra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatEra::Pre2505 => f.write_str("pre-2505"),
            FormatEra::Post2505 => f.write_str("post-2505"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn era(key: &str) -> FormatEra {
        FormatEra::for_key(&PartitionKey::parse(key).unwrap())
    }

    #[test]
    fn boundary_is_inclusive_on_the_new_side() {
        assert_eq!(era("2504"), FormatEra::Pre2505);
        assert_eq!(era("2505"), FormatEra::Post2505);
    }

    #[test]
    fn far_sides() {
        assert_eq!(era("2001"), FormatEra::Pre2505);
        assert_eq!(era("2412"), FormatEra::Pre2505);
        assert_eq!(era("2601"), FormatEra::Post2505);
    }
}
