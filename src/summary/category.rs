use std::fmt;

/// Variable category, derived from the leading characters of a summary
/// keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VarCategory {
    Field,
    Aquifer,
    Region,
    RegionToRegion,
    Group,
    Well,
    Completion,
    Segment,
    Block,
    LocalWell,
    LocalCompletion,
    LocalBlock,
    Network,
    Misc,
}

/// Keywords that break the naming convention and are always misc.
const SPECIAL_MISC: &[&str] = &[
    "NEWTON", "NAIMFRAC", "NLINEARS", "NLINSMIN", "NLINSMAX", "ELAPSED", "MAXDPR", "MAXDSO", "MAXDSG",
    "MAXDSW", "STEPTYPE", "WNEWTON",
];

impl VarCategory {
    pub fn identify(keyword: &str) -> Self {
        let keyword = keyword.trim_end();
        if SPECIAL_MISC.contains(&keyword) {
            return VarCategory::Misc;
        }
        let bytes = keyword.as_bytes();
        match bytes.first() {
            Some(b'A') => VarCategory::Aquifer,
            Some(b'B') => VarCategory::Block,
            Some(b'C') => VarCategory::Completion,
            Some(b'F') => VarCategory::Field,
            Some(b'G') => VarCategory::Group,
            Some(b'L') => match bytes.get(1) {
                Some(b'B') => VarCategory::LocalBlock,
                Some(b'C') => VarCategory::LocalCompletion,
                Some(b'W') => VarCategory::LocalWell,
                _ => VarCategory::Misc,
            },
            Some(b'N') => VarCategory::Network,
            Some(b'R') => identify_region(bytes),
            Some(b'S') => VarCategory::Segment,
            Some(b'W') => VarCategory::Well,
            _ => VarCategory::Misc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VarCategory::Field => "field",
            VarCategory::Aquifer => "aquifer",
            VarCategory::Region => "region",
            VarCategory::RegionToRegion => "region_to_region",
            VarCategory::Group => "group",
            VarCategory::Well => "well",
            VarCategory::Completion => "completion",
            VarCategory::Segment => "segment",
            VarCategory::Block => "block",
            VarCategory::LocalWell => "local_well",
            VarCategory::LocalCompletion => "local_completion",
            VarCategory::LocalBlock => "local_block",
            VarCategory::Network => "network",
            VarCategory::Misc => "misc",
        }
    }
}

impl fmt::Display for VarCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Region flows (`R*FT*`, `R**FR*`, ...) are region-to-region variables;
/// RORFR is the documented exception, RNLF and three-letter `R?F` come from
/// older decks.
fn identify_region(bytes: &[u8]) -> VarCategory {
    if bytes.len() == 3 && bytes[2] == b'F' {
        return VarCategory::RegionToRegion;
    }
    if bytes == b"RNLF" {
        return VarCategory::RegionToRegion;
    }
    if bytes == b"RORFR" {
        return VarCategory::Region;
    }
    if bytes.len() >= 4 && bytes[2] == b'F' && matches!(bytes[3], b'T' | b'R') {
        return VarCategory::RegionToRegion;
    }
    if bytes.len() >= 5 && bytes[3] == b'F' && matches!(bytes[4], b'T' | b'R') {
        return VarCategory::RegionToRegion;
    }
    VarCategory::Region
}

#[cfg(test)]
mod tests {
    use super::VarCategory::*;
    use super::*;

    #[test]
    fn leading_letter_decides() {
        assert_eq!(VarCategory::identify("WOPR"), Well);
        assert_eq!(VarCategory::identify("GGPT"), Group);
        assert_eq!(VarCategory::identify("FOPT"), Field);
        assert_eq!(VarCategory::identify("BPR"), Block);
        assert_eq!(VarCategory::identify("COFR"), Completion);
        assert_eq!(VarCategory::identify("SOFR"), Segment);
        assert_eq!(VarCategory::identify("AAQP"), Aquifer);
        assert_eq!(VarCategory::identify("TIME"), Misc);
        assert_eq!(VarCategory::identify("LWBHP"), LocalWell);
        assert_eq!(VarCategory::identify("LLINEAR"), Misc);
    }

    #[test]
    fn special_names_are_misc() {
        assert_eq!(VarCategory::identify("NEWTON"), Misc);
        assert_eq!(VarCategory::identify("WNEWTON"), Misc);
        assert_eq!(VarCategory::identify("NETWORK"), Network);
    }

    #[test]
    fn region_flow_rules() {
        assert_eq!(VarCategory::identify("RPR"), Region);
        assert_eq!(VarCategory::identify("ROFT"), RegionToRegion);
        assert_eq!(VarCategory::identify("RGFTL"), RegionToRegion);
        assert_eq!(VarCategory::identify("RWIFR"), RegionToRegion);
        assert_eq!(VarCategory::identify("RORFR"), Region);
        assert_eq!(VarCategory::identify("RNLF"), RegionToRegion);
        assert_eq!(VarCategory::identify("RGF"), RegionToRegion);
    }
}
