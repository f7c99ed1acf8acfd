//! Structured summary keys.
//!
//! A key is `(category, keyword, qualifier)`. The text form joins the parts
//! with `:` (`WOPR:P1`, `RPR:3`, `COFR:P1:120`) but lookups always go through
//! the structured value, so names containing `:` never collide.

use std::fmt;

use crate::summary::category::VarCategory;

/// Placeholder well name used where a well/group name does not apply.
pub const DUMMY_WELL: &str = ":+:+:+:+";

const REGION_PAIR_BASE: i32 = 32768;
const REGION_PAIR_OFFSET: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Qualifier {
    None,
    /// Well or group name.
    Name(String),
    /// Region, aquifer or block cell number.
    Number(i32),
    RegionPair(i32, i32),
    /// Completion cell or segment number on a well.
    NameNumber(String, i32),
    Local {
        lgr: String,
        well: Option<String>,
        ijk: Option<[i32; 3]>,
    },
}

impl Qualifier {
    pub fn well(name: &str) -> Self {
        Qualifier::Name(name.to_string())
    }

    pub fn region(num: i32) -> Self {
        Qualifier::Number(num)
    }
}

/// Decode the packed NUMS value of a region-to-region variable.
pub fn decode_region_pair(num: i32) -> (i32, i32) {
    let r1 = num % REGION_PAIR_BASE;
    let r2 = (num - r1) / REGION_PAIR_BASE - REGION_PAIR_OFFSET;
    (r1, r2)
}

pub fn encode_region_pair(r1: i32, r2: i32) -> i32 {
    r1 + REGION_PAIR_BASE * (r2 + REGION_PAIR_OFFSET)
}

/// Convert a 1-based block cell number to 1-based (i, j, k).
pub fn block_ijk(num: i32, dims: [i32; 3]) -> Option<[i32; 3]> {
    let [nx, ny, nz] = dims;
    if num < 1 || nx <= 0 || ny <= 0 || nz <= 0 {
        return None;
    }
    // a layer or grid too large for i32 holds every representable number
    let layer = nx.checked_mul(ny);
    if layer.and_then(|l| l.checked_mul(nz)).is_some_and(|cells| num > cells) {
        return None;
    }
    let idx = num - 1;
    Some([idx % nx + 1, (idx / nx) % ny + 1, layer.map_or(0, |l| idx / l) + 1])
}

/// Inverse of [`block_ijk`]; `None` when the number does not fit in i32.
pub fn block_num(ijk: [i32; 3], dims: [i32; 3]) -> Option<i32> {
    let [i, j, k] = ijk;
    let [nx, ny, _] = dims;
    let row = (j - 1).checked_mul(nx)?;
    let layer = (k - 1).checked_mul(nx.checked_mul(ny)?)?;
    i.checked_add(row)?.checked_add(layer)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SummaryKey {
    pub category: VarCategory,
    pub keyword: String,
    pub qualifier: Qualifier,
}

/// One header entry as stored in the parallel arrays.
#[derive(Debug, Clone, Copy)]
pub struct RawNode<'a> {
    pub keyword: &'a str,
    pub wgname: Option<&'a str>,
    pub num: Option<i32>,
    pub lgr: Option<&'a str>,
    pub lgr_ijk: Option<[i32; 3]>,
}

fn valid_name(name: Option<&str>) -> Option<String> {
    let name = name?.trim();
    if name.is_empty() || name == DUMMY_WELL {
        return None;
    }
    Some(name.to_string())
}

impl SummaryKey {
    pub fn new(category: VarCategory, keyword: &str, qualifier: Qualifier) -> Self {
        Self {
            category,
            keyword: keyword.trim_end().to_string(),
            qualifier,
        }
    }

    /// Build the key for one header entry. `None` when the entry is not a
    /// valid variable (dummy or blank well name, negative number, network
    /// variables).
    pub fn from_node(node: RawNode<'_>) -> Option<Self> {
        let keyword = node.keyword.trim_end();
        if keyword.is_empty() {
            return None;
        }
        let category = VarCategory::identify(keyword);
        let num = node.num;
        let qualifier = match category {
            VarCategory::Field | VarCategory::Misc => Qualifier::None,
            VarCategory::Well | VarCategory::Group => Qualifier::Name(valid_name(node.wgname)?),
            VarCategory::Completion | VarCategory::Segment => {
                let num = num.filter(|n| *n >= 0)?;
                Qualifier::NameNumber(valid_name(node.wgname)?, num)
            }
            VarCategory::Region | VarCategory::Block | VarCategory::Aquifer => {
                Qualifier::Number(num.filter(|n| *n >= 0)?)
            }
            VarCategory::RegionToRegion => {
                let (r1, r2) = decode_region_pair(num.filter(|n| *n >= 0)?);
                Qualifier::RegionPair(r1, r2)
            }
            VarCategory::LocalBlock => Qualifier::Local {
                lgr: node.lgr?.trim().to_string(),
                well: None,
                ijk: node.lgr_ijk,
            },
            VarCategory::LocalWell => Qualifier::Local {
                lgr: node.lgr?.trim().to_string(),
                well: Some(valid_name(node.wgname)?),
                ijk: None,
            },
            VarCategory::LocalCompletion => Qualifier::Local {
                lgr: node.lgr?.trim().to_string(),
                well: Some(valid_name(node.wgname)?),
                ijk: node.lgr_ijk,
            },
            VarCategory::Network => return None,
        };
        Some(Self {
            category,
            keyword: keyword.to_string(),
            qualifier,
        })
    }

    /// Parse the `:`-joined text form. Best effort: names containing `:` or
    /// `,` cannot be expressed in text and must be looked up structurally.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split(':');
        let keyword = parts.next()?.trim();
        if keyword.is_empty() {
            return None;
        }
        let rest: Vec<&str> = parts.map(str::trim).collect();
        let category = VarCategory::identify(keyword);
        let parse_ijk = |s: &str| -> Option<[i32; 3]> {
            let v: Vec<i32> = s.split(',').map(|p| p.trim().parse().ok()).collect::<Option<_>>()?;
            (v.len() == 3).then(|| [v[0], v[1], v[2]])
        };
        let qualifier = match (category, rest.as_slice()) {
            (VarCategory::Field | VarCategory::Misc, []) => Qualifier::None,
            (VarCategory::Well | VarCategory::Group, [name]) => Qualifier::Name(name.to_string()),
            (VarCategory::Completion | VarCategory::Segment, [name, num]) => {
                Qualifier::NameNumber(name.to_string(), num.parse().ok()?)
            }
            (VarCategory::Region | VarCategory::Block | VarCategory::Aquifer, [num]) => {
                Qualifier::Number(num.parse().ok()?)
            }
            (VarCategory::RegionToRegion, [pair]) => {
                let (a, b) = pair.split_once('-')?;
                Qualifier::RegionPair(a.trim().parse().ok()?, b.trim().parse().ok()?)
            }
            (VarCategory::LocalBlock, [lgr, ijk]) => Qualifier::Local {
                lgr: lgr.to_string(),
                well: None,
                ijk: Some(parse_ijk(ijk)?),
            },
            (VarCategory::LocalWell, [lgr, well]) => Qualifier::Local {
                lgr: lgr.to_string(),
                well: Some(well.to_string()),
                ijk: None,
            },
            (VarCategory::LocalCompletion, [lgr, well, ijk]) => Qualifier::Local {
                lgr: lgr.to_string(),
                well: Some(well.to_string()),
                ijk: Some(parse_ijk(ijk)?),
            },
            _ => return None,
        };
        Some(Self {
            category,
            keyword: keyword.to_string(),
            qualifier,
        })
    }
}

impl fmt::Display for SummaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keyword)?;
        match &self.qualifier {
            Qualifier::None => Ok(()),
            Qualifier::Name(name) => write!(f, ":{name}"),
            Qualifier::Number(num) => write!(f, ":{num}"),
            Qualifier::RegionPair(a, b) => write!(f, ":{a}-{b}"),
            Qualifier::NameNumber(name, num) => write!(f, ":{name}:{num}"),
            Qualifier::Local { lgr, well, ijk } => {
                write!(f, ":{lgr}")?;
                if let Some(well) = well {
                    write!(f, ":{well}")?;
                }
                if let Some([i, j, k]) = ijk {
                    write!(f, ":{i},{j},{k}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node<'a>(keyword: &'a str, wgname: &'a str, num: i32) -> RawNode<'a> {
        RawNode {
            keyword,
            wgname: Some(wgname),
            num: Some(num),
            lgr: None,
            lgr_ijk: None,
        }
    }

    #[test]
    fn dummy_and_blank_wells_are_invalid() {
        assert!(SummaryKey::from_node(node("WOPR", DUMMY_WELL, 0)).is_none());
        assert!(SummaryKey::from_node(node("WOPR", "   ", 0)).is_none());
        assert!(SummaryKey::from_node(node("RPR", "", -1)).is_none());
        assert!(SummaryKey::from_node(node("NPR", "N1", 0)).is_none());
        let field = SummaryKey::from_node(node("FOPT", DUMMY_WELL, 0)).unwrap();
        assert_eq!(field.qualifier, Qualifier::None);
    }

    #[test]
    fn region_pair_round_trip() {
        let packed = encode_region_pair(3, 7);
        assert_eq!(decode_region_pair(packed), (3, 7));
        let key = SummaryKey::from_node(node("ROFT", "", packed)).unwrap();
        assert_eq!(key.to_string(), "ROFT:3-7");
    }

    #[test]
    fn text_form_parses_back() {
        for text in ["FOPT", "WOPR:P1", "RPR:3", "COFR:P2:120", "ROFT:1-2", "LBPR:LGR1:1,2,3", "LWBHP:LGR1:P1"] {
            let key = SummaryKey::parse(text).unwrap_or_else(|| panic!("parse {text}"));
            assert_eq!(key.to_string(), text);
        }
        assert!(SummaryKey::parse("WOPR").is_none());
        assert!(SummaryKey::parse("RPR:x").is_none());
    }

    #[test]
    fn block_numbers_map_to_ijk() {
        let dims = [10, 5, 3];
        assert_eq!(block_ijk(1, dims), Some([1, 1, 1]));
        assert_eq!(block_ijk(block_num([4, 2, 3], dims).unwrap(), dims), Some([4, 2, 3]));
        assert_eq!(block_ijk(151, dims), None);
        // header dimensions whose product overflows i32
        let huge = [i32::MAX; 3];
        assert_eq!(block_ijk(i32::MAX, huge), Some([i32::MAX, 1, 1]));
        assert_eq!(block_ijk(5, [2, i32::MAX, i32::MAX]), Some([1, 3, 1]));
        assert_eq!(block_num([1, 1, 3], huge), None);
    }

    #[test]
    fn ordering_is_category_then_name_then_qualifier() {
        let mut keys = vec![
            SummaryKey::new(VarCategory::Well, "WOPR", Qualifier::well("P2")),
            SummaryKey::new(VarCategory::Well, "WGPR", Qualifier::well("P1")),
            SummaryKey::new(VarCategory::Field, "FOPT", Qualifier::None),
            SummaryKey::new(VarCategory::Well, "WOPR", Qualifier::well("P1")),
        ];
        keys.sort();
        let text: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(text, vec!["FOPT", "WGPR:P1", "WOPR:P1", "WOPR:P2"]);
    }
}
