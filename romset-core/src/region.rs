use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Release regions recognized in catalog metadata and in dump names.
///
/// The discriminant indexes [`REGIONS`], so variants must stay in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    Argentina,
    Asia,
    Australia,
    Brazil,
    Canada,
    China,
    Colombia,
    Denmark,
    Europe,
    Finland,
    France,
    Germany,
    Greece,
    HongKong,
    Italy,
    Japan,
    Korea,
    LatinAmerica,
    Mexico,
    Netherlands,
    NewZealand,
    Norway,
    Peru,
    Portugal,
    Russia,
    Scandinavia,
    Spain,
    Sweden,
    Taiwan,
    UnitedKingdom,
    Usa,
    Unknown,
    World,
}

/// Static description of one region: its catalog code, the name used in
/// dump titles, and the languages a release there is assumed to carry.
#[derive(Debug)]
pub struct RegionInfo {
    pub region: Region,
    pub code: &'static str,
    pub name: &'static str,
    pub languages: &'static [&'static str],
}

const fn info(
    region: Region,
    code: &'static str,
    name: &'static str,
    languages: &'static [&'static str],
) -> RegionInfo {
    RegionInfo {
        region,
        code,
        name,
        languages,
    }
}

pub static REGIONS: [RegionInfo; 33] = [
    info(Region::Argentina, "ARG", "Argentina", &["es"]),
    info(Region::Asia, "ASI", "Asia", &["zh"]),
    info(Region::Australia, "AUS", "Australia", &["en"]),
    info(Region::Brazil, "BRA", "Brazil", &["pt"]),
    info(Region::Canada, "CAN", "Canada", &["en", "fr"]),
    info(Region::China, "CHN", "China", &["zh"]),
    info(Region::Colombia, "COL", "Colombia", &["es"]),
    info(Region::Denmark, "DAN", "Denmark", &["da"]),
    info(Region::Europe, "EUR", "Europe", &["en"]),
    info(Region::Finland, "FIN", "Finland", &["fi"]),
    info(Region::France, "FRA", "France", &["fr"]),
    info(Region::Germany, "GER", "Germany", &["de"]),
    info(Region::Greece, "GRE", "Greece", &["el"]),
    info(Region::HongKong, "HK", "Hong Kong", &["zh"]),
    info(Region::Italy, "ITA", "Italy", &["it"]),
    info(Region::Japan, "JPN", "Japan", &["ja"]),
    info(Region::Korea, "KOR", "Korea", &["ko"]),
    info(Region::LatinAmerica, "LAM", "Latin America", &["en", "es"]),
    info(Region::Mexico, "MEX", "Mexico", &["es"]),
    info(Region::Netherlands, "HOL", "Netherlands", &["nl"]),
    info(Region::NewZealand, "NZ", "New Zealand", &["en"]),
    info(Region::Norway, "NOR", "Norway", &["no"]),
    info(Region::Peru, "PER", "Peru", &["es"]),
    info(Region::Portugal, "POR", "Portugal", &["pt"]),
    info(Region::Russia, "RUS", "Russia", &["ru"]),
    info(Region::Scandinavia, "SCA", "Scandinavia", &["en"]),
    info(Region::Spain, "SPA", "Spain", &["es"]),
    info(Region::Sweden, "SWE", "Sweden", &["sv"]),
    info(Region::Taiwan, "TAI", "Taiwan", &["zh"]),
    info(Region::UnitedKingdom, "UK", "United Kingdom", &["en"]),
    info(Region::Usa, "USA", "USA", &["en"]),
    info(Region::Unknown, "UNK", "Unknown", &["en"]),
    info(Region::World, "WOR", "World", &["en"]),
];

impl Region {
    fn info(self) -> &'static RegionInfo {
        &REGIONS[self as usize]
    }

    /// Catalog abbreviation, e.g. `USA` or `EUR`.
    pub fn code(self) -> &'static str {
        self.info().code
    }

    /// Name as it appears inside dump titles, e.g. `Europe`.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Languages implied by a release in this region.
    pub fn languages(self) -> &'static [&'static str] {
        self.info().languages
    }

    /// Look up a region by its catalog code (case-insensitive).
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        REGIONS
            .iter()
            .find(|r| r.code.eq_ignore_ascii_case(code))
            .map(|r| r.region)
    }

    /// Look up a region by the name used in dump titles (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        REGIONS
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .map(|r| r.region)
    }

    /// Every region, in table order.
    pub fn all() -> impl Iterator<Item = Region> {
        REGIONS.iter().map(|r| r.region)
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a string names no known region.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown region: {0}")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    /// Accepts either the code or the full name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::from_code(s)
            .or_else(|| Region::from_name(s))
            .ok_or_else(|| UnknownRegion(s.trim().to_string()))
    }
}
