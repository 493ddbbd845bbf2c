//! Warehouse unit codes.
//!
//! Unit codes are free text typed into the inventory (`C24P`, `BAG(8)`,
//! `CTN 6(10)`, ...). Some of them encode how many pieces a container holds.
//! [`UnitInfo::parse`] extracts that multiplier by trying an ordered list of
//! rules; the first rule that matches wins. Compound `CTN` codes are tried
//! before the generic `WORD(n)` rule, otherwise `CTN(4)10` would read as 4.
//!
//! Parsing never fails: a code nothing matches has multiplier 1 and no
//! conversion.

use std::{fmt, sync::LazyLock};

use regex::{Captures, Regex};

/// Packaging a quantity is counted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Container {
    Bags,
    Cartons,
    Outers,
    Tins,
    Dozens,
    Units,
}

static CARTON_CODE: LazyLock<Regex> = LazyLock::new(|| rule_regex(r"C-?\d"));

impl Container {
    /// Infers the container from keywords in the code, independently of the
    /// multiplier.
    pub fn from_code(code: &str) -> Self {
        let upper = code.to_uppercase();
        if upper.contains("BAG") {
            Self::Bags
        } else if upper.contains("CTN") || upper.contains("CARTON") || CARTON_CODE.is_match(code)
        {
            Self::Cartons
        } else if upper.contains("OUTER") {
            Self::Outers
        } else if upper.contains("TIN") {
            Self::Tins
        } else if upper.contains("DZN") || upper.contains("DOZEN") {
            Self::Dozens
        } else {
            Self::Units
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Self::Bags => "bags",
            Self::Cartons => "cartons",
            Self::Outers => "outers",
            Self::Tins => "tins",
            Self::Dozens => "dozens",
            Self::Units => "units",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            Self::Bags => "bag",
            Self::Cartons => "carton",
            Self::Outers => "outer",
            Self::Tins => "tin",
            Self::Dozens => "dozen",
            Self::Units => "unit",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

/// Result of parsing a unit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitInfo {
    /// Pieces per container, 1 when the code has no conversion.
    pub multiplier: u32,
    pub container: Container,
    conversion: bool,
}

impl UnitInfo {
    pub fn parse(code: &str) -> Self {
        let container = Container::from_code(code);
        match RULES.iter().find_map(|rule| rule.apply(code)) {
            Some(multiplier) => Self {
                multiplier,
                container,
                conversion: true,
            },
            None => Self {
                multiplier: 1,
                container,
                conversion: false,
            },
        }
    }

    /// Unit info of an item without a unit code.
    pub fn flat() -> Self {
        Self {
            multiplier: 1,
            container: Container::Units,
            conversion: false,
        }
    }

    pub fn has_conversion(&self) -> bool {
        self.conversion
    }

    /// Human readable ratio, e.g. `1 carton = 24 pieces`.
    pub fn summary(&self) -> Option<String> {
        self.conversion.then(|| {
            format!(
                "1 {} = {} pieces",
                self.container.singular(),
                self.multiplier
            )
        })
    }
}

/// Pieces per container encoded in `code`, 1 when there is none.
pub fn multiplier(code: &str) -> u32 {
    UnitInfo::parse(code).multiplier
}

pub fn has_conversion(code: &str) -> bool {
    UnitInfo::parse(code).has_conversion()
}

/// Rounds to the 4 decimals quantities are displayed and submitted with.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

struct Rule {
    name: &'static str,
    pattern: Regex,
    extract: fn(&Captures<'_>) -> Option<u32>,
}

impl Rule {
    fn apply(&self, code: &str) -> Option<u32> {
        let caps = self.pattern.captures(code)?;
        let multiplier = (self.extract)(&caps).filter(|m| *m > 0)?;
        tracing::trace!(rule = self.name, code, multiplier, "unit code matched");
        Some(multiplier)
    }
}

#[allow(clippy::expect_used)]
fn rule_regex(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("unit patterns are valid regexes")
}

fn group(caps: &Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn first_group(caps: &Captures<'_>) -> Option<u32> {
    group(caps, 1)
}

fn second_group(caps: &Captures<'_>) -> Option<u32> {
    group(caps, 2)
}

fn product_of_groups(caps: &Captures<'_>) -> Option<u32> {
    group(caps, 1)?.checked_mul(group(caps, 2)?)
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // C24P, C-12P, C24PCS
        Rule {
            name: "pieces_per_carton",
            pattern: rule_regex(r"C-?(\d+)P(?:CS)?"),
            extract: first_group,
        },
        // C54
        Rule {
            name: "bare_carton",
            pattern: rule_regex(r"^\s*C(\d+)\s*$"),
            extract: first_group,
        },
        // CTN 6(10)
        Rule {
            name: "carton_of_packs",
            pattern: rule_regex(r"CTN\s+(\d+)\s*\(\s*(\d+)\s*\)"),
            extract: product_of_groups,
        },
        // CTN(4)10
        Rule {
            name: "carton_packs_of",
            pattern: rule_regex(r"CTN\s*\(\s*(\d+)\s*\)\s*(\d+)"),
            extract: product_of_groups,
        },
        // BAG(8), CTN(144), TIN(12PCS)
        Rule {
            name: "word_count",
            pattern: rule_regex(r"[A-Z]+\s*\((\d+)[A-Z]*\)"),
            extract: first_group,
        },
        // C3(RPT)
        Rule {
            name: "carton_annotated",
            pattern: rule_regex(r"C(\d+)\([^)]*\)"),
            extract: first_group,
        },
        // CTN(720P)
        Rule {
            name: "carton_pieces",
            pattern: rule_regex(r"(CTN)\s*\((\d+)P\)"),
            extract: second_group,
        },
    ]
});
